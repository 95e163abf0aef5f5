pub mod album;
pub mod genre;
pub mod tag;
