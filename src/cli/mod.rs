use anyhow::Context;
use clap::Parser;
use std::{
    fmt::{self, Write},
    path::PathBuf,
};
use thiserror::Error;

use crate::{
    batch::{self, BatchOptions, BatchReport, Overrides, TrackStatus},
    config::Config,
    edit::FieldStatus,
};

#[derive(Parser)]
#[command(name = "albumtag")]
#[command(version = "0.1")]
#[command(about = "Tag every track of an album directory with its album, title and cover")]
#[command(after_help = "Overrides follow the directory as `-field value...`, e.g. \
    `albumtag ./AlbumX -artist \"A B\" -year 1999`. Fields: track, artist, title, album, \
    year, genre, comment, lyrics, composer, publisher, originalArtist, albumArtist, \
    copyright, url, encoder.")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Number of tracks processed at the same time
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Album directory
    pub directory: PathBuf,

    /// Field overrides, `-field value1 value2 ...`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "OVERRIDES")]
    pub overrides: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Error at argument {0:?}: expected -field")]
    BadFlag(String),

    #[error("Illegal parameter usage: {0:?} does not follow a -field flag")]
    StrayValue(String),
}

/// Parses `-field value...` groups. A repeated field replaces the earlier
/// group; a field with no values gets an empty value.
pub fn parse_overrides(args: &[String]) -> Result<Overrides, UsageError> {
    let mut overrides = Overrides::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for arg in args {
        if let Some(name) = arg.strip_prefix('-') {
            if name.is_empty() {
                return Err(UsageError::BadFlag(arg.clone()));
            }
            if let Some((name, values)) = current.take() {
                overrides.insert(name, values);
            }
            current = Some((name.to_string(), Vec::new()));
        } else {
            match current.as_mut() {
                Some((_, values)) => values.push(arg.clone()),
                None => return Err(UsageError::StrayValue(arg.clone())),
            }
        }
    }
    if let Some((name, values)) = current {
        overrides.insert(name, values);
    }
    Ok(overrides)
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // validate the whole command line before touching any file
    let cli_overrides = parse_overrides(&cli.overrides)?;

    let cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let mut overrides = Overrides::from(cfg.overrides);
    overrides.merge(cli_overrides);

    let options = BatchOptions {
        scan: cfg.scan,
        jobs: cli.jobs.unwrap_or(cfg.batch.jobs),
        cancel: None,
    };

    let report = batch::process_directory(&cli.directory, &overrides, &options)
        .with_context(|| format!("Failed to process {}", cli.directory.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let mut text = String::new();
        render_report(&report, &mut text)?;
        print!("{text}");
    }
    Ok(())
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Writes a human-readable summary of a batch run to `out`
pub fn render_report(report: &BatchReport, out: &mut impl Write) -> fmt::Result {
    writeln!(out, "Album name: {}", report.album.name)?;
    match &report.album.cover {
        Some(cover) => writeln!(out, "Album cover: {}", file_name(cover))?,
        None => writeln!(out, "Album cover: none")?,
    }
    for path in &report.recovered {
        writeln!(out, "Recovered from interrupted run: {}", file_name(path))?;
    }
    for name in &report.rejected_overrides {
        writeln!(out, "Invalid option: {name}")?;
    }

    for track in &report.tracks {
        let name = file_name(&track.path);
        match &track.status {
            TrackStatus::Committed => writeln!(out, "  [OK]       {name}")?,
            TrackStatus::Skipped { reason } => writeln!(out, "  [SKIPPED]  {name}: {reason}")?,
            TrackStatus::Failed { reason } => writeln!(out, "  [FAILED]   {name}: {reason}")?,
        }
        for field in &track.fields {
            match &field.status {
                FieldStatus::Applied => writeln!(out, "    - {} = {:?}", field.field, field.value)?,
                FieldStatus::Skipped { reason } => {
                    writeln!(out, "    - {} skipped: {reason}", field.field)?
                }
            }
        }
    }

    for path in &report.swept {
        writeln!(out, "Deleted staging file: {}", file_name(path))?;
    }
    for warning in &report.warnings {
        writeln!(out, "Warning: {warning}")?;
    }
    writeln!(
        out,
        "{} of {} tracks updated",
        report.committed(),
        report.tracks.len()
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{
        batch::TrackReport,
        domain::album::AlbumContext,
        edit::FieldReport,
    };

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_field_groups() {
        let overrides =
            parse_overrides(&args(&["-artist", "A", "B", "-year", "1999", "-comment"])).unwrap();
        let entries: Vec<_> = overrides.iter().map(|(n, v)| (n, v.to_vec())).collect();
        assert_eq!(
            entries,
            vec![
                ("artist", args(&["A", "B"])),
                ("year", args(&["1999"])),
                ("comment", vec![]),
            ]
        );
    }

    #[test]
    fn repeated_field_replaces_values() {
        let overrides = parse_overrides(&args(&["-artist", "A", "-artist", "B"])).unwrap();
        let (accepted, _) = overrides.resolve();
        assert_eq!(accepted, vec![("artist".to_string(), "B".to_string())]);
    }

    #[test]
    fn lone_dash_is_a_usage_error() {
        assert_eq!(
            parse_overrides(&args(&["-artist", "A", "-"])),
            Err(UsageError::BadFlag("-".to_string()))
        );
    }

    #[test]
    fn value_before_flag_is_a_usage_error() {
        assert_eq!(
            parse_overrides(&args(&["A", "-artist", "B"])),
            Err(UsageError::StrayValue("A".to_string()))
        );
    }

    #[test]
    fn cli_accepts_hyphenated_overrides() {
        let cli = Cli::try_parse_from([
            "albumtag",
            "--json",
            "AlbumX",
            "-artist",
            "A B",
            "-albumArtist",
            "C",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.directory, PathBuf::from("AlbumX"));
        assert_eq!(cli.overrides, args(&["-artist", "A B", "-albumArtist", "C"]));
    }

    #[test]
    fn report_lists_every_track_and_field() {
        let report = BatchReport {
            directory: PathBuf::from("AlbumX"),
            album: AlbumContext {
                name: "AlbumX".to_string(),
                cover: Some(PathBuf::from("AlbumX/cover.jpg")),
            },
            recovered: vec![],
            rejected_overrides: vec!["bpm".to_string()],
            tracks: vec![
                TrackReport {
                    path: PathBuf::from("AlbumX/01.mp3"),
                    title: "01".to_string(),
                    status: TrackStatus::Committed,
                    fields: vec![FieldReport {
                        field: "artist".to_string(),
                        value: "A B".to_string(),
                        status: FieldStatus::Applied,
                    }],
                },
                TrackReport {
                    path: PathBuf::from("AlbumX/02.mp3"),
                    title: "02".to_string(),
                    status: TrackStatus::Skipped {
                        reason: "unsupported ID3v2 version 2.3".to_string(),
                    },
                    fields: vec![],
                },
            ],
            swept: vec![],
            warnings: vec![],
        };

        let mut text = String::new();
        render_report(&report, &mut text).unwrap();
        assert!(text.contains("Album cover: cover.jpg"));
        assert!(text.contains("Invalid option: bpm"));
        assert!(text.contains("[OK]       01.mp3"));
        assert!(text.contains("- artist = \"A B\""));
        assert!(text.contains("[SKIPPED]  02.mp3: unsupported ID3v2 version 2.3"));
        assert!(text.ends_with("1 of 2 tracks updated\n"));
    }
}
