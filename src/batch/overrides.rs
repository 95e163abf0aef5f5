use std::collections::BTreeMap;

use crate::domain::tag::TagField;

/// Caller-supplied field values, keyed by field name, in the order the
/// names were first given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides(Vec<(String, Vec<String>)>);

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the values for `name`, replacing earlier ones in place
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.0.push((name, values)),
        }
    }

    /// Inserts every entry of `other`, which wins on conflicts
    pub fn merge(&mut self, other: Overrides) {
        for (name, values) in other.0 {
            self.insert(name, values);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Splits the overrides into allow-listed `(name, value)` pairs, with
    /// multiple values joined by `", "`, and the names that are not fields.
    pub fn resolve(&self) -> (Vec<(String, String)>, Vec<String>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for (name, values) in self.iter() {
            if name.parse::<TagField>().is_ok() {
                accepted.push((name.to_string(), values.join(", ")));
            } else {
                rejected.push(name.to_string());
            }
        }
        (accepted, rejected)
    }
}

impl From<BTreeMap<String, Vec<String>>> for Overrides {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolve_joins_values_and_rejects_unknown_names() {
        let mut overrides = Overrides::new();
        overrides.insert("artist", values(&["A", "B"]));
        overrides.insert("bpm", values(&["120"]));
        overrides.insert("year", values(&["1999"]));
        overrides.insert("comment", vec![]);

        let (accepted, rejected) = overrides.resolve();
        assert_eq!(
            accepted,
            vec![
                ("artist".to_string(), "A, B".to_string()),
                ("year".to_string(), "1999".to_string()),
                ("comment".to_string(), String::new()),
            ]
        );
        assert_eq!(rejected, vec!["bpm"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut overrides = Overrides::new();
        overrides.insert("artist", values(&["A"]));
        overrides.insert("title", values(&["T"]));
        overrides.insert("artist", values(&["B"]));

        let names: Vec<_> = overrides.iter().map(|(n, v)| (n, v.to_vec())).collect();
        assert_eq!(
            names,
            vec![("artist", values(&["B"])), ("title", values(&["T"]))]
        );
    }

    #[test]
    fn merge_prefers_later_values() {
        let mut base = Overrides::from(BTreeMap::from([
            ("artist".to_string(), values(&["Config"])),
            ("genre".to_string(), values(&["17"])),
        ]));
        let mut cli = Overrides::new();
        cli.insert("artist", values(&["Cli"]));
        base.merge(cli);

        let (accepted, _) = base.resolve();
        assert!(accepted.contains(&("artist".to_string(), "Cli".to_string())));
        assert!(accepted.contains(&("genre".to_string(), "17".to_string())));
    }
}
