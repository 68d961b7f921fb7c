//! Core, format-agnostic types for locwriter.
//! Codecs render these; readers parse into these.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::{error::Error, traits::MergePolicy};

/// The in-memory content of one localized file.
///
/// Entries keep the order they were given in; codecs decide whether that order matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Records {
    /// Optional language tag (e.g. "en", "pt-BR").
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub language: Option<String>,

    /// Ordered list of all entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Records {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn parse_language_identifier(&self) -> Option<LanguageIdentifier> {
        self.language.as_ref()?.parse().ok()
    }

    /// Checks the structural preconditions every creator relies on.
    ///
    /// Fails with [`Error::InvalidInput`] on an empty key, a duplicate key,
    /// or a language tag that is not a valid BCP 47 identifier.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(language) = &self.language {
            if language.parse::<LanguageIdentifier>().is_err() {
                return Err(Error::invalid_input(format!(
                    "invalid language tag `{}`",
                    language
                )));
            }
        }

        let mut seen = HashSet::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.key.is_empty() {
                return Err(Error::invalid_input(format!(
                    "entry at position {} has an empty key",
                    index
                )));
            }
            if !seen.insert(entry.key.as_str()) {
                return Err(Error::invalid_input(format!(
                    "duplicate key `{}`",
                    entry.key
                )));
            }
        }
        Ok(())
    }

    /// Combines these records with the content of an existing file.
    ///
    /// With [`MergePolicy::Replace`] the snapshot is ignored. With
    /// [`MergePolicy::PreserveExisting`] the snapshot's order is kept, shared
    /// keys take the new value (and the new comment when one is given), and
    /// keys only present here are appended in their original order.
    pub fn merged_over(&self, snapshot: &Records, policy: MergePolicy) -> Records {
        match policy {
            MergePolicy::Replace => self.clone(),
            MergePolicy::PreserveExisting => {
                let incoming: HashMap<&str, &Entry> =
                    self.entries.iter().map(|e| (e.key.as_str(), e)).collect();

                let mut entries: Vec<Entry> = snapshot
                    .entries
                    .iter()
                    .map(|old| match incoming.get(old.key.as_str()) {
                        Some(new) => Entry {
                            key: old.key.clone(),
                            value: new.value.clone(),
                            comment: new.comment.clone().or_else(|| old.comment.clone()),
                        },
                        None => old.clone(),
                    })
                    .collect();

                let existing: HashSet<&str> = snapshot.keys().collect();
                entries.extend(
                    self.entries
                        .iter()
                        .filter(|e| !existing.contains(e.key.as_str()))
                        .cloned(),
                );

                Records {
                    language: self.language.clone().or_else(|| snapshot.language.clone()),
                    entries,
                }
            }
        }
    }
}

impl FromIterator<Entry> for Records {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Records {
            language: None,
            entries: iter.into_iter().collect(),
        }
    }
}

/// A single translatable unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Entry {
    /// Unique key within its [`Records`].
    pub key: String,

    /// The translated value.
    pub value: String,

    /// Optional comment for translators.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Entry {
            key: key.into(),
            value: value.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entry {{ key: {}, value: {} }}", self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn records(pairs: &[(&str, &str)]) -> Records {
        pairs.iter().map(|(k, v)| Entry::new(*k, *v)).collect()
    }

    #[test]
    fn test_validate_accepts_unique_keys() {
        let records = records(&[("a", "1"), ("b", "2")]).with_language("en-US");
        assert!(records.validate().is_ok());
        assert_eq!(
            records.parse_language_identifier().unwrap().language.as_str(),
            "en"
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let err = records(&[("a", "1"), ("b", "2"), ("a", "3")])
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("duplicate key `a`"));
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let err = records(&[("", "1")]).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_validate_rejects_bad_language() {
        let err = records(&[("a", "1")])
            .with_language("not a language")
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_merge_replace_ignores_snapshot() {
        let snapshot = records(&[("a", "old"), ("b", "old")]);
        let new = records(&[("b", "new"), ("c", "new")]);
        assert_eq!(new.merged_over(&snapshot, MergePolicy::Replace), new);
    }

    #[test]
    fn test_merge_preserve_keeps_snapshot_order_and_appends() {
        let mut snapshot = records(&[("a", "old a"), ("b", "old b")]);
        snapshot.entries[1].comment = Some("kept".to_string());
        let new = records(&[("c", "new c"), ("b", "new b")]);

        let merged = new.merged_over(&snapshot, MergePolicy::PreserveExisting);
        let keys: Vec<&str> = merged.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(merged.find("a").unwrap().value, "old a");
        assert_eq!(merged.find("b").unwrap().value, "new b");
        assert_eq!(merged.find("b").unwrap().comment.as_deref(), Some("kept"));
    }

    #[test]
    fn test_merge_preserve_prefers_new_comment() {
        let snapshot: Records = vec![Entry::new("a", "1").with_comment("old")]
            .into_iter()
            .collect();
        let new: Records = vec![Entry::new("a", "2").with_comment("new")]
            .into_iter()
            .collect();
        let merged = new.merged_over(&snapshot, MergePolicy::PreserveExisting);
        assert_eq!(merged.entries[0].comment.as_deref(), Some("new"));
    }

    #[test]
    fn test_records_serde_shape() {
        let records = records(&[("a", "1")]);
        let json = serde_json::to_string(&records).unwrap();
        assert_eq!(json, r#"{"entries":[{"key":"a","value":"1"}]}"#);
        let back: Records = serde_json::from_str(&json).unwrap();
        assert_eq!(back, records);
    }
}
