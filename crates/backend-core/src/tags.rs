//! Tag collections and the per-service rules applied to them.
//!
//! A [`TagPolicy`] checks the *resulting* tag set before anything is written, so a rejected
//! `tag` call leaves the resource untouched.

use crate::error::{ErrorKind, ProviderError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Key → value map, ordered by key.
pub type TagMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Converts a tag list into a map; later duplicates win.
pub fn to_map(tags: &[Tag]) -> TagMap {
    tags.iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect()
}

pub fn to_list(map: &TagMap) -> Vec<Tag> {
    map.iter().map(|(k, v)| Tag::new(k, v)).collect()
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TagViolation {
    #[error("tag limit of {limit} exceeded ({attempted} tags)")]
    TooManyTags { limit: usize, attempted: usize },
    #[error("tag key '{0}' uses a reserved prefix")]
    ReservedKey(String),
    #[error("tag key '{0}' is duplicated")]
    DuplicateKey(String),
    #[error("tag key must not be empty")]
    EmptyKey,
}

impl ProviderError for TagViolation {
    fn kind(&self) -> ErrorKind {
        match self {
            TagViolation::TooManyTags { .. } => ErrorKind::LimitExceeded,
            _ => ErrorKind::ValidationError,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            TagViolation::TooManyTags { .. } => "TooManyTagsException",
            _ => "InvalidTagsException",
        }
    }
}

/// Limits a service places on the tags of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPolicy {
    pub max_tags: usize,
    pub reserved_prefix: Option<&'static str>,
}

impl TagPolicy {
    /// 50 tags, `aws:` keys refused.
    pub const STANDARD: TagPolicy = TagPolicy {
        max_tags: 50,
        reserved_prefix: Some("aws:"),
    };

    pub const fn new(max_tags: usize, reserved_prefix: Option<&'static str>) -> Self {
        Self {
            max_tags,
            reserved_prefix,
        }
    }

    pub fn check_key(&self, key: &str) -> Result<(), TagViolation> {
        if key.is_empty() {
            return Err(TagViolation::EmptyKey);
        }
        match self.reserved_prefix {
            Some(prefix) if key.starts_with(prefix) => {
                Err(TagViolation::ReservedKey(key.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Rejects duplicate keys inside one request.
    pub fn check_unique(&self, tags: &[Tag]) -> Result<(), TagViolation> {
        let mut seen = std::collections::BTreeSet::new();
        for tag in tags {
            if !seen.insert(tag.key.as_str()) {
                return Err(TagViolation::DuplicateKey(tag.key.clone()));
            }
        }
        Ok(())
    }

    /// Validates `incoming` against `existing` and returns the merged set.
    pub fn merged(&self, existing: &TagMap, incoming: &TagMap) -> Result<TagMap, TagViolation> {
        for key in incoming.keys() {
            self.check_key(key)?;
        }
        let mut merged = existing.clone();
        merged.extend(incoming.iter().map(|(k, v)| (k.clone(), v.clone())));
        if merged.len() > self.max_tags {
            return Err(TagViolation::TooManyTags {
                limit: self.max_tags,
                attempted: merged.len(),
            });
        }
        Ok(merged)
    }

    /// Merges `incoming` into `existing`, leaving it untouched on error.
    pub fn apply(&self, existing: &mut TagMap, incoming: &TagMap) -> Result<(), TagViolation> {
        *existing = self.merged(existing, incoming)?;
        Ok(())
    }

    /// Validates a full replacement tag set.
    pub fn check_replacement(&self, tags: &TagMap) -> Result<(), TagViolation> {
        self.merged(&TagMap::new(), tags).map(|_| ())
    }
}

/// Removes `keys` from `map`; unknown keys are ignored.
pub fn remove_keys<S: AsRef<str>>(map: &mut TagMap, keys: &[S]) {
    for key in keys {
        map.remove(key.as_ref());
    }
}

/// Membership test used by tag filters: key present and, if values are given, value among them.
pub fn matches_filter(map: &TagMap, key: &str, values: &[String]) -> bool {
    match map.get(key) {
        Some(value) => values.is_empty() || values.iter().any(|v| v == value),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn many(n: usize) -> TagMap {
        (0..n).map(|i| (format!("k{i}"), format!("v{i}"))).collect()
    }

    #[test]
    fn union_counts_against_limit() {
        let policy = TagPolicy::STANDARD;
        let mut existing = many(30);
        let incoming: TagMap = (30..51).map(|i| (format!("k{i}"), "x".into())).collect();
        let err = policy.apply(&mut existing, &incoming).unwrap_err();
        assert_eq!(
            err,
            TagViolation::TooManyTags {
                limit: 50,
                attempted: 51
            }
        );
        assert_eq!(existing.len(), 30);
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    }

    #[test]
    fn overwriting_keys_does_not_grow() {
        let policy = TagPolicy::STANDARD;
        let mut existing = many(50);
        policy.apply(&mut existing, &many(50)).unwrap();
        assert_eq!(existing.len(), 50);
    }

    #[test]
    fn reserved_prefix_refused() {
        let incoming: TagMap = [("aws:name".to_string(), "x".to_string())].into();
        let err = TagPolicy::STANDARD
            .merged(&TagMap::new(), &incoming)
            .unwrap_err();
        assert_eq!(err, TagViolation::ReservedKey("aws:name".into()));
        assert!(TagPolicy::new(50, None).merged(&TagMap::new(), &incoming).is_ok());
    }

    #[test]
    fn duplicates_and_filters() {
        let tags = vec![Tag::new("a", "1"), Tag::new("a", "2")];
        assert_eq!(
            TagPolicy::STANDARD.check_unique(&tags),
            Err(TagViolation::DuplicateKey("a".into()))
        );
        let map = to_map(&tags);
        assert_eq!(map["a"], "2");
        assert!(matches_filter(&map, "a", &[]));
        assert!(matches_filter(&map, "a", &["2".into()]));
        assert!(!matches_filter(&map, "a", &["1".into()]));
        assert!(!matches_filter(&map, "b", &[]));
    }
}
