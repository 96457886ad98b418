//! `Filters=[{Name, Values}]` evaluation shared by the describe operations.
//!
//! A resource passes when every filter matches. A filter matches when any of the resource's
//! values for that name matches any of the filter values; values may use `*` and `?`
//! wildcards. `tag:<key>`, `tag-key` and `tag-value` are understood for every resource.

use super::error::Ec2Error;
use backend_core::TagMap;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A resource that describe filters can be evaluated against.
pub trait Filterable {
    /// The values of `name` for this resource, or `None` if the filter is unknown.
    fn filter_values(&self, name: &str) -> Option<Vec<String>>;

    fn tags(&self) -> &TagMap;
}

fn wildcard(pattern: &str) -> Option<Regex> {
    if !pattern.contains(['*', '?']) {
        return None;
    }
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$")).ok()
}

fn any_match(patterns: &[String], candidates: &[String]) -> bool {
    patterns.iter().any(|pattern| match wildcard(pattern) {
        Some(re) => candidates.iter().any(|c| re.is_match(c)),
        None => candidates.iter().any(|c| c == pattern),
    })
}

fn matches<T: Filterable>(item: &T, filter: &Filter) -> Result<bool, Ec2Error> {
    let tags = item.tags();
    let candidates: Vec<String> = if let Some(key) = filter.name.strip_prefix("tag:") {
        tags.get(key).cloned().into_iter().collect()
    } else if filter.name == "tag-key" {
        tags.keys().cloned().collect()
    } else if filter.name == "tag-value" {
        tags.values().cloned().collect()
    } else {
        item.filter_values(&filter.name).ok_or_else(|| {
            Ec2Error::InvalidParameterValue(format!("The filter '{}' is invalid", filter.name))
        })?
    };
    Ok(any_match(&filter.values, &candidates))
}

/// Keeps the items that satisfy every filter.
pub fn apply<T: Filterable>(items: Vec<T>, filters: &[Filter]) -> Result<Vec<T>, Ec2Error> {
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        let mut keep = true;
        for filter in filters {
            if !matches(&item, filter)? {
                keep = false;
                break;
            }
        }
        if keep {
            kept.push(item);
        }
    }
    Ok(kept)
}

pub(crate) fn one(value: impl Into<String>) -> Option<Vec<String>> {
    Some(vec![value.into()])
}

pub(crate) fn flag(value: bool) -> Option<Vec<String>> {
    one(if value { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing {
        id: String,
        zones: Vec<String>,
        tags: TagMap,
    }

    impl Filterable for Thing {
        fn filter_values(&self, name: &str) -> Option<Vec<String>> {
            match name {
                "thing-id" => one(self.id.clone()),
                "zone" => Some(self.zones.clone()),
                _ => None,
            }
        }

        fn tags(&self) -> &TagMap {
            &self.tags
        }
    }

    fn things() -> Vec<Thing> {
        vec![
            Thing {
                id: "t-1".into(),
                zones: vec!["a".into(), "b".into()],
                tags: [("env".to_string(), "prod".to_string())].into(),
            },
            Thing {
                id: "t-2".into(),
                zones: vec![],
                tags: TagMap::new(),
            },
        ]
    }

    #[test]
    fn multi_valued_attributes_match_any() {
        let kept = apply(things(), &[Filter::new("zone", ["b", "z"])]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "t-1");
    }

    #[test]
    fn wildcards_and_tags() {
        assert_eq!(apply(things(), &[Filter::new("thing-id", ["t-*"])]).unwrap().len(), 2);
        assert_eq!(apply(things(), &[Filter::new("tag:env", ["pr?d"])]).unwrap().len(), 1);
        assert_eq!(apply(things(), &[Filter::new("tag-key", ["env"])]).unwrap().len(), 1);
        assert_eq!(apply(things(), &[Filter::new("tag-value", ["dev"])]).unwrap().len(), 0);
    }

    #[test]
    fn filters_are_anded() {
        let filters = [
            Filter::new("thing-id", ["t-1", "t-2"]),
            Filter::new("tag:env", ["prod"]),
        ];
        assert_eq!(apply(things(), &filters).unwrap().len(), 1);
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let err = apply(things(), &[Filter::new("colour", ["red"])]).err().unwrap();
        assert_eq!(
            err,
            Ec2Error::InvalidParameterValue("The filter 'colour' is invalid".into())
        );
    }
}
