//! Bucket lifecycle rules and the schema checks S3 reports as `MalformedXML`.

use super::error::S3Error;
use backend_core::Tag;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleAnd {
    pub prefix: Option<String>,
    pub tags: Vec<Tag>,
}

/// At most one of the three members may be set. An empty filter covers the whole bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleFilter {
    pub prefix: Option<String>,
    pub tag: Option<Tag>,
    pub and: Option<LifecycleAnd>,
}

impl LifecycleFilter {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    pub fn tag(tag: Tag) -> Self {
        Self {
            tag: Some(tag),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Expiration {
    pub days: Option<u32>,
    pub date: Option<String>,
    pub expired_object_delete_marker: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub days: Option<u32>,
    pub date: Option<String>,
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoncurrentVersionTransition {
    pub noncurrent_days: Option<u32>,
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleRule {
    pub id: Option<String>,
    pub status: String,
    /// Legacy rule-level prefix; exclusive with `filter`.
    pub prefix: Option<String>,
    pub filter: Option<LifecycleFilter>,
    pub expiration: Option<Expiration>,
    pub transitions: Vec<Transition>,
    pub noncurrent_version_transitions: Vec<NoncurrentVersionTransition>,
    pub noncurrent_version_expiration_days: Option<u32>,
    pub abort_incomplete_multipart_upload_days: Option<u32>,
}

impl LifecycleRule {
    /// An enabled rule with the given filter and nothing else.
    pub fn new(id: impl Into<String>, filter: LifecycleFilter) -> Self {
        Self {
            id: Some(id.into()),
            status: "Enabled".to_string(),
            prefix: None,
            filter: Some(filter),
            expiration: None,
            transitions: Vec::new(),
            noncurrent_version_transitions: Vec::new(),
            noncurrent_version_expiration_days: None,
            abort_incomplete_multipart_upload_days: None,
        }
    }

    pub fn expire_after(mut self, days: u32) -> Self {
        self.expiration = Some(Expiration {
            days: Some(days),
            ..Expiration::default()
        });
        self
    }

    pub fn validate(&self) -> Result<(), S3Error> {
        if self.status != "Enabled" && self.status != "Disabled" {
            return Err(S3Error::MalformedXml);
        }
        match (&self.prefix, &self.filter) {
            (Some(_), Some(_)) | (None, None) => return Err(S3Error::MalformedXml),
            (None, Some(filter)) => {
                let members = [filter.prefix.is_some(), filter.tag.is_some(), filter.and.is_some()];
                if members.iter().filter(|set| **set).count() > 1 {
                    return Err(S3Error::MalformedXml);
                }
            }
            (Some(_), None) => {}
        }
        if let Some(expiration) = &self.expiration {
            let dated = expiration.days.is_some() || expiration.date.is_some();
            if expiration.expired_object_delete_marker.is_some() && dated {
                return Err(S3Error::MalformedXml);
            }
        }
        for transition in &self.transitions {
            let timed = usize::from(transition.days.is_some()) + usize::from(transition.date.is_some());
            if transition.storage_class.is_none() || timed != 1 {
                return Err(S3Error::MalformedXml);
            }
        }
        for transition in &self.noncurrent_version_transitions {
            if transition.noncurrent_days.is_none() || transition.storage_class.is_none() {
                return Err(S3Error::MalformedXml);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whole_bucket() -> LifecycleRule {
        LifecycleRule::new("wholebucket", LifecycleFilter::prefix("")).expire_after(7)
    }

    #[test]
    fn filter_and_prefix_are_exclusive() {
        assert_eq!(whole_bucket().validate(), Ok(()));

        let mut rule = whole_bucket();
        rule.filter = Some(LifecycleFilter::default());
        assert_eq!(rule.validate(), Ok(()));

        rule.filter = None;
        assert_eq!(rule.validate(), Err(S3Error::MalformedXml));

        rule.prefix = Some("some/path".into());
        assert_eq!(rule.validate(), Ok(()));

        rule.filter = Some(LifecycleFilter::prefix(""));
        assert_eq!(rule.validate(), Err(S3Error::MalformedXml));
    }

    #[test]
    fn filter_takes_one_member() {
        let mut rule = whole_bucket();
        rule.filter = Some(LifecycleFilter {
            prefix: Some("some/prefix".into()),
            tag: Some(Tag::new("mytag", "mytagvalue")),
            and: None,
        });
        assert_eq!(rule.validate(), Err(S3Error::MalformedXml));
    }

    #[test]
    fn delete_marker_excludes_dates() {
        let mut rule = whole_bucket();
        rule.expiration = Some(Expiration {
            expired_object_delete_marker: Some(false),
            ..Expiration::default()
        });
        assert_eq!(rule.validate(), Ok(()));
        if let Some(expiration) = rule.expiration.as_mut() {
            expiration.days = Some(7);
        }
        assert_eq!(rule.validate(), Err(S3Error::MalformedXml));
    }

    #[test]
    fn transitions_need_their_children() {
        let mut rule = whole_bucket();
        rule.noncurrent_version_transitions = vec![NoncurrentVersionTransition {
            noncurrent_days: Some(30),
            storage_class: None,
        }];
        assert_eq!(rule.validate(), Err(S3Error::MalformedXml));

        rule.noncurrent_version_transitions.clear();
        rule.transitions = vec![Transition {
            days: Some(1),
            date: Some("2015-01-01T00:00:00Z".into()),
            storage_class: Some("GLACIER".into()),
        }];
        assert_eq!(rule.validate(), Err(S3Error::MalformedXml));
    }
}
