//! # S3 Backend
//!
//! Bucket-level state only: buckets, their tag sets and lifecycle configurations. Objects
//! are not modelled. Bucket names are global, so one backend serves every region of an
//! account and each bucket remembers the region it was created in.

pub mod error;
pub mod lifecycle;

pub use error::*;
pub use lifecycle::*;

use backend_core::tags::{remove_keys, to_list, to_map};
use backend_core::{time, Backend, BackendEntity, ResourceStore, Scope, Tag, TagMap, TagPolicy};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub name: String,
    pub region: String,
    pub creation_date: DateTime<Utc>,
    /// `None` until a tag set is put, and again after it is deleted.
    pub tags: Option<TagMap>,
    pub lifecycle_rules: Option<Vec<LifecycleRule>>,
}

impl Bucket {
    pub fn arn(&self, partition: &str) -> String {
        format!("arn:{partition}:s3:::{}", self.name)
    }
}

fn valid_bucket_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
        && name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric())
}

impl BackendEntity for Bucket {
    type Id = String;
    type Create = String;
    type Update = Option<Vec<LifecycleRule>>;
    type Context = Scope;
    type Error = S3Error;
    const KIND: &'static str = "Bucket";

    fn id(&self) -> &String {
        &self.name
    }

    fn from_create_params(name: String, region: String, _scope: &Scope) -> Result<Self, S3Error> {
        if !valid_bucket_name(&name) {
            return Err(S3Error::InvalidBucketName(name));
        }
        Ok(Self {
            name,
            region,
            creation_date: time::now(),
            tags: None,
            lifecycle_rules: None,
        })
    }

    /// Replaces the lifecycle configuration; every rule must validate first.
    fn on_update(&mut self, rules: Option<Vec<LifecycleRule>>, _scope: &Scope) -> Result<(), S3Error> {
        if let Some(rules) = &rules {
            for rule in rules {
                rule.validate()?;
            }
        }
        self.lifecycle_rules = rules;
        Ok(())
    }

    fn not_found(name: &String, _scope: &Scope) -> S3Error {
        S3Error::NoSuchBucket(name.clone())
    }

    fn already_exists(name: &String, _scope: &Scope) -> S3Error {
        S3Error::BucketAlreadyExists(name.clone())
    }
}

#[derive(Debug)]
pub struct S3Backend {
    scope: Scope,
    buckets: ResourceStore<Bucket>,
}

impl Backend for S3Backend {
    const SERVICE: &'static str = "s3";
    const GLOBAL: bool = true;

    fn new(scope: Scope) -> Self {
        Self {
            buckets: ResourceStore::new(scope.clone()),
            scope,
        }
    }
}

impl S3Backend {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[instrument(skip(self))]
    pub fn create_bucket(&mut self, name: &str, region: &str) -> Result<Bucket, S3Error> {
        self.buckets
            .create(name.to_string(), region.to_string())
            .map(|bucket| bucket.clone())
    }

    pub fn get_bucket(&self, name: &str) -> Result<&Bucket, S3Error> {
        self.buckets.require(&name.to_string())
    }

    /// Strict: an unknown bucket is an error.
    pub fn delete_bucket(&mut self, name: &str) -> Result<(), S3Error> {
        self.buckets.delete(&name.to_string()).map(|_| ())
    }

    /// Buckets ordered by name.
    pub fn list_buckets(&self) -> Vec<&Bucket> {
        self.buckets.values().collect()
    }

    fn bucket_mut(&mut self, name: &str) -> Result<&mut Bucket, S3Error> {
        self.buckets.require_mut(&name.to_string())
    }

    /// Replaces the whole tag set.
    pub fn put_bucket_tagging(&mut self, name: &str, tags: &[Tag]) -> Result<(), S3Error> {
        TagPolicy::STANDARD.check_unique(tags)?;
        let tags = to_map(tags);
        TagPolicy::STANDARD.check_replacement(&tags)?;
        self.bucket_mut(name)?.tags = Some(tags);
        info!(bucket = name, "Bucket tagging put");
        Ok(())
    }

    pub fn get_bucket_tagging(&self, name: &str) -> Result<Vec<Tag>, S3Error> {
        self.get_bucket(name)?
            .tags
            .as_ref()
            .map(to_list)
            .ok_or(S3Error::NoSuchTagSet)
    }

    /// Deleting a tag set that was never put is not an error.
    pub fn delete_bucket_tagging(&mut self, name: &str) -> Result<(), S3Error> {
        self.bucket_mut(name)?.tags = None;
        Ok(())
    }

    /// Merges `tags` into the bucket's tag set, as the tagging API does.
    pub fn tag_bucket(&mut self, name: &str, tags: &[Tag]) -> Result<(), S3Error> {
        let bucket = self.bucket_mut(name)?;
        let merged = TagPolicy::STANDARD.merged(bucket.tags.as_ref().unwrap_or(&TagMap::new()), &to_map(tags))?;
        bucket.tags = Some(merged);
        Ok(())
    }

    pub fn untag_bucket(&mut self, name: &str, keys: &[String]) -> Result<(), S3Error> {
        if let Some(tags) = self.bucket_mut(name)?.tags.as_mut() {
            remove_keys(tags, keys);
        }
        Ok(())
    }

    #[instrument(skip(self, rules), fields(rules = rules.len()))]
    pub fn put_bucket_lifecycle_configuration(
        &mut self,
        name: &str,
        rules: Vec<LifecycleRule>,
    ) -> Result<(), S3Error> {
        self.buckets.update(&name.to_string(), Some(rules)).map(|_| ())
    }

    pub fn get_bucket_lifecycle_configuration(&self, name: &str) -> Result<&[LifecycleRule], S3Error> {
        self.get_bucket(name)?
            .lifecycle_rules
            .as_deref()
            .ok_or(S3Error::NoSuchLifecycleConfiguration)
    }

    /// Deleting a configuration that was never put is not an error.
    pub fn delete_bucket_lifecycle(&mut self, name: &str) -> Result<(), S3Error> {
        self.buckets.update(&name.to_string(), None).map(|_| ())
    }

    /// ARN and tags of every bucket with a non-empty tag set.
    pub fn tagged_resources(&self) -> Vec<(String, TagMap)> {
        self.buckets
            .values()
            .filter_map(|bucket| {
                let tags = bucket.tags.as_ref().filter(|tags| !tags.is_empty())?;
                Some((bucket.arn(&self.scope.partition), tags.clone()))
            })
            .collect()
    }
}

/// Bucket name from `arn:aws:s3:::name`.
pub fn bucket_name_from_arn(arn: &str) -> Option<&str> {
    arn.strip_prefix("arn:")?
        .splitn(5, ':')
        .nth(4)
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> S3Backend {
        S3Backend::new(Scope::new("123456789012", backend_core::GLOBAL_REGION))
    }

    #[test]
    fn bucket_names_are_unique_and_valid() {
        let mut s3 = backend();
        s3.create_bucket("bucket", "us-west-1").unwrap();
        assert_eq!(
            s3.create_bucket("bucket", "eu-west-1").unwrap_err(),
            S3Error::BucketAlreadyExists("bucket".into())
        );
        assert_eq!(s3.get_bucket("bucket").unwrap().region, "us-west-1");
        assert!(matches!(s3.create_bucket("No_Caps", "us-east-1"), Err(S3Error::InvalidBucketName(_))));
        s3.delete_bucket("bucket").unwrap();
        assert_eq!(s3.delete_bucket("bucket"), Err(S3Error::NoSuchBucket("bucket".into())));
    }

    #[test]
    fn tagging_round() {
        let mut s3 = backend();
        s3.create_bucket("bucket", "us-east-1").unwrap();
        assert_eq!(s3.get_bucket_tagging("bucket"), Err(S3Error::NoSuchTagSet));
        let duplicated = [Tag::new("k", "1"), Tag::new("k", "2")];
        assert!(matches!(s3.put_bucket_tagging("bucket", &duplicated), Err(S3Error::InvalidTag(_))));
        assert!(matches!(
            s3.put_bucket_tagging("bucket", &[Tag::new("aws:x", "1")]),
            Err(S3Error::InvalidTag(_))
        ));
        s3.put_bucket_tagging("bucket", &[Tag::new("team", "a")]).unwrap();
        assert_eq!(s3.get_bucket_tagging("bucket").unwrap(), vec![Tag::new("team", "a")]);
        s3.delete_bucket_tagging("bucket").unwrap();
        s3.delete_bucket_tagging("bucket").unwrap();
        assert_eq!(s3.get_bucket_tagging("bucket"), Err(S3Error::NoSuchTagSet));
    }

    #[test]
    fn lifecycle_is_validated_and_removable() {
        let mut s3 = backend();
        s3.create_bucket("bucket", "us-east-1").unwrap();
        let mut bad = LifecycleRule::new("r", LifecycleFilter::prefix(""));
        bad.prefix = Some("also".into());
        assert_eq!(
            s3.put_bucket_lifecycle_configuration("bucket", vec![bad]),
            Err(S3Error::MalformedXml)
        );
        let rules = vec![
            LifecycleRule::new("wholebucket", LifecycleFilter::prefix("")).expire_after(7),
            LifecycleRule::new("Tags", LifecycleFilter::tag(Tag::new("somekey", "somevalue"))).expire_after(10),
        ];
        s3.put_bucket_lifecycle_configuration("bucket", rules).unwrap();
        let ids: Vec<_> = s3
            .get_bucket_lifecycle_configuration("bucket")
            .unwrap()
            .iter()
            .filter_map(|r| r.id.as_deref())
            .collect();
        assert_eq!(ids, vec!["wholebucket", "Tags"]);
        s3.delete_bucket_lifecycle("bucket").unwrap();
        assert_eq!(
            s3.get_bucket_lifecycle_configuration("bucket"),
            Err(S3Error::NoSuchLifecycleConfiguration)
        );
    }

    #[test]
    fn arn_parsing() {
        assert_eq!(bucket_name_from_arn("arn:aws:s3:::bucket"), Some("bucket"));
        assert_eq!(bucket_name_from_arn("arn:aws:s3:::bucket/key"), None);
        assert_eq!(bucket_name_from_arn("bucket"), None);
    }
}
