//! # Resource Groups Tagging API
//!
//! A cross-service view over the tags of one account and region. It owns no state: every
//! call reads or writes the tags held by the service backends, which are handed in as
//! [`TaggedResourceSource`] trait objects.
//!
//! ```
//! use aws_mocks::codepipeline::CodePipelineBackend;
//! use aws_mocks::sns::{SnsBackend, TopicCreate};
//! use aws_mocks::tagging::{ResourceQuery, ResourceTagging, TaggedResourceSource};
//! use backend_core::{Backend, PageRequest, Scope, Tag};
//!
//! let scope = Scope::new("123456789012", "us-east-1");
//! let mut sns = SnsBackend::new(scope.clone());
//! let mut pipelines = CodePipelineBackend::new(scope);
//! let tagged = TopicCreate { tags: vec![Tag::new("env", "prod")], ..Default::default() };
//! sns.create_topic("alerts", tagged).unwrap();
//!
//! let sns_source: &mut dyn TaggedResourceSource = &mut sns;
//! let pipeline_source: &mut dyn TaggedResourceSource = &mut pipelines;
//! let tagging = ResourceTagging::new(vec![sns_source, pipeline_source]);
//! let page = tagging
//!     .get_resources(&ResourceQuery::default().tag("env", ["prod"]), &PageRequest::default())
//!     .unwrap();
//! assert_eq!(page.items[0].resource_arn, "arn:aws:sns:us-east-1:123456789012:alerts");
//! ```

pub mod error;
pub mod sources;

pub use error::*;

use backend_core::ids::ParsedArn;
use backend_core::tags::{matches_filter, to_list};
use backend_core::{paginate, ErrorDetails, Page, PageLimits, PageRequest, Tag, TagMap};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

const RESOURCES_PAGE: PageLimits = PageLimits::new(50, 100);
const TAG_PAGE: PageLimits = PageLimits::new(50, 50);

/// Most ARNs one `tag_resources` / `untag_resources` call may name.
pub const MAX_ARNS_PER_CALL: usize = 20;

/// A backend whose resources carry tags reachable by ARN.
pub trait TaggedResourceSource {
    /// Service segment of the ARNs this backend owns.
    fn service(&self) -> &'static str;

    /// ARN and tags of each resource that has at least one tag.
    fn tagged_resources(&self) -> Vec<(String, TagMap)>;

    fn tag(&mut self, arn: &str, tags: &[Tag]) -> Result<(), ErrorDetails>;

    fn untag(&mut self, arn: &str, keys: &[String]) -> Result<(), ErrorDetails>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagFilter {
    pub key: String,
    /// Empty means any value.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceQuery {
    /// `service` or `service:type`, e.g. `ec2` or `ec2:vpc`.
    pub resource_type_filters: Vec<String>,
    pub tag_filters: Vec<TagFilter>,
}

impl ResourceQuery {
    pub fn resource_type(mut self, filter: impl Into<String>) -> Self {
        self.resource_type_filters.push(filter.into());
        self
    }

    pub fn tag<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_filters.push(TagFilter {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    fn type_matches(&self, arn: &str) -> bool {
        if self.resource_type_filters.is_empty() {
            return true;
        }
        let Some(parsed) = ParsedArn::parse(arn) else {
            return false;
        };
        let qualified = parsed
            .resource_type()
            .map(|kind| format!("{}:{kind}", parsed.service));
        self.resource_type_filters
            .iter()
            .any(|f| f == parsed.service || Some(f) == qualified.as_ref())
    }

    /// Every tag filter must match; within one filter any listed value will do.
    fn tags_match(&self, tags: &TagMap) -> bool {
        self.tag_filters
            .iter()
            .all(|f| matches_filter(tags, &f.key, &f.values))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceTagMapping {
    pub resource_arn: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedResource {
    pub status_code: u16,
    pub error_code: String,
    pub error_message: String,
}

impl FailedResource {
    fn unsupported(service: &str) -> Self {
        Self {
            status_code: 500,
            error_code: "InternalServiceException".to_string(),
            error_message: format!("Service not supported: {service}"),
        }
    }

    fn rejected(details: ErrorDetails) -> Self {
        Self {
            status_code: 400,
            error_code: "InvalidParameterException".to_string(),
            error_message: details.message,
        }
    }
}

/// Tagging operations over the backends of one account and region.
pub struct ResourceTagging<'a> {
    sources: Vec<&'a mut dyn TaggedResourceSource>,
}

impl<'a> ResourceTagging<'a> {
    pub fn new(sources: Vec<&'a mut dyn TaggedResourceSource>) -> Self {
        Self { sources }
    }

    fn all_tagged(&self) -> Vec<(String, TagMap)> {
        self.sources
            .iter()
            .flat_map(|source| source.tagged_resources())
            .collect()
    }

    /// Tagged resources matching `query`, ordered by ARN.
    pub fn get_resources(
        &self,
        query: &ResourceQuery,
        request: &PageRequest,
    ) -> Result<Page<ResourceTagMapping>, TaggingError> {
        let matching: Vec<ResourceTagMapping> = self
            .all_tagged()
            .into_iter()
            .filter(|(arn, tags)| query.type_matches(arn) && query.tags_match(tags))
            .map(|(resource_arn, tags)| ResourceTagMapping {
                resource_arn,
                tags: to_list(&tags),
            })
            .collect();
        debug!(matching = matching.len(), "GetResources");
        Ok(paginate(matching, request, RESOURCES_PAGE, query, |m| {
            m.resource_arn.clone()
        })?)
    }

    /// Distinct tag keys in use, sorted.
    pub fn get_tag_keys(&self, request: &PageRequest) -> Result<Page<String>, TaggingError> {
        let keys: BTreeSet<String> = self
            .all_tagged()
            .into_iter()
            .flat_map(|(_, tags)| tags.into_keys())
            .collect();
        Ok(paginate(keys.into_iter().collect(), request, TAG_PAGE, &(), String::clone)?)
    }

    /// Distinct values of `key`, sorted.
    pub fn get_tag_values(&self, key: &str, request: &PageRequest) -> Result<Page<String>, TaggingError> {
        let values: BTreeSet<String> = self
            .all_tagged()
            .into_iter()
            .filter_map(|(_, mut tags)| tags.remove(key))
            .collect();
        Ok(paginate(values.into_iter().collect(), request, TAG_PAGE, key, String::clone)?)
    }

    fn check_arn_count(arns: &[String]) -> Result<(), TaggingError> {
        if arns.is_empty() || arns.len() > MAX_ARNS_PER_CALL {
            return Err(TaggingError::InvalidParameter(format!(
                "ResourceARNList must contain between 1 and {MAX_ARNS_PER_CALL} ARNs"
            )));
        }
        Ok(())
    }

    /// Runs `op` against the owner of each ARN and collects the failures.
    fn for_each_arn<F>(&mut self, arns: &[String], mut op: F) -> BTreeMap<String, FailedResource>
    where
        F: FnMut(&mut dyn TaggedResourceSource, &str) -> Result<(), ErrorDetails>,
    {
        let mut failed = BTreeMap::new();
        for arn in arns {
            let service = ParsedArn::parse(arn).map(|p| p.service).unwrap_or_default();
            let owner = self.sources.iter_mut().find(|s| s.service() == service);
            let outcome = match owner {
                None => Err(FailedResource::unsupported(service)),
                Some(source) => op(&mut **source, arn).map_err(FailedResource::rejected),
            };
            if let Err(failure) = outcome {
                warn!(%arn, code = %failure.error_code, "Tagging failed");
                failed.insert(arn.clone(), failure);
            }
        }
        failed
    }

    /// Adds `tags` to every ARN; the returned map holds the ARNs that could not be tagged.
    pub fn tag_resources(
        &mut self,
        arns: &[String],
        tags: &[Tag],
    ) -> Result<BTreeMap<String, FailedResource>, TaggingError> {
        Self::check_arn_count(arns)?;
        Ok(self.for_each_arn(arns, |source, arn| source.tag(arn, tags)))
    }

    pub fn untag_resources(
        &mut self,
        arns: &[String],
        keys: &[String],
    ) -> Result<BTreeMap<String, FailedResource>, TaggingError> {
        Self::check_arn_count(arns)?;
        Ok(self.for_each_arn(arns, |source, arn| source.untag(arn, keys)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_filters_accept_service_or_qualified_type() {
        let vpc = "arn:aws:ec2:us-east-1:123456789012:vpc/vpc-1";
        assert!(ResourceQuery::default().type_matches(vpc));
        assert!(ResourceQuery::default().resource_type("ec2").type_matches(vpc));
        assert!(ResourceQuery::default().resource_type("ec2:vpc").type_matches(vpc));
        assert!(!ResourceQuery::default().resource_type("ec2:subnet").type_matches(vpc));
        assert!(!ResourceQuery::default().resource_type("sns").type_matches(vpc));
    }

    #[test]
    fn tag_filters_and_across_keys() {
        let tags: TagMap = [("env", "prod"), ("team", "a")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let both = ResourceQuery::default().tag("env", ["prod", "dev"]).tag("team", Vec::<String>::new());
        assert!(both.tags_match(&tags));
        let wrong_value = ResourceQuery::default().tag("env", ["dev"]);
        assert!(!wrong_value.tags_match(&tags));
        let missing_key = ResourceQuery::default().tag("owner", Vec::<String>::new());
        assert!(!missing_key.tags_match(&tags));
    }
}
