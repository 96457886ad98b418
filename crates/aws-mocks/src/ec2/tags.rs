//! `CreateTags` / `DeleteTags` / `DescribeTags` over every EC2 resource kind.
//!
//! The resource kind is derived from the id prefix (`vpc-`, `subnet-`, `acl-`, `nat-`,
//! `eipalloc-`).

use super::error::Ec2Error;
use super::filters::{self, one, Filter, Filterable};
use super::Ec2Backend;
use backend_core::{Tag, TagMap, TagPolicy};
use serde::Serialize;
use tracing::info;

static NO_TAGS: TagMap = TagMap::new();

/// `resource-type` value for an id, e.g. `network-acl` for `acl-0123`.
pub fn resource_type(resource_id: &str) -> Option<&'static str> {
    let (prefix, _) = resource_id.split_once('-')?;
    match prefix {
        "vpc" => Some("vpc"),
        "subnet" => Some("subnet"),
        "acl" => Some("network-acl"),
        "nat" => Some("natgateway"),
        "eipalloc" => Some("elastic-ip"),
        _ => None,
    }
}

/// A tag to remove; without a value the key is removed whatever its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRemoval {
    pub key: String,
    pub value: Option<String>,
}

impl TagRemoval {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDescription {
    pub resource_id: String,
    pub resource_type: String,
    pub key: String,
    pub value: String,
}

impl Filterable for TagDescription {
    fn filter_values(&self, name: &str) -> Option<Vec<String>> {
        match name {
            "resource-id" => one(&self.resource_id),
            "resource-type" => one(&self.resource_type),
            "key" => one(&self.key),
            "value" => one(&self.value),
            _ => None,
        }
    }

    fn tags(&self) -> &TagMap {
        &NO_TAGS
    }
}

impl Ec2Backend {
    pub(crate) fn resource_tags(&self, resource_id: &str) -> Result<&TagMap, Ec2Error> {
        let id = resource_id.to_string();
        let tags = match resource_type(resource_id) {
            Some("vpc") => self.vpcs.get(&id).map(|r| &r.tags),
            Some("subnet") => self.subnets.get(&id).map(|r| &r.tags),
            Some("network-acl") => self.network_acls.get(&id).map(|r| &r.tags),
            Some("natgateway") => self.nat_gateways.get(&id).map(|r| &r.tags),
            Some("elastic-ip") => self.addresses.get(&id).map(|r| &r.tags),
            _ => None,
        };
        tags.ok_or_else(|| Ec2Error::InvalidId(resource_id.to_string()))
    }

    fn resource_tags_mut(&mut self, resource_id: &str) -> Result<&mut TagMap, Ec2Error> {
        let id = resource_id.to_string();
        let tags = match resource_type(resource_id) {
            Some("vpc") => self.vpcs.get_mut(&id).map(|r| &mut r.tags),
            Some("subnet") => self.subnets.get_mut(&id).map(|r| &mut r.tags),
            Some("network-acl") => self.network_acls.get_mut(&id).map(|r| &mut r.tags),
            Some("natgateway") => self.nat_gateways.get_mut(&id).map(|r| &mut r.tags),
            Some("elastic-ip") => self.addresses.get_mut(&id).map(|r| &mut r.tags),
            _ => None,
        };
        tags.ok_or_else(|| Ec2Error::InvalidId(resource_id.to_string()))
    }

    /// Adds or overwrites `tags` on every resource. Nothing is written unless all succeed.
    pub fn create_tags(&mut self, resource_ids: &[String], tags: &[Tag]) -> Result<(), Ec2Error> {
        let incoming = backend_core::tags::to_map(tags);
        let mut merged = Vec::with_capacity(resource_ids.len());
        for resource_id in resource_ids {
            let current = self.resource_tags(resource_id)?;
            merged.push(TagPolicy::STANDARD.merged(current, &incoming)?);
        }
        for (resource_id, tags) in resource_ids.iter().zip(merged) {
            *self.resource_tags_mut(resource_id)? = tags;
        }
        info!(resources = resource_ids.len(), tags = incoming.len(), "Tags created");
        Ok(())
    }

    pub fn delete_tags(&mut self, resource_ids: &[String], removals: &[TagRemoval]) -> Result<(), Ec2Error> {
        for resource_id in resource_ids {
            self.resource_tags(resource_id)?;
        }
        for resource_id in resource_ids {
            let tags = self.resource_tags_mut(resource_id)?;
            for removal in removals {
                let matches = match (&removal.value, tags.get(&removal.key)) {
                    (Some(expected), Some(actual)) => expected == actual,
                    (None, Some(_)) => true,
                    (_, None) => false,
                };
                if matches {
                    tags.remove(&removal.key);
                }
            }
        }
        Ok(())
    }

    /// Every tag of every resource, ordered by resource id then key.
    pub fn describe_tags(&self, filters: &[Filter]) -> Result<Vec<TagDescription>, Ec2Error> {
        let mut all: Vec<TagDescription> = self
            .tagged_resource_ids()
            .into_iter()
            .flat_map(|(resource_id, resource_type, tags)| {
                tags.iter()
                    .map(|(key, value)| TagDescription {
                        resource_id: resource_id.clone(),
                        resource_type: resource_type.to_string(),
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        all.sort_by(|a, b| (&a.resource_id, &a.key).cmp(&(&b.resource_id, &b.key)));
        filters::apply(all, filters)
    }

    fn tagged_resource_ids(&self) -> Vec<(String, &'static str, &TagMap)> {
        let mut out: Vec<(String, &'static str, &TagMap)> = Vec::new();
        out.extend(self.vpcs.values().map(|r| (r.vpc_id.clone(), "vpc", &r.tags)));
        out.extend(self.subnets.values().map(|r| (r.subnet_id.clone(), "subnet", &r.tags)));
        out.extend(
            self.network_acls
                .values()
                .map(|r| (r.network_acl_id.clone(), "network-acl", &r.tags)),
        );
        out.extend(
            self.nat_gateways
                .values()
                .map(|r| (r.nat_gateway_id.clone(), "natgateway", &r.tags)),
        );
        out.extend(
            self.addresses
                .values()
                .map(|r| (r.allocation_id.clone(), "elastic-ip", &r.tags)),
        );
        out
    }

    /// ARN and tags of every resource that carries at least one tag.
    pub fn tagged_resources(&self) -> Vec<(String, TagMap)> {
        self.tagged_resource_ids()
            .into_iter()
            .filter(|(_, _, tags)| !tags.is_empty())
            .map(|(id, kind, tags)| (self.resource_arn(kind, &id), tags.clone()))
            .collect()
    }

    pub fn resource_arn(&self, resource_type: &str, resource_id: &str) -> String {
        self.scope.arn("ec2", &format!("{resource_type}/{resource_id}"))
    }
}
