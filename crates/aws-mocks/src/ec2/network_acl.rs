//! Network ACLs, their numbered rule entries and subnet associations.
//!
//! Every VPC owns exactly one default ACL, created with four catch-all entries:
//! rule 100 allows and rule 32767 denies all traffic, once for egress and once for ingress.
//! Each subnet is associated with exactly one ACL at a time.

use super::error::Ec2Error;
use super::filters::{self, flag, one, Filter, Filterable};
use super::vpc::{select_ids, Cidr};
use super::Ec2Backend;
use backend_core::tags::to_map;
use backend_core::{ids, BackendEntity, Scope, Tag, TagMap, TagPolicy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument};

/// Rule number of the catch-all entries of a default ACL.
pub const DEFAULT_RULE_NUMBER: u32 = 32767;

/// Highest rule number callers may use.
pub const MAX_RULE_NUMBER: u32 = 32766;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Deny,
}

impl FromStr for RuleAction {
    type Err = Ec2Error;

    fn from_str(s: &str) -> Result<Self, Ec2Error> {
        match s {
            "allow" => Ok(RuleAction::Allow),
            "deny" => Ok(RuleAction::Deny),
            other => Err(Ec2Error::InvalidParameterValue(format!(
                "Invalid value '{other}' for ruleAction. It must be one of: allow, deny"
            ))),
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleAction::Allow => "allow",
            RuleAction::Deny => "deny",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IcmpTypeCode {
    pub icmp_type: i32,
    pub code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkAclEntry {
    pub rule_number: u32,
    /// Protocol number as a string, `-1` for all.
    pub protocol: String,
    pub rule_action: RuleAction,
    pub egress: bool,
    pub cidr_block: String,
    pub icmp_type_code: Option<IcmpTypeCode>,
    pub port_range: Option<PortRange>,
}

impl NetworkAclEntry {
    /// Entry matching all traffic in one direction.
    pub fn catch_all(rule_number: u32, rule_action: RuleAction, egress: bool) -> Self {
        Self {
            rule_number,
            protocol: "-1".to_string(),
            rule_action,
            egress,
            cidr_block: "0.0.0.0/0".to_string(),
            icmp_type_code: None,
            port_range: None,
        }
    }

    fn validate(&self) -> Result<(), Ec2Error> {
        if !(1..=MAX_RULE_NUMBER).contains(&self.rule_number) {
            return Err(Ec2Error::InvalidParameterValue(format!(
                "Invalid value '{}' for ruleNumber. It must be between 1 and {MAX_RULE_NUMBER}",
                self.rule_number
            )));
        }
        if Cidr::parse(&self.cidr_block).is_none() {
            return Err(Ec2Error::InvalidCidrBlock(self.cidr_block.clone()));
        }
        if let Some(range) = self.port_range {
            if range.from > range.to {
                return Err(Ec2Error::InvalidParameterValue(format!(
                    "Invalid port range {}-{}",
                    range.from, range.to
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkAclAssociation {
    pub association_id: String,
    pub network_acl_id: String,
    pub subnet_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkAcl {
    pub network_acl_id: String,
    pub vpc_id: String,
    pub owner_id: String,
    pub is_default: bool,
    pub entries: Vec<NetworkAclEntry>,
    pub associations: BTreeMap<String, NetworkAclAssociation>,
    pub tags: TagMap,
}

#[derive(Debug, Clone)]
pub struct NetworkAclCreate {
    pub vpc_id: String,
    pub is_default: bool,
    pub tags: Vec<Tag>,
}

impl NetworkAcl {
    fn find_entry(&self, rule_number: u32, egress: bool) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.rule_number == rule_number && e.egress == egress)
    }

    pub fn entry(&self, rule_number: u32, egress: bool) -> Option<&NetworkAclEntry> {
        self.find_entry(rule_number, egress).map(|i| &self.entries[i])
    }

    fn add_entry(&mut self, entry: NetworkAclEntry) -> Result<(), Ec2Error> {
        if self.find_entry(entry.rule_number, entry.egress).is_some() {
            return Err(Ec2Error::NetworkAclEntryAlreadyExists(entry.rule_number));
        }
        self.entries.push(entry);
        Ok(())
    }

    fn remove_entry(&mut self, rule_number: u32, egress: bool) -> Result<NetworkAclEntry, Ec2Error> {
        let index = self
            .find_entry(rule_number, egress)
            .ok_or(Ec2Error::NetworkAclEntryNotFound {
                rule_number,
                egress,
            })?;
        Ok(self.entries.remove(index))
    }
}

impl BackendEntity for NetworkAcl {
    type Id = String;
    type Create = NetworkAclCreate;
    type Update = TagMap;
    type Context = Scope;
    type Error = Ec2Error;
    const KIND: &'static str = "NetworkAcl";

    fn id(&self) -> &String {
        &self.network_acl_id
    }

    fn from_create_params(
        network_acl_id: String,
        params: NetworkAclCreate,
        scope: &Scope,
    ) -> Result<Self, Ec2Error> {
        let tags = to_map(&params.tags);
        TagPolicy::STANDARD.check_replacement(&tags)?;
        let entries = if params.is_default {
            vec![
                NetworkAclEntry::catch_all(100, RuleAction::Allow, true),
                NetworkAclEntry::catch_all(DEFAULT_RULE_NUMBER, RuleAction::Deny, true),
                NetworkAclEntry::catch_all(100, RuleAction::Allow, false),
                NetworkAclEntry::catch_all(DEFAULT_RULE_NUMBER, RuleAction::Deny, false),
            ]
        } else {
            Vec::new()
        };
        Ok(Self {
            network_acl_id,
            vpc_id: params.vpc_id,
            owner_id: scope.account_id.clone(),
            is_default: params.is_default,
            entries,
            associations: BTreeMap::new(),
            tags,
        })
    }

    fn on_update(&mut self, tags: TagMap, _scope: &Scope) -> Result<(), Ec2Error> {
        self.tags = tags;
        Ok(())
    }

    fn on_delete(&self, _scope: &Scope) -> Result<(), Ec2Error> {
        if self.is_default {
            return Err(Ec2Error::InvalidParameterValue(format!(
                "cannot delete default network ACL {}",
                self.network_acl_id
            )));
        }
        if !self.associations.is_empty() {
            return Err(Ec2Error::DependencyViolation(format!(
                "The networkAcl '{}' has dependencies and cannot be deleted.",
                self.network_acl_id
            )));
        }
        Ok(())
    }

    fn not_found(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::NetworkAclNotFound(id.clone())
    }

    fn already_exists(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::InvalidParameterValue(format!("Network ACL {id} already exists"))
    }
}

impl Filterable for NetworkAcl {
    fn filter_values(&self, name: &str) -> Option<Vec<String>> {
        match name {
            "default" => flag(self.is_default),
            "vpc-id" => one(&self.vpc_id),
            "network-acl-id" | "association.network-acl-id" => one(&self.network_acl_id),
            "association.subnet-id" => Some(
                self.associations
                    .values()
                    .map(|a| a.subnet_id.clone())
                    .collect(),
            ),
            "association.association-id" => Some(self.associations.keys().cloned().collect()),
            "owner-id" => one(&self.owner_id),
            "entry.rule-number" => Some(
                self.entries
                    .iter()
                    .map(|e| e.rule_number.to_string())
                    .collect(),
            ),
            "entry.rule-action" => Some(
                self.entries
                    .iter()
                    .map(|e| e.rule_action.to_string())
                    .collect(),
            ),
            _ => None,
        }
    }

    fn tags(&self) -> &TagMap {
        &self.tags
    }
}

impl Ec2Backend {
    pub(crate) fn create_network_acl_inner(
        &mut self,
        vpc_id: &str,
        tags: Vec<Tag>,
        is_default: bool,
    ) -> Result<NetworkAcl, Ec2Error> {
        self.get_vpc(vpc_id)?;
        let params = NetworkAclCreate {
            vpc_id: vpc_id.to_string(),
            is_default,
            tags,
        };
        let acl = self
            .network_acls
            .create(ids::resource_id("acl"), params)?;
        Ok(acl.clone())
    }

    /// Creates a non-default, empty ACL in `vpc_id`.
    #[instrument(skip(self, tags))]
    pub fn create_network_acl(&mut self, vpc_id: &str, tags: Vec<Tag>) -> Result<NetworkAcl, Ec2Error> {
        self.create_network_acl_inner(vpc_id, tags, false)
    }

    pub fn get_network_acl(&self, network_acl_id: &str) -> Result<&NetworkAcl, Ec2Error> {
        self.network_acls.require(&network_acl_id.to_string())
    }

    /// The default ACL of `vpc_id`.
    pub fn default_network_acl(&self, vpc_id: &str) -> Result<&NetworkAcl, Ec2Error> {
        self.network_acls
            .values()
            .find(|acl| acl.is_default && acl.vpc_id == vpc_id)
            .ok_or_else(|| Ec2Error::VpcNotFound(vpc_id.to_string()))
    }

    #[instrument(skip(self))]
    pub fn delete_network_acl(&mut self, network_acl_id: &str) -> Result<NetworkAcl, Ec2Error> {
        self.network_acls.delete(&network_acl_id.to_string())
    }

    pub fn describe_network_acls(
        &self,
        network_acl_ids: &[String],
        filters: &[Filter],
    ) -> Result<Vec<NetworkAcl>, Ec2Error> {
        let selected = select_ids(
            self.network_acls.values().cloned(),
            network_acl_ids,
            Ec2Error::NetworkAclNotFound,
        )?;
        filters::apply(selected, filters)
    }

    #[instrument(skip(self, entry), fields(rule_number = entry.rule_number, egress = entry.egress))]
    pub fn create_network_acl_entry(
        &mut self,
        network_acl_id: &str,
        entry: NetworkAclEntry,
    ) -> Result<NetworkAclEntry, Ec2Error> {
        entry.validate()?;
        let acl = self.network_acls.require_mut(&network_acl_id.to_string())?;
        acl.add_entry(entry.clone())?;
        info!(network_acl_id, entries = acl.entries.len(), "Entry created");
        Ok(entry)
    }

    #[instrument(skip(self))]
    pub fn delete_network_acl_entry(
        &mut self,
        network_acl_id: &str,
        rule_number: u32,
        egress: bool,
    ) -> Result<NetworkAclEntry, Ec2Error> {
        let acl = self.network_acls.require_mut(&network_acl_id.to_string())?;
        acl.remove_entry(rule_number, egress)
    }

    /// Swaps the entry with the same rule number and direction for `entry`.
    #[instrument(skip(self, entry), fields(rule_number = entry.rule_number, egress = entry.egress))]
    pub fn replace_network_acl_entry(
        &mut self,
        network_acl_id: &str,
        entry: NetworkAclEntry,
    ) -> Result<NetworkAclEntry, Ec2Error> {
        entry.validate()?;
        let acl = self.network_acls.require_mut(&network_acl_id.to_string())?;
        let index = acl.find_entry(entry.rule_number, entry.egress).ok_or(
            Ec2Error::NetworkAclEntryNotFound {
                rule_number: entry.rule_number,
                egress: entry.egress,
            },
        )?;
        acl.entries[index] = entry.clone();
        Ok(entry)
    }

    /// Moves the subnet of `association_id` to `network_acl_id` under a new association id.
    #[instrument(skip(self))]
    pub fn replace_network_acl_association(
        &mut self,
        association_id: &str,
        network_acl_id: &str,
    ) -> Result<NetworkAclAssociation, Ec2Error> {
        let target_id = network_acl_id.to_string();
        self.network_acls.require(&target_id)?;

        let source_id = self
            .network_acls
            .values()
            .find(|acl| acl.associations.contains_key(association_id))
            .map(|acl| acl.network_acl_id.clone())
            .ok_or_else(|| Ec2Error::AssociationNotFound(association_id.to_string()))?;

        let previous = self
            .network_acls
            .require_mut(&source_id)?
            .associations
            .remove(association_id)
            .ok_or_else(|| Ec2Error::AssociationNotFound(association_id.to_string()))?;

        let association = NetworkAclAssociation {
            association_id: ids::resource_id("aclassoc"),
            network_acl_id: target_id.clone(),
            subnet_id: previous.subnet_id,
        };
        self.network_acls
            .require_mut(&target_id)?
            .associations
            .insert(association.association_id.clone(), association.clone());
        info!(
            subnet_id = %association.subnet_id,
            from = %source_id,
            to = %target_id,
            "Association replaced"
        );
        Ok(association)
    }

    /// Associates `subnet_id` with the default ACL of `vpc_id`.
    pub fn associate_default_network_acl_with_subnet(
        &mut self,
        subnet_id: &str,
        vpc_id: &str,
    ) -> Result<NetworkAclAssociation, Ec2Error> {
        let acl_id = self.default_network_acl(vpc_id)?.network_acl_id.clone();
        let association = NetworkAclAssociation {
            association_id: ids::resource_id("aclassoc"),
            network_acl_id: acl_id.clone(),
            subnet_id: subnet_id.to_string(),
        };
        self.network_acls
            .require_mut(&acl_id)?
            .associations
            .insert(association.association_id.clone(), association.clone());
        Ok(association)
    }

    /// The association currently linking `subnet_id` to an ACL.
    pub fn subnet_association(&self, subnet_id: &str) -> Option<&NetworkAclAssociation> {
        self.network_acls
            .values()
            .flat_map(|acl| acl.associations.values())
            .find(|assoc| assoc.subnet_id == subnet_id)
    }
}
