//! VPCs and subnets.
//!
//! Creating a VPC also creates its default network ACL; creating a subnet associates it with
//! that ACL. A VPC with subnets cannot be deleted.

use super::error::Ec2Error;
use super::filters::{self, flag, one, Filter, Filterable};
use super::Ec2Backend;
use backend_core::tags::to_map;
use backend_core::{ids, BackendEntity, Scope, Tag, TagMap, TagPolicy};
use rand::Rng;
use serde::Serialize;
use std::net::Ipv4Addr;
use tracing::{instrument, warn};

/// An IPv4 block in `a.b.c.d/len` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub network: Ipv4Addr,
    pub prefix: u8,
}

impl Cidr {
    pub fn parse(block: &str) -> Option<Self> {
        let (addr, prefix) = block.split_once('/')?;
        let addr: Ipv4Addr = addr.parse().ok()?;
        let prefix: u8 = prefix.parse().ok()?;
        if prefix > 32 {
            return None;
        }
        let network = Ipv4Addr::from(u32::from(addr) & Self::mask(prefix));
        Some(Self { network, prefix })
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix))
        }
    }

    /// Whether `other` lies entirely inside this block.
    pub fn contains(&self, other: &Cidr) -> bool {
        other.prefix >= self.prefix
            && u32::from(other.network) & Self::mask(self.prefix) == u32::from(self.network)
    }

    /// A random host address inside the block, skipping the first four addresses.
    pub fn random_host(&self) -> Ipv4Addr {
        let size = 1u64 << (32 - u32::from(self.prefix));
        let base = u64::from(u32::from(self.network));
        let offset = if size > 5 {
            rand::thread_rng().gen_range(4..size - 1)
        } else {
            0
        };
        Ipv4Addr::from((base + offset) as u32)
    }
}

fn parse_vpc_cidr(block: &str) -> Result<Cidr, Ec2Error> {
    match Cidr::parse(block) {
        Some(cidr) if (16..=28).contains(&cidr.prefix) => Ok(cidr),
        _ => Err(Ec2Error::InvalidCidrBlock(block.to_string())),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Vpc {
    pub vpc_id: String,
    pub cidr_block: String,
    pub state: String,
    pub owner_id: String,
    pub is_default: bool,
    pub tags: TagMap,
}

#[derive(Debug, Clone)]
pub struct VpcCreate {
    pub cidr_block: String,
    pub tags: Vec<Tag>,
}

impl BackendEntity for Vpc {
    type Id = String;
    type Create = VpcCreate;
    type Update = TagMap;
    type Context = Scope;
    type Error = Ec2Error;
    const KIND: &'static str = "Vpc";

    fn id(&self) -> &String {
        &self.vpc_id
    }

    fn from_create_params(vpc_id: String, params: VpcCreate, scope: &Scope) -> Result<Self, Ec2Error> {
        let cidr = parse_vpc_cidr(&params.cidr_block)?;
        let tags = to_map(&params.tags);
        TagPolicy::STANDARD.check_replacement(&tags)?;
        Ok(Self {
            vpc_id,
            cidr_block: format!("{}/{}", cidr.network, cidr.prefix),
            state: "available".to_string(),
            owner_id: scope.account_id.clone(),
            is_default: false,
            tags,
        })
    }

    fn on_update(&mut self, tags: TagMap, _scope: &Scope) -> Result<(), Ec2Error> {
        self.tags = tags;
        Ok(())
    }

    fn not_found(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::VpcNotFound(id.clone())
    }

    fn already_exists(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::InvalidParameterValue(format!("VPC {id} already exists"))
    }
}

impl Filterable for Vpc {
    fn filter_values(&self, name: &str) -> Option<Vec<String>> {
        match name {
            "vpc-id" => one(&self.vpc_id),
            "cidr" | "cidr-block" | "cidrBlock" => one(&self.cidr_block),
            "state" => one(&self.state),
            "owner-id" => one(&self.owner_id),
            "is-default" | "isDefault" => flag(self.is_default),
            _ => None,
        }
    }

    fn tags(&self) -> &TagMap {
        &self.tags
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Subnet {
    pub subnet_id: String,
    pub vpc_id: String,
    pub cidr_block: String,
    pub availability_zone: String,
    pub state: String,
    pub owner_id: String,
    pub available_ip_address_count: u32,
    pub tags: TagMap,
}

#[derive(Debug, Clone)]
pub struct SubnetCreate {
    pub vpc_id: String,
    pub cidr_block: String,
    pub availability_zone: Option<String>,
    pub tags: Vec<Tag>,
}

impl BackendEntity for Subnet {
    type Id = String;
    type Create = (Cidr, SubnetCreate);
    type Update = TagMap;
    type Context = Scope;
    type Error = Ec2Error;
    const KIND: &'static str = "Subnet";

    fn id(&self) -> &String {
        &self.subnet_id
    }

    fn from_create_params(
        subnet_id: String,
        (cidr, params): (Cidr, SubnetCreate),
        scope: &Scope,
    ) -> Result<Self, Ec2Error> {
        let tags = to_map(&params.tags);
        TagPolicy::STANDARD.check_replacement(&tags)?;
        let size = 1u64 << (32 - u32::from(cidr.prefix));
        Ok(Self {
            subnet_id,
            vpc_id: params.vpc_id,
            cidr_block: format!("{}/{}", cidr.network, cidr.prefix),
            availability_zone: params
                .availability_zone
                .unwrap_or_else(|| format!("{}a", scope.region)),
            state: "available".to_string(),
            owner_id: scope.account_id.clone(),
            // AWS reserves five addresses per subnet.
            available_ip_address_count: size.saturating_sub(5) as u32,
            tags,
        })
    }

    fn on_update(&mut self, tags: TagMap, _scope: &Scope) -> Result<(), Ec2Error> {
        self.tags = tags;
        Ok(())
    }

    fn not_found(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::SubnetNotFound(id.clone())
    }

    fn already_exists(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::InvalidParameterValue(format!("Subnet {id} already exists"))
    }
}

impl Filterable for Subnet {
    fn filter_values(&self, name: &str) -> Option<Vec<String>> {
        match name {
            "subnet-id" => one(&self.subnet_id),
            "vpc-id" => one(&self.vpc_id),
            "cidr" | "cidr-block" | "cidrBlock" => one(&self.cidr_block),
            "availability-zone" | "availabilityZone" => one(&self.availability_zone),
            "state" => one(&self.state),
            "owner-id" => one(&self.owner_id),
            _ => None,
        }
    }

    fn tags(&self) -> &TagMap {
        &self.tags
    }
}

/// Fails with `not_found(id)` for the first requested id that is absent.
pub(crate) fn select_ids<T: BackendEntity<Id = String>>(
    all: impl Iterator<Item = T>,
    ids: &[String],
    not_found: impl Fn(String) -> Ec2Error,
) -> Result<Vec<T>, Ec2Error> {
    if ids.is_empty() {
        return Ok(all.collect());
    }
    let selected: Vec<T> = all.filter(|item| ids.contains(item.id())).collect();
    if let Some(missing) = ids
        .iter()
        .find(|id| !selected.iter().any(|item| item.id() == *id))
    {
        return Err(not_found(missing.clone()));
    }
    Ok(selected)
}

impl Ec2Backend {
    /// Creates a VPC together with its default network ACL.
    #[instrument(skip(self, tags), fields(region = %self.scope.region))]
    pub fn create_vpc(&mut self, cidr_block: &str, tags: Vec<Tag>) -> Result<Vpc, Ec2Error> {
        let vpc_id = ids::resource_id("vpc");
        let params = VpcCreate {
            cidr_block: cidr_block.to_string(),
            tags,
        };
        let vpc = self.vpcs.create(vpc_id.clone(), params)?.clone();
        self.create_network_acl_inner(&vpc_id, Vec::new(), true)?;
        Ok(vpc)
    }

    pub fn get_vpc(&self, vpc_id: &str) -> Result<&Vpc, Ec2Error> {
        self.vpcs.require(&vpc_id.to_string())
    }

    pub fn describe_vpcs(&self, vpc_ids: &[String], filters: &[Filter]) -> Result<Vec<Vpc>, Ec2Error> {
        let selected = select_ids(self.vpcs.values().cloned(), vpc_ids, Ec2Error::VpcNotFound)?;
        filters::apply(selected, filters)
    }

    /// Removes the VPC and its network ACLs. Refused while subnets remain.
    #[instrument(skip(self))]
    pub fn delete_vpc(&mut self, vpc_id: &str) -> Result<(), Ec2Error> {
        let id = vpc_id.to_string();
        self.vpcs.require(&id)?;
        if self.subnets.values().any(|s| s.vpc_id == vpc_id) {
            warn!(vpc_id, "VPC still has subnets");
            return Err(Ec2Error::DependencyViolation(format!(
                "The vpc '{vpc_id}' has dependencies and cannot be deleted."
            )));
        }
        self.network_acls.retain(|acl| acl.vpc_id != vpc_id);
        self.vpcs.delete(&id)?;
        Ok(())
    }

    /// Creates a subnet inside `vpc_id` and associates it with the VPC's default ACL.
    #[instrument(skip(self, params), fields(vpc_id = %params.vpc_id))]
    pub fn create_subnet(&mut self, params: SubnetCreate) -> Result<Subnet, Ec2Error> {
        let vpc = self.get_vpc(&params.vpc_id)?;
        let cidr = Cidr::parse(&params.cidr_block)
            .ok_or_else(|| Ec2Error::InvalidCidrBlock(params.cidr_block.clone()))?;
        let vpc_cidr = parse_vpc_cidr(&vpc.cidr_block)?;
        if !vpc_cidr.contains(&cidr) {
            return Err(Ec2Error::InvalidSubnetRange(params.cidr_block.clone()));
        }
        let overlaps = self
            .subnets
            .values()
            .filter(|s| s.vpc_id == params.vpc_id)
            .filter_map(|s| Cidr::parse(&s.cidr_block))
            .any(|existing| existing.contains(&cidr) || cidr.contains(&existing));
        if overlaps {
            return Err(Ec2Error::InvalidParameterValue(format!(
                "The CIDR '{}' conflicts with another subnet",
                params.cidr_block
            )));
        }

        let subnet_id = ids::resource_id("subnet");
        let vpc_id = params.vpc_id.clone();
        let subnet = self.subnets.create(subnet_id.clone(), (cidr, params))?.clone();
        self.associate_default_network_acl_with_subnet(&subnet_id, &vpc_id)?;
        Ok(subnet)
    }

    pub fn get_subnet(&self, subnet_id: &str) -> Result<&Subnet, Ec2Error> {
        self.subnets.require(&subnet_id.to_string())
    }

    pub fn describe_subnets(
        &self,
        subnet_ids: &[String],
        filters: &[Filter],
    ) -> Result<Vec<Subnet>, Ec2Error> {
        let selected = select_ids(
            self.subnets.values().cloned(),
            subnet_ids,
            Ec2Error::SubnetNotFound,
        )?;
        filters::apply(selected, filters)
    }

    /// Removes the subnet and its ACL association. Refused while a NAT gateway uses it.
    #[instrument(skip(self))]
    pub fn delete_subnet(&mut self, subnet_id: &str) -> Result<(), Ec2Error> {
        let id = subnet_id.to_string();
        self.subnets.require(&id)?;
        if self.nat_gateways.values().any(|gw| gw.subnet_id == subnet_id) {
            return Err(Ec2Error::DependencyViolation(format!(
                "The subnet '{subnet_id}' has dependencies and cannot be deleted."
            )));
        }
        for acl in self.network_acls.values_mut() {
            acl.associations.retain(|_, assoc| assoc.subnet_id != subnet_id);
        }
        self.subnets.delete(&id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_parsing_and_containment() {
        let vpc = Cidr::parse("10.0.0.0/16").unwrap();
        let subnet = Cidr::parse("10.0.1.0/24").unwrap();
        assert!(vpc.contains(&subnet));
        assert!(!subnet.contains(&vpc));
        assert!(!vpc.contains(&Cidr::parse("10.1.0.0/24").unwrap()));
        assert_eq!(Cidr::parse("10.0.1.7/24").unwrap().network, Ipv4Addr::new(10, 0, 1, 0));
        assert!(Cidr::parse("10.0.0.0/33").is_none());
        assert!(Cidr::parse("nonsense").is_none());
    }

    #[test]
    fn random_host_stays_inside() {
        let block = Cidr::parse("10.0.1.0/27").unwrap();
        for _ in 0..50 {
            let host = block.random_host();
            assert!(block.contains(&Cidr {
                network: host,
                prefix: 32
            }));
        }
    }
}
