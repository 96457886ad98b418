//! # EC2 Backend
//!
//! The networking slice of EC2: VPCs, subnets, network ACLs, elastic IPs and NAT gateways,
//! plus the generic tag operations that work on any of them.
//!
//! ## Structure
//!
//! - [`vpc`] - VPCs and subnets
//! - [`network_acl`] - ACLs, rule entries and subnet associations
//! - [`nat_gateway`] - elastic IP allocations and NAT gateways
//! - [`tags`] - `create_tags` / `delete_tags` / `describe_tags`
//! - [`filters`] - describe filter evaluation
//!
//! Every delete here is strict: an unknown id is an error.

pub mod error;
pub mod filters;
pub mod nat_gateway;
pub mod network_acl;
pub mod tags;
pub mod vpc;

pub use error::*;
pub use filters::Filter;
pub use nat_gateway::*;
pub use network_acl::*;
pub use tags::{TagDescription, TagRemoval};
pub use vpc::*;

use backend_core::{Backend, ResourceStore, Scope};

#[derive(Debug)]
pub struct Ec2Backend {
    scope: Scope,
    vpcs: ResourceStore<Vpc>,
    subnets: ResourceStore<Subnet>,
    network_acls: ResourceStore<NetworkAcl>,
    addresses: ResourceStore<ElasticIp>,
    nat_gateways: ResourceStore<NatGateway>,
}

impl Backend for Ec2Backend {
    const SERVICE: &'static str = "ec2";

    fn new(scope: Scope) -> Self {
        Self {
            vpcs: ResourceStore::new(scope.clone()),
            subnets: ResourceStore::new(scope.clone()),
            network_acls: ResourceStore::new(scope.clone()),
            addresses: ResourceStore::new(scope.clone()),
            nat_gateways: ResourceStore::new(scope.clone()),
            scope,
        }
    }
}

impl Ec2Backend {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}
