//! Elastic IP allocations and NAT gateways.

use super::error::Ec2Error;
use super::filters::{self, one, Filter, Filterable};
use super::vpc::{select_ids, Cidr};
use super::Ec2Backend;
use backend_core::tags::to_map;
use backend_core::{
    ids, paginate, time, BackendEntity, Page, PageLimits, PageRequest, Scope, Tag, TagMap,
    TagPolicy,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::instrument;

const NAT_GATEWAY_PAGE: PageLimits = PageLimits::new(1000, 1000);

#[derive(Debug, Clone, Serialize)]
pub struct ElasticIp {
    pub allocation_id: String,
    pub public_ip: String,
    pub domain: String,
    pub network_interface_id: Option<String>,
    pub tags: TagMap,
}

impl BackendEntity for ElasticIp {
    type Id = String;
    type Create = String;
    type Update = TagMap;
    type Context = Scope;
    type Error = Ec2Error;
    const KIND: &'static str = "ElasticIp";

    fn id(&self) -> &String {
        &self.allocation_id
    }

    fn from_create_params(allocation_id: String, domain: String, _scope: &Scope) -> Result<Self, Ec2Error> {
        if domain != "vpc" && domain != "standard" {
            return Err(Ec2Error::InvalidParameterValue(format!(
                "Invalid value '{domain}' for domain."
            )));
        }
        let mut rng = rand::thread_rng();
        Ok(Self {
            allocation_id,
            public_ip: format!("54.{}.{}.{}", rng.gen_range(0..=255), rng.gen_range(0..=255), rng.gen_range(1..=254)),
            domain,
            network_interface_id: None,
            tags: TagMap::new(),
        })
    }

    fn on_update(&mut self, tags: TagMap, _scope: &Scope) -> Result<(), Ec2Error> {
        self.tags = tags;
        Ok(())
    }

    fn on_delete(&self, _scope: &Scope) -> Result<(), Ec2Error> {
        match &self.network_interface_id {
            Some(eni) => Err(Ec2Error::InvalidParameterValue(format!(
                "Address {} is in use by {eni}",
                self.allocation_id
            ))),
            None => Ok(()),
        }
    }

    fn not_found(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::AllocationNotFound(id.clone())
    }

    fn already_exists(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::InvalidParameterValue(format!("Allocation {id} already exists"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NatGatewayAddress {
    pub allocation_id: String,
    pub network_interface_id: String,
    pub private_ip: String,
    pub public_ip: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NatGateway {
    pub nat_gateway_id: String,
    pub subnet_id: String,
    pub vpc_id: String,
    pub state: String,
    pub connectivity_type: String,
    pub create_time: DateTime<Utc>,
    pub addresses: Vec<NatGatewayAddress>,
    pub tags: TagMap,
}

#[derive(Debug, Clone)]
pub struct NatGatewayCreate {
    pub subnet_id: String,
    pub vpc_id: String,
    pub address: NatGatewayAddress,
    pub tags: Vec<Tag>,
}

impl BackendEntity for NatGateway {
    type Id = String;
    type Create = NatGatewayCreate;
    type Update = TagMap;
    type Context = Scope;
    type Error = Ec2Error;
    const KIND: &'static str = "NatGateway";

    fn id(&self) -> &String {
        &self.nat_gateway_id
    }

    fn from_create_params(
        nat_gateway_id: String,
        params: NatGatewayCreate,
        _scope: &Scope,
    ) -> Result<Self, Ec2Error> {
        let tags = to_map(&params.tags);
        TagPolicy::STANDARD.check_replacement(&tags)?;
        Ok(Self {
            nat_gateway_id,
            subnet_id: params.subnet_id,
            vpc_id: params.vpc_id,
            state: "available".to_string(),
            connectivity_type: "public".to_string(),
            create_time: time::now(),
            addresses: vec![params.address],
            tags,
        })
    }

    fn on_update(&mut self, tags: TagMap, _scope: &Scope) -> Result<(), Ec2Error> {
        self.tags = tags;
        Ok(())
    }

    fn not_found(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::NatGatewayNotFound(id.clone())
    }

    fn already_exists(id: &String, _scope: &Scope) -> Ec2Error {
        Ec2Error::InvalidParameterValue(format!("NatGateway {id} already exists"))
    }
}

impl Filterable for NatGateway {
    fn filter_values(&self, name: &str) -> Option<Vec<String>> {
        match name {
            "nat-gateway-id" => one(&self.nat_gateway_id),
            "vpc-id" => one(&self.vpc_id),
            "subnet-id" => one(&self.subnet_id),
            "state" => one(&self.state),
            _ => None,
        }
    }

    fn tags(&self) -> &TagMap {
        &self.tags
    }
}

impl Ec2Backend {
    pub fn allocate_address(&mut self, domain: Option<&str>) -> Result<ElasticIp, Ec2Error> {
        let domain = domain.unwrap_or("vpc").to_string();
        let address = self
            .addresses
            .create(ids::resource_id("eipalloc"), domain)?;
        Ok(address.clone())
    }

    pub fn describe_addresses(&self, allocation_ids: &[String]) -> Result<Vec<ElasticIp>, Ec2Error> {
        select_ids(
            self.addresses.values().cloned(),
            allocation_ids,
            Ec2Error::AllocationNotFound,
        )
    }

    /// Strict: unknown ids and addresses still attached to a gateway are refused.
    pub fn release_address(&mut self, allocation_id: &str) -> Result<(), Ec2Error> {
        self.addresses.delete(&allocation_id.to_string()).map(|_| ())
    }

    /// Creates an `available` gateway in `subnet_id` using the elastic IP `allocation_id`.
    #[instrument(skip(self, tags))]
    pub fn create_nat_gateway(
        &mut self,
        subnet_id: &str,
        allocation_id: &str,
        tags: Vec<Tag>,
    ) -> Result<NatGateway, Ec2Error> {
        let subnet = self.get_subnet(subnet_id)?;
        let vpc_id = subnet.vpc_id.clone();
        let private_ip = Cidr::parse(&subnet.cidr_block)
            .map(|cidr| cidr.random_host().to_string())
            .ok_or_else(|| Ec2Error::InvalidCidrBlock(subnet.cidr_block.clone()))?;

        let address = self.addresses.require(&allocation_id.to_string())?;
        if address.network_interface_id.is_some() {
            return Err(Ec2Error::InvalidParameterValue(format!(
                "Elastic IP address [{allocation_id}] is already associated"
            )));
        }
        let network_interface_id = ids::resource_id("eni");
        let nat_address = NatGatewayAddress {
            allocation_id: allocation_id.to_string(),
            network_interface_id: network_interface_id.clone(),
            private_ip,
            public_ip: address.public_ip.clone(),
        };

        let params = NatGatewayCreate {
            subnet_id: subnet_id.to_string(),
            vpc_id,
            address: nat_address,
            tags,
        };
        let gateway = self
            .nat_gateways
            .create(ids::resource_id("nat"), params)?
            .clone();
        if let Some(address) = self.addresses.get_mut(&allocation_id.to_string()) {
            address.network_interface_id = Some(network_interface_id);
        }
        Ok(gateway)
    }

    pub fn describe_nat_gateways(
        &self,
        nat_gateway_ids: &[String],
        filters: &[Filter],
        request: &PageRequest,
    ) -> Result<Page<NatGateway>, Ec2Error> {
        let selected = select_ids(
            self.nat_gateways.values().cloned(),
            nat_gateway_ids,
            Ec2Error::NatGatewayNotFound,
        )?;
        let filtered = filters::apply(selected, filters)?;
        paginate(filtered, request, NAT_GATEWAY_PAGE, &(nat_gateway_ids, filters), |gw| {
            gw.nat_gateway_id.clone()
        })
        .map_err(|e| Ec2Error::InvalidPaginationToken(e.to_string()))
    }

    /// Removes the gateway, frees its elastic IPs and returns its id.
    #[instrument(skip(self))]
    pub fn delete_nat_gateway(&mut self, nat_gateway_id: &str) -> Result<String, Ec2Error> {
        let gateway = self.nat_gateways.delete(&nat_gateway_id.to_string())?;
        for nat_address in &gateway.addresses {
            if let Some(address) = self.addresses.get_mut(&nat_address.allocation_id) {
                address.network_interface_id = None;
            }
        }
        Ok(gateway.nat_gateway_id)
    }
}
