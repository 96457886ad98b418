//! Error types for the EC2 backend.

use backend_core::{ErrorKind, ProviderError, TagViolation};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum Ec2Error {
    #[error("The vpc ID '{0}' does not exist")]
    VpcNotFound(String),

    #[error("The subnet ID '{0}' does not exist")]
    SubnetNotFound(String),

    #[error("The network acl ID '{0}' does not exist")]
    NetworkAclNotFound(String),

    #[error("The association ID '{0}' does not exist")]
    AssociationNotFound(String),

    #[error("The network acl entry identified by {0} already exists.")]
    NetworkAclEntryAlreadyExists(u32),

    #[error("The specified network ACL entry {rule_number} (egress: {egress}) does not exist")]
    NetworkAclEntryNotFound { rule_number: u32, egress: bool },

    #[error("NatGateway {0} not found")]
    NatGatewayNotFound(String),

    #[error("The allocation ID '{0}' does not exist")]
    AllocationNotFound(String),

    /// Tag operations on an id that names no known resource.
    #[error("The ID '{0}' is not valid")]
    InvalidId(String),

    #[error("{0}")]
    DependencyViolation(String),

    #[error("{0}")]
    InvalidParameterValue(String),

    #[error("Value ({0}) for parameter cidrBlock is invalid. This is not a valid CIDR block.")]
    InvalidCidrBlock(String),

    #[error("The CIDR '{0}' is invalid.")]
    InvalidSubnetRange(String),

    #[error("The maximum number of Tags for a resource has been reached.")]
    TagLimitExceeded,

    #[error("Invalid pagination token: {0}")]
    InvalidPaginationToken(String),
}

impl From<TagViolation> for Ec2Error {
    fn from(violation: TagViolation) -> Self {
        match violation {
            TagViolation::TooManyTags { .. } => Ec2Error::TagLimitExceeded,
            TagViolation::ReservedKey(_) => Ec2Error::InvalidParameterValue(
                "Tag keys starting with 'aws:' are reserved for internal use".to_string(),
            ),
            other => Ec2Error::InvalidParameterValue(other.to_string()),
        }
    }
}

impl ProviderError for Ec2Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Ec2Error::VpcNotFound(_)
            | Ec2Error::SubnetNotFound(_)
            | Ec2Error::NetworkAclNotFound(_)
            | Ec2Error::AssociationNotFound(_)
            | Ec2Error::NetworkAclEntryNotFound { .. }
            | Ec2Error::NatGatewayNotFound(_)
            | Ec2Error::AllocationNotFound(_)
            | Ec2Error::InvalidId(_) => ErrorKind::NotFound,
            Ec2Error::NetworkAclEntryAlreadyExists(_) => ErrorKind::AlreadyExists,
            Ec2Error::DependencyViolation(_) => ErrorKind::Rejected,
            Ec2Error::InvalidParameterValue(_)
            | Ec2Error::InvalidCidrBlock(_)
            | Ec2Error::InvalidSubnetRange(_)
            | Ec2Error::InvalidPaginationToken(_) => ErrorKind::ValidationError,
            Ec2Error::TagLimitExceeded => ErrorKind::LimitExceeded,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Ec2Error::VpcNotFound(_) => "InvalidVpcID.NotFound",
            Ec2Error::SubnetNotFound(_) => "InvalidSubnetID.NotFound",
            Ec2Error::NetworkAclNotFound(_) => "InvalidNetworkAclID.NotFound",
            Ec2Error::AssociationNotFound(_) => "InvalidAssociationID.NotFound",
            Ec2Error::NetworkAclEntryAlreadyExists(_) => "NetworkAclEntryAlreadyExists",
            Ec2Error::NetworkAclEntryNotFound { .. } => "InvalidNetworkAclEntry.NotFound",
            Ec2Error::NatGatewayNotFound(_) => "NatGatewayNotFound",
            Ec2Error::AllocationNotFound(_) => "InvalidAllocationID.NotFound",
            Ec2Error::InvalidId(_) => "InvalidID",
            Ec2Error::DependencyViolation(_) => "DependencyViolation",
            Ec2Error::InvalidParameterValue(_) | Ec2Error::InvalidCidrBlock(_) => {
                "InvalidParameterValue"
            }
            Ec2Error::InvalidSubnetRange(_) => "InvalidSubnet.Range",
            Ec2Error::TagLimitExceeded => "TagLimitExceeded",
            Ec2Error::InvalidPaginationToken(_) => "InvalidPaginationToken",
        }
    }

    fn status(&self) -> u16 {
        400
    }
}
