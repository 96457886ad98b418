//! Identifier and ARN generation.

use rand::distributions::Alphanumeric;
use rand::Rng;

const HEX: &[u8] = b"0123456789abcdef";

/// `len` random lowercase hex characters.
pub fn random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

/// `len` random uppercase letters and digits.
pub fn random_upper_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}

/// EC2-style id: `{prefix}-` followed by 17 hex characters.
pub fn resource_id(prefix: &str) -> String {
    format!("{prefix}-{}", random_hex(17))
}

pub fn arn(partition: &str, service: &str, region: &str, account_id: &str, resource: &str) -> String {
    format!("arn:{partition}:{service}:{region}:{account_id}:{resource}")
}

/// Components of an ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArn<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account_id: &'a str,
    pub resource: &'a str,
}

impl<'a> ParsedArn<'a> {
    /// Splits an ARN; the resource part may itself contain `:`.
    pub fn parse(arn: &'a str) -> Option<Self> {
        let mut parts = arn.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        Some(Self {
            partition: parts.next()?,
            service: parts.next()?,
            region: parts.next()?,
            account_id: parts.next()?,
            resource: parts.next()?,
        })
    }

    /// Resource type such as `vpc` in `vpc/vpc-123` or `role` in `role/name`.
    pub fn resource_type(&self) -> Option<&'a str> {
        self.resource
            .split_once(['/', ':'])
            .map(|(kind, _)| kind)
    }

    /// Resource name or id after the type prefix, or the whole resource part.
    pub fn resource_name(&self) -> &'a str {
        self.resource
            .split_once(['/', ':'])
            .map(|(_, name)| name)
            .unwrap_or(self.resource)
    }
}
