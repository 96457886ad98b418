//! # AWS Mocks
//!
//! In-memory simulations of a handful of AWS services, built on [`backend_core`]. Each
//! service keeps one backend per (account, region); the [`AwsContext`] owns them all.
//!
//! ## Services
//!
//! - **[codepipeline]**: pipeline declarations, versions, IAM role checks
//! - **[ec2]**: VPCs, subnets, network ACLs, elastic IPs, NAT gateways and resource tags
//! - **[ses]**: identities, templates, configuration sets, receipt rules and sending
//! - **[sns]**: topics and the log of published messages
//! - **[iam]**: roles and their trust policies
//! - **[s3]**: buckets, bucket tagging and lifecycle rules
//! - **[tagging]**: the Resource Groups Tagging API over all of the above
//!
//! ## Errors
//!
//! Every service error implements [`backend_core::ProviderError`], so callers can match on
//! the shared [`ErrorKind`](backend_core::ErrorKind) or read the AWS error code.

pub mod codepipeline;
pub mod context;
pub mod ec2;
pub mod iam;
pub mod s3;
pub mod ses;
pub mod sns;
pub mod tagging;

pub use context::AwsContext;
