//! # Context & Wiring
//!
//! [`AwsContext`] owns one [`BackendRegistry`] per service and is the only place where
//! backends meet. Create one per test (or per run) and pass it around explicitly; there is no
//! global state.
//!
//! ## Accessors
//!
//! For every service `x` the context has:
//!
//! - `x(account_id, region)` - the backend for that partition, created on first use
//! - `x_default()` - the same for the account and region of the [`MockConfig`]
//! - `reset_x()` - drops every partition of that service
//!
//! ## Collaborators
//!
//! Some operations need a second backend of the same partition. Instead of letting backends
//! reach into each other, the context hands out disjoint borrows:
//!
//! ```
//! use aws_mocks::context::AwsContext;
//! use aws_mocks::ses::{Body, Destination};
//!
//! let mut aws = AwsContext::default();
//! let (ses, sns) = aws.ses_with_sns("123456789012", "us-east-1");
//! ses.verify_email_identity("sender@example.com");
//! let id = ses
//!     .send_email(sns, "sender@example.com", &Destination::to(["a@example.com"]), "hi", Body::text("hello"))
//!     .unwrap();
//! assert_eq!(ses.sent_messages()[0].message_id, id);
//! ```

use crate::codepipeline::CodePipelineBackend;
use crate::ec2::Ec2Backend;
use crate::iam::IamBackend;
use crate::s3::S3Backend;
use crate::ses::SesBackend;
use crate::sns::SnsBackend;
use crate::tagging::{ResourceTagging, TaggedResourceSource};
use backend_core::{BackendRegistry, ConfigError, MockConfig};
use tracing::info;

macro_rules! aws_context {
    ($($service:ident: $backend:ty),* $(,)?) => {
        paste::paste! {
            /// Every service registry plus the default partition.
            #[derive(Debug)]
            pub struct AwsContext {
                config: MockConfig,
                $($service: BackendRegistry<$backend>,)*
            }

            impl AwsContext {
                pub fn new(config: MockConfig) -> Self {
                    Self {
                        config,
                        $($service: BackendRegistry::new(),)*
                    }
                }

                /// Drops every backend of every service.
                pub fn reset(&mut self) {
                    $(self.$service.reset();)*
                    info!("Context reset");
                }

                $(
                    pub fn $service(&mut self, account_id: &str, region: &str) -> &mut $backend {
                        self.$service.get_or_create(account_id, region)
                    }

                    pub fn [<$service _default>](&mut self) -> &mut $backend {
                        self.$service
                            .get_or_create(&self.config.account_id, &self.config.region)
                    }

                    pub fn [<reset_ $service>](&mut self) {
                        self.$service.reset();
                    }

                    pub fn [<$service _registry>](&self) -> &BackendRegistry<$backend> {
                        &self.$service
                    }
                )*
            }
        }
    };
}

aws_context! {
    iam: IamBackend,
    sns: SnsBackend,
    codepipeline: CodePipelineBackend,
    ec2: Ec2Backend,
    ses: SesBackend,
    s3: S3Backend,
}

impl Default for AwsContext {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl AwsContext {
    /// Context for the account and region named by `MOCK_ACCOUNT_ID` / `MOCK_REGION`.
    pub fn from_env() -> Result<Self, ConfigError> {
        MockConfig::from_env().map(Self::new)
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// The pipeline backend together with the IAM backend its role checks read.
    pub fn codepipeline_with_iam(
        &mut self,
        account_id: &str,
        region: &str,
    ) -> (&mut CodePipelineBackend, &IamBackend) {
        let iam: &IamBackend = self.iam.get_or_create(account_id, region);
        let codepipeline = self.codepipeline.get_or_create(account_id, region);
        (codepipeline, iam)
    }

    /// The SES backend together with the SNS backend feedback notifications go to.
    pub fn ses_with_sns(&mut self, account_id: &str, region: &str) -> (&mut SesBackend, &mut SnsBackend) {
        let sns = self.sns.get_or_create(account_id, region);
        let ses = self.ses.get_or_create(account_id, region);
        (ses, sns)
    }

    /// Tagging API view over the tag-aware backends of one partition.
    pub fn tagging(&mut self, account_id: &str, region: &str) -> ResourceTagging<'_> {
        let codepipeline: &mut dyn TaggedResourceSource = self.codepipeline.get_or_create(account_id, region);
        let ec2: &mut dyn TaggedResourceSource = self.ec2.get_or_create(account_id, region);
        let sns: &mut dyn TaggedResourceSource = self.sns.get_or_create(account_id, region);
        let s3: &mut dyn TaggedResourceSource = self.s3.get_or_create(account_id, region);
        ResourceTagging::new(vec![codepipeline, ec2, sns, s3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_core::GLOBAL_REGION;

    #[test]
    fn partitions_are_independent() {
        let mut aws = AwsContext::default();
        aws.sns("111111111111", "us-east-1")
            .create_topic("t", Default::default())
            .unwrap();
        assert_eq!(aws.sns("111111111111", "us-east-1").topics().count(), 1);
        assert_eq!(aws.sns("111111111111", "eu-west-1").topics().count(), 0);
        assert_eq!(aws.sns("222222222222", "us-east-1").topics().count(), 0);
    }

    #[test]
    fn global_services_ignore_region() {
        let mut aws = AwsContext::default();
        aws.s3("123456789012", "us-east-1")
            .create_bucket("shared", "us-east-1")
            .unwrap();
        assert!(aws.s3("123456789012", "eu-west-1").get_bucket("shared").is_ok());
        assert_eq!(aws.iam_default().scope().region, GLOBAL_REGION);
    }

    #[test]
    fn reset_rebuilds_backends() {
        let mut aws = AwsContext::default();
        aws.sns_default().create_topic("t", Default::default()).unwrap();
        aws.reset_sns();
        assert_eq!(aws.sns_default().topics().count(), 0);

        aws.ec2_default().allocate_address(None).unwrap();
        aws.reset();
        assert!(!aws.ec2_registry().contains("123456789012", "us-east-1"));
    }
}
