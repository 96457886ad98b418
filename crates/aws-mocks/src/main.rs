//! # AWS Mocks Demo
//!
//! Walks one account through the main flows of the library:
//! 1.  Creating an IAM role and a two-stage pipeline that assumes it.
//! 2.  Building a VPC and adding a rule to a fresh network ACL.
//! 3.  Sending a mail from a verified address with delivery feedback on an SNS topic.
//! 4.  Querying everything tagged `env=demo` through the tagging API.
//!
//! Run with `RUST_LOG=debug` to see the backend logs.

use aws_mocks::codepipeline::{ActionDeclaration, PipelineDeclaration, StageDeclaration};
use aws_mocks::ec2::{NetworkAclEntry, PortRange, RuleAction};
use aws_mocks::iam::RoleCreate;
use aws_mocks::ses::{Body, Destination, NotificationType};
use aws_mocks::sns::TopicCreate;
use aws_mocks::tagging::ResourceQuery;
use aws_mocks::AwsContext;
use backend_core::tracing::setup_tracing;
use backend_core::{PageRequest, Tag};
use tracing::{info, info_span};

const TRUST_POLICY: &str = r#"{"Statement":[{"Effect":"Allow","Principal":{"Service":"codepipeline.amazonaws.com"},"Action":"sts:AssumeRole"}]}"#;

fn main() -> Result<(), String> {
    setup_tracing();

    let mut aws = AwsContext::from_env().map_err(|e| e.to_string())?;
    let account = aws.config().account_id.clone();
    let region = aws.config().region.clone();
    info!(%account, %region, "Starting AWS mocks demo");

    let demo_tag = || vec![Tag::new("env", "demo")];

    // Pipeline: needs a role that trusts the pipeline service
    let pipeline_version = {
        let _span = info_span!("pipeline").entered();
        let role = aws
            .iam(&account, &region)
            .create_role("pipeline-role", RoleCreate::new(TRUST_POLICY))
            .map_err(|e| e.to_string())?;

        let declaration = PipelineDeclaration {
            name: "demo-pipeline".to_string(),
            role_arn: role.arn,
            artifact_store: None,
            stages: vec![
                StageDeclaration::new("Source", vec![ActionDeclaration::new("Checkout", "Source", "S3")]),
                StageDeclaration::new("Deploy", vec![ActionDeclaration::new("Upload", "Deploy", "S3")]),
            ],
            version: None,
        };
        let (pipelines, iam) = aws.codepipeline_with_iam(&account, &region);
        let (created, _) = pipelines
            .create_pipeline(iam, declaration, demo_tag())
            .map_err(|e| e.to_string())?;
        created.version.unwrap_or_default()
    };
    info!(version = pipeline_version, "Pipeline created");

    // Network: the VPC comes with a default ACL, the custom one starts empty
    let acl_id = {
        let _span = info_span!("network").entered();
        let ec2 = aws.ec2(&account, &region);
        let vpc = ec2.create_vpc("10.0.0.0/16", demo_tag()).map_err(|e| e.to_string())?;
        let acl = ec2
            .create_network_acl(&vpc.vpc_id, demo_tag())
            .map_err(|e| e.to_string())?;
        let mut https = NetworkAclEntry::catch_all(110, RuleAction::Allow, false);
        https.protocol = "6".to_string();
        https.port_range = Some(PortRange { from: 443, to: 443 });
        ec2.create_network_acl_entry(&acl.network_acl_id, https)
            .map_err(|e| e.to_string())?;
        acl.network_acl_id
    };
    info!(%acl_id, "Network ACL ready");

    // Mail: delivery feedback for the sender goes to an SNS topic
    let message_id = {
        let _span = info_span!("mail").entered();
        let (ses, sns) = aws.ses_with_sns(&account, &region);
        let topic = sns
            .create_topic("mail-feedback", TopicCreate { display_name: None, tags: demo_tag() })
            .map_err(|e| e.to_string())?;
        ses.verify_email_identity("sender@example.com");
        ses.set_identity_notification_topic("sender@example.com", NotificationType::Delivery, Some(&topic.arn));
        let message_id = ses
            .send_email(
                sns,
                "sender@example.com",
                &Destination::to(["success@simulator.amazonses.com"]),
                "Deployed",
                Body::text("demo-pipeline is live"),
            )
            .map_err(|e| e.to_string())?;
        info!(notifications = sns.published().len(), "Feedback published");
        message_id
    };
    info!(%message_id, "Mail sent");

    // Tagging: one query across every service
    let tagging = aws.tagging(&account, &region);
    let page = tagging
        .get_resources(&ResourceQuery::default().tag("env", ["demo"]), &PageRequest::default())
        .map_err(|e| e.to_string())?;
    for mapping in &page.items {
        info!(arn = %mapping.resource_arn, "Tagged resource");
    }

    info!(resources = page.items.len(), "Demo completed");
    Ok(())
}
