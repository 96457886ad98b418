use aws_mocks::ses::{Body, BulkDestination, Destination, NotificationType, SesError, TemplateInput};
use aws_mocks::sns::TopicCreate;
use aws_mocks::AwsContext;
use backend_core::tracing::try_setup_tracing;
use backend_core::{ErrorKind, ProviderError};
use serde_json::Value;

const ACCOUNT: &str = "123456789012";
const REGION: &str = "us-east-1";
const SENDER: &str = "sender@example.com";

fn recipients(count: usize) -> Destination {
    Destination::to((0..count).map(|i| format!("user{i}@example.com")))
}

#[test]
fn test_send_email_records_message_and_counts() {
    let mut aws = AwsContext::default();
    let (ses, sns) = aws.ses_with_sns(ACCOUNT, REGION);
    ses.verify_email_identity(SENDER);

    let message_id = ses
        .send_email(sns, SENDER, &recipients(3), "Subject", Body::text("Hello"))
        .expect("Failed to send email");

    let sent = ses.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message_id, message_id);
    assert_eq!(sent[0].source, SENDER);
    assert_eq!(ses.get_send_quota().sent_last_24_hours, 3);
    assert_eq!(ses.get_send_statistics().rejects, 0);
    assert!(sns.published().is_empty());
}

#[test]
fn test_recipient_limit_checked_before_sender() {
    let mut aws = AwsContext::default();
    let (ses, sns) = aws.ses_with_sns(ACCOUNT, REGION);

    // Unverified sender, but the recipient limit fails first and nothing is counted
    let err = ses
        .send_email(sns, SENDER, &recipients(51), "s", Body::text("b"))
        .unwrap_err();
    assert_eq!(err, SesError::TooManyRecipients);
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    assert_eq!(err.code(), "MessageRejected");
    assert_eq!(ses.get_send_statistics().rejects, 0);

    let err = ses
        .send_email(sns, SENDER, &recipients(1), "s", Body::text("b"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(err.to_string(), "Email address not verified sender@example.com");
    assert_eq!(ses.get_send_statistics().rejects, 1);
    assert!(ses.sent_messages().is_empty());
}

#[test]
fn test_domain_verification_authorizes_sender() {
    let mut aws = AwsContext::default();
    let (ses, sns) = aws.ses_with_sns(ACCOUNT, REGION);
    ses.verify_domain("Example.COM");

    ses.send_email(sns, "Team <team@example.com>", &recipients(1), "s", Body::text("b"))
        .expect("Failed to send email");
    assert_eq!(
        ses.list_identities(None).expect("Failed to list identities"),
        vec!["example.com".to_string()]
    );

    let err = ses
        .send_email(sns, "team@other.com", &recipients(1), "s", Body::text("b"))
        .unwrap_err();
    assert_eq!(err, SesError::NotVerified("team@other.com".into()));
}

#[test]
fn test_feedback_is_published_to_sns() {
    try_setup_tracing();
    let mut aws = AwsContext::default();
    let (ses, sns) = aws.ses_with_sns(ACCOUNT, REGION);
    let bounces = sns.create_topic("bounces", TopicCreate::default()).expect("Failed to create topic");
    let deliveries = sns.create_topic("deliveries", TopicCreate::default()).expect("Failed to create topic");
    ses.verify_domain("example.com");
    ses.verify_email_identity(SENDER);
    ses.set_identity_notification_topic("example.com", NotificationType::Bounce, Some(&bounces.arn));
    ses.set_identity_notification_topic(SENDER, NotificationType::Delivery, Some(&deliveries.arn));

    let bounced = ses
        .send_email(sns, SENDER, &Destination::to(["bounce@simulator.amazonses.com"]), "s", Body::text("b"))
        .expect("Failed to send email");
    ses.send_email(sns, SENDER, &Destination::to(["success@simulator.amazonses.com"]), "s", Body::text("b"))
        .expect("Failed to send email");
    // No topic for complaints: nothing published
    ses.send_email(sns, SENDER, &Destination::to(["complaint@simulator.amazonses.com"]), "s", Body::text("b"))
        .expect("Failed to send email");

    assert_eq!(sns.published().len(), 2);
    let bounce = sns.published_to(&bounces.arn).next().expect("No bounce notification");
    let body: Value = serde_json::from_str(&bounce.message).expect("Notification is not JSON");
    assert_eq!(body["notificationType"], "Bounce");
    assert_eq!(body["mail"]["messageId"], bounced.as_str());
    assert_eq!(body["mail"]["source"], SENDER);
    assert_eq!(body["bounce"]["bouncedRecipients"][0]["emailAddress"], "bounce@simulator.amazonses.com");

    let delivery = sns.published_to(&deliveries.arn).next().expect("No delivery notification");
    let body: Value = serde_json::from_str(&delivery.message).expect("Notification is not JSON");
    assert_eq!(body["notificationType"], "Delivery");
    assert_eq!(body["delivery"]["recipients"][0], "success@simulator.amazonses.com");
}

#[test]
fn test_templated_sends() {
    let mut aws = AwsContext::default();
    let (ses, sns) = aws.ses_with_sns(ACCOUNT, REGION);
    ses.verify_email_identity(SENDER);

    let err = ses
        .send_templated_email(sns, SENDER, &recipients(1), "welcome", "{}")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(err.code(), "TemplateDoesNotExist");

    ses.create_template(TemplateInput::new("welcome", "Hi {{name}}").text("Welcome, {{name}}!"))
        .expect("Failed to create template");
    ses.send_templated_email(sns, SENDER, &recipients(2), "welcome", r#"{"name":"Ann"}"#)
        .expect("Failed to send templated email");

    let bulk = vec![
        BulkDestination {
            destination: Destination::to(["a@example.com"]),
            replacement_template_data: Some(r#"{"name":"A"}"#.to_string()),
        },
        BulkDestination {
            destination: Destination::to(["b@example.com"]),
            replacement_template_data: None,
        },
    ];
    let ids = ses
        .send_bulk_templated_email(sns, SENDER, "welcome", r#"{"name":"friend"}"#, &bulk)
        .expect("Failed to send bulk email");
    assert_eq!(ids.len(), 2);
    assert_eq!(ses.sent_messages().len(), 3);
    assert_eq!(ses.get_send_quota().sent_last_24_hours, 4);

    let too_many: Vec<BulkDestination> = (0..51)
        .map(|i| BulkDestination {
            destination: Destination::to([format!("u{i}@example.com")]),
            replacement_template_data: None,
        })
        .collect();
    let err = ses
        .send_bulk_templated_email(sns, SENDER, "welcome", "{}", &too_many)
        .unwrap_err();
    assert_eq!(err, SesError::TooManyDestinations);

    let rendered = ses
        .test_render_template("welcome", r#"{"name":"Ann"}"#)
        .expect("Failed to render template");
    assert!(rendered.contains("Subject: Hi Ann"), "{rendered}");
    assert!(rendered.contains("Welcome, Ann!"), "{rendered}");
}

#[test]
fn test_raw_email_uses_from_header() {
    let mut aws = AwsContext::default();
    let (ses, sns) = aws.ses_with_sns(ACCOUNT, REGION);
    let raw = "From: sender@example.com\r\nTo: a@example.com, b@example.com\r\nSubject: Hi\r\n\r\nBody";

    let err = ses.send_raw_email(sns, None, &[], raw).unwrap_err();
    assert_eq!(err, SesError::NoAuthority("sender@example.com".into()));

    let err = ses
        .send_raw_email(sns, None, &[], "To: a@example.com\r\n\r\nBody")
        .unwrap_err();
    assert_eq!(err, SesError::SourceNotSpecified);

    ses.verify_email_identity(SENDER);
    ses.send_raw_email(sns, None, &["c@example.com".to_string()], raw)
        .expect("Failed to send raw email");
    let sent = &ses.sent_messages()[0];
    assert_eq!(sent.source, SENDER);
    assert_eq!(sent.destination.count(), 3);
    assert_eq!(ses.get_send_statistics().rejects, 0);
}

#[test]
fn test_raw_email_display_name_with_comma() {
    let mut aws = AwsContext::default();
    let (ses, sns) = aws.ses_with_sns(ACCOUNT, REGION);
    ses.verify_email_identity(SENDER);
    let raw = "From: sender@example.com\r\nTo: \"Doe, Jane\" <jane@example.com>\r\nSubject: Hi\r\n\r\nBody";

    ses.send_raw_email(sns, None, &[], raw)
        .expect("Failed to send raw email");
    assert_eq!(ses.sent_messages().len(), 1);
    assert_eq!(
        ses.sent_messages()[0].destination.to_addresses,
        vec!["Doe, Jane <jane@example.com>"]
    );
}
