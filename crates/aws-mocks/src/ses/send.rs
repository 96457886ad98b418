//! Outbound sends, the sent-message log, quota and statistics.

use super::address::{address_problem, bare_address, parse_raw_headers};
use super::error::SesError;
use super::identity::NotificationType;
use super::SesBackend;
use crate::sns::SnsBackend;
use backend_core::{ids, time};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};

/// Most recipients (to + cc + bcc) a single send may address.
pub const RECIPIENT_LIMIT: usize = 50;

const MAX_24_HOUR_SEND: u64 = 200;
const MAX_SEND_RATE: u64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub to_addresses: Vec<String>,
    pub cc_addresses: Vec<String>,
    pub bcc_addresses: Vec<String>,
}

impl Destination {
    pub fn to<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            to_addresses: addresses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.to_addresses
            .iter()
            .chain(&self.cc_addresses)
            .chain(&self.bcc_addresses)
            .map(String::as_str)
    }

    pub fn count(&self) -> usize {
        self.to_addresses.len() + self.cc_addresses.len() + self.bcc_addresses.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Body {
    pub text: Option<String>,
    pub html: Option<String>,
}

impl Body {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            html: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MessageContent {
    Simple { subject: String, body: Body },
    Templated { template: String, template_data: String },
    Raw { data: String },
}

/// One accepted send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    pub message_id: String,
    pub source: String,
    pub destination: Destination,
    pub content: MessageContent,
    pub sent_at: DateTime<Utc>,
}

/// One destination of a bulk templated send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDestination {
    pub destination: Destination,
    /// Overrides the call's default template data for this destination.
    pub replacement_template_data: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SendQuota {
    pub max_24_hour_send: u64,
    pub max_send_rate: u64,
    pub sent_last_24_hours: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendStatistics {
    pub delivery_attempts: u64,
    pub rejects: u64,
    pub complaints: u64,
    pub bounces: u64,
    pub timestamp: DateTime<Utc>,
}

/// SES message id: seven hex groups of 16, 8, 4, 4, 4, 12 and 6 characters.
pub fn message_id() -> String {
    [16, 8, 4, 4, 4, 12, 6]
        .iter()
        .map(|&len| ids::random_hex(len))
        .collect::<Vec<_>>()
        .join("-")
}

fn check_addresses<'a>(addresses: impl IntoIterator<Item = &'a str>) -> Result<(), SesError> {
    for address in addresses {
        if let Some(problem) = address_problem(address) {
            return Err(SesError::InvalidParameterValue(problem.to_string()));
        }
    }
    Ok(())
}

/// The simulator convention: the first recipient naming an outcome decides it.
fn feedback_type<'a>(addresses: impl IntoIterator<Item = &'a str>) -> Option<NotificationType> {
    addresses.into_iter().find_map(|address| {
        if address.contains("success") {
            Some(NotificationType::Delivery)
        } else if address.contains("complaint") {
            Some(NotificationType::Complaint)
        } else if address.contains("bounce") {
            Some(NotificationType::Bounce)
        } else {
            None
        }
    })
}

impl SesBackend {
    fn require_verified(&mut self, source: &str) -> Result<(), SesError> {
        if self.is_verified(source) {
            return Ok(());
        }
        self.rejected_message_count += 1;
        warn!(source, rejected = self.rejected_message_count, "Sender not verified");
        Err(SesError::NotVerified(source.to_string()))
    }

    fn feedback_message(
        &self,
        notification_type: NotificationType,
        message_id: &str,
        source: &str,
        destination: &Destination,
    ) -> String {
        let timestamp = time::iso8601(&time::now());
        let recipients: Vec<&str> = destination.addresses().collect();
        let mut message = json!({
            "notificationType": notification_type.to_string(),
            "mail": {
                "timestamp": timestamp,
                "source": source,
                "sourceArn": self.scope.arn("ses", &format!("identity/{}", bare_address(source))),
                "sendingAccountId": self.scope.account_id,
                "messageId": message_id,
                "destination": recipients,
            },
        });
        let detail = match notification_type {
            NotificationType::Bounce => json!({
                "bounceType": "Permanent",
                "bounceSubType": "General",
                "bouncedRecipients": recipients.iter().map(|r| json!({"emailAddress": r})).collect::<Vec<_>>(),
                "timestamp": timestamp,
            }),
            NotificationType::Complaint => json!({
                "complainedRecipients": recipients.iter().map(|r| json!({"emailAddress": r})).collect::<Vec<_>>(),
                "complaintFeedbackType": "abuse",
                "timestamp": timestamp,
            }),
            NotificationType::Delivery => json!({
                "recipients": recipients,
                "processingTimeMillis": 0,
                "smtpResponse": "250 2.6.0 Message received",
                "timestamp": timestamp,
            }),
        };
        message[notification_type.to_string().to_ascii_lowercase()] = detail;
        message.to_string()
    }

    fn publish_feedback(
        &self,
        sns: &mut SnsBackend,
        message_id: &str,
        source: &str,
        destination: &Destination,
    ) -> Result<(), SesError> {
        let Some(notification_type) = feedback_type(destination.addresses()) else {
            return Ok(());
        };
        let Some(topic_arn) = self.notification_topic(source, notification_type) else {
            return Ok(());
        };
        let message = self.feedback_message(notification_type, message_id, source, destination);
        sns.publish(topic_arn, None, &message)?;
        info!(source, %notification_type, topic_arn, "Feedback published");
        Ok(())
    }

    /// Publishes feedback, then records the message. Nothing is recorded if publishing fails.
    fn accept(
        &mut self,
        sns: &mut SnsBackend,
        source: &str,
        destination: Destination,
        content: MessageContent,
    ) -> Result<String, SesError> {
        let message_id = message_id();
        self.publish_feedback(sns, &message_id, source, &destination)?;
        let recipients = destination.count();
        self.sent_message_count += recipients as u64;
        self.sent.push(SentMessage {
            message_id: message_id.clone(),
            source: source.to_string(),
            destination,
            content,
            sent_at: time::now(),
        });
        info!(%message_id, source, recipients, sent = self.sent.len(), "Sent");
        Ok(message_id)
    }

    #[instrument(skip(self, sns, destination, body), fields(recipients = destination.count()))]
    pub fn send_email(
        &mut self,
        sns: &mut SnsBackend,
        source: &str,
        destination: &Destination,
        subject: &str,
        body: Body,
    ) -> Result<String, SesError> {
        if destination.count() > RECIPIENT_LIMIT {
            return Err(SesError::TooManyRecipients);
        }
        self.require_verified(source)?;
        check_addresses(std::iter::once(source).chain(destination.addresses()))?;
        let content = MessageContent::Simple {
            subject: subject.to_string(),
            body,
        };
        self.accept(sns, source, destination.clone(), content)
    }

    #[instrument(skip(self, sns, destination, template_data), fields(recipients = destination.count()))]
    pub fn send_templated_email(
        &mut self,
        sns: &mut SnsBackend,
        source: &str,
        destination: &Destination,
        template: &str,
        template_data: &str,
    ) -> Result<String, SesError> {
        if destination.count() > RECIPIENT_LIMIT {
            return Err(SesError::TooManyRecipients);
        }
        self.require_verified(source)?;
        check_addresses(std::iter::once(source).chain(destination.addresses()))?;
        if !self.has_template(template) {
            return Err(SesError::TemplateMissing(template.to_string()));
        }
        let content = MessageContent::Templated {
            template: template.to_string(),
            template_data: template_data.to_string(),
        };
        self.accept(sns, source, destination.clone(), content)
    }

    /// Sends one message per destination and returns their ids in order.
    ///
    /// Both the number of destinations and the total number of addresses are capped at
    /// [`RECIPIENT_LIMIT`].
    #[instrument(skip(self, sns, default_template_data, destinations), fields(count = destinations.len()))]
    pub fn send_bulk_templated_email(
        &mut self,
        sns: &mut SnsBackend,
        source: &str,
        template: &str,
        default_template_data: &str,
        destinations: &[BulkDestination],
    ) -> Result<Vec<String>, SesError> {
        let total: usize = destinations.iter().map(|d| d.destination.count()).sum();
        if destinations.len() > RECIPIENT_LIMIT || total > RECIPIENT_LIMIT {
            return Err(SesError::TooManyDestinations);
        }
        self.require_verified(source)?;
        if !self.has_template(template) {
            return Err(SesError::TemplateMissing(template.to_string()));
        }
        destinations
            .iter()
            .map(|entry| {
                let template_data = entry
                    .replacement_template_data
                    .as_deref()
                    .unwrap_or(default_template_data);
                let content = MessageContent::Templated {
                    template: template.to_string(),
                    template_data: template_data.to_string(),
                };
                self.accept(sns, source, entry.destination.clone(), content)
            })
            .collect()
    }

    /// Sends a raw MIME message. Recipients are `destinations` plus every `To`, `Cc` and
    /// `Bcc` header; without `source` the `From` header is the sender.
    #[instrument(skip(self, sns, destinations, raw_data))]
    pub fn send_raw_email(
        &mut self,
        sns: &mut SnsBackend,
        source: Option<&str>,
        destinations: &[String],
        raw_data: &str,
    ) -> Result<String, SesError> {
        if let Some(source) = source {
            let address = bare_address(source);
            if !self.is_verified(address) {
                return Err(SesError::NoAuthority(address.to_string()));
            }
        }
        let headers = parse_raw_headers(raw_data);
        let source = match source {
            Some(source) => source.to_string(),
            None => {
                let from = headers.from.ok_or(SesError::SourceNotSpecified)?;
                if !self.is_verified(&from) {
                    return Err(SesError::NoAuthority(from));
                }
                from
            }
        };

        let mut recipients = destinations.to_vec();
        recipients.extend(headers.recipients);
        if recipients.len() > RECIPIENT_LIMIT {
            return Err(SesError::TooManyRecipients);
        }
        check_addresses(std::iter::once(source.as_str()).chain(recipients.iter().map(String::as_str)))?;

        let content = MessageContent::Raw {
            data: raw_data.to_string(),
        };
        self.accept(sns, &source, Destination::to(recipients), content)
    }

    /// Every accepted message, oldest first.
    pub fn sent_messages(&self) -> &[SentMessage] {
        &self.sent
    }

    pub fn get_send_quota(&self) -> SendQuota {
        SendQuota {
            max_24_hour_send: MAX_24_HOUR_SEND,
            max_send_rate: MAX_SEND_RATE,
            sent_last_24_hours: self.sent_message_count,
        }
    }

    pub fn get_send_statistics(&self) -> SendStatistics {
        SendStatistics {
            delivery_attempts: self.sent_message_count,
            rejects: self.rejected_message_count,
            complaints: 0,
            bounces: 0,
            timestamp: time::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_core::{Backend, Scope};

    #[test]
    fn message_ids_have_seven_groups() {
        let id = message_id();
        let lens: Vec<usize> = id.split('-').map(str::len).collect();
        assert_eq!(lens, vec![16, 8, 4, 4, 4, 12, 6]);
    }

    #[test]
    fn feedback_type_uses_first_matching_recipient() {
        assert_eq!(
            feedback_type(["plain@x.com", "bounce@x.com", "success@x.com"]),
            Some(NotificationType::Bounce)
        );
        assert_eq!(feedback_type(["plain@x.com"]), None);
    }

    #[test]
    fn checks_run_in_order() {
        let scope = Scope::new("123456789012", "us-east-1");
        let mut ses = SesBackend::new(scope.clone());
        let mut sns = SnsBackend::new(scope);
        let crowd = Destination::to((0..51).map(|i| format!("r{i}@example.com")));
        // The recipient ceiling is checked before verification, so nothing is counted.
        assert_eq!(
            ses.send_email(&mut sns, "nobody@example.com", &crowd, "s", Body::default()),
            Err(SesError::TooManyRecipients)
        );
        assert_eq!(ses.get_send_statistics().rejects, 0);

        ses.verify_domain("example.com");
        assert_eq!(
            ses.send_email(&mut sns, "me@example.com", &Destination::to(["bad"]), "s", Body::default()),
            Err(SesError::InvalidParameterValue("Missing domain".into()))
        );
        assert_eq!(
            ses.send_templated_email(&mut sns, "me@example.com", &Destination::to(["a@b.com"]), "nope", "{}"),
            Err(SesError::TemplateMissing("nope".into()))
        );
        assert!(ses.sent_messages().is_empty());
    }
}
