//! Identity verification and the per-identity settings: notification topics, MAIL FROM
//! domains, verification and DKIM attributes.

use super::address::{bare_address, domain_of};
use super::error::SesError;
use super::SesBackend;
use backend_core::ids;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

const VERIFICATION_TOKEN: &str = "ILQMESfEW0p6i6gIJcEWvO65TP5hg6B99hGFZ2lxrIs=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IdentityType {
    EmailAddress,
    Domain,
}

impl FromStr for IdentityType {
    type Err = SesError;

    fn from_str(s: &str) -> Result<Self, SesError> {
        match s {
            "EmailAddress" => Ok(IdentityType::EmailAddress),
            "Domain" => Ok(IdentityType::Domain),
            other => Err(SesError::Validation(format!(
                "Value '{other}' at 'identityType' failed to satisfy constraint: \
                 Member must satisfy enum value set: [Domain, EmailAddress]"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum NotificationType {
    Bounce,
    Complaint,
    Delivery,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationType::Bounce => "Bounce",
            NotificationType::Complaint => "Complaint",
            NotificationType::Delivery => "Delivery",
        };
        f.write_str(name)
    }
}

impl FromStr for NotificationType {
    type Err = SesError;

    fn from_str(s: &str) -> Result<Self, SesError> {
        match s {
            "Bounce" => Ok(NotificationType::Bounce),
            "Complaint" => Ok(NotificationType::Complaint),
            "Delivery" => Ok(NotificationType::Delivery),
            other => Err(SesError::Validation(format!(
                "Value '{other}' at 'notificationType' failed to satisfy constraint: \
                 Member must satisfy enum value set: [Bounce, Complaint, Delivery]"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NotificationConfig {
    pub(crate) topics: BTreeMap<NotificationType, String>,
    pub(crate) forwarding_enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            topics: BTreeMap::new(),
            forwarding_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAttributes {
    pub bounce_topic: Option<String>,
    pub complaint_topic: Option<String>,
    pub delivery_topic: Option<String>,
    pub forwarding_enabled: bool,
    pub headers_in_bounce_notifications_enabled: bool,
    pub headers_in_complaint_notifications_enabled: bool,
    pub headers_in_delivery_notifications_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MailFromSettings {
    domain: String,
    behavior_on_mx_failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailFromAttributes {
    pub mail_from_domain: Option<String>,
    pub mail_from_domain_status: Option<String>,
    pub behavior_on_mx_failure: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationAttributes {
    pub verification_status: String,
    pub verification_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DkimAttributes {
    pub dkim_enabled: bool,
    pub dkim_verification_status: String,
    /// Only present for verified domains.
    pub dkim_tokens: Option<Vec<String>>,
}

impl SesBackend {
    pub fn verify_email_identity(&mut self, address: &str) {
        let address = bare_address(address).to_string();
        if !self.addresses.contains(&address) {
            info!(identity = %address, "Identity verified");
            self.addresses.push(address);
        }
    }

    pub fn verify_email_address(&mut self, address: &str) {
        let address = bare_address(address).to_string();
        if !self.email_addresses.contains(&address) {
            self.email_addresses.push(address);
        }
    }

    pub fn verify_domain(&mut self, domain: &str) {
        let domain = domain.to_ascii_lowercase();
        if !self.domains.contains(&domain) {
            info!(identity = %domain, "Domain verified");
            self.domains.push(domain);
        }
    }

    /// Identities in verification order; domains first when listing both kinds.
    pub fn list_identities(&self, identity_type: Option<&str>) -> Result<Vec<String>, SesError> {
        let identity_type = identity_type.map(str::parse::<IdentityType>).transpose()?;
        Ok(match identity_type {
            Some(IdentityType::Domain) => self.domains.clone(),
            Some(IdentityType::EmailAddress) => self.addresses.clone(),
            None => self.domains.iter().chain(&self.addresses).cloned().collect(),
        })
    }

    pub fn list_verified_email_addresses(&self) -> &[String] {
        &self.email_addresses
    }

    /// Removing an identity that was never verified is not an error.
    pub fn delete_identity(&mut self, identity: &str) {
        if identity.contains('@') {
            self.addresses.retain(|a| a != identity);
            self.email_addresses.retain(|a| a != identity);
        } else {
            let domain = identity.to_ascii_lowercase();
            self.domains.retain(|d| *d != domain);
        }
        self.notifications.remove(identity);
        self.mail_from.remove(identity);
    }

    fn is_identity(&self, identity: &str) -> bool {
        self.domains.iter().chain(&self.addresses).any(|i| i == identity)
    }

    /// The address itself is verified, or its domain is.
    pub fn is_verified(&self, mailbox: &str) -> bool {
        let address = bare_address(mailbox);
        if self.addresses.iter().chain(&self.email_addresses).any(|a| a == address) {
            return true;
        }
        let host = address.rsplit('@').next().unwrap_or(address).to_ascii_lowercase();
        self.domains.contains(&host)
    }

    // Notifications

    /// Sets or, with `None`, clears the topic for one notification type.
    pub fn set_identity_notification_topic(
        &mut self,
        identity: &str,
        notification_type: NotificationType,
        topic_arn: Option<&str>,
    ) {
        let config = self.notifications.entry(identity.to_string()).or_default();
        match topic_arn {
            Some(arn) => {
                config.topics.insert(notification_type, arn.to_string());
            }
            None => {
                config.topics.remove(&notification_type);
            }
        }
    }

    pub fn set_identity_feedback_forwarding_enabled(&mut self, identity: &str, enabled: bool) {
        self.notifications
            .entry(identity.to_string())
            .or_default()
            .forwarding_enabled = enabled;
    }

    pub fn get_identity_notification_attributes(
        &self,
        identities: &[String],
    ) -> BTreeMap<String, NotificationAttributes> {
        identities
            .iter()
            .map(|identity| {
                let config = self.notifications.get(identity).cloned().unwrap_or_default();
                let topic = |t: NotificationType| config.topics.get(&t).cloned();
                let attributes = NotificationAttributes {
                    bounce_topic: topic(NotificationType::Bounce),
                    complaint_topic: topic(NotificationType::Complaint),
                    delivery_topic: topic(NotificationType::Delivery),
                    forwarding_enabled: config.forwarding_enabled,
                    headers_in_bounce_notifications_enabled: false,
                    headers_in_complaint_notifications_enabled: false,
                    headers_in_delivery_notifications_enabled: false,
                };
                (identity.clone(), attributes)
            })
            .collect()
    }

    /// Topic for `notification_type` configured on the source address or, failing that, on
    /// its domain.
    pub(crate) fn notification_topic(&self, source: &str, notification_type: NotificationType) -> Option<&str> {
        let address = bare_address(source);
        if let Some(topic) = self.identity_topic(address, notification_type) {
            return Some(topic);
        }
        let domain = domain_of(address)?;
        self.identity_topic(&domain, notification_type)
    }

    fn identity_topic(&self, identity: &str, notification_type: NotificationType) -> Option<&str> {
        self.notifications
            .get(identity)?
            .topics
            .get(&notification_type)
            .map(String::as_str)
    }

    // MAIL FROM

    /// Sets or, with `None`, clears the custom MAIL FROM domain of a verified identity.
    pub fn set_identity_mail_from_domain(
        &mut self,
        identity: &str,
        mail_from_domain: Option<&str>,
        behavior_on_mx_failure: Option<&str>,
    ) -> Result<(), SesError> {
        if !self.is_verified(identity) {
            return Err(SesError::InvalidParameterValue(format!(
                "Identity '{identity}' does not exist."
            )));
        }
        let Some(mail_from_domain) = mail_from_domain else {
            self.mail_from.remove(identity);
            return Ok(());
        };
        let identity_domain = identity.rsplit('@').next().unwrap_or(identity);
        if !mail_from_domain.ends_with(identity_domain) {
            return Err(SesError::InvalidParameterValue(format!(
                "Provided MAIL-FROM domain '{mail_from_domain}' is not subdomain of \
                 the domain of the identity '{identity_domain}'."
            )));
        }
        if let Some(behavior) = behavior_on_mx_failure {
            if behavior != "RejectMessage" && behavior != "UseDefaultValue" {
                return Err(SesError::Validation(format!(
                    "1 validation error detected: Value '{behavior}' at 'behaviorOnMXFailure' \
                     failed to satisfy constraint: Member must satisfy enum value set: \
                     [RejectMessage, UseDefaultValue]"
                )));
            }
        }
        self.mail_from.insert(
            identity.to_string(),
            MailFromSettings {
                domain: mail_from_domain.to_string(),
                behavior_on_mx_failure: behavior_on_mx_failure.map(str::to_string),
            },
        );
        Ok(())
    }

    /// Attributes of the requested identities; unknown identities are left out.
    pub fn get_identity_mail_from_domain_attributes(
        &self,
        identities: &[String],
    ) -> BTreeMap<String, MailFromAttributes> {
        identities
            .iter()
            .filter(|identity| self.is_identity(identity))
            .map(|identity| {
                let settings = self.mail_from.get(identity);
                let attributes = MailFromAttributes {
                    mail_from_domain: settings.map(|s| s.domain.clone()),
                    mail_from_domain_status: settings.map(|_| "Success".to_string()),
                    behavior_on_mx_failure: settings
                        .and_then(|s| s.behavior_on_mx_failure.clone())
                        .unwrap_or_else(|| "UseDefaultValue".to_string()),
                };
                (identity.clone(), attributes)
            })
            .collect()
    }

    pub fn get_identity_verification_attributes(
        &self,
        identities: &[String],
    ) -> BTreeMap<String, VerificationAttributes> {
        identities
            .iter()
            .filter(|identity| self.is_identity(identity))
            .map(|identity| {
                let attributes = VerificationAttributes {
                    verification_status: "Success".to_string(),
                    verification_token: VERIFICATION_TOKEN.to_string(),
                };
                (identity.clone(), attributes)
            })
            .collect()
    }

    /// Verified domains get three DKIM tokens, generated once and then kept.
    pub fn get_identity_dkim_attributes(
        &mut self,
        identities: &[String],
    ) -> BTreeMap<String, DkimAttributes> {
        let mut result = BTreeMap::new();
        for identity in identities {
            let verified = self.is_identity(identity);
            let dkim_tokens = (verified && !identity.contains('@')).then(|| {
                self.dkim_tokens
                    .entry(identity.clone())
                    .or_insert_with(|| (0..3).map(|_| dkim_token()).collect())
                    .clone()
            });
            result.insert(
                identity.clone(),
                DkimAttributes {
                    dkim_enabled: true,
                    dkim_verification_status: if verified { "Success" } else { "NotStarted" }
                        .to_string(),
                    dkim_tokens,
                },
            );
        }
        result
    }
}

fn dkim_token() -> String {
    ids::random_upper_alphanumeric(32).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_core::{Backend, Scope};

    fn backend() -> SesBackend {
        SesBackend::new(Scope::new("123456789012", "us-east-1"))
    }

    #[test]
    fn domain_verification_covers_its_addresses() {
        let mut ses = backend();
        ses.verify_domain("Example.com");
        assert!(ses.is_verified("Someone <someone@example.com>"));
        assert!(!ses.is_verified("someone@other.com"));
        ses.verify_email_identity("me@other.com");
        assert_eq!(
            ses.list_identities(None).unwrap(),
            vec!["example.com", "me@other.com"]
        );
        assert!(matches!(
            ses.list_identities(Some("Bogus")),
            Err(SesError::Validation(_))
        ));
        ses.delete_identity("me@other.com");
        ses.delete_identity("me@other.com");
        assert_eq!(ses.list_identities(Some("EmailAddress")).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn notification_topics_fall_back_to_domain() {
        let mut ses = backend();
        ses.set_identity_notification_topic("example.com", NotificationType::Bounce, Some("arn:t"));
        assert_eq!(
            ses.notification_topic("a@example.com", NotificationType::Bounce),
            Some("arn:t")
        );
        assert_eq!(ses.notification_topic("a@example.com", NotificationType::Delivery), None);
        ses.set_identity_notification_topic("a@example.com", NotificationType::Bounce, Some("arn:a"));
        assert_eq!(
            ses.notification_topic("A <a@example.com>", NotificationType::Bounce),
            Some("arn:a")
        );
        assert_eq!(
            ses.notification_topic("b@example.com", NotificationType::Bounce),
            Some("arn:t")
        );
        ses.set_identity_notification_topic("a@example.com", NotificationType::Bounce, None);
        ses.set_identity_notification_topic("example.com", NotificationType::Bounce, None);
        assert_eq!(ses.notification_topic("a@example.com", NotificationType::Bounce), None);

        ses.set_identity_feedback_forwarding_enabled("example.com", false);
        let attrs = ses.get_identity_notification_attributes(&["example.com".into(), "x.org".into()]);
        assert!(!attrs["example.com"].forwarding_enabled);
        assert!(attrs["x.org"].forwarding_enabled);
    }

    #[test]
    fn mail_from_domain_rules() {
        let mut ses = backend();
        assert!(matches!(
            ses.set_identity_mail_from_domain("example.com", Some("mail.example.com"), None),
            Err(SesError::InvalidParameterValue(_))
        ));
        ses.verify_domain("example.com");
        assert!(matches!(
            ses.set_identity_mail_from_domain("example.com", Some("mail.other.com"), None),
            Err(SesError::InvalidParameterValue(_))
        ));
        assert!(matches!(
            ses.set_identity_mail_from_domain("example.com", Some("mail.example.com"), Some("Bounce")),
            Err(SesError::Validation(_))
        ));
        ses.set_identity_mail_from_domain("example.com", Some("mail.example.com"), Some("RejectMessage"))
            .unwrap();
        let attrs = ses.get_identity_mail_from_domain_attributes(&["example.com".into()]);
        assert_eq!(attrs["example.com"].mail_from_domain.as_deref(), Some("mail.example.com"));
        assert_eq!(attrs["example.com"].behavior_on_mx_failure, "RejectMessage");
    }

    #[test]
    fn dkim_tokens_are_stable() {
        let mut ses = backend();
        ses.verify_domain("example.com");
        let ids = vec!["example.com".to_string(), "unknown.org".to_string()];
        let first = ses.get_identity_dkim_attributes(&ids);
        let second = ses.get_identity_dkim_attributes(&ids);
        assert_eq!(first["example.com"].dkim_tokens.as_ref().map(Vec::len), Some(3));
        assert_eq!(first["example.com"].dkim_tokens, second["example.com"].dkim_tokens);
        assert_eq!(first["unknown.org"].dkim_verification_status, "NotStarted");
        assert_eq!(first["unknown.org"].dkim_tokens, None);
    }
}
