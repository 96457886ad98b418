//! # SES Backend
//!
//! Verified identities, outbound sends, templates, configuration sets and receipt rules for
//! one account and region.
//!
//! ## Sending
//!
//! A send never records a partial message. Its checks run in a fixed order and the first
//! failure aborts the call:
//!
//! 1. recipient count (at most [`RECIPIENT_LIMIT`])
//! 2. the source must be a verified address, or belong to a verified domain
//! 3. every address must parse
//! 4. the template must exist (templated sends only)
//!
//! An unverified source is the one rejection that leaves a trace: it bumps the rejection
//! counter reported by [`SesBackend::get_send_statistics`].
//!
//! ## Feedback Notifications
//!
//! Like the SES mailbox simulator, a recipient containing `success`, `complaint` or `bounce`
//! produces a delivery, complaint or bounce notification. When the sending identity has a
//! topic configured for that type, the notification is published to the [`SnsBackend`] the
//! caller passes into the send.
//!
//! [`SnsBackend`]: crate::sns::SnsBackend

pub mod address;
pub mod config_set;
pub mod error;
pub mod identity;
pub mod receipt;
pub mod send;
pub mod template;

pub use config_set::*;
pub use error::*;
pub use identity::*;
pub use receipt::{ReceiptRule, ReceiptRuleSets};
pub use send::*;
pub use template::{Template, TemplateInput, TemplateMetadata};

use backend_core::{
    paginate, Backend, Page, PageLimits, PageRequest, ResourceStore, Scope,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};

const CONFIGURATION_SET_PAGE: PageLimits = PageLimits::new(100, 1000);

#[derive(Debug)]
pub struct SesBackend {
    scope: Scope,
    /// Identities verified through `verify_email_identity`, in verification order.
    addresses: Vec<String>,
    /// Addresses verified through the legacy `verify_email_address`.
    email_addresses: Vec<String>,
    domains: Vec<String>,
    notifications: BTreeMap<String, NotificationConfig>,
    mail_from: BTreeMap<String, MailFromSettings>,
    dkim_tokens: BTreeMap<String, Vec<String>>,
    sent: Vec<SentMessage>,
    sent_message_count: u64,
    rejected_message_count: u64,
    configuration_sets: ResourceStore<ConfigurationSet>,
    event_destination_names: BTreeSet<String>,
    templates: ResourceStore<Template>,
    receipt_rule_sets: ReceiptRuleSets,
}

impl Backend for SesBackend {
    const SERVICE: &'static str = "ses";

    fn new(scope: Scope) -> Self {
        Self {
            addresses: Vec::new(),
            email_addresses: Vec::new(),
            domains: Vec::new(),
            notifications: BTreeMap::new(),
            mail_from: BTreeMap::new(),
            dkim_tokens: BTreeMap::new(),
            sent: Vec::new(),
            sent_message_count: 0,
            rejected_message_count: 0,
            configuration_sets: ResourceStore::new(scope.clone()),
            event_destination_names: BTreeSet::new(),
            templates: ResourceStore::new(scope.clone()),
            receipt_rule_sets: ReceiptRuleSets::default(),
            scope,
        }
    }
}

impl SesBackend {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    // Configuration sets

    pub fn create_configuration_set(&mut self, name: &str) -> Result<(), SesError> {
        self.create_configuration_set_v2(name, ConfigurationSetOptions::default())
    }

    #[instrument(skip(self, options), fields(region = %self.scope.region))]
    pub fn create_configuration_set_v2(
        &mut self,
        name: &str,
        options: ConfigurationSetOptions,
    ) -> Result<(), SesError> {
        self.configuration_sets
            .create(name.to_string(), options)
            .map(|_| ())
    }

    pub fn describe_configuration_set(&self, name: &str) -> Result<&ConfigurationSet, SesError> {
        self.configuration_sets.require(&name.to_string())
    }

    /// Strict: an unknown name is an error.
    pub fn delete_configuration_set(&mut self, name: &str) -> Result<(), SesError> {
        let removed = self.configuration_sets.delete(&name.to_string())?;
        for destination in &removed.event_destinations {
            self.event_destination_names.remove(&destination.name);
        }
        Ok(())
    }

    /// Pages through configuration sets ordered by name.
    pub fn list_configuration_sets(
        &self,
        request: &PageRequest,
    ) -> Result<Page<ConfigurationSet>, SesError> {
        let all: Vec<ConfigurationSet> = self.configuration_sets.values().cloned().collect();
        Ok(paginate(all, request, CONFIGURATION_SET_PAGE, &(), |set| {
            set.name.clone()
        })?)
    }

    /// Destination names are unique across every configuration set of the backend.
    pub fn create_configuration_set_event_destination(
        &mut self,
        configuration_set: &str,
        destination: EventDestination,
    ) -> Result<(), SesError> {
        let set = self
            .configuration_sets
            .get_mut(&configuration_set.to_string())
            .ok_or_else(|| {
                SesError::ConfigurationSetDoesNotExist("Invalid Configuration Set Name.".to_string())
            })?;
        if self.event_destination_names.contains(&destination.name) {
            return Err(SesError::EventDestinationAlreadyExists);
        }
        self.event_destination_names.insert(destination.name.clone());
        info!(configuration_set, destination = %destination.name, "Event destination added");
        set.event_destinations.push(destination);
        Ok(())
    }

    pub fn update_configuration_set_reputation_metrics_enabled(
        &mut self,
        name: &str,
        enabled: bool,
    ) -> Result<(), SesError> {
        self.configuration_sets
            .update(&name.to_string(), enabled)
            .map(|_| ())
    }

    // Templates

    pub fn create_template(&mut self, input: TemplateInput) -> Result<(), SesError> {
        input.check_name()?;
        self.templates.create(input.name.clone(), input).map(|_| ())
    }

    pub fn update_template(&mut self, input: TemplateInput) -> Result<(), SesError> {
        input.check_name()?;
        self.templates.update(&input.name.clone(), input).map(|_| ())
    }

    pub fn get_template(&self, name: &str) -> Result<&Template, SesError> {
        self.templates.require(&name.to_string())
    }

    pub fn list_templates(&self) -> Vec<TemplateMetadata> {
        self.templates.values().map(Template::metadata).collect()
    }

    /// Strict: an unknown name is an error.
    pub fn delete_template(&mut self, name: &str) -> Result<(), SesError> {
        self.templates.delete(&name.to_string()).map(|_| ())
    }

    pub fn test_render_template(&self, name: &str, template_data: &str) -> Result<String, SesError> {
        self.get_template(name)?.render(template_data)
    }

    pub(crate) fn has_template(&self, name: &str) -> bool {
        self.templates.contains(&name.to_string())
    }

    // Receipt rules

    pub fn create_receipt_rule_set(&mut self, rule_set: &str) -> Result<(), SesError> {
        self.receipt_rule_sets.create_set(rule_set)
    }

    pub fn create_receipt_rule(
        &mut self,
        rule_set: &str,
        rule: ReceiptRule,
        after: Option<&str>,
    ) -> Result<(), SesError> {
        self.receipt_rule_sets.create_rule(rule_set, rule, after)
    }

    pub fn describe_receipt_rule_set(&self, rule_set: &str) -> Result<&[ReceiptRule], SesError> {
        self.receipt_rule_sets.describe_set(rule_set)
    }

    pub fn describe_receipt_rule(&self, rule_set: &str, rule: &str) -> Result<&ReceiptRule, SesError> {
        self.receipt_rule_sets.describe_rule(rule_set, rule)
    }

    pub fn update_receipt_rule(&mut self, rule_set: &str, rule: ReceiptRule) -> Result<(), SesError> {
        self.receipt_rule_sets.update_rule(rule_set, rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_core::{ProviderError, Tag};

    fn backend() -> SesBackend {
        SesBackend::new(Scope::new("123456789012", "us-east-1"))
    }

    #[test]
    fn configuration_set_lifecycle() {
        let mut ses = backend();
        ses.create_configuration_set("primary").unwrap();
        assert_eq!(
            ses.create_configuration_set("primary"),
            Err(SesError::ConfigurationSetAlreadyExists("primary".into()))
        );
        assert!(ses.describe_configuration_set("primary").unwrap().options.sending_enabled);

        ses.update_configuration_set_reputation_metrics_enabled("primary", true)
            .unwrap();
        assert!(
            ses.describe_configuration_set("primary")
                .unwrap()
                .options
                .reputation_options
                .reputation_metrics_enabled
        );

        ses.delete_configuration_set("primary").unwrap();
        let err = ses.delete_configuration_set("primary").unwrap_err();
        assert_eq!(err.to_string(), "Configuration set <primary> does not exist");
        assert_eq!(err.code(), "ConfigurationSetDoesNotExist");
    }

    #[test]
    fn v2_options_are_validated_and_kept() {
        fn options(tags: Vec<Tag>, reasons: &[&str]) -> ConfigurationSetOptions {
            ConfigurationSetOptions {
                tags,
                suppressed_reasons: reasons.iter().map(|r| r.to_string()).collect(),
                ..ConfigurationSetOptions::default()
            }
        }

        let mut ses = backend();

        assert!(matches!(
            ses.create_configuration_set_v2("dup", options(vec![Tag::new("a", "1"), Tag::new("a", "2")], &[])),
            Err(SesError::Validation(_))
        ));
        assert!(matches!(
            ses.create_configuration_set_v2("sys", options(vec![Tag::new("aws:x", "1")], &[])),
            Err(SesError::Validation(_))
        ));
        assert!(matches!(
            ses.create_configuration_set_v2("why", options(Vec::new(), &["SPAM"])),
            Err(SesError::Validation(_))
        ));
        assert!(ses.describe_configuration_set("dup").is_err());

        ses.create_configuration_set_v2("ok", options(vec![Tag::new("team", "mail")], &["BOUNCE"]))
            .unwrap();
        let described = ses.describe_configuration_set("ok").unwrap();
        assert_eq!(described.options.tags, vec![Tag::new("team", "mail")]);
        assert_eq!(described.options.suppressed_reasons, vec!["BOUNCE"]);
    }

    #[test]
    fn event_destination_names_are_unique() {
        let mut ses = backend();
        ses.create_configuration_set("a").unwrap();
        ses.create_configuration_set("b").unwrap();
        let dest = EventDestination::sns("to-sns", "arn:aws:sns:us-east-1:123456789012:t", &["send"]);
        ses.create_configuration_set_event_destination("a", dest.clone())
            .unwrap();
        assert_eq!(
            ses.create_configuration_set_event_destination("b", dest.clone()),
            Err(SesError::EventDestinationAlreadyExists)
        );
        assert_eq!(
            ses.create_configuration_set_event_destination("missing", dest),
            Err(SesError::ConfigurationSetDoesNotExist(
                "Invalid Configuration Set Name.".into()
            ))
        );
    }

    #[test]
    fn template_crud() {
        let mut ses = backend();
        assert!(matches!(
            ses.create_template(TemplateInput::new("", "s")),
            Err(SesError::Validation(_))
        ));
        ses.create_template(TemplateInput::new("t", "subject")).unwrap();
        assert_eq!(
            ses.create_template(TemplateInput::new("t", "subject")),
            Err(SesError::TemplateNameAlreadyExists)
        );
        ses.update_template(TemplateInput::new("t", "changed")).unwrap();
        assert_eq!(ses.get_template("t").unwrap().subject_part, "changed");
        assert_eq!(
            ses.update_template(TemplateInput::new("nope", "s")),
            Err(SesError::TemplateNotFound)
        );
        assert_eq!(ses.list_templates().len(), 1);
        ses.delete_template("t").unwrap();
        assert_eq!(ses.delete_template("t"), Err(SesError::TemplateNotFound));
    }
}
