//! Configuration sets and their event destinations.

use super::error::SesError;
use backend_core::tags::to_map;
use backend_core::{BackendEntity, Scope, Tag, TagPolicy};
use serde::Serialize;

const SUPPRESSION_REASONS: [&str; 2] = ["BOUNCE", "COMPLAINT"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackingOptions {
    pub custom_redirect_domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryOptions {
    pub tls_policy: Option<String>,
    pub sending_pool_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReputationOptions {
    pub reputation_metrics_enabled: bool,
}

/// Everything the v2 API can set at creation; the v1 API creates with the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationSetOptions {
    pub tracking_options: Option<TrackingOptions>,
    pub delivery_options: Option<DeliveryOptions>,
    pub reputation_options: ReputationOptions,
    pub sending_enabled: bool,
    pub tags: Vec<Tag>,
    pub suppressed_reasons: Vec<String>,
}

impl Default for ConfigurationSetOptions {
    fn default() -> Self {
        Self {
            tracking_options: None,
            delivery_options: None,
            reputation_options: ReputationOptions::default(),
            sending_enabled: true,
            tags: Vec::new(),
            suppressed_reasons: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDestination {
    pub name: String,
    pub enabled: bool,
    pub matching_event_types: Vec<String>,
    pub sns_topic_arn: Option<String>,
}

impl EventDestination {
    pub fn sns(name: impl Into<String>, topic_arn: impl Into<String>, event_types: &[&str]) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            matching_event_types: event_types.iter().map(|t| t.to_string()).collect(),
            sns_topic_arn: Some(topic_arn.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationSet {
    pub name: String,
    pub options: ConfigurationSetOptions,
    pub event_destinations: Vec<EventDestination>,
}

impl BackendEntity for ConfigurationSet {
    type Id = String;
    type Create = ConfigurationSetOptions;
    type Update = bool;
    type Context = Scope;
    type Error = SesError;
    const KIND: &'static str = "ConfigurationSet";

    fn id(&self) -> &String {
        &self.name
    }

    fn from_create_params(
        name: String,
        options: ConfigurationSetOptions,
        _scope: &Scope,
    ) -> Result<Self, SesError> {
        TagPolicy::STANDARD
            .check_unique(&options.tags)
            .and_then(|_| TagPolicy::STANDARD.check_replacement(&to_map(&options.tags)))
            .map_err(|violation| SesError::Validation(violation.to_string()))?;
        if let Some(reason) = options
            .suppressed_reasons
            .iter()
            .find(|reason| !SUPPRESSION_REASONS.contains(&reason.as_str()))
        {
            return Err(SesError::Validation(format!(
                "Value '{reason}' at 'suppressionOptions.suppressedReasons' failed to satisfy \
                 constraint: Member must satisfy enum value set: [BOUNCE, COMPLAINT]"
            )));
        }
        Ok(Self {
            name,
            options,
            event_destinations: Vec::new(),
        })
    }

    /// The only in-place update is the reputation metrics flag.
    fn on_update(&mut self, reputation_metrics_enabled: bool, _scope: &Scope) -> Result<(), SesError> {
        self.options.reputation_options.reputation_metrics_enabled = reputation_metrics_enabled;
        Ok(())
    }

    fn not_found(name: &String, _scope: &Scope) -> SesError {
        SesError::missing_configuration_set(name)
    }

    fn already_exists(name: &String, _scope: &Scope) -> SesError {
        SesError::ConfigurationSetAlreadyExists(name.clone())
    }
}
