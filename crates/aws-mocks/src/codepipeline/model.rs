//! Pipeline declarations as callers submit them.
//!
//! Optional fields stay `Option` so a declaration read back shows exactly which fields the
//! caller sent and which were filled by [`PipelineDeclaration::with_defaults`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDeclaration {
    pub name: String,
    pub role_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_store: Option<ArtifactStore>,
    pub stages: Vec<StageDeclaration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStore {
    #[serde(rename = "type")]
    pub store_type: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDeclaration {
    pub name: String,
    pub actions: Vec<ActionDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDeclaration {
    pub name: String,
    pub action_type_id: ActionTypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_artifacts: Option<Vec<Artifact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_artifacts: Option<Vec<Artifact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTypeId {
    pub category: String,
    pub owner: String,
    pub provider: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
}

impl ActionDeclaration {
    /// An action carrying only the required fields.
    pub fn new(name: impl Into<String>, category: &str, provider: &str) -> Self {
        Self {
            name: name.into(),
            action_type_id: ActionTypeId {
                category: category.to_string(),
                owner: "AWS".to_string(),
                provider: provider.to_string(),
                version: "1".to_string(),
            },
            run_order: None,
            configuration: None,
            output_artifacts: None,
            input_artifacts: None,
            role_arn: None,
            region: None,
            namespace: None,
        }
    }

    fn fill_defaults(&mut self) {
        self.run_order.get_or_insert(1);
        self.configuration.get_or_insert_with(BTreeMap::new);
        self.output_artifacts.get_or_insert_with(Vec::new);
        self.input_artifacts.get_or_insert_with(Vec::new);
    }
}

impl StageDeclaration {
    pub fn new(name: impl Into<String>, actions: Vec<ActionDeclaration>) -> Self {
        Self {
            name: name.into(),
            actions,
        }
    }
}

impl PipelineDeclaration {
    /// Fills `runOrder`, `configuration`, `inputArtifacts` and `outputArtifacts` of every
    /// action that lacks them. Fields the caller set are left alone.
    pub fn with_defaults(mut self) -> Self {
        for stage in &mut self.stages {
            for action in &mut stage.actions {
                action.fill_defaults();
            }
        }
        self
    }
}

/// Entry of `list_pipelines`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub name: String,
    pub version: u32,
    pub created: String,
    pub updated: String,
}

/// `pipelineArn`, `created`, `updated` as returned by `get_pipeline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetadata {
    pub pipeline_arn: String,
    pub created: String,
    pub updated: String,
}
