//! # CodePipeline Backend
//!
//! Stores pipeline declarations with a version counter and creation/update timestamps.
//!
//! ## Creation Rules
//!
//! Checked in this order, each failing fast:
//!
//! 1. The name must be free in this account.
//! 2. `roleArn` must name an existing IAM role whose trust policy lets
//!    `codepipeline.amazonaws.com` assume it.
//! 3. The declaration must have at least two stages.
//!
//! Creation and update both fill action defaults (`runOrder = 1`, empty `configuration`,
//! empty artifact lists). Deleting an unknown pipeline is not an error.
//!
//! ## Collaborators
//!
//! The role lookup needs the account's [`IamBackend`]. It is passed into
//! [`CodePipelineBackend::create_pipeline`] by the caller that owns both backends, usually
//! [`AwsContext`](crate::context::AwsContext).

pub mod entity;
pub mod error;
pub mod model;

pub use entity::*;
pub use error::*;
pub use model::*;

use crate::iam::IamBackend;
use backend_core::tags::{remove_keys, to_list};
use backend_core::{paginate, Backend, Page, PageLimits, PageRequest, ResourceStore, Scope, Tag};
use tracing::{instrument, warn};

/// Service principal a pipeline role must trust.
pub const SERVICE_PRINCIPAL: &str = "codepipeline.amazonaws.com";

/// Fewest stages a pipeline may have.
pub const MIN_STAGES: usize = 2;

const PIPELINE_PAGE: PageLimits = PageLimits::new(100, 1000);

#[derive(Debug)]
pub struct CodePipelineBackend {
    scope: Scope,
    pipelines: ResourceStore<Pipeline>,
}

impl Backend for CodePipelineBackend {
    const SERVICE: &'static str = "codepipeline";

    fn new(scope: Scope) -> Self {
        Self {
            pipelines: ResourceStore::new(scope.clone()),
            scope,
        }
    }
}

fn name_from_arn(arn: &str) -> String {
    arn.rsplit(':').next().unwrap_or(arn).to_string()
}

impl CodePipelineBackend {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Creates a pipeline and returns the stored declaration with the tags sorted by key.
    #[instrument(skip_all, fields(name = %declaration.name, region = %self.scope.region))]
    pub fn create_pipeline(
        &mut self,
        iam: &IamBackend,
        declaration: PipelineDeclaration,
        tags: Vec<Tag>,
    ) -> Result<(PipelineDeclaration, Vec<Tag>), CodePipelineError> {
        let name = declaration.name.clone();
        self.pipelines.ensure_absent(&name)?;

        let trusted = iam
            .get_role_by_arn(&declaration.role_arn)
            .map(|role| role.trusts_service(SERVICE_PRINCIPAL))
            .unwrap_or(false);
        if !trusted {
            warn!(role_arn = %declaration.role_arn, "Role not assumable by pipeline service");
            return Err(CodePipelineError::InvalidStructure(format!(
                "CodePipeline is not authorized to perform AssumeRole on role {}",
                declaration.role_arn
            )));
        }

        if declaration.stages.len() < MIN_STAGES {
            return Err(CodePipelineError::InvalidStructure(format!(
                "Pipeline has only {} stage(s). There should be a minimum of {MIN_STAGES} stages in a pipeline",
                declaration.stages.len()
            )));
        }

        let pipeline = self
            .pipelines
            .create(name, PipelineCreate { declaration, tags })?;
        Ok((pipeline.view(), to_list(&pipeline.tags)))
    }

    pub fn get_pipeline(
        &self,
        name: &str,
    ) -> Result<(PipelineDeclaration, PipelineMetadata), CodePipelineError> {
        let pipeline = self.pipelines.get(&name.to_string()).ok_or_else(|| {
            CodePipelineError::PipelineNotFound(format!(
                "Account '{}' does not have a pipeline with name '{name}'",
                self.scope.account_id
            ))
        })?;
        Ok((pipeline.view(), pipeline.metadata()))
    }

    /// Replaces the declaration stored under `declaration.name` and bumps its version.
    #[instrument(skip_all, fields(name = %declaration.name))]
    pub fn update_pipeline(
        &mut self,
        declaration: PipelineDeclaration,
    ) -> Result<PipelineDeclaration, CodePipelineError> {
        let name = declaration.name.clone();
        self.pipelines
            .update(&name, declaration)
            .map(Pipeline::view)
    }

    pub fn delete_pipeline(&mut self, name: &str) {
        self.pipelines.discard(&name.to_string());
    }

    /// Pipelines ordered by name.
    pub fn list_pipelines(
        &self,
        request: &PageRequest,
    ) -> Result<Page<PipelineSummary>, CodePipelineError> {
        let summaries = self.pipelines.values().map(Pipeline::summary).collect();
        paginate(summaries, request, PIPELINE_PAGE, &(), |s: &PipelineSummary| {
            s.name.clone()
        })
        .map_err(|e| CodePipelineError::InvalidNextToken(e.to_string()))
    }

    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values()
    }

    pub fn tag_resource(&mut self, arn: &str, tags: &[Tag]) -> Result<(), CodePipelineError> {
        let pipeline = self.pipelines.require_mut(&name_from_arn(arn))?;
        pipeline.tags = pipeline.validate_tags(tags)?;
        Ok(())
    }

    pub fn untag_resource(&mut self, arn: &str, keys: &[String]) -> Result<(), CodePipelineError> {
        let pipeline = self.pipelines.require_mut(&name_from_arn(arn))?;
        remove_keys(&mut pipeline.tags, keys);
        Ok(())
    }

    /// Tags sorted by key.
    pub fn list_tags_for_resource(&self, arn: &str) -> Result<Vec<Tag>, CodePipelineError> {
        let pipeline = self.pipelines.require(&name_from_arn(arn))?;
        Ok(to_list(&pipeline.tags))
    }
}
