//! [`BackendEntity`] implementation for stored pipelines.

use super::error::CodePipelineError;
use super::model::{PipelineDeclaration, PipelineMetadata, PipelineSummary};
use backend_core::{time, BackendEntity, Scope, Tag, TagMap, TagPolicy, TagViolation};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub declaration: PipelineDeclaration,
    pub version: u32,
    pub arn: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub tags: TagMap,
}

#[derive(Debug, Clone)]
pub struct PipelineCreate {
    pub declaration: PipelineDeclaration,
    pub tags: Vec<Tag>,
}

impl Pipeline {
    /// The declaration as stored, with its current version filled in.
    pub fn view(&self) -> PipelineDeclaration {
        let mut declaration = self.declaration.clone();
        declaration.version = Some(self.version);
        declaration
    }

    pub fn metadata(&self) -> PipelineMetadata {
        PipelineMetadata {
            pipeline_arn: self.arn.clone(),
            created: time::iso8601(&self.created),
            updated: time::iso8601(&self.updated),
        }
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            name: self.declaration.name.clone(),
            version: self.version,
            created: time::iso8601(&self.created),
            updated: time::iso8601(&self.updated),
        }
    }

    /// Checks `incoming` against this pipeline's current tags.
    pub fn validate_tags(&self, incoming: &[Tag]) -> Result<TagMap, CodePipelineError> {
        TagPolicy::STANDARD
            .check_unique(incoming)
            .map_err(|violation| self.tag_error(violation))?;
        let incoming: TagMap = backend_core::tags::to_map(incoming);
        TagPolicy::STANDARD
            .merged(&self.tags, &incoming)
            .map_err(|violation| self.tag_error(violation))
    }

    fn tag_error(&self, violation: TagViolation) -> CodePipelineError {
        match violation {
            TagViolation::TooManyTags { .. } => CodePipelineError::TooManyTags(self.arn.clone()),
            TagViolation::ReservedKey(_) => CodePipelineError::InvalidTags(
                "Not allowed to modify system tags. System tags start with 'aws:'. msg=[Caller is an end user and not allowed to mutate system tags]"
                    .to_string(),
            ),
            other => CodePipelineError::InvalidTags(other.to_string()),
        }
    }
}

impl BackendEntity for Pipeline {
    type Id = String;
    type Create = PipelineCreate;
    type Update = PipelineDeclaration;
    type Context = Scope;
    type Error = CodePipelineError;
    const KIND: &'static str = "Pipeline";

    fn id(&self) -> &String {
        &self.declaration.name
    }

    fn from_create_params(
        name: String,
        params: PipelineCreate,
        scope: &Scope,
    ) -> Result<Self, CodePipelineError> {
        let now = time::now();
        let mut declaration = params.declaration.with_defaults();
        declaration.name = name;
        declaration.version = None;
        let mut pipeline = Self {
            arn: scope.arn("codepipeline", &declaration.name),
            declaration,
            version: 1,
            created: now,
            updated: now,
            tags: TagMap::new(),
        };
        pipeline.tags = pipeline.validate_tags(&params.tags)?;
        Ok(pipeline)
    }

    fn on_update(
        &mut self,
        declaration: PipelineDeclaration,
        _scope: &Scope,
    ) -> Result<(), CodePipelineError> {
        let mut declaration = declaration.with_defaults();
        declaration.version = None;
        self.declaration = declaration;
        self.version += 1;
        self.updated = time::now();
        Ok(())
    }

    fn not_found(name: &String, scope: &Scope) -> CodePipelineError {
        CodePipelineError::ResourceNotFound(format!(
            "The account with id '{}' does not include a pipeline with the name '{name}'",
            scope.account_id
        ))
    }

    fn already_exists(name: &String, scope: &Scope) -> CodePipelineError {
        CodePipelineError::NameInUse(format!(
            "A pipeline with the name '{name}' already exists in account '{}'",
            scope.account_id
        ))
    }
}
