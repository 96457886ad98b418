//! # IAM Backend
//!
//! Roles and their trust policies. Other backends consult it to decide whether a role may be
//! assumed by their service principal (CodePipeline checks `codepipeline.amazonaws.com`).
//!
//! IAM is a global service: one instance per account, shared by every region.

pub mod error;
pub mod model;

pub use error::*;
pub use model::*;

use backend_core::tags::{remove_keys, to_list, to_map};
use backend_core::{paginate, Backend, Page, PageLimits, PageRequest, ResourceStore, Scope, Tag, TagPolicy};
use serde::Serialize;
use tracing::{instrument, warn};

const ROLE_PAGE: PageLimits = PageLimits::new(100, 1000);

#[derive(Debug)]
pub struct IamBackend {
    scope: Scope,
    roles: ResourceStore<Role>,
}

impl Backend for IamBackend {
    const SERVICE: &'static str = "iam";
    const GLOBAL: bool = true;

    fn new(scope: Scope) -> Self {
        Self {
            roles: ResourceStore::new(scope.clone()),
            scope,
        }
    }
}

#[derive(Serialize)]
struct RoleFilter<'a> {
    path_prefix: Option<&'a str>,
}

impl IamBackend {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[instrument(skip(self, params), fields(account = %self.scope.account_id))]
    pub fn create_role(&mut self, name: &str, params: RoleCreate) -> Result<Role, IamError> {
        self.roles.create(name.to_string(), params).map(|role| role.clone())
    }

    pub fn get_role(&self, name: &str) -> Result<&Role, IamError> {
        self.roles.require(&name.to_string())
    }

    pub fn get_role_by_arn(&self, arn: &str) -> Result<&Role, IamError> {
        self.roles
            .values()
            .find(|role| role.arn == arn)
            .ok_or_else(|| {
                warn!(arn, "Role not found by ARN");
                IamError::NoSuchEntity(format!("Role {arn} not found"))
            })
    }

    /// Roles ordered by name, optionally restricted to a path prefix.
    pub fn list_roles(
        &self,
        path_prefix: Option<&str>,
        request: &PageRequest,
    ) -> Result<Page<Role>, IamError> {
        let roles: Vec<Role> = self
            .roles
            .values()
            .filter(|role| path_prefix.map_or(true, |prefix| role.path.starts_with(prefix)))
            .cloned()
            .collect();
        paginate(roles, request, ROLE_PAGE, &RoleFilter { path_prefix }, |role| {
            role.role_name.clone()
        })
        .map_err(|e| IamError::InvalidInput(e.to_string()))
    }

    pub fn update_role(&mut self, name: &str, update: RoleUpdate) -> Result<&Role, IamError> {
        self.roles.update(&name.to_string(), update)
    }

    pub fn update_assume_role_policy(&mut self, name: &str, document: &str) -> Result<(), IamError> {
        let update = RoleUpdate {
            assume_role_policy_document: Some(document.to_string()),
            ..RoleUpdate::default()
        };
        self.roles.update(&name.to_string(), update).map(|_| ())
    }

    #[instrument(skip(self), fields(account = %self.scope.account_id))]
    pub fn delete_role(&mut self, name: &str) -> Result<(), IamError> {
        self.roles.delete(&name.to_string()).map(|_| ())
    }

    pub fn tag_role(&mut self, name: &str, tags: &[Tag]) -> Result<(), IamError> {
        TagPolicy::STANDARD.check_unique(tags)?;
        let role = self.roles.require_mut(&name.to_string())?;
        TagPolicy::STANDARD.apply(&mut role.tags, &to_map(tags))?;
        Ok(())
    }

    pub fn untag_role(&mut self, name: &str, keys: &[String]) -> Result<(), IamError> {
        let role = self.roles.require_mut(&name.to_string())?;
        remove_keys(&mut role.tags, keys);
        Ok(())
    }

    pub fn list_role_tags(&self, name: &str) -> Result<Vec<Tag>, IamError> {
        Ok(to_list(&self.get_role(name)?.tags))
    }
}
