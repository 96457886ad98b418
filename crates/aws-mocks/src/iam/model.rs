use super::error::IamError;
use backend_core::tags::to_map;
use backend_core::{ids, time, BackendEntity, Scope, Tag, TagMap, TagPolicy};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_MAX_SESSION_DURATION: u32 = 3600;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub role_name: String,
    pub role_id: String,
    pub arn: String,
    pub path: String,
    pub assume_role_policy_document: String,
    pub description: Option<String>,
    pub max_session_duration: u32,
    pub create_date: DateTime<Utc>,
    #[serde(skip)]
    pub tags: TagMap,
}

#[derive(Debug, Clone, Default)]
pub struct RoleCreate {
    pub assume_role_policy_document: String,
    pub path: Option<String>,
    pub description: Option<String>,
    pub max_session_duration: Option<u32>,
    pub tags: Vec<Tag>,
}

impl RoleCreate {
    pub fn new(assume_role_policy_document: impl Into<String>) -> Self {
        Self {
            assume_role_policy_document: assume_role_policy_document.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoleUpdate {
    pub assume_role_policy_document: Option<String>,
    pub description: Option<String>,
    pub max_session_duration: Option<u32>,
}

fn parse_policy(document: &str) -> Result<Value, IamError> {
    serde_json::from_str(document)
        .map_err(|_| IamError::MalformedPolicyDocument("Syntax errors in policy.".to_string()))
}

impl Role {
    /// Whether the first statement of the trust policy names `service` as a principal.
    ///
    /// A string principal matches by substring, a list principal by membership.
    pub fn trusts_service(&self, service: &str) -> bool {
        let Ok(policy) = parse_policy(&self.assume_role_policy_document) else {
            return false;
        };
        let statement = match &policy["Statement"] {
            Value::Array(statements) => statements.first(),
            Value::Object(_) => Some(&policy["Statement"]),
            _ => None,
        };
        match statement.map(|s| &s["Principal"]["Service"]) {
            Some(Value::String(principal)) => principal.contains(service),
            Some(Value::Array(principals)) => {
                principals.iter().any(|p| p.as_str() == Some(service))
            }
            _ => false,
        }
    }
}

impl BackendEntity for Role {
    type Id = String;
    type Create = RoleCreate;
    type Update = RoleUpdate;
    type Context = Scope;
    type Error = IamError;
    const KIND: &'static str = "Role";

    fn id(&self) -> &String {
        &self.role_name
    }

    fn from_create_params(name: String, params: RoleCreate, scope: &Scope) -> Result<Self, IamError> {
        parse_policy(&params.assume_role_policy_document)?;
        TagPolicy::STANDARD.check_unique(&params.tags)?;
        let tags = to_map(&params.tags);
        TagPolicy::STANDARD.check_replacement(&tags)?;
        let path = params.path.unwrap_or_else(|| "/".to_string());
        if !path.starts_with('/') || !path.ends_with('/') {
            return Err(IamError::InvalidInput(format!(
                "The specified value for path is invalid. It must begin and end with / and contain only alphanumeric characters and/or / characters. Path: {path}"
            )));
        }
        Ok(Self {
            arn: scope.global_arn("iam", &format!("role{path}{name}")),
            role_id: format!("AROA{}", ids::random_upper_alphanumeric(17)),
            role_name: name,
            path,
            assume_role_policy_document: params.assume_role_policy_document,
            description: params.description,
            max_session_duration: params
                .max_session_duration
                .unwrap_or(DEFAULT_MAX_SESSION_DURATION),
            create_date: time::now(),
            tags,
        })
    }

    fn on_update(&mut self, update: RoleUpdate, _scope: &Scope) -> Result<(), IamError> {
        if let Some(document) = update.assume_role_policy_document {
            parse_policy(&document)?;
            self.assume_role_policy_document = document;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(duration) = update.max_session_duration {
            if !(3600..=43200).contains(&duration) {
                return Err(IamError::InvalidInput(format!(
                    "1 validation error detected: Value '{duration}' at 'maxSessionDuration' failed to satisfy constraint: Member must have value less than or equal to 43200"
                )));
            }
            self.max_session_duration = duration;
        }
        Ok(())
    }

    fn not_found(name: &String, _scope: &Scope) -> IamError {
        IamError::NoSuchEntity(format!("The role with name {name} cannot be found."))
    }

    fn already_exists(name: &String, _scope: &Scope) -> IamError {
        IamError::EntityAlreadyExists(name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_with(policy: &str) -> Role {
        Role::from_create_params(
            "r".into(),
            RoleCreate::new(policy),
            &Scope::new("123456789012", "global"),
        )
        .unwrap()
    }

    #[test]
    fn trust_accepts_string_and_list_principals() {
        let single = role_with(
            r#"{"Statement":[{"Effect":"Allow","Principal":{"Service":"codepipeline.amazonaws.com"},"Action":"sts:AssumeRole"}]}"#,
        );
        assert!(single.trusts_service("codepipeline.amazonaws.com"));
        assert!(!single.trusts_service("ec2.amazonaws.com"));

        let list = role_with(
            r#"{"Statement":[{"Principal":{"Service":["ec2.amazonaws.com","codepipeline.amazonaws.com"]}}]}"#,
        );
        assert!(list.trusts_service("codepipeline.amazonaws.com"));
    }

    #[test]
    fn trust_only_reads_first_statement() {
        let role = role_with(
            r#"{"Statement":[{"Principal":{"AWS":"*"}},{"Principal":{"Service":"codepipeline.amazonaws.com"}}]}"#,
        );
        assert!(!role.trusts_service("codepipeline.amazonaws.com"));
    }

    #[test]
    fn defaults_and_arn() {
        let role = role_with("{}");
        assert_eq!(role.path, "/");
        assert_eq!(role.arn, "arn:aws:iam::123456789012:role/r");
        assert_eq!(role.max_session_duration, 3600);
        assert!(role.role_id.starts_with("AROA"));
        assert_eq!(role.role_id.len(), 21);
    }

    #[test]
    fn malformed_policy_rejected() {
        let err = Role::from_create_params(
            "r".into(),
            RoleCreate::new("not json"),
            &Scope::new("123456789012", "global"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            IamError::MalformedPolicyDocument("Syntax errors in policy.".into())
        );
    }
}
