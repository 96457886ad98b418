//! Email templates and `{{placeholder}}` rendering.

use super::error::SesError;
use backend_core::{ids, time, BackendEntity, Scope};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateInput {
    pub name: String,
    pub subject_part: String,
    pub text_part: Option<String>,
    pub html_part: Option<String>,
}

impl TemplateInput {
    pub fn new(name: impl Into<String>, subject_part: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subject_part: subject_part.into(),
            ..Self::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text_part = Some(text.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html_part = Some(html.into());
        self
    }

    pub(crate) fn check_name(&self) -> Result<(), SesError> {
        if self.name.is_empty() {
            return Err(SesError::Validation(
                "1 validation error detected: Value null at 'template.templateName' \
                 failed to satisfy constraint: Member must not be null"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn check_subject(&self) -> Result<(), SesError> {
        if self.subject_part.is_empty() {
            return Err(SesError::InvalidParameterValue(
                "The subject must be specified.".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub name: String,
    pub subject_part: String,
    pub text_part: Option<String>,
    pub html_part: Option<String>,
    pub created_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMetadata {
    pub name: String,
    pub created_timestamp: DateTime<Utc>,
}

impl BackendEntity for Template {
    type Id = String;
    type Create = TemplateInput;
    type Update = TemplateInput;
    type Context = Scope;
    type Error = SesError;
    const KIND: &'static str = "Template";

    fn id(&self) -> &String {
        &self.name
    }

    fn from_create_params(name: String, input: TemplateInput, _scope: &Scope) -> Result<Self, SesError> {
        input.check_subject()?;
        Ok(Self {
            name,
            subject_part: input.subject_part,
            text_part: input.text_part,
            html_part: input.html_part,
            created_timestamp: time::now(),
        })
    }

    fn on_update(&mut self, input: TemplateInput, _scope: &Scope) -> Result<(), SesError> {
        input.check_subject()?;
        self.subject_part = input.subject_part;
        self.text_part = input.text_part;
        self.html_part = input.html_part;
        Ok(())
    }

    fn not_found(_name: &String, _scope: &Scope) -> SesError {
        SesError::TemplateNotFound
    }

    fn already_exists(_name: &String, _scope: &Scope) -> SesError {
        SesError::TemplateNameAlreadyExists
    }
}

impl Template {
    pub fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            name: self.name.clone(),
            created_timestamp: self.created_timestamp,
        }
    }

    /// Renders the template into a MIME message with plain text and HTML alternatives.
    pub fn render(&self, data: &str) -> Result<String, SesError> {
        let data: Value = serde_json::from_str(data).map_err(|_| {
            SesError::InvalidRenderingParameter("Template rendering data is invalid".to_string())
        })?;
        let subject = substitute(&self.subject_part, &data)?;
        let text = substitute(self.text_part.as_deref().unwrap_or_default(), &data)?;
        let html = substitute(self.html_part.as_deref().unwrap_or_default(), &data)?;

        let boundary = format!("==============={}==", ids::random_hex(19));
        let date = time::iso8601(&time::now());
        Ok(format!(
            "Date: {date}\r\nSubject: {subject}\r\n\
             Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\
             MIME-Version: 1.0\r\n\r\n\
             --{boundary}\r\nContent-Type: text/plain;charset=UTF-8\r\n\
             Content-Transfer-Encoding: 7bit\r\n\r\n{text}\r\n\
             --{boundary}\r\nContent-Type: text/html;charset=UTF-8\r\n\
             Content-Transfer-Encoding: 7bit\r\n\r\n{html}\r\n\
             --{boundary}--\r\n"
        ))
    }
}

fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |value, segment| value.get(segment))
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replaces every `{{path}}` with the value at that dotted path in `data`.
pub fn substitute(part: &str, data: &Value) -> Result<String, SesError> {
    let mut missing = None;
    let rendered = PLACEHOLDER.replace_all(part, |caps: &Captures| {
        let path = &caps[1];
        match lookup(data, path) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                missing.get_or_insert_with(|| path.to_string());
                String::new()
            }
            Some(other) => other.to_string(),
        }
    });
    match missing {
        Some(path) => Err(SesError::InvalidRenderingParameter(format!(
            "Attribute '{path}' is not present in the rendering data."
        ))),
        None => Ok(rendered.into_owned()),
    }
}
