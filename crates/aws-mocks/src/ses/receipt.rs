//! Inbound receipt rule sets. Rules are kept in evaluation order.

use super::error::SesError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptRule {
    pub name: String,
    pub enabled: bool,
    pub tls_policy: String,
    pub recipients: Vec<String>,
    /// Actions as the provider shapes them, e.g. `{"S3Action": {"BucketName": "b"}}`.
    pub actions: Vec<Value>,
    pub scan_enabled: bool,
}

impl ReceiptRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            tls_policy: "Optional".to_string(),
            recipients: Vec::new(),
            actions: Vec::new(),
            scan_enabled: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ReceiptRuleSets {
    sets: BTreeMap<String, Vec<ReceiptRule>>,
}

impl ReceiptRuleSets {
    fn rules_mut(&mut self, rule_set: &str) -> Result<&mut Vec<ReceiptRule>, SesError> {
        self.sets
            .get_mut(rule_set)
            .ok_or_else(|| SesError::RuleSetDoesNotExist(rule_set.to_string()))
    }

    pub fn create_set(&mut self, rule_set: &str) -> Result<(), SesError> {
        if self.sets.contains_key(rule_set) {
            return Err(SesError::AlreadyExists(format!(
                "Rule set already exists: {rule_set}"
            )));
        }
        self.sets.insert(rule_set.to_string(), Vec::new());
        Ok(())
    }

    /// Appends `rule`, or inserts it right after the rule named `after`.
    pub fn create_rule(
        &mut self,
        rule_set: &str,
        rule: ReceiptRule,
        after: Option<&str>,
    ) -> Result<(), SesError> {
        let rules = self.rules_mut(rule_set)?;
        if rules.iter().any(|r| r.name == rule.name) {
            return Err(SesError::AlreadyExists(format!(
                "Rule already exists: {}",
                rule.name
            )));
        }
        let position = match after {
            None => rules.len(),
            Some(after) => {
                rules
                    .iter()
                    .position(|r| r.name == after)
                    .ok_or_else(|| SesError::RuleDoesNotExist(after.to_string()))?
                    + 1
            }
        };
        rules.insert(position, rule);
        Ok(())
    }

    pub fn describe_set(&self, rule_set: &str) -> Result<&[ReceiptRule], SesError> {
        self.sets
            .get(rule_set)
            .map(Vec::as_slice)
            .ok_or_else(|| SesError::RuleSetDoesNotExist(rule_set.to_string()))
    }

    pub fn describe_rule(&self, rule_set: &str, rule_name: &str) -> Result<&ReceiptRule, SesError> {
        self.describe_set(rule_set)?
            .iter()
            .find(|r| r.name == rule_name)
            .ok_or_else(|| SesError::RuleDoesNotExist(rule_name.to_string()))
    }

    pub fn update_rule(&mut self, rule_set: &str, rule: ReceiptRule) -> Result<(), SesError> {
        let rules = self.rules_mut(rule_set)?;
        let slot = rules
            .iter_mut()
            .find(|r| r.name == rule.name)
            .ok_or_else(|| SesError::RuleDoesNotExist(rule.name.clone()))?;
        *slot = rule;
        Ok(())
    }
}
