//! FILENAME: engine/src/permission.rs
//! PURPOSE: AND/OR permission checks gating toolbar and column actions.
//! CONTEXT: A tool may carry a directive such as
//! `{"arg": "role", "mode": "and", "value": ["admin", "auditor"]}`.
//! The directive is matched against the caller's access codes or roles,
//! each supplied as a literal list or as an accessor evaluated on demand.

use crate::lenient::json_to_text;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionArg {
    #[default]
    Code,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    And,
    #[default]
    Or,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PermissionDirective {
    #[serde(default, deserialize_with = "lenient_arg")]
    pub arg: PermissionArg,
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: PermissionMode,
    /// Required codes or roles. A single string is a one-element list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub value: Vec<String>,
}

impl PermissionDirective {
    pub fn codes(mode: PermissionMode, values: &[&str]) -> Self {
        PermissionDirective {
            arg: PermissionArg::Code,
            mode,
            value: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn roles(mode: PermissionMode, values: &[&str]) -> Self {
        PermissionDirective {
            arg: PermissionArg::Role,
            mode,
            value: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn required(&self) -> impl Iterator<Item = &str> {
        self.value.iter().map(|v| v.trim()).filter(|v| !v.is_empty())
    }
}

fn lenient_arg<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PermissionArg, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw.as_str().map(|s| s.trim().to_lowercase()) {
        Some(s) if s == "role" => PermissionArg::Role,
        _ => PermissionArg::Code,
    })
}

fn lenient_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PermissionMode, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw.as_str().map(|s| s.trim().to_lowercase()) {
        Some(s) if s == "and" => PermissionMode::And,
        _ => PermissionMode::Or,
    })
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Array(items) => items.iter().filter_map(json_to_text).collect(),
        other => json_to_text(&other).into_iter().collect(),
    })
}

// ============================================================================
// ACCESS SOURCES
// ============================================================================

pub type AccessorFn = Arc<dyn Fn() -> Result<Vec<String>, String> + Send + Sync>;

/// Codes or roles held by the current user.
#[derive(Clone)]
pub enum AccessSource {
    List(Vec<String>),
    /// Evaluated only when a directive needs it. Errors and panics resolve
    /// to an empty list.
    Accessor(AccessorFn),
}

impl AccessSource {
    pub fn list<S: AsRef<str>>(items: &[S]) -> Self {
        AccessSource::List(items.iter().map(|s| s.as_ref().to_string()).collect())
    }

    pub fn accessor<F>(f: F) -> Self
    where
        F: Fn() -> Result<Vec<String>, String> + Send + Sync + 'static,
    {
        AccessSource::Accessor(Arc::new(f))
    }

    pub fn resolve(&self) -> Vec<String> {
        match self {
            AccessSource::List(items) => items.clone(),
            AccessSource::Accessor(accessor) => match panic::catch_unwind(AssertUnwindSafe(|| accessor())) {
                Ok(Ok(items)) => items,
                Ok(Err(e)) => {
                    crate::log_warn!("PERMISSION", "access accessor failed: {}", e);
                    Vec::new()
                }
                Err(_) => {
                    crate::log_warn!("PERMISSION", "access accessor panicked");
                    Vec::new()
                }
            },
        }
    }
}

impl fmt::Debug for AccessSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessSource::List(items) => f.debug_tuple("List").field(items).finish(),
            AccessSource::Accessor(_) => write!(f, "Accessor(<fn>)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PermissionOptions {
    pub access_codes: Option<AccessSource>,
    pub access_roles: Option<AccessSource>,
    /// Answer when the directive lists nothing or no pool was supplied.
    pub default_when_no_access: bool,
}

impl PermissionOptions {
    pub fn with_codes(mut self, codes: AccessSource) -> Self {
        self.access_codes = Some(codes);
        self
    }

    pub fn with_roles(mut self, roles: AccessSource) -> Self {
        self.access_roles = Some(roles);
        self
    }

    pub fn with_default(mut self, allowed: bool) -> Self {
        self.default_when_no_access = allowed;
        self
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Checks one directive. `and` needs every value in the pool, `or` any.
pub fn evaluate_tool_permission(directive: &PermissionDirective, options: &PermissionOptions) -> bool {
    let required: Vec<&str> = directive.required().collect();
    if required.is_empty() {
        return options.default_when_no_access;
    }

    let source = match directive.arg {
        PermissionArg::Role => options.access_roles.as_ref(),
        PermissionArg::Code => options.access_codes.as_ref(),
    };
    let Some(source) = source else {
        return options.default_when_no_access;
    };

    let pool = source.resolve();
    let held = |value: &&str| pool.iter().any(|p| p.trim() == *value);
    match directive.mode {
        PermissionMode::And => required.iter().all(held),
        PermissionMode::Or => required.iter().any(held),
    }
}

/// A toolbar or row action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::optional", skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionDirective>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ToolDefinition {
    pub fn new(key: impl Into<String>) -> Self {
        ToolDefinition {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_permission(mut self, permission: PermissionDirective) -> Self {
        self.permission = Some(permission);
        self
    }
}

/// Keeps items whose directive passes. Items without a directive are kept.
pub fn filter_permitted<'t, T, F>(items: &'t [T], directive_of: F, options: &PermissionOptions) -> Vec<&'t T>
where
    F: Fn(&T) -> Option<&PermissionDirective>,
{
    items
        .iter()
        .filter(|item| match directive_of(item) {
            Some(directive) => evaluate_tool_permission(directive, options),
            None => true,
        })
        .collect()
}

pub fn filter_permitted_tools(tools: &[ToolDefinition], options: &PermissionOptions) -> Vec<ToolDefinition> {
    filter_permitted(tools, |tool| tool.permission.as_ref(), options)
        .into_iter()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn and_requires_every_value() {
        let directive = PermissionDirective::codes(PermissionMode::And, &["x", "y"]);
        let only_x = PermissionOptions::default().with_codes(AccessSource::list(&["x"]));
        let all = PermissionOptions::default().with_codes(AccessSource::list(&["x", "y", "z"]));
        assert!(!evaluate_tool_permission(&directive, &only_x));
        assert!(evaluate_tool_permission(&directive, &all));
    }

    #[test]
    fn or_requires_any_value() {
        let directive = PermissionDirective::codes(PermissionMode::Or, &["x", "y"]);
        let options = PermissionOptions::default().with_codes(AccessSource::list(&["y"]));
        assert!(evaluate_tool_permission(&directive, &options));
        let none = PermissionOptions::default().with_codes(AccessSource::list::<&str>(&[]));
        assert!(!evaluate_tool_permission(&directive, &none));
    }

    #[test]
    fn role_directives_use_the_role_pool() {
        let directive = PermissionDirective::roles(PermissionMode::Or, &["admin"]);
        let options = PermissionOptions::default()
            .with_codes(AccessSource::list(&["admin"]))
            .with_roles(AccessSource::list(&["viewer"]));
        assert!(!evaluate_tool_permission(&directive, &options));
    }

    #[test]
    fn missing_pool_or_values_use_default() {
        let directive = PermissionDirective::roles(PermissionMode::And, &["admin"]);
        let codes_only = PermissionOptions::default().with_codes(AccessSource::list(&["admin"]));
        assert!(!evaluate_tool_permission(&directive, &codes_only));
        assert!(evaluate_tool_permission(&directive, &codes_only.clone().with_default(true)));

        let empty = PermissionDirective::codes(PermissionMode::And, &[" "]);
        assert!(evaluate_tool_permission(&empty, &PermissionOptions::default().with_default(true)));
    }

    #[test]
    fn accessor_failures_become_empty_pool() {
        let directive = PermissionDirective::codes(PermissionMode::Or, &["x"]);
        let failing = PermissionOptions::default().with_codes(AccessSource::accessor(|| Err("offline".into())));
        let panicking = PermissionOptions::default()
            .with_codes(AccessSource::accessor(|| -> Result<Vec<String>, String> { panic!("boom") }));
        let working = PermissionOptions::default().with_codes(AccessSource::accessor(|| Ok(vec!["x".into()])));
        assert!(!evaluate_tool_permission(&directive, &failing));
        assert!(!evaluate_tool_permission(&directive, &panicking));
        assert!(evaluate_tool_permission(&directive, &working));
    }

    #[test]
    fn directive_deserialization_is_lenient() {
        let directive: PermissionDirective =
            serde_json::from_value(json!({"arg": "ROLE", "mode": "AND", "value": "admin"})).unwrap();
        assert_eq!(directive, PermissionDirective::roles(PermissionMode::And, &["admin"]));
        let defaults: PermissionDirective = serde_json::from_value(json!({"value": ["a", 1]})).unwrap();
        assert_eq!(defaults.arg, PermissionArg::Code);
        assert_eq!(defaults.mode, PermissionMode::Or);
        assert_eq!(defaults.value, vec!["a".to_string(), "1".to_string()]);
    }

    #[test]
    fn filters_tool_lists() {
        let tools: Vec<ToolDefinition> = serde_json::from_value(json!([
            {"key": "export", "permission": {"value": ["export"]}},
            {"key": "refresh"},
            {"key": "delete", "permission": {"mode": "and", "value": ["delete", "admin"]}}
        ]))
        .unwrap();
        let options = PermissionOptions::default().with_codes(AccessSource::list(&["export", "delete"]));
        let keys: Vec<String> = filter_permitted_tools(&tools, &options)
            .into_iter()
            .map(|t| t.key)
            .collect();
        assert_eq!(keys, vec!["export", "refresh"]);

        let no_access = PermissionOptions::default();
        let keys: Vec<String> = filter_permitted_tools(&tools, &no_access)
            .into_iter()
            .map(|t| t.key)
            .collect();
        assert_eq!(keys, vec!["refresh"]);
    }
}
