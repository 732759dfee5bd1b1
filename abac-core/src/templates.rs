//! Policy templates.
//!
//! A template is a stored policy document with `{{param}}` placeholders.
//! Instantiation substitutes caller-supplied parameters and yields a
//! ready [`CreatePolicy`]. A placeholder is recognized only when a
//! string value is wholly one placeholder, matching the condition
//! reference rule.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;

use shared::domain::entities::{CreatePolicy, PolicyTemplate};
use shared::domain::repositories::PolicyTemplateRepository;
use shared::{AppError, AppResult};

static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{(.+?)\}\}$").expect("placeholder pattern compiles"));

/// Lists templates and instantiates policies from them.
pub struct TemplateService {
    templates: Arc<dyn PolicyTemplateRepository>,
}

impl TemplateService {
    /// Create a service over the template store.
    pub fn new(templates: Arc<dyn PolicyTemplateRepository>) -> Self {
        Self { templates }
    }

    /// List active templates, optionally restricted to a category.
    pub async fn list_templates(
        &self,
        category: Option<&str>,
    ) -> AppResult<Vec<PolicyTemplate>> {
        self.templates.list(category).await
    }

    /// Instantiate a template into a policy creation payload.
    ///
    /// `policy_name` becomes the policy's unique name; `params` must
    /// cover the template's required parameters.
    pub async fn instantiate(
        &self,
        template_name: &str,
        policy_name: &str,
        params: &Map<String, Value>,
    ) -> AppResult<CreatePolicy> {
        let template = self
            .templates
            .find_by_name(template_name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Template '{}' not found", template_name))
            })?;

        if let Some(required) = &template.required_parameters {
            let missing: Vec<&str> = required
                .iter()
                .map(String::as_str)
                .filter(|name| !params.contains_key(*name))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::Validation(format!(
                    "Missing template parameters: {}",
                    missing.join(", ")
                )));
            }
        }

        let mut rendered = substitute(&template.template_config, params)?;
        let Some(object) = rendered.as_object_mut() else {
            return Err(AppError::Validation(format!(
                "Template '{}' does not hold a policy document",
                template_name
            )));
        };
        object.insert("name".to_string(), Value::String(policy_name.to_string()));

        serde_json::from_value(rendered).map_err(|e| {
            AppError::Validation(format!(
                "Template '{}' renders an invalid policy: {}",
                template_name, e
            ))
        })
    }
}

/// Deep-walk a document, replacing whole-string `{{param}}` values with
/// the supplied parameter values. Unknown placeholders are an error so a
/// half-rendered policy can never be created.
fn substitute(value: &Value, params: &Map<String, Value>) -> AppResult<Value> {
    match value {
        Value::String(raw) => {
            if let Some(captures) = PLACEHOLDER_PATTERN.captures(raw) {
                let name = captures[1].trim();
                // Attribute references stay untouched for evaluation
                // time; only bare parameter names are substituted.
                if !name.contains('.') {
                    return params.get(name).cloned().ok_or_else(|| {
                        AppError::Validation(format!("Unknown template parameter '{}'", name))
                    });
                }
            }
            Ok(value.clone())
        }
        Value::Array(items) => items
            .iter()
            .map(|item| substitute(item, params))
            .collect::<AppResult<Vec<Value>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut rendered = Map::with_capacity(map.len());
            for (key, item) in map {
                rendered.insert(key.clone(), substitute(item, params)?);
            }
            Ok(Value::Object(rendered))
        }
        _ => Ok(value.clone()),
    }
}
