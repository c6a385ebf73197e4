use std::collections::{BTreeSet, HashMap};

use distill_core::{DistillError, Value};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid"));

/// A text template with `{{ name }}` placeholders and a declared variable set.
///
/// Rendering succeeds only when the supplied values cover exactly the declared
/// variables; both missing and unexpected keys are rejected before anything is
/// substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    input_variables: BTreeSet<String>,
    numeric_variables: BTreeSet<String>,
}

impl PromptTemplate {
    /// Declares every placeholder found in `template`.
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let input_variables = placeholders(&template).map(str::to_string).collect();
        Self {
            template,
            input_variables,
            numeric_variables: BTreeSet::new(),
        }
    }

    /// Declares `variables` explicitly. Every placeholder must be among them.
    pub fn with_variables<I, S>(template: impl Into<String>, variables: I) -> Result<Self, DistillError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let template = template.into();
        let input_variables: BTreeSet<String> = variables.into_iter().map(Into::into).collect();
        let undeclared: Vec<&str> = placeholders(&template)
            .filter(|name| !input_variables.contains(*name))
            .collect();
        if !undeclared.is_empty() {
            return Err(DistillError::TemplateFormat(format!(
                "template uses undeclared variables [{}]",
                undeclared.join(", ")
            )));
        }
        Ok(Self {
            template,
            input_variables,
            numeric_variables: BTreeSet::new(),
        })
    }

    /// Requires `name` to be rendered from a number.
    pub fn with_numeric(mut self, name: &str) -> Result<Self, DistillError> {
        if !self.input_variables.contains(name) {
            return Err(DistillError::TemplateFormat(format!(
                "cannot mark undeclared variable '{name}' as numeric"
            )));
        }
        self.numeric_variables.insert(name.to_string());
        Ok(self)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn input_variables(&self) -> &BTreeSet<String> {
        &self.input_variables
    }

    pub fn declares(&self, name: &str) -> bool {
        self.input_variables.contains(name)
    }

    /// Checks `vars` against the declared variables without rendering.
    pub fn validate(&self, vars: &HashMap<String, Value>) -> Result<(), DistillError> {
        let missing: Vec<&str> = self
            .input_variables
            .iter()
            .filter(|name| !vars.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        let mut unexpected: Vec<&str> = vars
            .keys()
            .filter(|key| !self.input_variables.contains(key.as_str()))
            .map(String::as_str)
            .collect();
        unexpected.sort_unstable();

        if !missing.is_empty() || !unexpected.is_empty() {
            let mut problems = Vec::new();
            if !missing.is_empty() {
                problems.push(format!("missing variables [{}]", missing.join(", ")));
            }
            if !unexpected.is_empty() {
                problems.push(format!("unexpected variables [{}]", unexpected.join(", ")));
            }
            return Err(DistillError::TemplateFormat(problems.join("; ")));
        }

        for name in &self.numeric_variables {
            if let Some(value) = vars.get(name) {
                if !is_numeric(value) {
                    return Err(DistillError::TemplateFormat(format!(
                        "variable '{name}' must be numeric, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn render(&self, vars: &HashMap<String, Value>) -> Result<String, DistillError> {
        self.validate(vars)?;

        let rendered = PLACEHOLDER.replace_all(&self.template, |caps: &Captures| {
            match vars.get(&caps[1]) {
                Some(value) => value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string()),
                None => String::new(),
            }
        });
        Ok(rendered.into_owned())
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(text) => text.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

/// Names of the `{{ name }}` placeholders in `template`, in order.
fn placeholders(template: &str) -> impl Iterator<Item = &str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|name| name.as_str()))
}
