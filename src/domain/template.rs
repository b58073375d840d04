//! Config templates
//!
//! Templates are handlebars documents rendered against a config's resolved
//! properties. Rendering is strict: a variable without a value fails the render
//! instead of producing an empty string.

use handlebars::Handlebars;
use serde_json::{Map, Value};
use thiserror::Error;

use super::parameter::Properties;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("Failed to render template '{template}': {reason}")]
    Engine { template: String, reason: String },

    #[error("Template '{template}' did not render valid JSON: {reason}")]
    InvalidJson { template: String, reason: String },
}

/// A config template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    id: String,
    content: String,
}

impl Template {
    /// Creates a template; `id` is usually the template file name
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Renders the template, validating JSON output for `.json` templates
    pub fn render(&self, properties: &Properties) -> Result<String, RenderError> {
        let is_json = self.id.ends_with(".json");
        let rendered = engine()
            .render_template(&self.content, &template_data(properties, is_json))
            .map_err(|e| RenderError::Engine {
                template: self.id.clone(),
                reason: e.to_string(),
            })?;

        if is_json {
            serde_json::from_str::<Value>(&rendered).map_err(|e| RenderError::InvalidJson {
                template: self.id.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(rendered)
    }
}

fn engine() -> Handlebars<'static> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_escape_fn(handlebars::no_escape);
    hb
}

/// Lists and maps render as their JSON text so they can be dropped into JSON
/// payloads. With `escape_json`, strings are escaped for use inside a JSON
/// string literal.
fn template_data(properties: &Properties, escape_json: bool) -> Map<String, Value> {
    properties
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
                Value::String(s) if escape_json => Value::String(json_string_content(s)),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// `s` encoded as a JSON string, without the surrounding quotes
fn json_string_content(s: &str) -> String {
    let quoted = Value::String(s.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Renders a handlebars string against properties
pub(crate) fn render_str(format: &str, properties: &Properties) -> Result<String, String> {
    engine()
        .render_template(format, &template_data(properties, false))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, Value)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn renders_properties() {
        let t = Template::new("dash.json", r#"{"name": "{{name}}", "limit": {{limit}}}"#);
        let out = t
            .render(&props(&[("name", json!("Overview")), ("limit", json!(10))]))
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!({"name": "Overview", "limit": 10}));
    }

    #[test]
    fn does_not_html_escape() {
        let t = Template::new("x.txt", "{{q}}");
        let out = t.render(&props(&[("q", json!("a < b & c"))])).unwrap();
        assert_eq!(out, "a < b & c");
    }

    #[test]
    fn lists_render_as_json() {
        let t = Template::new("x.json", r#"{"tags": {{tags}}}"#);
        let out = t.render(&props(&[("tags", json!(["a", "b"]))])).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn missing_variable_fails() {
        let t = Template::new("x.json", r#"{"name": "{{name}}"}"#);
        assert!(matches!(
            t.render(&Properties::new()),
            Err(RenderError::Engine { .. })
        ));
    }

    #[test]
    fn invalid_json_fails() {
        let t = Template::new("x.json", r#"{"name": {{name}}}"#);
        assert!(matches!(
            t.render(&props(&[("name", json!("unquoted words"))])),
            Err(RenderError::InvalidJson { .. })
        ));
    }

    #[test]
    fn objects_render_as_json() {
        let t = Template::new("x.json", r#"{"cfg": {{cfg}}}"#);
        let out = t
            .render(&props(&[("cfg", json!({"threshold": 5, "tags": ["a"]}))]))
            .unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&out).unwrap(),
            json!({"cfg": {"threshold": 5, "tags": ["a"]}})
        );
    }

    #[test]
    fn strings_are_escaped_in_json_templates() {
        let t = Template::new("x.json", r#"{"name": "{{name}}"}"#);
        let name = "My \"prod\" board\\2\nsecond line";
        let out = t.render(&props(&[("name", json!(name))])).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), json!({"name": name}));
    }

    #[test]
    fn strings_are_not_escaped_in_other_templates() {
        let t = Template::new("pipeline.yaml", "name: {{name}}");
        assert_eq!(
            t.render(&props(&[("name", json!("say \"hi\""))])).unwrap(),
            "name: say \"hi\""
        );
    }

    #[test]
    fn non_json_templates_are_not_validated() {
        let t = Template::new("pipeline.yaml", "name: {{name}}");
        assert_eq!(
            t.render(&props(&[("name", json!("logs"))])).unwrap(),
            "name: logs"
        );
    }
}
