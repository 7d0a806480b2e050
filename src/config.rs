use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use serde_yaml::Value as Yaml;

use crate::error::{Result, StatusError};

/// Parsed, validated representation of the declarative mapreduce
/// configuration (`mapreduce.yaml`). Immutable once parsed; template and
/// param order match the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    pub templates: Vec<JobTemplate>,
}

/// One named job template from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTemplate {
    pub name: String,
    pub mapper: MapperSpec,
}

/// Mapper block of a job template. Shared with [`crate::store::JobRecord`],
/// so it carries serde derives for the job-detail wire shape: a missing
/// `params_validator` or param `default` serializes as `null`, not omission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperSpec {
    pub handler: String,
    pub input_reader: String,
    pub params_validator: Option<String>,
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<String>,
}

/// Client-facing rendering of one job template, shaped for the
/// list-configs endpoint. Unlike the detail shapes, the two optional keys
/// are omitted entirely when the template has no validator / no params.
#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub mapper_handler: String,
    pub mapper_input_reader: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapper_params_validator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapper_params: Option<Map<String, JsonValue>>,
}

impl ConfigDocument {
    /// Parse and validate configuration text.
    ///
    /// Two phases: a generic YAML tree parse, then strict validation into
    /// the typed document. Exactly one YAML document is permitted; empty or
    /// whitespace-only input is rejected. Pure function of `text`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_str(text) {
            let value = Yaml::deserialize(document)
                .map_err(|e| invalid(format!("malformed yaml: {e}")))?;
            documents.push(value);
        }
        if documents.len() > 1 {
            return Err(invalid("exactly one document expected"));
        }
        let root = match documents.into_iter().next() {
            Some(value) if !value.is_null() => value,
            _ => return Err(invalid("no documents found")),
        };

        let entries = root
            .get("mapreduce")
            .ok_or_else(|| invalid("top-level 'mapreduce' key is missing"))?
            .as_sequence()
            .ok_or_else(|| invalid("'mapreduce' must be a sequence of job templates"))?;

        let mut templates = Vec::with_capacity(entries.len());
        let mut seen = HashSet::new();
        for entry in entries {
            let template = parse_template(entry)?;
            if !seen.insert(template.name.clone()) {
                return Err(invalid(format!(
                    "duplicate job template name '{}'",
                    template.name
                )));
            }
            templates.push(template);
        }
        Ok(Self { templates })
    }

    /// Render every template for the list-configs endpoint, in document
    /// order.
    pub fn to_summaries(&self) -> Vec<TemplateSummary> {
        self.templates.iter().map(JobTemplate::summary).collect()
    }
}

impl JobTemplate {
    pub fn summary(&self) -> TemplateSummary {
        let mapper_params = if self.mapper.params.is_empty() {
            None
        } else {
            let mut map = Map::new();
            for param in &self.mapper.params {
                let default = param
                    .default
                    .clone()
                    .map_or(JsonValue::Null, JsonValue::String);
                map.insert(param.name.clone(), default);
            }
            Some(map)
        };

        TemplateSummary {
            name: self.name.clone(),
            mapper_handler: self.mapper.handler.clone(),
            mapper_input_reader: self.mapper.input_reader.clone(),
            mapper_params_validator: self.mapper.params_validator.clone(),
            mapper_params,
        }
    }
}

fn parse_template(entry: &Yaml) -> Result<JobTemplate> {
    let name = required_string(entry, "name", "job template")?;
    let context = format!("job template '{name}'");

    let mapper = match entry.get("mapper") {
        Some(value) if value.as_mapping().is_some() => value,
        Some(Yaml::Null) | None => {
            return Err(invalid(format!(
                "{context} is missing required field 'mapper'"
            )))
        }
        Some(_) => {
            return Err(invalid(format!(
                "field 'mapper' of {context} must be a mapping"
            )))
        }
    };

    let handler = required_string(mapper, "handler", &context)?;
    let input_reader = required_string(mapper, "input_reader", &context)?;
    let params_validator = optional_string(mapper, "params_validator", &context)?;

    let params = match mapper.get("params") {
        None | Some(Yaml::Null) => Vec::new(),
        Some(value) => {
            let entries = value.as_sequence().ok_or_else(|| {
                invalid(format!("field 'params' of {context} must be a sequence"))
            })?;
            entries
                .iter()
                .map(|param| parse_param(param, &context))
                .collect::<Result<Vec<_>>>()?
        }
    };

    Ok(JobTemplate {
        name,
        mapper: MapperSpec {
            handler,
            input_reader,
            params_validator,
            params,
        },
    })
}

fn parse_param(entry: &Yaml, context: &str) -> Result<ParamSpec> {
    let name = required_string(entry, "name", &format!("param of {context}"))?;
    if !is_identifier(&name) {
        return Err(invalid(format!(
            "param name '{name}' of {context} is not a valid identifier"
        )));
    }
    let default = optional_string(entry, "default", context)?;
    Ok(ParamSpec { name, default })
}

/// Identifier pattern for param names: letters, digits, underscore, not
/// starting with a digit.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn required_string(node: &Yaml, key: &str, context: &str) -> Result<String> {
    match node.get(key) {
        Some(Yaml::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Yaml::String(_)) | Some(Yaml::Null) | None => Err(invalid(format!(
            "{context} is missing required field '{key}'"
        ))),
        Some(_) => Err(invalid(format!(
            "field '{key}' of {context} must be a string"
        ))),
    }
}

fn optional_string(node: &Yaml, key: &str, context: &str) -> Result<Option<String>> {
    match node.get(key) {
        None | Some(Yaml::Null) => Ok(None),
        Some(Yaml::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(format!(
            "field '{key}' of {context} must be a string"
        ))),
    }
}

fn invalid(message: impl Into<String>) -> StatusError {
    StatusError::InvalidConfig(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_accepts_letters_digits_underscore() {
        assert!(is_identifier("entity_kind"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("param2"));
        assert!(is_identifier("X"));
    }

    #[test]
    fn identifier_rejects_bad_names() {
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("$$Invalid$$"));
        assert!(!is_identifier("with-dash"));
        assert!(!is_identifier("with space"));
    }

    #[test]
    fn empty_string_field_counts_as_missing() {
        let err = ConfigDocument::parse(
            "mapreduce:\n- name: ''\n  mapper:\n    handler: H\n    input_reader: R\n",
        )
        .unwrap_err();
        assert!(matches!(err, StatusError::InvalidConfig(_)));
    }

    #[test]
    fn non_string_scalar_is_rejected() {
        let err = ConfigDocument::parse(
            "mapreduce:\n- name: Job1\n  mapper:\n    handler: 5\n    input_reader: R\n",
        )
        .unwrap_err();
        assert!(matches!(err, StatusError::InvalidConfig(_)));
    }
}
