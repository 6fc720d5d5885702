//! Normalization of workflow candidates, whether parsed from model output or
//! built by the synthesizer.
//!
//! Missing required fields are filled with defaults, node ids are made unique
//! and `active` is always forced off. Wrongly typed optional node fields are
//! cleared with a warning; only node entries that are not objects are dropped.

use std::collections::HashSet;

use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::ids::IdSource;
use crate::validation::is_position;
use crate::{Connections, Node, NodeConnections, Workflow, WorkflowSettings};

pub const PLACEHOLDER_WORKFLOW_NAME: &str = "Generated workflow";

const DEFAULT_X: f64 = 250.0;
const DEFAULT_STEP_X: f64 = 200.0;
const DEFAULT_Y: f64 = 300.0;

/// Optional node fields and the JSON shape each must have to be kept.
const OPTIONAL_NODE_FIELDS: &[(&str, fn(&Value) -> bool)] = &[
    ("disabled", Value::is_boolean),
    ("continueOnFail", Value::is_boolean),
    ("retryOnFail", Value::is_boolean),
    ("executeOnce", Value::is_boolean),
    ("notesInFlow", Value::is_boolean),
    ("notes", Value::is_string),
    ("maxTries", |v| v.as_u64().is_some_and(|n| u32::try_from(n).is_ok())),
    ("waitBetweenTries", Value::is_u64),
];

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("workflow must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub workflow: Workflow,
    /// Human-readable notes about entries that were dropped or replaced.
    pub warnings: Vec<String>,
}

/// Fill defaults into `candidate` and return a well-formed [`Workflow`].
///
/// Applying this to its own (serialized) output changes nothing except the
/// timestamps.
pub fn normalize(candidate: Value, ids: &impl IdSource) -> Result<Normalized, NormalizeError> {
    let mut fields = match candidate {
        Value::Object(fields) => fields,
        other => return Err(NormalizeError::NotAnObject(json_type_name(&other))),
    };
    let mut warnings = Vec::new();

    let name = match fields.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        _ => PLACEHOLDER_WORKFLOW_NAME.to_string(),
    };

    let nodes = match fields.remove("nodes") {
        Some(Value::Array(entries)) => normalize_nodes(entries, ids, &mut warnings),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            warnings.push(format!(
                "'nodes' ignored: expected an array, got {}",
                json_type_name(&other)
            ));
            Vec::new()
        }
    };

    let connections = match fields.remove("connections") {
        Some(Value::Object(entries)) => normalize_connections(entries, &mut warnings),
        None | Some(Value::Null) => Connections::new(),
        Some(other) => {
            warnings.push(format!(
                "'connections' ignored: expected an object, got {}",
                json_type_name(&other)
            ));
            Connections::new()
        }
    };

    let settings = match fields.remove("settings") {
        Some(value @ Value::Object(_)) => match serde_json::from_value(value) {
            Ok(settings) => settings,
            Err(e) => {
                warnings.push(format!("'settings' replaced with defaults (malformed): {e}"));
                WorkflowSettings::minimal()
            }
        },
        _ => WorkflowSettings::minimal(),
    };

    let tags = match fields.remove("tags") {
        Some(Value::Array(tags)) => tags,
        _ => Vec::new(),
    };
    let id = take_string(&mut fields, "id");
    let version_id = take_string(&mut fields, "versionId");
    let static_data = fields.remove("staticData").filter(|v| !v.is_null());

    // Replaced unconditionally below.
    for key in ["active", "createdAt", "updatedAt"] {
        fields.remove(key);
    }

    for warning in &warnings {
        warn!("Workflow normalization: {}", warning);
    }

    let now = Utc::now();
    let workflow = Workflow {
        id,
        name,
        active: false,
        nodes,
        connections,
        settings,
        static_data,
        tags,
        created_at: Some(now),
        updated_at: Some(now),
        version_id,
        extra: fields,
    };

    Ok(Normalized { workflow, warnings })
}

fn normalize_nodes(entries: Vec<Value>, ids: &impl IdSource, warnings: &mut Vec<String>) -> Vec<Node> {
    let mut seen_ids = HashSet::new();
    let mut nodes = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let label = format!("Node {}", index + 1);
        let Value::Object(mut fields) = entry else {
            warnings.push(format!("{label} skipped (not an object)"));
            continue;
        };

        let id = match fields.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let id = match id {
            Some(id) if !seen_ids.contains(&id) => id,
            Some(duplicate) => {
                let fresh = ids.next_id();
                warnings.push(format!("{label}: duplicate id '{duplicate}' replaced with '{fresh}'"));
                fresh
            }
            None => ids.next_id(),
        };
        seen_ids.insert(id.clone());
        fields.insert("id".into(), Value::String(id));

        if !is_position(fields.get("position")) {
            let x = DEFAULT_X + DEFAULT_STEP_X * index as f64;
            fields.insert("position".into(), Value::from(vec![x, DEFAULT_Y]));
        }

        if !fields.get("typeVersion").is_some_and(Value::is_number) {
            fields.insert("typeVersion".into(), Value::from(1));
        }

        for key in ["name", "type"] {
            match fields.get(key) {
                None | Some(Value::String(_)) => {}
                Some(Value::Null) => {
                    fields.remove(key);
                }
                Some(other) => {
                    warnings.push(format!(
                        "{label}: '{key}' cleared (expected a string, got {})",
                        json_type_name(other)
                    ));
                    fields.remove(key);
                }
            }
        }

        for &(key, well_typed) in OPTIONAL_NODE_FIELDS {
            if let Some(value) = fields.get(key) {
                if !value.is_null() && !well_typed(value) {
                    warnings.push(format!("{label}: '{key}' cleared (unexpected value {value})"));
                    fields.remove(key);
                }
            }
        }

        match fields.get("parameters") {
            Some(Value::Object(_)) => {}
            None | Some(Value::Null) => {
                fields.insert("parameters".into(), Value::Object(Map::new()));
            }
            Some(other) => {
                warnings.push(format!(
                    "{label}: parameters replaced (expected an object, got {})",
                    json_type_name(other)
                ));
                fields.insert("parameters".into(), Value::Object(Map::new()));
            }
        }

        match serde_json::from_value::<Node>(Value::Object(fields)) {
            Ok(node) => nodes.push(node),
            Err(e) => warnings.push(format!("{label} skipped (malformed): {e}")),
        }
    }

    nodes
}

fn normalize_connections(entries: Map<String, Value>, warnings: &mut Vec<String>) -> Connections {
    let mut connections = Connections::new();
    for (source, value) in entries {
        match serde_json::from_value::<NodeConnections>(value) {
            Ok(channels) => {
                connections.insert(source, channels);
            }
            Err(e) => warnings.push(format!("Connections from '{source}' skipped (malformed): {e}")),
        }
    }
    connections
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
