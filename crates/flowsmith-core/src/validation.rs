use std::collections::HashSet;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::Workflow;
use crate::node_kind::NodeKind;

/// Substrings of a node `type` that mark an unknown kind as a trigger.
const TRIGGER_MARKERS: &[&str] = &["Trigger", "cron", "webhook"];

/// A structural defect. Node positions are 1-based in messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureIssue {
    #[error("Workflow name is missing")]
    MissingName,

    #[error("Workflow has no nodes")]
    NoNodes,

    #[error("Workflow connections are missing")]
    MissingConnections,

    #[error("Node {0} is not an object")]
    NodeNotObject(usize),

    #[error("Node {0} is missing an id")]
    MissingNodeId(usize),

    #[error("Node {0} is missing a name")]
    MissingNodeName(usize),

    #[error("Node {0} is missing a type")]
    MissingNodeType(usize),

    #[error("Node {0} is missing a position")]
    MissingNodePosition(usize),

    #[error("Node name '{0}' is used more than once")]
    DuplicateNodeName(String),

    #[error("Connections reference unknown source node '{0}'")]
    UnknownSource(String),

    #[error("Connection from '{from}' targets unknown node '{to}'")]
    UnknownTarget { from: String, to: String },
}

/// Findings that do not affect validity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureWarning {
    #[error("Workflow has no trigger node")]
    NoTrigger,

    #[error("Node '{node}' ({kind}) is missing parameter '{parameter}'")]
    MissingParameter {
        node: String,
        kind: &'static str,
        parameter: &'static str,
    },
}

impl Serialize for StructureIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for StructureWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSummary {
    pub node_count: usize,
    /// Number of source nodes with outgoing connections.
    pub connection_count: usize,
    pub has_trigger: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureReport {
    pub is_valid: bool,
    pub issues: Vec<StructureIssue>,
    pub warnings: Vec<StructureWarning>,
    pub summary: StructureSummary,
}

/// Check any workflow-shaped JSON value. All applicable issues are
/// collected; `is_valid` is true iff there are none.
pub fn validate_structure(candidate: &Value) -> StructureReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    let name = candidate.get("name").and_then(Value::as_str).unwrap_or("");
    if name.trim().is_empty() {
        issues.push(StructureIssue::MissingName);
    }

    let nodes: &[Value] = candidate
        .get("nodes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    if nodes.is_empty() {
        issues.push(StructureIssue::NoNodes);
    }

    let connections = candidate.get("connections").and_then(Value::as_object);
    if connections.is_none() {
        issues.push(StructureIssue::MissingConnections);
    }

    let mut node_names = HashSet::new();
    let mut has_trigger = false;
    for (i, node) in nodes.iter().enumerate() {
        let position = i + 1;
        let Some(fields) = node.as_object() else {
            issues.push(StructureIssue::NodeNotObject(position));
            continue;
        };

        if non_empty_str(fields, "id").is_none() {
            issues.push(StructureIssue::MissingNodeId(position));
        }
        let node_name = non_empty_str(fields, "name");
        match node_name {
            Some(n) => {
                if !node_names.insert(n) {
                    issues.push(StructureIssue::DuplicateNodeName(n.to_string()));
                }
            }
            None => issues.push(StructureIssue::MissingNodeName(position)),
        }
        let node_type = non_empty_str(fields, "type");
        if node_type.is_none() {
            issues.push(StructureIssue::MissingNodeType(position));
        }
        if !is_position(fields.get("position")) {
            issues.push(StructureIssue::MissingNodePosition(position));
        }

        let Some(node_type) = node_type else {
            continue;
        };
        let kind = NodeKind::from_type_name(node_type);
        has_trigger |= match kind {
            Some(kind) => kind.is_trigger(),
            None => TRIGGER_MARKERS.iter().any(|m| node_type.contains(m)),
        };

        if let Some(kind) = kind {
            let parameters = fields.get("parameters").and_then(Value::as_object);
            for &parameter in kind.required_parameters() {
                if parameters.is_none_or(|p| !p.contains_key(parameter)) {
                    warnings.push(StructureWarning::MissingParameter {
                        node: node_name.unwrap_or("?").to_string(),
                        kind: kind.display_name(),
                        parameter,
                    });
                }
            }
        }
    }

    if let Some(connections) = connections {
        for (source, channels) in connections {
            if !node_names.contains(source.as_str()) {
                issues.push(StructureIssue::UnknownSource(source.clone()));
            }
            for target in connection_targets(channels) {
                if !node_names.contains(target) {
                    issues.push(StructureIssue::UnknownTarget {
                        from: source.clone(),
                        to: target.to_string(),
                    });
                }
            }
        }
    }

    if !nodes.is_empty() && !has_trigger {
        warnings.push(StructureWarning::NoTrigger);
    }

    StructureReport {
        is_valid: issues.is_empty(),
        issues,
        warnings,
        summary: StructureSummary {
            node_count: nodes.len(),
            connection_count: connections.map_or(0, Map::len),
            has_trigger,
        },
    }
}

impl Workflow {
    pub fn structure_report(&self) -> StructureReport {
        validate_structure(&serde_json::to_value(self).unwrap_or_default())
    }
}

fn non_empty_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// `[x, y]` with two numbers.
pub(crate) fn is_position(value: Option<&Value>) -> bool {
    match value.and_then(Value::as_array) {
        Some(pair) => pair.len() == 2 && pair.iter().all(Value::is_number),
        None => false,
    }
}

/// Target node names under one source, across channels and branches.
/// Entries that are not shaped like targets are ignored.
fn connection_targets(channels: &Value) -> impl Iterator<Item = &str> {
    channels
        .as_object()
        .into_iter()
        .flat_map(|c| c.values())
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|target| target.get("node").and_then(Value::as_str))
}
