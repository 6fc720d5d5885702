use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Channel kind used for ordinary data connections.
pub const MAIN_CHANNEL: &str = "main";

/// Source node name -> channel kind -> output branches -> targets.
pub type Connections = BTreeMap<String, NodeConnections>;

/// Channel kind -> ordered output branches, each a fan-out list of targets.
pub type NodeConnections = BTreeMap<String, Vec<Vec<ConnectionTarget>>>;

/// A workflow in the automation engine's import format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub active: bool,
    pub nodes: Vec<Node>,
    pub connections: Connections,
    pub settings: WorkflowSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_data: Option<Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// Top-level keys this crate does not model; carried through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub id: String,
    /// Connections reference nodes by this name, so it must be unique.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default = "default_type_version")]
    pub type_version: f64,
    pub position: Position,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_in_flow: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on_fail: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_between_tries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_fail: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_once: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_type_version() -> f64 {
    1.0
}

/// Canvas coordinate, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl From<[f64; 2]> for Position {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Position> for [f64; 2] {
    fn from(position: Position) -> Self {
        [position.x, position.y]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub node: String,
    #[serde(rename = "type", default = "default_channel")]
    pub channel: String,
    #[serde(default)]
    pub index: u32,
}

fn default_channel() -> String {
    MAIN_CHANNEL.to_string()
}

impl ConnectionTarget {
    /// Target input slot 0 of `node` on the main channel.
    pub fn main(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            channel: default_channel(),
            index: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_data_success_execution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_manual_executions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_execution_progress: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_timeout: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowSettings {
    /// Settings applied when a candidate workflow carries none.
    pub fn minimal() -> Self {
        Self {
            execution_order: Some("v1".to_string()),
            ..Default::default()
        }
    }

    /// Settings stamped on template-built workflows. `errorWorkflow` is only
    /// set (to an empty placeholder) when error handling was asked for.
    pub fn generated(error_workflow: bool) -> Self {
        Self {
            execution_order: Some("v1".to_string()),
            save_data_success_execution: Some("all".to_string()),
            save_manual_executions: Some(true),
            save_execution_progress: Some(true),
            caller_policy: Some("workflowsFromSameOwner".to_string()),
            error_workflow: error_workflow.then(String::new),
            ..Default::default()
        }
    }
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
        type_version: f64,
        position: Position,
        parameters: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type: node_type.into(),
            type_version,
            position,
            parameters,
            credentials: None,
            disabled: None,
            notes: None,
            notes_in_flow: None,
            retry_on_fail: None,
            max_tries: None,
            wait_between_tries: None,
            continue_on_fail: None,
            execute_once: None,
            extra: Map::new(),
        }
    }
}

impl Workflow {
    /// An inactive, empty workflow with minimal settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            active: false,
            nodes: vec![],
            connections: Connections::new(),
            settings: WorkflowSettings::minimal(),
            static_data: None,
            tags: vec![],
            created_at: None,
            updated_at: None,
            version_id: None,
            extra: Map::new(),
        }
    }

    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Append `to` to the first main output branch of `from`.
    pub fn connect(&mut self, from: &str, to: &str) {
        let branches = self
            .connections
            .entry(from.to_string())
            .or_default()
            .entry(MAIN_CHANNEL.to_string())
            .or_default();
        if branches.is_empty() {
            branches.push(Vec::new());
        }
        branches[0].push(ConnectionTarget::main(to));
    }

    /// Every `(source name, target)` pair across all channels and branches.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &ConnectionTarget)> {
        self.connections.iter().flat_map(|(source, channels)| {
            channels
                .values()
                .flatten()
                .flatten()
                .map(move |target| (source.as_str(), target))
        })
    }

    /// Names of nodes with no incoming connection, in node order.
    pub fn entry_points(&self) -> Vec<&str> {
        let targets: HashSet<&str> = self.edges().map(|(_, t)| t.node.as_str()).collect();
        self.nodes
            .iter()
            .map(|n| n.name.as_str())
            .filter(|name| !targets.contains(name))
            .collect()
    }
}
