//! Template workflow synthesis without a model call.
//!
//! The trigger is chosen from the feature flags, then every enabled step of
//! [`ACTION_CHAIN`] is appended as the sole successor of the previous node.
//! Each step has a fixed node name and appears at most once, which keeps
//! names unique (connections are keyed by name).

use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::analysis::{Features, analyze};
use crate::ids::IdSource;
use crate::node_kind::NodeKind;
use crate::normalize::PLACEHOLDER_WORKFLOW_NAME;
use crate::{Node, Position, Workflow, WorkflowSettings};

const ORIGIN_X: f64 = 250.0;
const MAIN_Y: f64 = 300.0;
const STEP_X: f64 = 250.0;
const ERROR_OFFSET_Y: f64 = 200.0;

/// Chains with more nodes than this (trigger included) get the error
/// subgraph even when the requirement never mentions errors. Heuristic
/// threshold kept as-is.
pub const ERROR_HANDLING_NODE_THRESHOLD: usize = 3;

pub const SCHEDULE_TRIGGER_NODE: &str = "Schedule Trigger";
pub const WEBHOOK_TRIGGER_NODE: &str = "Webhook Trigger";
pub const MANUAL_TRIGGER_NODE: &str = "Manual Trigger";
pub const HTTP_REQUEST_NODE: &str = "HTTP Request";
pub const DATABASE_QUERY_NODE: &str = "Database Query";
pub const TRANSFORM_NODE: &str = "Transform Data";
pub const CONDITION_NODE: &str = "Check Condition";
pub const BATCH_NODE: &str = "Process In Batches";
pub const EMAIL_NODE: &str = "Send Email";
pub const CHAT_NODE: &str = "Send Slack Message";
pub const ERROR_TRIGGER_NODE: &str = "Error Trigger";
pub const ERROR_NOTIFY_NODE: &str = "Error Notification";
pub const CODE_NODE: &str = "Process With Code";

const WORKFLOW_NAME_MAX_CHARS: usize = 50;

/// One optional link of the main chain.
struct ChainStep {
    enabled: fn(&Features) -> bool,
    name: &'static str,
    kind: NodeKind,
    parameters: fn(&dyn IdSource) -> Value,
}

/// Fixed append order of the main chain.
const ACTION_CHAIN: &[ChainStep] = &[
    ChainStep {
        enabled: |f| f.http,
        name: HTTP_REQUEST_NODE,
        kind: NodeKind::HttpRequest,
        parameters: |_| http_request_parameters(),
    },
    ChainStep {
        enabled: |f| f.database,
        name: DATABASE_QUERY_NODE,
        kind: NodeKind::Postgres,
        parameters: |_| database_query_parameters(),
    },
    ChainStep {
        enabled: |f| f.transform || f.condition,
        name: TRANSFORM_NODE,
        kind: NodeKind::Set,
        parameters: |_| transform_parameters(),
    },
    // Only the default output is wired; the false branch is left open.
    ChainStep {
        enabled: |f| f.condition,
        name: CONDITION_NODE,
        kind: NodeKind::If,
        parameters: condition_parameters,
    },
    ChainStep {
        enabled: |f| f.batch,
        name: BATCH_NODE,
        kind: NodeKind::SplitInBatches,
        parameters: |_| json!({ "batchSize": 10, "options": {} }),
    },
    ChainStep {
        enabled: |f| f.email,
        name: EMAIL_NODE,
        kind: NodeKind::EmailSend,
        parameters: |_| email_parameters(),
    },
    ChainStep {
        enabled: |f| f.chat,
        name: CHAT_NODE,
        kind: NodeKind::Slack,
        parameters: |_| chat_parameters(),
    },
];

/// Build a workflow for `requirement` from keyword analysis alone.
pub fn synthesize_fallback(requirement: &str, ids: &impl IdSource) -> Workflow {
    let features = analyze(requirement).features;
    synthesize_from_features(requirement, &features, ids)
}

pub fn synthesize_from_features(
    requirement: &str,
    features: &Features,
    ids: &impl IdSource,
) -> Workflow {
    let mut chain = ChainBuilder::new(truncate_requirement(requirement), ids);

    let (trigger_name, trigger_kind, trigger_parameters) = select_trigger(features);
    chain.append(trigger_name, trigger_kind, trigger_parameters);

    for step in ACTION_CHAIN.iter().filter(|step| (step.enabled)(features)) {
        let parameters = (step.parameters)(chain.ids);
        chain.append(step.name, step.kind, parameters);
    }

    if features.error_handling || chain.workflow.nodes.len() > ERROR_HANDLING_NODE_THRESHOLD {
        chain.append_error_subgraph();
    }

    if chain.workflow.nodes.len() == 1 {
        chain.append(CODE_NODE, NodeKind::Code, code_parameters());
    }

    let now = Utc::now();
    let mut workflow = chain.workflow;
    workflow.settings = WorkflowSettings::generated(features.error_handling);
    workflow.created_at = Some(now);
    workflow.updated_at = Some(now);

    debug!(
        "Synthesized template workflow: {} nodes, {} connection sources",
        workflow.nodes.len(),
        workflow.connections.len()
    );

    workflow
}

fn select_trigger(features: &Features) -> (&'static str, NodeKind, Value) {
    if features.schedule {
        (
            SCHEDULE_TRIGGER_NODE,
            NodeKind::ScheduleTrigger,
            json!({
                "triggerTimes": {
                    "item": [{ "mode": "everyDay", "hour": 9, "minute": 0 }]
                }
            }),
        )
    } else if features.webhook {
        (
            WEBHOOK_TRIGGER_NODE,
            NodeKind::WebhookTrigger,
            json!({
                "httpMethod": "POST",
                "path": "workflow-webhook",
                "responseMode": "onReceived",
                "responseData": "allEntries",
                "options": {}
            }),
        )
    } else {
        (MANUAL_TRIGGER_NODE, NodeKind::ManualTrigger, json!({}))
    }
}

/// Workflow name: the requirement, cut to 50 characters with an ellipsis.
/// Blank text gets the placeholder name.
pub fn truncate_requirement(requirement: &str) -> String {
    let trimmed = requirement.trim();
    if trimmed.is_empty() {
        return PLACEHOLDER_WORKFLOW_NAME.to_string();
    }
    if trimmed.chars().count() <= WORKFLOW_NAME_MAX_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(WORKFLOW_NAME_MAX_CHARS - 3).collect();
    format!("{head}...")
}

struct ChainBuilder<'a> {
    workflow: Workflow,
    ids: &'a dyn IdSource,
    next_x: f64,
    last: Option<&'static str>,
}

impl<'a> ChainBuilder<'a> {
    fn new(name: String, ids: &'a dyn IdSource) -> Self {
        Self {
            workflow: Workflow::new(name),
            ids,
            next_x: ORIGIN_X,
            last: None,
        }
    }

    /// Place a node in the next main-row slot and wire it after the last one.
    fn append(&mut self, name: &'static str, kind: NodeKind, parameters: Value) {
        let position = Position {
            x: self.next_x,
            y: MAIN_Y,
        };
        self.workflow
            .nodes
            .push(build_node(self.ids, name, kind, position, parameters));
        if let Some(previous) = self.last {
            self.workflow.connect(previous, name);
        }
        self.last = Some(name);
        self.next_x += STEP_X;
    }

    /// Error trigger -> notification, placed below the chain and not
    /// connected to it.
    fn append_error_subgraph(&mut self) {
        let y = MAIN_Y + ERROR_OFFSET_Y;
        let trigger = build_node(
            self.ids,
            ERROR_TRIGGER_NODE,
            NodeKind::ErrorTrigger,
            Position {
                x: self.next_x - 2.0 * STEP_X,
                y,
            },
            json!({}),
        );
        let notify = build_node(
            self.ids,
            ERROR_NOTIFY_NODE,
            NodeKind::EmailSend,
            Position {
                x: self.next_x - STEP_X,
                y,
            },
            error_notification_parameters(),
        );
        self.workflow.nodes.push(trigger);
        self.workflow.nodes.push(notify);
        self.workflow.connect(ERROR_TRIGGER_NODE, ERROR_NOTIFY_NODE);
    }
}

fn build_node(
    ids: &dyn IdSource,
    name: &str,
    kind: NodeKind,
    position: Position,
    parameters: Value,
) -> Node {
    Node::new(
        ids.next_id(),
        name,
        kind.type_name(),
        kind.type_version(),
        position,
        into_map(parameters),
    )
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// =============================================================================
// Parameter templates
// =============================================================================

fn http_request_parameters() -> Value {
    json!({
        "method": "GET",
        "url": "https://api.example.com/data",
        "authentication": "none",
        "options": {
            "timeout": 10000,
            "response": { "response": { "responseFormat": "json" } }
        }
    })
}

fn database_query_parameters() -> Value {
    json!({
        "operation": "executeQuery",
        "query": "SELECT * FROM users WHERE created_at > CURRENT_DATE - INTERVAL '7 days'",
        "options": {}
    })
}

fn transform_parameters() -> Value {
    json!({
        "mode": "manual",
        "duplicateItem": false,
        "options": {},
        "fields": {
            "values": [
                { "name": "processed", "type": "boolean", "value": true },
                { "name": "timestamp", "type": "dateTime", "value": "={{ $now }}" }
            ]
        }
    })
}

fn condition_parameters(ids: &dyn IdSource) -> Value {
    json!({
        "conditions": {
            "options": {
                "caseSensitive": true,
                "leftValue": "",
                "typeValidation": "strict"
            },
            "conditions": [{
                "id": ids.next_id(),
                "leftValue": "={{ $json.status }}",
                "rightValue": "active",
                "operator": { "type": "string", "operation": "equals" }
            }],
            "combinator": "and"
        },
        "options": {}
    })
}

fn email_parameters() -> Value {
    json!({
        "fromEmail": "={{ $env.SMTP_FROM_EMAIL }}",
        "toEmail": "recipient@example.com",
        "subject": "Workflow run finished",
        "emailType": "html",
        "message": "<h3>Workflow run finished</h3><p>Processed {{ $items().length }} records</p>",
        "options": {}
    })
}

fn chat_parameters() -> Value {
    json!({
        "resource": "message",
        "operation": "post",
        "text": "Workflow run finished. Processed {{ $items().length }} items.",
        "channel": "#notifications",
        "username": "n8n Bot",
        "options": {}
    })
}

fn error_notification_parameters() -> Value {
    json!({
        "fromEmail": "={{ $env.SMTP_FROM_EMAIL }}",
        "toEmail": "admin@example.com",
        "subject": "Workflow execution failed",
        "emailType": "text",
        "message": "Workflow \"{{ $workflow.name }}\" failed:\n\n{{ $json.error.message }}\n\nNode: {{ $json.error.node.name }}",
        "options": {}
    })
}

fn code_parameters() -> Value {
    json!({
        "language": "javaScript",
        "jsCode": "// Add your processing logic here\nconst items = $input.all();\n\nreturn items.map(item => ({\n  json: {\n    ...item.json,\n    processed: true,\n    processedAt: new Date().toISOString()\n  }\n}));"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use std::collections::HashSet;

    fn synth(text: &str) -> Workflow {
        synthesize_fallback(text, &SequentialIds::new("n"))
    }

    fn names(wf: &Workflow) -> Vec<&str> {
        wf.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Structural soundness shared by every synthesized workflow.
    fn assert_sound(wf: &Workflow) {
        let ids: HashSet<&str> = wf.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), wf.nodes.len(), "ids must be unique");

        let node_names: HashSet<&str> = names(wf).into_iter().collect();
        assert_eq!(node_names.len(), wf.nodes.len(), "names must be unique");

        for (source, target) in wf.edges() {
            assert!(node_names.contains(source), "unknown source {source}");
            assert!(node_names.contains(target.node.as_str()));
        }

        assert!(wf.nodes.len() >= 2);
        assert!(!wf.active);

        // The selected trigger is always node 0 and never a target.
        let entries = wf.entry_points();
        assert_eq!(entries[0], wf.nodes[0].name);
        let expected_entries = if wf.find_node(ERROR_TRIGGER_NODE).is_some() {
            vec![wf.nodes[0].name.as_str(), ERROR_TRIGGER_NODE]
        } else {
            vec![wf.nodes[0].name.as_str()]
        };
        assert_eq!(entries, expected_entries);
    }

    #[test]
    fn test_daily_rest_fetch_uses_schedule_trigger() {
        let wf = synth("每天早上9点从REST API获取数据");
        assert_sound(&wf);
        assert_eq!(wf.nodes[0].node_type, NodeKind::ScheduleTrigger.type_name());
        assert_eq!(
            wf.nodes[0].parameters["triggerTimes"]["item"][0]["hour"],
            9
        );
        assert!(wf.find_node(HTTP_REQUEST_NODE).is_some());
        assert!(wf.find_node(WEBHOOK_TRIGGER_NODE).is_none());
        assert!(wf.find_node(MANUAL_TRIGGER_NODE).is_none());
    }

    #[test]
    fn test_webhook_trigger() {
        let wf = synth("接收Webhook POST请求并解析JSON");
        assert_sound(&wf);
        assert_eq!(wf.nodes[0].node_type, NodeKind::WebhookTrigger.type_name());
        assert_eq!(wf.nodes[0].parameters["httpMethod"], "POST");
        assert!(
            wf.nodes
                .iter()
                .all(|n| n.node_type != NodeKind::ScheduleTrigger.type_name())
        );
    }

    #[test]
    fn test_unrecognized_text_gets_manual_trigger_and_code_node() {
        let wf = synth("asdf");
        assert_sound(&wf);
        assert_eq!(names(&wf), vec![MANUAL_TRIGGER_NODE, CODE_NODE]);
        assert_eq!(wf.nodes[1].node_type, NodeKind::Code.type_name());
        assert_eq!(
            wf.connections[MANUAL_TRIGGER_NODE]["main"][0][0].node,
            CODE_NODE
        );
    }

    #[test]
    fn test_chain_order_and_wiring() {
        let features = Features {
            http: true,
            database: true,
            transform: true,
            condition: true,
            batch: true,
            email: true,
            chat: true,
            ..Default::default()
        };
        let wf = synthesize_from_features("everything", &features, &SequentialIds::new("n"));
        assert_sound(&wf);
        assert_eq!(
            names(&wf),
            vec![
                MANUAL_TRIGGER_NODE,
                HTTP_REQUEST_NODE,
                DATABASE_QUERY_NODE,
                TRANSFORM_NODE,
                CONDITION_NODE,
                BATCH_NODE,
                EMAIL_NODE,
                CHAT_NODE,
                ERROR_TRIGGER_NODE,
                ERROR_NOTIFY_NODE,
            ]
        );

        // A straight chain: every main node except the last has exactly one successor.
        let all_names = names(&wf);
        for pair in all_names[..8].windows(2) {
            let branches = &wf.connections[pair[0]]["main"];
            assert_eq!(branches.len(), 1);
            assert_eq!(branches[0].len(), 1);
            assert_eq!(branches[0][0].node, pair[1]);
        }
        assert!(!wf.connections.contains_key(CHAT_NODE));

        // Main row advances along x at a fixed y.
        for (i, node) in wf.nodes[..8].iter().enumerate() {
            assert_eq!(node.position.y, MAIN_Y);
            assert_eq!(node.position.x, ORIGIN_X + STEP_X * i as f64);
        }
    }

    #[test]
    fn test_condition_implies_transform_node() {
        let features = Features {
            condition: true,
            ..Default::default()
        };
        let wf = synthesize_from_features("x", &features, &SequentialIds::new("n"));
        assert_eq!(
            names(&wf),
            vec![MANUAL_TRIGGER_NODE, TRANSFORM_NODE, CONDITION_NODE]
        );
        // Only the default branch of the condition exists, and nothing follows it.
        assert!(!wf.connections.contains_key(CONDITION_NODE));
    }

    #[test]
    fn test_error_subgraph_is_disconnected_from_main_chain() {
        let wf = synth("调用API，失败时重试");
        assert_sound(&wf);
        let trigger = wf.find_node(ERROR_TRIGGER_NODE).unwrap();
        let notify = wf.find_node(ERROR_NOTIFY_NODE).unwrap();
        assert_eq!(trigger.position.y, MAIN_Y + ERROR_OFFSET_Y);
        assert!(trigger.position.x < notify.position.x);
        assert_eq!(
            wf.connections[ERROR_TRIGGER_NODE]["main"][0][0].node,
            ERROR_NOTIFY_NODE
        );
        for (source, target) in wf.edges() {
            if source != ERROR_TRIGGER_NODE {
                assert_ne!(target.node, ERROR_TRIGGER_NODE);
                assert_ne!(target.node, ERROR_NOTIFY_NODE);
            }
        }
        assert_eq!(wf.settings.error_workflow, Some(String::new()));
    }

    /// Magic-number heuristic: a chain longer than three nodes gets error
    /// handling without being asked. Three nodes do not.
    #[test]
    fn test_error_subgraph_threshold_heuristic() {
        let three = Features {
            http: true,
            database: true,
            ..Default::default()
        };
        let wf = synthesize_from_features("x", &three, &SequentialIds::new("n"));
        assert_eq!(wf.nodes.len(), 3);
        assert!(wf.find_node(ERROR_TRIGGER_NODE).is_none());

        let four = Features {
            http: true,
            database: true,
            email: true,
            ..Default::default()
        };
        let wf = synthesize_from_features("x", &four, &SequentialIds::new("n"));
        assert_eq!(wf.nodes.len(), 6);
        assert!(wf.find_node(ERROR_TRIGGER_NODE).is_some());
        // Implicit error handling does not set the error-workflow placeholder.
        assert_eq!(wf.settings.error_workflow, None);
    }

    #[test]
    fn test_error_only_requirement_skips_code_node() {
        let features = Features {
            error_handling: true,
            ..Default::default()
        };
        let wf = synthesize_from_features("x", &features, &SequentialIds::new("n"));
        assert_sound(&wf);
        assert_eq!(
            names(&wf),
            vec![MANUAL_TRIGGER_NODE, ERROR_TRIGGER_NODE, ERROR_NOTIFY_NODE]
        );
    }

    #[test]
    fn test_settings_and_metadata() {
        let wf = synth("asdf");
        assert_eq!(wf.settings.execution_order.as_deref(), Some("v1"));
        assert_eq!(wf.settings.save_execution_progress, Some(true));
        assert_eq!(wf.settings.save_manual_executions, Some(true));
        assert_eq!(wf.settings.error_workflow, None);
        assert!(wf.tags.is_empty());
        assert!(wf.created_at.is_some());
        assert_eq!(wf.created_at, wf.updated_at);
    }

    #[test]
    fn test_synthesis_is_structurally_deterministic() {
        let text = "每天从MySQL查询数据，如果异常发送邮件和Slack消息";
        let a = synth(text);
        let b = synth(text);
        assert_eq!(names(&a), names(&b));
        assert_eq!(a.connections, b.connections);
        let positions = |wf: &Workflow| wf.nodes.iter().map(|n| n.position).collect::<Vec<_>>();
        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn test_truncate_requirement() {
        assert_eq!(truncate_requirement("short"), "short");
        let long = "数".repeat(60);
        let name = truncate_requirement(&long);
        assert_eq!(name.chars().count(), 50);
        assert!(name.ends_with("..."));
    }

    #[test]
    fn test_blank_requirement_gets_placeholder_name() {
        assert_eq!(truncate_requirement(" \n\t"), PLACEHOLDER_WORKFLOW_NAME);
        let wf = synth("   ");
        assert_eq!(wf.name, PLACEHOLDER_WORKFLOW_NAME);
        assert!(wf.structure_report().is_valid);
    }
}
