use super::*;
use crate::error::{ChatError, ErrorKind};
use crate::{ChatResponse, Choice};
use flowsmith_core::SequentialIds;
use flowsmith_core::fallback::{CODE_NODE, MANUAL_TRIGGER_NODE};
use std::sync::Mutex;

// ── Test helpers ────────────────────────────────────────────────

/// Mock backend that replays scripted replies and records every call.
struct MockBackend {
    replies: Mutex<Vec<anyhow::Result<String>>>,
    usage: Option<Usage>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockBackend {
    fn new(replies: Vec<anyhow::Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            usage: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn single(response: &str) -> Self {
        Self::new(vec![Ok(response.to_string())])
    }

    fn failing(err: impl Into<anyhow::Error>) -> Self {
        Self::new(vec![Err(err.into())])
    }

    fn with_usage(mut self, total_tokens: u32) -> Self {
        self.usage = Some(Usage {
            prompt_tokens: total_tokens / 2,
            completion_tokens: total_tokens - total_tokens / 2,
            total_tokens,
        });
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ChatBackend for MockBackend {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, messages: Vec<Message>) -> anyhow::Result<ChatResponse> {
        self.calls.lock().unwrap().push(messages);
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(String::new())
            } else {
                replies.remove(0)
            }
        };
        let text = reply?;
        Ok(ChatResponse {
            id: "mock".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(&text),
                finish_reason: Some("stop".to_string()),
            }],
            usage: self.usage,
        })
    }
}

fn model_reply(workflow: serde_json::Value, description: Option<&str>) -> String {
    let mut reply = format!(
        "Here is your workflow:\n```json\n{}\n```\n",
        serde_json::to_string_pretty(&workflow).unwrap()
    );
    if let Some(description) = description {
        reply.push_str(&format!("```description\n{description}\n```\n"));
    }
    reply
}

fn sample_workflow() -> serde_json::Value {
    serde_json::json!({
        "name": "Daily report",
        "active": true,
        "nodes": [
            {
                "id": "1",
                "name": "Every Morning",
                "type": "n8n-nodes-base.cron",
                "typeVersion": 1,
                "position": [250, 300],
                "parameters": { "triggerTimes": { "item": [{ "hour": 9 }] } }
            },
            {
                "name": "Fetch Report",
                "type": "n8n-nodes-base.httpRequest",
                "typeVersion": 4.1,
                "parameters": { "url": "https://api.example.com/report" }
            }
        ],
        "connections": {
            "Every Morning": { "main": [[{ "node": "Fetch Report", "type": "main", "index": 0 }]] }
        }
    })
}

async fn generate(backend: &MockBackend, requirement: &str) -> Result<GeneratedResult, GenerateError> {
    generate_workflow_with_backend(backend, requirement, &SequentialIds::new("gen")).await
}

// ── Model path ──────────────────────────────────────────────────

#[tokio::test]
async fn test_model_workflow_is_normalized() {
    let backend = MockBackend::single(&model_reply(sample_workflow(), None)).with_usage(120);
    let result = generate(&backend, "每天早上9点获取报告").await.unwrap();

    assert_eq!(result.source, WorkflowSource::Model);
    assert!(!result.workflow.active);
    assert_eq!(result.workflow.nodes[1].id, "gen-1");
    assert_eq!(result.workflow.nodes[1].position.x, 450.0);
    assert!(result.validation.is_valid, "{:?}", result.validation.issues);
    assert!(result.validation.summary.has_trigger);
    assert_eq!(result.usage_stats.map(|u| u.total_tokens), Some(120));
    assert!(result.description.is_none());
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_prompt_carries_requirement_and_analysis() {
    let backend = MockBackend::single(&model_reply(sample_workflow(), None));
    generate(&backend, "send a Slack message every day").await.unwrap();

    let calls = backend.calls.lock().unwrap();
    let messages = &calls[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "system");
    let user = messages[1].content.as_deref().unwrap();
    assert!(user.contains("send a Slack message every day"));
    assert!(user.contains("- Services: Slack"));
}

#[tokio::test]
async fn test_description_block_is_returned() {
    let reply = model_reply(sample_workflow(), Some("Fetches the report every morning."));
    let backend = MockBackend::single(&reply);
    let result = generate(&backend, "daily report").await.unwrap();
    assert_eq!(
        result.description.as_deref(),
        Some("Fetches the report every morning.")
    );
}

#[tokio::test]
async fn test_dangling_connection_is_reported_not_fatal() {
    let mut workflow = sample_workflow();
    workflow["connections"]["Fetch Report"] =
        serde_json::json!({ "main": [[{ "node": "Missing", "type": "main", "index": 0 }]] });
    let backend = MockBackend::single(&model_reply(workflow, None));

    let result = generate(&backend, "daily report").await.unwrap();
    assert!(!result.validation.is_valid);
    assert_eq!(result.validation.issues.len(), 1);
    assert_eq!(result.workflow.nodes.len(), 2);
}

// ── Malformed output ────────────────────────────────────────────

#[tokio::test]
async fn test_missing_json_block_is_malformed_output() {
    let backend = MockBackend::single("Sorry, I can't help with that.");
    let err = generate(&backend, "daily report").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedModelOutput);
    assert!(matches!(
        err,
        GenerateError::MalformedModelOutput(MalformedOutput::NoJsonFound)
    ));
    assert!(err.suggestion().is_some());
}

#[tokio::test]
async fn test_invalid_json_is_malformed_output() {
    let backend = MockBackend::single("```json\n{\"name\": \"x\", \"nodes\": [\n```");
    let err = generate(&backend, "daily report").await.unwrap_err();
    assert!(matches!(
        err,
        GenerateError::MalformedModelOutput(MalformedOutput::InvalidJson(_))
    ));
}

#[tokio::test]
async fn test_non_object_json_is_malformed_output() {
    let backend = MockBackend::single("```json\n[1, 2, 3]\n```");
    let err = generate(&backend, "daily report").await.unwrap_err();
    assert!(matches!(
        err,
        GenerateError::MalformedModelOutput(MalformedOutput::NotAnObject)
    ));
}

#[tokio::test]
async fn test_empty_reply_is_malformed_output() {
    let backend = MockBackend::single("   ");
    let err = generate(&backend, "daily report").await.unwrap_err();
    assert!(matches!(
        err,
        GenerateError::MalformedModelOutput(MalformedOutput::EmptyResponse)
    ));
}

// ── Backend failures ────────────────────────────────────────────

#[tokio::test]
async fn test_connection_failure_falls_back_to_template() {
    let backend = MockBackend::failing(ChatError::Connection("connection refused".into()));
    let result = generate(&backend, "每天早上9点从REST API获取数据").await.unwrap();

    assert_eq!(result.source, WorkflowSource::Template);
    assert!(!result.workflow.nodes.is_empty());
    assert!(result.usage_stats.is_none());
    let note = result.description.unwrap();
    assert!(note.contains("OPENAI_BASE_URL"));
    assert!(result.validation.is_valid, "{:?}", result.validation.issues);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_unreachable_service_falls_back_to_template() {
    let config = LlmConfig {
        base_url: "http://127.0.0.1:1/v1".to_string(),
        timeout: std::time::Duration::from_secs(5),
        ..LlmConfig::default()
    };
    let result = generate_workflow("每天早上9点从REST API获取数据", Some("sk-test"), config)
        .await
        .unwrap();

    assert_eq!(result.source, WorkflowSource::Template);
    assert_eq!(result.description.as_deref(), Some(FALLBACK_NOTE));
    assert!(result.usage_stats.is_none());
    assert!(result.validation.is_valid, "{:?}", result.validation.issues);
}

#[tokio::test]
async fn test_timed_out_service_falls_back_to_template() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = LlmConfig {
        base_url: format!("http://{}/v1", listener.local_addr().unwrap()),
        timeout: std::time::Duration::from_millis(200),
        ..LlmConfig::default()
    };
    let result = generate_workflow("daily report", Some("sk-test"), config)
        .await
        .unwrap();

    assert_eq!(result.source, WorkflowSource::Template);
    assert_eq!(result.description.as_deref(), Some(FALLBACK_NOTE));
    drop(listener);
}

#[tokio::test]
async fn test_textual_connection_error_falls_back() {
    let backend = MockBackend::failing(anyhow::anyhow!("Connection error."));
    let result = generate(&backend, "asdf").await.unwrap();
    let names: Vec<_> = result.workflow.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec![MANUAL_TRIGGER_NODE, CODE_NODE]);
}

#[tokio::test]
async fn test_auth_failure_does_not_fall_back() {
    let backend = MockBackend::failing(ChatError::from_status(
        401,
        r#"{"error": {"message": "Incorrect API key provided"}}"#,
    ));
    let err = generate(&backend, "daily report").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthFailure);
}

#[tokio::test]
async fn test_region_restriction_has_remediation() {
    let backend = MockBackend::failing(ChatError::from_status(
        403,
        r#"{"error": {"message": "Country, region, or territory not supported"}}"#,
    ));
    let err = generate(&backend, "daily report").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessRestricted);
    assert!(err.to_string().contains("not supported"));
    assert!(err.suggestion().unwrap().contains("proxy"));
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let backend = MockBackend::new(vec![
        Err(ChatError::from_status(429, "").into()),
        Ok(model_reply(sample_workflow(), None)),
    ]);
    let err = generate(&backend, "daily report").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_other_status_is_service_error() {
    let backend = MockBackend::failing(ChatError::from_status(500, "upstream exploded"));
    let err = generate(&backend, "daily report").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceError);
    assert!(err.to_string().contains("upstream exploded"));
}

// ── Input and credentials ───────────────────────────────────────

#[tokio::test]
async fn test_blank_requirement_is_rejected_before_calling() {
    let backend = MockBackend::single(&model_reply(sample_workflow(), None));
    let err = generate(&backend, "  \n ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_missing_credential() {
    let err = generate_workflow("daily report", None, LlmConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingCredential);

    let err = generate_workflow("daily report", Some(" "), LlmConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingCredential);
}

#[tokio::test]
async fn test_invalid_input_checked_before_credential() {
    let err = generate_workflow("", None, LlmConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

// ── Template path ───────────────────────────────────────────────

#[test]
fn test_generate_fallback_without_model() {
    let result = generate_fallback("接收Webhook POST请求并解析JSON", &SequentialIds::new("t")).unwrap();
    assert_eq!(result.source, WorkflowSource::Template);
    assert!(result.description.is_none());
    assert_eq!(
        result.workflow.nodes[0].node_type,
        flowsmith_core::NodeKind::WebhookTrigger.type_name()
    );
    assert!(result.warnings.is_empty());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["source"], "template");
    assert!(json.get("usageStats").is_none());
    assert!(json["userGuide"]["preparations"].is_array());
}
