use serde::Serialize;

const TYPE_PREFIX: &str = "n8n-nodes-base.";

/// Node types this crate knows how to build. Node `type` strings stay open:
/// anything not listed here passes through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    ManualTrigger,
    ScheduleTrigger,
    WebhookTrigger,
    ErrorTrigger,
    HttpRequest,
    Postgres,
    Set,
    If,
    SplitInBatches,
    EmailSend,
    Slack,
    Code,
}

impl NodeKind {
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::ManualTrigger,
            NodeKind::ScheduleTrigger,
            NodeKind::WebhookTrigger,
            NodeKind::ErrorTrigger,
            NodeKind::HttpRequest,
            NodeKind::Postgres,
            NodeKind::Set,
            NodeKind::If,
            NodeKind::SplitInBatches,
            NodeKind::EmailSend,
            NodeKind::Slack,
            NodeKind::Code,
        ]
    }

    /// The engine's type string, e.g. `n8n-nodes-base.httpRequest`.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::ManualTrigger => "n8n-nodes-base.manualTrigger",
            NodeKind::ScheduleTrigger => "n8n-nodes-base.cron",
            NodeKind::WebhookTrigger => "n8n-nodes-base.webhook",
            NodeKind::ErrorTrigger => "n8n-nodes-base.errorTrigger",
            NodeKind::HttpRequest => "n8n-nodes-base.httpRequest",
            NodeKind::Postgres => "n8n-nodes-base.postgres",
            NodeKind::Set => "n8n-nodes-base.set",
            NodeKind::If => "n8n-nodes-base.if",
            NodeKind::SplitInBatches => "n8n-nodes-base.splitInBatches",
            NodeKind::EmailSend => "n8n-nodes-base.emailSend",
            NodeKind::Slack => "n8n-nodes-base.slack",
            NodeKind::Code => "n8n-nodes-base.code",
        }
    }

    pub fn from_type_name(type_name: &str) -> Option<NodeKind> {
        if !type_name.starts_with(TYPE_PREFIX) {
            return None;
        }
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.type_name() == type_name)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::ManualTrigger => "Manual Trigger",
            NodeKind::ScheduleTrigger => "Schedule Trigger",
            NodeKind::WebhookTrigger => "Webhook Trigger",
            NodeKind::ErrorTrigger => "Error Trigger",
            NodeKind::HttpRequest => "HTTP Request",
            NodeKind::Postgres => "Postgres",
            NodeKind::Set => "Set Fields",
            NodeKind::If => "If",
            NodeKind::SplitInBatches => "Split In Batches",
            NodeKind::EmailSend => "Send Email",
            NodeKind::Slack => "Slack",
            NodeKind::Code => "Code",
        }
    }

    /// Parameter schema version emitted for this kind.
    pub fn type_version(&self) -> f64 {
        match self {
            NodeKind::ManualTrigger
            | NodeKind::ScheduleTrigger
            | NodeKind::WebhookTrigger
            | NodeKind::ErrorTrigger => 1.0,
            NodeKind::HttpRequest => 4.1,
            NodeKind::Postgres | NodeKind::If | NodeKind::Code => 2.0,
            NodeKind::Set | NodeKind::SplitInBatches => 3.0,
            NodeKind::EmailSend | NodeKind::Slack => 2.1,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            NodeKind::ManualTrigger
                | NodeKind::ScheduleTrigger
                | NodeKind::WebhookTrigger
                | NodeKind::ErrorTrigger
        )
    }

    /// Parameter keys a node of this kind cannot work without.
    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            NodeKind::ScheduleTrigger => &["triggerTimes"],
            NodeKind::WebhookTrigger => &["path"],
            NodeKind::HttpRequest => &["url"],
            NodeKind::Postgres => &["operation"],
            NodeKind::If => &["conditions"],
            NodeKind::EmailSend => &["toEmail"],
            NodeKind::Slack => &["text"],
            NodeKind::ManualTrigger
            | NodeKind::ErrorTrigger
            | NodeKind::Set
            | NodeKind::SplitInBatches
            | NodeKind::Code => &[],
        }
    }
}
