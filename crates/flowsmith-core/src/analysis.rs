//! Keyword analysis of free-text requirements.
//!
//! Every dimension is an ordered table evaluated against the lowercased
//! input. Single-valued dimensions (trigger, output) take the first entry in
//! declaration order that matches, so table order is part of the contract.

use serde::Serialize;

/// Keyword categorization of one requirement. A pure function of the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementAnalysis {
    pub trigger: TriggerCategory,
    /// Never empty: defaults to [`Operation::DataProcessing`].
    pub operations: Vec<Operation>,
    /// Service names in order of first match, without duplicates.
    pub services: Vec<&'static str>,
    pub data_processing: Vec<&'static str>,
    pub output: OutputCategory,
    pub features: Features,
}

pub fn analyze(text: &str) -> RequirementAnalysis {
    let lower = text.to_lowercase();
    RequirementAnalysis {
        trigger: first_match(&lower, TRIGGER_RULES).unwrap_or(TriggerCategory::Manual),
        operations: detect_operations(&lower),
        services: detect_services(&lower),
        data_processing: all_matches(&lower, DATA_PROCESSING_RULES),
        output: first_match(&lower, OUTPUT_RULES).unwrap_or(OutputCategory::Completion),
        features: Features::detect_lowercase(&lower),
    }
}

fn contains_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lower.contains(k))
}

fn first_match<T: Copy>(lower: &str, rules: &[(&[&str], T)]) -> Option<T> {
    rules
        .iter()
        .find(|(keywords, _)| contains_any(lower, keywords))
        .map(|(_, category)| *category)
}

fn all_matches<T: Copy + PartialEq>(lower: &str, rules: &[(&[&str], T)]) -> Vec<T> {
    let mut found = Vec::new();
    for (keywords, category) in rules {
        if contains_any(lower, keywords) && !found.contains(category) {
            found.push(*category);
        }
    }
    found
}

fn detect_operations(lower: &str) -> Vec<Operation> {
    let operations = all_matches(lower, OPERATION_RULES);
    if operations.is_empty() {
        vec![Operation::DataProcessing]
    } else {
        operations
    }
}

fn detect_services(lower: &str) -> Vec<&'static str> {
    let mut services = all_matches(lower, SERVICE_RULES);
    if services.is_empty() && contains_any(lower, GENERIC_API_KEYWORDS) {
        services.push(HTTP_API_SERVICE);
    }
    services
}

// =============================================================================
// Trigger
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCategory {
    Schedule,
    Daily,
    Weekly,
    Monthly,
    Webhook,
    RestApi,
    Email,
    File,
    Form,
    Manual,
    Slack,
    GitHub,
}

impl TriggerCategory {
    pub fn label(&self) -> &'static str {
        match self {
            TriggerCategory::Schedule => "Schedule Trigger - cron expression",
            TriggerCategory::Daily => "Schedule Trigger - daily",
            TriggerCategory::Weekly => "Schedule Trigger - weekly",
            TriggerCategory::Monthly => "Schedule Trigger - monthly",
            TriggerCategory::Webhook => "Webhook Trigger - HTTP endpoint",
            TriggerCategory::RestApi => "Webhook Trigger - REST API",
            TriggerCategory::Email => "Email Trigger - IMAP watch",
            TriggerCategory::File => "File Trigger - file changes",
            TriggerCategory::Form => "Form Trigger - hosted form",
            TriggerCategory::Manual => "Manual Trigger - run by hand",
            TriggerCategory::Slack => "Slack Trigger - message events",
            TriggerCategory::GitHub => "GitHub Trigger - repository events",
        }
    }
}

const TRIGGER_RULES: &[(&[&str], TriggerCategory)] = &[
    (&["定时", "schedule", "cron"], TriggerCategory::Schedule),
    (&["每天", "daily", "every day"], TriggerCategory::Daily),
    (&["每周", "weekly", "every week"], TriggerCategory::Weekly),
    (&["每月", "monthly", "every month"], TriggerCategory::Monthly),
    (&["webhook"], TriggerCategory::Webhook),
    (&["api"], TriggerCategory::RestApi),
    (&["邮件", "email"], TriggerCategory::Email),
    (&["文件", "file"], TriggerCategory::File),
    (&["表单", "form submission"], TriggerCategory::Form),
    (&["手动", "manual"], TriggerCategory::Manual),
    (&["slack"], TriggerCategory::Slack),
    (&["github"], TriggerCategory::GitHub),
];

// =============================================================================
// Operations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Fetch,
    Query,
    Send,
    Update,
    Delete,
    Create,
    Download,
    Upload,
    Convert,
    Filter,
    Aggregate,
    Merge,
    Split,
    Encrypt,
    Decrypt,
    Compress,
    Decompress,
    Notify,
    Monitor,
    Backup,
    Sync,
    DataProcessing,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Fetch => "GET request to fetch data",
            Operation::Query => "Database query",
            Operation::Send => "POST request to send data",
            Operation::Update => "PUT/PATCH update",
            Operation::Delete => "DELETE request",
            Operation::Create => "POST to create a resource",
            Operation::Download => "File download",
            Operation::Upload => "File upload",
            Operation::Convert => "Format conversion",
            Operation::Filter => "Data filtering",
            Operation::Aggregate => "Aggregation and statistics",
            Operation::Merge => "Data merge",
            Operation::Split => "Data split",
            Operation::Encrypt => "Encryption",
            Operation::Decrypt => "Decryption",
            Operation::Compress => "Compression",
            Operation::Decompress => "Decompression",
            Operation::Notify => "Send notification",
            Operation::Monitor => "Status monitoring",
            Operation::Backup => "Data backup",
            Operation::Sync => "Data synchronization",
            Operation::DataProcessing => "Data processing",
        }
    }
}

const OPERATION_RULES: &[(&[&str], Operation)] = &[
    (&["获取", "fetch"], Operation::Fetch),
    (&["查询", "query"], Operation::Query),
    (&["发送", "send"], Operation::Send),
    (&["更新", "update"], Operation::Update),
    (&["删除", "delete"], Operation::Delete),
    (&["创建", "create"], Operation::Create),
    (&["下载", "download"], Operation::Download),
    (&["上传", "upload"], Operation::Upload),
    (&["转换", "convert"], Operation::Convert),
    (&["过滤", "filter"], Operation::Filter),
    (&["聚合", "aggregate"], Operation::Aggregate),
    (&["合并", "merge"], Operation::Merge),
    (&["分割", "split"], Operation::Split),
    (&["加密", "encrypt"], Operation::Encrypt),
    (&["解密", "decrypt"], Operation::Decrypt),
    (&["压缩", "compress"], Operation::Compress),
    (&["解压", "decompress", "unzip"], Operation::Decompress),
    (&["通知", "notify"], Operation::Notify),
    (&["监控", "monitor"], Operation::Monitor),
    (&["备份", "backup"], Operation::Backup),
    (&["同步", "sync"], Operation::Sync),
];

// =============================================================================
// Services
// =============================================================================

pub const HTTP_API_SERVICE: &str = "HTTP API";
pub const EMAIL_SERVICE: &str = "Email (SMTP/IMAP)";

const SERVICE_RULES: &[(&[&str], &str)] = &[
    (&["slack"], "Slack"),
    (&["email", "邮件"], EMAIL_SERVICE),
    (&["gmail"], "Gmail"),
    (&["github"], "GitHub"),
    (&["gitlab"], "GitLab"),
    (&["jira"], "Jira"),
    (&["trello"], "Trello"),
    (&["notion"], "Notion"),
    (&["airtable"], "Airtable"),
    (&["google sheets"], "Google Sheets"),
    (&["excel"], "Microsoft Excel"),
    (&["mysql"], "MySQL"),
    (&["postgres"], "PostgreSQL"),
    (&["mongodb"], "MongoDB"),
    (&["redis"], "Redis"),
    (&["s3"], "AWS S3"),
    (&["dropbox"], "Dropbox"),
    (&["telegram"], "Telegram"),
    (&["discord"], "Discord"),
    (&["twitter"], "Twitter/X"),
    (&["linkedin"], "LinkedIn"),
    (&["stripe"], "Stripe"),
    (&["paypal"], "PayPal"),
    (&["shopify"], "Shopify"),
    (&["wordpress"], "WordPress"),
    (&["salesforce"], "Salesforce"),
    (&["hubspot"], "HubSpot"),
    (&["openai"], "OpenAI"),
    (&["chatgpt"], "OpenAI ChatGPT"),
    (&["天气", "weather"], "WeatherAPI"),
    (&["openweather"], "OpenWeatherMap"),
    (&["sendgrid"], "SendGrid"),
    (&["twilio", "sms", "短信"], "Twilio"),
    (&["api"], HTTP_API_SERVICE),
    (&["webhook"], "Webhook"),
    (&["ftp"], "FTP/SFTP"),
    (&["ssh"], "SSH"),
];

const GENERIC_API_KEYWORDS: &[&str] = &["api", "请求", "接口", "request", "endpoint"];

// =============================================================================
// Data processing
// =============================================================================

const DATA_PROCESSING_RULES: &[(&[&str], &str)] = &[
    (&["json"], "JSON parsing and building"),
    (&["xml"], "XML parsing and conversion"),
    (&["csv"], "CSV file handling"),
    (&["excel"], "Excel file handling"),
    (&["格式化", "reformat"], "Data formatting"),
    (&["验证", "validat"], "Data validation"),
    (&["清洗", "cleans"], "Data cleansing"),
    (&["去重", "dedup"], "Deduplication"),
    (&["排序", "sort"], "Sorting"),
    (&["分组", "group by"], "Grouping"),
    (&["计算", "calculat"], "Numeric calculation"),
    (&["统计", "statistic"], "Statistics"),
    (&["加密", "encrypt"], "Encryption"),
    (&["编码", "encod"], "Encoding conversion"),
    (&["正则", "regex"], "Regular expression matching"),
    (&["模板", "template"], "Template rendering"),
    (&["映射", "mapping"], "Field mapping"),
    (&["转换", "convert"], "Type conversion"),
    (&["合并", "merge"], "Data merge"),
    (&["拆分", "split"], "Data split"),
];

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCategory {
    Email,
    Slack,
    WebhookCallback,
    Database,
    File,
    Excel,
    Csv,
    Pdf,
    Notification,
    ApiResponse,
    Report,
    Dashboard,
    Telegram,
    Discord,
    Completion,
}

impl OutputCategory {
    pub fn label(&self) -> &'static str {
        match self {
            OutputCategory::Email => "Send email",
            OutputCategory::Slack => "Slack message",
            OutputCategory::WebhookCallback => "Webhook callback",
            OutputCategory::Database => "Store in database",
            OutputCategory::File => "Save as file",
            OutputCategory::Excel => "Export Excel",
            OutputCategory::Csv => "Export CSV",
            OutputCategory::Pdf => "Generate PDF",
            OutputCategory::Notification => "Send notification",
            OutputCategory::ApiResponse => "API response",
            OutputCategory::Report => "Generate report",
            OutputCategory::Dashboard => "Update dashboard",
            OutputCategory::Telegram => "Telegram message",
            OutputCategory::Discord => "Discord message",
            OutputCategory::Completion => "Processing complete",
        }
    }
}

const OUTPUT_RULES: &[(&[&str], OutputCategory)] = &[
    (&["邮件", "email"], OutputCategory::Email),
    (&["slack"], OutputCategory::Slack),
    (&["webhook"], OutputCategory::WebhookCallback),
    (&["数据库", "database"], OutputCategory::Database),
    (&["文件", "file"], OutputCategory::File),
    (&["excel"], OutputCategory::Excel),
    (&["csv"], OutputCategory::Csv),
    (&["pdf"], OutputCategory::Pdf),
    (&["通知", "notif"], OutputCategory::Notification),
    (&["api"], OutputCategory::ApiResponse),
    (&["报告", "report"], OutputCategory::Report),
    (&["仪表板", "dashboard"], OutputCategory::Dashboard),
    (&["telegram"], OutputCategory::Telegram),
    (&["discord"], OutputCategory::Discord),
];

// =============================================================================
// Feature flags
// =============================================================================

/// Boolean flags that drive the template synthesizer. Detected from their
/// own keyword lists, independently of the categorical dimensions above.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub schedule: bool,
    pub webhook: bool,
    pub email: bool,
    pub database: bool,
    pub http: bool,
    pub chat: bool,
    /// Detected but not used by the template chain.
    pub file: bool,
    pub condition: bool,
    pub batch: bool,
    pub transform: bool,
    pub error_handling: bool,
}

const SCHEDULE_KEYWORDS: &[&str] = &[
    "定时", "每天", "每周", "每月", "每小时", "计划任务", "schedule", "cron", "daily",
    "weekly", "monthly", "hourly", "every day", "every week", "every month", "every hour",
];
const WEBHOOK_KEYWORDS: &[&str] = &["webhook", "api", "接收请求", "监听", "listen"];
const EMAIL_KEYWORDS: &[&str] = &["邮件", "email", "e-mail", "发送通知", "通知", "notification"];
const DATABASE_KEYWORDS: &[&str] = &[
    "数据库", "mysql", "postgres", "mongodb", "查询", "sql", "database", "query",
];
const HTTP_KEYWORDS: &[&str] = &[
    "api", "http", "请求", "调用", "获取数据", "接口", "request", "endpoint", "fetch",
];
const CHAT_KEYWORDS: &[&str] = &["slack", "消息", "即时通讯", "chat message"];
const FILE_KEYWORDS: &[&str] = &[
    "文件", "csv", "excel", "json", "读取", "写入", "导出", "file", "export",
];
const CONDITION_KEYWORDS: &[&str] = &["如果", "判断", "条件", "筛选", "过滤", "condition", "filter"];
const BATCH_KEYWORDS: &[&str] = &["循环", "遍历", "批量", "处理每个", "loop", "batch", "iterate", "for each"];
const TRANSFORM_KEYWORDS: &[&str] = &["转换", "格式化", "处理", "清洗", "整理", "transform", "convert", "cleans"];
const ERROR_KEYWORDS: &[&str] = &["错误", "异常", "失败", "重试", "error", "exception", "fail", "retry"];

impl Features {
    pub fn detect(text: &str) -> Self {
        Self::detect_lowercase(&text.to_lowercase())
    }

    fn detect_lowercase(lower: &str) -> Self {
        Self {
            schedule: contains_any(lower, SCHEDULE_KEYWORDS),
            webhook: contains_any(lower, WEBHOOK_KEYWORDS),
            email: contains_any(lower, EMAIL_KEYWORDS),
            database: contains_any(lower, DATABASE_KEYWORDS),
            http: contains_any(lower, HTTP_KEYWORDS),
            chat: contains_any(lower, CHAT_KEYWORDS),
            file: contains_any(lower, FILE_KEYWORDS),
            condition: contains_any(lower, CONDITION_KEYWORDS),
            batch: contains_any(lower, BATCH_KEYWORDS),
            transform: contains_any(lower, TRANSFORM_KEYWORDS),
            error_handling: contains_any(lower, ERROR_KEYWORDS),
        }
    }
}
