//! Preparation checklist handed back with every generated workflow.

use serde::Serialize;

use crate::analysis::{Operation, RequirementAnalysis, analyze};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGuide {
    pub credentials: Vec<CredentialInfo>,
    pub parameters: Vec<ParameterHint>,
    pub data_sources: Vec<DataSourceHint>,
    pub preparations: Vec<&'static str>,
}

/// How to obtain the credential a service node needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialInfo {
    pub service: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub steps: &'static [&'static str],
    pub required_fields: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterHint {
    pub name: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceHint {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub format: &'static str,
    pub requirements: &'static str,
}

const PREPARATIONS: &[&str] = &[
    "Make sure the APIs of every external service are enabled",
    "Prepare test data to verify the workflow",
    "Check the rate limits of the APIs involved",
    "Set up a channel (Slack, email) for error notifications",
];

const DATABASE_HINT: ParameterHint = ParameterHint {
    name: "Database connection",
    description: "Host, port, database name, user and password",
    example: "host: localhost, port: 5432, database: mydb",
};

const ENDPOINT_HINT: ParameterHint = ParameterHint {
    name: "API endpoint URL",
    description: "Full URL of the API request",
    example: "https://api.example.com/v1/data",
};

const FILE_SOURCE: DataSourceHint = DataSourceHint {
    kind: "File",
    format: "CSV/Excel",
    requirements: "The file must be well-formed and include a header row",
};

pub fn user_guide(requirement: &str) -> UserGuide {
    UserGuide::from_analysis(requirement, &analyze(requirement))
}

impl UserGuide {
    pub fn from_analysis(requirement: &str, analysis: &RequirementAnalysis) -> Self {
        let credentials = analysis
            .services
            .iter()
            .filter_map(|service| credential_info(service))
            .cloned()
            .collect();

        let mut parameters = Vec::new();
        if analysis.operations.contains(&Operation::Query) {
            parameters.push(DATABASE_HINT);
        }
        if analysis.operations.contains(&Operation::Fetch)
            || analysis.operations.contains(&Operation::Send)
        {
            parameters.push(ENDPOINT_HINT);
        }

        let lower = requirement.to_lowercase();
        let mut data_sources = Vec::new();
        if lower.contains("csv") || lower.contains("excel") {
            data_sources.push(FILE_SOURCE);
        }

        Self {
            credentials,
            parameters,
            data_sources,
            preparations: PREPARATIONS.to_vec(),
        }
    }
}

/// Credential instructions for a service name as produced by the analyzer.
pub fn credential_info(service: &str) -> Option<&'static CredentialInfo> {
    CREDENTIALS.iter().find(|info| info.service == service)
}

const CREDENTIALS: &[CredentialInfo] = &[
    CredentialInfo {
        service: "Slack",
        kind: "OAuth2 or Bot Token",
        steps: &[
            "Open https://api.slack.com/apps",
            "Create an app or pick an existing one",
            "Copy the Bot User OAuth Token",
            "Grant the required scopes (e.g. chat:write)",
        ],
        required_fields: &["Bot Token", "Channel ID/Name"],
    },
    CredentialInfo {
        service: crate::analysis::EMAIL_SERVICE,
        kind: "SMTP/IMAP credentials",
        steps: &[
            "Look up the SMTP server host and port",
            "Create an app-specific password (e.g. for Gmail)",
            "Confirm the SSL/TLS settings",
            "Choose the sender address",
        ],
        required_fields: &[
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_USER",
            "SMTP_PASSWORD",
            "SMTP_FROM_EMAIL",
        ],
    },
    CredentialInfo {
        service: "GitHub",
        kind: "Personal Access Token",
        steps: &[
            "Open GitHub Settings > Developer settings",
            "Generate a Personal Access Token",
            "Select the required scopes",
            "Store the token (it is shown only once)",
        ],
        required_fields: &["Access Token", "Username"],
    },
    CredentialInfo {
        service: "PostgreSQL",
        kind: "Database connection",
        steps: &[
            "Make sure the database server is reachable",
            "Create a database user with the needed privileges",
            "Collect the connection parameters",
            "Test the connection",
        ],
        required_fields: &["Host", "Port", "Database", "User", "Password"],
    },
    CredentialInfo {
        service: "MySQL",
        kind: "Database connection",
        steps: &[
            "Make sure the MySQL server is reachable",
            "Create a database user with the needed privileges",
            "Collect the connection parameters",
            "Check the character set (utf8mb4 recommended)",
        ],
        required_fields: &["Host", "Port", "Database", "User", "Password"],
    },
    CredentialInfo {
        service: "MongoDB",
        kind: "Database connection",
        steps: &[
            "Get the MongoDB connection string",
            "Confirm the authentication database",
            "Set read/write permissions",
            "For Atlas, copy the cluster connection details",
        ],
        required_fields: &["Connection String", "Database Name"],
    },
    CredentialInfo {
        service: crate::analysis::HTTP_API_SERVICE,
        kind: "API authentication",
        steps: &[
            "Read the API documentation and endpoints",
            "Obtain an API key or OAuth credentials",
            "Note the required headers and parameters",
            "Test the connection and response format",
        ],
        required_fields: &["API Key/Token", "Base URL", "Headers"],
    },
    CredentialInfo {
        service: "WeatherAPI",
        kind: "API Key",
        steps: &[
            "Open https://www.weatherapi.com",
            "Register a free account",
            "Copy the API key",
            "Check the plan limits (1000 calls/day on the free plan)",
            "Pick the data you need (current, forecast, history)",
        ],
        required_fields: &["WEATHER_API_KEY", "WEATHER_CITY", "Language"],
    },
    CredentialInfo {
        service: "OpenWeatherMap",
        kind: "API Key",
        steps: &[
            "Open https://openweathermap.org/api",
            "Register and choose a plan",
            "Generate an API key",
            "Wait for activation (up to 2 hours)",
            "Choose the API version (2.5 or 3.0)",
        ],
        required_fields: &["API Key", "City/Coordinates", "Units (metric/imperial)"],
    },
    CredentialInfo {
        service: "OpenAI",
        kind: "API Key",
        steps: &[
            "Open platform.openai.com",
            "Create an API key",
            "Set a usage limit",
            "Choose a model",
            "Configure the base URL when going through a proxy",
        ],
        required_fields: &["OPENAI_API_KEY", "OPENAI_BASE_URL (optional)", "Model"],
    },
    CredentialInfo {
        service: "Telegram",
        kind: "Bot Token",
        steps: &[
            "Talk to @BotFather",
            "Create a new bot",
            "Copy the bot token",
            "Set the bot commands and description",
            "Find the chat id (user or group)",
        ],
        required_fields: &["Bot Token", "Chat ID"],
    },
    CredentialInfo {
        service: "Discord",
        kind: "Webhook or Bot Token",
        steps: &[
            "Create a webhook in the server settings",
            "Or create a Discord application with a bot",
            "Copy the webhook URL or bot token",
            "Grant the required permissions",
        ],
        required_fields: &["Webhook URL or Bot Token", "Channel ID"],
    },
    CredentialInfo {
        service: "Airtable",
        kind: "Personal Access Token",
        steps: &[
            "Open airtable.com/account",
            "Generate a Personal Access Token",
            "Select the required scopes",
            "Find the base id and table name",
        ],
        required_fields: &["Access Token", "Base ID", "Table Name"],
    },
    CredentialInfo {
        service: "Google Sheets",
        kind: "OAuth2 or Service Account",
        steps: &[
            "Create a project in Google Cloud Console",
            "Enable the Google Sheets API",
            "Create OAuth2 or service account credentials",
            "Download the credentials JSON",
            "Share the sheet with the service account email, if used",
        ],
        required_fields: &["Credentials JSON", "Spreadsheet ID"],
    },
    CredentialInfo {
        service: "AWS S3",
        kind: "Access Key",
        steps: &[
            "Create an IAM user",
            "Attach an S3 access policy",
            "Generate an access key and secret",
            "Configure the bucket permissions",
        ],
        required_fields: &["Access Key ID", "Secret Access Key", "Region", "Bucket Name"],
    },
    CredentialInfo {
        service: "Stripe",
        kind: "API Key",
        steps: &[
            "Open dashboard.stripe.com",
            "Copy the API key (test or live)",
            "Configure a webhook endpoint if needed",
            "Note the API version",
        ],
        required_fields: &["Secret Key", "Publishable Key (optional)", "Webhook Secret (optional)"],
    },
    CredentialInfo {
        service: "SendGrid",
        kind: "API Key",
        steps: &[
            "Open app.sendgrid.com",
            "Create an API key",
            "Verify the sender domain or address",
            "Configure IP access management (optional)",
        ],
        required_fields: &["API Key", "Verified Sender Email"],
    },
    CredentialInfo {
        service: "Twilio",
        kind: "Account SID and Auth Token",
        steps: &[
            "Open console.twilio.com",
            "Copy the Account SID",
            "Copy the Auth Token",
            "Buy or verify a phone number",
        ],
        required_fields: &["Account SID", "Auth Token", "Phone Number"],
    },
];
