mod parse;
mod prompt;

#[cfg(test)]
mod tests;

use flowsmith_core::fallback::truncate_requirement;
use flowsmith_core::{
    IdSource, NodeIdGenerator, StructureReport, UserGuide, Workflow, analyze, normalize,
    synthesize_fallback,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{BackendFailure, GenerateError, MalformedOutput, classify_backend_error};
use crate::{ChatBackend, LlmClient, LlmConfig, Message, Usage};
use parse::extract_fenced;

pub use prompt::{system_prompt, user_prompt};

/// Note attached to template workflows built because the model service
/// could not be reached.
pub const FALLBACK_NOTE: &str = "The model service could not be reached, so this workflow was \
    built from a template matched to keywords in your requirement. Check network access to the \
    model service, or set OPENAI_BASE_URL to a reachable proxy, then generate again for a \
    workflow tailored to your requirement.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowSource {
    Model,
    Template,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResult {
    pub workflow: Workflow,
    pub user_guide: UserGuide,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_stats: Option<Usage>,
    pub source: WorkflowSource,
    /// Normalization notes about dropped or replaced entries.
    pub warnings: Vec<String>,
    pub validation: StructureReport,
}

/// Generate a workflow with the configured model service.
///
/// `api_key` takes precedence over the key in `config`.
pub async fn generate_workflow(
    requirement: &str,
    api_key: Option<&str>,
    config: LlmConfig,
) -> Result<GeneratedResult, GenerateError> {
    ensure_requirement(requirement)?;

    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .map(str::to_string)
        .or_else(|| config.api_key.clone())
        .ok_or(GenerateError::MissingCredential)?;

    let client = LlmClient::new(config.with_api_key(api_key));
    generate_workflow_with_backend(&client, requirement, &NodeIdGenerator::new()).await
}

/// Generate a workflow using a given ChatBackend (for testability).
///
/// Only failures to reach the service fall back to the template path;
/// every other failure is returned to the caller.
pub async fn generate_workflow_with_backend(
    backend: &impl ChatBackend,
    requirement: &str,
    ids: &impl IdSource,
) -> Result<GeneratedResult, GenerateError> {
    ensure_requirement(requirement)?;

    let analysis = analyze(requirement);
    let user_guide = UserGuide::from_analysis(requirement, &analysis);

    let system = system_prompt();
    let user_msg = user_prompt(requirement, &analysis);

    info!(
        "Generating workflow with {} for: {}",
        backend.model_name(),
        truncate_requirement(requirement)
    );
    debug!(
        "Prompt lengths: system={} chars, user={} chars",
        system.len(),
        user_msg.len()
    );

    let messages = vec![Message::system(system), Message::user(user_msg)];

    let response = match backend.chat(messages).await {
        Ok(response) => response,
        Err(err) => match classify_backend_error(err) {
            BackendFailure::Transport(message) => {
                warn!(
                    "Model service unreachable, falling back to template workflow: {}",
                    message
                );
                let mut result = build_fallback(requirement, ids, user_guide)?;
                result.description = Some(FALLBACK_NOTE.to_string());
                return Ok(result);
            }
            BackendFailure::Fatal(error) => {
                warn!("Workflow generation failed: {}", error);
                return Err(error);
            }
        },
    };

    let content = response
        .first_content()
        .filter(|c| !c.trim().is_empty())
        .ok_or(MalformedOutput::EmptyResponse)?;
    debug!("Model output: {} chars", content.len());

    let json_text = extract_fenced(content, "json").ok_or(MalformedOutput::NoJsonFound)?;
    let candidate: serde_json::Value =
        serde_json::from_str(json_text).map_err(MalformedOutput::InvalidJson)?;
    let description = extract_fenced(content, "description").map(str::to_string);

    let normalized = normalize(candidate, ids).map_err(|_| MalformedOutput::NotAnObject)?;
    let validation = normalized.workflow.structure_report();

    info!(
        "Generated workflow: {} nodes, valid={}, {} warnings",
        normalized.workflow.nodes.len(),
        validation.is_valid,
        normalized.warnings.len()
    );

    Ok(GeneratedResult {
        workflow: normalized.workflow,
        user_guide,
        description,
        usage_stats: response.usage,
        source: WorkflowSource::Model,
        warnings: normalized.warnings,
        validation,
    })
}

/// Build the template workflow for `requirement` without calling a model.
pub fn generate_fallback(
    requirement: &str,
    ids: &impl IdSource,
) -> Result<GeneratedResult, GenerateError> {
    ensure_requirement(requirement)?;
    let user_guide = UserGuide::from_analysis(requirement, &analyze(requirement));
    build_fallback(requirement, ids, user_guide)
}

fn build_fallback(
    requirement: &str,
    ids: &impl IdSource,
    user_guide: UserGuide,
) -> Result<GeneratedResult, GenerateError> {
    let synthesized = synthesize_fallback(requirement, ids);
    let candidate =
        serde_json::to_value(&synthesized).map_err(|e| GenerateError::Failed(e.to_string()))?;
    let normalized = normalize(candidate, ids).map_err(|e| GenerateError::Failed(e.to_string()))?;
    let validation = normalized.workflow.structure_report();

    info!(
        "Template workflow: {} nodes, valid={}",
        normalized.workflow.nodes.len(),
        validation.is_valid
    );

    Ok(GeneratedResult {
        workflow: normalized.workflow,
        user_guide,
        description: None,
        usage_stats: None,
        source: WorkflowSource::Template,
        warnings: normalized.warnings,
        validation,
    })
}

fn ensure_requirement(requirement: &str) -> Result<(), GenerateError> {
    if requirement.trim().is_empty() {
        return Err(GenerateError::InvalidInput);
    }
    Ok(())
}
