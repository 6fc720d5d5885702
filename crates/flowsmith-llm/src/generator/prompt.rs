use flowsmith_core::RequirementAnalysis;

/// Fixed instructions for producing an importable workflow.
pub fn system_prompt() -> String {
    r#"You are an expert in building n8n workflows. Turn the user's requirement into a complete workflow that can be imported into n8n as-is.

## Rules
1. Return the workflow as valid JSON inside a single ```json code block.
2. The workflow must contain `name`, `nodes`, `connections` and `settings`.
3. Every node needs a unique `id`, a unique `name`, `type`, `typeVersion`, `position` and `parameters`.
4. Use fully qualified node types: `n8n-nodes-base.<nodeName>`.
5. `connections` is keyed by the source node's name: `{"Source": {"main": [[{"node": "Target", "type": "main", "index": 0}]]}}`.
6. Lay nodes out left to right without overlap: main flow at y = 300, error handling at y = 500-600.
7. Parameters must match what the node actually accepts.
8. Use current node versions (httpRequest 4.1, emailSend 2.1).
9. Never put secrets in parameters; reference environment variables such as `={{ $env.SERVICE_API_KEY }}`.
10. Start the workflow with exactly one trigger node.

## Good practice
- Set `continueOnFail: true` on steps that call external services.
- Add an Error Trigger branch that notifies an administrator when the workflow fails.
- Use a Set node to gather configuration and a Code node for complex transformations.
- Give nodes descriptive verb + noun names such as "Fetch Orders" or "Send Report Email".

## Optional description
After the JSON block you may add a ```description code block with a short plain-text explanation of what the workflow does and what the user has to configure."#
        .to_string()
}

/// User message embedding the requirement and its keyword analysis.
pub fn user_prompt(requirement: &str, analysis: &RequirementAnalysis) -> String {
    let operations: Vec<&str> = analysis.operations.iter().map(|op| op.label()).collect();

    let mut lines = vec![
        "Create an n8n workflow for the following requirement.".to_string(),
        String::new(),
        format!("Requirement: {}", requirement.trim()),
        String::new(),
        "Analysis:".to_string(),
        format!("- Trigger: {}", analysis.trigger.label()),
        format!("- Operations: {}", operations.join(", ")),
    ];
    if !analysis.services.is_empty() {
        lines.push(format!("- Services: {}", analysis.services.join(", ")));
    }
    if !analysis.data_processing.is_empty() {
        lines.push(format!(
            "- Data processing: {}",
            analysis.data_processing.join(", ")
        ));
    }
    lines.push(format!("- Output: {}", analysis.output.label()));
    lines.push(String::new());
    lines.push(
        "Include retry handling for steps that can fail, an administrator notification on \
         failure, validation of external responses, and environment variables for secrets."
            .to_string(),
    );

    lines.join("\n")
}
