/// Inner text of the first fenced block tagged `label`, e.g. ```` ```json ````.
///
/// The label must be followed by whitespace so that `json` does not match
/// ```` ```jsonc ````. Returns `None` when no such block is closed.
pub(crate) fn extract_fenced<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let opener = format!("```{label}");
    let mut search_from = 0;

    while let Some(found) = text[search_from..].find(&opener) {
        let body_start = search_from + found + opener.len();
        let after = &text[body_start..];
        if !after.starts_with(char::is_whitespace) {
            search_from = body_start;
            continue;
        }
        let end = after.find("```")?;
        return Some(after[..end].trim());
    }

    None
}
