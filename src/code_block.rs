/// Strip a surrounding ```` ```mermaid ```` fence, if the whole input is
/// exactly one such block. Anything else comes back trimmed.
pub fn extract(text: &str) -> String {
    let trimmed = text.trim();
    match fenced_body(trimmed) {
        Some(body) => body.trim().to_string(),
        None => trimmed.to_string(),
    }
}

fn fenced_body(trimmed: &str) -> Option<&str> {
    let (opening, rest) = trimmed.split_once('\n')?;
    let tag = opening.strip_prefix("```")?;
    if !tag.trim().eq_ignore_ascii_case("mermaid") {
        return None;
    }
    let body = rest.strip_suffix("```")?;
    // the closing fence sits on its own line
    let body = body.strip_suffix('\n')?;
    let body = body.strip_suffix('\r').unwrap_or(body);
    // a fence in the middle means more than one block
    if body.lines().any(|line| line.trim_start().starts_with("```")) {
        return None;
    }
    Some(body)
}
