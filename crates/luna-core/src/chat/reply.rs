/// Shown when the completion service answers without any content.
pub const FALLBACK_REPLY: &str = "I'm sorry — I couldn't generate a response.";

/// Assistant text as it goes into the chat log: the fallback when the
/// service gave nothing, with every literal `~~` removed.
pub fn sanitize_reply(content: Option<String>) -> String {
    content
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
        .replace("~~", "")
}

/// Condense a provider error (`status 401 Unauthorized: {"error":{...}}`) to
/// something readable in a chat bubble.
pub fn extract_api_error(raw: &str) -> String {
    if let Some(start) = raw.find('[').or_else(|| raw.find('{')) {
        let json_str = &raw[start..];
        if let Ok(v) = json_str.parse::<serde_json::Value>() {
            // Some gateways wrap the error object in an array.
            let obj: serde_json::Value = if v.is_array() { v[0].clone() } else { v };
            if let Some(msg) = obj["error"]["message"].as_str() {
                let trimmed: &str = msg.split(". Please refer to").next().unwrap_or(msg).trim();
                return format!("API error: {}", trimmed);
            }
        }
    }
    if let Some(pos) = raw.find("status ") {
        return raw[pos..].to_string();
    }
    raw.to_string()
}
