//! Message formatting for display.

/// Format a chat message as `<sender> text`.
///
/// Returns `None` for empty or whitespace-only text; such messages are not relayed.
pub fn format_message(sender: &str, text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    Some(format!("<{}> {}", sender, text))
}

/// Format a system notice as `[event] [sender] text`.
///
/// Never suppressed, even for an empty payload.
pub fn format_system_message(event: &str, sender: &str, text: &str) -> String {
    format!("[{}] [{}] {}", event, sender, text)
}
