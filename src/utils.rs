//! Utility functions and helpers.

/// Truncates text to a maximum length in characters, adding ellipsis if needed.
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let mut truncated = text.chars().take(max_length).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

/// Formats a currency amount with two decimals.
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Creates a unique identifier for sessions and temporary files.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short, stable, file-name-safe fingerprint of an arbitrary key.
pub fn fingerprint(key: &str) -> String {
    blake3::hash(key.as_bytes()).to_hex()[..16].to_string()
}

/// Joins items as "a, b and c".
pub fn human_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}
