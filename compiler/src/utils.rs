/// Quote `text` the way it would appear in a JSON document, for use in
/// error messages.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}
