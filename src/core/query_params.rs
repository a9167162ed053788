use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use quill::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/blogs/mine?user_id=abc&days=7");
/// assert_eq!(params.get("user_id"), Some(&"abc".to_string()));
/// assert_eq!(params.get("days"), Some(&"7".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some((_, query)) = uri.split_once('?') {
        for param in query.split('&').filter(|p| !p.is_empty()) {
            match param.split_once('=') {
                Some((key, encoded_value)) => {
                    let decoded = urlencoding::decode(encoded_value)
                        .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                        .to_string();
                    params.insert(key.to_string(), decoded);
                }
                // Flag parameter without value
                None => {
                    params.insert(param.to_string(), String::new());
                }
            }
        }
    }

    params
}

/// Non-empty string parameter.
pub fn get_string(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|s| !s.is_empty()).cloned()
}

/// Positive integer parameter with a default for missing or invalid values.
pub fn get_positive_int(params: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    params
        .get(key)
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_values_and_flags() {
        let params = parse_query_params("/x?name=a%20b&flag&empty=");
        assert_eq!(params.get("name").map(String::as_str), Some("a b"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
        assert_eq!(get_string(&params, "empty"), None);
    }

    #[test]
    fn positive_int_falls_back() {
        let params = parse_query_params("/x?days=7&bad=-1&junk=z");
        assert_eq!(get_positive_int(&params, "days", 2), 7);
        assert_eq!(get_positive_int(&params, "bad", 2), 2);
        assert_eq!(get_positive_int(&params, "junk", 2), 2);
        assert_eq!(get_positive_int(&params, "missing", 2), 2);
    }
}
