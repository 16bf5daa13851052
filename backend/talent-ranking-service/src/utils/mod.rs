// Utility functions for talent-ranking-service

use serde_json::Value;

/// Clamp a raw score to the `[0, 100]` range
pub fn clamp_score(score: i64) -> u32 {
    score.clamp(0, 100) as u32
}

/// Read a score the collaborator may have sent as an integer, a float or a
/// numeric string. Floats are truncated toward zero.
pub fn coerce_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

/// Truncate `text` to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Fill `{key}` placeholders in a prompt template in a single pass.
///
/// Substituted values are never rescanned, so braces inside a job description
/// or a candidate name stay literal. Unknown placeholders are left as-is.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let key_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let key = &after[..key_len];

        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) if after[key_len..].starts_with('}') => {
                out.push_str(value);
                rest = &after[key_len + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
