//! Probe template rendering.
//!
//! Templates carry `%option-name%` tokens. Rendering replaces every token
//! whose key appears in the option set with the HTML-entity-escaped value;
//! tokens without a matching option are left verbatim so missing-option
//! mistakes stay visible in the deployed script rather than vanishing
//! silently. Escaping matches what the remote PHP side expects for values
//! embedded inside single-quoted string literals.

use super::OptionSet;

/// Substitutes option values into a template body.
///
/// Pure string transformation; performs no I/O. Substitution order follows
/// the option set's key order, which is deterministic.
#[must_use]
pub fn render(template: &str, options: &OptionSet) -> String {
    let mut body = template.to_owned();
    for (key, value) in options.iter() {
        let token = format!("%{key}%");
        body = body.replace(&token, &escape_entities(value));
    }
    body
}

/// Escapes the HTML-significant characters `&`, `<`, `>`, `"`, and `'`.
#[must_use]
pub fn escape_entities(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}
