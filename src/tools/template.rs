//! Flat token substitution for tool templates.
//!
//! Two token forms are recognized:
//! - `{{args.KEY}}` resolves against the call-time arguments object
//! - `{{secrets.KEY}}` resolves against the process-wide secrets map
//!
//! There is no expression language. Tokens whose key is absent stay verbatim
//! in the output and rendering never fails. Substituted values are not
//! rescanned, so an argument cannot smuggle in a `{{secrets.*}}` token.

use serde_json::Value;
use std::collections::HashMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const ARGS_PREFIX: &str = "args.";
const SECRETS_PREFIX: &str = "secrets.";

/// Render `template` against call-time `args` and `secrets`.
pub fn render(template: &str, args: &Value, secrets: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let resolved = after_open.find(CLOSE).and_then(|end| {
            resolve(&after_open[..end], args, secrets).map(|value| (value, end))
        });

        match resolved {
            Some((value, end)) => {
                out.push_str(&value);
                rest = &after_open[end + CLOSE.len()..];
            }
            None => {
                // Emit one brace and keep scanning so `{{{{args.x}}` still
                // resolves its inner token.
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn resolve(token: &str, args: &Value, secrets: &HashMap<String, String>) -> Option<String> {
    if let Some(key) = token.strip_prefix(ARGS_PREFIX) {
        return args.as_object()?.get(key).map(value_text);
    }
    if let Some(key) = token.strip_prefix(SECRETS_PREFIX) {
        return secrets.get(key).cloned();
    }
    None
}

/// Text form of a JSON value: strings verbatim, everything else canonical JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
