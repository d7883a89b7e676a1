//! String utility functions.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::errors::InterpolationError;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").unwrap());
static QUOTE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"]+"#).unwrap());
static CAMEL_LOWER_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());
static CAMEL_UPPER_LOWER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap());
static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());
static DUPLICATE_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

const MAX_TOOL_NAME_LENGTH: usize = 64;

/// Sanitize a tool name so that the name an LLM writes after `Action:`
/// can be matched against registered tools.
///
/// Splits camelCase, lowercases, replaces anything outside `a-z0-9` with a
/// single underscore and truncates to 64 characters.
pub fn sanitize_tool_name(name: &str) -> String {
    let ascii_name: String = name.chars().filter(|c| c.is_ascii()).collect();

    let step1 = CAMEL_UPPER_LOWER.replace_all(&ascii_name, "${1}_${2}");
    let step2 = CAMEL_LOWER_UPPER.replace_all(&step1, "${1}_${2}");
    let lowered = step2.to_lowercase();
    let no_quotes = QUOTE_PATTERN.replace_all(&lowered, "");
    let replaced = DISALLOWED_CHARS.replace_all(&no_quotes, "_");
    let collapsed = DUPLICATE_UNDERSCORE.replace_all(&replaced, "_");
    let stripped = collapsed.trim_matches('_').to_string();

    if stripped.len() > MAX_TOOL_NAME_LENGTH {
        stripped[..MAX_TOOL_NAME_LENGTH]
            .trim_end_matches('_')
            .to_string()
    } else {
        stripped
    }
}

/// Interpolate `{variable}` placeholders while leaving JSON-like braces
/// untouched.
///
/// Only `{name}` where `name` starts with a letter or underscore and
/// continues with alphanumerics, `_` or `-` counts as a placeholder.
/// Every placeholder must have a value in `inputs`.
pub fn interpolate_only(
    input: &str,
    inputs: &HashMap<String, String>,
) -> Result<String, InterpolationError> {
    if input.is_empty() || !input.contains('{') {
        return Ok(input.to_string());
    }

    if let Some(missing) = VARIABLE_PATTERN
        .captures_iter(input)
        .map(|cap| cap[1].to_string())
        .find(|var| !inputs.contains_key(var))
    {
        return Err(InterpolationError::MissingVariable(missing));
    }

    // Single pass, so values containing `{...}` are never re-expanded.
    let result = VARIABLE_PATTERN.replace_all(input, |caps: &regex::Captures<'_>| {
        inputs.get(&caps[1]).cloned().unwrap_or_default()
    });

    Ok(result.into_owned())
}
