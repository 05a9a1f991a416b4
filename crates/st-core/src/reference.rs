//! Deferred parameter references
//!
//! Property values may carry `%name%` references that the host substitutes
//! right before a build runs. Until then they are accepted unvalidated.
//! `%%` stands for a literal percent sign; a `%` that does not open a
//! well-formed reference is kept as text.

use crate::error::ReferenceError;

/// Prefix of references that read the process environment
pub const ENV_PREFIX: &str = "env.";

enum Segment<'a> {
    Text(&'a str),
    Percent,
    Reference(&'a str),
}

fn is_reference_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ':'))
}

fn segments(value: &str) -> Vec<Segment<'_>> {
    let mut result = Vec::new();
    let mut rest = value;

    while let Some(start) = rest.find('%') {
        if start > 0 {
            result.push(Segment::Text(&rest[..start]));
        }
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(0) => {
                result.push(Segment::Percent);
                rest = &after[1..];
            }
            Some(end) if is_reference_name(&after[..end]) => {
                result.push(Segment::Reference(&after[..end]));
                rest = &after[end + 1..];
            }
            _ => {
                result.push(Segment::Text(&rest[start..start + 1]));
                rest = after;
            }
        }
    }

    if !rest.is_empty() {
        result.push(Segment::Text(rest));
    }
    result
}

/// Whether the value contains at least one unresolved reference
pub fn is_reference(value: &str) -> bool {
    segments(value)
        .iter()
        .any(|segment| matches!(segment, Segment::Reference(_)))
}

/// Substitute every reference in `value` using `lookup`
pub fn resolve_references<F>(value: &str, mut lookup: F) -> Result<String, ReferenceError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut resolved = String::with_capacity(value.len());
    for segment in segments(value) {
        match segment {
            Segment::Text(text) => resolved.push_str(text),
            Segment::Percent => resolved.push('%'),
            Segment::Reference(name) => {
                let replacement =
                    lookup(name).ok_or_else(|| ReferenceError::Unresolved(name.to_string()))?;
                resolved.push_str(&replacement);
            }
        }
    }
    Ok(resolved)
}

/// Look up `env.<VAR>` references in the process environment
pub fn env_lookup(name: &str) -> Option<String> {
    name.strip_prefix(ENV_PREFIX)
        .and_then(|var| std::env::var(var).ok())
}
