//! Raw OCR string sanitization

use crate::fields::{CompositeSpec, FieldSpec};

/// Turn one raw OCR string into a string conforming to the field's kind.
///
/// Never fails: an empty result means nothing usable was extracted.
pub fn sanitize(spec: &FieldSpec, raw: Option<&str>) -> String {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return String::new(),
    };

    match spec {
        FieldSpec::Composite(composite) => extract_composite(composite, raw),
        FieldSpec::Text(_) => raw.to_string(),
        FieldSpec::Integer(numeric) => raw
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(numeric.max_length)
            .collect(),
        FieldSpec::Float(float) => raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .take(float.numeric.max_length + 1)
            .collect(),
    }
}

fn extract_composite(spec: &CompositeSpec, raw: &str) -> String {
    let Some(captures) = spec.pattern.regex().captures(raw) else {
        return String::new();
    };

    match &spec.rewrite {
        Some(template) => {
            let mut rewritten = String::new();
            captures.expand(template, &mut rewritten);
            // the match is anchored at the start, keep whatever follows it
            let end = captures.get(0).map_or(0, |m| m.end());
            rewritten.push_str(&raw[end..]);
            rewritten
        }
        None => captures
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .collect(),
    }
}
