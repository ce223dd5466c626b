//! Candidate Resolver
//!
//! Reduces the candidate readings proposed for one field in one frame to at
//! most one trustworthy value. Steps run in a fixed order:
//!
//! 1. keep only digits, `.`, `:` and `/`, drop empty candidates
//! 2. apply the field's decimal repair
//! 3. drop out-of-range candidates, substituting the field's cached value
//!    when the candidate is a fragment of it
//! 4. collapse candidates that are substrings of another one
//! 5. drop candidates equal to another field's cached value
//! 6. exactly one survivor that passes validation is valid

use tracing::{debug, info};

use super::cache::MonitorState;
use super::diagnostics::{CleanDiagnostics, Overlap};
use crate::fields::{Bounds, CompositeSpec, FieldRegistry, FieldSpec, Repair};

/// Why a field produced no value this frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing usable survived filtering
    NoCandidates,
    /// More than one candidate survived
    Ambiguous(Vec<String>),
    /// The single survivor is not a valid `a/b` pair
    CompositeParseFailure(String),
    /// The single survivor is outside the field's hard range
    RangeViolation(String),
}

/// Outcome of resolving one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Valid(String),
    Rejected(Rejection),
}

impl Resolution {
    pub fn value(&self) -> Option<&str> {
        match self {
            Resolution::Valid(value) => Some(value),
            Resolution::Rejected(_) => None,
        }
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            Resolution::Valid(value) => Some(value),
            Resolution::Rejected(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Resolution::Valid(_))
    }
}

/// Resolve the candidates of `field`.
///
/// `spec` is the field's registry entry, if any; `registry` supplies the
/// sub-field ranges of composite fields. `state` is read for the field's own
/// cached value and for every other field's cached value.
pub fn resolve_candidates<'c>(
    field: &str,
    spec: Option<&FieldSpec>,
    registry: &FieldRegistry,
    candidates: impl IntoIterator<Item = &'c str>,
    state: &MonitorState,
    diagnostics: &mut CleanDiagnostics,
) -> Resolution {
    let repair = spec.map(FieldSpec::repair).unwrap_or_default();

    let values = unique(
        candidates
            .into_iter()
            .map(strip_noise)
            .filter(|v| !v.is_empty()),
    );

    let values = match repair {
        Repair::ImpliedDecimal { low, high } => {
            unique(values.iter().map(|v| imply_decimal(v, low, high)))
        }
        Repair::CollapseDecimal | Repair::MergeDecimal => collapse_decimal(values),
    };
    // repair can strip a candidate down to nothing
    let values: Vec<String> = values.into_iter().filter(|v| !v.is_empty()).collect();

    let values = filter_ranges(field, spec, registry, values, state);
    let values = reduce_substrings(values, repair == Repair::MergeDecimal);
    let mut values = remove_overlaps(field, values, state, diagnostics);

    let resolution = match values.len() {
        0 => Resolution::Rejected(Rejection::NoCandidates),
        1 => {
            let value = values.remove(0);
            if is_within_range(spec, registry, &value) {
                Resolution::Valid(value)
            } else if matches!(spec, Some(FieldSpec::Composite(_))) {
                Resolution::Rejected(Rejection::CompositeParseFailure(value))
            } else {
                Resolution::Rejected(Rejection::RangeViolation(value))
            }
        }
        _ => Resolution::Rejected(Rejection::Ambiguous(values)),
    };

    debug!("Resolved {}: {:?}", field, resolution);
    resolution
}

/// Deduplicate, keeping first-seen order
fn unique(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        push_unique(&mut out, value);
    }
    out
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn strip_noise(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ':' | '/'))
        .collect()
}

/// `372` -> `37.2` when the dotless value lies strictly between `low` and `high`
fn imply_decimal(value: &str, low: u32, high: u32) -> String {
    let value: String = value.chars().filter(|c| !matches!(c, ':' | '/')).collect();
    if value.contains('.') {
        return value;
    }
    match value.parse::<u64>() {
        Ok(n) if n > u64::from(low) && n < u64::from(high) => {
            format!("{}.{}", &value[..value.len().min(2)], &value[value.len() - 1..])
        }
        _ => value,
    }
}

/// `[48, 4.8]` -> `[4.8]`: when all candidates are the same digits, prefer the dotted ones
fn collapse_decimal(values: Vec<String>) -> Vec<String> {
    let any_dotted = values.iter().any(|v| v.contains('.'));
    let bare = unique(values.iter().map(|v| v.replace('.', "")));
    if any_dotted && bare.len() == 1 {
        values.into_iter().filter(|v| v.contains('.')).collect()
    } else {
        values
    }
}

fn filter_ranges(
    field: &str,
    spec: Option<&FieldSpec>,
    registry: &FieldRegistry,
    values: Vec<String>,
    state: &MonitorState,
) -> Vec<String> {
    let cached = state.last_valid_value(field);
    let mut kept = Vec::new();
    for value in values.into_iter().filter(|v| !v.is_empty()) {
        if is_within_range(spec, registry, &value) {
            push_unique(&mut kept, value);
        } else if let Some(cached) = cached.filter(|c| c.contains(value.as_str())) {
            debug!("{}: out-of-range {:?} is part of cached {:?}", field, value, cached);
            push_unique(&mut kept, cached.to_string());
        } else {
            debug!("{}: dropping out-of-range candidate {:?}", field, value);
        }
    }
    kept
}

fn is_within_range(spec: Option<&FieldSpec>, registry: &FieldRegistry, value: &str) -> bool {
    match spec {
        Some(FieldSpec::Composite(composite)) => is_valid_composite(composite, registry, value),
        Some(spec) => spec.valid_range().accepts(value),
        None => Bounds::any().accepts(value),
    }
}

/// Both sides of `a/b` must pass their sub-field's hard range
fn is_valid_composite(spec: &CompositeSpec, registry: &FieldRegistry, value: &str) -> bool {
    let mut parts = value.split('/');
    let (Some(left), Some(right), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    let range_of = |name: Option<&str>| {
        name.and_then(|n| registry.lookup(n))
            .map(FieldSpec::valid_range)
            .unwrap_or_default()
    };
    let split = spec.split_into.as_ref();
    range_of(split.map(|s| s.systolic.as_str())).accepts(left)
        && range_of(split.map(|s| s.diastolic.as_str())).accepts(right)
}

/// `[48, 8]` -> `[48]`. With `merge_decimal`, a dotted fragment re-inserts its
/// point into the longer reading (`[45, .5]` -> `[4.5]`). Several parents
/// collapse to the longest one, first seen on ties.
fn reduce_substrings(values: Vec<String>, merge_decimal: bool) -> Vec<String> {
    let mut parents: Vec<String> = Vec::new();
    let mut found = false;

    for (i, value) in values.iter().enumerate() {
        let bare = value.replace('.', "");
        for (j, other) in values.iter().enumerate() {
            if i == j {
                continue;
            }
            if other.contains(value.as_str()) {
                push_unique(&mut parents, other.clone());
                found = true;
            } else if merge_decimal && other.contains(bare.as_str()) {
                push_unique(&mut parents, other.replace(&bare, value));
                found = true;
            }
        }
    }

    if !found {
        return values;
    }
    if parents.len() > 1 {
        let mut longest = 0;
        for (idx, parent) in parents.iter().enumerate() {
            if parent.len() > parents[longest].len() {
                longest = idx;
            }
        }
        parents = vec![parents.swap_remove(longest)];
    }
    parents
}

fn remove_overlaps(
    field: &str,
    values: Vec<String>,
    state: &MonitorState,
    diagnostics: &mut CleanDiagnostics,
) -> Vec<String> {
    let mut survivors = Vec::new();
    for value in values {
        let mut overlapped = false;
        for (other, cached) in state.other_values(field) {
            if cached == value {
                info!("Found overlap in {}:{} with previous {}:{}", field, value, other, cached);
                diagnostics.record_overlap(Overlap {
                    field: field.to_string(),
                    value: value.clone(),
                    colliding_field: other.to_string(),
                });
                overlapped = true;
            }
        }
        if !overlapped {
            push_unique(&mut survivors, value);
        }
    }
    survivors
}
