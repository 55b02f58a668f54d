//! Honeypot spam classification.

use crate::storage::Fields;

/// Hidden field that humans leave empty.
pub const HONEYPOT_FIELD: &str = "_gotcha";

/// Prefix reserved for control fields; such keys are never stored.
pub const INTERNAL_PREFIX: char = '_';

/// Result of classifying a submission's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub fields: Fields,
    pub is_spam: bool,
}

/// Apply the honeypot rule and strip internal fields.
pub fn classify(mut fields: Fields) -> Classified {
    let is_spam = fields
        .remove(HONEYPOT_FIELD)
        .map(|value| value.is_truthy())
        .unwrap_or(false);

    fields.retain(|key, _| !key.starts_with(INTERNAL_PREFIX));

    Classified { fields, is_spam }
}
