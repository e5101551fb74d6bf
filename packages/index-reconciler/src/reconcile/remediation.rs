//! Duplicate-key remediation guidance
//!
//! Promoting an index to unique over data that already collides cannot
//! succeed until the data is cleaned up. For collections whose identity
//! fields are known, the failure message carries a ready-to-run
//! aggregation that lists the offending values.

use crate::domain::IndexSpec;

/// Collections and unique key fields operators are expected to clean up by hand
const KNOWN_UNIQUE_FIELDS: &[(&str, &[&str])] = &[
    ("users", &["email"]),
    ("organizations", &["name_ci"]),
    ("groups", &["organization_id", "name_ci"]),
    ("group_memberships", &["user_id", "group_id"]),
    ("resources", &["title_ci"]),
    ("materials", &["title_ci"]),
    ("pages", &["slug"]),
];

/// Shell aggregation listing values that occur more than once
pub fn duplicate_finder(collection: &str, spec: &IndexSpec) -> Option<String> {
    let fields = spec.fields();
    let known = KNOWN_UNIQUE_FIELDS
        .iter()
        .any(|(coll, known_fields)| *coll == collection && *known_fields == fields.as_slice());
    if !known {
        return None;
    }

    let group_id = match fields.as_slice() {
        [field] => format!("\"${}\"", field),
        many => {
            let parts: Vec<String> = many.iter().map(|f| format!("{}: \"${}\"", f, f)).collect();
            format!("{{ {} }}", parts.join(", "))
        }
    };

    Some(format!(
        "db.{}.aggregate([{{ $group: {{ _id: {}, n: {{ $sum: 1 }} }} }}, {{ $match: {{ n: {{ $gt: 1 }} }} }}])",
        collection, group_id
    ))
}

/// Failure message for a unique build blocked by existing duplicates
pub fn duplicate_key_message(collection: &str, spec: &IndexSpec) -> String {
    let mut message = format!(
        "{}({}): cannot create unique index (duplicates present)",
        collection,
        spec.effective_name()
    );
    if let Some(finder) = duplicate_finder(collection, spec) {
        message.push_str(&format!(
            ". Duplicates exist on {}.{}. Example finder:\n{}",
            collection,
            spec.fields().join("+"),
            finder
        ));
    }
    message
}
