//! Metadata bundle value type and content fingerprinting.
//!
//! A bundle is the flat set of optional fields the extraction pipeline
//! produces for a document. Bundles are compared by a canonical JSON
//! serialization (all keys present, sorted, compact separators); the
//! SHA-256 of those canonical bytes is the bundle's fingerprint and the
//! basis of duplicate-payload detection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Names of every bundle field, in canonical (sorted) order.
pub const BUNDLE_FIELDS: [&str; 10] = [
    "call_date",
    "company_name",
    "company_register",
    "document_type",
    "parent_company",
    "register_number",
    "reporting_date",
    "reporting_year",
    "tags",
    "ultimate_parent_company",
];

/// Extracted/candidate metadata for one document. All fields optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataBundle {
    /// Type of document, e.g. "Annual Report".
    pub document_type: Option<String>,
    /// Name of the company the document belongs to.
    pub company_name: Option<String>,
    /// Direct parent company.
    pub parent_company: Option<String>,
    /// Ultimate parent at the top of the hierarchy.
    pub ultimate_parent_company: Option<String>,
    /// Date the report was generated.
    pub reporting_date: Option<NaiveDate>,
    /// Reporting year, e.g. 2024.
    pub reporting_year: Option<i32>,
    /// Date the document was received.
    pub call_date: Option<NaiveDate>,
    /// Company register the document originates from.
    pub company_register: Option<String>,
    /// Register number within that register.
    pub register_number: Option<String>,
    /// Free-form short tags.
    pub tags: Option<Vec<String>>,
}

impl MetadataBundle {
    /// Canonical serialization: every field present (nulls included), keys
    /// sorted, no extraneous whitespace.
    ///
    /// Round-tripping through `serde_json::Value` sorts the keys, since the
    /// default `Map` is backed by a `BTreeMap`.
    pub fn canonical_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string(&value)?)
    }

    /// Content fingerprint: SHA-256 over the canonical bytes, hex-encoded.
    ///
    /// Pure function of the field values; two bundles with identical fields
    /// (including identical absent fields) always fingerprint identically.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = self.canonical_json()?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Names of all non-null fields, in canonical order.
    ///
    /// Intake uses this to derive the implicit locked-field set from a
    /// caller's seed bundle.
    pub fn populated_fields(&self) -> Vec<String> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True when every field is absent.
    pub fn is_empty(&self) -> bool {
        self.populated_fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetadataBundle {
        MetadataBundle {
            document_type: Some("Annual Report".to_string()),
            company_name: Some("ACME AG".to_string()),
            reporting_year: Some(2024),
            reporting_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            tags: Some(vec!["finance".to_string(), "annual".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_fingerprint_changes_with_any_field() {
        let a = sample();
        let mut b = sample();
        b.company_name = Some("Other Co".to_string());
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let mut c = sample();
        c.reporting_year = None;
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn test_empty_bundles_share_fingerprint() {
        let a = MetadataBundle::default();
        let b = MetadataBundle::default();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_canonical_json_sorted_and_complete() {
        let canonical = sample().canonical_json().unwrap();
        // Keys appear in sorted order and nulls are present.
        let call = canonical.find("\"call_date\"").unwrap();
        let company = canonical.find("\"company_name\"").unwrap();
        let ultimate = canonical.find("\"ultimate_parent_company\"").unwrap();
        assert!(call < company && company < ultimate);
        assert!(canonical.contains("\"call_date\":null"));
        assert!(!canonical.contains(": "));
    }

    #[test]
    fn test_canonical_field_count_matches_constant() {
        let value = serde_json::to_value(MetadataBundle::default()).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), BUNDLE_FIELDS.len());
        for name in BUNDLE_FIELDS {
            assert!(map.contains_key(name), "missing field {}", name);
        }
    }

    #[test]
    fn test_serde_round_trip_lossless() {
        let bundle = sample();
        let json = serde_json::to_string(&bundle).unwrap();
        let back: MetadataBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(bundle, back);
    }

    #[test]
    fn test_date_round_trip() {
        let mut bundle = MetadataBundle::default();
        bundle.call_date = NaiveDate::from_ymd_opt(2023, 2, 28);
        let json = serde_json::to_string(&bundle).unwrap();
        assert!(json.contains("2023-02-28"));
        let back: MetadataBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(back.call_date, bundle.call_date);
    }

    #[test]
    fn test_populated_fields() {
        let bundle = MetadataBundle {
            company_name: Some("ACME AG".to_string()),
            reporting_year: Some(2024),
            ..Default::default()
        };
        assert_eq!(bundle.populated_fields(), vec!["company_name", "reporting_year"]);
    }

    #[test]
    fn test_populated_fields_empty() {
        assert!(MetadataBundle::default().populated_fields().is_empty());
        assert!(MetadataBundle::default().is_empty());
    }

    #[test]
    fn test_seed_only_company_name_locks_only_company_name() {
        let bundle = MetadataBundle {
            company_name: Some("ACME AG".to_string()),
            ..Default::default()
        };
        assert_eq!(bundle.populated_fields(), vec!["company_name"]);
    }
}
