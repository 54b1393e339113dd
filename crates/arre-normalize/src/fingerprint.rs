// crates/arre-normalize/src/fingerprint.rs
// ============================================================================
// Module: Fingerprint Derivation
// Description: Stable-hash fallback for alerts whose source payload does not
//              carry its own fingerprint.
// Purpose: Give the dedup window a stable per-instance key even for sources
//          that omit one.
// Dependencies: sha2, arre-core::identifiers
// ============================================================================

//! ## Overview
//! `spec.md` §4.2 specifies the fallback as a stable hash of
//! `source || alert_name || sorted(grouping_labels)`. Labels are sorted by
//! key (the `BTreeMap` on [`arre_core::NormalizedAlert::labels`] already
//! guarantees this) and hashed as `key=value` pairs joined by `&`, which is
//! the convention `AlertSource`-adjacent code elsewhere in the corpus uses
//! for canonical query strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use arre_core::Fingerprint;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Derivation
// ============================================================================

/// Computes the fallback fingerprint for an alert lacking a source-provided
/// one.
#[must_use]
pub fn derive(source: &str, alert_name: &str, grouping_labels: &BTreeMap<String, String>) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(alert_name.as_bytes());
    hasher.update(b"|");
    for (key, value) in grouping_labels {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"&");
    }
    let digest = hasher.finalize();
    Fingerprint::new(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::derive;
    use std::collections::BTreeMap;

    #[test]
    fn is_stable_for_identical_inputs() {
        let mut labels = BTreeMap::new();
        labels.insert("pod".to_string(), "api-7".to_string());
        let a = derive("Grafana", "HighCPUUsage", &labels);
        let b = derive("Grafana", "HighCPUUsage", &labels);
        assert_eq!(a, b);
    }

    #[test]
    fn is_insensitive_to_label_insertion_order() {
        let mut first = BTreeMap::new();
        first.insert("b".to_string(), "2".to_string());
        first.insert("a".to_string(), "1".to_string());

        let mut second = BTreeMap::new();
        second.insert("a".to_string(), "1".to_string());
        second.insert("b".to_string(), "2".to_string());

        assert_eq!(derive("Grafana", "X", &first), derive("Grafana", "X", &second));
    }

    #[test]
    fn differs_across_alert_names() {
        let labels = BTreeMap::new();
        assert_ne!(derive("Grafana", "A", &labels), derive("Grafana", "B", &labels));
    }
}
