//! External-id normalization.
//!
//! Real-world identifiers arrive in many spellings: `"US 1234567"`,
//! `"us1234567"`, `"US-1,234,567"`. The registry keys uniqueness on a
//! canonical form so equivalent spellings collide. The same function runs
//! at write time and at lookup time; there is no second code path.

/// Canonicalize an external identifier: keep ASCII alphanumerics only
/// (dropping whitespace and separator punctuation), uppercased.
///
/// Returns an empty string for inputs with no alphanumeric content —
/// callers treat that as an empty field.
#[must_use]
pub fn normalize_external_id(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_whitespace_and_case() {
        assert_eq!(normalize_external_id("US 1234567"), "US1234567");
        assert_eq!(normalize_external_id("us1234567"), "US1234567");
        assert_eq!(normalize_external_id("  uS 12 34 567  "), "US1234567");
    }

    #[test]
    fn strips_separators() {
        assert_eq!(normalize_external_id("US-1,234.567"), "US1234567");
        assert_eq!(normalize_external_id("EP/0123456#B1"), "EP0123456B1");
    }

    #[test]
    fn equivalent_spellings_collide() {
        let variants = ["US 1234567", "us1234567", "US-1234567", "u s 1 2 3 4 5 6 7"];
        let normalized: Vec<String> = variants.iter().map(|v| normalize_external_id(v)).collect();
        assert!(normalized.iter().all(|n| n == "US1234567"));
    }

    #[test]
    fn distinct_ids_stay_distinct() {
        assert_ne!(
            normalize_external_id("US 1234567"),
            normalize_external_id("US 1234568")
        );
    }

    #[test]
    fn degenerate_input_normalizes_empty() {
        assert_eq!(normalize_external_id(""), "");
        assert_eq!(normalize_external_id(" -,. / "), "");
    }

    #[test]
    fn idempotent() {
        let once = normalize_external_id("us 1234567");
        assert_eq!(normalize_external_id(&once), once);
    }
}
