//! Cache key derivation.
//!
//! Keys are readable composites rather than hashes so the diagnostics
//! surface can pattern-match on them.

/// Key for a whole-table snapshot.
///
/// A present, unexpired entry under this key is always a verbatim table
/// fetch result; filtered subsets are never stored here.
pub fn table_key(schema: &str, table: &str) -> String {
    format!("{schema}.{table}:ALL_DATA")
}

/// Key for a row-scoped point lookup.
pub fn row_key(schema: &str, table: &str, id: &str) -> String {
    format!("{schema}.{table}:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_key_format() {
        assert_eq!(
            table_key("prompt_info", "activity_prompts"),
            "prompt_info.activity_prompts:ALL_DATA"
        );
    }

    #[test]
    fn test_row_key_format() {
        assert_eq!(row_key("prompt_info", "activity_prompts", "5"), "prompt_info.activity_prompts:5");
    }

    #[test]
    fn test_keys_deterministic() {
        assert_eq!(table_key("s", "t"), table_key("s", "t"));
        assert_ne!(table_key("s", "t"), row_key("s", "t", "1"));
    }
}
