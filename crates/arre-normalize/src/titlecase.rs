// crates/arre-normalize/src/titlecase.rs
// ============================================================================
// Module: Source Name Canonicalization
// Description: Generic uppercase-first/lowercase-rest fold.
// Purpose: Available for single-capital names (`grafana` -> `Grafana`); the
//          canonical multi-capital names (`CloudWatch`) bypass this fold
//          entirely and come straight from `DetectedFormat::source_name`.
// Dependencies: none
// ============================================================================

/// Upper-cases the first character of `value` and lower-cases the rest.
///
/// # Invariants
/// - Operates on Unicode scalar values; non-ASCII input is folded using
///   `char::to_uppercase`/`to_lowercase`, not an ASCII-only shortcut.
#[must_use]
pub fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::title_case;

    #[test]
    fn folds_lowercase_source_names() {
        assert_eq!(title_case("grafana"), "Grafana");
        assert_eq!(title_case("pagerduty"), "Pagerduty");
    }

    #[test]
    fn does_not_preserve_embedded_capitals() {
        // CloudWatch's canonical name never flows through this fold for
        // exactly this reason: it would come out as "Cloudwatch".
        assert_eq!(title_case("CLOUDWATCH"), "Cloudwatch");
    }

    #[test]
    fn leaves_already_titlecased_input_unchanged() {
        assert_eq!(title_case("Datadog"), "Datadog");
    }

    #[test]
    fn handles_empty_input() {
        assert_eq!(title_case(""), "");
    }
}
