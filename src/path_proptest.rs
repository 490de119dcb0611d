//! Property-based tests for path manipulation and placeholder escaping.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{encode_path_segment, normalize_relative, resolve_within};
    use crate::template::render::{escape_literal, render_with};
    use proptest::prelude::*;
    use std::path::{Component, Path};

    // ============================================================================
    // encode_path_segment property tests
    // ============================================================================

    proptest! {
        /// Property: encode_path_segment never produces separators or reserved names
        #[test]
        fn encode_path_segment_is_a_single_safe_segment(input in ".*") {
            let result = encode_path_segment(&input);
            let unsafe_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
            for ch in unsafe_chars {
                prop_assert!(!result.contains(ch));
            }
            prop_assert!(!result.is_empty());
            prop_assert!(result != "." && result != "..");
        }

        /// Property: encode_path_segment preserves alphanumeric names
        #[test]
        fn encode_path_segment_preserves_alphanumeric(input in "[a-zA-Z0-9]+") {
            prop_assert_eq!(encode_path_segment(&input), input);
        }
    }

    // ============================================================================
    // normalize_relative property tests
    // ============================================================================

    proptest! {
        /// Property: a normalized path never contains `.` or `..` components
        #[test]
        fn normalize_relative_output_is_clean(segments in prop::collection::vec(
            prop_oneof![Just("..".to_string()), Just(".".to_string()), "[a-z]{1,6}"], 0..8)
        ) {
            let joined = segments.join("/");
            if let Some(normalized) = normalize_relative(Path::new(&joined)) {
                for component in normalized.components() {
                    prop_assert!(matches!(component, Component::Normal(_)));
                }
            }
        }

        /// Property: resolve_within either fails or stays under the root
        #[test]
        fn resolve_within_never_escapes(segments in prop::collection::vec(
            prop_oneof![Just("..".to_string()), "[a-z]{1,6}"], 1..8)
        ) {
            let root = Path::new("/srv/target");
            let joined = segments.join("/");
            if let Ok(resolved) = resolve_within(root, Path::new(&joined)) {
                prop_assert!(resolved.starts_with(root));
            }
        }
    }

    // ============================================================================
    // placeholder escaping property tests
    // ============================================================================

    proptest! {
        /// Property: rendering an escaped literal with no variables reproduces it exactly
        #[test]
        fn escaped_text_renders_back_to_itself(input in ".*") {
            let escaped = escape_literal(&input);
            let rendered = render_with(&escaped, |_| None).unwrap();
            prop_assert_eq!(rendered, input);
        }
    }
}
