//! Property-based tests for path handling and rewrite rules.
//!
//! These use proptest to check invariants over generated inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::manifest::RewriteRule;
    use crate::path::{checked_relative, lexical_join, regex_rename};
    use proptest::prelude::*;
    use regex::Regex;
    use std::path::{Component, Path};

    // ============================================================================
    // checked_relative / lexical_join
    // ============================================================================

    proptest! {
        /// An accepted manifest path is relative and never climbs
        #[test]
        fn checked_relative_output_stays_inside(raw in "[a-z./]{1,30}") {
            if let Ok(path) = checked_relative(&raw) {
                prop_assert!(path.is_relative());
                prop_assert!(path
                    .components()
                    .all(|c| matches!(c, Component::Normal(_))));
            }
        }

        /// Paths with a `..` component are always rejected
        #[test]
        fn checked_relative_rejects_parent(prefix in "[a-z]{1,8}", suffix in "[a-z]{1,8}") {
            let raw = format!("{}/../{}", prefix, suffix);
            prop_assert!(checked_relative(&raw).is_err());
        }

        /// Lexical joins contain only normal components
        #[test]
        fn lexical_join_is_normalized(dir in "[a-z]{1,6}(/[a-z]{1,6}){0,3}", entry in "[a-z.]{1,6}(/[a-z.]{1,6}){0,3}") {
            if let Some(joined) = lexical_join(Path::new(&dir), &entry) {
                prop_assert!(joined
                    .components()
                    .all(|c| matches!(c, Component::Normal(_))));
            }
        }

        /// A relocation that captures the whole path and substitutes it is the identity
        #[test]
        fn regex_rename_whole_capture_is_identity(path in "[a-z_]{1,10}(/[a-z_]{1,10}){0,3}\\.[ch]") {
            let regex = Regex::new(r"^(.*)$").unwrap();
            prop_assert_eq!(regex_rename(&regex, "$1", &path), Some(path.clone()));
        }
    }

    // ============================================================================
    // Rewrite rule idempotence
    // ============================================================================

    fn source_text() -> impl Strategy<Value = String> {
        let chunk = prop_oneof![
            Just("#include \"sway/tree/scene.h\"\n".to_string()),
            Just("#include \"sway/tree/scene/color.h\"\n".to_string()),
            Just("#include \"sway/tree/view.h\"\n".to_string()),
            Just("#include <wlr/types/wlr_scene.h>\n".to_string()),
            "[a-z_ ;(){}]{0,16}\n",
        ];
        prop::collection::vec(chunk, 0..20).prop_map(|chunks| chunks.concat())
    }

    fn rules() -> Vec<RewriteRule> {
        vec![
            RewriteRule::literal(
                "#include \"sway/tree/scene.h\"",
                "#include <scene-scroll/scene.h>",
            )
            .unwrap(),
            RewriteRule::pattern(
                r#"#include "sway/tree/scene/(\w+)\.h""#,
                "#include <scene-scroll/$1.h>",
            )
            .unwrap(),
        ]
    }

    fn apply_all(rules: &[RewriteRule], text: &str) -> (String, usize) {
        let mut text = text.to_string();
        let mut total = 0;
        for rule in rules {
            let (next, matches) = rule.apply(&text);
            text = next.into_owned();
            total += matches;
        }
        (text, total)
    }

    proptest! {
        /// A second pass over rewritten text changes nothing and counts nothing
        #[test]
        fn rewrite_rules_are_idempotent(text in source_text()) {
            let rules = rules();
            let (once, _) = apply_all(&rules, &text);
            let (twice, matches) = apply_all(&rules, &once);

            prop_assert_eq!(&twice, &once);
            prop_assert_eq!(matches, 0);
        }

        /// Text the rules do not target passes through untouched
        #[test]
        fn rewrite_rules_leave_other_includes_alone(body in "[a-z_ ;]{0,40}") {
            let text = format!("#include \"sway/tree/view.h\"\n{}\n", body);
            let (out, matches) = apply_all(&rules(), &text);

            prop_assert_eq!(out, text);
            prop_assert_eq!(matches, 0);
        }
    }
}
