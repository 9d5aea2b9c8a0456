//! Company-name → filename component.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest sanitized name, in characters.
pub const MAX_FILENAME_LEN: usize = 140;

/// Returned when nothing usable is left of the input.
pub const UNKNOWN_NAME: &str = "unknown";

const EDGE_CHARS: &[char] = &['.', '_', '-'];

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("unsafe-char pattern is valid"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static UNDERSCORE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("underscore pattern is valid"));

/// Make a company name safe to embed in a filename.
///
/// Total (never fails, never returns an empty string) and idempotent. The
/// result has no whitespace, no `&`, none of `\ / : * ? " < > |`, no repeated
/// `_`, and does not start or end with `.`, `_` or `-`.
pub fn sanitize_filename(value: &str) -> String {
    let unescaped = html_escape::decode_html_entities(value);
    let cleaned = unescaped.trim().replace('&', "and");
    let cleaned = UNSAFE_CHARS.replace_all(&cleaned, "-");
    let cleaned = WHITESPACE_RUN.replace_all(&cleaned, " ").replace(' ', "_");
    let cleaned = UNDERSCORE_RUN.replace_all(&cleaned, "_");

    // Truncation can expose a trailing edge char, so trim again after it.
    let truncated: String = cleaned
        .trim_matches(EDGE_CHARS)
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect();
    let result = truncated.trim_matches(EDGE_CHARS);

    if result.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        result.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_replacements() {
        assert_eq!(sanitize_filename("ACME/Corp & Co"), "ACME-Corp_and_Co");
    }

    #[test]
    fn html_entities_are_decoded_first() {
        assert_eq!(
            sanitize_filename("Ayala Land &amp; Sons, Inc."),
            "Ayala_Land_and_Sons,_Inc"
        );
    }

    #[test]
    fn whitespace_and_underscores_collapse() {
        assert_eq!(sanitize_filename("  Banco \t de\n\nOro  "), "Banco_de_Oro");
        assert_eq!(sanitize_filename("a __ b"), "a_b");
    }

    #[test]
    fn edges_are_trimmed() {
        assert_eq!(sanitize_filename("._-Name-_."), "Name");
        assert_eq!(sanitize_filename("\"quoted\""), "quoted");
    }

    #[test]
    fn empty_and_degenerate_inputs_become_unknown() {
        assert_eq!(sanitize_filename(""), UNKNOWN_NAME);
        assert_eq!(sanitize_filename("   "), UNKNOWN_NAME);
        assert_eq!(sanitize_filename("???"), UNKNOWN_NAME);
        assert_eq!(sanitize_filename("._-"), UNKNOWN_NAME);
    }

    #[test]
    fn long_names_are_truncated_without_trailing_separator() {
        let name = format!("{}_{}", "a".repeat(139), "b".repeat(10));
        let out = sanitize_filename(&name);
        assert_eq!(out, "a".repeat(139));
        assert_eq!(sanitize_filename(&out), out);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let name = "é".repeat(200);
        assert_eq!(sanitize_filename(&name).chars().count(), MAX_FILENAME_LEN);
    }

    #[test]
    fn double_escaped_ampersand_is_stable() {
        let once = sanitize_filename("A &amp;amp; B");
        assert_eq!(once, "A_andamp;_B");
        assert_eq!(sanitize_filename(&once), once);
    }
}
