//! Text normalization for model output — strips markdown residue and splits
//! the result into sentence-sized chat bubbles.

use std::sync::LazyLock;

use regex::Regex;

static BOLD: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\*([^*]+)\*\*"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| compile(r"\*([^*]+)\*"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"`([^`]+)`"));
static BULLET_PREFIX: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^\s*[-*•]\s+"));
static ORDINAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^\s*\d+\.\s+"));
static HORIZONTAL_SPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"[ \t]+"));
static NEWLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s*\n\s*"));

/// Terminal punctuation, whitespace, then an uppercase ASCII letter or digit.
static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| compile(r"[.!?]\s+[A-Z0-9]"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern is valid")
}

/// One rewrite pass over the text.
fn sanitize_pass(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = BULLET_PREFIX.replace_all(&text, "");
    let text = ORDINAL_PREFIX.replace_all(&text, "");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = NEWLINE_SPACE.replace_all(&text, "\n");
    text.trim().to_string()
}

/// Removes emphasis/code markers (keeping their text), list prefixes and
/// redundant whitespace.
///
/// A single pass is not idempotent on nested input such as `- - item` or
/// `***x***`, so passes repeat until the text stops changing. Every pass that
/// changes the text either shortens it or replaces a tab with a space, so the
/// loop terminates.
pub fn sanitize(text: &str) -> String {
    let mut current = sanitize_pass(text);
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Appends `.` unless the trimmed sentence already ends in `.`, `!` or `?`.
pub fn ensure_terminal(sentence: &str) -> String {
    let trimmed = sentence.trim();
    if trimmed.is_empty() || trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

/// Sanitizes `text` and splits it into terminal-punctuated sentence units.
///
/// The boundary heuristic does not know about abbreviations: `Dr. Smith`
/// splits after `Dr.` because a capital letter follows.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let sanitized = sanitize(text);
    let mut units = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(&sanitized) {
        // Punctuation and the following letter/digit are both single-byte ASCII.
        push_unit(&mut units, &sanitized[start..boundary.start() + 1]);
        start = boundary.end() - 1;
    }
    push_unit(&mut units, &sanitized[start..]);

    if units.is_empty() && !sanitized.is_empty() {
        units.push(ensure_terminal(&sanitized));
    }
    units
}

fn push_unit(units: &mut Vec<String>, raw: &str) {
    let unit = ensure_terminal(raw);
    if !unit.is_empty() {
        units.push(unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRICKY_INPUTS: &[&str] = &[
        "",
        "   ",
        "**Bold** and *italic* and `code`.",
        "***both***",
        "****",
        "- - nested bullet",
        "1. 2. double ordinal",
        "* * star bullets\n  - dash\n• dot",
        "Tabs\t\there   and  spaces",
        "Lines\n\n\n   spaced \t\n out",
        "**unclosed bold and `unclosed code",
        "*a* *b* **c** `d`",
        "  \t\n  ",
        "3.\t Step three\n 10. Step ten",
        "Mixed **`code in bold`** *and **nested** here*",
    ];

    #[test]
    fn test_sanitize_strips_emphasis_and_code() {
        assert_eq!(
            sanitize("Use a **sulfate-free** shampoo and *light* `leave-in`."),
            "Use a sulfate-free shampoo and light leave-in."
        );
    }

    #[test]
    fn test_sanitize_strips_list_prefixes() {
        let raw = "Here is the plan:\n- Wash twice a week\n* Condition daily\n• Trim monthly\n1. Dry gently\n12. Style";
        assert_eq!(
            sanitize(raw),
            "Here is the plan:\nWash twice a week\nCondition daily\nTrim monthly\nDry gently\nStyle"
        );
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(sanitize("  a \t b  \n\n  c  "), "a b\nc");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for input in TRICKY_INPUTS {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_sanitize_nested_bullets_reach_fixed_point() {
        assert_eq!(sanitize("- - nested bullet"), "nested bullet");
        assert_eq!(sanitize("***both***"), "both");
    }

    #[test]
    fn test_ensure_terminal() {
        assert_eq!(ensure_terminal("Hello"), "Hello.");
        assert_eq!(ensure_terminal("Hello!"), "Hello!");
        assert_eq!(ensure_terminal(" Really? "), "Really?");
        assert_eq!(ensure_terminal("   "), "");
    }

    #[test]
    fn test_split_two_sentences() {
        assert_eq!(
            split_into_sentences(
                "Try a sulfate-free shampoo twice a week. It keeps your scalp balanced."
            ),
            vec![
                "Try a sulfate-free shampoo twice a week.",
                "It keeps your scalp balanced."
            ]
        );
    }

    #[test]
    fn test_split_requires_uppercase_or_digit_after_boundary() {
        assert_eq!(
            split_into_sentences("Use about 2.5 cm of product. then rinse."),
            vec!["Use about 2.5 cm of product. then rinse."]
        );
        assert_eq!(
            split_into_sentences("Wait! 3 minutes is enough? Yes"),
            vec!["Wait!", "3 minutes is enough?", "Yes."]
        );
    }

    #[test]
    fn test_abbreviation_followed_by_capital_is_split() {
        assert_eq!(
            split_into_sentences("Dr. Smith is here. Great job."),
            vec!["Dr.", "Smith is here.", "Great job."]
        );
    }

    #[test]
    fn test_every_unit_is_terminated() {
        let raw = "**Great question**\n- Keep it short\n- Use a wide comb. Avoid heat\nStay hydrated";
        let units = split_into_sentences(raw);
        assert!(!units.is_empty());
        for unit in &units {
            assert!(unit.ends_with(['.', '!', '?']), "unterminated unit {unit:?}");
        }
    }

    #[test]
    fn test_split_empty_and_whitespace_yield_nothing() {
        assert!(split_into_sentences("").is_empty());
        assert!(split_into_sentences("   ").is_empty());
        assert!(split_into_sentences("  \t\n  ").is_empty());
    }

    #[test]
    fn test_split_single_fragment_gets_period() {
        assert_eq!(split_into_sentences("just this"), vec!["just this."]);
    }
}
