//! Render a backend answer as a Telegram HTML message.

use felis_qna::QueryResult;

/// Appended to a snippet cut at its budget.
pub const ELLIPSIS: &str = "...";

/// Heading of the sources section.
pub const SOURCES_LABEL: &str = "<b>📚 Sources:</b>";

/// Character budgets for rendered replies. Counted in chars, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatLimits {
    pub snippet_chars: usize,
    pub max_message_chars: usize,
}

impl Default for FormatLimits {
    fn default() -> Self {
        Self {
            snippet_chars: 300,
            max_message_chars: 4000,
        }
    }
}

/// Compose the reply for `result`.
///
/// The answer comes first. When `show_contexts` is set and the result has
/// contexts, a numbered sources section follows, each snippet cut to
/// `limits.snippet_chars`. The whole message is capped at
/// `limits.max_message_chars` of rendered HTML; an entity or tag that does
/// not fit is dropped whole, along with everything after it.
#[must_use]
pub fn format_response(result: &QueryResult, show_contexts: bool, limits: FormatLimits) -> String {
    let mut out = CappedHtml::new(limits.max_message_chars);

    let answer = result.answer.trim();
    out.push_text(answer);

    if show_contexts && !result.contexts.is_empty() {
        if !answer.is_empty() {
            out.push_text("\n\n");
        }
        out.push_markup(SOURCES_LABEL);
        for (i, context) in result.contexts.iter().enumerate() {
            let separator = if i == 0 { "\n" } else { "\n\n" };
            out.push_text(separator);
            out.push_text(&format!("{}. ", i + 1));
            out.push_text(&snippet(&context.text, limits.snippet_chars));
        }
    }

    out.finish()
}

/// Entity for a character Telegram's HTML parse mode treats as markup.
fn html_entity(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        _ => None,
    }
}

/// HTML output under a char budget. Entities and markup are indivisible, so
/// a cut never leaves a half-written `&amp;` or `<b>` behind.
struct CappedHtml {
    out: String,
    room: usize,
    full: bool,
}

impl CappedHtml {
    fn new(max_chars: usize) -> Self {
        Self {
            out: String::new(),
            room: max_chars,
            full: false,
        }
    }

    /// Append `text`, escaping it.
    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            match html_entity(c) {
                Some(entity) => self.push_markup(entity),
                None => self.push_unit(c.encode_utf8(&mut [0; 4]), 1),
            }
            if self.full {
                return;
            }
        }
    }

    /// Append `markup` verbatim, or nothing when it does not fit.
    fn push_markup(&mut self, markup: &str) {
        self.push_unit(markup, markup.chars().count());
    }

    fn push_unit(&mut self, unit: &str, chars: usize) {
        if self.full || chars > self.room {
            self.full = true;
            return;
        }
        self.out.push_str(unit);
        self.room -= chars;
    }

    fn finish(mut self) -> String {
        let kept = self.out.trim_end().len();
        self.out.truncate(kept);
        self.out
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn snippet(text: &str, budget: usize) -> String {
    let text = text.trim();
    let cut = truncate_chars(text, budget);
    if cut.len() < text.len() {
        format!("{cut}{ELLIPSIS}")
    } else {
        cut.to_string()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {felis_qna::ContextSnippet, rstest::rstest};

    use super::*;

    fn result(answer: &str, contexts: &[&str]) -> QueryResult {
        QueryResult {
            answer: answer.into(),
            contexts: contexts
                .iter()
                .enumerate()
                .map(|(i, text)| ContextSnippet {
                    id: format!("chunk{i}"),
                    text: (*text).into(),
                    score: 0.9,
                })
                .collect(),
        }
    }

    #[test]
    fn hides_contexts_unless_asked() {
        let long = "A".repeat(1000);
        let out = format_response(&result("X", &[&long]), false, FormatLimits::default());
        assert_eq!(out, "X");
        assert!(!out.contains("Sources"));
        assert!(!out.contains('A'));
    }

    #[test]
    fn shows_truncated_contexts() {
        let long = "A".repeat(1000);
        let out = format_response(&result("X", &[&long]), true, FormatLimits::default());

        let expected_entry = format!("1. {}{ELLIPSIS}", "A".repeat(300));
        assert!(out.starts_with("X\n"));
        assert!(out.contains(SOURCES_LABEL));
        assert!(out.contains(&expected_entry));
        assert!(!out.contains(&"A".repeat(301)));
    }

    #[test]
    fn short_snippet_has_no_ellipsis() {
        let out = format_response(&result("X", &["short one"]), true, FormatLimits::default());
        assert!(out.ends_with("1. short one"));
    }

    #[test]
    fn enumerates_in_backend_order() {
        let out = format_response(
            &result("answer", &["first", "second", "third"]),
            true,
            FormatLimits::default(),
        );
        let first = out.find("1. first").unwrap();
        let second = out.find("2. second").unwrap();
        let third = out.find("3. third").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn escapes_markup_in_answer_and_snippets() {
        let out = format_response(
            &result("a < b & c", &["<script>x</script>"]),
            true,
            FormatLimits::default(),
        );
        assert!(out.starts_with("a &lt; b &amp; c\n"));
        assert!(out.contains("1. &lt;script&gt;x&lt;/script&gt;"));
    }

    #[test]
    fn empty_answer_without_contexts_renders_empty() {
        let out = format_response(&result("   ", &[]), true, FormatLimits::default());
        assert!(out.is_empty());
    }

    #[test]
    fn contexts_only_result_still_lists_sources() {
        let out = format_response(&result("", &["only source"]), true, FormatLimits::default());
        assert!(out.starts_with(SOURCES_LABEL));
        assert!(out.contains("1. only source"));
    }

    #[rstest]
    #[case(5000, &[])]
    #[case(3900, &[1000, 1000, 1000])]
    #[case(0, &[1000; 20])]
    fn caps_at_exactly_the_maximum(#[case] answer_len: usize, #[case] context_lens: &[usize]) {
        let answer = "B".repeat(answer_len);
        let contexts: Vec<String> = context_lens.iter().map(|n| "C".repeat(*n)).collect();
        let refs: Vec<&str> = contexts.iter().map(String::as_str).collect();
        let limits = FormatLimits {
            snippet_chars: 1000,
            max_message_chars: 4000,
        };

        let out = format_response(&result(&answer, &refs), true, limits);
        assert_eq!(out.chars().count(), 4000);
    }

    #[test]
    fn cap_never_splits_an_entity() {
        let answer = format!("x{}", "&".repeat(2000));
        let out = format_response(&result(&answer, &[]), false, FormatLimits::default());

        assert!(out.chars().count() <= 4000);
        assert!(out.ends_with("&amp;"), "tail: {:?}", &out[out.len() - 8..]);
        assert_eq!(out.matches("&amp;").count(), 799);
        assert_eq!(out.matches('&').count(), 799);
    }

    #[test]
    fn cap_drops_a_label_that_does_not_fit() {
        let answer = "B".repeat(3990);
        let out = format_response(&result(&answer, &["source"]), true, FormatLimits::default());

        assert_eq!(out, answer);
        assert!(!out.contains('<'));
    }

    #[test]
    fn cap_counts_characters_not_bytes() {
        let answer = "é".repeat(50);
        let limits = FormatLimits {
            snippet_chars: 300,
            max_message_chars: 10,
        };
        let out = format_response(&result(&answer, &[]), false, limits);
        assert_eq!(out, "é".repeat(10));
    }

    #[rstest]
    #[case("hello", 10, "hello")]
    #[case("hello", 3, "hel")]
    #[case("hello", 0, "")]
    #[case("🐾🐾🐾", 2, "🐾🐾")]
    fn truncate_chars_respects_boundaries(
        #[case] input: &str,
        #[case] max: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(truncate_chars(input, max), expected);
    }
}
