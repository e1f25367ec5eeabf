//! Backslash escaping of markdown control characters.
//!
//! A colon is escaped only where it may open a `:name:` shortcode.
//!
//! [`escape`] and [`unescape`] are exact inverses: every character `escape`
//! prefixes with a backslash is ASCII punctuation, and `unescape` strips a
//! backslash in front of any ASCII punctuation.

use std::sync::LazyLock;

use regex::Regex;

/// Characters escaped wherever they appear in text.
pub const ALWAYS_ESCAPED: &[char] = &['\\', '*', '_', '`', '~', '[', ']'];

/// Block markers that only mean something at the start of a line.
static LINE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)(?:[#>+-]|:::|(\d+)[.)])").unwrap());

fn is_shortcode_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')
}

/// Whether the colon at `at` may open a `:name:` shortcode. A name running
/// to the end of the text counts, since the next inline node may close it.
fn opens_shortcode(chars: &[char], at: usize) -> bool {
    let len = chars[at + 1..].iter().take_while(|c| is_shortcode_char(**c)).count();
    len > 0 && chars.get(at + 1 + len).is_none_or(|&c| c == ':')
}

/// Escape `text` for use in inline content. With `start_of_line`, block
/// markers at the beginning are escaped as well.
pub fn escape(text: &str, start_of_line: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if ALWAYS_ESCAPED.contains(&c) || (c == ':' && opens_shortcode(&chars, i)) {
            out.push('\\');
        }
        out.push(c);
    }
    if start_of_line {
        if let Some(caps) = LINE_START.captures(&out) {
            let at = match caps.get(2) {
                Some(digits) => digits.end(),
                None => caps[1].len(),
            };
            out.insert(at, '\\');
        }
    }
    out
}

/// Remove backslash escapes.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Escape a link destination. Destinations containing whitespace are
/// wrapped in angle brackets.
pub fn escape_link_dest(href: &str) -> String {
    let mut out = String::with_capacity(href.len());
    for c in href.chars() {
        if matches!(c, '\\' | '(' | ')' | '<' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    if href.chars().any(char::is_whitespace) || href.is_empty() {
        format!("<{out}>")
    } else {
        out
    }
}

/// Escape a link title for a double-quoted title string.
pub fn escape_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len() + 2);
    out.push('"');
    for c in title.chars() {
        if matches!(c, '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_inline_controls() {
        assert_eq!(escape("a*b_c`d\\e", false), r"a\*b\_c\`d\\e");
        assert_eq!(escape("[x] ~y~", false), r"\[x\] \~y\~");
        assert_eq!(escape("# not a heading", false), "# not a heading");
    }

    #[test]
    fn test_escape_shortcode_colons() {
        assert_eq!(escape("at 10:30 a: b", false), "at 10:30 a: b");
        assert_eq!(escape(":smile:", false), r"\:smile:");
        assert_eq!(escape("a:b:c:", false), r"a\:b\:c:");
        assert_eq!(escape(":thumbs_up:", false), r"\:thumbs\_up:");
        assert_eq!(escape("ratio 1:2", false), r"ratio 1\:2");
    }

    #[test]
    fn test_escape_line_start_markers() {
        assert_eq!(escape("# title", true), r"\# title");
        assert_eq!(escape("> quote", true), r"\> quote");
        assert_eq!(escape("- item", true), r"\- item");
        assert_eq!(escape("+1", true), r"\+1");
        assert_eq!(escape(":::info", true), r"\:::info");
        assert_eq!(escape("12. twelve", true), r"12\. twelve");
        assert_eq!(escape("3) three", true), r"3\) three");
        assert_eq!(escape("  # indented", true), r"  \# indented");
        assert_eq!(escape("2024 was", true), "2024 was");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        let samples = [
            r"plain text",
            r"a*b*c",
            r"__init__",
            r"`code` and \backslash\",
            r"\\ double",
            "# heading-ish",
            "1. list-ish",
            ":::warning",
            "[link](x)",
            "~~strike~~",
            "trailing \\",
            ":wave: and 10:30:00",
        ];
        for sample in samples {
            for start in [false, true] {
                assert_eq!(unescape(&escape(sample, start)), sample, "{sample:?}");
            }
        }
    }

    #[test]
    fn test_unescape_keeps_non_punctuation_backslash() {
        assert_eq!(unescape(r"a\b"), r"a\b");
        assert_eq!(unescape(r"\*"), "*");
    }

    #[test]
    fn test_link_dest_escaping() {
        assert_eq!(escape_link_dest("https://x.test/a_(b)"), r"https://x.test/a_\(b\)");
        assert_eq!(escape_link_dest("a b"), "<a b>");
        assert_eq!(escape_title(r#"say "hi""#), r#""say \"hi\"""#);
    }
}
