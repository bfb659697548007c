//! Tag classification, string helpers and Markdown escaping.

use once_cell::sync::Lazy;
use regex::Regex;

/// Block-level HTML elements
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "body", "canvas",
    "center", "dd", "dir", "div", "dl", "dt", "fieldset", "figcaption",
    "figure", "footer", "form", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "html", "isindex", "li", "main", "menu",
    "nav", "noframes", "noscript", "ol", "output", "p", "pre", "section",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Void (self-closing) HTML elements
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements that have meaning even when blank
pub const MEANINGFUL_WHEN_BLANK: &[&str] = &[
    "a", "table", "thead", "tbody", "tfoot", "th", "td", "iframe", "script",
    "audio", "video",
];

fn in_set(set: &[&str], tag: &str) -> bool {
    set.iter().any(|name| name.eq_ignore_ascii_case(tag))
}

/// Check if a tag is a block-level element
pub fn is_block(tag: &str) -> bool {
    in_set(BLOCK_ELEMENTS, tag)
}

/// Check if a tag is a void element
pub fn is_void(tag: &str) -> bool {
    in_set(VOID_ELEMENTS, tag)
}

/// Check if a tag is meaningful when blank
pub fn is_meaningful_when_blank(tag: &str) -> bool {
    in_set(MEANINGFUL_WHEN_BLANK, tag)
}

/// Whitespace for blank detection: Unicode whitespace plus the byte order
/// mark, which HTML text often carries and which renders as nothing.
pub fn is_blank_char(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Repeat a string n times
pub fn repeat(s: &str, n: usize) -> String {
    s.repeat(n)
}

pub fn trim_leading_newlines(s: &str) -> &str {
    s.trim_start_matches('\n')
}

pub fn trim_trailing_newlines(s: &str) -> &str {
    s.trim_end_matches('\n')
}

pub fn trim_newlines(s: &str) -> &str {
    trim_trailing_newlines(trim_leading_newlines(s))
}

/// Length of the longest run of `ch` in `s`.
pub fn longest_run(s: &str, ch: char) -> usize {
    s.chars()
        .fold((0, 0), |(max, current), c| {
            if c == ch {
                (max.max(current + 1), current + 1)
            } else {
                (max, 0)
            }
        })
        .0
}

static ATTRIBUTE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\n+\s*)+").expect("attribute break pattern"));

/// Clean an attribute value: collapse line breaks (and the indentation that
/// follows them) into single newlines. Missing attributes become empty.
pub fn clean_attribute(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => ATTRIBUTE_BREAKS.replace_all(v, "\n").into_owned(),
        _ => String::new(),
    }
}

/// Substitutions applied in order; `^` anchors to the start of the text.
static ESCAPES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\\", r"\\"),
        (r"\*", r"\*"),
        (r"^-", r"\-"),
        (r"^\+ ", r"\+ "),
        (r"^(=+)", r"\${1}"),
        (r"^(#{1,6}) ", r"\${1} "),
        (r"`", r"\`"),
        (r"^~~~", r"\~~~"),
        (r"\[", r"\["),
        (r"\]", r"\]"),
        (r"^>", r"\>"),
        (r"_", r"\_"),
        (r"^([0-9]+)\. ", r"${1}\. "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (Regex::new(pattern).expect("escape pattern"), replacement)
    })
    .collect()
});

/// Escape Markdown syntax in a plain text run so it renders literally.
pub fn escape_markdown(text: &str) -> String {
    ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("*test*"), "\\*test\\*");
        assert_eq!(escape_markdown("_test_"), "\\_test\\_");
        assert_eq!(escape_markdown("[link]"), "\\[link\\]");
        assert_eq!(escape_markdown("normal"), "normal");
    }

    #[test]
    fn test_escape_does_not_double_escape() {
        assert_eq!(escape_markdown("`_*`"), "\\`\\_\\*\\`");
        assert_eq!(escape_markdown("a\\b"), "a\\\\b");
        assert_eq!(escape_markdown("\\*"), "\\\\\\*");
    }

    #[test]
    fn test_escape_anchored_patterns() {
        assert_eq!(escape_markdown("- item"), "\\- item");
        assert_eq!(escape_markdown("a - b"), "a - b");
        assert_eq!(escape_markdown("+ item"), "\\+ item");
        assert_eq!(escape_markdown("+1"), "+1");
        assert_eq!(escape_markdown("=== x"), "\\=== x");
        assert_eq!(escape_markdown("## Title"), "\\## Title");
        assert_eq!(escape_markdown("#hashtag"), "#hashtag");
        assert_eq!(escape_markdown("~~~ fence"), "\\~~~ fence");
        assert_eq!(escape_markdown("> quote"), "\\> quote");
        assert_eq!(escape_markdown("1984. A year"), "1984\\. A year");
        assert_eq!(escape_markdown("In 1984. A year"), "In 1984. A year");
    }

    #[test]
    fn test_is_blank_char() {
        assert!(is_blank_char(' '));
        assert!(is_blank_char('\u{a0}'));
        assert!(is_blank_char('\u{feff}'));
        assert!(!is_blank_char('x'));
    }

    #[test]
    fn test_repeat() {
        assert_eq!(repeat("=", 5), "=====");
        assert_eq!(repeat("-", 3), "---");
    }

    #[test]
    fn test_is_block() {
        assert!(is_block("div"));
        assert!(is_block("p"));
        assert!(is_block("DIV"));
        assert!(!is_block("span"));
        assert!(!is_block("a"));
    }

    #[test]
    fn test_is_void() {
        assert!(is_void("br"));
        assert!(is_void("img"));
        assert!(is_void("HR"));
        assert!(!is_void("div"));
    }

    #[test]
    fn test_meaningful_when_blank() {
        assert!(is_meaningful_when_blank("A"));
        assert!(is_meaningful_when_blank("td"));
        assert!(!is_meaningful_when_blank("span"));
    }

    #[test]
    fn test_trim_newlines() {
        assert_eq!(trim_newlines("\n\na\nb\n"), "a\nb");
        assert_eq!(trim_newlines(" a \n"), " a ");
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run("a``b```c`", '`'), 3);
        assert_eq!(longest_run("none", '`'), 0);
    }

    #[test]
    fn test_clean_attribute() {
        assert_eq!(clean_attribute(Some("a\n\n   b")), "a\nb");
        assert_eq!(clean_attribute(Some("plain")), "plain");
        assert_eq!(clean_attribute(None), "");
    }
}
