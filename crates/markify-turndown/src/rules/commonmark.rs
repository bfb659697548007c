//! CommonMark rules for HTML to Markdown conversion.

use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Filter, Rule};
use crate::node::NodeRef;
use crate::options::{CodeBlockStyle, HeadingStyle, LinkReferenceStyle, LinkStyle};
use crate::utilities::{clean_attribute, longest_run, repeat, trim_newlines};

/// Create all CommonMark rules, keyed, in precedence order
pub fn commonmark_rules() -> Vec<(&'static str, Rule)> {
    vec![
        ("paragraph", paragraph_rule()),
        ("line_break", line_break_rule()),
        ("heading", heading_rule()),
        ("blockquote", blockquote_rule()),
        ("list", list_rule()),
        ("list_item", list_item_rule()),
        ("indented_code_block", indented_code_block_rule()),
        ("fenced_code_block", fenced_code_block_rule()),
        ("horizontal_rule", horizontal_rule()),
        ("inline_link", inline_link_rule()),
        ("reference_link", reference_link_rule()),
        ("emphasis", emphasis_rule()),
        ("strong", strong_rule()),
        ("code", code_rule()),
        ("image", image_rule()),
    ]
}

fn paragraph_rule() -> Rule {
    Rule::for_tag("p", |_, content, _| format!("\n\n{}\n\n", content))
}

fn line_break_rule() -> Rule {
    Rule::for_tag("br", |_, _, options| format!("{}\n", options.br))
}

fn heading_rule() -> Rule {
    Rule::for_tags(
        &["h1", "h2", "h3", "h4", "h5", "h6"],
        |node, content, options| {
            let level: usize = node.node.node_name[1..].parse().unwrap_or(1);

            match options.heading_style {
                HeadingStyle::Setext if level < 3 => {
                    let underline = if level == 1 { "=" } else { "-" };
                    format!(
                        "\n\n{}\n{}\n\n",
                        content,
                        repeat(underline, content.chars().count())
                    )
                }
                _ => format!("\n\n{} {}\n\n", repeat("#", level), content),
            }
        },
    )
}

fn blockquote_rule() -> Rule {
    Rule::for_tag("blockquote", |_, content, _| {
        let quoted: Vec<String> = trim_newlines(content)
            .split('\n')
            .map(|line| format!("> {}", line))
            .collect();
        format!("\n\n{}\n\n", quoted.join("\n"))
    })
}

fn list_rule() -> Rule {
    Rule::for_tags(&["ul", "ol"], |node, content, _| {
        let nested = node
            .parent()
            .is_some_and(|parent| parent.is_named("li") && node.is_last_element_child());

        if nested {
            format!("\n{}", content)
        } else {
            format!("\n\n{}\n\n", content)
        }
    })
}

fn list_item_marker(node: &NodeRef, bullet: char) -> String {
    let Some(list) = node.parent().filter(|p| p.is_named("ol")) else {
        return format!("{}   ", bullet);
    };

    let index = node.element_index() as i64;
    let number = list
        .attr("start")
        .and_then(|start| start.trim().parse::<i64>().ok())
        .and_then(|start| start.checked_add(index))
        .unwrap_or(index + 1);
    format!("{}.  ", number)
}

fn list_item_rule() -> Rule {
    Rule::for_tag("li", |node, content, options| {
        let prefix = list_item_marker(node, options.bullet_list_marker);

        let ends_with_paragraph = content.ends_with('\n');
        let mut content = trim_newlines(content).to_string();
        if ends_with_paragraph {
            content.push('\n');
        }
        let indent = format!("\n{}", " ".repeat(prefix.chars().count()));
        let content = content.replace('\n', &indent);

        let separator = if node.next_sibling().is_some() { "\n" } else { "" };
        format!("{}{}{}", prefix, content, separator)
    })
}

/// A `<pre>` whose first child is a `<code>` element
fn is_code_block(tag: &str, node: &NodeRef) -> bool {
    tag == "pre" && node.first_child().is_some_and(|c| c.is_named("code"))
}

fn indented_code_block_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, options| {
            options.code_block_style == CodeBlockStyle::Indented && is_code_block(tag, node)
        }),
        |node, _, _| {
            let code = node
                .first_child()
                .map(|c| c.text_content())
                .unwrap_or_default();
            format!("\n\n    {}\n\n", code.replace('\n', "\n    "))
        },
    )
}

static LANGUAGE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"language-(\S+)").expect("language class pattern"));

fn fenced_code_block_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, options| {
            options.code_block_style == CodeBlockStyle::Fenced && is_code_block(tag, node)
        }),
        |node, _, options| {
            let Some(code_node) = node.first_child() else {
                return String::new();
            };

            let language = code_node
                .attr("class")
                .and_then(|class| LANGUAGE_CLASS.captures(class))
                .and_then(|caps| caps.get(1))
                .map_or("", |m| m.as_str());

            let code = code_node.text_content();
            let fence_char = options.fence_char();
            let fence_size = options.fence_size().max(longest_run(&code, fence_char) + 1);
            let fence: String = std::iter::repeat(fence_char).take(fence_size).collect();

            let code = code.strip_suffix('\n').unwrap_or(&code);
            format!("\n\n{}{}\n{}\n{}\n\n", fence, language, code, fence)
        },
    )
}

fn horizontal_rule() -> Rule {
    Rule::for_tag("hr", |_, _, options| format!("\n\n{}\n\n", options.hr))
}

/// An `<a>` with a non-empty href
fn is_link(tag: &str, node: &NodeRef) -> bool {
    tag == "a" && node.attr("href").is_some_and(|href| !href.is_empty())
}

fn inline_link_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, options| {
            options.link_style == LinkStyle::Inlined && is_link(tag, node)
        }),
        |node, content, _| {
            let href = node
                .attr("href")
                .unwrap_or_default()
                .replace('(', "\\(")
                .replace(')', "\\)");
            let title = clean_attribute(node.attr("title"));
            let title_part = if title.is_empty() {
                String::new()
            } else {
                format!(" \"{}\"", title.replace('"', "\\\""))
            };

            format!("[{}]({}{})", content, href, title_part)
        },
    )
}

/// Link references collected during one conversion.
#[derive(Clone, Default)]
struct References(Arc<Mutex<Vec<String>>>);

impl References {
    fn with<T>(&self, f: impl FnOnce(&mut Vec<String>) -> T) -> T {
        let mut references = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut references)
    }

    /// Record a reference line and return its 1-based number
    fn push(&self, reference: impl FnOnce(usize) -> String) -> usize {
        self.with(|refs| {
            let id = refs.len() + 1;
            refs.push(reference(id));
            id
        })
    }

    fn block(&self) -> String {
        self.with(|refs| {
            if refs.is_empty() {
                return String::new();
            }
            tracing::debug!(count = refs.len(), "Flushing link references");
            format!("\n\n{}\n\n", refs.join("\n"))
        })
    }

    fn clear(&self) {
        self.with(Vec::clear);
    }
}

fn reference_link_rule() -> Rule {
    let references = References::default();
    let appended = references.clone();
    let cleared = references.clone();

    Rule::new(
        Filter::predicate(|tag, node, options| {
            options.link_style == LinkStyle::Referenced && is_link(tag, node)
        }),
        move |node, content, options| {
            let href = node.attr("href").unwrap_or_default();
            let title = clean_attribute(node.attr("title"));
            let title_part = if title.is_empty() {
                String::new()
            } else {
                format!(" \"{}\"", title)
            };

            match options.link_reference_style {
                LinkReferenceStyle::Collapsed => {
                    references.push(|_| format!("[{}]: {}{}", content, href, title_part));
                    format!("[{}][]", content)
                }
                LinkReferenceStyle::Shortcut => {
                    references.push(|_| format!("[{}]: {}{}", content, href, title_part));
                    format!("[{}]", content)
                }
                LinkReferenceStyle::Full => {
                    let id = references.push(|id| format!("[{}]: {}{}", id, href, title_part));
                    format!("[{}][{}]", content, id)
                }
            }
        },
    )
    .with_append(move |_| appended.block())
    .with_reset(move || cleared.clear())
}

fn emphasis_rule() -> Rule {
    Rule::for_tags(&["em", "i"], |_, content, options| {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        let delimiter = options.em_delimiter;
        format!("{}{}{}", delimiter, trimmed, delimiter)
    })
}

fn strong_rule() -> Rule {
    Rule::for_tags(&["strong", "b"], |_, content, options| {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        let delimiter = &options.strong_delimiter;
        format!("{}{}{}", delimiter, trimmed, delimiter)
    })
}

fn code_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, _| {
            // The only child of a <pre> belongs to a code block
            let has_siblings = node.previous_sibling().is_some() || node.next_sibling().is_some();
            let in_code_block = node.parent().is_some_and(|p| p.is_named("pre")) && !has_siblings;
            tag == "code" && !in_code_block
        }),
        |_, content, _| {
            if content.is_empty() {
                return String::new();
            }

            let content = content.replace("\r\n", " ").replace(['\n', '\r'], " ");

            let padded = content.starts_with('`')
                || content.ends_with('`')
                || (content.starts_with(' ')
                    && content.ends_with(' ')
                    && content.chars().any(|c| c != ' '));
            let extra_space = if padded { " " } else { "" };

            let delimiter = "`".repeat(longest_run(&content, '`') + 1);
            format!("{0}{1}{2}{1}{0}", delimiter, extra_space, content)
        },
    )
}

fn image_rule() -> Rule {
    Rule::for_tag("img", |node, _, _| {
        let src = node.attr("src").unwrap_or_default();
        if src.is_empty() {
            return String::new();
        }

        let alt = clean_attribute(node.attr("alt"));
        let title = clean_attribute(node.attr("title"));
        let title_part = if title.is_empty() {
            String::new()
        } else {
            format!(" \"{}\"", title)
        };

        format!("![{}]({}{})", alt, src, title_part)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::options::TurndownOptions;

    /// Apply `rule` to the only child of a fragment.
    fn apply(rule: &Rule, node: Node, content: &str, options: &TurndownOptions) -> String {
        let mut root = Node::document_fragment();
        root.add_child(node);
        let root_ref = NodeRef::root(&root);
        let child = root_ref.child(&root.children.as_ref().unwrap()[0], 0, options);
        rule.replace(&child, content, options)
    }

    fn pre_code(class: Option<&str>, code: &str) -> Node {
        let mut code_node = match class {
            Some(class) => Node::element_with_attrs("code", vec![("class", class)]),
            None => Node::element("code"),
        };
        code_node.add_child(Node::text(code));
        let mut pre = Node::element("pre");
        pre.add_child(code_node);
        pre
    }

    #[test]
    fn test_heading_styles() {
        let mut atx = TurndownOptions::default();
        atx.heading_style = HeadingStyle::Atx;
        let setext = TurndownOptions::classic();

        assert_eq!(apply(&heading_rule(), Node::element("h2"), "Title", &atx), "\n\n## Title\n\n");
        assert_eq!(apply(&heading_rule(), Node::element("h2"), "Title", &setext), "\n\nTitle\n-----\n\n");
        assert_eq!(apply(&heading_rule(), Node::element("h1"), "Tï", &setext), "\n\nTï\n==\n\n");
        assert_eq!(apply(&heading_rule(), Node::element("h4"), "Deep", &setext), "\n\n#### Deep\n\n");
    }

    #[test]
    fn test_blockquote_prefixes_every_line() {
        let options = TurndownOptions::default();
        let result = apply(&blockquote_rule(), Node::element("blockquote"), "\n\none\n\ntwo\n\n", &options);
        assert_eq!(result, "\n\n> one\n> \n> two\n\n");
    }

    #[test]
    fn test_fenced_code_block_language_and_fence() {
        let options = TurndownOptions::default();
        let result = apply(
            &fenced_code_block_rule(),
            pre_code(Some("hljs language-rust"), "let x = 1;\n"),
            "",
            &options,
        );
        assert_eq!(result, "\n\n```rust\nlet x = 1;\n```\n\n");
    }

    #[test]
    fn test_fence_longer_than_code_runs() {
        let options = TurndownOptions::default();
        let result = apply(&fenced_code_block_rule(), pre_code(None, "a\n```\nb"), "", &options);
        assert_eq!(result, "\n\n````\na\n```\nb\n````\n\n");

        let mut tildes = TurndownOptions::default();
        tildes.fence = "~~~".to_string();
        let result = apply(&fenced_code_block_rule(), pre_code(None, "a\n```\nb"), "", &tildes);
        assert_eq!(result, "\n\n~~~\na\n```\nb\n~~~\n\n");
    }

    #[test]
    fn test_indented_code_block() {
        let options = TurndownOptions::classic();
        let result = apply(&indented_code_block_rule(), pre_code(None, "a\n  b"), "", &options);
        assert_eq!(result, "\n\n    a\n      b\n\n");
    }

    #[test]
    fn test_inline_link_escaping() {
        let options = TurndownOptions::default();
        let link = Node::element_with_attrs(
            "a",
            vec![("href", "https://example.com/a_(b)"), ("title", "Say \"hi\"")],
        );
        assert_eq!(
            apply(&inline_link_rule(), link, "text", &options),
            "[text](https://example.com/a_\\(b\\) \"Say \\\"hi\\\"\")"
        );
    }

    #[test]
    fn test_reference_link_styles() {
        let mut options = TurndownOptions::default();
        options.link_style = LinkStyle::Referenced;
        let link = || Node::element_with_attrs("a", vec![("href", "/x"), ("title", "T")]);

        let rule = reference_link_rule();
        assert_eq!(apply(&rule, link(), "one", &options), "[one][1]");
        assert_eq!(apply(&rule, link(), "two", &options), "[two][2]");
        assert_eq!(
            rule.append(&options).as_deref(),
            Some("\n\n[1]: /x \"T\"\n[2]: /x \"T\"\n\n")
        );
        rule.reset();
        assert_eq!(rule.append(&options).as_deref(), Some(""));

        options.link_reference_style = LinkReferenceStyle::Collapsed;
        assert_eq!(apply(&rule, link(), "one", &options), "[one][]");
        options.link_reference_style = LinkReferenceStyle::Shortcut;
        assert_eq!(apply(&rule, link(), "two", &options), "[two]");
        assert_eq!(
            rule.append(&options).as_deref(),
            Some("\n\n[one]: /x \"T\"\n[two]: /x \"T\"\n\n")
        );
    }

    #[test]
    fn test_emphasis_and_strong() {
        let options = TurndownOptions::classic();
        assert_eq!(apply(&emphasis_rule(), Node::element("em"), "word", &options), "_word_");
        assert_eq!(apply(&emphasis_rule(), Node::element("i"), "  ", &options), "");
        assert_eq!(apply(&strong_rule(), Node::element("b"), " bold ", &options), "**bold**");
    }

    #[test]
    fn test_code_span_delimiters() {
        let options = TurndownOptions::default();
        let code = || Node::element("code");
        assert_eq!(apply(&code_rule(), code(), "plain", &options), "`plain`");
        assert_eq!(apply(&code_rule(), code(), "a `tick`", &options), "`` a `tick` ``");
        assert_eq!(apply(&code_rule(), code(), "``x``", &options), "``` ``x`` ```");
        assert_eq!(apply(&code_rule(), code(), " padded ", &options), "`  padded  `");
        assert_eq!(apply(&code_rule(), code(), "   ", &options), "`   `");
        assert_eq!(apply(&code_rule(), code(), "a\nb\r\nc", &options), "`a b c`");
        assert_eq!(apply(&code_rule(), code(), "", &options), "");
    }

    #[test]
    fn test_image() {
        let options = TurndownOptions::default();
        let img = Node::element_with_attrs(
            "img",
            vec![("src", "cat.png"), ("alt", "A\n\n  cat"), ("title", "Cat")],
        );
        assert_eq!(apply(&image_rule(), img, "", &options), "![A\ncat](cat.png \"Cat\")");
        assert_eq!(apply(&image_rule(), Node::element("img"), "", &options), "");
    }

    #[test]
    fn test_list_item_start_attribute() {
        let options = TurndownOptions::default();
        let mut ol = Node::element_with_attrs("ol", vec![("start", "5")]);
        for text in ["a", "b", "c"] {
            let mut li = Node::element("li");
            li.add_child(Node::text(text));
            ol.add_child(li);
        }

        let root = NodeRef::root(&ol);
        let items = ol.children.as_ref().unwrap();
        let rule = list_item_rule();
        let rendered: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(i, li)| rule.replace(&root.child(li, i, &options), "x", &options))
            .collect();
        assert_eq!(rendered, vec!["5.  x\n", "6.  x\n", "7.  x"]);
    }

    #[test]
    fn test_list_item_start_near_overflow() {
        let options = TurndownOptions::default();
        let mut ol = Node::element_with_attrs("ol", vec![("start", "9223372036854775807")]);
        for text in ["a", "b"] {
            let mut li = Node::element("li");
            li.add_child(Node::text(text));
            ol.add_child(li);
        }

        let root = NodeRef::root(&ol);
        let items = ol.children.as_ref().unwrap();
        let rule = list_item_rule();
        let rendered: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(i, li)| rule.replace(&root.child(li, i, &options), "x", &options))
            .collect();
        assert_eq!(rendered, vec!["9223372036854775807.  x\n", "2.  x"]);
    }
}
