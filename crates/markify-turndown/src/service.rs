//! TurndownService - the main entry point for HTML to Markdown conversion.

use std::sync::{Mutex, PoisonError};

use crate::collapse::collapse_whitespace;
use crate::node::{Node, NodeRef, NodeType};
use crate::options::TurndownOptions;
use crate::rules::{Filter, Rule, Rules};
use crate::utilities::{escape_markdown, trim_leading_newlines, trim_trailing_newlines};
use crate::{Result, TurndownError};

/// Something [`TurndownService::turndown`] can convert.
#[derive(Debug, Clone, Copy)]
pub enum TurndownInput<'a> {
    /// An HTML fragment, parsed before conversion
    #[cfg(feature = "html")]
    Html(&'a str),
    /// An element, document or document fragment. Only its children are
    /// converted.
    Node(&'a Node),
}

#[cfg(feature = "html")]
impl<'a> From<&'a str> for TurndownInput<'a> {
    fn from(html: &'a str) -> Self {
        TurndownInput::Html(html)
    }
}

#[cfg(feature = "html")]
impl<'a> From<&'a String> for TurndownInput<'a> {
    fn from(html: &'a String) -> Self {
        TurndownInput::Html(html.as_str())
    }
}

impl<'a> From<&'a Node> for TurndownInput<'a> {
    fn from(node: &'a Node) -> Self {
        TurndownInput::Node(node)
    }
}

/// The main service for converting HTML to Markdown
pub struct TurndownService {
    options: TurndownOptions,
    rules: Rules,
    /// Held for the whole of a conversion; rules keep per-conversion state
    conversion: Mutex<()>,
}

impl TurndownService {
    /// Create a new TurndownService with default options
    pub fn new() -> Self {
        Self::with_options(TurndownOptions::default())
    }

    /// Create a TurndownService with custom options
    pub fn with_options(options: TurndownOptions) -> Self {
        Self {
            options,
            rules: Rules::new(),
            conversion: Mutex::new(()),
        }
    }

    /// Convert HTML, or a node's children, to Markdown.
    ///
    /// The input tree is cloned; the caller's nodes are never modified.
    pub fn turndown<'a, I>(&self, input: I) -> Result<String>
    where
        I: Into<TurndownInput<'a>>,
    {
        let mut root = match input.into() {
            #[cfg(feature = "html")]
            TurndownInput::Html(html) => {
                if html.is_empty() {
                    return Ok(String::new());
                }
                tracing::debug!(input = "html", bytes = html.len(), "Converting");
                crate::html::parse_html(html)
            }
            TurndownInput::Node(node) => {
                if !node.node_type.is_container() {
                    return Err(TurndownError::InvalidInput(format!(
                        "{:?} node is not an element, document or document fragment",
                        node.node_type
                    )));
                }
                tracing::debug!(input = "node", root = %node.node_name, "Converting");
                node.clone()
            }
        };

        let preformatted_code = self.options.preformatted_code;
        collapse_whitespace(&mut root, |node| {
            node.is_named("pre") || (preformatted_code && node.is_named("code"))
        });
        root.summarize();

        let _guard = self
            .conversion
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let output = self.process(&NodeRef::root(&root));
        let markdown = self.post_process(output);

        tracing::debug!(length = markdown.len(), "Converted");
        Ok(markdown)
    }

    /// Add a rule ahead of every existing rule
    pub fn add_rule(&mut self, key: &str, rule: Rule) -> Result<&mut Self> {
        self.rules.add(key, rule)?;
        Ok(self)
    }

    /// Keep elements matching the filter as HTML
    pub fn keep(&mut self, filter: Filter) -> Result<&mut Self> {
        self.rules.keep(filter)?;
        Ok(self)
    }

    /// Remove elements matching the filter
    pub fn remove(&mut self, filter: Filter) -> Result<&mut Self> {
        self.rules.remove(filter)?;
        Ok(self)
    }

    /// Apply a plugin
    pub fn use_plugin<F>(&mut self, plugin: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        plugin(self)?;
        Ok(self)
    }

    /// Escape markdown special characters in a string
    pub fn escape(&self, text: &str) -> String {
        escape_markdown(text)
    }

    /// Get the current options
    pub fn options(&self) -> &TurndownOptions {
        &self.options
    }

    /// Get mutable access to options
    pub fn options_mut(&mut self) -> &mut TurndownOptions {
        &mut self.options
    }

    /// The registered rules
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Render the children of `parent`
    fn process(&self, parent: &NodeRef) -> String {
        let mut output = String::new();

        for (index, child) in parent.children().enumerate() {
            let replacement = match child.node_type {
                NodeType::Text => {
                    let value = child.node_value.as_deref().unwrap_or("");
                    if parent.is_code() {
                        value.to_string()
                    } else {
                        escape_markdown(value)
                    }
                }
                NodeType::Element => {
                    let view = parent.child(child, index, &self.options);
                    self.replacement_for_node(&view)
                }
                _ => String::new(),
            };
            join_into(&mut output, &replacement);
        }

        output
    }

    fn replacement_for_node(&self, node: &NodeRef) -> String {
        let rule = self.rules.for_node(node, &self.options);
        let content = self.process(node);
        let flanking = node.flanking_whitespace();
        let content = if flanking.is_empty() {
            content.as_str()
        } else {
            content.trim()
        };

        format!(
            "{}{}{}",
            flanking.leading,
            rule.replace(node, content, &self.options),
            flanking.trailing
        )
    }

    /// Append rule output, reset rule state and trim the document edges
    fn post_process(&self, mut output: String) -> String {
        for rule in self.rules.iter() {
            if let Some(extra) = rule.append(&self.options) {
                if !extra.is_empty() {
                    join_into(&mut output, &extra);
                }
            }
        }
        self.rules.iter().for_each(Rule::reset);

        output
            .trim_start_matches(&['\t', '\r', '\n'][..])
            .trim_end()
            .to_string()
    }
}

impl Default for TurndownService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TurndownService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurndownService")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Join two rendered fragments, keeping at most one blank line between them.
///
/// Newlines at the junction are trimmed from both sides and replaced by as
/// many newlines as the larger side had, capped at two.
pub fn join(output: &str, replacement: &str) -> String {
    let mut joined = output.to_string();
    join_into(&mut joined, replacement);
    joined
}

/// In-place form of [`join`]
pub(crate) fn join_into(output: &mut String, replacement: &str) {
    let trailing = output.len() - trim_trailing_newlines(output).len();
    let rest = trim_leading_newlines(replacement);
    let leading = replacement.len() - rest.len();

    output.truncate(output.len() - trailing);
    output.push_str(&"\n\n"[..trailing.max(leading).min(2)]);
    output.push_str(rest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{CodeBlockStyle, HeadingStyle, LinkStyle};

    fn fragment(children: Vec<Node>) -> Node {
        let mut root = Node::document_fragment();
        children.into_iter().for_each(|c| root.add_child(c));
        root
    }

    fn element_with_text(tag: &str, text: &str) -> Node {
        let mut node = Node::element(tag);
        node.add_child(Node::text(text));
        node
    }

    #[test]
    fn test_join() {
        assert_eq!(join("a\n\n", "\n\nb"), "a\n\nb");
        assert_eq!(join("a\n", "b"), "a\nb");
        assert_eq!(join("a", "\n\n\n\nb"), "a\n\nb");
        assert_eq!(join("a", "b"), "ab");
        assert_eq!(join("", "\n\nb"), "\n\nb");
    }

    #[test]
    fn test_simple_paragraph() {
        let service = TurndownService::new();
        let root = fragment(vec![element_with_text("p", "Hello World")]);
        assert_eq!(service.turndown(&root).unwrap(), "Hello World");
    }

    #[test]
    fn test_element_input_converts_children_only() {
        let service = TurndownService::new();
        let h1 = element_with_text("h1", "Title");
        assert_eq!(service.turndown(&h1).unwrap(), "Title");
    }

    #[test]
    fn test_heading_styles() {
        let root = fragment(vec![element_with_text("h1", "Title")]);

        let service = TurndownService::new();
        assert_eq!(service.turndown(&root).unwrap(), "# Title");

        let options = TurndownOptions {
            heading_style: HeadingStyle::Setext,
            ..Default::default()
        };
        let service = TurndownService::with_options(options);
        assert_eq!(service.turndown(&root).unwrap(), "Title\n=====");
    }

    #[test]
    fn test_emphasis_and_strong() {
        let service = TurndownService::new();
        let root = fragment(vec![
            element_with_text("em", "emphasized"),
            Node::text(" and "),
            element_with_text("strong", "bold"),
        ]);
        assert_eq!(service.turndown(&root).unwrap(), "*emphasized* and **bold**");
    }

    #[test]
    fn test_inline_link() {
        let service = TurndownService::new();
        let mut a = Node::element_with_attrs("a", vec![("href", "https://example.com")]);
        a.add_child(Node::text("Link"));
        let root = fragment(vec![a]);
        assert_eq!(service.turndown(&root).unwrap(), "[Link](https://example.com)");
    }

    #[test]
    fn test_image() {
        let service = TurndownService::new();
        let img = Node::element_with_attrs("img", vec![("src", "test.png"), ("alt", "Alt")]);
        assert_eq!(service.turndown(&fragment(vec![img])).unwrap(), "![Alt](test.png)");
    }

    #[test]
    fn test_inline_code_is_not_escaped() {
        let service = TurndownService::new();
        let root = fragment(vec![element_with_text("code", "a_b*c")]);
        assert_eq!(service.turndown(&root).unwrap(), "`a_b*c`");
    }

    #[test]
    fn test_text_is_escaped() {
        let service = TurndownService::new();
        let root = fragment(vec![element_with_text("p", "1. not_a *list*")]);
        assert_eq!(service.turndown(&root).unwrap(), r"1\. not\_a \*list\*");
    }

    #[test]
    fn test_horizontal_rule_between_paragraphs() {
        let service = TurndownService::new();
        let root = fragment(vec![
            element_with_text("p", "a"),
            Node::element("hr"),
            element_with_text("p", "b"),
        ]);
        assert_eq!(service.turndown(&root).unwrap(), "a\n\n* * *\n\nb");
    }

    #[test]
    fn test_blockquote() {
        let service = TurndownService::new();
        let mut blockquote = Node::element("blockquote");
        blockquote.add_child(element_with_text("p", "Quote"));
        blockquote.add_child(element_with_text("p", "More"));
        let root = fragment(vec![blockquote]);
        assert_eq!(service.turndown(&root).unwrap(), "> Quote\n> \n> More");
    }

    #[test]
    fn test_indented_code_block_opens_document() {
        let options = TurndownOptions {
            code_block_style: CodeBlockStyle::Indented,
            ..Default::default()
        };
        let service = TurndownService::with_options(options);
        let mut pre = Node::element("pre");
        pre.add_child(element_with_text("code", "function() {}"));
        assert_eq!(service.turndown(&fragment(vec![pre])).unwrap(), "    function() {}");
    }

    #[test]
    fn test_ordered_list() {
        let service = TurndownService::new();
        let mut ol = Node::element("ol");
        ol.add_child(element_with_text("li", "One"));
        ol.add_child(element_with_text("li", "Two"));
        assert_eq!(
            service.turndown(&fragment(vec![ol])).unwrap(),
            "1.  One\n2.  Two"
        );
    }

    #[test]
    fn test_flanking_whitespace_moves_outside() {
        let service = TurndownService::new();
        let mut p = Node::element("p");
        p.add_child(Node::text("Hello"));
        p.add_child(element_with_text("em", " world "));
        p.add_child(Node::text("!"));
        assert_eq!(service.turndown(&fragment(vec![p])).unwrap(), "Hello *world* !");
    }

    #[test]
    fn test_reference_links_reset_between_conversions() {
        let options = TurndownOptions {
            link_style: LinkStyle::Referenced,
            ..Default::default()
        };
        let service = TurndownService::with_options(options);
        let mut a = Node::element_with_attrs("a", vec![("href", "https://a.example")]);
        a.add_child(Node::text("A"));
        let root = fragment(vec![a]);

        let expected = "[A][1]\n\n[1]: https://a.example";
        assert_eq!(service.turndown(&root).unwrap(), expected);
        assert_eq!(service.turndown(&root).unwrap(), expected);
    }

    #[test]
    fn test_rejects_non_container_nodes() {
        let service = TurndownService::new();
        let err = service.turndown(&Node::text("loose")).unwrap_err();
        assert!(matches!(err, TurndownError::InvalidInput(_)));
        assert!(service.turndown(&Node::comment("c")).is_err());
    }

    #[test]
    fn test_input_is_not_modified() {
        let service = TurndownService::new();
        let root = fragment(vec![element_with_text("p", "  spaced   out  ")]);
        let before = root.clone();
        service.turndown(&root).unwrap();
        assert_eq!(root, before);
    }

    #[test]
    fn test_add_rule_and_plugin() {
        let mut service = TurndownService::new();
        service
            .add_rule("mark", Rule::for_tag("mark", |_, c, _| format!("=={}==", c)))
            .unwrap()
            .use_plugin(|s| {
                s.remove(Filter::tag("script"))?;
                Ok(())
            })
            .unwrap();

        let root = fragment(vec![
            element_with_text("mark", "hi"),
            element_with_text("script", "alert(1)"),
        ]);
        assert_eq!(service.turndown(&root).unwrap(), "==hi==");
    }

    #[test]
    fn test_malformed_rule_is_rejected() {
        let mut service = TurndownService::new();
        let err = service.keep(Filter::tag("<b>")).unwrap_err();
        assert!(matches!(err, TurndownError::MalformedRule(_)));
    }

    #[cfg(feature = "html")]
    #[test]
    fn test_html_string_input() {
        let service = TurndownService::new();
        assert_eq!(service.turndown("").unwrap(), "");
        assert_eq!(
            service.turndown("<p>Hello <strong>World</strong></p>").unwrap(),
            "Hello **World**"
        );
        let owned = String::from("<h2>Sub</h2>");
        assert_eq!(service.turndown(&owned).unwrap(), "## Sub");
    }
}
