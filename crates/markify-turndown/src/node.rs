//! DOM node structure for HTML to Markdown conversion.
//!
//! [`Node`] is an owned tree following the DOM `nodeType` / `nodeName`
//! conventions, so any parser (html5ever, CDP, a browser bridge) can build it.
//! [`NodeRef`] is the borrowed view handed to rules: it knows its parent and
//! position and carries the per-node annotations computed during rendering.

use crate::options::TurndownOptions;
use crate::utilities::{is_blank_char, is_block, is_meaningful_when_blank, is_void};

/// Node types matching DOM nodeType values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Element node (nodeType = 1)
    Element = 1,
    /// Text node (nodeType = 3)
    Text = 3,
    /// Comment node (nodeType = 8)
    Comment = 8,
    /// Document node (nodeType = 9)
    Document = 9,
    /// Document fragment node (nodeType = 11)
    DocumentFragment = 11,
}

impl NodeType {
    /// Whether a node of this type can be handed to the converter as input.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeType::Element | NodeType::Document | NodeType::DocumentFragment
        )
    }
}

/// Facts about a subtree that blank detection needs. Cached on every node by
/// a single post-order pass so rendering never rescans descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SubtreeSummary {
    pub whitespace_only: bool,
    pub has_void: bool,
    pub has_meaningful_when_blank: bool,
}

/// A DOM node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node type (1 = Element, 3 = Text, etc.)
    pub node_type: NodeType,

    /// Node name (uppercase for elements, e.g., "DIV", "#text" for text nodes)
    pub node_name: String,

    /// Character data for text and comment nodes
    pub node_value: Option<String>,

    /// Attributes as flat array [name, value, name, value, ...]
    pub attributes: Option<Vec<String>>,

    /// Child nodes
    pub children: Option<Vec<Node>>,

    summary: Option<SubtreeSummary>,
}

impl Node {
    fn new(node_type: NodeType, node_name: String) -> Self {
        Self {
            node_type,
            node_name,
            node_value: None,
            attributes: None,
            children: None,
            summary: None,
        }
    }

    /// Create a new element node
    pub fn element(tag_name: &str) -> Self {
        Self {
            attributes: Some(Vec::new()),
            children: Some(Vec::new()),
            ..Self::new(NodeType::Element, tag_name.to_uppercase())
        }
    }

    /// Create a new element node with attributes
    pub fn element_with_attrs(tag_name: &str, attrs: Vec<(&str, &str)>) -> Self {
        let flat_attrs: Vec<String> = attrs
            .into_iter()
            .flat_map(|(k, v)| [k.to_string(), v.to_string()])
            .collect();

        Self {
            attributes: Some(flat_attrs),
            ..Self::element(tag_name)
        }
    }

    /// Create a new text node
    pub fn text(content: &str) -> Self {
        Self {
            node_value: Some(content.to_string()),
            ..Self::new(NodeType::Text, "#text".to_string())
        }
    }

    /// Create a new comment node
    pub fn comment(content: &str) -> Self {
        Self {
            node_value: Some(content.to_string()),
            ..Self::new(NodeType::Comment, "#comment".to_string())
        }
    }

    /// Create a document node
    pub fn document() -> Self {
        Self {
            children: Some(Vec::new()),
            ..Self::new(NodeType::Document, "#document".to_string())
        }
    }

    /// Create a document fragment node
    pub fn document_fragment() -> Self {
        Self {
            children: Some(Vec::new()),
            ..Self::new(NodeType::DocumentFragment, "#document-fragment".to_string())
        }
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Check if this is a text node
    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Check if this is an element with the given tag name (case-insensitive)
    pub fn is_named(&self, tag: &str) -> bool {
        self.is_element() && self.node_name.eq_ignore_ascii_case(tag)
    }

    /// Get the tag name (lowercase)
    pub fn tag_name(&self) -> String {
        self.node_name.to_lowercase()
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        let attrs = self.attributes.as_ref()?;
        attrs
            .chunks_exact(2)
            .find(|pair| pair[0].eq_ignore_ascii_case(name))
            .map(|pair| pair[1].as_str())
    }

    /// Check if an attribute exists
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Get all child nodes
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().flat_map(|c| c.iter())
    }

    /// Get only element children
    pub fn element_children(&self) -> impl Iterator<Item = &Node> {
        self.children().filter(|n| n.is_element())
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) {
        self.children.get_or_insert_with(Vec::new).push(child);
    }

    /// Set an attribute
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let attrs = self.attributes.get_or_insert_with(Vec::new);
        if let Some(pair) = attrs
            .chunks_exact_mut(2)
            .find(|pair| pair[0].eq_ignore_ascii_case(name))
        {
            pair[1] = value.to_string();
            return;
        }
        attrs.push(name.to_string());
        attrs.push(value.to_string());
    }

    /// Get all text content from this node and descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text_content(&mut out);
        out
    }

    fn push_text_content(&self, out: &mut String) {
        match self.node_type {
            NodeType::Text => out.push_str(self.node_value.as_deref().unwrap_or("")),
            NodeType::Comment => {}
            _ => self.children().for_each(|child| child.push_text_content(out)),
        }
    }

    /// Whether the node renders to nothing: whitespace-only text, not void or
    /// meaningful when blank, and no void or meaningful-when-blank descendant.
    pub fn is_blank(&self) -> bool {
        if !self.is_element() || is_void(&self.node_name) || is_meaningful_when_blank(&self.node_name) {
            return false;
        }
        let summary = self.subtree_summary();
        summary.whitespace_only && !summary.has_void && !summary.has_meaningful_when_blank
    }

    /// Whether any descendant element is void.
    pub fn has_void(&self) -> bool {
        self.subtree_summary().has_void
    }

    /// Whether any descendant element is meaningful when blank.
    pub fn has_meaningful_when_blank(&self) -> bool {
        self.subtree_summary().has_meaningful_when_blank
    }

    fn subtree_summary(&self) -> SubtreeSummary {
        if let Some(summary) = self.summary {
            return summary;
        }

        let whitespace_only = match self.node_type {
            NodeType::Text => self
                .node_value
                .as_deref()
                .unwrap_or("")
                .chars()
                .all(is_blank_char),
            _ => true,
        };
        let mut summary = SubtreeSummary {
            whitespace_only,
            has_void: false,
            has_meaningful_when_blank: false,
        };

        for child in self.children() {
            let inner = child.subtree_summary();
            summary.whitespace_only &= inner.whitespace_only;
            summary.has_void |= inner.has_void;
            summary.has_meaningful_when_blank |= inner.has_meaningful_when_blank;
            if child.is_element() {
                summary.has_void |= is_void(&child.node_name);
                summary.has_meaningful_when_blank |= is_meaningful_when_blank(&child.node_name);
            }
        }
        summary
    }

    /// Cache subtree summaries on this node and all descendants. Must run
    /// after the last structural mutation of the tree.
    pub(crate) fn summarize(&mut self) {
        self.summary = None;
        if let Some(children) = self.children.as_mut() {
            children.iter_mut().for_each(Node::summarize);
        }
        self.summary = Some(self.subtree_summary());
    }

    /// Reconstruct outer HTML (for keep rules)
    pub fn outer_html(&self) -> String {
        match self.node_type {
            NodeType::Text => escape_html_text(self.node_value.as_deref().unwrap_or("")),
            NodeType::Comment => format!("<!--{}-->", self.node_value.as_deref().unwrap_or("")),
            NodeType::Element => {
                let tag = self.tag_name();
                let attrs = self.attributes_string();
                let open = if attrs.is_empty() {
                    format!("<{}>", tag)
                } else {
                    format!("<{} {}>", tag, attrs)
                };

                if is_void(&tag) {
                    open
                } else {
                    format!("{}{}</{}>", open, self.inner_html(), tag)
                }
            }
            _ => self.inner_html(),
        }
    }

    /// Reconstruct inner HTML
    pub fn inner_html(&self) -> String {
        if self.is_named("script") || self.is_named("style") {
            return self.text_content();
        }
        self.children().map(Node::outer_html).collect()
    }

    /// Get attributes as a string for HTML output
    fn attributes_string(&self) -> String {
        let Some(ref attrs) = self.attributes else {
            return String::new();
        };

        attrs
            .chunks_exact(2)
            .map(|pair| {
                if pair[1].is_empty() {
                    pair[0].clone()
                } else {
                    format!("{}=\"{}\"", pair[0], escape_html_attr(&pair[1]))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Escape HTML attribute value
fn escape_html_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_html_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Whitespace to re-attach outside a node's rendered content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlankingWhitespace {
    pub leading: String,
    pub trailing: String,
}

impl FlankingWhitespace {
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_empty()
    }
}

/// Leading and trailing whitespace of a string, each split into the part made
/// of ASCII space/tab/CR/LF at the outer edge and the remainder.
struct EdgeWhitespace<'s> {
    leading: &'s str,
    leading_ascii: &'s str,
    leading_non_ascii: &'s str,
    trailing: &'s str,
    trailing_non_ascii: &'s str,
    trailing_ascii: &'s str,
}

fn is_ascii_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

impl<'s> EdgeWhitespace<'s> {
    fn of(s: &'s str) -> Self {
        let leading = &s[..s.len() - s.trim_start().len()];
        let ascii_len = leading.len() - leading.trim_start_matches(is_ascii_whitespace).len();
        let (leading_ascii, leading_non_ascii) = leading.split_at(ascii_len);

        // All-whitespace text is attributed entirely to the leading edge.
        let rest = &s[leading.len()..];
        let trailing = &rest[rest.trim_end().len()..];
        let non_ascii_len = trailing.trim_end_matches(is_ascii_whitespace).len();
        let (trailing_non_ascii, trailing_ascii) = trailing.split_at(non_ascii_len);

        Self {
            leading,
            leading_ascii,
            leading_non_ascii,
            trailing,
            trailing_non_ascii,
            trailing_ascii,
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// A node in the tree being rendered, with parent context and annotations.
///
/// Annotations are computed once when the view is created and never change.
#[derive(Debug, Clone)]
pub struct NodeRef<'a> {
    /// The node itself
    pub node: &'a Node,
    parent: Option<&'a NodeRef<'a>>,
    index: usize,
    is_block: bool,
    is_code: bool,
    is_blank: bool,
    flanking: FlankingWhitespace,
}

impl<'a> NodeRef<'a> {
    /// View of the conversion root. The root is a container only: it is not
    /// annotated and no rule is applied to it.
    pub fn root(node: &'a Node) -> Self {
        Self {
            node,
            parent: None,
            index: 0,
            is_block: node.is_element() && is_block(&node.node_name),
            is_code: false,
            is_blank: false,
            flanking: FlankingWhitespace::default(),
        }
    }

    /// Annotated view of `child`, the child at `index` of this node.
    pub(crate) fn child<'s>(
        &'s self,
        child: &'s Node,
        index: usize,
        options: &TurndownOptions,
    ) -> NodeRef<'s> {
        let is_block = child.is_element() && is_block(&child.node_name);
        let is_code = child.is_named("code") || self.is_code;
        let mut view = NodeRef {
            node: child,
            parent: Some(self),
            index,
            is_block,
            is_code,
            is_blank: child.is_blank(),
            flanking: FlankingWhitespace::default(),
        };
        view.flanking = view.compute_flanking_whitespace(options);
        view
    }

    fn compute_flanking_whitespace(&self, options: &TurndownOptions) -> FlankingWhitespace {
        if self.is_block || (options.preformatted_code && self.is_code) {
            return FlankingWhitespace::default();
        }

        let text = self.node.text_content();
        let edges = EdgeWhitespace::of(&text);

        let leading = if !edges.leading_ascii.is_empty() && self.is_flanked_by_whitespace(Side::Left, options) {
            edges.leading_non_ascii
        } else {
            edges.leading
        };
        let trailing = if !edges.trailing_ascii.is_empty() && self.is_flanked_by_whitespace(Side::Right, options) {
            edges.trailing_non_ascii
        } else {
            edges.trailing
        };

        FlankingWhitespace {
            leading: leading.to_string(),
            trailing: trailing.to_string(),
        }
    }

    /// Whether the sibling on `side` already supplies a separating space.
    fn is_flanked_by_whitespace(&self, side: Side, options: &TurndownOptions) -> bool {
        let sibling = match side {
            Side::Left => self.previous_sibling(),
            Side::Right => self.next_sibling(),
        };
        let has_space = |s: &str| match side {
            Side::Left => s.ends_with(' '),
            Side::Right => s.starts_with(' '),
        };

        match sibling {
            Some(s) if s.is_text() => has_space(s.node_value.as_deref().unwrap_or("")),
            Some(s) if options.preformatted_code && s.is_named("code") => false,
            Some(s) if s.is_element() && !is_block(&s.node_name) => has_space(&s.text_content()),
            _ => false,
        }
    }

    /// The parent view, if this is not the root
    pub fn parent(&self) -> Option<&NodeRef<'a>> {
        self.parent
    }

    /// Get the parent tag name if known
    pub fn parent_tag(&self) -> Option<String> {
        self.parent.map(|p| p.tag_name())
    }

    fn siblings(&self) -> &'a [Node] {
        self.parent
            .and_then(|p| p.node.children.as_deref())
            .unwrap_or(&[])
    }

    /// The node immediately before this one (any node type)
    pub fn previous_sibling(&self) -> Option<&'a Node> {
        self.index.checked_sub(1).and_then(|i| self.siblings().get(i))
    }

    /// The node immediately after this one (any node type)
    pub fn next_sibling(&self) -> Option<&'a Node> {
        self.siblings().get(self.index + 1)
    }

    /// Position among the parent's element children
    pub fn element_index(&self) -> usize {
        self.siblings()
            .iter()
            .take(self.index)
            .filter(|n| n.is_element())
            .count()
    }

    /// Whether this node is the parent's last element child
    pub fn is_last_element_child(&self) -> bool {
        self.parent.is_some()
            && !self
                .siblings()
                .iter()
                .skip(self.index + 1)
                .any(Node::is_element)
    }

    /// First child of any node type
    pub fn first_child(&self) -> Option<&'a Node> {
        self.node.children().next()
    }

    pub fn is_block(&self) -> bool {
        self.is_block
    }

    /// True for `CODE` elements and everything inside them
    pub fn is_code(&self) -> bool {
        self.is_code
    }

    pub fn is_blank(&self) -> bool {
        self.is_blank
    }

    pub fn flanking_whitespace(&self) -> &FlankingWhitespace {
        &self.flanking
    }

    /// Delegate to Node methods
    pub fn is_named(&self, tag: &str) -> bool {
        self.node.is_named(tag)
    }

    pub fn tag_name(&self) -> String {
        self.node.tag_name()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node.attr(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &'a Node> {
        self.node.children()
    }

    pub fn outer_html(&self) -> String {
        self.node.outer_html()
    }
}
