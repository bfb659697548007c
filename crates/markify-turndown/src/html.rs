//! HTML parsing support.
//!
//! Builds the [`Node`] tree from an HTML fragment using scraper (html5ever),
//! so string input goes through the same pipeline as a prebuilt tree.

use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::node::Node;

/// Parse an HTML fragment into a document fragment node.
///
/// Comments are kept as comment nodes; the converter drops them.
///
/// # Example
///
/// ```rust
/// use markify_turndown::{parse_html, TurndownService};
///
/// let fragment = parse_html("<h1>Hello <em>World</em></h1>");
///
/// let service = TurndownService::new();
/// assert_eq!(service.turndown(&fragment).unwrap(), "# Hello *World*");
/// ```
pub fn parse_html(html: &str) -> Node {
    let document = Html::parse_fragment(html);
    let mut fragment = Node::document_fragment();
    append_children(&mut fragment, document.root_element());
    fragment
}

fn append_children(parent: &mut Node, element: ElementRef) {
    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => parent.add_child(Node::text(&text.text)),
            ScraperNode::Comment(comment) => parent.add_child(Node::comment(&comment.comment)),
            ScraperNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    parent.add_child(element_to_node(child_element));
                }
            }
            _ => {}
        }
    }
}

fn element_to_node(element: ElementRef) -> Node {
    let tag = element.value().name();
    let attrs: Vec<(&str, &str)> = element.value().attrs().collect();

    let mut node = if attrs.is_empty() {
        Node::element(tag)
    } else {
        Node::element_with_attrs(tag, attrs)
    };
    append_children(&mut node, element);
    node
}
