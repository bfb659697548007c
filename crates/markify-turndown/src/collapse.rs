//! Whitespace collapsing.
//!
//! Rewrites text nodes so that inter-element whitespace matches what a browser
//! would render: runs of space/tab/CR/LF become one space, spaces next to
//! block boundaries and line breaks disappear, and text nodes left empty are
//! removed. Preformatted subtrees are not touched.
//!
//! The walk visits every element twice, once on entry and once after its last
//! child, so both edges of a block act as boundaries. Nodes are addressed by
//! their index path from the root because the tree is mutated while walking.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{Node, NodeType};
use crate::utilities::{is_block, is_void};

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \r\n\t]+").expect("whitespace pattern"));

/// Collapse whitespace in the tree below `root`. `is_pre` marks nodes whose
/// content must be preserved verbatim.
pub fn collapse_whitespace<F>(root: &mut Node, is_pre: F)
where
    F: Fn(&Node) -> bool,
{
    if root.children().next().is_none() || is_pre(root) {
        return;
    }

    let mut collapser = Collapser {
        is_pre,
        prev_text: None,
        keep_leading_ws: false,
        removed: 0,
    };
    collapser.run(root);
    tracing::trace!(removed = collapser.removed, "Collapsed whitespace");
}

struct Collapser<F> {
    is_pre: F,
    /// Path of the last text node kept
    prev_text: Option<Vec<usize>>,
    keep_leading_ws: bool,
    removed: usize,
}

impl<F> Collapser<F>
where
    F: Fn(&Node) -> bool,
{
    fn run(&mut self, root: &mut Node) {
        let mut path = vec![0];
        // True when `path` was reached by leaving its last child
        let mut leaving = false;

        while !path.is_empty() {
            let Some(node) = node_at(root, &path) else {
                break;
            };

            match node.node_type {
                NodeType::Text => {
                    let raw = node.node_value.as_deref().unwrap_or("");
                    let mut text = WHITESPACE_RUN.replace_all(raw, " ").into_owned();

                    let after_space = self
                        .prev_text
                        .as_ref()
                        .map_or(true, |prev| text_at(root, prev).ends_with(' '));
                    if after_space && !self.keep_leading_ws && text.starts_with(' ') {
                        text.remove(0);
                    }

                    if text.is_empty() {
                        leaving = self.remove_current(root, &mut path);
                        continue;
                    }

                    if let Some(node) = node_at_mut(root, &path) {
                        node.node_value = Some(text);
                    }
                    self.prev_text = Some(path.clone());
                }
                NodeType::Element => {
                    if is_block(&node.node_name) || node.is_named("br") {
                        if let Some(prev) = self.prev_text.take() {
                            strip_trailing_space(root, &prev);
                        }
                        self.keep_leading_ws = false;
                    } else if is_void(&node.node_name) || (self.is_pre)(node) {
                        self.prev_text = None;
                        self.keep_leading_ws = true;
                    } else if self.prev_text.is_some() {
                        self.keep_leading_ws = false;
                    }
                }
                _ => {
                    leaving = self.remove_current(root, &mut path);
                    continue;
                }
            }

            leaving = self.advance(root, &mut path, leaving);
        }

        if let Some(prev) = self.prev_text.take() {
            if strip_trailing_space(root, &prev) {
                remove_at(root, &prev);
                self.removed += 1;
            }
        }
    }

    /// Move `path` to the next node in document order. Returns the new
    /// `leaving` state.
    fn advance(&self, root: &Node, path: &mut Vec<usize>, leaving: bool) -> bool {
        let descend = !leaving
            && node_at(root, path)
                .is_some_and(|node| !(self.is_pre)(node) && node.children().next().is_some());
        if descend {
            path.push(0);
            return false;
        }
        next_sibling_or_parent(root, path)
    }

    /// Remove the node at `path`; `path` then addresses the node that followed
    /// it, or its parent. Returns the new `leaving` state.
    fn remove_current(&mut self, root: &mut Node, path: &mut Vec<usize>) -> bool {
        remove_at(root, path);
        self.removed += 1;

        let Some((&index, parent_path)) = path.split_last() else {
            return true;
        };
        let parent_len = node_at(root, parent_path).map_or(0, |p| p.children().count());
        if index < parent_len {
            false
        } else {
            path.pop();
            true
        }
    }
}

/// Step to the next sibling, or up to the parent when there is none.
fn next_sibling_or_parent(root: &Node, path: &mut Vec<usize>) -> bool {
    let Some(index) = path.pop() else {
        return true;
    };
    let parent_len = node_at(root, path).map_or(0, |p| p.children().count());
    if index + 1 < parent_len {
        path.push(index + 1);
        false
    } else {
        true
    }
}

fn node_at<'n>(root: &'n Node, path: &[usize]) -> Option<&'n Node> {
    path.iter()
        .try_fold(root, |node, &i| node.children.as_ref()?.get(i))
}

fn node_at_mut<'n>(root: &'n mut Node, path: &[usize]) -> Option<&'n mut Node> {
    path.iter()
        .try_fold(root, |node, &i| node.children.as_mut()?.get_mut(i))
}

fn text_at<'n>(root: &'n Node, path: &[usize]) -> &'n str {
    node_at(root, path)
        .and_then(|n| n.node_value.as_deref())
        .unwrap_or("")
}

/// Strip one trailing space from the text node at `path`. Returns true when
/// the node is left empty.
fn strip_trailing_space(root: &mut Node, path: &[usize]) -> bool {
    let Some(value) = node_at_mut(root, path).and_then(|n| n.node_value.as_mut()) else {
        return false;
    };
    if value.ends_with(' ') {
        value.pop();
    }
    value.is_empty()
}

fn remove_at(root: &mut Node, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    if let Some(children) = node_at_mut(root, parent_path).and_then(|p| p.children.as_mut()) {
        if index < children.len() {
            children.remove(index);
        }
    }
}
