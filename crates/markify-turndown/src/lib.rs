//! # markify-turndown
//!
//! Convert HTML to Markdown with an ordered set of per-element rules.
//!
//! This is the conversion engine behind Markify. It follows the
//! [turndown](https://github.com/mixmark-io/turndown) model: the input tree is
//! cloned, its whitespace collapsed the way a browser would render it, and
//! every element is rendered by the first rule whose filter matches, with
//! adjacent outputs joined so that at most one blank line separates blocks.
//!
//! ## Design
//!
//! The engine works on an owned [`Node`] tree that follows DOM conventions, so
//! any HTML parser (or a live DOM bridge) can feed it:
//!
//! - **Prebuilt trees**: pass a [`Node`] directly, its children are converted
//! - **HTML strings**: with the default `html` feature, strings are parsed with
//!   scraper first
//! - **Extensible**: rules, keep/remove filters and [`plugins`] change the
//!   output per element
//!
//! ## Example (HTML string)
//!
//! ```rust
//! use markify_turndown::TurndownService;
//!
//! let service = TurndownService::new();
//! let markdown = service
//!     .turndown("<article><h1>T</h1><p>Hello <strong>world</strong></p></article>")
//!     .unwrap();
//! assert_eq!(markdown, "# T\n\nHello **world**");
//! ```
//!
//! ## Example (Node-based)
//!
//! ```rust
//! use markify_turndown::{plugins, Node, TurndownService};
//!
//! let mut service = TurndownService::new();
//! service.use_plugin(plugins::markify).unwrap();
//!
//! let mut del = Node::element("del");
//! del.add_child(Node::text("draft"));
//! let mut body = Node::element("body");
//! body.add_child(del);
//!
//! assert_eq!(service.turndown(&body).unwrap(), "~~draft~~");
//! ```

pub mod collapse;
#[cfg(feature = "html")]
pub mod html;
pub mod node;
mod options;
pub mod plugins;
mod rules;
mod service;
mod utilities;

#[cfg(feature = "html")]
pub use html::parse_html;
pub use node::{FlankingWhitespace, Node, NodeRef, NodeType};
pub use options::{CodeBlockStyle, HeadingStyle, LinkReferenceStyle, LinkStyle, TurndownOptions};
pub use rules::{AppendFn, Filter, PredicateFn, ReplacementFn, ResetFn, Rule, Rules};
pub use service::{join, TurndownInput, TurndownService};
pub use utilities::*;

/// Error type for turndown operations
#[derive(Debug, thiserror::Error)]
pub enum TurndownError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed rule: {0}")]
    MalformedRule(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TurndownError>;
