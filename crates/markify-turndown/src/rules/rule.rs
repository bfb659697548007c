//! Rule and Filter types for HTML conversion.

use crate::node::NodeRef;
use crate::options::TurndownOptions;
use crate::{Result, TurndownError};

/// Type alias for replacement functions
pub type ReplacementFn = Box<dyn Fn(&NodeRef, &str, &TurndownOptions) -> String + Send + Sync>;

/// Type alias for predicate filters
pub type PredicateFn = Box<dyn Fn(&str, &NodeRef, &TurndownOptions) -> bool + Send + Sync>;

/// Output appended once after the whole document has been rendered
pub type AppendFn = Box<dyn Fn(&TurndownOptions) -> String + Send + Sync>;

/// Clears rule-owned state at the end of a conversion
pub type ResetFn = Box<dyn Fn() + Send + Sync>;

/// A filter determines which elements a rule applies to
pub enum Filter {
    /// Match a single tag name
    TagName(String),
    /// Match any of multiple tag names
    TagNames(Vec<String>),
    /// Match using a predicate function
    Predicate(PredicateFn),
}

impl Filter {
    /// Create a filter for a single tag
    pub fn tag(name: &str) -> Self {
        Filter::TagName(name.to_lowercase())
    }

    /// Create a filter for multiple tags
    pub fn tags(names: &[&str]) -> Self {
        Filter::TagNames(names.iter().map(|s| s.to_lowercase()).collect())
    }

    /// Create a filter with a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str, &NodeRef, &TurndownOptions) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    /// Check if this filter matches a node. `tag` is the lowercase tag name.
    pub fn matches(&self, tag: &str, node: &NodeRef, options: &TurndownOptions) -> bool {
        match self {
            Filter::TagName(t) => t.eq_ignore_ascii_case(tag),
            Filter::TagNames(tags) => tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
            Filter::Predicate(f) => f(tag, node, options),
        }
    }

    /// Reject filters that can never match an element.
    pub fn validate(&self) -> Result<()> {
        fn check_tag(tag: &str) -> Result<()> {
            if tag.is_empty() || tag.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
                return Err(TurndownError::MalformedRule(format!(
                    "`{}` is not a valid tag name",
                    tag
                )));
            }
            Ok(())
        }

        match self {
            Filter::TagName(t) => check_tag(t),
            Filter::TagNames(tags) if tags.is_empty() => Err(TurndownError::MalformedRule(
                "tag name filter needs at least one tag".to_string(),
            )),
            Filter::TagNames(tags) => tags.iter().try_for_each(|t| check_tag(t)),
            Filter::Predicate(_) => Ok(()),
        }
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::TagName(t) => f.debug_tuple("TagName").field(t).finish(),
            Filter::TagNames(tags) => f.debug_tuple("TagNames").field(tags).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A rule defines how to convert a matched HTML element to Markdown
pub struct Rule {
    /// Filter to determine which elements this rule applies to
    pub filter: Filter,
    /// Replacement function that generates Markdown
    pub replacement: ReplacementFn,
    append: Option<AppendFn>,
    reset: Option<ResetFn>,
}

impl Rule {
    /// Create a new rule
    pub fn new<F>(filter: Filter, replacement: F) -> Self
    where
        F: Fn(&NodeRef, &str, &TurndownOptions) -> String + Send + Sync + 'static,
    {
        Self {
            filter,
            replacement: Box::new(replacement),
            append: None,
            reset: None,
        }
    }

    /// Create a rule that matches a single tag
    pub fn for_tag<F>(tag: &str, replacement: F) -> Self
    where
        F: Fn(&NodeRef, &str, &TurndownOptions) -> String + Send + Sync + 'static,
    {
        Self::new(Filter::tag(tag), replacement)
    }

    /// Create a rule that matches multiple tags
    pub fn for_tags<F>(tags: &[&str], replacement: F) -> Self
    where
        F: Fn(&NodeRef, &str, &TurndownOptions) -> String + Send + Sync + 'static,
    {
        Self::new(Filter::tags(tags), replacement)
    }

    /// Attach output to emit after the document, e.g. collected references
    pub fn with_append<F>(mut self, append: F) -> Self
    where
        F: Fn(&TurndownOptions) -> String + Send + Sync + 'static,
    {
        self.append = Some(Box::new(append));
        self
    }

    /// Attach a hook that clears rule state once a conversion is done
    pub fn with_reset<F>(mut self, reset: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Apply this rule's replacement
    pub fn replace(&self, node: &NodeRef, content: &str, options: &TurndownOptions) -> String {
        (self.replacement)(node, content, options)
    }

    /// Run the append hook, if any
    pub fn append(&self, options: &TurndownOptions) -> Option<String> {
        self.append.as_ref().map(|append| append(options))
    }

    /// Run the reset hook, if any
    pub fn reset(&self) {
        if let Some(reset) = &self.reset {
            reset();
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("filter", &self.filter)
            .field("append", &self.append.is_some())
            .field("reset", &self.reset.is_some())
            .finish()
    }
}
