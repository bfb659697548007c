//! Rule system for HTML to Markdown conversion.
//!
//! Lookup order for an element:
//!
//! 1. blank elements always use the blank rule;
//! 2. added rules, most recent first, then the built-in CommonMark table;
//! 3. keep filters, most recent first;
//! 4. remove filters, most recent first;
//! 5. the default rule.

mod commonmark;
mod rule;

pub use commonmark::commonmark_rules;
pub use rule::{AppendFn, Filter, PredicateFn, ReplacementFn, ResetFn, Rule};

use indexmap::IndexMap;

use crate::node::NodeRef;
use crate::options::TurndownOptions;
use crate::Result;

/// Collection of rules for conversion
pub struct Rules {
    /// Added and built-in rules in precedence order, keyed by rule name
    rules: IndexMap<String, Rule>,
    /// Keep rules (preserve as HTML)
    keep_rules: Vec<Rule>,
    /// Remove rules (remove entirely)
    remove_rules: Vec<Rule>,
    blank_rule: Rule,
    default_rule: Rule,
}

impl Rules {
    /// Create a new Rules instance with CommonMark rules
    pub fn new() -> Self {
        Self {
            rules: commonmark_rules()
                .into_iter()
                .map(|(key, rule)| (key.to_string(), rule))
                .collect(),
            keep_rules: Vec::new(),
            remove_rules: Vec::new(),
            blank_rule: Rule::new(Filter::predicate(|_, _, _| true), |node, _, _| {
                if node.is_block() {
                    "\n\n".to_string()
                } else {
                    String::new()
                }
            }),
            default_rule: Rule::new(Filter::predicate(|_, _, _| true), |node, content, _| {
                if node.is_block() {
                    format!("\n\n{}\n\n", content)
                } else {
                    content.to_string()
                }
            }),
        }
    }

    /// Add a rule ahead of every existing rule. Adding an existing key
    /// replaces that rule and moves it to the front.
    pub fn add(&mut self, key: &str, rule: Rule) -> Result<()> {
        rule.filter.validate()?;
        tracing::debug!(key, "Registered rule");
        self.rules.shift_insert(0, key.to_string(), rule);
        Ok(())
    }

    /// Add a keep filter
    pub fn keep(&mut self, filter: Filter) -> Result<()> {
        filter.validate()?;
        tracing::debug!(?filter, "Registered keep filter");
        self.keep_rules.insert(
            0,
            Rule::new(filter, |node, _, _| {
                if node.is_block() {
                    format!("\n\n{}\n\n", node.outer_html())
                } else {
                    node.outer_html()
                }
            }),
        );
        Ok(())
    }

    /// Add a remove filter
    pub fn remove(&mut self, filter: Filter) -> Result<()> {
        filter.validate()?;
        tracing::debug!(?filter, "Registered remove filter");
        self.remove_rules
            .insert(0, Rule::new(filter, |_, _, _| String::new()));
        Ok(())
    }

    /// Find the rule for a node. Exactly one rule applies.
    pub fn for_node<'a>(&'a self, node: &NodeRef, options: &TurndownOptions) -> &'a Rule {
        if node.is_blank() {
            return &self.blank_rule;
        }

        let tag = node.tag_name();

        if let Some((key, rule)) = self
            .rules
            .iter()
            .find(|(_, rule)| rule.filter.matches(&tag, node, options))
        {
            tracing::trace!(tag = %tag, rule = %key, "Matched rule");
            return rule;
        }

        if let Some(rule) = self
            .keep_rules
            .iter()
            .find(|rule| rule.filter.matches(&tag, node, options))
        {
            tracing::trace!(tag = %tag, "Keeping element as HTML");
            return rule;
        }

        if let Some(rule) = self
            .remove_rules
            .iter()
            .find(|rule| rule.filter.matches(&tag, node, options))
        {
            tracing::trace!(tag = %tag, "Removing element");
            return rule;
        }

        &self.default_rule
    }

    /// Rules in precedence order, for append and reset hooks
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Look up a rule by key
    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.rules.get(key)
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::new()
    }
}
