//! Plugins bundling the rule changes Markify applies on top of CommonMark.
//!
//! Each plugin is a plain function usable with
//! [`TurndownService::use_plugin`](crate::TurndownService::use_plugin).

use crate::rules::{Filter, Rule};
use crate::{Result, TurndownService};

/// Elements that are page navigation or scripting rather than content
pub const PAGE_CHROME: &[&str] = &["script", "style", "nav", "header", "footer", "aside", "iframe"];

/// `<del>`, `<s>` and `<strike>` as `~~content~~`
pub fn strikethrough(service: &mut TurndownService) -> Result<()> {
    service.add_rule(
        "strikethrough",
        Rule::for_tags(&["del", "s", "strike"], |_, content, _| format!("~~{}~~", content)),
    )?;
    Ok(())
}

/// Drop scripts, styles and page chrome
pub fn strip_page_chrome(service: &mut TurndownService) -> Result<()> {
    service.remove(Filter::tags(PAGE_CHROME))?;
    Ok(())
}

/// Everything Markify registers: strikethrough plus page chrome removal
pub fn markify(service: &mut TurndownService) -> Result<()> {
    strikethrough(service)?;
    strip_page_chrome(service)
}
