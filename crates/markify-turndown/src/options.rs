//! Configuration options for Markdown rendering.
//!
//! Field names and enum values serialize the way the Markify settings store
//! them (`{"headingStyle": "atx", "codeBlockStyle": "fenced", ...}`), so a
//! saved settings blob can be handed straight to [`TurndownOptions::from_json`].

use serde::{Deserialize, Serialize};

use crate::Result;

/// Heading style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStyle {
    /// Use setext-style headings (underlined with = or -)
    /// Only works for h1 and h2, falls back to ATX for h3-h6
    Setext,
    /// Use ATX-style headings (prefixed with #)
    #[default]
    Atx,
}

/// Code block style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeBlockStyle {
    /// Use indented code blocks (4 spaces)
    Indented,
    /// Use fenced code blocks (```)
    #[default]
    Fenced,
}

/// Link style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    /// Use inline links [text](url)
    #[default]
    Inlined,
    /// Use reference links [text][ref]
    Referenced,
}

/// Reference style for referenced links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkReferenceStyle {
    /// Full reference: [text][label]
    #[default]
    Full,
    /// Collapsed reference: [text][]
    Collapsed,
    /// Shortcut reference: [text]
    Shortcut,
}

/// Options for the conversion. Read-only while a conversion runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TurndownOptions {
    /// Heading style (setext or atx)
    pub heading_style: HeadingStyle,

    /// Horizontal rule string
    pub hr: String,

    /// Bullet list marker
    pub bullet_list_marker: char,

    /// Code block style
    pub code_block_style: CodeBlockStyle,

    /// Fence for fenced code blocks. The first character is the fence
    /// character; the length is the minimum fence size (never below 3).
    pub fence: String,

    /// Emphasis delimiter
    pub em_delimiter: char,

    /// Strong delimiter
    pub strong_delimiter: String,

    /// Link style
    pub link_style: LinkStyle,

    /// Reference style for referenced links
    pub link_reference_style: LinkReferenceStyle,

    /// Marker emitted before the newline of a hard line break
    pub br: String,

    /// Preserve whitespace inside inline `<code>` as well as `<pre>`
    pub preformatted_code: bool,
}

impl Default for TurndownOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            hr: "* * *".to_string(),
            bullet_list_marker: '*',
            code_block_style: CodeBlockStyle::Fenced,
            fence: "```".to_string(),
            em_delimiter: '*',
            strong_delimiter: "**".to_string(),
            link_style: LinkStyle::Inlined,
            link_reference_style: LinkReferenceStyle::Full,
            br: "  ".to_string(),
            preformatted_code: false,
        }
    }
}

impl TurndownOptions {
    /// Upstream turndown defaults: setext headings, indented code, `_` emphasis.
    pub fn classic() -> Self {
        Self {
            heading_style: HeadingStyle::Setext,
            code_block_style: CodeBlockStyle::Indented,
            em_delimiter: '_',
            ..Self::default()
        }
    }

    /// Parse options from a settings JSON object. Missing fields keep their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fence character for fenced code blocks
    pub(crate) fn fence_char(&self) -> char {
        self.fence.chars().next().unwrap_or('`')
    }

    /// Minimum fence length for fenced code blocks
    pub(crate) fn fence_size(&self) -> usize {
        self.fence.chars().count().max(3)
    }
}
