//! Notebook node types: properties, rich content, and anchored objects.

use crate::sync::OffsetRange;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Node properties persisted as attributes of the node document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeProperties {
    pub name: String,
    /// Syntax highlighting mode; `custom-colors` marks rich text
    pub syntax: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub is_bold: bool,
    #[serde(default)]
    pub foreground: Option<String>,
    #[serde(default)]
    pub custom_icon_id: u32,
    #[serde(default)]
    pub ts_creation: i64,
    #[serde(default)]
    pub ts_lastsave: i64,
}

impl NodeProperties {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            syntax: RICH_TEXT_SYNTAX.to_string(),
            tags: String::new(),
            is_read_only: false,
            is_bold: false,
            foreground: None,
            custom_icon_id: 0,
            ts_creation: 0,
            ts_lastsave: 0,
        }
    }

    pub fn with_syntax(mut self, syntax: impl Into<String>) -> Self {
        self.syntax = syntax.into();
        self
    }
}

pub const RICH_TEXT_SYNTAX: &str = "custom-colors";

/// Horizontal placement of an anchored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justification {
    #[default]
    Left,
    Center,
    Right,
    Fill,
}

impl Justification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Justification::Left => "left",
            Justification::Center => "center",
            Justification::Right => "right",
            Justification::Fill => "fill",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "center" => Justification::Center,
            "right" => Justification::Right,
            "fill" => Justification::Fill,
            _ => Justification::Left,
        }
    }
}

/// Object anchored at a character offset of the node text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredObject {
    pub char_offset: usize,
    pub justification: Justification,
    pub kind: AnchorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorKind {
    Image {
        png: Vec<u8>,
        link: String,
    },
    EmbeddedFile {
        file_name: String,
        data: Vec<u8>,
        time: i64,
    },
    CodeBox {
        text: String,
        syntax: String,
        width: u32,
        height: u32,
        width_in_pixels: bool,
        highlight_brackets: bool,
        show_line_numbers: bool,
    },
}

impl AnchorKind {
    /// Binary payload stored as a separate attachment file, if any
    pub fn attachment_payload(&self) -> Option<&[u8]> {
        match self {
            AnchorKind::Image { png, .. } => Some(png),
            AnchorKind::EmbeddedFile { data, .. } => Some(data),
            AnchorKind::CodeBox { .. } => None,
        }
    }
}

/// Text plus anchored objects
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeContent {
    pub text: String,
    pub anchors: Vec<AnchoredObject>,
}

impl NodeContent {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            anchors: Vec::new(),
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Restrict the content to a character window.
    ///
    /// Anchors outside `[start, end)` are dropped, the rest are re-based
    /// so their offsets are relative to the window start. A window that runs
    /// to the end of the text also keeps anchors sitting at the end.
    pub fn window(&self, range: OffsetRange) -> NodeContent {
        let (text, kept) = self.window_parts(range);
        let anchors = kept
            .into_iter()
            .map(|(index, offset)| AnchoredObject {
                char_offset: offset,
                ..self.anchors[index].clone()
            })
            .collect();
        NodeContent { text, anchors }
    }

    /// Windowed text plus `(anchor index, re-based offset)` of each kept anchor
    pub fn window_parts(&self, range: OffsetRange) -> (String, Vec<(usize, usize)>) {
        if range.is_full() {
            let kept = self
                .anchors
                .iter()
                .enumerate()
                .map(|(index, anchor)| (index, anchor.char_offset))
                .collect();
            return (self.text.clone(), kept);
        }
        let len = self.char_len();
        let start = range.start.min(len);
        let end = range.end.unwrap_or(len).clamp(start, len);
        let text: String = self.text.chars().skip(start).take(end - start).collect();
        let kept = self
            .anchors
            .iter()
            .enumerate()
            .filter(|(_, anchor)| {
                anchor.char_offset >= start
                    && (anchor.char_offset < end || (end == len && anchor.char_offset == len))
            })
            .map(|(index, anchor)| (index, anchor.char_offset - start))
            .collect();
        (text, kept)
    }
}

/// One notebook node as held by the tree arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub properties: NodeProperties,
    pub content: NodeContent,
}

impl TreeNode {
    pub fn new(id: NodeId, properties: NodeProperties, content: NodeContent) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            properties,
            content,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}
