//! Chat node data model.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique, stable node identifier. Assigned at creation, never reused.
pub type NodeId = Uuid;

/// Nominal node size used when a node is created.
pub const DEFAULT_NODE_SIZE: Size = Size::new(400.0, 200.0);
/// Floor for node width during resize.
pub const MIN_NODE_WIDTH: f64 = 240.0;
/// Floor for node height during resize.
pub const MIN_NODE_HEIGHT: f64 = 120.0;
/// Model tag assigned to fresh root nodes.
pub const DEFAULT_MODEL: &str = "sonar";
/// Usage tag assigned to fresh root nodes.
pub const DEFAULT_USAGE_TYPE: &str = "focus";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a node's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Side of the parent a directional child was spawned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
}

/// A single chat conversation placed on the canvas.
///
/// `parent_ids` holds zero ids for roots, one for directional children and
/// two or more for merges. Parents must exist at creation time; a parent
/// deleted later leaves a dangling reference that connector layout skips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatNode {
    pub id: NodeId,
    /// Top-left corner of the node rectangle, in world coordinates.
    pub position: Point,
    /// Width/height in world units.
    pub size: Size,
    /// Conversation history in insertion order. Append-only while the
    /// conversation runs; replaced wholesale only by merge summaries.
    pub messages: Vec<ChatMessage>,
    /// Ids of the nodes this node descends from.
    pub parent_ids: Vec<NodeId>,
    /// Spawn side for single-parent children; `None` for roots and merges.
    pub connection_direction: Option<Direction>,
    /// At most one node on the canvas is active at a time.
    pub is_active: bool,
    /// True while a generation request for this node is in flight.
    pub is_loading: bool,
    /// Model alias forwarded to the completion backend.
    pub model: String,
    /// Free-form usage tag, copied from the parent on creation.
    pub usage_type: String,
    /// Optional human label.
    pub title: Option<String>,
}

impl ChatNode {
    /// Create a node with default size and tags at the given position.
    pub fn new(position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            size: DEFAULT_NODE_SIZE,
            messages: Vec::new(),
            parent_ids: Vec::new(),
            connection_direction: None,
            is_active: false,
            is_loading: false,
            model: DEFAULT_MODEL.to_string(),
            usage_type: DEFAULT_USAGE_TYPE.to_string(),
            title: None,
        }
    }

    /// The node's world-space rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Center of the node rectangle.
    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Display title, falling back to a fixed label.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}
