//! In-memory node store and selection state.
//!
//! The store owns every node on the canvas plus the selection set. All
//! lookups by id that miss are silent no-ops: mutations triggered by stale
//! UI events or late completion callbacks must never fail loudly.

use crate::node::{ChatMessage, ChatNode, Direction, NodeId};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Gap between a parent's edge and a directional child, in world units.
/// Leaves room for the connector curve and its arrowhead.
pub const DIRECTIONAL_GAP: f64 = 100.0;
/// Vertical gap between the lower merge parent and the merged child.
pub const MERGE_GAP: f64 = 120.0;

/// Partial update applied to a node. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodePatch {
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub is_active: Option<bool>,
    pub is_loading: Option<bool>,
    pub model: Option<String>,
    pub usage_type: Option<String>,
    pub title: Option<String>,
}

impl NodePatch {
    /// Patch that only moves a node.
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// Patch that activates a node (deactivating every other node).
    pub fn activate() -> Self {
        Self {
            is_active: Some(true),
            ..Self::default()
        }
    }
}

/// All nodes on the canvas, keyed by id, plus selection state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeStore {
    /// Node records keyed by id.
    nodes: HashMap<NodeId, ChatNode>,
    /// Insertion order of nodes (oldest first).
    order: Vec<NodeId>,
    /// Ids currently selected for batch operations and merging.
    selection: Vec<NodeId>,
}

impl NodeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root node at the given position. The new node becomes the
    /// single active node.
    pub fn create_root(&mut self, position: Point) -> NodeId {
        let node = ChatNode::new(position);
        let id = node.id;
        self.insert(node);
        self.apply_patch(id, NodePatch::activate());
        log::debug!("created root node {id}");
        id
    }

    /// Create a child offset from `parent_id`'s edge in `direction`.
    ///
    /// The child inherits the parent's model and usage tags and does not
    /// become active. Returns `None` without touching the store if the
    /// parent does not exist.
    pub fn create_directional_child(
        &mut self,
        parent_id: NodeId,
        direction: Direction,
    ) -> Option<NodeId> {
        let parent = self.nodes.get(&parent_id)?;
        let mut node = ChatNode::new(directional_position(parent.rect(), direction));
        node.parent_ids = vec![parent_id];
        node.connection_direction = Some(direction);
        node.model = parent.model.clone();
        node.usage_type = parent.usage_type.clone();
        let id = node.id;
        self.insert(node);
        log::debug!("created child {id} of {parent_id} towards {direction:?}");
        Some(id)
    }

    /// Create a merge node descending from `source_id` and `target_id`.
    ///
    /// The merge starts empty and loading; its first message is filled in
    /// asynchronously by the summary generation. Placed at the horizontal
    /// midpoint of the parents, below the lower of the two. Returns `None`
    /// without touching the store unless both parents exist.
    pub fn create_merge(&mut self, source_id: NodeId, target_id: NodeId) -> Option<NodeId> {
        let source = self.nodes.get(&source_id)?;
        let target = self.nodes.get(&target_id)?;

        let x = (source.position.x + target.position.x) / 2.0;
        let y = source.rect().y1.max(target.rect().y1) + MERGE_GAP;

        let mut node = ChatNode::new(Point::new(x, y));
        node.parent_ids = vec![source_id, target_id];
        node.is_loading = true;
        node.model = source.model.clone();
        node.usage_type = source.usage_type.clone();
        node.title = Some(format!(
            "{} + {}",
            source.display_title(),
            target.display_title()
        ));
        let id = node.id;
        self.insert(node);
        log::debug!("created merge {id} of {source_id} and {target_id}");
        Some(id)
    }

    /// Merge `patch` into the node matching `id`. No-op if the id is gone.
    ///
    /// Setting `is_active = true` forces every other node inactive in the
    /// same call; at most one node is ever active.
    pub fn apply_patch(&mut self, id: NodeId, patch: NodePatch) {
        if !self.nodes.contains_key(&id) {
            return;
        }
        if patch.is_active == Some(true) {
            for node in self.nodes.values_mut() {
                node.is_active = false;
            }
        }
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(size) = patch.size {
            node.size = size;
        }
        if let Some(active) = patch.is_active {
            node.is_active = active;
        }
        if let Some(loading) = patch.is_loading {
            node.is_loading = loading;
        }
        if let Some(model) = patch.model {
            node.model = model;
        }
        if let Some(usage_type) = patch.usage_type {
            node.usage_type = usage_type;
        }
        if let Some(title) = patch.title {
            node.title = Some(title);
        }
    }

    /// Append a message to a node's conversation. No-op if the id is gone.
    pub fn push_message(&mut self, id: NodeId, message: ChatMessage) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.messages.push(message);
        }
    }

    /// Replace a node's conversation wholesale (merge summaries). No-op if
    /// the id is gone.
    pub fn replace_messages(&mut self, id: NodeId, messages: Vec<ChatMessage>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.messages = messages;
        }
    }

    /// Set a node's loading flag. No-op if the id is gone.
    pub fn set_loading(&mut self, id: NodeId, loading: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.is_loading = loading;
        }
    }

    /// Remove a node and drop it from the selection set.
    ///
    /// Deletion does not cascade: children keep the dangling parent id and
    /// connector layout skips the missing edge.
    pub fn delete(&mut self, id: NodeId) {
        self.nodes.remove(&id);
        self.order.retain(|&n| n != id);
        self.selection.retain(|&n| n != id);
    }

    /// Add or remove an id from the selection set. Missing ids cannot be
    /// selected.
    pub fn toggle_select(&mut self, id: NodeId) {
        if let Some(pos) = self.selection.iter().position(|&n| n == id) {
            self.selection.remove(pos);
        } else if self.nodes.contains_key(&id) {
            self.selection.push(id);
        }
    }

    /// Ids currently selected, in selection order.
    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    /// Check whether a node is selected.
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }

    /// Force every node inactive (canvas-background click).
    pub fn deactivate_all(&mut self) {
        for node in self.nodes.values_mut() {
            node.is_active = false;
        }
    }

    /// The single active node, if any.
    pub fn active_node(&self) -> Option<NodeId> {
        self.nodes.values().find(|n| n.is_active).map(|n| n.id)
    }

    /// Case-insensitive substring search over titles and message contents.
    /// Results follow insertion order.
    pub fn search(&self, query: &str) -> Vec<NodeId> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| {
                node.title
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(&needle))
                    || node
                        .messages
                        .iter()
                        .any(|m| m.content.to_lowercase().contains(&needle))
            })
            .map(|node| node.id)
            .collect()
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&ChatNode> {
        self.nodes.get(&id)
    }

    /// Check whether a node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterate nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ChatNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Number of nodes in the store.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Union of every node's world-space rectangle. `None` when empty;
    /// callers treat that as "nothing to fit".
    pub fn bounds(&self) -> Option<Rect> {
        let mut result: Option<Rect> = None;
        for node in self.nodes.values() {
            let rect = node.rect();
            result = Some(match result {
                Some(r) => r.union(rect),
                None => rect,
            });
        }
        result
    }

    /// Serialize the store to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a store from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn insert(&mut self, node: ChatNode) {
        self.order.push(node.id);
        self.nodes.insert(node.id, node);
    }
}

/// Position for a child spawned from `parent` in `direction`, centered on
/// the perpendicular axis with a fixed gap between the facing edges.
fn directional_position(parent: Rect, direction: Direction) -> Point {
    let size = crate::node::DEFAULT_NODE_SIZE;
    match direction {
        Direction::Top => Point::new(
            parent.center().x - size.width / 2.0,
            parent.y0 - DIRECTIONAL_GAP - size.height,
        ),
        Direction::Bottom => Point::new(
            parent.center().x - size.width / 2.0,
            parent.y1 + DIRECTIONAL_GAP,
        ),
        Direction::Left => Point::new(
            parent.x0 - DIRECTIONAL_GAP - size.width,
            parent.center().y - size.height / 2.0,
        ),
        Direction::Right => Point::new(
            parent.x1 + DIRECTIONAL_GAP,
            parent.center().y - size.height / 2.0,
        ),
    }
}
