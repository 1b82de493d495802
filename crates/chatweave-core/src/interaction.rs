//! Interaction controller: pointer and wheel events to canvas mutations.
//!
//! Drag, pan and resize sessions are modelled as an explicit state machine
//! carrying the session's start snapshot, instead of mutable state captured
//! ad hoc in event handlers. All positions arriving here are screen
//! coordinates; the controller divides by zoom where world deltas are
//! needed.

use crate::camera::Camera;
use crate::node::{MIN_NODE_HEIGHT, MIN_NODE_WIDTH, NodeId};
use crate::store::{NodePatch, NodeStore};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Corner resize handles on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn is_west(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    fn is_north(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }
}

/// What the pointer landed on, as resolved by the hit-testing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty canvas background.
    Canvas,
    /// A node body, outside its interactive controls.
    Node(NodeId),
    /// A corner resize handle of a node.
    Handle(NodeId, Corner),
}

/// Active interaction session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    /// Panning the canvas; `grab_offset` is pointer minus pan at grab time.
    Panning { grab_offset: Vec2 },
    /// Dragging a node body.
    DraggingNode {
        id: NodeId,
        pointer_start: Point,
        node_start: Point,
    },
    /// Resizing a node from a corner handle.
    ResizingNode {
        id: NodeId,
        corner: Corner,
        pointer_start: Point,
        start_origin: Point,
        start_size: Size,
    },
}

/// Translates raw pointer/wheel events into camera and store mutations.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    state: InteractionState,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl InteractionController {
    /// Create an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session state.
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Begin a session for a pointer-down on `target` at screen `position`.
    ///
    /// Background presses deactivate every node and start panning. Node
    /// presses activate the node and start a drag. Handle presses start a
    /// resize. Stale targets (deleted node ids) leave the controller idle.
    pub fn pointer_down(
        &mut self,
        target: PointerTarget,
        position: Point,
        camera: &Camera,
        store: &mut NodeStore,
    ) {
        match target {
            PointerTarget::Canvas => {
                store.deactivate_all();
                self.state = InteractionState::Panning {
                    grab_offset: position.to_vec2() - camera.pan,
                };
            }
            PointerTarget::Node(id) => {
                let Some(node) = store.get(id) else {
                    self.state = InteractionState::Idle;
                    return;
                };
                let node_start = node.position;
                store.apply_patch(id, NodePatch::activate());
                self.state = InteractionState::DraggingNode {
                    id,
                    pointer_start: position,
                    node_start,
                };
            }
            PointerTarget::Handle(id, corner) => {
                let Some(node) = store.get(id) else {
                    self.state = InteractionState::Idle;
                    return;
                };
                self.state = InteractionState::ResizingNode {
                    id,
                    corner,
                    pointer_start: position,
                    start_origin: node.position,
                    start_size: node.size,
                };
            }
        }
    }

    /// Advance the active session for a pointer-move to screen `position`.
    pub fn pointer_move(&mut self, position: Point, camera: &mut Camera, store: &mut NodeStore) {
        match self.state {
            InteractionState::Idle => {}
            InteractionState::Panning { grab_offset } => {
                camera.pan = position.to_vec2() - grab_offset;
            }
            InteractionState::DraggingNode {
                id,
                pointer_start,
                node_start,
            } => {
                // Screen delta scaled back to world units.
                let delta = (position - pointer_start) / camera.zoom;
                store.apply_patch(id, NodePatch::position(node_start + delta));
            }
            InteractionState::ResizingNode {
                id,
                corner,
                pointer_start,
                start_origin,
                start_size,
            } => {
                let delta = (position - pointer_start) / camera.zoom;
                let (origin, size) = resize_from_corner(start_origin, start_size, corner, delta);
                store.apply_patch(
                    id,
                    NodePatch {
                        position: Some(origin),
                        size: Some(size),
                        ..NodePatch::default()
                    },
                );
            }
        }
    }

    /// End the active session (pointer released).
    pub fn pointer_up(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// End the active session (pointer left the canvas).
    pub fn pointer_leave(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// Apply a wheel scroll to the camera zoom.
    pub fn wheel(&mut self, delta_y: f64, camera: &mut Camera) {
        camera.wheel_zoom(delta_y);
    }
}

/// Resize a rectangle from one corner, keeping the opposite edges fixed and
/// flooring both dimensions at the minimum node size. North/west corners
/// reposition the origin so the far edge does not move even when clamped.
fn resize_from_corner(
    start_origin: Point,
    start_size: Size,
    corner: Corner,
    delta: Vec2,
) -> (Point, Size) {
    let raw_width = if corner.is_west() {
        start_size.width - delta.x
    } else {
        start_size.width + delta.x
    };
    let raw_height = if corner.is_north() {
        start_size.height - delta.y
    } else {
        start_size.height + delta.y
    };

    let width = raw_width.max(MIN_NODE_WIDTH);
    let height = raw_height.max(MIN_NODE_HEIGHT);

    let x = if corner.is_west() {
        start_origin.x + (start_size.width - width)
    } else {
        start_origin.x
    };
    let y = if corner.is_north() {
        start_origin.y + (start_size.height - height)
    } else {
        start_origin.y
    };

    (Point::new(x, y), Size::new(width, height))
}
