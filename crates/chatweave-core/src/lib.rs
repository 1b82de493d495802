//! Chatweave Core Library
//!
//! Platform-agnostic canvas and conversation-graph logic for the Chatweave
//! infinite-canvas chat interface.

pub mod camera;
pub mod connector;
pub mod interaction;
pub mod node;
pub mod store;

pub use camera::Camera;
pub use connector::{Connector, ConnectorKind, layout_connectors};
pub use interaction::{Corner, InteractionController, InteractionState, PointerTarget};
pub use node::{ChatMessage, ChatNode, Direction, NodeId, Role};
pub use store::{NodePatch, NodeStore};
