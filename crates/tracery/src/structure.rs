//! Graph views over the diagram model.
//!
//! Layout engines that need graph algorithms build one of these views
//! instead of walking the model's link lists directly.

mod entity_graph;

pub use entity_graph::EntityGraph;
