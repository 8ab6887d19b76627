//! Scene graph: nodes, transforms, cameras, lights and entities.

pub mod camera;
pub mod light;
pub mod node;
pub mod scene;
pub mod transform;

pub use camera::{Camera, Frustum};
pub use light::{Light, LightKind};
pub use node::Node;
pub use scene::{Decal, Entity, EntityKind, Scene};
pub use transform::Transform;

slotmap::new_key_type! {
    /// Handle to a [`Node`] stored in a [`Scene`].
    pub struct NodeHandle;
    /// Handle to a [`Light`] stored in a [`Scene`].
    pub struct LightHandle;
}
