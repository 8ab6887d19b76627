//! Scene graph node.

use crate::resources::{GeometryHandle, MaterialHandle};
use crate::scene::transform::Transform;
use crate::scene::NodeHandle;

/// A node in a prefab hierarchy.
///
/// Nodes form a tree through parent/child handles. A node is drawable when it
/// carries *both* a geometry and a material; nodes with neither are pure
/// transform groups.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    pub transform: Transform,
    pub visible: bool,

    pub geometry: Option<GeometryHandle>,
    pub material: Option<MaterialHandle>,
}

impl Node {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            visible: true,
            geometry: None,
            material: None,
        }
    }

    #[must_use]
    pub fn with_mesh(geometry: GeometryHandle, material: MaterialHandle) -> Self {
        Self {
            geometry: Some(geometry),
            material: Some(material),
            ..Self::new()
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Whether the node contributes a draw call.
    #[inline]
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.geometry.is_some() && self.material.is_some()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}
