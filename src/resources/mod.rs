//! CPU-side resource descriptions consumed by the renderer.
//!
//! Geometry, material and image data live here as plain data; the renderer
//! uploads them to the GPU on first use and keys the uploads by the slotmap
//! handles defined below.

pub mod geometry;
pub mod material;
pub mod primitives;
pub mod texture;

pub use geometry::{BoundingBox, Geometry, Vertex};
pub use material::{AlphaMode, Material};
pub use texture::Image;

slotmap::new_key_type! {
    /// Handle to a [`Geometry`] stored in a [`Scene`](crate::scene::Scene).
    pub struct GeometryHandle;
    /// Handle to a [`Material`] stored in a [`Scene`](crate::scene::Scene).
    pub struct MaterialHandle;
    /// Handle to an [`Image`] stored in a [`Scene`](crate::scene::Scene).
    pub struct TextureHandle;
}
