//! Scene container: entities, resource stores and global lighting terms.

use glam::{Mat4, Vec3};
use slotmap::SlotMap;

use crate::resources::{Geometry, GeometryHandle, Image, Material, MaterialHandle, TextureHandle};
use crate::scene::light::Light;
use crate::scene::node::Node;
use crate::scene::transform::Transform;
use crate::scene::{LightHandle, NodeHandle};

/// A decal volume: a unit box in local space whose albedo is projected onto
/// the G-buffer where scene geometry intersects it.
#[derive(Debug, Clone)]
pub struct Decal {
    pub transform: Transform,
    pub albedo_texture: Option<TextureHandle>,
    pub alpha: f32,
}

impl Decal {
    /// World-from-local matrix of the decal box.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        self.transform.local_matrix_as_mat4()
    }
}

/// What a scene entity is: a prefab subtree, a light or a decal volume.
///
/// A tagged variant instead of a subtype hierarchy; per-kind routing is a
/// single `match` wherever an entity is consumed.
#[derive(Debug, Clone)]
pub enum EntityKind {
    Prefab { root: NodeHandle },
    Light(LightHandle),
    Decal(usize),
}

/// One element of the scene.
#[derive(Debug, Clone)]
pub struct Entity {
    pub visible: bool,
    pub transform: Transform,
    pub kind: EntityKind,
}

/// The scene: entities plus the slotmap-keyed resource stores they refer to.
#[derive(Debug, Default)]
pub struct Scene {
    pub entities: Vec<Entity>,

    pub nodes: SlotMap<NodeHandle, Node>,
    pub geometries: SlotMap<GeometryHandle, Geometry>,
    pub materials: SlotMap<MaterialHandle, Material>,
    pub textures: SlotMap<TextureHandle, Image>,
    pub lights: SlotMap<LightHandle, Light>,
    pub decals: Vec<Decal>,

    pub background_color: Vec3,
    pub ambient_light: Vec3,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            background_color: Vec3::new(0.1, 0.1, 0.15),
            ambient_light: Vec3::splat(0.1),
            ..Self::default()
        }
    }

    // ── Resource stores ─────────────────────────────────────────────────────

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryHandle {
        self.geometries.insert(geometry)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    pub fn add_texture(&mut self, image: Image) -> TextureHandle {
        self.textures.insert(image)
    }

    // ── Node hierarchy ──────────────────────────────────────────────────────

    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        self.nodes.insert(node)
    }

    /// Attaches `child` under `parent`, keeping both ends of the link in
    /// sync. A child already attached elsewhere is detached first.
    pub fn attach(&mut self, parent: NodeHandle, child: NodeHandle) {
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
    }

    pub fn detach(&mut self, child: NodeHandle) {
        let Some(old_parent) = self.nodes.get(child).and_then(Node::parent) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(old_parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
    }

    // ── Entities ────────────────────────────────────────────────────────────

    /// Adds a prefab entity rooted at `root` with the given world transform.
    pub fn spawn_prefab(&mut self, root: NodeHandle, transform: Transform) -> usize {
        self.entities.push(Entity {
            visible: true,
            transform,
            kind: EntityKind::Prefab { root },
        });
        self.entities.len() - 1
    }

    /// Adds a light to the scene; the entity list carries a reference so
    /// entity-level visibility toggles apply to lights too.
    pub fn add_light(&mut self, light: Light) -> LightHandle {
        let transform = light.transform.clone();
        let handle = self.lights.insert(light);
        self.entities.push(Entity {
            visible: true,
            transform,
            kind: EntityKind::Light(handle),
        });
        handle
    }

    pub fn add_decal(&mut self, decal: Decal) -> usize {
        let transform = decal.transform.clone();
        self.decals.push(decal);
        let index = self.decals.len() - 1;
        self.entities.push(Entity {
            visible: true,
            transform,
            kind: EntityKind::Decal(index),
        });
        index
    }

    /// Lights that participate in shading this frame (entity visible and
    /// the light still present).
    pub fn active_lights(&self) -> impl Iterator<Item = (LightHandle, &Light)> {
        self.entities.iter().filter_map(|entity| {
            if !entity.visible {
                return None;
            }
            match entity.kind {
                EntityKind::Light(handle) => self.lights.get(handle).map(|l| (handle, l)),
                _ => None,
            }
        })
    }

    /// Decals that should composite onto the G-buffer this frame.
    pub fn active_decals(&self) -> impl Iterator<Item = &Decal> {
        self.entities.iter().filter_map(|entity| {
            if !entity.visible {
                return None;
            }
            match entity.kind {
                EntityKind::Decal(index) => self.decals.get(index),
                _ => None,
            }
        })
    }
}
