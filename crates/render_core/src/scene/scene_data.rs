//! Flattened hierarchical scene containers
//!
//! A [`SceneData`] is the unit of scene description the culling tree
//! consumes: a flat array of entries, each either one renderable object or a
//! reference to a nested container. Nested containers are reference-counted,
//! so a sub-scene instanced a hundred times is stored once and referenced a
//! hundred times, each reference carrying its own transform.
//!
//! Every entry knows how many leaf renderables it expands to (`count`), which
//! lets the tree treat the hierarchy as an implicit run-length encoding: the
//! leaves of any entry occupy a contiguous run of `count` slots once expanded.

use std::fmt;
use std::sync::Arc;

use crate::foundation::math::Mat4;
use crate::render::Renderable;
use crate::scene::{Aabb, Light};

/// What a scene entry resolves to
#[derive(Clone)]
pub enum EntrySource {
    /// A single leaf renderable
    Object(Arc<dyn Renderable>),

    /// A nested container representing an instanced sub-scene
    Nested(Arc<SceneData>),
}

impl fmt::Debug for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(object) => write!(f, "Object({:?})", object.kind()),
            Self::Nested(scene) => write!(f, "Nested({} renderables)", scene.renderable_total()),
        }
    }
}

/// One element of a flattened scene array
#[derive(Debug, Clone)]
pub struct SceneEntry {
    /// Transform accumulated from the root container to this entry
    pub matrix: Mat4,

    /// Bounding box already transformed into the owning container's space
    pub aabb: Aabb,

    /// Number of leaf renderables this entry expands to (1 for a leaf)
    pub count: u32,

    /// The renderable or nested container behind this entry
    pub source: EntrySource,
}

/// Flattened hierarchical scene container
#[derive(Debug, Clone, Default)]
pub struct SceneData {
    entries: Vec<SceneEntry>,
    aabb: Aabb,
    lights: Vec<Arc<Light>>,
    renderable_total: u32,
}

impl SceneData {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single renderable with its local-to-container transform
    pub fn add_renderable(&mut self, object: Arc<dyn Renderable>, matrix: &Mat4) {
        let mut aabb = *object.bounding_box();
        debug_assert!(
            !aabb.is_degenerate(),
            "renderables must carry a non-degenerate bounding box"
        );
        aabb.transform(matrix);

        self.renderable_total += 1;
        self.aabb.merge(&aabb);
        self.entries.push(SceneEntry {
            matrix: *matrix,
            aabb,
            count: 1,
            source: EntrySource::Object(object),
        });
    }

    /// Append a nested container as one instanced entry
    ///
    /// The child's lights are hoisted into this container so a renderer only
    /// ever has to look at the root. The entry's weight is the child's total
    /// leaf count; children with no renderables still append an entry, which
    /// the culling tree skips during expansion.
    pub fn merge(&mut self, child: &Arc<Self>, matrix: &Mat4) {
        debug_assert!(
            child.aabb.is_finite(),
            "nested containers must carry finite bounds"
        );

        for light in &child.lights {
            self.lights.push(Arc::clone(light));
        }

        self.renderable_total += child.renderable_total;

        let mut aabb = child.aabb;
        aabb.transform(matrix);
        self.aabb.merge(&aabb);
        self.entries.push(SceneEntry {
            matrix: *matrix,
            aabb,
            count: child.renderable_total,
            source: EntrySource::Nested(Arc::clone(child)),
        });
    }

    /// Append a light
    pub fn add_light(&mut self, light: Arc<Light>) {
        self.lights.push(light);
    }

    /// Apply a transform on top of every entry in this container
    pub fn transform(&mut self, matrix: &Mat4) {
        self.aabb = Aabb::empty();
        for entry in &mut self.entries {
            entry.matrix = matrix * entry.matrix;
            entry.aabb.transform(matrix);
            self.aabb.merge(&entry.aabb);
        }
    }

    /// Remove all entries and lights
    pub fn clear(&mut self) {
        self.renderable_total = 0;
        self.aabb = Aabb::empty();
        self.entries.clear();
        self.lights.clear();
    }

    /// Number of entries (not leaves) in this container
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Access one entry
    pub fn entry(&self, index: usize) -> &SceneEntry {
        &self.entries[index]
    }

    /// Access all entries
    pub fn entries(&self) -> &[SceneEntry] {
        &self.entries
    }

    /// Union bounding box of all entries, in this container's space
    pub fn bounding_box(&self) -> &Aabb {
        &self.aabb
    }

    /// Total number of leaf renderables across all nesting levels
    pub fn renderable_total(&self) -> u32 {
        self.renderable_total
    }

    /// Number of lights, including hoisted ones
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Access one light
    pub fn light(&self, index: usize) -> &Light {
        &self.lights[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::{Geometry, Material, Mesh, MeshInstance, ResourceStore};

    fn unit_mesh_instance(resources: &mut ResourceStore) -> Arc<MeshInstance> {
        let geometry = resources.add_geometry(Geometry::new());
        let material = resources.add_material(Material::new(0));
        let mut mesh = Mesh::new(Aabb::from_center_size(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)));
        mesh.add_section(geometry, material, 12);
        Arc::new(MeshInstance::new(Arc::new(mesh)))
    }

    #[test]
    fn test_renderable_totals_accumulate_through_nesting() {
        let mut resources = ResourceStore::new();
        let instance = unit_mesh_instance(&mut resources);

        let mut inner = SceneData::new();
        inner.add_renderable(instance.clone(), &Mat4::identity());
        inner.add_renderable(instance.clone(), &Mat4::new_translation(&Vec3::new(3.0, 0.0, 0.0)));
        let inner = Arc::new(inner);

        let mut outer = SceneData::new();
        outer.add_renderable(instance, &Mat4::identity());
        outer.merge(&inner, &Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)));
        outer.merge(&inner, &Mat4::new_translation(&Vec3::new(0.0, -5.0, 0.0)));

        assert_eq!(outer.entry_count(), 3);
        assert_eq!(outer.renderable_total(), 5);
        assert_eq!(outer.entry(1).count, 2);
    }

    #[test]
    fn test_merge_hoists_lights() {
        let mut inner = SceneData::new();
        inner.add_light(Arc::new(Light::new(Vec3::zeros(), 10.0)));
        let inner = Arc::new(inner);

        let mut outer = SceneData::new();
        outer.merge(&inner, &Mat4::identity());

        assert_eq!(outer.light_count(), 1);
        assert_eq!(outer.renderable_total(), 0);
    }

    #[test]
    fn test_merge_transforms_child_bounds() {
        let mut resources = ResourceStore::new();
        let instance = unit_mesh_instance(&mut resources);

        let mut inner = SceneData::new();
        inner.add_renderable(instance, &Mat4::identity());
        let inner = Arc::new(inner);

        let mut outer = SceneData::new();
        outer.merge(&inner, &Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0)));

        let bbox = outer.bounding_box();
        assert!(bbox.contains_point(Vec3::new(10.0, 0.0, 0.0)));
        assert!(!bbox.contains_point(Vec3::zeros()));
    }

    #[test]
    fn test_transform_moves_every_entry() {
        let mut resources = ResourceStore::new();
        let instance = unit_mesh_instance(&mut resources);

        let mut scene = SceneData::new();
        scene.add_renderable(instance, &Mat4::identity());
        scene.transform(&Mat4::new_translation(&Vec3::new(0.0, 0.0, -8.0)));

        assert!(scene.bounding_box().contains_point(Vec3::new(0.0, 0.0, -8.0)));
        assert!(!scene.bounding_box().contains_point(Vec3::zeros()));
    }
}
