//! Lazily expanding bounding-volume tree for frustum culling
//!
//! The tree partitions a flattened scene by recursively splitting runs of
//! entries along the longest axis of their combined bounding box, using a
//! weighted median so nested containers are moved as whole runs and never
//! torn apart. Nested containers are only flattened into individual leaves
//! where culling actually reaches them, so an off-screen sub-scene never
//! pays for its own expansion. That deferral is the dominant
//! optimization in this subsystem.
//!
//! ## Working arrays
//!
//! The tree owns two arrays sized to the scene's total leaf count:
//!
//! - `raw` is the expansion arena. Every entry owns a contiguous range of
//!   `count` raw slots and is stored in the *last* slot of that range, so
//!   expanding it can write its children into its own range in place.
//! - `slots` is the mutable working array the partition operates on; each
//!   element is an index into `raw`. A run occupying slot positions
//!   `[a, a + count - 1]` has *both* boundary slots pointing at its entry,
//!   so a segment can be walked run by run from the front and its last run
//!   located from the back.
//!
//! Nodes are addressed by stable index into an arena reserved for the
//! worst case at reconstruct time; the arena is invalidated wholesale by
//! the next reconstruct.

use std::sync::Arc;

use log::debug;

use crate::core::config::CullingConfig;
use crate::foundation::math::{normal_matrix, Mat4};
use crate::render::{Camera, JobId, RenderJobPool, ResourceStore};
use crate::scene::{Aabb, EntrySource, SceneData, SceneEntry};

#[derive(Debug, Clone)]
struct Node {
    bbox: Aabb,
    children: Option<[u32; 2]>,
    item_count: u32,
    finalized: bool,
}

/// Bounding-volume tree over a flattened scene
///
/// Call [`KdTree::reconstruct`] once per scene change, then
/// [`KdTree::cull`] once per render pass.
#[derive(Debug, Default)]
pub struct KdTree {
    nodes: Vec<Node>,
    slots: Vec<u32>,
    raw: Vec<SceneEntry>,
    scratch: PartitionScratch,
    renderable_total: u32,
    pass_id: u32,
    config: CullingConfig,
}

impl KdTree {
    /// Create a tree with default culling thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree with explicit culling thresholds
    pub fn with_config(config: CullingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Total leaf renderables of the scene the tree was last built over
    pub fn renderable_total(&self) -> u32 {
        self.renderable_total
    }

    /// Rebuild the tree over a scene container
    ///
    /// The working arrays are reused when the scene's leaf count is
    /// unchanged, so rebuilding a same-sized scene allocates nothing. An
    /// empty container is valid and produces a tree that culls to nothing.
    pub fn reconstruct(&mut self, scene: &Arc<SceneData>) {
        self.nodes.clear();

        let total = scene.renderable_total();
        self.renderable_total = total;
        if total == 0 {
            return;
        }

        debug!("reconstructing culling tree over {total} renderables");

        let n = total as usize;
        self.nodes.reserve(n * 2);

        // A single virtual entry representing the whole container; culling
        // expands it on demand.
        let root_entry = SceneEntry {
            matrix: Mat4::identity(),
            aabb: *scene.bounding_box(),
            count: total,
            source: EntrySource::Nested(Arc::clone(scene)),
        };
        debug_assert!(
            !root_entry.aabb.is_degenerate(),
            "scene containers must carry a non-degenerate bounding box"
        );

        if self.raw.len() != n {
            self.raw.clear();
            self.raw.resize(n, root_entry.clone());
            self.slots.clear();
            self.slots.resize(n, 0);
        }
        self.raw[n - 1] = root_entry;
        self.slots[0] = (n - 1) as u32;
        self.slots[n - 1] = (n - 1) as u32;

        self.nodes.push(Node {
            bbox: Aabb::empty(),
            children: None,
            item_count: total,
            finalized: false,
        });
        let bbox = self.expand_and_calculate_bbox(0, total);
        debug_assert!(!bbox.is_degenerate());
        self.nodes[0].bbox = bbox;
    }

    /// Collect and sort the render jobs visible to a camera for one pass
    ///
    /// Clears `out_jobs`, walks the tree, asks every visible leaf's
    /// renderable to emit or extend jobs in the pool, then sorts the
    /// collected jobs by material sort key.
    pub fn cull(
        &mut self,
        pass_id: u32,
        camera: &Camera,
        resources: &mut ResourceStore,
        pool: &mut RenderJobPool,
        out_jobs: &mut Vec<JobId>,
    ) {
        out_jobs.clear();
        self.pass_id = pass_id;
        if self.renderable_total == 0 {
            return;
        }

        self.cull_node(0, 0, camera, resources, pool, out_jobs);
        pool.sort_jobs(out_jobs);
    }

    /// Recursive walk. Returns the node's (possibly tightened) bounding
    /// box so the parent can shrink its own.
    fn cull_node(
        &mut self,
        node: usize,
        start: usize,
        camera: &Camera,
        resources: &mut ResourceStore,
        pool: &mut RenderJobPool,
        out_jobs: &mut Vec<JobId>,
    ) -> Aabb {
        let bbox = self.nodes[node].bbox;
        debug_assert!(bbox.is_finite(), "node bounding boxes must stay finite");

        let Some(hits) = camera.intersects_frustum_count_hits(&bbox) else {
            return bbox;
        };

        let item_count = self.nodes[node].item_count;

        // Stop subdividing when the segment is tiny or the box is (almost)
        // fully contained; splitting it further cannot cull anything.
        if item_count <= self.config.max_node_items || hits >= self.config.containment_plane_hits {
            if !self.nodes[node].finalized {
                let exact = self.finalize_leaf(start, item_count);
                debug_assert!(!exact.is_degenerate());
                let entry = &mut self.nodes[node];
                entry.bbox = exact;
                entry.finalized = true;
            }

            for offset in 0..item_count as usize {
                let raw_index = self.slots[start + offset] as usize;
                let (model, leaf_aabb) = {
                    let entry = &self.raw[raw_index];
                    (entry.matrix, entry.aabb)
                };

                if camera.intersects_frustum_count_hits(&leaf_aabb).is_none() {
                    continue;
                }

                let object = match &self.raw[raw_index].source {
                    EntrySource::Object(object) => Arc::clone(object),
                    EntrySource::Nested(_) => {
                        debug_assert!(false, "finalized segments contain only leaves");
                        continue;
                    }
                };

                let normal = normal_matrix(&(camera.view_matrix() * model));
                object.get_render_jobs(&model, &normal, self.pass_id, resources, pool, out_jobs);
            }

            return self.nodes[node].bbox;
        }

        // Split lazily on first visit.
        let children = if let Some(children) = self.nodes[node].children {
            children
        } else {
            let size = bbox.size();
            let mut axis = 0;
            if size.y > size.x {
                axis = 1;
            }
            if size.z > size[axis] {
                axis = 2;
            }

            let median = {
                let Self {
                    raw,
                    slots,
                    scratch,
                    ..
                } = self;
                let segment = &mut slots[start..start + item_count as usize];
                select_median_and_sort(raw, segment, scratch, axis, item_count / 2)
            };

            let mut children = [0u32; 2];
            let mut child_start = start;
            for (side, count) in [(0usize, median), (1, item_count - median)] {
                debug_assert!(count > 0, "a split must not produce an empty side");
                let child_bbox = self.expand_and_calculate_bbox(child_start, count);
                debug_assert!(!child_bbox.is_degenerate());

                children[side] = self.nodes.len() as u32;
                self.nodes.push(Node {
                    bbox: child_bbox,
                    children: None,
                    item_count: count,
                    finalized: false,
                });
                child_start += count as usize;
            }
            self.nodes[node].children = Some(children);
            children
        };

        let mut merged = Aabb::empty();
        let mut child_start = start;
        for child in children {
            let child_count = self.nodes[child as usize].item_count;
            if child_count > 0 {
                let child_bbox =
                    self.cull_node(child as usize, child_start, camera, resources, pool, out_jobs);
                merged.merge(&child_bbox);
            }
            child_start += child_count as usize;
        }
        self.nodes[node].bbox = merged;
        merged
    }

    /// Replace the nested container at a run-start slot with its children,
    /// re-applying the parent's accumulated transform
    fn expand_item(&mut self, slot_pos: usize) {
        let parent_raw = self.slots[slot_pos] as usize;
        let (parent_matrix, parent_count, list) = {
            let parent = &self.raw[parent_raw];
            let list = match &parent.source {
                EntrySource::Nested(list) => Arc::clone(list),
                EntrySource::Object(_) => {
                    debug_assert!(false, "only nested containers can be expanded");
                    return;
                }
            };
            (parent.matrix, parent.count as usize, list)
        };

        // Children tile the parent's own raw range; the last child's write
        // overwrites the parent entry itself.
        let raw_base = parent_raw + 1 - parent_count;
        let mut raw_end = raw_base;
        let mut slot_offset = 0usize;

        for child in list.entries() {
            if child.count == 0 {
                continue;
            }
            raw_end += child.count as usize;
            let destination = raw_end - 1;

            let mut entry = child.clone();
            entry.matrix = parent_matrix * entry.matrix;
            entry.aabb = child.aabb.transformed(&parent_matrix);
            debug_assert!(
                !entry.aabb.is_degenerate(),
                "empty bounding boxes must not occur"
            );
            self.raw[destination] = entry;

            self.slots[slot_pos + slot_offset] = destination as u32;
            slot_offset += child.count as usize;
            self.slots[slot_pos + slot_offset - 1] = destination as u32;
        }

        debug_assert_eq!(slot_offset, parent_count, "expansion must conserve leaf counts");
    }

    /// Expand every remaining nested container in a segment and return the
    /// exact union of the resulting leaf boxes
    fn finalize_leaf(&mut self, start: usize, count: u32) -> Aabb {
        let mut bbox = Aabb::empty();
        let mut offset = 0usize;
        while offset < count as usize {
            let raw_index = self.slots[start + offset] as usize;
            if matches!(self.raw[raw_index].source, EntrySource::Nested(_)) {
                self.expand_item(start + offset);
                continue; // re-test the slot; the first child landed here
            }
            debug_assert_eq!(self.raw[raw_index].count, 1);
            bbox.merge(&self.raw[raw_index].aabb);
            offset += 1;
        }
        bbox
    }

    /// Expand just enough of a segment to compute a representative
    /// bounding box: only runs wider than half the segment are flattened
    fn expand_and_calculate_bbox(&mut self, start: usize, count: u32) -> Aabb {
        let mut bbox = Aabb::empty();
        let threshold = if count <= 1 { 1 } else { count / 2 };

        let mut offset = 0usize;
        while offset < count as usize {
            loop {
                let entry = &self.raw[self.slots[start + offset] as usize];
                if entry.count <= threshold {
                    break;
                }
                debug_assert!(matches!(entry.source, EntrySource::Nested(_)));
                self.expand_item(start + offset);
            }

            let entry = &self.raw[self.slots[start + offset] as usize];
            bbox.merge(&entry.aabb);
            offset += entry.count as usize;
        }
        bbox
    }
}

/// Reusable run lists for the weighted partition; capacity is retained
/// across frames so a warm tree partitions without allocating.
#[derive(Debug, Default)]
struct PartitionScratch {
    below: Vec<u32>,
    equal: Vec<u32>,
    above: Vec<u32>,
}

/// Weighted quickselect over runs of entries
///
/// Partitions `slots` so that every run left of the returned boundary has
/// an AABB center on `axis` no greater than every run right of it, and the
/// boundary's cumulative leaf count is `k` where the run weights allow it
/// (otherwise the nearest reachable run boundary). Runs move whole; their
/// weights (`count`) drive all position arithmetic.
///
/// Each round takes the segment's last run as pivot, groups runs below /
/// equal / above it through the scratch lists (a stable, exact grouping),
/// writes them back, and recurses into whichever side still contains the
/// wanted order statistic. A `k` landing inside the equal group snaps to
/// the closest run edge there.
fn select_median_and_sort(
    raw: &[SceneEntry],
    slots: &mut [u32],
    scratch: &mut PartitionScratch,
    axis: usize,
    k: u32,
) -> u32 {
    let total = slots.len();
    let count = |slot: u32| raw[slot as usize].count as usize;
    let center = |slot: u32| raw[slot as usize].aabb.center()[axis];

    // A single pre-expanded run spanning the whole segment cannot be split.
    if count(slots[0]) == total {
        return 0;
    }

    #[cfg(debug_assertions)]
    {
        let mut cursor = 0usize;
        while cursor < total {
            cursor += count(slots[cursor]);
        }
        debug_assert_eq!(cursor, total, "weighted runs must tile the segment exactly");
    }

    // Pivot on the last run; slots[total - 1] is its end boundary.
    let pivot = center(slots[total - 1]);

    scratch.below.clear();
    scratch.equal.clear();
    scratch.above.clear();
    let (mut below_weight, mut equal_weight) = (0usize, 0usize);

    let mut offset = 0usize;
    while offset < total {
        let slot = slots[offset];
        let weight = count(slot);
        let value = center(slot);
        if value < pivot {
            scratch.below.push(slot);
            below_weight += weight;
        } else if value > pivot {
            scratch.above.push(slot);
        } else {
            scratch.equal.push(slot);
            equal_weight += weight;
        }
        offset += weight;
    }

    // Write the runs back grouped, both boundary slots per run.
    let mut write = 0usize;
    for &slot in scratch
        .below
        .iter()
        .chain(scratch.equal.iter())
        .chain(scratch.above.iter())
    {
        let weight = count(slot);
        slots[write] = slot;
        slots[write + weight - 1] = slot;
        write += weight;
    }
    debug_assert_eq!(write, total);

    let below_end = below_weight;
    let equal_end = below_weight + equal_weight;

    if (k as usize) < below_end {
        return select_median_and_sort(raw, &mut slots[..below_end], scratch, axis, k);
    }
    if (k as usize) > equal_end {
        return equal_end as u32
            + select_median_and_sort(
                raw,
                &mut slots[equal_end..],
                scratch,
                axis,
                k - equal_end as u32,
            );
    }

    // k lands on or inside the pivot-equal group, whose internal order is
    // arbitrary: snap to the closest run edge there, skipping the segment
    // ends so a split never produces an empty side. At least one interior
    // edge exists, since a group spanning the whole segment as one run was
    // caught by the early return.
    let mut best: Option<usize> = None;
    let mut edge = below_end;
    loop {
        if edge != 0 && edge != total {
            let replace = match best {
                None => true,
                Some(current) => edge.abs_diff(k as usize) < current.abs_diff(k as usize),
            };
            if replace {
                best = Some(edge);
            }
        }
        if edge >= equal_end {
            break;
        }
        edge += count(slots[edge]);
    }
    best.unwrap_or(below_end) as u32
}
