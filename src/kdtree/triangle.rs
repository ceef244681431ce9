// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use tracing::{
    info,
    instrument,
};

use super::{
    MAX_INDEX_COUNT,
    MAX_LEAF_FACES,
    NODE_STRIDE,
    NO_INDEX,
};
use crate::{
    builder::TriangleArray,
    error::{
        Error,
        Result,
    },
    types::{
        Aabb,
        TriangleRecord,
    },
};

#[derive(Clone, Debug, PartialEq)]
pub struct TriangleNode {
    /// Covers only the triangles below this node.
    pub bounds:   Aabb,
    /// `(left, right)` for internal nodes, `None` for leaves.
    pub children: Option<(u32, u32)>,
    /// Triangle indices, leaves only.
    pub faces:    Vec<u32>,
}

impl TriangleNode {
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn write(
        &self,
        out: &mut Vec<f32>,
    ) {
        #[allow(clippy::cast_precision_loss)]
        let (left, right) = self
            .children
            .map_or((NO_INDEX, NO_INDEX), |(left, right)| (left as f32, right as f32));

        out.extend_from_slice(&[left, right, 0.0]);
        out.extend_from_slice(&self.bounds.min.to_array());
        out.extend_from_slice(&self.bounds.max.to_array());

        #[allow(clippy::cast_precision_loss)]
        let faces = (0..MAX_LEAF_FACES)
            .map(|slot| self.faces.get(slot).map_or(NO_INDEX, |&face| face as f32));
        out.extend(faces);
    }
}

/// K-d tree over the triangles of a `TriangleArray`, split at the centroid
/// median along `depth % 3`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleTree {
    nodes:     Vec<TriangleNode>,
    root:      Option<u32>,
    triangles: usize,
}

impl TriangleTree {
    #[instrument(skip_all, fields(triangles = triangles.len(), max_leaf_size = max_leaf_size))]
    pub fn build(
        triangles: &TriangleArray,
        max_leaf_size: usize,
    ) -> Result<Self> {
        if max_leaf_size == 0 || max_leaf_size > MAX_LEAF_FACES {
            return Err(Error::LeafSize {
                requested: max_leaf_size,
                max:       MAX_LEAF_FACES,
            });
        }

        if triangles.is_empty() {
            info!("No triangles, empty tree");
            return Ok(Self::default());
        }

        check_index_count("triangles", triangles.len())?;
        let count = u32::try_from(triangles.len()).map_err(|_| Error::IndexOverflow {
            what:  "triangles",
            count: triangles.len(),
            max:   MAX_INDEX_COUNT,
        })?;
        let mut builder = Builder {
            triangles,
            max_leaf_size,
            nodes: Vec::with_capacity(2 * triangles.len() / max_leaf_size + 1),
            leaves: 0,
            depth_sum: 0,
            max_depth: 0,
        };
        let root = builder.build_node((0..count).collect(), 0, 0);
        check_index_count("nodes", builder.nodes.len())?;

        #[allow(clippy::cast_precision_loss)]
        let avg_depth = builder.depth_sum as f64 / builder.leaves as f64;
        info!(
            nodes = builder.nodes.len(),
            leaves = builder.leaves,
            avg_depth = format_args!("{avg_depth:.2}"),
            max_depth = builder.max_depth,
            "Built triangle tree"
        );

        Ok(Self {
            nodes:     builder.nodes,
            root:      Some(root),
            triangles: triangles.len(),
        })
    }

    pub fn nodes(&self) -> &[TriangleNode] {
        &self.nodes
    }

    pub const fn root(&self) -> Option<u32> {
        self.root
    }

    /// Root index as written for consumers, -1 when the tree is empty.
    pub fn root_index(&self) -> i64 {
        self.root.map_or(-1, i64::from)
    }

    pub fn root_bounds(&self) -> Aabb {
        self.root
            .map_or(Aabb::EMPTY, |root| self.nodes[root as usize].bounds)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub const fn triangle_count(&self) -> usize {
        self.triangles
    }

    /// Leaves reachable from the root, left to right.
    pub fn leaves(&self) -> Vec<&TriangleNode> {
        let mut leaves = Vec::new();
        let mut search_nodes: Vec<u32> = self.root.into_iter().collect();
        while let Some(idx) = search_nodes.pop() {
            let node = &self.nodes[idx as usize];
            match node.children {
                Some((left, right)) => {
                    search_nodes.push(right);
                    search_nodes.push(left);
                },
                None => leaves.push(node),
            }
        }
        leaves
    }

    /// Every node as `NODE_STRIDE` floats, in array order.
    pub fn to_floats(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.nodes.len() * NODE_STRIDE);
        for node in &self.nodes {
            node.write(&mut out);
        }
        out
    }
}

/// Node and face indices are serialized as floats, so past
/// `MAX_INDEX_COUNT` they would silently round.
fn check_index_count(
    what: &'static str,
    count: usize,
) -> Result<()> {
    if count > MAX_INDEX_COUNT {
        return Err(Error::IndexOverflow {
            what,
            count,
            max: MAX_INDEX_COUNT,
        });
    }
    Ok(())
}

struct Builder<'a> {
    triangles:     &'a TriangleArray,
    max_leaf_size: usize,
    nodes:         Vec<TriangleNode>,

    leaves:    usize,
    depth_sum: usize,
    max_depth: usize,
}

impl Builder<'_> {
    // Axes in a row that split nothing off before falling back to a
    // positional split.
    const MAX_STALLED: usize = 3;

    fn bounds(
        &self,
        faces: &[u32],
    ) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for &face in faces {
            let record = self.triangles.record(face as usize);
            for corner in 0..3 {
                bounds.grow_to_include_point(TriangleRecord::vertex(record, corner));
            }
        }
        bounds
    }

    fn push(
        &mut self,
        node: TriangleNode,
    ) -> u32 {
        let idx = u32::try_from(self.nodes.len()).expect("Tree too large");
        self.nodes.push(node);
        idx
    }

    /// Children are appended before their parent, so the returned index is
    /// always the largest in its subtree.
    fn build_node(
        &mut self,
        faces: Vec<u32>,
        depth: usize,
        stalled: usize,
    ) -> u32 {
        let bounds = self.bounds(&faces);

        if faces.len() <= self.max_leaf_size {
            self.leaves += 1;
            self.depth_sum += depth;
            self.max_depth = self.max_depth.max(depth);
            return self.push(TriangleNode {
                bounds,
                children: None,
                faces,
            });
        }

        let axis = depth % 3;
        let centroids = faces
            .iter()
            .map(|&face| TriangleRecord::centroid_axis(self.triangles.record(face as usize), axis))
            .collect::<Vec<_>>();

        let mut sorted = centroids.clone();
        sorted.sort_by(f32::total_cmp);
        let median = sorted[sorted.len() / 2];

        let (left, right): (Vec<_>, Vec<_>) = faces
            .iter()
            .zip(&centroids)
            .partition(|&(_, &centroid)| centroid < median);
        let mut left = left.into_iter().map(|(&face, _)| face).collect::<Vec<_>>();
        let mut right = right.into_iter().map(|(&face, _)| face).collect::<Vec<_>>();

        let mut stalled = if left.is_empty() || right.is_empty() {
            stalled + 1
        } else {
            0
        };

        if stalled >= Self::MAX_STALLED {
            // Every axis put all centroids on one side; halve by sorted order.
            let mut order = faces.into_iter().zip(centroids).collect::<Vec<_>>();
            order.sort_by(|a, b| a.1.total_cmp(&b.1));
            let half = order.len() / 2;
            left = order[..half].iter().map(|&(face, _)| face).collect();
            right = order[half..].iter().map(|&(face, _)| face).collect();
            stalled = 0;
        }

        let left = self.build_node(left, depth + 1, stalled);
        let right = self.build_node(right, depth + 1, stalled);

        self.push(TriangleNode {
            bounds,
            children: Some((left, right)),
            faces: Vec::new(),
        })
    }
}
