// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use tracing::{
    debug,
    instrument,
};

use super::MAX_OBJECTS_PER_LEAF;
use crate::{
    scene::SceneInstance,
    types::{
        Aabb,
        Ray,
    },
};

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectNode {
    pub bounds:   Aabb,
    pub children: Option<(u32, u32)>,
    /// Instance indices, leaves only.
    pub objects:  Vec<usize>,
}

/// Coarse k-d tree over whole instances, each bounded by the box of its
/// transformed unit cube.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectTree {
    nodes:         Vec<ObjectNode>,
    root:          Option<u32>,
    object_bounds: Vec<Aabb>,
}

impl ObjectTree {
    #[instrument(skip_all, fields(objects = instances.len()))]
    pub fn build(instances: &[SceneInstance]) -> Self {
        let object_bounds = instances
            .iter()
            .map(|instance| Aabb::from_unit_cube(&instance.transform))
            .collect::<Vec<_>>();

        if instances.is_empty() {
            return Self::default();
        }

        let mut tree = Self {
            nodes: Vec::with_capacity(instances.len()),
            root: None,
            object_bounds,
        };
        let root = tree.build_node(instances, (0..instances.len()).collect(), 0);
        tree.root = Some(root);

        debug!(nodes = tree.nodes.len(), "Built object tree");
        tree
    }

    fn build_node(
        &mut self,
        instances: &[SceneInstance],
        mut objects: Vec<usize>,
        depth: usize,
    ) -> u32 {
        let bounds = objects
            .iter()
            .fold(Aabb::EMPTY, |bounds, &object| bounds.union(&self.object_bounds[object]));

        let children = if objects.len() <= MAX_OBJECTS_PER_LEAF {
            None
        } else {
            let axis = depth % 3;
            // Stable, so equal positions keep instance order.
            objects.sort_by(|&a, &b| {
                instances[a].transform.w_axis[axis].total_cmp(&instances[b].transform.w_axis[axis])
            });
            let right = objects.split_off(objects.len() / 2);
            let left = std::mem::take(&mut objects);

            let left = self.build_node(instances, left, depth + 1);
            let right = self.build_node(instances, right, depth + 1);
            Some((left, right))
        };

        let idx = u32::try_from(self.nodes.len()).expect("Scene too large");
        self.nodes.push(ObjectNode {
            bounds,
            children,
            objects,
        });
        idx
    }

    pub fn nodes(&self) -> &[ObjectNode] {
        &self.nodes
    }

    pub const fn root(&self) -> Option<u32> {
        self.root
    }

    pub fn root_bounds(&self) -> Aabb {
        self.root
            .map_or(Aabb::EMPTY, |root| self.nodes[root as usize].bounds)
    }

    /// Unit-cube box of one instance.
    pub fn object_bounds(
        &self,
        object: usize,
    ) -> Option<&Aabb> {
        self.object_bounds.get(object)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Instances whose own box overlaps `query`, found through the leaves
    /// whose box overlaps it.
    pub fn query_aabb(
        &self,
        query: &Aabb,
    ) -> Vec<usize> {
        let mut found = Vec::new();
        let mut search_nodes: Vec<u32> = self.root.into_iter().collect();

        while let Some(idx) = search_nodes.pop() {
            let node = &self.nodes[idx as usize];
            if !node.bounds.overlaps(query) {
                continue;
            }
            match node.children {
                Some((left, right)) => {
                    search_nodes.push(right);
                    search_nodes.push(left);
                },
                None => found.extend(
                    node.objects
                        .iter()
                        .filter(|&&object| self.object_bounds[object].overlaps(query)),
                ),
            }
        }

        found.sort_unstable();
        found
    }

    /// Instances stored in leaves the ray enters, with the entry distance of
    /// each instance's own box, nearest first.
    pub fn query_ray(
        &self,
        ray: &Ray,
    ) -> Vec<(usize, f32)> {
        let mut found = Vec::new();
        let mut search_nodes: Vec<u32> = self.root.into_iter().collect();

        while let Some(idx) = search_nodes.pop() {
            let node = &self.nodes[idx as usize];
            if node.bounds.intersects(ray).is_none() {
                continue;
            }
            match node.children {
                Some((left, right)) => {
                    search_nodes.push(right);
                    search_nodes.push(left);
                },
                None => found.extend(node.objects.iter().filter_map(|&object| {
                    self.object_bounds[object]
                        .intersects(ray)
                        .map(|dist| (object, dist))
                })),
            }
        }

        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
    }
}

#[cfg(test)]
mod tests {
    use glam::{
        Mat4,
        Vec3,
    };

    use super::*;
    use crate::{
        scene::Material,
        shapes::ShapeKind,
    };

    fn cube_at(translation: Vec3) -> SceneInstance {
        SceneInstance {
            transform: Mat4::from_translation(translation),
            shape:     ShapeKind::Cube,
            material:  Material::default(),
        }
    }

    fn leaf_sets(tree: &ObjectTree) -> Vec<Vec<usize>> {
        tree.nodes()
            .iter()
            .filter(|node| node.children.is_none())
            .map(|node| node.objects.clone())
            .collect()
    }

    #[test]
    fn distant_cubes_never_share_a_leaf() {
        let instances = [
            cube_at(Vec3::new(-10.0, 0.0, 0.0)),
            cube_at(Vec3::ZERO),
            cube_at(Vec3::new(10.0, 0.0, 0.0)),
        ];
        let tree = ObjectTree::build(&instances);

        for leaf in leaf_sets(&tree) {
            assert!(!(leaf.contains(&0) && leaf.contains(&2)), "leaf {leaf:?}");
        }

        let root = tree.root_bounds();
        assert!((root.min.x + 10.5).abs() < 1e-6);
        assert!((root.max.x - 10.5).abs() < 1e-6);
    }

    #[test]
    fn every_object_lands_in_one_leaf() {
        let instances = (0..17)
            .map(|i| cube_at(Vec3::new((i * 3 % 7) as f32, (i % 4) as f32, -(i as f32))))
            .collect::<Vec<_>>();
        let tree = ObjectTree::build(&instances);

        let mut objects = leaf_sets(&tree).concat();
        objects.sort_unstable();
        assert_eq!(objects, (0..17).collect::<Vec<_>>());
        assert_eq!(tree.root().map(|root| root as usize), Some(tree.len() - 1));
        for node in tree.nodes() {
            assert!(node.objects.len() <= MAX_OBJECTS_PER_LEAF);
        }
    }

    #[test]
    fn empty_scene_has_no_root() {
        let tree = ObjectTree::build(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert!(tree.query_aabb(&Aabb::new(Vec3::splat(-1e6), Vec3::splat(1e6))).is_empty());
        assert!(tree.query_ray(&Ray::new(Vec3::ZERO, Vec3::X)).is_empty());
    }

    #[test]
    fn rotated_instance_box_covers_rotated_cube() {
        let transform = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)) * Mat4::from_rotation_z(0.7);
        let instance = SceneInstance {
            transform,
            shape: ShapeKind::Cube,
            material: Material::default(),
        };
        let tree = ObjectTree::build(&[instance]);
        let bounds = tree.root_bounds();

        for corner in 0..8 {
            let local = Vec3::new(
                if corner & 1 == 0 { -0.5 } else { 0.5 },
                if corner & 2 == 0 { -0.5 } else { 0.5 },
                if corner & 4 == 0 { -0.5 } else { 0.5 },
            );
            let world = transform.transform_point3(local);
            assert!(world.cmpge(bounds.min - 1e-5).all() && world.cmple(bounds.max + 1e-5).all());
        }
    }

    #[test]
    fn queries_find_overlapping_instances() {
        let instances = [
            cube_at(Vec3::new(-10.0, 0.0, 0.0)),
            cube_at(Vec3::ZERO),
            cube_at(Vec3::new(10.0, 0.0, 0.0)),
        ];
        let tree = ObjectTree::build(&instances);

        let near_origin = Aabb::new(Vec3::splat(-0.2), Vec3::splat(0.2));
        assert!(tree.query_aabb(&near_origin).contains(&1));
        assert!(!tree.query_aabb(&near_origin).contains(&2));

        let hits = tree.query_ray(&Ray::new(Vec3::new(-20.0, 0.0, 0.0), Vec3::X));
        let order = hits.iter().map(|&(object, _)| object).collect::<Vec<_>>();
        assert_eq!(order, vec![0, 1, 2]);
        assert!((hits[0].1 - 9.5).abs() < 1e-5);

        assert!(tree
            .query_ray(&Ray::new(Vec3::new(-20.0, 3.0, 0.0), Vec3::X))
            .is_empty());
    }
}
