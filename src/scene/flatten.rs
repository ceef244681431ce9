// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::Mat4;
use tracing::{
    debug,
    instrument,
};

use super::{
    Material,
    SceneNode,
};
use crate::shapes::ShapeKind;

/// One primitive placed in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneInstance {
    pub transform: Mat4,
    pub shape:     ShapeKind,
    pub material:  Material,
}

/// Pre-order walk of the scene tree. Instances come out in the order their
/// primitives are met.
#[instrument(skip_all)]
pub fn flatten(root: &SceneNode) -> Vec<SceneInstance> {
    let mut instances = Vec::new();
    flatten_node(root, Mat4::IDENTITY, &mut instances);
    debug!(instances = instances.len(), "Flattened scene");
    instances
}

fn flatten_node(
    node: &SceneNode,
    parent: Mat4,
    instances: &mut Vec<SceneInstance>,
) {
    let transform = node
        .transformations
        .iter()
        .fold(parent, |current, op| current * op.to_mat4());

    instances.extend(node.primitives.iter().map(|primitive| SceneInstance {
        transform,
        shape: ShapeKind::resolve(primitive),
        material: primitive.material,
    }));

    for child in &node.children {
        flatten_node(child, transform, instances);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::{
        Primitive,
        Transformation,
    };

    fn primitive(shape: &str) -> Primitive {
        Primitive {
            shape:    shape.to_owned(),
            mesh:     None,
            material: Material::default(),
        }
    }

    fn node(
        transformations: Vec<Transformation>,
        primitives: Vec<Primitive>,
        children: Vec<SceneNode>,
    ) -> SceneNode {
        SceneNode {
            transformations,
            primitives,
            children,
        }
    }

    #[test]
    fn every_primitive_becomes_one_instance() {
        let tree = node(vec![], vec![primitive("cube")], vec![
            node(vec![], vec![primitive("sphere"), primitive("cone")], vec![
                node(vec![], vec![], vec![]),
                node(vec![], vec![primitive("torus")], vec![]),
            ]),
            node(vec![], vec![primitive("cylinder")], vec![]),
        ]);

        let instances = flatten(&tree);
        assert_eq!(instances.len(), tree.primitive_count());
        assert_eq!(instances.len(), 5);

        let shapes: Vec<_> = instances.iter().map(|i| i.shape.clone()).collect();
        assert_eq!(shapes, vec![
            ShapeKind::Cube,
            ShapeKind::Sphere,
            ShapeKind::Cone,
            ShapeKind::Torus,
            ShapeKind::Cylinder,
        ]);
    }

    #[test]
    fn child_transform_is_parent_times_own_ops() {
        let scale = Transformation::Scale([2.0, 3.0, 4.0]);
        let translate = Transformation::Translate([1.0, 1.0, 1.0]);
        let tree = node(vec![scale], vec![primitive("cube")], vec![node(
            vec![translate],
            vec![primitive("cube")],
            vec![],
        )]);

        let instances = flatten(&tree);
        let expected_parent = Mat4::from_scale(Vec3::new(2.0, 3.0, 4.0));
        let expected_child = expected_parent * Mat4::from_translation(Vec3::ONE);

        assert_eq!(instances[0].transform, expected_parent);
        assert_eq!(instances[1].transform, expected_child);
        // Translation happens in the parent's scaled space.
        assert_eq!(
            instances[1].transform.transform_point3(Vec3::ZERO),
            Vec3::new(2.0, 3.0, 4.0)
        );
    }

    #[test]
    fn siblings_do_not_see_each_others_ops() {
        let tree = node(vec![], vec![], vec![
            node(vec![Transformation::Translate([5.0, 0.0, 0.0])], vec![primitive("cube")], vec![]),
            node(vec![], vec![primitive("cube")], vec![]),
        ]);

        let instances = flatten(&tree);
        assert_eq!(instances[1].transform, Mat4::IDENTITY);
    }

    #[test]
    fn unknown_shape_falls_back_to_cube() {
        let instances = flatten(&node(vec![], vec![primitive("teapot")], vec![]));
        assert_eq!(instances[0].shape, ShapeKind::Cube);
    }

    #[test]
    fn empty_scene_has_no_instances() {
        assert!(flatten(&SceneNode::default()).is_empty());
    }
}
