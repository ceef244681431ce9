// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

//! Hierarchical scene description as read from a scene file, and the
//! flattener that turns it into world-space instances.

mod flatten;

use std::path::{
    Path,
    PathBuf,
};

pub use flatten::{
    flatten,
    SceneInstance,
};
use glam::{
    Mat4,
    Vec3,
};
use serde::Deserialize;

use crate::{
    config::Settings,
    error::{
        Error,
        Result,
    },
};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDescription {
    #[serde(default)]
    pub camera:   Option<CameraData>,
    #[serde(default)]
    pub lights:   Vec<LightData>,
    #[serde(default)]
    pub settings: Settings,
    pub root:     SceneNode,
}

impl SceneDescription {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| Error::SceneFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// A scene made of a single mesh file at the origin.
    pub fn single_mesh(path: impl Into<PathBuf>) -> Self {
        Self {
            root: SceneNode {
                primitives: vec![Primitive {
                    shape:    "mesh".to_owned(),
                    mesh:     Some(path.into()),
                    material: Material::default(),
                }],
                ..SceneNode::default()
            },
            ..Self::default()
        }
    }

    pub fn primitive_count(&self) -> usize {
        self.root.primitive_count()
    }

    /// Makes relative mesh paths relative to `base` instead of the working
    /// directory.
    pub fn resolve_mesh_paths(
        &mut self,
        base: &Path,
    ) {
        self.root.resolve_mesh_paths(base);
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneNode {
    #[serde(default)]
    pub transformations: Vec<Transformation>,
    #[serde(default)]
    pub primitives:      Vec<Primitive>,
    #[serde(default)]
    pub children:        Vec<SceneNode>,
}

impl SceneNode {
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
            + self
                .children
                .iter()
                .map(Self::primitive_count)
                .sum::<usize>()
    }

    fn resolve_mesh_paths(
        &mut self,
        base: &Path,
    ) {
        for mesh in self.primitives.iter_mut().filter_map(|prim| prim.mesh.as_mut()) {
            if mesh.is_relative() {
                *mesh = base.join(&*mesh);
            }
        }
        for child in &mut self.children {
            child.resolve_mesh_paths(base);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transformation {
    Scale([f32; 3]),
    /// `angle` is in degrees.
    Rotate { axis: [f32; 3], angle: f32 },
    Translate([f32; 3]),
    /// Row-major, as written in the file.
    Matrix([f32; 16]),
}

impl Transformation {
    pub fn to_mat4(&self) -> Mat4 {
        match *self {
            Self::Scale(scale) => Mat4::from_scale(Vec3::from_array(scale)),
            Self::Rotate { axis, angle } => {
                Mat4::from_axis_angle(Vec3::from_array(axis).normalize(), angle.to_radians())
            },
            Self::Translate(offset) => Mat4::from_translation(Vec3::from_array(offset)),
            Self::Matrix(rows) => Mat4::from_cols_array(&rows).transpose(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Primitive {
    pub shape:    String,
    #[serde(default)]
    pub mesh:     Option<PathBuf>,
    #[serde(default)]
    pub material: Material,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Material {
    #[serde(default = "Material::default_diffuse")]
    pub diffuse: [f32; 3],
    #[serde(default)]
    pub ambient: [f32; 3],
}

impl Material {
    const fn default_diffuse() -> [f32; 3] {
        [1.0, 1.0, 1.0]
    }

    pub fn diffuse(&self) -> Vec3 {
        Vec3::from_array(self.diffuse)
    }

    pub fn ambient(&self) -> Vec3 {
        Vec3::from_array(self.ambient)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Self::default_diffuse(),
            ambient: [0.0; 3],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraData {
    pub position:     [f32; 3],
    /// Point to look at. Ignored when `look` is given.
    #[serde(default)]
    pub look_at:      Option<[f32; 3]>,
    /// Look direction.
    #[serde(default)]
    pub look:         Option<[f32; 3]>,
    #[serde(default = "CameraData::default_up")]
    pub up:           [f32; 3],
    /// Vertical field of view in degrees.
    #[serde(default = "CameraData::default_height_angle")]
    pub height_angle: f32,
}

impl CameraData {
    const fn default_up() -> [f32; 3] {
        [0.0, 1.0, 0.0]
    }

    const fn default_height_angle() -> f32 {
        45.0
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn look_direction(&self) -> Vec3 {
        match (self.look, self.look_at) {
            (Some(look), _) => Vec3::from_array(look),
            (None, Some(target)) => Vec3::from_array(target) - self.position(),
            (None, None) => -self.position(),
        }
    }
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            position:     [12.0, 12.0, 12.0],
            look_at:      Some([0.0; 3]),
            look:         None,
            up:           Self::default_up(),
            height_angle: Self::default_height_angle(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightData {
    pub position: [f32; 3],
    #[serde(default = "Material::default_diffuse")]
    pub color:    [f32; 3],
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            position: [3.0; 3],
            color:    [1.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "camera": { "position": [0, 0, 5], "look_at": [0, 0, 0] },
        "lights": [{ "position": [1, 2, 3] }],
        "root": {
            "transformations": [{ "scale": [2, 2, 2] }],
            "primitives": [{ "shape": "cube", "material": { "diffuse": [1, 0, 0] } }],
            "children": [{
                "transformations": [
                    { "rotate": { "axis": [0, 1, 0], "angle": 90 } },
                    { "translate": [1, 0, 0] }
                ],
                "primitives": [{ "shape": "sphere" }, { "shape": "cone" }]
            }]
        }
    }"#;

    #[test]
    fn parses_nested_description() {
        let scene = SceneDescription::from_json(SCENE).expect("scene parses");

        assert_eq!(scene.primitive_count(), 3);
        assert_eq!(scene.lights.len(), 1);
        assert_eq!(scene.lights[0].color, [1.0; 3]);
        assert_eq!(scene.root.children[0].transformations.len(), 2);
        assert_eq!(scene.root.primitives[0].material.diffuse, [1.0, 0.0, 0.0]);
        assert_eq!(scene.root.children[0].primitives[0].material, Material::default());
    }

    #[test]
    fn malformed_description_is_an_error() {
        assert!(SceneDescription::from_json("{ \"root\": ").is_err());
        assert!(SceneDescription::from_json(r#"{ "root": { "shapes": [] } }"#).is_err());
        assert!(SceneDescription::from_json(r#"{ "root": { "transformations": [{ "shear": 1 }] } }"#).is_err());
    }

    #[test]
    fn matrix_op_is_row_major() {
        let op = Transformation::Matrix([
            1.0, 0.0, 0.0, 5.0, //
            0.0, 1.0, 0.0, 6.0, //
            0.0, 0.0, 1.0, 7.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        assert_eq!(op.to_mat4(), Mat4::from_translation(Vec3::new(5.0, 6.0, 7.0)));
    }

    #[test]
    fn rotate_op_takes_degrees() {
        let op = Transformation::Rotate {
            axis:  [0.0, 0.0, 2.0],
            angle: 90.0,
        };
        let rotated = op.to_mat4().transform_vector3(Vec3::X);
        assert!(rotated.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn camera_prefers_look_direction() {
        let camera = CameraData {
            look: Some([0.0, 0.0, -1.0]),
            ..CameraData::default()
        };
        assert_eq!(camera.look_direction(), Vec3::NEG_Z);
        assert_eq!(CameraData::default().look_direction(), Vec3::splat(-12.0));
    }

    #[test]
    fn relative_mesh_paths_follow_the_scene_file() {
        let mut scene = SceneDescription::single_mesh("bunny.glb");
        scene.root.children.push(SceneDescription::single_mesh("/abs/teapot.glb").root);
        scene.resolve_mesh_paths(Path::new("/scenes"));

        assert_eq!(scene.root.primitives[0].mesh.as_deref(), Some(Path::new("/scenes/bunny.glb")));
        assert_eq!(
            scene.root.children[0].primitives[0].mesh.as_deref(),
            Some(Path::new("/abs/teapot.glb"))
        );
    }
}
