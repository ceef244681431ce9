// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

mod gltf_mesh;
mod procedural;

use std::{
    collections::HashMap,
    path::PathBuf,
};

pub use gltf_mesh::load_gltf;
use glam::Vec3;
use tracing::{
    debug,
    instrument,
    warn,
};

use crate::{
    config::Tessellation,
    error::Result,
    scene::{
        Primitive,
        SceneInstance,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Cube,
    Cylinder,
    Cone,
    Sphere,
    Torus,
    Mesh(PathBuf),
}

impl ShapeKind {
    /// Unknown shape names, and meshes without a file, become cubes.
    pub fn resolve(primitive: &Primitive) -> Self {
        match primitive.shape.to_ascii_lowercase().as_str() {
            "cube" => Self::Cube,
            "cylinder" => Self::Cylinder,
            "cone" => Self::Cone,
            "sphere" => Self::Sphere,
            "torus" | "special1" => Self::Torus,
            "mesh" => match &primitive.mesh {
                Some(path) => Self::Mesh(path.clone()),
                None => {
                    warn!("Mesh primitive without a file, using a cube");
                    Self::Cube
                },
            },
            other => {
                warn!(shape = other, "Unknown primitive shape, using a cube");
                Self::Cube
            },
        }
    }

    /// Numeric id written into the triangle record tag.
    pub const fn code(&self) -> f32 {
        match self {
            Self::Cube => 0.0,
            Self::Cylinder => 1.0,
            Self::Cone => 2.0,
            Self::Sphere => 3.0,
            Self::Torus => 4.0,
            Self::Mesh(_) => 7.0,
        }
    }

    pub fn tessellate(
        &self,
        tessellation: Tessellation,
    ) -> Result<Mesh> {
        Ok(match self {
            Self::Cube => procedural::cube(tessellation),
            Self::Cylinder => procedural::cylinder(tessellation),
            Self::Cone => procedural::cone(tessellation),
            Self::Sphere => procedural::sphere(tessellation),
            Self::Torus => procedural::torus(tessellation),
            Self::Mesh(path) => load_gltf(path)?,
        })
    }
}

/// Object-space triangle with its face normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshTriangle {
    pub vertices: [Vec3; 3],
    pub normal:   Vec3,
}

impl MeshTriangle {
    pub fn new(
        a: Vec3,
        b: Vec3,
        c: Vec3,
    ) -> Self {
        Self {
            vertices: [a, b, c],
            normal:   (b - a).cross(c - a).normalize(),
        }
    }

    /// Winds the triangle so its normal points along `outward`.
    pub fn facing(
        a: Vec3,
        b: Vec3,
        c: Vec3,
        outward: Vec3,
    ) -> Self {
        let triangle = Self::new(a, b, c);
        if triangle.normal.dot(outward) < 0.0 {
            Self::new(a, c, b)
        } else {
            triangle
        }
    }

    pub fn centroid(&self) -> Vec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<MeshTriangle>,
}

impl Mesh {
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Meshes for every shape kind used by one build, all at the same
/// tessellation.
#[derive(Debug, Default)]
pub struct MeshLibrary {
    tessellation: Tessellation,
    meshes:       HashMap<ShapeKind, Mesh>,
}

impl MeshLibrary {
    pub fn new(tessellation: Tessellation) -> Self {
        Self {
            tessellation,
            meshes: HashMap::new(),
        }
    }

    #[instrument(skip(instances))]
    pub fn for_instances(
        instances: &[SceneInstance],
        tessellation: Tessellation,
    ) -> Result<Self> {
        let mut library = Self::new(tessellation);
        for instance in instances {
            if library.meshes.contains_key(&instance.shape) {
                continue;
            }
            let mesh = instance.shape.tessellate(tessellation)?;
            debug!(shape = ?instance.shape, triangles = mesh.len(), "Tessellated shape");
            library.meshes.insert(instance.shape.clone(), mesh);
        }
        Ok(library)
    }

    pub const fn tessellation(&self) -> Tessellation {
        self.tessellation
    }

    pub fn insert(
        &mut self,
        shape: ShapeKind,
        mesh: Mesh,
    ) {
        self.meshes.insert(shape, mesh);
    }

    pub fn get(
        &self,
        shape: &ShapeKind,
    ) -> Option<&Mesh> {
        self.meshes.get(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Material;

    fn primitive(
        shape: &str,
        mesh: Option<&str>,
    ) -> Primitive {
        Primitive {
            shape:    shape.to_owned(),
            mesh:     mesh.map(PathBuf::from),
            material: Material::default(),
        }
    }

    #[test]
    fn resolves_names_leniently() {
        assert_eq!(ShapeKind::resolve(&primitive("Sphere", None)), ShapeKind::Sphere);
        assert_eq!(ShapeKind::resolve(&primitive("special1", None)), ShapeKind::Torus);
        assert_eq!(ShapeKind::resolve(&primitive("mesh", None)), ShapeKind::Cube);
        assert_eq!(
            ShapeKind::resolve(&primitive("mesh", Some("bunny.glb"))),
            ShapeKind::Mesh(PathBuf::from("bunny.glb"))
        );
        assert_eq!(ShapeKind::resolve(&primitive("special3", None)), ShapeKind::Cube);
    }

    #[test]
    fn facing_flips_inward_winding() {
        let triangle = MeshTriangle::facing(Vec3::ZERO, Vec3::X, Vec3::Y, -Vec3::Z);
        assert_eq!(triangle.normal, -Vec3::Z);
        assert_eq!(triangle.vertices, [Vec3::ZERO, Vec3::Y, Vec3::X]);
    }

    #[test]
    fn library_tessellates_each_kind_once() {
        let instance = |shape| SceneInstance {
            transform: glam::Mat4::IDENTITY,
            shape,
            material: Material::default(),
        };
        let instances = [
            instance(ShapeKind::Cube),
            instance(ShapeKind::Sphere),
            instance(ShapeKind::Cube),
        ];

        let library =
            MeshLibrary::for_instances(&instances, Tessellation::MIN).expect("procedural only");
        assert_eq!(library.get(&ShapeKind::Cube).map(Mesh::len), Some(12));
        assert!(library.get(&ShapeKind::Sphere).is_some());
        assert!(library.get(&ShapeKind::Cone).is_none());
    }

    #[test]
    fn missing_mesh_file_is_an_error() {
        let result = ShapeKind::Mesh(PathBuf::from("does/not/exist.glb")).tessellate(Tessellation::MIN);
        assert!(result.is_err());
    }
}
