// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use std::path::Path;

use tracing::{
    info,
    instrument,
};

use crate::{
    builder::{
        build_triangle_array,
        TriangleArray,
    },
    config::{
        BuildConfig,
        Tessellation,
    },
    error::Result,
    gpu::{
        ChunkedBuffer,
        Device,
    },
    kdtree::{
        ObjectTree,
        TriangleTree,
        NODE_STRIDE,
    },
    render::SceneView,
    scene::{
        flatten,
        CameraData,
        LightData,
        SceneDescription,
        SceneInstance,
    },
    shapes::MeshLibrary,
    types::TRIANGLE_STRIDE,
};

/// CPU side of a built scene.
#[derive(Clone, Debug, Default)]
pub struct CompiledScene {
    pub instances:     Vec<SceneInstance>,
    pub triangles:     TriangleArray,
    pub object_tree:   ObjectTree,
    pub triangle_tree: TriangleTree,
}

/// Runs the whole CPU pipeline: flatten, tessellate, build the triangle
/// array, then both trees.
#[instrument(skip_all, fields(primitives = description.primitive_count()))]
pub fn compile(
    description: &SceneDescription,
    config: &BuildConfig,
) -> Result<CompiledScene> {
    config.validate()?;

    let instances = flatten(&description.root);
    let library = MeshLibrary::for_instances(&instances, config.tessellation)?;
    let triangles = build_triangle_array(&instances, &library);
    let object_tree = ObjectTree::build(&instances);
    let triangle_tree = TriangleTree::build(&triangles, config.max_leaf_size)?;

    Ok(CompiledScene {
        instances,
        triangles,
        object_tree,
        triangle_tree,
    })
}

/// Device side of a built scene. Must be handed back with `release`.
#[must_use = "device buffers leak unless released"]
#[derive(Debug)]
pub struct GpuScene {
    pub triangles: ChunkedBuffer,
    pub nodes:     ChunkedBuffer,
    /// Root node index, -1 for an empty tree.
    pub root:      i64,
}

impl GpuScene {
    #[instrument(skip_all)]
    pub fn upload<D: Device>(
        device: &mut D,
        scene: &CompiledScene,
        max_buffer_size: usize,
    ) -> Result<Self> {
        let triangles = ChunkedBuffer::upload(
            device,
            "triangles",
            TRIANGLE_STRIDE,
            max_buffer_size,
            scene.triangles.as_slice(),
        )?;

        let nodes = match ChunkedBuffer::upload(
            device,
            "nodes",
            NODE_STRIDE,
            max_buffer_size,
            &scene.triangle_tree.to_floats(),
        ) {
            Ok(nodes) => nodes,
            Err(e) => {
                triangles.release(device);
                return Err(e);
            },
        };

        Ok(Self {
            triangles,
            nodes,
            root: scene.triangle_tree.root_index(),
        })
    }

    pub fn release<D: Device>(
        self,
        device: &mut D,
    ) {
        self.triangles.release(device);
        self.nodes.release(device);
    }

    /// `None` if the device lost one of the chunks.
    pub fn view<'a, D: Device>(
        &self,
        device: &'a D,
    ) -> Option<SceneView<'a>> {
        Some(SceneView {
            triangles: self.triangles.view(device)?,
            nodes:     self.nodes.view(device)?,
            root:      usize::try_from(self.root).ok(),
        })
    }
}

#[derive(Debug)]
struct Loaded {
    description: SceneDescription,
    scene:       CompiledScene,
    gpu:         GpuScene,
}

/// The current scene. Owns every device buffer it uploads and hands them
/// back on replace, clear and drop.
#[derive(Debug)]
pub struct Viewer<D: Device> {
    device:       D,
    config:       BuildConfig,
    tessellation: Option<Tessellation>,
    loaded:       Option<Loaded>,
}

impl<D: Device> Viewer<D> {
    pub fn new(
        device: D,
        config: BuildConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            device,
            config,
            tessellation: None,
            loaded: None,
        })
    }

    /// On failure the previous scene stays loaded.
    #[instrument(skip(self))]
    pub fn load_scene_file(
        &mut self,
        path: &Path,
    ) -> Result<()> {
        let mut description = SceneDescription::load(path)?;
        if let Some(base) = path.parent() {
            description.resolve_mesh_paths(base);
        }
        self.load_scene(description)
    }

    /// A scene holding just the mesh at `path`.
    #[instrument(skip(self))]
    pub fn load_mesh(
        &mut self,
        path: &Path,
    ) -> Result<()> {
        self.load_scene(SceneDescription::single_mesh(path))
    }

    pub fn load_scene(
        &mut self,
        description: SceneDescription,
    ) -> Result<()> {
        let config = self.effective_config(&description);
        self.replace(description, &config)
    }

    /// Rebuilds the current scene at the new density. Scene-file settings no
    /// longer override it afterwards.
    #[instrument(skip(self))]
    pub fn set_segments(
        &mut self,
        tessellation: Tessellation,
    ) -> Result<()> {
        let previous = self.tessellation.replace(tessellation);

        let Some(loaded) = self.loaded.as_ref() else {
            return Ok(());
        };
        let description = loaded.description.clone();
        let config = self.effective_config(&description);
        let result = self.replace(description, &config);
        if result.is_err() {
            self.tessellation = previous;
        }
        result
    }

    pub fn clear(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            loaded.gpu.release(&mut self.device);
            info!("Cleared scene");
        }
    }

    fn effective_config(
        &self,
        description: &SceneDescription,
    ) -> BuildConfig {
        let mut config = self.config.with_settings(&description.settings);
        if let Some(tessellation) = self.tessellation {
            config.tessellation = tessellation;
        }
        config
    }

    /// Builds and uploads the new scene before releasing the old one.
    fn replace(
        &mut self,
        description: SceneDescription,
        config: &BuildConfig,
    ) -> Result<()> {
        let scene = compile(&description, config)?;
        let gpu = GpuScene::upload(&mut self.device, &scene, config.max_buffer_size)?;

        info!(
            instances = scene.instances.len(),
            triangles = scene.triangles.len(),
            nodes = scene.triangle_tree.len(),
            root = gpu.root,
            triangle_chunks = gpu.triangles.chunk_count(),
            node_chunks = gpu.nodes.chunk_count(),
            "Loaded scene"
        );

        let previous = self.loaded.replace(Loaded {
            description,
            scene,
            gpu,
        });
        if let Some(previous) = previous {
            previous.gpu.release(&mut self.device);
        }
        Ok(())
    }

    pub const fn device(&self) -> &D {
        &self.device
    }

    pub const fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn description(&self) -> Option<&SceneDescription> {
        self.loaded.as_ref().map(|loaded| &loaded.description)
    }

    pub fn scene(&self) -> Option<&CompiledScene> {
        self.loaded.as_ref().map(|loaded| &loaded.scene)
    }

    pub fn gpu(&self) -> Option<&GpuScene> {
        self.loaded.as_ref().map(|loaded| &loaded.gpu)
    }

    /// Packed buffers of the current scene, empty when nothing is loaded.
    pub fn view(&self) -> Option<SceneView<'_>> {
        match &self.loaded {
            Some(loaded) => loaded.gpu.view(&self.device),
            None => Some(SceneView::empty()),
        }
    }

    pub fn camera(&self) -> CameraData {
        self.description()
            .and_then(|description| description.camera)
            .unwrap_or_default()
    }

    /// First scene light, or a default light when the scene has none.
    pub fn light(&self) -> LightData {
        self.description()
            .and_then(|description| description.lights.first().copied())
            .unwrap_or_default()
    }
}

impl<D: Device> Drop for Viewer<D> {
    fn drop(&mut self) {
        self.clear();
    }
}
