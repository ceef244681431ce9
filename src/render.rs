// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

//! Reference renderer reading the packed buffers the way a shader would:
//! nodes and triangles addressed by global index across chunks.

use std::{
    fs::File,
    io::BufWriter,
    path::Path,
};

use glam::Vec3;
use indicatif::{
    ParallelProgressIterator,
    ProgressBar,
};
use rand::Rng;
use rayon::iter::{
    IndexedParallelIterator,
    IntoParallelRefMutIterator,
    ParallelIterator,
};
use rgb::Rgb;
use tracing::{
    info,
    instrument,
};

use crate::{
    config::{
        HEIGHT,
        SAMPLES,
        WIDTH,
    },
    error::Result,
    gpu::PackedView,
    kdtree::NODE_STRIDE,
    scene::{
        CameraData,
        LightData,
    },
    types::{
        Aabb,
        Ray,
        TriangleRecord,
        TRIANGLE_STRIDE,
    },
};

pub const ACNE_MIN: f32 = 0.001;
pub const AMBIENT: f32 = 0.1;

pub struct HitRecord {
    pub along:   f32,
    pub point:   Vec3,
    pub normal:  Vec3,
    pub diffuse: Vec3,
}

/// Packed triangle and node arrays of one scene.
#[derive(Clone, Debug)]
pub struct SceneView<'a> {
    pub triangles: PackedView<'a>,
    pub nodes:     PackedView<'a>,
    pub root:      Option<usize>,
}

impl SceneView<'_> {
    pub const fn empty() -> Self {
        Self {
            triangles: PackedView::empty(TRIANGLE_STRIDE),
            nodes:     PackedView::empty(NODE_STRIDE),
            root:      None,
        }
    }

    /// Closest triangle hit nearer than `max_along`.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn hit(
        &self,
        ray: &Ray,
        max_along: f32,
    ) -> Option<HitRecord> {
        let mut closest: Option<(f32, TriangleRecord)> = None;
        let mut limit = max_along;
        let mut search_nodes = vec![self.root?];

        while let Some(idx) = search_nodes.pop() {
            let Some(node) = self.nodes.record(idx) else {
                continue;
            };

            let bounds = Aabb::new(Vec3::from_slice(&node[3..6]), Vec3::from_slice(&node[6..9]));
            match bounds.intersects(ray) {
                Some(entry) if entry < limit => {},
                _ => continue,
            }

            if node[0] >= 0.0 {
                search_nodes.push(node[1] as usize);
                search_nodes.push(node[0] as usize);
                continue;
            }

            for &face in node[9..].iter().take_while(|&&face| face >= 0.0) {
                let Some(record) = self.triangles.record(face as usize) else {
                    continue;
                };
                let triangle = TriangleRecord::read(record);
                if let Some(along) = triangle.intersect(ray).filter(|&along| along < limit) {
                    limit = along;
                    closest = Some((along, triangle));
                }
            }
        }

        closest.map(|(along, triangle)| HitRecord {
            along,
            point: ray.at(along),
            normal: triangle.normal,
            diffuse: triangle.diffuse,
        })
    }
}

/// Pinhole camera with unit focal length.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    position:        Vec3,
    viewport_origin: Vec3,
    delta_u:         Vec3,
    delta_v:         Vec3,
}

impl Camera {
    #[allow(clippy::cast_precision_loss)]
    pub fn new(
        data: &CameraData,
        width: u32,
        height: u32,
    ) -> Self {
        let position = data.position();
        let viewport_height = 2.0 * (data.height_angle.to_radians() / 2.0).tan();
        let viewport_width = viewport_height * (width as f32 / height as f32);

        let focal_w = (-data.look_direction()).normalize_or_zero();
        let focal_u = Vec3::from_array(data.up).cross(focal_w).normalize_or_zero();
        let focal_v = focal_w.cross(focal_u);

        let viewport_u = focal_u * viewport_width;
        let viewport_v = -focal_v * viewport_height;

        let delta_u = viewport_u / width as f32;
        let delta_v = viewport_v / height as f32;

        Self {
            position,
            viewport_origin: position - focal_w - viewport_u / 2.0 - viewport_v / 2.0,
            delta_u,
            delta_v,
        }
    }

    /// Ray through image position `(x, y)` in pixels, top-left origin.
    pub fn ray(
        &self,
        x: f32,
        y: f32,
    ) -> Ray {
        let target = self.viewport_origin + x * self.delta_u + y * self.delta_v;
        Ray::new(self.position, (target - self.position).normalize())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RenderSettings {
    pub width:    u32,
    pub height:   u32,
    pub samples:  u32,
    pub progress: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width:    WIDTH,
            height:   HEIGHT,
            samples:  SAMPLES,
            progress: true,
        }
    }
}

fn sky(ray: &Ray) -> Vec3 {
    let a = 0.5 * (ray.direction.y + 1.0);
    Vec3::ONE * (1.0 - a) + Vec3::new(0.5, 0.7, 1.0) * a
}

/// Lambert plus ambient from a single point light, with hard shadows.
pub fn shade(
    view: &SceneView,
    ray: &Ray,
    light: &LightData,
) -> Vec3 {
    let Some(hit) = view.hit(ray, f32::INFINITY) else {
        return sky(ray);
    };

    let normal = if hit.normal.dot(ray.direction) > 0.0 {
        -hit.normal
    } else {
        hit.normal
    };

    let to_light = Vec3::from_array(light.position) - hit.point;
    let distance = to_light.length();
    let direction = to_light / distance;

    let mut lambert = normal.dot(direction).max(0.0);
    if lambert > 0.0 {
        let shadow = Ray::new(hit.point + normal * ACNE_MIN, direction);
        if view.hit(&shadow, distance).is_some() {
            lambert = 0.0;
        }
    }

    hit.diffuse * (Vec3::splat(AMBIENT) + Vec3::from_array(light.color) * lambert)
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn process_ray(mut input: Vec3) -> Rgb<u16> {
    input = input.clamp(Vec3::ZERO, Vec3::ONE);
    // Gamma correction
    input = input.powf(1.0 / 1.8);

    input *= f32::from(u16::MAX);
    Rgb::new(input.x as u16, input.y as u16, input.z as u16)
}

/// Row-major pixels, top row first.
#[allow(clippy::cast_precision_loss)]
#[instrument(skip_all, fields(width = settings.width, height = settings.height, samples = settings.samples))]
pub fn render(
    view: &SceneView,
    camera: &CameraData,
    light: &LightData,
    settings: &RenderSettings,
) -> Vec<Rgb<u16>> {
    let width = settings.width as usize;
    let camera = Camera::new(camera, settings.width, settings.height);
    let samples = settings.samples.max(1);
    let sample_ratio = 1.0 / samples as f32;

    let mut render_buffer = vec![Rgb::<u16>::default(); width * settings.height as usize];
    let bar = if settings.progress {
        ProgressBar::new(render_buffer.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    let begin_time = std::time::Instant::now();
    render_buffer
        .par_iter_mut()
        .enumerate()
        .progress_with(bar)
        .for_each(|(idx, px)| {
            let y = (idx / width) as f32 + 0.5;
            let x = (idx % width) as f32 + 0.5;
            let mut rng = rand::thread_rng();

            let colored = (0..samples)
                .map(|_| {
                    let (du, dv) = if samples > 1 {
                        (rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5))
                    } else {
                        (0.0, 0.0)
                    };
                    shade(view, &camera.ray(x + du, y + dv), light)
                })
                .sum::<Vec3>();

            *px = process_ray(colored * sample_ratio);
        });

    info!(elapsed = format_args!("{:.2}s", begin_time.elapsed().as_secs_f32()), "Rendered");
    render_buffer
}

/// 16-bit RGB PNG.
#[instrument(skip(pixels))]
pub fn write_png(
    path: &Path,
    width: u32,
    height: u32,
    pixels: &[Rgb<u16>],
) -> Result<()> {
    let mut encoder = png::Encoder::new(BufWriter::new(File::create(path)?), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Sixteen);
    encoder.set_source_gamma(png::ScaledFloat::new(1.0 / 1.8));
    encoder.set_srgb(png::SrgbRenderingIntent::Perceptual);
    let mut writer = encoder.write_header()?;

    let data = pixels
        .iter()
        .flat_map(|px| [px.r, px.g, px.b])
        .flat_map(u16::to_be_bytes)
        .collect::<Vec<_>>();
    writer.write_image_data(&data)?;
    writer.finish()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{
            BuildConfig,
            Tessellation,
        },
        gpu::MemoryDevice,
        scene::SceneDescription,
        viewer::{
            compile,
            CompiledScene,
            GpuScene,
        },
    };

    const CUBES: &str = r#"{
        "root": {
            "children": [
                { "primitives": [{ "shape": "cube" }] },
                {
                    "transformations": [{ "translate": [3, 0, 0] }],
                    "primitives": [{ "shape": "sphere", "material": { "diffuse": [1, 0, 0] } }]
                }
            ]
        }
    }"#;

    fn compiled(json: &str) -> CompiledScene {
        let description = SceneDescription::from_json(json).expect("scene parses");
        let config = BuildConfig {
            tessellation: Tessellation::new(8, 6),
            max_leaf_size: 2,
            ..BuildConfig::default()
        };
        compile(&description, &config).expect("compiles")
    }

    fn brute_force(
        scene: &CompiledScene,
        ray: &Ray,
    ) -> Option<f32> {
        (0..scene.triangles.len())
            .filter_map(|idx| scene.triangles.triangle(idx).intersect(ray))
            .min_by(f32::total_cmp)
    }

    #[test]
    fn ray_hits_front_face_of_cube() {
        let scene = compiled(CUBES);
        let mut device = MemoryDevice::new();
        let gpu = GpuScene::upload(&mut device, &scene, 1 << 20).expect("upload");
        let view = gpu.view(&device).expect("live");

        let hit = view
            .hit(&Ray::new(Vec3::new(0.1, 0.2, 5.0), Vec3::NEG_Z), f32::INFINITY)
            .expect("cube is in front of the ray");
        assert!((hit.along - 4.5).abs() < 1e-5);
        assert!(hit.normal.abs_diff_eq(Vec3::Z, 1e-5));
        gpu.release(&mut device);
    }

    #[test]
    fn chunked_traversal_matches_brute_force() {
        let scene = compiled(CUBES);
        let mut device = MemoryDevice::new();
        // A handful of records per chunk, so most lookups cross chunks.
        let gpu = GpuScene::upload(&mut device, &scene, 5 * TRIANGLE_STRIDE * 4).expect("upload");
        assert!(gpu.nodes.chunk_count() > 1);
        let view = gpu.view(&device).expect("live");

        for i in 0..40 {
            #[allow(clippy::cast_precision_loss)]
            let x = -1.0 + i as f32 * 0.12;
            // Off the tessellation grid lines.
            for y in [-0.45f32, -0.13, 0.07, 0.31] {
                let ray = Ray::new(Vec3::new(x, y, 5.0), Vec3::new(0.01, 0.0, -1.0).normalize());
                let expected = brute_force(&scene, &ray);
                let found = view.hit(&ray, f32::INFINITY).map(|hit| hit.along);
                match (expected, found) {
                    (Some(expected), Some(found)) => assert!((expected - found).abs() < 1e-5),
                    (None, None) => {},
                    other => panic!("mismatch at x {x} y {y}: {other:?}"),
                }
            }
        }
        gpu.release(&mut device);
    }

    #[test]
    fn empty_scene_never_hits() {
        let view = SceneView::empty();
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(view.hit(&ray, f32::INFINITY).is_none());
        assert_eq!(shade(&view, &ray, &LightData::default()), sky(&ray));
    }

    #[test]
    fn render_shows_cube_against_sky() {
        let scene = compiled(r#"{ "root": { "primitives": [{ "shape": "cube" }] } }"#);
        let mut device = MemoryDevice::new();
        let gpu = GpuScene::upload(&mut device, &scene, 1 << 20).expect("upload");
        let view = gpu.view(&device).expect("live");
        let camera = CameraData {
            position: [0.0, 0.0, 5.0],
            ..CameraData::default()
        };
        let settings = RenderSettings {
            width:    8,
            height:   6,
            samples:  1,
            progress: false,
        };

        let pixels = render(&view, &camera, &LightData::default(), &settings);
        assert_eq!(pixels.len(), 48);

        let center = pixels[3 * 8 + 4];
        let corner = pixels[0];
        assert_eq!(center.r, center.g);
        assert_eq!(center.g, center.b);
        assert!(corner.b > corner.r);
        gpu.release(&mut device);
    }

    #[test]
    fn png_is_written() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.png");
        let pixels = vec![process_ray(Vec3::new(1.0, 0.5, 0.0)); 4 * 3];

        write_png(&path, 4, 3, &pixels).expect("encodes");
        let bytes = std::fs::read(&path).expect("written");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn process_ray_clamps() {
        assert_eq!(process_ray(Vec3::splat(2.0)), Rgb::new(u16::MAX, u16::MAX, u16::MAX));
        assert_eq!(process_ray(Vec3::splat(-1.0)), Rgb::new(0, 0, 0));
    }
}
