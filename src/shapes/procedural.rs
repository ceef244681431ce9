// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

//! Unit shapes centered on the origin, all inside [-0.5, 0.5]^3.

use std::f32::consts::{
    FRAC_PI_2,
    PI,
    TAU,
};

use glam::{
    Vec2,
    Vec3,
};

use super::{
    Mesh,
    MeshTriangle,
};
use crate::config::Tessellation;

const RADIUS: f32 = 0.5;

const TORUS_MAJOR: f32 = 0.35;
const TORUS_MINOR: f32 = 0.15;

#[allow(clippy::cast_precision_loss)]
#[inline]
fn step(
    index: u32,
    count: u32,
) -> f32 {
    index as f32 / count as f32
}

#[inline]
fn ring(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

fn push_quad(
    triangles: &mut Vec<MeshTriangle>,
    [a, b, c, d]: [Vec3; 4],
    outward: Vec3,
) {
    triangles.push(MeshTriangle::facing(a, b, c, outward));
    triangles.push(MeshTriangle::facing(a, c, d, outward));
}

/// Twelve triangles at the minimum tessellation, `12 * x * y` in general.
pub fn cube(tessellation: Tessellation) -> Mesh {
    let (sx, sy) = (tessellation.x.max(1), tessellation.y.max(1));
    let faces = [
        (Vec3::X, Vec3::Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::X, Vec3::Y),
    ];

    let mut triangles = Vec::with_capacity(12 * (sx * sy) as usize);
    for (normal, u, v) in faces {
        let corner = |i: u32, j: u32| {
            normal * 0.5 + u * (step(i, sx) - 0.5) + v * (step(j, sy) - 0.5)
        };
        for i in 0..sx {
            for j in 0..sy {
                push_quad(
                    &mut triangles,
                    [corner(i, j), corner(i + 1, j), corner(i + 1, j + 1), corner(i, j + 1)],
                    normal,
                );
            }
        }
    }

    Mesh { triangles }
}

pub fn cylinder(tessellation: Tessellation) -> Mesh {
    let (slices, stacks) = (tessellation.x.max(3), tessellation.y.max(1));
    let point = |slice: u32, height: f32| {
        let around = ring(step(slice, slices) * TAU) * RADIUS;
        Vec3::new(around.x, height, around.y)
    };

    let mut triangles = Vec::new();
    for slice in 0..slices {
        let mid = ring((step(slice, slices) + 0.5 * step(1, slices)) * TAU);
        let outward = Vec3::new(mid.x, 0.0, mid.y);

        for stack in 0..stacks {
            let y0 = step(stack, stacks) - 0.5;
            let y1 = step(stack + 1, stacks) - 0.5;
            push_quad(
                &mut triangles,
                [
                    point(slice, y0),
                    point(slice + 1, y0),
                    point(slice + 1, y1),
                    point(slice, y1),
                ],
                outward,
            );
        }

        for cap in [-0.5f32, 0.5] {
            triangles.push(MeshTriangle::facing(
                Vec3::new(0.0, cap, 0.0),
                point(slice, cap),
                point(slice + 1, cap),
                Vec3::Y * cap.signum(),
            ));
        }
    }

    Mesh { triangles }
}

pub fn cone(tessellation: Tessellation) -> Mesh {
    let (slices, stacks) = (tessellation.x.max(3), tessellation.y.max(1));
    let apex = Vec3::new(0.0, 0.5, 0.0);
    let point = |slice: u32, stack: u32| {
        let along = step(stack, stacks);
        let around = ring(step(slice, slices) * TAU) * RADIUS * (1.0 - along);
        Vec3::new(around.x, along - 0.5, around.y)
    };

    let mut triangles = Vec::new();
    for slice in 0..slices {
        let mid = ring((step(slice, slices) + 0.5 * step(1, slices)) * TAU);
        // Slope normal of a cone with radius 0.5 and height 1.
        let outward = Vec3::new(mid.x, RADIUS, mid.y);

        for stack in 0..stacks - 1 {
            push_quad(
                &mut triangles,
                [
                    point(slice, stack),
                    point(slice + 1, stack),
                    point(slice + 1, stack + 1),
                    point(slice, stack + 1),
                ],
                outward,
            );
        }
        triangles.push(MeshTriangle::facing(
            point(slice, stacks - 1),
            point(slice + 1, stacks - 1),
            apex,
            outward,
        ));

        triangles.push(MeshTriangle::facing(
            Vec3::new(0.0, -0.5, 0.0),
            point(slice, 0),
            point(slice + 1, 0),
            Vec3::NEG_Y,
        ));
    }

    Mesh { triangles }
}

/// Latitude bands run pole to pole; the polar bands are fans.
pub fn sphere(tessellation: Tessellation) -> Mesh {
    let (slices, bands) = (tessellation.x.max(3), tessellation.y.max(2));
    let point = |slice: u32, band: u32| {
        let latitude = -FRAC_PI_2 + step(band, bands) * PI;
        let around = ring(step(slice, slices) * TAU) * latitude.cos();
        Vec3::new(around.x, latitude.sin(), around.y) * RADIUS
    };
    let south = Vec3::new(0.0, -RADIUS, 0.0);
    let north = Vec3::new(0.0, RADIUS, 0.0);

    let mut triangles = Vec::with_capacity(2 * (slices * (bands - 1)) as usize);
    for slice in 0..slices {
        let (a, b) = (point(slice, 1), point(slice + 1, 1));
        triangles.push(MeshTriangle::facing(south, a, b, (south + a + b) / 3.0));

        for band in 1..bands - 1 {
            let quad = [
                point(slice, band),
                point(slice + 1, band),
                point(slice + 1, band + 1),
                point(slice, band + 1),
            ];
            let outward = (quad[0] + quad[2]) * 0.5;
            push_quad(&mut triangles, quad, outward);
        }

        let (a, b) = (point(slice, bands - 1), point(slice + 1, bands - 1));
        triangles.push(MeshTriangle::facing(north, a, b, (north + a + b) / 3.0));
    }

    Mesh { triangles }
}

/// Ring around the Z axis in the XY plane.
pub fn torus(tessellation: Tessellation) -> Mesh {
    let (rings, sides) = (tessellation.x.max(3), tessellation.y.max(3));
    let point = |ring_index: u32, side: u32| {
        let major = ring(step(ring_index, rings) * TAU);
        let minor = ring(step(side, sides) * TAU);
        let center = major.extend(0.0) * TORUS_MAJOR;
        center + (major.extend(0.0) * minor.x + Vec3::Z * minor.y) * TORUS_MINOR
    };
    let tube_center = |turn: f32| ring(turn * TAU).extend(0.0) * TORUS_MAJOR;

    let mut triangles = Vec::with_capacity(2 * (rings * sides) as usize);
    for ring_index in 0..rings {
        let center = tube_center(step(ring_index, rings) + 0.5 * step(1, rings));
        for side in 0..sides {
            let quad = [
                point(ring_index, side),
                point(ring_index + 1, side),
                point(ring_index + 1, side + 1),
                point(ring_index, side + 1),
            ];
            let outward = (quad[0] + quad[1] + quad[2] + quad[3]) * 0.25 - center;
            push_quad(&mut triangles, quad, outward);
        }
    }

    Mesh { triangles }
}
