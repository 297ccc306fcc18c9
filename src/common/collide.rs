// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Collision detection against an indexed mesh.
//!
//! Based on "Fast, Minimum Storage Ray/Triangle Intersection" by Tomas
//! Möller and Ben Trumbore. The query is a deliberate brute-force scan over
//! every triangle of every texture group; collision proxies are expected to
//! be low-polygon.

use crate::common::math::vec3_f64;
use crate::common::mesh::MeshData;

use cgmath::{InnerSpace, Vector3};

/// Reports the distance at which movement from `from` toward `to` first
/// strikes a face of the mesh, if it strikes one within the segment at all.
///
/// A zero-length segment is treated as an immediate collision at distance
/// zero. Faces are not backface-culled; a hit is reported from either side.
pub fn hit_distance(mesh: &MeshData, from: Vector3<f32>, to: Vector3<f32>) -> Option<f32> {
    let delta = vec3_f64(to) - vec3_f64(from);
    let mag = delta.magnitude();

    if mag == 0.0 {
        // degenerate movement counts as a collision
        return Some(0.0);
    }

    let dir = delta / mag;
    let dir = Vector3::new(dir.x as f32, dir.y as f32, dir.z as f32);

    let mut nearest: Option<f32> = None;

    for group in mesh.faces() {
        for face in group.chunks(3) {
            let v0 = mesh.positions()[face[0] as usize];
            let v1 = mesh.positions()[face[1] as usize];
            let v2 = mesh.positions()[face[2] as usize];

            if let Some(t) = intersect_face(from, dir, v0, v1, v2) {
                if t >= 0.0 && t as f64 <= mag && nearest.map_or(true, |n| t < n) {
                    nearest = Some(t);
                }
            }
        }
    }

    nearest
}

/// Möller-Trumbore ray/triangle intersection.
///
/// Returns the distance along `dir` (which must be unit length) from `orig`
/// to the triangle's plane, or `None` if the ray misses the triangle or
/// runs parallel to it. The backface culling branch of the paper is
/// omitted.
fn intersect_face(
    orig: Vector3<f32>,
    dir: Vector3<f32>,
    v0: Vector3<f32>,
    v1: Vector3<f32>,
    v2: Vector3<f32>,
) -> Option<f32> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    // the determinant doubles as the denominator of the barycentrics; near
    // zero means the ray lies in the triangle's plane
    let pvec = dir.cross(edge2);
    let det = edge1.dot(pvec);

    if det > -::std::f32::EPSILON && det < ::std::f32::EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;

    let tvec = orig - v0;
    let u = tvec.dot(pvec) * inv_det;
    if u < 0.0 || u > 1.0 {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    Some(edge2.dot(qvec) * inv_det)
}
