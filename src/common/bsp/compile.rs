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

//! The BSP tree compiler.
//!
//! This is a straightforward implementation of the algorithm from the BSP
//! tree FAQ of comp.graphics.algorithms, extended to carry texture mappings
//! and to keep split triangles anticlockwise. The root selection heuristic
//! (minimize splits and front/back imbalance with equal weight) is due to
//! Tom Hammersley.

use crate::common::bsp::{BspData, BspNode, TriFace};
use crate::common::math::{Plane, PointSide, TriSide};
use crate::common::model::{Triangle, VertexTable};
use crate::common::MAX_MAPS;

use arrayvec::ArrayVec;
use cgmath::{Vector2, Vector3};
use failure::Error;

/// A triangle threaded through the compiler's working lists, carrying its
/// raw vertices and the plane containing it.
#[derive(Clone, Debug)]
struct WorkTri {
    verts: [Vector3<f32>; 3],
    texcoords: [Vector2<f32>; 3],
    tex_index: u16,
    plane: Plane,
}

impl WorkTri {
    fn from_triangle(tri: &Triangle) -> Option<WorkTri> {
        Plane::for_triangle(&tri.vertices).map(|plane| WorkTri {
            verts: tri.vertices,
            texcoords: tri.texcoords,
            tex_index: tri.tex_index,
            plane,
        })
    }

    fn classify(&self, plane: &Plane) -> TriSide {
        plane.classify_triangle(&self.verts)
    }
}

/// A tree node prior to canonicalization: coplanar triangles still carry
/// their raw per-triangle vertices.
struct RawNode {
    plane: Plane,
    tris: Vec<WorkTri>,
    back: Option<Box<RawNode>>,
    front: Option<Box<RawNode>>,
}

#[derive(Debug, Default)]
struct BuildStats {
    nodes: u32,
    depth: u32,
    max_depth: u32,
}

/// Compiles a BSP tree from the given triangle soup.
///
/// Input triangles must be anticlockwise and reference textures in
/// `map_names` by index. Degenerate triangles are dropped with a warning;
/// an input with no usable triangles, an out-of-range texture index, or a
/// model exceeding the format's 16-bit node, depth or vertex limits is an
/// error.
pub fn compile<S>(triangles: &[Triangle], map_names: &[S]) -> Result<BspData, Error>
where
    S: AsRef<str>,
{
    ensure!(!map_names.is_empty(), "No texture maps given");
    ensure!(
        map_names.len() <= MAX_MAPS,
        "Too many texture maps ({})",
        map_names.len()
    );

    let mut work_list = Vec::with_capacity(triangles.len());
    for tri in triangles {
        ensure!(
            (tri.tex_index as usize) < map_names.len(),
            "Out of bounds texture index ({})",
            tri.tex_index
        );

        match WorkTri::from_triangle(tri) {
            Some(work_tri) => work_list.push(work_tri),
            None => warn!("Skipping malformed triangle in input"),
        }
    }
    ensure!(!work_list.is_empty(), "No usable triangles in input");

    debug!("Compiling BSP tree from {} input triangles", work_list.len());

    let mut stats = BuildStats::default();
    let raw_root = build_node(&mut stats, work_list);

    ensure!(
        stats.nodes <= u16::max_value() as u32,
        "Node count exceeds format limit ({})",
        stats.nodes
    );

    // fold the per-triangle vertices of every node through the shared
    // definition table
    let mut table = VertexTable::new();
    let mut map_tri_counts = vec![0u32; map_names.len()];
    let mut num_tri = 0u32;
    let root = canonicalize(raw_root, &mut table, &mut map_tri_counts, &mut num_tri)?;

    debug!(
        "Compiled {} triangles over {} nodes ({} levels, {} vertex definitions)",
        num_tri,
        stats.nodes,
        stats.max_depth,
        table.len()
    );

    let (positions, texcoords, bounds) = table.into_parts();

    Ok(BspData::new(
        map_names.iter().map(|s| s.as_ref().to_owned()).collect(),
        map_tri_counts,
        positions,
        texcoords,
        bounds,
        stats.max_depth as u16,
        stats.nodes as u16,
        num_tri,
        root,
    ))
}

/// Builds the subtree partitioning the given working list.
///
/// The list must be non-empty.
fn build_node(stats: &mut BuildStats, mut list: Vec<WorkTri>) -> RawNode {
    stats.nodes += 1;
    stats.depth += 1;
    if stats.depth > stats.max_depth {
        stats.max_depth = stats.depth;
    }

    let root = select_root(&mut list);
    let plane = root.plane;

    let mut tris = vec![root];
    let mut back_list = Vec::new();
    let mut front_list = Vec::new();

    for tri in list {
        match tri.classify(&plane) {
            TriSide::Coincident => tris.push(tri),
            TriSide::Front => front_list.push(tri),
            TriSide::Back => back_list.push(tri),
            TriSide::Spanning => {
                let (front_split, back_split) = split_tri(&tri, &plane);
                front_list.extend(front_split);
                back_list.extend(back_split);
            }
        }
    }

    let back = match back_list.is_empty() {
        false => Some(Box::new(build_node(stats, back_list))),
        true => None,
    };

    let front = match front_list.is_empty() {
        false => Some(Box::new(build_node(stats, front_list))),
        true => None,
    };

    stats.depth -= 1;

    RawNode {
        plane,
        tris,
        back,
        front,
    }
}

/// Selects and removes the best subdivision root from the given list.
///
/// Every candidate's plane is scored against every other triangle as
/// `splits + |front - back|`, giving split minimization and tree balance
/// equal priority. Ties go to the earlier candidate, and a perfect score of
/// zero ends the scan early. This is O(N²) and dominates compile time.
fn select_root(list: &mut Vec<WorkTri>) -> WorkTri {
    let mut best_index = 0;
    let mut min_score = u64::max_value();

    for (i, candidate) in list.iter().enumerate() {
        let mut splits = 0i64;
        let mut in_front = 0i64;
        let mut in_back = 0i64;

        for (j, test) in list.iter().enumerate() {
            let kind = test.classify(&candidate.plane);

            if j == i {
                // a triangle not coplanar with its own plane means the plane
                // derivation or the point classification is broken
                if kind != TriSide::Coincident {
                    panic!(
                        "Candidate root triangle is not coplanar with its own plane \
                         (classified {:?} against {:?})",
                        kind, candidate.plane
                    );
                }
                continue;
            }

            match kind {
                TriSide::Spanning => splits += 1,
                TriSide::Front => in_front += 1,
                TriSide::Back => in_back += 1,
                TriSide::Coincident => (),
            }
        }

        let score = (splits + (in_front - in_back).abs()) as u64;

        if score < min_score {
            min_score = score;
            best_index = i;
        }

        // no splits and a perfectly balanced subdivision
        if score == 0 {
            break;
        }
    }

    list.remove(best_index)
}

/// Splits a spanning triangle into front and back triangles, preserving the
/// anticlockwise vertex order on both sides.
///
/// Walks the edges in anticlockwise order, maintaining a ring of vertices on
/// each side of the plane. A vertex on the plane joins both rings; an edge
/// whose endpoints lie strictly on opposite sides contributes its
/// intersection point to both rings, with texture coordinates interpolated
/// by the same parameter. A non-coincident plane can cut at most two edges,
/// so each ring ends with three or four vertices and yields one or two
/// triangles. Split products that collapse to degenerate triangles are
/// discarded.
fn split_tri(tri: &WorkTri, plane: &Plane) -> (ArrayVec<[WorkTri; 2]>, ArrayVec<[WorkTri; 2]>) {
    let sides = plane.classify_vertices(&tri.verts);

    let mut front_ring: ArrayVec<[(Vector3<f32>, Vector2<f32>); 4]> = ArrayVec::new();
    let mut back_ring: ArrayVec<[(Vector3<f32>, Vector2<f32>); 4]> = ArrayVec::new();

    for i in 0..3 {
        let vert = (tri.verts[i], tri.texcoords[i]);

        match sides[i] {
            PointSide::Above => front_ring.push(vert),
            PointSide::Below => back_ring.push(vert),
            // a vertex on the plane belongs to both sides
            PointSide::On => {
                front_ring.push(vert);
                back_ring.push(vert);
            }
        }

        // does the edge to the next vertex cross the plane?
        let next = (i + 1) % 3;
        let crosses = match (sides[i], sides[next]) {
            (PointSide::Above, PointSide::Below) => true,
            (PointSide::Below, PointSide::Above) => true,
            _ => false,
        };

        if crosses {
            let (t, point) = plane.intersect_edge(tri.verts[i], tri.verts[next]);

            let tc0 = tri.texcoords[i];
            let tc1 = tri.texcoords[next];
            let texcoord = Vector2::new(
                (tc0.x as f64 + t * (tc1.x as f64 - tc0.x as f64)) as f32,
                (tc0.y as f64 + t * (tc1.y as f64 - tc0.y as f64)) as f32,
            );

            front_ring.push((point, texcoord));
            back_ring.push((point, texcoord));
        }
    }

    if front_ring.len() < 3 || back_ring.len() < 3 {
        panic!("split_tri: asked to split a non-spanning triangle");
    }

    (
        ring_to_tris(&front_ring, tri.tex_index),
        ring_to_tris(&back_ring, tri.tex_index),
    )
}

/// Triangulates a split ring: `(r0, r1, r2)`, plus `(r2, r3, r0)` for a
/// four-vertex ring.
fn ring_to_tris(
    ring: &[(Vector3<f32>, Vector2<f32>)],
    tex_index: u16,
) -> ArrayVec<[WorkTri; 2]> {
    let mut out = ArrayVec::new();

    let mut emit = |a: usize, b: usize, c: usize| {
        let verts = [ring[a].0, ring[b].0, ring[c].0];

        // a sliver cut can collapse; drop it
        if let Some(plane) = Plane::for_triangle(&verts) {
            out.push(WorkTri {
                verts,
                texcoords: [ring[a].1, ring[b].1, ring[c].1],
                tex_index,
                plane,
            });
        }
    };

    emit(0, 1, 2);
    if ring.len() == 4 {
        emit(2, 3, 0);
    }

    out
}

/// Rewrites a raw subtree into canonical form.
///
/// Each triangle's vertices are folded through the shared definition table.
/// Triangles that collapse under folding (repeated indices or a degenerate
/// re-derived plane) are dropped, and the node's partition plane is replaced
/// by the plane re-derived from the first surviving triangle's canonical
/// vertices to cancel the precision lost in folding. A node that loses every
/// triangle keeps its construction plane.
fn canonicalize(
    node: RawNode,
    table: &mut VertexTable,
    map_tri_counts: &mut [u32],
    num_tri: &mut u32,
) -> Result<BspNode, Error> {
    let mut plane = node.plane;
    let mut faces = Vec::with_capacity(node.tris.len());

    for tri in node.tris {
        let (i0, p0) = table.fold(tri.verts[0], tri.texcoords[0])?;
        let (i1, p1) = table.fold(tri.verts[1], tri.texcoords[1])?;
        let (i2, p2) = table.fold(tri.verts[2], tri.texcoords[2])?;

        if i0 == i1 || i1 == i2 || i2 == i0 {
            continue;
        }

        let canon_plane = match Plane::for_triangle(&[p0, p1, p2]) {
            Some(p) => p,
            None => continue,
        };

        if faces.is_empty() {
            plane = canon_plane;
        }

        faces.push(TriFace {
            tex_index: tri.tex_index,
            indices: [i0, i1, i2],
        });

        map_tri_counts[tri.tex_index as usize] += 1;
        *num_tri += 1;
    }

    let back = match node.back {
        Some(b) => Some(Box::new(canonicalize(*b, table, map_tri_counts, num_tri)?)),
        None => None,
    };

    let front = match node.front {
        Some(f) => Some(Box::new(canonicalize(*f, table, map_tri_counts, num_tri)?)),
        None => None,
    };

    Ok(BspNode::new(plane, faces, back, front))
}
