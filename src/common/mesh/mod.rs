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

//! The indexed mesh format.
//!
//! An indexed mesh is the flat sibling of the compiled BSP tree: the same
//! folded vertex definition table and model bounds, but with the triangles
//! grouped by texture into plain index arrays instead of a tree. It serves
//! both as an interchange form for model data and as a low-polygon collision
//! proxy for the [intersector](crate::common::collide).
//!
//! # File Format
//!
//! A mesh is persisted little-endian as:
//!
//! ```text
//! magic      : 4 bytes, "GLD" plus the terminator
//! version    : u8, major in the high nibble, minor in the low (currently 0x10)
//! nMaps      : u16
//! mapNames   : nMaps NUL-terminated ASCII strings
//! mapTriNums : nMaps x u32, triangles mapped to each texture
//! nVertices  : u16
//! vertCoords : nVertices x 3 x f32
//! texCoords  : nVertices x 2 x f32
//! bounds     : minX, maxX, minY, maxY, minZ, maxZ as f32
//! numTri     : u32
//! triFaces   : for each map i, mapTriNums[i] x 3 x u16 vertex indices
//! ```

mod load;
mod save;

pub use self::load::load;

use crate::common::model::{Bounds, Triangle, VertexTable};
use crate::common::MAX_MAPS;

use cgmath::{Vector2, Vector3};
use failure::Error;

/// File type identifier of a saved mesh, including the terminator.
pub const MAGIC: [u8; 4] = *b"GLD\0";

/// Current mesh format version: major 1, minor 0.
pub const VERSION: u8 = 0x10;

/// An indexed triangle mesh grouped by texture.
#[derive(Debug, PartialEq)]
pub struct MeshData {
    map_names: Vec<String>,
    map_tri_counts: Vec<u32>,

    positions: Vec<Vector3<f32>>,
    texcoords: Vec<Vector2<f32>>,

    bounds: Bounds,

    num_tri: u32,

    // one flat array of 3 * map_tri_counts[i] vertex indices per texture
    faces: Vec<Vec<u16>>,
}

impl MeshData {
    pub(crate) fn new(
        map_names: Vec<String>,
        map_tri_counts: Vec<u32>,
        positions: Vec<Vector3<f32>>,
        texcoords: Vec<Vector2<f32>>,
        bounds: Bounds,
        num_tri: u32,
        faces: Vec<Vec<u16>>,
    ) -> MeshData {
        MeshData {
            map_names,
            map_tri_counts,
            positions,
            texcoords,
            bounds,
            num_tri,
            faces,
        }
    }

    pub fn map_names(&self) -> &[String] {
        &self.map_names
    }

    /// Returns the number of triangles mapped to each texture.
    pub fn map_tri_counts(&self) -> &[u32] {
        &self.map_tri_counts
    }

    /// Returns the canonical vertex positions.
    pub fn positions(&self) -> &[Vector3<f32>] {
        &self.positions
    }

    /// Returns the texture coordinates of the canonical vertices.
    pub fn texcoords(&self) -> &[Vector2<f32>] {
        &self.texcoords
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Returns the total number of triangles across all texture groups.
    pub fn num_tri(&self) -> u32 {
        self.num_tri
    }

    /// Returns the vertex index arrays, one per texture.
    pub fn faces(&self) -> &[Vec<u16>] {
        &self.faces
    }

    /// Explodes the mesh back into a triangle soup, the input form of the
    /// BSP compiler and the mesh builder itself.
    pub fn triangles(&self) -> Vec<Triangle> {
        let mut soup = Vec::with_capacity(self.num_tri as usize);

        for (tex_index, group) in self.faces.iter().enumerate() {
            for face in group.chunks(3) {
                let fetch = |i: usize| {
                    let index = face[i] as usize;
                    (self.positions[index], self.texcoords[index])
                };

                let (v0, t0) = fetch(0);
                let (v1, t1) = fetch(1);
                let (v2, t2) = fetch(2);

                soup.push(Triangle {
                    vertices: [v0, v1, v2],
                    texcoords: [t0, t1, t2],
                    tex_index: tex_index as u16,
                });
            }
        }

        soup
    }
}

/// Builds an indexed mesh from the given triangle soup.
///
/// Vertices are folded through the shared definition table and the surviving
/// triangles grouped by texture. Triangles whose vertices fold onto repeated
/// definitions are dropped with a warning; an out-of-range texture index or
/// an empty input is an error.
pub fn build<S>(triangles: &[Triangle], map_names: &[S]) -> Result<MeshData, Error>
where
    S: AsRef<str>,
{
    ensure!(!triangles.is_empty(), "No triangles in input");
    ensure!(!map_names.is_empty(), "No texture maps given");
    ensure!(
        map_names.len() <= MAX_MAPS,
        "Too many texture maps ({})",
        map_names.len()
    );

    let mut table = VertexTable::new();
    let mut map_tri_counts = vec![0u32; map_names.len()];
    let mut faces = vec![Vec::new(); map_names.len()];
    let mut num_tri = 0u32;

    for tri in triangles {
        ensure!(
            (tri.tex_index as usize) < map_names.len(),
            "Out of bounds texture index ({})",
            tri.tex_index
        );

        let mut indices = [0u16; 3];
        for i in 0..3 {
            let (index, _) = table.fold(tri.vertices[i], tri.texcoords[i])?;
            indices[i] = index;
        }

        // folding can collapse a sliver onto fewer than three definitions
        if indices[0] == indices[1] || indices[1] == indices[2] || indices[2] == indices[0] {
            warn!("Skipping degenerate triangle in input");
            continue;
        }

        faces[tri.tex_index as usize].extend_from_slice(&indices);
        map_tri_counts[tri.tex_index as usize] += 1;
        num_tri += 1;
    }

    debug!(
        "Built mesh: {} triangles, {} vertex definitions",
        num_tri,
        table.len()
    );

    let (positions, texcoords, bounds) = table.into_parts();

    Ok(MeshData::new(
        map_names.iter().map(|s| s.as_ref().to_owned()).collect(),
        map_tri_counts,
        positions,
        texcoords,
        bounds,
        num_tri,
        faces,
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn quad_soup() -> Vec<Triangle> {
        vec![
            Triangle {
                vertices: [
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(1.0, 0.0, 0.0),
                    Vector3::new(1.0, 1.0, 0.0),
                ],
                texcoords: [
                    Vector2::new(0.0, 0.0),
                    Vector2::new(1.0, 0.0),
                    Vector2::new(1.0, 1.0),
                ],
                tex_index: 0,
            },
            Triangle {
                vertices: [
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(1.0, 1.0, 0.0),
                    Vector3::new(0.0, 1.0, 0.0),
                ],
                texcoords: [
                    Vector2::new(0.0, 0.0),
                    Vector2::new(1.0, 1.0),
                    Vector2::new(0.0, 1.0),
                ],
                tex_index: 0,
            },
        ]
    }

    #[test]
    fn test_build_folds_shared_edge() {
        let mesh = build(&quad_soup(), &["marble"]).unwrap();

        assert_eq!(mesh.num_tri(), 2);
        assert_eq!(mesh.map_tri_counts(), &[2]);
        assert_eq!(mesh.positions().len(), 4);
        assert_eq!(mesh.faces()[0], vec![0, 1, 2, 0, 2, 3]);

        // every index in range, every triangle's indices pairwise distinct
        for group in mesh.faces() {
            for face in group.chunks(3) {
                for &i in face {
                    assert!((i as usize) < mesh.positions().len());
                }
                assert!(face[0] != face[1] && face[1] != face[2] && face[2] != face[0]);
            }
        }
    }

    #[test]
    fn test_build_groups_by_texture() {
        let mut soup = quad_soup();
        soup[1].tex_index = 1;

        let mesh = build(&soup, &["marble", "granite"]).unwrap();

        assert_eq!(mesh.map_tri_counts(), &[1, 1]);
        assert_eq!(mesh.faces()[0].len(), 3);
        assert_eq!(mesh.faces()[1].len(), 3);
    }

    #[test]
    fn test_build_bounds() {
        let mesh = build(&quad_soup(), &["marble"]).unwrap();

        assert_eq!(mesh.bounds().min(), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(mesh.bounds().max(), Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_build_rejects_bad_texture_index() {
        let mut soup = quad_soup();
        soup[0].tex_index = 2;

        assert!(build(&soup, &["marble"]).is_err());
    }

    #[test]
    fn test_build_drops_degenerate() {
        let mut soup = quad_soup();
        // collapses onto two definitions of the first triangle
        soup.push(Triangle {
            vertices: [
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1e-5, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
            ],
            texcoords: [
                Vector2::new(0.0, 0.0),
                Vector2::new(0.0, 0.0),
                Vector2::new(1.0, 0.0),
            ],
            tex_index: 0,
        });

        let mesh = build(&soup, &["marble"]).unwrap();
        assert_eq!(mesh.num_tri(), 2);
        assert_eq!(mesh.positions().len(), 4);
    }

    #[test]
    fn test_triangles_round_trip() {
        let mesh = build(&quad_soup(), &["marble"]).unwrap();

        let soup = mesh.triangles();
        assert_eq!(soup, quad_soup());

        // rebuilding from the exploded soup reproduces the mesh
        let rebuilt = build(&soup, &["marble"]).unwrap();
        assert_eq!(rebuilt, mesh);
    }
}
