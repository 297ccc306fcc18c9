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

//! Input primitives and the shared vertex definition table.

use failure::Error;

use cgmath::{Vector2, Vector3};

/// The maximum number of entries in a vertex definition table.
///
/// Vertex indices are persisted as 16-bit integers; widening this limit
/// requires a format version bump.
pub const MAX_VERTEX_DEFS: usize = 65535;

/// Vertex coordinates differing by no more than this value in every ordinate
/// are considered the same vertex.
///
/// This is roughly what a single pixel maps to on a 1024-line display at a
/// distance of 1.0 with a 60 degree vertical viewing angle
/// (= 1.0 * tan(30°) / 512).
pub const VERT_ORD_EPSILON: f32 = 0.0011276372445;

/// Texture coordinates differing by no more than this value (1/256) in every
/// ordinate are considered the same mapping, since texture maps are at most
/// 256x256 and effective texture coordinates run from 0.0 to 1.0.
pub const TEX_ORD_EPSILON: f32 = 0.00390625;

/// A texture-mapped triangular face, the input unit of both the BSP compiler
/// and the mesh builder.
///
/// Vertices are anticlockwise when viewed from the front of the face. This
/// ordering is load-bearing: plane normals are derived from it and triangle
/// splits preserve it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Vector3<f32>; 3],
    pub texcoords: [Vector2<f32>; 3],
    pub tex_index: u16,
}

/// A canonical vertex: a position and the texture coordinates mapped to it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexDef {
    pub position: Vector3<f32>,
    pub texcoord: Vector2<f32>,
}

/// A running axis-aligned bounding box over canonicalized vertices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    min: Vector3<f32>,
    max: Vector3<f32>,
}

impl Bounds {
    /// Creates an empty bounding box which any added point will collapse
    /// onto.
    pub fn empty() -> Bounds {
        Bounds {
            min: Vector3::new(::std::f32::MAX, ::std::f32::MAX, ::std::f32::MAX),
            max: Vector3::new(::std::f32::MIN, ::std::f32::MIN, ::std::f32::MIN),
        }
    }

    pub fn from_extents(min: Vector3<f32>, max: Vector3<f32>) -> Bounds {
        Bounds { min, max }
    }

    /// Grows the box to contain the given point.
    pub fn add_point(&mut self, point: Vector3<f32>) {
        for c in 0..3 {
            self.min[c] = point[c].min(self.min[c]);
            self.max[c] = point[c].max(self.max[c]);
        }
    }

    /// Returns the minimum extent of the box.
    pub fn min(&self) -> Vector3<f32> {
        self.min
    }

    /// Returns the maximum extent of the box.
    pub fn max(&self) -> Vector3<f32> {
        self.max
    }
}

/// The shared vertex definition table.
///
/// Both the BSP canonicalizer and the mesh builder fold near-duplicate
/// `(position, texcoord)` pairs into this table: a candidate matches the
/// first entry whose position differs by at most [`VERT_ORD_EPSILON`] and
/// whose texture coordinates differ by at most [`TEX_ORD_EPSILON`] on every
/// axis. A match returns the entry's canonical position so that callers can
/// continue their derivations from the coordinates that will actually be
/// persisted.
pub struct VertexTable {
    defs: Vec<VertexDef>,
    bounds: Bounds,
}

impl VertexTable {
    pub fn new() -> VertexTable {
        VertexTable {
            defs: Vec::new(),
            bounds: Bounds::empty(),
        }
    }

    /// Folds a `(position, texcoord)` pair into the table.
    ///
    /// Returns the index of the matching or newly appended entry along with
    /// its canonical position. Fails once the table would exceed
    /// [`MAX_VERTEX_DEFS`] entries.
    pub fn fold(
        &mut self,
        position: Vector3<f32>,
        texcoord: Vector2<f32>,
    ) -> Result<(u16, Vector3<f32>), Error> {
        for (i, def) in self.defs.iter().enumerate() {
            if (def.position.x - position.x).abs() <= VERT_ORD_EPSILON
                && (def.position.y - position.y).abs() <= VERT_ORD_EPSILON
                && (def.position.z - position.z).abs() <= VERT_ORD_EPSILON
                && (def.texcoord.x - texcoord.x).abs() <= TEX_ORD_EPSILON
                && (def.texcoord.y - texcoord.y).abs() <= TEX_ORD_EPSILON
            {
                return Ok((i as u16, def.position));
            }
        }

        ensure!(
            self.defs.len() < MAX_VERTEX_DEFS,
            "Vertex definition table overflow (limit is {} entries)",
            MAX_VERTEX_DEFS
        );

        self.defs.push(VertexDef { position, texcoord });
        self.bounds.add_point(position);

        Ok(((self.defs.len() - 1) as u16, position))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn defs(&self) -> &[VertexDef] {
        &self.defs
    }

    /// Returns the bounding box over every appended vertex.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Unpacks the table into parallel position and texture coordinate
    /// arrays, the layout the serializers persist.
    pub fn into_parts(self) -> (Vec<Vector3<f32>>, Vec<Vector2<f32>>, Bounds) {
        let positions = self.defs.iter().map(|d| d.position).collect();
        let texcoords = self.defs.iter().map(|d| d.texcoord).collect();
        (positions, texcoords, self.bounds)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fold_within_tolerance() {
        let mut table = VertexTable::new();

        let (i, canon) = table
            .fold(Vector3::new(0.25, 0.75, 0.0), Vector2::new(0.5, 0.5))
            .unwrap();
        assert_eq!(i, 0);
        assert_eq!(canon, Vector3::new(0.25, 0.75, 0.0));

        // a near-duplicate folds onto the existing entry and reports the
        // canonical position, not its own
        let (j, canon) = table
            .fold(
                Vector3::new(0.25 + 1e-8, 0.75 - 1e-8, 1e-8),
                Vector2::new(0.5, 0.5),
            )
            .unwrap();
        assert_eq!(j, 0);
        assert_eq!(canon, Vector3::new(0.25, 0.75, 0.0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_fold_distinct_texcoords() {
        let mut table = VertexTable::new();

        table
            .fold(Vector3::new(1.0, 2.0, 3.0), Vector2::new(0.0, 0.0))
            .unwrap();

        // same position, different mapping: a separate definition
        let (i, _) = table
            .fold(Vector3::new(1.0, 2.0, 3.0), Vector2::new(0.5, 0.0))
            .unwrap();
        assert_eq!(i, 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_entries_distinct() {
        let mut table = VertexTable::new();

        for i in 0..8 {
            let p = Vector3::new(i as f32 * 0.25, 0.0, 0.0);
            table.fold(p, Vector2::new(0.0, 0.0)).unwrap();
        }

        // no two surviving entries are within tolerance of each other
        for (i, a) in table.defs().iter().enumerate() {
            for b in &table.defs()[i + 1..] {
                let close = (a.position.x - b.position.x).abs() <= VERT_ORD_EPSILON
                    && (a.position.y - b.position.y).abs() <= VERT_ORD_EPSILON
                    && (a.position.z - b.position.z).abs() <= VERT_ORD_EPSILON
                    && (a.texcoord.x - b.texcoord.x).abs() <= TEX_ORD_EPSILON
                    && (a.texcoord.y - b.texcoord.y).abs() <= TEX_ORD_EPSILON;
                assert!(!close);
            }
        }
    }

    #[test]
    fn test_bounds_accumulation() {
        let mut table = VertexTable::new();

        table
            .fold(Vector3::new(-4.0, 0.5, 2.0), Vector2::new(0.0, 0.0))
            .unwrap();
        table
            .fold(Vector3::new(3.0, -1.5, 7.0), Vector2::new(1.0, 1.0))
            .unwrap();

        let bounds = table.bounds();
        assert_eq!(bounds.min(), Vector3::new(-4.0, -1.5, 2.0));
        assert_eq!(bounds.max(), Vector3::new(3.0, 0.5, 7.0));
    }
}
