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

//! BSP tree compilation, representation and file format.
//!
//! # Data Structure
//!
//! The binary space partitioning tree recursively divides 3-space with the
//! planes of the model's own triangles. Each node carries a partition plane
//! and the triangles coplanar with it; the back child subdivides the
//! half-space below the plane and the front child the half-space above it.
//! Triangles straddling a partition plane are split during compilation, so
//! every face in the finished tree lies entirely within one node.
//!
//! After compilation each triangle is a triple of 16-bit indices into a
//! shared vertex definition table in which near-duplicate vertices have been
//! folded together (see [`VertexTable`](crate::common::model::VertexTable)).
//!
//! # File Format
//!
//! A compiled tree is persisted little-endian as:
//!
//! ```text
//! magic      : 4 bytes, "BSP" plus the terminator
//! version    : u8, major in the high nibble, minor in the low (currently 0x10)
//! nMaps      : u16
//! mapNames   : nMaps NUL-terminated ASCII strings
//! mapTriNums : nMaps x u32, triangles mapped to each texture
//! nVertices  : u16
//! vertCoords : nVertices x 3 x f32
//! texCoords  : nVertices x 2 x f32
//! bounds     : minX, maxX, minY, maxY, minZ, maxZ as f32
//! maxDepth   : u16
//! numNodes   : u16
//! numTri     : u32
//! ```
//!
//! followed by the node stream in preorder (node, back subtree, front
//! subtree). Each node is:
//!
//! ```text
//! numTri     : u16
//! triDefs    : numTri x { texIndex: u16, vIndices: 3 x u16 }
//! partPlane  : 4 x f64, only if numTri is 0 (otherwise recomputed on load
//!              from the first triangle's vertex definitions)
//! cFlag      : u8, one of 0x00 / 0xB0 / 0x0F / 0xBF
//!              ('B' = has back subtree, 'F' = has front subtree)
//! ```

mod compile;
mod load;
mod save;

pub use self::compile::compile;
pub use self::load::load;

use crate::common::math::{Plane, PointSide};
use crate::common::model::Bounds;

use cgmath::{Vector2, Vector3};

/// File type identifier of a saved BSP tree, including the terminator.
pub const MAGIC: [u8; 4] = *b"BSP\0";

/// Current BSP format version: major 1, minor 0.
pub const VERSION: u8 = 0x10;

/// Presence of a node's subtrees, encoded as the `cFlag` stream byte.
///
/// Any other byte in the stream means the file is corrupt.
#[derive(Copy, Clone, Debug, Eq, FromPrimitive, PartialEq)]
pub enum ChildFlag {
    Neither = 0x00,
    BackOnly = 0xB0,
    FrontOnly = 0x0F,
    Both = 0xBF,
}

impl ChildFlag {
    pub fn has_back(self) -> bool {
        match self {
            ChildFlag::BackOnly | ChildFlag::Both => true,
            _ => false,
        }
    }

    pub fn has_front(self) -> bool {
        match self {
            ChildFlag::FrontOnly | ChildFlag::Both => true,
            _ => false,
        }
    }
}

/// A texture-mapped triangle in canonical form: a texture index and three
/// indices into the shared vertex definition table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TriFace {
    pub tex_index: u16,
    pub indices: [u16; 3],
}

/// One node of a compiled tree.
#[derive(Debug, PartialEq)]
pub struct BspNode {
    plane: Plane,
    faces: Vec<TriFace>,
    back: Option<Box<BspNode>>,
    front: Option<Box<BspNode>>,
}

impl BspNode {
    pub(crate) fn new(
        plane: Plane,
        faces: Vec<TriFace>,
        back: Option<Box<BspNode>>,
        front: Option<Box<BspNode>>,
    ) -> BspNode {
        BspNode {
            plane,
            faces,
            back,
            front,
        }
    }

    /// Returns the partition plane of this node.
    ///
    /// Every triangle in [`faces`](Self::faces) is coincident with this
    /// plane.
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Returns the triangles coplanar with the partition plane, in insertion
    /// order with the subdivision root first.
    pub fn faces(&self) -> &[TriFace] {
        &self.faces
    }

    pub fn back(&self) -> Option<&BspNode> {
        self.back.as_ref().map(|n| n.as_ref())
    }

    pub fn front(&self) -> Option<&BspNode> {
        self.front.as_ref().map(|n| n.as_ref())
    }
}

impl Drop for BspNode {
    // unlink subtrees onto an explicit stack so that dropping a degenerate
    // (list-shaped) tree cannot overflow the call stack
    fn drop(&mut self) {
        let mut stack = Vec::new();
        stack.extend(self.back.take());
        stack.extend(self.front.take());

        while let Some(mut node) = stack.pop() {
            stack.extend(node.back.take());
            stack.extend(node.front.take());
        }
    }
}

/// A compiled BSP tree together with its texture map information, vertex
/// definitions and model bounds.
#[derive(Debug, PartialEq)]
pub struct BspData {
    map_names: Vec<String>,
    map_tri_counts: Vec<u32>,

    positions: Vec<Vector3<f32>>,
    texcoords: Vec<Vector2<f32>>,

    bounds: Bounds,

    max_depth: u16,
    num_nodes: u16,
    num_tri: u32,

    root: BspNode,
}

impl BspData {
    pub(crate) fn new(
        map_names: Vec<String>,
        map_tri_counts: Vec<u32>,
        positions: Vec<Vector3<f32>>,
        texcoords: Vec<Vector2<f32>>,
        bounds: Bounds,
        max_depth: u16,
        num_nodes: u16,
        num_tri: u32,
        root: BspNode,
    ) -> BspData {
        BspData {
            map_names,
            map_tri_counts,
            positions,
            texcoords,
            bounds,
            max_depth,
            num_nodes,
            num_tri,
            root,
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

    /// Returns the maximum depth reached during compilation. The root node
    /// is at depth 1.
    pub fn max_depth(&self) -> u16 {
        self.max_depth
    }

    pub fn num_nodes(&self) -> u16 {
        self.num_nodes
    }

    /// Returns the total number of triangles stored in the tree.
    pub fn num_tri(&self) -> u32 {
        self.num_tri
    }

    pub fn root(&self) -> &BspNode {
        &self.root
    }

    /// Visits every face of the tree in far-to-near order relative to the
    /// given eye position.
    ///
    /// At each node, the subtree on the opposite side of the partition plane
    /// from the eye is visited first, then the node's own faces, then the
    /// near subtree. Painting faces in visit order therefore renders the
    /// model back to front.
    pub fn walk_ordered<F>(&self, eye: Vector3<f32>, visit: &mut F)
    where
        F: FnMut(&TriFace),
    {
        Self::walk_node(&self.root, eye, visit);
    }

    fn walk_node<F>(node: &BspNode, eye: Vector3<f32>, visit: &mut F)
    where
        F: FnMut(&TriFace),
    {
        let (far, near) = match node.plane.classify_point(eye) {
            PointSide::Above | PointSide::On => (node.back(), node.front()),
            PointSide::Below => (node.front(), node.back()),
        };

        if let Some(n) = far {
            Self::walk_node(n, eye, visit);
        }

        for face in &node.faces {
            visit(face);
        }

        if let Some(n) = near {
            Self::walk_node(n, eye, visit);
        }
    }

    /// Renders the node structure of the tree as a Graphviz dot graph.
    pub fn gen_dot_graph(&self) -> String {
        let mut dot = String::new();
        dot += "digraph bsp {\n";

        let mut counter = 0;
        Self::dot_node(&self.root, &mut counter, &mut dot);

        dot += "}\n";

        dot
    }

    fn dot_node(node: &BspNode, counter: &mut usize, dot: &mut String) -> usize {
        let id = *counter;
        *counter += 1;

        *dot += &format!("    n{} [label=\"{}\"]\n", id, node.faces.len());

        if let Some(back) = node.back() {
            let back_id = Self::dot_node(back, counter, dot);
            *dot += &format!("    n{} -> n{} [label=\"b\"]\n", id, back_id);
        }

        if let Some(front) = node.front() {
            let front_id = Self::dot_node(front, counter, dot);
            *dot += &format!("    n{} -> n{} [label=\"f\"]\n", id, front_id);
        }

        id
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::common::model::Triangle;

    use num::FromPrimitive;

    #[test]
    fn test_walk_ordered_far_to_near() {
        // two parallel walls facing +z, distinguished by texture
        let wall = |z: f32, tex_index: u16| Triangle {
            vertices: [
                Vector3::new(0.0, 0.0, z),
                Vector3::new(1.0, 0.0, z),
                Vector3::new(1.0, 1.0, z),
            ],
            texcoords: [
                Vector2::new(0.0, 0.0),
                Vector2::new(1.0, 0.0),
                Vector2::new(1.0, 1.0),
            ],
            tex_index,
        };

        let data = compile(&[wall(0.0, 0), wall(1.0, 1)], &["near", "far"]).unwrap();

        let order_from = |eye| {
            let mut order = Vec::new();
            data.walk_ordered(eye, &mut |face: &TriFace| order.push(face.tex_index));
            order
        };

        // from above both planes, the z = 0 wall is farther
        assert_eq!(order_from(Vector3::new(0.5, 0.5, 2.0)), vec![0, 1]);

        // from below, the z = 1 wall is farther
        assert_eq!(order_from(Vector3::new(0.5, 0.5, -1.0)), vec![1, 0]);
    }

    #[test]
    fn test_child_flag_from_stream_byte() {
        assert_eq!(ChildFlag::from_u8(0x00), Some(ChildFlag::Neither));
        assert_eq!(ChildFlag::from_u8(0xB0), Some(ChildFlag::BackOnly));
        assert_eq!(ChildFlag::from_u8(0x0F), Some(ChildFlag::FrontOnly));
        assert_eq!(ChildFlag::from_u8(0xBF), Some(ChildFlag::Both));
        assert_eq!(ChildFlag::from_u8(0x0B), None);
        assert_eq!(ChildFlag::from_u8(0xFF), None);
    }

    #[test]
    fn test_drop_deep_tree() {
        // a long back spine must not overflow the stack on drop
        let plane = Plane::for_triangle(&[
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ])
        .unwrap();

        let mut node = BspNode::new(plane, Vec::new(), None, None);
        for _ in 0..200_000 {
            node = BspNode::new(plane, Vec::new(), Some(Box::new(node)), None);
        }

        drop(node);
    }
}
