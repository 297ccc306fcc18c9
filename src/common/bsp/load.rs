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

use std::io::BufRead;

use crate::common::bsp::{BspData, BspNode, ChildFlag, TriFace, MAGIC, VERSION};
use crate::common::math::Plane;
use crate::common::model::Bounds;
use crate::common::util;

use byteorder::{LittleEndian, ReadBytesExt};
use cgmath::{Vector2, Vector3};
use failure::Error;
use num::FromPrimitive;

/// Loads a BSP tree written by [`BspData::save`].
///
/// The stream must have been produced on a platform with the same float
/// representation; the format is little-endian by contract.
pub fn load<R>(reader: &mut R) -> Result<BspData, Error>
where
    R: BufRead,
{
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    ensure!(magic == MAGIC, "Bad magic number (found {:?})", &magic[..]);

    let version = reader.read_u8()?;
    ensure!(
        version == VERSION,
        "Bad version number (found {:#04x}, should be {:#04x})",
        version,
        VERSION
    );

    let map_count = reader.read_u16::<LittleEndian>()?;
    let mut map_names = Vec::with_capacity(map_count as usize);
    for _ in 0..map_count {
        map_names.push(util::read_name(reader)?);
    }

    let mut map_tri_counts = Vec::with_capacity(map_count as usize);
    for _ in 0..map_count {
        map_tri_counts.push(reader.read_u32::<LittleEndian>()?);
    }

    let vertex_count = reader.read_u16::<LittleEndian>()?;
    let mut positions = Vec::with_capacity(vertex_count as usize);
    for _ in 0..vertex_count {
        positions.push(Vector3::new(
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
        ));
    }

    let mut texcoords = Vec::with_capacity(vertex_count as usize);
    for _ in 0..vertex_count {
        texcoords.push(Vector2::new(
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
        ));
    }

    let mut extents = [0.0f32; 6];
    for e in extents.iter_mut() {
        *e = reader.read_f32::<LittleEndian>()?;
    }
    let bounds = Bounds::from_extents(
        Vector3::new(extents[0], extents[2], extents[4]),
        Vector3::new(extents[1], extents[3], extents[5]),
    );

    let max_depth = reader.read_u16::<LittleEndian>()?;
    let num_nodes = reader.read_u16::<LittleEndian>()?;
    let num_tri = reader.read_u32::<LittleEndian>()?;

    let root = load_node(reader, map_count, &positions)?;

    debug!(
        "Loaded {} triangles over {} nodes ({} levels, {} vertex definitions)",
        num_tri, num_nodes, max_depth, vertex_count
    );

    Ok(BspData::new(
        map_names,
        map_tri_counts,
        positions,
        texcoords,
        bounds,
        max_depth,
        num_nodes,
        num_tri,
        root,
    ))
}

fn load_node<R>(reader: &mut R, map_count: u16, positions: &[Vector3<f32>]) -> Result<BspNode, Error>
where
    R: BufRead,
{
    let face_count = reader.read_u16::<LittleEndian>()?;

    let mut faces = Vec::with_capacity(face_count as usize);
    for _ in 0..face_count {
        let tex_index = reader.read_u16::<LittleEndian>()?;
        ensure!(
            tex_index < map_count,
            "Out of bounds texture index ({})",
            tex_index
        );

        let mut indices = [0u16; 3];
        for index in indices.iter_mut() {
            *index = reader.read_u16::<LittleEndian>()?;
            ensure!(
                (*index as usize) < positions.len(),
                "Out of bounds vertex index ({})",
                index
            );
        }

        faces.push(TriFace { tex_index, indices });
    }

    // only empty nodes persist their partition plane; any other node
    // recomputes it from its first triangle's vertex definitions
    let plane = if faces.is_empty() {
        let normal = Vector3::new(
            reader.read_f64::<LittleEndian>()?,
            reader.read_f64::<LittleEndian>()?,
            reader.read_f64::<LittleEndian>()?,
        );
        let d = reader.read_f64::<LittleEndian>()?;
        Plane::from_coefficients(normal, d)
    } else {
        let verts = [
            positions[faces[0].indices[0] as usize],
            positions[faces[0].indices[1] as usize],
            positions[faces[0].indices[2] as usize],
        ];

        match Plane::for_triangle(&verts) {
            Some(plane) => plane,
            None => bail!("Degenerate triangle in saved tree"),
        }
    };

    let flag_byte = reader.read_u8()?;
    let flag = match ChildFlag::from_u8(flag_byte) {
        Some(flag) => flag,
        None => bail!("Corrupt subtree flag ({:#04x})", flag_byte),
    };

    let back = if flag.has_back() {
        Some(Box::new(load_node(reader, map_count, positions)?))
    } else {
        None
    };

    let front = if flag.has_front() {
        Some(Box::new(load_node(reader, map_count, positions)?))
    } else {
        None
    };

    Ok(BspNode::new(plane, faces, back, front))
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::Cursor;

    use crate::common::bsp::compile;
    use crate::common::model::Triangle;

    fn wall_soup() -> Vec<Triangle> {
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

    fn spanning_soup() -> Vec<Triangle> {
        let mut soup = wall_soup();
        soup.push(Triangle {
            vertices: [
                Vector3::new(0.25, 0.25, -1.0),
                Vector3::new(0.75, 0.25, 1.0),
                Vector3::new(0.5, 0.75, 1.0),
            ],
            texcoords: [
                Vector2::new(0.0, 0.0),
                Vector2::new(1.0, 0.0),
                Vector2::new(1.0, 1.0),
            ],
            tex_index: 0,
        });
        soup
    }

    #[test]
    fn test_round_trip() {
        let data = compile(&spanning_soup(), &["marble"]).unwrap();

        let mut buf = Vec::new();
        data.save(&mut buf).unwrap();

        let restored = load(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(restored, data);

        // a second save must reproduce the bytes exactly
        let mut buf2 = Vec::new();
        restored.save(&mut buf2).unwrap();
        assert_eq!(buf2, buf);
    }

    #[test]
    fn test_load_bad_magic() {
        let data = compile(&wall_soup(), &["marble"]).unwrap();

        let mut buf = Vec::new();
        data.save(&mut buf).unwrap();
        buf[0] = b'G';

        assert!(load(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn test_load_bad_version() {
        let data = compile(&wall_soup(), &["marble"]).unwrap();

        let mut buf = Vec::new();
        data.save(&mut buf).unwrap();
        buf[4] = 0x20;

        assert!(load(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn test_load_bad_child_flag() {
        let data = compile(&wall_soup(), &["marble"]).unwrap();

        let mut buf = Vec::new();
        data.save(&mut buf).unwrap();

        // the single node carries no subtrees, so the stream ends with its
        // flag byte
        let last = buf.len() - 1;
        assert_eq!(buf[last], 0x00);
        buf[last] = 0x0B;

        assert!(load(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn test_load_truncated() {
        let data = compile(&wall_soup(), &["marble"]).unwrap();

        let mut buf = Vec::new();
        data.save(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);

        assert!(load(&mut Cursor::new(&buf)).is_err());
    }
}
