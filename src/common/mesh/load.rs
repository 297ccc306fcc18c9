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

use crate::common::mesh::{MeshData, MAGIC, VERSION};
use crate::common::model::Bounds;
use crate::common::util;

use byteorder::{LittleEndian, ReadBytesExt};
use cgmath::{Vector2, Vector3};
use failure::Error;

/// Loads a mesh written by [`MeshData::save`].
pub fn load<R>(reader: &mut R) -> Result<MeshData, Error>
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

    let num_tri = reader.read_u32::<LittleEndian>()?;

    let mut faces = Vec::with_capacity(map_count as usize);
    for &count in &map_tri_counts {
        let mut group = Vec::with_capacity(3 * count as usize);
        for _ in 0..3 * count {
            let index = reader.read_u16::<LittleEndian>()?;
            ensure!(
                (index as usize) < positions.len(),
                "Out of bounds vertex index ({})",
                index
            );
            group.push(index);
        }
        faces.push(group);
    }

    debug!(
        "Loaded mesh: {} triangles, {} vertex definitions",
        num_tri, vertex_count
    );

    Ok(MeshData::new(
        map_names,
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

    use std::io::Cursor;

    use crate::common::mesh::build;
    use crate::common::model::Triangle;

    fn soup() -> Vec<Triangle> {
        vec![
            Triangle {
                vertices: [
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(2.0, 0.0, 0.0),
                    Vector3::new(0.0, 2.0, 0.0),
                ],
                texcoords: [
                    Vector2::new(0.0, 0.0),
                    Vector2::new(1.0, 0.0),
                    Vector2::new(0.0, 1.0),
                ],
                tex_index: 0,
            },
            Triangle {
                vertices: [
                    Vector3::new(0.0, 0.0, 1.0),
                    Vector3::new(1.0, 0.0, 1.0),
                    Vector3::new(0.0, 1.0, 1.0),
                ],
                texcoords: [
                    Vector2::new(0.0, 0.0),
                    Vector2::new(1.0, 0.0),
                    Vector2::new(0.0, 1.0),
                ],
                tex_index: 1,
            },
        ]
    }

    #[test]
    fn test_round_trip() {
        let mesh = build(&soup(), &["marble", "granite"]).unwrap();

        let mut buf = Vec::new();
        mesh.save(&mut buf).unwrap();

        let restored = load(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(restored, mesh);

        // a second save must reproduce the bytes exactly
        let mut buf2 = Vec::new();
        restored.save(&mut buf2).unwrap();
        assert_eq!(buf2, buf);
    }

    #[test]
    fn test_load_bad_magic() {
        let mesh = build(&soup(), &["marble", "granite"]).unwrap();

        let mut buf = Vec::new();
        mesh.save(&mut buf).unwrap();
        buf[0] = b'B';

        assert!(load(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn test_load_bad_version() {
        let mesh = build(&soup(), &["marble", "granite"]).unwrap();

        let mut buf = Vec::new();
        mesh.save(&mut buf).unwrap();
        buf[4] = 0x11;

        assert!(load(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn test_load_truncated() {
        let mesh = build(&soup(), &["marble", "granite"]).unwrap();

        let mut buf = Vec::new();
        mesh.save(&mut buf).unwrap();
        buf.pop();

        assert!(load(&mut Cursor::new(&buf)).is_err());
    }
}
