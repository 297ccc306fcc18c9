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

use std::io::Write;

use crate::common::bsp::{BspData, BspNode, MAGIC, VERSION};
use crate::common::util;

use byteorder::{LittleEndian, WriteBytesExt};
use failure::Error;

impl BspData {
    /// Writes this tree to the given stream in the format described in the
    /// [module documentation](crate::common::bsp).
    pub fn save<W>(&self, writer: &mut W) -> Result<(), Error>
    where
        W: Write,
    {
        writer.write_all(&MAGIC)?;
        writer.write_u8(VERSION)?;

        writer.write_u16::<LittleEndian>(self.map_names().len() as u16)?;
        for name in self.map_names() {
            util::write_name(writer, name)?;
        }
        for &count in self.map_tri_counts() {
            writer.write_u32::<LittleEndian>(count)?;
        }

        writer.write_u16::<LittleEndian>(self.positions().len() as u16)?;
        for v in self.positions() {
            writer.write_f32::<LittleEndian>(v.x)?;
            writer.write_f32::<LittleEndian>(v.y)?;
            writer.write_f32::<LittleEndian>(v.z)?;
        }
        for t in self.texcoords() {
            writer.write_f32::<LittleEndian>(t.x)?;
            writer.write_f32::<LittleEndian>(t.y)?;
        }

        let bounds = self.bounds();
        for c in 0..3 {
            writer.write_f32::<LittleEndian>(bounds.min()[c])?;
            writer.write_f32::<LittleEndian>(bounds.max()[c])?;
        }

        writer.write_u16::<LittleEndian>(self.max_depth())?;
        writer.write_u16::<LittleEndian>(self.num_nodes())?;
        writer.write_u32::<LittleEndian>(self.num_tri())?;

        // preorder node stream: self, back subtree, front subtree. The
        // explicit stack keeps arbitrarily deep trees off the call stack.
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            write_node(writer, node)?;

            if let Some(front) = node.front() {
                stack.push(front);
            }
            if let Some(back) = node.back() {
                stack.push(back);
            }
        }

        writer.flush()?;

        Ok(())
    }
}

fn write_node<W>(writer: &mut W, node: &BspNode) -> Result<(), Error>
where
    W: Write,
{
    writer.write_u16::<LittleEndian>(node.faces().len() as u16)?;

    for face in node.faces() {
        writer.write_u16::<LittleEndian>(face.tex_index)?;
        for &index in face.indices.iter() {
            writer.write_u16::<LittleEndian>(index)?;
        }
    }

    // the plane of a non-empty node is recomputed from its first triangle
    // on load, so only empty nodes persist it
    if node.faces().is_empty() {
        let plane = node.plane();
        writer.write_f64::<LittleEndian>(plane.normal().x)?;
        writer.write_f64::<LittleEndian>(plane.normal().y)?;
        writer.write_f64::<LittleEndian>(plane.normal().z)?;
        writer.write_f64::<LittleEndian>(plane.d())?;
    }

    let mut flag = 0u8;
    if node.back().is_some() {
        flag |= 0xB0;
    }
    if node.front().is_some() {
        flag |= 0x0F;
    }
    writer.write_u8(flag)?;

    Ok(())
}
