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

use std::io::{BufRead, Write};

use failure::Error;

/// The maximum length in bytes of a texture map name, not counting the
/// terminator.
pub const MAX_NAME_LEN: usize = 255;

/// Read a NUL-terminated 7-bit ASCII string of at most `MAX_NAME_LEN` bytes.
///
/// The zero byte is consumed.
pub fn read_name<R>(reader: &mut R) -> Result<String, Error>
where
    R: BufRead,
{
    let mut bytes: Vec<u8> = Vec::new();
    reader.read_until(0, &mut bytes)?;

    ensure!(bytes.pop() == Some(0), "Unterminated name string");
    ensure!(
        bytes.len() <= MAX_NAME_LEN,
        "Name string too long ({} bytes)",
        bytes.len()
    );
    ensure!(
        bytes.iter().all(|b| b.is_ascii()),
        "Name string is not 7-bit ASCII"
    );

    // all-ASCII input cannot fail UTF-8 validation
    Ok(String::from_utf8(bytes)?)
}

/// Write a string as NUL-terminated 7-bit ASCII.
pub fn write_name<W>(writer: &mut W, name: &str) -> Result<(), Error>
where
    W: Write,
{
    ensure!(
        name.len() <= MAX_NAME_LEN,
        "Name string too long ({} bytes)",
        name.len()
    );
    ensure!(name.is_ascii(), "Name string is not 7-bit ASCII");
    ensure!(
        !name.bytes().any(|b| b == 0),
        "Name string contains an embedded NUL"
    );

    writer.write_all(name.as_bytes())?;
    writer.write_all(&[0])?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::Cursor;

    #[test]
    fn test_name_round_trip() {
        let mut buf = Vec::new();
        write_name(&mut buf, "marble04.png").unwrap();
        assert_eq!(buf.last(), Some(&0));

        let name = read_name(&mut Cursor::new(buf)).unwrap();
        assert_eq!(name, "marble04.png");
    }

    #[test]
    fn test_read_name_unterminated() {
        assert!(read_name(&mut Cursor::new(b"granite".to_vec())).is_err());
    }

    #[test]
    fn test_write_name_rejects_non_ascii() {
        let mut buf = Vec::new();
        assert!(write_name(&mut buf, "tèxture").is_err());
    }
}
