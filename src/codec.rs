//! Little-endian binary primitives shared by every artifact codec.
//!
//! All artifacts use raw little-endian integers with no in-band tags; each
//! file type has a fixed schema, so the codecs here are the whole alphabet.
//! EOF discipline matters: `try_read_u32` distinguishes "clean end of a
//! headerless record stream" (EOF before the first byte) from "truncated
//! record" (EOF mid-integer), which decodes to `InvalidData`.

use std::io::{self, Read, Write};

pub fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_u64<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

/// Write a u32 slice as consecutive little-endian values.
pub fn write_u32_slice<W: Write>(w: &mut W, values: &[u32]) -> io::Result<()> {
    for &v in values {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a u32, returning `None` on a clean EOF before the first byte.
///
/// EOF after at least one byte is a truncated record and decodes to
/// `InvalidData`.
pub fn try_read_u32<R: Read>(r: &mut R) -> io::Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        let n = r.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "truncated record: EOF inside a u32",
            ));
        }
        filled += n;
    }
    Ok(Some(u32::from_le_bytes(buf)))
}

/// Read `count` consecutive u32 values.
pub fn read_u32_vec<R: Read>(r: &mut R, count: usize) -> io::Result<Vec<u32>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read_u32(r)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn u32_roundtrip_little_endian() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0x0403_0201).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(read_u32(&mut Cursor::new(&buf)).unwrap(), 0x0403_0201);
    }

    #[test]
    fn u64_roundtrip() {
        let mut buf = Vec::new();
        write_u64(&mut buf, u64::MAX - 7).unwrap();
        assert_eq!(read_u64(&mut Cursor::new(&buf)).unwrap(), u64::MAX - 7);
    }

    #[test]
    fn try_read_distinguishes_clean_eof_from_truncation() {
        let mut empty = Cursor::new(Vec::<u8>::new());
        assert!(try_read_u32(&mut empty).unwrap().is_none());

        let mut partial = Cursor::new(vec![0xAA, 0xBB]);
        let err = try_read_u32(&mut partial).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn slice_roundtrip() {
        let values = [7u32, 0, u32::MAX, 42];
        let mut buf = Vec::new();
        write_u32_slice(&mut buf, &values).unwrap();
        let decoded = read_u32_vec(&mut Cursor::new(&buf), values.len()).unwrap();
        assert_eq!(decoded, values);
    }
}
