use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{self, Cursor, Seek, SeekFrom};

pub trait ReadExt {
    fn read_magic(&mut self) -> Result<[u8; 4], super::Error>;
    fn read_many<T>(
        &mut self,
        count: usize,
        func: impl FnMut(&mut Self) -> Result<T, super::Error>,
    ) -> Result<Vec<T>, super::Error>;
    /// Read a header field stored as u32 when `wide`, u16 otherwise
    fn read_field(&mut self, wide: bool) -> Result<u32, super::Error>;
}

pub trait WriteExt {
    fn write_field(&mut self, wide: bool, value: u32) -> Result<(), super::Error>;
}

impl<R: io::Read> ReadExt for R {
    fn read_magic(&mut self) -> Result<[u8; 4], super::Error> {
        let mut magic = [0; 4];
        self.read_exact(&mut magic)?;
        Ok(magic)
    }

    fn read_many<T>(
        &mut self,
        count: usize,
        mut func: impl FnMut(&mut Self) -> Result<T, super::Error>,
    ) -> Result<Vec<T>, super::Error> {
        let mut buf = Vec::with_capacity(count);
        for _ in 0..count {
            buf.push(func(self)?);
        }
        Ok(buf)
    }

    fn read_field(&mut self, wide: bool) -> Result<u32, super::Error> {
        Ok(match wide {
            true => self.read_u32::<LE>()?,
            false => self.read_u16::<LE>()? as u32,
        })
    }
}

impl<W: io::Write> WriteExt for W {
    fn write_field(&mut self, wide: bool, value: u32) -> Result<(), super::Error> {
        match wide {
            true => self.write_u32::<LE>(value)?,
            false => self.write_u16::<LE>(u16::try_from(value).map_err(|_| {
                super::Error::TooMany {
                    what: "narrow header field",
                    count: value as usize,
                }
            })?)?,
        }
        Ok(())
    }
}

/// Reader over `data` positioned at `offset`, with `len` bytes known to be available
pub fn cursor_at<'data>(
    data: &'data [u8],
    offset: i64,
    len: usize,
    what: &'static str,
) -> Result<Cursor<&'data [u8]>, super::Error> {
    let bounds = usize::try_from(offset)
        .ok()
        .and_then(|start| Some((start, start.checked_add(len)?)));
    match bounds {
        Some((start, end)) if end <= data.len() => {
            let mut cursor = Cursor::new(data);
            cursor.set_position(start as u64);
            Ok(cursor)
        }
        _ => Err(super::Error::Malformed { what, offset, len }),
    }
}

/// Move a writer to `offset`; writing past the end of a `Vec` zero fills the gap
pub fn seek_to<W: Seek>(writer: &mut W, offset: i64, what: &'static str) -> Result<(), super::Error> {
    let start = u64::try_from(offset).map_err(|_| super::Error::Malformed {
        what,
        offset,
        len: 0,
    })?;
    writer.seek(SeekFrom::Start(start))?;
    Ok(())
}

/// Make sure `len` bytes from `offset` exist in the buffer, zero filling
/// whatever is missing. Bytes already present are kept.
pub fn reserve(
    writer: &mut Cursor<Vec<u8>>,
    offset: i64,
    len: usize,
    what: &'static str,
) -> Result<(), super::Error> {
    let end = usize::try_from(offset)
        .ok()
        .and_then(|start| start.checked_add(len))
        .ok_or(super::Error::Malformed { what, offset, len })?;
    let buf = writer.get_mut();
    if buf.len() < end {
        buf.resize(end, 0);
    }
    Ok(())
}

/// Narrow an element count to a u8 count field
pub fn count_u8(count: usize, what: &'static str) -> Result<u8, super::Error> {
    u8::try_from(count).map_err(|_| super::Error::TooMany { what, count })
}

/// Narrow an element count to a u16 count field
pub fn count_u16(count: usize, what: &'static str) -> Result<u16, super::Error> {
    u16::try_from(count).map_err(|_| super::Error::TooMany { what, count })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cursor_at_bounds() {
        let data = [0u8; 8];
        assert!(cursor_at(&data, 4, 4, "tail").is_ok());
        assert!(cursor_at(&data, 0, 0, "empty").is_ok());
        assert!(matches!(
            cursor_at(&data, 5, 4, "tail"),
            Err(crate::Error::Malformed { offset: 5, len: 4, .. })
        ));
        assert!(matches!(
            cursor_at(&data, -4, 1, "negative"),
            Err(crate::Error::Malformed { offset: -4, .. })
        ));
    }

    #[test]
    fn test_reserve_keeps_existing_bytes() {
        let mut writer = Cursor::new(vec![0xab; 4]);
        reserve(&mut writer, 2, 4, "padding").unwrap();
        assert_eq!(writer.get_ref(), &[0xab, 0xab, 0xab, 0xab, 0, 0]);
        reserve(&mut writer, 0, 2, "padding").unwrap();
        assert_eq!(writer.get_ref().len(), 6);
        assert!(reserve(&mut writer, -1, 2, "padding").is_err());
    }

    #[test]
    fn test_fields() {
        let mut buf = vec![];
        buf.write_field(false, 0x1234).unwrap();
        buf.write_field(true, 0x1234).unwrap();
        assert_eq!(buf, [0x34, 0x12, 0x34, 0x12, 0, 0]);
        assert!(buf.write_field(false, 0x10000).is_err());

        let mut reader = Cursor::new(&buf[..]);
        assert_eq!(reader.read_field(false).unwrap(), 0x1234);
        assert_eq!(reader.read_field(true).unwrap(), 0x1234);
    }
}
