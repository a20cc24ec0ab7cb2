use crate::ext::ReadExt;
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io;

/// Element type of a ScriptVar value, as stored in the value parameter's type tag
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    strum::Display,
    strum::FromRepr,
    strum::EnumIter,
    strum::EnumString,
)]
pub enum Type {
    Bool = 0,
    Int32 = 1,
    UInt32 = 2,
    Float32 = 3,
    Int8 = 4,
    UInt8 = 5,
    Int16 = 6,
    UInt16 = 7,
}

impl Type {
    pub fn iter() -> TypeIter {
        <Type as strum::IntoEnumIterator>::iter()
    }

    /// Width of one element in bytes
    pub fn size(self) -> usize {
        match self {
            Type::Bool | Type::Int8 | Type::UInt8 => 1,
            Type::Int16 | Type::UInt16 => 2,
            Type::Int32 | Type::UInt32 | Type::Float32 => 4,
        }
    }
}

/// Tightly packed little-endian array of one element type
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(Vec<bool>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Float32(Vec<f32>),
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::Int32(_) => Type::Int32,
            Value::UInt32(_) => Type::UInt32,
            Value::Float32(_) => Type::Float32,
            Value::Int8(_) => Type::Int8,
            Value::UInt8(_) => Type::UInt8,
            Value::Int16(_) => Type::Int16,
            Value::UInt16(_) => Type::UInt16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Bool(v) => v.len(),
            Value::Int32(v) => v.len(),
            Value::UInt32(v) => v.len(),
            Value::Float32(v) => v.len(),
            Value::Int8(v) => v.len(),
            Value::UInt8(v) => v.len(),
            Value::Int16(v) => v.len(),
            Value::UInt16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialized payload size
    pub fn byte_len(&self) -> usize {
        self.len() * self.ty().size()
    }

    /// Decode `count` elements of `ty` from the start of `bytes`
    pub fn decode(bytes: &[u8], ty: Type, count: usize) -> Result<Self, super::Error> {
        let mut reader = crate::ext::cursor_at(bytes, 0, ty.size() * count, "value payload")?;
        Self::read(&mut reader, ty, count)
    }

    pub fn read<R: io::Read>(reader: &mut R, ty: Type, count: usize) -> Result<Self, super::Error> {
        Ok(match ty {
            Type::Bool => Value::Bool(reader.read_many(count, |r| Ok(r.read_u8()? != 0))?),
            Type::Int32 => Value::Int32(reader.read_many(count, |r| Ok(r.read_i32::<LE>()?))?),
            Type::UInt32 => Value::UInt32(reader.read_many(count, |r| Ok(r.read_u32::<LE>()?))?),
            Type::Float32 => {
                Value::Float32(reader.read_many(count, |r| Ok(r.read_f32::<LE>()?))?)
            }
            Type::Int8 => Value::Int8(reader.read_many(count, |r| Ok(r.read_i8()?))?),
            Type::UInt8 => Value::UInt8(reader.read_many(count, |r| Ok(r.read_u8()?))?),
            Type::Int16 => Value::Int16(reader.read_many(count, |r| Ok(r.read_i16::<LE>()?))?),
            Type::UInt16 => Value::UInt16(reader.read_many(count, |r| Ok(r.read_u16::<LE>()?))?),
        })
    }

    pub fn write<W: io::Write>(&self, writer: &mut W) -> Result<(), super::Error> {
        match self {
            Value::Bool(v) => v.iter().try_for_each(|&b| writer.write_u8(b as u8))?,
            Value::Int32(v) => v.iter().try_for_each(|&n| writer.write_i32::<LE>(n))?,
            Value::UInt32(v) => v.iter().try_for_each(|&n| writer.write_u32::<LE>(n))?,
            Value::Float32(v) => v.iter().try_for_each(|&n| writer.write_f32::<LE>(n))?,
            Value::Int8(v) => v.iter().try_for_each(|&n| writer.write_i8(n))?,
            Value::UInt8(v) => writer.write_all(v)?,
            Value::Int16(v) => v.iter().try_for_each(|&n| writer.write_i16::<LE>(n))?,
            Value::UInt16(v) => v.iter().try_for_each(|&n| writer.write_u16::<LE>(n))?,
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, super::Error> {
        let mut buf = Vec::with_capacity(self.byte_len());
        self.write(&mut buf)?;
        Ok(buf)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn list<T: std::fmt::Display>(
            f: &mut std::fmt::Formatter<'_>,
            items: &[T],
        ) -> std::fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, "]")
        }
        match self {
            Value::Bool(v) => list(f, v),
            Value::Int32(v) => list(f, v),
            Value::UInt32(v) => list(f, v),
            Value::Float32(v) => list(f, v),
            Value::Int8(v) => list(f, v),
            Value::UInt8(v) => list(f, v),
            Value::Int16(v) => list(f, v),
            Value::UInt16(v) => list(f, v),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_type_tags() {
        assert_eq!(Type::from_repr(0), Some(Type::Bool));
        assert_eq!(Type::from_repr(3), Some(Type::Float32));
        assert_eq!(Type::from_repr(7), Some(Type::UInt16));
        assert_eq!(Type::from_repr(8), None);
        let sizes: Vec<usize> = Type::iter().map(Type::size).collect();
        assert_eq!(sizes, [1, 4, 4, 4, 1, 1, 2, 2]);
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            Value::decode(&[1, 0, 0, 0, 2, 0, 0, 0], Type::UInt32, 2).unwrap(),
            Value::UInt32(vec![1, 2])
        );
        assert_eq!(
            Value::decode(&[0, 1], Type::Bool, 2).unwrap(),
            Value::Bool(vec![false, true])
        );
        assert_eq!(
            Value::decode(&1.5f32.to_le_bytes(), Type::Float32, 1).unwrap(),
            Value::Float32(vec![1.5])
        );
        assert_eq!(
            Value::decode(&[0xff, 0xff, 0x80], Type::Int8, 3).unwrap(),
            Value::Int8(vec![-1, -1, -128])
        );
        assert_eq!(
            Value::decode(&[0xfe, 0xff, 0x34, 0x12], Type::Int16, 2).unwrap(),
            Value::Int16(vec![-2, 0x1234])
        );
        // nonzero bytes other than 1 still read as true
        assert_eq!(
            Value::decode(&[7], Type::Bool, 1).unwrap(),
            Value::Bool(vec![true])
        );
    }

    #[test]
    fn test_decode_short_payload() {
        assert!(matches!(
            Value::decode(&[1, 0, 0], Type::UInt32, 1),
            Err(crate::Error::Malformed { len: 4, .. })
        ));
        assert_eq!(
            Value::decode(&[], Type::UInt16, 0).unwrap(),
            Value::UInt16(vec![])
        );
    }

    #[test]
    fn test_encode() {
        assert_eq!(
            Value::Int32(vec![-1, 2]).encode().unwrap(),
            [0xff, 0xff, 0xff, 0xff, 2, 0, 0, 0]
        );
        assert_eq!(Value::Bool(vec![true, false]).encode().unwrap(), [1, 0]);
        assert_eq!(Value::UInt16(vec![0x0102]).encode().unwrap(), [2, 1]);
        assert_eq!(Value::UInt16(vec![1, 2, 3]).byte_len(), 6);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::UInt8(vec![1, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(Value::Float32(vec![1.5]).to_string(), "[1.5]");
        assert_eq!(Value::Bool(vec![]).to_string(), "[]");
    }
}
