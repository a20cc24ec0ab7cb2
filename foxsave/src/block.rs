use super::ext::{count_u16, count_u8, cursor_at, reserve, seek_to, ReadExt, WriteExt};
use super::{Diagnostic, Dictionary, Layout, Type, Value};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io;

/// Zero bytes the legacy layout reserves in place of an empty section's tables
pub const EMPTY_TABLE_PADDING: usize = 92;

/// Hash-keyed record of the key table
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub hash: u32,
    pub param1: u16,
    pub param2: u16,
}

impl Key {
    pub const SIZE: usize = 8;

    pub fn read<R: io::Read>(reader: &mut R) -> Result<Self, super::Error> {
        Ok(Self {
            hash: reader.read_u32::<LE>()?,
            param1: reader.read_u16::<LE>()?,
            param2: reader.read_u16::<LE>()?,
        })
    }

    pub fn write<W: io::Write>(&self, writer: &mut W) -> Result<(), super::Error> {
        writer.write_u32::<LE>(self.hash)?;
        writer.write_u16::<LE>(self.param1)?;
        writer.write_u16::<LE>(self.param2)?;
        Ok(())
    }
}

/// Where a value lives and how to read it
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValueParam {
    pub offset: u32,
    pub array_size: u16,
    pub type_tag: u8,
    pub reserved: u8,
}

impl ValueParam {
    pub const SIZE: usize = 8;

    pub fn read<R: io::Read>(reader: &mut R) -> Result<Self, super::Error> {
        Ok(Self {
            offset: reader.read_u32::<LE>()?,
            array_size: reader.read_u16::<LE>()?,
            type_tag: reader.read_u8()?,
            reserved: reader.read_u8()?,
        })
    }

    pub fn write<W: io::Write>(&self, writer: &mut W) -> Result<(), super::Error> {
        writer.write_u32::<LE>(self.offset)?;
        writer.write_u16::<LE>(self.array_size)?;
        writer.write_u8(self.type_tag)?;
        writer.write_u8(self.reserved)?;
        Ok(())
    }

    pub fn ty(&self) -> Option<Type> {
        Type::from_repr(self.type_tag)
    }

    /// Payload size in bytes, if the type tag is understood
    pub fn payload_len(&self) -> Option<usize> {
        self.ty().map(|ty| ty.size() * self.array_size as usize)
    }
}

/// One row of a section table
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Slot of the index table at the same position
    pub index: u16,
    pub key: Key,
    pub param: ValueParam,
    /// Variable name, if the dictionary knows the key hash
    pub name: Option<String>,
    /// Decoded payload; `None` when the type tag is not understood or an
    /// unnamed entry points outside the block
    pub value: Option<Value>,
}

impl Entry {
    fn read(
        data: &[u8],
        layout: Layout,
        section: u16,
        index: u16,
        key: Key,
        param: ValueParam,
        dictionary: &Dictionary,
    ) -> Result<Self, super::Error> {
        let name = dictionary.lookup(key.hash).map(str::to_owned);
        if name.is_none() {
            log::debug!("section {section}: hash {:08x} not found", key.hash);
        }

        let Some(ty) = param.ty() else {
            log::warn!(
                "section {section}: hash {:08x} has unknown type tag {}",
                key.hash,
                param.type_tag
            );
            return Ok(Self {
                index,
                key,
                param,
                name,
                value: None,
            });
        };

        let count = param.array_size as usize;
        let payload = match count {
            0 => Ok(io::Cursor::new(&data[..0])),
            _ => cursor_at(
                data,
                layout.payload_offset(param.offset),
                ty.size() * count,
                "value payload",
            ),
        };
        let value = match (payload, &name) {
            (Ok(mut reader), _) => Some(Value::read(&mut reader, ty, count)?),
            (Err(err), Some(_)) => return Err(err),
            // unnamed entries are skipped, their bytes stay in the source image
            (Err(_), None) => {
                log::debug!(
                    "section {section}: hash {:08x} points outside the block",
                    key.hash
                );
                None
            }
        };

        Ok(Self {
            index,
            key,
            param,
            name,
            value,
        })
    }

    fn check(&self) -> Result<(), super::Error> {
        let Some(value) = &self.value else {
            return Ok(());
        };
        let name = || {
            self.name
                .clone()
                .unwrap_or_else(|| format!("{:08x}", self.key.hash))
        };
        match self.param.ty() {
            Some(expected) if expected == value.ty() => {}
            Some(expected) => {
                return Err(super::Error::Type {
                    name: name(),
                    expected,
                    actual: value.ty(),
                })
            }
            // tag is not understood, the payload cannot be placed
            None => return Ok(()),
        }
        if value.len() != self.param.array_size as usize {
            return Err(super::Error::Length {
                name: name(),
                expected: self.param.array_size as usize,
                actual: value.len(),
            });
        }
        Ok(())
    }
}

/// Group of variables sharing one index/key/value-param table
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: u16,
    pub data_offset: u32,
    pub entries: Vec<Entry>,
}

impl Section {
    pub const HEADER_SIZE: usize = 8;

    fn read(
        data: &[u8],
        layout: Layout,
        (id, count, data_offset): (u16, u16, u32),
        dictionary: &Dictionary,
    ) -> Result<Self, super::Error> {
        let count = count as usize;
        log::trace!("section {id}: {count} entries at {data_offset:#x}");
        if count == 0 {
            return Ok(Self {
                id,
                data_offset,
                entries: vec![],
            });
        }

        let indexes = cursor_at(data, layout.index_offset(data_offset), count * 2, "index table")?
            .read_many(count, |r| Ok(r.read_u16::<LE>()?))?;
        let keys = cursor_at(
            data,
            layout.key_offset(data_offset, count),
            count * Key::SIZE,
            "key table",
        )?
        .read_many(count, Key::read)?;
        let params = cursor_at(
            data,
            layout.param_offset(data_offset, count),
            count * ValueParam::SIZE,
            "value param table",
        )?
        .read_many(count, ValueParam::read)?;

        let entries = indexes
            .into_iter()
            .zip(keys)
            .zip(params)
            .map(|((index, key), param)| {
                Entry::read(data, layout, id, index, key, param, dictionary)
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            id,
            data_offset,
            entries,
        })
    }

    fn write_header<W: io::Write>(&self, writer: &mut W) -> Result<(), super::Error> {
        writer.write_u16::<LE>(self.id)?;
        writer.write_u16::<LE>(count_u16(self.entries.len(), "section")?)?;
        writer.write_u32::<LE>(self.data_offset)?;
        Ok(())
    }

    fn write_table(
        &self,
        writer: &mut io::Cursor<Vec<u8>>,
        layout: Layout,
        base: i64,
    ) -> Result<(), super::Error> {
        let count = self.entries.len();
        if count == 0 {
            if layout == Layout::Legacy {
                let start = base + layout.index_offset(self.data_offset);
                reserve(writer, start, EMPTY_TABLE_PADDING, "empty table")?;
            }
            return Ok(());
        }

        seek_to(writer, base + layout.index_offset(self.data_offset), "index table")?;
        for entry in &self.entries {
            writer.write_u16::<LE>(entry.index)?;
        }
        seek_to(
            writer,
            base + layout.key_offset(self.data_offset, count),
            "key table",
        )?;
        for entry in &self.entries {
            entry.key.write(writer)?;
        }
        for entry in &self.entries {
            entry.param.write(writer)?;
        }
        for entry in &self.entries {
            entry.check()?;
            match &entry.value {
                Some(value) if !value.is_empty() => {
                    seek_to(
                        writer,
                        base + layout.payload_offset(entry.param.offset),
                        "value payload",
                    )?;
                    value.write(writer)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// A resolved, decoded variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variable<'block> {
    pub section: u16,
    pub name: &'block str,
    pub value: &'block Value,
}

/// ScriptVar block: sections of hash-keyed, typed variables
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub layout: Layout,
    /// Save type the block belongs to
    pub kind: u32,
    pub flags: u8,
    pub version: u32,
    pub revision: u32,
    pub sections: Vec<Section>,
}

impl Block {
    /// Parse a block from `data`, which starts right after the block's `SVAR` magic
    pub fn read(data: &[u8], layout: Layout, dictionary: &Dictionary) -> Result<Self, super::Error> {
        let wide = layout.wide();
        let mut reader = cursor_at(data, 0, layout.header_size(), "block header")?;
        let kind = reader.read_field(wide)?;
        let flags = reader.read_u8()?;
        let count = reader.read_u8()? as usize;
        let version = reader.read_field(wide)?;
        let revision = reader.read_field(wide)?;
        log::trace!("block type {kind}, version {version:#010x}, {count} sections");

        let headers = cursor_at(
            data,
            layout.header_size() as i64,
            count * Section::HEADER_SIZE,
            "section headers",
        )?
        .read_many(count, |r| {
            Ok((r.read_u16::<LE>()?, r.read_u16::<LE>()?, r.read_u32::<LE>()?))
        })?;

        let sections = headers
            .into_iter()
            .map(|header| Section::read(data, layout, header, dictionary))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            layout,
            kind,
            flags,
            version,
            revision,
            sections,
        })
    }

    /// Serialize the block, magic excluded, into a fresh buffer. Bytes no
    /// structure covers are zero.
    pub fn to_bytes(&self) -> Result<Vec<u8>, super::Error> {
        let mut writer = io::Cursor::new(vec![]);
        self.write(&mut writer, 0)?;
        Ok(writer.into_inner())
    }

    /// Write the block over `writer`'s buffer with its first byte after the
    /// magic at `base`. Only decoded structures are written, everything else
    /// in the buffer is left as it is.
    pub fn write(&self, writer: &mut io::Cursor<Vec<u8>>, base: u64) -> Result<(), super::Error> {
        let wide = self.layout.wide();
        let base = base as i64;
        seek_to(writer, base, "block header")?;
        writer.write_field(wide, self.kind)?;
        writer.write_u8(self.flags)?;
        writer.write_u8(count_u8(self.sections.len(), "section")?)?;
        writer.write_field(wide, self.version)?;
        writer.write_field(wide, self.revision)?;
        for section in &self.sections {
            section.write_header(writer)?;
        }
        for section in &self.sections {
            section.write_table(writer, self.layout, base)?;
        }
        Ok(())
    }

    /// Variables with a known name and a decoded value, in table order
    pub fn variables(&self) -> impl Iterator<Item = Variable<'_>> {
        self.sections.iter().flat_map(|section| {
            section.entries.iter().filter_map(move |entry| {
                Some(Variable {
                    section: section.id,
                    name: entry.name.as_deref()?,
                    value: entry.value.as_ref()?,
                })
            })
        })
    }

    /// Everything the decode had to leave out
    pub fn diagnostics(&self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.sections.iter().flat_map(|section| {
            section.entries.iter().flat_map(move |entry| {
                let unresolved = entry.name.is_none().then_some(Diagnostic::UnresolvedHash {
                    section: section.id,
                    hash: entry.key.hash,
                });
                let unsupported = entry.param.ty().is_none().then_some(Diagnostic::UnsupportedType {
                    section: section.id,
                    hash: entry.key.hash,
                    tag: entry.param.type_tag,
                });
                unresolved.into_iter().chain(unsupported)
            })
        })
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.sections
            .iter()
            .flat_map(|section| &section.entries)
            .find(|entry| entry.name.as_deref() == Some(name))
    }

    pub fn entry_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.sections
            .iter_mut()
            .flat_map(|section| &mut section.entries)
            .find(|entry| entry.name.as_deref() == Some(name))
    }
}
