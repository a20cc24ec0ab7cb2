use super::ext::{count_u8, cursor_at, seek_to, ReadExt};
use super::{Block, Dictionary, Layout, SVAR_MAGIC, SVCS_MAGIC};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{self, Write};

/// Location of one embedded block inside a composite slot
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
    /// Position of the block's `SVAR` magic, counted from the container magic
    pub offset: u32,
    pub size1: u32,
    pub size2: u32,
}

impl SlotEntry {
    pub const SIZE: usize = 12;

    pub fn read<R: io::Read>(reader: &mut R) -> Result<Self, super::Error> {
        Ok(Self {
            offset: reader.read_u32::<LE>()?,
            size1: reader.read_u32::<LE>()?,
            size2: reader.read_u32::<LE>()?,
        })
    }

    pub fn write<W: io::Write>(&self, writer: &mut W) -> Result<(), super::Error> {
        writer.write_u32::<LE>(self.offset)?;
        writer.write_u32::<LE>(self.size1)?;
        writer.write_u32::<LE>(self.size2)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub entry: SlotEntry,
    pub block: Block,
}

/// Outer container multiplexing several ScriptVar blocks into one save
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSlot {
    pub kind: u16,
    pub reserved: u8,
    pub slots: Vec<Slot>,
}

impl CompositeSlot {
    /// type + reserved byte + entry count
    pub const HEADER_SIZE: usize = 4;

    /// Parse from `payload`, which starts at the `SVCS` magic
    pub fn read(
        payload: &[u8],
        layout: Layout,
        dictionary: &Dictionary,
    ) -> Result<Self, super::Error> {
        let mut reader = cursor_at(payload, 4, Self::HEADER_SIZE, "composite slot header")?;
        let kind = reader.read_u16::<LE>()?;
        let reserved = reader.read_u8()?;
        let count = reader.read_u8()? as usize;
        let entries = cursor_at(
            payload,
            (4 + Self::HEADER_SIZE) as i64,
            count * SlotEntry::SIZE,
            "composite slot entries",
        )?
        .read_many(count, SlotEntry::read)?;

        let slots = entries
            .into_iter()
            .map(|entry| {
                let offset = entry.offset as i64;
                let magic = cursor_at(payload, offset, 4, "slot block magic")?.read_magic()?;
                if magic != SVAR_MAGIC {
                    return Err(super::Error::UnknownFormat(magic));
                }
                log::trace!("slot block at {offset:#x}, {} bytes", entry.size1);
                let block = Block::read(&payload[entry.offset as usize + 4..], layout, dictionary)?;
                Ok(Slot { entry, block })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            kind,
            reserved,
            slots,
        })
    }

    /// Write over a payload buffer whose position 0 is the `SVCS` magic.
    /// Bytes between and around the blocks are left untouched.
    pub fn write(&self, writer: &mut io::Cursor<Vec<u8>>) -> Result<(), super::Error> {
        seek_to(writer, 0, "composite slot header")?;
        writer.write_all(&SVCS_MAGIC)?;
        writer.write_u16::<LE>(self.kind)?;
        writer.write_u8(self.reserved)?;
        writer.write_u8(count_u8(self.slots.len(), "composite slot")?)?;
        for slot in &self.slots {
            slot.entry.write(writer)?;
        }
        for slot in &self.slots {
            seek_to(writer, slot.entry.offset as i64, "slot block")?;
            writer.write_all(&SVAR_MAGIC)?;
            slot.block.write(writer, slot.entry.offset as u64 + 4)?;
        }
        Ok(())
    }
}

/// Save slots the game registers ScriptVar sections under
#[repr(u16)]
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
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotKind {
    Global = 0,
    CheckPoint = 1,
    Retry = 2,
    MbManagement = 3,
    Quest = 4,
    MissionStart = 5,
    CheckPointRestartable = 6,
    Config = 7,
    /// Whole game data save, the sum of the game slots
    Saving = 8,
    ConfigSave = 9,
    Personal = 10,
    PersonalSave = 11,
    MgoSave = 13,
}

impl SlotKind {
    pub fn iter() -> SlotKindIter {
        <SlotKind as strum::IntoEnumIterator>::iter()
    }

    /// Slot a section id refers to, if it is a known one
    pub fn from_section(id: u16) -> Option<Self> {
        Self::from_repr(id)
    }

    /// Bytes the game reserves for the slot
    pub fn capacity(self) -> usize {
        match self {
            SlotKind::Global => 14 * 1024,
            SlotKind::CheckPoint => 65 * 1024,
            SlotKind::Retry => 11 * 1024,
            SlotKind::MbManagement => 80 * 1024 + 512 + 2688,
            SlotKind::Quest => 2 * 1024,
            SlotKind::MissionStart | SlotKind::CheckPointRestartable => 10 * 1024,
            SlotKind::Config | SlotKind::ConfigSave => 2 * 1024,
            SlotKind::Saving => 0,
            SlotKind::Personal | SlotKind::PersonalSave => 3 * 1024,
            SlotKind::MgoSave => 16 * 1024,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Entry, Key, Section, Value, ValueParam};

    fn block(hash: u32, value: u32) -> Block {
        Block {
            layout: Layout::HeaderRelative,
            kind: 0,
            flags: 0,
            version: 1,
            revision: 0,
            // header 14 + one section header 8 = 22, magic-relative 26, tables at 28
            sections: vec![Section {
                id: 0,
                data_offset: 28,
                entries: vec![Entry {
                    index: 0,
                    key: Key {
                        hash,
                        param1: 0xffff,
                        param2: 0,
                    },
                    param: ValueParam {
                        offset: 44,
                        array_size: 1,
                        type_tag: 2,
                        reserved: 0,
                    },
                    name: None,
                    value: Some(Value::UInt32(vec![value])),
                }],
            }],
        }
    }

    fn composite() -> CompositeSlot {
        CompositeSlot {
            kind: 2,
            reserved: 0,
            slots: vec![
                Slot {
                    entry: SlotEntry {
                        offset: 32,
                        size1: 48,
                        size2: SlotKind::Global.capacity() as u32,
                    },
                    block: block(0xaaaa, 5),
                },
                Slot {
                    entry: SlotEntry {
                        offset: 80,
                        size1: 48,
                        size2: SlotKind::Quest.capacity() as u32,
                    },
                    block: block(0xbbbb, 6),
                },
            ],
        }
    }

    #[test]
    fn test_round_trip() {
        let mut dictionary = Dictionary::new();
        dictionary.insert(0xaaaa, "first");
        dictionary.insert(0xbbbb, "second");

        let mut writer = io::Cursor::new(vec![]);
        composite().write(&mut writer).unwrap();
        let payload = writer.into_inner();
        assert_eq!(&payload[..4], b"SVCS");
        assert_eq!(&payload[32..36], b"SVAR");
        assert_eq!(&payload[80..84], b"SVAR");
        // block payload at magic-relative 44, i.e. 32 + 44
        assert_eq!(&payload[76..80], &5u32.to_le_bytes());

        let read = CompositeSlot::read(&payload, Layout::HeaderRelative, &dictionary).unwrap();
        assert_eq!(read.kind, 2);
        assert_eq!(read.slots.len(), 2);
        assert_eq!(read.slots[1].entry.size2, 2048);
        let names: Vec<_> = read
            .slots
            .iter()
            .flat_map(|slot| slot.block.variables())
            .map(|v| (v.name, v.value.clone()))
            .collect();
        assert_eq!(
            names,
            [
                ("first", Value::UInt32(vec![5])),
                ("second", Value::UInt32(vec![6]))
            ]
        );

        let mut writer = io::Cursor::new(vec![]);
        read.write(&mut writer).unwrap();
        assert_eq!(writer.into_inner(), payload);
    }

    #[test]
    fn test_slack_survives() {
        let mut writer = io::Cursor::new(vec![]);
        composite().write(&mut writer).unwrap();
        let mut payload = writer.into_inner();
        // gap after the first block's section header, then slack past the last block
        payload[58] = 0xab;
        payload.extend_from_slice(&[0x5a; 6]);

        let read =
            CompositeSlot::read(&payload, Layout::HeaderRelative, &Dictionary::new()).unwrap();
        let mut writer = io::Cursor::new(payload.clone());
        read.write(&mut writer).unwrap();
        assert_eq!(writer.into_inner(), payload);
    }

    #[test]
    fn test_entry_without_block_magic() {
        let mut writer = io::Cursor::new(vec![]);
        composite().write(&mut writer).unwrap();
        let mut payload = writer.into_inner();
        payload[80..84].copy_from_slice(b"XXXX");
        assert!(matches!(
            CompositeSlot::read(&payload, Layout::HeaderRelative, &Dictionary::new()),
            Err(crate::Error::UnknownFormat(magic)) if &magic == b"XXXX"
        ));
    }

    #[test]
    fn test_entry_past_end() {
        let mut writer = io::Cursor::new(vec![]);
        composite().write(&mut writer).unwrap();
        let payload = writer.into_inner();
        assert!(matches!(
            CompositeSlot::read(&payload[..60], Layout::HeaderRelative, &Dictionary::new()),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_slot_kinds() {
        assert_eq!(SlotKind::from_section(3), Some(SlotKind::MbManagement));
        assert_eq!(SlotKind::from_section(12), None);
        assert_eq!(SlotKind::MbManagement.to_string(), "MB_MANAGEMENT");
        assert_eq!(SlotKind::MbManagement.capacity(), 85120);
        assert_eq!(
            "CHECK_POINT_RESTARTABLE".parse::<SlotKind>().unwrap(),
            SlotKind::CheckPointRestartable
        );
        assert_eq!(SlotKind::iter().count(), 13);
    }
}
