use super::ext::{cursor_at, ReadExt};
use super::{
    Block, Category, Cipher, CompositeSlot, Diagnostic, Dictionary, Layout, Value, Variable,
    SVAR_MAGIC, SVCS_MAGIC,
};
use md5::{Digest, Md5};
use std::io::{self, Read, Write};

/// Size of the MD5 digest leading every container
pub const CHECKSUM_SIZE: usize = 16;

/// MD5 over everything that follows the checksum field
pub fn checksum(payload: &[u8]) -> [u8; CHECKSUM_SIZE] {
    Md5::digest(payload).into()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Contents {
    Composite(CompositeSlot),
    Direct(Block),
}

/// Decrypted save file: checksum, magic and the blocks behind it
#[derive(Debug, Clone, PartialEq)]
pub struct Save {
    pub category: Option<Category>,
    pub layout: Layout,
    /// Checksum as found in the parsed buffer
    pub checksum: [u8; CHECKSUM_SIZE],
    pub contents: Contents,
    /// Payload as parsed, magic onward. Encoding writes the decoded structures
    /// over a copy of it so bytes no structure covers survive.
    image: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct SaveBuilder {
    category: Option<Category>,
    layout: Option<Layout>,
    verify_checksum: bool,
}

impl Default for SaveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveBuilder {
    pub fn new() -> Self {
        Self {
            category: None,
            layout: None,
            verify_checksum: true,
        }
    }
    /// Category being processed; picks the block layout unless one is set explicitly
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }
    /// Skip the MD5 comparison, for inspecting damaged files
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }
    fn resolved_layout(&self) -> Layout {
        self.layout
            .or(self.category.map(Category::layout))
            .unwrap_or_default()
    }

    /// Parse an already decrypted buffer
    pub fn parse(&self, data: &[u8], dictionary: &Dictionary) -> Result<Save, super::Error> {
        let layout = self.resolved_layout();
        let mut reader = cursor_at(data, 0, CHECKSUM_SIZE + 4, "container header")?;
        let mut stored = [0; CHECKSUM_SIZE];
        reader.read_exact(&mut stored)?;

        let payload = &data[CHECKSUM_SIZE..];
        let actual = checksum(payload);
        if actual != stored {
            if self.verify_checksum {
                return Err(super::Error::Checksum {
                    expected: stored,
                    actual,
                });
            }
            log::warn!("ignoring checksum mismatch");
        }

        let contents = match reader.read_magic()? {
            SVCS_MAGIC => Contents::Composite(CompositeSlot::read(payload, layout, dictionary)?),
            SVAR_MAGIC => Contents::Direct(Block::read(&payload[4..], layout, dictionary)?),
            magic => return Err(super::Error::UnknownFormat(magic)),
        };

        let save = Save {
            category: self.category,
            layout,
            checksum: stored,
            contents,
            image: payload.to_vec(),
        };
        for diagnostic in save.diagnostics() {
            log::debug!("{diagnostic}");
        }
        Ok(save)
    }

    /// Decrypt `data` in place, then parse it
    pub fn decrypt_and_parse(
        &self,
        cipher: &Cipher,
        data: &mut [u8],
        dictionary: &Dictionary,
    ) -> Result<Save, super::Error> {
        cipher.apply(data);
        self.parse(data, dictionary)
    }
}

impl Save {
    pub fn new(category: Option<Category>, layout: Layout, contents: Contents) -> Self {
        Self {
            category,
            layout,
            checksum: [0; CHECKSUM_SIZE],
            contents,
            image: vec![],
        }
    }

    pub fn parse(data: &[u8], layout: Layout, dictionary: &Dictionary) -> Result<Self, super::Error> {
        SaveBuilder::new().layout(layout).parse(data, dictionary)
    }

    pub fn magic(&self) -> [u8; 4] {
        match self.contents {
            Contents::Composite(_) => SVCS_MAGIC,
            Contents::Direct(_) => SVAR_MAGIC,
        }
    }

    pub fn blocks(&self) -> Vec<&Block> {
        match &self.contents {
            Contents::Composite(composite) => composite.slots.iter().map(|s| &s.block).collect(),
            Contents::Direct(block) => vec![block],
        }
    }

    pub fn blocks_mut(&mut self) -> Vec<&mut Block> {
        match &mut self.contents {
            Contents::Composite(composite) => {
                composite.slots.iter_mut().map(|s| &mut s.block).collect()
            }
            Contents::Direct(block) => vec![block],
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable<'_>> {
        self.blocks().into_iter().flat_map(Block::variables)
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.blocks()
            .into_iter()
            .flat_map(Block::diagnostics)
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.blocks()
            .into_iter()
            .find_map(|block| block.entry(name)?.value.as_ref())
    }

    /// Replace a variable's value. Type and element count must stay the same,
    /// as tables are never relaid out.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), super::Error> {
        let entry = self
            .blocks_mut()
            .into_iter()
            .find_map(|block| block.entry_mut(name))
            .ok_or_else(|| super::Error::MissingVariable(name.to_owned()))?;
        match entry.param.ty() {
            Some(expected) if expected != value.ty() => {
                return Err(super::Error::Type {
                    name: name.to_owned(),
                    expected,
                    actual: value.ty(),
                })
            }
            _ => {}
        }
        if value.len() != entry.param.array_size as usize {
            return Err(super::Error::Length {
                name: name.to_owned(),
                expected: entry.param.array_size as usize,
                actual: value.len(),
            });
        }
        entry.value = Some(value);
        Ok(())
    }

    /// Serialize to the on-disk shape with a freshly computed checksum. A
    /// parsed save is written over its source bytes, a new one over zeros.
    pub fn to_bytes(&self) -> Result<Vec<u8>, super::Error> {
        let mut writer = io::Cursor::new(self.image.clone());
        match &self.contents {
            Contents::Composite(composite) => composite.write(&mut writer)?,
            Contents::Direct(block) => {
                writer.write_all(&SVAR_MAGIC)?;
                block.write(&mut writer, 4)?;
            }
        }
        let payload = writer.into_inner();

        let mut data = Vec::with_capacity(CHECKSUM_SIZE + payload.len());
        data.extend_from_slice(&checksum(&payload));
        data.extend_from_slice(&payload);
        Ok(data)
    }

    /// Serialize and encrypt with the key of `category`
    pub fn to_encrypted(&self, category: Category) -> Result<Vec<u8>, super::Error> {
        let mut data = self.to_bytes()?;
        Cipher::for_category(category).apply(&mut data);
        Ok(data)
    }
}
