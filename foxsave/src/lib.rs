mod block;
mod cipher;
mod dictionary;
mod error;
mod ext;
mod format;
mod save;
mod slot;
mod value;

pub use {
    block::*, cipher::*, dictionary::*, error::*, format::*, save::*, slot::*, value::*,
};

/// Magic of a bare ScriptVar block
pub const SVAR_MAGIC: [u8; 4] = *b"SVAR";
/// Magic of a composite slot bundling several ScriptVar blocks
pub const SVCS_MAGIC: [u8; 4] = *b"SVCS";

/// Round `offset` up to the next multiple of four
pub fn align4(offset: u64) -> u64 {
    (offset + 3) & !3
}

/// Logical partition of game state. Every category has its own cipher key.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Category {
    Game,
    Config,
    Personal,
    Graphics,
    Mgo,
}

// strum shouldn't need to be installed by users
impl Category {
    pub fn iter() -> CategoryIter {
        <Category as strum::IntoEnumIterator>::iter()
    }

    /// String the keystream seed is derived from
    pub fn key(self) -> &'static str {
        match self {
            Category::Game => "TPP_GAME_DATA",
            Category::Config => "TPP_CONFIG_DATA",
            Category::Personal => "PERSONAL_DATA",
            Category::Graphics => "TPP_GRAPHICS_CONFIG",
            Category::Mgo => "MGO_GAME_DATA",
        }
    }

    /// Pick the category whose key appears in a save file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::iter().find(|category| name.contains(category.key()))
    }

    /// Block layout this category is stored with
    pub fn layout(self) -> Layout {
        match self {
            Category::Config | Category::Graphics => Layout::Legacy,
            Category::Game | Category::Personal | Category::Mgo => Layout::HeaderRelative,
        }
    }
}

/// On-disk generation of a ScriptVar block.
///
/// All block coordinates are relative to the first byte after the block's
/// `SVAR` magic. The two generations disagree on header field widths and on
/// the frame table and payload offsets are stored in.
#[derive(
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Layout {
    /// u16 header fields, table offsets relative to the end of the header
    Legacy,
    /// u32 header fields, all offsets relative to the block magic
    #[default]
    HeaderRelative,
}

impl Layout {
    pub fn iter() -> LayoutIter {
        <Layout as strum::IntoEnumIterator>::iter()
    }

    /// Whether type and version header fields are 32 bits wide
    pub fn wide(self) -> bool {
        self == Layout::HeaderRelative
    }

    pub fn header_size(self) -> usize {
        // type + version + revision, then flags: u8 + section count: u8
        let field = if self.wide() { 4 } else { 2 };
        field * 3 + 1 + 1
    }

    fn table_base(self) -> u64 {
        match self {
            Layout::Legacy => self.header_size() as u64,
            Layout::HeaderRelative => 0,
        }
    }

    fn table_adjust(self) -> i64 {
        match self {
            Layout::Legacy => 0,
            Layout::HeaderRelative => -4,
        }
    }

    fn payload_base(self) -> i64 {
        match self {
            Layout::Legacy => 16,
            Layout::HeaderRelative => -4,
        }
    }

    /// Start of a section's u16 index table. The header-relative adjustment
    /// applies here too, not only to the key table, so the index table ends
    /// where the keys begin.
    pub fn index_offset(self, data_offset: u32) -> i64 {
        align4(self.table_base() + data_offset as u64) as i64 + self.table_adjust()
    }

    /// Start of a section's key table, `count` being the section's entry count
    pub fn key_offset(self, data_offset: u32, count: usize) -> i64 {
        align4(self.table_base() + data_offset as u64 + count as u64 * 2) as i64
            + self.table_adjust()
    }

    /// Start of a section's value parameter table, directly after the keys
    pub fn param_offset(self, data_offset: u32, count: usize) -> i64 {
        self.key_offset(data_offset, count) + (count * Key::SIZE) as i64
    }

    /// Location of the payload a value parameter points at. Positions before
    /// the start of the block are clamped to it.
    pub fn payload_offset(self, offset: u32) -> i64 {
        (offset as i64 + self.payload_base()).max(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_align4() {
        for x in 0..64u64 {
            let aligned = align4(x);
            assert_eq!(aligned, (x + 3) & !3);
            assert_eq!(aligned % 4, 0);
            assert!(aligned >= x && aligned - x < 4);
        }
    }

    #[test]
    fn test_category_from_file_name() {
        assert_eq!(
            Category::from_file_name("saves/TPP_GAME_DATA1"),
            Some(Category::Game)
        );
        assert_eq!(
            Category::from_file_name("TPP_GRAPHICS_CONFIG"),
            Some(Category::Graphics)
        );
        assert_eq!(
            Category::from_file_name("MGO_GAME_DATA"),
            Some(Category::Mgo)
        );
        assert_eq!(Category::from_file_name("notes.txt"), None);
        assert_eq!("personal".parse::<Category>().unwrap(), Category::Personal);
    }

    #[test]
    fn test_layout_offsets() {
        assert_eq!(Layout::Legacy.header_size(), 8);
        assert_eq!(Layout::HeaderRelative.header_size(), 14);

        // header-relative offsets count from the magic, four bytes before the block
        assert_eq!(Layout::HeaderRelative.index_offset(28), 24);
        assert_eq!(Layout::HeaderRelative.key_offset(28, 2), 28);
        assert_eq!(Layout::HeaderRelative.param_offset(28, 2), 44);
        assert_eq!(Layout::HeaderRelative.payload_offset(64), 60);
        // offsets inside the magic clamp to the first block byte
        assert_eq!(Layout::HeaderRelative.payload_offset(2), 0);
        assert_eq!(Layout::HeaderRelative.payload_offset(0), 0);

        assert_eq!(Layout::Legacy.index_offset(8), 16);
        assert_eq!(Layout::Legacy.key_offset(8, 1), 20);
        assert_eq!(Layout::Legacy.param_offset(8, 1), 28);
        assert_eq!(Layout::Legacy.payload_offset(20), 36);
    }
}
