use byteorder::{ByteOrder, LE};
use std::collections::HashMap;

/// Word list lines longer than this are never variable names
pub const MAX_NAME_LEN: usize = 100;

/// Read-only lookup from a 32-bit string hash to the variable name it came from.
///
/// Built once and shared by reference across any number of decode passes.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    names: HashMap<u32, String>,
}

/// A known hash found in a raw buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit<'dict> {
    pub offset: usize,
    pub name: &'dict str,
    /// The u32 stored right after the hash, if the buffer is long enough
    pub value: Option<u32>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash every line of a word list with a 64-bit string hash, keeping the low 32 bits
    pub fn from_word_list(text: &str, hasher: impl Fn(&[u8]) -> u64) -> Self {
        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty() && line.len() <= MAX_NAME_LEN)
            .map(|line| (hasher(line.as_bytes()) as u32, line.to_owned()))
            .collect()
    }

    /// Parse `<hex hash> <name>` lines. Hashes wider than 32 bits are truncated.
    pub fn from_hashed_list(text: &str) -> Result<Self, super::Error> {
        let mut dictionary = Self::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (hash, name) = line
                .split_once(char::is_whitespace)
                .ok_or(super::Error::DictionaryLine(number + 1))?;
            let hash = hash.strip_prefix("0x").unwrap_or(hash);
            let hash = u64::from_str_radix(hash, 16)
                .map_err(|_| super::Error::DictionaryLine(number + 1))?;
            let name = name.trim();
            if name.len() > MAX_NAME_LEN {
                continue;
            }
            dictionary.insert(hash as u32, name);
        }
        Ok(dictionary)
    }

    pub fn lookup(&self, hash: u32) -> Option<&str> {
        self.names.get(&hash).map(String::as_str)
    }

    pub fn insert(&mut self, hash: u32, name: impl Into<String>) -> Option<String> {
        self.names.insert(hash, name.into())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Find every position in `data` holding a known hash, ordered by offset.
    ///
    /// Works on any decrypted buffer without understanding its layout, so it
    /// also turns up variables in sections the block parser cannot reach.
    pub fn scan<'dict>(&'dict self, data: &[u8]) -> Vec<Hit<'dict>> {
        data.windows(4)
            .enumerate()
            .filter_map(|(offset, window)| {
                let name = self.lookup(LE::read_u32(window))?;
                let value = data.get(offset + 4..offset + 8).map(LE::read_u32);
                Some(Hit {
                    offset,
                    name,
                    value,
                })
            })
            .collect()
    }
}

impl FromIterator<(u32, String)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

impl Extend<(u32, String)> for Dictionary {
    fn extend<I: IntoIterator<Item = (u32, String)>>(&mut self, iter: I) {
        self.names.extend(iter)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // stand-in for the game's string hash, only the low 32 bits matter
    fn sum_hash(bytes: &[u8]) -> u64 {
        bytes
            .iter()
            .fold(0xdead_0000_0000_0000u64, |acc, &b| acc.wrapping_mul(31).wrapping_add(b as u64))
    }

    #[test]
    fn test_word_list() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let text = format!("playerName\r\nmissionId\n{long}\n\n");
        let dictionary = Dictionary::from_word_list(&text, sum_hash);
        assert_eq!(dictionary.len(), 2);
        assert_eq!(
            dictionary.lookup(sum_hash(b"playerName") as u32),
            Some("playerName")
        );
        assert_eq!(
            dictionary.lookup(sum_hash(b"missionId") as u32),
            Some("missionId")
        );
        assert_eq!(dictionary.lookup(sum_hash(long.as_bytes()) as u32), None);
    }

    #[test]
    fn test_hashed_list() {
        let dictionary = Dictionary::from_hashed_list(
            "# comment\n0x0000001a totalKills\n1b  personalName\nfedcba9800000001 wide\n",
        )
        .unwrap();
        assert_eq!(dictionary.lookup(0x1a), Some("totalKills"));
        assert_eq!(dictionary.lookup(0x1b), Some("personalName"));
        assert_eq!(dictionary.lookup(1), Some("wide"));

        assert!(matches!(
            Dictionary::from_hashed_list("0x10 ok\nnothex name\n"),
            Err(crate::Error::DictionaryLine(2))
        ));
        assert!(matches!(
            Dictionary::from_hashed_list("0x10\n"),
            Err(crate::Error::DictionaryLine(1))
        ));
    }

    #[test]
    fn test_scan() {
        let mut dictionary = Dictionary::new();
        dictionary.insert(0xaabbccdd, "alpha");
        dictionary.insert(0x11223344, "beta");

        let data = [
            0, 0xdd, 0xcc, 0xbb, 0xaa, 7, 0, 0, 0, //
            0x44, 0x33, 0x22, 0x11, 9,
        ];
        let hits = dictionary.scan(&data);
        assert_eq!(
            hits,
            [
                Hit {
                    offset: 1,
                    name: "alpha",
                    value: Some(7),
                },
                Hit {
                    offset: 9,
                    name: "beta",
                    value: None,
                },
            ]
        );
    }
}
