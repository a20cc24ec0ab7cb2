use crate::Type;

#[derive(thiserror::Error)]
pub enum Error {
    // std errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // crate errors
    #[error(
        "bad data checksum, want {}, got {} (wrong key or data not decrypted?)",
        hex::encode(.expected),
        hex::encode(.actual)
    )]
    Checksum { expected: [u8; 16], actual: [u8; 16] },

    #[error("unknown container magic {:?}", String::from_utf8_lossy(.0))]
    UnknownFormat([u8; 4]),

    #[error("{what} at {offset:#x} ({len} bytes) is out of bounds")]
    Malformed {
        what: &'static str,
        offset: i64,
        len: usize,
    },

    #[error("{count} {what} entries do not fit the on-disk count field")]
    TooMany { what: &'static str, count: usize },

    #[error("{0}")]
    Other(&'static str),

    #[error("dictionary line {0} is not \"<hash> <name>\"")]
    DictionaryLine(usize),

    #[error("no variable named {0}")]
    MissingVariable(String),

    #[error("variable {name} is {expected}, got {actual}")]
    Type {
        name: String,
        expected: Type,
        actual: Type,
    },

    #[error("variable {name} holds {expected} elements, got {actual}")]
    Length {
        name: String,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Conditions that degrade a decode without aborting it
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Diagnostic {
    /// The key hash has no dictionary entry, so the variable is left out of
    /// decoded output
    UnresolvedHash { section: u16, hash: u32 },
    /// The value parameter carries a type tag outside the known set, so the
    /// payload is left undecoded
    UnsupportedType { section: u16, hash: u32, tag: u8 },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnresolvedHash { section, hash } => {
                write!(f, "section {section}: hash {hash:08x} not found")
            }
            Diagnostic::UnsupportedType { section, hash, tag } => {
                write!(f, "section {section}: hash {hash:08x} has unknown type tag {tag}")
            }
        }
    }
}
