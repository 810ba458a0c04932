//! Typed item entries belonging to a machine: ROMs, disks (CHDs), media
//! images, and audio samples.
//!
//! Every field a dialect might not express is `Option`; absence means "this
//! dialect has no such concept", never an error. Unrecognized content that
//! arrived alongside an item is kept verbatim in its `extras` list so the
//! originating dialect can be written back without loss.

use serde::{Deserialize, Serialize};

/// Dump status for a ROM or disk entry.
///
/// This is a closed set: dialects that use other spellings ("good",
/// "verified") map onto these three values or fall back to [`ItemStatus::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    /// No status recorded (a normal, presumed-good dump).
    #[default]
    None,
    /// The dump is known to be bad.
    BadDump,
    /// No good dump of this item is known to exist.
    NoDump,
}

impl ItemStatus {
    /// Canonical lowercase spelling, or `None` for the default status.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::BadDump => Some("baddump"),
            Self::NoDump => Some("nodump"),
        }
    }

    /// Parse a dialect status string. Unknown spellings return `None` so the
    /// caller can preserve the raw text instead of guessing.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "baddump" => Some(Self::BadDump),
            "nodump" => Some(Self::NoDump),
            "good" | "verified" => Some(Self::None),
            _ => None,
        }
    }
}

/// A single item within a machine, tagged by kind.
///
/// Matched exhaustively everywhere — adding a variant is a compile-time
/// ripple through every writer, which is the point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatItem {
    Rom(Rom),
    Disk(Disk),
    Media(Media),
    Sample(Sample),
}

impl DatItem {
    /// The item's file name, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Rom(rom) => rom.name.as_deref(),
            Self::Disk(disk) => disk.name.as_deref(),
            Self::Media(media) => media.name.as_deref(),
            Self::Sample(sample) => Some(&sample.name),
        }
    }
}

/// A ROM file entry: sized content tracked by one or more checksums.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rom {
    pub name: Option<String>,
    /// Size in bytes, when the dialect records one.
    pub size: Option<u64>,
    /// CRC32 checksum (lowercase hex)
    pub crc: Option<String>,
    /// MD5 checksum (lowercase hex)
    pub md5: Option<String>,
    /// SHA1 checksum (lowercase hex)
    pub sha1: Option<String>,
    /// SHA256 checksum (lowercase hex)
    pub sha256: Option<String>,
    /// SHA384 checksum (lowercase hex)
    pub sha384: Option<String>,
    /// SHA512 checksum (lowercase hex)
    pub sha512: Option<String>,
    /// SpamSum fuzzy hash
    pub spamsum: Option<String>,
    /// Dump date, kept as the dialect's own text (formats vary wildly).
    pub date: Option<String>,
    pub status: ItemStatus,
    /// Unrecognized key/value tokens from the source record, in order.
    pub extras: Vec<String>,
}

impl Rom {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_crc(mut self, crc: impl Into<String>) -> Self {
        self.crc = Some(crc.into());
        self
    }

    pub fn with_sha1(mut self, sha1: impl Into<String>) -> Self {
        self.sha1 = Some(sha1.into());
        self
    }
}

/// A disk (CHD) entry: hash-tracked, never sized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Disk {
    pub name: Option<String>,
    /// MD5 checksum (lowercase hex)
    pub md5: Option<String>,
    /// SHA1 checksum (lowercase hex)
    pub sha1: Option<String>,
    pub status: ItemStatus,
    pub writable: bool,
    /// Unrecognized key/value tokens from the source record, in order.
    pub extras: Vec<String>,
}

impl Disk {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_sha1(mut self, sha1: impl Into<String>) -> Self {
        self.sha1 = Some(sha1.into());
        self
    }
}

/// A media image entry (UMD, cartridge dumps with fuzzy hashes, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Media {
    pub name: Option<String>,
    /// MD5 checksum (lowercase hex)
    pub md5: Option<String>,
    /// SHA1 checksum (lowercase hex)
    pub sha1: Option<String>,
    /// SHA256 checksum (lowercase hex)
    pub sha256: Option<String>,
    /// SpamSum fuzzy hash
    pub spamsum: Option<String>,
    /// Unrecognized key/value tokens from the source record, in order.
    pub extras: Vec<String>,
}

/// An audio sample reference (name only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
}
