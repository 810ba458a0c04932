//! The canonical metadata tree.
//!
//! Every DAT dialect parses into a [`MetadataFile`] and every writer walks
//! one back out; dialects never talk to each other directly. The tree is
//! built in a single top-down pass and is read-only after the parser
//! returns.
//!
//! The model is deliberately sparse: all fields are optional, and each
//! structural node carries an `extras` list of verbatim unrecognized lines
//! so a file survives a parse/write round trip even when it contains
//! content the model does not know about.

use serde::{Deserialize, Serialize};

use crate::item::DatItem;

/// A fully parsed metadata file: one header, any number of machines, plus
/// raw lines that matched no structural rule anywhere in the file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataFile {
    pub header: Header,
    pub machines: Vec<Machine>,
    /// Lines that belonged to no block or row shape, in encounter order.
    pub extras: Vec<String>,
}

impl MetadataFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total item count across all machines.
    pub fn item_count(&self) -> usize {
        self.machines.iter().map(|m| m.items.len()).sum()
    }
}

/// File-level metadata. Dialects set only the keys they express.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Header {
    /// On-disk file name recorded inside the DAT (separated-value dialects).
    pub file_name: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub email: Option<String>,
    pub homepage: Option<String>,
    pub url: Option<String>,
    pub comment: Option<String>,
    pub category: Option<String>,
    /// RomCenter plugin identifier.
    pub plugin: Option<String>,
    /// RomCenter data-file format version (distinct from `version`).
    pub romcenter_version: Option<String>,
    /// ClrMamePro `forcemerging` mode (none, split, full).
    pub force_merging: Option<String>,
    /// ClrMamePro `forcenodump` mode (obsolete, required, ignore).
    pub force_nodump: Option<String>,
    /// ClrMamePro `forcepacking` mode (zip, unzip).
    pub force_packing: Option<String>,
    /// Ordered column names from a delimited dialect's header row.
    pub column_headers: Option<Vec<String>>,
    /// Unrecognized header lines, in encounter order.
    pub extras: Vec<String>,
}

impl Header {
    /// True when no field is set and nothing was captured.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One cataloged set: a game, software title, or referenced hardware
/// device, with its item entries.
///
/// The wide sparse field set mirrors what the frontend-oriented dialects
/// (AttractMode in particular) record per row; block dialects use only a
/// handful of these.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Machine {
    pub name: Option<String>,
    pub description: Option<String>,
    pub year: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub cloneof: Option<String>,
    pub romof: Option<String>,
    pub sampleof: Option<String>,
    pub players: Option<String>,
    pub rotation: Option<String>,
    pub control: Option<String>,
    /// Frontend emulation status text ("good", "imperfect", ...). Distinct
    /// from the per-item dump status.
    pub status: Option<String>,
    pub display_count: Option<String>,
    pub display_type: Option<String>,
    pub alt_romname: Option<String>,
    pub alt_title: Option<String>,
    pub buttons: Option<String>,
    pub favorite: Option<String>,
    pub tags: Option<String>,
    pub played_count: Option<String>,
    pub played_time: Option<String>,
    pub file_is_available: Option<String>,
    pub comment: Option<String>,
    /// True for referenced hardware devices rather than real sets.
    pub is_device: bool,
    pub items: Vec<DatItem>,
    /// Unrecognized lines seen inside this machine's block, in order.
    pub extras: Vec<String>,
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn device(mut self) -> Self {
        self.is_device = true;
        self
    }

    /// ROMs in this machine, in file order.
    pub fn roms(&self) -> impl Iterator<Item = &crate::item::Rom> {
        self.items.iter().filter_map(|item| match item {
            DatItem::Rom(rom) => Some(rom),
            _ => None,
        })
    }

    /// Disks in this machine, in file order.
    pub fn disks(&self) -> impl Iterator<Item = &crate::item::Disk> {
        self.items.iter().filter_map(|item| match item {
            DatItem::Disk(disk) => Some(disk),
            _ => None,
        })
    }
}
