//! Dialect registry: detection, naming, and parse/write dispatch.
//!
//! Detection mirrors how a person identifies these files: the extension
//! when it is distinctive (`.sfv`, `.smdb`, `.tsv`), otherwise a peek at
//! the leading content (`<` for XML, a `clrmamepro (` or `DOSCenter (`
//! opener, a `#Name;` romlist header, ...).

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use datloom_core::MetadataFile;

use crate::error::DatError;
use crate::hashfile::HashKind;
use crate::{attractmode, clrmamepro, doscenter, everdrive, hashfile, listrom, logiqx, romcenter, separated};

/// How many bytes of a file the content sniffer looks at.
const SNIFF_LEN: usize = 4096;

/// Every dialect datloom can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Logiqx XML datafile.
    Logiqx,
    /// ClrMamePro block-structured DAT.
    ClrMamePro,
    /// DosCenter block-structured DAT.
    DosCenter,
    /// RomCenter INI-style DAT.
    RomCenter,
    /// MAME `-listroms` columnar output.
    Listrom,
    /// AttractMode frontend romlist.
    AttractMode,
    /// Everdrive SMDB tab-separated hash list.
    EverdriveSmdb,
    /// Standard comma-separated DAT.
    Csv,
    /// Standard semicolon-separated DAT.
    Ssv,
    /// Standard tab-separated DAT.
    Tsv,
    /// One-hash-per-line file of the given digest.
    Hashfile(HashKind),
}

impl Format {
    pub const ALL: [Format; 15] = [
        Format::Logiqx,
        Format::ClrMamePro,
        Format::DosCenter,
        Format::RomCenter,
        Format::Listrom,
        Format::AttractMode,
        Format::EverdriveSmdb,
        Format::Csv,
        Format::Ssv,
        Format::Tsv,
        Format::Hashfile(HashKind::Crc32),
        Format::Hashfile(HashKind::Md5),
        Format::Hashfile(HashKind::Sha1),
        Format::Hashfile(HashKind::Sha256),
        Format::Hashfile(HashKind::SpamSum),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Logiqx => "logiqx",
            Self::ClrMamePro => "clrmamepro",
            Self::DosCenter => "doscenter",
            Self::RomCenter => "romcenter",
            Self::Listrom => "listrom",
            Self::AttractMode => "attractmode",
            Self::EverdriveSmdb => "everdrive",
            Self::Csv => "csv",
            Self::Ssv => "ssv",
            Self::Tsv => "tsv",
            Self::Hashfile(kind) => kind.name(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Logiqx => "Logiqx XML datafile",
            Self::ClrMamePro => "ClrMamePro block-structured DAT",
            Self::DosCenter => "DosCenter block-structured DAT",
            Self::RomCenter => "RomCenter INI-style DAT",
            Self::Listrom => "MAME -listroms columnar output",
            Self::AttractMode => "AttractMode frontend romlist (semicolon-separated)",
            Self::EverdriveSmdb => "Everdrive SMDB tab-separated hash list",
            Self::Csv => "standard comma-separated DAT",
            Self::Ssv => "standard semicolon-separated DAT",
            Self::Tsv => "standard tab-separated DAT",
            Self::Hashfile(HashKind::Crc32) => "SFV hash list (CRC32, hash last)",
            Self::Hashfile(HashKind::Md5) => "md5sum hash list",
            Self::Hashfile(HashKind::Sha1) => "sha1sum hash list",
            Self::Hashfile(HashKind::Sha256) => "sha256sum hash list",
            Self::Hashfile(HashKind::SpamSum) => "spamsum fuzzy hash list",
        }
    }

    /// Format guess from a distinctive file extension alone.
    pub fn from_extension(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "xml" => Some(Self::Logiqx),
            "csv" => Some(Self::Csv),
            "ssv" => Some(Self::Ssv),
            "tsv" => Some(Self::Tsv),
            "smdb" => Some(Self::EverdriveSmdb),
            "sfv" => Some(Self::Hashfile(HashKind::Crc32)),
            "md5" => Some(Self::Hashfile(HashKind::Md5)),
            "sha1" => Some(Self::Hashfile(HashKind::Sha1)),
            "sha256" => Some(Self::Hashfile(HashKind::Sha256)),
            "spamsum" => Some(Self::Hashfile(HashKind::SpamSum)),
            _ => None,
        }
    }

    /// Detect the format of an existing file: distinctive extension
    /// first, then a content sniff of the leading bytes.
    pub fn detect(path: &Path) -> Result<Format, DatError> {
        if let Some(format) = Self::from_extension(path) {
            return Ok(format);
        }

        let mut handle = std::fs::File::open(path)?;
        let mut buf = vec![0u8; SNIFF_LEN];
        let n = handle.read(&mut buf)?;
        buf.truncate(n);
        let head = String::from_utf8_lossy(&buf);

        sniff_content(&head).ok_or_else(|| {
            DatError::unsupported(format!("cannot detect format of {}", path.display()))
        })
    }

    /// Parse a file in this format.
    pub fn parse_path(&self, path: &Path) -> Result<MetadataFile, DatError> {
        match self {
            Self::Logiqx => logiqx::parse_path(path),
            Self::ClrMamePro => clrmamepro::parse_path(path),
            Self::DosCenter => doscenter::parse_path(path),
            Self::RomCenter => romcenter::parse_path(path),
            Self::Listrom => listrom::parse_path(path),
            Self::AttractMode => attractmode::parse_path(path),
            Self::EverdriveSmdb => everdrive::parse_path(path),
            Self::Csv => separated::parse_path(path, b','),
            Self::Ssv => separated::parse_path(path, b';'),
            Self::Tsv => separated::parse_path(path, b'\t'),
            Self::Hashfile(kind) => hashfile::parse_path(path, *kind),
        }
    }

    /// Write a tree to a file in this format.
    pub fn write_path(&self, path: &Path, file: &MetadataFile) -> Result<(), DatError> {
        match self {
            Self::Logiqx => logiqx::write_path(path, file),
            Self::ClrMamePro => clrmamepro::write_path(path, file),
            Self::DosCenter => doscenter::write_path(path, file),
            Self::RomCenter => romcenter::write_path(path, file),
            Self::Listrom => listrom::write_path(path, file),
            Self::AttractMode => attractmode::write_path(path, file),
            Self::EverdriveSmdb => everdrive::write_path(path, file),
            Self::Csv => separated::write_path(path, file, b','),
            Self::Ssv => separated::write_path(path, file, b';'),
            Self::Tsv => separated::write_path(path, file, b'\t'),
            Self::Hashfile(kind) => hashfile::write_path(path, file, *kind),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = DatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logiqx" | "xml" => Ok(Self::Logiqx),
            "clrmamepro" | "clrmame" | "cmp" => Ok(Self::ClrMamePro),
            "doscenter" | "dc" => Ok(Self::DosCenter),
            "romcenter" | "rc" => Ok(Self::RomCenter),
            "listrom" | "listroms" => Ok(Self::Listrom),
            "attractmode" | "am" => Ok(Self::AttractMode),
            "everdrive" | "smdb" => Ok(Self::EverdriveSmdb),
            "csv" => Ok(Self::Csv),
            "ssv" => Ok(Self::Ssv),
            "tsv" => Ok(Self::Tsv),
            "sfv" | "crc" | "crc32" => Ok(Self::Hashfile(HashKind::Crc32)),
            "md5" => Ok(Self::Hashfile(HashKind::Md5)),
            "sha1" => Ok(Self::Hashfile(HashKind::Sha1)),
            "sha256" => Ok(Self::Hashfile(HashKind::Sha256)),
            "spamsum" => Ok(Self::Hashfile(HashKind::SpamSum)),
            other => Err(DatError::unsupported(other.to_string())),
        }
    }
}

/// Inspect leading file content for a structural signature.
fn sniff_content(head: &str) -> Option<Format> {
    if head.trim_start().starts_with('<') {
        return Some(Format::Logiqx);
    }

    let mut first_data_line: Option<&str> = None;
    for line in head.lines().take(50) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lowered = trimmed.to_lowercase();

        if lowered.starts_with("clrmamepro (") {
            return Some(Format::ClrMamePro);
        }
        if lowered.starts_with("doscenter (") {
            return Some(Format::DosCenter);
        }
        if matches!(lowered.as_str(), "[credits]" | "[dat]" | "[emulator]" | "[games]") {
            return Some(Format::RomCenter);
        }
        if trimmed.starts_with("#Name;") {
            return Some(Format::AttractMode);
        }
        if trimmed.contains("ROMs required for") {
            return Some(Format::Listrom);
        }
        if trimmed.contains('\t') {
            // A tab-separated line leading with a SHA256 is an SMDB row;
            // a "File Name" header is a standard TSV DAT.
            let first = trimmed.split('\t').next().unwrap_or("");
            if first.len() == 64 && first.chars().all(|c| c.is_ascii_hexdigit()) {
                return Some(Format::EverdriveSmdb);
            }
            if trimmed.contains("File Name") {
                return Some(Format::Tsv);
            }
        }
        if trimmed.contains("File Name") {
            if trimmed.contains(';') {
                return Some(Format::Ssv);
            }
            if trimmed.contains(',') {
                return Some(Format::Csv);
            }
        }
        // A bare `game (` opener without a recognizable header block
        // still reads as ClrMamePro.
        if lowered.starts_with("game (") {
            return Some(Format::ClrMamePro);
        }

        // Remember the first line that could be data (SFV files may lead
        // with `;` comments) for the hashfile check below.
        if first_data_line.is_none() && !trimmed.starts_with(';') {
            first_data_line = Some(trimmed);
        }
    }

    first_data_line
        .and_then(sniff_hashfile_line)
        .map(Format::Hashfile)
}

/// A two-plus-token line whose first or last token is a digest of a
/// known width reads as a hashfile.
fn sniff_hashfile_line(trimmed: &str) -> Option<HashKind> {
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }

    let is_hex = |t: &str| t.chars().all(|c| c.is_ascii_hexdigit());
    let first = tokens[0];
    match first.len() {
        32 if is_hex(first) => return Some(HashKind::Md5),
        40 if is_hex(first) => return Some(HashKind::Sha1),
        64 if is_hex(first) => return Some(HashKind::Sha256),
        _ => {}
    }
    if first.matches(':').count() >= 2 {
        return Some(HashKind::SpamSum);
    }

    let last = tokens[tokens.len() - 1];
    if last.len() == 8 && is_hex(last) {
        return Some(HashKind::Crc32);
    }
    None
}

/// Convert one DAT file to another dialect through the canonical tree.
///
/// Returns the resolved source and destination formats. When `from` is
/// not given it is detected from the input; when `to` is not given it is
/// inferred from the output extension.
pub fn convert(
    input: &Path,
    output: &Path,
    from: Option<Format>,
    to: Option<Format>,
) -> Result<(Format, Format), DatError> {
    let from = match from {
        Some(format) => format,
        None => Format::detect(input)?,
    };
    let to = match to {
        Some(format) => format,
        None => Format::from_extension(output).ok_or_else(|| {
            DatError::unsupported(format!(
                "cannot infer output format for {}; pass one explicitly",
                output.display()
            ))
        })?,
    };

    let tree = from.parse_path(input)?;
    to.write_path(output, &tree)?;
    Ok((from, to))
}
