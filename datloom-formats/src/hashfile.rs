//! Hashfile parser and writer: one hash and one file name per line.
//!
//! Two layouts exist. SFV puts the hash last (`filename 89ABCDEF`);
//! the md5sum/sha1sum/sha256sum/spamsum family puts it first. Either
//! way the non-hash side may contain spaces: the line splits on
//! whitespace runs and the remaining tokens rejoin with single spaces.

use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use datloom_core::{DatItem, MetadataFile, Rom};

use crate::error::DatError;

/// Which digest a hashfile carries, which also decides the layout:
/// CRC32 (SFV) is hash-last, everything else hash-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Crc32,
    Md5,
    Sha1,
    Sha256,
    SpamSum,
}

impl HashKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Crc32 => "sfv",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::SpamSum => "spamsum",
        }
    }

    /// Expected hex digit count, or `None` for non-hex digests.
    fn hex_width(&self) -> Option<usize> {
        match self {
            Self::Crc32 => Some(8),
            Self::Md5 => Some(32),
            Self::Sha1 => Some(40),
            Self::Sha256 => Some(64),
            Self::SpamSum => None,
        }
    }

    fn accepts(&self, token: &str) -> bool {
        match self.hex_width() {
            Some(width) => token.len() == width && token.chars().all(|c| c.is_ascii_hexdigit()),
            // SpamSum digests are `blocksize:hash:hash`.
            None => token.contains(':'),
        }
    }
}

/// Parse a hashfile. All entries land in a single unnamed machine; when
/// parsing from a path the machine takes the file stem as its name.
pub fn parse<R: BufRead>(reader: R, kind: HashKind) -> Result<MetadataFile, DatError> {
    let mut file = MetadataFile::new();
    let mut machine = datloom_core::Machine::default();
    let mut saw_content = false;

    for line_result in reader.lines() {
        let line = line_result?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        saw_content = true;

        // SFV comment lines.
        if trimmed.starts_with(';') {
            file.extras.push(line.clone());
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() < 2 {
            log::warn!("hashfile line with a single token, keeping raw");
            file.extras.push(line.clone());
            continue;
        }

        let (hash, name_tokens) = match kind {
            HashKind::Crc32 => (*tokens.last().expect("len checked"), &tokens[..tokens.len() - 1]),
            _ => (tokens[0], &tokens[1..]),
        };
        if !kind.accepts(hash) {
            log::warn!("line without a valid {} digest, keeping raw", kind.name());
            file.extras.push(line.clone());
            continue;
        }

        let name = name_tokens.join(" ");
        let mut rom = Rom::new(name);
        let digest = match kind {
            HashKind::SpamSum => hash.to_string(),
            _ => hash.to_lowercase(),
        };
        match kind {
            HashKind::Crc32 => rom.crc = Some(digest),
            HashKind::Md5 => rom.md5 = Some(digest),
            HashKind::Sha1 => rom.sha1 = Some(digest),
            HashKind::Sha256 => rom.sha256 = Some(digest),
            HashKind::SpamSum => rom.spamsum = Some(digest),
        }
        machine.items.push(DatItem::Rom(rom));
    }

    if !saw_content {
        return Err(DatError::invalid_dat("Empty DAT file"));
    }

    file.machines.push(machine);
    Ok(file)
}

/// Parse a hashfile from a path; the machine is named after the file stem.
pub fn parse_path(path: &Path, kind: HashKind) -> Result<MetadataFile, DatError> {
    let handle = std::fs::File::open(path)?;
    let mut file = parse(std::io::BufReader::new(handle), kind)?;

    let stem = path.file_stem().and_then(|s| s.to_str());
    if let (Some(stem), Some(machine)) = (stem, file.machines.first_mut()) {
        machine.name = Some(stem.to_string());
    }
    Ok(file)
}

/// Write a metadata tree as a hashfile of the given kind. Items without
/// the requested digest are skipped.
pub fn write<W: Write>(mut writer: W, file: &MetadataFile, kind: HashKind) -> Result<(), DatError> {
    for machine in &file.machines {
        for item in &machine.items {
            let (name, digest) = match (kind, item) {
                (HashKind::Crc32, DatItem::Rom(rom)) => (rom.name.as_deref(), rom.crc.as_deref()),
                (HashKind::Md5, DatItem::Rom(rom)) => (rom.name.as_deref(), rom.md5.as_deref()),
                (HashKind::Md5, DatItem::Disk(disk)) => (disk.name.as_deref(), disk.md5.as_deref()),
                (HashKind::Md5, DatItem::Media(media)) => (media.name.as_deref(), media.md5.as_deref()),
                (HashKind::Sha1, DatItem::Rom(rom)) => (rom.name.as_deref(), rom.sha1.as_deref()),
                (HashKind::Sha1, DatItem::Disk(disk)) => (disk.name.as_deref(), disk.sha1.as_deref()),
                (HashKind::Sha1, DatItem::Media(media)) => (media.name.as_deref(), media.sha1.as_deref()),
                (HashKind::Sha256, DatItem::Rom(rom)) => (rom.name.as_deref(), rom.sha256.as_deref()),
                (HashKind::Sha256, DatItem::Media(media)) => (media.name.as_deref(), media.sha256.as_deref()),
                (HashKind::SpamSum, DatItem::Rom(rom)) => (rom.name.as_deref(), rom.spamsum.as_deref()),
                (HashKind::SpamSum, DatItem::Media(media)) => (media.name.as_deref(), media.spamsum.as_deref()),
                _ => (None, None),
            };
            let (Some(name), Some(digest)) = (name, digest) else {
                log::debug!("skipping item without a {} digest", kind.name());
                continue;
            };

            match kind {
                HashKind::Crc32 => writeln!(writer, "{name} {digest}")?,
                _ => writeln!(writer, "{digest} {name}")?,
            }
        }
    }

    for extra in &file.extras {
        writeln!(writer, "{extra}")?;
    }

    Ok(())
}

/// Write a metadata tree to a file path.
pub fn write_path(path: &Path, file: &MetadataFile, kind: HashKind) -> Result<(), DatError> {
    let out = std::fs::File::create(path)?;
    write(BufWriter::new(out), file, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sfv_hash_is_last_token() {
        let text = "My File With Spaces.bin 89ABCDEF\n";
        let dat = parse(text.as_bytes(), HashKind::Crc32).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert_eq!(rom.name.as_deref(), Some("My File With Spaces.bin"));
        assert_eq!(rom.crc.as_deref(), Some("89abcdef"));
    }

    #[test]
    fn test_md5_hash_is_first_token() {
        let text = "44f219c48d7b62798d814efacf164865 Some Game (Japan).nes\n";
        let dat = parse(text.as_bytes(), HashKind::Md5).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert_eq!(rom.name.as_deref(), Some("Some Game (Japan).nes"));
        assert_eq!(rom.md5.as_deref(), Some("44f219c48d7b62798d814efacf164865"));
    }

    #[test]
    fn test_multi_space_runs_rejoin_with_single_spaces() {
        let text = "0123456789012345678901234567890123456789  Two  Spaced.bin\n";
        let dat = parse(text.as_bytes(), HashKind::Sha1).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert_eq!(rom.name.as_deref(), Some("Two Spaced.bin"));
    }

    #[test]
    fn test_wrong_width_digest_goes_to_extras() {
        let text = "123456 short.bin\n0123456789abcdef0123456789abcdef good.bin\n";
        let dat = parse(text.as_bytes(), HashKind::Md5).unwrap();
        assert_eq!(dat.extras, vec!["123456 short.bin"]);
        assert_eq!(dat.machines[0].items.len(), 1);
    }

    #[test]
    fn test_sfv_comments_preserved() {
        let text = "; Generated by WIN-SFV32 v1\ngame.bin 89ABCDEF\n";
        let dat = parse(text.as_bytes(), HashKind::Crc32).unwrap();
        assert_eq!(dat.extras, vec!["; Generated by WIN-SFV32 v1"]);
        assert_eq!(dat.machines[0].items.len(), 1);
    }

    #[test]
    fn test_spamsum_digest() {
        let text = "96:KQhaGCVZGhr83h3bc0XIOGVE2GsGXj8yHiK:KQEGCVMR83FIOVE2GsGz8yHiK game.bin\n";
        let dat = parse(text.as_bytes(), HashKind::SpamSum).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert!(rom.spamsum.as_deref().unwrap().starts_with("96:"));
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let text = "game one.bin 89ABCDEF\ngame two.bin 0000FFFF\n";
        let dat = parse(text.as_bytes(), HashKind::Crc32).unwrap();
        let mut out = Vec::new();
        write(&mut out, &dat, HashKind::Crc32).unwrap();
        // Hashes canonicalize to lowercase; compare the second trip.
        let rewritten = String::from_utf8(out).unwrap();
        let dat2 = parse(rewritten.as_bytes(), HashKind::Crc32).unwrap();
        let mut out2 = Vec::new();
        write(&mut out2, &dat2, HashKind::Crc32).unwrap();
        assert_eq!(rewritten, String::from_utf8(out2).unwrap());
        assert_eq!(dat, dat2);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(parse("".as_bytes(), HashKind::Crc32).is_err());
    }
}
