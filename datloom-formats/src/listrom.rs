//! MAME `-listroms` columnar output parser and writer.
//!
//! ```text
//! ROMs required for driver "puckman".
//! Name                                Size Checksum
//! pm1_chg1.5e                         2048 CRC(2066a0b7) SHA1(6d4ccc27d6be185589e08aa9f18702b679e49a4a)
//! ```
//!
//! The name column has no fixed width and names may contain single
//! spaces, so the name/remainder boundary is recovered by probing for
//! runs of 5, 4, 3, then 2 spaces. The remainder is then classified by
//! token count and marker substrings into one of a handful of row
//! shapes; rows matching none of them are kept verbatim at file level.

use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use datloom_core::{DatItem, Disk, ItemStatus, Machine, MetadataFile, Rom};

use crate::error::DatError;

/// Shape of a data row's remainder (everything after the name column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowShape {
    /// `<size> CRC(..) SHA1(..)` — a good ROM.
    PlainRom,
    /// `SHA1(..)` or `MD5(..)` — a good CHD.
    PlainChd,
    /// `<size> BAD CRC(..) SHA1(..) BAD_DUMP`
    BadRom,
    /// `BAD SHA1(..) BAD_DUMP`
    BadChd,
    /// `NO GOOD DUMP KNOWN`, with or without a leading size.
    NoDump,
}

/// Classify a row remainder. Returns `None` for remainders matching no
/// known shape; the caller keeps those lines verbatim. Never panics.
fn classify_row(rest: &str) -> Option<RowShape> {
    if rest.contains("NO GOOD DUMP KNOWN") {
        return Some(RowShape::NoDump);
    }

    let tokens: Vec<&str> = rest.split(' ').filter(|t| !t.is_empty()).collect();

    if tokens.contains(&"BAD_DUMP") {
        // A bad ROM leads with its size; a bad CHD has no size column.
        let is_rom = tokens
            .first()
            .is_some_and(|t| t.chars().all(|c| c.is_ascii_digit()));
        return Some(if is_rom { RowShape::BadRom } else { RowShape::BadChd });
    }
    if tokens.len() == 3 && rest.contains("CRC(") {
        return Some(RowShape::PlainRom);
    }
    if tokens.len() == 1 && (rest.contains("SHA1(") || rest.contains("MD5(")) {
        return Some(RowShape::PlainChd);
    }
    None
}

/// Extract the value of a `CRC(...)` / `SHA1(...)` / `MD5(...)` token.
fn hash_value(rest: &str, marker: &str) -> Option<String> {
    let start = rest.find(marker)? + marker.len();
    let end = rest[start..].find(')')?;
    Some(rest[start..start + end].to_lowercase())
}

/// Recognize the set marker lines:
/// `ROMs required for driver "puckman".` and the `No ROMs ...` / device
/// variants. Returns `(set_name, is_device)`.
fn parse_set_marker(trimmed: &str) -> Option<(String, bool)> {
    let rest = trimmed.strip_prefix("No ").unwrap_or(trimmed);
    let rest = rest.strip_prefix("ROMs required for ")?;
    let (is_device, rest) = if let Some(rest) = rest.strip_prefix("driver ") {
        (false, rest)
    } else if let Some(rest) = rest.strip_prefix("device ") {
        (true, rest)
    } else {
        return None;
    };
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    rest[end..].strip_prefix("\".")?;
    Some((rest[..end].to_string(), is_device))
}

fn is_column_header(trimmed: &str) -> bool {
    trimmed.starts_with("Name") && trimmed.ends_with("Size Checksum")
}

/// Split a data row into name and remainder by probing for progressively
/// narrower space runs. Names may contain single spaces, so splitting on
/// one space is unsafe and is never attempted.
fn split_name_row(trimmed: &str) -> Option<(&str, &str)> {
    const RUN: &str = "     ";
    for width in [5, 4, 3, 2] {
        if let Some(pos) = trimmed.find(&RUN[..width]) {
            let name = trimmed[..pos].trim_end();
            let rest = trimmed[pos..].trim();
            if !name.is_empty() && !rest.is_empty() {
                return Some((name, rest));
            }
        }
    }
    None
}

fn row_item(rest: &str, shape: RowShape) -> DatItem {
    let tokens: Vec<&str> = rest.split(' ').filter(|t| !t.is_empty()).collect();
    let size = tokens
        .first()
        .and_then(|t| t.parse::<u64>().ok());

    match shape {
        RowShape::PlainRom | RowShape::BadRom => DatItem::Rom(Rom {
            size,
            crc: hash_value(rest, "CRC("),
            md5: hash_value(rest, "MD5("),
            sha1: hash_value(rest, "SHA1("),
            status: if shape == RowShape::BadRom {
                ItemStatus::BadDump
            } else {
                ItemStatus::None
            },
            ..Rom::default()
        }),
        RowShape::PlainChd | RowShape::BadChd => DatItem::Disk(Disk {
            md5: hash_value(rest, "MD5("),
            sha1: hash_value(rest, "SHA1("),
            status: if shape == RowShape::BadChd {
                ItemStatus::BadDump
            } else {
                ItemStatus::None
            },
            ..Disk::default()
        }),
        RowShape::NoDump => {
            // With a leading size it was a ROM; otherwise a CHD.
            if size.is_some() {
                DatItem::Rom(Rom {
                    size,
                    status: ItemStatus::NoDump,
                    ..Rom::default()
                })
            } else {
                DatItem::Disk(Disk {
                    status: ItemStatus::NoDump,
                    ..Disk::default()
                })
            }
        }
    }
}

/// Parse listrom output from a reader.
pub fn parse<R: BufRead>(reader: R) -> Result<MetadataFile, DatError> {
    let mut file = MetadataFile::new();
    let mut current: Option<Machine> = None;
    let mut saw_content = false;

    for line_result in reader.lines() {
        let line = line_result?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        saw_content = true;

        if let Some((name, is_device)) = parse_set_marker(trimmed) {
            if let Some(machine) = current.take() {
                file.machines.push(machine);
            }
            let mut machine = Machine::new(name);
            machine.is_device = is_device;
            current = Some(machine);
            continue;
        }
        if is_column_header(trimmed) {
            continue;
        }

        let Some(machine) = current.as_mut() else {
            log::warn!("data row outside any set: {trimmed:?}");
            file.extras.push(line.clone());
            continue;
        };

        // Name/remainder split: probe space runs, with one fallback for
        // single-space no-dump rows, which have nothing to probe for.
        let split = split_name_row(trimmed).or_else(|| {
            trimmed
                .find(" NO GOOD DUMP KNOWN")
                .filter(|_| trimmed.ends_with("NO GOOD DUMP KNOWN"))
                .map(|pos| (trimmed[..pos].trim_end(), trimmed[pos + 1..].trim()))
        });
        let Some((name, rest)) = split else {
            log::warn!("unrecognized listrom row shape: {trimmed:?}");
            file.extras.push(line.clone());
            continue;
        };

        match classify_row(rest) {
            Some(shape) => {
                let mut item = row_item(rest, shape);
                match &mut item {
                    DatItem::Rom(rom) => rom.name = Some(name.to_string()),
                    DatItem::Disk(disk) => disk.name = Some(name.to_string()),
                    _ => {}
                }
                machine.items.push(item);
            }
            None => {
                log::warn!("unrecognized listrom row shape: {trimmed:?}");
                file.extras.push(line.clone());
            }
        }
    }

    if let Some(machine) = current.take() {
        file.machines.push(machine);
    }

    if !saw_content {
        return Err(DatError::invalid_dat("Empty DAT file"));
    }

    Ok(file)
}

/// Parse listrom output from a file path.
pub fn parse_path(path: &Path) -> Result<MetadataFile, DatError> {
    let file = std::fs::File::open(path)?;
    parse(std::io::BufReader::new(file))
}

/// Write a metadata tree as listrom output.
///
/// Names are right-padded so the size column ends at column 40 (never
/// closer than two spaces to the name), one blank line separates sets,
/// and a set with no items becomes a `No ROMs required ...` line.
pub fn write<W: Write>(mut writer: W, file: &MetadataFile) -> Result<(), DatError> {
    for (index, machine) in file.machines.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }

        let noun = if machine.is_device { "device" } else { "driver" };
        let name = machine.name.as_deref().unwrap_or("");

        if machine.items.is_empty() {
            writeln!(writer, "No ROMs required for {noun} \"{name}\".")?;
            continue;
        }

        writeln!(writer, "ROMs required for {noun} \"{name}\".")?;
        writeln!(writer, "{:<36}Size Checksum", "Name")?;

        for item in &machine.items {
            match item {
                DatItem::Rom(rom) => writeln!(writer, "{}", rom_row(rom))?,
                DatItem::Disk(disk) => writeln!(writer, "{}", disk_row(disk))?,
                other => log::debug!("skipping {other:?} on listrom write"),
            }
        }
    }

    for extra in &file.extras {
        writeln!(writer, "{extra}")?;
    }

    Ok(())
}

/// Write a metadata tree to a file path.
pub fn write_path(path: &Path, file: &MetadataFile) -> Result<(), DatError> {
    let out = std::fs::File::create(path)?;
    write(BufWriter::new(out), file)
}

fn rom_row(rom: &Rom) -> String {
    let name = rom.name.as_deref().unwrap_or("");
    let size = rom.size.map(|s| s.to_string()).unwrap_or_default();
    let width = 40usize.saturating_sub(size.len()).max(name.len() + 2);
    let mut line = format!("{name:<width$}{size}");

    match rom.status {
        ItemStatus::NoDump => line.push_str(" NO GOOD DUMP KNOWN"),
        ItemStatus::BadDump => {
            line.push_str(" BAD");
            push_hashes(&mut line, &rom.crc, &rom.md5, &rom.sha1);
            line.push_str(" BAD_DUMP");
        }
        ItemStatus::None => push_hashes(&mut line, &rom.crc, &rom.md5, &rom.sha1),
    }
    line
}

fn disk_row(disk: &Disk) -> String {
    let name = disk.name.as_deref().unwrap_or("");
    let width = 41usize.max(name.len() + 2);
    let mut line = format!("{name:<width$}");

    match disk.status {
        ItemStatus::NoDump => line.push_str("NO GOOD DUMP KNOWN"),
        ItemStatus::BadDump => {
            line.push_str("BAD");
            push_hashes(&mut line, &None, &disk.md5, &disk.sha1);
            line.push_str(" BAD_DUMP");
        }
        ItemStatus::None => {
            let mut hashes = String::new();
            push_hashes(&mut hashes, &None, &disk.md5, &disk.sha1);
            line.push_str(hashes.trim_start());
        }
    }
    line
}

fn push_hashes(line: &mut String, crc: &Option<String>, md5: &Option<String>, sha1: &Option<String>) {
    if let Some(crc) = crc {
        line.push_str(&format!(" CRC({crc})"));
    }
    if let Some(md5) = md5 {
        line.push_str(&format!(" MD5({md5})"));
    }
    if let Some(sha1) = sha1 {
        line.push_str(&format!(" SHA1({sha1})"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LISTROM: &str = r#"ROMs required for driver "puckman".
Name                                Size Checksum
pm1_prg1.6e                         2048 CRC(f36e88ab) SHA1(813cecf44bf5464b1aed64b36f5047e4c79ba176)
pm1_prg2.6k                         2048 CRC(618bd9b3) SHA1(b9ca52b63a49ddece768378d331deebbe34fe177)

ROMs required for device "namco51".
Name                                Size Checksum
51xx.bin                            1024 CRC(c2f57ef8) SHA1(50de79e0d6a76bda95ffb02fcce369a79e6abfec)
"#;

    #[test]
    fn test_parse_basic() {
        let dat = parse(SAMPLE_LISTROM.as_bytes()).unwrap();
        assert_eq!(dat.machines.len(), 2);

        let puckman = &dat.machines[0];
        assert_eq!(puckman.name.as_deref(), Some("puckman"));
        assert!(!puckman.is_device);
        assert_eq!(puckman.roms().count(), 2);

        let rom = puckman.roms().next().unwrap();
        assert_eq!(rom.name.as_deref(), Some("pm1_prg1.6e"));
        assert_eq!(rom.size, Some(2048));
        assert_eq!(rom.crc.as_deref(), Some("f36e88ab"));
        assert_eq!(
            rom.sha1.as_deref(),
            Some("813cecf44bf5464b1aed64b36f5047e4c79ba176")
        );

        let device = &dat.machines[1];
        assert_eq!(device.name.as_deref(), Some("namco51"));
        assert!(device.is_device);
    }

    #[test]
    fn test_good_rom_row() {
        let text = "ROMs required for driver \"pacman\".\nfoo.rom          12345 CRC(89abcdef) SHA1(deadbeefdeadbeefdeadbeefdeadbeefdeadbeef)\n";
        let dat = parse(text.as_bytes()).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert_eq!(rom.name.as_deref(), Some("foo.rom"));
        assert_eq!(rom.size, Some(12345));
        assert_eq!(rom.crc.as_deref(), Some("89abcdef"));
        assert_eq!(
            rom.sha1.as_deref(),
            Some("deadbeefdeadbeefdeadbeefdeadbeefdeadbeef")
        );
        assert_eq!(rom.status, ItemStatus::None);
    }

    #[test]
    fn test_no_dump_chd_row_with_single_spaces() {
        let text = "ROMs required for driver \"x\".\nbar.chd NO GOOD DUMP KNOWN\n";
        let dat = parse(text.as_bytes()).unwrap();
        let disk = dat.machines[0].disks().next().unwrap();
        assert_eq!(disk.name.as_deref(), Some("bar.chd"));
        assert_eq!(disk.status, ItemStatus::NoDump);
        assert_eq!(disk.sha1, None);
        assert_eq!(disk.md5, None);
    }

    #[test]
    fn test_name_with_single_spaces() {
        let text = "ROMs required for driver \"x\".\nmy file.bin     512 CRC(0000ffff) SHA1(0123456789012345678901234567890123456789)\n";
        let dat = parse(text.as_bytes()).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert_eq!(rom.name.as_deref(), Some("my file.bin"));
        assert_eq!(rom.size, Some(512));
    }

    #[test]
    fn test_bad_rom_row() {
        let text = "ROMs required for driver \"x\".\nbad.bin       1024 BAD CRC(1d298cb0) SHA1(bb0bb62365402543e3154b9a77be9c75010e6abc) BAD_DUMP\n";
        let dat = parse(text.as_bytes()).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert_eq!(rom.status, ItemStatus::BadDump);
        assert_eq!(rom.crc.as_deref(), Some("1d298cb0"));
    }

    #[test]
    fn test_bad_chd_row() {
        let text = "ROMs required for driver \"x\".\ndisk1     BAD SHA1(bb0bb62365402543e3154b9a77be9c75010e6abc) BAD_DUMP\n";
        let dat = parse(text.as_bytes()).unwrap();
        let disk = dat.machines[0].disks().next().unwrap();
        assert_eq!(disk.status, ItemStatus::BadDump);
        assert_eq!(
            disk.sha1.as_deref(),
            Some("bb0bb62365402543e3154b9a77be9c75010e6abc")
        );
    }

    #[test]
    fn test_plain_chd_row() {
        let text = "ROMs required for driver \"x\".\ngdl-0001     SHA1(abcdef0123456789abcdef0123456789abcdef01)\n";
        let dat = parse(text.as_bytes()).unwrap();
        let disk = dat.machines[0].disks().next().unwrap();
        assert_eq!(disk.name.as_deref(), Some("gdl-0001"));
        assert_eq!(disk.status, ItemStatus::None);
    }

    #[test]
    fn test_no_roms_required_marker() {
        let text = "No ROMs required for driver \"cdtv\".\n";
        let dat = parse(text.as_bytes()).unwrap();
        assert_eq!(dat.machines.len(), 1);
        assert!(dat.machines[0].items.is_empty());
    }

    #[test]
    fn test_classifier_is_total() {
        // Any garbage routes to extras without a panic or an error.
        let text = "ROMs required for driver \"x\".\nwhat  even is  this line\n";
        let dat = parse(text.as_bytes()).unwrap();
        assert!(dat.machines[0].items.is_empty());
        assert_eq!(dat.extras, vec!["what  even is  this line"]);
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let dat = parse(SAMPLE_LISTROM.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mut out, &dat).unwrap();
        assert_eq!(SAMPLE_LISTROM, String::from_utf8(out).unwrap());
    }

    #[test]
    fn test_write_empty_set() {
        let mut file = MetadataFile::new();
        file.machines.push(Machine::new("cdtv"));
        let mut out = Vec::new();
        write(&mut out, &file).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "No ROMs required for driver \"cdtv\".\n"
        );
    }

    #[test]
    fn test_write_pads_to_column_40() {
        let mut file = MetadataFile::new();
        let mut machine = Machine::new("x");
        machine
            .items
            .push(DatItem::Rom(Rom::new("a.bin").with_size(2048).with_crc("f36e88ab")));
        file.machines.push(machine);

        let mut out = Vec::new();
        write(&mut out, &file).unwrap();
        let text = String::from_utf8(out).unwrap();
        let row = text.lines().nth(2).unwrap();
        // Size ends at column 40.
        assert_eq!(row.find("2048"), Some(36));
        assert!(row.starts_with("a.bin "));
    }

    #[test]
    fn test_long_name_keeps_two_space_gap() {
        let mut file = MetadataFile::new();
        let mut machine = Machine::new("x");
        let long = "a".repeat(48);
        machine
            .items
            .push(DatItem::Rom(Rom::new(long.clone()).with_size(16).with_crc("00000000")));
        file.machines.push(machine);

        let mut out = Vec::new();
        write(&mut out, &file).unwrap();
        let text = String::from_utf8(out).unwrap();
        let row = text.lines().nth(2).unwrap();
        assert!(row.starts_with(&format!("{long}  16")));
    }
}
