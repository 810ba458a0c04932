//! Everdrive SMDB parser and writer.
//!
//! ```text
//! <sha256>\t<folder/path/file.ext>\t<sha1>\t<md5>\t<crc32>[\t<size>]
//! ```
//!
//! Headerless, tab-separated, never quoted. The path column doubles as
//! the machine name (its first segment) and the ROM name (the rest).
//! Rows are five columns in the classic layout; newer files append a
//! size column.

use std::io::{BufWriter, Read, Write};
use std::path::Path;

use datloom_core::{DatItem, Machine, MetadataFile, Rom};

use crate::error::DatError;

/// Parse an Everdrive SMDB file.
pub fn parse<R: Read>(reader: R) -> Result<MetadataFile, DatError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut file = MetadataFile::new();
    let mut current: Option<Machine> = None;
    let mut saw_content = false;

    for result in csv_reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("skipping unreadable SMDB row: {e}");
                continue;
            }
        };
        saw_content = true;

        let Some(path) = record.get(1).filter(|p| !p.is_empty()) else {
            log::warn!("SMDB row without a path column, keeping raw");
            let raw: Vec<&str> = record.iter().collect();
            file.extras.push(raw.join("\t"));
            continue;
        };

        // `Sonic (World)/Sonic (World).md` — first segment names the
        // machine, the remainder names the ROM.
        let (machine_name, rom_name) = match path.split_once('/') {
            Some((machine_name, rom_name)) => (Some(machine_name), rom_name),
            None => (None, path),
        };

        let rotate = match &current {
            Some(machine) => machine.name.as_deref() != machine_name,
            None => true,
        };
        if rotate {
            if let Some(previous) = current.take() {
                file.machines.push(previous);
            }
            let mut machine = Machine::default();
            machine.name = machine_name.map(|n| n.to_string());
            current = Some(machine);
        }

        let cell = |index: usize| match record.get(index) {
            Some("") | None => None,
            Some(value) => Some(value.to_lowercase()),
        };
        let rom = Rom {
            name: Some(rom_name.to_string()),
            sha256: cell(0),
            sha1: cell(2),
            md5: cell(3),
            crc: cell(4),
            size: record.get(5).and_then(|s| s.parse().ok()),
            extras: record.iter().skip(6).map(|f| f.to_string()).collect(),
            ..Rom::default()
        };
        current
            .as_mut()
            .expect("machine rotated in just above")
            .items
            .push(DatItem::Rom(rom));
    }

    if let Some(machine) = current.take() {
        file.machines.push(machine);
    }

    if !saw_content {
        return Err(DatError::invalid_dat("Empty DAT file"));
    }

    Ok(file)
}

/// Parse an Everdrive SMDB file from a path.
pub fn parse_path(path: &Path) -> Result<MetadataFile, DatError> {
    let file = std::fs::File::open(path)?;
    parse(std::io::BufReader::new(file))
}

/// Write a metadata tree as an Everdrive SMDB file.
pub fn write<W: Write>(mut writer: W, file: &MetadataFile) -> Result<(), DatError> {
    for machine in &file.machines {
        for item in &machine.items {
            let DatItem::Rom(rom) = item else {
                log::debug!("skipping {item:?} on SMDB write");
                continue;
            };

            let rom_name = rom.name.as_deref().unwrap_or("");
            let path = match &machine.name {
                Some(machine_name) => format!("{machine_name}/{rom_name}"),
                None => rom_name.to_string(),
            };

            let mut row = vec![
                rom.sha256.clone().unwrap_or_default(),
                path,
                rom.sha1.clone().unwrap_or_default(),
                rom.md5.clone().unwrap_or_default(),
                rom.crc.clone().unwrap_or_default(),
            ];
            if let Some(size) = rom.size {
                row.push(size.to_string());
            }
            row.extend(rom.extras.iter().cloned());
            writeln!(writer, "{}", row.join("\t"))?;
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

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SMDB: &str = "aad0eea04e3e74e5c4d2a994f83eee3897dd0c414bb105d6c8a61fbf00b01b21\tSonic The Hedgehog (World)/Sonic The Hedgehog (World).md\tcdbbb2e99a1a1d04dc6963283114f75f65b423c4\t909edff8eb52eecc2f5b828d0e864a03\tf9394e97\n69b1ed771e59a49ac4ba68fba1e5a24afd4ba1f3329a3746e9748e66cdb2a929\tSonic The Hedgehog 2 (World) (Rev A)/Sonic The Hedgehog 2 (World) (Rev A).md\t7bb54131ed17d0b8aafd7bbf0b41d0c953e531e0\t2bca40bf3966fc30c5b1b02e28e2a738\t7b905168\n";

    #[test]
    fn test_parse_basic() {
        let dat = parse(SAMPLE_SMDB.as_bytes()).unwrap();
        assert_eq!(dat.machines.len(), 2);

        let machine = &dat.machines[0];
        assert_eq!(machine.name.as_deref(), Some("Sonic The Hedgehog (World)"));
        let rom = machine.roms().next().unwrap();
        assert_eq!(rom.name.as_deref(), Some("Sonic The Hedgehog (World).md"));
        assert_eq!(
            rom.sha256.as_deref(),
            Some("aad0eea04e3e74e5c4d2a994f83eee3897dd0c414bb105d6c8a61fbf00b01b21")
        );
        assert_eq!(rom.crc.as_deref(), Some("f9394e97"));
        assert_eq!(rom.size, None);
    }

    #[test]
    fn test_six_column_row_with_size() {
        let text = "aa00\tFolder/file.bin\tbb11\tcc22\tdd33\t4096\n";
        let dat = parse(text.as_bytes()).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert_eq!(rom.size, Some(4096));
    }

    #[test]
    fn test_nested_path_keeps_subfolders_in_rom_name() {
        let text = "aa00\tCollection/Disc 1/game.iso\tbb11\tcc22\tdd33\n";
        let dat = parse(text.as_bytes()).unwrap();
        let machine = &dat.machines[0];
        assert_eq!(machine.name.as_deref(), Some("Collection"));
        assert_eq!(
            machine.roms().next().unwrap().name.as_deref(),
            Some("Disc 1/game.iso")
        );
    }

    #[test]
    fn test_consecutive_rows_group_by_folder() {
        let text = "aa00\tPack/one.bin\tbb11\tcc22\tdd33\naa01\tPack/two.bin\tbb12\tcc23\tdd34\n";
        let dat = parse(text.as_bytes()).unwrap();
        assert_eq!(dat.machines.len(), 1);
        assert_eq!(dat.machines[0].roms().count(), 2);
    }

    #[test]
    fn test_short_row_keeps_what_it_has() {
        let text = "aa00\tPack/one.bin\n";
        let dat = parse(text.as_bytes()).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert_eq!(rom.sha256.as_deref(), Some("aa00"));
        assert_eq!(rom.sha1, None);
        assert_eq!(rom.crc, None);
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let dat = parse(SAMPLE_SMDB.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mut out, &dat).unwrap();
        assert_eq!(SAMPLE_SMDB, String::from_utf8(out).unwrap());
    }
}
