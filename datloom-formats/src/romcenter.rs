//! RomCenter INI-style DAT parser and writer.
//!
//! ```text
//! [CREDITS]
//! author=redump.org
//! version=2024-01-01
//! [DAT]
//! version=2.50
//! split=1
//! [EMULATOR]
//! refname=Sony PlayStation
//! [GAMES]
//! ¬¬¬Crash Bandicoot (USA)¬Crash Bandicoot (USA)¬Crash Bandicoot (USA).bin¬12345678¬681984¬¬¬
//! ```
//!
//! Sections hold `key=value` lines; the `[GAMES]` section holds rows
//! delimited by `¬` with a leading and trailing delimiter. The parent
//! description field of a row has no counterpart in the canonical tree
//! and is dropped on read (the writer refills it from the machine's own
//! description), which is the one documented lossy seam of this dialect.

use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use datloom_core::{DatItem, Machine, MetadataFile, Rom};

use crate::error::DatError;

const DELIM: char = '¬';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Credits,
    Dat,
    Emulator,
    Games,
    Unknown,
}

/// Parse a RomCenter DAT from a reader.
pub fn parse<R: BufRead>(reader: R) -> Result<MetadataFile, DatError> {
    let mut file = MetadataFile::new();
    let mut current: Option<Machine> = None;
    let mut section = Section::None;
    let mut saw_content = false;

    for line_result in reader.lines() {
        let line = line_result?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        saw_content = true;

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            section = match trimmed[1..trimmed.len() - 1].to_lowercase().as_str() {
                "credits" => Section::Credits,
                "dat" => Section::Dat,
                "emulator" => Section::Emulator,
                "games" => Section::Games,
                _ => {
                    file.extras.push(line.clone());
                    Section::Unknown
                }
            };
            continue;
        }

        match section {
            Section::Games => parse_game_row(trimmed, &line, &mut file, &mut current),
            Section::Credits | Section::Dat | Section::Emulator => {
                let Some((key, value)) = trimmed.split_once('=') else {
                    file.header.extras.push(line.clone());
                    continue;
                };
                section_kv(&mut file.header, section, key, value, &line);
            }
            Section::None | Section::Unknown => file.extras.push(line.clone()),
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

/// Parse a RomCenter DAT from a file path.
pub fn parse_path(path: &Path) -> Result<MetadataFile, DatError> {
    let file = std::fs::File::open(path)?;
    parse(std::io::BufReader::new(file))
}

fn section_kv(
    header: &mut datloom_core::Header,
    section: Section,
    key: &str,
    value: &str,
    line: &str,
) {
    let value = value.to_string();
    match (section, key.to_lowercase().as_str()) {
        (Section::Credits, "author") => header.author = Some(value),
        (Section::Credits, "version") => header.version = Some(value),
        (Section::Credits, "email") => header.email = Some(value),
        (Section::Credits, "homepage") => header.homepage = Some(value),
        (Section::Credits, "url") => header.url = Some(value),
        (Section::Credits, "date") => header.date = Some(value),
        (Section::Credits, "comment") => header.comment = Some(value),
        (Section::Dat, "version") => header.romcenter_version = Some(value),
        (Section::Dat, "plugin") => header.plugin = Some(value),
        (Section::Dat, "split") => {
            if value == "1" {
                header.force_merging = Some("split".to_string());
            }
        }
        (Section::Dat, "merge") => {
            if value == "1" {
                header.force_merging = Some("full".to_string());
            }
        }
        (Section::Emulator, "refname") => header.name = Some(value),
        (Section::Emulator, "version") => header.description = Some(value),
        _ => header.extras.push(line.to_string()),
    }
}

/// Parse one `[GAMES]` row:
/// `¬parent¬parent desc¬name¬description¬rom name¬crc¬size¬romof¬merge¬`
fn parse_game_row(
    trimmed: &str,
    line: &str,
    file: &mut MetadataFile,
    current: &mut Option<Machine>,
) {
    if !trimmed.starts_with(DELIM) {
        log::warn!("games row without a leading delimiter, keeping raw");
        file.extras.push(line.to_string());
        return;
    }

    // `¬a¬b¬` splits to ["", "a", "b", ""]; drop the outer empties.
    let fields: Vec<&str> = trimmed.split(DELIM).collect();
    let cell = |index: usize| match fields.get(index) {
        Some(&"") | None => None,
        Some(&value) => Some(value.to_string()),
    };

    let game_name = cell(3);
    let rotate = match current {
        Some(machine) => machine.name != game_name,
        None => true,
    };
    if rotate {
        if let Some(previous) = current.take() {
            file.machines.push(previous);
        }
        let mut machine = Machine::default();
        machine.name = game_name;
        machine.description = cell(4);
        machine.cloneof = cell(1);
        machine.romof = cell(8);
        // Field 2 (parent description) has no canonical home; dropped.
        *current = Some(machine);
    }

    let rom = Rom {
        name: cell(5),
        crc: cell(6).map(|s| s.to_lowercase()),
        size: cell(7).and_then(|s| s.parse().ok()),
        // Field 9 (merge name) has no canonical home; dropped.
        ..Rom::default()
    };
    current
        .as_mut()
        .expect("machine rotated in just above")
        .items
        .push(DatItem::Rom(rom));
}

/// Write a metadata tree as a RomCenter DAT.
pub fn write<W: Write>(mut writer: W, file: &MetadataFile) -> Result<(), DatError> {
    let header = &file.header;

    writeln!(writer, "[CREDITS]")?;
    for (key, value) in [
        ("author", &header.author),
        ("version", &header.version),
        ("email", &header.email),
        ("homepage", &header.homepage),
        ("url", &header.url),
        ("date", &header.date),
        ("comment", &header.comment),
    ] {
        if let Some(value) = value {
            writeln!(writer, "{key}={value}")?;
        }
    }

    writeln!(writer, "[DAT]")?;
    for (key, value) in [("version", &header.romcenter_version), ("plugin", &header.plugin)] {
        if let Some(value) = value {
            writeln!(writer, "{key}={value}")?;
        }
    }
    match header.force_merging.as_deref() {
        Some("split") => writeln!(writer, "split=1")?,
        Some("full") => writeln!(writer, "merge=1")?,
        _ => {}
    }

    writeln!(writer, "[EMULATOR]")?;
    for (key, value) in [("refname", &header.name), ("version", &header.description)] {
        if let Some(value) = value {
            writeln!(writer, "{key}={value}")?;
        }
    }
    for extra in &header.extras {
        writeln!(writer, "{extra}")?;
    }

    writeln!(writer, "[GAMES]")?;
    for machine in &file.machines {
        let name = machine.name.as_deref().unwrap_or("");
        let description = machine.description.as_deref().unwrap_or("");
        let cloneof = machine.cloneof.as_deref().unwrap_or("");
        // The parent description is not modeled; a clone's row reuses its
        // own description there, a standalone set leaves it empty.
        let parent_description = if machine.cloneof.is_some() { description } else { "" };

        for item in &machine.items {
            let DatItem::Rom(rom) = item else {
                log::debug!("skipping {item:?} on romcenter write");
                continue;
            };
            writeln!(
                writer,
                "{DELIM}{cloneof}{DELIM}{parent_description}{DELIM}{name}{DELIM}{description}{DELIM}{rom_name}{DELIM}{crc}{DELIM}{size}{DELIM}{romof}{DELIM}{DELIM}",
                rom_name = rom.name.as_deref().unwrap_or(""),
                crc = rom.crc.as_deref().unwrap_or(""),
                size = rom.size.map(|s| s.to_string()).unwrap_or_default(),
                romof = machine.romof.as_deref().unwrap_or(""),
            )?;
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
