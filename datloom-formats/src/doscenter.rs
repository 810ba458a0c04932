//! DosCenter block-structured DAT parser and writer.
//!
//! Format:
//! ```text
//! DOSCenter (
//!     Name: DOSCenter
//!     Description: DOSCenter v.5.0
//!     Version: 5.0
//! )
//! game (
//!     name 1st Division Manager (1992)(Codemasters).zip
//!     file ( name 1DIVMAN.ZIP size 131264 date 1992/01/01 12:00:00 crc 01234567 )
//! )
//! ```
//!
//! Same state machine as ClrMamePro, with two dialect quirks: header keys
//! carry a trailing colon, and values inside `file ( ... )` records are
//! unquoted and may span several tokens (names with spaces, `date` with a
//! time part), so a value runs until the next known key.

use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use datloom_core::{DatItem, Machine, MetadataFile, Rom};

use crate::block::{self, LineKind};
use crate::error::DatError;

enum Context {
    Header,
    Machine(Machine),
    Unknown,
}

/// Parse a DosCenter DAT from a reader.
pub fn parse<R: BufRead>(reader: R) -> Result<MetadataFile, DatError> {
    let mut file = MetadataFile::new();
    let mut context: Option<Context> = None;
    let mut saw_content = false;

    for line_result in reader.lines() {
        let line = line_result?;

        match block::classify(&line) {
            LineKind::Blank => continue,
            LineKind::Comment(_) => match &mut context {
                Some(Context::Machine(machine)) => machine.extras.push(line.clone()),
                Some(Context::Header) => file.header.extras.push(line.clone()),
                Some(Context::Unknown) | None => file.extras.push(line.clone()),
            },
            LineKind::TopLevelOpen(keyword) => {
                // A reopen before any content reuses the slot; otherwise
                // the previous block is flushed as if it were closed.
                if let Some(previous) = context.take() {
                    let untouched =
                        matches!(&previous, Context::Machine(machine) if *machine == Machine::default());
                    if !untouched {
                        log::warn!("block opened before previous block was closed");
                        close_context(&mut file, previous);
                    }
                }
                context = Some(match keyword.to_lowercase().as_str() {
                    "doscenter" => Context::Header,
                    "game" => Context::Machine(Machine::default()),
                    _ => {
                        file.extras.push(line.clone());
                        Context::Unknown
                    }
                });
            }
            LineKind::NestedRecord(keyword, inner) => match &mut context {
                Some(Context::Machine(machine)) => match keyword.to_lowercase().as_str() {
                    "file" => machine.items.push(DatItem::Rom(parse_file_record(inner))),
                    _ => machine.extras.push(line.clone()),
                },
                Some(Context::Header) => file.header.extras.push(line.clone()),
                Some(Context::Unknown) | None => file.extras.push(line.clone()),
            },
            LineKind::KeyValue(key, raw_value) => match &mut context {
                Some(Context::Header) => header_kv(&mut file.header, key, raw_value, &line),
                Some(Context::Machine(machine)) => machine_kv(machine, key, raw_value, &line),
                Some(Context::Unknown) | None => file.extras.push(line.clone()),
            },
            LineKind::BlockClose => match context.take() {
                Some(Context::Unknown) => file.extras.push(line.clone()),
                Some(previous) => close_context(&mut file, previous),
                None => file.extras.push(line.clone()),
            },
        }

        saw_content = true;
    }

    if let Some(previous) = context.take() {
        log::warn!("unterminated block at end of file, treating as closed");
        close_context(&mut file, previous);
    }

    if !saw_content {
        return Err(DatError::invalid_dat("Empty DAT file"));
    }

    Ok(file)
}

/// Parse a DosCenter DAT from a file path.
pub fn parse_path(path: &Path) -> Result<MetadataFile, DatError> {
    let file = std::fs::File::open(path)?;
    parse(std::io::BufReader::new(file))
}

fn close_context(file: &mut MetadataFile, context: Context) {
    match context {
        Context::Machine(machine) => file.machines.push(machine),
        Context::Header | Context::Unknown => {}
    }
}

fn header_kv(header: &mut datloom_core::Header, key: &str, raw_value: &str, line: &str) {
    let value = raw_value.to_string();
    match key.trim_end_matches(':').to_lowercase().as_str() {
        "name" => header.name = Some(value),
        "description" => header.description = Some(value),
        "version" => header.version = Some(value),
        "date" => header.date = Some(value),
        "author" => header.author = Some(value),
        "homepage" => header.homepage = Some(value),
        "comment" => header.comment = Some(value),
        _ => header.extras.push(line.to_string()),
    }
}

fn machine_kv(machine: &mut Machine, key: &str, raw_value: &str, line: &str) {
    match key.to_lowercase().as_str() {
        // Game names are unquoted free text and may contain spaces.
        "name" => machine.name = Some(block::unquote(raw_value).to_string()),
        _ => machine.extras.push(line.to_string()),
    }
}

/// Keys recognized inside a `file ( ... )` record. A value runs from its
/// key to the next token that is itself a known key.
const FILE_RECORD_KEYS: [&str; 6] = ["name", "size", "date", "crc", "md5", "sha1"];

fn is_file_record_key(token: &str) -> bool {
    FILE_RECORD_KEYS.contains(&token.to_lowercase().as_str())
}

/// Parse an inline `file ( ... )` record.
///
/// `file ( name TOUR GUID.TXT size 435 date 1996/12/24 23:32:00 crc 3228b2d5 )`
/// yields name `"TOUR GUID.TXT"`, date `"1996/12/24 23:32:00"`.
fn parse_file_record(inner: &str) -> Rom {
    let tokens = block::tokenize(inner);
    let mut rom = Rom::default();

    let mut i = 0;
    while i < tokens.len() {
        if !is_file_record_key(&tokens[i]) {
            rom.extras.push(tokens[i].clone());
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < tokens.len() && !is_file_record_key(&tokens[end]) {
            end += 1;
        }
        let value = tokens[i + 1..end].join(" ");
        if value.is_empty() {
            rom.extras.push(tokens[i].clone());
            i = end;
            continue;
        }

        match tokens[i].to_lowercase().as_str() {
            "name" => rom.name = Some(value),
            "size" => match value.parse() {
                Ok(n) => rom.size = Some(n),
                Err(_) => {
                    log::warn!("unparseable file size {value:?}, keeping raw");
                    rom.extras.push(tokens[i].clone());
                    rom.extras.push(value);
                }
            },
            "date" => rom.date = Some(value),
            "crc" => rom.crc = Some(value.to_lowercase()),
            "md5" => rom.md5 = Some(value.to_lowercase()),
            "sha1" => rom.sha1 = Some(value.to_lowercase()),
            _ => unreachable!("guarded by is_file_record_key"),
        }
        i = end;
    }

    rom
}

/// Write a metadata tree as a DosCenter DAT.
pub fn write<W: Write>(mut writer: W, file: &MetadataFile) -> Result<(), DatError> {
    write_header(&mut writer, &file.header)?;

    for machine in &file.machines {
        write_machine(&mut writer, machine)?;
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

fn write_header<W: Write>(writer: &mut W, header: &datloom_core::Header) -> Result<(), DatError> {
    writeln!(writer, "DOSCenter (")?;
    let fields = [
        ("Name", &header.name),
        ("Description", &header.description),
        ("Version", &header.version),
        ("Date", &header.date),
        ("Author", &header.author),
        ("Homepage", &header.homepage),
        ("Comment", &header.comment),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            writeln!(writer, "\t{key}: {value}")?;
        }
    }
    for extra in &header.extras {
        writeln!(writer, "{extra}")?;
    }
    writeln!(writer, ")")?;
    Ok(())
}

fn write_machine<W: Write>(writer: &mut W, machine: &Machine) -> Result<(), DatError> {
    writeln!(writer, "game (")?;
    if let Some(name) = &machine.name {
        writeln!(writer, "\tname {name}")?;
    }

    for item in &machine.items {
        match item {
            DatItem::Rom(rom) => writeln!(writer, "\tfile ( {} )", file_record(rom))?,
            // DosCenter catalogs loose files only; other item kinds have
            // no record shape here.
            other => log::debug!("skipping {other:?} on doscenter write"),
        }
    }

    for extra in &machine.extras {
        writeln!(writer, "{extra}")?;
    }
    writeln!(writer, ")")?;
    Ok(())
}

fn file_record(rom: &Rom) -> String {
    let mut parts = Vec::new();
    if let Some(name) = &rom.name {
        parts.push(format!("name {name}"));
    }
    if let Some(size) = rom.size {
        parts.push(format!("size {size}"));
    }
    if let Some(date) = &rom.date {
        parts.push(format!("date {date}"));
    }
    for (key, value) in [("crc", &rom.crc), ("md5", &rom.md5), ("sha1", &rom.sha1)] {
        if let Some(value) = value {
            parts.push(format!("{key} {value}"));
        }
    }
    for extra in &rom.extras {
        parts.push(extra.clone());
    }
    parts.join(" ")
}
