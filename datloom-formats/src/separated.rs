//! Standard separated-value DAT parser and writer (comma, semicolon, or
//! tab delimited).
//!
//! The row shape is the 14-column layout
//! `File Name, Internal Name, Description, Game Name, Game Description,
//! Type, Rom Name, Disk Name, Size, CRC, MD5, SHA1, SHA256, Status`, or
//! the 17-column layout that inserts SHA384/SHA512/SpamSum before
//! Status. The shape is chosen per row from its field count, so a file
//! can drift between the two without erroring; surplus fields are kept
//! on the row's item and short rows simply leave later fields unset.

use std::io::{BufWriter, Read, Write};
use std::path::Path;

use datloom_core::{DatItem, Disk, ItemStatus, Machine, MetadataFile, Rom};

use crate::error::DatError;

/// Column names of the long (17-column) layout.
const LONG_COLUMNS: [&str; 17] = [
    "File Name",
    "Internal Name",
    "Description",
    "Game Name",
    "Game Description",
    "Type",
    "Rom Name",
    "Disk Name",
    "Size",
    "CRC",
    "MD5",
    "SHA1",
    "SHA256",
    "SHA384",
    "SHA512",
    "SpamSum",
    "Status",
];
const LONG_WIDTH: usize = 17;
const SHORT_WIDTH: usize = 14;

/// Parse a separated-value DAT with the given delimiter.
pub fn parse<R: Read>(reader: R, delimiter: u8) -> Result<MetadataFile, DatError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut file = MetadataFile::new();
    let mut current: Option<Machine> = None;
    let mut saw_header_row = false;

    for result in csv_reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("skipping unreadable separated-value row: {e}");
                continue;
            }
        };

        if !saw_header_row {
            saw_header_row = true;
            file.header.column_headers =
                Some(record.iter().map(|field| field.to_string()).collect());
            continue;
        }

        parse_row(&record, &mut file, &mut current, delimiter);
    }

    if let Some(machine) = current.take() {
        file.machines.push(machine);
    }

    if !saw_header_row {
        return Err(DatError::invalid_dat("Empty DAT file"));
    }

    Ok(file)
}

/// Parse a separated-value DAT from a file path.
pub fn parse_path(path: &Path, delimiter: u8) -> Result<MetadataFile, DatError> {
    let file = std::fs::File::open(path)?;
    parse(std::io::BufReader::new(file), delimiter)
}

fn cell(record: &csv::StringRecord, index: usize) -> Option<String> {
    match record.get(index) {
        Some("") | None => None,
        Some(value) => Some(value.to_string()),
    }
}

fn parse_row(
    record: &csv::StringRecord,
    file: &mut MetadataFile,
    current: &mut Option<Machine>,
    delimiter: u8,
) {
    let width = if record.len() >= LONG_WIDTH {
        LONG_WIDTH
    } else {
        SHORT_WIDTH
    };

    // File-level columns repeat on every row; first value wins.
    if file.header.file_name.is_none() {
        file.header.file_name = cell(record, 0);
    }
    if file.header.name.is_none() {
        file.header.name = cell(record, 1);
    }
    if file.header.description.is_none() {
        file.header.description = cell(record, 2);
    }

    let game_name = cell(record, 3);
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
        machine.description = cell(record, 4);
        *current = Some(machine);
    }
    let machine = current.as_mut().expect("machine rotated in just above");

    let status = cell(record, width - 1)
        .as_deref()
        .and_then(ItemStatus::parse)
        .unwrap_or_default();
    let surplus: Vec<String> = record
        .iter()
        .skip(width)
        .map(|field| field.to_string())
        .collect();

    let item_type = cell(record, 5).unwrap_or_default().to_lowercase();
    match item_type.as_str() {
        "rom" => {
            let mut rom = Rom {
                name: cell(record, 6),
                size: cell(record, 8).and_then(|s| s.parse().ok()),
                crc: cell(record, 9).map(|s| s.to_lowercase()),
                md5: cell(record, 10).map(|s| s.to_lowercase()),
                sha1: cell(record, 11).map(|s| s.to_lowercase()),
                sha256: cell(record, 12).map(|s| s.to_lowercase()),
                status,
                ..Rom::default()
            };
            if width == LONG_WIDTH {
                rom.sha384 = cell(record, 13).map(|s| s.to_lowercase());
                rom.sha512 = cell(record, 14).map(|s| s.to_lowercase());
                rom.spamsum = cell(record, 15);
            }
            rom.extras = surplus;
            machine.items.push(DatItem::Rom(rom));
        }
        "disk" => {
            let mut disk = Disk {
                name: cell(record, 7),
                md5: cell(record, 10).map(|s| s.to_lowercase()),
                sha1: cell(record, 11).map(|s| s.to_lowercase()),
                status,
                ..Disk::default()
            };
            disk.extras = surplus;
            machine.items.push(DatItem::Disk(disk));
        }
        _ => {
            log::warn!("row with unknown type {item_type:?}, keeping raw");
            let raw: Vec<&str> = record.iter().collect();
            file.extras.push(raw.join(&(delimiter as char).to_string()));
        }
    }
}

/// Write a metadata tree as a separated-value DAT.
///
/// Every field is quoted. The long layout is used when the parsed header
/// row had one, or when any ROM carries a SHA384/SHA512/SpamSum value.
pub fn write<W: Write>(writer: W, file: &MetadataFile, delimiter: u8) -> Result<(), DatError> {
    let long = match &file.header.column_headers {
        Some(columns) => columns.len() >= LONG_WIDTH,
        None => file.machines.iter().any(|machine| {
            machine
                .roms()
                .any(|rom| rom.sha384.is_some() || rom.sha512.is_some() || rom.spamsum.is_some())
        }),
    };
    let width = if long { LONG_WIDTH } else { SHORT_WIDTH };

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Always)
        .flexible(true)
        .from_writer(writer);

    match &file.header.column_headers {
        Some(columns) => csv_writer.write_record(columns)?,
        None => csv_writer.write_record(short_or_long_columns(long))?,
    }

    for machine in &file.machines {
        for item in &machine.items {
            let row = match item {
                DatItem::Rom(rom) => rom_row(file, machine, rom, width),
                DatItem::Disk(disk) => disk_row(file, machine, disk, width),
                other => {
                    log::debug!("skipping {other:?} on separated-value write");
                    continue;
                }
            };
            csv_writer.write_record(&row)?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write a metadata tree to a file path.
pub fn write_path(path: &Path, file: &MetadataFile, delimiter: u8) -> Result<(), DatError> {
    let out = std::fs::File::create(path)?;
    write(BufWriter::new(out), file, delimiter)
}

fn short_or_long_columns(long: bool) -> Vec<String> {
    let width = if long { LONG_WIDTH } else { SHORT_WIDTH - 1 };
    let mut columns: Vec<String> = LONG_COLUMNS[..width].iter().map(|s| s.to_string()).collect();
    if !long {
        columns.push("Status".to_string());
    }
    columns
}

fn base_row(file: &MetadataFile, machine: &Machine, width: usize) -> Vec<String> {
    let mut row = vec![String::new(); width];
    row[0] = file.header.file_name.clone().unwrap_or_default();
    row[1] = file.header.name.clone().unwrap_or_default();
    row[2] = file.header.description.clone().unwrap_or_default();
    row[3] = machine.name.clone().unwrap_or_default();
    row[4] = machine.description.clone().unwrap_or_default();
    row
}

fn rom_row(file: &MetadataFile, machine: &Machine, rom: &Rom, width: usize) -> Vec<String> {
    let mut row = base_row(file, machine, width);
    row[5] = "rom".to_string();
    row[6] = rom.name.clone().unwrap_or_default();
    row[8] = rom.size.map(|s| s.to_string()).unwrap_or_default();
    row[9] = rom.crc.clone().unwrap_or_default();
    row[10] = rom.md5.clone().unwrap_or_default();
    row[11] = rom.sha1.clone().unwrap_or_default();
    row[12] = rom.sha256.clone().unwrap_or_default();
    if width == LONG_WIDTH {
        row[13] = rom.sha384.clone().unwrap_or_default();
        row[14] = rom.sha512.clone().unwrap_or_default();
        row[15] = rom.spamsum.clone().unwrap_or_default();
    }
    row[width - 1] = rom.status.as_str().unwrap_or_default().to_string();
    row.extend(rom.extras.iter().cloned());
    row
}

fn disk_row(file: &MetadataFile, machine: &Machine, disk: &Disk, width: usize) -> Vec<String> {
    let mut row = base_row(file, machine, width);
    row[5] = "disk".to_string();
    row[7] = disk.name.clone().unwrap_or_default();
    row[10] = disk.md5.clone().unwrap_or_default();
    row[11] = disk.sha1.clone().unwrap_or_default();
    row[width - 1] = disk.status.as_str().unwrap_or_default().to_string();
    row.extend(disk.extras.iter().cloned());
    row
}
