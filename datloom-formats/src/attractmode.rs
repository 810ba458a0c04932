//! AttractMode frontend romlist parser and writer.
//!
//! ```text
//! #Name;Title;Emulator;CloneOf;Year;Manufacturer;Category;Players;...
//! puckman;PuckMan (Japan set 1);mame;;1980;Namco;Maze;1;0;joystick...
//! ```
//!
//! Semicolon-separated, never quoted, one machine per row. Two row
//! shapes exist in the wild: the legacy 17-column layout and the
//! extended 22-column layout that appends Favorite, Tags, PlayedCount,
//! PlayedTime and FileIsAvailable. The shape is picked per row from its
//! field count; fields past the chosen shape are preserved on the
//! machine's extras.

use std::io::{BufWriter, Read, Write};
use std::path::Path;

use datloom_core::{Machine, MetadataFile};

use crate::error::DatError;

const LEGACY_COLUMNS: [&str; 17] = [
    "Name",
    "Title",
    "Emulator",
    "CloneOf",
    "Year",
    "Manufacturer",
    "Category",
    "Players",
    "Rotation",
    "Control",
    "Status",
    "DisplayCount",
    "DisplayType",
    "AltRomname",
    "AltTitle",
    "Extra",
    "Buttons",
];
const EXTENDED_COLUMNS: [&str; 5] = [
    "Favourite",
    "Tags",
    "PlayedCount",
    "PlayedTime",
    "FileIsAvailable",
];
const LEGACY_WIDTH: usize = 17;
const EXTENDED_WIDTH: usize = 22;

/// Parse an AttractMode romlist.
pub fn parse<R: Read>(reader: R) -> Result<MetadataFile, DatError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut file = MetadataFile::new();
    let mut saw_content = false;
    let mut first_row = true;

    for result in csv_reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("skipping unreadable romlist row: {e}");
                continue;
            }
        };
        saw_content = true;

        // The header row is a comment line: `#Name;Title;...`.
        if first_row {
            first_row = false;
            if record.get(0).is_some_and(|f| f.starts_with('#')) {
                let mut columns: Vec<String> =
                    record.iter().map(|field| field.to_string()).collect();
                let first = columns[0].trim_start_matches('#').to_string();
                columns[0] = first;
                file.header.column_headers = Some(columns);
                continue;
            }
        }

        let machine = parse_row(&record, &mut file.header);
        file.machines.push(machine);
    }

    if !saw_content {
        return Err(DatError::invalid_dat("Empty DAT file"));
    }

    Ok(file)
}

/// Parse an AttractMode romlist from a file path.
pub fn parse_path(path: &Path) -> Result<MetadataFile, DatError> {
    let file = std::fs::File::open(path)?;
    parse(std::io::BufReader::new(file))
}

fn cell(record: &csv::StringRecord, index: usize) -> Option<String> {
    match record.get(index) {
        Some("") | None => None,
        Some(value) => Some(value.to_string()),
    }
}

fn parse_row(record: &csv::StringRecord, header: &mut datloom_core::Header) -> Machine {
    let width = if record.len() >= EXTENDED_WIDTH {
        EXTENDED_WIDTH
    } else {
        LEGACY_WIDTH
    };

    // The Emulator column repeats the same value on every row of a
    // romlist; it is file-scoped here, first value wins.
    if header.name.is_none() {
        header.name = cell(record, 2);
    }

    let mut machine = Machine {
        name: cell(record, 0),
        description: cell(record, 1),
        cloneof: cell(record, 3),
        year: cell(record, 4),
        manufacturer: cell(record, 5),
        category: cell(record, 6),
        players: cell(record, 7),
        rotation: cell(record, 8),
        control: cell(record, 9),
        status: cell(record, 10),
        display_count: cell(record, 11),
        display_type: cell(record, 12),
        alt_romname: cell(record, 13),
        alt_title: cell(record, 14),
        comment: cell(record, 15),
        buttons: cell(record, 16),
        ..Machine::default()
    };
    if width == EXTENDED_WIDTH {
        machine.favorite = cell(record, 17);
        machine.tags = cell(record, 18);
        machine.played_count = cell(record, 19);
        machine.played_time = cell(record, 20);
        machine.file_is_available = cell(record, 21);
    }
    machine.extras = record
        .iter()
        .skip(width)
        .map(|field| field.to_string())
        .collect();
    machine
}

/// Write a metadata tree as an AttractMode romlist.
///
/// Fields are joined raw with semicolons (the dialect never quotes). The
/// extended layout is used when the parsed header had 22 columns or any
/// machine carries an extended field.
pub fn write<W: Write>(mut writer: W, file: &MetadataFile) -> Result<(), DatError> {
    let extended = match &file.header.column_headers {
        Some(columns) => columns.len() >= EXTENDED_WIDTH,
        None => file.machines.iter().any(|machine| {
            machine.favorite.is_some()
                || machine.tags.is_some()
                || machine.played_count.is_some()
                || machine.played_time.is_some()
                || machine.file_is_available.is_some()
        }),
    };

    match &file.header.column_headers {
        Some(columns) => writeln!(writer, "#{}", columns.join(";"))?,
        None => {
            let mut columns: Vec<&str> = LEGACY_COLUMNS.to_vec();
            if extended {
                columns.extend(EXTENDED_COLUMNS);
            }
            writeln!(writer, "#{}", columns.join(";"))?;
        }
    }

    for machine in &file.machines {
        let mut row: Vec<String> = vec![
            machine.name.clone().unwrap_or_default(),
            machine.description.clone().unwrap_or_default(),
            file.header.name.clone().unwrap_or_default(),
            machine.cloneof.clone().unwrap_or_default(),
            machine.year.clone().unwrap_or_default(),
            machine.manufacturer.clone().unwrap_or_default(),
            machine.category.clone().unwrap_or_default(),
            machine.players.clone().unwrap_or_default(),
            machine.rotation.clone().unwrap_or_default(),
            machine.control.clone().unwrap_or_default(),
            machine.status.clone().unwrap_or_default(),
            machine.display_count.clone().unwrap_or_default(),
            machine.display_type.clone().unwrap_or_default(),
            machine.alt_romname.clone().unwrap_or_default(),
            machine.alt_title.clone().unwrap_or_default(),
            machine.comment.clone().unwrap_or_default(),
            machine.buttons.clone().unwrap_or_default(),
        ];
        if extended {
            row.push(machine.favorite.clone().unwrap_or_default());
            row.push(machine.tags.clone().unwrap_or_default());
            row.push(machine.played_count.clone().unwrap_or_default());
            row.push(machine.played_time.clone().unwrap_or_default());
            row.push(machine.file_is_available.clone().unwrap_or_default());
        }
        row.extend(machine.extras.iter().cloned());
        writeln!(writer, "{}", row.join(";"))?;
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

    const SAMPLE_ROMLIST: &str = "#Name;Title;Emulator;CloneOf;Year;Manufacturer;Category;Players;Rotation;Control;Status;DisplayCount;DisplayType;AltRomname;AltTitle;Extra;Buttons
puckman;PuckMan (Japan set 1);mame;;1980;Namco;Maze;1;90;joystick (4-way);good;1;raster;;;;1
puckmanb;PuckMan (bootleg set 1);mame;puckman;1980;bootleg;Maze;1;90;joystick (4-way);good;1;raster;;;;1
";

    #[test]
    fn test_parse_basic() {
        let dat = parse(SAMPLE_ROMLIST.as_bytes()).unwrap();
        assert_eq!(dat.header.name.as_deref(), Some("mame"));
        assert_eq!(
            dat.header.column_headers.as_ref().map(|c| c.len()),
            Some(17)
        );
        assert_eq!(dat.machines.len(), 2);

        let machine = &dat.machines[0];
        assert_eq!(machine.name.as_deref(), Some("puckman"));
        assert_eq!(machine.description.as_deref(), Some("PuckMan (Japan set 1)"));
        assert_eq!(machine.year.as_deref(), Some("1980"));
        assert_eq!(machine.manufacturer.as_deref(), Some("Namco"));
        assert_eq!(machine.control.as_deref(), Some("joystick (4-way)"));
        assert_eq!(machine.cloneof, None);

        let clone = &dat.machines[1];
        assert_eq!(clone.cloneof.as_deref(), Some("puckman"));
    }

    #[test]
    fn test_eighteenth_field_lands_in_extras() {
        let text = "#Name;Title;Emulator;CloneOf;Year;Manufacturer;Category;Players;Rotation;Control;Status;DisplayCount;DisplayType;AltRomname;AltTitle;Extra;Buttons\ngamename;Game Title;mame;;1999;Vendor;Action;1;0;joystick;good;1;raster;;;;6;surplus\n";
        let dat = parse(text.as_bytes()).unwrap();
        let machine = &dat.machines[0];
        assert_eq!(machine.buttons.as_deref(), Some("6"));
        assert_eq!(machine.extras, vec!["surplus"]);
        // The surplus field is written back, not dropped.
        let mut out = Vec::new();
        write(&mut out, &dat).unwrap();
        assert_eq!(text, String::from_utf8(out).unwrap());
    }

    #[test]
    fn test_short_row_is_not_an_error() {
        let text = "#Name;Title;Emulator\npuckman;PuckMan;mame\n";
        let dat = parse(text.as_bytes()).unwrap();
        let machine = &dat.machines[0];
        assert_eq!(machine.name.as_deref(), Some("puckman"));
        assert_eq!(machine.year, None);
        assert_eq!(machine.buttons, None);
    }

    #[test]
    fn test_extended_row_shape() {
        let legacy = "gamename;Game Title;mame;;1999;Vendor;Action;1;0;joystick;good;1;raster;;;;6";
        let text = format!(
            "#Name;Title;Emulator;CloneOf;Year;Manufacturer;Category;Players;Rotation;Control;Status;DisplayCount;DisplayType;AltRomname;AltTitle;Extra;Buttons;Favourite;Tags;PlayedCount;PlayedTime;FileIsAvailable\n{legacy};1;puzzle,classic;12;3600;1\n"
        );
        let dat = parse(text.as_bytes()).unwrap();
        let machine = &dat.machines[0];
        assert_eq!(machine.favorite.as_deref(), Some("1"));
        assert_eq!(machine.tags.as_deref(), Some("puzzle,classic"));
        assert_eq!(machine.played_count.as_deref(), Some("12"));
        assert!(machine.extras.is_empty());

        let mut out = Vec::new();
        write(&mut out, &dat).unwrap();
        assert_eq!(text, String::from_utf8(out).unwrap());
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let dat = parse(SAMPLE_ROMLIST.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mut out, &dat).unwrap();
        assert_eq!(SAMPLE_ROMLIST, String::from_utf8(out).unwrap());
    }

    #[test]
    fn test_headerless_romlist() {
        let text = "puckman;PuckMan;mame;;1980;Namco;Maze;1;90;joystick;good;1;raster;;;;1\n";
        let dat = parse(text.as_bytes()).unwrap();
        assert!(dat.header.column_headers.is_none());
        assert_eq!(dat.machines[0].name.as_deref(), Some("puckman"));
    }
}
