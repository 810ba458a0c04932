//! Logiqx XML DAT reader and writer.
//!
//! The XML side is deliberately mechanical: an event loop mapping
//! elements and attributes straight onto the canonical tree, mirroring
//! the text dialects' field tables. Unknown attributes are kept as
//! `key=value` strings on the owning node's extras.

use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use datloom_core::{DatItem, Disk, Header, ItemStatus, Machine, Media, MetadataFile, Rom, Sample};

use crate::error::DatError;

const DOCTYPE: &str = r#"datafile PUBLIC "-//Logiqx//DTD ROM Management Datafile//EN" "http://www.logiqx.com/Dats/datafile.dtd""#;

/// Parse a Logiqx XML DAT from a reader.
pub fn parse<R: BufRead>(reader: R) -> Result<MetadataFile, DatError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut file = MetadataFile::new();
    let mut buf = Vec::new();
    let mut in_header = false;
    let mut current_tag = String::new();
    let mut current_machine: Option<Machine> = None;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag.as_str() {
                    "header" => in_header = true,
                    "game" | "machine" => current_machine = Some(parse_machine_attributes(e)?),
                    // Items usually arrive self-closed, but the expanded
                    // form carries the same attributes.
                    "rom" | "disk" | "media" | "sample" if current_machine.is_some() => {
                        let machine = current_machine.as_mut().expect("checked in guard");
                        if let Some(item) = parse_item(&tag, e)? {
                            machine.items.push(item);
                        }
                    }
                    _ => current_tag = tag,
                }
            }
            Event::Empty(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if in_header {
                    header_element(&mut file.header, &tag, e)?;
                } else if let Some(ref mut machine) = current_machine {
                    if let Some(item) = parse_item(&tag, e)? {
                        machine.items.push(item);
                    }
                }
            }
            Event::Text(ref e) => {
                let text = e.unescape()?.to_string();
                if in_header {
                    header_text(&mut file.header, &current_tag, text);
                } else if let Some(ref mut machine) = current_machine {
                    machine_text(machine, &current_tag, text);
                }
            }
            Event::End(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag.as_str() {
                    "header" => in_header = false,
                    "game" | "machine" => {
                        if let Some(machine) = current_machine.take() {
                            file.machines.push(machine);
                        }
                    }
                    _ => current_tag.clear(),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if file.header.is_empty() && file.machines.is_empty() {
        return Err(DatError::invalid_dat("No header or games found in XML DAT"));
    }

    Ok(file)
}

/// Parse a Logiqx XML DAT from a file path.
pub fn parse_path(path: &Path) -> Result<MetadataFile, DatError> {
    let file = std::fs::File::open(path)?;
    parse(std::io::BufReader::new(file))
}

fn header_text(header: &mut Header, tag: &str, text: String) {
    match tag {
        "name" => header.name = Some(text),
        "description" => header.description = Some(text),
        "category" => header.category = Some(text),
        "version" => header.version = Some(text),
        "date" => header.date = Some(text),
        "author" => header.author = Some(text),
        "email" => header.email = Some(text),
        "homepage" => header.homepage = Some(text),
        "url" => header.url = Some(text),
        "comment" => header.comment = Some(text),
        _ => header.extras.push(format!("{tag}={text}")),
    }
}

/// Empty elements inside `<header>`: the `<clrmamepro/>` and
/// `<romcenter/>` tool hint elements.
fn header_element(header: &mut Header, tag: &str, e: &BytesStart<'_>) -> Result<(), DatError> {
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.to_string();
        match (tag, attr.key.as_ref()) {
            ("clrmamepro", b"forcemerging") => header.force_merging = Some(value),
            ("clrmamepro", b"forcenodump") => header.force_nodump = Some(value),
            ("clrmamepro", b"forcepacking") => header.force_packing = Some(value),
            ("romcenter", b"plugin") => header.plugin = Some(value),
            ("romcenter", b"version") => header.romcenter_version = Some(value),
            (_, key) => header
                .extras
                .push(format!("{}={value}", String::from_utf8_lossy(key))),
        }
    }
    Ok(())
}

fn parse_machine_attributes(e: &BytesStart<'_>) -> Result<Machine, DatError> {
    let mut machine = Machine::default();
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.to_string();
        match attr.key.as_ref() {
            b"name" => machine.name = Some(value),
            b"cloneof" => machine.cloneof = Some(value),
            b"romof" => machine.romof = Some(value),
            b"sampleof" => machine.sampleof = Some(value),
            b"isdevice" => machine.is_device = value == "yes",
            key => machine
                .extras
                .push(format!("{}={value}", String::from_utf8_lossy(key))),
        }
    }
    Ok(machine)
}

fn machine_text(machine: &mut Machine, tag: &str, text: String) {
    match tag {
        "description" => machine.description = Some(text),
        "year" => machine.year = Some(text),
        "manufacturer" => machine.manufacturer = Some(text),
        "category" => machine.category = Some(text),
        "comment" => machine.comment = Some(text),
        _ => machine.extras.push(format!("{tag}={text}")),
    }
}

fn parse_item(tag: &str, e: &BytesStart<'_>) -> Result<Option<DatItem>, DatError> {
    match tag {
        "rom" => {
            let mut rom = Rom::default();
            for attr in e.attributes() {
                let attr = attr?;
                let value = attr.unescape_value()?.to_string();
                match attr.key.as_ref() {
                    b"name" => rom.name = Some(value),
                    b"size" => rom.size = value.parse().ok(),
                    b"crc" => rom.crc = Some(value.to_lowercase()),
                    b"md5" => rom.md5 = Some(value.to_lowercase()),
                    b"sha1" => rom.sha1 = Some(value.to_lowercase()),
                    b"sha256" => rom.sha256 = Some(value.to_lowercase()),
                    b"sha384" => rom.sha384 = Some(value.to_lowercase()),
                    b"sha512" => rom.sha512 = Some(value.to_lowercase()),
                    b"spamsum" => rom.spamsum = Some(value),
                    b"date" => rom.date = Some(value),
                    b"status" => rom.status = ItemStatus::parse(&value).unwrap_or_default(),
                    key => rom
                        .extras
                        .push(format!("{}={value}", String::from_utf8_lossy(key))),
                }
            }
            Ok(Some(DatItem::Rom(rom)))
        }
        "disk" => {
            let mut disk = Disk::default();
            for attr in e.attributes() {
                let attr = attr?;
                let value = attr.unescape_value()?.to_string();
                match attr.key.as_ref() {
                    b"name" => disk.name = Some(value),
                    b"md5" => disk.md5 = Some(value.to_lowercase()),
                    b"sha1" => disk.sha1 = Some(value.to_lowercase()),
                    b"status" => disk.status = ItemStatus::parse(&value).unwrap_or_default(),
                    b"writable" => disk.writable = value == "yes",
                    key => disk
                        .extras
                        .push(format!("{}={value}", String::from_utf8_lossy(key))),
                }
            }
            Ok(Some(DatItem::Disk(disk)))
        }
        "media" => {
            let mut media = Media::default();
            for attr in e.attributes() {
                let attr = attr?;
                let value = attr.unescape_value()?.to_string();
                match attr.key.as_ref() {
                    b"name" => media.name = Some(value),
                    b"md5" => media.md5 = Some(value.to_lowercase()),
                    b"sha1" => media.sha1 = Some(value.to_lowercase()),
                    b"sha256" => media.sha256 = Some(value.to_lowercase()),
                    b"spamsum" => media.spamsum = Some(value),
                    key => media
                        .extras
                        .push(format!("{}={value}", String::from_utf8_lossy(key))),
                }
            }
            Ok(Some(DatItem::Media(media)))
        }
        "sample" => {
            let mut name = String::new();
            for attr in e.attributes() {
                let attr = attr?;
                if attr.key.as_ref() == b"name" {
                    name = attr.unescape_value()?.to_string();
                }
            }
            Ok(Some(DatItem::Sample(Sample { name })))
        }
        _ => Ok(None),
    }
}

/// Write a metadata tree as a Logiqx XML DAT.
pub fn write<W: Write>(writer: W, file: &MetadataFile) -> Result<(), DatError> {
    let mut xml = Writer::new_with_indent(writer, b'\t', 1);

    xml.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    xml.write_event(Event::DocType(BytesText::from_escaped(DOCTYPE)))?;
    xml.write_event(Event::Start(BytesStart::new("datafile")))?;

    write_header(&mut xml, &file.header)?;
    for machine in &file.machines {
        write_machine(&mut xml, machine)?;
    }

    xml.write_event(Event::End(BytesEnd::new("datafile")))?;
    Ok(())
}

/// Write a metadata tree to a file path.
pub fn write_path(path: &Path, file: &MetadataFile) -> Result<(), DatError> {
    let out = std::fs::File::create(path)?;
    write(BufWriter::new(out), file)
}

fn write_header<W: Write>(xml: &mut Writer<W>, header: &Header) -> Result<(), DatError> {
    if header.is_empty() {
        return Ok(());
    }

    xml.write_event(Event::Start(BytesStart::new("header")))?;
    for (tag, value) in [
        ("name", &header.name),
        ("description", &header.description),
        ("category", &header.category),
        ("version", &header.version),
        ("date", &header.date),
        ("author", &header.author),
        ("email", &header.email),
        ("homepage", &header.homepage),
        ("url", &header.url),
        ("comment", &header.comment),
    ] {
        if let Some(value) = value {
            xml.create_element(tag)
                .write_text_content(BytesText::new(value))?;
        }
    }

    if header.force_merging.is_some()
        || header.force_nodump.is_some()
        || header.force_packing.is_some()
    {
        let mut elem = BytesStart::new("clrmamepro");
        push_opt_attribute(&mut elem, "forcemerging", &header.force_merging);
        push_opt_attribute(&mut elem, "forcenodump", &header.force_nodump);
        push_opt_attribute(&mut elem, "forcepacking", &header.force_packing);
        xml.write_event(Event::Empty(elem))?;
    }
    if header.plugin.is_some() || header.romcenter_version.is_some() {
        let mut elem = BytesStart::new("romcenter");
        push_opt_attribute(&mut elem, "plugin", &header.plugin);
        push_opt_attribute(&mut elem, "version", &header.romcenter_version);
        xml.write_event(Event::Empty(elem))?;
    }

    xml.write_event(Event::End(BytesEnd::new("header")))?;
    Ok(())
}

fn write_machine<W: Write>(xml: &mut Writer<W>, machine: &Machine) -> Result<(), DatError> {
    let mut open = BytesStart::new("game");
    push_opt_attribute(&mut open, "name", &machine.name);
    push_opt_attribute(&mut open, "cloneof", &machine.cloneof);
    push_opt_attribute(&mut open, "romof", &machine.romof);
    push_opt_attribute(&mut open, "sampleof", &machine.sampleof);
    if machine.is_device {
        open.push_attribute(("isdevice", "yes"));
    }
    push_extra_attributes(&mut open, &machine.extras);
    xml.write_event(Event::Start(open))?;

    for (tag, value) in [
        ("description", &machine.description),
        ("year", &machine.year),
        ("manufacturer", &machine.manufacturer),
        ("category", &machine.category),
        ("comment", &machine.comment),
    ] {
        if let Some(value) = value {
            xml.create_element(tag)
                .write_text_content(BytesText::new(value))?;
        }
    }

    for item in &machine.items {
        match item {
            DatItem::Rom(rom) => {
                let mut elem = BytesStart::new("rom");
                push_opt_attribute(&mut elem, "name", &rom.name);
                if let Some(size) = rom.size {
                    elem.push_attribute(("size", size.to_string().as_str()));
                }
                push_opt_attribute(&mut elem, "crc", &rom.crc);
                push_opt_attribute(&mut elem, "md5", &rom.md5);
                push_opt_attribute(&mut elem, "sha1", &rom.sha1);
                push_opt_attribute(&mut elem, "sha256", &rom.sha256);
                push_opt_attribute(&mut elem, "sha384", &rom.sha384);
                push_opt_attribute(&mut elem, "sha512", &rom.sha512);
                push_opt_attribute(&mut elem, "spamsum", &rom.spamsum);
                push_opt_attribute(&mut elem, "date", &rom.date);
                if let Some(status) = rom.status.as_str() {
                    elem.push_attribute(("status", status));
                }
                push_extra_attributes(&mut elem, &rom.extras);
                xml.write_event(Event::Empty(elem))?;
            }
            DatItem::Disk(disk) => {
                let mut elem = BytesStart::new("disk");
                push_opt_attribute(&mut elem, "name", &disk.name);
                push_opt_attribute(&mut elem, "md5", &disk.md5);
                push_opt_attribute(&mut elem, "sha1", &disk.sha1);
                if let Some(status) = disk.status.as_str() {
                    elem.push_attribute(("status", status));
                }
                if disk.writable {
                    elem.push_attribute(("writable", "yes"));
                }
                push_extra_attributes(&mut elem, &disk.extras);
                xml.write_event(Event::Empty(elem))?;
            }
            DatItem::Media(media) => {
                let mut elem = BytesStart::new("media");
                push_opt_attribute(&mut elem, "name", &media.name);
                push_opt_attribute(&mut elem, "md5", &media.md5);
                push_opt_attribute(&mut elem, "sha1", &media.sha1);
                push_opt_attribute(&mut elem, "sha256", &media.sha256);
                push_opt_attribute(&mut elem, "spamsum", &media.spamsum);
                push_extra_attributes(&mut elem, &media.extras);
                xml.write_event(Event::Empty(elem))?;
            }
            DatItem::Sample(sample) => {
                let mut elem = BytesStart::new("sample");
                elem.push_attribute(("name", sample.name.as_str()));
                xml.write_event(Event::Empty(elem))?;
            }
        }
    }

    xml.write_event(Event::End(BytesEnd::new("game")))?;
    Ok(())
}

fn push_opt_attribute(elem: &mut BytesStart<'_>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        elem.push_attribute((key, value.as_str()));
    }
}

/// Extras captured from XML are `key=value` strings; anything else is
/// not re-emittable as an attribute and is dropped with a warning.
fn push_extra_attributes(elem: &mut BytesStart<'_>, extras: &[String]) {
    for extra in extras {
        match extra.split_once('=') {
            Some((key, value)) => elem.push_attribute((key, value)),
            None => log::warn!("extra {extra:?} has no key=value shape, dropped on XML write"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0"?>
<!DOCTYPE datafile PUBLIC "-//Logiqx//DTD ROM Management Datafile//EN" "http://www.logiqx.com/Dats/datafile.dtd">
<datafile>
	<header>
		<name>Nintendo - Game Boy</name>
		<description>Nintendo - Game Boy (20240101)</description>
		<version>20240101-000000</version>
		<author>No-Intro</author>
	</header>
	<game name="Tetris (World) (Rev 1)">
		<description>Tetris (World) (Rev 1)</description>
		<rom name="Tetris (World) (Rev 1).gb" size="32768" crc="46df91ad" md5="482d0e2f37ab5e2e0e2c7dcc9e6ed387" sha1="a7c021fc5c0f4d0b1bc39831bb5a5b4cbcf3f6a6"/>
	</game>
	<game name="Killer Instinct (USA)" cloneof="kinst">
		<description>Killer Instinct (USA)</description>
		<disk name="kinst" sha1="3b4b9b7a1a2c4e5f6a7b8c9d0e1f2a3b4c5d6e7f"/>
	</game>
</datafile>"#;

    #[test]
    fn test_parse_basic() {
        let dat = parse(SAMPLE_XML.as_bytes()).unwrap();
        assert_eq!(dat.header.name.as_deref(), Some("Nintendo - Game Boy"));
        assert_eq!(dat.header.author.as_deref(), Some("No-Intro"));
        assert_eq!(dat.machines.len(), 2);

        let game = &dat.machines[0];
        assert_eq!(game.name.as_deref(), Some("Tetris (World) (Rev 1)"));
        let rom = game.roms().next().unwrap();
        assert_eq!(rom.size, Some(32768));
        assert_eq!(rom.crc.as_deref(), Some("46df91ad"));

        let clone = &dat.machines[1];
        assert_eq!(clone.cloneof.as_deref(), Some("kinst"));
        assert_eq!(clone.disks().count(), 1);
    }

    #[test]
    fn test_header_tool_hints() {
        let xml = r#"<datafile><header><name>X</name><clrmamepro forcemerging="split"/><romcenter plugin="arcade.dll"/></header></datafile>"#;
        let dat = parse(xml.as_bytes()).unwrap();
        assert_eq!(dat.header.force_merging.as_deref(), Some("split"));
        assert_eq!(dat.header.plugin.as_deref(), Some("arcade.dll"));
    }

    #[test]
    fn test_unknown_attribute_preserved() {
        let xml = r#"<datafile><game name="g"><rom name="a.bin" size="1" crc="00000000" mia="yes"/></game></datafile>"#;
        let dat = parse(xml.as_bytes()).unwrap();
        let rom = dat.machines[0].roms().next().unwrap();
        assert_eq!(rom.extras, vec!["mia=yes"]);
    }

    #[test]
    fn test_status_attribute() {
        let xml = r#"<datafile><game name="g"><rom name="a.bin" status="baddump"/><disk name="d" status="nodump"/></game></datafile>"#;
        let dat = parse(xml.as_bytes()).unwrap();
        assert_eq!(
            dat.machines[0].roms().next().unwrap().status,
            ItemStatus::BadDump
        );
        assert_eq!(
            dat.machines[0].disks().next().unwrap().status,
            ItemStatus::NoDump
        );
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(parse("<datafile></datafile>".as_bytes()).is_err());
    }

    #[test]
    fn test_write_then_parse_is_identity() {
        let dat = parse(SAMPLE_XML.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mut out, &dat).unwrap();
        let text = String::from_utf8(out).unwrap();

        let reparsed = parse(text.as_bytes()).unwrap();
        assert_eq!(dat, reparsed);
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let dat = parse(SAMPLE_XML.as_bytes()).unwrap();
        let mut out = Vec::new();
        write(&mut out, &dat).unwrap();
        let once = String::from_utf8(out).unwrap();

        let dat2 = parse(once.as_bytes()).unwrap();
        let mut out2 = Vec::new();
        write(&mut out2, &dat2).unwrap();
        assert_eq!(once, String::from_utf8(out2).unwrap());
    }

    #[test]
    fn test_device_machines() {
        let xml = r#"<datafile><machine name="namco51" isdevice="yes"><rom name="51xx.bin" size="1024" crc="c2f57ef8"/></machine></datafile>"#;
        let dat = parse(xml.as_bytes()).unwrap();
        assert!(dat.machines[0].is_device);

        let mut out = Vec::new();
        write(&mut out, &dat).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("isdevice=\"yes\""));
    }
}
