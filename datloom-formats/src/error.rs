/// Errors that can occur while reading or writing DAT files.
///
/// Structural ambiguity inside a file is deliberately NOT an error: lines
/// that match no rule degrade to the nearest extras list and the rest of
/// the file parses normally. These variants cover the failures a caller
/// must actually handle — bad streams, empty input, unknown dialects.
#[derive(Debug, thiserror::Error)]
pub enum DatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid DAT file: {0}")]
    InvalidDat(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl DatError {
    pub fn invalid_dat(msg: impl Into<String>) -> Self {
        Self::InvalidDat(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }
}
