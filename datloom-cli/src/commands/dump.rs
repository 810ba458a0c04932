use std::path::Path;

use datloom_formats::Format;

use crate::error::CliError;

pub(crate) fn run_dump(input: &Path, from: Option<Format>) -> Result<(), CliError> {
    let format = match from {
        Some(format) => format,
        None => Format::detect(input)?,
    };
    let tree = format.parse_path(input)?;
    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(())
}
