use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use datloom_formats::Format;

use crate::error::CliError;

pub(crate) fn run_convert(
    input: &Path,
    output: &Path,
    from: Option<Format>,
    to: Option<Format>,
) -> Result<(), CliError> {
    let (from, to) = datloom_formats::convert(input, output, from, to)?;

    println!(
        "{} {} ({}) -> {} ({})",
        "Converted".if_supports_color(Stdout, |t| t.green()),
        input.display(),
        from.if_supports_color(Stdout, |t| t.cyan()),
        output.display(),
        to.if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}
