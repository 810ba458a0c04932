use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use datloom_formats::Format;

use crate::error::CliError;

pub(crate) fn run_list_formats() -> Result<(), CliError> {
    for format in Format::ALL {
        println!(
            "  {:<12} {}",
            format
                .name()
                .if_supports_color(Stdout, |t| t.bold()),
            format.description(),
        );
    }
    Ok(())
}
