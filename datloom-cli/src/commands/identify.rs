use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use datloom_formats::Format;

use crate::error::CliError;

pub(crate) fn run_identify(files: &[PathBuf]) -> Result<(), CliError> {
    if files.is_empty() {
        return Err(CliError::Usage("no files given".to_string()));
    }

    for path in files {
        match Format::detect(path) {
            Ok(format) => println!(
                "{}: {} ({})",
                path.display(),
                format.if_supports_color(Stdout, |t| t.cyan()),
                format.description(),
            ),
            Err(e) => {
                eprintln!(
                    "{}: {}",
                    path.display(),
                    format!("{e}").if_supports_color(Stdout, |t| t.yellow()),
                );
            }
        }
    }
    Ok(())
}
