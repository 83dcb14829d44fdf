//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::error::Error;

use osmpoi_cli::CliError;

fn main() {
    if let Err(err) = osmpoi_cli::run() {
        if let CliError::ArgumentParsing(clap_err) = err {
            clap_err.exit();
        }
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        eprintln!("osmpoi: {message}");
        std::process::exit(1);
    }
}
