use std::io::{self, BufWriter, Write};

use clap::Args;
use derview::decoder::Decoder;

use crate::error::Result;
use crate::render::Source;
use crate::render::text::write_hexdump;
use crate::utils::read_input;

#[derive(Args)]
pub(crate) struct Config {
    /// Path to the DER or PEM file. If not specified, reads from stdin
    file: Option<String>,
}

/// Dumps DER input as is; PEM input as the payload of each block, followed
/// by any trailing data.
pub(crate) fn execute(config: Config) -> Result<()> {
    let input = read_input(config.file.as_deref())?;
    let mut out = BufWriter::new(io::stdout().lock());

    match Source::split(&input) {
        Source::Der(data) => write_hexdump(&mut out, hexdump::lines(data), "")?,
        Source::Pem { blocks, trailing } => {
            for block in &blocks {
                let payload: Vec<u8> = block.decode()?;
                writeln!(out, "PEM {}: {} bytes", block.label(), payload.len())?;
                write_hexdump(&mut out, hexdump::lines(&payload), "")?;
            }
            if !trailing.is_empty() {
                writeln!(out, "trailing data: {} bytes", trailing.len())?;
                write_hexdump(&mut out, hexdump::lines(trailing), "")?;
            }
        }
    }

    out.flush()?;
    Ok(())
}
