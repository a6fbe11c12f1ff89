use std::io::{self, BufWriter, Write};

use clap::Args;

use crate::error::{Error, Result};
use crate::render::html::HtmlSink;
use crate::render::render;
use crate::utils::{read_input, write_atomic};

#[derive(Args)]
pub(crate) struct Config {
    /// Name of output file. Written via a temporary file that replaces it
    /// on success. Defaults to stdout
    #[arg(long)]
    out: Option<String>,

    /// DER or PEM files to display
    files: Vec<String>,
}

pub(crate) fn execute(config: Config) -> Result<()> {
    if config.files.is_empty() {
        return Err(Error::Usage("expecting one or more input files".to_string()));
    }

    match config.out.as_deref() {
        Some(path) => write_atomic(path, |out| report(out, &config.files)),
        None => {
            let mut out = BufWriter::new(io::stdout().lock());
            report(&mut out, &config.files)
        }
    }
}

/// Writes one HTML document covering every file in `files`.
fn report<W: Write>(out: &mut W, files: &[String]) -> Result<()> {
    let mut sink = HtmlSink::new(out);
    sink.header(files)?;
    for file in files {
        let input = read_input(Some(file))?;
        render(&mut sink, file, &input)?;
    }
    sink.footer()?;
    sink.into_inner().flush()?;
    Ok(())
}
