use std::io::{self, BufWriter, Write};

use clap::Args;
use der::Forest;
use derview::decoder::Decoder;
use serde::Serialize;

use crate::error::Result;
use crate::output::OutputFormat;
use crate::render::text::TextSink;
use crate::render::{Source, render};
use crate::utils::{STDIN_NAME, read_input};

#[derive(Args)]
pub(crate) struct Config {
    /// Path to the DER or PEM file. If not specified, reads from stdin
    file: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,
}

/// One part of the input in the JSON output.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Section<'a> {
    Der {
        length: usize,
        items: Forest<'a>,
    },
    Pem {
        label: String,
        headers: &'a [(String, String)],
        length: usize,
        items: Forest<'a>,
    },
    Trailing {
        offset: usize,
        length: usize,
    },
}

pub(crate) fn execute(config: Config) -> Result<()> {
    let input = read_input(config.file.as_deref())?;
    let name = config.file.as_deref().unwrap_or(STDIN_NAME);
    let mut out = BufWriter::new(io::stdout().lock());

    match config.output {
        OutputFormat::Text => {
            let mut sink = TextSink::new(&mut out);
            render(&mut sink, name, &input)?;
        }
        OutputFormat::Json => {
            let source = Source::split(&input);
            let sections = sections(&source, input.len())?;
            serde_json::to_writer_pretty(&mut out, &sections)?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn sections<'a>(source: &'a Source<'a>, total: usize) -> Result<Vec<Section<'a>>> {
    let mut sections = Vec::new();
    match source {
        Source::Der(data) => sections.push(Section::Der {
            length: data.len(),
            items: data.decode()?,
        }),
        Source::Pem { blocks, trailing } => {
            for block in blocks {
                sections.push(Section::Pem {
                    label: block.label().to_string(),
                    headers: block.headers(),
                    length: block.payload().len(),
                    items: block.payload().decode()?,
                });
            }
            if !trailing.is_empty() {
                sections.push(Section::Trailing {
                    offset: total - trailing.len(),
                    length: trailing.len(),
                });
            }
        }
    }
    Ok(sections)
}
