use std::io::{self, Write};

use asn1::Scalar;
use der::{StructuralError, Tlv};
use hexdump::{ByteClass, Line, Lines};
use pem::PemBlock;

use super::Sink;

/// Width of the offset column in front of every TLV line.
const OFFSET_WIDTH: usize = 6;

/// Character column of a hex dump line, `.` for anything not printable.
pub(crate) fn ascii(line: &Line<'_>) -> String {
    line.classes()
        .map(|class| match class {
            ByteClass::Printable(c) => c,
            _ => '.',
        })
        .collect()
}

/// Writes `lines` `xxd`-style, each prefixed with `indent`.
pub(crate) fn write_hexdump<W: Write>(out: &mut W, lines: Lines<'_>, indent: &str) -> io::Result<()> {
    for line in lines {
        writeln!(
            out,
            "{}{:08X}  {}  |{}|",
            indent,
            line.offset(),
            line.hex(),
            ascii(&line)
        )?;
    }
    Ok(())
}

/// Renders files as an indented tree, in the manner of `dumpasn1`.
pub(crate) struct TextSink<W> {
    out: W,
    // extra indentation of the DER section inside a PEM block
    base: usize,
    depth: usize,
}

impl<W: Write> TextSink<W> {
    pub(crate) fn new(out: W) -> Self {
        TextSink {
            out,
            base: 0,
            depth: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    fn indent(&self) -> String {
        "  ".repeat(self.base + self.depth)
    }

    fn dump(&mut self, lines: Lines<'_>) -> io::Result<()> {
        let indent = format!("{}{}  ", " ".repeat(OFFSET_WIDTH + 2), self.indent());
        write_hexdump(&mut self.out, lines, &indent)
    }
}

fn describe(tlv: &Tlv<'_>, scalar: &Scalar<'_>) -> String {
    match scalar {
        Scalar::Raw(_) | Scalar::Invalid { .. } => format!("{} {}", tlv.tag(), scalar),
        _ => scalar.to_string(),
    }
}

impl<W: Write> Sink for TextSink<W> {
    fn file(&mut self, name: &str, size: usize, is_pem: bool) -> io::Result<()> {
        writeln!(
            self.out,
            "{}: {} byte {} file",
            name,
            size,
            if is_pem { "PEM" } else { "DER" }
        )
    }

    fn pem_block(&mut self, block: &PemBlock) -> io::Result<()> {
        writeln!(self.out, "PEM {}", block.label())?;
        for (name, value) in block.headers() {
            writeln!(self.out, "  {}: {}", name, value)?;
        }
        self.base = 1;
        Ok(())
    }

    fn end_pem_block(&mut self) -> io::Result<()> {
        self.base = 0;
        Ok(())
    }

    fn der(&mut self, len: usize) -> io::Result<()> {
        writeln!(self.out, "{}DER: {} bytes", self.indent(), len)
    }

    fn enter(&mut self, tlv: &Tlv<'_>) -> io::Result<()> {
        let line = match tlv.scalar() {
            Some(scalar) => describe(tlv, scalar),
            None => format!("{} ({} bytes)", tlv.tag(), tlv.body().len()),
        };
        writeln!(
            self.out,
            "{:>width$}: {}{}",
            tlv.offset(),
            self.indent(),
            line,
            width = OFFSET_WIDTH
        )?;
        if let Some(data) = tlv.scalar().and_then(Scalar::dump_bytes) {
            self.dump(hexdump::lines(data))?;
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    fn malformed(&mut self, error: &StructuralError<'_>) -> io::Result<()> {
        self.depth = 0;
        writeln!(
            self.out,
            "{:>width$}: {}malformed at offset {}: {}",
            error.offset(),
            self.indent(),
            error.offset(),
            error.reason(),
            width = OFFSET_WIDTH
        )?;
        self.dump(error.residual().lines())
    }

    fn end_der(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn trailing(&mut self, data: &[u8]) -> io::Result<()> {
        writeln!(self.out, "trailing data: {} bytes", data.len())?;
        write_hexdump(&mut self.out, hexdump::lines(data), "  ")
    }
}
