use std::borrow::Cow;
use std::io::{self, Write};

use asn1::Scalar;
use der::{StructuralError, Tlv};
use hexdump::{ByteClass, Lines};
use pem::PemBlock;

use super::Sink;

const STYLE: &str = "\
.asn1 { margin-left: 1.5em; padding-left: 0.5em; border-left: 1px solid #ccc; }
.asn1-bad { color: #a00; }
.hexdump { font-size: 85%; }
.hexdumpZero, .hexdumpNewline, .hexdumpFF, .hexdumpUnprintable { color: #999; }
";

/// Escapes text for HTML element content and quoted attribute values.
pub(crate) fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut output = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            c => output.push(c),
        }
    }
    Cow::Owned(output)
}

/// Renders files as one HTML document of nested `div`s.
pub(crate) struct HtmlSink<W> {
    out: W,
    // TLV divs currently open
    depth: usize,
}

impl<W: Write> HtmlSink<W> {
    pub(crate) fn new(out: W) -> Self {
        HtmlSink { out, depth: 0 }
    }

    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    pub(crate) fn header(&mut self, files: &[String]) -> io::Result<()> {
        let title = files.iter().map(|f| escape(f)).collect::<Vec<_>>().join(" ");
        write!(
            self.out,
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
             <meta name=\"generator\" content=\"derview {}\">\n\
             <title>derview | {}</title>\n<style>\n{}</style>\n</head>\n<body>\n",
            env!("CARGO_PKG_VERSION"),
            title,
            STYLE
        )
    }

    pub(crate) fn footer(&mut self) -> io::Result<()> {
        write!(self.out, "</body>\n</html>\n")
    }

    fn hexdump(&mut self, lines: Lines<'_>) -> io::Result<()> {
        write!(self.out, "<pre class='hexdump pre-scrollable'>")?;
        for line in lines {
            write!(self.out, "{}    ", line.hex())?;
            for class in line.classes() {
                match class {
                    ByteClass::Zero => write!(self.out, "<span class='hexdumpZero'>⌁</span>")?,
                    ByteClass::Newline => {
                        write!(self.out, "<span class='hexdumpNewline'>↲</span>")?
                    }
                    ByteClass::Ff => write!(self.out, "<span class='hexdumpFF'>^</span>")?,
                    ByteClass::Printable(c) => {
                        let mut buf = [0u8; 4];
                        write!(
                            self.out,
                            "<span class='hexdumpPrintable'>{}</span>",
                            escape(c.encode_utf8(&mut buf))
                        )?
                    }
                    ByteClass::Unprintable => {
                        write!(self.out, "<span class='hexdumpUnprintable'>.</span>")?
                    }
                }
            }
            writeln!(self.out)?;
        }
        writeln!(self.out, "</pre>")
    }

    fn scalar(&mut self, tlv: &Tlv<'_>, scalar: &Scalar<'_>) -> io::Result<()> {
        match scalar {
            Scalar::Boolean(b) => writeln!(self.out, "<div>BOOLEAN {}</div>", b),
            Scalar::Integer(i) => writeln!(self.out, "<div>INTEGER {}</div>", i),
            Scalar::BitString(bits) => {
                writeln!(self.out, "<div>BIT STRING, {} bits</div>", bits.bit_len())?;
                self.hexdump(hexdump::lines(&bits.masked()))
            }
            Scalar::Null => writeln!(self.out, "<div>NULL</div>"),
            Scalar::ObjectIdentifier(oid) => writeln!(self.out, "<div>OID {}</div>", oid),
            Scalar::Text(text) => writeln!(
                self.out,
                "<div>STRING <q title=\"{}\">{}</q></div>",
                text.charset(),
                escape(text.as_str())
            ),
            Scalar::Time(time) => writeln!(self.out, "<div>{}</div>", time),
            Scalar::Invalid { content, error } => {
                writeln!(
                    self.out,
                    "<div class=\"asn1-invalid\">invalid {}: {}</div>",
                    escape(&tlv.tag().to_string()),
                    escape(&error.to_string())
                )?;
                self.hexdump(hexdump::lines(content))
            }
            Scalar::OctetString(data) | Scalar::Raw(data) => self.hexdump(hexdump::lines(data)),
        }
    }
}

impl<W: Write> Sink for HtmlSink<W> {
    fn file(&mut self, name: &str, size: usize, is_pem: bool) -> io::Result<()> {
        write!(
            self.out,
            "<h1>{}</h1>\n<p>{} byte {} file</p>\n",
            escape(name),
            size,
            if is_pem { "PEM" } else { "DER" }
        )
    }

    fn pem_block(&mut self, block: &PemBlock) -> io::Result<()> {
        write!(
            self.out,
            "<div class=\"pem\">\n<p>PEM, type: <code>{}</code></p>\n",
            escape(&block.label().to_string())
        )?;
        if block.headers().is_empty() {
            return Ok(());
        }
        write!(
            self.out,
            "<table>\n<thead>\n<tr><th>Header</th><th>Value</th></tr>\n</thead>\n<tbody>\n"
        )?;
        for (name, value) in block.headers() {
            writeln!(
                self.out,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(name),
                escape(value)
            )?;
        }
        write!(self.out, "</tbody>\n</table>\n")
    }

    fn end_pem_block(&mut self) -> io::Result<()> {
        writeln!(self.out, "</div>")
    }

    fn der(&mut self, len: usize) -> io::Result<()> {
        write!(self.out, "<div class=\"der\">\n<p>DER: {} bytes</p>\n", len)
    }

    fn enter(&mut self, tlv: &Tlv<'_>) -> io::Result<()> {
        let tag = tlv.tag();
        write!(
            self.out,
            "<div class=\"asn1\">\n<p><b>{}</b>: {}, {}, tag {}, offset {}, \
             header {} bytes, body {} bytes</p>\n",
            escape(&tag.to_string()),
            tag.class(),
            if tag.is_constructed() { "compound" } else { "primitive" },
            tag.number(),
            tlv.offset(),
            tlv.header_len(),
            tlv.body().len()
        )?;
        self.depth += 1;
        match tlv.scalar() {
            Some(scalar) => self.scalar(tlv, scalar),
            None => Ok(()),
        }
    }

    fn leave(&mut self) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        writeln!(self.out, "</div>")
    }

    fn malformed(&mut self, error: &StructuralError<'_>) -> io::Result<()> {
        for _ in 0..self.depth {
            writeln!(self.out, "</div>")?;
        }
        self.depth = 0;

        let residual = error.residual();
        write!(
            self.out,
            "<div class=\"asn1-bad\">\n<p>Bad ASN.1 at offset {}: {}; {} bytes follow</p>\n",
            error.offset(),
            escape(&error.reason().to_string()),
            residual.len()
        )?;
        self.hexdump(residual.lines())?;
        writeln!(self.out, "</div>")
    }

    fn end_der(&mut self) -> io::Result<()> {
        writeln!(self.out, "</div>")
    }

    fn trailing(&mut self, data: &[u8]) -> io::Result<()> {
        writeln!(self.out, "<h3>Trailing data</h3>")?;
        self.hexdump(hexdump::lines(data))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{HtmlSink, escape};
    use crate::render::render;

    fn render_html(input: &[u8]) -> String {
        let mut sink = HtmlSink::new(Vec::new());
        render(&mut sink, "in<1>.der", input).unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[rstest(
        input,
        expected,
        case("plain", "plain"),
        case("a<b>&c", "a&lt;b&gt;&amp;c"),
        case("\"q\" 'r'", "&quot;q&quot; &#39;r&#39;")
    )]
    fn test_escape(input: &str, expected: &str) {
        assert_eq!(expected, escape(input));
    }

    #[test]
    fn test_render_sequence() {
        let html = render_html(&[0x30, 0x06, 0x02, 0x01, 0x2a, 0x01, 0x01, 0xff]);
        assert!(html.starts_with("<h1>in&lt;1&gt;.der</h1>\n<p>8 byte DER file</p>\n"));
        assert!(html.contains("<b>SEQUENCE</b>: universal, compound, tag 16, offset 0"));
        assert!(html.contains("<div>INTEGER 42</div>"));
        assert!(html.contains("<div>BOOLEAN true</div>"));
        assert_eq!(html.matches("<div").count(), html.matches("</div>").count());
    }

    #[test]
    fn test_render_text_is_escaped() {
        // UTF8String "<x>"
        let html = render_html(&[0x0c, 0x03, b'<', b'x', b'>']);
        assert!(html.contains("<q title=\"UTF8String\">&lt;x&gt;</q>"));
    }

    #[test]
    fn test_render_hexdump_glyphs() {
        // OCTET STRING 00 0A FF 3C 41 7F
        let html = render_html(&[0x04, 0x06, 0x00, 0x0a, 0xff, 0x3c, 0x41, 0x7f]);
        assert!(html.contains(concat!(
            "<span class='hexdumpZero'>⌁</span>",
            "<span class='hexdumpNewline'>↲</span>",
            "<span class='hexdumpFF'>^</span>",
            "<span class='hexdumpPrintable'>&lt;</span>",
            "<span class='hexdumpPrintable'>A</span>",
            "<span class='hexdumpUnprintable'>.</span>",
        )));
    }

    #[test]
    fn test_render_malformed_closes_open_divs() {
        // SEQUENCE { INTEGER 1, OCTET STRING claiming 4 bytes of 1 }
        let html = render_html(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x04, 0x04, 0x00]);
        assert!(html.contains("Bad ASN.1 at offset 5: truncated body"));
        // the residual is dumped from the broken OCTET STRING onwards
        assert!(html.contains("<pre class='hexdump pre-scrollable'>04 04 00 "));
        assert_eq!(html.matches("<div").count(), html.matches("</div>").count());
    }
}
