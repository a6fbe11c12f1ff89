//! Routing of an input buffer into PEM blocks and DER, and the event driver
//! shared by every output format.

pub(crate) mod html;
pub(crate) mod text;

use std::io;

use der::{Event, StructuralError, Tlv};
use pem::PemBlock;

/// Inputs starting with this are split as PEM.
const PEM_PREFIX: &[u8] = b"-----BEGIN ";

/// An input buffer, split the way it is rendered.
pub(crate) enum Source<'a> {
    Der(&'a [u8]),
    /// `trailing` holds whatever follows the last block that could be
    /// split, possibly the whole input.
    Pem {
        blocks: Vec<PemBlock>,
        trailing: &'a [u8],
    },
}

impl<'a> Source<'a> {
    pub(crate) fn split(input: &'a [u8]) -> Self {
        if !input.starts_with(PEM_PREFIX) {
            return Source::Der(input);
        }
        let mut iter = pem::blocks(input);
        let blocks: Vec<PemBlock> = iter.by_ref().collect();
        let trailing = iter.remainder();
        tracing::debug!(blocks = blocks.len(), trailing = trailing.len(), "split PEM input");
        Source::Pem { blocks, trailing }
    }

    pub(crate) fn is_pem(&self) -> bool {
        matches!(self, Source::Pem { .. })
    }
}

/// Receives one rendered file as a flat sequence of calls.
///
/// For each file: `file`, then either one DER section or any number of PEM
/// blocks each wrapping a DER section, then `trailing` if bytes were left
/// after the last block, then `end_file`. A DER section is `der`, the walk
/// events as `enter`/`leave`/`malformed`, then `end_der`.
pub(crate) trait Sink {
    fn file(&mut self, name: &str, size: usize, is_pem: bool) -> io::Result<()>;

    fn pem_block(&mut self, block: &PemBlock) -> io::Result<()>;

    fn end_pem_block(&mut self) -> io::Result<()>;

    fn der(&mut self, len: usize) -> io::Result<()>;

    fn enter(&mut self, tlv: &Tlv<'_>) -> io::Result<()>;

    fn leave(&mut self) -> io::Result<()>;

    /// Also closes every `enter` that has not been left yet.
    fn malformed(&mut self, error: &StructuralError<'_>) -> io::Result<()>;

    fn end_der(&mut self) -> io::Result<()>;

    fn trailing(&mut self, data: &[u8]) -> io::Result<()>;

    fn end_file(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Feeds the whole of `input`, named `name`, to `sink`.
pub(crate) fn render<S: Sink>(sink: &mut S, name: &str, input: &[u8]) -> io::Result<()> {
    let source = Source::split(input);
    sink.file(name, input.len(), source.is_pem())?;
    match &source {
        Source::Der(data) => render_der(sink, data)?,
        Source::Pem { blocks, trailing } => {
            for block in blocks {
                sink.pem_block(block)?;
                render_der(sink, block.payload())?;
                sink.end_pem_block()?;
            }
            if !trailing.is_empty() {
                sink.trailing(trailing)?;
            }
        }
    }
    sink.end_file()
}

fn render_der<S: Sink>(sink: &mut S, data: &[u8]) -> io::Result<()> {
    sink.der(data.len())?;
    for event in der::walk(data) {
        match event {
            Event::Enter(tlv) => sink.enter(&tlv)?,
            Event::Leave => sink.leave()?,
            Event::Malformed(error) => sink.malformed(&error)?,
        }
    }
    sink.end_der()
}

#[cfg(test)]
mod tests {
    use std::io;

    use der::{StructuralError, Tlv};
    use pem::PemBlock;

    use super::{Sink, Source, render};

    const CERT_PEM: &[u8] = include_bytes!("../../../testdata/gnutls-ca.pem");
    const CERT_DER: &[u8] = include_bytes!("../../../testdata/gnutls-ca.der");

    /// Records the calls it receives.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Sink for Recorder {
        fn file(&mut self, name: &str, size: usize, is_pem: bool) -> io::Result<()> {
            self.calls.push(format!("file {} {} {}", name, size, is_pem));
            Ok(())
        }

        fn pem_block(&mut self, block: &PemBlock) -> io::Result<()> {
            self.calls.push(format!("pem {}", block.label()));
            Ok(())
        }

        fn end_pem_block(&mut self) -> io::Result<()> {
            self.calls.push("/pem".to_string());
            Ok(())
        }

        fn der(&mut self, len: usize) -> io::Result<()> {
            self.calls.push(format!("der {}", len));
            Ok(())
        }

        fn enter(&mut self, tlv: &Tlv<'_>) -> io::Result<()> {
            self.calls.push(format!("enter {}", tlv.tag()));
            Ok(())
        }

        fn leave(&mut self) -> io::Result<()> {
            self.calls.push("leave".to_string());
            Ok(())
        }

        fn malformed(&mut self, error: &StructuralError<'_>) -> io::Result<()> {
            self.calls.push(format!("malformed {}", error.offset()));
            Ok(())
        }

        fn end_der(&mut self) -> io::Result<()> {
            self.calls.push("/der".to_string());
            Ok(())
        }

        fn trailing(&mut self, data: &[u8]) -> io::Result<()> {
            self.calls.push(format!("trailing {}", data.len()));
            Ok(())
        }
    }

    #[test]
    fn test_split_der() {
        assert!(!Source::split(CERT_DER).is_pem());
    }

    #[test]
    fn test_split_pem_with_trailing() {
        let input = [CERT_PEM, CERT_PEM, &b"xyz"[..]].concat();
        match Source::split(&input) {
            Source::Pem { blocks, trailing } => {
                assert_eq!(2, blocks.len());
                assert_eq!(b"xyz", trailing);
            }
            Source::Der(_) => panic!("expected PEM"),
        }
    }

    #[test]
    fn test_split_broken_pem_is_all_trailing() {
        let input = b"-----BEGIN CERTIFICATE-----\nAAAA\n";
        match Source::split(input) {
            Source::Pem { blocks, trailing } => {
                assert!(blocks.is_empty());
                assert_eq!(input, trailing);
            }
            Source::Der(_) => panic!("expected PEM"),
        }
    }

    #[test]
    fn test_render_der() {
        let mut sink = Recorder::default();
        render(&mut sink, "a.der", &[0x30, 0x03, 0x02, 0x01, 0x01]).unwrap();
        assert_eq!(
            vec![
                "file a.der 5 false",
                "der 5",
                "enter SEQUENCE",
                "enter INTEGER",
                "leave",
                "leave",
                "/der",
            ],
            sink.calls
        );
    }

    #[test]
    fn test_render_pem_and_malformed() {
        let input = [CERT_PEM, &b"-----BEGIN X-----\nMAU=\n-----END X-----\n!"[..]].concat();
        let mut sink = Recorder::default();
        render(&mut sink, "chain.pem", &input).unwrap();

        let calls: Vec<&str> = sink.calls.iter().map(String::as_str).collect();
        assert_eq!(Some(&"pem CERTIFICATE"), calls.get(1));
        assert_eq!(Some(&"der 560"), calls.get(2));
        // the second block holds SEQUENCE claiming 5 bytes of none
        assert!(calls.ends_with(&["pem X", "der 2", "malformed 0", "/der", "/pem", "trailing 1"]));
    }
}
