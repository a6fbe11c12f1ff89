//! # derview
//!
//! Core traits for decoding in the derview ASN.1 inspection toolkit.
//!
//! This crate defines the `Decoder` trait that establishes the type-safe
//! conversion pattern used by the other workspace crates.
//!
//! ## Overview
//!
//! The conversion pattern flows like this:
//! ```text
//! &str (PEM text) → pem::PemBlock → Vec<u8> (payload)
//! &[u8] (DER, e.g. a block payload) → der::Forest
//! ```
//!
//! Each step uses the `Decoder` trait to convert from one type to the next.
//! The lazy path (`der::walk`) does not go through this trait since it
//! borrows from its input rather than producing a new value.
//!
//! ## Example
//!
//! ```ignore
//! use derview::decoder::Decoder;
//! use der::Forest;
//!
//! let bytes: &[u8] = &[0x30, 0x00];
//! let forest: Forest = bytes.decode().unwrap();
//! ```

#![forbid(unsafe_code)]

pub mod decoder;
