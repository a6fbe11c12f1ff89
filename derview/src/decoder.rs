//! Conversions between the representations an input passes through.
//!
//! A conversion is allowed when both halves exist: the destination opts in
//! with [`DecodableFrom`] and the source carries the [`Decoder`] impl. The
//! destination is then picked by the annotated result type:
//!
//! ```
//! use derview::decoder::{DecodableFrom, Decoder};
//!
//! struct Hex(String);
//!
//! impl DecodableFrom<Hex> for Vec<u8> {}
//!
//! impl Decoder<Hex, Vec<u8>> for Hex {
//!     type Error = std::num::ParseIntError;
//!
//!     fn decode(&self) -> Result<Vec<u8>, Self::Error> {
//!         (0..self.0.len())
//!             .step_by(2)
//!             .map(|i| u8::from_str_radix(&self.0[i..i + 2], 16))
//!             .collect()
//!     }
//! }
//!
//! let bytes: Vec<u8> = Hex("3000".to_string()).decode().unwrap();
//! assert_eq!(vec![0x30, 0x00], bytes);
//! ```

/// Converts `self`, a `T`, into a `D`.
pub trait Decoder<T, D: DecodableFrom<T>> {
    type Error;

    fn decode(&self) -> Result<D, Self::Error>;
}

/// Opt-in marker: `Self` may be produced from a `T` by a [`Decoder`].
pub trait DecodableFrom<T> {}
