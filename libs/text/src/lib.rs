//! Text containers and the conversion front-ends on top of them.
//!
//! [`Text`] is a linear container specialised to character code units, with
//! one alias per encoding ([`Text8`], [`Text16`], [`Text32`]). The UTF
//! module converts between the three encodings and reports partial progress
//! instead of failing wholesale; the convert module renders and parses
//! primitives with the flag set of the format mini-language; [`Path32`]
//! parses paths into canonical segment lists.

mod convert;
mod path;
mod text;
mod utf;

pub use convert::{
    FloatFormat, FloatNotation, IntegerFormat, Parsed, f64_to_text, i64_to_text, text_to_f64,
    text_to_i64, text_to_u64, u64_to_text,
};
pub use path::Path32;
pub use text::{Text, Text8, Text16, Text32, TextUnit};
pub use utf::{
    ConversionOutcome, ConversionResult, utf8_to_utf32, utf16_to_utf32, utf32_to_utf8,
    utf32_to_utf16,
};
