use crate::text::{Text8, Text16, Text32};

/// Outcome of a conversion pass.
///
/// Conversions never fail wholesale: everything that converted cleanly is
/// written to the output and the result records how far the input got.
/// Callers decide locally whether a partial result is acceptable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The whole input converted.
    Success,
    /// The input ended in the middle of a multi-unit sequence; the
    /// complete prefix was converted.
    Incomplete,
    /// A malformed sequence was hit; the prefix before it was converted.
    Error,
    /// Nothing was converted (empty input).
    Undetermined,
}

/// Progress record returned by every conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConversionResult {
    pub outcome: ConversionOutcome,
    /// Input code units consumed.
    pub code_units_read: usize,
    /// Output code units produced.
    pub code_units_written: usize,
}

/// Decodes the first scalar of a UTF-8 stream.
///
/// Returns `None` for empty input. Otherwise `(Ok(char), read)` for a valid
/// sequence, `(Err(Incomplete), 0)` when the buffer ends mid-sequence, and
/// `(Err(Error), 0)` for malformed bytes.
pub(crate) fn decode_utf8_first(units: &[u8]) -> Option<(Result<char, ConversionOutcome>, usize)> {
    let first = *units.first()?;

    let (len, init) = match first {
        0x00..=0x7F => return Some((Ok(char::from(first)), 1)),
        0xC0..=0xDF => (2_usize, u32::from(first & 0x1F)),
        0xE0..=0xEF => (3, u32::from(first & 0x0F)),
        0xF0..=0xF7 => (4, u32::from(first & 0x07)),
        _ => return Some((Err(ConversionOutcome::Error), 0)),
    };

    if units.len() < len {
        // Check what is there so truncation of garbage still reads as
        // garbage, not as an incomplete sequence.
        for &unit in &units[1..] {
            if unit & 0xC0 != 0x80 {
                return Some((Err(ConversionOutcome::Error), 0));
            }
        }
        return Some((Err(ConversionOutcome::Incomplete), 0));
    }

    let mut value = init;
    for &unit in &units[1..len] {
        if unit & 0xC0 != 0x80 {
            return Some((Err(ConversionOutcome::Error), 0));
        }
        value = value << 6 | u32::from(unit & 0x3F);
    }

    // Reject overlong encodings and values outside the scalar range.
    let min = match len {
        2 => 0x80,
        3 => 0x800,
        _ => 0x10000,
    };
    if value < min {
        return Some((Err(ConversionOutcome::Error), 0));
    }
    match char::from_u32(value) {
        Some(c) => Some((Ok(c), len)),
        None => Some((Err(ConversionOutcome::Error), 0)),
    }
}

/// Decodes the first scalar of a UTF-16 stream; same contract as
/// [`decode_utf8_first`].
pub(crate) fn decode_utf16_first(units: &[u16]) -> Option<(Result<char, ConversionOutcome>, usize)> {
    let first = *units.first()?;

    match first {
        0xD800..=0xDBFF => {
            let Some(&second) = units.get(1) else {
                return Some((Err(ConversionOutcome::Incomplete), 0));
            };
            if !(0xDC00..=0xDFFF).contains(&second) {
                return Some((Err(ConversionOutcome::Error), 0));
            }
            let value =
                0x10000 + ((u32::from(first) - 0xD800) << 10 | (u32::from(second) - 0xDC00));
            match char::from_u32(value) {
                Some(c) => Some((Ok(c), 2)),
                None => Some((Err(ConversionOutcome::Error), 0)),
            }
        }
        0xDC00..=0xDFFF => Some((Err(ConversionOutcome::Error), 0)),
        _ => {
            // A non-surrogate u16 is always a scalar value.
            let c = char::from_u32(u32::from(first)).unwrap_or(char::REPLACEMENT_CHARACTER);
            Some((Ok(c), 1))
        }
    }
}

fn run<U, F>(input: &[U], mut decode: F, out: &mut Text32) -> ConversionResult
where
    F: FnMut(&[U]) -> Option<(Result<char, ConversionOutcome>, usize)>,
{
    let mut read = 0;
    let mut written = 0;
    loop {
        match decode(&input[read..]) {
            None => {
                let outcome = if read == 0 {
                    ConversionOutcome::Undetermined
                } else {
                    ConversionOutcome::Success
                };
                return ConversionResult {
                    outcome,
                    code_units_read: read,
                    code_units_written: written,
                };
            }
            Some((Ok(c), len)) => {
                out.push_unit(c);
                read += len;
                written += 1;
            }
            Some((Err(outcome), _)) => {
                return ConversionResult {
                    outcome,
                    code_units_read: read,
                    code_units_written: written,
                };
            }
        }
    }
}

/// Converts UTF-8 to UTF-32, appending to `out`.
pub fn utf8_to_utf32(input: &[u8], out: &mut Text32) -> ConversionResult {
    run(input, decode_utf8_first, out)
}

/// Converts UTF-16 to UTF-32, appending to `out`.
pub fn utf16_to_utf32(input: &[u16], out: &mut Text32) -> ConversionResult {
    run(input, decode_utf16_first, out)
}

/// Converts UTF-32 to UTF-8, appending to `out`. `char` input is always a
/// valid scalar, so the only non-success outcome is `Undetermined` for
/// empty input.
pub fn utf32_to_utf8(input: &[char], out: &mut Text8) -> ConversionResult {
    if input.is_empty() {
        return ConversionResult {
            outcome: ConversionOutcome::Undetermined,
            code_units_read: 0,
            code_units_written: 0,
        };
    }
    let before = out.len();
    for &c in input {
        out.push(c);
    }
    ConversionResult {
        outcome: ConversionOutcome::Success,
        code_units_read: input.len(),
        code_units_written: out.len() - before,
    }
}

/// Converts UTF-32 to UTF-16, appending to `out`; see [`utf32_to_utf8`].
pub fn utf32_to_utf16(input: &[char], out: &mut Text16) -> ConversionResult {
    if input.is_empty() {
        return ConversionResult {
            outcome: ConversionOutcome::Undetermined,
            code_units_read: 0,
            code_units_written: 0,
        };
    }
    let before = out.len();
    for &c in input {
        out.push(c);
    }
    ConversionResult {
        outcome: ConversionOutcome::Success,
        code_units_read: input.len(),
        code_units_written: out.len() - before,
    }
}
