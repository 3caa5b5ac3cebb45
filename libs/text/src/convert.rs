use crate::text::Text32;
use crate::utf::ConversionOutcome;

/// Formatting options for integer-to-text conversion, filled in from the
/// `z<n>`, `b|o|x`, `p` and `u` flags of the format mini-language.
#[derive(Copy, Clone, Debug)]
pub struct IntegerFormat {
    /// Numeric base, one of 2, 8, 10 or 16.
    pub base: u32,
    /// Zero-pad the digits to this width. Zero means no padding.
    pub zero_pad: usize,
    /// Emit a `0b`/`0o`/`0x` prefix for the non-decimal bases.
    pub prefix: bool,
    /// Upper-case digits (and prefix) for bases above 10.
    pub uppercase: bool,
}

impl Default for IntegerFormat {
    fn default() -> Self {
        Self {
            base: 10,
            zero_pad: 0,
            prefix: false,
            uppercase: false,
        }
    }
}

/// Notation selector for float-to-text conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FloatNotation {
    Fixed,
    Scientific,
    Hex,
}

/// Formatting options for float-to-text conversion, filled in from the
/// `.<n>`, `f|s|x` and `u` flags of the format mini-language.
#[derive(Copy, Clone, Debug)]
pub struct FloatFormat {
    pub precision: Option<usize>,
    pub notation: FloatNotation,
    pub uppercase: bool,
}

impl Default for FloatFormat {
    fn default() -> Self {
        Self {
            precision: None,
            notation: FloatNotation::Fixed,
            uppercase: false,
        }
    }
}

const DIGITS_LOWER: &[u8; 16] = b"0123456789abcdef";
const DIGITS_UPPER: &[u8; 16] = b"0123456789ABCDEF";

fn base_prefix(base: u32, uppercase: bool) -> &'static str {
    match (base, uppercase) {
        (2, false) => "0b",
        (2, true) => "0B",
        (8, false) => "0o",
        (8, true) => "0O",
        (16, false) => "0x",
        (16, true) => "0X",
        _ => "",
    }
}

/// Converts an unsigned integer to text.
pub fn u64_to_text(value: u64, format: &IntegerFormat) -> Text32 {
    assert!(
        matches!(format.base, 2 | 8 | 10 | 16),
        "integer base must be one of 2, 8, 10, 16"
    );
    let digits = if format.uppercase { DIGITS_UPPER } else { DIGITS_LOWER };

    let mut scratch = [0_u8; 64];
    let mut at = scratch.len();
    let mut rest = value;
    loop {
        at -= 1;
        scratch[at] = digits[usize::try_from(rest % u64::from(format.base)).unwrap_or(0)];
        rest /= u64::from(format.base);
        if rest == 0 {
            break;
        }
    }

    let mut out = Text32::new();
    if format.prefix {
        out.push_str(base_prefix(format.base, format.uppercase));
    }
    let digit_count = scratch.len() - at;
    if format.zero_pad > digit_count {
        for _ in 0..format.zero_pad - digit_count {
            out.push_unit('0');
        }
    }
    for &digit in &scratch[at..] {
        out.push_unit(char::from(digit));
    }
    out
}

/// Converts a signed integer to text. The sign precedes any base prefix.
pub fn i64_to_text(value: i64, format: &IntegerFormat) -> Text32 {
    if value < 0 {
        let mut out = Text32::new();
        out.push_unit('-');
        out.append(&u64_to_text(value.unsigned_abs(), format));
        out
    } else {
        u64_to_text(value.unsigned_abs(), format)
    }
}

/// Converts a float to text in the requested notation.
///
/// Fixed and scientific notation render through the standard formatter;
/// hex notation decomposes the bit pattern into `±0x1.<frac>p<exp>` form.
pub fn f64_to_text(value: f64, format: &FloatFormat) -> Text32 {
    let rendered = match format.notation {
        FloatNotation::Fixed => match format.precision {
            Some(precision) => std::format!("{value:.precision$}"),
            None => std::format!("{value}"),
        },
        FloatNotation::Scientific => match format.precision {
            Some(precision) => std::format!("{value:.precision$e}"),
            None => std::format!("{value:e}"),
        },
        FloatNotation::Hex => hex_float(value),
    };
    if format.uppercase {
        rendered.chars().flat_map(char::to_uppercase).collect()
    } else {
        rendered.chars().collect()
    }
}

fn hex_float(value: f64) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0x0p0" } else { "0x0p0" }.into();
    }
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.into();
    }

    let bits = value.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let raw_exponent = (bits >> 52) & 0x7FF;
    let fraction = bits & 0x000F_FFFF_FFFF_FFFF;

    let (lead, exponent, fraction) = if raw_exponent == 0 {
        // Subnormal, no implicit leading one.
        ("0", -1022_i64, fraction)
    } else {
        ("1", i64::try_from(raw_exponent).unwrap_or(0) - 1023, fraction)
    };

    let mut out = String::new();
    out.push_str(sign);
    out.push_str("0x");
    out.push_str(lead);
    if fraction != 0 {
        let mut hex = std::format!("{fraction:013x}");
        while hex.ends_with('0') {
            hex.pop();
        }
        out.push('.');
        out.push_str(&hex);
    }
    out.push('p');
    out.push_str(&exponent.to_string());
    out
}

/// Result record of a text-to-primitive conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Parsed<T> {
    /// Converted value; meaningful for every outcome except `Undetermined`,
    /// where it is the type's zero.
    pub value: T,
    pub outcome: ConversionOutcome,
    /// Characters consumed from the input.
    pub characters_read: usize,
}

fn digit_value(c: char, base: u32) -> Option<u64> {
    c.to_digit(base).map(u64::from)
}

/// Parses an unsigned integer, honouring a `0b`/`0o`/`0x` prefix when
/// `base` is 0 (auto-detect) or matches the prefix.
pub fn text_to_u64(input: &[char], base: u32) -> Parsed<u64> {
    let mut read = 0;
    let mut base = if base == 0 { 10 } else { base };

    if input.len() >= 2 && input[0] == '0' {
        let detected = match input[1] {
            'b' | 'B' => Some(2),
            'o' | 'O' => Some(8),
            'x' | 'X' => Some(16),
            _ => None,
        };
        if let Some(detected) = detected {
            base = detected;
            read = 2;
        }
    }

    let mut value = 0_u64;
    let mut any = false;
    while read < input.len() {
        let Some(digit) = digit_value(input[read], base) else {
            break;
        };
        let Some(next) = value.checked_mul(u64::from(base)).and_then(|v| v.checked_add(digit))
        else {
            return Parsed {
                value,
                outcome: ConversionOutcome::Error,
                characters_read: read,
            };
        };
        value = next;
        any = true;
        read += 1;
    }

    let outcome = if !any {
        ConversionOutcome::Undetermined
    } else if read == input.len() {
        ConversionOutcome::Success
    } else {
        ConversionOutcome::Incomplete
    };
    Parsed {
        value,
        outcome,
        characters_read: read,
    }
}

/// Signed counterpart of [`text_to_u64`].
pub fn text_to_i64(input: &[char], base: u32) -> Parsed<i64> {
    let negative = input.first() == Some(&'-');
    let offset = usize::from(negative || input.first() == Some(&'+'));
    let inner = text_to_u64(&input[offset..], base);

    let value = if negative {
        if inner.value == i64::MIN.unsigned_abs() {
            Ok(i64::MIN)
        } else {
            i64::try_from(inner.value).map(|v| -v)
        }
    } else {
        i64::try_from(inner.value)
    };
    match value {
        Ok(value) => Parsed {
            value,
            outcome: inner.outcome,
            characters_read: inner.characters_read
                + if inner.outcome == ConversionOutcome::Undetermined { 0 } else { offset },
        },
        Err(_) => Parsed {
            value: 0,
            outcome: ConversionOutcome::Error,
            characters_read: offset + inner.characters_read,
        },
    }
}

/// Parses a decimal float of the form `[±]digits[.digits][e[±]digits]`.
pub fn text_to_f64(input: &[char]) -> Parsed<f64> {
    let mut read = 0;
    let negative = input.first() == Some(&'-');
    if negative || input.first() == Some(&'+') {
        read = 1;
    }

    let mut value = 0.0_f64;
    let mut any = false;
    while let Some(digit) = input.get(read).and_then(|c| c.to_digit(10)) {
        value = value * 10.0 + f64::from(digit);
        any = true;
        read += 1;
    }

    if input.get(read) == Some(&'.') {
        read += 1;
        let mut scale = 0.1_f64;
        while let Some(digit) = input.get(read).and_then(|c| c.to_digit(10)) {
            value += f64::from(digit) * scale;
            scale /= 10.0;
            any = true;
            read += 1;
        }
    }

    if !any {
        return Parsed {
            value: 0.0,
            outcome: ConversionOutcome::Undetermined,
            characters_read: 0,
        };
    }

    if matches!(input.get(read), Some('e' | 'E')) {
        let exp = text_to_i64(&input[read + 1..], 10);
        if exp.outcome == ConversionOutcome::Undetermined {
            // A dangling exponent marker is not part of the number.
            return Parsed {
                value: if negative { -value } else { value },
                outcome: ConversionOutcome::Incomplete,
                characters_read: read,
            };
        }
        read += 1 + exp.characters_read;
        value *= 10.0_f64.powi(i32::try_from(exp.value.clamp(-1022, 1023)).unwrap_or(0));
    }

    Parsed {
        value: if negative { -value } else { value },
        outcome: if read == input.len() {
            ConversionOutcome::Success
        } else {
            ConversionOutcome::Incomplete
        },
        characters_read: read,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn integer_rendering_covers_the_flag_surface() {
        let mut format = IntegerFormat::default();
        assert_eq!(u64_to_text(1234, &format), "1234");

        format.base = 16;
        format.prefix = true;
        assert_eq!(u64_to_text(48879, &format), "0xbeef");

        format.uppercase = true;
        assert_eq!(u64_to_text(48879, &format), "0XBEEF");

        format = IntegerFormat { base: 2, zero_pad: 8, ..IntegerFormat::default() };
        assert_eq!(u64_to_text(5, &format), "00000101");

        assert_eq!(i64_to_text(-42, &IntegerFormat::default()), "-42");
    }

    #[test]
    fn float_rendering_notations() {
        let mut format = FloatFormat { precision: Some(2), ..FloatFormat::default() };
        assert_eq!(f64_to_text(3.14159, &format), "3.14");

        format.notation = FloatNotation::Scientific;
        format.precision = None;
        assert_eq!(f64_to_text(1500.0, &format), "1.5e3");

        format.notation = FloatNotation::Hex;
        assert_eq!(f64_to_text(1.0, &format), "0x1p0");
        assert_eq!(f64_to_text(-2.0, &format), "-0x1p1");
    }

    #[test]
    fn parse_detects_prefixes() {
        assert_eq!(text_to_u64(&chars("0x10"), 0).value, 16);
        assert_eq!(text_to_u64(&chars("0b101"), 0).value, 5);
        assert_eq!(text_to_u64(&chars("0o17"), 0).value, 15);
        assert_eq!(text_to_u64(&chars("17"), 8).value, 15);
    }

    #[test]
    fn parse_reports_partial_progress() {
        let parsed = text_to_u64(&chars("123abc"), 10);
        assert_eq!(parsed.value, 123);
        assert_eq!(parsed.outcome, ConversionOutcome::Incomplete);
        assert_eq!(parsed.characters_read, 3);

        assert_eq!(text_to_u64(&chars(""), 10).outcome, ConversionOutcome::Undetermined);
        assert_eq!(
            text_to_u64(&chars("99999999999999999999999"), 10).outcome,
            ConversionOutcome::Error
        );
    }

    #[test]
    fn float_parsing_handles_fraction_and_exponent() {
        let parsed = text_to_f64(&chars("-12.5e2"));
        assert_eq!(parsed.outcome, ConversionOutcome::Success);
        assert!((parsed.value - -1250.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn integer_text_round_trip(value in any::<u64>(), base in prop::sample::select(vec![2_u32, 8, 10, 16])) {
            let format = IntegerFormat { base, ..IntegerFormat::default() };
            let rendered = u64_to_text(value, &format);
            let parsed = text_to_u64(rendered.as_units(), base);
            prop_assert_eq!(parsed.outcome, ConversionOutcome::Success);
            prop_assert_eq!(parsed.value, value);
        }

        #[test]
        fn signed_round_trip(value in any::<i64>()) {
            let rendered = i64_to_text(value, &IntegerFormat::default());
            let parsed = text_to_i64(rendered.as_units(), 10);
            prop_assert_eq!(parsed.outcome, ConversionOutcome::Success);
            prop_assert_eq!(parsed.value, value);
        }
    }
}
