use ember_text::{
    FloatFormat, FloatNotation, IntegerFormat, Text32, f64_to_text, i64_to_text, u64_to_text,
};

use crate::exception::throw_record;
use crate::record::{PrintRecord, record, record_argument};

/// A value passed into [`format_text`], type-erased at the call site by
/// [`ToFormatArg`].
#[derive(Copy, Clone, Debug)]
pub enum FormatArg<'a> {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Char(char),
    Str(&'a str),
    Text(&'a Text32),
}

/// Conversion into a [`FormatArg`], implemented for the primitives and text
/// types the mini-language accepts. The `text_format!` macro calls this for
/// every argument.
pub trait ToFormatArg {
    fn to_format_arg(&self) -> FormatArg<'_>;
}

macro_rules! impl_to_format_arg {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(impl ToFormatArg for $ty {
            fn to_format_arg(&self) -> FormatArg<'_> {
                FormatArg::$variant(<$conv>::from(*self))
            }
        })*
    };
}

impl_to_format_arg! {
    bool => Bool as bool,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
    char => Char as char,
}

impl ToFormatArg for usize {
    fn to_format_arg(&self) -> FormatArg<'_> {
        FormatArg::UInt(u64::try_from(*self).unwrap_or(u64::MAX))
    }
}

impl ToFormatArg for isize {
    fn to_format_arg(&self) -> FormatArg<'_> {
        FormatArg::Int(i64::try_from(*self).unwrap_or(i64::MAX))
    }
}

impl ToFormatArg for &str {
    fn to_format_arg(&self) -> FormatArg<'_> {
        FormatArg::Str(*self)
    }
}

impl ToFormatArg for str {
    fn to_format_arg(&self) -> FormatArg<'_> {
        FormatArg::Str(self)
    }
}

impl ToFormatArg for Text32 {
    fn to_format_arg(&self) -> FormatArg<'_> {
        FormatArg::Text(self)
    }
}

/// Faults detected while expanding a template. Internal: every fault is
/// raised as an [`Exception`](crate::Exception) at the `format_text`
/// boundary.
enum FormatFault {
    UnknownFlag(char),
    MissingArgument { index: usize },
    UnterminatedPlaceholder,
    InvalidFlag { flag: char },
}

impl FormatFault {
    fn to_record(&self) -> PrintRecord {
        match self {
            Self::UnknownFlag(flag) => record_argument("Unknown format flag", flag),
            Self::MissingArgument { index } => {
                record_argument("Format template refers to missing argument", index)
            }
            Self::UnterminatedPlaceholder => record("Unterminated `{` in format template"),
            Self::InvalidFlag { flag } => {
                record_argument("Format flag does not apply to this argument type", flag)
            }
        }
    }
}

/// Parsed contents of one `{…}` placeholder.
struct Placeholder {
    position: Option<usize>,
    integer: IntegerFormat,
    float: FloatFormat,
    saw_number_flag: bool,
}

fn parse_placeholder(body: &[char]) -> Result<Placeholder, FormatFault> {
    let mut out = Placeholder {
        position: None,
        integer: IntegerFormat::default(),
        float: FloatFormat::default(),
        saw_number_flag: false,
    };

    let mut at = 0;

    // `{:n}` selects an explicit argument position.
    if body.first() == Some(&':') {
        let mut index = 0_usize;
        at += 1;
        let digits_start = at;
        while let Some(digit) = body.get(at).and_then(|c| c.to_digit(10)) {
            index = index * 10 + usize::try_from(digit).unwrap_or(0);
            at += 1;
        }
        if at == digits_start {
            return Err(FormatFault::UnknownFlag(':'));
        }
        out.position = Some(index);
    }

    while at < body.len() {
        let flag = body[at];
        at += 1;
        match flag {
            'z' => {
                let mut width = 0_usize;
                while let Some(digit) = body.get(at).and_then(|c| c.to_digit(10)) {
                    width = width * 10 + usize::try_from(digit).unwrap_or(0);
                    at += 1;
                }
                out.integer.zero_pad = width;
                out.saw_number_flag = true;
            }
            'b' => {
                out.integer.base = 2;
                out.saw_number_flag = true;
            }
            'o' => {
                out.integer.base = 8;
                out.saw_number_flag = true;
            }
            'x' => {
                out.integer.base = 16;
                out.float.notation = FloatNotation::Hex;
                out.saw_number_flag = true;
            }
            'p' => {
                out.integer.prefix = true;
                out.saw_number_flag = true;
            }
            'u' => {
                out.integer.uppercase = true;
                out.float.uppercase = true;
                out.saw_number_flag = true;
            }
            '.' => {
                let mut precision = 0_usize;
                let digits_start = at;
                while let Some(digit) = body.get(at).and_then(|c| c.to_digit(10)) {
                    precision = precision * 10 + usize::try_from(digit).unwrap_or(0);
                    at += 1;
                }
                if at == digits_start {
                    return Err(FormatFault::UnknownFlag('.'));
                }
                out.float.precision = Some(precision);
                out.saw_number_flag = true;
            }
            'f' => {
                out.float.notation = FloatNotation::Fixed;
                out.saw_number_flag = true;
            }
            's' => {
                out.float.notation = FloatNotation::Scientific;
                out.saw_number_flag = true;
            }
            other => return Err(FormatFault::UnknownFlag(other)),
        }
    }

    Ok(out)
}

fn expand_argument(
    out: &mut Text32,
    arg: &FormatArg<'_>,
    placeholder: &Placeholder,
) -> Result<(), FormatFault> {
    match arg {
        FormatArg::Bool(value) => {
            if placeholder.integer.base == 2 {
                out.push_unit(if *value { '1' } else { '0' });
            } else if placeholder.saw_number_flag {
                return Err(FormatFault::InvalidFlag { flag: 'b' });
            } else {
                out.push_str(if *value { "true" } else { "false" });
            }
        }
        FormatArg::UInt(value) => out.append(&u64_to_text(*value, &placeholder.integer)),
        FormatArg::Int(value) => out.append(&i64_to_text(*value, &placeholder.integer)),
        FormatArg::Float(value) => out.append(&f64_to_text(*value, &placeholder.float)),
        FormatArg::Char(value) => {
            if placeholder.saw_number_flag {
                return Err(FormatFault::InvalidFlag { flag: 'c' });
            }
            out.push_unit(*value);
        }
        FormatArg::Str(value) => {
            if placeholder.saw_number_flag {
                return Err(FormatFault::InvalidFlag { flag: 's' });
            }
            out.push_str(value);
        }
        FormatArg::Text(value) => {
            if placeholder.saw_number_flag {
                return Err(FormatFault::InvalidFlag { flag: 's' });
            }
            out.append(value);
        }
    }
    Ok(())
}

fn try_format(template: &str, args: &[FormatArg<'_>]) -> Result<Text32, FormatFault> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = Text32::with_capacity(chars.len());
    let mut next_index = 0_usize;

    let mut at = 0;
    while at < chars.len() {
        let c = chars[at];
        if c == '{' {
            if chars.get(at + 1) == Some(&'{') {
                out.push_unit('{');
                at += 2;
                continue;
            }
            let Some(close) = chars[at..].iter().position(|&c| c == '}') else {
                return Err(FormatFault::UnterminatedPlaceholder);
            };
            let placeholder = parse_placeholder(&chars[at + 1..at + close])?;

            let index = placeholder.position.unwrap_or(next_index);
            let arg = args.get(index).ok_or(FormatFault::MissingArgument { index })?;
            expand_argument(&mut out, arg, &placeholder)?;

            next_index = index + 1;
            at += close + 1;
        } else if c == '}' && chars.get(at + 1) == Some(&'}') {
            out.push_unit('}');
            at += 2;
        } else {
            out.push_unit(c);
            at += 1;
        }
    }

    Ok(out)
}

/// Expands `template`, replacing each `{…}` placeholder with the matching
/// argument rendered per its flags.
///
/// Placeholders consume arguments left to right; `{:n}` jumps to position
/// `n` and subsequent unindexed placeholders continue from `n + 1`. `{{`
/// and `}}` escape the braces. Surplus arguments are ignored; an unknown
/// flag, a missing argument or an unterminated placeholder raises an
/// [`Exception`](crate::Exception) through [`throw_record`], carrying the
/// caller's source location.
#[track_caller]
pub fn format_text(template: &str, args: &[FormatArg<'_>]) -> Text32 {
    match try_format(template, args) {
        Ok(text) => text,
        Err(fault) => throw_record(fault.to_record()),
    }
}

/// Expands a format template with inline arguments:
/// `text_format!("{} and {}", left, right)`.
#[macro_export]
macro_rules! text_format {
    ($template:expr $(, $arg:expr)* $(,)?) => {
        $crate::format_text(
            $template,
            &[$($crate::ToFormatArg::to_format_arg(&$arg)),*],
        )
    };
}
