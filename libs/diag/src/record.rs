use core::fmt;

use ember_linear::{List, PodBuffer};
use ember_text::Text32;

use crate::source_location::SourceLocation;
use crate::theme::Theme;

/// One run of equally-styled text inside a [`PrintRecord`].
#[derive(Clone, Debug)]
pub struct PrintSection {
    pub text: Text32,
    pub theme: Theme,
    /// Indent level, expanded into leading spaces at finalisation.
    pub indent: u32,
}

impl PrintSection {
    #[must_use]
    pub fn new(text: Text32, theme: Theme) -> Self {
        Self {
            text,
            theme,
            indent: 0,
        }
    }
}

/// A multi-section, multi-colour diagnostic text entry.
///
/// Records are assembled by appending sections or other records; indent is
/// accumulated as an integer per section and only becomes spaces when the
/// record is [finalized](Self::finalized) for display.
#[derive(Clone, Default)]
pub struct PrintRecord {
    sections: List<PrintSection>,
}

impl PrintRecord {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sections: List::new(),
        }
    }

    /// `true` when the record has no sections.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[PrintSection] {
        self.sections.as_slice()
    }

    /// Appends a section, dropping it when its text is empty.
    pub fn push_section(&mut self, section: PrintSection) -> &mut Self {
        if !section.text.is_empty() {
            self.sections.push_back(section);
        }
        self
    }

    /// Appends every section of `other`.
    pub fn append(&mut self, other: &Self) -> &mut Self {
        self.sections.append(other.sections());
        self
    }

    /// Raises the indent level of every section by `levels`.
    pub fn add_indent(&mut self, levels: u32) -> &mut Self {
        for section in self.sections.as_mut_slice() {
            section.indent += levels;
        }
        self
    }

    /// Number of display lines: newlines across all sections plus one.
    #[must_use]
    pub fn line_count(&self) -> usize {
        let newlines: usize = self
            .sections
            .as_slice()
            .iter()
            .map(|section| section.text.as_units().iter().filter(|&&c| c == '\n').count())
            .sum();
        newlines + 1
    }

    /// Returns a copy with indent levels expanded into leading spaces.
    ///
    /// Spaces are inserted at the first character of the record and after
    /// every newline that is not the final character of its section; a
    /// section-final newline defers the insertion to the first character of
    /// the next section, styled with that section's theme. The result
    /// carries indent level zero everywhere, so finalisation is idempotent,
    /// and the line count is unchanged. `self` is untouched.
    #[must_use]
    pub fn finalized(&self, indent_spaces: u32) -> Self {
        let mut out = Self::new();
        let mut indent_next = true;
        let mut buffer = PodBuffer::<char>::with_capacity(512);

        for section in self.sections.as_slice() {
            let spaces = usize::try_from(section.indent * indent_spaces).unwrap_or(0);
            let units = section.text.as_units();
            buffer.clear();

            for (i, &c) in units.iter().enumerate() {
                if indent_next {
                    buffer.fill(spaces, ' ');
                    indent_next = false;
                }
                buffer.push(c);
                if c == '\n' {
                    if i == units.len() - 1 {
                        indent_next = true;
                    } else {
                        buffer.fill(spaces, ' ');
                    }
                }
            }

            out.push_section(PrintSection::new(
                Text32::from_units(buffer.as_slice()),
                section.theme,
            ));
        }
        out
    }

    /// Concatenated section texts with no styling.
    #[must_use]
    pub fn to_plain_text(&self) -> Text32 {
        let mut out = Text32::new();
        for section in self.sections.as_slice() {
            out.append(&section.text);
        }
        out
    }
}

impl core::ops::AddAssign<&PrintRecord> for PrintRecord {
    fn add_assign(&mut self, other: &PrintRecord) {
        self.append(other);
    }
}

impl core::ops::AddAssign<PrintSection> for PrintRecord {
    fn add_assign(&mut self, section: PrintSection) {
        self.push_section(section);
    }
}

impl core::ops::Add<&PrintRecord> for PrintRecord {
    type Output = PrintRecord;

    fn add(mut self, other: &PrintRecord) -> PrintRecord {
        self.append(other);
        self
    }
}

impl fmt::Display for PrintRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_plain_text(), f)
    }
}

impl fmt::Debug for PrintRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrintRecord({:?})", self.to_plain_text())
    }
}

/// Builds a single-section record with the default theme.
#[must_use]
pub fn record(text: impl Into<Text32>) -> PrintRecord {
    record_themed(text, Theme::DEFAULT)
}

/// Builds a single-section record with an explicit theme.
#[must_use]
pub fn record_themed(text: impl Into<Text32>, theme: Theme) -> PrintRecord {
    let mut out = PrintRecord::new();
    out.push_section(PrintSection::new(text.into(), theme));
    out
}

/// Builds a `name: value` argument record.
#[must_use]
pub fn record_argument(name: &str, value: impl fmt::Display) -> PrintRecord {
    let mut text = Text32::from(name);
    text += ": ";
    text += value.to_string().as_str();
    record(text)
}

/// Builds a record describing a source location.
#[must_use]
pub fn record_source_location(location: &SourceLocation) -> PrintRecord {
    record_argument("Source location", location)
}

/// Builds a record from `name, value` pairs, one `name: value` line each.
/// Passing an odd number of arguments fails to compile.
#[macro_export]
macro_rules! record_argument_list {
    ($($name:expr, $value:expr),+ $(,)?) => {{
        let mut out = $crate::PrintRecord::new();
        let mut separator = "";
        $(
            out.append(&$crate::record(separator));
            separator = "\n";
            out.append(&$crate::record_argument($name, $value));
        )+
        let _ = separator;
        out
    }};
}

/// Builds a titled record followed by an indented argument list, the shape
/// used by contract-violation reports.
#[macro_export]
macro_rules! record_assert_text {
    ($title:expr) => {
        $crate::record($title)
    };
    ($title:expr, $($name:expr, $value:expr),+ $(,)?) => {{
        let mut out = $crate::record($title);
        out.append(&$crate::record("\n"));
        let mut arguments = $crate::record_argument_list!($($name, $value),+);
        arguments.add_indent(1);
        out.append(&arguments);
        out
    }};
}
