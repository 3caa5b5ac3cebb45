use core::cmp::Ordering;
use core::fmt::{self, Write as _};
use core::hash::{Hash, Hasher};
use core::ops::AddAssign;

use ember_linear::List;

/// A character code unit. Implemented for `u8` (UTF-8), `u16` (UTF-16) and
/// `char` (UTF-32).
pub trait TextUnit: Copy + Eq + Ord + fmt::Debug + 'static {
    /// Appends the code units encoding `c` to `out`.
    fn encode_char(c: char, out: &mut List<Self>);

    /// Decodes the first scalar value in `units`, returning it together
    /// with the number of units consumed. Malformed input yields
    /// `char::REPLACEMENT_CHARACTER` and consumes one unit. `None` when
    /// `units` is empty.
    fn decode_lossy(units: &[Self]) -> Option<(char, usize)>;
}

impl TextUnit for u8 {
    fn encode_char(c: char, out: &mut List<Self>) {
        let mut buf = [0_u8; 4];
        out.append(c.encode_utf8(&mut buf).as_bytes());
    }

    fn decode_lossy(units: &[Self]) -> Option<(char, usize)> {
        let (result, read) = crate::utf::decode_utf8_first(units)?;
        Some((result.unwrap_or(char::REPLACEMENT_CHARACTER), read.max(1)))
    }
}

impl TextUnit for u16 {
    fn encode_char(c: char, out: &mut List<Self>) {
        let mut buf = [0_u16; 2];
        out.append(c.encode_utf16(&mut buf));
    }

    fn decode_lossy(units: &[Self]) -> Option<(char, usize)> {
        let (result, read) = crate::utf::decode_utf16_first(units)?;
        Some((result.unwrap_or(char::REPLACEMENT_CHARACTER), read.max(1)))
    }
}

impl TextUnit for char {
    fn encode_char(c: char, out: &mut List<Self>) {
        out.push_back(c);
    }

    fn decode_lossy(units: &[Self]) -> Option<(char, usize)> {
        units.first().map(|c| (*c, 1))
    }
}

/// A linear container of character code units.
///
/// The unit type decides the encoding; see the [`Text8`], [`Text16`] and
/// [`Text32`] aliases. Length is measured in code units, not characters.
pub struct Text<U: TextUnit> {
    units: List<U>,
}

/// UTF-8 text.
pub type Text8 = Text<u8>;
/// UTF-16 text.
pub type Text16 = Text<u16>;
/// UTF-32 text. One unit per scalar value, the working encoding of the
/// diagnostic pipeline.
pub type Text32 = Text<char>;

impl<U: TextUnit> Text<U> {
    #[must_use]
    pub const fn new() -> Self {
        Self { units: List::new() }
    }

    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            units: List::with_capacity(cap),
        }
    }

    #[must_use]
    pub fn from_units(units: &[U]) -> Self {
        Self { units: units.into() }
    }

    /// Number of code units.
    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    #[inline]
    pub fn as_units(&self) -> &[U] {
        self.units.as_slice()
    }

    pub fn clear(&mut self) {
        self.units.clear();
    }

    /// Appends a single code unit as-is.
    pub fn push_unit(&mut self, unit: U) {
        self.units.push_back(unit);
    }

    /// Appends one character, encoding it into however many units it takes.
    pub fn push(&mut self, c: char) {
        U::encode_char(c, &mut self.units);
    }

    pub fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            self.push(c);
        }
    }

    pub fn append(&mut self, other: &Self) {
        self.units.append(other.as_units());
    }

    /// Iterates the decoded characters, substituting the replacement
    /// character for malformed sequences.
    pub fn chars(&self) -> Chars<'_, U> {
        Chars {
            units: self.units.as_slice(),
        }
    }
}

/// Decoding iterator returned by [`Text::chars`].
pub struct Chars<'a, U: TextUnit> {
    units: &'a [U],
}

impl<U: TextUnit> Iterator for Chars<'_, U> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        let (c, read) = U::decode_lossy(self.units)?;
        self.units = &self.units[read..];
        Some(c)
    }
}

impl<U: TextUnit> Default for Text<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: TextUnit> Clone for Text<U> {
    fn clone(&self) -> Self {
        Self {
            units: self.units.clone(),
        }
    }
}

impl<U: TextUnit> From<&str> for Text<U> {
    fn from(s: &str) -> Self {
        let mut out = Self::new();
        out.push_str(s);
        out
    }
}

impl<U: TextUnit> FromIterator<char> for Text<U> {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        let mut out = Self::new();
        for c in iter {
            out.push(c);
        }
        out
    }
}

impl<U: TextUnit> AddAssign<&Self> for Text<U> {
    fn add_assign(&mut self, other: &Self) {
        self.append(other);
    }
}

impl<U: TextUnit> AddAssign<&str> for Text<U> {
    fn add_assign(&mut self, other: &str) {
        self.push_str(other);
    }
}

impl<U: TextUnit> AsRef<[U]> for Text<U> {
    fn as_ref(&self) -> &[U] {
        self.as_units()
    }
}

impl<U: TextUnit> PartialEq for Text<U> {
    fn eq(&self, other: &Self) -> bool {
        self.units == other.units
    }
}

impl<U: TextUnit> Eq for Text<U> {}

impl<U: TextUnit> PartialEq<&str> for Text<U> {
    fn eq(&self, other: &&str) -> bool {
        self.chars().eq(other.chars())
    }
}

impl<U: TextUnit> PartialOrd for Text<U> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<U: TextUnit> Ord for Text<U> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.units.cmp(&other.units)
    }
}

impl<U: TextUnit + Hash> Hash for Text<U> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.units.hash(state);
    }
}

impl<U: TextUnit> fmt::Display for Text<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.chars() {
            f.write_char(c)?;
        }
        Ok(())
    }
}

impl<U: TextUnit> fmt::Debug for Text<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
