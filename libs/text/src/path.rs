use core::fmt;

use ember_linear::List;

use crate::text::Text32;

/// A path parsed into a canonical list of UTF-32 segments.
///
/// Both `/` and `\` separate segments on parse; formatting always uses `/`.
/// Repeated separators collapse, a trailing separator is dropped, `.` is
/// removed and `..` is resolved against a concrete parent where one exists,
/// otherwise retained at the front only. A leading empty segment marks an
/// absolute POSIX path, a drive-letter segment (`C:`) an absolute Windows
/// path.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Path32 {
    segments: List<Text32>,
}

fn is_drive(segment: &Text32) -> bool {
    let units = segment.as_units();
    units.len() == 2 && units[0].is_ascii_alphabetic() && units[1] == ':'
}

impl Path32 {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: List::new(),
        }
    }

    /// Parses `text` into canonical segments.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut out = Self::new();
        if text.is_empty() {
            return out;
        }
        let mut segment = Text32::new();
        let mut first = true;

        for c in text.chars().chain(core::iter::once('/')) {
            if c != '/' && c != '\\' {
                segment.push_unit(c);
                continue;
            }
            if first && segment.is_empty() {
                // A leading separator denotes the POSIX root.
                out.segments.push_back(Text32::new());
            } else if !segment.is_empty() {
                out.push_resolved(core::mem::take(&mut segment));
            }
            segment.clear();
            first = false;
        }
        out
    }

    fn push_resolved(&mut self, segment: Text32) {
        if segment == "." {
            return;
        }
        if segment == ".." {
            match self.segments.back() {
                Some(parent)
                    if !parent.is_empty() && *parent != ".." && !is_drive(parent) =>
                {
                    self.segments.pop_back();
                }
                Some(parent) if parent.is_empty() || is_drive(parent) => {
                    // `..` at the root stays at the root.
                }
                _ => self.segments.push_back(segment),
            }
            return;
        }
        self.segments.push_back(segment);
    }

    /// Appends one segment, resolving `.` and `..` the same way parsing
    /// does.
    pub fn push(&mut self, segment: &str) {
        self.push_resolved(Text32::from(segment));
    }

    /// Number of segments, the root marker included.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Text32] {
        self.segments.as_slice()
    }

    pub fn is_absolute(&self) -> bool {
        match self.segments.front() {
            Some(first) => first.is_empty() || is_drive(first),
            None => false,
        }
    }

    /// Last segment, or `None` for an empty path.
    pub fn file_name(&self) -> Option<&Text32> {
        self.segments.back().filter(|segment| !segment.is_empty())
    }

    /// Last segment without its extension. A leading dot does not start an
    /// extension, so `.hidden` is its own stem.
    #[must_use]
    pub fn stem(&self) -> Text32 {
        let Some(name) = self.file_name() else {
            return Text32::new();
        };
        let units = name.as_units();
        match units.iter().rposition(|&c| c == '.').filter(|&dot| dot > 0) {
            Some(dot) => Text32::from_units(&units[..dot]),
            None => name.clone(),
        }
    }

    /// Extension of the last segment including the dot, empty when there is
    /// none.
    #[must_use]
    pub fn extension(&self) -> Text32 {
        let Some(name) = self.file_name() else {
            return Text32::new();
        };
        let units = name.as_units();
        match units.iter().rposition(|&c| c == '.').filter(|&dot| dot > 0) {
            Some(dot) => Text32::from_units(&units[dot..]),
            None => Text32::new(),
        }
    }

    /// Longest common segment prefix of `self` and `other`.
    #[must_use]
    pub fn common_parent(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for (a, b) in self.segments.as_slice().iter().zip(other.segments.as_slice()) {
            if a != b {
                break;
            }
            out.segments.push_back(a.clone());
        }
        out
    }

    /// Path leading from `self` to `target`: `..` for every segment of
    /// `self` past the common parent, then the remainder of `target`.
    #[must_use]
    pub fn relative_path(&self, target: &Self) -> Self {
        let common = self
            .segments
            .as_slice()
            .iter()
            .zip(target.segments.as_slice())
            .take_while(|(a, b)| a == b)
            .count();

        let mut out = Self::new();
        for _ in common..self.segments.len() {
            out.segments.push_back(Text32::from(".."));
        }
        for segment in &target.segments.as_slice()[common..] {
            out.segments.push_back(segment.clone());
        }
        out
    }

    /// Canonical textual form, segments joined with `/`. A bare POSIX root
    /// formats as `/`.
    #[must_use]
    pub fn format(&self) -> Text32 {
        let mut out = Text32::new();
        if self.segments.len() == 1 && self.segments[0].is_empty() {
            out.push_unit('/');
            return out;
        }
        for (i, segment) in self.segments.as_slice().iter().enumerate() {
            if i > 0 {
                out.push_unit('/');
            }
            out.append(segment);
        }
        out
    }
}

impl From<&str> for Path32 {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl PartialEq<&str> for Path32 {
    fn eq(&self, other: &&str) -> bool {
        self.format() == *other
    }
}

impl core::ops::Index<usize> for Path32 {
    type Output = Text32;

    fn index(&self, index: usize) -> &Text32 {
        &self.segments[index]
    }
}

impl fmt::Display for Path32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.format(), f)
    }
}

impl fmt::Debug for Path32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path32({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_collapse_and_trailing_is_dropped() {
        let path = Path32::parse("trailing//separators/ignored/");
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], "trailing");
        assert_eq!(path[1], "separators");
        assert_eq!(path[2], "ignored");

        assert_eq!(Path32::parse("a\\b\\c"), "a/b/c");
    }

    #[test]
    fn dot_dot_resolves_against_concrete_parents() {
        assert_eq!(Path32::parse("t1/t2/t3/t4/.."), "t1/t2/t3");
        assert_eq!(Path32::parse("t1/t2/t3/../t4"), "t1/t2/t4");
        assert_eq!(Path32::parse("t1/../t2/t3/t4"), "t2/t3/t4");
        assert_eq!(Path32::parse("../t1/t2/t3/t4").len(), 5);
        assert_eq!(Path32::parse("../t1/t2/../t3/t4"), "../t1/t3/t4");
        assert_eq!(Path32::parse("t1/t2/t3/../../.."), "");
        assert_eq!(Path32::parse("t1/t2/t3/../../../..").len(), 1);
        assert_eq!(Path32::parse("t1/t2/t3/../../../.."), "..");
    }

    #[test]
    fn absolute_paths_keep_their_root() {
        let posix = Path32::parse("/testing1/testing2");
        assert_eq!(posix.len(), 3);
        assert!(posix.is_absolute());

        let windows = Path32::parse("C:/testing1/testing2");
        assert_eq!(windows.len(), 3);
        assert!(windows.is_absolute());

        // `..` cannot climb above the root.
        assert_eq!(Path32::parse("/a/../.."), "/");
        assert!(!Path32::parse("relative/path").is_absolute());
    }

    #[test]
    fn stem_and_extension() {
        assert_eq!(Path32::parse("dir/test_file.txt").stem(), "test_file");
        assert_eq!(Path32::parse("dir/test_file.txt").extension(), ".txt");
        assert_eq!(Path32::parse("dir/test_file").extension(), "");
        assert_eq!(Path32::parse("dir/test_file.").extension(), ".");
        assert_eq!(Path32::parse("dir/.test_file").stem(), ".test_file");
        assert_eq!(Path32::parse("dir/.test_file").extension(), "");
        assert_eq!(Path32::parse("dir/t").stem(), "t");
        assert_eq!(Path32::parse("p/folder/").stem(), "folder");
        assert_eq!(Path32::new().stem(), "");
    }

    #[test]
    fn common_parent_is_the_shared_prefix() {
        let a = Path32::parse("p1/p2/p3");
        assert_eq!(a.common_parent(&Path32::parse("p1/p2/p3")), "p1/p2/p3");
        assert_eq!(a.common_parent(&Path32::parse("p1/p2/p4")), "p1/p2");
        assert_eq!(a.common_parent(&Path32::parse("p1/p5/p4")), "p1");
        assert_eq!(a.common_parent(&Path32::new()), "");
        assert_eq!(Path32::new().common_parent(&a), "");
    }

    #[test]
    fn relative_path_climbs_then_descends() {
        let rel = |a: &str, b: &str| Path32::parse(a).relative_path(&Path32::parse(b));
        assert_eq!(rel("p1/p2", "p1/p2/p10"), "p10");
        assert_eq!(rel("p1/p2/p3", "p1/p2"), "..");
        assert_eq!(rel("p1/p2/p3", "p1/p2/p10"), "../p10");
        assert_eq!(rel("", "p1/p2/p10"), "p1/p2/p10");
        assert_eq!(rel("p1/p2/p10", ""), "../../..");
        assert_eq!(rel("p1/p2/p10", "p1/p2/p10"), "");
    }

    #[test]
    fn parse_then_format_is_canonical() {
        for (raw, canonical) in [
            ("a//b///c", "a/b/c"),
            ("a/b/", "a/b"),
            ("a/./b", "a/b"),
            ("a\\b", "a/b"),
            ("a/b/../c", "a/c"),
        ] {
            assert_eq!(Path32::parse(raw), canonical);
            let reparsed = Path32::parse(&Path32::parse(raw).format().to_string());
            assert_eq!(reparsed, canonical);
        }
    }
}
