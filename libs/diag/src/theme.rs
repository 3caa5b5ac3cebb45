/// The console colour palette. Sixteen concrete colours plus the terminal
/// default.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrintColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkCyan,
    DarkRed,
    DarkMagenta,
    DarkYellow,
    Gray,
    DarkGray,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Yellow,
    White,
    Default,
}

impl PrintColor {
    /// ANSI SGR code selecting this colour as the foreground.
    pub fn ansi_foreground(self) -> &'static str {
        match self {
            Self::Black => "30",
            Self::DarkBlue => "34",
            Self::DarkGreen => "32",
            Self::DarkCyan => "36",
            Self::DarkRed => "31",
            Self::DarkMagenta => "35",
            Self::DarkYellow => "33",
            Self::Gray => "37",
            Self::DarkGray => "90",
            Self::Blue => "94",
            Self::Green => "92",
            Self::Cyan => "96",
            Self::Red => "91",
            Self::Magenta => "95",
            Self::Yellow => "93",
            Self::White => "97",
            Self::Default => "37",
        }
    }

    /// ANSI SGR code selecting this colour as the background.
    pub fn ansi_background(self) -> &'static str {
        match self {
            Self::Black => "40",
            Self::DarkBlue => "44",
            Self::DarkGreen => "42",
            Self::DarkCyan => "46",
            Self::DarkRed => "41",
            Self::DarkMagenta => "45",
            Self::DarkYellow => "43",
            Self::Gray => "47",
            Self::DarkGray => "100",
            Self::Blue => "104",
            Self::Green => "102",
            Self::Cyan => "106",
            Self::Red => "101",
            Self::Magenta => "105",
            Self::Yellow => "103",
            Self::White => "107",
            Self::Default => "40",
        }
    }
}

/// Foreground/background pair attached to a print-record section.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    pub foreground: PrintColor,
    pub background: PrintColor,
}

impl Theme {
    pub const DEFAULT: Self = Self::new(PrintColor::Gray, PrintColor::Black);
    pub const VERBOSE: Self = Self::new(PrintColor::DarkGray, PrintColor::Black);
    pub const INFO: Self = Self::new(PrintColor::White, PrintColor::Black);
    pub const PERFORMANCE_WARNING: Self = Self::new(PrintColor::DarkYellow, PrintColor::Black);
    pub const WARNING: Self = Self::new(PrintColor::Yellow, PrintColor::Black);
    pub const ERROR: Self = Self::new(PrintColor::Red, PrintColor::Black);
    pub const CRITICAL_ERROR: Self = Self::new(PrintColor::White, PrintColor::DarkRed);
    pub const DEBUG: Self = Self::new(PrintColor::Cyan, PrintColor::Black);

    pub const fn new(foreground: PrintColor, background: PrintColor) -> Self {
        Self {
            foreground,
            background,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::DEFAULT
    }
}
