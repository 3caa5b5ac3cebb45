use std::io::{self, Write as _};

use ember_text::{Text8, utf32_to_utf8};
use parking_lot::Mutex;

use crate::record::PrintRecord;

// One process-wide mutex so interleaved threads still produce readable
// output. Held across the whole record, not per section.
static PRINT_MUTEX: Mutex<()> = Mutex::new(());

/// Prints a record to the system console.
///
/// The record is finalised, then each section is converted to UTF-8 and
/// written wrapped in the CSI colour sequence of its theme, with a single
/// reset at the end.
pub fn console_print(message: &PrintRecord) {
    let finalized = message.finalized(4);

    let guard = PRINT_MUTEX.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for section in finalized.sections() {
        let mut bytes = Text8::new();
        utf32_to_utf8(section.text.as_units(), &mut bytes);

        // Console output is best effort; a broken pipe must not take the
        // runtime down.
        let _ = write!(
            out,
            "\x1b[{};{}m",
            section.theme.foreground.ansi_foreground(),
            section.theme.background.ansi_background(),
        );
        let _ = out.write_all(bytes.as_units());
    }
    let _ = out.write_all(b"\x1b[0m");
    let _ = out.flush();
    drop(guard);
}
