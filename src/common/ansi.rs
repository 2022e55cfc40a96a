//! Terminal control sequence filtering
//!
//! Prompts are coloured and may move the cursor. Matching prompt text and
//! comparing captured output must ignore those presentation bytes.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// CSI/OSC introducer, optional private markers, then either a
/// BEL-terminated string or numeric parameters and a final byte.
const CONTROL_SEQUENCE: &str = concat!(
    r"[\x1b\x{9b}][\[\]()#;?]*",
    r"(?:(?:(?:[a-zA-Z\d]*(?:;[a-zA-Z\d]*)*)?\x07)",
    r"|(?:(?:\d{1,4}(?:;\d{0,4})*)?[\dA-PRZcf-ntqry=><~]))",
);

fn control_sequence() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(CONTROL_SEQUENCE).expect("control sequence pattern is valid"))
}

/// Strip terminal escape and control sequences from text.
///
/// Returns the input unchanged (borrowed) when it contains none.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains(['\x1b', '\u{9b}']) {
        return Cow::Borrowed(text);
    }
    control_sequence().replace_all(text, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_colour_codes() {
        assert_eq!(strip_ansi("\x1b[1;32m?\x1b[0m Enter URL: "), "? Enter URL: ");
    }

    #[test]
    fn strips_cursor_movement() {
        assert_eq!(strip_ansi("\x1b[2K\x1b[1A\x1b[JDone"), "Done");
    }

    #[test]
    fn strips_osc_title() {
        assert_eq!(strip_ansi("\x1b]0;conjur\x07ready"), "ready");
    }

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(strip_ansi("no escapes here"), Cow::Borrowed(_)));
    }

    #[test]
    fn single_byte_csi_introducer() {
        assert_eq!(strip_ansi("\u{9b}31mred"), "red");
    }
}
