//! Helpers for logging raw serial traffic without breaking log lines.

use std::fmt::Write;

/// Default preview cap for a logged serial line, in bytes.
pub const LINE_PREVIEW_BYTES: usize = 160;

/// Escape a line for single-line logging and cap it at `max_bytes`.
///
/// Backslash, `\n`, `\r` and `\t` get their usual escapes; other control
/// characters become `\xNN`. Truncation backs off to a char boundary and
/// appends `...`.
pub fn escape_line(input: &str, max_bytes: usize) -> String {
    let cut = if input.len() > max_bytes {
        let mut cut = max_bytes.saturating_sub(3);
        while cut > 0 && !input.is_char_boundary(cut) {
            cut -= 1;
        }
        Some(cut)
    } else {
        None
    };
    let body = match cut {
        Some(c) => &input[..c],
        None => input,
    };
    let mut out = String::with_capacity(body.len() + 8);
    for ch in body.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    if cut.is_some() {
        out.push_str("...");
    }
    out
}

/// Shorthand for [`escape_line`] with [`LINE_PREVIEW_BYTES`].
pub fn preview(input: &str) -> String {
    escape_line(input, LINE_PREVIEW_BYTES)
}

/// Hex rendering of the first `max` bytes of a raw chunk.
pub fn hex_snippet(data: &[u8], max: usize) -> String {
    data.iter()
        .take(max)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_line("a\nb\r\tc\u{7}", 64), "a\\nb\\r\\tc\\x07");
    }

    #[test]
    fn truncates_on_char_boundary() {
        // "°" is two bytes; a naive cut at 3 would split it.
        let out = escape_line("ab°cdefgh", 6);
        assert_eq!(out, "ab...");
    }

    #[test]
    fn short_lines_untouched() {
        assert_eq!(preview("22.5,40.1"), "22.5,40.1");
    }

    #[test]
    fn hex_snippet_caps_length() {
        assert_eq!(hex_snippet(&[0x64, 0x2c, 0x5b, 0x31], 2), "642c");
    }
}
