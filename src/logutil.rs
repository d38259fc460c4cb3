//! Logging utilities for sanitizing player input so logs stay single-line, plus the telnet
//! clean-up applied to every received line.

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Truncates very long strings (over `MAX_PREVIEW`) with an ellipsis to cap log noise.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 300;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

const IAC: u8 = 255;
const SB: u8 = 250;
const SE: u8 = 240;

/// Strip telnet negotiation (IAC sequences, subnegotiation blocks) and control bytes from a
/// raw input line, then decode it lossily as UTF-8 and trim it.
pub fn clean_input(raw: &[u8], max_len: usize) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            IAC => match raw.get(i + 1) {
                Some(&IAC) => {
                    i += 2;
                }
                Some(&SB) => {
                    // Skip to IAC SE.
                    i += 2;
                    while i + 1 < raw.len() && !(raw[i] == IAC && raw[i + 1] == SE) {
                        i += 1;
                    }
                    i += 2;
                }
                Some(&cmd) if (251..=254).contains(&cmd) => i += 3,
                Some(_) => i += 2,
                None => i += 1,
            },
            b if b < 0x20 || b == 0x7f => i += 1,
            b => {
                bytes.push(b);
                i += 1;
            }
        }
    }
    let text = String::from_utf8_lossy(&bytes);
    text.trim().chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_newlines_and_truncates() {
        let s = "Line1\nLine2\r\tEnd";
        let esc = escape_log(s);
        assert_eq!(esc, "Line1\\nLine2\\r\\tEnd");
    }

    #[test]
    fn strips_telnet_negotiation() {
        let raw = [IAC, 251, 1, b'l', b'o', b'o', b'k', b'\r'];
        assert_eq!(clean_input(&raw, 80), "look");
        let sub = [IAC, SB, 31, 0, 80, IAC, SE, b'n'];
        assert_eq!(clean_input(&sub, 80), "n");
    }

    #[test]
    fn clips_long_lines() {
        assert_eq!(clean_input(b"  kill rat  ", 4), "kill");
    }
}
