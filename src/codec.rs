//! Escape-aware byte codec
//!
//! Converts between a human-typed display string and raw bytes. The display
//! grammar is literal printable ASCII plus the escape forms `\n`, `\r`, `\t`,
//! `\\` and `\xHH` (two hex digits). The same grammar is used by manual entry
//! in the terminal and by sequence files.
//!
//! [`parse`] and [`render`] form a round-trip pair: for any byte sequence
//! `b`, `parse(&render(b))` yields `b` again. Rendering is canonical, so
//! re-rendering parsed text normalizes it (e.g. `\x41` becomes `A`,
//! `\x0A` becomes `\n`).

use crate::error::{PortScopeError, Result};

/// First byte of the printable ASCII range (space)
const PRINTABLE_LOW: u8 = 0x20;
/// Last byte of the printable ASCII range (tilde)
const PRINTABLE_HIGH: u8 = 0x7e;

/// Parse a display string into raw bytes
///
/// Accepts literal printable ASCII (0x20–0x7E) and the escapes `\n`, `\r`,
/// `\t`, `\\` and `\xHH` (hex digits in either case).
///
/// # Errors
///
/// Returns [`PortScopeError::InvalidEscape`] for a malformed escape (unknown
/// escape character, or `\x` not followed by two hex digits) and
/// [`PortScopeError::UnencodableCharacter`] for a literal character outside
/// printable ASCII. On error no partial output is produced.
pub fn parse(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.char_indices();

    while let Some((pos, ch)) = chars.next() {
        if ch != '\\' {
            if ch.is_ascii() && (PRINTABLE_LOW..=PRINTABLE_HIGH).contains(&(ch as u8)) {
                out.push(ch as u8);
                continue;
            }
            return Err(PortScopeError::UnencodableCharacter {
                character: ch,
                position: pos,
            });
        }

        match chars.next() {
            Some((_, 'n')) => out.push(b'\n'),
            Some((_, 'r')) => out.push(b'\r'),
            Some((_, 't')) => out.push(b'\t'),
            Some((_, '\\')) => out.push(b'\\'),
            Some((_, 'x')) => {
                let hi = chars.next().map(|(_, c)| c);
                let lo = chars.next().map(|(_, c)| c);
                match (hi.and_then(|c| c.to_digit(16)), lo.and_then(|c| c.to_digit(16))) {
                    (Some(hi), Some(lo)) => out.push((hi * 16 + lo) as u8),
                    _ => {
                        return Err(PortScopeError::InvalidEscape {
                            position: pos,
                            message: "expected two hex digits after \\x".to_string(),
                        })
                    }
                }
            }
            Some((_, other)) => {
                return Err(PortScopeError::InvalidEscape {
                    position: pos,
                    message: format!("unknown escape \\{}", other),
                })
            }
            None => {
                return Err(PortScopeError::InvalidEscape {
                    position: pos,
                    message: "dangling backslash at end of input".to_string(),
                })
            }
        }
    }

    Ok(out)
}

/// Render raw bytes as canonical display text
///
/// Printable ASCII passes through unchanged, except the backslash which is
/// escaped as `\\` so that [`parse`] can invert the mapping. Tab, newline
/// and carriage return render as `\t`, `\n` and `\r`; everything else as
/// lowercase `\xHH`.
pub fn render(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\\' => out.push_str("\\\\"),
            PRINTABLE_LOW..=PRINTABLE_HIGH => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out
}

/// Render raw bytes as a space-separated hex dump
///
/// The alternate display format offered alongside the escaped ASCII view.
pub fn render_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
