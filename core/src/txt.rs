// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TXT record helpers for certificates published in DNS.
//
// Two encodings show up in practice:
//   - wire form: a sequence of <len:u8><len bytes> character-strings (RFC 1035 3.3.14)
//   - presentation form: quoted zone-file text with \DDD and \X escapes, as
//     printed by `dig +short TXT 2.dnscrypt-cert.<provider>`

use crate::error::{Error, Result};

/// Maximum payload of a single character-string.
pub const MAX_SEGMENT_LEN: usize = 255;

/// Concatenate the payloads of length-prefixed TXT segments.
///
/// Fails if a segment declares more bytes than remain in the input.
pub fn unpack_txt_string(raw: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;

    while let Some((&len, tail)) = rest.split_first() {
        let len = len as usize;
        if len > tail.len() {
            return Err(Error::TxtSegmentTruncated {
                declared: len,
                remaining: tail.len(),
            });
        }
        let (segment, tail) = tail.split_at(len);
        out.extend_from_slice(segment);
        rest = tail;
    }

    Ok(out)
}

/// Split `data` into length-prefixed segments of at most 255 bytes.
pub fn pack_txt_string(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / MAX_SEGMENT_LEN + 1);
    for segment in data.chunks(MAX_SEGMENT_LEN) {
        out.push(segment.len() as u8);
        out.extend_from_slice(segment);
    }
    out
}

/// Decode TXT presentation form into raw bytes.
///
/// Quoted strings are concatenated and anything between them is ignored.
/// Unquoted input is taken whole, minus surrounding whitespace.
pub fn unescape_txt(text: &str) -> Result<Vec<u8>> {
    let bytes = text.trim().as_bytes();
    let quoted = bytes.contains(&b'"');

    let mut out = Vec::with_capacity(bytes.len());
    let mut in_quotes = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'"' => {
                in_quotes = !in_quotes;
                i += 1;
            }
            _ if quoted && !in_quotes => {
                i += 1;
            }
            b'\\' => {
                let escape_at = i;
                i += 1;
                let next = *bytes.get(i).ok_or(Error::TxtEscape(escape_at))?;
                if next.is_ascii_digit() {
                    let digits = bytes
                        .get(i..i + 3)
                        .filter(|d| d.iter().all(u8::is_ascii_digit))
                        .ok_or(Error::TxtEscape(escape_at))?;
                    let value = digits
                        .iter()
                        .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
                    let value = u8::try_from(value).map_err(|_| Error::TxtEscape(escape_at))?;
                    out.push(value);
                    i += 3;
                } else {
                    out.push(next);
                    i += 1;
                }
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// Encode raw bytes as TXT presentation form, one quoted string per 255 bytes.
pub fn escape_txt(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + 2);
    for (n, segment) in data.chunks(MAX_SEGMENT_LEN).enumerate() {
        if n > 0 {
            out.push(' ');
        }
        out.push('"');
        for &b in segment {
            match b {
                b'"' | b'\\' => {
                    out.push('\\');
                    out.push(b as char);
                }
                0x20..=0x7e => out.push(b as char),
                _ => out.push_str(&format!("\\{b:03}")),
            }
        }
        out.push('"');
    }
    if data.is_empty() {
        out.push_str("\"\"");
    }
    out
}
