// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ISO/IEC 7816-4 padding for DNS packets sealed inside DNSCrypt envelopes:
//   <packet> 0x80 0x00 ... 0x00
// padded to a multiple of 64 bytes, and never below MIN_UDP_QUESTION_SIZE.

use crate::error::{Error, Result};

/// Smallest possible DNS packet: 12-byte header + 5-byte question (root, type, class).
pub const MIN_DNS_PACKET_SIZE: usize = 12 + 5;
/// Largest DNS packet an envelope will carry.
pub const MAX_DNS_PACKET_SIZE: usize = 4096;
/// Padded queries are never shorter than this.
pub const MIN_UDP_QUESTION_SIZE: usize = 256;

const PAD_BLOCK: usize = 64;
const PAD_MARKER: u8 = 0x80;

/// Length `pad` produces for a packet of `len` bytes.
pub fn padded_len(len: usize) -> usize {
    let blocks = (len + 1).div_ceil(PAD_BLOCK);
    (blocks * PAD_BLOCK).max(MIN_UDP_QUESTION_SIZE)
}

pub fn pad(packet: &[u8]) -> Vec<u8> {
    let mut padded = Vec::with_capacity(padded_len(packet.len()));
    padded.extend_from_slice(packet);
    padded.push(PAD_MARKER);
    padded.resize(padded_len(packet.len()), 0);
    padded
}

/// Strip padding, returning the inner packet.
///
/// Fails if no marker byte is found, if a non-zero byte sits between the
/// marker and the end, or if the inner packet is shorter than a DNS header
/// plus question.
pub fn unpad(padded: &[u8]) -> Result<&[u8]> {
    let marker = padded
        .iter()
        .rposition(|&b| b != 0)
        .ok_or(Error::InvalidPadding)?;
    if padded[marker] != PAD_MARKER || marker < MIN_DNS_PACKET_SIZE {
        return Err(Error::InvalidPadding);
    }
    Ok(&padded[..marker])
}
