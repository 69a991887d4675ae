//! EMV Tag-Length-Value stream primitives
//!
//! A QRIS payload is a flat sequence of records: a 2-character tag, a
//! 2-digit decimal length and `length` characters of value, terminated by
//! the CRC record (tag 63). Inputs are frequently hand-typed or decoded
//! from photographs, so the stream is walked leniently: a bad length field
//! ends the stream instead of failing the whole payload.

use thiserror::Error;

/// Well-known EMV/QRIS tags.
pub mod tags {
    pub const PAYLOAD_FORMAT: &str = "00";
    pub const POI_METHOD: &str = "01";
    pub const MCC: &str = "52";
    pub const CURRENCY: &str = "53";
    pub const AMOUNT: &str = "54";
    pub const TIP_INDICATOR: &str = "55";
    pub const COUNTRY: &str = "58";
    pub const MERCHANT_NAME: &str = "59";
    pub const MERCHANT_CITY: &str = "60";
    pub const POSTAL_CODE: &str = "61";
    pub const ADDITIONAL_DATA: &str = "62";
    pub const CRC: &str = "63";
}

/// Point-of-initiation value marking a static code.
pub const POI_STATIC: &str = "11";

/// Stream-level errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvError {
    #[error("malformed length field at offset {offset}")]
    MalformedLength { offset: usize },
}

/// One record of a TLV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvRecord<'a> {
    pub tag: &'a str,
    /// Length as declared by the 2-digit field. `value` can be shorter
    /// when the payload was cut off.
    pub declared_len: usize,
    pub value: &'a str,
}

impl TlvRecord<'_> {
    /// True when the payload ended before `declared_len` characters.
    pub fn is_truncated(&self) -> bool {
        self.value.chars().count() < self.declared_len
    }
}

/// Iterator over the records of a payload.
///
/// Yields at most one `Err`: the first malformed length field ends the
/// stream, leaving the caller with whatever was extracted before it.
/// Offsets count characters, matching the 2+2+n record layout.
pub struct TlvStream<'a> {
    rest: &'a str,
    offset: usize,
    done: bool,
}

/// Starts a record walk at offset 0.
pub fn stream(payload: &str) -> TlvStream<'_> {
    TlvStream {
        rest: payload,
        offset: 0,
        done: false,
    }
}

/// Splits `s` after `n` characters, tolerating short input.
fn take(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}

fn parse_len(len_str: &str) -> Option<usize> {
    // Exactly two decimal digits; this also rejects headers cut off at the
    // end of the payload. Lengths of 100+ are unrepresentable in EMV's
    // 2-digit encoding, so nothing here can desynchronize silently.
    if len_str.len() != 2 || !len_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    len_str.parse().ok()
}

impl<'a> Iterator for TlvStream<'a> {
    type Item = Result<TlvRecord<'a>, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.rest.is_empty() {
            return None;
        }

        let (tag, after_tag) = take(self.rest, 2);
        let (len_str, after_len) = take(after_tag, 2);

        let declared_len = match parse_len(len_str) {
            Some(n) => n,
            None => {
                self.done = true;
                return Some(Err(TlvError::MalformedLength { offset: self.offset }));
            }
        };

        let (value, rest) = take(after_len, declared_len);
        let record = TlvRecord {
            tag,
            declared_len,
            value,
        };

        self.offset += 4 + declared_len;
        self.rest = rest;

        Some(Ok(record))
    }
}
