//! QRIS payload operations
//!
//! Field extraction, the canonical-static rewrite, checksum validation and
//! a structured view of the full record set. The extraction and rewrite
//! paths are lenient (adversarial input degrades to "not found" or a
//! best-effort rebuild), while [`QrisData::parse`] is strict and meant for
//! inspecting payloads that are supposed to be well-formed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crc;
use crate::tlv::{self, tags, TlvError, POI_STATIC};

/// Shortest plausible EMV payload: version record + method record + some
/// merchant data. Anything below this is rejected without a parse attempt.
pub const MIN_PAYLOAD_LEN: usize = 10;

/// Checksum record header: tag 63 with its fixed length of 4.
const CRC_HEADER: &str = "6304";

/// Payload-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload shorter than 10 characters")]
    ShortInput,
    #[error("tag {0} not present in payload")]
    TagNotFound(String),
    #[error("missing checksum record (tag 63)")]
    MissingChecksum,
    #[error("checksum mismatch: computed {computed}, found {found}")]
    ChecksumMismatch { computed: String, found: String },
    #[error("malformed record at offset {0}")]
    Malformed(usize),
}

fn guard_min_len(payload: &str) -> Result<(), PayloadError> {
    if payload.chars().count() < MIN_PAYLOAD_LEN {
        return Err(PayloadError::ShortInput);
    }
    Ok(())
}

/// Scans the payload for `tag` and returns its value.
///
/// The scan short-circuits on the first match and never panics on bad
/// input: a malformed length field ends the scan, so the requested tag is
/// simply reported as absent.
pub fn find_tag<'a>(payload: &'a str, tag: &str) -> Result<&'a str, PayloadError> {
    guard_min_len(payload)?;

    for record in tlv::stream(payload) {
        match record {
            Ok(r) if r.tag == tag => return Ok(r.value),
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Err(PayloadError::TagNotFound(tag.to_string()))
}

/// Merchant name as embedded in tag 59.
pub fn merchant_name(payload: &str) -> Result<&str, PayloadError> {
    find_tag(payload, tags::MERCHANT_NAME)
}

/// Rewrites a payload into its canonical static form.
///
/// Per record: tag 01 is forced to the static indicator (`010211`), the
/// amount (54), tip indicator (55) and old checksum (63) are dropped, and
/// everything else is re-emitted verbatim. A fresh CRC record is appended
/// at the end. A malformed length field mid-stream ends the walk; the
/// prefix accumulated up to that point still gets a valid checksum. The
/// rewrite reacts to each tag independently, so record order does not
/// matter.
pub fn rebuild_static(payload: &str) -> Result<String, PayloadError> {
    guard_min_len(payload)?;

    let mut out = String::with_capacity(payload.len());
    for record in tlv::stream(payload) {
        let Ok(record) = record else { break };
        match record.tag {
            tags::POI_METHOD => out.push_str("010211"),
            tags::AMOUNT | tags::TIP_INDICATOR | tags::CRC => {}
            _ => {
                out.push_str(record.tag);
                out.push_str(&format!("{:02}", record.declared_len));
                out.push_str(record.value);
            }
        }
    }

    out.push_str(CRC_HEADER);
    let digest = crc::crc16(&out);
    out.push_str(&digest);
    Ok(out)
}

/// Fail-soft variant of [`rebuild_static`]: input too short to be a
/// payload comes back unchanged, so the caller always has something to
/// render.
pub fn to_static(payload: &str) -> String {
    match rebuild_static(payload) {
        Ok(rebuilt) => rebuilt,
        Err(_) => payload.to_string(),
    }
}

/// Checks that the payload ends in a CRC record matching everything that
/// precedes the 4 hex digits.
pub fn validate_crc(payload: &str) -> Result<(), PayloadError> {
    if payload.len() < 8 {
        return Err(PayloadError::MissingChecksum);
    }
    let tail_at = payload.len() - 8;
    if !payload.is_char_boundary(tail_at) {
        return Err(PayloadError::MissingChecksum);
    }

    // The CRC record must be the final data object: literal "6304" plus
    // four hex digits.
    let tail = &payload[tail_at..];
    if !tail.starts_with(CRC_HEADER) {
        return Err(PayloadError::MissingChecksum);
    }

    let found = &tail[CRC_HEADER.len()..];
    let computed = crc::crc16(&payload[..payload.len() - 4]);
    if !found.eq_ignore_ascii_case(&computed) {
        return Err(PayloadError::ChecksumMismatch {
            computed,
            found: found.to_string(),
        });
    }
    Ok(())
}

/// True for a payload in static form: point-of-initiation "11" and no
/// amount or tip record.
pub fn is_static(payload: &str) -> bool {
    find_tag(payload, tags::POI_METHOD)
        .map(|v| v == POI_STATIC)
        .unwrap_or(false)
        && find_tag(payload, tags::AMOUNT).is_err()
        && find_tag(payload, tags::TIP_INDICATOR).is_err()
}

/// Structured view of a QRIS payload.
///
/// Well-known tags map to named fields; merchant account records (02-51)
/// and anything unrecognized land in maps. Parsing validates the CRC
/// first, so an instance always describes a payload a scanner would accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrisData {
    pub raw: String,
    pub payload_format: String,                    // 00
    pub point_of_initiation: Option<String>,       // 01
    pub merchant_accounts: HashMap<String, String>, // 02-51
    pub merchant_category_code: Option<String>,    // 52
    pub currency: Option<String>,                  // 53
    pub amount: Option<String>,                    // 54
    pub tip_indicator: Option<String>,             // 55
    pub country_code: Option<String>,              // 58
    pub merchant_name: Option<String>,             // 59
    pub merchant_city: Option<String>,             // 60
    pub postal_code: Option<String>,               // 61
    pub additional_data: Option<String>,           // 62
    pub crc: String,                               // 63
    pub other: HashMap<String, String>,
}

impl QrisData {
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        guard_min_len(raw)?;
        validate_crc(raw)?;

        let mut fields = HashMap::new();
        for record in tlv::stream(raw) {
            let record = record.map_err(|e| match e {
                TlvError::MalformedLength { offset } => PayloadError::Malformed(offset),
            })?;
            fields.insert(record.tag.to_string(), record.value.to_string());
        }

        let payload_format = fields
            .remove(tags::PAYLOAD_FORMAT)
            .ok_or_else(|| PayloadError::TagNotFound(tags::PAYLOAD_FORMAT.to_string()))?;
        let crc = fields
            .remove(tags::CRC)
            .ok_or(PayloadError::MissingChecksum)?;

        let mut merchant_accounts = HashMap::new();
        let account_tags: Vec<String> = fields
            .keys()
            .filter(|k| matches!(k.parse::<u32>(), Ok(id) if (2..=51).contains(&id)))
            .cloned()
            .collect();
        for key in account_tags {
            if let Some(value) = fields.remove(&key) {
                merchant_accounts.insert(key, value);
            }
        }

        Ok(QrisData {
            raw: raw.to_string(),
            payload_format,
            point_of_initiation: fields.remove(tags::POI_METHOD),
            merchant_accounts,
            merchant_category_code: fields.remove(tags::MCC),
            currency: fields.remove(tags::CURRENCY),
            amount: fields.remove(tags::AMOUNT),
            tip_indicator: fields.remove(tags::TIP_INDICATOR),
            country_code: fields.remove(tags::COUNTRY),
            merchant_name: fields.remove(tags::MERCHANT_NAME),
            merchant_city: fields.remove(tags::MERCHANT_CITY),
            postal_code: fields.remove(tags::POSTAL_CODE),
            additional_data: fields.remove(tags::ADDITIONAL_DATA),
            crc,
            other: fields,
        })
    }

    pub fn is_static(&self) -> bool {
        self.point_of_initiation.as_deref() == Some(POI_STATIC)
            && self.amount.is_none()
            && self.tip_indicator.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a payload with a valid trailing CRC record.
    fn seal(body: &str) -> String {
        let mut payload = format!("{body}{CRC_HEADER}");
        let digest = crc::crc16(&payload);
        payload.push_str(&digest);
        payload
    }

    #[test]
    fn test_find_tag_merchant_round_trip() {
        let payload = seal("0002010102115913TEST MERCHANT");
        assert_eq!(merchant_name(&payload), Ok("TEST MERCHANT"));
    }

    #[test]
    fn test_find_tag_short_circuits_without_full_scan() {
        // Garbage after the match must not matter.
        let payload = "0002015913TEST MERCHANT59XXbroken";
        assert_eq!(find_tag(payload, "59"), Ok("TEST MERCHANT"));
    }

    #[test]
    fn test_find_tag_absent() {
        let payload = seal("000201010211");
        assert_eq!(
            find_tag(&payload, "54"),
            Err(PayloadError::TagNotFound("54".to_string()))
        );
    }

    #[test]
    fn test_find_tag_rejects_short_input_without_panicking() {
        assert_eq!(find_tag("123456789", "59"), Err(PayloadError::ShortInput));
    }

    #[test]
    fn test_tag_inside_another_value_is_not_matched() {
        // "59" appears inside the tag-26 value; only the real record counts.
        let payload = seal("00020126060059045913REAL MERCHANT");
        assert_eq!(merchant_name(&payload), Ok("REAL MERCHANT"));
    }

    #[test]
    fn test_to_static_forces_poi_and_strips_amount() {
        // Dynamic payload: POI "12", amount record, stale checksum.
        let dynamic = "0002010102125405100005913TEST MERCHANT6304ABCD";
        let rebuilt = to_static(dynamic);

        assert!(rebuilt.contains("010211"));
        assert_eq!(
            find_tag(&rebuilt, "54"),
            Err(PayloadError::TagNotFound("54".to_string()))
        );
        assert_eq!(merchant_name(&rebuilt), Ok("TEST MERCHANT"));
        assert!(validate_crc(&rebuilt).is_ok());
        assert_ne!(&rebuilt[rebuilt.len() - 4..], "ABCD");
    }

    #[test]
    fn test_to_static_strips_tip_indicator() {
        let dynamic = seal("000201010212550202540510000");
        let rebuilt = to_static(&dynamic);
        assert_eq!(
            find_tag(&rebuilt, "55"),
            Err(PayloadError::TagNotFound("55".to_string()))
        );
        assert_eq!(
            find_tag(&rebuilt, "54"),
            Err(PayloadError::TagNotFound("54".to_string()))
        );
    }

    #[test]
    fn test_to_static_is_idempotent() {
        let dynamic = "0002010102125405100005913TEST MERCHANT6304ABCD";
        let once = to_static(dynamic);
        assert_eq!(to_static(&once), once);
    }

    #[test]
    fn test_to_static_is_order_tolerant() {
        // Amount before the POI record; nonconformant but handled.
        let scrambled = seal("0002015405100000102125913TEST MERCHANT");
        let rebuilt = to_static(&scrambled);
        assert!(rebuilt.contains("010211"));
        assert!(find_tag(&rebuilt, "54").is_err());
        assert!(validate_crc(&rebuilt).is_ok());
    }

    #[test]
    fn test_to_static_short_input_unchanged() {
        assert_eq!(to_static("short"), "short");
        assert_eq!(to_static(""), "");
    }

    #[test]
    fn test_rebuild_static_reports_short_input() {
        assert_eq!(rebuild_static("short"), Err(PayloadError::ShortInput));
    }

    #[test]
    fn test_rebuild_static_keeps_prefix_on_malformed_length() {
        // Tag 59 carries a non-numeric length; the walk stops there but
        // the output still ends in a valid CRC record.
        let broken = "00020101021159XXTEST";
        let rebuilt = rebuild_static(broken).unwrap();
        assert!(rebuilt.starts_with("000201010211"));
        assert!(validate_crc(&rebuilt).is_ok());
    }

    #[test]
    fn test_checksum_self_consistency() {
        let rebuilt = to_static("0002010102125405100005913TEST MERCHANT6304ABCD");
        let body = &rebuilt[..rebuilt.len() - 4];
        assert!(body.ends_with(CRC_HEADER));
        assert_eq!(crc::crc16(body), &rebuilt[rebuilt.len() - 4..]);
    }

    #[test]
    fn test_validate_crc_detects_tampering() {
        let good = seal("0002010102115913TEST MERCHANT");
        assert!(validate_crc(&good).is_ok());

        let mut tampered = good.clone();
        tampered.replace_range(tampered.len() - 4.., "0000");
        assert!(matches!(
            validate_crc(&tampered),
            Err(PayloadError::ChecksumMismatch { .. })
        ));

        assert_eq!(
            validate_crc("000201010211"),
            Err(PayloadError::MissingChecksum)
        );
    }

    #[test]
    fn test_is_static() {
        let static_payload = seal("0002010102115913TEST MERCHANT");
        assert!(is_static(&static_payload));

        let dynamic_poi = seal("0002010102125913TEST MERCHANT");
        assert!(!is_static(&dynamic_poi));

        let with_amount = seal("000201010211540510000");
        assert!(!is_static(&with_amount));
    }

    #[test]
    fn test_qris_data_parse() {
        let payload = seal(concat!(
            "000201",
            "010211",
            "26170013ID.CO.EXAMPLE",
            "52045814",
            "5303360",
            "5802ID",
            "5913TEST MERCHANT",
            "6006MALANG",
        ));
        let data = QrisData::parse(&payload).unwrap();

        assert_eq!(data.payload_format, "01");
        assert_eq!(data.point_of_initiation.as_deref(), Some("11"));
        assert_eq!(
            data.merchant_accounts.get("26").map(String::as_str),
            Some("0013ID.CO.EXAMPLE")
        );
        assert_eq!(data.merchant_category_code.as_deref(), Some("5814"));
        assert_eq!(data.currency.as_deref(), Some("360"));
        assert_eq!(data.country_code.as_deref(), Some("ID"));
        assert_eq!(data.merchant_name.as_deref(), Some("TEST MERCHANT"));
        assert_eq!(data.merchant_city.as_deref(), Some("MALANG"));
        assert!(data.amount.is_none());
        assert!(data.is_static());
        assert_eq!(data.crc, &payload[payload.len() - 4..]);
    }

    #[test]
    fn test_qris_data_rejects_bad_checksum() {
        assert!(matches!(
            QrisData::parse("0002010102115913TEST MERCHANT6304FFFF"),
            Err(PayloadError::ChecksumMismatch { .. })
        ));
    }
}
