//! CRC16 engine for EMV payloads
//!
//! EMV QR mandates CRC-16/CCITT-FALSE for the trailing checksum record
//! (tag 63): polynomial 0x1021, initial register 0xFFFF, MSB first, no
//! reflection, no final XOR.

/// Raw 16-bit checksum over a byte slice.
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Checksum over the UTF-8 bytes of `text`, formatted the way tag 63
/// carries it: exactly four uppercase hex digits.
pub fn crc16(text: &str) -> String {
    format!("{:04X}", checksum(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // CRC-16/CCITT-FALSE check value
        assert_eq!(crc16("123456789"), "29B1");
        assert_eq!(checksum(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input_is_initial_register() {
        assert_eq!(crc16(""), "FFFF");
    }

    #[test]
    fn test_deterministic() {
        let payload = "00020101021163045E3A";
        assert_eq!(crc16(payload), crc16(payload));
    }

    #[test]
    fn test_always_four_uppercase_hex_digits() {
        for input in ["", "a", "QRIS", "000201010211", "123456789"] {
            let digest = crc16(input);
            assert_eq!(digest.len(), 4);
            assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }
}
