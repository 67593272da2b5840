// Copyright (c) Stacks
// SPDX-License-Identifier: Apache-2.0

//! Crockford base32 ("c32") encoding with a double-SHA-256 checksum, the
//! encoding behind every Stacks address string.
//!
//! An address is rendered as `S` + one alphabet character for the version
//! byte + the c32 encoding of `hash160 ‖ checksum`, where the checksum is
//! the first four bytes of `sha256(sha256(version ‖ hash160))`.

use crate::stacks::CodecError;
use sha2::{Digest, Sha256};

/// Crockford's alphabet: no I, L, O or U.
const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const CHECKSUM_LEN: usize = 4;

fn checksum(version: u8, payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(payload);
    let first = hasher.finalize();
    let second = Sha256::digest(first);

    let mut sum = [0u8; CHECKSUM_LEN];
    sum.copy_from_slice(&second[..CHECKSUM_LEN]);
    sum
}

/// Encode bytes as c32.  Leading zero bytes are preserved as leading `0`
/// digits, mirroring the reference encoding.
pub fn c32_encode(data: &[u8]) -> String {
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 8 / 5 + 2);
    let mut carry: u32 = 0;
    let mut carry_bits: u32 = 0;

    // Digits are produced low-order first and reversed at the end.
    for byte in data.iter().rev() {
        carry |= (*byte as u32) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            digits.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        digits.push(C32_ALPHABET[(carry & 0x1f) as usize]);
    }

    // Strip high-order zero digits, then re-add one digit per leading zero
    // byte of the input so the encoding stays length-faithful.
    while digits.last() == Some(&C32_ALPHABET[0]) {
        digits.pop();
    }
    for byte in data {
        if *byte == 0 {
            digits.push(C32_ALPHABET[0]);
        } else {
            break;
        }
    }

    digits.reverse();
    String::from_utf8(digits).expect("alphabet is ASCII")
}

/// Crockford normalization: case-insensitive, `O` reads as `0`, `L` and `I`
/// read as `1`.
fn normalize(input: &str) -> String {
    input
        .to_uppercase()
        .replace('O', "0")
        .replace(['L', 'I'], "1")
}

fn digit_value(ch: char) -> Result<u32, CodecError> {
    C32_ALPHABET
        .iter()
        .position(|c| *c as char == ch)
        .map(|p| p as u32)
        .ok_or_else(|| CodecError::Deserialize(format!("invalid c32 character {:?}", ch)))
}

/// Decode a c32 string back into bytes.
pub fn c32_decode(input: &str) -> Result<Vec<u8>, CodecError> {
    if !input.is_ascii() {
        return Err(CodecError::Deserialize(
            "c32 string must be ASCII".to_string(),
        ));
    }

    let mut values = Vec::with_capacity(input.len());
    for ch in normalize(input).chars() {
        values.push(digit_value(ch)?);
    }

    let mut out: Vec<u8> = Vec::with_capacity(values.len() * 5 / 8 + 1);
    let mut carry: u32 = 0;
    let mut carry_bits: u32 = 0;

    for value in values.iter().rev() {
        carry |= value << carry_bits;
        carry_bits += 5;
        while carry_bits >= 8 {
            out.push((carry & 0xff) as u8);
            carry >>= 8;
            carry_bits -= 8;
        }
    }
    if carry_bits > 0 {
        out.push(carry as u8);
    }

    // High-order zeros come back as leading `0` digits, same as encoding.
    while out.last() == Some(&0) {
        out.pop();
    }
    for value in values.iter() {
        if *value == 0 {
            out.push(0);
        } else {
            break;
        }
    }

    out.reverse();
    Ok(out)
}

/// Render a version byte and hash160 as a checksummed Stacks address string.
pub fn c32_address(version: u8, hash160: &[u8; 20]) -> Result<String, CodecError> {
    if version >= 32 {
        return Err(CodecError::Deserialize(format!(
            "address version {} out of range",
            version
        )));
    }

    let sum = checksum(version, hash160);
    let mut data = hash160.to_vec();
    data.extend_from_slice(&sum);

    Ok(format!(
        "S{}{}",
        C32_ALPHABET[version as usize] as char,
        c32_encode(&data)
    ))
}

/// Decode and checksum-verify an address string, returning the version byte
/// and hash160.
pub fn c32_address_decode(address: &str) -> Result<(u8, [u8; 20]), CodecError> {
    let rest = address
        .strip_prefix('S')
        .ok_or_else(|| CodecError::Deserialize("address must begin with 'S'".to_string()))?;
    if rest.len() < 2 {
        return Err(CodecError::Deserialize("address too short".to_string()));
    }

    let mut chars = normalize(rest).chars().collect::<Vec<_>>();
    let version = digit_value(chars.remove(0))? as u8;
    let payload: String = chars.into_iter().collect();

    let decoded = c32_decode(&payload)?;
    if decoded.len() != 20 + CHECKSUM_LEN {
        return Err(CodecError::Deserialize(format!(
            "address payload has {} bytes, expected {}",
            decoded.len(),
            20 + CHECKSUM_LEN
        )));
    }

    let (hash_bytes, given_sum) = decoded.split_at(20);
    let expected_sum = checksum(version, hash_bytes);
    if given_sum != expected_sum {
        return Err(CodecError::Deserialize(
            "address checksum mismatch".to_string(),
        ));
    }

    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(hash_bytes);
    Ok((version, hash160))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let cases: Vec<Vec<u8>> = vec![
            vec![],
            vec![0],
            vec![0, 0, 0],
            vec![1],
            vec![0xff; 20],
            vec![0, 0, 0xde, 0xad, 0xbe, 0xef],
            (0u8..=255).collect(),
        ];
        for case in cases {
            let encoded = c32_encode(&case);
            let decoded = c32_decode(&encoded).unwrap();
            assert_eq!(case, decoded, "round trip failed for {:?}", encoded);
        }
    }

    #[test]
    fn known_address_vector() {
        let hash160: [u8; 20] = {
            let bytes = hex::decode("a46ff88886c2ef9762d970b4d2c63678835bd39d").unwrap();
            let mut buf = [0u8; 20];
            buf.copy_from_slice(&bytes);
            buf
        };
        let address = c32_address(22, &hash160).unwrap();
        assert_eq!(address, "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7");

        let (version, decoded) = c32_address_decode(&address).unwrap();
        assert_eq!(version, 22);
        assert_eq!(decoded, hash160);
    }

    #[test]
    fn normalization_accepts_crockford_aliases() {
        let hash160 = [7u8; 20];
        let address = c32_address(26, &hash160).unwrap();

        // Lowercase plus the O->0 substitution must decode to the same bytes.
        let mangled = format!("S{}", address[1..].to_lowercase().replace('0', "o"));
        let (version, decoded) = c32_address_decode(&mangled).unwrap();
        assert_eq!(version, 26);
        assert_eq!(decoded, hash160);
    }

    #[test]
    fn checksum_tamper_detected() {
        let address = c32_address(22, &[3u8; 20]).unwrap();
        let mut tampered = address.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'7' { b'8' } else { b'7' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(c32_address_decode(&tampered).is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(c32_decode("not-c32-u").is_err());
        assert!(c32_address_decode("X123").is_err());
        assert!(c32_address_decode("S").is_err());
        assert!(c32_address(32, &[0u8; 20]).is_err());
    }
}
