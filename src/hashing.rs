//! One-way hashing of customer data sent with conversions.
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `text`.
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Like [`sha256_hex`], but absent or blank input yields `None` rather than the hash of an empty
/// string.
pub fn sha256_hex_opt(text: Option<&str>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty()).map(sha256_hex)
}

#[cfg(test)]
mod tests {
    use super::{sha256_hex, sha256_hex_opt};

    #[test]
    fn matches_known_digest() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn skips_absent_and_blank_values() {
        assert_eq!(sha256_hex_opt(None), None);
        assert_eq!(sha256_hex_opt(Some("  ")), None);
        assert_eq!(sha256_hex_opt(Some("abc")), Some(sha256_hex("abc")));
    }
}
