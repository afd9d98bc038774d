use sha2::{Digest, Sha256};

/// One named input contributing to a run fingerprint.
pub struct FingerprintPart<'a> {
    pub name: &'a str,
    pub bytes: &'a [u8],
}

/// Content fingerprint of a batch run's inputs.
///
/// Parts are sorted by name so discovery order does not matter; each part
/// contributes `name|sha256(bytes)|` to the outer hash.
pub fn compute_input_fingerprint(parts: &mut [FingerprintPart<'_>]) -> String {
    parts.sort_by(|a, b| a.name.cmp(b.name));

    let mut s = String::new();
    for part in parts.iter() {
        s.push_str(part.name);
        s.push('|');
        s.push_str(&sha256_hex(part.bytes));
        s.push('|');
    }
    sha256_hex(s.as_bytes())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_ignores_part_order() {
        let mut a = vec![
            FingerprintPart { name: "1996.csv", bytes: b"a,b" },
            FingerprintPart { name: "1997.csv", bytes: b"c,d" },
        ];
        let mut b = vec![
            FingerprintPart { name: "1997.csv", bytes: b"c,d" },
            FingerprintPart { name: "1996.csv", bytes: b"a,b" },
        ];
        assert_eq!(compute_input_fingerprint(&mut a), compute_input_fingerprint(&mut b));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let mut a = vec![FingerprintPart { name: "1996.csv", bytes: b"a,b" }];
        let mut b = vec![FingerprintPart { name: "1996.csv", bytes: b"a,c" }];
        assert_ne!(compute_input_fingerprint(&mut a), compute_input_fingerprint(&mut b));
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
