//! String hashing used for entity and system identity hashes.

/// 32-bit polynomial string hash (`h = 31 * h + unit`) over UTF-16 code units.
///
/// Stable across runs and platforms; not suitable for anything adversarial.
pub fn hash_code(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_hashes_to_zero() {
        assert_eq!(hash_code(""), 0);
    }

    #[test]
    fn known_values() {
        assert_eq!(hash_code("a"), 97);
        assert_eq!(hash_code("ab"), 97 * 31 + 98);
        // Overflow wraps instead of panicking.
        assert_eq!(hash_code("polygenelubricants"), i32::MIN);
    }

    #[test]
    fn different_text_usually_differs() {
        assert_ne!(hash_code("Position"), hash_code("Velocity"));
    }
}
