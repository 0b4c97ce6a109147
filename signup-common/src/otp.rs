//! One-time code format.

/// Number of characters in a signup code.
pub const OTP_LENGTH: usize = 6;

/// Whether `code` has the shape of a signup code: exactly six ASCII digits.
pub fn is_well_formed_code(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_codes() {
        assert!(is_well_formed_code("123456"));
        assert!(is_well_formed_code("000000"));
    }

    #[test]
    fn test_malformed_codes() {
        assert!(!is_well_formed_code(""));
        assert!(!is_well_formed_code("12345"));
        assert!(!is_well_formed_code("1234567"));
        assert!(!is_well_formed_code("12a456"));
        assert!(!is_well_formed_code("١٢٣٤٥٦"));
    }
}
