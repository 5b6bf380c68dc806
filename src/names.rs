//! XML name validation
//!
//! NCName checks used for `gml:id` values, namespace prefixes and the
//! local names of schema components.

use crate::error::{Error, Result};

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c) || c.is_numeric() || c == '-' || c == '.' || c == '\u{B7}'
}

/// Check if a string is a valid XML Name
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) || first == ':' => {
            chars.all(|c| is_name_char(c) || c == ':')
        }
        _ => false,
    }
}

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    !name.contains(':') && is_valid_name(name)
}

/// Validate an NCName and return an error if invalid
pub fn validate_ncname(name: &str) -> Result<()> {
    if is_valid_ncname(name) {
        Ok(())
    } else {
        Err(Error::Schema(format!("invalid NCName: '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("element"));
        assert!(is_valid_name("my-element"));
        assert!(is_valid_name("_element"));
        assert!(is_valid_name("gml:id"));

        assert!(!is_valid_name(""));
        assert!(!is_valid_name("123element"));
        assert!(!is_valid_name("-element"));
    }

    #[test]
    fn test_is_valid_ncname() {
        assert!(is_valid_ncname("AtoNPoint"));
        assert!(is_valid_ncname("ID001"));
        assert!(is_valid_ncname("uuid.4a2c-11"));

        assert!(!is_valid_ncname(""));
        assert!(!is_valid_ncname("gml:id"));
        assert!(!is_valid_ncname("1abc"));
        assert!(!is_valid_ncname("has space"));
    }

    #[test]
    fn test_validate_ncname() {
        assert!(validate_ncname("LateralBuoy").is_ok());
        assert!(validate_ncname("0abc").is_err());
    }
}
