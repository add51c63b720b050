//! The 5-digit access code.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Number of digits in a credential.
pub const DIGITS: usize = 5;

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum CredentialError {
    #[error("a credential has exactly 5 digits, got {0}")]
    Length(usize),

    #[error("{value:#04x} at position {position} is not a decimal digit")]
    NotADigit { position: usize, value: u8 },

    #[error("payload ended with {0:#04x} instead of '#'")]
    Terminator(u8),
}

/// Exactly five decimal digits, each stored as its value `0..=9` (not as
/// ASCII), which is also how they travel on the wire.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Credential([u8; DIGITS]);

impl Credential {
    pub fn new(digits: [u8; DIGITS]) -> Result<Self, CredentialError> {
        for (position, &value) in digits.iter().enumerate() {
            if value > 9 {
                return Err(CredentialError::NotADigit { position, value });
            }
        }
        Ok(Credential(digits))
    }

    pub fn digits(&self) -> &[u8; DIGITS] {
        &self.0
    }

    /// Digit-wise comparison, all positions are always inspected.
    pub fn matches(&self, other: &Credential) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(true, |same, (a, b)| same & (a == b))
    }
}

impl FromStr for Credential {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != DIGITS {
            return Err(CredentialError::Length(bytes.len()));
        }
        let mut digits = [0_u8; DIGITS];
        for (position, (slot, &c)) in digits.iter_mut().zip(bytes.iter()).enumerate() {
            if !c.is_ascii_digit() {
                return Err(CredentialError::NotADigit { position, value: c });
            }
            *slot = c - b'0';
        }
        Ok(Credential(digits))
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in self.0.iter() {
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

/// Never print the secret in logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(*****)")
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_five_digits() {
        let credential: Credential = "09182".parse().unwrap();
        assert_eq!(credential.digits(), &[0, 9, 1, 8, 2]);
        assert_eq!(credential.to_string(), "09182");
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            "1234".parse::<Credential>(),
            Err(CredentialError::Length(4))
        );
        assert_eq!(
            "123456".parse::<Credential>(),
            Err(CredentialError::Length(6))
        );
    }

    #[test]
    fn rejects_non_digits() {
        assert_eq!(
            "12a45".parse::<Credential>(),
            Err(CredentialError::NotADigit {
                position: 2,
                value: b'a'
            })
        );
        assert_eq!(
            Credential::new([1, 2, 3, 4, 10]),
            Err(CredentialError::NotADigit {
                position: 4,
                value: 10
            })
        );
    }

    #[test]
    fn matches_is_digit_wise() {
        let a = Credential::new([3, 3, 3, 3, 3]).unwrap();
        let b = Credential::new([3, 3, 3, 3, 3]).unwrap();
        let c = Credential::new([3, 3, 3, 3, 0]).unwrap();
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn debug_hides_the_digits() {
        let credential = Credential::new([1, 2, 3, 4, 5]).unwrap();
        assert!(!format!("{:?}", credential).contains("12345"));
    }
}
