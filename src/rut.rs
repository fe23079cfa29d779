// 🪪 RUT - Rol Único Tributario
//
// "<body><check-digit>": body is decimal digits, check digit is 0-9 or K.
// Canonical display: 12.345.678-5
//
// The free functions are total: malformed input is just "invalid".
// `Rut` is the validated value embedded in trabajadores, usuarios and
// contrapartes; it is the natural key for a person and never changes.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CHECK DIGIT
// ============================================================================

/// Modulo-11 check digit of `body`.
///
/// Digits are weighted right-to-left with the cycle 2,3,4,5,6,7. A remainder
/// of 0 maps to `'0'`, 1 maps to `'K'`, anything else to `11 - remainder`.
/// Returns `None` when `body` is empty or has a non-digit.
pub fn compute_check_digit(body: &str) -> Option<char> {
    if body.is_empty() {
        return None;
    }

    let mut sum: u32 = 0;
    let mut weight: u32 = 2;

    for c in body.chars().rev() {
        let digit = c.to_digit(10)?;
        sum = (sum + digit * weight) % 11;
        weight = if weight == 7 { 2 } else { weight + 1 };
    }

    match sum {
        0 => Some('0'),
        1 => Some('K'),
        r => char::from_digit(11 - r, 10),
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Strip `.`, `-` and whitespace, uppercase the check digit
pub fn clean(rut: &str) -> String {
    rut.chars()
        .filter(|c| *c != '.' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Split a cleaned RUT into (body, check digit)
fn split(cleaned: &str) -> Option<(&str, char)> {
    let dv = cleaned.chars().last()?;
    let body = &cleaned[..cleaned.len() - dv.len_utf8()];
    Some((body, dv))
}

/// True iff `rut` is well-formed and its check digit matches the body.
///
/// Separator-insensitive: "12345678-5", "12.345.678-5" and "123456785"
/// all validate identically.
pub fn validate(rut: &str) -> bool {
    let cleaned = clean(rut);
    if cleaned.chars().count() < 2 {
        return false;
    }

    let Some((body, dv)) = split(&cleaned) else {
        return false;
    };

    if !body.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if !(dv.is_ascii_digit() || dv == 'K') {
        return false;
    }

    compute_check_digit(body) == Some(dv)
}

/// Canonical display form (thousands grouped with dots, dash before the
/// check digit). Does not re-validate.
pub fn format(rut: &str) -> String {
    let cleaned = clean(rut);
    if cleaned.chars().count() < 2 {
        return cleaned;
    }

    let Some((body, dv)) = split(&cleaned) else {
        return cleaned;
    };

    let chars: Vec<char> = body.chars().collect();
    let mut grouped = String::with_capacity(chars.len() + chars.len() / 3 + 2);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    grouped.push('-');
    grouped.push(dv);
    grouped
}

/// Message for inline form feedback; `None` when valid.
///
/// Malformed and wrong-checksum inputs share one message.
pub fn error_message(rut: &str) -> Option<&'static str> {
    if clean(rut).is_empty() {
        Some("RUT requerido")
    } else if !validate(rut) {
        Some("RUT inválido")
    } else {
        None
    }
}

// ============================================================================
// RUT VALUE
// ============================================================================

/// A validated RUT, stored in cleaned form ("123456785").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rut(String);

impl Rut {
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        if validate(input) {
            Ok(Rut(clean(input)))
        } else {
            Err(DomainError::InvalidRut(input.to_string()))
        }
    }

    /// Cleaned form, used as the storage key
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn body(&self) -> &str {
        split(&self.0).map(|(body, _)| body).unwrap_or_default()
    }

    pub fn check_digit(&self) -> char {
        split(&self.0).map(|(_, dv)| dv).unwrap_or('0')
    }

    /// Canonical display form
    pub fn formatted(&self) -> String {
        format(&self.0)
    }
}

impl fmt::Display for Rut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl FromStr for Rut {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rut::parse(s)
    }
}

impl TryFrom<String> for Rut {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rut::parse(&value)
    }
}

impl From<Rut> for String {
    fn from(rut: Rut) -> Self {
        rut.formatted()
    }
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn check_digit_is_deterministic(body in "[1-9][0-9]{0,8}") {
            prop_assert_eq!(compute_check_digit(&body), compute_check_digit(&body));
        }

        #[test]
        fn computed_pair_validates_in_every_form(body in "[1-9][0-9]{5,8}") {
            let dv = compute_check_digit(&body).unwrap();
            let raw = format!("{}{}", body, dv);
            prop_assert!(validate(&raw));
            prop_assert!(validate(&format(&raw)));
            let dashed = format!("{}-{}", body, dv);
            prop_assert!(validate(&dashed));
        }

        #[test]
        fn mutated_check_digit_fails(body in "[1-9][0-9]{5,8}", idx in 0usize..11) {
            let dv = compute_check_digit(&body).unwrap();
            let alphabet = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'K'];
            let other = alphabet[idx];
            prop_assume!(other != dv);
            let mutated = format!("{}{}", body, other);
            prop_assert!(!validate(&mutated));
        }

        #[test]
        fn validate_never_panics(input in "\\PC{0,20}") {
            let _ = validate(&input);
            let _ = format(&input);
            let _ = error_message(&input);
        }
    }
}
