// 🚛 Patente - Chilean vehicle license plate
//
// Two legal shapes, 6 alphanumerics once separators are stripped:
//   LLNNNN  legacy  (AB-12-34)
//   LLLLNN  current (AB-CD-12)
//
// `format` is applied on every keystroke of a form field, so it must accept
// partial input. `validate` and `error_message` judge a finished value.

use crate::error::DomainError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PATENTE_LEN: usize = 6;

static LEGACY_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}[0-9]{4}$").expect("legacy plate pattern"));

static CURRENT_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{4}[0-9]{2}$").expect("current plate pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatenteShape {
    /// LLNNNN
    Legacy,
    /// LLLLNN
    Current,
}

// ============================================================================
// INPUT SHAPING
// ============================================================================

/// Strip whitespace and dashes, uppercase
pub fn clean(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Reformat partial input into dashed groups of two.
///
/// Input holding anything outside `[A-Z0-9]` after cleaning is returned
/// untouched so the field keeps what the user typed.
pub fn format(input: &str) -> String {
    let cleaned = clean(input);
    if !cleaned.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return input.to_string();
    }

    // All ASCII from here on, byte offsets are char offsets
    let truncated = &cleaned[..cleaned.len().min(PATENTE_LEN)];

    // Both shapes share the same dash positions
    match truncated.len() {
        0..=2 => truncated.to_string(),
        3..=4 => format!("{}-{}", &truncated[..2], &truncated[2..]),
        _ => format!(
            "{}-{}-{}",
            &truncated[..2],
            &truncated[2..4],
            &truncated[4..]
        ),
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

fn strip_dashes(plate: &str) -> String {
    plate.chars().filter(|c| *c != '-').collect()
}

/// Which legal shape `plate` has, if any. Only dashes are stripped, so
/// lowercase input does not match.
pub fn shape(plate: &str) -> Option<PatenteShape> {
    let stripped = strip_dashes(plate);
    if LEGACY_SHAPE.is_match(&stripped) {
        Some(PatenteShape::Legacy)
    } else if CURRENT_SHAPE.is_match(&stripped) {
        Some(PatenteShape::Current)
    } else {
        None
    }
}

/// True iff `plate`, without dashes, is LLNNNN or LLLLNN
pub fn validate(plate: &str) -> bool {
    shape(plate).is_some()
}

/// First problem found with `plate`, for inline form feedback.
pub fn error_message(plate: &str) -> Option<&'static str> {
    let stripped = strip_dashes(plate);
    let len = stripped.chars().count();

    if stripped.trim().is_empty() {
        Some("Patente requerida")
    } else if len < PATENTE_LEN {
        Some("Patente incompleta: debe tener 6 caracteres")
    } else if len > PATENTE_LEN {
        Some("Patente demasiado larga: máximo 6 caracteres")
    } else if !stripped
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        Some("Patente contiene caracteres inválidos")
    } else if !validate(&stripped) {
        Some("Formato inválido: use LLNNNN o LLLLNN")
    } else {
        None
    }
}

// ============================================================================
// PATENTE VALUE
// ============================================================================

/// A validated plate, stored without dashes ("AB1234"). Natural key of a
/// machine; never changes once the machine exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Patente(String);

impl Patente {
    /// Accepts anything `format` can shape into a legal plate, so lowercase
    /// and separators are fine here.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let formatted = format(input);
        if validate(&formatted) {
            Ok(Patente(clean(&formatted)))
        } else {
            Err(DomainError::InvalidPatente(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn shape(&self) -> PatenteShape {
        shape(&self.0).unwrap_or(PatenteShape::Legacy)
    }

    /// Dashed display form
    pub fn formatted(&self) -> String {
        format(&self.0)
    }
}

impl fmt::Display for Patente {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl FromStr for Patente {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Patente::parse(s)
    }
}

impl TryFrom<String> for Patente {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Patente::parse(&value)
    }
}

impl From<Patente> for String {
    fn from(patente: Patente) -> Self {
        patente.formatted()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_examples() {
        assert_eq!(format("ab1234"), "AB-12-34");
        assert_eq!(format("abcd12"), "AB-CD-12");
        assert_eq!(format("ab12"), "AB-12");
        assert_eq!(format("ab12#4"), "ab12#4");
    }

    #[test]
    fn test_format_partial_input() {
        assert_eq!(format(""), "");
        assert_eq!(format("a"), "A");
        assert_eq!(format("ab"), "AB");
        assert_eq!(format("abc"), "AB-C");
        assert_eq!(format("ab-cd1"), "AB-CD-1");
        assert_eq!(format(" ab cd 12 "), "AB-CD-12");
    }

    #[test]
    fn test_format_truncates_extra_characters() {
        assert_eq!(format("abcd1234"), "AB-CD-12");
        assert_eq!(format("AB-CD-12-9"), "AB-CD-12");
    }

    #[test]
    fn test_format_rejects_non_ascii() {
        assert_eq!(format("ñb1234"), "ñb1234");
        assert_eq!(format("AB.12.34"), "AB.12.34");
    }

    #[test]
    fn test_validate_shapes() {
        assert!(validate("AB-12-34"));
        assert!(validate("AB1234"));
        assert!(validate("BCDF12"));
        assert!(validate("BC-DF-12"));

        assert!(!validate("AB-12"));
        assert!(!validate("ab12#4"));
        assert!(!validate("ABC123"));
        assert!(!validate("A12345"));
        assert!(!validate("123456"));
        assert!(!validate("ABCDEF"));
        assert!(!validate("AB12345"));
    }

    #[test]
    fn test_validate_does_not_uppercase() {
        assert!(!validate("ab1234"));
        assert!(validate(&format("ab1234")));
    }

    #[test]
    fn test_shape() {
        assert_eq!(shape("AB-12-34"), Some(PatenteShape::Legacy));
        assert_eq!(shape("AB-CD-12"), Some(PatenteShape::Current));
        assert_eq!(shape("AB-C1-23"), None);
    }

    #[test]
    fn test_error_message_order() {
        assert_eq!(error_message(""), Some("Patente requerida"));
        assert_eq!(error_message("--"), Some("Patente requerida"));
        assert_eq!(
            error_message("AB-12"),
            Some("Patente incompleta: debe tener 6 caracteres")
        );
        assert_eq!(
            error_message("AB-12-345"),
            Some("Patente demasiado larga: máximo 6 caracteres")
        );
        assert_eq!(
            error_message("ab12#4"),
            Some("Patente contiene caracteres inválidos")
        );
        assert_eq!(
            error_message("ABC123"),
            Some("Formato inválido: use LLNNNN o LLLLNN")
        );
        assert_eq!(error_message("AB-CD-12"), None);
    }

    #[test]
    fn test_patente_value() {
        let p = Patente::parse("ab-cd-12").unwrap();
        assert_eq!(p.as_str(), "ABCD12");
        assert_eq!(p.to_string(), "AB-CD-12");
        assert_eq!(p.shape(), PatenteShape::Current);

        assert!(Patente::parse("ab12").is_err());
        assert!(Patente::parse("ab12#4").is_err());
    }

    #[test]
    fn test_patente_serde() {
        let p = Patente::parse("AB1234").unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"AB-12-34\"");

        let back: Patente = serde_json::from_str("\"ab1234\"").unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<Patente>("\"ABC123\"").is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn format_is_idempotent(input in "\\PC{0,12}") {
            let once = format(&input);
            prop_assert_eq!(format(&once), once);
        }

        #[test]
        fn accepted_input_formats_to_at_most_eight(input in "[a-zA-Z0-9 -]{0,16}") {
            prop_assert!(format(&input).len() <= 8);
        }

        #[test]
        fn legal_shapes_validate(legacy in "[A-Z]{2}[0-9]{4}", current in "[A-Z]{4}[0-9]{2}") {
            prop_assert!(validate(&legacy));
            prop_assert!(validate(&current));
            prop_assert!(validate(&format(&legacy)));
            prop_assert!(validate(&format(&current)));
        }

        #[test]
        fn other_combinations_fail(plate in "[A-Z0-9]{6}") {
            let legal = LEGACY_SHAPE.is_match(&plate) || CURRENT_SHAPE.is_match(&plate);
            prop_assert_eq!(validate(&plate), legal);
        }

        #[test]
        fn formatting_loses_nothing(plate in "[A-Z]{2}[0-9]{4}|[A-Z]{4}[0-9]{2}") {
            prop_assert_eq!(clean(&format(&plate)), clean(&plate));
        }
    }
}
