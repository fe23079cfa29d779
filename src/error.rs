// Domain errors
//
// Pure validators (rut, patente) never fail; they return bool/Option.
// Everything that guards a state change returns DomainError, which the
// persistence layer carries inside anyhow and the HTTP layer downcasts.

use crate::forms::FieldError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// RUT failed format or check-digit validation
    #[error("RUT inválido: {0}")]
    InvalidRut(String),

    /// Patente did not match LLNNNN or LLLLNN
    #[error("patente inválida: {0}")]
    InvalidPatente(String),

    /// Form validation failed on one or more fields
    #[error("validación fallida: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("{entity} no encontrado: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} ya existe: {key}")]
    AlreadyExists { entity: &'static str, key: String },

    #[error("el registro ya está activo")]
    AlreadyActive,

    #[error("el registro ya está inactivo")]
    AlreadyInactive,

    #[error("transición inválida de {from} a {to}")]
    InvalidTransition { from: String, to: String },

    #[error("el rol {role} no puede {action}")]
    Forbidden { role: String, action: String },

    /// Request is well-formed but conflicts with current state
    #[error("conflicto: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        DomainError::AlreadyExists {
            entity,
            key: key.into(),
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = DomainError::Validation(vec![
            FieldError::new("rut", "RUT requerido"),
            FieldError::new("correo", "Correo inválido"),
        ]);

        let msg = err.to_string();
        assert!(msg.contains("rut: RUT requerido"));
        assert!(msg.contains("correo: Correo inválido"));
    }

    #[test]
    fn test_not_found_message() {
        let err = DomainError::not_found("trabajador", "12.345.678-5");
        assert_eq!(err.to_string(), "trabajador no encontrado: 12.345.678-5");
    }
}
