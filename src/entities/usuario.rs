// 👤 Usuario - a person who can use the system, with a role

use crate::error::DomainError;
use crate::forms::FormValidator;
use crate::roles::Role;
use crate::rut::Rut;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NuevoUsuario {
    pub rut: String,
    pub nombre: String,
    pub correo: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usuario {
    pub id: String,
    pub rut: Rut,
    pub nombre: String,
    pub correo: String,
    pub role: Role,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
}

impl Usuario {
    pub fn from_form(form: NuevoUsuario, validator: &FormValidator) -> Result<Self, DomainError> {
        validator.validate_usuario(&form).map_err(DomainError::Validation)?;

        Ok(Usuario {
            id: uuid::Uuid::new_v4().to_string(),
            rut: Rut::parse(&form.rut)?,
            nombre: form.nombre.trim().to_string(),
            correo: form.correo.trim().to_lowercase(),
            role: form.role,
            activo: true,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Action;

    #[test]
    fn test_from_form() {
        let u = Usuario::from_form(
            NuevoUsuario {
                rut: "111111111".to_string(),
                nombre: "Ana Pérez".to_string(),
                correo: "ANA@empresa.cl".to_string(),
                role: Role::RecursosHumanos,
            },
            &FormValidator::new(),
        )
        .unwrap();

        assert_eq!(u.rut.to_string(), "11.111.111-1");
        assert_eq!(u.correo, "ana@empresa.cl");
        assert!(u.role.can(Action::ManageBonos));
    }

    #[test]
    fn test_role_deserializes_from_wire_name() {
        let form: NuevoUsuario = serde_json::from_str(
            r#"{"rut":"11.111.111-1","nombre":"Luis","correo":"l@e.cl","role":"gerencia"}"#,
        )
        .unwrap();
        assert_eq!(form.role, Role::Gerencia);
    }
}
