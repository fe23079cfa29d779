// 🤝 Contraparte - supplier (proveedor) or customer (cliente) of machinery

use crate::error::DomainError;
use crate::forms::FormValidator;
use crate::rut::Rut;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoContraparte {
    Proveedor,
    Cliente,
}

str_enum!(TipoContraparte {
    Proveedor => "proveedor",
    Cliente => "cliente",
});

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NuevaContraparte {
    pub rut: String,
    pub razon_social: String,
    #[serde(default)]
    pub telefono: String,
    #[serde(default)]
    pub correo: String,
    #[serde(default)]
    pub direccion: String,
    pub tipo: TipoContraparte,
}

/// A company can be both supplier and customer: (rut, tipo) is unique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contraparte {
    pub id: String,
    pub rut: Rut,
    pub razon_social: String,
    pub telefono: String,
    pub correo: String,
    pub direccion: String,
    pub tipo: TipoContraparte,
    pub created_at: DateTime<Utc>,
}

impl Contraparte {
    pub fn from_form(form: NuevaContraparte, validator: &FormValidator) -> Result<Self, DomainError> {
        validator
            .validate_contraparte(&form)
            .map_err(DomainError::Validation)?;

        Ok(Contraparte {
            id: uuid::Uuid::new_v4().to_string(),
            rut: Rut::parse(&form.rut)?,
            razon_social: form.razon_social.trim().to_string(),
            telefono: form.telefono.trim().to_string(),
            correo: form.correo.trim().to_lowercase(),
            direccion: form.direccion.trim().to_string(),
            tipo: form.tipo,
            created_at: Utc::now(),
        })
    }
}
