// 👷 Trabajador - a registered worker
//
// The RUT is the worker's identity: it is set once and no patch can touch it.
// Contact data and the employment record (ficha) change over time.

use crate::error::DomainError;
use crate::forms::{is_correo, require_fecha, FieldError, FormValidator};
use crate::lifecycle::{ActiveState, SoftDelete};
use crate::rut::Rut;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Raw registration form, as typed or as read from a roster CSV
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NuevoTrabajador {
    pub rut: String,
    pub nombres: String,
    pub apellido_paterno: String,
    #[serde(default)]
    pub apellido_materno: String,
    pub fecha_nacimiento: String,
    #[serde(default)]
    pub telefono: String,
    pub correo: String,
    #[serde(default)]
    pub direccion: String,
    pub fecha_ingreso: String,
}

/// Editable contact data. No RUT here on purpose: it is immutable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrabajadorPatch {
    pub nombres: Option<String>,
    pub apellido_paterno: Option<String>,
    pub apellido_materno: Option<String>,
    pub telefono: Option<String>,
    pub correo: Option<String>,
    pub direccion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trabajador {
    pub id: String,
    pub rut: Rut,
    pub nombres: String,
    pub apellido_paterno: String,
    pub apellido_materno: String,
    pub fecha_nacimiento: NaiveDate,
    pub telefono: String,
    pub correo: String,
    pub direccion: String,
    pub fecha_ingreso: NaiveDate,
    pub estado: ActiveState,
    pub created_at: DateTime<Utc>,
}

impl Trabajador {
    pub fn from_form(form: NuevoTrabajador, validator: &FormValidator) -> Result<Self, DomainError> {
        validator
            .validate_trabajador(&form)
            .map_err(DomainError::Validation)?;

        Ok(Trabajador {
            id: uuid::Uuid::new_v4().to_string(),
            rut: Rut::parse(&form.rut)?,
            nombres: form.nombres.trim().to_string(),
            apellido_paterno: form.apellido_paterno.trim().to_string(),
            apellido_materno: form.apellido_materno.trim().to_string(),
            fecha_nacimiento: require_fecha("fecha_nacimiento", &form.fecha_nacimiento)?,
            telefono: form.telefono.trim().to_string(),
            correo: form.correo.trim().to_lowercase(),
            direccion: form.direccion.trim().to_string(),
            fecha_ingreso: require_fecha("fecha_ingreso", &form.fecha_ingreso)?,
            estado: ActiveState::new(),
            created_at: Utc::now(),
        })
    }

    pub fn nombre_completo(&self) -> String {
        [&self.nombres, &self.apellido_paterno, &self.apellido_materno]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Apply contact changes; returns the names of the fields that changed.
    /// Nothing is applied if any field is invalid.
    pub fn apply_patch(&mut self, patch: TrabajadorPatch) -> Result<Vec<&'static str>, DomainError> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("nombres", &patch.nombres),
            ("apellido_paterno", &patch.apellido_paterno),
        ] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                errors.push(FieldError::new(name, "Campo requerido"));
            }
        }
        if matches!(&patch.correo, Some(c) if !is_correo(c)) {
            errors.push(FieldError::new("correo", "Correo inválido"));
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let fields: [(&'static str, Option<String>, &mut String); 6] = [
            ("nombres", patch.nombres, &mut self.nombres),
            ("apellido_paterno", patch.apellido_paterno, &mut self.apellido_paterno),
            ("apellido_materno", patch.apellido_materno, &mut self.apellido_materno),
            ("telefono", patch.telefono, &mut self.telefono),
            ("correo", patch.correo.map(|c| c.to_lowercase()), &mut self.correo),
            ("direccion", patch.direccion, &mut self.direccion),
        ];

        let mut changed = Vec::new();
        for (name, new_value, slot) in fields {
            if let Some(value) = new_value {
                let value = value.trim().to_string();
                if *slot != value {
                    *slot = value;
                    changed.push(name);
                }
            }
        }

        Ok(changed)
    }
}

impl SoftDelete for Trabajador {
    fn state(&self) -> &ActiveState {
        &self.estado
    }

    fn state_mut(&mut self) -> &mut ActiveState {
        &mut self.estado
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> NuevoTrabajador {
        NuevoTrabajador {
            rut: "12345678-5".to_string(),
            nombres: " Pedro ".to_string(),
            apellido_paterno: "Soto".to_string(),
            apellido_materno: String::new(),
            fecha_nacimiento: "1985-02-20".to_string(),
            telefono: "+56 9 8765 4321".to_string(),
            correo: "Pedro.Soto@Empresa.cl".to_string(),
            direccion: "Los Carrera 456, Concepción".to_string(),
            fecha_ingreso: "01-03-2015".to_string(),
        }
    }

    #[test]
    fn test_from_form_normalizes() {
        let t = Trabajador::from_form(form(), &FormValidator::new()).unwrap();

        assert_eq!(t.rut.to_string(), "12.345.678-5");
        assert_eq!(t.nombres, "Pedro");
        assert_eq!(t.correo, "pedro.soto@empresa.cl");
        assert_eq!(t.fecha_ingreso, NaiveDate::from_ymd_opt(2015, 3, 1).unwrap());
        assert!(t.is_active());
    }

    #[test]
    fn test_from_form_rejects_invalid_rut() {
        let mut f = form();
        f.rut = "12345678-9".to_string();

        match Trabajador::from_form(f, &FormValidator::new()) {
            Err(DomainError::Validation(errors)) => assert_eq!(errors[0].field, "rut"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_nombre_completo_skips_empty() {
        let t = Trabajador::from_form(form(), &FormValidator::new()).unwrap();
        assert_eq!(t.nombre_completo(), "Pedro Soto");
    }

    #[test]
    fn test_apply_patch_reports_changes() {
        let mut t = Trabajador::from_form(form(), &FormValidator::new()).unwrap();
        let changed = t
            .apply_patch(TrabajadorPatch {
                telefono: Some("+56 2 2233 4455".to_string()),
                nombres: Some("Pedro".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(changed, vec!["telefono"]);
        assert_eq!(t.telefono, "+56 2 2233 4455");
    }

    #[test]
    fn test_apply_patch_validates() {
        let mut t = Trabajador::from_form(form(), &FormValidator::new()).unwrap();

        assert!(t
            .apply_patch(TrabajadorPatch {
                correo: Some("no-es-correo".to_string()),
                ..Default::default()
            })
            .is_err());
        assert!(t
            .apply_patch(TrabajadorPatch {
                nombres: Some(" ".to_string()),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let mut t = Trabajador::from_form(form(), &FormValidator::new()).unwrap();
        t.soft_delete("rrhh", Some("renuncia".to_string())).unwrap();
        assert!(!t.is_active());

        t.restore().unwrap();
        assert!(t.is_active());
    }
}
