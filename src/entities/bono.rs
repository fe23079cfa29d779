// 💰 Bonos and their assignment to workers

use crate::error::DomainError;
use crate::forms::{require_fecha, FormValidator};
use crate::lifecycle::{ActiveState, SoftDelete};
use crate::rut::Rut;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoBono {
    /// Counts toward social security contributions
    Imponible,
    NoImponible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temporalidad {
    Permanente,
    Recurrente,
    Puntual,
}

str_enum!(TipoBono {
    Imponible => "imponible",
    NoImponible => "no_imponible",
});

str_enum!(Temporalidad {
    Permanente => "permanente",
    Recurrente => "recurrente",
    Puntual => "puntual",
});

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NuevoBono {
    pub nombre: String,
    pub monto: i64,
    pub tipo: TipoBono,
    pub temporalidad: Temporalidad,
    #[serde(default)]
    pub descripcion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bono {
    pub id: String,
    pub nombre: String,
    /// CLP, whole pesos
    pub monto: i64,
    pub tipo: TipoBono,
    pub temporalidad: Temporalidad,
    pub descripcion: String,
    pub estado: ActiveState,
    pub created_at: DateTime<Utc>,
}

impl Bono {
    pub fn from_form(form: NuevoBono, validator: &FormValidator) -> Result<Self, DomainError> {
        validator.validate_bono(&form).map_err(DomainError::Validation)?;

        Ok(Bono {
            id: uuid::Uuid::new_v4().to_string(),
            nombre: form.nombre.trim().to_string(),
            monto: form.monto,
            tipo: form.tipo,
            temporalidad: form.temporalidad,
            descripcion: form.descripcion.trim().to_string(),
            estado: ActiveState::new(),
            created_at: Utc::now(),
        })
    }
}

impl SoftDelete for Bono {
    fn state(&self) -> &ActiveState {
        &self.estado
    }

    fn state_mut(&mut self) -> &mut ActiveState {
        &mut self.estado
    }
}

// ============================================================================
// ASSIGNMENT
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NuevaAsignacion {
    pub bono_id: String,
    pub fecha_asignacion: String,
    #[serde(default)]
    pub observaciones: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsignacionBono {
    pub id: String,
    pub bono_id: String,
    pub trabajador_rut: Rut,
    pub fecha_asignacion: NaiveDate,
    pub observaciones: String,
    pub activa: bool,
    pub created_by: String,
}

impl AsignacionBono {
    /// Assign `bono` to the worker `trabajador_rut`.
    ///
    /// Both must be active, and the worker cannot already hold the same bono
    /// in `existing` (their current assignments).
    pub fn asignar(
        bono: &Bono,
        trabajador_rut: &Rut,
        trabajador_activo: bool,
        existing: &[AsignacionBono],
        form: NuevaAsignacion,
        actor: &str,
    ) -> Result<Self, DomainError> {
        if !bono.is_active() {
            return Err(DomainError::Conflict(format!(
                "el bono {} está inactivo",
                bono.nombre
            )));
        }
        if !trabajador_activo {
            return Err(DomainError::Conflict(format!(
                "el trabajador {} está inactivo",
                trabajador_rut
            )));
        }
        if existing
            .iter()
            .any(|a| a.activa && a.bono_id == bono.id && &a.trabajador_rut == trabajador_rut)
        {
            return Err(DomainError::already_exists(
                "asignación de bono",
                format!("{} / {}", trabajador_rut, bono.nombre),
            ));
        }

        Ok(AsignacionBono {
            id: uuid::Uuid::new_v4().to_string(),
            bono_id: bono.id.clone(),
            trabajador_rut: trabajador_rut.clone(),
            fecha_asignacion: require_fecha("fecha_asignacion", &form.fecha_asignacion)?,
            observaciones: form.observaciones.trim().to_string(),
            activa: true,
            created_by: actor.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bono() -> Bono {
        Bono::from_form(
            NuevoBono {
                nombre: "Bono de producción".to_string(),
                monto: 120_000,
                tipo: TipoBono::Imponible,
                temporalidad: Temporalidad::Recurrente,
                descripcion: "Metas mensuales de faena".to_string(),
            },
            &FormValidator::new(),
        )
        .unwrap()
    }

    fn rut() -> Rut {
        Rut::parse("12.345.678-5").unwrap()
    }

    fn form() -> NuevaAsignacion {
        NuevaAsignacion {
            bono_id: String::new(),
            fecha_asignacion: "2024-04-01".to_string(),
            observaciones: String::new(),
        }
    }

    #[test]
    fn test_asignar() {
        let b = bono();
        let a = AsignacionBono::asignar(&b, &rut(), true, &[], form(), "rrhh").unwrap();

        assert!(a.activa);
        assert_eq!(a.bono_id, b.id);
        assert_eq!(a.created_by, "rrhh");
    }

    #[test]
    fn test_asignar_twice_fails() {
        let b = bono();
        let first = AsignacionBono::asignar(&b, &rut(), true, &[], form(), "rrhh").unwrap();

        let again = AsignacionBono::asignar(&b, &rut(), true, &[first], form(), "rrhh");
        assert!(matches!(again, Err(DomainError::AlreadyExists { .. })));
    }

    #[test]
    fn test_asignar_after_ended_assignment() {
        let b = bono();
        let mut first = AsignacionBono::asignar(&b, &rut(), true, &[], form(), "rrhh").unwrap();
        first.activa = false;

        assert!(AsignacionBono::asignar(&b, &rut(), true, &[first], form(), "rrhh").is_ok());
    }

    #[test]
    fn test_asignar_inactive_bono_or_worker_fails() {
        let mut b = bono();
        assert!(AsignacionBono::asignar(&b, &rut(), false, &[], form(), "rrhh").is_err());

        b.soft_delete("rrhh", None).unwrap();
        assert!(matches!(
            AsignacionBono::asignar(&b, &rut(), true, &[], form(), "rrhh"),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn test_bono_soft_delete_restore() {
        let mut b = bono();
        b.soft_delete("admin", Some("fin de temporada".to_string())).unwrap();
        assert!(!b.is_active());
        b.restore().unwrap();
        assert!(b.is_active());
    }
}
