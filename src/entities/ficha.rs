// 🗂️ Ficha de Empresa - the employment record of a worker
//
// One ficha per trabajador. Every update is a new version on the worker's
// HistorialLaboral; nothing is overwritten.

use crate::error::DomainError;
use crate::forms::{require_fecha, FormValidator};
use crate::rut::Rut;
use crate::temporal::{Diff, Timeline};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoContrato {
    Indefinido,
    PlazoFijo,
    PorObra,
    Honorarios,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jornada {
    Completa,
    Parcial,
    Turnos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoLaboral {
    Activo,
    Licencia,
    Permiso,
    Desvinculado,
}

str_enum!(TipoContrato {
    Indefinido => "indefinido",
    PlazoFijo => "plazo_fijo",
    PorObra => "por_obra",
    Honorarios => "honorarios",
});

str_enum!(Jornada {
    Completa => "completa",
    Parcial => "parcial",
    Turnos => "turnos",
});

str_enum!(EstadoLaboral {
    Activo => "activo",
    Licencia => "licencia",
    Permiso => "permiso",
    Desvinculado => "desvinculado",
});

/// Raw ficha form
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FichaInput {
    pub cargo: String,
    pub area: String,
    pub tipo_contrato: TipoContrato,
    pub jornada: Jornada,
    pub sueldo_base: i64,
    pub fecha_inicio_contrato: String,
    #[serde(default)]
    pub fecha_fin_contrato: Option<String>,
    pub estado_laboral: EstadoLaboral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FichaEmpresa {
    pub trabajador_rut: Rut,
    pub cargo: String,
    pub area: String,
    pub tipo_contrato: TipoContrato,
    pub jornada: Jornada,
    /// CLP, whole pesos
    pub sueldo_base: i64,
    pub fecha_inicio_contrato: NaiveDate,
    pub fecha_fin_contrato: Option<NaiveDate>,
    pub estado_laboral: EstadoLaboral,
}

/// Version timeline of a worker's ficha
pub type HistorialLaboral = Timeline<FichaEmpresa>;

impl FichaEmpresa {
    pub fn from_form(
        trabajador_rut: Rut,
        form: FichaInput,
        validator: &FormValidator,
    ) -> Result<Self, DomainError> {
        validator.validate_ficha(&form).map_err(DomainError::Validation)?;

        let fecha_fin_contrato = match form.fecha_fin_contrato.as_deref() {
            Some(value) if !value.trim().is_empty() => {
                Some(require_fecha("fecha_fin_contrato", value)?)
            }
            _ => None,
        };

        Ok(FichaEmpresa {
            trabajador_rut,
            cargo: form.cargo.trim().to_string(),
            area: form.area.trim().to_string(),
            tipo_contrato: form.tipo_contrato,
            jornada: form.jornada,
            sueldo_base: form.sueldo_base,
            fecha_inicio_contrato: require_fecha(
                "fecha_inicio_contrato",
                &form.fecha_inicio_contrato,
            )?,
            fecha_fin_contrato,
            estado_laboral: form.estado_laboral,
        })
    }

    /// Same ficha with a different estado laboral
    pub fn with_estado(&self, estado_laboral: EstadoLaboral) -> Self {
        FichaEmpresa {
            estado_laboral,
            ..self.clone()
        }
    }

    /// Contract ended before `today` (fixed-term contracts only)
    pub fn contrato_vencido(&self, today: NaiveDate) -> bool {
        self.fecha_fin_contrato.map_or(false, |fin| fin < today)
    }
}

impl Diff for FichaEmpresa {
    fn changed_fields(&self, other: &Self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.cargo != other.cargo {
            fields.push("cargo");
        }
        if self.area != other.area {
            fields.push("area");
        }
        if self.tipo_contrato != other.tipo_contrato {
            fields.push("tipo_contrato");
        }
        if self.jornada != other.jornada {
            fields.push("jornada");
        }
        if self.sueldo_base != other.sueldo_base {
            fields.push("sueldo_base");
        }
        if self.fecha_inicio_contrato != other.fecha_inicio_contrato {
            fields.push("fecha_inicio_contrato");
        }
        if self.fecha_fin_contrato != other.fecha_fin_contrato {
            fields.push("fecha_fin_contrato");
        }
        if self.estado_laboral != other.estado_laboral {
            fields.push("estado_laboral");
        }
        fields
    }
}
