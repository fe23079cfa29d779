// 📤 VentaMaquinaria - sale of a machine to a cliente

use crate::entities::compra::CompraMaquinaria;
use crate::entities::maquinaria::Maquinaria;
use crate::error::DomainError;
use crate::forms::{require_fecha, FieldError, FormValidator};
use crate::lifecycle::{ActiveState, SoftDelete};
use crate::patente::Patente;
use crate::rut::Rut;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NuevaVenta {
    pub patente: String,
    pub cliente_rut: String,
    pub fecha_venta: String,
    pub valor_venta: i64,
    pub numero_factura: String,
    #[serde(default)]
    pub observaciones: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VentaMaquinaria {
    pub id: String,
    pub patente: Patente,
    pub cliente_rut: Rut,
    pub fecha_venta: NaiveDate,
    /// CLP, whole pesos
    pub valor_venta: i64,
    pub numero_factura: String,
    pub observaciones: String,
    pub estado: ActiveState,
    pub created_at: DateTime<Utc>,
}

impl VentaMaquinaria {
    /// Sell `maquinaria`, bought through `compra`. The machine must be
    /// available and the sale cannot predate the purchase.
    pub fn registrar(
        form: NuevaVenta,
        maquinaria: &mut Maquinaria,
        compra: &CompraMaquinaria,
        validator: &FormValidator,
    ) -> Result<VentaMaquinaria, DomainError> {
        validator.validate_venta(&form).map_err(DomainError::Validation)?;

        let patente = Patente::parse(&form.patente)?;
        if patente != maquinaria.patente || compra.patente != maquinaria.patente {
            return Err(DomainError::Conflict(format!(
                "la venta de {} no corresponde a la máquina {}",
                patente, maquinaria.patente
            )));
        }
        if !compra.is_active() {
            return Err(DomainError::Conflict(format!(
                "la compra de {} está anulada",
                maquinaria.patente
            )));
        }

        let fecha_venta = require_fecha("fecha_venta", &form.fecha_venta)?;
        if fecha_venta < compra.fecha_compra {
            return Err(DomainError::Validation(vec![FieldError::new(
                "fecha_venta",
                "No puede ser anterior a la fecha de compra",
            )]));
        }

        maquinaria.mark_sold()?;

        Ok(VentaMaquinaria {
            id: uuid::Uuid::new_v4().to_string(),
            patente,
            cliente_rut: Rut::parse(&form.cliente_rut)?,
            fecha_venta,
            valor_venta: form.valor_venta,
            numero_factura: form.numero_factura.trim().to_string(),
            observaciones: form.observaciones.trim().to_string(),
            estado: ActiveState::new(),
            created_at: Utc::now(),
        })
    }

    /// Soft-delete; the machine goes back to Disponible
    pub fn anular(
        &mut self,
        maquinaria: &mut Maquinaria,
        actor: &str,
        reason: Option<String>,
    ) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::AlreadyInactive);
        }
        maquinaria.revert_sale()?;
        self.soft_delete(actor, reason)
    }

    /// Restore; the machine is sold again, so it must still be available
    pub fn restaurar(&mut self, maquinaria: &mut Maquinaria) -> Result<(), DomainError> {
        if self.is_active() {
            return Err(DomainError::AlreadyActive);
        }
        maquinaria.mark_sold()?;
        self.restore()
    }

    /// Sale price minus purchase price
    pub fn margen(&self, compra: &CompraMaquinaria) -> i64 {
        self.valor_venta - compra.valor_compra
    }
}

impl SoftDelete for VentaMaquinaria {
    fn state(&self) -> &ActiveState {
        &self.estado
    }

    fn state_mut(&mut self) -> &mut ActiveState {
        &mut self.estado
    }
}
