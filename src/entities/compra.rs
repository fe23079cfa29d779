// 📥 CompraMaquinaria - acquisition of a machine from a proveedor
//
// Registering a compra is what creates the Maquinaria. Soft-deleting it
// withdraws the machine from inventory; that is refused once the machine
// has been sold or rented out.

use crate::entities::maquinaria::{EstadoMaquinaria, GrupoMaquinaria, Maquinaria};
use crate::error::DomainError;
use crate::forms::{require_fecha, FormValidator};
use crate::lifecycle::{ActiveState, SoftDelete};
use crate::patente::Patente;
use crate::rut::Rut;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Purchase form; carries the machine's data as well
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NuevaCompra {
    pub patente: String,
    pub grupo: GrupoMaquinaria,
    pub marca: String,
    pub modelo: String,
    pub anio: i32,
    #[serde(default)]
    pub numero_chasis: String,
    #[serde(default)]
    pub avaluo_fiscal: i64,
    pub proveedor_rut: String,
    pub fecha_compra: String,
    pub valor_compra: i64,
    pub numero_factura: String,
    #[serde(default)]
    pub observaciones: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompraMaquinaria {
    pub id: String,
    pub patente: Patente,
    pub proveedor_rut: Rut,
    pub fecha_compra: NaiveDate,
    /// CLP, whole pesos
    pub valor_compra: i64,
    pub numero_factura: String,
    pub observaciones: String,
    pub estado: ActiveState,
    pub created_at: DateTime<Utc>,
}

impl CompraMaquinaria {
    pub fn registrar(
        form: NuevaCompra,
        validator: &FormValidator,
    ) -> Result<(CompraMaquinaria, Maquinaria), DomainError> {
        validator.validate_compra(&form).map_err(DomainError::Validation)?;

        let patente = Patente::parse(&form.patente)?;
        let now = Utc::now();

        let maquinaria = Maquinaria {
            id: uuid::Uuid::new_v4().to_string(),
            patente: patente.clone(),
            grupo: form.grupo,
            marca: form.marca.trim().to_string(),
            modelo: form.modelo.trim().to_string(),
            anio: form.anio,
            numero_chasis: form.numero_chasis.trim().to_uppercase(),
            estado: EstadoMaquinaria::Disponible,
            avaluo_fiscal: form.avaluo_fiscal,
            en_inventario: true,
            created_at: now,
        };

        let compra = CompraMaquinaria {
            id: uuid::Uuid::new_v4().to_string(),
            patente,
            proveedor_rut: Rut::parse(&form.proveedor_rut)?,
            fecha_compra: require_fecha("fecha_compra", &form.fecha_compra)?,
            valor_compra: form.valor_compra,
            numero_factura: form.numero_factura.trim().to_string(),
            observaciones: form.observaciones.trim().to_string(),
            estado: ActiveState::new(),
            created_at: now,
        };

        Ok((compra, maquinaria))
    }

    /// Soft-delete and pull the machine out of inventory
    pub fn anular(
        &mut self,
        maquinaria: &mut Maquinaria,
        actor: &str,
        reason: Option<String>,
    ) -> Result<(), DomainError> {
        match maquinaria.estado {
            EstadoMaquinaria::Vendida | EstadoMaquinaria::EnArriendo => {
                return Err(DomainError::Conflict(format!(
                    "la máquina {} está {}; no se puede anular su compra",
                    maquinaria.patente,
                    maquinaria.estado.as_str()
                )));
            }
            EstadoMaquinaria::Disponible | EstadoMaquinaria::Mantenimiento => {}
        }

        self.soft_delete(actor, reason)?;
        maquinaria.en_inventario = false;
        Ok(())
    }

    /// Restore and put the machine back into inventory
    pub fn restaurar(&mut self, maquinaria: &mut Maquinaria) -> Result<(), DomainError> {
        self.restore()?;
        maquinaria.en_inventario = true;
        Ok(())
    }
}

impl SoftDelete for CompraMaquinaria {
    fn state(&self) -> &ActiveState {
        &self.estado
    }

    fn state_mut(&mut self) -> &mut ActiveState {
        &mut self.estado
    }
}
