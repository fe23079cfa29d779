// 🚜 Maquinaria - a machine in the company's fleet
//
// Identity is the patente. A machine enters the fleet through a compra and
// leaves it through a venta; in between it can be rented out or serviced.
//
//   Disponible ⇄ EnArriendo
//   Disponible ⇄ Mantenimiento
//   Disponible → Vendida        (only via a venta)
//   Vendida    → Disponible     (only when that venta is annulled)

use crate::error::DomainError;
use crate::patente::Patente;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrupoMaquinaria {
    Camion,
    Excavadora,
    Retroexcavadora,
    Cargador,
    Grua,
    Otro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoMaquinaria {
    Disponible,
    EnArriendo,
    Mantenimiento,
    Vendida,
}

str_enum!(GrupoMaquinaria {
    Camion => "camion",
    Excavadora => "excavadora",
    Retroexcavadora => "retroexcavadora",
    Cargador => "cargador",
    Grua => "grua",
    Otro => "otro",
});

str_enum!(EstadoMaquinaria {
    Disponible => "disponible",
    EnArriendo => "en_arriendo",
    Mantenimiento => "mantenimiento",
    Vendida => "vendida",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maquinaria {
    pub id: String,
    pub patente: Patente,
    pub grupo: GrupoMaquinaria,
    pub marca: String,
    pub modelo: String,
    pub anio: i32,
    pub numero_chasis: String,
    pub estado: EstadoMaquinaria,
    /// CLP, whole pesos
    pub avaluo_fiscal: i64,
    /// False while the compra that brought it in is soft-deleted
    pub en_inventario: bool,
    pub created_at: DateTime<Utc>,
}

impl Maquinaria {
    /// Manual state change from the inventory screen. Selling goes through
    /// `mark_sold`, never through here.
    pub fn set_estado(&mut self, to: EstadoMaquinaria) -> Result<(), DomainError> {
        use EstadoMaquinaria::*;

        let allowed = matches!(
            (self.estado, to),
            (Disponible, EnArriendo)
                | (EnArriendo, Disponible)
                | (Disponible, Mantenimiento)
                | (Mantenimiento, Disponible)
        );

        if !allowed || !self.en_inventario {
            return Err(self.invalid(to));
        }

        self.estado = to;
        Ok(())
    }

    pub fn mark_sold(&mut self) -> Result<(), DomainError> {
        if self.estado != EstadoMaquinaria::Disponible || !self.en_inventario {
            return Err(self.invalid(EstadoMaquinaria::Vendida));
        }
        self.estado = EstadoMaquinaria::Vendida;
        Ok(())
    }

    /// Undo a sale (its venta was soft-deleted)
    pub fn revert_sale(&mut self) -> Result<(), DomainError> {
        if self.estado != EstadoMaquinaria::Vendida {
            return Err(self.invalid(EstadoMaquinaria::Disponible));
        }
        self.estado = EstadoMaquinaria::Disponible;
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.en_inventario && self.estado == EstadoMaquinaria::Disponible
    }

    fn invalid(&self, to: EstadoMaquinaria) -> DomainError {
        DomainError::InvalidTransition {
            from: self.estado.as_str().to_string(),
            to: to.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EstadoMaquinaria::*;

    fn maquina() -> Maquinaria {
        Maquinaria {
            id: "m-1".to_string(),
            patente: Patente::parse("BCDF12").unwrap(),
            grupo: GrupoMaquinaria::Camion,
            marca: "Volvo".to_string(),
            modelo: "FMX 460".to_string(),
            anio: 2021,
            numero_chasis: "YV2XT40A".to_string(),
            estado: Disponible,
            avaluo_fiscal: 60_000_000,
            en_inventario: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rent_and_return() {
        let mut m = maquina();
        m.set_estado(EnArriendo).unwrap();
        assert!(!m.is_available());
        m.set_estado(Disponible).unwrap();
        assert!(m.is_available());
    }

    #[test]
    fn test_cannot_sell_manually() {
        let mut m = maquina();
        assert!(matches!(
            m.set_estado(Vendida),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_rented_machine_cannot_go_to_maintenance() {
        let mut m = maquina();
        m.set_estado(EnArriendo).unwrap();
        let err = m.set_estado(Mantenimiento).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "en_arriendo".to_string(),
                to: "mantenimiento".to_string(),
            }
        );
    }

    #[test]
    fn test_sale_and_revert() {
        let mut m = maquina();
        m.mark_sold().unwrap();
        assert_eq!(m.estado, Vendida);
        assert!(m.set_estado(Disponible).is_err());
        assert!(m.mark_sold().is_err());

        m.revert_sale().unwrap();
        assert_eq!(m.estado, Disponible);
        assert!(m.revert_sale().is_err());
    }

    #[test]
    fn test_withdrawn_machine_is_frozen() {
        let mut m = maquina();
        m.en_inventario = false;
        assert!(m.set_estado(EnArriendo).is_err());
        assert!(m.mark_sold().is_err());
    }
}
