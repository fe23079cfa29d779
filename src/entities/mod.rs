// Entity models
//
// Identity (UUID or natural key) never changes; values do.
// RUT identifies people, patente identifies machines.

/// `as_str` / `parse` pair for the snake_case names stored in SQLite
macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($s => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

pub mod bono;
pub mod compra;
pub mod contraparte;
pub mod ficha;
pub mod maquinaria;
pub mod trabajador;
pub mod usuario;
pub mod venta;

pub use bono::{AsignacionBono, Bono, NuevaAsignacion, NuevoBono, Temporalidad, TipoBono};
pub use compra::{CompraMaquinaria, NuevaCompra};
pub use contraparte::{Contraparte, NuevaContraparte, TipoContraparte};
pub use ficha::{EstadoLaboral, FichaEmpresa, FichaInput, HistorialLaboral, Jornada, TipoContrato};
pub use maquinaria::{EstadoMaquinaria, GrupoMaquinaria, Maquinaria};
pub use trabajador::{NuevoTrabajador, Trabajador, TrabajadorPatch};
pub use usuario::{NuevoUsuario, Usuario};
pub use venta::{NuevaVenta, VentaMaquinaria};
