// 📝 Form validation
//
// Checks raw form input before an entity is built. Every problem is
// reported at once so a form can show all of its inline messages together.

use crate::entities::{
    FichaInput, NuevaCompra, NuevaContraparte, NuevaVenta, NuevoBono, NuevoTrabajador,
    NuevoUsuario, TipoContrato,
};
use crate::error::DomainError;
use crate::{patente, rut};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FIELD ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub type ValidationResult = Result<(), Vec<FieldError>>;

/// Accepts ISO (2024-03-01) and Chilean (01-03-2024) dates
pub fn parse_fecha(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d-%m-%Y"))
        .ok()
}

/// Parse a date that already passed form validation
pub fn require_fecha(field: &str, value: &str) -> Result<NaiveDate, DomainError> {
    parse_fecha(value).ok_or_else(|| {
        DomainError::Validation(vec![FieldError::new(field, "Fecha inválida (use AAAA-MM-DD)")])
    })
}

/// One `@` with something on both sides
pub fn is_correo(value: &str) -> bool {
    match value.trim().split_once('@') {
        Some((user, domain)) => !user.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn new() -> Self {
        Collector { errors: Vec::new() }
    }

    fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    fn required(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.push(field, "Campo requerido");
            false
        } else {
            true
        }
    }

    fn rut(&mut self, field: &str, value: &str) {
        if let Some(message) = rut::error_message(value) {
            self.push(field, message);
        }
    }

    fn patente(&mut self, field: &str, value: &str) {
        if let Some(message) = patente::error_message(&patente::format(value)) {
            self.push(field, message);
        }
    }

    fn correo(&mut self, field: &str, value: &str) {
        if !is_correo(value) {
            self.push(field, "Correo inválido");
        }
    }

    fn fecha(&mut self, field: &str, value: &str) -> Option<NaiveDate> {
        if !self.required(field, value) {
            return None;
        }
        let parsed = parse_fecha(value);
        if parsed.is_none() {
            self.push(field, "Fecha inválida (use AAAA-MM-DD)");
        }
        parsed
    }

    fn positive(&mut self, field: &str, value: i64) {
        if value <= 0 {
            self.push(field, "Debe ser mayor que cero");
        }
    }

    fn finish(self) -> ValidationResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

// ============================================================================
// FORM VALIDATOR
// ============================================================================

pub struct FormValidator {
    /// Reference date for "not in the future" checks
    today: NaiveDate,
}

impl FormValidator {
    pub fn new() -> Self {
        FormValidator {
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_today(today: NaiveDate) -> Self {
        FormValidator { today }
    }

    pub fn validate_trabajador(&self, form: &NuevoTrabajador) -> ValidationResult {
        let mut c = Collector::new();

        c.rut("rut", &form.rut);
        c.required("nombres", &form.nombres);
        c.required("apellido_paterno", &form.apellido_paterno);
        c.correo("correo", &form.correo);

        let nacimiento = c.fecha("fecha_nacimiento", &form.fecha_nacimiento);
        let ingreso = c.fecha("fecha_ingreso", &form.fecha_ingreso);

        if let Some(nacimiento) = nacimiento {
            if nacimiento > self.today {
                c.push("fecha_nacimiento", "No puede ser futura");
            }
            if let Some(ingreso) = ingreso {
                if ingreso <= nacimiento {
                    c.push("fecha_ingreso", "Debe ser posterior a la fecha de nacimiento");
                }
            }
        }

        c.finish()
    }

    pub fn validate_ficha(&self, form: &FichaInput) -> ValidationResult {
        let mut c = Collector::new();

        c.required("cargo", &form.cargo);
        c.required("area", &form.area);
        c.positive("sueldo_base", form.sueldo_base);

        let inicio = c.fecha("fecha_inicio_contrato", &form.fecha_inicio_contrato);
        let fin = match form.fecha_fin_contrato.as_deref() {
            Some(value) if !value.trim().is_empty() => c.fecha("fecha_fin_contrato", value),
            _ => None,
        };

        if form.tipo_contrato == TipoContrato::PlazoFijo && fin.is_none() {
            c.push("fecha_fin_contrato", "Requerida para contrato a plazo fijo");
        }
        if let (Some(inicio), Some(fin)) = (inicio, fin) {
            if fin < inicio {
                c.push("fecha_fin_contrato", "No puede ser anterior al inicio");
            }
        }

        c.finish()
    }

    pub fn validate_bono(&self, form: &NuevoBono) -> ValidationResult {
        let mut c = Collector::new();
        c.required("nombre", &form.nombre);
        c.positive("monto", form.monto);
        c.finish()
    }

    pub fn validate_usuario(&self, form: &NuevoUsuario) -> ValidationResult {
        let mut c = Collector::new();
        c.rut("rut", &form.rut);
        c.required("nombre", &form.nombre);
        c.correo("correo", &form.correo);
        c.finish()
    }

    pub fn validate_contraparte(&self, form: &NuevaContraparte) -> ValidationResult {
        let mut c = Collector::new();
        c.rut("rut", &form.rut);
        c.required("razon_social", &form.razon_social);
        if !form.correo.trim().is_empty() {
            c.correo("correo", &form.correo);
        }
        c.finish()
    }

    pub fn validate_compra(&self, form: &NuevaCompra) -> ValidationResult {
        let mut c = Collector::new();

        c.patente("patente", &form.patente);
        c.rut("proveedor_rut", &form.proveedor_rut);
        c.required("marca", &form.marca);
        c.required("modelo", &form.modelo);
        c.required("numero_factura", &form.numero_factura);
        c.positive("valor_compra", form.valor_compra);

        if form.avaluo_fiscal < 0 {
            c.push("avaluo_fiscal", "No puede ser negativo");
        }
        if form.anio < 1950 || form.anio > self.today.year() + 1 {
            c.push("anio", "Año fuera de rango");
        }
        if let Some(fecha) = c.fecha("fecha_compra", &form.fecha_compra) {
            if fecha > self.today {
                c.push("fecha_compra", "No puede ser futura");
            }
        }

        c.finish()
    }

    pub fn validate_venta(&self, form: &NuevaVenta) -> ValidationResult {
        let mut c = Collector::new();

        c.patente("patente", &form.patente);
        c.rut("cliente_rut", &form.cliente_rut);
        c.required("numero_factura", &form.numero_factura);
        c.positive("valor_venta", form.valor_venta);

        if let Some(fecha) = c.fecha("fecha_venta", &form.fecha_venta) {
            if fecha > self.today {
                c.push("fecha_venta", "No puede ser futura");
            }
        }

        c.finish()
    }
}

impl Default for FormValidator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
