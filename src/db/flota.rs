// Flota: contrapartes, maquinarias, compras and ventas
//
// A machine row is created by its compra and its estado is only ever
// written together with the compra or venta that caused the change, inside
// one SQLite transaction.

use super::{active_state, record, text_enum, unique_violation, write_state};
use crate::entities::{
    CompraMaquinaria, Contraparte, EstadoMaquinaria, GrupoMaquinaria, Maquinaria, NuevaCompra,
    NuevaVenta, TipoContraparte, VentaMaquinaria,
};
use crate::error::DomainError;
use crate::forms::FormValidator;
use crate::lifecycle::visible;
use crate::patente::Patente;
use crate::rut::Rut;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::json;
use tracing::{debug, info};

// ============================================================================
// CONTRAPARTES
// ============================================================================

const CONTRAPARTE_COLUMNS: &str =
    "id, rut, razon_social, telefono, correo, direccion, tipo, created_at";

fn row_to_contraparte(row: &Row) -> rusqlite::Result<Contraparte> {
    Ok(Contraparte {
        id: row.get(0)?,
        rut: row.get(1)?,
        razon_social: row.get(2)?,
        telefono: row.get(3)?,
        correo: row.get(4)?,
        direccion: row.get(5)?,
        tipo: text_enum(row, 6, TipoContraparte::parse)?,
        created_at: row.get(7)?,
    })
}

pub fn insert_contraparte(conn: &Connection, c: &Contraparte, actor: &str) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO contrapartes ({CONTRAPARTE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ),
        params![
            c.id,
            c.rut,
            c.razon_social,
            c.telefono,
            c.correo,
            c.direccion,
            c.tipo.as_str(),
            c.created_at,
        ],
    )
    .map_err(|e| unique_violation(e, "contraparte", format!("{} ({})", c.rut, c.tipo.as_str())))?;

    record(
        conn,
        "contraparte_registrada",
        "contraparte",
        c.rut.as_str(),
        json!({ "razon_social": c.razon_social, "tipo": c.tipo.as_str() }),
        actor,
    )?;
    info!(rut = %c.rut, tipo = c.tipo.as_str(), actor, "contraparte registered");
    Ok(())
}

pub fn get_contraparte(
    conn: &Connection,
    rut: &Rut,
    tipo: TipoContraparte,
) -> Result<Option<Contraparte>> {
    let c = conn
        .query_row(
            &format!("SELECT {CONTRAPARTE_COLUMNS} FROM contrapartes WHERE rut = ?1 AND tipo = ?2"),
            params![rut, tipo.as_str()],
            row_to_contraparte,
        )
        .optional()?;
    Ok(c)
}

fn require_contraparte(conn: &Connection, rut: &Rut, tipo: TipoContraparte) -> Result<Contraparte> {
    get_contraparte(conn, rut, tipo)?
        .ok_or_else(|| DomainError::not_found(tipo.as_str(), rut.to_string()).into())
}

/// All contrapartes, or only proveedores / clientes
pub fn list_contrapartes(
    conn: &Connection,
    tipo: Option<TipoContraparte>,
) -> Result<Vec<Contraparte>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTRAPARTE_COLUMNS} FROM contrapartes
         WHERE ?1 IS NULL OR tipo = ?1
         ORDER BY razon_social"
    ))?;
    let contrapartes = stmt
        .query_map(params![tipo.map(|t| t.as_str())], row_to_contraparte)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(contrapartes)
}

// ============================================================================
// MAQUINARIAS
// ============================================================================

const MAQUINARIA_COLUMNS: &str = "id, patente, grupo, marca, modelo, anio, numero_chasis,
    estado, avaluo_fiscal, en_inventario, created_at";

fn row_to_maquinaria(row: &Row) -> rusqlite::Result<Maquinaria> {
    Ok(Maquinaria {
        id: row.get(0)?,
        patente: row.get(1)?,
        grupo: text_enum(row, 2, GrupoMaquinaria::parse)?,
        marca: row.get(3)?,
        modelo: row.get(4)?,
        anio: row.get(5)?,
        numero_chasis: row.get(6)?,
        estado: text_enum(row, 7, EstadoMaquinaria::parse)?,
        avaluo_fiscal: row.get(8)?,
        en_inventario: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn insert_maquinaria(conn: &Connection, m: &Maquinaria) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO maquinarias ({MAQUINARIA_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            m.id,
            m.patente,
            m.grupo.as_str(),
            m.marca,
            m.modelo,
            m.anio,
            m.numero_chasis,
            m.estado.as_str(),
            m.avaluo_fiscal,
            m.en_inventario,
            m.created_at,
        ],
    )
    .map_err(|e| unique_violation(e, "maquinaria", m.patente.to_string()))?;
    Ok(())
}

fn save_maquinaria_state(conn: &Connection, m: &Maquinaria) -> Result<()> {
    conn.execute(
        "UPDATE maquinarias SET estado = ?1, en_inventario = ?2 WHERE patente = ?3",
        params![m.estado.as_str(), m.en_inventario, m.patente],
    )
    .context("Failed to update maquinaria")?;
    Ok(())
}

pub fn get_maquinaria(conn: &Connection, patente: &Patente) -> Result<Option<Maquinaria>> {
    let m = conn
        .query_row(
            &format!("SELECT {MAQUINARIA_COLUMNS} FROM maquinarias WHERE patente = ?1"),
            params![patente],
            row_to_maquinaria,
        )
        .optional()?;
    Ok(m)
}

fn require_maquinaria(conn: &Connection, patente: &Patente) -> Result<Maquinaria> {
    get_maquinaria(conn, patente)?
        .ok_or_else(|| DomainError::not_found("maquinaria", patente.to_string()).into())
}

/// The fleet. Machines whose compra was annulled are left out unless
/// `include_inactive`; sold machines are listed.
pub fn list_maquinarias(conn: &Connection, include_inactive: bool) -> Result<Vec<Maquinaria>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MAQUINARIA_COLUMNS} FROM maquinarias
         WHERE en_inventario = 1 OR ?1
         ORDER BY grupo, patente"
    ))?;
    let maquinarias = stmt
        .query_map(params![include_inactive], row_to_maquinaria)?
        .collect::<Result<Vec<_>, _>>()?;

    debug!(total = maquinarias.len(), include_inactive, "listed maquinarias");
    Ok(maquinarias)
}

/// Manual estado change (rent out, send to maintenance, bring back)
pub fn set_maquinaria_estado(
    conn: &Connection,
    patente: &Patente,
    estado: EstadoMaquinaria,
    actor: &str,
) -> Result<Maquinaria> {
    let mut m = require_maquinaria(conn, patente)?;
    let from = m.estado;
    m.set_estado(estado)?;
    save_maquinaria_state(conn, &m)?;

    record(
        conn,
        "estado_cambiado",
        "maquinaria",
        patente.as_str(),
        json!({ "desde": from.as_str(), "hacia": estado.as_str() }),
        actor,
    )?;
    info!(patente = %patente, from = from.as_str(), to = estado.as_str(), actor, "maquinaria estado changed");
    Ok(m)
}

// ============================================================================
// COMPRAS
// ============================================================================

const COMPRA_COLUMNS: &str = "id, patente, proveedor_rut, fecha_compra, valor_compra,
    numero_factura, observaciones, activo, desactivado_en, desactivado_por, motivo, created_at";

fn row_to_compra(row: &Row) -> rusqlite::Result<CompraMaquinaria> {
    Ok(CompraMaquinaria {
        id: row.get(0)?,
        patente: row.get(1)?,
        proveedor_rut: row.get(2)?,
        fecha_compra: row.get(3)?,
        valor_compra: row.get(4)?,
        numero_factura: row.get(5)?,
        observaciones: row.get(6)?,
        estado: active_state(row, 7)?,
        created_at: row.get(11)?,
    })
}

/// Register a purchase from a known proveedor. The machine is created
/// Disponible in the same transaction.
pub fn register_compra(
    conn: &Connection,
    form: NuevaCompra,
    validator: &FormValidator,
    actor: &str,
) -> Result<(CompraMaquinaria, Maquinaria)> {
    let (compra, maquinaria) = CompraMaquinaria::registrar(form, validator)?;
    let proveedor = require_contraparte(conn, &compra.proveedor_rut, TipoContraparte::Proveedor)?;

    let tx = conn.unchecked_transaction()?;
    insert_maquinaria(&tx, &maquinaria)?;

    let c = &compra;
    tx.execute(
        &format!(
            "INSERT INTO compras ({COMPRA_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            c.id,
            c.patente,
            c.proveedor_rut,
            c.fecha_compra,
            c.valor_compra,
            c.numero_factura,
            c.observaciones,
            c.estado.active,
            c.estado.deactivated_at,
            c.estado.deactivated_by,
            c.estado.reason,
            c.created_at,
        ],
    )
    .map_err(|e| unique_violation(e, "compra", c.patente.to_string()))?;

    record(
        &tx,
        "compra_registrada",
        "maquinaria",
        c.patente.as_str(),
        json!({
            "compra_id": c.id,
            "proveedor": proveedor.razon_social,
            "valor_compra": c.valor_compra,
            "numero_factura": c.numero_factura,
        }),
        actor,
    )?;
    tx.commit()?;

    info!(patente = %c.patente, proveedor = %proveedor.rut, actor, "compra registered");
    Ok((compra, maquinaria))
}

pub fn get_compra(conn: &Connection, id: &str) -> Result<Option<CompraMaquinaria>> {
    let c = conn
        .query_row(
            &format!("SELECT {COMPRA_COLUMNS} FROM compras WHERE id = ?1"),
            params![id],
            row_to_compra,
        )
        .optional()?;
    Ok(c)
}

fn require_compra(conn: &Connection, id: &str) -> Result<CompraMaquinaria> {
    get_compra(conn, id)?.ok_or_else(|| DomainError::not_found("compra", id).into())
}

fn compra_for_patente(conn: &Connection, patente: &Patente) -> Result<CompraMaquinaria> {
    conn.query_row(
        &format!("SELECT {COMPRA_COLUMNS} FROM compras WHERE patente = ?1"),
        params![patente],
        row_to_compra,
    )
    .optional()?
    .ok_or_else(|| DomainError::not_found("compra", patente.to_string()).into())
}

pub fn list_compras(conn: &Connection, include_inactive: bool) -> Result<Vec<CompraMaquinaria>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPRA_COLUMNS} FROM compras ORDER BY fecha_compra DESC"
    ))?;
    let all = stmt
        .query_map([], row_to_compra)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(visible(all, include_inactive))
}

/// Annul a compra; its machine leaves the inventory
pub fn soft_delete_compra(
    conn: &Connection,
    id: &str,
    actor: &str,
    reason: Option<String>,
) -> Result<CompraMaquinaria> {
    let tx = conn.unchecked_transaction()?;

    let mut compra = require_compra(&tx, id)?;
    let mut maquinaria = require_maquinaria(&tx, &compra.patente)?;
    compra.anular(&mut maquinaria, actor, reason.clone())?;

    write_state(&tx, "compras", "id", id, &compra.estado)?;
    save_maquinaria_state(&tx, &maquinaria)?;
    record(
        &tx,
        "compra_anulada",
        "maquinaria",
        compra.patente.as_str(),
        json!({ "compra_id": id, "motivo": reason }),
        actor,
    )?;
    tx.commit()?;

    info!(patente = %compra.patente, actor, "compra annulled");
    Ok(compra)
}

pub fn restore_compra(conn: &Connection, id: &str, actor: &str) -> Result<CompraMaquinaria> {
    let tx = conn.unchecked_transaction()?;

    let mut compra = require_compra(&tx, id)?;
    let mut maquinaria = require_maquinaria(&tx, &compra.patente)?;
    compra.restaurar(&mut maquinaria)?;

    write_state(&tx, "compras", "id", id, &compra.estado)?;
    save_maquinaria_state(&tx, &maquinaria)?;
    record(
        &tx,
        "compra_restaurada",
        "maquinaria",
        compra.patente.as_str(),
        json!({ "compra_id": id }),
        actor,
    )?;
    tx.commit()?;

    info!(patente = %compra.patente, actor, "compra restored");
    Ok(compra)
}

// ============================================================================
// VENTAS
// ============================================================================

const VENTA_COLUMNS: &str = "id, patente, cliente_rut, fecha_venta, valor_venta,
    numero_factura, observaciones, activo, desactivado_en, desactivado_por, motivo, created_at";

fn row_to_venta(row: &Row) -> rusqlite::Result<VentaMaquinaria> {
    Ok(VentaMaquinaria {
        id: row.get(0)?,
        patente: row.get(1)?,
        cliente_rut: row.get(2)?,
        fecha_venta: row.get(3)?,
        valor_venta: row.get(4)?,
        numero_factura: row.get(5)?,
        observaciones: row.get(6)?,
        estado: active_state(row, 7)?,
        created_at: row.get(11)?,
    })
}

/// Sell an available machine to a known cliente
pub fn register_venta(
    conn: &Connection,
    form: NuevaVenta,
    validator: &FormValidator,
    actor: &str,
) -> Result<VentaMaquinaria> {
    validator.validate_venta(&form).map_err(DomainError::Validation)?;

    let patente = Patente::parse(&form.patente)?;
    let cliente_rut = Rut::parse(&form.cliente_rut)?;
    let cliente = require_contraparte(conn, &cliente_rut, TipoContraparte::Cliente)?;

    let tx = conn.unchecked_transaction()?;
    let mut maquinaria = require_maquinaria(&tx, &patente)?;
    let compra = compra_for_patente(&tx, &patente)?;

    let venta = VentaMaquinaria::registrar(form, &mut maquinaria, &compra, validator)?;

    let v = &venta;
    tx.execute(
        &format!(
            "INSERT INTO ventas ({VENTA_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            v.id,
            v.patente,
            v.cliente_rut,
            v.fecha_venta,
            v.valor_venta,
            v.numero_factura,
            v.observaciones,
            v.estado.active,
            v.estado.deactivated_at,
            v.estado.deactivated_by,
            v.estado.reason,
            v.created_at,
        ],
    )
    .context("Failed to insert venta")?;
    save_maquinaria_state(&tx, &maquinaria)?;

    record(
        &tx,
        "venta_registrada",
        "maquinaria",
        v.patente.as_str(),
        json!({
            "venta_id": v.id,
            "cliente": cliente.razon_social,
            "valor_venta": v.valor_venta,
            "margen": v.margen(&compra),
        }),
        actor,
    )?;
    tx.commit()?;

    info!(patente = %v.patente, cliente = %cliente.rut, actor, "venta registered");
    Ok(venta)
}

pub fn get_venta(conn: &Connection, id: &str) -> Result<Option<VentaMaquinaria>> {
    let v = conn
        .query_row(
            &format!("SELECT {VENTA_COLUMNS} FROM ventas WHERE id = ?1"),
            params![id],
            row_to_venta,
        )
        .optional()?;
    Ok(v)
}

fn require_venta(conn: &Connection, id: &str) -> Result<VentaMaquinaria> {
    get_venta(conn, id)?.ok_or_else(|| DomainError::not_found("venta", id).into())
}

pub fn list_ventas(conn: &Connection, include_inactive: bool) -> Result<Vec<VentaMaquinaria>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VENTA_COLUMNS} FROM ventas ORDER BY fecha_venta DESC"
    ))?;
    let all = stmt
        .query_map([], row_to_venta)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(visible(all, include_inactive))
}

/// Annul a venta; the machine is Disponible again
pub fn soft_delete_venta(
    conn: &Connection,
    id: &str,
    actor: &str,
    reason: Option<String>,
) -> Result<VentaMaquinaria> {
    let tx = conn.unchecked_transaction()?;

    let mut venta = require_venta(&tx, id)?;
    let mut maquinaria = require_maquinaria(&tx, &venta.patente)?;
    venta.anular(&mut maquinaria, actor, reason.clone())?;

    write_state(&tx, "ventas", "id", id, &venta.estado)?;
    save_maquinaria_state(&tx, &maquinaria)?;
    record(
        &tx,
        "venta_anulada",
        "maquinaria",
        venta.patente.as_str(),
        json!({ "venta_id": id, "motivo": reason }),
        actor,
    )?;
    tx.commit()?;

    info!(patente = %venta.patente, actor, "venta annulled");
    Ok(venta)
}

/// Restore an annulled venta; the machine must still be available
pub fn restore_venta(conn: &Connection, id: &str, actor: &str) -> Result<VentaMaquinaria> {
    let tx = conn.unchecked_transaction()?;

    let mut venta = require_venta(&tx, id)?;
    let mut maquinaria = require_maquinaria(&tx, &venta.patente)?;
    venta.restaurar(&mut maquinaria)?;

    write_state(&tx, "ventas", "id", id, &venta.estado)?;
    save_maquinaria_state(&tx, &maquinaria)?;
    record(
        &tx,
        "venta_restaurada",
        "maquinaria",
        venta.patente.as_str(),
        json!({ "venta_id": id }),
        actor,
    )?;
    tx.commit()?;

    info!(patente = %venta.patente, actor, "venta restored");
    Ok(venta)
}

// ============================================================================
// TESTS
// ============================================================================
