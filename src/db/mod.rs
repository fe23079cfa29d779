// SQLite persistence
//
// Free functions over a borrowed `Connection`. One table per entity, plus
// the append-only `events` table: every mutation leaves an event behind.
// Soft-deleted rows are never removed.

mod flota;
mod personal;

pub use flota::{
    get_compra, get_contraparte, get_maquinaria, get_venta, insert_contraparte, list_compras,
    list_contrapartes, list_maquinarias, list_ventas, register_compra, register_venta,
    restore_compra, restore_venta, set_maquinaria_estado, soft_delete_compra, soft_delete_venta,
};
pub use personal::{
    assign_bono, get_bono, get_historial, get_trabajador, get_usuario, import_trabajadores_csv,
    insert_bono, insert_trabajador, insert_usuario, list_asignaciones, list_bonos,
    list_trabajadores, list_usuarios, restore_bono, restore_trabajador, soft_delete_bono,
    soft_delete_trabajador, update_ficha, update_trabajador, ImportSummary, SkippedRow,
};

use crate::error::DomainError;
use crate::lifecycle::ActiveState;
use crate::patente::Patente;
use crate::rut::Rut;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, Row, ToSql};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// EVENTS (audit trail)
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp,
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )
    .context("Failed to insert event")?;

    Ok(())
}

/// Events for one entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: row.get(1)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Shorthand used by every mutation
pub(crate) fn record(
    conn: &Connection,
    event_type: &str,
    entity_type: &str,
    entity_id: &str,
    data: serde_json::Value,
    actor: &str,
) -> Result<()> {
    insert_event(conn, &Event::new(event_type, entity_type, entity_id, data, actor))
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Open (or create) the database file and make sure the schema exists
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases answer "memory"
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    conn.pragma_update(None, "foreign_keys", true)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS trabajadores (
            id TEXT PRIMARY KEY,
            rut TEXT UNIQUE NOT NULL,
            nombres TEXT NOT NULL,
            apellido_paterno TEXT NOT NULL,
            apellido_materno TEXT NOT NULL,
            fecha_nacimiento TEXT NOT NULL,
            telefono TEXT NOT NULL,
            correo TEXT NOT NULL,
            direccion TEXT NOT NULL,
            fecha_ingreso TEXT NOT NULL,
            activo INTEGER NOT NULL DEFAULT 1,
            desactivado_en TEXT,
            desactivado_por TEXT,
            motivo TEXT,
            created_at TEXT NOT NULL
        );

        -- Every version of every ficha; the current one has valid_until NULL
        CREATE TABLE IF NOT EXISTS fichas (
            trabajador_rut TEXT NOT NULL REFERENCES trabajadores(rut),
            version INTEGER NOT NULL,
            cargo TEXT NOT NULL,
            area TEXT NOT NULL,
            tipo_contrato TEXT NOT NULL,
            jornada TEXT NOT NULL,
            sueldo_base INTEGER NOT NULL,
            fecha_inicio_contrato TEXT NOT NULL,
            fecha_fin_contrato TEXT,
            estado_laboral TEXT NOT NULL,
            valid_from TEXT NOT NULL,
            valid_until TEXT,
            changed_by TEXT NOT NULL,
            change_reason TEXT,
            PRIMARY KEY (trabajador_rut, version)
        );

        CREATE TABLE IF NOT EXISTS bonos (
            id TEXT PRIMARY KEY,
            nombre TEXT NOT NULL,
            monto INTEGER NOT NULL,
            tipo TEXT NOT NULL,
            temporalidad TEXT NOT NULL,
            descripcion TEXT NOT NULL,
            activo INTEGER NOT NULL DEFAULT 1,
            desactivado_en TEXT,
            desactivado_por TEXT,
            motivo TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS asignaciones_bono (
            id TEXT PRIMARY KEY,
            bono_id TEXT NOT NULL REFERENCES bonos(id),
            trabajador_rut TEXT NOT NULL REFERENCES trabajadores(rut),
            fecha_asignacion TEXT NOT NULL,
            observaciones TEXT NOT NULL,
            activa INTEGER NOT NULL DEFAULT 1,
            created_by TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS usuarios (
            id TEXT PRIMARY KEY,
            rut TEXT UNIQUE NOT NULL,
            nombre TEXT NOT NULL,
            correo TEXT NOT NULL,
            role TEXT NOT NULL,
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS contrapartes (
            id TEXT PRIMARY KEY,
            rut TEXT NOT NULL,
            razon_social TEXT NOT NULL,
            telefono TEXT NOT NULL,
            correo TEXT NOT NULL,
            direccion TEXT NOT NULL,
            tipo TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (rut, tipo)
        );

        CREATE TABLE IF NOT EXISTS maquinarias (
            id TEXT PRIMARY KEY,
            patente TEXT UNIQUE NOT NULL,
            grupo TEXT NOT NULL,
            marca TEXT NOT NULL,
            modelo TEXT NOT NULL,
            anio INTEGER NOT NULL,
            numero_chasis TEXT NOT NULL,
            estado TEXT NOT NULL,
            avaluo_fiscal INTEGER NOT NULL,
            en_inventario INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS compras (
            id TEXT PRIMARY KEY,
            patente TEXT UNIQUE NOT NULL REFERENCES maquinarias(patente),
            proveedor_rut TEXT NOT NULL,
            fecha_compra TEXT NOT NULL,
            valor_compra INTEGER NOT NULL,
            numero_factura TEXT NOT NULL,
            observaciones TEXT NOT NULL,
            activo INTEGER NOT NULL DEFAULT 1,
            desactivado_en TEXT,
            desactivado_por TEXT,
            motivo TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ventas (
            id TEXT PRIMARY KEY,
            patente TEXT NOT NULL REFERENCES maquinarias(patente),
            cliente_rut TEXT NOT NULL,
            fecha_venta TEXT NOT NULL,
            valor_venta INTEGER NOT NULL,
            numero_factura TEXT NOT NULL,
            observaciones TEXT NOT NULL,
            activo INTEGER NOT NULL DEFAULT 1,
            desactivado_en TEXT,
            desactivado_por TEXT,
            motivo TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_asignaciones_trabajador ON asignaciones_bono(trabajador_rut);
        CREATE INDEX IF NOT EXISTS idx_ventas_patente ON ventas(patente);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
        ",
    )
    .context("Failed to create schema")?;

    Ok(())
}

// ============================================================================
// ROW HELPERS
// ============================================================================

/// Reads the four soft-delete columns starting at `idx`
pub(crate) fn active_state(row: &Row, idx: usize) -> rusqlite::Result<ActiveState> {
    Ok(ActiveState {
        active: row.get(idx)?,
        deactivated_at: row.get(idx + 1)?,
        deactivated_by: row.get(idx + 2)?,
        reason: row.get(idx + 3)?,
    })
}

pub(crate) fn write_state(
    conn: &Connection,
    table: &str,
    key_column: &str,
    key: &str,
    state: &ActiveState,
) -> Result<()> {
    let sql = format!(
        "UPDATE {table} SET activo = ?1, desactivado_en = ?2, desactivado_por = ?3, motivo = ?4
         WHERE {key_column} = ?5"
    );
    conn.execute(
        &sql,
        params![
            state.active,
            state.deactivated_at,
            state.deactivated_by,
            state.reason,
            key
        ],
    )
    .with_context(|| format!("Failed to update state in {table}"))?;
    Ok(())
}

/// Snake_case enum column
pub(crate) fn text_enum<T>(
    row: &Row,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown value {raw:?}").into(),
        )
    })
}

/// UNIQUE / PRIMARY KEY violations become `DomainError::AlreadyExists`
pub(crate) fn unique_violation(
    err: rusqlite::Error,
    entity: &'static str,
    key: impl Into<String>,
) -> anyhow::Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            DomainError::already_exists(entity, key).into()
        }
        other => anyhow::Error::new(other).context(format!("Failed to insert {entity}")),
    }
}

// Natural keys are stored in their cleaned form ("123456785", "AB1234")

impl ToSql for Rut {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Rut {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Rut::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Patente {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Patente {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Patente::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }
}
