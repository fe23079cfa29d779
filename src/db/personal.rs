// Personal: trabajadores, their fichas, bonos and usuarios

use super::{active_state, record, text_enum, unique_violation, write_state};
use crate::entities::{
    AsignacionBono, Bono, EstadoLaboral, FichaEmpresa, FichaInput, HistorialLaboral, Jornada,
    NuevaAsignacion, NuevoTrabajador, Temporalidad, TipoBono, TipoContrato, Trabajador,
    TrabajadorPatch, Usuario,
};
use crate::error::DomainError;
use crate::forms::FormValidator;
use crate::lifecycle::{visible, SoftDelete};
use crate::roles::Role;
use crate::rut::Rut;
use crate::temporal::{Diff, Timeline, Version};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// TRABAJADORES
// ============================================================================

const TRABAJADOR_COLUMNS: &str = "id, rut, nombres, apellido_paterno, apellido_materno,
    fecha_nacimiento, telefono, correo, direccion, fecha_ingreso,
    activo, desactivado_en, desactivado_por, motivo, created_at";

fn row_to_trabajador(row: &Row) -> rusqlite::Result<Trabajador> {
    Ok(Trabajador {
        id: row.get(0)?,
        rut: row.get(1)?,
        nombres: row.get(2)?,
        apellido_paterno: row.get(3)?,
        apellido_materno: row.get(4)?,
        fecha_nacimiento: row.get(5)?,
        telefono: row.get(6)?,
        correo: row.get(7)?,
        direccion: row.get(8)?,
        fecha_ingreso: row.get(9)?,
        estado: active_state(row, 10)?,
        created_at: row.get(14)?,
    })
}

pub fn insert_trabajador(conn: &Connection, trabajador: &Trabajador, actor: &str) -> Result<()> {
    let t = trabajador;
    conn.execute(
        &format!(
            "INSERT INTO trabajadores ({TRABAJADOR_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            t.id,
            t.rut,
            t.nombres,
            t.apellido_paterno,
            t.apellido_materno,
            t.fecha_nacimiento,
            t.telefono,
            t.correo,
            t.direccion,
            t.fecha_ingreso,
            t.estado.active,
            t.estado.deactivated_at,
            t.estado.deactivated_by,
            t.estado.reason,
            t.created_at,
        ],
    )
    .map_err(|e| unique_violation(e, "trabajador", t.rut.to_string()))?;

    record(
        conn,
        "trabajador_registrado",
        "trabajador",
        t.rut.as_str(),
        json!({ "nombre": t.nombre_completo() }),
        actor,
    )?;
    info!(rut = %t.rut, actor, "trabajador registered");
    Ok(())
}

pub fn get_trabajador(conn: &Connection, rut: &Rut) -> Result<Option<Trabajador>> {
    let trabajador = conn
        .query_row(
            &format!("SELECT {TRABAJADOR_COLUMNS} FROM trabajadores WHERE rut = ?1"),
            params![rut],
            row_to_trabajador,
        )
        .optional()?;
    Ok(trabajador)
}

fn require_trabajador(conn: &Connection, rut: &Rut) -> Result<Trabajador> {
    get_trabajador(conn, rut)?
        .ok_or_else(|| DomainError::not_found("trabajador", rut.to_string()).into())
}

pub fn list_trabajadores(conn: &Connection, include_inactive: bool) -> Result<Vec<Trabajador>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRABAJADOR_COLUMNS} FROM trabajadores
         ORDER BY apellido_paterno, apellido_materno, nombres"
    ))?;
    let all = stmt
        .query_map([], row_to_trabajador)?
        .collect::<Result<Vec<_>, _>>()?;

    debug!(total = all.len(), include_inactive, "listed trabajadores");
    Ok(visible(all, include_inactive))
}

/// Apply a contact-data patch. The RUT is never touched.
pub fn update_trabajador(
    conn: &Connection,
    rut: &Rut,
    patch: TrabajadorPatch,
    actor: &str,
) -> Result<Trabajador> {
    let mut t = require_trabajador(conn, rut)?;
    let changed = t.apply_patch(patch)?;
    if changed.is_empty() {
        return Ok(t);
    }

    conn.execute(
        "UPDATE trabajadores
         SET nombres = ?1, apellido_paterno = ?2, apellido_materno = ?3,
             telefono = ?4, correo = ?5, direccion = ?6
         WHERE rut = ?7",
        params![
            t.nombres,
            t.apellido_paterno,
            t.apellido_materno,
            t.telefono,
            t.correo,
            t.direccion,
            rut
        ],
    )
    .context("Failed to update trabajador")?;

    record(
        conn,
        "trabajador_actualizado",
        "trabajador",
        rut.as_str(),
        json!({ "campos": changed }),
        actor,
    )?;
    info!(rut = %rut, actor, fields = ?changed, "trabajador updated");
    Ok(t)
}

/// Soft-delete a worker. Their ficha gets a final Desvinculado version and
/// their active bono assignments end.
pub fn soft_delete_trabajador(
    conn: &Connection,
    rut: &Rut,
    actor: &str,
    reason: Option<String>,
) -> Result<Trabajador> {
    let tx = conn.unchecked_transaction()?;

    let mut t = require_trabajador(&tx, rut)?;
    t.soft_delete(actor, reason.clone())?;
    write_state(&tx, "trabajadores", "rut", rut.as_str(), &t.estado)?;

    if let Some(mut historial) = get_historial(&tx, rut)? {
        let desvinculado = historial.current().value.with_estado(EstadoLaboral::Desvinculado);
        if desvinculado != historial.current().value {
            append_ficha_version(&tx, &mut historial, desvinculado, actor, reason.clone())?;
        }
    }

    let ended = tx.execute(
        "UPDATE asignaciones_bono SET activa = 0 WHERE trabajador_rut = ?1 AND activa = 1",
        params![rut],
    )?;

    record(
        &tx,
        "trabajador_desactivado",
        "trabajador",
        rut.as_str(),
        json!({ "motivo": reason, "bonos_terminados": ended }),
        actor,
    )?;
    tx.commit()?;

    info!(rut = %rut, actor, "trabajador deactivated");
    Ok(t)
}

/// Estado a worker had before leaving: the latest one that is not
/// Desvinculado, or Activo if there is none
fn estado_previo(historial: &HistorialLaboral) -> EstadoLaboral {
    historial
        .history()
        .iter()
        .rev()
        .map(|v| v.value.estado_laboral)
        .find(|e| *e != EstadoLaboral::Desvinculado)
        .unwrap_or(EstadoLaboral::Activo)
}

/// Restore a worker; their ficha gets back the estado it had before the
/// soft delete. Ended bono assignments stay ended.
pub fn restore_trabajador(conn: &Connection, rut: &Rut, actor: &str) -> Result<Trabajador> {
    let tx = conn.unchecked_transaction()?;

    let mut t = require_trabajador(&tx, rut)?;
    t.restore()?;
    write_state(&tx, "trabajadores", "rut", rut.as_str(), &t.estado)?;

    if let Some(mut historial) = get_historial(&tx, rut)? {
        let previo = historial.current().value.with_estado(estado_previo(&historial));
        if previo != historial.current().value {
            append_ficha_version(
                &tx,
                &mut historial,
                previo,
                actor,
                Some("reincorporación".to_string()),
            )?;
        }
    }

    record(&tx, "trabajador_restaurado", "trabajador", rut.as_str(), json!({}), actor)?;
    tx.commit()?;

    info!(rut = %rut, actor, "trabajador restored");
    Ok(t)
}

// ============================================================================
// FICHAS (versioned)
// ============================================================================

const FICHA_COLUMNS: &str = "trabajador_rut, version, cargo, area, tipo_contrato, jornada,
    sueldo_base, fecha_inicio_contrato, fecha_fin_contrato, estado_laboral,
    valid_from, valid_until, changed_by, change_reason";

fn row_to_ficha_version(row: &Row) -> rusqlite::Result<Version<FichaEmpresa>> {
    Ok(Version {
        value: FichaEmpresa {
            trabajador_rut: row.get(0)?,
            cargo: row.get(2)?,
            area: row.get(3)?,
            tipo_contrato: text_enum(row, 4, TipoContrato::parse)?,
            jornada: text_enum(row, 5, Jornada::parse)?,
            sueldo_base: row.get(6)?,
            fecha_inicio_contrato: row.get(7)?,
            fecha_fin_contrato: row.get(8)?,
            estado_laboral: text_enum(row, 9, EstadoLaboral::parse)?,
        },
        version: row.get(1)?,
        valid_from: row.get(10)?,
        valid_until: row.get(11)?,
        changed_by: row.get(12)?,
        change_reason: row.get(13)?,
    })
}

fn insert_ficha_version(conn: &Connection, v: &Version<FichaEmpresa>) -> Result<()> {
    let f = &v.value;
    conn.execute(
        &format!(
            "INSERT INTO fichas ({FICHA_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        params![
            f.trabajador_rut,
            v.version,
            f.cargo,
            f.area,
            f.tipo_contrato.as_str(),
            f.jornada.as_str(),
            f.sueldo_base,
            f.fecha_inicio_contrato,
            f.fecha_fin_contrato,
            f.estado_laboral.as_str(),
            v.valid_from,
            v.valid_until,
            v.changed_by,
            v.change_reason,
        ],
    )
    .map_err(|e| {
        unique_violation(
            e,
            "versión de ficha",
            format!("{} v{}", f.trabajador_rut, v.version),
        )
    })?;
    Ok(())
}

/// Close the current version on disk and append the new one
fn append_ficha_version(
    conn: &Connection,
    historial: &mut HistorialLaboral,
    ficha: FichaEmpresa,
    actor: &str,
    reason: Option<String>,
) -> Result<i64> {
    let previous = historial.current().version;
    let next = historial.update(ficha, actor, reason);

    let closed_at = historial
        .at_version(previous)
        .and_then(|v| v.valid_until);
    conn.execute(
        "UPDATE fichas SET valid_until = ?1 WHERE trabajador_rut = ?2 AND version = ?3",
        params![closed_at, historial.current().value.trabajador_rut, previous],
    )
    .context("Failed to close ficha version")?;

    insert_ficha_version(conn, historial.current())?;
    Ok(next)
}

/// Full ficha history of a worker; `None` if no ficha was ever recorded
pub fn get_historial(conn: &Connection, rut: &Rut) -> Result<Option<HistorialLaboral>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FICHA_COLUMNS} FROM fichas WHERE trabajador_rut = ?1 ORDER BY version"
    ))?;
    let versions = stmt
        .query_map(params![rut], row_to_ficha_version)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Timeline::from_versions(versions))
}

/// Record a ficha for an active worker: the first call creates version 1,
/// later calls append a version. Submitting the current values again is a
/// no-op.
pub fn update_ficha(
    conn: &Connection,
    rut: &Rut,
    form: FichaInput,
    validator: &FormValidator,
    actor: &str,
    reason: Option<String>,
) -> Result<HistorialLaboral> {
    let tx = conn.unchecked_transaction()?;

    let trabajador = require_trabajador(&tx, rut)?;
    if !trabajador.is_active() {
        return Err(DomainError::Conflict(format!("el trabajador {} está inactivo", rut)).into());
    }

    let ficha = FichaEmpresa::from_form(rut.clone(), form, validator)?;

    let historial = match get_historial(&tx, rut)? {
        None => {
            let historial = Timeline::new(ficha, actor);
            insert_ficha_version(&tx, historial.current())?;
            record(&tx, "ficha_creada", "trabajador", rut.as_str(), json!({ "version": 1 }), actor)?;
            historial
        }
        Some(historial) if historial.current().value == ficha => return Ok(historial),
        Some(mut historial) => {
            let changed = historial.current().value.changed_fields(&ficha);
            let version = append_ficha_version(&tx, &mut historial, ficha, actor, reason)?;
            record(
                &tx,
                "ficha_actualizada",
                "trabajador",
                rut.as_str(),
                json!({ "version": version, "campos": changed }),
                actor,
            )?;
            historial
        }
    };

    tx.commit()?;
    info!(rut = %rut, actor, version = historial.current().version, "ficha recorded");
    Ok(historial)
}

// ============================================================================
// BONOS
// ============================================================================

const BONO_COLUMNS: &str = "id, nombre, monto, tipo, temporalidad, descripcion,
    activo, desactivado_en, desactivado_por, motivo, created_at";

fn row_to_bono(row: &Row) -> rusqlite::Result<Bono> {
    Ok(Bono {
        id: row.get(0)?,
        nombre: row.get(1)?,
        monto: row.get(2)?,
        tipo: text_enum(row, 3, TipoBono::parse)?,
        temporalidad: text_enum(row, 4, Temporalidad::parse)?,
        descripcion: row.get(5)?,
        estado: active_state(row, 6)?,
        created_at: row.get(10)?,
    })
}

pub fn insert_bono(conn: &Connection, bono: &Bono, actor: &str) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bonos ({BONO_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            bono.id,
            bono.nombre,
            bono.monto,
            bono.tipo.as_str(),
            bono.temporalidad.as_str(),
            bono.descripcion,
            bono.estado.active,
            bono.estado.deactivated_at,
            bono.estado.deactivated_by,
            bono.estado.reason,
            bono.created_at,
        ],
    )
    .map_err(|e| unique_violation(e, "bono", bono.id.clone()))?;

    record(
        conn,
        "bono_creado",
        "bono",
        &bono.id,
        json!({ "nombre": bono.nombre, "monto": bono.monto }),
        actor,
    )?;
    info!(bono = %bono.nombre, actor, "bono created");
    Ok(())
}

pub fn get_bono(conn: &Connection, id: &str) -> Result<Option<Bono>> {
    let bono = conn
        .query_row(
            &format!("SELECT {BONO_COLUMNS} FROM bonos WHERE id = ?1"),
            params![id],
            row_to_bono,
        )
        .optional()?;
    Ok(bono)
}

fn require_bono(conn: &Connection, id: &str) -> Result<Bono> {
    get_bono(conn, id)?.ok_or_else(|| DomainError::not_found("bono", id).into())
}

pub fn list_bonos(conn: &Connection, include_inactive: bool) -> Result<Vec<Bono>> {
    let mut stmt = conn.prepare(&format!("SELECT {BONO_COLUMNS} FROM bonos ORDER BY nombre"))?;
    let all = stmt
        .query_map([], row_to_bono)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(visible(all, include_inactive))
}

pub fn soft_delete_bono(
    conn: &Connection,
    id: &str,
    actor: &str,
    reason: Option<String>,
) -> Result<Bono> {
    let mut bono = require_bono(conn, id)?;
    bono.soft_delete(actor, reason.clone())?;
    write_state(conn, "bonos", "id", id, &bono.estado)?;
    record(conn, "bono_desactivado", "bono", id, json!({ "motivo": reason }), actor)?;
    info!(bono = %bono.nombre, actor, "bono deactivated");
    Ok(bono)
}

pub fn restore_bono(conn: &Connection, id: &str, actor: &str) -> Result<Bono> {
    let mut bono = require_bono(conn, id)?;
    bono.restore()?;
    write_state(conn, "bonos", "id", id, &bono.estado)?;
    record(conn, "bono_restaurado", "bono", id, json!({}), actor)?;
    info!(bono = %bono.nombre, actor, "bono restored");
    Ok(bono)
}

fn row_to_asignacion(row: &Row) -> rusqlite::Result<AsignacionBono> {
    Ok(AsignacionBono {
        id: row.get(0)?,
        bono_id: row.get(1)?,
        trabajador_rut: row.get(2)?,
        fecha_asignacion: row.get(3)?,
        observaciones: row.get(4)?,
        activa: row.get(5)?,
        created_by: row.get(6)?,
    })
}

/// Every assignment a worker ever had, ended ones included
pub fn list_asignaciones(conn: &Connection, rut: &Rut) -> Result<Vec<AsignacionBono>> {
    let mut stmt = conn.prepare(
        "SELECT id, bono_id, trabajador_rut, fecha_asignacion, observaciones, activa, created_by
         FROM asignaciones_bono
         WHERE trabajador_rut = ?1
         ORDER BY fecha_asignacion",
    )?;
    let asignaciones = stmt
        .query_map(params![rut], row_to_asignacion)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(asignaciones)
}

pub fn assign_bono(
    conn: &Connection,
    rut: &Rut,
    form: NuevaAsignacion,
    actor: &str,
) -> Result<AsignacionBono> {
    let trabajador = require_trabajador(conn, rut)?;
    let bono = require_bono(conn, &form.bono_id)?;
    let existing = list_asignaciones(conn, rut)?;

    let a = AsignacionBono::asignar(&bono, rut, trabajador.is_active(), &existing, form, actor)?;

    conn.execute(
        "INSERT INTO asignaciones_bono (
            id, bono_id, trabajador_rut, fecha_asignacion, observaciones, activa, created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            a.id,
            a.bono_id,
            a.trabajador_rut,
            a.fecha_asignacion,
            a.observaciones,
            a.activa,
            a.created_by
        ],
    )
    .context("Failed to insert bono assignment")?;

    record(
        conn,
        "bono_asignado",
        "trabajador",
        rut.as_str(),
        json!({ "bono_id": bono.id, "bono": bono.nombre, "monto": bono.monto }),
        actor,
    )?;
    info!(rut = %rut, bono = %bono.nombre, actor, "bono assigned");
    Ok(a)
}

// ============================================================================
// USUARIOS
// ============================================================================

const USUARIO_COLUMNS: &str = "id, rut, nombre, correo, role, activo, created_at";

fn row_to_usuario(row: &Row) -> rusqlite::Result<Usuario> {
    Ok(Usuario {
        id: row.get(0)?,
        rut: row.get(1)?,
        nombre: row.get(2)?,
        correo: row.get(3)?,
        role: text_enum(row, 4, |s| s.parse::<Role>().ok())?,
        activo: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_usuario(conn: &Connection, usuario: &Usuario, actor: &str) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO usuarios ({USUARIO_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            usuario.id,
            usuario.rut,
            usuario.nombre,
            usuario.correo,
            usuario.role.as_str(),
            usuario.activo,
            usuario.created_at,
        ],
    )
    .map_err(|e| unique_violation(e, "usuario", usuario.rut.to_string()))?;

    record(
        conn,
        "usuario_creado",
        "usuario",
        usuario.rut.as_str(),
        json!({ "role": usuario.role.as_str() }),
        actor,
    )?;
    info!(rut = %usuario.rut, role = %usuario.role, actor, "usuario created");
    Ok(())
}

pub fn get_usuario(conn: &Connection, rut: &Rut) -> Result<Option<Usuario>> {
    let usuario = conn
        .query_row(
            &format!("SELECT {USUARIO_COLUMNS} FROM usuarios WHERE rut = ?1"),
            params![rut],
            row_to_usuario,
        )
        .optional()?;
    Ok(usuario)
}

pub fn list_usuarios(conn: &Connection) -> Result<Vec<Usuario>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USUARIO_COLUMNS} FROM usuarios ORDER BY nombre"))?;
    let usuarios = stmt
        .query_map([], row_to_usuario)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(usuarios)
}

// ============================================================================
// ROSTER IMPORT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    /// 1-based line in the file, header included
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Bulk-load a roster CSV whose header matches `NuevoTrabajador`.
///
/// Importing the same file twice inserts nothing the second time: rows whose
/// RUT is already registered are counted as duplicates. Rows that fail to
/// parse or validate are skipped and reported.
pub fn import_trabajadores_csv(
    conn: &Connection,
    csv_path: &Path,
    validator: &FormValidator,
    actor: &str,
) -> Result<ImportSummary> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    let tx = conn.unchecked_transaction()?;
    let mut summary = ImportSummary::default();

    for (index, result) in rdr.deserialize::<NuevoTrabajador>().enumerate() {
        let line = index as u64 + 2;

        let outcome = result
            .map_err(|e| e.to_string())
            .and_then(|form| Trabajador::from_form(form, validator).map_err(|e| e.to_string()));

        let trabajador = match outcome {
            Ok(t) => t,
            Err(reason) => {
                warn!(line, %reason, "skipping roster row");
                summary.skipped.push(SkippedRow { line, reason });
                continue;
            }
        };

        match insert_trabajador(&tx, &trabajador, actor) {
            Ok(()) => summary.inserted += 1,
            Err(e) => match e.downcast_ref::<DomainError>() {
                Some(DomainError::AlreadyExists { .. }) => summary.duplicates += 1,
                _ => return Err(e),
            },
        }
    }

    tx.commit()?;

    info!(
        file = %csv_path.display(),
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        skipped = summary.skipped.len(),
        "roster imported"
    );
    Ok(summary)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::get_events_for_entity;
    use crate::db::test_support::memory_db;
    use crate::entities::{NuevoBono, NuevoUsuario};
    use crate::roles::Role;
    use std::io::Write;

    fn form(rut: &str, nombres: &str) -> NuevoTrabajador {
        NuevoTrabajador {
            rut: rut.to_string(),
            nombres: nombres.to_string(),
            apellido_paterno: "Soto".to_string(),
            apellido_materno: String::new(),
            fecha_nacimiento: "1985-07-20".to_string(),
            telefono: String::new(),
            correo: "trabajador@empresa.cl".to_string(),
            direccion: String::new(),
            fecha_ingreso: "2015-03-01".to_string(),
        }
    }

    fn registrar(conn: &Connection, rut: &str) -> Trabajador {
        let t = Trabajador::from_form(form(rut, "Pedro"), &FormValidator::new()).unwrap();
        insert_trabajador(conn, &t, "rrhh").unwrap();
        t
    }

    fn ficha_form(cargo: &str, sueldo: i64) -> FichaInput {
        FichaInput {
            cargo: cargo.to_string(),
            area: "Faena".to_string(),
            tipo_contrato: TipoContrato::Indefinido,
            jornada: Jornada::Completa,
            sueldo_base: sueldo,
            fecha_inicio_contrato: "2015-03-01".to_string(),
            fecha_fin_contrato: None,
            estado_laboral: EstadoLaboral::Activo,
        }
    }

    fn bono(conn: &Connection) -> Bono {
        let b = Bono::from_form(
            NuevoBono {
                nombre: "Bono faena".to_string(),
                monto: 80_000,
                tipo: TipoBono::Imponible,
                temporalidad: Temporalidad::Permanente,
                descripcion: String::new(),
            },
            &FormValidator::new(),
        )
        .unwrap();
        insert_bono(conn, &b, "rrhh").unwrap();
        b
    }

    fn asignacion(bono: &Bono) -> NuevaAsignacion {
        NuevaAsignacion {
            bono_id: bono.id.clone(),
            fecha_asignacion: "2024-01-01".to_string(),
            observaciones: String::new(),
        }
    }

    #[test]
    fn test_insert_and_get_trabajador() {
        let conn = memory_db();
        let t = registrar(&conn, "12.345.678-5");

        let back = get_trabajador(&conn, &t.rut).unwrap().unwrap();
        assert_eq!(back, t);

        let events = get_events_for_entity(&conn, "trabajador", "123456785").unwrap();
        assert_eq!(events[0].event_type, "trabajador_registrado");
    }

    #[test]
    fn test_duplicate_rut_is_already_exists() {
        let conn = memory_db();
        registrar(&conn, "12.345.678-5");

        let again = Trabajador::from_form(form("12345678-5", "Otro"), &FormValidator::new()).unwrap();
        let err = insert_trabajador(&conn, &again, "rrhh").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_soft_delete_and_restore_trabajador() {
        let conn = memory_db();
        let t = registrar(&conn, "12.345.678-5");
        registrar(&conn, "11.111.111-1");

        soft_delete_trabajador(&conn, &t.rut, "rrhh", Some("renuncia".to_string())).unwrap();
        assert_eq!(list_trabajadores(&conn, false).unwrap().len(), 1);
        assert_eq!(list_trabajadores(&conn, true).unwrap().len(), 2);

        let stored = get_trabajador(&conn, &t.rut).unwrap().unwrap();
        assert!(!stored.is_active());
        assert_eq!(stored.estado.reason.as_deref(), Some("renuncia"));

        let err = soft_delete_trabajador(&conn, &t.rut, "rrhh", None).unwrap_err();
        assert_eq!(err.downcast_ref::<DomainError>(), Some(&DomainError::AlreadyInactive));

        restore_trabajador(&conn, &t.rut, "rrhh").unwrap();
        assert_eq!(list_trabajadores(&conn, false).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_trabajador_is_not_found() {
        let conn = memory_db();
        let rut = Rut::parse("11.111.111-1").unwrap();
        let err = soft_delete_trabajador(&conn, &rut, "rrhh", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::NotFound { entity: "trabajador", .. })
        ));
    }

    #[test]
    fn test_update_trabajador_keeps_rut() {
        let conn = memory_db();
        let t = registrar(&conn, "12.345.678-5");

        let patch = TrabajadorPatch {
            telefono: Some("+56 9 8765 4321".to_string()),
            ..Default::default()
        };
        let updated = update_trabajador(&conn, &t.rut, patch, "rrhh").unwrap();
        assert_eq!(updated.telefono, "+56 9 8765 4321");
        assert_eq!(updated.rut, t.rut);

        let stored = get_trabajador(&conn, &t.rut).unwrap().unwrap();
        assert_eq!(stored.telefono, "+56 9 8765 4321");
    }

    #[test]
    fn test_ficha_versions() {
        let conn = memory_db();
        let t = registrar(&conn, "12.345.678-5");
        let v = FormValidator::new();

        let h = update_ficha(&conn, &t.rut, ficha_form("Operador", 800_000), &v, "rrhh", None).unwrap();
        assert_eq!(h.version_count(), 1);

        // Same values again: no new version
        let h = update_ficha(&conn, &t.rut, ficha_form("Operador", 800_000), &v, "rrhh", None).unwrap();
        assert_eq!(h.version_count(), 1);

        update_ficha(
            &conn,
            &t.rut,
            ficha_form("Jefe de faena", 1_200_000),
            &v,
            "rrhh",
            Some("ascenso".to_string()),
        )
        .unwrap();

        let h = get_historial(&conn, &t.rut).unwrap().unwrap();
        assert_eq!(h.version_count(), 2);
        assert_eq!(h.current().value.cargo, "Jefe de faena");
        assert_eq!(h.current().change_reason.as_deref(), Some("ascenso"));
        assert!(!h.history()[0].is_current());
        assert_eq!(h.changes_between(1, 2), Some(vec!["cargo", "sueldo_base"]));
    }

    #[test]
    fn test_ficha_follows_worker_lifecycle() {
        let conn = memory_db();
        let t = registrar(&conn, "12.345.678-5");
        let v = FormValidator::new();
        update_ficha(&conn, &t.rut, ficha_form("Operador", 800_000), &v, "rrhh", None).unwrap();

        soft_delete_trabajador(&conn, &t.rut, "rrhh", None).unwrap();
        let h = get_historial(&conn, &t.rut).unwrap().unwrap();
        assert_eq!(h.current().value.estado_laboral, EstadoLaboral::Desvinculado);

        let err = update_ficha(&conn, &t.rut, ficha_form("Operador", 900_000), &v, "rrhh", None)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::Conflict(_))));

        restore_trabajador(&conn, &t.rut, "rrhh").unwrap();
        let h = get_historial(&conn, &t.rut).unwrap().unwrap();
        assert_eq!(h.version_count(), 3);
        assert_eq!(h.current().value.estado_laboral, EstadoLaboral::Activo);
    }

    #[test]
    fn test_restore_keeps_estado_before_leaving() {
        let conn = memory_db();
        let t = registrar(&conn, "12.345.678-5");
        let v = FormValidator::new();
        let mut licencia = ficha_form("Operador", 800_000);
        licencia.estado_laboral = EstadoLaboral::Licencia;
        update_ficha(&conn, &t.rut, licencia, &v, "rrhh", None).unwrap();

        soft_delete_trabajador(&conn, &t.rut, "rrhh", None).unwrap();
        restore_trabajador(&conn, &t.rut, "rrhh").unwrap();

        let h = get_historial(&conn, &t.rut).unwrap().unwrap();
        assert_eq!(h.version_count(), 3);
        assert_eq!(h.current().value.estado_laboral, EstadoLaboral::Licencia);
        assert_eq!(h.current().value.cargo, "Operador");
    }

    #[test]
    fn test_bono_assignment() {
        let conn = memory_db();
        let t = registrar(&conn, "12.345.678-5");
        let b = bono(&conn);

        assign_bono(&conn, &t.rut, asignacion(&b), "rrhh").unwrap();
        let err = assign_bono(&conn, &t.rut, asignacion(&b), "rrhh").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::AlreadyExists { .. })
        ));

        // Leaving the company ends the assignment
        soft_delete_trabajador(&conn, &t.rut, "rrhh", None).unwrap();
        let asignaciones = list_asignaciones(&conn, &t.rut).unwrap();
        assert_eq!(asignaciones.len(), 1);
        assert!(!asignaciones[0].activa);
    }

    #[test]
    fn test_inactive_bono_cannot_be_assigned() {
        let conn = memory_db();
        let t = registrar(&conn, "12.345.678-5");
        let b = bono(&conn);

        soft_delete_bono(&conn, &b.id, "rrhh", None).unwrap();
        assert!(list_bonos(&conn, false).unwrap().is_empty());
        assert_eq!(list_bonos(&conn, true).unwrap().len(), 1);

        assert!(assign_bono(&conn, &t.rut, asignacion(&b), "rrhh").is_err());

        restore_bono(&conn, &b.id, "rrhh").unwrap();
        assert!(assign_bono(&conn, &t.rut, asignacion(&b), "rrhh").is_ok());
    }

    #[test]
    fn test_usuarios() {
        let conn = memory_db();
        let u = Usuario::from_form(
            NuevoUsuario {
                rut: "11.111.111-1".to_string(),
                nombre: "Gerente".to_string(),
                correo: "gerencia@empresa.cl".to_string(),
                role: Role::Gerencia,
            },
            &FormValidator::new(),
        )
        .unwrap();
        insert_usuario(&conn, &u, "admin").unwrap();

        let back = get_usuario(&conn, &u.rut).unwrap().unwrap();
        assert_eq!(back.role, Role::Gerencia);
        assert_eq!(list_usuarios(&conn).unwrap().len(), 1);
        assert!(insert_usuario(&conn, &u, "admin").is_err());
    }

    #[test]
    fn test_import_csv_twice() {
        let conn = memory_db();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "rut,nombres,apellido_paterno,apellido_materno,fecha_nacimiento,telefono,correo,direccion,fecha_ingreso"
        )
        .unwrap();
        writeln!(file, "12.345.678-5,Ana,Rojas,,1990-01-01,,ana@empresa.cl,,2020-01-01").unwrap();
        writeln!(file, "11111111-1,Luis,Muñoz,Vera,02-02-1988,,luis@empresa.cl,,2019-05-01").unwrap();
        writeln!(file, "12345678-0,Malo,Digito,,1990-01-01,,x@empresa.cl,,2020-01-01").unwrap();
        file.flush().unwrap();

        let v = FormValidator::new();
        let first = import_trabajadores_csv(&conn, file.path(), &v, "importador").unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.duplicates, 0);
        assert_eq!(first.skipped.len(), 1);
        assert_eq!(first.skipped[0].line, 4);

        let second = import_trabajadores_csv(&conn, file.path(), &v, "importador").unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);

        assert_eq!(list_trabajadores(&conn, true).unwrap().len(), 2);
    }

    #[test]
    fn test_import_missing_file_errors() {
        let conn = memory_db();
        let result = import_trabajadores_csv(
            &conn,
            Path::new("/nonexistent/roster.csv"),
            &FormValidator::new(),
            "importador",
        );
        assert!(result.is_err());
    }
}
