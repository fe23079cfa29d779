// REST API with Axum
//
// Thin JSON wrapper over `db`. The caller's role arrives already
// authenticated in the `x-gestora-rol` header; `x-gestora-rut` optionally
// names the caller so a Usuario can read their own record.

use crate::db;
use crate::entities::{
    Bono, Contraparte, EstadoMaquinaria, FichaInput, NuevaAsignacion, NuevaCompra,
    NuevaContraparte, NuevaVenta, NuevoBono, NuevoTrabajador, NuevoUsuario, TipoContraparte,
    Trabajador, TrabajadorPatch, Usuario,
};
use crate::error::DomainError;
use crate::forms::FormValidator;
use crate::patente::{self, Patente};
use crate::roles::{authorize, Action, Role};
use crate::rut::{self, Rut};
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

pub const ROLE_HEADER: &str = "x-gestora-rol";
pub const RUT_HEADER: &str = "x-gestora-rut";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("database lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn created<T: Serialize>(data: T) -> Result<Response, ApiError> {
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(data))).into_response())
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::AlreadyExists { .. }
        | DomainError::AlreadyActive
        | DomainError::AlreadyInactive
        | DomainError::InvalidTransition { .. }
        | DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::InvalidRut(_)
        | DomainError::InvalidPatente(_)
        | DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Forbidden { .. } => StatusCode::FORBIDDEN,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self {
            status: domain_status(&err),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DomainError>() {
            Some(domain) => domain.clone().into(),
            None => {
                error!(error = %format!("{err:#}"), "internal server error");
                ApiError::internal("error interno")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// Caller
// ============================================================================

#[derive(Debug, Clone)]
pub struct Caller {
    pub role: Role,
    pub rut: Option<Rut>,
}

impl Caller {
    fn require(&self, action: Action) -> Result<(), ApiError> {
        authorize(self.role, action).map_err(ApiError::from)
    }

    /// Full worker access, or a Usuario looking at their own record
    fn require_view_of(&self, rut: &Rut) -> Result<(), ApiError> {
        let own = self.role.can(Action::ViewOwnRecord) && self.rut.as_ref() == Some(rut);
        if own {
            Ok(())
        } else {
            self.require(Action::ViewWorkers)
        }
    }

    /// Audit-trail actor: the caller's RUT when known, else the role
    fn actor(&self) -> String {
        match &self.rut {
            Some(rut) => rut.to_string(),
            None => self.role.as_str().to_string(),
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let role = header(ROLE_HEADER)
            .ok_or_else(|| ApiError::unauthorized(format!("falta el encabezado {ROLE_HEADER}")))?
            .parse::<Role>()
            .map_err(ApiError::unauthorized)?;

        let rut = header(RUT_HEADER).and_then(|r| Rut::parse(&r).ok());

        Ok(Caller { role, rut })
    }
}

// ============================================================================
// Request / response shapes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub incluir_inactivos: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    pub motivo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContraparteParams {
    pub tipo: Option<TipoContraparte>,
}

#[derive(Debug, Deserialize)]
pub struct FichaRequest {
    #[serde(flatten)]
    pub ficha: FichaInput,
    pub motivo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EstadoRequest {
    pub estado: EstadoMaquinaria,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidacionResponse {
    pub valido: bool,
    pub formateado: String,
    pub mensaje: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/validar/rut/:rut
async fn validar_rut(Path(input): Path<String>) -> ApiResult<ValidacionResponse> {
    let mensaje = rut::error_message(&input);
    ok(ValidacionResponse {
        valido: mensaje.is_none(),
        formateado: rut::format(&input),
        mensaje: mensaje.map(str::to_string),
    })
}

/// GET /api/validar/patente/:patente
async fn validar_patente(Path(input): Path<String>) -> ApiResult<ValidacionResponse> {
    let formateado = patente::format(&input);
    let mensaje = patente::error_message(&formateado);
    ok(ValidacionResponse {
        valido: mensaje.is_none(),
        formateado,
        mensaje: mensaje.map(str::to_string),
    })
}

// ---- trabajadores ----------------------------------------------------------

async fn list_trabajadores(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Trabajador>> {
    caller.require(Action::ViewWorkers)?;
    let conn = state.conn()?;
    ok(db::list_trabajadores(&conn, params.incluir_inactivos)?)
}

async fn create_trabajador(
    State(state): State<AppState>,
    caller: Caller,
    Json(form): Json<NuevoTrabajador>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageWorkers)?;
    let trabajador = Trabajador::from_form(form, &FormValidator::new())?;
    let conn = state.conn()?;
    db::insert_trabajador(&conn, &trabajador, &caller.actor())?;
    created(trabajador)
}

async fn get_trabajador(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
) -> ApiResult<Trabajador> {
    let rut = Rut::parse(&rut)?;
    caller.require_view_of(&rut)?;
    let conn = state.conn()?;
    let trabajador = db::get_trabajador(&conn, &rut)?
        .ok_or_else(|| DomainError::not_found("trabajador", rut.as_str()))?;
    ok(trabajador)
}

async fn update_trabajador(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
    Json(patch): Json<TrabajadorPatch>,
) -> ApiResult<Trabajador> {
    caller.require(Action::ManageWorkers)?;
    let rut = Rut::parse(&rut)?;
    let conn = state.conn()?;
    ok(db::update_trabajador(&conn, &rut, patch, &caller.actor())?)
}

async fn delete_trabajador(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Trabajador> {
    caller.require(Action::ManageWorkers)?;
    let rut = Rut::parse(&rut)?;
    let conn = state.conn()?;
    ok(db::soft_delete_trabajador(&conn, &rut, &caller.actor(), params.motivo)?)
}

async fn restore_trabajador(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
) -> ApiResult<Trabajador> {
    caller.require(Action::ManageWorkers)?;
    let rut = Rut::parse(&rut)?;
    let conn = state.conn()?;
    ok(db::restore_trabajador(&conn, &rut, &caller.actor())?)
}

// ---- fichas ----------------------------------------------------------------

async fn get_ficha(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
) -> Result<Response, ApiError> {
    let rut = Rut::parse(&rut)?;
    caller.require_view_of(&rut)?;
    let conn = state.conn()?;
    let historial = db::get_historial(&conn, &rut)?
        .ok_or_else(|| DomainError::not_found("ficha", rut.as_str()))?;
    Ok(Json(ApiResponse::ok(historial.current())).into_response())
}

async fn put_ficha(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
    Json(request): Json<FichaRequest>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageWorkers)?;
    let rut = Rut::parse(&rut)?;
    let conn = state.conn()?;
    let historial = db::update_ficha(
        &conn,
        &rut,
        request.ficha,
        &FormValidator::new(),
        &caller.actor(),
        request.motivo,
    )?;
    Ok(Json(ApiResponse::ok(historial.current())).into_response())
}

async fn get_historial(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
) -> Result<Response, ApiError> {
    let rut = Rut::parse(&rut)?;
    caller.require_view_of(&rut)?;
    let conn = state.conn()?;
    let historial = db::get_historial(&conn, &rut)?
        .ok_or_else(|| DomainError::not_found("ficha", rut.as_str()))?;
    Ok(Json(ApiResponse::ok(historial.history())).into_response())
}

// ---- bonos -----------------------------------------------------------------

async fn list_bonos(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Bono>> {
    caller.require(Action::ManageBonos)?;
    let conn = state.conn()?;
    ok(db::list_bonos(&conn, params.incluir_inactivos)?)
}

async fn create_bono(
    State(state): State<AppState>,
    caller: Caller,
    Json(form): Json<NuevoBono>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageBonos)?;
    let bono = Bono::from_form(form, &FormValidator::new())?;
    let conn = state.conn()?;
    db::insert_bono(&conn, &bono, &caller.actor())?;
    created(bono)
}

async fn delete_bono(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Bono> {
    caller.require(Action::ManageBonos)?;
    let conn = state.conn()?;
    ok(db::soft_delete_bono(&conn, &id, &caller.actor(), params.motivo)?)
}

async fn restore_bono(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Bono> {
    caller.require(Action::ManageBonos)?;
    let conn = state.conn()?;
    ok(db::restore_bono(&conn, &id, &caller.actor())?)
}

async fn list_asignaciones(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
) -> Result<Response, ApiError> {
    let rut = Rut::parse(&rut)?;
    caller.require_view_of(&rut)?;
    let conn = state.conn()?;
    Ok(Json(ApiResponse::ok(db::list_asignaciones(&conn, &rut)?)).into_response())
}

async fn assign_bono(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
    Json(form): Json<NuevaAsignacion>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageBonos)?;
    let rut = Rut::parse(&rut)?;
    let conn = state.conn()?;
    created(db::assign_bono(&conn, &rut, form, &caller.actor())?)
}

// ---- maquinaria ------------------------------------------------------------

async fn list_maquinarias(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    caller.require(Action::ViewMachinery)?;
    let conn = state.conn()?;
    let maquinarias = db::list_maquinarias(&conn, params.incluir_inactivos)?;
    Ok(Json(ApiResponse::ok(maquinarias)).into_response())
}

async fn get_maquinaria(
    State(state): State<AppState>,
    caller: Caller,
    Path(patente): Path<String>,
) -> Result<Response, ApiError> {
    caller.require(Action::ViewMachinery)?;
    let patente = Patente::parse(&patente)?;
    let conn = state.conn()?;
    let maquinaria = db::get_maquinaria(&conn, &patente)?
        .ok_or_else(|| DomainError::not_found("maquinaria", patente.as_str()))?;
    Ok(Json(ApiResponse::ok(maquinaria)).into_response())
}

async fn set_maquinaria_estado(
    State(state): State<AppState>,
    caller: Caller,
    Path(patente): Path<String>,
    Json(request): Json<EstadoRequest>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageMachinery)?;
    let patente = Patente::parse(&patente)?;
    let conn = state.conn()?;
    let maquinaria = db::set_maquinaria_estado(&conn, &patente, request.estado, &caller.actor())?;
    Ok(Json(ApiResponse::ok(maquinaria)).into_response())
}

// ---- compras / ventas ------------------------------------------------------

async fn list_compras(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    caller.require(Action::ViewMachinery)?;
    let conn = state.conn()?;
    Ok(Json(ApiResponse::ok(db::list_compras(&conn, params.incluir_inactivos)?)).into_response())
}

#[derive(Serialize)]
struct CompraRegistrada {
    compra: crate::entities::CompraMaquinaria,
    maquinaria: crate::entities::Maquinaria,
}

async fn create_compra(
    State(state): State<AppState>,
    caller: Caller,
    Json(form): Json<NuevaCompra>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageMachinery)?;
    let conn = state.conn()?;
    let (compra, maquinaria) =
        db::register_compra(&conn, form, &FormValidator::new(), &caller.actor())?;
    created(CompraRegistrada { compra, maquinaria })
}

async fn delete_compra(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageMachinery)?;
    let conn = state.conn()?;
    let compra = db::soft_delete_compra(&conn, &id, &caller.actor(), params.motivo)?;
    Ok(Json(ApiResponse::ok(compra)).into_response())
}

async fn restore_compra(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageMachinery)?;
    let conn = state.conn()?;
    Ok(Json(ApiResponse::ok(db::restore_compra(&conn, &id, &caller.actor())?)).into_response())
}

async fn list_ventas(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    caller.require(Action::ViewMachinery)?;
    let conn = state.conn()?;
    Ok(Json(ApiResponse::ok(db::list_ventas(&conn, params.incluir_inactivos)?)).into_response())
}

async fn create_venta(
    State(state): State<AppState>,
    caller: Caller,
    Json(form): Json<NuevaVenta>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageMachinery)?;
    let conn = state.conn()?;
    created(db::register_venta(&conn, form, &FormValidator::new(), &caller.actor())?)
}

async fn delete_venta(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageMachinery)?;
    let conn = state.conn()?;
    let venta = db::soft_delete_venta(&conn, &id, &caller.actor(), params.motivo)?;
    Ok(Json(ApiResponse::ok(venta)).into_response())
}

async fn restore_venta(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageMachinery)?;
    let conn = state.conn()?;
    Ok(Json(ApiResponse::ok(db::restore_venta(&conn, &id, &caller.actor())?)).into_response())
}

// ---- contrapartes ----------------------------------------------------------

async fn list_contrapartes(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ContraparteParams>,
) -> ApiResult<Vec<Contraparte>> {
    caller.require(Action::ViewMachinery)?;
    let conn = state.conn()?;
    ok(db::list_contrapartes(&conn, params.tipo)?)
}

async fn create_contraparte(
    State(state): State<AppState>,
    caller: Caller,
    Json(form): Json<NuevaContraparte>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageMachinery)?;
    let contraparte = Contraparte::from_form(form, &FormValidator::new())?;
    let conn = state.conn()?;
    db::insert_contraparte(&conn, &contraparte, &caller.actor())?;
    created(contraparte)
}

// ---- usuarios --------------------------------------------------------------

async fn list_usuarios(State(state): State<AppState>, caller: Caller) -> ApiResult<Vec<Usuario>> {
    caller.require(Action::ManageUsers)?;
    let conn = state.conn()?;
    ok(db::list_usuarios(&conn)?)
}

async fn create_usuario(
    State(state): State<AppState>,
    caller: Caller,
    Json(form): Json<NuevoUsuario>,
) -> Result<Response, ApiError> {
    caller.require(Action::ManageUsers)?;
    let usuario = Usuario::from_form(form, &FormValidator::new())?;
    let conn = state.conn()?;
    db::insert_usuario(&conn, &usuario, &caller.actor())?;
    created(usuario)
}

async fn get_usuario(
    State(state): State<AppState>,
    caller: Caller,
    Path(rut): Path<String>,
) -> ApiResult<Usuario> {
    caller.require(Action::ManageUsers)?;
    let rut = Rut::parse(&rut)?;
    let conn = state.conn()?;
    let usuario = db::get_usuario(&conn, &rut)?
        .ok_or_else(|| DomainError::not_found("usuario", rut.as_str()))?;
    ok(usuario)
}

// ============================================================================
// Router
// ============================================================================

/// All routes, nested under `/api`
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/validar/rut/:rut", get(validar_rut))
        .route("/validar/patente/:patente", get(validar_patente))
        .route("/trabajadores", get(list_trabajadores).post(create_trabajador))
        .route(
            "/trabajadores/:rut",
            get(get_trabajador)
                .patch(update_trabajador)
                .delete(delete_trabajador),
        )
        .route("/trabajadores/:rut/restaurar", post(restore_trabajador))
        .route("/trabajadores/:rut/ficha", get(get_ficha).put(put_ficha))
        .route("/trabajadores/:rut/historial", get(get_historial))
        .route(
            "/trabajadores/:rut/bonos",
            get(list_asignaciones).post(assign_bono),
        )
        .route("/bonos", get(list_bonos).post(create_bono))
        .route("/bonos/:id", axum::routing::delete(delete_bono))
        .route("/bonos/:id/restaurar", post(restore_bono))
        .route("/maquinarias", get(list_maquinarias))
        .route("/maquinarias/:patente", get(get_maquinaria))
        .route("/maquinarias/:patente/estado", put(set_maquinaria_estado))
        .route("/compras", get(list_compras).post(create_compra))
        .route("/compras/:id", axum::routing::delete(delete_compra))
        .route("/compras/:id/restaurar", post(restore_compra))
        .route("/ventas", get(list_ventas).post(create_venta))
        .route("/ventas/:id", axum::routing::delete(delete_venta))
        .route("/ventas/:id/restaurar", post(restore_venta))
        .route("/contrapartes", get(list_contrapartes).post(create_contraparte))
        .route("/usuarios", get(list_usuarios).post(create_usuario))
        .route("/usuarios/:rut", get(get_usuario))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_status() {
        let cases = [
            (DomainError::not_found("trabajador", "1"), StatusCode::NOT_FOUND),
            (DomainError::already_exists("maquinaria", "BBCL12"), StatusCode::CONFLICT),
            (DomainError::AlreadyInactive, StatusCode::CONFLICT),
            (
                DomainError::InvalidTransition {
                    from: "vendida".into(),
                    to: "en_arriendo".into(),
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::InvalidRut("1-2".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::Validation(Vec::new()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                DomainError::Forbidden {
                    role: "usuario".into(),
                    action: "gestionar bonos".into(),
                },
                StatusCode::FORBIDDEN,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_anyhow_downcast() {
        let wrapped = anyhow::Error::new(DomainError::AlreadyActive).context("restoring bono");
        assert_eq!(ApiError::from(wrapped).status(), StatusCode::CONFLICT);

        let opaque = anyhow::anyhow!("disk full");
        assert_eq!(ApiError::from(opaque).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_actor_prefers_rut() {
        let anonimo = Caller {
            role: Role::Administrador,
            rut: None,
        };
        assert_eq!(anonimo.actor(), "administrador");

        let identificado = Caller {
            role: Role::Administrador,
            rut: Some(Rut::parse("123456785").unwrap()),
        };
        assert_eq!(identificado.actor(), "12.345.678-5");
    }

    #[test]
    fn test_own_record_access() {
        let rut = Rut::parse("12.345.678-5").unwrap();
        let other = Rut::parse("11.111.111-1").unwrap();
        let usuario = Caller {
            role: Role::Usuario,
            rut: Some(rut.clone()),
        };
        assert!(usuario.require_view_of(&rut).is_ok());
        assert_eq!(
            usuario.require_view_of(&other).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
    }
}
