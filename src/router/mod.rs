//! # Sistema de Routing
//! src/router/mod.rs
//!
//! El router tiene dos partes:
//!
//! 1. `resolve(method, path)`: función pura, sin estado, que decide la ruta.
//! 2. `Router::route(request)`: ejecuta la ruta elegida contra los handlers
//!    y traduce sus errores a respuestas.
//!
//! ## Orden de prioridad (gana la primera coincidencia)
//!
//! ```text
//! OPTIONS                       → preflight CORS (200, sin body)
//! método fuera de la allow-list → 405
//! /health, /metrics (exacto)    → endpoint operacional
//! /api/...                      → API (decide ella misma 404 vs éxito)
//! GET                           → archivo estático (path sin normalizar)
//! resto                         → 404
//! ```

use crate::error::{HandlerError, RouteError};
use crate::handlers::{OpsEndpoints, StaticFiles, UsersApi};
use crate::http::{Method, Request, Response, StatusCode};
use tracing::error;

pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";
pub const API_PREFIX: &str = "/api/";

/// Valor del header `Server`
pub const SERVER_NAME: &str = concat!("minihttpd/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpsEndpoint {
    Health,
    Metrics,
}

/// Decisión del resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    CorsPreflight,
    Operational(OpsEndpoint),
    Api,
    StaticFile,
}

/// Resuelve la ruta para `(method, path)`
///
/// # Ejemplo
/// ```
/// use minihttpd::http::Method;
/// use minihttpd::router::{resolve, Route};
///
/// assert_eq!(resolve(&Method::OPTIONS, "/anything"), Ok(Route::CorsPreflight));
/// assert_eq!(resolve(&Method::GET, "/index.html"), Ok(Route::StaticFile));
/// ```
pub fn resolve(method: &Method, path: &str) -> Result<Route, RouteError> {
    if *method == Method::OPTIONS {
        return Ok(Route::CorsPreflight);
    }

    if !method.is_supported() {
        return Err(RouteError::MethodNotAllowed(method.to_string()));
    }

    match path {
        HEALTH_PATH => return Ok(Route::Operational(OpsEndpoint::Health)),
        METRICS_PATH => return Ok(Route::Operational(OpsEndpoint::Metrics)),
        _ => {}
    }

    if path.starts_with(API_PREFIX) {
        return Ok(Route::Api);
    }

    if *method == Method::GET {
        return Ok(Route::StaticFile);
    }

    Err(RouteError::NotFound(path.to_string()))
}

/// Ejecuta la ruta resuelta contra los handlers
#[derive(Clone)]
pub struct Router {
    static_files: StaticFiles,
    api: UsersApi,
    ops: OpsEndpoints,
}

impl Router {
    pub fn new(static_files: StaticFiles, api: UsersApi, ops: OpsEndpoints) -> Self {
        Self {
            static_files,
            api,
            ops,
        }
    }

    /// Produce la respuesta para `request`. Nunca falla: todo error termina
    /// en un código de estado.
    pub fn route(&self, request: &Request) -> Response {
        let mut response = match resolve(request.method(), request.path()) {
            Ok(Route::CorsPreflight) => Response::preflight(),
            Ok(Route::Operational(OpsEndpoint::Health)) => self.ops.health(),
            Ok(Route::Operational(OpsEndpoint::Metrics)) => self.ops.metrics(),
            Ok(Route::Api) => self
                .api
                .handle(request)
                .unwrap_or_else(|e| handler_failure(request, e)),
            Ok(Route::StaticFile) => self
                .static_files
                .serve(request.path())
                .unwrap_or_else(|e| handler_failure(request, e)),
            Err(e) => route_failure(e),
        };

        add_common_headers(&mut response);
        response
    }
}

/// Respuesta para un request que no se pudo parsear
pub fn bad_request(reason: &str) -> Response {
    let mut response = Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", reason));
    add_common_headers(&mut response);
    response
}

fn route_failure(error: RouteError) -> Response {
    match error {
        RouteError::MethodNotAllowed(_) => {
            Response::error(StatusCode::MethodNotAllowed, "Method not allowed")
        }
        RouteError::NotFound(_) => Response::error(StatusCode::NotFound, "Not found"),
    }
}

// El detalle de los errores internos solo va al log.
fn handler_failure(request: &Request, error: HandlerError) -> Response {
    match error {
        HandlerError::NotHandled | HandlerError::NotFound => {
            Response::error(StatusCode::NotFound, "Not found")
        }
        HandlerError::Forbidden => Response::error(StatusCode::Forbidden, "Forbidden"),
        HandlerError::Internal(detail) => {
            error!(method = %request.method(), path = request.path(), %detail, "handler failed");
            Response::error(StatusCode::InternalServerError, "Internal server error")
        }
    }
}

/// Headers que llevan todas las respuestas
fn add_common_headers(response: &mut Response) {
    response.add_header("Server", SERVER_NAME);
    response.add_header("Connection", "close");
}
