//! # Taxonomía de Errores
//! src/error.rs
//!
//! Ningún error de una conexión es fatal para el proceso. El único error
//! que aborta el arranque es `ServerError` (bind, configuración o TLS).
//!
//! | Error | Qué ve el cliente |
//! |---|---|
//! | `TransportError` | nada, la conexión se abandona |
//! | `ParseError` | 400 |
//! | `RouteError` | 405 / 404 |
//! | `HandlerError` | 404 genérico, 403 para traversal, 500 genérico |
//! | `EnqueueError` | nada, la conexión se cierra al aceptarla |

use std::io;
use thiserror::Error;

pub use crate::http::ParseError;
pub use crate::server::queue::EnqueueError;
pub use crate::tls::TlsError;

/// Fallas de accept / lectura / escritura / handshake
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    #[error("TLS handshake timed out")]
    HandshakeTimeout,

    /// Llegó un ClientHello pero el servidor no tiene TLS configurado
    #[error("TLS handshake received but TLS is not configured")]
    TlsUnavailable,

    /// El peer cerró antes de mandar un request completo
    #[error("peer closed the connection")]
    PeerClosed,
}

/// Resultado negativo del resolver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Route not found: {0}")]
    NotFound(String),
}

/// Falla reportada por un colaborador (static files, API, ops)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// El handler no reconoce el path
    #[error("request not handled")]
    NotHandled,

    #[error("resource not found")]
    NotFound,

    /// El path resuelto escapa del directorio raíz
    #[error("access outside the static root")]
    Forbidden,

    /// El detalle se loguea, nunca se envía al cliente
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errores de arranque. Son los únicos que terminan el proceso.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start worker pool: {0}")]
    Pool(#[source] io::Error),

    #[error(transparent)]
    Tls(#[from] TlsError),
}
