//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementación mínima de HTTP/1.1 sin librerías de alto nivel:
//!
//! - Parsing acotado de requests (`request`)
//! - Construcción de responses con orden de headers fijo (`response`)
//! - Códigos de estado (`status`)
//!
//! Una conexión lleva exactamente un request y una respuesta. No hay
//! keep-alive, pipelining ni chunked encoding.

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
