//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! API para construir respuestas HTTP/1.1 y convertirlas a bytes.
//!
//! ## Formato en el cable
//!
//! Los headers salen siempre en este orden relativo (los opcionales solo si
//! están presentes):
//!
//! ```text
//! HTTP/1.1 201 Created\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 27\r\n
//! Access-Control-Allow-Origin: *\r\n
//! Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS\r\n
//! Access-Control-Allow-Headers: Content-Type\r\n
//! Server: minihttpd/0.1\r\n
//! Connection: close\r\n
//! \r\n
//! {"id":1,"name":"Ada", ...}
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use minihttpd::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_content_type("text/plain")
//!     .with_body("Hello");
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::StatusCode;
use serde::Serialize;

/// Content-Type de todas las respuestas JSON
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Headers CORS permisivos (preflight y API)
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Representa una respuesta HTTP/1.1 completa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,

    /// Va primero entre los headers
    content_type: Option<String>,

    /// Si es true se emiten los `CORS_HEADERS` después de Content-Length
    cors: bool,

    /// Headers adicionales, en orden de inserción, después del bloque fijo
    headers: Vec<(String, String)>,

    body: Vec<u8>,
}

impl Response {
    /// Crea una nueva respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            cors: false,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Activa los headers CORS permisivos
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Agrega un header adicional. Si ya existe, se sobrescribe.
    ///
    /// `Content-Type` y `Content-Length` tienen su propio lugar en el
    /// formato; `Content-Type` se redirige a `with_content_type` y
    /// `Content-Length` se ignora porque se calcula desde el body.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de `with_header`
    pub fn add_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("Content-Type") {
            self.content_type = Some(value.to_string());
            return;
        }
        if name.eq_ignore_ascii_case("Content-Length") {
            return;
        }

        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Establece el cuerpo desde un string
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    /// Establece el cuerpo desde bytes (archivos estáticos binarios)
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Crea una respuesta JSON serializando `value`
    ///
    /// Si la serialización falla se responde 500 con un error genérico.
    ///
    /// # Ejemplo
    /// ```
    /// use minihttpd::http::{Response, StatusCode};
    /// use serde_json::json;
    ///
    /// let response = Response::json(StatusCode::Created, &json!({"id": 1}));
    /// assert_eq!(response.body(), br#"{"id":1}"#);
    /// ```
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .with_content_type(CONTENT_TYPE_JSON)
                .with_body_bytes(body),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response body");
                Self::error(StatusCode::InternalServerError, "Internal server error")
            }
        }
    }

    /// Crea una respuesta de error: `{"error": "mensaje"}`
    ///
    /// El mensaje se escapa con serde_json, así que puede contener comillas.
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self::new(status)
            .with_content_type(CONTENT_TYPE_JSON)
            .with_body(&body)
    }

    /// Respuesta a un preflight CORS: 200, headers permisivos, sin body
    pub fn preflight() -> Self {
        Self::new(StatusCode::Ok).with_cors()
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {}\r\n", self.status);

        if let Some(content_type) = &self.content_type {
            head.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));

        if self.cors {
            for (name, value) in CORS_HEADERS {
                head.push_str(&format!("{}: {}\r\n", name, value));
            }
        }

        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }

        head.push_str("\r\n");

        let mut result = head.into_bytes();
        result.extend_from_slice(&self.body);
        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn has_cors(&self) -> bool {
        self.cors
    }

    /// Busca un header adicional por nombre, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
