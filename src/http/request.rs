//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! Transformación pura: bytes crudos → `Request`. No hace I/O.
//!
//! ## Formato esperado
//!
//! ```text
//! POST /api/users?verbose=1 HTTP/1.1\r\n
//! Host: localhost:3000\r\n
//! Content-Type: application/json\r\n
//! \r\n
//! {"name": "Ada", "email": "ada@example.com"}
//! ```
//!
//! ## Reglas
//!
//! 1. La request line debe terminar en CRLF.
//! 2. Exactamente tres tokens: método, URI, versión.
//! 3. El URI se parte en path y query en el primer `?`.
//! 4. La primera línea en blanco separa headers y body. Si no existe,
//!    todo lo que sigue a la request line son headers y el body queda vacío.
//! 5. Cada campo tiene un tamaño máximo. Excederlo es un `ParseError`;
//!    nunca se trunca en silencio.

use std::fmt;
use thiserror::Error;

/// Longitud máxima del token de método
pub const MAX_METHOD_LEN: usize = 16;

/// Longitud máxima del URI completo (path + `?` + query)
pub const MAX_URI_LEN: usize = 2048;

/// Longitud máxima del token de versión
pub const MAX_VERSION_LEN: usize = 16;

/// Longitud máxima del path
pub const MAX_PATH_LEN: usize = 1024;

/// Longitud máxima de la query string
pub const MAX_QUERY_LEN: usize = 1024;

/// Longitud máxima del bloque de headers
pub const MAX_HEADERS_LEN: usize = 8192;

/// Longitud máxima del body retenido
pub const MAX_BODY_LEN: usize = 8192;

/// Tope de bytes que el servidor lee por conexión
pub const MAX_REQUEST_LEN: usize =
    MAX_METHOD_LEN + MAX_URI_LEN + MAX_VERSION_LEN + MAX_HEADERS_LEN + MAX_BODY_LEN + 16;

const CRLF: &[u8] = b"\r\n";
const BLANK_LINE: &[u8] = b"\r\n\r\n";

/// Métodos HTTP
///
/// Los métodos desconocidos no son un error de parsing: llegan al resolver,
/// que responde 405.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    /// Preflight CORS, se atiende antes del chequeo de allow-list
    OPTIONS,
    /// Cualquier otro token (HEAD, PATCH, BREW...)
    Other(String),
}

impl Method {
    fn from_token(token: &str) -> Self {
        match token {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "OPTIONS" => Method::OPTIONS,
            other => Method::Other(other.to_string()),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::Other(token) => token,
        }
    }

    /// Allow-list fija: GET, POST, PUT, DELETE
    pub fn is_supported(&self) -> bool {
        matches!(self, Method::GET | Method::POST | Method::PUT | Method::DELETE)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request parseado. Inmutable una vez construido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,

    /// Path antes del `?`, tal cual llegó (sin normalizar)
    path: String,

    /// Query después del `?`, puede ser vacía
    query: String,

    version: String,

    /// Bloque de headers sin interpretar
    headers: String,

    body: Vec<u8>,

    /// Bytes de body retenidos
    content_length: usize,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty request")]
    EmptyRequest,

    #[error("Request line is not terminated by CRLF")]
    MissingRequestLineTerminator,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("{field} exceeds {max} bytes")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Request head is not valid UTF-8")]
    InvalidEncoding,

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("Body exceeds {max} bytes")]
    BodyTooLarge { max: usize },
}

impl Request {
    /// Parsea un request HTTP desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use minihttpd::http::Request;
    ///
    /// let raw = b"GET /api/users?page=2 HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/api/users");
    /// assert_eq!(request.query(), "page=2");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseError::EmptyRequest);
        }

        // 1. La request line tiene que estar terminada
        let line_end = find(buffer, CRLF).ok_or(ParseError::MissingRequestLineTerminator)?;
        let line = std::str::from_utf8(&buffer[..line_end])
            .map_err(|_| ParseError::InvalidEncoding)?;

        // 2 y 3. Tokens, path y query
        let (method, path, query, version) = Self::parse_request_line(line)?;

        // 4. Headers / body
        let (headers, body) = split_head_and_body(&buffer[line_end + CRLF.len()..]);
        let headers = std::str::from_utf8(headers).map_err(|_| ParseError::InvalidEncoding)?;
        check_len("headers", headers, MAX_HEADERS_LEN)?;

        // 5. Body acotado, tanto el anunciado como el recibido
        if let Some(declared) = content_length_of(headers)? {
            if declared > MAX_BODY_LEN {
                return Err(ParseError::BodyTooLarge { max: MAX_BODY_LEN });
            }
        }
        if body.len() > MAX_BODY_LEN {
            return Err(ParseError::BodyTooLarge { max: MAX_BODY_LEN });
        }

        Ok(Request {
            method,
            path,
            query,
            version,
            headers: headers.to_string(),
            content_length: body.len(),
            body: body.to_vec(),
        })
    }

    /// Parsea la request line: `METHOD URI VERSION`
    fn parse_request_line(line: &str) -> Result<(Method, String, String, String), ParseError> {
        let mut tokens = line.split_whitespace();

        let (Some(method), Some(uri), Some(version), None) =
            (tokens.next(), tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(ParseError::InvalidRequestLine);
        };

        check_len("method", method, MAX_METHOD_LEN)?;
        check_len("uri", uri, MAX_URI_LEN)?;
        check_len("version", version, MAX_VERSION_LEN)?;

        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version.to_string()));
        }

        let (path, query) = Self::split_uri(uri)?;

        Ok((Method::from_token(method), path, query, version.to_string()))
    }

    /// Separa path y query en el primer `?`
    fn split_uri(uri: &str) -> Result<(String, String), ParseError> {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));

        check_len("path", path, MAX_PATH_LEN)?;
        check_len("query", query, MAX_QUERY_LEN)?;

        Ok((path.to_string(), query.to_string()))
    }

    // === Accessors ===

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Bloque de headers tal como llegó (líneas separadas por CRLF)
    pub fn headers(&self) -> &str {
        &self.headers
    }

    /// Busca un header por nombre, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }
}

/// Indica si el buffer ya contiene un request completo: request line,
/// línea en blanco y tantos bytes de body como anuncie `Content-Length`.
///
/// Un `Content-Length` mayor que `MAX_BODY_LEN` cuenta como completo: el
/// parser lo va a rechazar igual y no tiene sentido esperar ese body.
///
/// Lo usa la conexión para decidir si sigue leyendo del socket.
pub fn is_complete(buffer: &[u8]) -> bool {
    let Some(line_end) = find(buffer, CRLF) else {
        return false;
    };
    let Some((headers, body)) = split_at_blank_line(&buffer[line_end + CRLF.len()..]) else {
        return false;
    };

    let declared = std::str::from_utf8(headers)
        .ok()
        .and_then(|headers| content_length_of(headers).ok().flatten())
        .unwrap_or(0);

    declared > MAX_BODY_LEN || body.len() >= declared
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ParseError> {
    if value.len() > max {
        return Err(ParseError::FieldTooLong { field, max });
    }
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Busca la línea en blanco que cierra los headers.
///
/// `rest` empieza justo después del CRLF de la request line, así que un
/// request sin headers (`GET / HTTP/1.1\r\n\r\n`) deja `rest == "\r\n"`.
fn split_at_blank_line(rest: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(body) = rest.strip_prefix(CRLF) {
        return Some((&rest[..0], body));
    }
    find(rest, BLANK_LINE).map(|pos| (&rest[..pos], &rest[pos + BLANK_LINE.len()..]))
}

fn split_head_and_body(rest: &[u8]) -> (&[u8], &[u8]) {
    match split_at_blank_line(rest) {
        Some(parts) => parts,
        // Sin línea en blanco: todo son headers, body vacío
        None => (rest.strip_suffix(CRLF).unwrap_or(rest), &rest[..0]),
    }
}

fn header_value<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    headers
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}

fn content_length_of(headers: &str) -> Result<Option<usize>, ParseError> {
    match header_value(headers, "Content-Length") {
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ParseError::InvalidContentLength(raw.to_string())),
        None => Ok(None),
    }
}
