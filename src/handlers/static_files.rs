//! # Archivos Estáticos
//! src/handlers/static_files.rs
//!
//! Sirve archivos bajo un directorio raíz. El path pedido se canonicaliza y
//! tiene que quedar dentro de la raíz canonicalizada; si no, es 403.
//!
//! ```text
//! GET /            → <root>/index.html
//! GET /css/app.css → <root>/css/app.css
//! GET /../etc/x    → 403 (si existe) o 404
//! ```

use crate::error::HandlerError;
use crate::http::{Response, StatusCode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Archivo que se sirve para `/`
pub const INDEX_FILE: &str = "index.html";

/// Handler de archivos estáticos
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resuelve `path` dentro de la raíz y devuelve el archivo
    pub fn serve(&self, path: &str) -> Result<Response, HandlerError> {
        let file = self.resolve(path)?;

        let body = fs::read(&file).map_err(|e| {
            HandlerError::Internal(format!("failed to read {}: {}", file.display(), e))
        })?;

        Ok(Response::new(StatusCode::Ok)
            .with_content_type(content_type_for(&file))
            .with_body_bytes(body))
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, HandlerError> {
        let relative = match path.trim_start_matches('/') {
            "" => INDEX_FILE,
            rest => rest,
        };

        let root = self.root.canonicalize().map_err(|e| {
            HandlerError::Internal(format!(
                "static root {} is not accessible: {}",
                self.root.display(),
                e
            ))
        })?;

        let candidate = root
            .join(relative)
            .canonicalize()
            .map_err(|_| HandlerError::NotFound)?;

        if !candidate.starts_with(&root) {
            warn!(path, resolved = %candidate.display(), "path escapes static root");
            return Err(HandlerError::Forbidden);
        }

        if !candidate.is_file() {
            return Err(HandlerError::NotFound);
        }

        Ok(candidate)
    }
}

/// Content-Type según la extensión del archivo
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "text/plain",
    }
}
