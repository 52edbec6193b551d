//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración por argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./minihttpd --port 8443 --workers 8 --queue-capacity 64 \
//!   --tls --generate-cert --cert-file server.crt --key-file server.key
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 WORKERS=8 ./minihttpd
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "minihttpd")]
#[command(about = "Servidor HTTP/1.1 multi-hilo con cola acotada y TLS en el mismo puerto")]
#[command(version)]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor (0 = efímero)
    #[arg(short, long, default_value = "3000", env = "HTTP_PORT")]
    pub port: u16,

    /// Backlog del socket de escucha
    #[arg(long, default_value = "128", env = "HTTP_BACKLOG")]
    pub backlog: i32,

    // === Pool y cola ===

    /// Cantidad de workers
    #[arg(long, default_value = "4", env = "WORKERS")]
    pub workers: usize,

    /// Capacidad de la cola de conexiones pendientes
    #[arg(long = "queue-capacity", default_value = "20", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Directorio raíz de archivos estáticos
    #[arg(long = "static-dir", default_value = "static", env = "STATIC_DIR")]
    pub static_dir: PathBuf,

    // === TLS ===

    /// Habilita la rama TLS (mismo puerto que texto plano)
    #[arg(long = "tls", env = "TLS_ENABLED")]
    pub tls: bool,

    /// Certificado PEM
    #[arg(long = "cert-file", default_value = "server.crt", env = "TLS_CERT")]
    pub cert_file: PathBuf,

    /// Clave privada PEM
    #[arg(long = "key-file", default_value = "server.key", env = "TLS_KEY")]
    pub key_file: PathBuf,

    /// Genera un certificado autofirmado con openssl si falta alguno
    #[arg(long = "generate-cert", env = "TLS_GENERATE")]
    pub generate_cert: bool,

    // === Timeouts ===

    /// Deadline del handshake TLS en milisegundos
    #[arg(long = "handshake-timeout-ms", default_value = "10000", env = "TLS_HANDSHAKE_TIMEOUT_MS")]
    pub handshake_timeout_ms: u64,

    /// Timeout de lectura en milisegundos (0 = sin límite)
    #[arg(long = "read-timeout-ms", default_value = "30000", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    // === Logging ===

    /// Filtro de tracing (ej: "info", "minihttpd=debug")
    #[arg(long = "log-level", default_value = "info", env = "RUST_LOG")]
    pub log_level: String,
}

impl Config {
    /// Parsea argumentos CLI y variables de entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use minihttpd::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:3000");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// `None` cuando el timeout está deshabilitado
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be >= 1".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("queue capacity must be >= 1".to_string());
        }
        if self.backlog <= 0 {
            return Err("backlog must be >= 1".to_string());
        }
        if self.handshake_timeout_ms == 0 {
            return Err("handshake timeout must be > 0".to_string());
        }
        if self.generate_cert && !self.tls {
            return Err("--generate-cert requires --tls".to_string());
        }
        Ok(())
    }

    /// Loguea un resumen de la configuración
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            backlog = self.backlog,
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            static_dir = %self.static_dir.display(),
            "server configuration"
        );

        if self.tls {
            info!(
                cert = %self.cert_file.display(),
                key = %self.key_file.display(),
                handshake_timeout_ms = self.handshake_timeout_ms,
                "TLS enabled"
            );
        }

        match self.read_timeout() {
            Some(timeout) => info!(read_timeout_ms = timeout.as_millis() as u64, "read timeout"),
            None => info!("read timeout disabled"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            backlog: 128,
            workers: 4,
            queue_capacity: 20,
            static_dir: PathBuf::from("static"),
            tls: false,
            cert_file: PathBuf::from("server.crt"),
            key_file: PathBuf::from("server.key"),
            generate_cert: false,
            handshake_timeout_ms: 10_000,
            read_timeout_ms: 30_000,
            log_level: "info".to_string(),
        }
    }
}
