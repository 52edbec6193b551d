//! # Capacidad TLS
//! src/tls/mod.rs
//!
//! El `ServerConfig` de rustls se construye una sola vez al arrancar, desde
//! archivos PEM, y se comparte entre todos los workers. Cada conexión que
//! empieza con un handshake recibe su propia `ServerConnection`, que vive
//! exactamente lo mismo que el socket.
//!
//! El handshake corre sobre el socket bloqueante con un deadline total
//! (`handshake_timeout`); si se vence, la conexión se abandona.

pub mod cert;

pub use cert::CertProvisioner;

use crate::error::TransportError;
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use rustls_pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer};
use std::io;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Stream TLS ya negociado
pub type TlsStream = StreamOwned<ServerConnection, TcpStream>;

/// Errores al cargar o generar el material TLS
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to load certificate {}: {reason}", path.display())]
    Certificate { path: PathBuf, reason: String },

    #[error("no certificates found in {}", .0.display())]
    EmptyCertificateChain(PathBuf),

    #[error("failed to load private key {}: {reason}", path.display())]
    PrivateKey { path: PathBuf, reason: String },

    #[error("invalid TLS configuration: {0}")]
    Config(#[from] rustls::Error),

    #[error("certificate provisioning failed: {0}")]
    Provisioning(String),
}

/// Acepta handshakes TLS sobre sockets bloqueantes
#[derive(Clone)]
pub struct TlsAcceptor {
    config: Arc<ServerConfig>,
    handshake_timeout: Duration,
}

impl TlsAcceptor {
    pub fn new(config: Arc<ServerConfig>, handshake_timeout: Duration) -> Self {
        Self {
            config,
            handshake_timeout,
        }
    }

    /// Carga certificado (puede ser una cadena) y clave privada en PEM
    pub fn from_pem_files(
        cert_path: &Path,
        key_path: &Path,
        handshake_timeout: Duration,
    ) -> Result<Self, TlsError> {
        let certs = CertificateDer::pem_file_iter(cert_path)
            .map_err(|e| TlsError::Certificate {
                path: cert_path.to_path_buf(),
                reason: e.to_string(),
            })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::Certificate {
                path: cert_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if certs.is_empty() {
            return Err(TlsError::EmptyCertificateChain(cert_path.to_path_buf()));
        }

        let key = PrivateKeyDer::from_pem_file(key_path).map_err(|e| TlsError::PrivateKey {
            path: key_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config = ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

        info!(cert = %cert_path.display(), "TLS configuration loaded");
        Ok(Self::new(Arc::new(config), handshake_timeout))
    }

    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Completa el handshake sobre `stream`
    ///
    /// El handshake avanza de a una operación de socket por vez y el tiempo
    /// restante se recalcula antes de cada una, así que un peer que manda
    /// bytes de a goteo no puede estirarlo más allá de `handshake_timeout`.
    /// Al terminar, el socket vuelve a tener `read_timeout` como timeout de
    /// lectura y ninguno de escritura.
    pub fn accept(
        &self,
        mut stream: TcpStream,
        read_timeout: Option<Duration>,
    ) -> Result<TlsStream, TransportError> {
        let mut conn = ServerConnection::new(Arc::clone(&self.config))
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        let deadline = Instant::now() + self.handshake_timeout;

        while conn.is_handshaking() {
            flush_tls(&mut conn, &mut stream, deadline)?;
            if !conn.is_handshaking() {
                break;
            }

            stream
                .set_read_timeout(Some(time_left(deadline)?))
                .map_err(TransportError::Read)?;

            match conn.read_tls(&mut stream) {
                Ok(0) => return Err(TransportError::PeerClosed),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(classify_handshake_error(e)),
            }

            if let Err(e) = conn.process_new_packets() {
                // Intenta avisarle al peer con la alerta que dejó rustls
                let _ = conn.write_tls(&mut stream);
                return Err(TransportError::Handshake(e.to_string()));
            }
        }

        // Lo último del servidor (Finished, tickets) sale bajo el mismo deadline
        flush_tls(&mut conn, &mut stream, deadline)?;

        stream
            .set_read_timeout(read_timeout)
            .map_err(TransportError::Read)?;
        stream.set_write_timeout(None).map_err(TransportError::Write)?;

        debug!(
            version = ?conn.protocol_version(),
            suite = ?conn.negotiated_cipher_suite().map(|s| s.suite()),
            "TLS handshake complete"
        );
        Ok(StreamOwned::new(conn, stream))
    }
}

/// Tiempo que le queda al handshake; cero o menos es timeout
fn time_left(deadline: Instant) -> Result<Duration, TransportError> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or(TransportError::HandshakeTimeout)
}

/// Escribe todos los records TLS pendientes antes del deadline
fn flush_tls(
    conn: &mut ServerConnection,
    stream: &mut TcpStream,
    deadline: Instant,
) -> Result<(), TransportError> {
    while conn.wants_write() {
        stream
            .set_write_timeout(Some(time_left(deadline)?))
            .map_err(TransportError::Write)?;

        match conn.write_tls(stream) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(classify_handshake_error(e)),
        }
    }
    Ok(())
}

fn classify_handshake_error(error: io::Error) -> TransportError {
    match error.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::HandshakeTimeout,
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => TransportError::PeerClosed,
        _ => TransportError::Handshake(error.to_string()),
    }
}
