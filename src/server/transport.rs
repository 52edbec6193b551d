//! # Sesión de Transporte
//! src/server/transport.rs
//!
//! Texto plano y TLS comparten el mismo puerto. El worker decide la rama
//! una sola vez por conexión, antes de parsear, mirando el primer byte con
//! `peek` (no lo consume):
//!
//! ```text
//! 0x16 (handshake record) ──► handshake TLS con timeout ──► Transport::Tls
//! cualquier otro byte     ──────────────────────────────► Transport::Plain
//! ```
//!
//! Si el handshake falla o vence el timeout, la conexión se abandona; nunca
//! se reinterpreta como texto plano.

use crate::error::TransportError;
use crate::tls::{TlsAcceptor, TlsStream};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;
use tracing::debug;

/// Content type del record TLS que abre un handshake
pub const TLS_HANDSHAKE_RECORD: u8 = 0x16;

/// Cómo debe tratar el worker una conexión pendiente
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportHint {
    /// Mirar el primer byte para elegir entre TLS y texto plano
    Sniff,
    /// No hay TLS configurado: texto plano directo, sin peek
    Plaintext,
}

/// Unidad que viaja por la cola de trabajo. La toma exactamente un worker.
#[derive(Debug)]
pub struct PendingConnection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    pub hint: TransportHint,
}

impl PendingConnection {
    pub fn new(stream: TcpStream, peer: SocketAddr, hint: TransportHint) -> Self {
        Self { stream, peer, hint }
    }

    /// Cierra la conexión sin atenderla
    pub fn reject(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Indica si el prefijo observado corresponde a un handshake TLS
pub fn looks_like_tls(prefix: &[u8]) -> bool {
    prefix.first() == Some(&TLS_HANDSHAKE_RECORD)
}

/// Stream de lectura/escritura uniforme para ambas ramas
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<TlsStream>),
}

impl Transport {
    /// Elige la rama para `stream` y, si corresponde, completa el handshake
    pub fn establish(
        stream: TcpStream,
        hint: TransportHint,
        tls: Option<&TlsAcceptor>,
        read_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        if hint == TransportHint::Plaintext {
            return Ok(Transport::Plain(stream));
        }

        let mut prefix = [0u8; 1];
        let peeked = stream.peek(&mut prefix).map_err(TransportError::Read)?;
        if peeked == 0 {
            return Err(TransportError::PeerClosed);
        }

        if !looks_like_tls(&prefix[..peeked]) {
            debug!(first_byte = prefix[0], "plaintext connection");
            return Ok(Transport::Plain(stream));
        }

        let acceptor = tls.ok_or(TransportError::TlsUnavailable)?;
        debug!("TLS handshake detected");

        let stream = acceptor.accept(stream, read_timeout)?;
        Ok(Transport::Tls(Box::new(stream)))
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    /// Cierra la sesión: `close_notify` si es TLS, luego cierra la mitad de
    /// escritura del socket. El socket se libera al salir.
    pub fn close(self) -> Result<(), TransportError> {
        let stream = match self {
            Transport::Plain(stream) => stream,
            Transport::Tls(tls) => {
                let mut tls = *tls;
                tls.conn.send_close_notify();
                tls.flush().map_err(TransportError::Write)?;
                tls.sock
            }
        };

        match stream.shutdown(Shutdown::Write) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::Write(e)),
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.read(buf),
            Transport::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.write(buf),
            Transport::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(stream) => stream.flush(),
            Transport::Tls(stream) => stream.flush(),
        }
    }
}
