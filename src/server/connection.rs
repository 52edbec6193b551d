//! # Pipeline de una Conexión
//! src/server/connection.rs
//!
//! Lo que hace un worker con cada conexión que saca de la cola:
//!
//! ```text
//! transporte (sniff / TLS) → leer → parsear → rutear → escribir → cerrar
//! ```
//!
//! Un request por conexión. Cualquier error de lectura aborta sin respuesta;
//! un error de parsing responde 400. La conexión se cierra siempre.

use super::transport::{PendingConnection, Transport};
use crate::error::TransportError;
use crate::http::request::{self, MAX_REQUEST_LEN};
use crate::http::Request;
use crate::metrics::MetricsCollector;
use crate::router::{self, Router};
use crate::tls::TlsAcceptor;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const READ_CHUNK: usize = 4096;

/// Servicios compartidos por todos los workers
#[derive(Clone)]
pub struct ConnectionContext {
    pub router: Router,
    pub metrics: MetricsCollector,
    pub tls: Option<TlsAcceptor>,
    /// Deadline de lectura por `read`; `None` espera indefinidamente
    pub read_timeout: Option<Duration>,
}

/// Atiende una conexión de punta a punta
pub fn handle_connection(
    pending: PendingConnection,
    ctx: &ConnectionContext,
) -> Result<(), TransportError> {
    let PendingConnection { stream, peer, hint } = pending;

    stream
        .set_read_timeout(ctx.read_timeout)
        .map_err(TransportError::Read)?;

    let mut transport = Transport::establish(stream, hint, ctx.tls.as_ref(), ctx.read_timeout)?;

    let served = serve(&mut transport, peer, ctx);
    let closed = transport.close();
    served.and(closed)
}

fn serve(
    transport: &mut Transport,
    peer: SocketAddr,
    ctx: &ConnectionContext,
) -> Result<(), TransportError> {
    let start = Instant::now();
    let raw = read_request(transport)?;

    let (response, summary) = match Request::parse(&raw) {
        Ok(request) => {
            let summary = format!("{} {}", request.method(), request.path());
            (ctx.router.route(&request), summary)
        }
        Err(e) => {
            warn!(%peer, error = %e, "failed to parse request");
            (router::bad_request(&e.to_string()), "-".to_string())
        }
    };

    transport
        .write_all(&response.to_bytes())
        .map_err(TransportError::Write)?;
    transport.flush().map_err(TransportError::Write)?;

    let latency = start.elapsed();
    ctx.metrics.record_request(response.status(), latency);

    info!(
        %peer,
        request = %summary,
        status = response.status().as_u16(),
        latency_ms = latency.as_secs_f64() * 1000.0,
        tls = transport.is_encrypted(),
        "request served"
    );
    Ok(())
}

/// Lee hasta tener un request completo, EOF o el tope de bytes
fn read_request(transport: &mut Transport) -> Result<Vec<u8>, TransportError> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match transport.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Read(e)),
        };
        if n == 0 {
            break;
        }

        buffer.extend_from_slice(&chunk[..n]);
        if buffer.len() >= MAX_REQUEST_LEN || request::is_complete(&buffer) {
            break;
        }
    }

    if buffer.is_empty() {
        return Err(TransportError::PeerClosed);
    }
    Ok(buffer)
}
