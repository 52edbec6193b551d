//! # Servidor TCP
//! src/server/tcp.rs
//!
//! El thread que llama a `run` es el acceptor: acepta conexiones y las
//! ofrece a la cola sin bloquearse nunca. Si la cola está llena, la
//! conexión nueva se cierra en el acto.
//!
//! ```text
//! accept ──► WorkQueue (Q slots) ──► N workers ──► handle_connection
//!              │ llena
//!              └──► cerrar
//! ```
//!
//! Al pedir shutdown: se deja de aceptar, se cierra la cola (las conexiones
//! que quedaban se cierran sin atender) y se espera a los workers.

use super::connection::{handle_connection, ConnectionContext};
use super::pool::WorkerPool;
use super::queue::{EnqueueError, WorkQueue};
use super::transport::{PendingConnection, TransportHint};
use crate::config::Config;
use crate::error::{ServerError, TransportError};
use crate::handlers::{OpsEndpoints, StaticFiles, UsersApi};
use crate::metrics::MetricsCollector;
use crate::router::Router;
use crate::store::UserStore;
use crate::tls::TlsAcceptor;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Espera entre intentos de accept cuando no hay conexiones nuevas
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Permite pedir el shutdown del servidor desde otro thread (señales, tests)
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Servidor HTTP/1.1 con cola acotada y pool fijo de workers
pub struct Server {
    config: Config,
    listener: TcpListener,
    queue: Arc<WorkQueue<PendingConnection>>,
    context: ConnectionContext,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Valida la configuración, carga TLS y hace bind del puerto
    ///
    /// Es el único punto donde un error aborta el arranque.
    pub fn bind(config: Config) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;

        let tls = if config.tls {
            Some(TlsAcceptor::from_pem_files(
                &config.cert_file,
                &config.key_file,
                config.handshake_timeout(),
            )?)
        } else {
            None
        };

        let listener = create_listener(&config).map_err(|source| ServerError::Bind {
            address: config.address(),
            source,
        })?;

        let metrics = MetricsCollector::new();
        let router = Router::new(
            StaticFiles::new(&config.static_dir),
            UsersApi::new(Arc::new(UserStore::new())),
            OpsEndpoints::new(metrics.clone()),
        );

        let context = ConnectionContext {
            router,
            metrics,
            tls,
            read_timeout: config.read_timeout(),
        };

        if let Ok(addr) = listener.local_addr() {
            info!(address = %addr, tls = context.tls.is_some(), "server listening");
        }

        Ok(Self {
            queue: Arc::new(WorkQueue::new(config.queue_capacity)),
            config,
            listener,
            context,
            shutdown: ShutdownHandle::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.context.metrics.clone()
    }

    /// Corre el acceptor hasta que se pida shutdown
    pub fn run(self) -> Result<(), ServerError> {
        let Server {
            config,
            listener,
            queue,
            context,
            shutdown,
        } = self;

        let hint = if context.tls.is_some() {
            TransportHint::Sniff
        } else {
            TransportHint::Plaintext
        };

        let context = Arc::new(context);
        let mut pool = WorkerPool::start(config.workers, Arc::clone(&queue), {
            let context = Arc::clone(&context);
            move |pending: PendingConnection| {
                let peer = pending.peer;
                if let Err(e) = handle_connection(pending, &context) {
                    log_transport_error(peer, &e);
                }
            }
        })
        .map_err(ServerError::Pool)?;

        accept_loop(&listener, &queue, hint, &shutdown);
        drop(listener);

        info!("shutting down: closing work queue");
        let drained = queue.shutdown();
        if !drained.is_empty() {
            info!(count = drained.len(), "closing queued connections without processing");
        }
        for pending in drained {
            debug!(peer = %pending.peer, "closing queued connection");
            pending.reject();
        }

        pool.stop();
        info!("server stopped");
        Ok(())
    }
}

fn create_listener(config: &Config) -> io::Result<TcpListener> {
    let addr = config
        .address()
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "address did not resolve"))?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(config.backlog)?;

    // El acceptor hace polling para poder ver el flag de shutdown
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

fn accept_loop(
    listener: &TcpListener,
    queue: &WorkQueue<PendingConnection>,
    hint: TransportHint,
    shutdown: &ShutdownHandle,
) {
    while !shutdown.is_shutdown() {
        match listener.accept() {
            Ok((stream, peer)) => admit(queue, stream, peer, hint),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                error!(error = %TransportError::Accept(e), "accept failed");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
}

/// Control de admisión: encolar o cerrar
fn admit(
    queue: &WorkQueue<PendingConnection>,
    stream: TcpStream,
    peer: SocketAddr,
    hint: TransportHint,
) {
    if let Err(e) = stream.set_nonblocking(false) {
        warn!(%peer, error = %e, "failed to configure accepted socket");
        return;
    }
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, error = %e, "failed to set TCP_NODELAY");
    }

    match queue.enqueue(PendingConnection::new(stream, peer, hint)) {
        Ok(()) => debug!(%peer, "connection queued"),
        Err(EnqueueError::Full(pending)) => {
            warn!(%peer, capacity = queue.capacity(), "work queue full, rejecting connection");
            pending.reject();
        }
        Err(EnqueueError::ShutDown(pending)) => pending.reject(),
    }
}

fn log_transport_error(peer: SocketAddr, error: &TransportError) {
    match error {
        TransportError::PeerClosed => debug!(%peer, "peer closed before sending a request"),
        TransportError::Handshake(_)
        | TransportError::HandshakeTimeout
        | TransportError::TlsUnavailable => warn!(%peer, %error, "TLS session abandoned"),
        _ => warn!(%peer, %error, "connection aborted"),
    }
}
