//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Núcleo concurrente del servidor:
//!
//! 1. `tcp`: acceptor y control de admisión
//! 2. `queue`: cola acotada entre acceptor y workers
//! 3. `pool`: workers con aislamiento de panics
//! 4. `transport`: texto plano o TLS, decidido por el primer byte
//! 5. `connection`: leer → parsear → rutear → escribir → cerrar

pub mod connection;
pub mod pool;
pub mod queue;
pub mod tcp;
pub mod transport;

pub use connection::{handle_connection, ConnectionContext};
pub use pool::WorkerPool;
pub use queue::{EnqueueError, WorkQueue};
pub use tcp::{Server, ShutdownHandle};
pub use transport::{PendingConnection, Transport, TransportHint};
