//! # minihttpd
//! src/lib.rs
//!
//! Servidor HTTP/1.1 multi-hilo: un acceptor, una cola acotada de
//! conexiones pendientes y un pool fijo de workers. Texto plano y TLS
//! comparten el mismo puerto.
//!
//! ## Arquitectura
//!
//! - `server`: acceptor, cola, pool, sesión de transporte y pipeline por conexión
//! - `http`: parsing acotado de requests y construcción de responses
//! - `router`: resolución de rutas por prioridad
//! - `handlers`: archivos estáticos, API de usuarios, health y metrics
//! - `store`: almacén de usuarios en memoria
//! - `metrics`: contadores y latencias
//! - `tls`: configuración rustls y generación de certificados
//! - `config`: argumentos CLI y variables de entorno
//! - `error`: taxonomía de errores
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use minihttpd::config::Config;
//! use minihttpd::server::Server;
//!
//! let server = Server::bind(Config::default()).expect("bind");
//! let shutdown = server.shutdown_handle();
//! // shutdown.shutdown() desde otro thread detiene el servidor
//! server.run().expect("server error");
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod router;
pub mod server;
pub mod store;
pub mod tls;
