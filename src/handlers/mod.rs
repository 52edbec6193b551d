//! # Handlers
//! src/handlers/mod.rs
//!
//! Colaboradores a los que despacha el router:
//!
//! - `static_files`: archivos bajo el directorio estático
//! - `api`: recurso JSON `/api/users`
//! - `ops`: `/health` y `/metrics`

pub mod api;
pub mod ops;
pub mod static_files;

pub use api::UsersApi;
pub use ops::OpsEndpoints;
pub use static_files::StaticFiles;
