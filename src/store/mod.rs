//! # Almacenamiento
//! src/store/mod.rs
//!
//! Estado de aplicación que comparten los workers. Se construye una vez en
//! el arranque y se pasa por `Arc` a los handlers.

pub mod users;

pub use users::{NewUser, StoreError, User, UserPatch, UserStore};
