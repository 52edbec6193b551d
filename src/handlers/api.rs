//! # API de Usuarios
//! src/handlers/api.rs
//!
//! | Método | Path | Respuesta |
//! |---|---|---|
//! | GET | `/api/users` | 200, lista completa |
//! | POST | `/api/users` | 201 / 400 / 500 (almacén lleno) |
//! | GET | `/api/users/{id}` | 200 / 404 |
//! | PUT | `/api/users/{id}` | 200 / 400 / 404 |
//! | DELETE | `/api/users/{id}` | 204 / 404 |
//!
//! Todas las respuestas JSON llevan los headers CORS. Cualquier otra
//! combinación bajo `/api/` devuelve `HandlerError::NotHandled`.

use crate::error::HandlerError;
use crate::http::{Method, Request, Response, StatusCode};
use crate::store::{NewUser, StoreError, UserPatch, UserStore};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Path de la colección
pub const USERS_PATH: &str = "/api/users";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Collection,
    Item(u64),
}

fn parse_target(path: &str) -> Option<Target> {
    match path.strip_prefix(USERS_PATH)? {
        "" | "/" => Some(Target::Collection),
        rest => rest
            .strip_prefix('/')?
            .parse()
            .ok()
            .map(Target::Item),
    }
}

/// Handler de `/api/users`
#[derive(Clone)]
pub struct UsersApi {
    store: Arc<UserStore>,
}

impl UsersApi {
    pub fn new(store: Arc<UserStore>) -> Self {
        Self { store }
    }

    pub fn handle(&self, request: &Request) -> Result<Response, HandlerError> {
        let target = parse_target(request.path()).ok_or(HandlerError::NotHandled)?;

        let response = match (request.method(), target) {
            (Method::GET, Target::Collection) => self.list(),
            (Method::POST, Target::Collection) => self.create(request.body()),
            (Method::GET, Target::Item(id)) => self.get(id),
            (Method::PUT, Target::Item(id)) => self.update(id, request.body()),
            (Method::DELETE, Target::Item(id)) => self.delete(id),
            _ => return Err(HandlerError::NotHandled),
        };

        Ok(response.with_cors())
    }

    fn list(&self) -> Response {
        Response::json(StatusCode::Ok, &self.store.list())
    }

    fn get(&self, id: u64) -> Response {
        match self.store.get(id) {
            Some(user) => Response::json(StatusCode::Ok, &user),
            None => user_not_found(),
        }
    }

    fn create(&self, body: &[u8]) -> Response {
        let Some(new_user) = parse_body::<NewUser>(body) else {
            return invalid_payload();
        };

        match self.store.create(new_user) {
            Ok(user) => {
                info!(id = user.id, name = %user.name, "user created");
                Response::json(
                    StatusCode::Created,
                    &json!({
                        "message": "User created successfully",
                        "id": user.id,
                        "name": user.name,
                        "email": user.email,
                    }),
                )
            }
            Err(StoreError::Invalid { .. }) => invalid_payload(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to create user");
                Response::error(StatusCode::InternalServerError, "Failed to create user")
            }
        }
    }

    fn update(&self, id: u64, body: &[u8]) -> Response {
        let Some(patch) = parse_body::<UserPatch>(body) else {
            return invalid_payload();
        };

        match self.store.update(id, patch) {
            Ok(_) => Response::json(
                StatusCode::Ok,
                &json!({ "message": "User updated successfully" }),
            ),
            Err(StoreError::NotFound(_)) => user_not_found(),
            Err(_) => invalid_payload(),
        }
    }

    fn delete(&self, id: u64) -> Response {
        match self.store.delete(id) {
            Ok(()) => Response::new(StatusCode::NoContent),
            Err(_) => user_not_found(),
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Option<T> {
    serde_json::from_slice(body).ok()
}

fn user_not_found() -> Response {
    Response::error(StatusCode::NotFound, "User not found")
}

fn invalid_payload() -> Response {
    Response::error(StatusCode::BadRequest, "Invalid user payload")
}
