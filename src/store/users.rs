//! # Almacén de Usuarios
//! src/store/users.rs
//!
//! Registro en memoria compartido entre workers. Los ids son crecientes
//! desde 1 y no se reutilizan aunque se borren registros.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Cantidad máxima de registros
pub const MAX_USERS: usize = 100;

/// Longitud máxima del nombre
pub const MAX_NAME_LEN: usize = 63;

/// Longitud máxima del email
pub const MAX_EMAIL_LEN: usize = 127;

/// Un usuario registrado
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    /// Hora local de creación, `%Y-%m-%d %H:%M:%S`
    pub created_at: String,
}

/// Payload de `POST /api/users`
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Payload de `PUT /api/users/{id}`: solo cambian los campos presentes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("user store is full ({0} records)")]
    Full(usize),

    #[error("user {0} not found")]
    NotFound(u64),

    #[error("invalid {field}")]
    Invalid { field: &'static str },
}

fn check_field(field: &'static str, value: &str, max: usize) -> Result<(), StoreError> {
    if value.trim().is_empty() || value.len() > max {
        return Err(StoreError::Invalid { field });
    }
    Ok(())
}

impl NewUser {
    pub fn validate(&self) -> Result<(), StoreError> {
        check_field("name", &self.name, MAX_NAME_LEN)?;
        check_field("email", &self.email, MAX_EMAIL_LEN)
    }
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(name) = &self.name {
            check_field("name", name, MAX_NAME_LEN)?;
        }
        if let Some(email) = &self.email {
            check_field("email", email, MAX_EMAIL_LEN)?;
        }
        Ok(())
    }
}

struct Records {
    users: BTreeMap<u64, User>,
    next_id: u64,
}

/// Almacén thread-safe de usuarios
pub struct UserStore {
    records: Mutex<Records>,
    capacity: usize,
}

impl UserStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_USERS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(Records {
                users: BTreeMap::new(),
                next_id: 1,
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Crea un usuario y devuelve el registro completo
    pub fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        new_user.validate()?;

        let mut records = self.lock();
        if records.users.len() >= self.capacity {
            return Err(StoreError::Full(self.capacity));
        }

        let id = records.next_id;
        records.next_id += 1;

        let user = User {
            id,
            name: new_user.name,
            email: new_user.email,
            created_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        records.users.insert(id, user.clone());
        Ok(user)
    }

    pub fn get(&self, id: u64) -> Option<User> {
        self.lock().users.get(&id).cloned()
    }

    /// Todos los usuarios, en orden de id
    pub fn list(&self) -> Vec<User> {
        self.lock().users.values().cloned().collect()
    }

    pub fn update(&self, id: u64, patch: UserPatch) -> Result<User, StoreError> {
        patch.validate()?;

        let mut records = self.lock();
        let user = records.users.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        Ok(user.clone())
    }

    pub fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.lock()
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.lock().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = UserStore::new();
        let user = store.create(new_user("Ada", "ada@example.com")).unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(store.get(1), Some(user.clone()));
        assert_eq!(user.created_at.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_ids_are_never_reused() {
        let store = UserStore::new();
        store.create(new_user("a", "a@x")).unwrap();
        store.create(new_user("b", "b@x")).unwrap();
        store.delete(2).unwrap();

        let third = store.create(new_user("c", "c@x")).unwrap();
        assert_eq!(third.id, 3);
        assert_eq!(store.list().iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_capacity() {
        let store = UserStore::with_capacity(2);
        store.create(new_user("a", "a@x")).unwrap();
        store.create(new_user("b", "b@x")).unwrap();
        assert_eq!(store.create(new_user("c", "c@x")), Err(StoreError::Full(2)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_validation() {
        let store = UserStore::new();
        assert!(store.create(new_user("", "a@x")).is_err());
        assert!(store.create(new_user("a", "  ")).is_err());
        assert!(store.create(new_user(&"n".repeat(MAX_NAME_LEN + 1), "a@x")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_partial_update() {
        let store = UserStore::new();
        store.create(new_user("Ada", "ada@example.com")).unwrap();

        let patch = UserPatch {
            name: Some("Ada L.".to_string()),
            email: None,
        };
        let updated = store.update(1, patch).unwrap();

        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.email, "ada@example.com");
        assert_eq!(store.update(9, UserPatch::default()), Err(StoreError::NotFound(9)));
    }

    #[test]
    fn test_delete_missing() {
        let store = UserStore::new();
        assert_eq!(store.delete(1), Err(StoreError::NotFound(1)));
    }

    #[test]
    fn test_concurrent_creates_get_distinct_ids() {
        let store = Arc::new(UserStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..10)
                        .map(|j| store.create(new_user(&format!("u{}-{}", i, j), "x@y")).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=80).collect::<Vec<_>>());
    }
}
