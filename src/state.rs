// src/state.rs
use std::sync::Arc;

use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// bcrypt work factor for new password hashes.
    pub password_cost: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, password_cost: u32) -> Self {
        Self { store, password_cost }
    }
}
