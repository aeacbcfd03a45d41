pub mod rest;

use crate::config::Config;
use crate::store::ObjectStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, config: Config) -> Self {
        Self { store, config }
    }
}
