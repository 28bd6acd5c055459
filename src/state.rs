use crate::services::{file_store::FileStore, gateway::StorageGateway};
use std::sync::Arc;

/// Shared state handed to every handler: the metadata store and the
/// object-storage gateway behind its trait object.
#[derive(Clone)]
pub struct AppState {
    pub store: FileStore,
    pub gateway: Arc<dyn StorageGateway>,
}

impl AppState {
    pub fn new(store: FileStore, gateway: Arc<dyn StorageGateway>) -> Self {
        Self { store, gateway }
    }
}
