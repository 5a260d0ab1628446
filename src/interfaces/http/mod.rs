//! Caller-facing JSON API.

pub mod handlers;
pub mod middleware;
pub mod router;

use crate::application::coordinator::SettlementSaga;
use std::sync::Arc;

pub struct AppState {
    pub saga: Arc<SettlementSaga>,
}

impl AppState {
    pub fn new(saga: SettlementSaga) -> Self {
        Self {
            saga: Arc::new(saga),
        }
    }
}
