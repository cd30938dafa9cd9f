use std::sync::Arc;

use crate::app::Gate;

#[derive(Clone)]
pub struct BridgeState {
    pub(crate) gate: Arc<Gate>,
}

impl BridgeState {
    pub fn new(gate: Arc<Gate>) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &Arc<Gate> {
        &self.gate
    }
}
