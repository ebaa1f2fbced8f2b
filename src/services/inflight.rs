use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::error::AppError;

/// Refuses a second submit of the same form from the same session while the
/// first one is still running. Different sessions never block each other.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

/// Held for the duration of a submit; releases the key on drop.
pub struct InFlightTicket {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, session: &str, form: &str) -> Result<InFlightTicket, AppError> {
        let key = format!("{}:{}", session, form);
        let mut keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !keys.insert(key.clone()) {
            warn!("duplicate {} submit refused", form);
            return Err(AppError::Conflict(
                "A previous submission is still being saved".to_string(),
            ));
        }
        Ok(InFlightTicket {
            keys: self.keys.clone(),
            key,
        })
    }

    pub fn is_busy(&self, session: &str, form: &str) -> bool {
        let keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.contains(&format!("{}:{}", session, form))
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        let mut keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.remove(&self.key);
    }
}
