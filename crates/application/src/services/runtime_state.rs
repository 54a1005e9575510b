use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use warden_dns_domain::DomainError;

/// Lifecycle flags shared by the engine and the listeners.
#[derive(Default)]
pub struct RuntimeState {
    accept_queries: AtomicBool,
    running: AtomicBool,
    last_error: ArcSwapOption<DomainError>,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_accept_queries(&self, accept: bool) {
        self.accept_queries.store(accept, Ordering::Release);
    }

    pub fn accepting_queries(&self) -> bool {
        self.accept_queries.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn record_error(&self, error: &DomainError) {
        self.last_error.store(Some(Arc::new(error.clone())));
    }

    pub fn last_error(&self) -> Option<DomainError> {
        self.last_error.load_full().map(|e| (*e).clone())
    }
}
