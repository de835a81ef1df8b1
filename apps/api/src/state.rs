use std::sync::Arc;

use tokio::sync::Mutex;

use crate::coach::session::CoachSession;
use crate::scan::store::SessionStore;
use crate::scan::vision::VisionScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one active conversation. Holding the lock is the submit-while-pending
    /// guard: a reply keeps it until its last unit is delivered.
    pub coach: Arc<Mutex<CoachSession>>,
    /// Single-slot store for the last scan.
    pub sessions: Arc<dyn SessionStore>,
    pub vision: Arc<dyn VisionScorer>,
}

impl AppState {
    pub fn new(
        coach: CoachSession,
        sessions: Arc<dyn SessionStore>,
        vision: Arc<dyn VisionScorer>,
    ) -> Self {
        Self {
            coach: Arc::new(Mutex::new(coach)),
            sessions,
            vision,
        }
    }
}
