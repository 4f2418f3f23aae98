use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::SupportDeskService;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub session: Arc<SessionManager>,
    pub support_desk: Arc<dyn SupportDeskService>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        session: Arc<SessionManager>,
        support_desk: Arc<dyn SupportDeskService>,
    ) -> Self {
        Self {
            config,
            session,
            support_desk,
        }
    }
}
