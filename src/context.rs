use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{ScmProviders, TrackingToolService};

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub providers: ScmProviders,
    pub tracking_tool: Arc<dyn TrackingToolService>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        providers: ScmProviders,
        tracking_tool: Arc<dyn TrackingToolService>,
    ) -> Self {
        Self {
            config,
            providers,
            tracking_tool,
        }
    }
}
