use std::sync::Arc;
use std::time::Duration;

use crate::attendance::punch::PunchService;
use crate::config::Config;
use crate::services::profile::ProfileService;
use crate::store::DocumentStore;
use crate::store::object::ObjectStore;
use crate::utils::clock::Clock;
use crate::utils::date_key::DayCalendar;
use crate::utils::profile_cache::ProfileCache;

/// Shared per-process services, registered once as `web::Data<AppState>`
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub profiles: ProfileService,
    pub punches: PunchService,
    pub calendar: DayCalendar,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let profiles = ProfileService::new(
            store.clone(),
            ProfileCache::new(config.profile_cache_capacity),
        );
        let punches = PunchService::new(
            store.clone(),
            objects,
            profiles.clone(),
            Arc::new(config.geofence.clone()),
            config.calendar,
            clock.clone(),
            Duration::from_secs(config.location_timeout_secs),
        );

        Self {
            store,
            profiles,
            punches,
            calendar: config.calendar,
            clock,
        }
    }

    pub fn today_key(&self) -> String {
        self.calendar.date_key(self.clock.now())
    }
}
