//! Running service: caches, monitor and scheduler wired over one record store
//!
//! The scheduler lists windows straight from the store on every cycle so a
//! newly created window is picked up within one poll interval. The cached
//! collections are the read side for status page consumers embedding this
//! crate; the maintenance view is dropped whenever the monitor advances a
//! window so readers never see a status older than the last transition.

use std::sync::Arc;

use tracing::info;
use vigil_cache::CollectionCache;
use vigil_client::{LogNotifier, RecordStoreClient, WebhookNotifier};
use vigil_common::{BackgroundTask, Clock, Incident, MaintenanceWindow};
use vigil_maintenance::{MaintenanceMonitor, MaintenanceScheduler, Notifier, SchedulerHandle};

use crate::config::Configuration;
use crate::startup::GracefulShutdown;

pub struct VigilService {
    incidents: CollectionCache<Incident>,
    maintenance_view: CollectionCache<MaintenanceWindow>,
    scheduler: SchedulerHandle,
    incident_refresher: BackgroundTask,
    maintenance_refresher: BackgroundTask,
}

impl VigilService {
    /// Build every component and spawn the background loops on the current runtime.
    pub fn start(configuration: &Configuration, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let store_config = configuration.record_store_config()?;
        info!("Using record store at {}", store_config.base_url);
        let store = RecordStoreClient::new(store_config)?;
        let cache_config = configuration.cache_config()?;
        let refresh_interval = configuration.cache_refresh_interval()?;

        let incidents = CollectionCache::<Incident>::new(
            "incidents",
            Arc::new(store.incidents(&configuration.incidents_collection())),
            clock.clone(),
            cache_config.clone(),
        );
        let incident_refresher = incidents.spawn_refresher(refresh_interval);

        let maintenance = Arc::new(store.maintenance(&configuration.maintenance_collection()));
        let maintenance_view = CollectionCache::<MaintenanceWindow>::new(
            "maintenance",
            maintenance.clone(),
            clock.clone(),
            cache_config,
        );
        let maintenance_refresher = maintenance_view.spawn_refresher(refresh_interval);

        let notifier: Arc<dyn Notifier> = match configuration.webhook_config()? {
            Some(webhook) => {
                info!("Sending maintenance notifications to {}", webhook.url);
                Arc::new(WebhookNotifier::new(webhook)?)
            }
            None => {
                info!("No webhook configured, maintenance notifications will only be logged");
                Arc::new(LogNotifier)
            }
        };

        let view = maintenance_view.clone();
        let monitor = Arc::new(
            MaintenanceMonitor::new(maintenance.clone(), notifier)
                .with_cooldown(configuration.cooldown_policy()?)
                .on_advanced(Arc::new(move || view.invalidate())),
        );

        let scheduler = MaintenanceScheduler::spawn(
            monitor,
            maintenance,
            clock,
            configuration.scheduler_config()?,
        );

        Ok(Self {
            incidents,
            maintenance_view,
            scheduler,
            incident_refresher,
            maintenance_refresher,
        })
    }

    pub fn incidents(&self) -> &CollectionCache<Incident> {
        &self.incidents
    }

    /// Maintenance windows as last read from the store
    pub fn maintenance_view(&self) -> &CollectionCache<MaintenanceWindow> {
        &self.maintenance_view
    }

    /// Ask the scheduler for an evaluation outside its regular interval
    pub fn trigger_evaluation(&self) {
        self.scheduler.trigger();
    }

    /// Stop the scheduler first, then the refreshers
    pub async fn shutdown(self, shutdown: &GracefulShutdown) {
        shutdown
            .stop("maintenance scheduler", self.scheduler.shutdown())
            .await;
        shutdown
            .stop(
                "maintenance cache refresher",
                self.maintenance_refresher.shutdown(),
            )
            .await;
        shutdown
            .stop("incident cache refresher", self.incident_refresher.shutdown())
            .await;
    }
}
