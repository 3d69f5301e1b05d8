use std::sync::Arc;

use tokio::runtime;
use tokio::sync::Semaphore;

use crate::core::config::Config;
use crate::core::delivery::Shared;
use crate::core::dispatcher::Dispatcher;
use crate::core::extension::ExtensionRef;
use crate::error::BusError;
use crate::events::ReportBus;

/// Builder for constructing a [`Dispatcher`] with optional features.
pub struct DispatcherBuilder {
    cfg: Config,
    extension: Option<ExtensionRef>,
}

impl DispatcherBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            extension: None,
        }
    }

    /// Installs an extension hook.
    ///
    /// The extension observes every registration and every trigger
    /// (see [`Extension`](crate::Extension)).
    pub fn with_extension(mut self, extension: ExtensionRef) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Builds and returns the dispatcher.
    ///
    /// This consumes the builder and initializes all runtime components:
    /// - Delivery runtime (workers + bounded blocking pool)
    /// - Report bus
    /// - Optional in-flight semaphore
    pub fn build(self) -> Result<Dispatcher, BusError> {
        let rt = runtime::Builder::new_multi_thread()
            .worker_threads(self.cfg.worker_threads_resolved())
            .max_blocking_threads(self.cfg.delivery_threads_resolved())
            .thread_name(self.cfg.thread_name.clone())
            .enable_time()
            .build()?;

        let reports = ReportBus::new(self.cfg.report_capacity_clamped());
        let semaphore = self
            .cfg
            .in_flight_limit()
            .map(Semaphore::new)
            .map(Arc::new);

        let shared = Shared::new(reports, self.extension, semaphore, rt.handle().clone());

        tracing::debug!(
            workers = self.cfg.worker_threads_resolved(),
            delivery_threads = self.cfg.delivery_threads_resolved(),
            max_in_flight = self.cfg.max_in_flight,
            "event bus started"
        );
        Ok(Dispatcher::new_internal(shared, rt))
    }
}
