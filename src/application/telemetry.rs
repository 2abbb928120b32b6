//! Periodic active-call reporting

use crate::domain::session::{ActiveCallRegistry, CallDirection};
use crate::domain::system_of_record::{ActiveCallReport, SystemOfRecord};
use crate::domain::Result;
use metrics::gauge;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub struct ActiveCallReporter {
    registry: Arc<dyn ActiveCallRegistry>,
    backend: Arc<dyn SystemOfRecord>,
    direction: CallDirection,
    interval: Duration,
}

impl ActiveCallReporter {
    pub fn new(
        registry: Arc<dyn ActiveCallRegistry>,
        backend: Arc<dyn SystemOfRecord>,
        direction: CallDirection,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            backend,
            direction,
            interval,
        }
    }

    /// Publish the current registry size once
    pub async fn report_once(&self) -> Result<usize> {
        let active = self.registry.size().await;
        gauge!("callbridge_active_calls").set(active as f64);

        self.backend
            .log_active_calls(&ActiveCallReport {
                active_call: active,
                pick_count: 0,
                direction: self.direction.as_str().to_string(),
            })
            .await?;
        debug!(active, "Active calls reported");

        Ok(active)
    }

    /// Report forever. The next tick is scheduled only after the previous
    /// report has finished.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.report_once().await {
                    error!(error = %e, "Error in active call report");
                }
                tokio::time::sleep(self.interval).await;
            }
        })
    }
}
