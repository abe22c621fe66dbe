//! A uniform contract for "do your periodic background work" so a single
//! external ticker can drive many otherwise-unrelated components.

/// Implemented by anything with periodic upkeep to perform - a poll loop
/// iteration, a repricing tick, a cleanup sweep. Errors are reported, not
/// propagated: a failed maintenance pass is logged by the caller and
/// retried on the next tick rather than aborting the process.
#[async_trait::async_trait]
pub trait Maintaining: Send + Sync {
    async fn run_maintenance(&self) -> anyhow::Result<()>;

    /// A short name for log lines and metrics labels.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Runs every registered [`Maintaining`] task concurrently, logging (but not
/// propagating) individual failures.
pub struct ServiceMaintenance {
    maintainers: Vec<Box<dyn Maintaining>>,
}

impl ServiceMaintenance {
    pub fn new(maintainers: Vec<Box<dyn Maintaining>>) -> Self {
        Self { maintainers }
    }

    pub async fn run_maintenance(&self) {
        let tasks = self.maintainers.iter().map(|m| async move {
            if let Err(err) = m.run_maintenance().await {
                tracing::warn!(name = m.name(), %err, "maintenance task failed");
            }
        });
        futures::future::join_all(tasks).await;
    }
}
