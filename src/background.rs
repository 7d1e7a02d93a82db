use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use color_eyre::Result;
use poise::serenity_prelude::{ChannelId, Http};
use tokio::sync::Notify;
use tracing::{error, info};

#[derive(Debug, Default)]
struct Counter {
    pending: AtomicUsize,
    idle: Notify,
}

/// Sheet writes running after their command has already replied.
#[derive(Debug, Clone, Default)]
pub struct PendingWrites(Arc<Counter>);

/// Where to tell people a write went wrong.
pub struct Report {
    pub http: Arc<Http>,
    pub channel: ChannelId,
}

impl PendingWrites {
    pub fn pending(&self) -> usize {
        self.0.pending.load(Ordering::SeqCst)
    }

    pub fn spawn<F>(&self, what: impl Into<String>, report: Option<Report>, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let counter = self.0.clone();
        let what = what.into();
        counter.pending.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            match task.await {
                Ok(()) => info!("Background {what} finished"),
                Err(e) => {
                    error!("Background {what} failed: {e:?}");
                    if let Some(Report { http, channel }) = report {
                        let msg = format!(
                            "Failed to update the sheet for {what}. \
                             Please tell an admin, the sheet may be out of date."
                        );
                        if let Err(e) = channel.say(&http, msg).await {
                            error!("Could not report the failure to {channel}: {e}");
                        }
                    }
                }
            }

            if counter.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                counter.idle.notify_waiters();
            }
        });
    }

    /// Wait for every write to finish. False if `limit` ran out first.
    pub async fn wait_idle(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, async {
            loop {
                let notified = self.0.idle.notified();
                if self.pending() == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::eyre::eyre;

    use super::*;

    #[tokio::test]
    async fn waits_for_all_writes() {
        let writes = PendingWrites::default();
        assert!(writes.wait_idle(Duration::from_millis(10)).await);

        for delay in [20, 40] {
            writes.spawn("slow write", None, async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(())
            });
        }
        writes.spawn("broken write", None, async { Err(eyre!("sheet went away")) });

        assert!(writes.wait_idle(Duration::from_secs(5)).await);
        assert_eq!(writes.pending(), 0);
    }

    #[tokio::test]
    async fn gives_up_after_limit() {
        let writes = PendingWrites::default();
        writes.spawn("stuck write", None, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        assert!(!writes.wait_idle(Duration::from_millis(20)).await);
        assert_eq!(writes.pending(), 1);
    }
}
