//! The global admission scheduler.
//!
//! A single long-running loop drains the global pending queue and routes each
//! job onto its owning user's queue, enforcing the fairness cap: at most
//! `max_active_users` distinct users may own RUNNING jobs at any moment.
//! Jobs whose user would exceed the cap are deferred back to the queue tail;
//! a deferred user gets another chance once enough admitted work drains.
//!
//! The scheduler only reads the active-user set; workers own its membership.
//! Strict FIFO holds within a user, and cross-user fairness emerges from the
//! defer-to-tail policy. There is no priority.

use crate::config::SchedulerConfig;
use crate::control::{self, SchedulerState};
use fairway_store::{SharedStore, StoreError, keys};

/// The admission scheduler loop.
pub struct Scheduler {
    store: SharedStore,
    config: SchedulerConfig,
}

/// What one loop iteration did. Used by tests to drive the loop step by step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Scheduler is paused; nothing was popped.
    Paused,
    /// The pending queue stayed empty for the whole pop timeout.
    Idle,
    /// A job was routed onto its user's queue.
    Admitted,
    /// A job was pushed back to the pending tail.
    Deferred,
    /// A job id without usable metadata was dropped.
    Dropped,
}

impl Scheduler {
    /// Creates the scheduler over the shared store.
    #[must_use]
    pub fn new(store: SharedStore, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    /// Runs the admission loop forever. Store failures are logged and retried
    /// after a short back-off; they never terminate the loop.
    pub async fn run(self) {
        tracing::info!(
            max_active_users = self.config.max_active_users,
            "scheduler loop started"
        );
        loop {
            if let Err(err) = self.tick().await {
                tracing::warn!(error = %err, "scheduler iteration failed; backing off");
                tokio::time::sleep(self.config.paused_sleep()).await;
            }
        }
    }

    /// Executes one loop iteration.
    pub(crate) async fn tick(&self) -> Result<Tick, StoreError> {
        // On first boot the control key does not exist yet; initialize to
        // paused so nothing runs until an operator starts the scheduler.
        let state = match self.store.get(keys::SCHEDULER_STATE).await? {
            Some(raw) => SchedulerState::parse(&raw),
            None => {
                control::set_state(self.store.as_ref(), SchedulerState::Paused).await?;
                SchedulerState::Paused
            }
        };
        if state == SchedulerState::Paused {
            tokio::time::sleep(self.config.paused_sleep()).await;
            return Ok(Tick::Paused);
        }

        let Some(job_id) = self
            .store
            .blocking_pop_front(keys::SCHEDULER_PENDING_JOBS, self.config.pop_timeout())
            .await?
        else {
            return Ok(Tick::Idle);
        };

        match self.route(&job_id).await {
            Ok(tick) => Ok(tick),
            Err(err) => {
                // The job is already off the pending queue; put it back so a
                // transient store failure cannot lose it.
                if let Err(requeue_err) = self
                    .store
                    .push_back(keys::SCHEDULER_PENDING_JOBS, &job_id)
                    .await
                {
                    tracing::error!(
                        job_id = %job_id,
                        error = %requeue_err,
                        "failed to requeue job after routing error"
                    );
                }
                Err(err)
            }
        }
    }

    /// Routes one popped job id: admit to its user's queue or defer.
    async fn route(&self, job_id: &str) -> Result<Tick, StoreError> {
        let user_id = self
            .store
            .hash_get(&keys::job_data(job_id), "user_id")
            .await?
            .filter(|user_id| !user_id.is_empty());

        let Some(user_id) = user_id else {
            tracing::warn!(job_id = %job_id, "dropping job without metadata");
            return Ok(Tick::Dropped);
        };

        let active = self
            .store
            .set_members(keys::SCHEDULER_ACTIVE_USERS)
            .await?;
        let admit = active.iter().any(|active_user| active_user == &user_id)
            || active.len() < self.config.max_active_users;

        if admit {
            // The worker adds the user to the active set once the job is
            // actually RUNNING; admission never pre-claims a slot.
            self.store
                .push_back(&keys::user_queue(&user_id), job_id)
                .await?;
            tracing::debug!(job_id = %job_id, user_id = %user_id, "admitted job");
            Ok(Tick::Admitted)
        } else {
            self.store
                .push_back(keys::SCHEDULER_PENDING_JOBS, job_id)
                .await?;
            tracing::debug!(job_id = %job_id, user_id = %user_id, "deferred job");
            tokio::time::sleep(self.config.defer_sleep()).await;
            Ok(Tick::Deferred)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway_store::{MemoryStore, StateStore};
    use std::sync::Arc;

    fn scheduler(store: Arc<MemoryStore>) -> Scheduler {
        let config = SchedulerConfig {
            pop_timeout_ms: 50,
            defer_sleep_ms: 10,
            paused_sleep_ms: 10,
            ..SchedulerConfig::default()
        };
        Scheduler::new(store, config)
    }

    async fn seed_job(store: &MemoryStore, job_id: &str, user_id: &str) {
        store
            .hash_set(&keys::job_data(job_id), "user_id", user_id)
            .await
            .unwrap();
        store
            .push_back(keys::SCHEDULER_PENDING_JOBS, job_id)
            .await
            .unwrap();
    }

    async fn start_running(store: &MemoryStore) {
        control::set_state(store, SchedulerState::Running)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_initializes_paused_state() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = scheduler(store.clone());

        assert_eq!(scheduler.tick().await.unwrap(), Tick::Paused);
        assert_eq!(
            store.get(keys::SCHEDULER_STATE).await.unwrap(),
            Some("paused".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn paused_scheduler_does_not_pop() {
        let store = Arc::new(MemoryStore::new());
        seed_job(&store, "j1", "u1").await;
        let scheduler = scheduler(store.clone());

        assert_eq!(scheduler.tick().await.unwrap(), Tick::Paused);
        assert_eq!(
            store.list_len(keys::SCHEDULER_PENDING_JOBS).await.unwrap(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn admits_when_below_cap() {
        let store = Arc::new(MemoryStore::new());
        start_running(&store).await;
        seed_job(&store, "j1", "u1").await;
        let scheduler = scheduler(store.clone());

        assert_eq!(scheduler.tick().await.unwrap(), Tick::Admitted);
        assert_eq!(
            store.list_range(&keys::user_queue("u1")).await.unwrap(),
            vec!["j1"]
        );
        assert_eq!(
            store.list_len(keys::SCHEDULER_PENDING_JOBS).await.unwrap(),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn admits_active_user_over_cap() {
        let store = Arc::new(MemoryStore::new());
        start_running(&store).await;
        for user in ["a", "b", "c"] {
            store
                .set_add(keys::SCHEDULER_ACTIVE_USERS, user)
                .await
                .unwrap();
        }
        // "a" is already active, so its next job is admitted despite the
        // full cap.
        seed_job(&store, "j1", "a").await;
        let scheduler = scheduler(store.clone());

        assert_eq!(scheduler.tick().await.unwrap(), Tick::Admitted);
        assert_eq!(
            store.list_range(&keys::user_queue("a")).await.unwrap(),
            vec!["j1"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn defers_new_user_at_cap() {
        let store = Arc::new(MemoryStore::new());
        start_running(&store).await;
        for user in ["a", "b", "c"] {
            store
                .set_add(keys::SCHEDULER_ACTIVE_USERS, user)
                .await
                .unwrap();
        }
        seed_job(&store, "j1", "d").await;
        seed_job(&store, "j2", "d").await;
        let scheduler = scheduler(store.clone());

        assert_eq!(scheduler.tick().await.unwrap(), Tick::Deferred);
        // Deferred to the tail: j2 is now at the head.
        assert_eq!(
            store.list_range(keys::SCHEDULER_PENDING_JOBS).await.unwrap(),
            vec!["j2", "j1"]
        );
        assert!(store.list_range(&keys::user_queue("d")).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drops_job_without_metadata() {
        let store = Arc::new(MemoryStore::new());
        start_running(&store).await;
        store
            .push_back(keys::SCHEDULER_PENDING_JOBS, "ghost")
            .await
            .unwrap();
        let scheduler = scheduler(store.clone());

        assert_eq!(scheduler.tick().await.unwrap(), Tick::Dropped);
        assert_eq!(
            store.list_len(keys::SCHEDULER_PENDING_JOBS).await.unwrap(),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_queue_ticks_idle() {
        let store = Arc::new(MemoryStore::new());
        start_running(&store).await;
        let scheduler = scheduler(store.clone());

        assert_eq!(scheduler.tick().await.unwrap(), Tick::Idle);
    }
}
