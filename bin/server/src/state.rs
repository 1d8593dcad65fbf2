//! Shared application state.

use fairway_scheduler::{SchedulerConfig, WorkerPool};
use fairway_store::SharedStore;
use fairway_workflow::{
    BranchManager, ExecutionManager, JobManager, JobRegistry, SlideManager, UserManager,
    WorkflowManager,
};
use std::sync::Arc;

/// Everything the route handlers need, shared behind one `Arc`.
pub struct AppState {
    pub store: SharedStore,
    pub registry: Arc<JobRegistry>,
    pub users: UserManager,
    pub workflows: WorkflowManager,
    pub branches: BranchManager,
    pub slides: SlideManager,
    pub jobs: JobManager,
    pub executions: ExecutionManager,
    pub pool: Arc<WorkerPool>,
}

impl AppState {
    /// Builds the state over one store handle and a finalized registry.
    #[must_use]
    pub fn new(store: SharedStore, registry: Arc<JobRegistry>, config: SchedulerConfig) -> Self {
        let pool = Arc::new(WorkerPool::new(
            store.clone(),
            Arc::clone(&registry),
            config,
        ));
        Self {
            users: UserManager::new(store.clone()),
            workflows: WorkflowManager::new(store.clone()),
            branches: BranchManager::new(store.clone()),
            slides: SlideManager::new(store.clone()),
            jobs: JobManager::new(store.clone()),
            executions: ExecutionManager::new(store.clone()),
            registry,
            pool,
            store,
        }
    }
}
