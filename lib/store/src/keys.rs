//! Shared key layout.
//!
//! Every component addresses the store through these helpers so the layout
//! stays migration-compatible: deployments that already hold data under these
//! keys keep working when the engine is swapped in underneath them.

/// Set of all registered user ids.
pub const USERS: &str = "users";

/// Legacy set of active users. Kept as a write-only mirror of
/// [`SCHEDULER_ACTIVE_USERS`] for older read-side consumers.
pub const ACTIVE_USERS: &str = "active_users";

/// Set of user ids currently owning RUNNING jobs; read by the admission check.
pub const SCHEDULER_ACTIVE_USERS: &str = "scheduler:active_users";

/// Global FIFO list of job ids awaiting admission (popped from the left).
pub const SCHEDULER_PENDING_JOBS: &str = "scheduler:pending_jobs";

/// Set of job ids currently RUNNING.
pub const SCHEDULER_RUNNING_JOBS: &str = "scheduler:running_jobs";

/// Hash of job id to encoded progress record.
pub const SCHEDULER_JOB_PROGRESS: &str = "scheduler:job_progress";

/// Scheduler control state: `running` or `paused`.
pub const SCHEDULER_STATE: &str = "scheduler:state";

/// Set of all workflow ids.
pub const WORKFLOWS: &str = "workflows";

/// Hash containing metadata for a specific user (`status: idle|running`).
pub fn user(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Per-user list of admitted job ids, drained by that user's worker only.
pub fn user_queue(user_id: &str) -> String {
    format!("user:{user_id}:queue")
}

/// Set of slide ids owned by a user.
pub fn user_slides(user_id: &str) -> String {
    format!("user:{user_id}:slides")
}

/// Hash containing workflow metadata (`name`, `owner_user_id`, `entry_branch`).
pub fn workflow(workflow_id: &str) -> String {
    format!("workflow:{workflow_id}")
}

/// Set of branch ids belonging to a workflow.
pub fn workflow_branches(workflow_id: &str) -> String {
    format!("workflow:{workflow_id}:branches")
}

/// Ordered list of encoded job specs for one branch.
pub fn workflow_branch(workflow_id: &str, branch_id: &str) -> String {
    format!("workflow:{workflow_id}:branch:{branch_id}")
}

/// Set of run ids recorded for a workflow.
pub fn workflow_runs(workflow_id: &str) -> String {
    format!("workflow:{workflow_id}:runs")
}

/// List of job ids created by one run, in insertion order.
pub fn workflow_run_jobs(workflow_id: &str, run_id: &str) -> String {
    format!("workflow:{workflow_id}:run:{run_id}:jobs")
}

/// Hash holding all fields of one job instance.
pub fn job_data(job_id: &str) -> String {
    format!("job:{job_id}:data")
}

/// Hash containing slide metadata.
pub fn slide(slide_id: &str) -> String {
    format!("slide:{slide_id}")
}
