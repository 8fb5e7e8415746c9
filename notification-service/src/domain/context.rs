use async_trait::async_trait;
use shared::types::{Process, Schedule, ScheduleChange, Shift, ShiftChange, TeamMember};
use uuid::Uuid;

use crate::error::BackendError;

/// Read access to the schedule/shift backend.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait ContextFetcher: Send + Sync {
    /// `None` when the backend has no schedule with this id.
    async fn get_schedule(&self, schedule_id: Uuid) -> Result<Option<Schedule>, BackendError>;
    async fn get_team_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, BackendError>;
    async fn get_shifts(&self, schedule_id: Uuid) -> Result<Vec<Shift>, BackendError>;
    async fn get_schedule_history(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<ScheduleChange>, BackendError>;
    async fn get_shift_history(&self, schedule_id: Uuid)
    -> Result<Vec<ShiftChange>, BackendError>;
    async fn get_processes(&self, schedule_id: Uuid) -> Result<Vec<Process>, BackendError>;
}

/// Snapshot of everything the change report needs.
#[derive(Debug, Clone, Default)]
pub struct ChangeContext {
    pub schedule: Option<Schedule>,
    pub members: Vec<TeamMember>,
    pub shifts: Vec<Shift>,
    pub schedule_history: Vec<ScheduleChange>,
    pub shift_history: Vec<ShiftChange>,
    pub processes: Vec<Process>,
}

/// Loads the schedule, then the rest of the context concurrently.
///
/// The first failing request aborts the whole fetch; a partial context is
/// never returned. A missing schedule short-circuits with an otherwise empty
/// context.
#[tracing::instrument(skip(fetcher))]
pub async fn fetch_context(
    fetcher: &dyn ContextFetcher,
    schedule_id: Uuid,
) -> Result<ChangeContext, BackendError> {
    let Some(schedule) = fetcher.get_schedule(schedule_id).await? else {
        tracing::warn!(%schedule_id, "Schedule not found, skipping remaining context");
        return Ok(ChangeContext::default());
    };

    let team_id = schedule.team_id;
    let members = async {
        match team_id {
            Some(team_id) => fetcher.get_team_members(team_id).await,
            None => Ok(Vec::new()),
        }
    };

    let (members, shifts, schedule_history, shift_history, processes) = tokio::try_join!(
        members,
        fetcher.get_shifts(schedule_id),
        fetcher.get_schedule_history(schedule_id),
        fetcher.get_shift_history(schedule_id),
        fetcher.get_processes(schedule_id),
    )?;

    tracing::debug!(
        members = members.len(),
        shifts = shifts.len(),
        schedule_history = schedule_history.len(),
        shift_history = shift_history.len(),
        processes = processes.len(),
        "Context fetched"
    );

    Ok(ChangeContext {
        schedule: Some(schedule),
        members,
        shifts,
        schedule_history,
        shift_history,
        processes,
    })
}
