use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::stream;
use super::BuildEffect;
use crate::error::ControllerError;
use crate::error::FailureClass;
use crate::error::FetchError;
use crate::history::HistoryPage;
use crate::routes::build_route;
use crate::state::Build;
use crate::state::BuildPreparation;
use crate::state::BuildReference;
use crate::state::BuildStatus;
use crate::state::BrowsingEpoch;
use crate::state::BuildViewState;
use crate::state::CurrentBuildInfo;
use crate::state::Job;
use crate::state::JobIdentifier;
use crate::state::LoadFailure;
use crate::state::LoadState;

pub(super) fn build_fetched(
    state: &mut BuildViewState,
    epoch: BrowsingEpoch,
    result: Result<Build, FetchError>,
) -> Vec<BuildEffect> {
    if !state.page.is_current(epoch) {
        debug!(%epoch, "discarding build fetched under stale epoch");
        return Vec::new();
    }
    match result {
        Ok(build) => build_loaded(state, epoch, build),
        Err(err) => match err.classify() {
            FailureClass::NotFound => {
                info!(%epoch, "build not found");
                state.build = LoadState::Failure(LoadFailure::NotFound);
                Vec::new()
            }
            _ => request_failed("build", &err),
        },
    }
}

fn build_loaded(state: &mut BuildViewState, epoch: BrowsingEpoch, build: Build) -> Vec<BuildEffect> {
    let mut effects = Vec::new();
    let build_id = build.id;
    let status = build.status;

    state.history.replace(&build);
    let new_job = build
        .job
        .as_ref()
        .filter(|job| state.job.reference.as_ref() != Some(*job))
        .cloned();

    let same_build = state
        .current_build()
        .is_some_and(|current| current.id == build_id);
    if same_build {
        if let Some(info) = state.build.as_success_mut() {
            info.build = build;
        }
    } else {
        if state.current_output().is_some() {
            effects.push(BuildEffect::CloseEventStream);
        }
        state.build = LoadState::Success(CurrentBuildInfo::new(build));
    }

    if let Some(job) = new_job {
        if state.job.reference.is_some() {
            state.history.clear();
        }
        state.job.reference = Some(job.clone());
        state.job.details = None;
        effects.push(BuildEffect::FetchJobDetails(job.clone()));
        effects.push(BuildEffect::FetchHistory { job, page: None });
    }

    effects.push(BuildEffect::SetWindowTitle(state.window_title()));
    effects.push(BuildEffect::SetFavicon(Some(status)));

    if status == BuildStatus::Pending {
        let delay = state.settings.poll_interval();
        debug!(build = %build_id, ?delay, "build pending; polling again");
        effects.push(BuildEffect::FetchBuild {
            epoch,
            reference: BuildReference::Standalone(build_id),
            delay,
        });
        effects.push(BuildEffect::FetchPreparation {
            epoch,
            build: build_id,
            delay,
        });
    } else if let Some(open) = stream::attach_output(state) {
        effects.push(open);
    }

    effects
}

pub(super) fn preparation_fetched(
    state: &mut BuildViewState,
    epoch: BrowsingEpoch,
    result: Result<BuildPreparation, FetchError>,
) -> Vec<BuildEffect> {
    if !state.page.is_current(epoch) {
        debug!(%epoch, "discarding preparation fetched under stale epoch");
        return Vec::new();
    }
    match result {
        Ok(preparation) => {
            if let Some(info) = state.build.as_success_mut() {
                info.preparation = Some(preparation);
            }
            Vec::new()
        }
        Err(err) => request_failed("preparation", &err),
    }
}

pub(super) fn job_fetched(
    state: &mut BuildViewState,
    result: Result<Job, FetchError>,
) -> Vec<BuildEffect> {
    match result {
        Ok(job) => {
            if state.job.reference.as_ref() != Some(&job.id) {
                debug!(job = %job.id, "discarding details for a job no longer shown");
                return Vec::new();
            }
            state.job.details = Some(job);
            vec![BuildEffect::SetWindowTitle(state.window_title())]
        }
        Err(err) => request_failed("job", &err),
    }
}

pub(super) fn history_fetched(
    state: &mut BuildViewState,
    job: JobIdentifier,
    result: Result<HistoryPage, FetchError>,
) -> Result<Vec<BuildEffect>, ControllerError> {
    let page = match result {
        Ok(page) => page,
        Err(err) => return Ok(request_failed("history", &err)),
    };

    // A job-scoped switch forgets the job until its build arrives; the target
    // still names it.
    let known = state
        .job
        .reference
        .as_ref()
        .or_else(|| state.page.target.as_ref().and_then(BuildReference::job));
    match known {
        Some(known) if *known == job => {}
        Some(known) => {
            debug!(%job, shown = %known, "discarding history page for a job no longer shown");
            return Ok(Vec::new());
        }
        None => {
            if let Some(next) = page.next {
                error!(%job, ?next, "history continuation without a known job");
                return Err(ControllerError::PaginationWithoutJob { next });
            }
            debug!(%job, "discarding history page with no job shown");
            return Ok(Vec::new());
        }
    }

    state.history.append(page.builds);
    Ok(page
        .next
        .map(|next| BuildEffect::FetchHistory {
            job,
            page: Some(next),
        })
        .into_iter()
        .collect())
}

pub(super) fn build_triggered(
    state: &mut BuildViewState,
    result: Result<Build, FetchError>,
) -> Vec<BuildEffect> {
    match result {
        Ok(build) => {
            info!(build = %build.id, "build triggered");
            let route = build_route(&build);
            state.history.prepend(build);
            vec![BuildEffect::NavigateTo(route)]
        }
        Err(err) => request_failed("trigger", &err),
    }
}

pub(super) fn build_aborted(result: Result<(), FetchError>) -> Vec<BuildEffect> {
    match result {
        Ok(()) => {
            info!("abort accepted");
            Vec::new()
        }
        Err(err) => request_failed("abort", &err),
    }
}

/// Unauthorized requests send the user to log in; everything else is logged
/// and otherwise ignored, without retry.
fn request_failed(request: &'static str, err: &FetchError) -> Vec<BuildEffect> {
    match err.classify() {
        FailureClass::Unauthorized => vec![BuildEffect::RedirectToLogin],
        FailureClass::NotFound | FailureClass::Transient => {
            warn!(request, %err, "request failed");
            Vec::new()
        }
    }
}
