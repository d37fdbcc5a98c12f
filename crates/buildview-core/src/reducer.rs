use std::time::Duration;

use tracing::debug;
use tracing::info;

use super::actions::BuildAction;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::error::ControllerError;
use super::history::History;
use super::history::Page;
use super::keyboard::KeyCommand;
use super::routes::build_route;
use super::routes::Route;
use super::scroll::autoscroll_after_scroll;
use super::scroll::history_wheel_delta;
use super::scroll::ScrollTarget;
use super::state::Build;
use super::state::BuildId;
use super::state::BuildReference;
use super::state::BuildStatus;
use super::state::BrowsingEpoch;
use super::state::BuildViewState;
use super::state::JobIdentifier;
use super::state::JobState;
use super::state::LoadState;

mod fetch;
mod stream;

#[cfg(test)]
mod tests;

/// Work the controller asks its environment to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEffect {
    FetchBuild {
        epoch: BrowsingEpoch,
        reference: BuildReference,
        delay: Duration,
    },
    FetchPreparation {
        epoch: BrowsingEpoch,
        build: BuildId,
        delay: Duration,
    },
    FetchHistory {
        job: JobIdentifier,
        page: Option<Page>,
    },
    FetchJobDetails(JobIdentifier),
    OpenEventStream {
        path: String,
    },
    CloseEventStream,
    TriggerBuild(JobIdentifier),
    AbortBuild(BuildId),
    NavigateTo(Route),
    Scroll(ScrollTarget),
    SetWindowTitle(String),
    SetFavicon(Option<BuildStatus>),
    RedirectToLogin,
}

/// Applies one inbound action and returns the effects it requires.
///
/// The only error is a protocol violation that a correctly behaving
/// environment cannot produce; callers should treat it as fatal.
pub fn reduce(
    state: &mut BuildViewState,
    action: BuildAction,
) -> Result<Vec<BuildEffect>, ControllerError> {
    match action {
        BuildAction::User(user) => Ok(reduce_user(state, user)),
        BuildAction::Runtime(runtime) => reduce_runtime(state, runtime),
    }
}

fn reduce_user(state: &mut BuildViewState, action: UserAction) -> Vec<BuildEffect> {
    match action {
        UserAction::SwitchTo(reference) => switch_to(state, reference),
        UserAction::KeyDown(key) => match state.interaction.keyboard.key_down(key) {
            Some(command) => run_key_command(state, command),
            None => Vec::new(),
        },
        UserAction::KeyUp(key) => {
            state.interaction.keyboard.key_up(key);
            Vec::new()
        }
        UserAction::Scrolled {
            distance_from_bottom,
        } => {
            state.interaction.autoscroll = autoscroll_after_scroll(distance_from_bottom);
            Vec::new()
        }
        UserAction::Wheel { delta_x, delta_y } => vec![BuildEffect::Scroll(
            ScrollTarget::HistoryBy(history_wheel_delta(delta_x, delta_y)),
        )],
        UserAction::TriggerClicked => trigger(state),
        UserAction::AbortClicked => abort(state),
        UserAction::HistoryClicked(id) => state
            .history
            .get(id)
            .map(|build| vec![BuildEffect::NavigateTo(build_route(build))])
            .unwrap_or_default(),
    }
}

fn reduce_runtime(
    state: &mut BuildViewState,
    action: RuntimeAction,
) -> Result<Vec<BuildEffect>, ControllerError> {
    match action {
        RuntimeAction::BuildFetched { epoch, result } => {
            Ok(fetch::build_fetched(state, epoch, result))
        }
        RuntimeAction::PreparationFetched { epoch, result } => {
            Ok(fetch::preparation_fetched(state, epoch, result))
        }
        RuntimeAction::HistoryFetched { job, result } => fetch::history_fetched(state, job, result),
        RuntimeAction::JobFetched(result) => Ok(fetch::job_fetched(state, result)),
        RuntimeAction::BuildTriggered(result) => Ok(fetch::build_triggered(state, result)),
        RuntimeAction::BuildAborted(result) => Ok(fetch::build_aborted(result)),
        RuntimeAction::StreamEnvelopes(envelopes) => {
            Ok(stream::envelopes_received(state, envelopes))
        }
        RuntimeAction::StatusChanged { status, at } => {
            Ok(stream::status_changed(state, status, at))
        }
        RuntimeAction::ClockTicked(now) => {
            state.now = Some(now);
            Ok(Vec::new())
        }
    }
}

/// Points the view at another build, opening a new browsing epoch.
fn switch_to(state: &mut BuildViewState, reference: BuildReference) -> Vec<BuildEffect> {
    if state.page.epoch.is_some() && state.page.target.as_ref() == Some(&reference) {
        debug!(?reference, "already showing build; ignoring switch");
        return Vec::new();
    }

    let epoch = state
        .page
        .epoch
        .map_or(BrowsingEpoch::FIRST, BrowsingEpoch::next);
    state.page.epoch = Some(epoch);
    state.page.target = Some(reference.clone());
    state.interaction.autoscroll = true;

    // The previous build stays on screen until the new one arrives.
    state.build = match std::mem::take(&mut state.build) {
        LoadState::Success(mut info) => {
            info.preparation = None;
            info.output = None;
            LoadState::Success(info)
        }
        _ => LoadState::Loading,
    };

    if let Some(job) = reference.job() {
        if state.job.reference.as_ref() != Some(job) {
            state.job = JobState::default();
            state.history.clear();
        }
    }

    debug!(%epoch, ?reference, "switching build");
    vec![
        BuildEffect::CloseEventStream,
        BuildEffect::FetchBuild {
            epoch,
            reference,
            delay: Duration::ZERO,
        },
    ]
}

fn run_key_command(state: &mut BuildViewState, command: KeyCommand) -> Vec<BuildEffect> {
    match command {
        KeyCommand::PreviousBuild => navigate_to_neighbour(state, History::previous_of),
        KeyCommand::NextBuild => navigate_to_neighbour(state, History::next_of),
        KeyCommand::ScrollDown => vec![BuildEffect::Scroll(ScrollTarget::Down(
            state.settings.scroll_increment,
        ))],
        KeyCommand::ScrollUp => vec![BuildEffect::Scroll(ScrollTarget::Up(
            state.settings.scroll_increment,
        ))],
        KeyCommand::TriggerBuild => trigger(state),
        KeyCommand::AbortBuild => abort(state),
        KeyCommand::ScrollToBottom => {
            state.interaction.autoscroll = true;
            vec![BuildEffect::Scroll(ScrollTarget::ToBottom)]
        }
        KeyCommand::ScrollToTop => {
            state.interaction.autoscroll = false;
            vec![BuildEffect::Scroll(ScrollTarget::ToTop)]
        }
        KeyCommand::ToggleHelp => {
            state.interaction.help_visible = !state.interaction.help_visible;
            Vec::new()
        }
    }
}

fn navigate_to_neighbour(
    state: &BuildViewState,
    neighbour: for<'a> fn(&'a History, BuildId) -> Option<&'a Build>,
) -> Vec<BuildEffect> {
    let Some(current) = state.current_build() else {
        return Vec::new();
    };
    neighbour(&state.history, current.id)
        .map(|build| vec![BuildEffect::NavigateTo(build_route(build))])
        .unwrap_or_default()
}

fn trigger(state: &BuildViewState) -> Vec<BuildEffect> {
    let Some(job) = state.trigger_target() else {
        return Vec::new();
    };
    if state
        .job
        .details
        .as_ref()
        .is_some_and(|details| details.disable_manual_trigger)
    {
        info!(%job, "manual triggering is disabled for job");
        return Vec::new();
    }
    info!(%job, "triggering build");
    vec![BuildEffect::TriggerBuild(job.clone())]
}

/// Only the most recent build of the job can be aborted from the view.
fn abort(state: &BuildViewState) -> Vec<BuildEffect> {
    match state.current_build() {
        Some(build) if state.history.is_latest(build.id) => {
            info!(build = %build.id, "aborting build");
            vec![BuildEffect::AbortBuild(build.id)]
        }
        _ => Vec::new(),
    }
}
