use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;

pub(super) use super::reduce;
pub(super) use super::BuildEffect;
pub(super) use crate::actions::BuildAction;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::config::ControllerConfig;
pub(super) use crate::error::ControllerError;
pub(super) use crate::error::FetchError;
pub(super) use crate::history::HistoryPage;
pub(super) use crate::history::Page;
pub(super) use crate::keyboard::Key;
pub(super) use crate::output::Envelope;
pub(super) use crate::routes::Route;
pub(super) use crate::scroll::ScrollTarget;
pub(super) use crate::state::Build;
pub(super) use crate::state::BuildDuration;
pub(super) use crate::state::BuildId;
pub(super) use crate::state::BuildPreparation;
pub(super) use crate::state::BuildReference;
pub(super) use crate::state::BuildStatus;
pub(super) use crate::state::BuildViewState;
pub(super) use crate::state::BrowsingEpoch;
pub(super) use crate::state::Job;
pub(super) use crate::state::JobIdentifier;
pub(super) use crate::state::LoadFailure;
pub(super) use crate::state::LoadState;

mod failures;
mod page_switch;

fn state() -> BuildViewState {
    BuildViewState::new(ControllerConfig::default())
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn job() -> JobIdentifier {
    JobIdentifier::new("main", "ci", "unit")
}

fn build(id: u64, status: BuildStatus) -> Build {
    Build {
        id: BuildId(id),
        name: id.to_string(),
        status,
        job: Some(job()),
        duration: BuildDuration::default(),
        reaped_at: None,
    }
}

fn run_user(state: &mut BuildViewState, action: UserAction) -> Vec<BuildEffect> {
    reduce(state, BuildAction::User(action)).unwrap()
}

fn run_runtime(state: &mut BuildViewState, action: RuntimeAction) -> Vec<BuildEffect> {
    reduce(state, BuildAction::Runtime(action)).unwrap()
}

/// Switches to a standalone build and returns the epoch it opened.
fn switch(state: &mut BuildViewState, id: u64) -> BrowsingEpoch {
    run_user(
        state,
        UserAction::SwitchTo(BuildReference::Standalone(BuildId(id))),
    );
    state.page.epoch.unwrap()
}

fn fetched(state: &mut BuildViewState, epoch: BrowsingEpoch, build: Build) -> Vec<BuildEffect> {
    run_runtime(
        state,
        RuntimeAction::BuildFetched {
            epoch,
            result: Ok(build),
        },
    )
}

/// Switches to `build` and completes its fetch, leaving job details and
/// history requests unanswered.
fn load(state: &mut BuildViewState, build: Build) -> BrowsingEpoch {
    let epoch = switch(state, build.id.0);
    fetched(state, epoch, build);
    epoch
}

fn with_history(state: &mut BuildViewState, builds: Vec<Build>) {
    run_runtime(
        state,
        RuntimeAction::HistoryFetched {
            job: job(),
            result: Ok(HistoryPage {
                builds,
                next: None,
            }),
        },
    );
}

fn key_down(state: &mut BuildViewState, key: Key) -> Vec<BuildEffect> {
    run_user(state, UserAction::KeyDown(key))
}

fn key_up(state: &mut BuildViewState, key: Key) -> Vec<BuildEffect> {
    run_user(state, UserAction::KeyUp(key))
}

fn status_event(status: &str, time: i64) -> Envelope {
    Envelope::Event(format!(
        r#"{{"event":"status","status":"{status}","time":{time}}}"#
    ))
}

fn log_event(payload: &str) -> Envelope {
    Envelope::Event(format!(r#"{{"event":"log","payload":"{payload}"}}"#))
}
