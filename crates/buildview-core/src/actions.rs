use chrono::DateTime;
use chrono::Utc;

use super::error::FetchError;
use super::history::HistoryPage;
use super::keyboard::Key;
use super::output::Envelope;
use super::state::Build;
use super::state::BuildId;
use super::state::BuildPreparation;
use super::state::BuildReference;
use super::state::BuildStatus;
use super::state::BrowsingEpoch;
use super::state::Job;
use super::state::JobIdentifier;

#[derive(Debug, Clone, PartialEq)]
pub enum BuildAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    SwitchTo(BuildReference),
    KeyDown(Key),
    KeyUp(Key),
    Scrolled { distance_from_bottom: f64 },
    Wheel { delta_x: f64, delta_y: f64 },
    TriggerClicked,
    AbortClicked,
    HistoryClicked(BuildId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeAction {
    BuildFetched {
        epoch: BrowsingEpoch,
        result: Result<Build, FetchError>,
    },
    PreparationFetched {
        epoch: BrowsingEpoch,
        result: Result<BuildPreparation, FetchError>,
    },
    /// A history page, tagged with the job it was requested for.
    HistoryFetched {
        job: JobIdentifier,
        result: Result<HistoryPage, FetchError>,
    },
    JobFetched(Result<Job, FetchError>),
    BuildTriggered(Result<Build, FetchError>),
    BuildAborted(Result<(), FetchError>),
    StreamEnvelopes(Vec<Envelope>),
    StatusChanged {
        status: BuildStatus,
        at: DateTime<Utc>,
    },
    ClockTicked(DateTime<Utc>),
}
