use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use super::config::ControllerConfig;
use super::history::History;
use super::keyboard::KeyboardChordState;
use super::output::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub u64);

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobIdentifier {
    pub team_name: String,
    pub pipeline_name: String,
    pub job_name: String,
}

impl JobIdentifier {
    pub fn new(
        team_name: impl Into<String>,
        pipeline_name: impl Into<String>,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            team_name: team_name.into(),
            pipeline_name: pipeline_name.into(),
            job_name: job_name.into(),
        }
    }
}

impl fmt::Display for JobIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.team_name, self.pipeline_name, self.job_name
        )
    }
}

/// Which build the view is pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildReference {
    Standalone(BuildId),
    JobScoped {
        job: JobIdentifier,
        build_name: String,
    },
}

impl BuildReference {
    pub fn of(build: &Build) -> Self {
        match &build.job {
            Some(job) => Self::JobScoped {
                job: job.clone(),
                build_name: build.name.clone(),
            },
            None => Self::Standalone(build.id),
        }
    }

    pub fn job(&self) -> Option<&JobIdentifier> {
        match self {
            Self::Standalone(_) => None,
            Self::JobScoped { job, .. } => Some(job),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Pending,
    Started,
    Succeeded,
    Failed,
    Errored,
    Aborted,
}

impl BuildStatus {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Pending | Self::Started)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildDuration {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub name: String,
    pub status: BuildStatus,
    #[serde(default)]
    pub job: Option<JobIdentifier>,
    #[serde(default)]
    pub duration: BuildDuration,
    #[serde(default)]
    pub reaped_at: Option<DateTime<Utc>>,
}

impl Build {
    /// Applies a status transition observed on the event stream.
    ///
    /// Once a build has been seen in a non-running status it is frozen and
    /// every later transition is rejected. Returns whether the build changed.
    pub fn apply_status(&mut self, status: BuildStatus, at: DateTime<Utc>) -> bool {
        if !self.status.is_running() {
            return false;
        }
        self.status = status;
        if status == BuildStatus::Started && self.duration.started_at.is_none() {
            self.duration.started_at = Some(at);
        }
        if !status.is_running() {
            self.duration.finished_at = Some(at);
        }
        true
    }

    pub fn is_reaped(&self) -> bool {
        self.reaped_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreparationStatus {
    #[default]
    Unknown,
    Blocking,
    NotBlocking,
}

impl PreparationStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Blocking => "blocking",
            Self::NotBlocking => "not-blocking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildPreparation {
    pub paused_pipeline: bool,
    pub paused_job: bool,
    pub inputs: IndexMap<String, PreparationStatus>,
    pub inputs_satisfied: PreparationStatus,
    pub max_running_builds: PreparationStatus,
    pub missing_input_reasons: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobIdentifier,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub disable_manual_trigger: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentBuildInfo {
    pub build: Build,
    pub preparation: Option<BuildPreparation>,
    pub output: Option<Output>,
}

impl CurrentBuildInfo {
    pub fn new(build: Build) -> Self {
        Self {
            build,
            preparation: None,
            output: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState<T> {
    #[default]
    NotAsked,
    Loading,
    Failure(LoadFailure),
    Success(T),
}

impl<T> LoadState<T> {
    pub fn as_success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_success_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotAsked => "not-asked",
            Self::Loading => "loading",
            Self::Failure(LoadFailure::NotFound) => "not-found",
            Self::Success(_) => "loaded",
        }
    }
}

/// Navigation generation; results tagged with an older epoch are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrowsingEpoch(pub u64);

impl BrowsingEpoch {
    pub const FIRST: Self = Self(1);

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for BrowsingEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageState {
    pub target: Option<BuildReference>,
    pub epoch: Option<BrowsingEpoch>,
}

impl PageState {
    pub fn is_current(&self, epoch: BrowsingEpoch) -> bool {
        self.epoch == Some(epoch)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobState {
    pub reference: Option<JobIdentifier>,
    pub details: Option<Job>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionState {
    pub autoscroll: bool,
    pub keyboard: KeyboardChordState,
    pub help_visible: bool,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            autoscroll: true,
            keyboard: KeyboardChordState::default(),
            help_visible: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildViewState {
    pub page: PageState,
    pub build: LoadState<CurrentBuildInfo>,
    pub job: JobState,
    pub history: History,
    pub interaction: InteractionState,
    pub now: Option<DateTime<Utc>>,
    pub settings: ControllerConfig,
}

impl BuildViewState {
    pub fn new(settings: ControllerConfig) -> Self {
        Self {
            page: PageState::default(),
            build: LoadState::NotAsked,
            job: JobState::default(),
            history: History::new(),
            interaction: InteractionState::default(),
            now: None,
            settings,
        }
    }

    pub fn current_build(&self) -> Option<&Build> {
        self.build.as_success().map(|info| &info.build)
    }

    pub fn current_output(&self) -> Option<&Output> {
        self.build.as_success().and_then(|info| info.output.as_ref())
    }

    /// The job a trigger would start a build for. One-off builds have none,
    /// whatever job was shown before them.
    pub fn trigger_target(&self) -> Option<&JobIdentifier> {
        self.current_build().and_then(|build| build.job.as_ref())
    }

    /// A reaped build has no output and renders as a tombstone.
    pub fn is_tombstoned(&self) -> bool {
        self.current_build().is_some_and(Build::is_reaped)
    }

    pub fn window_title(&self) -> String {
        let base = match self.current_build() {
            Some(build) => match &build.job {
                Some(job) => format!("{} #{}", job.job_name, build.name),
                None => format!("build #{}", build.id),
            },
            None => "build".to_string(),
        };
        let paused = self.job.details.as_ref().is_some_and(|job| {
            job.paused && self.current_build().and_then(|build| build.job.as_ref()) == Some(&job.id)
        });
        let base = if paused {
            format!("{base} (paused)")
        } else {
            base
        };
        if self.settings.title_suffix.is_empty() {
            base
        } else {
            format!("{base} - {}", self.settings.title_suffix)
        }
    }

    /// Elapsed run time of the current build, measured against the last clock
    /// tick while it is still running.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let build = self.current_build()?;
        let started = build.duration.started_at?;
        let end = build.duration.finished_at.or(self.now)?;
        Some(end - started)
    }
}
