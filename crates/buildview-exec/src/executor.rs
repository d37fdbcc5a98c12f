use std::time::Duration;

use buildview_core::actions::BuildAction;
use buildview_core::actions::RuntimeAction;
use buildview_core::actions::UserAction;
use buildview_core::error::FetchError;
use buildview_core::history::HistoryPage;
use buildview_core::history::Page;
use buildview_core::output::Envelope;
use buildview_core::reducer::BuildEffect;
use buildview_core::routes::build_events_path;
use buildview_core::routes::parse_build_route;
use buildview_core::state::Build;
use buildview_core::state::BuildDuration;
use buildview_core::state::BuildId;
use buildview_core::state::BuildPreparation;
use buildview_core::state::BuildReference;
use buildview_core::state::BuildStatus;
use buildview_core::state::Job;
use buildview_core::state::JobIdentifier;
use chrono::DateTime;
use chrono::Utc;
use serde_json::json;
use tracing::debug;
use tracing::info;

use crate::contracts::Fixture;
use crate::contracts::ScriptedEvent;
use crate::queue::Channel;
use crate::queue::Scheduled;

pub struct ExecutionContext {
    pub now: DateTime<Utc>,
}

/// Performs controller effects and schedules the actions they eventually
/// produce.
pub trait EffectExecutor {
    fn execute(&mut self, effect: &BuildEffect, context: &ExecutionContext) -> Vec<Scheduled>;

    /// Whether a delivery on `channel` should still reach the controller.
    fn accepts(&self, channel: Channel) -> bool {
        let _ = channel;
        true
    }
}

#[derive(Debug, Clone)]
struct SimulatedBuild {
    build: Build,
    preparation: Option<BuildPreparation>,
    events: Vec<ScriptedEvent>,
}

impl SimulatedBuild {
    /// The build as the server reports it at `now`: scripted status events
    /// that have already happened are applied.
    fn snapshot(&self, origin: DateTime<Utc>, now: DateTime<Utc>) -> Build {
        let mut build = self.build.clone();
        for (at, status) in self.status_changes(origin) {
            if at > now {
                break;
            }
            build.apply_status(status, at);
        }
        build
    }

    fn status_changes(&self, origin: DateTime<Utc>) -> Vec<(DateTime<Utc>, BuildStatus)> {
        let mut changes: Vec<(DateTime<Utc>, BuildStatus)> = self
            .events
            .iter()
            .filter(|scripted| scripted.event["event"] == "status")
            .filter_map(|scripted| {
                let status = serde_json::from_value(scripted.event["status"].clone()).ok()?;
                Some((offset(origin, scripted.at_ms), status))
            })
            .collect();
        changes.sort_by_key(|(at, _)| *at);
        changes
    }
}

/// `at` moved forward by `by`, saturating at the end of representable time.
pub(crate) fn later(at: DateTime<Utc>, by: chrono::Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn later_std(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by).map_or(DateTime::<Utc>::MAX_UTC, |by| later(at, by))
}

fn offset(origin: DateTime<Utc>, ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(chrono::Duration::try_milliseconds)
        .map_or(DateTime::<Utc>::MAX_UTC, |by| later(origin, by))
}

fn until(now: DateTime<Utc>, at: DateTime<Utc>) -> Duration {
    (at - now).to_std().unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, Copy)]
struct OpenStream {
    build: BuildId,
    generation: u64,
}

/// An in-memory CI server driven by a [`Fixture`].
#[derive(Debug)]
pub struct SimulatedCi {
    origin: DateTime<Utc>,
    builds: Vec<SimulatedBuild>,
    jobs: Vec<Job>,
    page_size: usize,
    latency: Duration,
    require_login: bool,
    trigger_start_after: Duration,
    stream: Option<OpenStream>,
    stream_generation: u64,
}

impl SimulatedCi {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            origin: fixture.start,
            builds: fixture
                .builds
                .into_iter()
                .map(|entry| SimulatedBuild {
                    build: entry.build,
                    preparation: entry.preparation,
                    events: entry.events,
                })
                .collect(),
            jobs: fixture.jobs,
            page_size: fixture.history_page_size.max(1),
            latency: Duration::from_millis(fixture.latency_ms),
            require_login: fixture.require_login,
            trigger_start_after: Duration::from_millis(fixture.trigger_start_after_ms),
            stream: None,
            stream_generation: 0,
        }
    }

    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    pub fn open_stream(&self) -> Option<BuildId> {
        self.stream.map(|open| open.build)
    }

    fn find(&self, reference: &BuildReference) -> Option<&SimulatedBuild> {
        self.builds.iter().find(|entry| match reference {
            BuildReference::Standalone(id) => entry.build.id == *id,
            BuildReference::JobScoped { job, build_name } => {
                entry.build.job.as_ref() == Some(job) && entry.build.name == *build_name
            }
        })
    }

    fn find_mut(&mut self, id: BuildId) -> Option<&mut SimulatedBuild> {
        self.builds.iter_mut().find(|entry| entry.build.id == id)
    }

    fn respond(&self, delay: Duration, action: RuntimeAction) -> Vec<Scheduled> {
        vec![Scheduled::request(
            delay.saturating_add(self.latency),
            BuildAction::Runtime(action),
        )]
    }

    fn guard(&self) -> Result<(), FetchError> {
        if self.require_login {
            Err(FetchError::status(401, "not authorized"))
        } else {
            Ok(())
        }
    }

    fn fetch_build(&self, reference: &BuildReference, at: DateTime<Utc>) -> Result<Build, FetchError> {
        self.guard()?;
        self.find(reference)
            .map(|entry| entry.snapshot(self.origin, at))
            .ok_or_else(|| FetchError::status(404, "build not found"))
    }

    fn fetch_preparation(&self, id: BuildId) -> Result<BuildPreparation, FetchError> {
        self.guard()?;
        self.find(&BuildReference::Standalone(id))
            .map(|entry| entry.preparation.clone().unwrap_or_default())
            .ok_or_else(|| FetchError::status(404, "build not found"))
    }

    fn fetch_history(
        &self,
        job: &JobIdentifier,
        page: Option<Page>,
        now: DateTime<Utc>,
    ) -> Result<HistoryPage, FetchError> {
        self.guard()?;
        let limit = page.map_or(self.page_size, |page| page.limit);
        let mut builds: Vec<Build> = self
            .builds
            .iter()
            .filter(|entry| entry.build.job.as_ref() == Some(job))
            .filter(|entry| page.map_or(true, |page| entry.build.id < page.until))
            .map(|entry| entry.snapshot(self.origin, now))
            .collect();
        builds.sort_by(|a, b| b.id.cmp(&a.id));

        let has_more = builds.len() > limit;
        builds.truncate(limit);
        let next = match builds.last() {
            Some(last) if has_more => Some(Page {
                until: last.id,
                limit,
            }),
            _ => None,
        };
        Ok(HistoryPage { builds, next })
    }

    fn fetch_job(&self, job: &JobIdentifier) -> Result<Job, FetchError> {
        self.guard()?;
        self.jobs
            .iter()
            .find(|candidate| candidate.id == *job)
            .cloned()
            .ok_or_else(|| FetchError::status(404, "job not found"))
    }

    fn trigger(&mut self, job: &JobIdentifier, now: DateTime<Utc>) -> Result<Build, FetchError> {
        self.guard()?;
        let id = BuildId(
            self.builds
                .iter()
                .map(|entry| entry.build.id.0)
                .max()
                .unwrap_or(0)
                + 1,
        );
        let name = self
            .builds
            .iter()
            .filter(|entry| entry.build.job.as_ref() == Some(job))
            .filter_map(|entry| entry.build.name.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        let since_origin = |at: DateTime<Utc>| {
            u64::try_from((at - self.origin).num_milliseconds()).unwrap_or(0)
        };
        let started = later_std(now, self.trigger_start_after);
        let finished = later(started, chrono::Duration::seconds(3));
        let events = vec![
            ScriptedEvent {
                at_ms: since_origin(started),
                event: json!({"event": "status", "status": "started", "time": started.timestamp()}),
            },
            ScriptedEvent {
                at_ms: since_origin(started),
                event: json!({"event": "log", "payload": format!("running {}\n", job.job_name)}),
            },
            ScriptedEvent {
                at_ms: since_origin(finished),
                event: json!({"event": "status", "status": "succeeded", "time": finished.timestamp()}),
            },
            ScriptedEvent {
                at_ms: since_origin(finished),
                event: json!({"event": "end"}),
            },
        ];
        let build = Build {
            id,
            name: name.to_string(),
            status: BuildStatus::Pending,
            job: Some(job.clone()),
            duration: BuildDuration::default(),
            reaped_at: None,
        };
        info!(build = %id, %job, "simulated trigger");
        self.builds.push(SimulatedBuild {
            build: build.clone(),
            preparation: None,
            events,
        });
        Ok(build)
    }

    fn abort(&mut self, id: BuildId, now: DateTime<Utc>) -> Result<Option<ScriptedEvent>, FetchError> {
        self.guard()?;
        let origin = self.origin;
        let entry = self
            .find_mut(id)
            .ok_or_else(|| FetchError::status(404, "build not found"))?;
        if !entry.snapshot(origin, now).status.is_running() {
            return Ok(None);
        }
        // later scripted events never happen for an aborted build
        let at_ms = u64::try_from((now - origin).num_milliseconds()).unwrap_or(0);
        entry.events.retain(|scripted| scripted.at_ms <= at_ms);
        let aborted = ScriptedEvent {
            at_ms,
            event: json!({"event": "status", "status": "aborted", "time": now.timestamp()}),
        };
        entry.events.push(aborted.clone());
        Ok(Some(aborted))
    }

    fn open(&mut self, path: &str, now: DateTime<Utc>) -> Vec<Scheduled> {
        let Some(entry) = self
            .builds
            .iter()
            .find(|entry| build_events_path(entry.build.id) == path)
        else {
            debug!(path, "stream requested for unknown build");
            return Vec::new();
        };
        let build = entry.build.id;
        let events = entry.events.clone();

        self.stream_generation += 1;
        let channel = Channel::Stream(self.stream_generation);
        self.stream = Some(OpenStream {
            build,
            generation: self.stream_generation,
        });
        info!(build = %build, "simulated stream opened");

        let mut scheduled = vec![Scheduled {
            after: self.latency,
            channel,
            action: BuildAction::Runtime(RuntimeAction::StreamEnvelopes(vec![Envelope::Opened])),
        }];
        scheduled.extend(events.into_iter().map(|scripted| Scheduled {
            after: until(now, offset(self.origin, scripted.at_ms)).saturating_add(self.latency),
            channel,
            action: BuildAction::Runtime(RuntimeAction::StreamEnvelopes(vec![Envelope::Event(
                scripted.event.to_string(),
            )])),
        }));
        scheduled
    }
}

impl EffectExecutor for SimulatedCi {
    fn execute(&mut self, effect: &BuildEffect, context: &ExecutionContext) -> Vec<Scheduled> {
        let now = context.now;
        match effect {
            BuildEffect::FetchBuild {
                epoch,
                reference,
                delay,
            } => {
                let answered_at = later_std(now, *delay);
                self.respond(
                    *delay,
                    RuntimeAction::BuildFetched {
                        epoch: *epoch,
                        result: self.fetch_build(reference, answered_at),
                    },
                )
            }
            BuildEffect::FetchPreparation {
                epoch,
                build,
                delay,
            } => self.respond(
                *delay,
                RuntimeAction::PreparationFetched {
                    epoch: *epoch,
                    result: self.fetch_preparation(*build),
                },
            ),
            BuildEffect::FetchHistory { job, page } => self.respond(
                Duration::ZERO,
                RuntimeAction::HistoryFetched {
                    job: job.clone(),
                    result: self.fetch_history(job, *page, now),
                },
            ),
            BuildEffect::FetchJobDetails(job) => {
                self.respond(Duration::ZERO, RuntimeAction::JobFetched(self.fetch_job(job)))
            }
            BuildEffect::TriggerBuild(job) => {
                let result = self.trigger(job, now);
                self.respond(Duration::ZERO, RuntimeAction::BuildTriggered(result))
            }
            BuildEffect::AbortBuild(id) => {
                let result = self.abort(*id, now);
                let mut scheduled = Vec::new();
                if let (Ok(Some(aborted)), Some(open)) = (&result, self.stream) {
                    if open.build == *id {
                        scheduled.push(Scheduled {
                            after: self.latency,
                            channel: Channel::Stream(open.generation),
                            action: BuildAction::Runtime(RuntimeAction::StreamEnvelopes(vec![
                                Envelope::Event(aborted.event.to_string()),
                            ])),
                        });
                    }
                }
                scheduled.extend(
                    self.respond(Duration::ZERO, RuntimeAction::BuildAborted(result.map(|_| ()))),
                );
                scheduled
            }
            BuildEffect::OpenEventStream { path } => self.open(path, now),
            BuildEffect::CloseEventStream => {
                if let Some(open) = self.stream.take() {
                    info!(build = %open.build, "simulated stream closed");
                }
                Vec::new()
            }
            BuildEffect::NavigateTo(route) => match parse_build_route(route.as_str()) {
                Some(reference) => vec![Scheduled::request(
                    Duration::ZERO,
                    BuildAction::User(UserAction::SwitchTo(reference)),
                )],
                None => {
                    debug!(%route, "navigation outside the build view");
                    Vec::new()
                }
            },
            BuildEffect::Scroll(_)
            | BuildEffect::SetWindowTitle(_)
            | BuildEffect::SetFavicon(_)
            | BuildEffect::RedirectToLogin => Vec::new(),
        }
    }

    fn accepts(&self, channel: Channel) -> bool {
        match channel {
            Channel::Request => true,
            Channel::Stream(generation) => self
                .stream
                .is_some_and(|open| open.generation == generation),
        }
    }
}
