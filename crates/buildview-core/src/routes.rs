use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::state::Build;
use super::state::BuildId;
use super::state::BuildReference;
use super::state::JobIdentifier;

pub const LOGIN_ROUTE: &str = "/login";

static JOB_BUILD_ROUTE: OnceLock<Regex> = OnceLock::new();
static STANDALONE_BUILD_ROUTE: OnceLock<Regex> = OnceLock::new();

fn job_build_route() -> &'static Regex {
    JOB_BUILD_ROUTE.get_or_init(|| {
        Regex::new(r"^/teams/([^/]+)/pipelines/([^/]+)/jobs/([^/]+)/builds/([^/]+)/?$")
            .unwrap_or_else(|err| unreachable!("job build route pattern: {err}"))
    })
}

fn standalone_build_route() -> &'static Regex {
    STANDALONE_BUILD_ROUTE.get_or_init(|| {
        Regex::new(r"^/builds/([0-9]+)/?$")
            .unwrap_or_else(|err| unreachable!("build route pattern: {err}"))
    })
}

/// An application route. Opaque to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route(String);

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn build_route(build: &Build) -> Route {
    reference_route(&BuildReference::of(build))
}

pub fn reference_route(reference: &BuildReference) -> Route {
    match reference {
        BuildReference::Standalone(id) => Route(format!("/builds/{id}")),
        BuildReference::JobScoped { job, build_name } => Route(format!(
            "/teams/{}/pipelines/{}/jobs/{}/builds/{}",
            job.team_name, job.pipeline_name, job.job_name, build_name
        )),
    }
}

pub fn parse_build_route(path: &str) -> Option<BuildReference> {
    if let Some(caps) = job_build_route().captures(path) {
        return Some(BuildReference::JobScoped {
            job: JobIdentifier::new(&caps[1], &caps[2], &caps[3]),
            build_name: caps[4].to_string(),
        });
    }
    let caps = standalone_build_route().captures(path)?;
    caps[1].parse().ok().map(|id| BuildReference::Standalone(BuildId(id)))
}

pub fn build_events_path(id: BuildId) -> String {
    format!("/api/v1/builds/{id}/events")
}
