use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use buildview_core::actions::BuildAction;
use buildview_core::actions::UserAction;
use buildview_core::config::Config;
use buildview_core::reducer::BuildEffect;
use buildview_core::routes::parse_build_route;
use buildview_core::state::BuildReference;
use buildview_core::state::BuildViewState;
use buildview_exec::ExecError;
use buildview_exec::Fixture;
use buildview_exec::Session;
use buildview_exec::SimulatedCi;
use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod ui;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("not a build route: {0}")]
    Route(String),
    #[error("config {path}: {message}")]
    Config { path: String, message: String },
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_help();
        return Ok(());
    };

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("buildview {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "replay" => {
            let args = ReplayArgs::parse(args.collect())?;
            let config = config::load(args.config.as_deref())?;
            init_logging(&config, LogTarget::Stderr)?;
            replay(args, config)
        }
        "watch" => {
            let args = ReplayArgs::parse(args.collect())?;
            let config = config::load(args.config.as_deref())?;
            init_logging(&config, LogTarget::File)?;
            let (session, reference) = open_session(&args, &config)?;
            ui::run(session, reference)
        }
        _ => {
            print_help();
            Err(CliError::Usage(format!("unknown command: {command}")))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ReplayArgs {
    fixture: PathBuf,
    route: String,
    until_ms: u64,
    config: Option<PathBuf>,
}

impl ReplayArgs {
    fn parse(args: Vec<String>) -> Result<Self, CliError> {
        let mut fixture = None;
        let mut route = None;
        let mut until_ms = 10_000;
        let mut config = None;
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            let Some(value) = args.get(i + 1) else {
                return Err(CliError::Usage(format!("{flag} requires a value")));
            };
            match flag {
                "--fixture" => fixture = Some(PathBuf::from(value)),
                "--route" => route = Some(value.clone()),
                "--until-ms" => {
                    until_ms = value
                        .parse()
                        .map_err(|_| CliError::Usage(format!("invalid --until-ms: {value}")))?;
                }
                "--config" => config = Some(PathBuf::from(value)),
                other => {
                    return Err(CliError::Usage(format!("unsupported argument: {other}")));
                }
            }
            i += 2;
        }
        let Some(fixture) = fixture else {
            return Err(CliError::Usage("--fixture is required".to_string()));
        };
        let Some(route) = route else {
            return Err(CliError::Usage("--route is required".to_string()));
        };
        Ok(Self {
            fixture,
            route,
            until_ms,
            config,
        })
    }
}

enum LogTarget {
    Stderr,
    File,
}

/// `RUST_LOG` wins over the configured filter.
fn init_logging(config: &Config, target: LogTarget) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .map_err(|err| CliError::Config {
            path: "log.filter".to_string(),
            message: err.to_string(),
        })?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match target {
        LogTarget::Stderr => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
        // The terminal belongs to the UI while watching.
        LogTarget::File => {
            let dir = dirs::cache_dir()
                .unwrap_or_else(env::temp_dir)
                .join("buildview");
            std::fs::create_dir_all(&dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("buildview.log"))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
    }
    Ok(())
}

fn open_session(
    args: &ReplayArgs,
    config: &Config,
) -> Result<(Session<SimulatedCi>, BuildReference), CliError> {
    let reference =
        parse_build_route(&args.route).ok_or_else(|| CliError::Route(args.route.clone()))?;
    let fixture = Fixture::load(&args.fixture)?;
    let start = fixture.start;
    info!(fixture = %args.fixture.display(), route = %args.route, "opening session");
    let session = Session::new(config.controller.clone(), SimulatedCi::new(fixture), start);
    Ok((session, reference))
}

fn replay(args: ReplayArgs, config: Config) -> Result<(), CliError> {
    let (mut session, reference) = open_session(&args, &config)?;
    let start = session.now();

    let effects = session.dispatch(BuildAction::User(UserAction::SwitchTo(reference)))?;
    print_effects(0, &effects);

    let deadline = replay_deadline(start, args.until_ms)?;
    while session.now() < deadline {
        let step = session
            .now()
            .checked_add_signed(chrono::Duration::milliseconds(100))
            .map_or(deadline, |step| step.min(deadline));
        let effects = session.advance_to(step)?;
        let elapsed = (session.now() - start).num_milliseconds();
        print_effects(elapsed, &effects);
    }

    print_summary(session.state());
    Ok(())
}

fn replay_deadline(start: DateTime<Utc>, until_ms: u64) -> Result<DateTime<Utc>, CliError> {
    i64::try_from(until_ms)
        .ok()
        .and_then(chrono::Duration::try_milliseconds)
        .and_then(|until| start.checked_add_signed(until))
        .ok_or_else(|| CliError::Usage(format!("--until-ms out of range: {until_ms}")))
}

fn print_effects(elapsed_ms: i64, effects: &[BuildEffect]) {
    for effect in effects {
        println!("{elapsed_ms:>7}ms  {}", describe_effect(effect));
    }
}

fn describe_effect(effect: &BuildEffect) -> String {
    match effect {
        BuildEffect::FetchBuild {
            epoch,
            reference,
            delay,
        } => format!("fetch build {reference:?} (epoch {epoch}, after {delay:?})"),
        BuildEffect::FetchPreparation {
            epoch,
            build,
            delay,
        } => format!("fetch preparation of {build} (epoch {epoch}, after {delay:?})"),
        BuildEffect::FetchHistory { job, page } => match page {
            Some(page) => format!("fetch history of {job} before {} ({})", page.until, page.limit),
            None => format!("fetch history of {job}"),
        },
        BuildEffect::FetchJobDetails(job) => format!("fetch job {job}"),
        BuildEffect::OpenEventStream { path } => format!("open stream {path}"),
        BuildEffect::CloseEventStream => "close stream".to_string(),
        BuildEffect::TriggerBuild(job) => format!("trigger {job}"),
        BuildEffect::AbortBuild(id) => format!("abort {id}"),
        BuildEffect::NavigateTo(route) => format!("navigate to {route}"),
        BuildEffect::Scroll(target) => format!("scroll {target:?}"),
        BuildEffect::SetWindowTitle(title) => format!("title {title:?}"),
        BuildEffect::SetFavicon(status) => format!(
            "favicon {}",
            status.map_or("none", |status| status.label())
        ),
        BuildEffect::RedirectToLogin => "redirect to login".to_string(),
    }
}

fn print_summary(state: &BuildViewState) {
    println!();
    println!("build: {}", state.build.label());
    if let Some(build) = state.current_build() {
        println!("  {} #{} {}", build.id, build.name, build.status.label());
    }
    println!("title: {}", state.window_title());
    let history: Vec<String> = state
        .history
        .builds()
        .iter()
        .map(|build| format!("#{}:{}", build.name, build.status.label()))
        .collect();
    println!("history: [{}]", history.join(", "));
    if let Some(output) = state.current_output() {
        println!("output ({} lines, ended: {}):", output.lines.len(), output.ended);
        for line in &output.lines {
            println!("  | {}", line.text);
        }
        for error in &output.errors {
            println!("  ! {error}");
        }
    }
}

fn print_help() {
    println!("buildview {}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  buildview replay --fixture PATH --route ROUTE [--until-ms N] [--config PATH]");
    println!("  buildview watch --fixture PATH --route ROUTE [--config PATH]");
    println!("  buildview --help");
    println!("  buildview --version");
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn replay_args_parse_with_defaults() {
        let parsed = ReplayArgs::parse(args(&[
            "--fixture",
            "ci.json",
            "--route",
            "/builds/4",
        ]))
        .unwrap();
        assert_eq!(
            parsed,
            ReplayArgs {
                fixture: PathBuf::from("ci.json"),
                route: "/builds/4".to_string(),
                until_ms: 10_000,
                config: None,
            }
        );
    }

    #[test]
    fn replay_args_require_fixture_and_values() {
        let missing = ReplayArgs::parse(args(&["--route", "/builds/4"])).unwrap_err();
        assert_eq!(missing.to_string(), "--fixture is required");

        let dangling = ReplayArgs::parse(args(&["--fixture"])).unwrap_err();
        assert_eq!(dangling.to_string(), "--fixture requires a value");

        let bad = ReplayArgs::parse(args(&["--until-ms", "soon"])).unwrap_err();
        assert_eq!(bad.to_string(), "invalid --until-ms: soon");
    }

    #[test]
    fn replay_deadline_rejects_unrepresentable_spans() {
        let start = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(
            replay_deadline(start, 9_000).unwrap(),
            start + chrono::Duration::seconds(9)
        );
        let err = replay_deadline(start, u64::MAX).unwrap_err();
        assert_eq!(err.to_string(), format!("--until-ms out of range: {}", u64::MAX));
        assert!(matches!(
            replay_deadline(start, i64::MAX as u64),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn effects_describe_their_target() {
        assert_eq!(
            describe_effect(&BuildEffect::SetFavicon(None)),
            "favicon none".to_string()
        );
        assert_eq!(
            describe_effect(&BuildEffect::OpenEventStream {
                path: "/api/v1/builds/3/events".to_string()
            }),
            "open stream /api/v1/builds/3/events".to_string()
        );
    }
}
