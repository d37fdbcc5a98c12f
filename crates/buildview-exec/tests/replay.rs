use std::time::Duration;

use buildview_core::actions::BuildAction;
use buildview_core::actions::UserAction;
use buildview_core::config::ControllerConfig;
use buildview_core::keyboard::Key;
use buildview_core::reducer::BuildEffect;
use buildview_core::state::BuildId;
use buildview_core::state::BuildReference;
use buildview_core::state::BuildStatus;
use buildview_core::state::JobIdentifier;
use buildview_exec::Fixture;
use buildview_exec::Session;
use buildview_exec::SimulatedCi;
use pretty_assertions::assert_eq;

const FIXTURE: &str = r#"{
    "jobs": [{"id": {"team_name": "main", "pipeline_name": "ci", "job_name": "unit"}}],
    "builds": [
        {"id": 1, "name": "1", "status": "succeeded",
         "job": {"team_name": "main", "pipeline_name": "ci", "job_name": "unit"}},
        {"id": 2, "name": "2", "status": "started",
         "job": {"team_name": "main", "pipeline_name": "ci", "job_name": "unit"},
         "events": [
             {"at_ms": 0, "event": {"event": "log", "payload": "compiling\n"}},
             {"at_ms": 3000, "event": {"event": "status", "status": "succeeded", "time": 1700000003}},
             {"at_ms": 3000, "event": {"event": "end"}}
         ]}
    ]
}"#;

fn session() -> Session<SimulatedCi> {
    let fixture = Fixture::from_json_str(FIXTURE).unwrap();
    let start = fixture.start;
    Session::new(ControllerConfig::default(), SimulatedCi::new(fixture), start)
}

fn user(action: UserAction) -> BuildAction {
    BuildAction::User(action)
}

fn history_ids(session: &Session<SimulatedCi>) -> Vec<BuildId> {
    session
        .state()
        .history
        .builds()
        .iter()
        .map(|build| build.id)
        .collect()
}

fn current_status(session: &Session<SimulatedCi>) -> Option<BuildStatus> {
    session.state().current_build().map(|build| build.status)
}

fn open_job_build(session: &mut Session<SimulatedCi>, name: &str) {
    session
        .dispatch(user(UserAction::SwitchTo(BuildReference::JobScoped {
            job: JobIdentifier::new("main", "ci", "unit"),
            build_name: name.to_string(),
        })))
        .unwrap();
}

#[test]
fn running_build_streams_until_it_finishes() {
    let mut session = session();
    open_job_build(&mut session, "2");
    session.advance_by(Duration::from_millis(500)).unwrap();

    assert_eq!(history_ids(&session), vec![BuildId(2), BuildId(1)]);
    assert_eq!(session.executor().open_stream(), Some(BuildId(2)));
    let lines: Vec<String> = session
        .state()
        .current_output()
        .map(|output| output.lines.iter().map(|line| line.text.clone()).collect())
        .unwrap_or_default();
    assert_eq!(lines, vec!["compiling".to_string()]);
    assert_eq!(current_status(&session), Some(BuildStatus::Started));

    let effects = session.advance_by(Duration::from_millis(3_500)).unwrap();
    assert_eq!(current_status(&session), Some(BuildStatus::Succeeded));
    assert_eq!(
        session.state().history.get(BuildId(2)).map(|build| build.status),
        Some(BuildStatus::Succeeded)
    );
    assert!(effects.contains(&BuildEffect::SetFavicon(Some(BuildStatus::Succeeded))));
    assert!(session.state().current_output().is_some_and(|output| output.ended));
}

#[test]
fn older_neighbour_replaces_the_stream() {
    let mut session = session();
    open_job_build(&mut session, "2");
    session.advance_by(Duration::from_millis(500)).unwrap();

    session.dispatch(user(UserAction::KeyDown(Key::char('l')))).unwrap();
    session.advance_by(Duration::from_millis(10)).unwrap();

    assert_eq!(session.state().current_build().map(|build| build.id), Some(BuildId(1)));
    assert_eq!(session.executor().open_stream(), Some(BuildId(1)));
    assert_eq!(history_ids(&session), vec![BuildId(2), BuildId(1)]);
}

#[test]
fn triggered_build_is_shown_and_followed() {
    let mut session = session();
    open_job_build(&mut session, "2");
    session.advance_by(Duration::from_millis(500)).unwrap();

    session.dispatch(user(UserAction::KeyDown(Key::Shift))).unwrap();
    session.dispatch(user(UserAction::KeyDown(Key::char('t')))).unwrap();
    session.dispatch(user(UserAction::KeyUp(Key::char('t')))).unwrap();
    session.dispatch(user(UserAction::KeyUp(Key::Shift))).unwrap();
    session.advance_by(Duration::from_millis(100)).unwrap();

    assert_eq!(history_ids(&session), vec![BuildId(3), BuildId(2), BuildId(1)]);
    assert_eq!(session.state().current_build().map(|build| build.id), Some(BuildId(3)));
    assert_eq!(current_status(&session), Some(BuildStatus::Pending));

    session.advance_by(Duration::from_secs(8)).unwrap();
    assert_eq!(current_status(&session), Some(BuildStatus::Succeeded));
    assert_eq!(session.executor().open_stream(), Some(BuildId(3)));
}
