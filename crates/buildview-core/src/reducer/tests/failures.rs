use super::*;
use pretty_assertions::assert_eq;

fn failed(state: &mut BuildViewState, epoch: BrowsingEpoch, err: FetchError) -> Vec<BuildEffect> {
    run_runtime(
        state,
        RuntimeAction::BuildFetched {
            epoch,
            result: Err(err),
        },
    )
}

#[test]
fn not_found_is_terminal_and_quiet() {
    let mut state = state();
    let epoch = switch(&mut state, 404);

    let effects = failed(&mut state, epoch, FetchError::status(404, "no build"));

    assert!(effects.is_empty());
    assert_eq!(state.build, LoadState::Failure(LoadFailure::NotFound));
    assert_eq!(state.build.label(), "not-found");
}

#[test]
fn unauthorized_redirects_without_state_change() {
    let mut state = state();
    let epoch = switch(&mut state, 7);
    let before = state.clone();

    let effects = failed(&mut state, epoch, FetchError::status(401, "login"));

    assert_eq!(effects, vec![BuildEffect::RedirectToLogin]);
    assert_eq!(state, before);
}

#[test]
fn other_failures_are_ignored() {
    let mut state = state();
    let epoch = load(&mut state, build(7, BuildStatus::Started));
    let before = state.clone();

    assert!(failed(&mut state, epoch, FetchError::status(502, "bad gateway")).is_empty());
    assert!(failed(&mut state, epoch, FetchError::Transport("reset".to_string())).is_empty());
    assert!(run_runtime(
        &mut state,
        RuntimeAction::PreparationFetched {
            epoch,
            result: Err(FetchError::status(404, "no prep")),
        },
    )
    .is_empty());
    assert_eq!(state, before);
}

#[test]
fn side_requests_redirect_on_unauthorized() {
    let mut state = state();
    load(&mut state, build(7, BuildStatus::Started));
    let unauthorized = || FetchError::status(401, "login");

    for action in [
        RuntimeAction::JobFetched(Err(unauthorized())),
        RuntimeAction::HistoryFetched {
            job: job(),
            result: Err(unauthorized()),
        },
        RuntimeAction::BuildTriggered(Err(unauthorized())),
        RuntimeAction::BuildAborted(Err(unauthorized())),
    ] {
        assert_eq!(
            run_runtime(&mut state, action),
            vec![BuildEffect::RedirectToLogin]
        );
    }

    assert!(run_runtime(
        &mut state,
        RuntimeAction::BuildAborted(Err(FetchError::status(500, "boom")))
    )
    .is_empty());
    assert!(run_runtime(&mut state, RuntimeAction::BuildAborted(Ok(()))).is_empty());
}
