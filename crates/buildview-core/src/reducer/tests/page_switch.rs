use std::time::Duration;

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn first_switch_opens_epoch_one() {
    let mut state = state();
    let reference = BuildReference::Standalone(BuildId(9));
    let effects = run_user(&mut state, UserAction::SwitchTo(reference.clone()));

    assert_eq!(
        effects,
        vec![
            BuildEffect::CloseEventStream,
            BuildEffect::FetchBuild {
                epoch: BrowsingEpoch::FIRST,
                reference,
                delay: Duration::ZERO,
            },
        ]
    );
    assert!(matches!(state.build, LoadState::Loading));
}

#[test]
fn repeated_switch_to_same_build_is_a_no_op() {
    let mut state = state();
    let epoch = switch(&mut state, 9);
    let effects = run_user(
        &mut state,
        UserAction::SwitchTo(BuildReference::Standalone(BuildId(9))),
    );

    assert!(effects.is_empty());
    assert_eq!(state.page.epoch, Some(epoch));
}

#[test]
fn switch_keeps_placeholder_but_drops_live_parts() {
    let mut state = state();
    let epoch = load(&mut state, build(3, BuildStatus::Started));
    run_runtime(
        &mut state,
        RuntimeAction::PreparationFetched {
            epoch,
            result: Ok(BuildPreparation::default()),
        },
    );
    run_user(
        &mut state,
        UserAction::Scrolled {
            distance_from_bottom: 80.0,
        },
    );
    assert!(state.current_output().is_some());
    assert!(!state.interaction.autoscroll);

    let next = switch(&mut state, 4);

    assert_eq!(next, epoch.next());
    let info = state.build.as_success().unwrap();
    assert_eq!(info.build.id, BuildId(3));
    assert_eq!(info.preparation, None);
    assert_eq!(info.output, None);
    assert!(state.interaction.autoscroll);
}

#[test]
fn switching_to_another_job_forgets_its_history() {
    let mut state = state();
    load(&mut state, build(3, BuildStatus::Started));
    with_history(
        &mut state,
        vec![build(3, BuildStatus::Started), build(2, BuildStatus::Failed)],
    );
    assert_eq!(state.history.len(), 2);

    let other = JobIdentifier::new("main", "ci", "integration");
    run_user(
        &mut state,
        UserAction::SwitchTo(BuildReference::JobScoped {
            job: other,
            build_name: "1".to_string(),
        }),
    );

    assert!(state.history.is_empty());
    assert_eq!(state.job.reference, None);
}

#[test]
fn replacing_the_placeholder_closes_its_stream_first() {
    let mut state = state();
    let epoch = load(&mut state, build(3, BuildStatus::Started));
    // a result for another build arriving in the same epoch
    let mut other = build(5, BuildStatus::Started);
    other.job = None;
    state.page.target = Some(BuildReference::Standalone(BuildId(5)));

    let effects = fetched(&mut state, epoch, other);

    let close = effects
        .iter()
        .position(|effect| *effect == BuildEffect::CloseEventStream);
    let open = effects
        .iter()
        .position(|effect| matches!(effect, BuildEffect::OpenEventStream { .. }));
    assert!(close.is_some());
    assert!(close < open);
}
