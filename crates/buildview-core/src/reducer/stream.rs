use chrono::DateTime;
use chrono::Utc;
use tracing::debug;
use tracing::info;

use super::BuildEffect;
use crate::output::Envelope;
use crate::output::Output;
use crate::output::OutputSignal;
use crate::scroll::follows_output;
use crate::scroll::ScrollTarget;
use crate::state::BuildStatus;
use crate::state::BuildViewState;

/// Attaches live output to the current build and opens its event stream.
///
/// Reaped builds never get output, and a build keeps the output it already
/// has, so each build opens at most one stream.
pub(super) fn attach_output(state: &mut BuildViewState) -> Option<BuildEffect> {
    let info = state.build.as_success_mut()?;
    if info.build.is_reaped() || info.output.is_some() {
        return None;
    }
    let output = Output::init(&info.build);
    let path = output.event_source_path().to_string();
    info.output = Some(output);
    info!(build = %info.build.id, %path, "opening event stream");
    Some(BuildEffect::OpenEventStream { path })
}

pub(super) fn envelopes_received(
    state: &mut BuildViewState,
    envelopes: Vec<Envelope>,
) -> Vec<BuildEffect> {
    let Some(output) = state
        .build
        .as_success_mut()
        .and_then(|info| info.output.as_mut())
    else {
        debug!(count = envelopes.len(), "no output attached; dropping envelopes");
        return Vec::new();
    };

    let transitions: Vec<(BuildStatus, DateTime<Utc>)> = envelopes
        .iter()
        .filter_map(|envelope| match output.handle_envelope(envelope) {
            OutputSignal::StatusChanged { status, at } => Some((status, at)),
            OutputSignal::None => None,
        })
        .collect();

    let mut effects = Vec::new();
    for (status, at) in transitions {
        effects.extend(status_changed(state, status, at));
    }

    let follow = state
        .current_build()
        .is_some_and(|build| follows_output(state.interaction.autoscroll, build.status));
    if follow {
        effects.push(BuildEffect::Scroll(ScrollTarget::ToBottom));
    }
    effects
}

pub(super) fn status_changed(
    state: &mut BuildViewState,
    status: BuildStatus,
    at: DateTime<Utc>,
) -> Vec<BuildEffect> {
    let Some(info) = state.build.as_success_mut() else {
        return Vec::new();
    };
    if !info.build.apply_status(status, at) {
        debug!(
            build = %info.build.id,
            current = info.build.status.label(),
            ignored = status.label(),
            "build already finished; ignoring status"
        );
        return Vec::new();
    }
    let build = info.build.clone();
    state.history.replace(&build);
    vec![BuildEffect::SetFavicon(Some(build.status))]
}
