use std::time::Duration;

use buildview_core::actions::BuildAction;
use buildview_core::actions::RuntimeAction;
use buildview_core::config::ControllerConfig;
use buildview_core::reducer::reduce;
use buildview_core::reducer::BuildEffect;
use buildview_core::state::BuildViewState;
use chrono::DateTime;
use chrono::Utc;
use tracing::debug;
use tracing::trace;

use crate::contracts::ExecError;
use crate::executor::EffectExecutor;
use crate::executor::ExecutionContext;
use crate::executor::later;
use crate::queue::DeliveryQueue;

const CLOCK_TICK_MS: i64 = 1_000;

/// Drives the controller against an executor on a virtual clock.
pub struct Session<E> {
    state: BuildViewState,
    executor: E,
    queue: DeliveryQueue,
    /// `None` once the clock has run out of representable instants.
    next_tick: Option<DateTime<Utc>>,
}

impl<E: EffectExecutor> Session<E> {
    pub fn new(settings: ControllerConfig, executor: E, start: DateTime<Utc>) -> Self {
        Self {
            state: BuildViewState::new(settings),
            executor,
            queue: DeliveryQueue::new(start),
            next_tick: Some(start),
        }
    }

    pub fn state(&self) -> &BuildViewState {
        &self.state
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.queue.now()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Reduces `action` and hands every resulting effect to the executor.
    pub fn dispatch(&mut self, action: BuildAction) -> Result<Vec<BuildEffect>, ExecError> {
        trace!(?action, "dispatch");
        let effects = reduce(&mut self.state, action)?;
        let context = ExecutionContext {
            now: self.queue.now(),
        };
        for effect in &effects {
            for scheduled in self.executor.execute(effect, &context) {
                self.queue.push(scheduled);
            }
        }
        Ok(effects)
    }

    /// Delivers everything due up to `deadline`, ticking the clock once a
    /// second along the way. Returns the effects produced, in order.
    pub fn advance_to(&mut self, deadline: DateTime<Utc>) -> Result<Vec<BuildEffect>, ExecError> {
        let mut effects = Vec::new();
        loop {
            let tick = self.next_tick.filter(|&at| {
                at <= deadline && self.queue.next_due().map_or(true, |due| at <= due)
            });
            if let Some(at) = tick {
                self.queue.advance_to(at);
                self.next_tick = at.checked_add_signed(chrono::Duration::milliseconds(CLOCK_TICK_MS));
                let tick = BuildAction::Runtime(RuntimeAction::ClockTicked(at));
                effects.extend(self.dispatch(tick)?);
                continue;
            }

            let Some((channel, action)) = self.queue.pop_until(deadline) else {
                break;
            };
            if !self.executor.accepts(channel) {
                debug!(?channel, "dropping delivery from a closed channel");
                continue;
            }
            effects.extend(self.dispatch(action)?);
        }
        self.queue.advance_to(deadline);
        Ok(effects)
    }

    pub fn advance_by(&mut self, step: Duration) -> Result<Vec<BuildEffect>, ExecError> {
        let deadline = chrono::Duration::from_std(step)
            .map_or(DateTime::<Utc>::MAX_UTC, |step| later(self.now(), step));
        self.advance_to(deadline)
    }
}
