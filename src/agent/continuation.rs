//! Continuation policies: when the run loop keeps going.

use super::flow::Flow;
use super::step::Step;

/// Decides, from the flows alone, whether another model call is due.
pub trait ContinuationPolicy: Send + Sync {
    fn should_continue(&self, flows: &[Flow]) -> bool;
}

/// Continue while the newest step is a tool batch (or nothing has happened).
///
/// A model step always ends the loop: if it requested tools, its tool batch
/// is appended within the same iteration and becomes the newest step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultContinuation {
    /// Upper bound on model steps across the whole run.
    pub max_steps: Option<usize>,
}

impl DefaultContinuation {
    pub fn unbounded() -> Self {
        Self { max_steps: None }
    }

    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            max_steps: Some(max_steps),
        }
    }
}

impl ContinuationPolicy for DefaultContinuation {
    fn should_continue(&self, flows: &[Flow]) -> bool {
        let steps = || flows.iter().flat_map(|flow| flow.steps());

        if let Some(max) = self.max_steps {
            let model_steps = steps().filter(|step| matches!(step, Step::Model(_))).count();
            if model_steps >= max {
                return false;
            }
        }

        match steps().filter(|step| !step.is_input()).last() {
            None | Some(Step::ToolBatch(_)) => true,
            Some(_) => false,
        }
    }
}

/// Adapter turning a closure into a [`ContinuationPolicy`].
pub struct PolicyFn<F>(pub F);

impl<F> ContinuationPolicy for PolicyFn<F>
where
    F: Fn(&[Flow]) -> bool + Send + Sync,
{
    fn should_continue(&self, flows: &[Flow]) -> bool {
        (self.0)(flows)
    }
}
