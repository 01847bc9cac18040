//! Memory strategies: which messages the model sees.

use super::flow::Flow;
use crate::types::{ModelMessage, Role};

/// Builds the model context from a run's flows.
///
/// Implementations must be pure over `flows`.
pub trait MemoryStrategy: Send + Sync {
    fn context(&self, flows: &[Flow]) -> Vec<ModelMessage>;

    fn name(&self) -> &str {
        "custom"
    }
}

/// Every step's messages in chronological order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullHistory;

impl MemoryStrategy for FullHistory {
    fn context(&self, flows: &[Flow]) -> Vec<ModelMessage> {
        full_history(flows)
    }

    fn name(&self) -> &str {
        "full_history"
    }
}

/// All messages across all flows, oldest first.
pub fn full_history(flows: &[Flow]) -> Vec<ModelMessage> {
    flows
        .iter()
        .flat_map(|flow| flow.steps())
        .flat_map(|step| step.messages())
        .collect()
}

/// The most recent `max_messages` messages of the full history, in order.
///
/// The cut never separates tool results from the assistant message that
/// requested them: if the window would open on a tool message it is widened
/// back to that assistant message, so the window can exceed `max_messages`.
/// With [`Windowed::keep_instructions`] the system messages of input steps
/// before the cut are kept as well.
#[derive(Debug, Clone, Copy)]
pub struct Windowed {
    pub max_messages: usize,
    pub keep_instructions: bool,
}

impl Windowed {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages,
            keep_instructions: false,
        }
    }

    /// Also keep system messages from input steps that fall before the window.
    pub fn keep_instructions(mut self) -> Self {
        self.keep_instructions = true;
        self
    }
}

impl MemoryStrategy for Windowed {
    fn context(&self, flows: &[Flow]) -> Vec<ModelMessage> {
        let entries: Vec<(bool, ModelMessage)> = flows
            .iter()
            .flat_map(|flow| flow.steps())
            .flat_map(|step| {
                let instruction = self.keep_instructions && step.is_input();
                step.messages()
                    .into_iter()
                    .map(move |message| (instruction && message.role == Role::System, message))
            })
            .collect();

        let mut cut = entries.len().saturating_sub(self.max_messages);
        while cut > 0 && cut < entries.len() && entries[cut].1.role == Role::Tool {
            cut -= 1;
        }

        entries
            .into_iter()
            .enumerate()
            .filter(|(index, (pinned, _))| *index >= cut || *pinned)
            .map(|(_, (_, message))| message)
            .collect()
    }

    fn name(&self) -> &str {
        "windowed"
    }
}

/// Adapter turning a closure into a [`MemoryStrategy`].
pub struct MemoryFn<F>(pub F);

impl<F> MemoryStrategy for MemoryFn<F>
where
    F: Fn(&[Flow]) -> Vec<ModelMessage> + Send + Sync,
{
    fn context(&self, flows: &[Flow]) -> Vec<ModelMessage> {
        (self.0)(flows)
    }
}
