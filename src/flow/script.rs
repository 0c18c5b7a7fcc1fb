//! The interview script: an ordered list of assistant prompts and the answer
//! slot each prompt fills.
//!
//! The reply to a message sent at step `n` is the prompt at step `n + 1`. The
//! last prompt is the closing line; delivering it hands the session off to
//! content generation.

use crate::error::ScriptError;

use super::model::{AnswerSlot, SessionType};

/// One assistant turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    /// Prompt template. `{name}` and `{session}` are substituted on render.
    pub prompt: &'static str,
    /// Where the user's answer to this prompt is stored, if anywhere.
    pub slot: Option<AnswerSlot>,
}

/// Fixed, data-driven interview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewScript {
    steps: Vec<ScriptStep>,
}

impl Default for InterviewScript {
    fn default() -> Self {
        Self {
            steps: vec![
                ScriptStep {
                    prompt: "Hey {name}, how are you feeling today?",
                    slot: Some(AnswerSlot::Thought),
                },
                ScriptStep {
                    prompt: "Could you specify to me if there is any specific thoughts or situations causing you this?",
                    slot: Some(AnswerSlot::Situation),
                },
                ScriptStep {
                    prompt: "What exactly makes you nervous when you think of it?",
                    slot: None,
                },
                ScriptStep {
                    prompt: "I am creating a {session} for you. Meanwhile, could you let me know what kind of metaphors or words make you soothed?",
                    slot: Some(AnswerSlot::Metaphors),
                },
                ScriptStep {
                    prompt: "Great, here is the {session} for you.",
                    slot: None,
                },
            ],
        }
    }
}

impl InterviewScript {
    /// Build a script. It needs at least a greeting and a closing line.
    pub fn new(steps: Vec<ScriptStep>) -> Result<Self, ScriptError> {
        if steps.len() < 2 {
            return Err(ScriptError::TooShort { steps: steps.len() });
        }
        Ok(Self { steps })
    }

    /// Number of assistant prompts, closing line included. Always at least 2.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, index: usize) -> Option<&ScriptStep> {
        self.steps.get(index)
    }

    /// Index of the closing line. The step counter never goes past it.
    pub fn terminal_step(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn is_terminal(&self, step: usize) -> bool {
        step >= self.terminal_step()
    }

    /// Step the interview rewinds to after a failed generation: the last
    /// step that collects an answer, so the user's resubmission leads
    /// straight back into the closing line.
    pub fn retry_step(&self) -> usize {
        self.steps[..self.terminal_step()]
            .iter()
            .rposition(|s| s.slot.is_some())
            .unwrap_or(self.terminal_step() - 1)
    }

    /// Render the prompt for `step`, if the script has one.
    pub fn render(&self, step: usize, name: &str, session: SessionType) -> Option<String> {
        self.step(step).map(|s| {
            s.prompt
                .replace("{name}", name)
                .replace("{session}", &session.to_string())
        })
    }
}

/// Assistant line posted when generation fails and the user is sent back to
/// the chat.
pub fn apology(session: SessionType) -> String {
    format!(
        "Sorry, I couldn't finish your {session} just now. Could you share those soothing words with me once more?"
    )
}
