//! Content generation: turns collected interview answers into a titled list
//! of lines (a meditation script or a set of affirmations).

pub mod stub;

pub use stub::StubGenerator;

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::flow::model::{GeneratedContent, InterviewAnswers, SessionType};

/// Backend that produces session content. One call, one complete result.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    async fn generate_affirmations(
        &self,
        situation: &str,
        metaphors: &str,
    ) -> Result<GeneratedContent, GenerationError>;

    async fn generate_meditation(&self, thought: &str) -> Result<GeneratedContent, GenerationError>;
}

/// Inputs for one generation call, already narrowed to what the session
/// type needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Meditation { thought: String },
    Affirmations { situation: String, metaphors: String },
}

impl GenerationRequest {
    pub fn for_session(session_type: SessionType, answers: &InterviewAnswers) -> Self {
        match session_type {
            SessionType::Meditation => Self::Meditation {
                thought: answers.thought.clone(),
            },
            SessionType::Affirmations => Self::Affirmations {
                situation: answers.situation.clone(),
                metaphors: answers.metaphors.clone(),
            },
        }
    }

    pub fn session_type(&self) -> SessionType {
        match self {
            Self::Meditation { .. } => SessionType::Meditation,
            Self::Affirmations { .. } => SessionType::Affirmations,
        }
    }

    /// Dispatch to the matching generator entry point.
    pub async fn run(
        &self,
        generator: &dyn ContentGenerator,
    ) -> Result<GeneratedContent, GenerationError> {
        match self {
            Self::Meditation { thought } => generator.generate_meditation(thought).await,
            Self::Affirmations {
                situation,
                metaphors,
            } => generator.generate_affirmations(situation, metaphors).await,
        }
    }
}
