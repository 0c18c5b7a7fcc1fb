//! Canned generator that stands in for a real content backend.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::GenerationError;
use crate::flow::model::GeneratedContent;

use super::ContentGenerator;

const AFFIRMATIONS_TITLE: &str = "I am confident";
const AFFIRMATIONS: [&str; 5] = [
    "I appreciate the little things you do for me",
    "You are a force of positivity and strength",
    "You are worthy of all the good things coming your way",
    "You are my anchor. You keep me grounded through the storms.",
    "You are a fantastic leader",
];

const MEDITATION_TITLE: &str = "Peace and Clarity";
const MEDITATION_SCRIPT: [&str; 5] = [
    "Let's begin by finding a comfortable position...",
    "Notice the sensation of your breath...",
    "Your thought about feeling lacking is just that - a thought...",
    "You are complete exactly as you are...",
    "Let this truth settle into your being...",
];

/// Waits a fixed delay, then returns fixed content. Never fails.
#[derive(Debug, Clone)]
pub struct StubGenerator {
    delay: Duration,
}

impl StubGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// A stub with no simulated latency.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl ContentGenerator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate_affirmations(
        &self,
        situation: &str,
        metaphors: &str,
    ) -> Result<GeneratedContent, GenerationError> {
        debug!(
            situation_len = situation.len(),
            metaphors_len = metaphors.len(),
            "Generating affirmations"
        );
        self.simulate_latency().await;
        Ok(GeneratedContent::new(AFFIRMATIONS_TITLE, AFFIRMATIONS))
    }

    async fn generate_meditation(&self, thought: &str) -> Result<GeneratedContent, GenerationError> {
        debug!(thought_len = thought.len(), "Generating meditation");
        self.simulate_latency().await;
        Ok(GeneratedContent::new(MEDITATION_TITLE, MEDITATION_SCRIPT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn affirmations_payload() {
        let content = StubGenerator::immediate()
            .generate_affirmations("Meeting with boss", "ocean waves")
            .await
            .unwrap();
        assert_eq!(content.title, "I am confident");
        assert_eq!(content.lines.len(), 5);
        assert_eq!(content.lines[4], "You are a fantastic leader");
    }

    #[tokio::test]
    async fn meditation_payload() {
        let content = StubGenerator::immediate()
            .generate_meditation("I feel lacking")
            .await
            .unwrap();
        assert_eq!(content.title, "Peace and Clarity");
        assert_eq!(content.lines.len(), 5);
        assert!(content.lines[0].starts_with("Let's begin"));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_configured_delay() {
        let stub = StubGenerator::new(Duration::from_secs(3));
        let start = tokio::time::Instant::now();
        stub.generate_meditation("x").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
