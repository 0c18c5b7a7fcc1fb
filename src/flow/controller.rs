//! SessionController: owns the flow state and runs its side effects on the
//! tokio runtime.
//!
//! Timers and generation calls are spawned tasks tracked per session. When a
//! session is abandoned, restarted or torn down its tasks are aborted, and
//! any result that still slips through is dropped by the state machine's
//! session check.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::FlowConfig;
use crate::error::{FlowError, GenerationError};
use crate::generation::{ContentGenerator, GenerationRequest};

use super::model::{Screen, SessionId, SessionType, UserAction};
use super::state::{Effect, FlowEvent, FlowState, Timer};

/// Capacity of the state update channel. Slow subscribers that fall further
/// behind than this see `Lagged` and should re-read [`SessionController::snapshot`].
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Drives one user's session flow. Cheap to clone; clones share state.
///
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct SessionController {
    config: Arc<FlowConfig>,
    generator: Arc<dyn ContentGenerator>,
    state: Arc<Mutex<FlowState>>,
    /// Pending timer and generation tasks, by the session that spawned them.
    tasks: Arc<Mutex<HashMap<SessionId, Vec<JoinHandle<()>>>>>,
    updates: broadcast::Sender<FlowState>,
}

impl SessionController {
    pub fn new(config: FlowConfig, generator: Arc<dyn ContentGenerator>) -> Self {
        Self::with_state(config, generator, FlowState::default())
    }

    /// Start from an existing state, e.g. one with a custom interview script.
    pub fn with_state(
        config: FlowConfig,
        generator: Arc<dyn ContentGenerator>,
        state: FlowState,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            generator,
            state: Arc::new(Mutex::new(state)),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            updates,
        }
    }

    /// Receive a full snapshot after every state change.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowState> {
        self.updates.subscribe()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> FlowState {
        self.lock_state().clone()
    }

    pub fn set_user_name(&self, name: impl Into<String>) -> Result<(), FlowError> {
        self.handle(UserAction::SetUserName(name.into()))
    }

    pub fn navigate_to(&self, screen: Screen) -> Result<(), FlowError> {
        self.handle(UserAction::NavigateTo(screen))
    }

    pub fn begin_session(&self, session_type: SessionType) -> Result<(), FlowError> {
        self.handle(UserAction::BeginSession(session_type))
    }

    pub fn submit_user_message(&self, text: impl Into<String>) -> Result<(), FlowError> {
        self.handle(UserAction::SubmitMessage(text.into()))
    }

    pub fn change_session(&self) -> Result<(), FlowError> {
        self.handle(UserAction::ChangeSession)
    }

    pub fn submit_rating(&self, stars: u8) -> Result<(), FlowError> {
        self.handle(UserAction::SubmitRating(stars))
    }

    /// Apply a user action forwarded by the presentation layer.
    pub fn handle(&self, action: UserAction) -> Result<(), FlowError> {
        self.dispatch(FlowEvent::Action(action)).inspect_err(|e| {
            debug!(error = %e, "Action rejected");
        })
    }

    /// Number of timer and generation tasks still pending.
    pub fn pending_tasks(&self) -> usize {
        self.lock_tasks()
            .values()
            .flatten()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Abort every pending task.
    pub fn shutdown(&self) {
        let mut tasks = self.lock_tasks();
        for (_, handles) in tasks.drain() {
            for handle in handles {
                handle.abort();
            }
        }
        debug!("Session controller shut down");
    }

    fn dispatch(&self, event: FlowEvent) -> Result<(), FlowError> {
        let effects = {
            let mut state = self.lock_state();
            let before = state.screen;
            let effects = state.apply(event)?;
            if state.screen != before {
                info!(
                    from = %before,
                    to = %state.screen,
                    step = state.step,
                    "Screen changed"
                );
            }
            // Sent under the lock so subscribers see snapshots in order.
            // An error only means nobody is listening.
            let _ = self.updates.send(state.clone());
            effects
        };

        for effect in effects {
            self.execute(effect);
        }
        Ok(())
    }

    fn execute(&self, effect: Effect) {
        match effect {
            Effect::Schedule { session, timer } => self.schedule(session, timer),
            Effect::Generate { session, request } => self.generate(session, request),
            Effect::Cancel { session } => self.cancel(session),
        }
    }

    fn schedule(&self, session: SessionId, timer: Timer) {
        let delay = self.config.delay_for(timer);
        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = this.dispatch(FlowEvent::TimerFired { session, timer }) {
                error!(%session, %timer, error = %e, "Timer callback rejected");
            }
        });
        self.track(session, handle);
    }

    fn generate(&self, session: SessionId, request: GenerationRequest) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let session_type = request.session_type();
            let limit = this.config.generation_timeout;
            info!(
                %session,
                %session_type,
                generator = this.generator.name(),
                "Generating content"
            );

            let outcome =
                match tokio::time::timeout(limit, request.run(this.generator.as_ref())).await {
                    Ok(result) => result,
                    Err(_) => Err(GenerationError::Timeout { after: limit }),
                };

            match &outcome {
                Ok(content) => info!(
                    %session,
                    title = %content.title,
                    lines = content.lines.len(),
                    "Content generated"
                ),
                Err(e) => warn!(%session, error = %e, "Content generation failed"),
            }

            if let Err(e) = this.dispatch(FlowEvent::GenerationFinished { session, outcome }) {
                error!(%session, error = %e, "Generation result rejected");
            }
        });
        self.track(session, handle);
    }

    fn cancel(&self, session: SessionId) {
        let Some(handles) = self.lock_tasks().remove(&session) else {
            return;
        };
        let mut aborted = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        debug!(%session, aborted, "Cancelled session tasks");
    }

    fn track(&self, session: SessionId, handle: JoinHandle<()>) {
        let mut tasks = self.lock_tasks();
        let handles = tasks.entry(session).or_default();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    fn lock_state(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tasks(&self) -> MutexGuard<'_, HashMap<SessionId, Vec<JoinHandle<()>>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::flow::model::{AnswerSlot, GeneratedContent, Sender};
    use crate::flow::script::{InterviewScript, ScriptStep};
    use crate::generation::StubGenerator;

    /// Long enough for any single presentation + typing (or handoff) delay.
    const BEAT: Duration = Duration::from_millis(2100);

    /// Counts calls and fails the first `failures` of them.
    struct FlakyGenerator {
        calls: AtomicUsize,
        failures: usize,
    }

    impl FlakyGenerator {
        fn new(failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
            }
        }

        fn respond(&self) -> Result<GeneratedContent, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(GenerationError::Failed {
                    reason: "backend unavailable".to_string(),
                })
            } else {
                Ok(GeneratedContent::new("Flaky", ["one line"]))
            }
        }
    }

    #[async_trait]
    impl ContentGenerator for FlakyGenerator {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn generate_affirmations(
            &self,
            _situation: &str,
            _metaphors: &str,
        ) -> Result<GeneratedContent, GenerationError> {
            self.respond()
        }
        async fn generate_meditation(
            &self,
            _thought: &str,
        ) -> Result<GeneratedContent, GenerationError> {
            self.respond()
        }
    }

    /// Never resolves.
    struct HangingGenerator;

    #[async_trait]
    impl ContentGenerator for HangingGenerator {
        fn name(&self) -> &str {
            "hanging"
        }
        async fn generate_affirmations(
            &self,
            _situation: &str,
            _metaphors: &str,
        ) -> Result<GeneratedContent, GenerationError> {
            std::future::pending().await
        }
        async fn generate_meditation(
            &self,
            _thought: &str,
        ) -> Result<GeneratedContent, GenerationError> {
            std::future::pending().await
        }
    }

    fn controller_with(generator: Arc<dyn ContentGenerator>) -> SessionController {
        let controller = SessionController::new(FlowConfig::default(), generator);
        controller.navigate_to(Screen::Name).unwrap();
        controller.set_user_name("Alex").unwrap();
        controller.navigate_to(Screen::Home).unwrap();
        controller
    }

    async fn run_interview(controller: &SessionController, session_type: SessionType) {
        controller.begin_session(session_type).unwrap();
        tokio::time::sleep(BEAT).await;
        for text in ["I feel anxious", "Meeting with boss", "Everyone watching", "ocean waves"] {
            controller.submit_user_message(text).unwrap();
            tokio::time::sleep(BEAT).await;
        }
        // Handoff to the loading screen.
        tokio::time::sleep(BEAT).await;
    }

    #[tokio::test(start_paused = true)]
    async fn greeting_arrives_after_typing_delay() {
        let controller = controller_with(Arc::new(StubGenerator::immediate()));
        controller.begin_session(SessionType::Affirmations).unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        let state = controller.snapshot();
        assert!(state.assistant_typing);
        assert!(state.messages.is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let state = controller.snapshot();
        assert!(!state.assistant_typing);
        assert_eq!(state.messages[0].text, "Hey Alex, how are you feeling today?");
    }

    #[tokio::test(start_paused = true)]
    async fn meditation_round_trip_reaches_player() {
        let config = FlowConfig::default();
        let generator = Arc::new(StubGenerator::new(config.generation_delay));
        let controller = controller_with(generator);
        run_interview(&controller, SessionType::Meditation).await;

        let state = controller.snapshot();
        assert_eq!(state.step, 4);
        assert_eq!(state.screen, Screen::Loading);
        assert!(state.content.is_none());

        tokio::time::sleep(Duration::from_millis(3100)).await;
        let state = controller.snapshot();
        assert_eq!(state.screen, Screen::Player);
        assert_eq!(state.content.unwrap().title, "Peace and Clarity");
        assert_eq!(controller.pending_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rating_returns_home_and_clears_session() {
        let controller = controller_with(Arc::new(StubGenerator::immediate()));
        run_interview(&controller, SessionType::Affirmations).await;
        tokio::task::yield_now().await;
        assert_eq!(controller.snapshot().screen, Screen::Player);

        controller.navigate_to(Screen::Rating).unwrap();
        controller.submit_rating(5).unwrap();
        assert_eq!(controller.snapshot().rating, 5);

        tokio::time::sleep(Duration::from_millis(1600)).await;
        let state = controller.snapshot();
        assert_eq!(state.screen, Screen::Home);
        assert_eq!(state.rating, 0);
        assert!(state.answers.is_empty());
        assert!(state.content.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_session_callbacks_never_fire() {
        let controller = controller_with(Arc::new(StubGenerator::immediate()));
        controller.begin_session(SessionType::Meditation).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(controller.snapshot().assistant_typing);

        controller.navigate_to(Screen::Home).unwrap();
        assert_eq!(controller.pending_tasks(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let state = controller.snapshot();
        assert_eq!(state.screen, Screen::Home);
        assert!(!state.assistant_typing);
        assert!(state.messages.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_generation_apologises_then_retries() {
        let generator = Arc::new(FlakyGenerator::new(1));
        let controller = controller_with(generator.clone());
        run_interview(&controller, SessionType::Affirmations).await;
        tokio::task::yield_now().await;

        let state = controller.snapshot();
        assert_eq!(state.screen, Screen::Chat);
        assert_eq!(state.step, 3);
        let last = state.messages.last().unwrap();
        assert_eq!(last.sender, Sender::Assistant);
        assert!(last.text.starts_with("Sorry"));

        controller.submit_user_message("rain on the roof").unwrap();
        tokio::time::sleep(BEAT).await;
        tokio::time::sleep(BEAT).await;
        let state = controller.snapshot();
        assert_eq!(state.screen, Screen::Player);
        assert_eq!(state.content.unwrap().title, "Flaky");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_generation_times_out() {
        let controller = controller_with(Arc::new(HangingGenerator));
        run_interview(&controller, SessionType::Meditation).await;
        assert_eq!(controller.snapshot().screen, Screen::Loading);

        tokio::time::sleep(Duration::from_secs(31)).await;
        let state = controller.snapshot();
        assert_eq!(state.screen, Screen::Chat);
        assert!(!state.generating);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_every_screen() {
        let controller = controller_with(Arc::new(StubGenerator::immediate()));
        let mut updates = controller.subscribe();
        run_interview(&controller, SessionType::Meditation).await;
        tokio::task::yield_now().await;

        let mut screens = Vec::new();
        while let Ok(state) = updates.try_recv() {
            if screens.last() != Some(&state.screen) {
                screens.push(state.screen);
            }
        }
        assert_eq!(screens, vec![Screen::Chat, Screen::Loading, Screen::Player]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_action_leaves_state_untouched() {
        let controller = controller_with(Arc::new(StubGenerator::immediate()));
        let mut updates = controller.subscribe();
        let err = controller.submit_rating(3).unwrap_err();
        assert!(matches!(err, FlowError::WrongScreen { .. }));
        assert!(updates.try_recv().is_err());
        assert_eq!(controller.snapshot().screen, Screen::Home);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_pending_work() {
        let controller = controller_with(Arc::new(StubGenerator::immediate()));
        controller.begin_session(SessionType::Meditation).unwrap();
        assert_eq!(controller.pending_tasks(), 1);
        controller.shutdown();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(controller.snapshot().messages.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_script_reaches_player() {
        let script = InterviewScript::new(vec![
            ScriptStep {
                prompt: "Hi {name}, what's on your mind?",
                slot: Some(AnswerSlot::Thought),
            },
            ScriptStep {
                prompt: "Here is your {session}.",
                slot: None,
            },
        ])
        .unwrap();
        let controller = SessionController::with_state(
            FlowConfig::default(),
            Arc::new(StubGenerator::immediate()),
            FlowState::with_script(script),
        );
        controller.navigate_to(Screen::Name).unwrap();
        controller.set_user_name("Alex").unwrap();
        controller.navigate_to(Screen::Home).unwrap();

        controller.begin_session(SessionType::Meditation).unwrap();
        tokio::time::sleep(BEAT).await;
        controller.submit_user_message("restless").unwrap();
        tokio::time::sleep(BEAT).await;
        assert_eq!(
            controller.snapshot().messages.last().unwrap().text,
            "Here is your meditation."
        );

        tokio::time::sleep(BEAT).await;
        let state = controller.snapshot();
        assert_eq!(state.screen, Screen::Player);
        assert_eq!(state.step, 1);
        assert_eq!(state.content.unwrap().title, "Peace and Clarity");
    }
}
