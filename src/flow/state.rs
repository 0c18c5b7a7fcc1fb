//! Session flow state machine.
//!
//! All flow state lives in [`FlowState`]. Every change goes through
//! [`FlowState::apply`], which mutates the state and returns the side effects
//! the runtime must carry out (timers to schedule, generation calls to make,
//! sessions whose pending work should be dropped). Nothing here sleeps or
//! spawns, so the whole flow can be driven step by step in tests.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FlowError, GenerationError};
use crate::generation::GenerationRequest;

use super::model::{
    ChatMessage, GeneratedContent, InterviewAnswers, Screen, SessionId, SessionType, UserAction,
};
use super::script::{InterviewScript, apology};

/// Delayed callbacks a session can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timer {
    /// The assistant starts typing its next reply.
    AssistantTyping,
    /// The pending reply lands in the transcript.
    ReplyReady,
    /// The closing line has been read; move on to generation.
    Handoff,
    /// The rating confirmation is done; tear the session down.
    RatingReset,
}

impl std::fmt::Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AssistantTyping => "assistant_typing",
            Self::ReplyReady => "reply_ready",
            Self::Handoff => "handoff",
            Self::RatingReset => "rating_reset",
        };
        write!(f, "{s}")
    }
}

/// Input to the state machine.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// Something the user did.
    Action(UserAction),
    /// A timer scheduled by `session` has elapsed.
    TimerFired { session: SessionId, timer: Timer },
    /// The generation call issued for `session` has resolved.
    GenerationFinished {
        session: SessionId,
        outcome: Result<GeneratedContent, GenerationError>,
    },
}

impl From<UserAction> for FlowEvent {
    fn from(action: UserAction) -> Self {
        Self::Action(action)
    }
}

/// Work the runtime must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fire `timer` for `session` after its configured delay.
    Schedule { session: SessionId, timer: Timer },
    /// Call the content generator, then report back with
    /// [`FlowEvent::GenerationFinished`].
    Generate {
        session: SessionId,
        request: GenerationRequest,
    },
    /// Drop any pending work belonging to `session`.
    Cancel { session: SessionId },
}

/// Everything the presentation layer needs to draw the current screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
    pub screen: Screen,
    pub user_name: String,
    pub messages: Vec<ChatMessage>,
    /// Index of the script prompt the user is currently answering.
    pub step: usize,
    pub answers: InterviewAnswers,
    pub session_type: Option<SessionType>,
    pub assistant_typing: bool,
    pub content: Option<GeneratedContent>,
    /// 0 until the user rates the session, then 1..=5.
    pub rating: u8,
    /// The live session, if any. Events tagged with any other id are stale.
    pub session: Option<SessionId>,
    /// Script index of the assistant reply that is scheduled but not yet
    /// delivered.
    pub pending_reply: Option<usize>,
    /// A generation call is in flight for the live session.
    pub generating: bool,
    last_session: u64,
    #[serde(skip)]
    script: InterviewScript,
}

impl Default for FlowState {
    fn default() -> Self {
        Self::with_script(InterviewScript::default())
    }
}

impl FlowState {
    pub fn with_script(script: InterviewScript) -> Self {
        Self {
            screen: Screen::default(),
            user_name: String::new(),
            messages: Vec::new(),
            step: 0,
            answers: InterviewAnswers::default(),
            session_type: None,
            assistant_typing: false,
            content: None,
            rating: 0,
            session: None,
            pending_reply: None,
            generating: false,
            last_session: 0,
            script,
        }
    }

    pub fn script(&self) -> &InterviewScript {
        &self.script
    }

    /// Whether the name screen's Continue affordance is enabled.
    pub fn can_continue(&self) -> bool {
        !self.user_name.trim().is_empty()
    }

    /// Whether the chat input accepts a message right now.
    pub fn can_send(&self) -> bool {
        self.screen == Screen::Chat
            && self.pending_reply.is_none()
            && !self.script.is_terminal(self.step)
    }

    /// Apply one event. On `Err` the state is unchanged.
    pub fn apply(&mut self, event: FlowEvent) -> Result<Vec<Effect>, FlowError> {
        match event {
            FlowEvent::Action(action) => self.apply_action(action),
            FlowEvent::TimerFired { session, timer } => {
                if !self.is_live(session) {
                    debug!(%session, %timer, "Dropping timer for stale session");
                    return Ok(vec![]);
                }
                Ok(self.on_timer(session, timer))
            }
            FlowEvent::GenerationFinished { session, outcome } => {
                if !self.is_live(session) || !self.generating {
                    debug!(%session, "Dropping generation result for stale session");
                    return Ok(vec![]);
                }
                Ok(self.on_generation_finished(outcome))
            }
        }
    }

    fn apply_action(&mut self, action: UserAction) -> Result<Vec<Effect>, FlowError> {
        match action {
            UserAction::SetUserName(name) => {
                self.user_name = name.trim().to_string();
                Ok(vec![])
            }
            UserAction::NavigateTo(target) => self.navigate_to(target),
            UserAction::BeginSession(session_type) => self.begin_session(session_type),
            UserAction::SubmitMessage(text) => self.submit_message(&text),
            UserAction::ChangeSession => self.change_session(),
            UserAction::SubmitRating(stars) => self.submit_rating(stars),
        }
    }

    fn is_live(&self, session: SessionId) -> bool {
        self.session == Some(session)
    }

    fn navigate_to(&mut self, target: Screen) -> Result<Vec<Effect>, FlowError> {
        if !self.screen.can_navigate_to(target) {
            return Err(FlowError::InvalidTransition {
                from: self.screen,
                to: target,
            });
        }

        match (self.screen, target) {
            (Screen::Name, Screen::Home) if !self.can_continue() => Err(FlowError::EmptyUserName),
            (Screen::Chat, Screen::Home) => Ok(self.abandon_session()),
            (Screen::Player, Screen::Chat) => self.change_session(),
            _ => {
                self.screen = target;
                Ok(vec![])
            }
        }
    }

    fn begin_session(&mut self, session_type: SessionType) -> Result<Vec<Effect>, FlowError> {
        if self.screen != Screen::Home {
            return Err(FlowError::InvalidTransition {
                from: self.screen,
                to: Screen::Chat,
            });
        }
        if !self.can_continue() {
            return Err(FlowError::EmptyUserName);
        }
        Ok(self.start_interview(session_type))
    }

    /// "Change session" from the player restarts the interview from the
    /// greeting with the same session type.
    fn change_session(&mut self) -> Result<Vec<Effect>, FlowError> {
        if self.screen != Screen::Player {
            return Err(FlowError::WrongScreen {
                expected: Screen::Player,
                actual: self.screen,
            });
        }
        let session_type = self.session_type.ok_or(FlowError::NoActiveSession)?;
        Ok(self.start_interview(session_type))
    }

    fn start_interview(&mut self, session_type: SessionType) -> Vec<Effect> {
        let mut effects = self.close_session();

        self.last_session += 1;
        let session = SessionId(self.last_session);
        self.session = Some(session);
        self.session_type = Some(session_type);
        self.screen = Screen::Chat;
        self.pending_reply = Some(0);

        debug!(%session, %session_type, "Interview started");
        effects.push(Effect::Schedule {
            session,
            timer: Timer::AssistantTyping,
        });
        effects
    }

    /// Leaving the chat mid-interview drops the session and everything it
    /// collected.
    fn abandon_session(&mut self) -> Vec<Effect> {
        let effects = self.close_session();
        self.screen = Screen::Home;
        effects
    }

    /// Reset every per-session field and cancel the live session, if any.
    /// The user name survives.
    fn close_session(&mut self) -> Vec<Effect> {
        let effects = self
            .session
            .take()
            .map(|session| vec![Effect::Cancel { session }])
            .unwrap_or_default();

        self.session_type = None;
        self.messages.clear();
        self.step = 0;
        self.answers = InterviewAnswers::default();
        self.assistant_typing = false;
        self.content = None;
        self.rating = 0;
        self.pending_reply = None;
        self.generating = false;
        effects
    }

    fn submit_message(&mut self, text: &str) -> Result<Vec<Effect>, FlowError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FlowError::EmptyMessage);
        }
        if self.screen != Screen::Chat {
            return Err(FlowError::WrongScreen {
                expected: Screen::Chat,
                actual: self.screen,
            });
        }
        let session = self.session.ok_or(FlowError::NoActiveSession)?;
        if self.pending_reply.is_some() {
            return Err(FlowError::ReplyPending);
        }
        if self.script.is_terminal(self.step) {
            return Err(FlowError::InterviewConcluded);
        }

        self.messages.push(ChatMessage::user(text));
        if let Some(slot) = self.script.step(self.step).and_then(|s| s.slot) {
            self.answers.store(slot, text);
        }
        self.step += 1;
        self.pending_reply = Some(self.step);

        debug!(%session, step = self.step, "User answered");
        Ok(vec![Effect::Schedule {
            session,
            timer: Timer::AssistantTyping,
        }])
    }

    fn submit_rating(&mut self, stars: u8) -> Result<Vec<Effect>, FlowError> {
        if self.screen != Screen::Rating {
            return Err(FlowError::WrongScreen {
                expected: Screen::Rating,
                actual: self.screen,
            });
        }
        if !(1..=5).contains(&stars) {
            return Err(FlowError::InvalidRating(stars));
        }
        if self.rating > 0 {
            return Err(FlowError::AlreadyRated);
        }
        let session = self.session.ok_or(FlowError::NoActiveSession)?;

        self.rating = stars;
        Ok(vec![Effect::Schedule {
            session,
            timer: Timer::RatingReset,
        }])
    }

    fn on_timer(&mut self, session: SessionId, timer: Timer) -> Vec<Effect> {
        match timer {
            Timer::AssistantTyping => {
                if self.pending_reply.is_none() {
                    return vec![];
                }
                self.assistant_typing = true;
                vec![Effect::Schedule {
                    session,
                    timer: Timer::ReplyReady,
                }]
            }
            Timer::ReplyReady => {
                let Some(index) = self.pending_reply.take() else {
                    return vec![];
                };
                self.assistant_typing = false;

                let Some(session_type) = self.session_type else {
                    return vec![];
                };
                if let Some(text) = self.script.render(index, &self.user_name, session_type) {
                    self.messages.push(ChatMessage::assistant(text));
                }

                if self.script.is_terminal(index) {
                    vec![Effect::Schedule {
                        session,
                        timer: Timer::Handoff,
                    }]
                } else {
                    vec![]
                }
            }
            Timer::Handoff => {
                if self.generating || self.screen != Screen::Chat {
                    return vec![];
                }
                let Some(session_type) = self.session_type else {
                    return vec![];
                };
                self.screen = Screen::Loading;
                self.generating = true;
                vec![Effect::Generate {
                    session,
                    request: GenerationRequest::for_session(session_type, &self.answers),
                }]
            }
            Timer::RatingReset => {
                if self.screen != Screen::Rating {
                    return vec![];
                }
                let effects = self.close_session();
                self.screen = Screen::Home;
                effects
            }
        }
    }

    fn on_generation_finished(
        &mut self,
        outcome: Result<GeneratedContent, GenerationError>,
    ) -> Vec<Effect> {
        self.generating = false;
        match outcome {
            Ok(content) => {
                self.content = Some(content);
                self.screen = Screen::Player;
            }
            Err(_) => {
                // Back to the chat with an apology; the user's next answer
                // re-runs the closing line and a fresh generation.
                self.screen = Screen::Chat;
                self.step = self.script.retry_step();
                if let Some(session_type) = self.session_type {
                    self.messages.push(ChatMessage::assistant(apology(session_type)));
                }
            }
        }
        vec![]
    }
}
