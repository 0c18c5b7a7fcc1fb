//! Session flow: the screen and interview state machine.
//!
//! The user moves through welcome → name → home → chat → loading → player →
//! rating and back home. On the chat screen a scripted interview collects a
//! few answers, which are handed to a content generator once the script
//! runs out. `state` holds the pure transition logic; `controller` runs its
//! timers and generation calls on tokio.

pub mod controller;
pub mod model;
pub mod script;
pub mod state;

pub use controller::SessionController;
pub use model::{
    AnswerSlot, ChatMessage, GeneratedContent, InterviewAnswers, Screen, Sender, SessionId,
    SessionType, UserAction,
};
pub use script::{InterviewScript, ScriptStep};
pub use state::{Effect, FlowEvent, FlowState, Timer};
