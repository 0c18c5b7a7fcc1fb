//! Turns a line of input into flow actions, depending on which screen is up.

use crate::error::FlowError;
use crate::flow::{FlowState, Screen, SessionType, UserAction};

/// What a line of input means on the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply these actions in order. Empty when the input is ignored.
    Actions(Vec<UserAction>),
    /// Leave the app.
    Quit,
    /// Not meaningful here; show the hint.
    Unrecognized(String),
}

/// Interpret `input` against the screen currently showing.
pub fn interpret(state: &FlowState, input: &str) -> Command {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();
    if lowered == "/quit" {
        return Command::Quit;
    }

    match state.screen {
        Screen::Welcome => Command::Actions(vec![UserAction::NavigateTo(Screen::Name)]),
        // Continue stays disabled until something is typed.
        Screen::Name if trimmed.is_empty() => Command::Actions(vec![]),
        Screen::Name => Command::Actions(vec![
            UserAction::SetUserName(trimmed.to_string()),
            UserAction::NavigateTo(Screen::Home),
        ]),
        Screen::Home => match lowered.as_str() {
            "1" | "meditation" => {
                Command::Actions(vec![UserAction::BeginSession(SessionType::Meditation)])
            }
            "2" | "affirmations" => {
                Command::Actions(vec![UserAction::BeginSession(SessionType::Affirmations)])
            }
            _ => Command::Unrecognized("Pick 1 (meditation) or 2 (affirmations).".to_string()),
        },
        Screen::Chat => match lowered.as_str() {
            "/home" | "/close" | "/back" => {
                Command::Actions(vec![UserAction::NavigateTo(Screen::Home)])
            }
            _ => Command::Actions(vec![UserAction::SubmitMessage(trimmed.to_string())]),
        },
        Screen::Loading => {
            let what = state
                .session_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "session".to_string());
            Command::Unrecognized(format!("Hang on, your {what} is on its way."))
        }
        Screen::Player => match lowered.as_str() {
            "/change" => Command::Actions(vec![UserAction::ChangeSession]),
            "/save" | "/back" => Command::Actions(vec![UserAction::NavigateTo(Screen::Rating)]),
            _ => Command::Unrecognized(
                "Type /change for a new session or /save to save it to your library.".to_string(),
            ),
        },
        Screen::Rating => match lowered.parse::<u8>() {
            Ok(stars) => Command::Actions(vec![UserAction::SubmitRating(stars)]),
            Err(_) => Command::Unrecognized("Rate the session from 1 to 5.".to_string()),
        },
    }
}

/// User-facing text for a rejected action. `None` when the rejection needs
/// no explanation, such as pressing Enter on an empty chat input.
pub fn notice_for(err: &FlowError) -> Option<String> {
    match err {
        FlowError::EmptyMessage => None,
        FlowError::EmptyUserName => Some("Please tell us your name first.".to_string()),
        FlowError::ReplyPending => Some("Orpheus is still typing...".to_string()),
        FlowError::InterviewConcluded => Some("That's everything I need for now.".to_string()),
        FlowError::InvalidRating(_) => Some("Rate the session from 1 to 5.".to_string()),
        FlowError::AlreadyRated => Some("Thanks, you've already rated this session.".to_string()),
        FlowError::InvalidTransition { .. }
        | FlowError::WrongScreen { .. }
        | FlowError::NoActiveSession => Some(err.to_string()),
    }
}
