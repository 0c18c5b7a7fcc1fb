//! Session data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The screen currently shown to the user.
///
/// Progresses: Welcome → Name → Home → Chat → Loading → Player → Rating → Home.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Welcome,
    Name,
    Home,
    Chat,
    Loading,
    Player,
    Rating,
}

impl Screen {
    /// Whether the user may jump from `self` to `target` with a direct
    /// navigation (back, close, continue). Every other change is driven by
    /// a flow operation or a completed timer.
    pub fn can_navigate_to(&self, target: Screen) -> bool {
        use Screen::*;
        matches!(
            (self, target),
            (Welcome, Name) | (Name, Home) | (Chat, Home) | (Player, Chat) | (Player, Rating)
        )
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Name => "name",
            Self::Home => "home",
            Self::Chat => "chat",
            Self::Loading => "loading",
            Self::Player => "player",
            Self::Rating => "rating",
        };
        write!(f, "{s}")
    }
}

/// Which kind of content the interview produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Meditation,
    Affirmations,
}

impl SessionType {
    /// Caption shown while content is being generated.
    pub fn loading_caption(&self) -> &'static str {
        match self {
            Self::Meditation => "Creating meditation audio",
            Self::Affirmations => "Creating affirmation audio",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Meditation => write!(f, "meditation"),
            Self::Affirmations => write!(f, "affirmations"),
        }
    }
}

/// Identity of one pass through the interview. Anything scheduled on behalf
/// of a session carries its id, and is dropped once the id goes stale.
///
/// Ids are handed out in increasing order by the flow state, so a replayed
/// event sequence always produces the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Assistant,
    User,
}

/// One entry in the interview transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }
}

/// Which answer field a script step writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSlot {
    Thought,
    Situation,
    Metaphors,
}

/// Answers collected during the interview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewAnswers {
    pub thought: String,
    pub situation: String,
    pub metaphors: String,
}

impl InterviewAnswers {
    pub fn store(&mut self, slot: AnswerSlot, text: &str) {
        let field = match slot {
            AnswerSlot::Thought => &mut self.thought,
            AnswerSlot::Situation => &mut self.situation,
            AnswerSlot::Metaphors => &mut self.metaphors,
        };
        *field = text.to_string();
    }

    pub fn is_empty(&self) -> bool {
        self.thought.is_empty() && self.situation.is_empty() && self.metaphors.is_empty()
    }
}

/// Content returned by the generator: a title and the lines to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub lines: Vec<String>,
}

impl GeneratedContent {
    pub fn new<I, S>(title: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Discrete actions forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SetUserName(String),
    NavigateTo(Screen),
    BeginSession(SessionType),
    SubmitMessage(String),
    ChangeSession,
    SubmitRating(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_opens_on_welcome() {
        assert_eq!(Screen::default(), Screen::Welcome);
    }

    #[test]
    fn direct_navigation_edges() {
        use Screen::*;
        for (from, to) in [
            (Welcome, Name),
            (Name, Home),
            (Chat, Home),
            (Player, Chat),
            (Player, Rating),
        ] {
            assert!(from.can_navigate_to(to), "{from} should navigate to {to}");
        }

        // Flow-driven screens cannot be reached directly.
        assert!(!Home.can_navigate_to(Chat));
        assert!(!Chat.can_navigate_to(Loading));
        assert!(!Loading.can_navigate_to(Player));
        assert!(!Rating.can_navigate_to(Home));
        assert!(!Welcome.can_navigate_to(Home));
        assert!(!Home.can_navigate_to(Home));
    }

    #[test]
    fn display_matches_serde() {
        use Screen::*;
        for screen in [Welcome, Name, Home, Chat, Loading, Player, Rating] {
            let json = serde_json::to_string(&screen).unwrap();
            assert_eq!(format!("\"{screen}\""), json);
        }
        for kind in [SessionType::Meditation, SessionType::Affirmations] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(format!("\"{kind}\""), json);
        }
    }

    #[test]
    fn answers_store_by_slot() {
        let mut answers = InterviewAnswers::default();
        assert!(answers.is_empty());

        answers.store(AnswerSlot::Thought, "I feel anxious");
        answers.store(AnswerSlot::Metaphors, "ocean waves");
        assert_eq!(answers.thought, "I feel anxious");
        assert!(answers.situation.is_empty());
        assert_eq!(answers.metaphors, "ocean waves");
        assert!(!answers.is_empty());
    }

    #[test]
    fn loading_caption_per_type() {
        assert_eq!(SessionType::Meditation.loading_caption(), "Creating meditation audio");
        assert_eq!(SessionType::Affirmations.loading_caption(), "Creating affirmation audio");
    }

    #[test]
    fn message_constructors_set_sender() {
        assert_eq!(ChatMessage::assistant("hi").sender, Sender::Assistant);
        assert_eq!(ChatMessage::user("hello").sender, Sender::User);
    }
}
