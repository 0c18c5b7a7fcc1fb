//! CLI channel: stdin/stdout front-end for the session flow.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream};
use crate::error::ChannelError;
use crate::flow::{FlowState, Screen, Sender};

/// What has already been printed, so each render only adds the new parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderCursor {
    screen: Option<Screen>,
    messages: usize,
    typing: bool,
    rated: bool,
}

/// Lines to print for the transition from `cursor` to `state`. Advances the
/// cursor.
pub fn render_lines(cursor: &mut RenderCursor, state: &FlowState) -> Vec<String> {
    let mut lines = Vec::new();

    if cursor.screen != Some(state.screen) {
        cursor.screen = Some(state.screen);
        cursor.messages = 0;
        cursor.typing = false;
        cursor.rated = false;
        lines.push(String::new());
        lines.extend(screen_header(state));
    }

    if state.screen == Screen::Chat {
        // A restarted interview clears the transcript.
        if state.messages.len() < cursor.messages {
            cursor.messages = 0;
        }
        for message in &state.messages[cursor.messages..] {
            // The user's own lines are already on the terminal.
            if message.sender == Sender::Assistant {
                lines.push(format!("Orpheus: {}", message.text));
            }
        }
        cursor.messages = state.messages.len();

        if state.assistant_typing && !cursor.typing {
            lines.push("Orpheus is typing...".to_string());
        }
        cursor.typing = state.assistant_typing;
    }

    if state.screen == Screen::Rating && state.rating > 0 && !cursor.rated {
        cursor.rated = true;
        let stars = usize::from(state.rating.min(5));
        lines.push(format!("{}{}", "★".repeat(stars), "☆".repeat(5 - stars)));
        lines.push("✓ Thank you for your feedback!".to_string());
        lines.push("Redirecting to home...".to_string());
    }

    lines
}

fn screen_header(state: &FlowState) -> Vec<String> {
    match state.screen {
        Screen::Welcome => vec![
            "Welcome to Orpheus!".to_string(),
            "Personalized affirmations and meditations to reset your mind and reduce stress."
                .to_string(),
            "Press Enter to get started.".to_string(),
        ],
        Screen::Name => vec!["What should we call you?".to_string()],
        Screen::Home => vec![
            "What do you need right now?".to_string(),
            "  1) Meditation".to_string(),
            "  2) Affirmations".to_string(),
        ],
        Screen::Chat => vec!["(type your reply; /home or /close to leave)".to_string()],
        Screen::Loading => vec![
            state
                .session_type
                .map(|t| t.loading_caption())
                .unwrap_or("Creating your session")
                .to_string(),
        ],
        Screen::Player => {
            let mut lines = Vec::new();
            if let Some(content) = &state.content {
                lines.push(format!("== {} ==", content.title));
                lines.extend(content.lines.iter().map(|l| format!("  {l}")));
            }
            lines.push("/change  Change Session".to_string());
            lines.push("/save    Save To Library".to_string());
            lines
        }
        Screen::Rating => vec![
            "How helpful was this session?".to_string(),
            "Your feedback helps us personalize future sessions".to_string(),
            "Rate 1-5:".to_string(),
        ],
    }
}

/// Reads lines from stdin and prints screens to stdout.
pub struct CliChannel {
    cursor: Mutex<RenderCursor>,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            cursor: Mutex::new(RenderCursor::default()),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Write rendered lines and flush. A closed terminal surfaces as
/// [`ChannelError::Io`].
fn write_lines(out: &mut impl Write, lines: &[String]) -> Result<(), ChannelError> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    // Blank lines are forwarded: Enter means "continue" on
                    // some screens.
                    Ok(Some(line)) => {
                        let msg = IncomingMessage::new("cli", &line);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn render(&self, state: &FlowState) -> Result<(), ChannelError> {
        let lines = {
            let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
            render_lines(&mut cursor, state)
        };
        write_lines(&mut std::io::stdout().lock(), &lines)
    }

    async fn notify(&self, notice: &str) -> Result<(), ChannelError> {
        write_lines(&mut std::io::stderr().lock(), &[format!("ℹ️  {notice}")])
    }
}
