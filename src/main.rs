use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast::error::RecvError;

use orpheus::channels::{Channel, CliChannel, Command, interpret, notice_for};
use orpheus::config::FlowConfig;
use orpheus::flow::SessionController;
use orpheus::generation::StubGenerator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = FlowConfig::from_env()?;
    let _log_guard = orpheus::logging::init(&config)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        typing_delay_ms = config.typing_delay.as_millis() as u64,
        generation_timeout_s = config.generation_timeout.as_secs(),
        "Starting Orpheus"
    );

    let generator = Arc::new(StubGenerator::new(config.generation_delay));
    let controller = SessionController::new(config, generator);
    let channel = CliChannel::new();

    let mut updates = controller.subscribe();
    let mut input = channel.start().await?;
    channel.render(&controller.snapshot()).await?;

    loop {
        tokio::select! {
            msg = input.next() => {
                let Some(msg) = msg else {
                    tracing::info!("Input closed");
                    break;
                };
                match interpret(&controller.snapshot(), &msg.content) {
                    Command::Quit => break,
                    Command::Unrecognized(hint) => channel.notify(&hint).await?,
                    Command::Actions(actions) => {
                        for action in actions {
                            if let Err(e) = controller.handle(action) {
                                if let Some(notice) = notice_for(&e) {
                                    channel.notify(&notice).await?;
                                }
                                break;
                            }
                        }
                    }
                }
            }
            update = updates.recv() => {
                match update {
                    Ok(state) => channel.render(&state).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Renderer lagged; redrawing from snapshot");
                        channel.render(&controller.snapshot()).await?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    controller.shutdown();
    channel.shutdown().await?;
    Ok(())
}
