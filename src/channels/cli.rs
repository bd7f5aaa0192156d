//! CLI channel — stdin/stdout REPL for local testing.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::Transport;
use crate::error::ChannelError;
use crate::flow::Dispatcher;

/// Lines typed by the local user.
pub type LineStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Feeds stdin lines to the dispatcher as if sent from one phone number.
pub struct CliChannel {
    dispatcher: Arc<Dispatcher>,
    phone: String,
}

impl CliChannel {
    pub fn new(dispatcher: Arc<Dispatcher>, phone: impl Into<String>) -> Self {
        Self {
            dispatcher,
            phone: phone.into(),
        }
    }

    /// Spawn the stdin reader. The stream ends at EOF.
    pub fn start() -> LineStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let reader = BufReader::new(tokio::io::stdin());
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|line| (line, rx))
        }))
    }

    /// Dispatch every line from `lines` until it ends.
    pub async fn run(&self, mut lines: LineStream) -> Result<(), ChannelError> {
        while let Some(line) = lines.next().await {
            let state = self.dispatcher.handle_message(&self.phone, &line).await;
            tracing::debug!(state = %state, "CLI message handled");
            eprint!("> ");
        }
        eprintln!();
        Ok(())
    }
}

/// Prints replies to stdout.
pub struct CliTransport;

#[async_trait]
impl Transport for CliTransport {
    fn name(&self) -> &str {
        "cli"
    }

    async fn send_text(&self, _recipient: &str, text: &str) -> Result<(), ChannelError> {
        println!("\n{}\n", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::ChatState;
    use crate::flow::handler::test_support::deps;

    #[tokio::test]
    async fn scripted_lines_drive_the_conversation() {
        let dispatcher = Arc::new(Dispatcher::standard(deps(), Arc::new(CliTransport)).unwrap());
        let channel = CliChannel::new(dispatcher.clone(), "5492215551234");

        let lines: LineStream = Box::pin(stream::iter(
            ["hola", "3"].into_iter().map(String::from),
        ));
        channel.run(lines).await.unwrap();

        assert_eq!(
            dispatcher.state_of("5492215551234").await,
            ChatState::MenuAbout
        );
    }
}
