//! Token streaming with a single-terminal-event guarantee
//!
//! A generation stream is a finite, non-restartable sequence of events:
//! zero or more `Token`s followed by exactly one terminal event, `Done`
//! or `Error`. Dropping the receiving end cancels the driving task at
//! its next send, which stops polling the upstream connection.

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use crate::providers::LlmProvider;

/// One event in a generation stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A generated text fragment, in generation order
    Token(String),
    /// Terminal: upstream failure, in place of a missing answer
    Error(String),
    /// Terminal: generation completed
    Done,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::Done)
    }
}

/// The receiving end of one generation stream
pub struct TokenStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl TokenStream {
    /// Next event; `None` only after a terminal event (or cancellation)
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Convert into a futures `Stream` for SSE plumbing
    pub fn into_stream(self) -> tokio_stream::wrappers::ReceiverStream<StreamEvent> {
        tokio_stream::wrappers::ReceiverStream::new(self.rx)
    }

    /// Drain the stream, collecting tokens until the terminal event.
    /// Returns the concatenated text and the terminal event.
    pub async fn collect_text(mut self) -> (String, Option<StreamEvent>) {
        let mut text = String::new();
        while let Some(event) = self.next_event().await {
            match event {
                StreamEvent::Token(fragment) => text.push_str(&fragment),
                terminal => return (text, Some(terminal)),
            }
        }
        (text, None)
    }
}

/// Drives the LLM capability and relays events to a channel
pub struct GenerationStreamer {
    llm: Arc<dyn LlmProvider>,
    stream_timeout: Duration,
}

impl GenerationStreamer {
    pub fn new(llm: Arc<dyn LlmProvider>, stream_timeout: Duration) -> Self {
        Self {
            llm,
            stream_timeout,
        }
    }

    /// Start a generation stream for the prompt; returns immediately.
    ///
    /// The driving task owns the terminal-event guarantee: every exit
    /// path sends exactly one `Done` or `Error`, except cancellation by
    /// receiver drop, where nobody is listening anymore.
    pub fn generate(&self, prompt: String) -> TokenStream {
        let (tx, rx) = mpsc::channel(64);
        let llm = Arc::clone(&self.llm);
        let budget = self.stream_timeout;

        tokio::spawn(async move {
            Self::drive(llm, prompt, tx, budget).await;
        });

        TokenStream { rx }
    }

    async fn drive(
        llm: Arc<dyn LlmProvider>,
        prompt: String,
        tx: mpsc::Sender<StreamEvent>,
        budget: Duration,
    ) {
        let deadline = Instant::now() + budget;

        tracing::debug!(model = llm.model(), "generation stream: prompting");
        let mut upstream = match llm.stream_completion(&prompt).await {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!("generation stream errored at prompt: {}", error);
                let _ = tx.send(StreamEvent::Error(error.to_string())).await;
                return;
            }
        };

        tracing::debug!("generation stream: streaming");
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let next = match timeout(remaining, upstream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::warn!("generation stream timed out");
                    let _ = tx.send(StreamEvent::Error("generation timed out".into())).await;
                    return;
                }
            };

            match next {
                Some(Ok(fragment)) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    if tx.send(StreamEvent::Token(fragment)).await.is_err() {
                        // Receiver dropped: cancelled, stop polling upstream
                        tracing::debug!("generation stream: cancelled");
                        return;
                    }
                }
                Some(Err(error)) => {
                    tracing::warn!("generation stream errored: {}", error);
                    let _ = tx.send(StreamEvent::Error(error.to_string())).await;
                    return;
                }
                None => {
                    tracing::debug!("generation stream: completed");
                    let _ = tx.send(StreamEvent::Done).await;
                    return;
                }
            }
        }
    }
}
