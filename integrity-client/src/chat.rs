//! AI assistant conversation with client-held history

use integrity_common::models::{ChatReply, ChatTurn};
use integrity_common::{Error, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::ChatApi;

pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    history: VecDeque<ChatTurn>,
    history_limit: usize,
}

impl ChatSession {
    /// `history_limit` is the number of turns kept (user and assistant
    /// messages count separately), rounded down to whole exchanges
    pub fn new(api: Arc<dyn ChatApi>, history_limit: usize) -> Self {
        Self {
            api,
            history: VecDeque::new(),
            history_limit,
        }
    }

    pub fn history(&self) -> Vec<ChatTurn> {
        self.history.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Send a message with the current history
    ///
    /// On success both turns are appended; on any failure the history is
    /// left exactly as it was.
    pub async fn send(&mut self, message: &str) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::Validation("Message is empty".to_string()));
        }

        let history: Vec<ChatTurn> = self.history.iter().cloned().collect();
        debug!(turns = history.len(), "Sending chat message");
        let reply = self.api.chat(message, &history).await?;

        if let Some(err) = &reply.error {
            warn!(error = %err, "Assistant reported an error");
            return Err(Error::Api {
                status: 200,
                message: err.clone(),
            });
        }

        self.history.push_back(ChatTurn::user(message));
        self.history.push_back(ChatTurn::assistant(reply.message.clone()));
        // Whole exchanges only, so the history never opens with a reply
        let cap = self.history_limit - self.history_limit % 2;
        while self.history.len() > cap {
            self.history.pop_front();
            self.history.pop_front();
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes the message and records the history length it was sent with
    struct EchoApi {
        seen: Mutex<Vec<usize>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatApi for EchoApi {
        async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<ChatReply> {
            self.seen.lock().unwrap().push(history.len());
            if self.fail {
                return Err(Error::Network("connection refused".to_string()));
            }
            Ok(ChatReply {
                message: format!("echo: {}", message),
                context_used: true,
                error: None,
            })
        }
    }

    fn echo(fail: bool) -> Arc<EchoApi> {
        Arc::new(EchoApi {
            seen: Mutex::new(Vec::new()),
            fail,
        })
    }

    #[tokio::test]
    async fn test_history_grows_and_is_sent() {
        let api = echo(false);
        let mut session = ChatSession::new(api.clone(), 10);

        session.send("first").await.unwrap();
        session.send("second").await.unwrap();

        assert_eq!(*api.seen.lock().unwrap(), vec![0, 2]);
        let history = session.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[3], ChatTurn::assistant("echo: second"));
    }

    #[tokio::test]
    async fn test_history_cap_drops_oldest() {
        let mut session = ChatSession::new(echo(false), 4);
        for msg in ["a", "b", "c"] {
            session.send(msg).await.unwrap();
        }
        let history = session.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], ChatTurn::user("b"));
        assert_eq!(history[3], ChatTurn::assistant("echo: c"));
    }

    #[tokio::test]
    async fn test_odd_cap_keeps_whole_exchanges() {
        let mut session = ChatSession::new(echo(false), 3);
        for msg in ["a", "b", "c"] {
            session.send(msg).await.unwrap();
        }
        let history = session.history();
        assert_eq!(history, vec![ChatTurn::user("c"), ChatTurn::assistant("echo: c")]);
    }

    #[tokio::test]
    async fn test_failure_keeps_history() {
        let mut session = ChatSession::new(echo(true), 10);
        assert!(session.send("hello").await.is_err());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_empty_message_rejected_without_request() {
        let api = echo(false);
        let mut session = ChatSession::new(api.clone(), 10);
        assert!(matches!(session.send("   ").await, Err(Error::Validation(_))));
        assert!(api.seen.lock().unwrap().is_empty());
    }
}
