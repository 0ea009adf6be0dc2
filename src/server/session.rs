//! Per-browser chat history kept in server memory.

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "rag_session";

/// Entries kept per session; older ones are dropped first.
pub const MAX_HISTORY: usize = 20;
/// Sessions kept in memory; the least recently active one is evicted.
pub const MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Answer { answer: String, sources: Vec<String> },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub question: String,
    pub outcome: ChatOutcome,
    pub asked_at: DateTime<Utc>,
}

/// Ordered question/answer history of one session.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
}

impl ChatLog {
    pub fn push(&mut self, question: String, outcome: ChatOutcome) {
        self.entries.push(ChatEntry {
            question,
            outcome,
            asked_at: Utc::now(),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop the oldest entries beyond `max`.
    pub fn keep_last(&mut self, max: usize) {
        if self.entries.len() > max {
            let excess = self.entries.len() - max;
            self.entries.drain(..excess);
        }
    }

    /// Time of the latest question, `None` for an empty log.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.entries.last().map(|entry| entry.asked_at)
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub struct SessionStore {
    logs: RwLock<HashMap<Uuid, ChatLog>>,
    max_sessions: usize,
    max_history: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(MAX_SESSIONS, MAX_HISTORY)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_sessions: usize, max_history: usize) -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            max_history: max_history.max(1),
        }
    }

    /// Snapshot of a session's log; unknown sessions read as empty.
    pub async fn log(&self, id: Uuid) -> ChatLog {
        self.logs.read().await.get(&id).cloned().unwrap_or_default()
    }

    pub async fn append(&self, id: Uuid, question: String, outcome: ChatOutcome) {
        let mut logs = self.logs.write().await;

        if !logs.contains_key(&id) && logs.len() >= self.max_sessions {
            // Empty logs sort first, so cleared sessions go before active ones
            let stale = logs
                .iter()
                .min_by_key(|(_, log)| log.last_activity())
                .map(|(stale, _)| *stale);
            if let Some(stale) = stale {
                logs.remove(&stale);
                tracing::debug!("Evicted chat session {}", stale);
            }
        }

        let log = logs.entry(id).or_default();
        log.push(question, outcome);
        log.keep_last(self.max_history);
    }

    pub async fn session_count(&self) -> usize {
        self.logs.read().await.len()
    }

    pub async fn clear(&self, id: Uuid) {
        if let Some(log) = self.logs.write().await.get_mut(&id) {
            log.clear();
        }
    }
}

/// Session id from the request cookies, if present and well-formed.
pub fn session_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(id: Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_session_from_headers() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}")).unwrap(),
        );
        assert_eq!(session_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_invalid_session_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("rag_session=not-a-uuid"));
        assert_eq!(session_from_headers(&headers), None);
        assert_eq!(session_from_headers(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_store_append_and_clear() {
        let store = SessionStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store
            .append(
                a,
                "q1".into(),
                ChatOutcome::Answer {
                    answer: "a1".into(),
                    sources: vec!["doc.txt".into()],
                },
            )
            .await;
        store
            .append(
                b,
                "q2".into(),
                ChatOutcome::Error {
                    message: "boom".into(),
                },
            )
            .await;

        assert_eq!(store.log(a).await.len(), 1);
        assert_eq!(store.log(b).await.entries()[0].question, "q2");

        store.clear(a).await;
        assert!(store.log(a).await.is_empty());
        assert_eq!(store.log(b).await.len(), 1);
    }

    fn answer(text: &str) -> ChatOutcome {
        ChatOutcome::Answer {
            answer: text.into(),
            sources: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_history_is_capped_per_session() {
        let store = SessionStore::with_limits(8, 3);
        let id = Uuid::new_v4();
        for i in 0..5 {
            store.append(id, format!("q{i}"), answer("a")).await;
        }

        let log = store.log(id).await;
        let questions: Vec<_> = log.entries().iter().map(|e| e.question.as_str()).collect();
        assert_eq!(questions, vec!["q2", "q3", "q4"]);
    }

    #[tokio::test]
    async fn test_least_recent_session_is_evicted() {
        let store = SessionStore::with_limits(2, 10);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.append(a, "first".into(), answer("1")).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.append(b, "second".into(), answer("2")).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.append(a, "third".into(), answer("3")).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.append(c, "fourth".into(), answer("4")).await;

        assert_eq!(store.session_count().await, 2);
        assert_eq!(store.log(a).await.len(), 2);
        assert!(store.log(b).await.is_empty());
        assert_eq!(store.log(c).await.len(), 1);
    }
}
