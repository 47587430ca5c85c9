//! Scripted [`CompletionService`] for pipeline tests.
//!
//! Responses are queued per schema name so concurrent callers each get their
//! own answer regardless of scheduling order.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, CompletionService};
use crate::error::ScrapeError;

type Scripted = Result<CompletionResponse, ScrapeError>;

#[derive(Default)]
pub(crate) struct ScriptedCompletion {
    by_schema: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a successful completion for requests using `schema`.
    pub(crate) fn reply(self, schema: &str, text: &str) -> Self {
        self.push(schema, Ok(CompletionResponse::ok(text)))
    }

    pub(crate) fn reply_failed(self, schema: &str, reason: &str) -> Self {
        self.push(schema, Ok(CompletionResponse::failed(reason)))
    }

    pub(crate) fn reply_err(self, schema: &str, err: ScrapeError) -> Self {
        self.push(schema, Err(err))
    }

    fn push(self, schema: &str, response: Scripted) -> Self {
        self.by_schema
            .lock()
            .expect("scripted completion lock")
            .entry(schema.to_owned())
            .or_default()
            .push_back(response);
        self
    }

    /// Every request received so far, in arrival order.
    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .expect("scripted completion lock")
            .clone()
    }

    pub(crate) fn calls_for(&self, schema: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.schema.as_ref().is_some_and(|(name, _)| name == schema))
            .count()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ScrapeError> {
        let key = request
            .schema
            .as_ref()
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        self.requests
            .lock()
            .expect("scripted completion lock")
            .push(request);
        self.by_schema
            .lock()
            .expect("scripted completion lock")
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(ScrapeError::Completion(format!("no scripted reply for {key:?}"))))
    }
}
