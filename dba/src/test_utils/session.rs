use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::dba_error;
use crate::error::{DbaResult, ErrorKind};
use crate::session::{Payload, SessionContext, SessionRunner};

/// A session received by [`RecordingSessionRunner`].
#[derive(Debug, Clone)]
pub struct RecordedSession {
    pub context: SessionContext,
    /// `None` for interactive sessions.
    pub payload: Option<Payload>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: Vec<RecordedSession>,
    fail_with: Option<ErrorKind>,
}

/// [`SessionRunner`] that records sessions instead of spawning clients.
#[derive(Debug, Clone, Default)]
pub struct RecordingSessionRunner {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingSessionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following session fail with `kind` after being recorded.
    pub async fn fail_with(&self, kind: ErrorKind) {
        let mut inner = self.inner.lock().await;
        inner.fail_with = Some(kind);
    }

    pub async fn sessions(&self) -> Vec<RecordedSession> {
        let inner = self.inner.lock().await;
        inner.sessions.clone()
    }

    async fn record(&self, context: &SessionContext, payload: Option<&Payload>) -> DbaResult<()> {
        let mut inner = self.inner.lock().await;
        inner.sessions.push(RecordedSession {
            context: context.clone(),
            payload: payload.cloned(),
        });

        match inner.fail_with {
            Some(kind) => Err(dba_error!(kind, "Recorded session failed")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionRunner for RecordingSessionRunner {
    async fn run_interactive(&self, context: &SessionContext) -> DbaResult<()> {
        self.record(context, None).await
    }

    async fn run_batch(&self, context: &SessionContext, payload: &Payload) -> DbaResult<()> {
        self.record(context, Some(payload)).await
    }
}
