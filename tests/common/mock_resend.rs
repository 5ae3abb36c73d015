//! Mock resenders for testing.
//!
//! Record every resend request. Succeed unless told to fail.

use history_replication::resend::{
    HistoryRereplicator, HistoryResendRequest, NdcHistoryResender, NdcResendRequest, ResendError,
    ResendFuture,
};
use tokio::sync::Mutex;

/// Records legacy resend requests.
#[derive(Default)]
pub struct MockRereplicator {
    requests: Mutex<Vec<HistoryResendRequest>>,
    failure: Option<ResendError>,
}

impl MockRereplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(err: ResendError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    pub async fn requests(&self) -> Vec<HistoryResendRequest> {
        self.requests.lock().await.clone()
    }
}

impl HistoryRereplicator for MockRereplicator {
    fn send_multi_workflow_history(&self, request: HistoryResendRequest) -> ResendFuture<'_> {
        Box::pin(async move {
            self.requests.lock().await.push(request);
            match &self.failure {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        })
    }
}

/// Records versioned resend requests.
#[derive(Default)]
pub struct MockNdcResender {
    requests: Mutex<Vec<NdcResendRequest>>,
    failure: Option<ResendError>,
}

impl MockNdcResender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(err: ResendError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    pub async fn requests(&self) -> Vec<NdcResendRequest> {
        self.requests.lock().await.clone()
    }
}

impl NdcHistoryResender for MockNdcResender {
    fn send_single_workflow_history(&self, request: NdcResendRequest) -> ResendFuture<'_> {
        Box::pin(async move {
            self.requests.lock().await.push(request);
            match &self.failure {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        })
    }
}
