//! Operation polling
//!
//! Every mutating Compute call returns an operation that completes
//! asynchronously. [`OperationPoller`] re-fetches its status at a fixed
//! interval until the cloud reports `DONE`.

use crate::compute::{ComputeApi, Operation};
use crate::error::{CloudError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Level at which an operation's status is looked up
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationScope {
    Zone(String),
    Region(String),
    Global,
}

impl fmt::Display for OperationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationScope::Zone(zone) => write!(f, "zone {}", zone),
            OperationScope::Region(region) => write!(f, "region {}", region),
            OperationScope::Global => write!(f, "global"),
        }
    }
}

/// Polling cadence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two status fetches
    pub interval: Duration,

    /// Give up after this long. `None` waits until the operation finishes.
    pub max_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_wait: None,
        }
    }
}

/// Blocks a flow until a cloud operation reaches a terminal state
#[derive(Clone)]
pub struct OperationPoller {
    api: Arc<dyn ComputeApi>,
    config: PollConfig,
    cancel: CancellationToken,
}

impl OperationPoller {
    pub fn new(api: Arc<dyn ComputeApi>, config: PollConfig) -> Self {
        Self {
            api,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort outstanding and future waits when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `name` until it is `DONE`
    ///
    /// A finished operation carrying an `error` payload is turned into
    /// [`CloudError::OperationFailed`] with that payload.
    pub async fn await_operation(&self, scope: &OperationScope, name: &str) -> Result<Operation> {
        let started = Instant::now();

        loop {
            let operation = self.api.get_operation(scope, name).await?;

            if operation.is_done() {
                if let Some(error) = &operation.error {
                    tracing::error!(operation = name, %scope, "Operation finished with error: {}", error);
                    return Err(CloudError::OperationFailed {
                        operation: name.to_string(),
                        error: error.clone(),
                    });
                }
                tracing::debug!(operation = name, %scope, "Operation done");
                return Ok(operation);
            }

            tracing::debug!(
                operation = name,
                %scope,
                status = ?operation.status,
                "Waiting for operation"
            );

            if let Some(max_wait) = self.config.max_wait {
                if started.elapsed() >= max_wait {
                    return Err(CloudError::OperationTimeout {
                        operation: name.to_string(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::warn!(operation = name, "Operation wait cancelled");
                    return Err(CloudError::Cancelled(name.to_string()));
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeCompute};

    fn poller(fake: &Arc<FakeCompute>, config: PollConfig) -> OperationPoller {
        OperationPoller::new(fake.clone(), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_done() {
        let fake = Arc::new(FakeCompute::new("proj1"));
        fake.set_pending_polls(3);
        let op = fake.start_operation(OperationScope::Region("us-west1".into()), None);

        let done = poller(&fake, PollConfig::default())
            .await_operation(&OperationScope::Region("us-west1".into()), &op)
            .await
            .unwrap();

        assert!(done.is_done());
        let polls = fake
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::GetOperation { .. }))
            .count();
        assert_eq!(polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_with_error_raises_payload() {
        let fake = Arc::new(FakeCompute::new("proj1"));
        let payload = serde_json::json!({"errors": [{"code": "RESOURCE_ALREADY_EXISTS"}]});
        let op = fake.start_operation(OperationScope::Global, Some(payload.clone()));

        let err = poller(&fake, PollConfig::default())
            .await_operation(&OperationScope::Global, &op)
            .await
            .unwrap_err();

        match err {
            CloudError::OperationFailed { operation, error } => {
                assert_eq!(operation, op);
                assert_eq!(error, payload);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_times_out() {
        let fake = Arc::new(FakeCompute::new("proj1"));
        fake.set_pending_polls(u32::MAX);
        let scope = OperationScope::Zone("us-west1-b".into());
        let op = fake.start_operation(scope.clone(), None);

        let config = PollConfig {
            interval: Duration::from_secs(1),
            max_wait: Some(Duration::from_secs(5)),
        };
        let err = poller(&fake, config)
            .await_operation(&scope, &op)
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::OperationTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_wait() {
        let fake = Arc::new(FakeCompute::new("proj1"));
        fake.set_pending_polls(u32::MAX);
        let op = fake.start_operation(OperationScope::Global, None);

        let cancel = CancellationToken::new();
        let poller = poller(&fake, PollConfig::default()).with_cancellation(cancel.clone());
        cancel.cancel();

        let err = poller
            .await_operation(&OperationScope::Global, &op)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Cancelled(name) if name == op));
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(OperationScope::Zone("us-west1-b".into()).to_string(), "zone us-west1-b");
        assert_eq!(OperationScope::Global.to_string(), "global");
    }
}
