//! Compensating actions for multi-resource writes.
//!
//! Each step that succeeds registers how to undo itself. On a later failure
//! the undo list runs newest-first; on success it is discarded.

use futures::future::BoxFuture;
use std::future::Future;
use tracing::{debug, warn};

use crate::errors::{GatewayError, GatewayResult};

#[derive(Default)]
pub struct Compensations {
    steps: Vec<(&'static str, BoxFuture<'static, GatewayResult<()>>)>,
}

impl Compensations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `undo`. It is not polled unless the saga unwinds.
    pub fn push<F>(&mut self, label: &'static str, undo: F)
    where
        F: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        self.steps.push((label, Box::pin(undo)));
    }

    /// Run every registered undo in reverse order. Failures are logged and skipped.
    pub async fn unwind(self) {
        for (label, undo) in self.steps.into_iter().rev() {
            match undo.await {
                Ok(()) => debug!(step = label, "compensated"),
                Err(err) => warn!(step = label, "compensation failed: {}", err),
            }
        }
    }

    /// Unwind, then hand back the error that caused it.
    pub async fn abort<T>(self, cause: GatewayError) -> GatewayResult<T> {
        self.unwind().await;
        Err(cause)
    }

    /// The operation succeeded; drop the undo list without running it.
    pub fn commit(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn unwinds_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Compensations::new();
        for label in ["first", "second", "third"] {
            let log = log.clone();
            saga.push(label, async move {
                log.lock().unwrap().push(label);
                Ok::<_, GatewayError>(())
            });
        }
        saga.unwind().await;
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn failed_undo_does_not_stop_the_rest_or_change_the_cause() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Compensations::new();
        {
            let ran = ran.clone();
            saga.push("outer", async move {
                ran.lock().unwrap().push("outer");
                Ok::<_, GatewayError>(())
            });
        }
        saga.push("broken", async {
            Err::<(), _>(GatewayError::invalid_input("undo exploded"))
        });

        let result: GatewayResult<()> = saga.abort(GatewayError::conflict("original")).await;
        assert!(matches!(result, Err(GatewayError::Conflict(msg)) if msg == "original"));
        assert_eq!(*ran.lock().unwrap(), vec!["outer"]);
    }

    #[tokio::test]
    async fn commit_runs_nothing() {
        let ran = Arc::new(Mutex::new(false));
        let mut saga = Compensations::new();
        let flag = ran.clone();
        saga.push("undo", async move {
            *flag.lock().unwrap() = true;
            Ok::<_, GatewayError>(())
        });
        saga.commit();
        assert!(!*ran.lock().unwrap());
    }
}
