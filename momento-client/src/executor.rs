//! The operation pipeline shared by every client call.
//!
//! Each operation runs the same steps: validate the cache name, prepare the
//! wire request, dispatch it under the fixed deadline, and construct the typed
//! result. Failures at any step are translated exactly once. There is no
//! retry.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tonic::{Code, Status};
use tracing::debug;

use crate::convert::{Failure, translate};
use crate::validation::validate_cache_name;
use crate::Result;

/// Runs operations under a fixed per-request deadline.
#[derive(Debug, Clone, Copy)]
pub struct Executor {
    deadline: Duration,
}

impl Executor {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run an operation against a named cache.
    ///
    /// The dispatcher receives the request and the deadline, and must issue
    /// exactly one call.
    pub async fn execute<Req, Resp, T, P, D, Fut, C>(
        &self,
        cache_name: &str,
        operation: &'static str,
        prepare: P,
        dispatch: D,
        construct: C,
    ) -> Result<T>
    where
        Req: Clone,
        P: FnOnce() -> Result<Req>,
        D: FnOnce(Req, Duration) -> Fut,
        Fut: Future<Output = std::result::Result<Resp, Status>>,
        C: FnOnce(Req, Resp) -> Result<T>,
    {
        validate_cache_name(cache_name).map_err(|e| translate(operation, e.into()))?;
        self.execute_unscoped(operation, prepare, dispatch, construct)
            .await
    }

    /// Run an operation that does not target a cache.
    pub async fn execute_unscoped<Req, Resp, T, P, D, Fut, C>(
        &self,
        operation: &'static str,
        prepare: P,
        dispatch: D,
        construct: C,
    ) -> Result<T>
    where
        Req: Clone,
        P: FnOnce() -> Result<Req>,
        D: FnOnce(Req, Duration) -> Fut,
        Fut: Future<Output = std::result::Result<Resp, Status>>,
        C: FnOnce(Req, Resp) -> Result<T>,
    {
        self.attempt(operation, prepare, dispatch, construct)
            .await
            .map_err(|failure| translate(operation, failure))
    }

    /// Run the pipeline without translating the failure.
    ///
    /// Nothing is logged on failure; callers that combine several attempts
    /// translate the combined outcome once.
    pub async fn attempt<Req, Resp, T, P, D, Fut, C>(
        &self,
        operation: &'static str,
        prepare: P,
        dispatch: D,
        construct: C,
    ) -> std::result::Result<T, Failure>
    where
        Req: Clone,
        P: FnOnce() -> Result<Req>,
        D: FnOnce(Req, Duration) -> Fut,
        Fut: Future<Output = std::result::Result<Resp, Status>>,
        C: FnOnce(Req, Resp) -> Result<T>,
    {
        let request = prepare()?;
        debug!(operation, "Dispatching request");
        let response = with_deadline(self.deadline, dispatch(request.clone(), self.deadline)).await?;
        Ok(construct(request, response)?)
    }

    /// Blocking form of [`execute`](Self::execute).
    ///
    /// The dispatcher must give up once the deadline passes, reporting
    /// [`Failure::DeadlineElapsed`].
    pub fn execute_blocking<Req, Resp, T, P, D, C>(
        &self,
        cache_name: &str,
        operation: &'static str,
        prepare: P,
        dispatch: D,
        construct: C,
    ) -> Result<T>
    where
        Req: Clone,
        P: FnOnce() -> Result<Req>,
        D: FnOnce(Req, Duration) -> std::result::Result<Resp, Failure>,
        C: FnOnce(Req, Resp) -> Result<T>,
    {
        validate_cache_name(cache_name).map_err(|e| translate(operation, e.into()))?;
        self.execute_blocking_unscoped(operation, prepare, dispatch, construct)
    }

    /// Blocking form of [`execute_unscoped`](Self::execute_unscoped).
    pub fn execute_blocking_unscoped<Req, Resp, T, P, D, C>(
        &self,
        operation: &'static str,
        prepare: P,
        dispatch: D,
        construct: C,
    ) -> Result<T>
    where
        Req: Clone,
        P: FnOnce() -> Result<Req>,
        D: FnOnce(Req, Duration) -> std::result::Result<Resp, Failure>,
        C: FnOnce(Req, Resp) -> Result<T>,
    {
        self.attempt_blocking(operation, prepare, dispatch, construct)
            .map_err(|failure| translate(operation, failure))
    }

    /// Blocking form of [`attempt`](Self::attempt).
    pub fn attempt_blocking<Req, Resp, T, P, D, C>(
        &self,
        operation: &'static str,
        prepare: P,
        dispatch: D,
        construct: C,
    ) -> std::result::Result<T, Failure>
    where
        Req: Clone,
        P: FnOnce() -> Result<Req>,
        D: FnOnce(Req, Duration) -> std::result::Result<Resp, Failure>,
        C: FnOnce(Req, Resp) -> Result<T>,
    {
        let request = prepare()?;
        debug!(operation, "Dispatching request");
        let response = dispatch(request.clone(), self.deadline)?;
        Ok(construct(request, response)?)
    }
}

/// Await a dispatched call, giving up once the deadline passes.
pub(crate) async fn with_deadline<Resp, F>(
    deadline: Duration,
    call: F,
) -> std::result::Result<Resp, Failure>
where
    F: Future<Output = std::result::Result<Resp, Status>>,
{
    let started = Instant::now();
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(response)) => Ok(response),
        // The channel enforces the same deadline and may give up first.
        Ok(Err(status)) if status.code() == Code::Cancelled && started.elapsed() >= deadline => {
            Err(Failure::DeadlineElapsed(deadline))
        }
        Ok(Err(status)) => Err(Failure::Status(status)),
        Err(_) => Err(Failure::DeadlineElapsed(deadline)),
    }
}
