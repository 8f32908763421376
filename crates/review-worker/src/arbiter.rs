//! Engine arbiter: a single-consumer actor that owns the one engine process.
//!
//! Callers submit whole batches of positions through a cloneable
//! [`ArbiterHandle`]. Batches are served strictly FIFO, one at a time, so the
//! engine never sees positions from two batches interleaved.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{Engine, EngineFactory, EvalResult, SearchBudget};
use crate::error::ReviewError;

/// How long a timed-out engine gets to acknowledge `stop`
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Outcome for one submitted position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionOutcome {
    Evaluated(EvalResult),
    /// Skipped by cancellation or over budget
    Unavailable,
}

impl PositionOutcome {
    pub fn evaluation(&self) -> Option<&EvalResult> {
        match self {
            PositionOutcome::Evaluated(eval) => Some(eval),
            PositionOutcome::Unavailable => None,
        }
    }
}

/// Everything a batch produced, including results computed before the engine
/// was lost for good
#[derive(Debug)]
pub struct BatchOutcome {
    pub outcomes: Vec<PositionOutcome>,
    /// `EngineUnavailable` when the engine failed again after its restart.
    /// Positions after the failure are `Unavailable`.
    pub failure: Option<ReviewError>,
}

impl BatchOutcome {
    pub fn evaluated(&self) -> usize {
        self.outcomes.iter().filter(|o| o.evaluation().is_some()).count()
    }
}

struct Job {
    positions: Vec<String>,
    budget: SearchBudget,
    cancel: CancellationToken,
    reply: oneshot::Sender<BatchOutcome>,
}

enum Command {
    Evaluate(Job),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable submission side of the arbiter
#[derive(Clone)]
pub struct ArbiterHandle {
    tx: mpsc::Sender<Command>,
}

impl ArbiterHandle {
    /// Evaluate `positions` (FENs) in order. Results match input order.
    ///
    /// Cancelling `cancel`, or dropping the returned future, marks every
    /// position that has not started yet as [`PositionOutcome::Unavailable`].
    /// Fails with `EngineUnavailable` if the engine dies twice in the batch.
    pub async fn submit(
        &self,
        positions: Vec<String>,
        budget: SearchBudget,
        cancel: &CancellationToken,
    ) -> Result<Vec<PositionOutcome>, ReviewError> {
        let batch = self.submit_partial(positions, budget, cancel).await?;
        match batch.failure {
            Some(e) => Err(e),
            None => Ok(batch.outcomes),
        }
    }

    /// Like [`submit`](Self::submit), but an engine lost mid-batch still
    /// returns the positions evaluated before it, with the failure attached.
    /// Errors only when the arbiter itself is gone.
    pub async fn submit_partial(
        &self,
        positions: Vec<String>,
        budget: SearchBudget,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, ReviewError> {
        if positions.is_empty() {
            return Ok(BatchOutcome {
                outcomes: Vec::new(),
                failure: None,
            });
        }
        let token = cancel.child_token();
        let _guard = token.clone().drop_guard();

        let (reply, rx) = oneshot::channel();
        let job = Job {
            positions,
            budget,
            cancel: token,
            reply,
        };
        self.tx
            .send(Command::Evaluate(job))
            .await
            .map_err(|_| ReviewError::EngineUnavailable("arbiter has shut down".into()))?;
        rx.await
            .map_err(|_| ReviewError::EngineUnavailable("arbiter dropped the request".into()))
    }
}

/// Owner of the arbiter task
pub struct EngineArbiter {
    handle: ArbiterHandle,
    task: JoinHandle<()>,
}

impl EngineArbiter {
    pub fn spawn<F: EngineFactory>(factory: F, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let worker = Worker {
            factory,
            engine: None,
        };
        let task = tokio::spawn(worker.run(rx));
        Self {
            handle: ArbiterHandle { tx },
            task,
        }
    }

    pub fn handle(&self) -> ArbiterHandle {
        self.handle.clone()
    }

    /// Finish queued batches, then quit the engine.
    pub async fn shutdown(self) {
        let (ack, done) = oneshot::channel();
        if self.handle.tx.send(Command::Shutdown(ack)).await.is_ok() {
            let _ = done.await;
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Arbiter task ended abnormally");
        }
    }
}

struct Worker<F: EngineFactory> {
    factory: F,
    engine: Option<F::Engine>,
}

impl<F: EngineFactory> Worker<F> {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Evaluate(job) => {
                    let batch = self.serve(&job.positions, &job.budget, &job.cancel).await;
                    if job.reply.send(batch).is_err() {
                        debug!("Caller went away before its batch finished");
                    }
                }
                Command::Shutdown(ack) => {
                    self.quit_engine().await;
                    let _ = ack.send(());
                    return;
                }
            }
        }
        self.quit_engine().await;
    }

    async fn serve(
        &mut self,
        positions: &[String],
        budget: &SearchBudget,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let mut outcomes = Vec::with_capacity(positions.len());
        let mut restarted = false;
        let mut failure = None;

        while outcomes.len() < positions.len() {
            if cancel.is_cancelled() {
                debug!(done = outcomes.len(), total = positions.len(), "Batch cancelled");
                break;
            }
            let fen = &positions[outcomes.len()];

            let mut engine = match self.engine.take() {
                Some(engine) => engine,
                None => match self.factory.spawn().await {
                    Ok(engine) => engine,
                    Err(e) => match Self::record_failure(&mut restarted, e) {
                        Ok(()) => continue,
                        Err(fatal) => {
                            failure = Some(fatal);
                            break;
                        }
                    },
                },
            };

            match timeout(budget.timeout, engine.evaluate(fen, budget)).await {
                Ok(Ok(eval)) => {
                    outcomes.push(PositionOutcome::Evaluated(eval));
                    self.engine = Some(engine);
                }
                Ok(Err(e)) => {
                    // Dropping the engine kills the process
                    drop(engine);
                    if let Err(fatal) = Self::record_failure(&mut restarted, e) {
                        failure = Some(fatal);
                        break;
                    }
                }
                Err(_) => {
                    warn!(fen = %fen, timeout_ms = budget.timeout.as_millis() as u64, "Position over budget");
                    outcomes.push(PositionOutcome::Unavailable);
                    match timeout(STOP_GRACE, engine.stop()).await {
                        Ok(Ok(())) => self.engine = Some(engine),
                        _ => warn!("Engine ignored stop, replacing it"),
                    }
                }
            }
        }

        outcomes.resize(positions.len(), PositionOutcome::Unavailable);
        BatchOutcome { outcomes, failure }
    }

    /// One restart per batch; the next failure is final.
    fn record_failure(restarted: &mut bool, error: ReviewError) -> Result<(), ReviewError> {
        if *restarted {
            warn!(error = %error, "Engine failed again after restart");
            return Err(ReviewError::EngineUnavailable(error.to_string()));
        }
        info!(error = %error, "Engine failed, restarting and retrying the remainder");
        *restarted = true;
        Ok(())
    }

    async fn quit_engine(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.quit().await;
        }
    }
}
