// Attempt executor
//
// Drives one strategy against one target model: N cooperatively
// scheduled workers drain a shared attempt queue, leasing handles from
// the resource pool, classifying each output and optionally refining
// hits. A completion coordinator merges finished workers' results and
// applies the configured completion policy; remaining workers are always
// cancelled and awaited before the run returns, so no lease outlives it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use indicatif::ProgressBar;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use redfuzz_core::{AttemptParams, AttemptResult, FuzzError, Result, ScoreContext, Scorer};

use crate::checkpoint::CheckpointStore;
use crate::classify::classify_output;
use crate::config::{CompletionPolicy, EngineConfig};
use crate::pool::ResourcePool;
use crate::refine::RefinementHandler;
use crate::strategy::{AttackStrategy, AttemptContext};

/// Results of one strategy/target run
#[derive(Debug)]
pub struct RunSummary {
    /// Strategy mode that produced the results
    pub mode: String,
    /// Qualified key of the attacked model
    pub target_key: String,
    /// Completed results, previously checkpointed ones included
    pub entries: Vec<AttemptResult>,
    /// Attempts skipped because a prior run already covered them
    pub skipped: usize,
}

/// Executes the attempts of one strategy against one target model.
pub struct AttemptExecutor {
    strategy: Arc<dyn AttackStrategy>,
    scorers: Vec<Arc<dyn Scorer>>,
    pool: Arc<ResourcePool>,
    target_key: String,
    execution_id: String,
    config: EngineConfig,
}

impl AttemptExecutor {
    pub fn new(
        strategy: Arc<dyn AttackStrategy>,
        scorers: Vec<Arc<dyn Scorer>>,
        pool: Arc<ResourcePool>,
        target_key: impl Into<String>,
        execution_id: impl Into<String>,
        config: EngineConfig,
    ) -> Self {
        Self {
            strategy,
            scorers,
            pool,
            target_key: target_key.into(),
            execution_id: execution_id.into(),
            config,
        }
    }

    /// Run the strategy over `inputs` until the completion policy fires.
    #[instrument(
        skip(self, inputs),
        fields(
            execution_id = %self.execution_id,
            mode = %self.strategy.mode(),
            target = %self.target_key,
        )
    )]
    pub async fn run(&self, inputs: &[String]) -> Result<RunSummary> {
        // Fail fast on keys nobody registered; waiting on them would
        // deadlock silently.
        if !self.pool.contains(&self.target_key) {
            return Err(FuzzError::ResourceNotFound(self.target_key.clone()));
        }
        let judge_key = self
            .config
            .judge_key
            .clone()
            .unwrap_or_else(|| self.target_key.clone());
        if !self.pool.contains(&judge_key) {
            return Err(FuzzError::ResourceNotFound(judge_key));
        }

        let mut attempts = self.strategy.generate_attempts(inputs);
        let generated = attempts.len();
        info!(
            attempts = generated,
            inputs = inputs.len(),
            "generated attempt params"
        );

        let mut checkpoint =
            CheckpointStore::open(&self.config.checkpoint_dir, &self.execution_id).await?;
        let prior = checkpoint.take_prior();
        attempts = self.strategy.reduce_attempts(&prior, attempts);
        // A custom reduce_attempts may expand the list rather than filter it
        let skipped = generated.saturating_sub(attempts.len());
        if skipped > 0 {
            info!(skipped, "skipping attempts covered by a previous execution");
        }

        let progress = if self.config.progress {
            ProgressBar::new(generated as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.inc(skipped as u64);

        let state = Arc::new(RunState {
            strategy: Arc::clone(&self.strategy),
            scorers: self.scorers.clone(),
            pool: Arc::clone(&self.pool),
            target_key: self.target_key.clone(),
            judge_key,
            max_retries: self.config.max_retries,
            refinement: (self.config.refine_attempts > 0)
                .then(|| RefinementHandler::new(self.config.refine_attempts)),
            queue: Mutex::new(attempts.into()),
            completed: Mutex::new(prior.iter().map(|e| e.dedup_key().to_string()).collect()),
            retries: Mutex::new(HashMap::new()),
            checkpoint,
            progress,
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut workers: JoinSet<Result<Vec<AttemptResult>>> = JoinSet::new();
        for id in 0..self.config.max_workers {
            let state = Arc::clone(&state);
            let shutdown_rx = shutdown_rx.clone();
            workers.spawn(worker_loop(id, state, shutdown_rx));
        }

        // Completion coordinator: the accumulator starts from the prior
        // results so a resumed run can satisfy FIRST_COMPLETED at once.
        let mut entries = prior;
        let mut fatal: Option<FuzzError> = None;
        let mut worker_returned_empty = false;

        while !workers.is_empty() {
            // Evaluated before every wait, so prior results fire the
            // policy without a single worker having to join first.
            let stop = match self.config.completion {
                CompletionPolicy::AllCompleted => false,
                CompletionPolicy::FirstCompleted => !entries.is_empty(),
                CompletionPolicy::FirstResult => {
                    !entries.is_empty() || worker_returned_empty
                }
            };
            if stop {
                debug!(policy = ?self.config.completion, "completion policy fired");
                break;
            }

            let joined = match timeout(self.config.poll_interval, workers.join_next()).await {
                // Liveness aid only; correctness does not depend on it.
                Err(_) => {
                    debug!(pending = workers.len(), "attack in progress");
                    continue;
                }
                Ok(None) => break,
                Ok(Some(joined)) => joined,
            };

            match joined {
                Ok(Ok(results)) => {
                    worker_returned_empty = worker_returned_empty || results.is_empty();
                    entries.extend(results);
                }
                Ok(Err(err)) => {
                    // Only checkpoint I/O surfaces here; it compromises
                    // durability, so the run stops.
                    error!(%err, "worker failed fatally");
                    fatal = Some(err);
                    break;
                }
                Err(join_err) => {
                    error!(%join_err, "worker panicked");
                }
            }
        }

        // Cancel and await every remaining worker regardless of which
        // policy triggered the stop, so all leases are back in the pool.
        let _ = shutdown_tx.send(true);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(results)) => entries.extend(results),
                Ok(Err(err)) => {
                    error!(%err, "worker failed fatally");
                    fatal.get_or_insert(err);
                }
                Err(join_err) => error!(%join_err, "worker panicked"),
            }
        }
        state.progress.finish_and_clear();

        if let Some(err) = fatal {
            return Err(err);
        }

        info!(entries = entries.len(), skipped, "attack run finished");
        Ok(RunSummary {
            mode: self.strategy.mode().to_string(),
            target_key: self.target_key.clone(),
            entries,
            skipped,
        })
    }
}

/// State shared by the workers of one run
struct RunState {
    strategy: Arc<dyn AttackStrategy>,
    scorers: Vec<Arc<dyn Scorer>>,
    pool: Arc<ResourcePool>,
    target_key: String,
    judge_key: String,
    max_retries: Option<u32>,
    refinement: Option<RefinementHandler>,
    queue: Mutex<VecDeque<AttemptParams>>,
    completed: Mutex<HashSet<String>>,
    retries: Mutex<HashMap<String, u32>>,
    checkpoint: CheckpointStore,
    progress: ProgressBar,
}

impl RunState {
    fn pop(&self) -> Option<AttemptParams> {
        self.queue.lock().pop_front()
    }

    fn is_completed(&self, dedup_key: &str) -> bool {
        self.completed.lock().contains(dedup_key)
    }

    /// Requeue a failed attempt at the tail, unless its retry cap is
    /// exhausted, in which case it is dropped.
    fn handle_failure(&self, params: AttemptParams) {
        let attempts = {
            let mut retries = self.retries.lock();
            let count = retries.entry(params.dedup_key().to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if let Some(cap) = self.max_retries {
            if attempts > cap {
                error!(
                    dedup_key = %params.dedup_key(),
                    retries = attempts - 1,
                    "retry cap exhausted, dropping attempt"
                );
                self.progress.inc(1);
                return;
            }
        }
        self.queue.lock().push_back(params);
    }

    /// Perform one attempt end to end: strategy call, classification
    /// fan-out, optional refinement, checkpoint append. The result is
    /// recorded durably before this returns it.
    async fn process(&self, params: AttemptParams) -> Result<Option<AttemptResult>> {
        let ctx = AttemptContext::new(&self.pool, &self.target_key);
        let Some(mut entry) = self.strategy.perform_attempt(&params, &ctx).await? else {
            return Ok(None);
        };

        // Another worker may have recorded this key between our queue
        // pop and now (resume race).
        if self.is_completed(entry.dedup_key()) {
            debug!(dedup_key = %entry.dedup_key(), "skipping already completed attempt");
            return Ok(None);
        }

        let context = ScoreContext {
            original_input: entry.original_input.clone(),
            transformed_input: entry.transformed_input.clone(),
        };
        let outcome = classify_output(
            &self.pool,
            &self.judge_key,
            &self.scorers,
            Some(&entry.output),
            &context,
        )
        .await?;
        entry.verdicts = outcome.verdicts;

        if outcome.hit {
            debug!(dedup_key = %entry.dedup_key(), "positive verdict");
            if let Some(refiner) = &self.refinement {
                // Refinement failure never requeues the attempt; the
                // entry is just recorded without refinement metadata.
                let lease = self.pool.lease(&self.target_key).await?;
                match refiner
                    .refine(lease.provider(), &entry.transformed_input, &entry.output)
                    .await
                {
                    Ok(refined) => {
                        entry.extra.insert("refined_responses".into(), json!(refined));
                    }
                    Err(err) => {
                        warn!(%err, "refinement failed, recording attempt without it");
                    }
                }
            }
        }

        if !self.completed.lock().insert(entry.dedup_key().to_string()) {
            return Ok(None);
        }
        self.checkpoint.append(&entry).await?;
        Ok(Some(entry))
    }
}

/// Worker loop: pop attempts non-blocking until the queue is empty or
/// shutdown is signalled, returning whatever results were collected.
async fn worker_loop(
    id: usize,
    state: Arc<RunState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<Vec<AttemptResult>> {
    let mut results = Vec::new();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let Some(params) = state.pop() else {
            break;
        };

        if state.is_completed(params.dedup_key()) {
            debug!(worker = id, dedup_key = %params.dedup_key(), "skipping completed attempt");
            state.progress.inc(1);
            continue;
        }

        let in_flight = params.clone();
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                // The in-flight attempt unwinds here; its lease guard has
                // already released on drop. Return it to the queue.
                debug!(worker = id, "cancelled, requeueing in-flight attempt");
                state.queue.lock().push_front(in_flight);
                break;
            }
            outcome = state.process(params) => match outcome {
                Ok(Some(entry)) => {
                    results.push(entry);
                    state.progress.inc(1);
                }
                Ok(None) => {
                    state.progress.inc(1);
                }
                Err(err @ FuzzError::CheckpointIo(_)) => {
                    error!(worker = id, %err, "checkpoint write failed");
                    return Err(err);
                }
                Err(err) => {
                    warn!(worker = id, %err, "attempt failed, requeueing");
                    state.handle_failure(in_flight);
                }
            },
        }
    }

    debug!(worker = id, results = results.len(), "worker finished");
    Ok(results)
}
