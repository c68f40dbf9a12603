//! Staged execution framework.
//!
//! A [`Pipeline`] runs its stages in order against one shared
//! [`StageContext`]. When a stage fails, every stage that already ran gets
//! its best-effort `rollback` in reverse order, then the error propagates.
//! Batch runs fan independent symbols out under a semaphore; each run owns
//! its own context, so one symbol's failure never touches another's.

pub mod stages;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::analysis::TrendResult;
use crate::{DailyBar, OwnershipDistribution, Quote, Symbol};

/// Well-known context keys shared by the bundled stages.
pub mod keys {
    pub const SYMBOL: &str = "symbol";
    pub const BARS: &str = "bars";
    pub const QUOTE: &str = "quote";
    pub const STOCK_NAME: &str = "stock_name";
    pub const OWNERSHIP: &str = "ownership";
    pub const TREND: &str = "trend_result";
    pub const DATA_SOURCE: &str = "data_source";
}

/// Typed value slot in a [`StageContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Symbol(Symbol),
    Bars(Vec<DailyBar>),
    Quote(Quote),
    Ownership(OwnershipDistribution),
    Trend(TrendResult),
    Text(String),
    Number(f64),
    Flag(bool),
}

/// Open key/value bag passed through the stages of one run.
///
/// Data slots carry typed intermediate results; the metadata bag carries
/// plain strings (current stage, data origin, timings).
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    data: HashMap<String, ContextValue>,
    metadata: HashMap<String, String>,
}

impl StageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_symbol(symbol: Symbol) -> Self {
        let mut context = Self::new();
        context.set(keys::SYMBOL, ContextValue::Symbol(symbol));
        context
    }

    pub fn set(&mut self, key: impl Into<String>, value: ContextValue) {
        self.data.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.data.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.metadata.clear();
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        match self.get(keys::SYMBOL) {
            Some(ContextValue::Symbol(symbol)) => Some(symbol),
            _ => None,
        }
    }

    pub fn bars(&self) -> Option<&[DailyBar]> {
        match self.get(keys::BARS) {
            Some(ContextValue::Bars(bars)) => Some(bars),
            _ => None,
        }
    }

    pub fn quote(&self) -> Option<&Quote> {
        match self.get(keys::QUOTE) {
            Some(ContextValue::Quote(quote)) => Some(quote),
            _ => None,
        }
    }

    pub fn ownership(&self) -> Option<&OwnershipDistribution> {
        match self.get(keys::OWNERSHIP) {
            Some(ContextValue::Ownership(ownership)) => Some(ownership),
            _ => None,
        }
    }

    pub fn trend_result(&self) -> Option<&TrendResult> {
        match self.get(keys::TREND) {
            Some(ContextValue::Trend(result)) => Some(result),
            _ => None,
        }
    }
}

/// Raised when a stage fails; carries the failing stage's name.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {message}")]
pub struct StageError {
    pub stage: String,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StageError {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        stage: impl Into<String>,
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// One step of a pipeline run.
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &str;

    /// Runs the stage against the shared context.
    fn execute<'a>(
        &'a self,
        context: &'a mut StageContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>>;

    /// Best-effort compensation, invoked in reverse order when a later
    /// stage fails. Must not itself fail the run.
    fn rollback<'a>(
        &'a self,
        context: &'a StageContext,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        let _ = context;
        Box::pin(async {})
    }
}

/// Ordered stage runner with reverse-order rollback.
pub struct Pipeline {
    stages: Vec<Arc<dyn PipelineStage>>,
    stage_delay: Duration,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn PipelineStage>>) -> Self {
        Self {
            stages,
            stage_delay: Duration::ZERO,
        }
    }

    /// Pause inserted between stages; throttles upstream request bursts.
    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.stage_delay = delay;
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs all stages in order. On failure, already-executed stages are
    /// rolled back newest-first and the stage error is returned.
    pub async fn run(&self, context: &mut StageContext) -> Result<(), StageError> {
        let mut executed: Vec<&Arc<dyn PipelineStage>> = Vec::with_capacity(self.stages.len());

        for (index, stage) in self.stages.iter().enumerate() {
            if index > 0 && !self.stage_delay.is_zero() {
                tokio::time::sleep(self.stage_delay).await;
            }

            debug!(stage = stage.name(), "executing stage");
            if let Err(stage_error) = stage.execute(context).await {
                error!(
                    stage = stage.name(),
                    error = %stage_error,
                    "stage failed, rolling back {} executed stages",
                    executed.len()
                );
                for done in executed.into_iter().rev() {
                    warn!(stage = done.name(), "rolling back");
                    done.rollback(context).await;
                }
                return Err(stage_error);
            }
            executed.push(stage);
        }

        Ok(())
    }

    /// Runs one context per symbol, at most `concurrency` in flight.
    ///
    /// Results come back in input order. A failed run carries its stage
    /// error; the other symbols are unaffected.
    pub async fn run_batch(
        self: &Arc<Self>,
        symbols: Vec<Symbol>,
        concurrency: usize,
    ) -> Vec<(Symbol, Result<StageContext, StageError>)> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            let pipeline = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore is never closed");
                let mut context = StageContext::for_symbol(symbol.clone());
                let outcome = pipeline.run(&mut context).await.map(|()| context);
                (symbol, outcome)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(entry) => results.push(entry),
                Err(join_error) => {
                    error!(%join_error, "batch task panicked");
                }
            }
        }
        info!(
            total = results.len(),
            failed = results.iter().filter(|(_, r)| r.is_err()).count(),
            "batch run finished"
        );
        results
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("stage_delay", &self.stage_delay)
            .finish()
    }
}
