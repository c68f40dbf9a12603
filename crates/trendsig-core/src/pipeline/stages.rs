//! The bundled analysis stages.
//!
//! Data collection is the only fatal stage; the realtime, ownership, and
//! trend stages catch their own failures and leave their context slot
//! unset so a degraded run still finishes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::analysis::TrendAnalyzer;
use crate::indicators::annotate_moving_averages;
use crate::pipeline::{keys, ContextValue, PipelineStage, StageContext, StageError};
use crate::service::DataService;

fn required_symbol(
    stage: &str,
    context: &StageContext,
) -> Result<crate::Symbol, StageError> {
    context
        .symbol()
        .cloned()
        .ok_or_else(|| StageError::new(stage, "context is missing the symbol"))
}

/// Fetches the daily-bar history and annotates it with moving averages.
///
/// Fatal on failure: nothing downstream can run without bars.
pub struct DataCollectionStage {
    service: Arc<DataService>,
    history_days: usize,
}

impl DataCollectionStage {
    pub const NAME: &'static str = "data_collection";

    pub fn new(service: Arc<DataService>, history_days: usize) -> Self {
        Self {
            service,
            history_days,
        }
    }
}

impl PipelineStage for DataCollectionStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut StageContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move {
            let symbol = required_symbol(Self::NAME, context)?;
            let today = OffsetDateTime::now_utc().date();

            let (mut bars, origin) = self
                .service
                .get_daily_bars(&symbol, self.history_days, today)
                .await
                .map_err(|error| {
                    StageError::with_cause(Self::NAME, format!("no daily bars for {symbol}"), error)
                })?;

            if bars.is_empty() {
                return Err(StageError::new(
                    Self::NAME,
                    format!("empty daily-bar history for {symbol}"),
                ));
            }

            annotate_moving_averages(&mut bars);
            info!(%symbol, bars = bars.len(), ?origin, "daily bars collected");

            context.set(keys::BARS, ContextValue::Bars(bars));
            context.set_metadata(keys::DATA_SOURCE, format!("{origin:?}"));
            context.set_metadata("stage", Self::NAME);
            Ok(())
        })
    }

    fn rollback<'a>(
        &'a self,
        context: &'a StageContext,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            // Bars already persisted stay valid history; only flag the
            // aborted run so today's partial rows can be re-fetched.
            if let Some(symbol) = context.symbol() {
                warn!(%symbol, "discarding today's collected bars after aborted run");
            }
        })
    }
}

/// Attaches the realtime quote and display name; degrades on failure.
pub struct RealtimeQuoteStage {
    service: Arc<DataService>,
}

impl RealtimeQuoteStage {
    pub const NAME: &'static str = "realtime_quote";

    pub fn new(service: Arc<DataService>) -> Self {
        Self { service }
    }
}

impl PipelineStage for RealtimeQuoteStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut StageContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move {
            let symbol = required_symbol(Self::NAME, context)?;

            match self.service.get_quote(&symbol).await {
                Some(quote) => {
                    if let Some(name) = quote.name.clone() {
                        context.set(keys::STOCK_NAME, ContextValue::Text(name));
                    }
                    context.set(keys::QUOTE, ContextValue::Quote(quote));
                }
                None => {
                    warn!(%symbol, "no realtime quote, continuing without");
                }
            }

            if !context.has(keys::STOCK_NAME) {
                if let Some(name) = self.service.get_display_name(&symbol).await {
                    context.set(keys::STOCK_NAME, ContextValue::Text(name));
                }
            }

            context.set_metadata("stage", Self::NAME);
            Ok(())
        })
    }
}

/// Attaches the ownership distribution; degrades on failure.
pub struct OwnershipAnalysisStage {
    service: Arc<DataService>,
}

impl OwnershipAnalysisStage {
    pub const NAME: &'static str = "ownership_analysis";

    pub fn new(service: Arc<DataService>) -> Self {
        Self { service }
    }
}

impl PipelineStage for OwnershipAnalysisStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut StageContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move {
            let symbol = required_symbol(Self::NAME, context)?;

            match self.service.get_ownership(&symbol).await {
                Some(ownership) => {
                    context.set(keys::OWNERSHIP, ContextValue::Ownership(ownership));
                }
                None => {
                    warn!(%symbol, "no ownership distribution, continuing without");
                }
            }

            context.set_metadata("stage", Self::NAME);
            Ok(())
        })
    }
}

/// Runs the signal scorer over the collected bars; degrades when the bars
/// slot is missing.
pub struct TrendAnalysisStage {
    analyzer: TrendAnalyzer,
}

impl TrendAnalysisStage {
    pub const NAME: &'static str = "trend_analysis";

    pub fn new() -> Self {
        Self {
            analyzer: TrendAnalyzer::new(),
        }
    }
}

impl Default for TrendAnalysisStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for TrendAnalysisStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut StageContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move {
            let symbol = required_symbol(Self::NAME, context)?;

            match context.bars() {
                Some(bars) => {
                    let result = self.analyzer.analyze(&symbol, bars);
                    info!(
                        %symbol,
                        score = result.signal_score,
                        signal = %result.buy_signal,
                        "trend analysis finished"
                    );
                    context.set(keys::TREND, ContextValue::Trend(result));
                }
                None => {
                    warn!(%symbol, "no bars in context, skipping trend analysis");
                }
            }

            context.set_metadata("stage", Self::NAME);
            Ok(())
        })
    }
}

/// Wires the standard four-stage analysis pipeline.
pub fn standard_pipeline(service: Arc<DataService>, config: &crate::Config) -> crate::pipeline::Pipeline {
    crate::pipeline::Pipeline::new(vec![
        Arc::new(DataCollectionStage::new(
            Arc::clone(&service),
            config.bar_history_days,
        )),
        Arc::new(RealtimeQuoteStage::new(Arc::clone(&service))),
        Arc::new(OwnershipAnalysisStage::new(Arc::clone(&service))),
        Arc::new(TrendAnalysisStage::new()),
    ])
    .with_stage_delay(config.stage_delay)
}
