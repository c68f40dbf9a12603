//! Rollback ordering, batch isolation, and the standard stage wiring.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use trendsig_core::pipeline::stages::standard_pipeline;
use trendsig_core::pipeline::{Pipeline, PipelineStage, StageContext, StageError};
use trendsig_tests::*;

/// Stage that appends its lifecycle events to a shared log.
struct RecordingStage {
    name: &'static str,
    fail_for: Option<Symbol>,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingStage {
    fn passing(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail_for: None,
            log,
        })
    }

    fn failing_for(
        name: &'static str,
        symbol: Symbol,
        log: Arc<Mutex<Vec<String>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail_for: Some(symbol),
            log,
        })
    }
}

impl PipelineStage for RecordingStage {
    fn name(&self) -> &str {
        self.name
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut StageContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), StageError>> + Send + 'a>> {
        Box::pin(async move {
            self.log
                .lock()
                .unwrap()
                .push(format!("execute:{}", self.name));
            match &self.fail_for {
                Some(target) if context.symbol() == Some(target) => {
                    Err(StageError::new(self.name, "scripted failure"))
                }
                _ => Ok(()),
            }
        })
    }

    fn rollback<'a>(
        &'a self,
        _context: &'a StageContext,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.log
                .lock()
                .unwrap()
                .push(format!("rollback:{}", self.name));
        })
    }
}

#[tokio::test]
async fn failure_rolls_back_executed_stages_newest_first() {
    let sym = symbol("600519");
    let log = Arc::new(Mutex::new(Vec::new()));

    let pipeline = Pipeline::new(vec![
        RecordingStage::passing("collect", Arc::clone(&log)),
        RecordingStage::passing("quote", Arc::clone(&log)),
        RecordingStage::failing_for("ownership", sym.clone(), Arc::clone(&log)),
        RecordingStage::passing("trend", Arc::clone(&log)),
    ]);

    let mut context = StageContext::for_symbol(sym);
    let error = pipeline.run(&mut context).await.expect_err("third stage fails");
    assert_eq!(error.stage, "ownership");

    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "execute:collect",
            "execute:quote",
            "execute:ownership",
            "rollback:quote",
            "rollback:collect",
        ]
    );
}

#[tokio::test]
async fn success_runs_every_stage_in_order_without_rollback() {
    let sym = symbol("600519");
    let log = Arc::new(Mutex::new(Vec::new()));

    let pipeline = Pipeline::new(vec![
        RecordingStage::passing("collect", Arc::clone(&log)),
        RecordingStage::passing("quote", Arc::clone(&log)),
        RecordingStage::passing("trend", Arc::clone(&log)),
    ]);

    let mut context = StageContext::for_symbol(sym);
    pipeline.run(&mut context).await.expect("all stages pass");

    let events = log.lock().unwrap().clone();
    assert_eq!(events, vec!["execute:collect", "execute:quote", "execute:trend"]);
}

#[tokio::test]
async fn one_failed_symbol_does_not_sink_the_batch() {
    let poison = symbol("600000");
    let log = Arc::new(Mutex::new(Vec::new()));

    let pipeline = Arc::new(Pipeline::new(vec![
        RecordingStage::passing("collect", Arc::clone(&log)),
        RecordingStage::failing_for("quote", poison.clone(), Arc::clone(&log)),
    ]));

    let symbols = vec![symbol("600519"), poison.clone(), symbol("000001")];
    let results = pipeline.run_batch(symbols, 2).await;

    assert_eq!(results.len(), 3);
    for (sym, outcome) in &results {
        if *sym == poison {
            assert!(outcome.is_err());
        } else {
            assert!(outcome.is_ok(), "{sym} should have passed");
        }
    }
}

#[tokio::test]
async fn standard_pipeline_fills_the_context_end_to_end() {
    let sym = symbol("600519");
    let bars = bars_from_closes(&uptrend_closes(60, 0.003));
    let ownership = OwnershipDistribution::new(0.65, 1500.0, 0.12, 0.08).expect("valid");

    let eastmoney = Arc::new(
        ScriptedSource::new(SourceId::Eastmoney, 1)
            .with_bars(bars)
            .with_quote(quote_for(&sym, 1688.0, SourceId::Eastmoney).with_name("贵州茅台"))
            .with_ownership(ownership),
    );
    let config = Config {
        stage_delay: Duration::ZERO,
        ..Config::default()
    };
    let service = Arc::new(DataService::new(
        manager_with(vec![eastmoney], config.clone()),
        None,
    ));

    let pipeline = Arc::new(standard_pipeline(service, &config));
    let results = pipeline.run_batch(vec![sym.clone()], config.batch_concurrency).await;

    let (_, outcome) = &results[0];
    let context = outcome.as_ref().expect("run succeeds");

    assert_eq!(context.bars().map(<[DailyBar]>::len), Some(60));
    assert_eq!(context.quote().map(|quote| quote.price), Some(1688.0));
    assert!(context.ownership().is_some());

    let trend = context.trend_result().expect("trend produced");
    assert!(trend.trend_state.is_bullish());
    assert!(trend.buy_signal.is_buy());
}

#[tokio::test]
async fn data_collection_failure_is_fatal_for_its_run() {
    let sym = symbol("600519");
    let eastmoney = Arc::new(
        ScriptedSource::new(SourceId::Eastmoney, 1)
            .failing_bars(FetchError::network("unreachable")),
    );
    let config = Config {
        stage_delay: Duration::ZERO,
        ..Config::default()
    };
    let service = Arc::new(DataService::new(
        manager_with(vec![eastmoney], config.clone()),
        None,
    ));

    let pipeline = Arc::new(standard_pipeline(service, &config));
    let results = pipeline.run_batch(vec![sym], config.batch_concurrency).await;

    let (_, outcome) = &results[0];
    let error = outcome.as_ref().expect_err("collection fails");
    assert_eq!(error.stage, "data_collection");
}
