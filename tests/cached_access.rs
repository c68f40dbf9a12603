//! Cache and store tiers of the data service.

use std::time::Duration;

use time::Date;
use trendsig_core::BarStore;
use trendsig_tests::*;

fn service_over(
    adapters: Vec<Arc<ScriptedSource>>,
    store: Option<Arc<MemoryBarStore>>,
    config: Config,
) -> DataService {
    let store = store.map(|s| s as Arc<dyn BarStore>);
    DataService::new(manager_with(adapters, config), store)
}

#[tokio::test]
async fn repeated_quote_reads_hit_the_cache() {
    let sym = symbol("600519");
    let eastmoney = Arc::new(
        ScriptedSource::new(SourceId::Eastmoney, 1)
            .with_quote(quote_for(&sym, 1688.0, SourceId::Eastmoney)),
    );
    let service = service_over(vec![Arc::clone(&eastmoney)], None, Config::default());

    let first = service.get_quote(&sym).await.expect("fetched");
    let second = service.get_quote(&sym).await.expect("cached");
    assert_eq!(first, second);
    assert_eq!(eastmoney.quote_calls(), 1);
}

#[tokio::test]
async fn expired_quote_is_fetched_again() {
    let sym = symbol("600519");
    let eastmoney = Arc::new(
        ScriptedSource::new(SourceId::Eastmoney, 1)
            .with_quote(quote_for(&sym, 1688.0, SourceId::Eastmoney)),
    );
    let config = Config {
        quote_ttl: Duration::from_millis(20),
        ..Config::default()
    };
    let service = service_over(vec![Arc::clone(&eastmoney)], None, config);

    service.get_quote(&sym).await.expect("fetched");
    tokio::time::sleep(Duration::from_millis(50)).await;
    service.get_quote(&sym).await.expect("re-fetched");
    assert_eq!(eastmoney.quote_calls(), 2);
}

#[tokio::test]
async fn display_name_prefers_the_quote_name() {
    let sym = symbol("600519");
    let eastmoney = Arc::new(
        ScriptedSource::new(SourceId::Eastmoney, 1)
            .with_quote(quote_for(&sym, 1688.0, SourceId::Eastmoney).with_name("贵州茅台"))
            .with_name("should not be asked"),
    );
    let service = service_over(vec![Arc::clone(&eastmoney)], None, Config::default());

    let name = service.get_display_name(&sym).await.expect("resolved");
    assert_eq!(name, "贵州茅台");
    assert_eq!(eastmoney.name_calls(), 0);
}

#[tokio::test]
async fn display_name_falls_back_past_a_nameless_quote() {
    let sym = symbol("600519");
    let eastmoney = Arc::new(
        ScriptedSource::new(SourceId::Eastmoney, 1)
            .with_quote(quote_for(&sym, 1688.0, SourceId::Eastmoney))
            .with_name("贵州茅台"),
    );
    let service = service_over(vec![Arc::clone(&eastmoney)], None, Config::default());

    let name = service.get_display_name(&sym).await.expect("resolved");
    assert_eq!(name, "贵州茅台");
    assert_eq!(eastmoney.name_calls(), 1);

    // Cached now; neither endpoint is asked again.
    service.get_display_name(&sym).await.expect("cached");
    assert_eq!(eastmoney.name_calls(), 1);
    assert_eq!(eastmoney.quote_calls(), 1);
}

#[tokio::test]
async fn fresh_local_history_skips_the_network() {
    let sym = symbol("600519");
    let bars = bars_from_closes(&uptrend_closes(30, 0.003));
    let today = Date::from_julian_day(BASE_DAY + 29).expect("valid date");

    let store = Arc::new(MemoryBarStore::new());
    store.save_bars(&sym, &bars).await.expect("seeded");

    let eastmoney = Arc::new(ScriptedSource::new(SourceId::Eastmoney, 1).with_bars(bars.clone()));
    let service = service_over(
        vec![Arc::clone(&eastmoney)],
        Some(Arc::clone(&store)),
        Config::default(),
    );

    let (got, origin) = service
        .get_daily_bars(&sym, 30, today)
        .await
        .expect("served locally");
    assert_eq!(origin, BarsOrigin::Store);
    assert_eq!(got.len(), 30);
    assert_eq!(eastmoney.bars_calls(), 0);
}

#[tokio::test]
async fn stale_local_history_is_refreshed_and_written_back() {
    let sym = symbol("600519");
    let full = bars_from_closes(&uptrend_closes(30, 0.003));
    let today = Date::from_julian_day(BASE_DAY + 29).expect("valid date");

    // Local history stops five days short of today.
    let store = Arc::new(MemoryBarStore::new());
    store.save_bars(&sym, &full[..25]).await.expect("seeded");

    let eastmoney = Arc::new(ScriptedSource::new(SourceId::Eastmoney, 1).with_bars(full.clone()));
    let service = service_over(
        vec![Arc::clone(&eastmoney)],
        Some(Arc::clone(&store)),
        Config::default(),
    );

    let (_, origin) = service
        .get_daily_bars(&sym, 30, today)
        .await
        .expect("fetched upstream");
    assert_eq!(origin, BarsOrigin::Source(SourceId::Eastmoney));
    assert_eq!(eastmoney.bars_calls(), 1);

    // The write-back makes the next run local again.
    let (_, origin) = service
        .get_daily_bars(&sym, 30, today)
        .await
        .expect("served locally");
    assert_eq!(origin, BarsOrigin::Store);
    assert_eq!(eastmoney.bars_calls(), 1);
}

#[tokio::test]
async fn glob_invalidation_only_drops_the_matching_namespace() {
    let sym = symbol("600519");
    let ownership = OwnershipDistribution::new(0.65, 1500.0, 0.12, 0.08).expect("valid");
    let eastmoney = Arc::new(
        ScriptedSource::new(SourceId::Eastmoney, 1)
            .with_quote(quote_for(&sym, 1688.0, SourceId::Eastmoney))
            .with_ownership(ownership),
    );
    let service = service_over(vec![Arc::clone(&eastmoney)], None, Config::default());

    service.get_quote(&sym).await.expect("fetched");
    service.get_ownership(&sym).await.expect("fetched");

    assert_eq!(service.invalidate(Some("quote:*")).await, 1);

    service.get_quote(&sym).await.expect("re-fetched");
    service.get_ownership(&sym).await.expect("still cached");
    assert_eq!(eastmoney.quote_calls(), 2);
    assert_eq!(eastmoney.ownership_calls(), 1);
}
