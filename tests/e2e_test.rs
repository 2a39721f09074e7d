use chrono::{DateTime, Duration, Local, TimeZone, Timelike};
use intraday_kit::config::AppConfig;
use intraday_kit::indicators::{calculate_ema, Ema};
use intraday_kit::monitor::{FixedAtr, ReplaySource, StopMonitor};
use intraday_kit::risk::{self, PositionCalculator};
use intraday_kit::scheduler::{ClockAlignedScheduler, ManualClock};
use intraday_kit::TradeError;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 4, h, m, s).single().unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_e2e_workflow() {
    let _ = tracing_subscriber::fmt::try_init();

    // 1. Seed the EMA from a warm-up window
    let warmup = [20.0, 20.2, 20.1, 20.3, 20.4];
    let ema = Ema::from_warmup(5, &warmup).unwrap();
    assert!((ema.value() - 20.2).abs() < 1e-9);

    // 2. Monitor replays one price per tick, every 5 minutes
    let config = AppConfig::default();
    let monitor = StopMonitor::new(
        ReplaySource::new("TEST", vec![20.5, 20.6, 20.4]),
        FixedAtr(0.3),
        ema,
        config.calculator().unwrap(),
    );

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    let errors = Arc::new(Mutex::new(0u32));
    let error_count = errors.clone();

    let clock = ManualClock::stepping(at(9, 59, 58), Duration::seconds(1));
    let mut scheduler = ClockAlignedScheduler::new(5, monitor)
        .unwrap()
        .with_clock(clock.clone())
        .with_error_sink(move |_, _| {
            // The fourth tick finds the replay exhausted; stop there
            *error_count.lock().unwrap() += 1;
            stop.cancel();
        });

    let stats = scheduler.run(cancel).await;

    // 3. Three sized ticks, then one failed tick that was reported, not fatal
    assert_eq!(stats.ticks_fired, 4);
    assert_eq!(stats.failures, 1);
    assert_eq!(*errors.lock().unwrap(), 1);

    let monitor = scheduler.into_handler();
    let history: Vec<_> = monitor.history().cloned().collect();
    assert_eq!(history.len(), 3);

    let minutes: Vec<u32> = history.iter().map(|s| s.timestamp.minute()).collect();
    assert_eq!(minutes, vec![0, 5, 10]);
    assert!(history.iter().all(|s| s.timestamp.second() == 0));

    // 4. Each suggestion is consistent with the standalone calculator
    for suggestion in &history {
        assert!((suggestion.stop_price - (suggestion.ema - 0.3)).abs() < 1e-9);

        let capital = risk::capital_for_stop(suggestion.price, suggestion.stop_price, 50.0, 5.0)
            .unwrap();
        assert!((suggestion.capital.unwrap() - capital).abs() < 1e-9);

        let shares = risk::num_shares(suggestion.price, capital).unwrap().shares;
        assert_eq!(suggestion.shares, Some(shares));
    }

    // 5. The streamed EMA matches the batch helper over the same series
    let series = [20.0, 20.2, 20.1, 20.3, 20.4, 20.5, 20.6, 20.4];
    let batch = calculate_ema(&series, 5).unwrap();
    assert!((monitor.ema().value() - batch).abs() < 1e-12);
}

#[test]
fn test_reference_trade() {
    let calculator = PositionCalculator::default().with_entry_price(20.0).unwrap();

    let shares = calculator.num_shares().unwrap();
    assert_eq!(shares.shares, 200);

    let stop = calculator.risk_stop().unwrap();
    assert!((stop.per_share_move - 0.2).abs() < 1e-9);
    assert!((stop.stop_price - 19.8).abs() < 1e-9);

    let gain = calculator.gain(22.0).unwrap();
    assert!((gain.amount - 390.0).abs() < 1e-9);

    // Planning backwards from the stop lands on the same trade
    let plan = PositionCalculator::with_buy_and_stop(20.0, stop.stop_price, 50.0, 5.0).unwrap();
    assert_eq!(plan.num_shares().unwrap().shares, 200);
}

#[test]
fn test_errors_are_distinguishable() {
    assert!(matches!(
        risk::num_shares(0.0, 4000.0),
        Err(TradeError::InvalidPrice { .. })
    ));
    assert!(matches!(
        risk::risk_stop_from_capital(500.0, 100.0, 50.0, 5.0),
        Err(TradeError::PositionTooSmall { .. })
    ));
    assert!(matches!(
        risk::capital_for_stop(20.0, 20.0, 50.0, 5.0),
        Err(TradeError::StopEqualsEntry { .. })
    ));
    assert!(matches!(Ema::new(-1.0, 20.0), Err(TradeError::InvalidConfig(_))));
}

#[test]
fn test_volatility_stop_feeds_sizing() {
    let mut ema = Ema::new(9.0, 50.0).unwrap();
    ema.update(51.0);

    let stop = risk::stop_from_volatility(ema.value(), 1.2);
    let plan = PositionCalculator::with_buy_and_stop(51.0, stop, 50.0, 5.0).unwrap();

    let shares = plan.num_shares().unwrap().shares;
    let loss_at_stop = shares as f64 * (51.0 - stop) + 10.0;
    assert!(loss_at_stop <= 50.0 + 1e-9);
    assert!(shares > 0);

    let fraction = risk::loss_fraction(51.0, stop).unwrap();
    assert!((risk::price_after_loss(51.0, fraction) - stop).abs() < 1e-9);
}
