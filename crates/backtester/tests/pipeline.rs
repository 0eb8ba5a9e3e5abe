use backtester::{BacktestError, Backtester};
use chrono::{Duration, TimeZone, Utc};
use configuration::{load_config, Config};
use core_types::{PriceUpdate, ReasonTag, StrategyId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;

fn config(penalty_threshold: &str) -> Config {
    let toml = format!(
        r#"
[simulation]
initial_capital = 10000
taker_fee_pct = 0
slippage_pct = 0

[risk_management]
risk_per_trade_pct = 0.1
max_position_pct = 0.5

[hive]
penalty_threshold = {penalty_threshold}
decay = 0.5

[strategies.z_score_reversion]
window = 5
entry_z = 1.5
exit_z = 0
rsi_period = 4
rsi_oversold = 30
exit = {{ take_profit_pct = 0.2, stop_loss_pct = 0.05 }}

[strategies.regression_trend]
window = 5
min_slope_pct = 0.005
min_r_squared = 0.9
ema_period = 3
exit = {{ take_profit_pct = 0.5, stop_loss_pct = 0.1, trailing_stop_pct = 0.02 }}

[strategies.bollinger_rsi]
window = 5
bb_std_dev = 1.5
rsi_period = 4
rsi_oversold = 30
atr_period = 4
max_atr_pct = 0.02
atr_stop_mult = 2
exit = {{ take_profit_pct = 0.05, stop_loss_pct = 0.02 }}

[strategies.dca_grid]
window = 5
entry_z = 1.5
dca_step_pct = 0.02
max_dca_levels = 2
size_multiplier = 2
exit = {{ take_profit_pct = 0.015, stop_loss_pct = 0.05 }}
"#
    );
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    load_config(file.path()).unwrap()
}

fn ticks(symbol: &str, prices: &[Decimal]) -> Vec<PriceUpdate> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, p)| PriceUpdate::new(start + Duration::minutes(i as i64)).with_price(symbol, *p))
        .collect()
}

#[test]
fn profitable_round_trip_is_reported() {
    let config = config("5");
    let data = ticks(
        "BTCUSDT",
        &[dec!(100), dec!(100), dec!(100), dec!(100), dec!(90), dec!(92), dec!(97)],
    );

    let result = Backtester::from_config(StrategyId::ZScoreReversion, &config)
        .unwrap()
        .run(&data)
        .unwrap();

    assert_eq!(result.strategy, "z-score-reversion");
    assert_eq!(result.equity_curve.len(), data.len());
    assert_eq!(result.trades.len(), 1);

    let trade = &result.trades[0];
    assert_eq!(trade.entry_reason, ReasonTag::ZScoreEntry);
    assert_eq!(trade.exit_reason, ReasonTag::MeanReverted);
    assert_eq!(trade.entry_price, dec!(90));
    assert!(trade.net_profit() > Decimal::ZERO);

    assert_eq!(result.report.winning_trades, 1);
    assert!(result.report.total_return_pct > Decimal::ZERO);
    assert_eq!(result.report.tag(ReasonTag::MeanReverted).wins, 1);
    assert!(result.open_positions.is_empty());
    assert!(result.hive_signals.is_empty());
}

#[test]
fn hive_penalty_stops_a_losing_entry_tag() {
    let prices = [
        dec!(100),
        dec!(100),
        dec!(100),
        dec!(100),
        dec!(90),
        dec!(85),
        dec!(85),
        dec!(85),
        dec!(85),
        dec!(85),
        dec!(70),
    ];
    let data = ticks("BTCUSDT", &prices);

    // Threshold 1: the first loss penalizes both of its tags.
    let strict = Backtester::from_config(StrategyId::ZScoreReversion, &config("1"))
        .unwrap()
        .run(&data)
        .unwrap();
    assert_eq!(strict.trades.len(), 1);
    assert_eq!(strict.trades[0].exit_reason, ReasonTag::StopLoss);
    assert_eq!(strict.hive_signals.len(), 1);
    assert_eq!(
        strict.hive_signals[0].penalized_tags,
        vec![ReasonTag::ZScoreEntry, ReasonTag::StopLoss]
    );
    assert!(strict.open_positions.is_empty());

    // Same data with a lenient scorer re-enters on the second dip.
    let lenient = Backtester::from_config(StrategyId::ZScoreReversion, &config("10"))
        .unwrap()
        .run(&data)
        .unwrap();
    assert_eq!(lenient.trades.len(), 1);
    assert!(lenient.hive_signals.is_empty());
    assert_eq!(lenient.open_positions.len(), 1);
    assert!(lenient.hive_penalty > Decimal::ZERO);
}

#[test]
fn every_strategy_family_runs_on_the_same_data() {
    let config = config("5");
    let data = ticks(
        "ETHUSDT",
        &[
            dec!(100),
            dec!(101),
            dec!(100),
            dec!(101),
            dec!(97),
            dec!(100),
            dec!(102),
            dec!(103),
            dec!(104),
            dec!(106),
        ],
    );
    for id in StrategyId::ALL {
        let result = Backtester::from_config(id, &config).unwrap().run(&data).unwrap();
        assert_eq!(result.equity_curve.len(), data.len(), "{id}");
        assert_eq!(result.rejected_decisions, 0, "{id}");
    }
}

#[test]
fn rejected_entries_are_rolled_back() {
    // Too little capital for any order to reach the smallest quantity step.
    let mut config = config("5");
    config.simulation.initial_capital = dec!(0.000001);
    let data = ticks(
        "BTCUSDT",
        &[
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(90),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(90),
        ],
    );

    let result = Backtester::from_config(StrategyId::ZScoreReversion, &config)
        .unwrap()
        .run(&data)
        .unwrap();

    // Each dip is one rejected entry; a strategy left believing it was long would
    // keep emitting exits for a position that does not exist.
    assert_eq!(result.rejected_decisions, 2);
    assert!(result.trades.is_empty());
    assert!(result.open_positions.is_empty());
    assert_eq!(result.equity_curve.len(), data.len());
    assert!(result.equity_curve.iter().all(|(_, equity)| *equity == dec!(0.000001)));
}

#[test]
fn empty_input_is_data_unavailable() {
    let mut backtester = Backtester::from_config(StrategyId::DcaGrid, &config("5")).unwrap();
    assert!(matches!(backtester.run(&[]), Err(BacktestError::DataUnavailable)));
}
