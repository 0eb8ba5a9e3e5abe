use analytics::PerformanceReport;
use analyzer::RankedReport;
use backtester::{data::load_ticks, BacktestResult, Backtester};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use configuration::{init_tracing, load_config, load_sweep_config, Config, LoggingSettings};
use core_types::StrategyId;
use optimizer::Optimizer;
use serde::Serialize;
use serde_json::Value;
use skill_sync::{format_decimal, format_optional, SkillSummary};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// The main entry point for the Hive backtesting toolkit.
fn main() -> anyhow::Result<()> {
    // Optional .env with HIVE__* overrides
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    match cli.command {
        Commands::Backtest(args) => handle_backtest(args),
        Commands::Baseline(args) => handle_baseline(args),
        Commands::Optimize(args) => handle_optimize(args),
        Commands::SyncSkill(args) => handle_sync_skill(args),
        Commands::Strategies => {
            for id in StrategyId::ALL {
                println!("{id}");
            }
            Ok(())
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Strategy backtesting with hive reason-tag scoring.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one strategy on a tick file.
    Backtest(BacktestArgs),
    /// Backtest every strategy and write a baseline summary file.
    Baseline(BaselineArgs),
    /// Sweep a strategy's parameter space and rank the results.
    Optimize(OptimizeArgs),
    /// Patch the baseline stats section of a skill markdown file.
    SyncSkill(SyncSkillArgs),
    /// List the available strategy ids.
    Strategies,
}

#[derive(Parser)]
struct BacktestArgs {
    /// Path to the TOML configuration.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// CSV tick file with `timestamp,symbol,price` rows.
    #[arg(long)]
    data: PathBuf,

    /// Strategy id, e.g. "z-score-reversion".
    #[arg(long)]
    strategy: StrategyId,

    /// Write the full result (trades, equity curve, hive signals) as JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct BaselineArgs {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[arg(long)]
    data: PathBuf,

    /// Where to write the JSON array of summaries.
    #[arg(long, default_value = "baseline.json")]
    output: PathBuf,
}

#[derive(Parser)]
struct OptimizeArgs {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Path to the sweep definition.
    #[arg(long, default_value = "sweep.toml")]
    sweep: PathBuf,

    #[arg(long)]
    data: PathBuf,

    /// Number of ranked candidates to print.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Write every ranked candidate as JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct SyncSkillArgs {
    /// Baseline JSON written by the `baseline` command.
    #[arg(long, default_value = "baseline.json")]
    baseline: PathBuf,

    /// Markdown file holding the stats section.
    #[arg(long)]
    skill: PathBuf,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn handle_backtest(args: BacktestArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let _guard = init_tracing(&config.logging)?;

    let ticks = load_ticks(&args.data)?;
    let result = Backtester::from_config(args.strategy, &config)?
        .with_progress(true)
        .run(&ticks)?;

    print_report(&result);

    if let Some(path) = args.output {
        write_json(&path, &result)?;
        println!("Full result written to {}", path.display());
    }
    Ok(())
}

fn handle_baseline(args: BaselineArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let _guard = init_tracing(&config.logging)?;

    let ticks = load_ticks(&args.data)?;
    let mut summaries = Vec::with_capacity(StrategyId::ALL.len());
    for id in StrategyId::ALL {
        let result = Backtester::from_config(id, &config)?
            .with_progress(true)
            .run(&ticks)?;
        summaries.push(SkillSummary::from_report(
            format!("{id}-baseline"),
            id.to_string(),
            strategy_params(&config, id)?,
            &result.report,
            result.hive_penalty,
        ));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Strategy", "Trades", "Win rate %", "Net profit", "Return %", "Max DD %", "Hive penalty",
    ]);
    for s in &summaries {
        table.add_row(vec![
            s.strategy.clone(),
            s.trades.to_string(),
            format_optional(s.win_rate_pct),
            format_decimal(s.net_profit),
            format_decimal(s.return_pct),
            format_decimal(s.max_drawdown_pct),
            format_decimal(s.hive_penalty),
        ]);
    }
    println!("{table}");

    write_json(&args.output, &summaries)?;
    println!("Baseline written to {}", args.output.display());
    Ok(())
}

fn handle_optimize(args: OptimizeArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let _guard = init_tracing(&config.logging)?;

    let sweep = load_sweep_config(&args.sweep)?;
    let ticks = load_ticks(&args.data)?;
    let outcome = Optimizer::new(sweep, config)?.with_progress(true).run(&ticks)?;

    println!(
        "{}: {} parameter sets, {} skipped, {} passed the filters",
        outcome.strategy_id,
        outcome.total_sets,
        outcome.skipped_sets,
        outcome.ranked.len()
    );
    print_ranking(&outcome.ranked, args.top);

    if let Some(path) = args.output {
        write_json(&path, &outcome)?;
        println!("Ranking written to {}", path.display());
    }
    Ok(())
}

fn handle_sync_skill(args: SyncSkillArgs) -> anyhow::Result<()> {
    let _guard = init_tracing(&LoggingSettings::default())?;

    if skill_sync::sync_file(&args.baseline, &args.skill)? {
        println!("Updated {}", args.skill.display());
    } else {
        println!("{} already up to date", args.skill.display());
    }
    Ok(())
}

// ==============================================================================
// Output Helpers
// ==============================================================================

fn strategy_params(config: &Config, id: StrategyId) -> serde_json::Result<Value> {
    let strategies = &config.strategies;
    match id {
        StrategyId::ZScoreReversion => serde_json::to_value(&strategies.z_score_reversion),
        StrategyId::RegressionTrend => serde_json::to_value(&strategies.regression_trend),
        StrategyId::BollingerRsi => serde_json::to_value(&strategies.bollinger_rsi),
        StrategyId::DcaGrid => serde_json::to_value(&strategies.dca_grid),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn print_report(result: &BacktestResult) {
    let report: &PerformanceReport = &result.report;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    let rows = [
        ("Strategy", result.strategy.clone()),
        ("Total trades", report.total_trades.to_string()),
        ("Win rate %", format_optional(report.win_rate_pct)),
        ("Net profit", format_decimal(report.total_net_profit)),
        ("Total fees", format_decimal(report.total_fees)),
        ("Return %", format_decimal(report.total_return_pct)),
        ("Max drawdown %", format_decimal(report.max_drawdown_pct)),
        ("Profit factor", format_optional(report.profit_factor)),
        ("Sharpe (per tick)", format_optional(report.sharpe_ratio)),
        ("Calmar", format_optional(report.calmar_ratio)),
        ("Payoff ratio", format_optional(report.payoff_ratio)),
        (
            "Avg holding period",
            format!("{}s", report.average_holding_period.as_secs()),
        ),
        ("Hive penalty", format_decimal(result.hive_penalty)),
        ("Hive signals", result.hive_signals.len().to_string()),
        ("Open positions", result.open_positions.len().to_string()),
        ("Rejected decisions", result.rejected_decisions.to_string()),
    ];
    for (metric, value) in rows {
        table.add_row(vec![metric.to_string(), value]);
    }
    println!("{table}");

    if report.tag_breakdown.is_empty() {
        return;
    }
    let mut tags = Table::new();
    tags.load_preset(UTF8_FULL)
        .set_header(vec!["Reason tag", "Trades", "Wins", "Losses", "Net profit"]);
    for (tag, stats) in &report.tag_breakdown {
        tags.add_row(vec![
            tag.to_string(),
            stats.trades.to_string(),
            stats.wins.to_string(),
            stats.losses().to_string(),
            format_decimal(stats.net_profit),
        ]);
    }
    println!("{tags}");
}

fn print_ranking(ranked: &[RankedReport], top: usize) {
    if ranked.is_empty() {
        println!("No candidate passed the analysis filters.");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Rank", "Score", "Parameters", "Trades", "Net profit", "Return %", "Max DD %", "Profit factor",
        "Hive penalty",
    ]);
    for r in ranked.iter().take(top) {
        let report = &r.candidate.report;
        table.add_row(vec![
            r.rank.to_string(),
            r.score.round_dp(4).to_string(),
            r.candidate.label.clone(),
            report.total_trades.to_string(),
            format_decimal(report.total_net_profit),
            format_decimal(report.total_return_pct),
            format_decimal(report.max_drawdown_pct),
            format_optional(report.profit_factor),
            format_decimal(r.candidate.hive_penalty),
        ]);
    }
    println!("{table}");
}
