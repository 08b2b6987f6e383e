use clap::Parser;
use rounded_census::config::parse_group_balance_diff;
use rounded_census::core::codec::{group_distribution, parse_census};
use rounded_census::core::outliers::z_score_outliers;
use rounded_census::utils::logger;
use rounded_census::{group_and_round, CensusError, Record};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "threshold-sweep")]
#[command(about = "Compare accuracy and group counts across fixed privacy thresholds")]
struct Args {
    /// Census file (JSON or CSV)
    #[arg(long, env = "TEST_CENSUS")]
    input: String,

    /// Privacy thresholds to evaluate
    #[arg(long, value_delimiter = ',', default_value = "3,5,10,25,50,100")]
    thresholds: Vec<usize>,

    #[arg(long, env = "GROUP_BALANCE_DIFF", default_value = "1")]
    group_balance_diff: String,

    /// Exclude z-score outliers before grouping
    #[arg(long)]
    outliers_threshold: Option<f64>,

    /// Also write the table as CSV
    #[arg(long)]
    csv: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct SweepRow {
    threshold: usize,
    accuracy: f64,
    groups: usize,
    distinct_balances: usize,
    holders: usize,
}

fn sweep(census: &[Record], args: &Args) -> Result<Vec<SweepRow>, CensusError> {
    let gap = parse_group_balance_diff("group_balance_diff", &args.group_balance_diff)?;

    let retained = match args.outliers_threshold {
        Some(threshold) => {
            let partition = z_score_outliers(census, threshold)?;
            tracing::info!("Excluded {} outliers", partition.outliers.len());
            partition.retained
        }
        None => census.to_vec(),
    };

    args.thresholds
        .iter()
        .map(|&threshold| {
            let outcome = group_and_round(&retained, threshold, &gap)?;
            Ok(SweepRow {
                threshold,
                accuracy: outcome.accuracy,
                groups: outcome.groups,
                distinct_balances: group_distribution(&outcome.records).len(),
                holders: outcome.records.len(),
            })
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let data = std::fs::read(&args.input)?;
    let census = parse_census(&args.input, &data)?;
    tracing::info!("Loaded {} holders from {}", census.len(), args.input);

    let rows = match sweep(&census, &args) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };

    println!(
        "{:>10} {:>12} {:>10} {:>10} {:>10}",
        "threshold", "accuracy", "groups", "balances", "holders"
    );
    for row in &rows {
        println!(
            "{:>10} {:>11.4}% {:>10} {:>10} {:>10}",
            row.threshold, row.accuracy, row.groups, row.distinct_balances, row.holders
        );
    }

    if let Some(path) = &args.csv {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        println!("📁 Table saved to: {}", path);
    }

    Ok(())
}
