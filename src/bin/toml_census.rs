use clap::Parser;
use rounded_census::core::ConfigProvider;
use rounded_census::utils::{logger, validation::Validate};
use rounded_census::{CensusEngine, CensusPipeline, LocalStorage, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-census")]
#[command(about = "Round a census using a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "census.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the census input from config
    #[arg(long)]
    input: Option<String>,

    /// Show the resolved configuration without rounding anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if config.json_logs() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(input) = args.input {
        tracing::info!("🔧 Census input overridden to: {}", input);
        config.census.input = Some(input);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No rounding will occur");
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    let pipeline = CensusPipeline::new(LocalStorage::current_dir(), config);
    let engine = CensusEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Census rounded successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Census rounding failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    println!("📋 Configuration Summary:");
    if let Some(name) = &config.census.name {
        println!("   Census: {}", name);
    }
    println!("   Input: {}", config.input_path());
    println!("   Output: {}", config.output_path());
    println!(
        "   Min privacy threshold: {}",
        config.grouping.min_privacy_threshold
    );
    println!("   Group balance diff: {}", config.grouping.group_balance_diff);
    println!("   Min accuracy: {:.2}%", config.grouping.min_accuracy);
    println!("   Outliers: {:?}", config.outliers);
    println!(
        "   Files: {}, {}, {}",
        config.rounded_filename(),
        config.groups_filename(),
        config.summary_filename()
    );
}
