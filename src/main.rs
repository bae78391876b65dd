use clap::Parser;
use rs_waybill_proxy::app::pipelines::ReportContext;
use rs_waybill_proxy::config::cli::{Command, ReportArgs, ReportKind};
use rs_waybill_proxy::utils::error::ErrorSeverity;
use rs_waybill_proxy::utils::{logger, validation::Validate};
use rs_waybill_proxy::{
    AppState, CliConfig, DebtPipeline, InventoryPipeline, LocalStorage, ProxyConfig, ProxyError,
    ReportEngine,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting rs-waybill-proxy");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2, // 上游錯誤，可重試
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: CliConfig) -> Result<(), ProxyError> {
    let config = ProxyConfig::load(cli.config.as_deref())?;

    // 驗證配置
    config.validate()?;

    match cli.command {
        Command::Serve { bind } => rs_waybill_proxy::serve(&config, bind.as_deref()).await,
        Command::Report(args) => run_report(&config, args).await,
    }
}

async fn run_report(config: &ProxyConfig, args: ReportArgs) -> Result<(), ProxyError> {
    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let state = AppState::from_config(config)?;
    let context: ReportContext = state.report_context(&args.user, &args.start, &args.end)?;
    let report_dir = args.output.as_deref().unwrap_or(config.report_dir());
    let storage = LocalStorage::new(report_dir);

    let output_path = match args.kind {
        ReportKind::Inventory => {
            ReportEngine::new_with_monitoring(InventoryPipeline::new(context, storage), args.monitor)
                .run()
                .await?
        }
        ReportKind::Debts => {
            ReportEngine::new_with_monitoring(DebtPipeline::new(context, storage), args.monitor)
                .run()
                .await?
        }
    };

    tracing::info!("✅ Report completed");
    println!("✅ Report completed!");
    println!("📁 Output saved to: {}/{}", report_dir, output_path);
    Ok(())
}
