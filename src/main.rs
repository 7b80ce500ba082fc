use clap::Parser;
use std::sync::Arc;
use term_enhancer::utils::error::{EnhanceError, ErrorSeverity};
use term_enhancer::utils::{logger, validation::Validate};
use term_enhancer::{AppConfig, CliConfig, EnhancementApi, MemoryCacheStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入 TOML 配置
    let config = match AppConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config.display(), e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if cli.json_logs || config.logging.json {
        logger::init_json_logger(cli.verbose, Some(&config.logging.level));
    } else {
        logger::init_cli_logger(cli.verbose, Some(&config.logging.level));
    }

    tracing::info!("🚀 Starting term-enhancer");
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    if let Err(e) = cli.validate().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let api = match EnhancementApi::from_config(&config, Arc::new(MemoryCacheStore::new())) {
        Ok(api) => api,
        Err(e) => exit_with(e),
    };

    let request = match cli.load_request() {
        Ok(request) => request,
        Err(e) => exit_with(e),
    };

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No provider will be called");
        let plan = match api.plan(&request) {
            Ok(plan) => plan,
            Err(e) => exit_with(e),
        };
        cli.write_output(&serde_json::to_string_pretty(&plan)?)?;
        return Ok(());
    }

    match api.enhance(&request).await {
        Ok(response) => {
            let summary = &response.summary;
            tracing::info!(
                "✅ {}/{} terms enhanced in {:.2}s",
                summary.enhanced_terms,
                summary.total_terms,
                summary.processing_time
            );
            for error in &response.errors {
                tracing::warn!("⚠️ {}", error);
            }

            cli.write_output(&serde_json::to_string_pretty(&response)?)?;
            if let Some(path) = &cli.output {
                println!("📁 Output saved to: {}", path.display());
            }
            if summary.enhanced_terms == 0 && summary.failed_terms > 0 {
                std::process::exit(1);
            }
        }
        Err(e) => exit_with(e),
    }

    Ok(())
}

fn exit_with(e: EnhanceError) -> ! {
    tracing::error!(
        "❌ Enhancement failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
