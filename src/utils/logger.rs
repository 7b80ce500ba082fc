use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 預設過濾條件；verbose 優先於設定檔的 level
pub fn default_directive(verbose: bool, level: Option<&str>) -> String {
    if verbose {
        return "term_enhancer=debug,info".to_string();
    }
    let level = level.map(str::trim).filter(|l| !l.is_empty()).unwrap_or("info");
    format!("term_enhancer={}", level)
}

pub fn init_cli_logger(verbose: bool, level: Option<&str>) {
    let directive = default_directive(verbose, level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    // try_init: 測試或嵌入情境下可能已有 subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

/// 服務部署使用 JSON 格式，方便集中式日誌收集
pub fn init_json_logger(verbose: bool, level: Option<&str>) {
    let directive = default_directive(verbose, level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .try_init();
}
