use clap::Parser;
use tracing::info;

use url_shortener::config::{StaticConfig, get_config, init_config_from_path};
use url_shortener::system::lifetime::{listen_for_shutdown, prepare_startup};
use url_shortener::system::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "url-shortener", version, about)]
struct Args {
    /// 配置文件路径（也可通过 CONFIG 环境变量指定）
    #[arg(short, long)]
    config: Option<String>,

    /// 输出示例配置后退出
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if args.generate_config {
        println!("{}", StaticConfig::generate_sample_config());
        return;
    }

    let config_path = args
        .config
        .or_else(|| std::env::var("CONFIG").ok())
        .unwrap_or_else(|| url_shortener::config::DEFAULT_CONFIG_PATH.to_string());
    init_config_from_path(&config_path);
    let config = get_config();

    let log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            std::process::exit(1);
        }
    };

    let context = match prepare_startup(&config) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            std::process::exit(1);
        }
    };

    info!(
        "url-shortener running on {}:{}, press Ctrl+C to stop",
        config.server.host, config.server.port
    );

    let deadline = config.delete_worker.shutdown_timeout();
    let result = listen_for_shutdown(&context.delete_pool, deadline).await;

    // exit 不会运行析构，先手动刷出缓冲的日志
    drop(log_guard);
    if result.is_err() {
        std::process::exit(1);
    }
}
