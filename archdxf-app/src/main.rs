use std::path::PathBuf;

use anyhow::Context;
use archdxf_config::{AppConfig, ConfigError};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// 通过逐行 JSON 命令绘制建筑平面图并导出 DXF。
#[derive(Debug, Parser)]
#[command(name = "archdxf", version)]
struct Cli {
    /// 配置文件路径，默认读取 `ARCHDXF_CONFIG` 或 `./config/default.toml`
    #[arg(long)]
    config: Option<PathBuf>,
    /// 覆盖配置中的输出目录
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_configuration(cli.config)?;
    if let Some(dir) = cli.output_dir {
        config.output.directory = Some(dir);
    }
    init_logging(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "启动 archdxf 命令会话");

    archdxf_frontend::run_stdio(&config).context("命令会话异常结束")?;
    info!("会话结束");
    Ok(())
}

/// 显式指定的配置必须可用；自动发现失败时退回内建默认值。
fn load_configuration(override_path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    match override_path {
        Some(path) => AppConfig::from_file(&path)
            .with_context(|| format!("无法加载配置文件 {}", path.display())),
        None => match AppConfig::discover() {
            Ok(cfg) => Ok(cfg),
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        eprintln!("加载默认配置 {} 失败，使用内建默认值: {err}", path.display());
                    }
                    ConfigError::Context { .. } => {
                        eprintln!("加载默认配置失败，使用内建默认值: {err}");
                    }
                }
                Ok(AppConfig::default())
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| {
        eprintln!("日志等级 {:?} 无效，回退到 info", config.logging.level);
        EnvFilter::new("info")
    });
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
