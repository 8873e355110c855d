pub mod cli;
pub mod errors;

use std::io;

use archdxf_config::AppConfig;
use archdxf_engine::command::CommandBus;
use archdxf_engine::session::{Session, SessionOptions};
use errors::FrontendError;
use tracing::info;

/// 将配置映射为会话默认值。
pub fn session_options(config: &AppConfig) -> SessionOptions {
    SessionOptions {
        output_dir: config.output.directory.clone(),
        default_filename: config.output.default_filename.clone(),
        default_text_height: config.drawing.default_text_height,
    }
}

/// 在标准输入/输出上运行命令会话。日志应写往 stderr，stdout 只承载响应。
pub fn run_stdio(config: &AppConfig) -> Result<(), FrontendError> {
    let bus = CommandBus::new();
    let mut session = Session::with_options(session_options(config));
    info!(commands = ?bus.available_commands(), "命令会话就绪，等待输入");

    let stdin = io::stdin();
    let stdout = io::stdout();
    cli::run_session(stdin.lock(), stdout.lock(), &bus, &mut session)?;
    Ok(())
}
