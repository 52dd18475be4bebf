use anyhow::Result;
use clap::Parser;

use protox_batch::cli::Cli;
use protox_batch::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref())?;

    App::initialize(config)?.execute(cli.command).await
}
