/*
 * Responsibility
 * - tokio runtime 起動
 * - .env 読み込み + CLI parse → app::run() の呼び出し（ロジックは置かない）
 */
use anyhow::Result;
use clap::Parser;

mod api;
mod app;
mod config;
mod error;
mod middleware;
mod model;
mod services;
mod state;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = config::Cli::parse();
    app::run(cli).await
}
