use group_solver::config::ServerConfig;
use group_solver::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::load()?;

    server::run_server(config).await
}
