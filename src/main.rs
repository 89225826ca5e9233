use dotenvy::dotenv;
use log::error;

use hive_server::core::config::AppConfig;
use hive_server::main_module::{create_app_state, init_logging, parse_cli_args, run_axum_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let options = parse_cli_args(&args);

    let config = AppConfig::from_env()?;
    let app_state = create_app_state(config, options).await?;

    if let Err(e) = run_axum_server(app_state).await {
        error!("Server stopped with an error: {e}");
        return Err(e.into());
    }
    Ok(())
}
