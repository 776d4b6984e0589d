use monitor_api::{api, config::ServiceConfig, logging};
use tracing::error;

#[tokio::main]
async fn main() {
    logging::init_logger();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = api::start_server(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
