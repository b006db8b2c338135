mod logger;
mod resolver;
mod server;

use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::HttpServer;

fn main() -> std::io::Result<()> {
    let config = ServerConfig::parse();
    logger::init(config.log_file.as_deref(), config.timezone)?;

    info!("Starting static file server with config: {:?}", config);

    let server = HttpServer::new(&config)
        .inspect_err(|e| error!("Error starting server: {}", e))?;
    info!("Server listening at http://localhost:{}", server.local_addr()?.port());
    server.run();

    Ok(())
}
