use std::io::Error;
use std::sync::{Arc, OnceLock};

use models::settings::Settings;
use tcp::server::ServerInstance;
use utils::logger::Logger;

mod game;
mod models;
mod services;
mod tcp;
mod utils;

pub static SETTINGS: OnceLock<Settings> = OnceLock::new();

#[tokio::main]
async fn main() -> Result<(), Error> {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(error) => {
            crate::logger!(ERROR, "[MAIN] Could not load settings: {error}");
            return Err(Error::new(std::io::ErrorKind::Other, error.to_string()));
        }
    };
    let port = settings.port;
    let _ = SETTINGS.set(settings);

    let server = ServerInstance::create_instance(port).await?;
    let server_arc = Arc::new(server);
    server_arc.run().await;
    Ok(())
}
