use clap::Parser;
use log::info;
use server::config::Config;
use server::network::Server;
use server::users::UserStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON server configuration file
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let users = match UserStore::load(&config.user_database) {
        Ok(users) => users,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    info!("Loaded {} registered user(s)", users.len());

    let server = Server::bind(("0.0.0.0", config.port), users).await?;
    info!("Server listening on port {}", config.port);

    server.run().await?;

    Ok(())
}
