use clap::Parser;
use client::{input, network};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server hostname or IP address
    host: String,

    /// Server TCP port
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let client = match network::Client::connect(&args.host, args.port).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect to server: {}", e);
            std::process::exit(1);
        }
    };

    input::command_loop(client).await?;

    Ok(())
}
