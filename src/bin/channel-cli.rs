use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "channel-cli")]
#[command(about = "Client for the HTTP bus channel", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: Url,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List capabilities announced by the bus
    Handshake,
    /// Send a request and wait for its response
    Send {
        /// Handler to invoke
        #[arg(short, long)]
        name: String,
        /// JSON payload
        #[arg(short, long, default_value = "null")]
        payload: String,
        /// Correlation id (random UUID when omitted)
        #[arg(long)]
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Handshake => {
            let res = client.get(cli.url.join("handshake")?).send().await?;
            print_response(res).await?;
        }
        Commands::Send { name, payload, id } => {
            let payload: Value = serde_json::from_str(&payload)?;
            let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let message = json!({
                "id": id,
                "type": "request",
                "name": name,
                "payload": payload,
            });
            let res = client
                .post(cli.url.join("message")?)
                .json(&message)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: channel returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
