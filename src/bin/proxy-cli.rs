use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use webhook_proxy::http::X_IN_REPLY_TO;
use webhook_proxy::transfer::copy_max;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management and manual poll CLI for the webhook proxy", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key
    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    /// Broker base URL used by `poll` and `reply`
    #[arg(short, long, default_value = "http://localhost:8080")]
    broker: String,

    /// Shared secret appended to the broker paths
    #[arg(short, long, default_value = "")]
    secret: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy system status
    Status,
    /// Show pending sessions and queue depth
    Sessions,
    /// Long-poll once for a webhook delivery
    Poll,
    /// Answer a delivery
    Reply {
        /// Correlation id from the X-ReplyId header of the delivery
        #[arg(long)]
        id: String,
        /// Reply body; read from stdin when omitted
        #[arg(long)]
        body: Option<String>,
        /// Largest body accepted from stdin
        #[arg(long, default_value_t = 1024 * 1024)]
        max_bytes: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Sessions => {
            let res = client.get(format!("{}/admin/sessions", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Poll => {
            let res = client.get(format!("{}/poll/{}", cli.broker, cli.secret))
                .send()
                .await?;
            print_delivery(res).await?;
        }
        Commands::Reply { id, body, max_bytes } => {
            let body = match body {
                Some(text) => text.into_bytes(),
                None => {
                    let mut buf = Vec::new();
                    copy_max(max_bytes, &mut buf, &mut tokio::io::stdin()).await?;
                    buf
                }
            };
            let res = client.post(format!("{}/reply{}", cli.broker, cli.secret))
                .header(X_IN_REPLY_TO, id)
                .body(body)
                .send()
                .await?;
            let status = res.status();
            let text = res.text().await?;
            if status.is_success() {
                println!("Reply delivered");
            } else {
                eprintln!("Error: broker returned status {}", status);
                eprintln!("Response: {}", text);
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Headers go to stderr so the body can be piped.
async fn print_delivery(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status == reqwest::StatusCode::NO_CONTENT {
        eprintln!("No delivery within the long-poll wait");
        return Ok(());
    }
    if !status.is_success() {
        eprintln!("Error: broker returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    for (name, value) in res.headers() {
        eprintln!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    let body = res.bytes().await?;
    println!("{}", String::from_utf8_lossy(&body));
    Ok(())
}
