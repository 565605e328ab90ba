use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "classicmodels-cli")]
#[command(about = "Command-line client for the ClassicModels API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Access token for protected routes
    #[arg(short, long, env = "CLASSICMODELS_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// Obtain an access/refresh token pair
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Show the current user
    Me,
    /// List or fetch a resource, e.g. `get offices` or `get offices 1`
    Get {
        resource: String,
        key: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show the remaining demo quota for this address
    Quota,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
    }

    let res = match cli.command {
        Commands::Status => {
            client.get(format!("{}/classic-models/api/status/", base))
                .send()
                .await?
        }
        Commands::Login { username, password } => {
            client.post(format!("{}/classic-models/api/auth/login/", base))
                .json(&json!({ "username": username, "password": password }))
                .send()
                .await?
        }
        Commands::Me => {
            client.get(format!("{}/classic-models/api/auth/me/", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Get { resource, key, page } => {
            let mut url = format!("{}/classic-models/api/v1/classicmodels/{}/", base, resource);
            if let Some(key) = key {
                url.push_str(&format!("{}/", key));
            }
            let mut request = client.get(url).headers(headers);
            if let Some(page) = page {
                request = request.query(&[("page", page)]);
            }
            request.send().await?
        }
        Commands::Quota => {
            client.get(format!("{}/classic-models/api/auth/rate-limit-demo/", base))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(remaining) = res.headers().get("x-ratelimit-remaining") {
        eprintln!("Rate limit remaining: {}", remaining.to_str().unwrap_or("?"));
    }
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
