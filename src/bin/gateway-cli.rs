use std::sync::Arc;
use std::time::SystemTime;

use base64::Engine as _;
use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use serde_json::{json, Value};

use cardscan_gateway::attestation::signed::sign_token;
use cardscan_gateway::attestation::token::TOKEN_B64;
use cardscan_gateway::attestation::{unix_seconds, AttestationToken, ATTEST_HEADER};
use cardscan_gateway::config::{AttestationConfig, OutboundConfig};
use cardscan_gateway::outbound::{SystemResolver, UrlGuard};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the card scanning gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct TokenArgs {
    #[arg(long, default_value = "cli-device")]
    device_id: String,
    #[arg(long)]
    bundle_id: Option<String>,
    #[arg(long)]
    issuer: Option<String>,
    /// Base64 ed25519 seed (32 bytes). Produces a signed token.
    #[arg(long)]
    signing_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint an attestation token
    Token(TokenArgs),
    /// Run a URL through the outbound SSRF guard
    CheckUrl { target: String },
    /// Send card text to /api/parse
    Parse {
        text: String,
        #[command(flatten)]
        token: TokenArgs,
    },
    /// Send a company to /api/enrich
    Enrich {
        #[arg(long)]
        organization: String,
        #[arg(long)]
        website: Option<String>,
        #[arg(long, default_value = "")]
        raw_text: String,
        #[command(flatten)]
        token: TokenArgs,
    },
    /// Probe /healthz
    Health,
}

fn mint(args: &TokenArgs) -> Result<String, Box<dyn std::error::Error>> {
    let defaults = AttestationConfig::default();
    let claims = AttestationToken {
        device_id: args.device_id.clone(),
        bundle_id: args.bundle_id.clone().unwrap_or(defaults.bundle_id),
        issuer: args.issuer.clone().unwrap_or(defaults.issuer),
        timestamp: unix_seconds(SystemTime::now()),
    };

    match &args.signing_key {
        None => Ok(claims.encode()),
        Some(seed) => {
            let bytes = TOKEN_B64.decode(seed.trim())?;
            let seed: [u8; 32] = bytes
                .try_into()
                .map_err(|_| "signing key must decode to 32 bytes")?;
            let key = SigningKey::from_bytes(&seed);
            Ok(sign_token(&serde_json::to_vec(&claims)?, &key))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Token(args) => {
            println!("{}", mint(&args)?);
        }
        Commands::CheckUrl { target } => {
            let guard = UrlGuard::new(&OutboundConfig::default(), Arc::new(SystemResolver));
            match guard.validate_and_sanitize(&target).await {
                Ok(sanitized) => println!("allowed: {}", sanitized.as_str()),
                Err(rejection) => println!("refused ({}): {}", rejection.code(), rejection),
            }
        }
        Commands::Parse { text, token } => {
            let res = client
                .post(format!("{}/api/parse", cli.url))
                .header(ATTEST_HEADER, mint(&token)?)
                .json(&json!({ "text": text }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Enrich {
            organization,
            website,
            raw_text,
            token,
        } => {
            let res = client
                .post(format!("{}/api/enrich", cli.url))
                .header(ATTEST_HEADER, mint(&token)?)
                .json(&json!({
                    "organization": organization,
                    "website": website,
                    "rawText": raw_text,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/healthz", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(remaining) = res.headers().get("x-ratelimit-remaining") {
        println!("Remaining: {}", remaining.to_str().unwrap_or("?"));
    }
    let body: Value = res.json().await.unwrap_or(Value::Null);

    println!("Status: {}", status);
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
