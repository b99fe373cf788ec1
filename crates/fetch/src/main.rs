//! isf-fetch - issue a single request through the ISF HTTP utility.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use common::ApiConfig;
use http::Method;
use networking::eval::eval_value;
use networking::headers::names;
use networking::{Body, HttpClient, Params, ReadAs, RequestOptions, SendAs};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Send one HTTP request and print the decoded response
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Absolute URL, or an API path when --host is given
    url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Payload field as key=value; repeat a key to send a list
    #[arg(short = 'd', long = "data")]
    data: Vec<String>,

    /// Convert payload values to booleans/numbers where unambiguous
    #[arg(long)]
    typed: bool,

    /// Extra header as "Name: value"
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Body encoding: form, json or text
    #[arg(long, default_value = "form")]
    send_as: SendAs,

    /// Response decoding: text, json or xml
    #[arg(long, default_value = "text")]
    read_as: ReadAs,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "60000")]
    timeout_ms: u64,

    /// API protocol
    #[arg(long, default_value = "https")]
    protocol: String,

    /// API host; enables path URLs
    #[arg(long)]
    host: Option<String>,

    /// API port
    #[arg(long)]
    port: Option<u16>,

    /// API path prefix
    #[arg(long, default_value = "")]
    prefix: String,

    /// Access token sent as a bearer Authorization header
    #[arg(long)]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let url = match api_config(&args) {
        Some(config) => {
            let url = config.url_for(&args.url)?.to_string();
            common::config::setup(config)?;
            url
        }
        None => args.url.clone(),
    };

    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("invalid method {}", args.method))?;

    let mut options = RequestOptions::new()
        .send_as(args.send_as)
        .read_as(args.read_as)
        .timeout(Duration::from_millis(args.timeout_ms));
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        options = options.header(name, value);
    }
    if let Some(authorization) = common::config::get().and_then(ApiConfig::authorization) {
        options = options.header(names::AUTHORIZATION, authorization);
    }

    let payload = build_payload(&args.data, args.typed)?;

    info!("{} {}", method, url);
    let client = HttpClient::new()?;
    let response = client.request(method, &url, payload, options).await?;

    println!("HTTP {}", response.status());
    match response.body() {
        Body::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        Body::Xml(document) => println!("{}", document.as_str()),
        Body::Text(text) => println!("{}", text),
    }

    Ok(())
}

/// Build the API configuration when a host was given.
fn api_config(args: &Args) -> Option<ApiConfig> {
    let host = args.host.as_ref()?;
    let mut config = ApiConfig::new()
        .with_protocol(args.protocol.as_str())
        .with_host(host.as_str())
        .with_prefix(args.prefix.as_str());
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(token) = args.token.clone() {
        config = config.with_token_getter(move || Some(token.clone()));
    }
    Some(config)
}

/// Parse a `Name: value` header argument.
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header must look like \"Name: value\": {}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("empty header name in {}", raw));
    }
    Ok((name, value.trim()))
}

/// Collect `key=value` arguments into params. Repeated keys become lists.
fn build_payload(data: &[String], typed: bool) -> Result<Params> {
    let mut params = Params::new();
    for raw in data {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("data must look like key=value: {}", raw))?;
        let value = if typed {
            eval_value(value)
        } else {
            Value::String(value.to_string())
        };

        match params.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                params.insert(key.to_string(), value);
            }
        }
    }
    Ok(params)
}
