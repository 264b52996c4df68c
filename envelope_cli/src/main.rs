mod output;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use envelope_api::{Client, ClientOptions, RequestOptions, SuccessBody};
use reqwest::Method;
use serde_json::Value;

use crate::output::OutputFormat;

/// Default log filter, added to whatever `RUST_LOG` selects.
const LOG_DIRECTIVE: &str = "envelope_api=info";

#[derive(Parser)]
#[command(name = "envelope")]
#[command(about = "Send one request to an enveloped API and print the normalized result")]
struct Cli {
    /// Output format: table or json
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Base URL of the API
    #[arg(long, env = "ENVELOPE_BASE_URL")]
    base_url: String,

    /// Bearer token sent as Authorization
    #[arg(long, env = "ENVELOPE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Overall request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    method: String,

    /// Path relative to the base URL
    path: String,

    /// JSON request body
    #[arg(long)]
    data: Option<String>,

    /// Extra header, repeatable
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Idempotency-Key for this request
    #[arg(long)]
    idempotency_key: Option<String>,

    /// X-Request-Id to send instead of a generated one
    #[arg(long)]
    request_id: Option<String>,

    /// Do not send the Authorization header
    #[arg(long)]
    skip_auth: bool,

    /// Do not send an X-Request-Id header
    #[arg(long)]
    no_request_id: bool,

    /// Print only the envelope's data on success
    #[arg(long)]
    unwrap: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {:?}", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn client_options(cli: &Cli) -> ClientOptions {
    let success_body = if cli.unwrap {
        SuccessBody::Data
    } else {
        SuccessBody::Envelope
    };
    let options = ClientOptions::new(cli.base_url.as_str())
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_request_id_injection(!cli.no_request_id)
        .with_success_body(success_body);
    match cli.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => options.with_static_token(token),
        None => options,
    }
}

fn request_options(cli: &Cli) -> RequestOptions {
    let mut request = RequestOptions::new().with_skip_auth(cli.skip_auth);
    if let Some(key) = &cli.idempotency_key {
        request = request.with_idempotency_key(key.as_str());
    }
    if let Some(request_id) = &cli.request_id {
        request = request.with_request_id(request_id.as_str());
    }
    for (name, value) in &cli.headers {
        request = request.with_header(name.as_str(), value.as_str());
    }
    request
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(LOG_DIRECTIVE.parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };

    let method = Method::from_bytes(cli.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method {:?}", cli.method))?;
    let body: Option<Value> = cli
        .data
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("--data is not valid JSON")?;

    let client = Client::new(client_options(&cli))?;

    match client
        .request(method, &cli.path, body.as_ref(), request_options(&cli))
        .await
    {
        Ok(resp) => {
            output::print_response(&resp, &format);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            output::print_error(&err, &format);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers() {
        assert_eq!(
            parse_header("X-Tenant: acme").unwrap(),
            ("X-Tenant".to_string(), "acme".to_string())
        );
        assert_eq!(
            parse_header("X-Empty:").unwrap(),
            ("X-Empty".to_string(), String::new())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn log_directive_parses() {
        let directive: tracing_subscriber::filter::Directive = LOG_DIRECTIVE.parse().unwrap();
        assert_eq!(directive.to_string(), "envelope_api=info");
    }

    #[test]
    fn cli_flags_map_onto_options() {
        let cli = Cli::try_parse_from([
            "envelope",
            "--base-url",
            "https://api.example.com",
            "--token",
            "abc",
            "--unwrap",
            "--no-request-id",
            "--idempotency-key",
            "K",
            "--header",
            "X-Tenant:acme",
            "post",
            "/orders",
        ])
        .unwrap();

        let options = client_options(&cli);
        assert_eq!(options.success_body, SuccessBody::Data);
        assert!(!options.inject_request_id);
        assert_eq!(options.get_token.unwrap()().as_deref(), Some("abc"));

        let request = request_options(&cli);
        assert_eq!(request.idempotency_key.as_deref(), Some("K"));
        assert_eq!(request.headers.get("X-Tenant").map(String::as_str), Some("acme"));
        assert!(!request.skip_auth);
    }
}
