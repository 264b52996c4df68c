use envelope_api::types::{Body, ErrorDetail, Response};
use envelope_api::ApiError;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled, Serialize)]
struct FieldRow {
    #[tabled(rename = "Field")]
    #[serde(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
struct ErrorDetailRow {
    #[tabled(rename = "Code")]
    #[serde(rename = "Code")]
    code: String,
    #[tabled(rename = "Field")]
    #[serde(rename = "Field")]
    field: String,
    #[tabled(rename = "Message")]
    #[serde(rename = "Message")]
    message: String,
    #[tabled(rename = "Expected")]
    #[serde(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Actual")]
    #[serde(rename = "Actual")]
    actual: String,
}

// -- Row builders --

fn row(field: &str, value: impl Into<String>) -> FieldRow {
    FieldRow {
        field: field.to_string(),
        value: value.into(),
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn build_response_rows(resp: &Response) -> Vec<FieldRow> {
    let mut rows = vec![
        row("HTTP", resp.status.as_u16().to_string()),
        row("Request Id", or_dash(resp.request_id.as_deref())),
    ];
    match &resp.body {
        Body::Envelope(envelope) => {
            rows.push(row("Code", envelope.status.code.as_str()));
            rows.push(row("Message", envelope.status.message.as_str()));
            if let Some(pagination) = envelope.meta.as_ref().and_then(|m| m.pagination.as_ref()) {
                rows.push(row(
                    "Page",
                    format!(
                        "{} of {} items",
                        pagination.page.map_or("-".to_string(), |p| p.to_string()),
                        pagination.total.map_or("?".to_string(), |t| t.to_string())
                    ),
                ));
            }
        }
        Body::Data(_) => rows.push(row("Body", "data")),
        Body::Raw(bytes) => rows.push(row("Body", format!("raw, {} bytes", bytes.len()))),
    }
    rows
}

fn build_error_rows(err: &ApiError) -> Vec<FieldRow> {
    vec![
        row("Kind", err.kind.to_string()),
        row("Code", err.code.as_str()),
        row("HTTP", err.http.map_or("-".to_string(), |h| h.to_string())),
        row("Message", err.message.as_str()),
        row("Request Id", or_dash(err.request_id.as_deref())),
        row("Trace Id", or_dash(err.trace_id.as_deref())),
    ]
}

fn build_error_detail_rows(errors: &[ErrorDetail]) -> Vec<ErrorDetailRow> {
    errors
        .iter()
        .map(|e| ErrorDetailRow {
            code: e.code.clone(),
            field: or_dash(e.field.as_deref()),
            message: e.message.clone(),
            expected: or_dash(e.expected.as_deref()),
            actual: or_dash(e.actual.as_deref()),
        })
        .collect()
}

// -- Output --

pub fn print_response(resp: &Response, format: &OutputFormat) {
    match format {
        OutputFormat::Json => match &resp.body {
            Body::Envelope(envelope) => print_json(envelope),
            Body::Data(data) => print_json(data),
            Body::Raw(_) => println!("{}", resp.text().unwrap_or_default()),
        },
        OutputFormat::Table => {
            let mut table = Table::new(build_response_rows(resp));
            table.with(Style::rounded());
            println!("{}", table);
            match &resp.body {
                Body::Raw(_) => println!("{}", resp.text().unwrap_or_default()),
                _ => {
                    if let Some(data) = resp.data() {
                        print_json(data);
                    }
                }
            }
        }
    }
}

pub fn print_error(err: &ApiError, format: &OutputFormat) {
    match format {
        OutputFormat::Json => print_json(err),
        OutputFormat::Table => {
            let mut table = Table::new(build_error_rows(err));
            table.with(Style::rounded());
            println!("{}", table);
            if let Some(errors) = err.errors.as_deref().filter(|e| !e.is_empty()) {
                println!("{}", Table::new(build_error_detail_rows(errors)));
            }
        }
    }
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}
