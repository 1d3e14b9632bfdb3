//! `gd request`: describe the backend call for an endpoint without sending it.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use girder_core::api::{
    ApiError, Endpoint, JobApplication, JobPosting, NewsItem, OutboundRequest, RequestBody,
};
use girder_core::session::Session;
use serde::de::DeserializeOwned;

use crate::cmd::open;
use crate::output::{CliError, OutputMode, fail, render, render_error};

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// list-news, list-jobs, create-news, apply-job, employer-post-job, job-apply.
    #[arg(value_parser = parse_endpoint)]
    pub endpoint: Endpoint,

    /// JSON body for POST endpoints.
    #[arg(long)]
    pub body: Option<String>,
}

fn parse_endpoint(raw: &str) -> Result<Endpoint, String> {
    let key = raw.trim().to_ascii_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(key)).map_err(|_| {
        let known: Vec<String> = Endpoint::ALL
            .iter()
            .filter_map(|e| serde_json::to_value(e).ok())
            .filter_map(|v| v.as_str().map(|s| s.replace('_', "-")))
            .collect();
        format!("unknown endpoint '{raw}' (expected one of: {})", known.join(", "))
    })
}

fn parse_body<B: DeserializeOwned>(raw: &str, output: OutputMode) -> Result<B> {
    serde_json::from_str(raw).map_err(|err| {
        let cli = CliError::with_details(
            format!("invalid request body: {err}"),
            "pass a JSON object with the endpoint's camelCase fields",
            "invalid_body",
        );
        if let Err(render_err) = render_error(output, &cli) {
            tracing::warn!(error = %render_err, "failed to render error");
        }
        anyhow::anyhow!("invalid request body: {err}")
    })
}

fn with_body<B: RequestBody + DeserializeOwned>(
    endpoint: Endpoint,
    session: &Session,
    raw: &str,
    output: OutputMode,
) -> Result<OutboundRequest> {
    let body: B = parse_body(raw, output)?;
    OutboundRequest::with_body(endpoint, session, Utc::now(), &body).map_err(|e| fail(output, &e))
}

/// Execute `gd request`.
///
/// # Errors
///
/// No active session, a missing or malformed body, or a blank required field.
pub fn run_request(args: &RequestArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = open(project_root, output)?;
    let _lock = project.lock()?;
    let mut store = project.load_store()?;
    let session = project.active_session(&mut store, Utc::now())?;

    let request = match (args.endpoint, args.body.as_deref()) {
        (Endpoint::ListNews | Endpoint::ListJobs, None) => {
            OutboundRequest::get(args.endpoint, &session, Utc::now()).map_err(|e| fail(output, &e))?
        }
        (endpoint @ (Endpoint::ListNews | Endpoint::ListJobs), Some(_)) => {
            return Err(fail(output, &ApiError::UnexpectedBody { endpoint }));
        }
        (_, None) => return Err(fail(output, &ApiError::MissingField { field: "body" })),
        (Endpoint::CreateNews, Some(raw)) => {
            with_body::<NewsItem>(Endpoint::CreateNews, &session, raw, output)?
        }
        (Endpoint::EmployerPostJob, Some(raw)) => {
            with_body::<JobPosting>(Endpoint::EmployerPostJob, &session, raw, output)?
        }
        (endpoint @ (Endpoint::ApplyJob | Endpoint::JobApply), Some(raw)) => {
            with_body::<JobApplication>(endpoint, &session, raw, output)?
        }
    };

    render(output, &request, |r, w| {
        writeln!(w, "{} {}", r.method, r.path)?;
        writeln!(w, "Authorization: {}", r.authorization)?;
        if let Some(body) = &r.body {
            writeln!(w)?;
            writeln!(w, "{}", serde_json::to_string_pretty(body).unwrap_or_default())?;
        }
        Ok(())
    })
}
