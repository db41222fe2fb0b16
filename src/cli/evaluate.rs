use std::process::ExitCode;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Args;
use coursegate_core_types::Role;
use coursegate_validation_chain::decision::Decision;
use coursegate_validation_chain::{PipelineKind, ValidationRequest};
use serde_json::Value;
use tracing::info;

use super::runtime::build_service;
use crate::config::Config;

/// Exit status reported when the pipeline rejects the request.
pub const REJECTED_EXIT: u8 = 2;

#[derive(Args, Clone, Debug)]
pub struct EvaluateArgs {
    /// Pipeline to run: general, courseAuthoring or courseListing
    #[arg(short, long, default_value = "general")]
    pub pipeline: PipelineKind,

    /// Subject token (an optional `Bearer ` prefix is stripped)
    #[arg(short, long)]
    pub token: String,

    /// Logical resource, e.g. course.create
    #[arg(short, long)]
    pub resource: String,

    /// Action verb, e.g. create, enroll, list
    #[arg(short, long)]
    pub action: String,

    /// Preset the subject role instead of taking it from the directory
    #[arg(long)]
    pub role: Option<Role>,

    /// Request metadata as key=value; values are read as JSON when they parse
    #[arg(short, long = "meta", value_name = "KEY=VALUE")]
    pub meta: Vec<String>,

    /// Evaluate as if today were this date (YYYY-MM-DD)
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Correlation id for the request
    #[arg(long)]
    pub request_id: Option<String>,

    /// Output JSON instead of a human summary
    #[arg(long)]
    pub json: bool,
}

pub async fn cmd_evaluate(args: EvaluateArgs, config: &Config) -> Result<ExitCode> {
    let service = build_service(config, args.today).await?;
    let request = build_request(&args)?;
    info!(
        pipeline = %args.pipeline,
        request_id = request.request_id(),
        "evaluating request"
    );

    let done = service.evaluate(args.pipeline, request).await?;
    let decision = Decision::from_request(&done);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decision.to_json())?);
    } else {
        print_human(args.pipeline, &decision);
    }

    Ok(if decision.approved {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(REJECTED_EXIT)
    })
}

pub fn build_request(args: &EvaluateArgs) -> Result<ValidationRequest> {
    let mut request = ValidationRequest::new(
        args.token.as_str(),
        args.resource.as_str(),
        args.action.as_str(),
    );
    if let Some(id) = &args.request_id {
        request = request.with_request_id(id.as_str());
    }
    if let Some(role) = args.role {
        request = request.with_role(role);
    }
    for entry in &args.meta {
        let (key, value) = parse_meta(entry)?;
        request.insert_meta(&key, value);
    }
    Ok(request)
}

pub fn parse_meta(entry: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = entry.split_once('=') else {
        bail!("metadata '{entry}' must look like key=value");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("metadata '{entry}' has an empty key");
    }
    let raw = raw.trim();
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn print_human(pipeline: PipelineKind, decision: &Decision) {
    if decision.approved {
        println!("APPROVED [{}] request {}", pipeline, decision.request_id);
    } else {
        println!(
            "REJECTED [{}] request {} (status {})",
            pipeline, decision.request_id, decision.status
        );
        if let (Some(code), Some(message)) = (&decision.code, &decision.message) {
            println!("  {code}: {message}");
        }
    }
    for (key, value) in &decision.metadata {
        match value {
            Value::String(text) => println!("  {key} = {text}"),
            other => println!("  {key} = {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn meta_values_prefer_json() {
        assert_eq!(parse_meta("courseId=12").unwrap(), ("courseId".into(), json!(12)));
        assert_eq!(
            parse_meta("periodRequested=January-June 2026").unwrap(),
            ("periodRequested".into(), json!("January-June 2026"))
        );
        assert_eq!(
            parse_meta("ownerIdRequested=\"9\"").unwrap(),
            ("ownerIdRequested".into(), json!("9"))
        );
        assert!(parse_meta("nonsense").is_err());
        assert!(parse_meta("=3").is_err());
    }
}
