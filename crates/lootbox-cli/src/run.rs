//! Wiring and execution of one invocation

use crate::cli::CliArgs;
use anyhow::Context;
use lootbox_chain::ChainAdapterError;
use lootbox_core::{
    ConfigError, MintPipeline, PipelineConfig, PipelineDeps, PipelineError, Preflight, RunPlan,
    RunReport, RunRequest, Secrets,
};
use lootbox_ipfs::IpfsError;
use std::sync::Arc;

/// Exit codes
pub(crate) const EXIT_SUCCESS: i32 = 0;
pub(crate) const EXIT_FAILURE: i32 = 1;
pub(crate) const EXIT_USAGE: i32 = 2;

/// Process exit code for a failed invocation
pub(crate) fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.is::<ConfigError>() {
            return EXIT_USAGE;
        }
        if let Some(e) = cause.downcast_ref::<PipelineError>() {
            return match e {
                PipelineError::Config(_) => EXIT_USAGE,
                _ => EXIT_FAILURE,
            };
        }
        if let Some(e) = cause.downcast_ref::<IpfsError>() {
            return match e {
                IpfsError::InvalidUrl { .. } | IpfsError::MissingToken { .. } => EXIT_USAGE,
                _ => EXIT_FAILURE,
            };
        }
        if let Some(e) = cause.downcast_ref::<ChainAdapterError>() {
            return match e {
                ChainAdapterError::Config(_)
                | ChainAdapterError::InvalidKey(_)
                | ChainAdapterError::InvalidEndpoint { .. } => EXIT_USAGE,
                _ => EXIT_FAILURE,
            };
        }
    }
    EXIT_FAILURE
}

/// Load the file, overlay the environment, then apply command-line overrides
pub(crate) fn load_config<F>(args: &CliArgs, lookup: F) -> anyhow::Result<PipelineConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = PipelineConfig::load(&args.config)?;
    config.apply_env(lookup)?;
    if let Some(discipline) = args.discipline {
        config.mint.discipline = discipline;
    }
    if let Some(ext) = &args.asset_ext {
        config.mint.asset_extension = ext.trim_start_matches('.').to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Outcome printed on success
#[derive(Debug)]
pub(crate) enum Outcome {
    Planned(RunPlan),
    Completed(Box<RunReport>),
}

pub(crate) async fn execute(args: &CliArgs) -> anyhow::Result<Outcome> {
    let env = |key: &str| std::env::var(key).ok();
    let config = load_config(args, env)?;
    let request = RunRequest::new(&args.handle, &args.asset_dir, &args.metadata_dir);

    if args.dry_run {
        tracing::info!("dry run: pre-flight checks only");
        let plan = Preflight::from_config(&config)?.plan(&request).await?;
        return Ok(Outcome::Planned(plan));
    }

    let secrets = Secrets::from_env(env);
    let store = lootbox_ipfs::connect(&config.storage, &secrets)
        .context("setting up content storage")?;
    let contract = lootbox_chain::connect(&config, &secrets).context("setting up chain access")?;

    let pipeline = MintPipeline::new(
        &config,
        PipelineDeps {
            store,
            contract: Arc::new(contract),
        },
    )?;
    let report = pipeline.run(request).await?;
    Ok(Outcome::Completed(Box::new(report)))
}

/// Render the outcome for stdout
pub(crate) fn render(outcome: &Outcome, json: bool) -> anyhow::Result<String> {
    match outcome {
        Outcome::Planned(plan) if json => Ok(serde_json::to_string_pretty(&plan_json(plan))?),
        Outcome::Completed(report) if json => Ok(serde_json::to_string_pretty(report)?),
        Outcome::Planned(plan) => Ok(plan_text(plan)),
        Outcome::Completed(report) => Ok(report_text(report)),
    }
}

fn plan_json(plan: &RunPlan) -> serde_json::Value {
    let tokens: Vec<_> = plan
        .tokens
        .tokens()
        .iter()
        .map(|id| {
            serde_json::json!({
                "token_id": id,
                "asset": plan.tokens.asset_name(id),
                "metadata": plan.tokens.metadata_name(id),
            })
        })
        .collect();
    serde_json::json!({
        "dry_run": true,
        "recipient": plan.recipient,
        "tokens": tokens,
    })
}

fn plan_text(plan: &RunPlan) -> String {
    let mut out = format!(
        "Dry run: {} token(s) for {} ({})\n",
        plan.tokens.len(),
        plan.recipient.handle,
        plan.recipient.address
    );
    for id in plan.tokens.tokens() {
        out.push_str(&format!(
            "  {id}: {} -> {}\n",
            plan.tokens.asset_name(id),
            plan.tokens.metadata_name(id)
        ));
    }
    out
}

fn report_text(report: &RunReport) -> String {
    let mut out = format!(
        "Run {}: minted {}/{} token(s) to {} ({})\n",
        report.run_id,
        report.confirmed(),
        report.tokens.len(),
        report.recipient.handle,
        report.recipient.address
    );
    out.push_str(&format!("  assets:   {}\n", report.assets.base_uri));
    out.push_str(&format!("  metadata: {}\n", report.metadata.base_uri));
    for receipt in &report.receipts {
        out.push_str(&format!(
            "  {} {} {}\n",
            receipt.token_id, receipt.tx, receipt.token_uri
        ));
    }
    if let Some(before) = report.balance_before.recipient_tokens {
        let after = report
            .balance_after
            .recipient_tokens
            .map_or_else(|| "?".to_string(), |b| b.to_string());
        out.push_str(&format!("  recipient balance: {before} -> {after}\n"));
    }
    out
}
