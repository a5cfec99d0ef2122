use std::path::Path;

use anyhow::{Context, Result, bail};
use alloy::primitives::U256;
use petalex::actions::ActionList;
use petalex::config::ConnectionArgs;
use petalex::plan::{self, Plan, SubmissionReport};

use super::connect;

/// Entry point for the `plan` command.
pub fn run(path: &Path, execute: bool, conn: &ConnectionArgs) -> Result<()> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let plan = Plan::from_json(&json)?;

    let list = plan.compile().context("compiling plan")?;
    print_preview(&plan, &list)?;

    if !execute {
        return Ok(());
    }
    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(execute_plan(&plan, conn))
}

fn print_preview(plan: &Plan, list: &ActionList) -> Result<()> {
    println!("Steps:");
    for (i, action) in list.iter().enumerate() {
        println!("  {i:>2}. {}", action.display_name);
    }

    println!();
    println!("Balance changes:");
    for change in plan::balance_report(list) {
        println!("  {:<6} {:<6} {:>24}", change.location, change.symbol, change.amount);
    }

    let pulls = list.pull_requirements();
    if !pulls.is_empty() {
        println!();
        println!("Allowances required:");
        for (token, amount) in pulls {
            println!("  {token}  {amount}");
        }
    }

    println!();
    match plan.submission(list)? {
        Some(report) => {
            println!("Submission:");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        None => println!("Submission: none (no position_id in plan)"),
    }
    Ok(())
}

async fn execute_plan(plan: &Plan, conn: &ConnectionArgs) -> Result<()> {
    let (config, mut session) = connect(conn).await?;
    if config.network != plan.network()? {
        bail!("plan targets {} but connected to {}", plan.network()?, config.network);
    }
    if session.position().is_none() {
        match (plan.position_id()?, plan.proxy()?) {
            (Some(id), Some(proxy)) => session.select_position(id, proxy),
            _ => bail!("no position selected: pass --position/--proxy or set them in the plan"),
        }
    }

    let seed = U256::from(rand::random::<u64>());
    plan.apply(&mut session, seed).await.context("loading plan into session")?;
    if !session.can_execute() {
        println!("Nothing to execute.");
        return Ok(());
    }

    session.refresh_allowances().await.context("reading allowances")?;
    while let Some(token) = session.next_unapproved_token() {
        if config.dry_run {
            println!("[dry run] would approve {token}");
            session.set_allowance(token, U256::MAX);
            continue;
        }
        if let Some(tx) = session.approve_next_token().await? {
            println!("Approved {token}: {tx}");
        }
    }

    if config.dry_run {
        if let Some(submission) = session.assemble_submission() {
            let report = SubmissionReport::from(&submission);
            println!("[dry run] would submit:");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        return Ok(());
    }
    match session.execute().await.context("submitting actions")? {
        Some(tx) => println!("Executed: {tx}"),
        None => println!("Nothing submitted."),
    }
    Ok(())
}
