//! Inventory -> ranking -> selection -> deletion, end to end.
//!
//! Network work goes through [`ChatBackend`], questions through [`Prompter`],
//! so the whole run can be driven by fakes.

use tracing::info;

use crate::{
    config::Config,
    deleter::{DeleteMode, Deleter, DeleterConfig},
    domain::DeletionReport,
    inventory::build_inventory,
    ports::{ChatBackend, Prompter},
    ranking::{rank, RankedGroups},
    selection::{is_confirmed, parse_selection},
    Result,
};

pub const SELECTION_PROMPT: &str = "Enter group numbers to delete messages (e.g., 0 3 5)";
pub const CONFIRM_PROMPT: &str =
    "Are you sure you want to delete all messages from the selected groups? (yes/no)";

#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    pub message_limit: usize,
    pub deleter: DeleterConfig,
    pub mode: DeleteMode,
    pub list_only: bool,
}

impl From<&Config> for RunOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            message_limit: cfg.message_limit,
            deleter: DeleterConfig {
                batch_size: cfg.batch_size,
                max_rate_limit_retries: cfg.max_rate_limit_retries,
            },
            mode: if cfg.dry_run {
                DeleteMode::DryRun
            } else {
                DeleteMode::Live
            },
            list_only: cfg.list_only,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// `list_only` run; nothing was asked or deleted.
    Listed(RankedGroups),
    NothingSelected,
    Cancelled,
    Completed(Vec<DeletionReport>),
}

pub async fn run(
    backend: &dyn ChatBackend,
    prompter: &dyn Prompter,
    opts: RunOptions,
) -> Result<Outcome> {
    let records = build_inventory(
        backend,
        opts.message_limit,
        opts.deleter.max_rate_limit_retries,
    )
    .await?;
    let ranked = rank(records);

    info!("Top groups by message count:");
    for line in ranked.render_lines() {
        info!("{line}");
    }

    if opts.list_only {
        return Ok(Outcome::Listed(ranked));
    }

    let selection = parse_selection(&prompter.line(SELECTION_PROMPT)?, ranked.len())?;
    if selection.is_empty() {
        info!("No groups selected.");
        return Ok(Outcome::NothingSelected);
    }

    if !is_confirmed(&prompter.line(CONFIRM_PROMPT)?) {
        info!("Operation cancelled.");
        return Ok(Outcome::Cancelled);
    }

    let deleter = Deleter::new(backend, opts.deleter, opts.mode);
    let mut reports = Vec::with_capacity(selection.indices().len());
    for &index in selection.indices() {
        // Indices were validated against this listing.
        let Some(group) = ranked.get(index) else {
            continue;
        };
        reports.push(deleter.clean_group(group).await?);
    }

    info!("Done!");
    Ok(Outcome::Completed(reports))
}
