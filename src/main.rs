use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use backoffice_queue::{
    config, ActionBatchResult, ActionExecutor, ActionKind, AdminBackend, BatchApplication,
    EntityId, EntityStatus, Filters, HttpBackend, Resolution, ReviewOutcome, SortKey,
    StatusFilter, Workspace,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the filtered view of an entity kind as JSON lines
    List {
        /// Entity kind, e.g. `listings`, `shops`, `verifications`
        kind: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Run one action over selected entities and report per-id outcomes
    Apply {
        kind: String,
        /// validate, reject, publish, unpublish, block, unblock, delete or restore
        action: ActionKind,
        #[command(flatten)]
        view: ViewArgs,
        /// Select these ids instead of the whole filtered view
        #[arg(long = "id")]
        ids: Vec<String>,
    },
    /// Review the filtered view one item at a time, head first
    Review {
        kind: String,
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, conflicts_with = "reject", required_unless_present = "reject")]
        approve: bool,
        #[arg(long)]
        reject: bool,
        /// Stop after this many items
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, ClapArgs)]
struct ViewArgs {
    /// Status filter; `all` disables it
    #[arg(long)]
    status: Option<StatusFilter>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    search: Option<String>,
    /// Attribute to sort by
    #[arg(long)]
    sort: Option<String>,
    #[arg(long, requires = "sort")]
    desc: bool,
}

impl ViewArgs {
    fn filters(&self) -> Filters {
        Filters {
            status: self.status,
            category: self.category.clone(),
            search: self.search.clone(),
            sort: self.sort.as_deref().map(|attr| {
                if self.desc {
                    SortKey::descending(attr)
                } else {
                    SortKey::ascending(attr)
                }
            }),
        }
    }

    /// Review works the pending queue unless `--status` says otherwise.
    fn review_filters(&self) -> Filters {
        let mut filters = self.filters();
        filters
            .status
            .get_or_insert(StatusFilter::Only(EntityStatus::Pending));
        filters
    }
}

/// `--id` values in first-seen order; repeating an id must not deselect it.
fn unique_ids(ids: Vec<String>) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .map(EntityId::from)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let backend: Arc<dyn AdminBackend> = Arc::new(HttpBackend::from_config(&cfg)?);

    let open = |kind: &str| {
        let executor = ActionExecutor::from_config(backend.clone(), kind, &cfg);
        Workspace::new(backend.clone(), executor, cfg.search_fields())
    };

    match args.command {
        Command::List { kind, view } => {
            let mut ws = open(&kind);
            ws.refresh().await?;
            ws.set_filters(view.filters());
            for entity in ws.visible() {
                println!("{}", serde_json::to_string(entity)?);
            }
            info!(visible = ws.visible().len(), total = ws.store().len(), "listed");
        }
        Command::Apply {
            kind,
            action,
            view,
            ids,
        } => {
            let mut ws = open(&kind);
            ws.refresh().await?;
            ws.set_filters(view.filters());
            if ids.is_empty() {
                ws.select_all_visible();
            } else {
                for id in unique_ids(ids) {
                    ws.toggle(&id)
                        .context("cannot select entity")?;
                }
            }
            if ws.selection().is_empty() {
                warn!("nothing selected");
                return Ok(());
            }
            match ws.run_batch(action).await {
                BatchApplication::Applied(result) => report(&result)?,
                BatchApplication::Discarded => bail!("batch result was discarded"),
            }
        }
        Command::Review {
            kind,
            view,
            approve,
            reject: _,
            limit,
        } => {
            let resolution = if approve {
                Resolution::Approved
            } else {
                Resolution::Rejected
            };
            let mut ws = open(&kind);
            ws.refresh().await?;
            ws.set_filters(view.review_filters());
            ws.load_queue();

            let limit = limit.unwrap_or(usize::MAX);
            let mut done = 0;
            while done < limit && ws.queue().focused().is_some() {
                match ws.resolve_focused(resolution).await? {
                    ReviewOutcome::Resolved { entity, .. } => {
                        println!("{}\t{:?}", entity.id, resolution);
                        done += 1;
                    }
                    ReviewOutcome::Failed(outcome) => {
                        bail!(
                            "review of {} failed: {}",
                            outcome.id,
                            outcome.error_message.unwrap_or_default()
                        );
                    }
                }
            }
            info!(reviewed = done, remaining = ws.queue().items().len(), "review finished");
        }
    }

    Ok(())
}

fn report(result: &ActionBatchResult) -> Result<()> {
    for outcome in &result.outcomes {
        if outcome.succeeded {
            println!("ok\t{}", outcome.id);
        } else {
            println!(
                "failed\t{}\t{}",
                outcome.id,
                outcome.error_message.as_deref().unwrap_or("")
            );
        }
    }
    println!(
        "{}: {} succeeded, {} failed",
        result.kind, result.success_count, result.failure_count
    );
    if result.failure_count > 0 {
        bail!("{} of {} targets failed", result.failure_count, result.outcomes.len());
    }
    Ok(())
}
