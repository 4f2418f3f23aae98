use std::path::PathBuf;

use clap::Args;

use crate::cache::ClassificationCache;
use crate::context::AppContext;
use crate::domain::draft::TicketDraft;
use crate::error::AppResult;
use crate::session::require_session;
use crate::workflow::submit::{load_reference_data, submit_ticket};

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// Project id or name; defaults to the last-used project.
    #[arg(short, long)]
    pub project: Option<String>,
    /// Short summary of the problem.
    #[arg(short, long)]
    pub subject: Option<String>,
    /// Full description of the problem or request.
    #[arg(short, long)]
    pub description: Option<String>,
    /// Affected module, free text.
    #[arg(long)]
    pub module: Option<String>,
    /// Related transaction number.
    #[arg(long)]
    pub transaction: Option<String>,
    /// Related operation identifier.
    #[arg(long)]
    pub operation: Option<String>,
    /// Tracker id; defaults to the support tracker.
    #[arg(long)]
    pub tracker: Option<u32>,
    /// Priority id; defaults to the normal priority.
    #[arg(long)]
    pub priority: Option<u32>,
    /// File to attach; may be repeated.
    #[arg(long = "attach", value_name = "FILE")]
    pub attachments: Vec<PathBuf>,
}

pub async fn run(ctx: &AppContext, args: SubmitArgs) -> AppResult<()> {
    require_session(&ctx.session).await?;

    let reference = load_reference_data(ctx.support_desk.as_ref()).await?;
    let mut cache = ClassificationCache::load()?;
    let remembered = cache.get().clone();

    let mut draft = TicketDraft::new();
    draft.project = args
        .project
        .or_else(|| remembered.project_id.map(|id| id.to_string()))
        .unwrap_or_default();
    draft.subject = args.subject.unwrap_or_default();
    draft.description = args.description.unwrap_or_default();
    draft.module = args.module.unwrap_or_default();
    draft.transaction_number = args.transaction.unwrap_or_default();
    draft.operation_id = args.operation.unwrap_or_default();
    draft.tracker_id = args
        .tracker
        .or(remembered.tracker_id)
        .or_else(|| reference.default_tracker().map(|tracker| tracker.id));
    draft.priority_id = args
        .priority
        .or(remembered.priority_id)
        .or_else(|| reference.default_priority().map(|priority| priority.id));
    for path in args.attachments {
        draft.attach(path)?;
    }

    let outcome = submit_ticket(ctx.support_desk.as_ref(), &mut draft, &reference).await?;

    cache.remember(outcome.classification);
    cache.save()?;

    println!(
        "Ticket #{} created: {}",
        outcome.ticket.id, outcome.ticket.subject
    );
    Ok(())
}
