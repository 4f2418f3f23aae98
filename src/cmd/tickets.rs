use chrono::{DateTime, Utc};
use clap::Args;

use crate::context::AppContext;
use crate::domain::ticket::{NamedRef, Ticket};
use crate::error::{AppError, AppResult};
use crate::session::require_session;
use crate::workflow::tickets;

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Ticket id, as printed by `mesa list`.
    pub id: u64,
}

pub async fn list(ctx: &AppContext) -> AppResult<()> {
    let token = require_session(&ctx.session).await?;
    let subject = token.subject.ok_or_else(|| {
        AppError::Authentication("the session token carries no subject claim".to_string())
    })?;

    let found = tickets::my_tickets(ctx.support_desk.as_ref(), &subject).await?;
    if found.is_empty() {
        println!("No tickets yet. Create one with `mesa submit`.");
        return Ok(());
    }

    for ticket in &found {
        println!(
            "#{:<6} {:<14} {:<10} {}  {}",
            ticket.id,
            label(&ticket.status),
            label(&ticket.priority),
            format_date(ticket.created_on),
            ticket.subject,
        );
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, args: ShowArgs) -> AppResult<()> {
    require_session(&ctx.session).await?;

    let ticket = tickets::ticket_detail(ctx.support_desk.as_ref(), args.id).await?;
    render_detail(&ticket);
    Ok(())
}

fn render_detail(ticket: &Ticket) {
    println!("Ticket #{} - {}", ticket.id, ticket.subject);
    println!("Project:  {}", label(&ticket.project));
    println!("Tracker:  {}", label(&ticket.tracker));
    println!("Status:   {}", label(&ticket.status));
    println!("Priority: {}", label(&ticket.priority));
    println!("Created:  {}", format_date(ticket.created_on));
    println!("Updated:  {}", format_date(ticket.updated_on));

    if let Some(description) = &ticket.description {
        println!("\nDescription:");
        for line in description.lines() {
            println!("  {line}");
        }
    }

    if !ticket.attachments.is_empty() {
        println!("\nAttachments:");
        for attachment in &ticket.attachments {
            match &attachment.content_url {
                Some(url) => println!("  {} ({url})", attachment.filename),
                None => println!("  {}", attachment.filename),
            }
        }
    }

    if !ticket.journals.is_empty() {
        println!("\nHistory:");
        for journal in &ticket.journals {
            let author = journal
                .user
                .as_ref()
                .map(|user| user.name.as_str())
                .unwrap_or("System");
            println!("  {} - {}", author, format_date(journal.created_on));
            if let Some(notes) = &journal.notes {
                for line in notes.lines() {
                    println!("    {line}");
                }
            }
            for detail in &journal.details {
                println!(
                    "    {}: {} -> {}",
                    detail.name,
                    detail.old_value.as_deref().unwrap_or("(empty)"),
                    detail.new_value.as_deref().unwrap_or("(empty)"),
                );
            }
        }
    }
}

fn label(reference: &Option<NamedRef>) -> &str {
    reference.as_ref().map(|r| r.name.as_str()).unwrap_or("-")
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
