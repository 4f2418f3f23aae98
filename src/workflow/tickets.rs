use crate::domain::ticket::Ticket;
use crate::error::{AppError, AppResult};
use crate::services::SupportDeskService;

/// The tickets belonging to the given identity, in server order.
pub async fn my_tickets(desk: &dyn SupportDeskService, subject: &str) -> AppResult<Vec<Ticket>> {
    desk.my_tickets(subject).await
}

/// Full detail for one ticket. Independent of the list fetch; a failure
/// here never affects an already loaded list.
pub async fn ticket_detail(desk: &dyn SupportDeskService, id: u64) -> AppResult<Ticket> {
    let ticket = desk.ticket_detail(id).await?;
    if ticket.id != id {
        return Err(AppError::remote(format!(
            "the server returned ticket #{} for request #{id}",
            ticket.id
        )));
    }
    Ok(ticket)
}
