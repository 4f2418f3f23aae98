use tokio::try_join;

use crate::cache::Classification;
use crate::domain::draft::TicketDraft;
use crate::domain::reference::ReferenceData;
use crate::domain::ticket::Ticket;
use crate::error::{AppError, AppResult};
use crate::services::SupportDeskService;

#[derive(Debug)]
pub struct SubmissionOutcome {
    pub ticket: Ticket,
    pub classification: Classification,
}

/// The three reference lists load concurrently; each call still fails on its
/// own terms.
pub async fn load_reference_data(desk: &dyn SupportDeskService) -> AppResult<ReferenceData> {
    let (projects, trackers, priorities) =
        try_join!(desk.projects(), desk.trackers(), desk.priorities())?;
    Ok(ReferenceData {
        projects,
        trackers,
        priorities,
    })
}

/// Validates and posts a draft. Validation failure never reaches the
/// network; a rejected submission keeps the draft intact for correction,
/// a successful one resets it apart from the classification fields.
pub async fn submit_ticket(
    desk: &dyn SupportDeskService,
    draft: &mut TicketDraft,
    reference: &ReferenceData,
) -> AppResult<SubmissionOutcome> {
    let new_ticket = draft.validate(reference).map_err(AppError::Validation)?;

    if !draft.begin_submission() {
        return Err(AppError::warning("a submission is already in progress"));
    }

    match desk.create_ticket(&new_ticket).await {
        Ok(ticket) => {
            let classification = Classification {
                project_id: Some(new_ticket.project_id),
                tracker_id: new_ticket.tracker_id,
                priority_id: new_ticket.priority_id,
            };
            draft.reset_after_submit();
            Ok(SubmissionOutcome {
                ticket,
                classification,
            })
        }
        Err(err) => {
            draft.finish_submission();
            Err(err)
        }
    }
}
