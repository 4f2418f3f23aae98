use async_trait::async_trait;

use crate::domain::reference::{Priority, Project, Tracker};
use crate::domain::ticket::{NewTicket, Ticket};
use crate::error::AppResult;

/// The remote ticket service backed by Redmine.
#[async_trait]
pub trait SupportDeskService: Send + Sync {
    async fn projects(&self) -> AppResult<Vec<Project>>;
    async fn trackers(&self) -> AppResult<Vec<Tracker>>;
    async fn priorities(&self) -> AppResult<Vec<Priority>>;
    async fn create_ticket(&self, ticket: &NewTicket) -> AppResult<Ticket>;
    async fn my_tickets(&self, subject: &str) -> AppResult<Vec<Ticket>>;
    async fn ticket_detail(&self, id: u64) -> AppResult<Ticket>;
}
