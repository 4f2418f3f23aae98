use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::reference::{Priority, Project, Tracker};
use crate::domain::ticket::{NewTicket, Ticket};
use crate::error::{AppError, AppResult};
use crate::infra::http::{error_for_response, transport_error};
use crate::services::{SupportDeskService, TokenSource};

const CONNECTION_FAILED: &str = "could not reach the ticket service";

/// Typed client for the support-desk REST API. The bearer token is read from
/// the session per request; nothing about the session is stored here.
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<dyn TokenSource>,
}

impl ApiClient {
    pub fn new(http: Client, base_url: impl Into<String>, session: Arc<dyn TokenSource>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        default_error: &str,
    ) -> AppResult<T> {
        let request = match self.session.current_bearer().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|err| transport_error(err, CONNECTION_FAILED))?;

        if !response.status().is_success() {
            return Err(error_for_response(response, default_error).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|err| AppError::remote(format!("invalid response from the server: {err}")))
    }

    async fn multipart_form(ticket: &NewTicket) -> AppResult<Form> {
        let mut form = Form::new()
            .text("project_id", ticket.project_id.to_string())
            .text("subject", ticket.subject.clone())
            .text("description", ticket.description.clone());

        for (name, value) in [
            ("modulo", &ticket.module),
            ("numero_tramite", &ticket.transaction_number),
            ("identificador_operacion", &ticket.operation_id),
        ] {
            if let Some(value) = value {
                form = form.text(name, value.clone());
            }
        }
        if let Some(tracker_id) = ticket.tracker_id {
            form = form.text("tracker_id", tracker_id.to_string());
        }
        if let Some(priority_id) = ticket.priority_id {
            form = form.text("priority_id", priority_id.to_string());
        }

        for attachment in &ticket.attachments {
            let bytes = tokio::fs::read(&attachment.path).await?;
            let part = Part::bytes(bytes)
                .file_name(attachment.filename.clone())
                .mime_str(&attachment.content_type)
                .map_err(|err| {
                    AppError::Configuration(format!(
                        "invalid content type for '{}': {err}",
                        attachment.filename
                    ))
                })?;
            form = form.part("attachments", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl SupportDeskService for ApiClient {
    async fn projects(&self) -> AppResult<Vec<Project>> {
        let envelope: ProjectsEnvelope = self
            .send_json(
                self.http.get(self.endpoint("/api/projects")),
                "could not load the project list",
            )
            .await?;
        Ok(envelope.projects)
    }

    async fn trackers(&self) -> AppResult<Vec<Tracker>> {
        let envelope: TrackersEnvelope = self
            .send_json(
                self.http.get(self.endpoint("/api/trackers")),
                "could not load the tracker list",
            )
            .await?;
        Ok(envelope.trackers)
    }

    async fn priorities(&self) -> AppResult<Vec<Priority>> {
        let envelope: PrioritiesEnvelope = self
            .send_json(
                self.http.get(self.endpoint("/api/priorities")),
                "could not load the priority list",
            )
            .await?;
        Ok(envelope.issue_priorities)
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> AppResult<Ticket> {
        let form = Self::multipart_form(ticket).await?;
        let envelope: TicketEnvelope = self
            .send_json(
                self.http.post(self.endpoint("/api/tickets")).multipart(form),
                "could not create the ticket",
            )
            .await?;
        Ok(envelope.ticket)
    }

    async fn my_tickets(&self, subject: &str) -> AppResult<Vec<Ticket>> {
        let envelope: IssuesEnvelope = self
            .send_json(
                self.http
                    .get(self.endpoint("/api/tickets/my-tickets"))
                    .query(&[("keycloak_sub", subject)]),
                "could not load your tickets",
            )
            .await?;
        Ok(envelope.issues)
    }

    async fn ticket_detail(&self, id: u64) -> AppResult<Ticket> {
        let envelope: IssueEnvelope = self
            .send_json(
                self.http.get(self.endpoint(&format!("/api/tickets/{id}"))),
                "could not load the ticket detail",
            )
            .await?;
        Ok(envelope.issue)
    }
}

#[derive(Deserialize)]
struct ProjectsEnvelope {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Deserialize)]
struct TrackersEnvelope {
    #[serde(default)]
    trackers: Vec<Tracker>,
}

#[derive(Deserialize)]
struct PrioritiesEnvelope {
    #[serde(default)]
    issue_priorities: Vec<Priority>,
}

#[derive(Deserialize)]
struct TicketEnvelope {
    ticket: Ticket,
}

#[derive(Deserialize)]
struct IssueEnvelope {
    issue: Ticket,
}

#[derive(Deserialize)]
struct IssuesEnvelope {
    #[serde(default)]
    issues: Vec<Ticket>,
}
