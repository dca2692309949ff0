// src/session.rs

use crate::api::{AnalysisService, ApiError};
use crate::config::Questionnaire;
use crate::ingest::{ParsedTable, RawFile, parse_table};
use crate::report::{CanonicalReport, ReportError, normalize_report};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("File selection changed while the analysis was running")]
    Superseded,

    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Handed out per file selection. Only the newest ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket(u64);

#[derive(Default)]
struct SessionState {
    /// Ticket of the selection currently shown.
    ticket: u64,
    file: Option<RawFile>,
    table: Option<ParsedTable>,
    response: Option<Value>,
    report: Option<CanonicalReport>,
}

/// Current file, preview and report of one analyze flow.
///
/// Every piece of state is replaced wholesale. A read or analysis that
/// finishes after a newer selection was made is dropped.
pub struct Session {
    generation: AtomicU64,
    state: Mutex<SessionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn begin_selection(&self) -> SelectionTicket {
        SelectionTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: SelectionTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Store a parsed file unless a newer selection exists. Returns whether
    /// the result was kept.
    pub async fn commit_table(
        &self,
        ticket: SelectionTicket,
        file: RawFile,
        table: ParsedTable,
    ) -> bool {
        let mut state = self.state.lock().await;
        if !self.is_current(ticket) {
            info!(file = %file.name, ticket = ticket.0, "Dropping superseded selection");
            return false;
        }

        info!(file = %file.name, rows = table.len(), format = table.format(), "Selection committed");
        *state = SessionState {
            ticket: ticket.0,
            file: Some(file),
            table: Some(table),
            response: None,
            report: None,
        };
        true
    }

    /// Read and parse a file as a new selection. `None` means a newer
    /// selection won while this one was loading.
    pub async fn select_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Option<ParsedTable>, SessionError> {
        let ticket = self.begin_selection();
        let file = match RawFile::load(path).await {
            Ok(file) => file,
            Err(e) => {
                self.clear_for(ticket).await;
                return Err(e.into());
            }
        };
        let table = parse_table(&file.text);

        if self.commit_table(ticket, file, table.clone()).await {
            Ok(Some(table))
        } else {
            Ok(None)
        }
    }

    /// Upload the selected file, run the analysis and keep the normalized
    /// report.
    pub async fn analyze<S>(
        &self,
        service: &S,
        questionnaire: &Questionnaire,
    ) -> Result<CanonicalReport, SessionError>
    where
        S: AnalysisService + ?Sized,
    {
        let (ticket, file) = {
            let state = self.state.lock().await;
            let file = state.file.clone().ok_or(SessionError::NoFileSelected)?;
            (SelectionTicket(state.ticket), file)
        };
        if !self.is_current(ticket) {
            warn!(file = %file.name, "Selection changed before upload");
            return Err(SessionError::Superseded);
        }

        let receipt = service.upload(&file).await?;
        let response = service.analyze(&receipt.upload_id, questionnaire).await?;
        let report = normalize_report(&response)?;

        let mut state = self.state.lock().await;
        if !self.is_current(ticket) {
            warn!(file = %file.name, "Discarding report for a superseded selection");
            return Err(SessionError::Superseded);
        }

        let (passed, total) = report.rule_tally();
        info!(
            overall = report.overall_score,
            rules_passed = passed,
            rules_total = total,
            "Analysis complete"
        );
        state.response = Some(response);
        state.report = Some(report.clone());
        Ok(report)
    }

    /// Start over: forget file, preview and report, and supersede anything
    /// still in flight.
    pub async fn restart(&self) {
        let mut state = self.state.lock().await;
        let ticket = self.begin_selection();
        *state = SessionState {
            ticket: ticket.0,
            ..SessionState::default()
        };
        info!("Session restarted");
    }

    /// A selection that failed to load still replaces the previous one.
    async fn clear_for(&self, ticket: SelectionTicket) {
        let mut state = self.state.lock().await;
        if self.is_current(ticket) {
            *state = SessionState {
                ticket: ticket.0,
                ..SessionState::default()
            };
        }
    }

    pub async fn file_name(&self) -> Option<String> {
        self.state.lock().await.file.as_ref().map(|f| f.name.clone())
    }

    pub async fn table(&self) -> Option<ParsedTable> {
        self.state.lock().await.table.clone()
    }

    pub async fn report(&self) -> Option<CanonicalReport> {
        self.state.lock().await.report.clone()
    }

    /// The analysis response exactly as the server sent it.
    pub async fn raw_response(&self) -> Option<Value> {
        self.state.lock().await.response.clone()
    }
}
