//! Interactive report session.
//!
//! The session owns the one database connection and the query catalog and
//! walks the operator through a loop of states:
//!
//! ```text
//! Select -> Parameterize -> Execute -> ContinueDecision -> Select ...
//!    ^_________(invalid / no data)_|           |
//!                                              +-- "n" -> Finished
//! ```
//!
//! Each call to [`ReportSession::step`] performs one transition, so the loop
//! can be driven from a scripted console in tests.

mod console;

pub use console::{Console, ScriptedConsole, StdConsole};

use crate::catalog::QueryCatalog;
use crate::config::ExportSettings;
use crate::db::DatabaseClient;
use crate::error::Result;
use crate::report::{run_report, ReportOutcome, ReportRequest};
use tracing::{info, warn};

const SELECT_PROMPT: &str = "Select a query by entering its number: ";
const START_DATE_PROMPT: &str = "Enter the start date (YYYY-MM-DD): ";
const END_DATE_PROMPT: &str = "Enter the end date (YYYY-MM-DD): ";
const CONTINUE_PROMPT: &str = "Do you want to execute another report? (y/n): ";

/// Where the session is in its loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Show the menu and read a query number.
    Select,
    /// Read the date range for the query at this catalog index.
    Parameterize { index: usize },
    /// Run the request and export its rows.
    Execute(ReportRequest),
    /// Ask whether to run another report.
    ContinueDecision,
    /// The database session is closed; the loop is over.
    Finished,
}

/// Parses a 1-based menu selection, returning the catalog index.
pub fn parse_selection(input: &str, count: usize) -> Option<usize> {
    let number: usize = input.trim().parse().ok()?;
    (1..=count).contains(&number).then(|| number - 1)
}

/// Returns true if a continue-prompt answer ends the session.
pub fn is_exit_answer(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("n")
}

/// Interactive report session over one open database connection.
pub struct ReportSession {
    db: Box<dyn DatabaseClient>,
    catalog: QueryCatalog,
    settings: ExportSettings,
    state: SessionState,
    closed: bool,
}

impl ReportSession {
    /// Creates a session in the `Select` state.
    pub fn new(db: Box<dyn DatabaseClient>, catalog: QueryCatalog, settings: ExportSettings) -> Self {
        Self {
            db,
            catalog,
            settings,
            state: SessionState::Select,
            closed: false,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns true once the database session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Runs the loop until the operator exits.
    ///
    /// Query errors are reported and the loop continues; any other error is
    /// returned.
    pub async fn run(&mut self, console: &mut dyn Console) -> Result<()> {
        while self.state != SessionState::Finished {
            self.step(console).await?;
        }
        Ok(())
    }

    /// Performs one state transition.
    pub async fn step(&mut self, console: &mut dyn Console) -> Result<()> {
        let current = std::mem::replace(&mut self.state, SessionState::Finished);

        let next = match current {
            SessionState::Select => self.select(console)?,
            SessionState::Parameterize { index } => self.parameterize(index, console)?,
            SessionState::Execute(request) => self.execute(&request, console).await?,
            SessionState::ContinueDecision => self.continue_decision(console)?,
            SessionState::Finished => SessionState::Finished,
        };

        if next == SessionState::Finished {
            self.close().await?;
        }
        self.state = next;
        Ok(())
    }

    /// Closes the database session. Later calls do nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.db.close().await?;
        self.closed = true;
        info!("Database session closed");
        Ok(())
    }

    fn select(&self, console: &mut dyn Console) -> Result<SessionState> {
        console.print("Available queries:");
        for (i, query) in self.catalog.queries().iter().enumerate() {
            console.print(&format!("{}. {}", i + 1, query.description));
        }

        let Some(input) = console.read_line(SELECT_PROMPT)? else {
            return Ok(SessionState::Finished);
        };

        match parse_selection(&input, self.catalog.len()) {
            Some(index) => Ok(SessionState::Parameterize { index }),
            None => {
                console.error("Invalid selection, Try again!");
                Ok(SessionState::Select)
            }
        }
    }

    fn parameterize(&self, index: usize, console: &mut dyn Console) -> Result<SessionState> {
        let Some(query) = self.catalog.queries().get(index) else {
            return Ok(SessionState::Select);
        };

        let Some(start_date) = console.read_line(START_DATE_PROMPT)? else {
            return Ok(SessionState::Finished);
        };
        let Some(end_date) = console.read_line(END_DATE_PROMPT)? else {
            return Ok(SessionState::Finished);
        };

        Ok(SessionState::Execute(ReportRequest::new(
            query.clone(),
            start_date,
            end_date,
        )))
    }

    async fn execute(
        &self,
        request: &ReportRequest,
        console: &mut dyn Console,
    ) -> Result<SessionState> {
        match run_report(self.db.as_ref(), request, &self.settings).await {
            Ok(ReportOutcome::NoData) => {
                console.print("No data returned from the query.");
                Ok(SessionState::Select)
            }
            Ok(ReportOutcome::Written(summary)) => {
                console.success(&format!("Fetched {} rows from the database.", summary.rows));
                if summary.overwrote {
                    console.print(&format!(
                        "Replaced existing file: {}",
                        summary.path.display()
                    ));
                }
                console.success(&format!(
                    "Saved {} rows to CSV file: {}",
                    summary.rows,
                    summary.path.display()
                ));
                console.success(&format!(
                    "Finished saving data to CSV file. Elapsed time: {:.2} seconds.",
                    summary.elapsed.as_secs_f64()
                ));
                Ok(SessionState::ContinueDecision)
            }
            Err(e) if e.is_recoverable() => {
                warn!("Report '{}' failed: {}", request.query.description, e);
                console.error(&format!("Error executing query: {e}"));
                Ok(SessionState::ContinueDecision)
            }
            Err(e) => Err(e),
        }
    }

    fn continue_decision(&self, console: &mut dyn Console) -> Result<SessionState> {
        match console.read_line(CONTINUE_PROMPT)? {
            Some(answer) if !is_exit_answer(&answer) => Ok(SessionState::Select),
            _ => Ok(SessionState::Finished),
        }
    }
}
