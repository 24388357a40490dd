// ⏳ Automation Pacing - Simulated latency before batch automations
//
// The delay carries no correctness meaning; it only paces the demo.
// While an automation is pending, a second run of the SAME automation is
// rejected. Different automations may overlap; the snapshot owner applies
// them one at a time.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{CloseError, Result};
use crate::reducer::{Action, AutomationKind, Outcome};
use crate::session::Session;

// ============================================================================
// IN-FLIGHT GUARD
// ============================================================================

#[derive(Debug, Default)]
pub struct InFlight {
    running: Mutex<HashSet<AutomationKind>>,
}

/// Held while an automation is pending; releases its slot on drop
#[derive(Debug)]
pub struct InFlightTicket<'a> {
    owner: &'a InFlight,
    kind: AutomationKind,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, kind: AutomationKind) -> Result<InFlightTicket<'_>> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if !running.insert(kind) {
            debug!(automation = kind.as_str(), "automation already in flight");
            return Err(CloseError::AutomationInFlight(kind.to_string()));
        }

        Ok(InFlightTicket { owner: self, kind })
    }

    pub fn is_running(&self, kind: AutomationKind) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&kind)
    }
}

impl Drop for InFlightTicket<'_> {
    fn drop(&mut self) {
        self.owner
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.kind);
    }
}

// ============================================================================
// RUNNER
// ============================================================================

#[derive(Debug, Clone)]
pub struct AutomationRunner {
    pub delay: Duration,
}

impl AutomationRunner {
    pub fn new(delay: Duration) -> Self {
        AutomationRunner { delay }
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self::new(config.automation_delay)
    }

    /// Blocking variant for the terminal dashboard
    pub fn run_blocking(
        &self,
        in_flight: &InFlight,
        kind: AutomationKind,
        session: &mut Session,
    ) -> Result<Outcome> {
        let _ticket = in_flight.begin(kind)?;
        info!(automation = kind.as_str(), delay_ms = self.delay.as_millis() as u64, "automation started");

        std::thread::sleep(self.delay);
        Ok(session.apply(&Action::Automation { kind }))
    }

    /// Async variant for the API server.
    ///
    /// The session lock is not held during the delay, so other requests
    /// against the same session are not blocked while the automation waits.
    /// A task list switched in the meantime cancels the run.
    #[cfg(feature = "server")]
    pub async fn run(
        &self,
        in_flight: &InFlight,
        kind: AutomationKind,
        session: &tokio::sync::Mutex<Session>,
    ) -> Result<Outcome> {
        let _ticket = in_flight.begin(kind)?;
        let started_on = session.lock().await.task_list_id().to_string();
        info!(
            automation = kind.as_str(),
            task_list = %started_on,
            delay_ms = self.delay.as_millis() as u64,
            "automation started"
        );

        tokio::time::sleep(self.delay).await;
        let mut session = session.lock().await;
        if session.task_list_id() != started_on {
            tracing::warn!(
                automation = kind.as_str(),
                started_on = %started_on,
                task_list = session.task_list_id(),
                "task list changed during automation, skipped"
            );
            return Ok(Outcome::Unchanged);
        }

        Ok(session.apply(&Action::Automation { kind }))
    }
}

impl Default for AutomationRunner {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_AUTOMATION_DELAY_MS))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::issue("sarah", "secret", chrono::Duration::minutes(5), "AFC-1").unwrap()
    }

    #[test]
    fn test_same_automation_rejected_while_in_flight() {
        let in_flight = InFlight::new();
        let ticket = in_flight.begin(AutomationKind::IntercompanyMatch).unwrap();

        assert!(in_flight.is_running(AutomationKind::IntercompanyMatch));
        assert_eq!(
            in_flight.begin(AutomationKind::IntercompanyMatch).err(),
            Some(CloseError::AutomationInFlight("intercompany".to_string()))
        );

        // A different automation may start
        assert!(in_flight.begin(AutomationKind::GoldenVendorMapping).is_ok());

        drop(ticket);
        assert!(!in_flight.is_running(AutomationKind::IntercompanyMatch));
        assert!(in_flight.begin(AutomationKind::IntercompanyMatch).is_ok());
    }

    #[test]
    fn test_run_blocking_applies_after_delay() {
        let runner = AutomationRunner::new(Duration::from_millis(5));
        let in_flight = InFlight::new();
        let mut session = session();

        let start = std::time::Instant::now();
        let outcome = runner
            .run_blocking(&in_flight, AutomationKind::NormalizeCostCenters, &mut session)
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(5));
        assert_eq!(outcome, Outcome::Applied);
        assert!(session.snapshot().exception("EXC-003").unwrap().is_resolved());
        assert!(!in_flight.is_running(AutomationKind::NormalizeCostCenters));
    }

    #[cfg(feature = "server")]
    #[tokio::test]
    async fn test_run_async_rejects_overlap() {
        use std::sync::Arc;

        let runner = AutomationRunner::new(Duration::from_millis(50));
        let in_flight = Arc::new(InFlight::new());
        let session = Arc::new(tokio::sync::Mutex::new(session()));

        let first = {
            let (runner, in_flight, session) = (runner.clone(), in_flight.clone(), session.clone());
            tokio::spawn(async move {
                runner
                    .run(&in_flight, AutomationKind::IntercompanyMatch, &session)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = runner
            .run(&in_flight, AutomationKind::IntercompanyMatch, &session)
            .await;
        assert_eq!(
            second,
            Err(CloseError::AutomationInFlight("intercompany".to_string()))
        );

        assert_eq!(first.await.unwrap(), Ok(Outcome::Applied));
        assert_eq!(session.lock().await.snapshot().intercompany_match_rate, 87);
    }

    #[cfg(feature = "server")]
    #[tokio::test]
    async fn test_run_async_skips_after_task_list_switch() {
        use std::sync::Arc;

        let runner = AutomationRunner::new(Duration::from_millis(50));
        let in_flight = Arc::new(InFlight::new());
        let session = Arc::new(tokio::sync::Mutex::new(session()));

        let pending = {
            let (runner, in_flight, session) = (runner.clone(), in_flight.clone(), session.clone());
            tokio::spawn(async move {
                runner
                    .run(&in_flight, AutomationKind::IntercompanyMatch, &session)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        session.lock().await.select_task_list("AFC-2").unwrap();

        assert_eq!(pending.await.unwrap(), Ok(Outcome::Unchanged));
        let session = session.lock().await;
        assert_eq!(session.task_list_id(), "AFC-2");
        assert_eq!(session.snapshot().intercompany_match_rate, 75);
        assert!(!in_flight.is_running(AutomationKind::IntercompanyMatch));
    }
}
