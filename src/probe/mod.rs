//! Health probe engine.
//!
//! A probe runs the full lifecycle against a freshly named scratch table:
//!
//! ```text
//! connect → create table → write row → read + verify → delete row → drop table
//! ```
//!
//! Each step runs only if the previous one succeeded. The outcome of every
//! step is recorded in a [`HealthReport`]; the first failure stops the probe
//! and its message becomes the report's `errorMessage`. Nothing is cached
//! between probes.

pub mod ids;

use std::sync::Arc;

use serde::Serialize;

use crate::error::ProbeError;
use crate::store::{Datastore, Session};
use ids::{IdSource, ThreadRngIds};

/// Length of the scratch table name
pub const TABLE_NAME_LENGTH: usize = 10;

/// Length of the scratch row key
pub const KEY_LENGTH: usize = 10;

/// Length of the scratch row value
pub const VALUE_LENGTH: usize = 30;

/// Per-step outcome of one probe.
///
/// Serialized as the body of the health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub connection: bool,
    pub create_table: bool,
    pub delete_table: bool,
    pub create_row: bool,
    pub select_row: bool,
    pub delete_row: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl HealthReport {
    /// True only if every step succeeded.
    pub fn is_healthy(&self) -> bool {
        self.connection
            && self.create_table
            && self.delete_table
            && self.create_row
            && self.select_row
            && self.delete_row
    }

    /// Emit the step breakdown as a single info event.
    pub fn log(&self) {
        tracing::info!(
            connection = self.connection,
            create_table = self.create_table,
            delete_table = self.delete_table,
            create_row = self.create_row,
            select_row = self.select_row,
            delete_row = self.delete_row,
            error = self.error_message.as_deref(),
            "healthCheck"
        );
    }
}

/// Names used by one probe. Never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scratch {
    pub table: String,
    pub key: String,
    pub value: String,
}

impl Scratch {
    pub fn generate(ids: &dyn IdSource) -> Self {
        Self {
            table: ids.identifier(TABLE_NAME_LENGTH),
            key: ids.identifier(KEY_LENGTH),
            value: ids.identifier(VALUE_LENGTH),
        }
    }
}

/// Runs health probes against a datastore.
#[derive(Clone)]
pub struct Probe {
    store: Arc<dyn Datastore>,
    ids: Arc<dyn IdSource>,
}

impl Probe {
    /// Probe with randomly generated scratch identifiers.
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self::with_ids(store, Arc::new(ThreadRngIds))
    }

    pub fn with_ids(store: Arc<dyn Datastore>, ids: Arc<dyn IdSource>) -> Self {
        Self { store, ids }
    }

    /// Run one probe. Never fails; failures are recorded in the report.
    #[tracing::instrument(name = "probe", skip_all, fields(table = tracing::field::Empty))]
    pub async fn run(&self) -> HealthReport {
        let mut report = HealthReport::default();

        let mut session = match self.store.connect().await {
            Ok(session) => session,
            Err(err) => {
                report.error_message = Some(err.to_string());
                return report;
            }
        };
        report.connection = true;

        let scratch = Scratch::generate(self.ids.as_ref());
        tracing::Span::current().record("table", scratch.table.as_str());

        if let Err(err) = run_steps(session.as_mut(), &scratch, &mut report).await {
            report.error_message = Some(err.to_string());
        }

        // The report is already settled; a failed close only affects this connection
        if let Err(err) = session.close().await {
            tracing::warn!(error = %err, "Failed to close datastore connection");
        }

        report
    }
}

/// The five statement steps. Each flag is set only after its step succeeds.
async fn run_steps(
    session: &mut dyn Session,
    scratch: &Scratch,
    report: &mut HealthReport,
) -> Result<(), ProbeError> {
    session.create_namespace(&scratch.table).await?;
    report.create_table = true;

    session
        .set(&scratch.table, &scratch.key, &scratch.value)
        .await?;
    report.create_row = true;

    let got = session.get(&scratch.table, &scratch.key).await?;
    if got != scratch.value {
        return Err(ProbeError::Mismatch {
            got,
            want: scratch.value.clone(),
        });
    }
    report.select_row = true;

    session.delete_key(&scratch.table, &scratch.key).await?;
    report.delete_row = true;

    session.delete_namespace(&scratch.table).await?;
    report.delete_table = true;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::ids::FixedIds;
    use super::*;
    use crate::error::StoreError;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        Connect,
        CreateTable,
        Set,
        Get,
        DeleteKey,
        DropTable,
        Close,
    }

    /// Session that succeeds at every step except `fail_at`.
    #[derive(Clone, Default)]
    struct ScriptedStore {
        fail_at: Option<Step>,
        read_back: Option<String>,
        calls: Arc<Mutex<Vec<Step>>>,
    }

    impl ScriptedStore {
        fn failing_at(step: Step) -> Self {
            Self {
                fail_at: Some(step),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Step> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, step: Step) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(step);
            if self.fail_at == Some(step) {
                return Err(StoreError::NotFound(format!("{step:?}")));
            }
            Ok(())
        }
    }

    struct ScriptedSession {
        script: ScriptedStore,
        written: Option<String>,
    }

    #[async_trait]
    impl Datastore for ScriptedStore {
        async fn connect(&self) -> Result<Box<dyn Session>, StoreError> {
            self.record(Step::Connect)?;
            Ok(Box::new(ScriptedSession {
                script: self.clone(),
                written: None,
            }))
        }
    }

    #[async_trait]
    impl Session for ScriptedSession {
        async fn create_namespace(&mut self, _namespace: &str) -> Result<(), StoreError> {
            self.script.record(Step::CreateTable)
        }

        async fn set(
            &mut self,
            _namespace: &str,
            _key: &str,
            value: &str,
        ) -> Result<(), StoreError> {
            self.script.record(Step::Set)?;
            self.written = Some(value.to_string());
            Ok(())
        }

        async fn get(&mut self, _namespace: &str, _key: &str) -> Result<String, StoreError> {
            self.script.record(Step::Get)?;
            Ok(self
                .script
                .read_back
                .clone()
                .or_else(|| self.written.clone())
                .unwrap_or_default())
        }

        async fn delete_key(&mut self, _namespace: &str, _key: &str) -> Result<(), StoreError> {
            self.script.record(Step::DeleteKey)
        }

        async fn delete_namespace(&mut self, _namespace: &str) -> Result<(), StoreError> {
            self.script.record(Step::DropTable)
        }

        async fn close(&mut self) -> Result<(), StoreError> {
            self.script.record(Step::Close)
        }
    }

    fn probe(store: &ScriptedStore) -> Probe {
        Probe::with_ids(
            Arc::new(store.clone()),
            Arc::new(FixedIds::new(["abc1234567", "k1", "v1"])),
        )
    }

    #[test]
    fn test_report_serializes_with_wire_names() {
        let report = HealthReport {
            connection: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "connection": true,
                "createTable": false,
                "deleteTable": false,
                "createRow": false,
                "selectRow": false,
                "deleteRow": false,
            })
        );
    }

    #[test]
    fn test_report_serializes_error_message_when_present() {
        let report = HealthReport {
            error_message: Some("boom".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["errorMessage"], "boom");
    }

    #[test]
    fn test_is_healthy_requires_every_step() {
        let all = HealthReport {
            connection: true,
            create_table: true,
            delete_table: true,
            create_row: true,
            select_row: true,
            delete_row: true,
            error_message: None,
        };
        assert!(all.is_healthy());
        assert!(!HealthReport {
            delete_table: false,
            ..all.clone()
        }
        .is_healthy());
        assert!(!HealthReport::default().is_healthy());
    }

    #[test]
    fn test_scratch_uses_fixed_lengths() {
        let scratch = Scratch::generate(&ThreadRngIds);
        assert_eq!(scratch.table.len(), TABLE_NAME_LENGTH);
        assert_eq!(scratch.key.len(), KEY_LENGTH);
        assert_eq!(scratch.value.len(), VALUE_LENGTH);
    }

    #[tokio::test]
    async fn test_successful_probe_sets_every_flag() {
        let store = ScriptedStore::default();
        let report = probe(&store).run().await;

        assert!(report.is_healthy());
        assert_eq!(report.error_message, None);
        assert_eq!(
            store.calls(),
            vec![
                Step::Connect,
                Step::CreateTable,
                Step::Set,
                Step::Get,
                Step::DeleteKey,
                Step::DropTable,
                Step::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_connection_failure_stops_everything() {
        let store = ScriptedStore::failing_at(Step::Connect);
        let report = probe(&store).run().await;

        assert_eq!(
            report,
            HealthReport {
                error_message: Some("Connect not found".to_string()),
                ..Default::default()
            }
        );
        assert_eq!(store.calls(), vec![Step::Connect]);
    }

    #[tokio::test]
    async fn test_create_table_failure_skips_later_steps() {
        let store = ScriptedStore::failing_at(Step::CreateTable);
        let report = probe(&store).run().await;

        assert!(report.connection);
        assert!(!report.create_table);
        assert!(!report.create_row && !report.select_row);
        assert!(!report.delete_row && !report.delete_table);
        assert_eq!(report.error_message.as_deref(), Some("CreateTable not found"));
        assert_eq!(
            store.calls(),
            vec![Step::Connect, Step::CreateTable, Step::Close]
        );
    }

    #[tokio::test]
    async fn test_each_failing_step_leaves_later_flags_false() {
        let cases = [
            (Step::Set, 2),
            (Step::Get, 3),
            (Step::DeleteKey, 4),
            (Step::DropTable, 5),
        ];

        for (step, passed) in cases {
            let store = ScriptedStore::failing_at(step);
            let report = probe(&store).run().await;

            let flags = [
                report.connection,
                report.create_table,
                report.create_row,
                report.select_row,
                report.delete_row,
                report.delete_table,
            ];
            let expected: Vec<bool> = (0..6).map(|i| i < passed).collect();
            assert_eq!(flags.to_vec(), expected, "failing at {step:?}");
            assert!(report.error_message.is_some());

            // Nothing after the failing step ran, but the connection was still released
            let calls = store.calls();
            assert_eq!(calls[calls.len() - 2], step);
            assert_eq!(calls.last(), Some(&Step::Close));
        }
    }

    #[tokio::test]
    async fn test_mismatched_read_is_a_verification_failure() {
        let store = ScriptedStore {
            read_back: Some("X".to_string()),
            ..Default::default()
        };
        let report = probe(&store).run().await;

        assert!(report.connection && report.create_table && report.create_row);
        assert!(!report.select_row);
        assert!(!report.delete_row && !report.delete_table);
        assert_eq!(
            report.error_message.as_deref(),
            Some("values do not match: X != v1")
        );
        assert!(!store.calls().contains(&Step::DeleteKey));
    }

    #[tokio::test]
    async fn test_close_failure_does_not_change_report() {
        let store = ScriptedStore::failing_at(Step::Close);
        let report = probe(&store).run().await;
        assert!(report.is_healthy());
        assert_eq!(report.error_message, None);
    }
}
