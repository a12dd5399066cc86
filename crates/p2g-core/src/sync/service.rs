//! The download → convert → upload pipeline

use std::path::PathBuf;

use chrono::Utc;

use super::{BoxedConverter, SyncStatusStore, UploadError, WorkoutDownloader, WorkoutUploader};
use crate::models::{SyncResult, SyncStage, SyncStatus};

/// Runs one sync at a time against injected collaborators.
///
/// Every stage runs only if the previous one succeeded, and the first failure
/// ends the run. Failures never escape [`SyncService::run_sync`]; they are
/// logged and recorded in the returned [`SyncResult`]. The stored
/// [`SyncStatus`] is written only after a fully successful run.
///
/// Callers must not run two syncs concurrently against the same store: the
/// status is read at the start and written at the end of a run.
pub struct SyncService<D, U, S> {
    downloader: D,
    converters: Vec<BoxedConverter>,
    uploader: U,
    store: S,
    output_directory: PathBuf,
}

impl<D, U, S> SyncService<D, U, S>
where
    D: WorkoutDownloader,
    U: WorkoutUploader,
    S: SyncStatusStore,
{
    pub fn new(
        downloader: D,
        converters: Vec<BoxedConverter>,
        uploader: U,
        store: S,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            downloader,
            converters,
            uploader,
            store,
            output_directory: output_directory.into(),
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Run the full pipeline for the latest `num_workouts` workouts.
    pub async fn run_sync(&self, num_workouts: u32) -> SyncResult {
        tracing::debug!(num_workouts, "Starting sync run");
        let mut result = SyncResult::new();
        let mut status = self.load_status().await;

        tracing::info!(num_workouts, "Downloading latest workouts");
        if let Err(error) = self.downloader.download_latest(num_workouts).await {
            tracing::error!(%error, "Failed to download workouts");
            result.mark_failed(SyncStage::Download);
            return result;
        }
        result.mark_succeeded(SyncStage::Download);

        tracing::info!(converters = self.converters.len(), "Converting workouts");
        for converter in &self.converters {
            tracing::debug!(converter = converter.name(), "Running converter");
            if let Err(error) = converter.convert() {
                tracing::error!(
                    converter = converter.name(),
                    %error,
                    "Failed to convert workouts to FIT format"
                );
                result.mark_failed(SyncStage::Convert);
                return result;
            }
        }
        result.mark_succeeded(SyncStage::Convert);

        tracing::info!("Uploading converted workouts");
        if let Err(error) = self.uploader.upload_all().await {
            self.log_upload_failure(&error);
            result.mark_failed(SyncStage::Upload);
            return result;
        }
        result.mark_succeeded(SyncStage::Upload);

        status.record_success(Utc::now());
        self.save_status(&status).await;

        result.finish();
        tracing::info!(num_workouts, "Sync completed");
        result
    }

    async fn load_status(&self) -> SyncStatus {
        match self.store.read_status().await {
            Ok(status) => status,
            Err(error) => {
                tracing::warn!(%error, "Failed to read sync status, continuing from defaults");
                SyncStatus::default()
            }
        }
    }

    async fn save_status(&self, status: &SyncStatus) {
        // The run itself succeeded; the next successful run rewrites the row.
        if let Err(error) = self.store.write_status(status).await {
            tracing::error!(%error, "Failed to persist sync status");
        }
    }

    fn log_upload_failure(&self, error: &UploadError) {
        if !error.is_rejection() {
            tracing::error!(%error, "Unexpected error while uploading workouts");
            return;
        }
        tracing::error!(%error, "Upload tool returned an error code. Failed to upload workouts.");
        tracing::warn!(
            output_directory = %self.output_directory.display(),
            "Upload failed. You can find the converted files at {}. Upload them manually, or wait for the next sync run to try again.",
            self.output_directory.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::SyncFailure;
    use crate::sync::{StageError, WorkoutConverter};
    use crate::{Error, Result};

    const OUTPUT_DIR: &str = "/var/lib/p2g/output";

    #[derive(Clone, Default)]
    struct Calls(Arc<AtomicUsize>);

    impl Calls {
        fn hit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum UploadOutcome {
        Ok,
        Rejected,
        Unexpected,
    }

    struct FakeDownloader {
        calls: Calls,
        requested: Arc<Mutex<Vec<u32>>>,
        fail: bool,
    }

    impl WorkoutDownloader for FakeDownloader {
        async fn download_latest(&self, count: u32) -> std::result::Result<(), StageError> {
            self.calls.hit();
            self.requested.lock().unwrap().push(count);
            if self.fail {
                Err(StageError::Other("rate limited by source platform".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct FakeConverter {
        name: &'static str,
        calls: Calls,
        fail: bool,
    }

    impl WorkoutConverter for FakeConverter {
        fn name(&self) -> &str {
            self.name
        }

        fn convert(&self) -> std::result::Result<(), StageError> {
            self.calls.hit();
            if self.fail {
                Err(StageError::Other("unsupported workout type".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct FakeUploader {
        calls: Calls,
        outcome: UploadOutcome,
    }

    impl WorkoutUploader for FakeUploader {
        async fn upload_all(&self) -> std::result::Result<(), UploadError> {
            self.calls.hit();
            match self.outcome {
                UploadOutcome::Ok => Ok(()),
                UploadOutcome::Rejected => Err(UploadError::Rejected {
                    status: "exit status: 1".to_string(),
                    detail: "authentication failed".to_string(),
                }),
                UploadOutcome::Unexpected => Err(UploadError::Unexpected(StageError::Io(
                    io::Error::new(io::ErrorKind::NotFound, "upload tool not installed"),
                ))),
            }
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        status: Mutex<SyncStatus>,
        reads: Calls,
        writes: Calls,
        written: Arc<Mutex<Vec<SyncStatus>>>,
        fail_read: bool,
        fail_write: bool,
    }

    impl SyncStatusStore for MemoryStore {
        async fn read_status(&self) -> Result<SyncStatus> {
            self.reads.hit();
            if self.fail_read {
                return Err(Error::Database("status table locked".to_string()));
            }
            Ok(*self.status.lock().unwrap())
        }

        async fn write_status(&self, status: &SyncStatus) -> Result<()> {
            self.writes.hit();
            if self.fail_write {
                return Err(Error::Database("disk I/O error".to_string()));
            }
            *self.status.lock().unwrap() = *status;
            self.written.lock().unwrap().push(*status);
            Ok(())
        }
    }

    /// Which collaborator should fail in a test run
    #[derive(Clone, Copy, Debug)]
    enum FailAt {
        Nothing,
        Download,
        Converter(usize),
        Upload(UploadOutcome),
    }

    struct Harness {
        service: SyncService<FakeDownloader, FakeUploader, MemoryStore>,
        download_calls: Calls,
        requested: Arc<Mutex<Vec<u32>>>,
        converter_calls: Vec<Calls>,
        upload_calls: Calls,
        reads: Calls,
        writes: Calls,
        written: Arc<Mutex<Vec<SyncStatus>>>,
    }

    fn harness(fail_at: FailAt, converter_count: usize, store: MemoryStore) -> Harness {
        let download_calls = Calls::default();
        let requested = Arc::new(Mutex::new(Vec::new()));
        let upload_calls = Calls::default();
        let converter_calls: Vec<Calls> = (0..converter_count).map(|_| Calls::default()).collect();

        let converters = converter_calls
            .iter()
            .enumerate()
            .map(|(index, calls)| {
                Box::new(FakeConverter {
                    name: if index == 0 { "fit" } else { "tcx" },
                    calls: calls.clone(),
                    fail: matches!(fail_at, FailAt::Converter(failing) if failing == index),
                }) as BoxedConverter
            })
            .collect();

        let downloader = FakeDownloader {
            calls: download_calls.clone(),
            requested: requested.clone(),
            fail: matches!(fail_at, FailAt::Download),
        };
        let uploader = FakeUploader {
            calls: upload_calls.clone(),
            outcome: match fail_at {
                FailAt::Upload(outcome) => outcome,
                _ => UploadOutcome::Ok,
            },
        };

        let reads = store.reads.clone();
        let writes = store.writes.clone();
        let written = store.written.clone();

        Harness {
            service: SyncService::new(downloader, converters, uploader, store, OUTPUT_DIR),
            download_calls,
            requested,
            converter_calls,
            upload_calls,
            reads,
            writes,
            written,
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    fn assert_consistent(result: &SyncResult) {
        if result.download_succeeded != Some(true) {
            assert_eq!(result.convert_succeeded, None);
            assert_eq!(result.upload_succeeded, None);
        }
        if result.convert_succeeded != Some(true) {
            assert_eq!(result.upload_succeeded, None);
        }
        assert_eq!(
            result.overall_success,
            result.download_succeeded == Some(true)
                && result.convert_succeeded == Some(true)
                && result.upload_succeeded == Some(true)
        );
    }

    #[tokio::test]
    async fn download_failure_skips_remaining_stages() {
        let (logs, _guard) = capture_logs();
        let h = harness(FailAt::Download, 2, MemoryStore::default());

        let result = h.service.run_sync(5).await;

        assert_eq!(
            result,
            SyncResult {
                overall_success: false,
                download_succeeded: Some(false),
                convert_succeeded: None,
                upload_succeeded: None,
                errors: vec![SyncFailure::for_stage(SyncStage::Download)],
            }
        );
        assert_eq!(*h.requested.lock().unwrap(), vec![5]);
        assert!(h.converter_calls.iter().all(|calls| calls.count() == 0));
        assert_eq!(h.upload_calls.count(), 0);
        assert_eq!(h.writes.count(), 0);

        let output = logs.contents();
        assert!(output.contains("Failed to download workouts"));
        assert!(output.contains("rate limited by source platform"));
    }

    #[tokio::test]
    async fn converter_failure_stops_remaining_converters_and_upload() {
        let h = harness(FailAt::Converter(0), 2, MemoryStore::default());

        let result = h.service.run_sync(5).await;

        assert_eq!(
            result,
            SyncResult {
                overall_success: false,
                download_succeeded: Some(true),
                convert_succeeded: Some(false),
                upload_succeeded: None,
                errors: vec![SyncFailure::for_stage(SyncStage::Convert)],
            }
        );
        assert_eq!(h.converter_calls[0].count(), 1);
        assert_eq!(h.converter_calls[1].count(), 0);
        assert_eq!(h.upload_calls.count(), 0);
        assert_eq!(h.writes.count(), 0);
    }

    #[tokio::test]
    async fn later_converter_failure_still_runs_earlier_converters_once() {
        let (logs, _guard) = capture_logs();
        let h = harness(FailAt::Converter(1), 2, MemoryStore::default());

        let result = h.service.run_sync(3).await;

        assert_eq!(result.convert_succeeded, Some(false));
        assert_eq!(h.converter_calls[0].count(), 1);
        assert_eq!(h.converter_calls[1].count(), 1);
        assert_eq!(h.upload_calls.count(), 0);
        assert!(logs.contents().contains("tcx"));
    }

    #[tokio::test]
    async fn upload_rejection_points_operator_at_output_directory() {
        let (logs, _guard) = capture_logs();
        let h = harness(FailAt::Upload(UploadOutcome::Rejected), 1, MemoryStore::default());

        let result = h.service.run_sync(5).await;

        assert_eq!(
            result,
            SyncResult {
                overall_success: false,
                download_succeeded: Some(true),
                convert_succeeded: Some(true),
                upload_succeeded: Some(false),
                errors: vec![SyncFailure::for_stage(SyncStage::Upload)],
            }
        );
        assert_eq!(h.writes.count(), 0);

        let output = logs.contents();
        assert!(output.contains("Upload tool returned an error code"));
        assert!(output.contains("WARN"));
        assert!(output.contains(&format!("You can find the converted files at {OUTPUT_DIR}")));
    }

    #[tokio::test]
    async fn unexpected_upload_error_takes_same_failure_branch() {
        let (logs, _guard) = capture_logs();
        let h = harness(
            FailAt::Upload(UploadOutcome::Unexpected),
            1,
            MemoryStore::default(),
        );

        let result = h.service.run_sync(5).await;

        assert_eq!(result.upload_succeeded, Some(false));
        assert_eq!(result.errors, vec![SyncFailure::for_stage(SyncStage::Upload)]);
        assert!(!result.overall_success);
        assert_eq!(h.writes.count(), 0);

        let output = logs.contents();
        assert!(output.contains("Unexpected error while uploading workouts"));
        assert!(output.contains("upload tool not installed"));
        assert!(!output.contains("You can find the converted files"));
    }

    #[tokio::test]
    async fn full_success_updates_status_exactly_once() {
        let (logs, _guard) = capture_logs();
        let started = Utc::now();
        let h = harness(FailAt::Nothing, 2, MemoryStore::default());

        let result = h.service.run_sync(5).await;

        assert_eq!(
            result,
            SyncResult {
                overall_success: true,
                download_succeeded: Some(true),
                convert_succeeded: Some(true),
                upload_succeeded: Some(true),
                errors: Vec::new(),
            }
        );
        assert_eq!(h.download_calls.count(), 1);
        assert!(h.converter_calls.iter().all(|calls| calls.count() == 1));
        assert_eq!(h.upload_calls.count(), 1);
        assert_eq!(h.reads.count(), 1);
        assert_eq!(h.writes.count(), 1);

        let written = h.written.lock().unwrap();
        let last_sync = written[0].last_sync_time.unwrap();
        let last_success = written[0].last_successful_sync_time.unwrap();
        assert!(last_sync >= started);
        assert!(last_success >= started);
        assert_eq!(last_sync, last_success);

        let output = logs.contents();
        assert!(output.contains("Downloading latest workouts"));
        assert!(output.contains("Converting workouts"));
        assert!(output.contains("Uploading converted workouts"));
    }

    #[tokio::test]
    async fn no_converters_counts_as_successful_conversion() {
        let h = harness(FailAt::Nothing, 0, MemoryStore::default());

        let result = h.service.run_sync(1).await;

        assert!(result.overall_success);
        assert_eq!(result.convert_succeeded, Some(true));
    }

    #[tokio::test]
    async fn status_read_failure_falls_back_to_default_status() {
        let (logs, _guard) = capture_logs();
        let store = MemoryStore {
            fail_read: true,
            ..MemoryStore::default()
        };
        let h = harness(FailAt::Nothing, 1, store);

        let result = h.service.run_sync(5).await;

        assert!(result.overall_success);
        assert_eq!(h.writes.count(), 1);
        assert!(logs.contents().contains("Failed to read sync status"));
    }

    #[tokio::test]
    async fn status_write_failure_does_not_change_result() {
        let (logs, _guard) = capture_logs();
        let store = MemoryStore {
            fail_write: true,
            ..MemoryStore::default()
        };
        let h = harness(FailAt::Nothing, 1, store);

        let result = h.service.run_sync(5).await;

        assert!(result.overall_success);
        assert!(result.errors.is_empty());
        assert_eq!(h.writes.count(), 1);
        assert!(logs.contents().contains("Failed to persist sync status"));
    }

    #[tokio::test]
    async fn failed_run_keeps_previous_status() {
        let previous = SyncStatus {
            last_sync_time: crate::util::datetime_from_millis(1_000),
            last_successful_sync_time: crate::util::datetime_from_millis(1_000),
        };
        let store = MemoryStore {
            status: Mutex::new(previous),
            ..MemoryStore::default()
        };
        let h = harness(FailAt::Upload(UploadOutcome::Rejected), 1, store);

        h.service.run_sync(5).await;

        assert_eq!(*h.service.store().status.lock().unwrap(), previous);
    }

    #[tokio::test]
    async fn every_outcome_respects_stage_invariants() {
        let scenarios = [
            FailAt::Nothing,
            FailAt::Download,
            FailAt::Converter(0),
            FailAt::Converter(1),
            FailAt::Upload(UploadOutcome::Rejected),
            FailAt::Upload(UploadOutcome::Unexpected),
        ];

        for fail_at in scenarios {
            let h = harness(fail_at, 2, MemoryStore::default());
            let result = h.service.run_sync(2).await;

            assert_consistent(&result);
            assert!(result.errors.len() <= 1, "{fail_at:?}");
            assert_eq!(result.errors.is_empty(), result.overall_success, "{fail_at:?}");
            assert_eq!(
                h.writes.count(),
                usize::from(result.overall_success),
                "{fail_at:?}"
            );
        }
    }
}
