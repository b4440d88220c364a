//! Unit tests for the scheduler
//!
//! These tests drive the scheduler with in-memory stub sources and sinks so
//! the concurrency bound and the accounting can be checked without any
//! network. End-to-end tests over HTTP live in the top-level tests directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use crate::app::client::{ByteStream, TransferSource};
use crate::app::models::{Address, CollisionPolicy};
use crate::app::sink::{Sink, SinkWriter};
use crate::errors::{FetchError, FetchResult, SchedulerError, SinkError, SinkResult};

use super::*;

/// Source serving the address's file name as its body
///
/// Addresses whose file name starts with `fail` answer 500; addresses whose
/// file name starts with `hang` never produce a body.
#[derive(Debug, Default)]
pub struct EchoSource {
    pub delay: Duration,
    pub opened: AtomicUsize,
}

impl EchoSource {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            opened: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TransferSource for EchoSource {
    async fn open(&self, address: &Address) -> FetchResult<ByteStream> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let name = address.file_name().unwrap_or_default().to_string();
        if name.starts_with("fail") {
            return Err(FetchError::Status {
                url: address.to_string(),
                status: 500,
            });
        }
        if name.starts_with("hang") {
            return Ok(Box::pin(stream::pending()));
        }
        Ok(Box::pin(stream::iter(vec![Ok(Bytes::from(name))])))
    }
}

/// In-memory sink that tracks how many writers are open at once
#[derive(Debug, Default)]
pub struct MemorySink {
    pub objects: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    pub containers: Mutex<Vec<PathBuf>>,
    pub in_flight: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
    pub writers_created: AtomicUsize,
    pub fail_setup: bool,
    pub write_delay: Duration,
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_container(&self, path: &Path) -> SinkResult<()> {
        if self.fail_setup {
            return Err(SinkError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        let mut containers = self.containers.lock().unwrap();
        if !containers.iter().any(|p| p == path) {
            containers.push(path.to_path_buf());
        }
        Ok(())
    }

    async fn create_writer(&self, path: &Path) -> SinkResult<Box<dyn SinkWriter>> {
        self.writers_created.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(MemoryWriter {
            path: path.to_path_buf(),
            data: Vec::new(),
            objects: Arc::clone(&self.objects),
            in_flight: Arc::clone(&self.in_flight),
            delay: self.write_delay,
        }))
    }
}

struct MemoryWriter {
    path: PathBuf,
    data: Vec<u8>,
    objects: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    in_flight: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl SinkWriter for MemoryWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> SinkResult<()> {
        tokio::time::sleep(self.delay).await;
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    async fn close(self: Box<Self>) -> SinkResult<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(self.path.clone(), self.data.clone());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.data.len() as u64
    }
}

fn addresses(names: &[&str]) -> Vec<Address> {
    names
        .iter()
        .map(|name| Address::new(format!("http://files.test/{}", name)))
        .collect()
}

fn scheduler(concurrency: usize, source: Arc<EchoSource>) -> Scheduler {
    Scheduler::new(RunConfig::default().with_concurrency(concurrency), source)
}

/// Test that in-flight transfers never exceed the concurrency limit
///
/// Runs the same list under several limits with a slow source and sink and
/// records the peak number of writers open at once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_peak_in_flight_never_exceeds_limit() {
    let names: Vec<String> = (0..24).map(|i| format!("file{}.bin", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();

    for limit in [1usize, 3, 8] {
        let source = Arc::new(EchoSource::with_delay(Duration::from_millis(5)));
        let sink = Arc::new(MemorySink {
            write_delay: Duration::from_millis(5),
            ..Default::default()
        });

        let report = scheduler(limit, source)
            .run(&addresses(&names), sink.clone(), Path::new("/out"), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.completed, names.len());
        assert_eq!(report.failed, 0);
        let peak = sink.peak.load(Ordering::SeqCst);
        assert!(peak <= limit, "peak {} exceeded limit {}", peak, limit);
        assert!(peak >= 1);
        assert_eq!(sink.in_flight.load(Ordering::SeqCst), 0);
    }
}

/// Test that every address reports exactly once, failures included
#[tokio::test]
async fn test_completed_equals_list_length() {
    let source = Arc::new(EchoSource::default());
    let sink = Arc::new(MemorySink::default());
    let list = addresses(&["a.txt", "fail-b.txt", "c.txt", "dir/", "fail-e.txt"]);

    let report = scheduler(2, source)
        .run(&list, sink.clone(), Path::new("/out"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total, 5);
    assert_eq!(report.completed, 5);
    assert_eq!(report.failed, 3);
    assert_eq!(report.failures.len(), 3);
    assert!(!report.cancelled);

    let kinds: Vec<&str> = report.failures.iter().map(|f| f.kind.as_str()).collect();
    assert_eq!(kinds.iter().filter(|k| **k == "status").count(), 2);
    assert_eq!(kinds.iter().filter(|k| **k == "fetch").count(), 1);

    let objects = sink.objects.lock().unwrap();
    assert_eq!(objects.get(Path::new("/out/a.txt")).unwrap(), b"a.txt");
    assert_eq!(objects.get(Path::new("/out/c.txt")).unwrap(), b"c.txt");
}

/// Test that a zero concurrency limit is rejected before any I/O
#[tokio::test]
async fn test_zero_concurrency_is_rejected() {
    let source = Arc::new(EchoSource::default());
    let sink = Arc::new(MemorySink::default());

    let result = scheduler(0, source.clone())
        .run(&addresses(&["a.txt"]), sink.clone(), Path::new("/out"), CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SchedulerError::InvalidConcurrency { limit: 0 })));
    assert!(sink.containers.lock().unwrap().is_empty());
    assert_eq!(source.opened.load(Ordering::SeqCst), 0);
}

/// Test that a setup failure dispatches nothing
#[tokio::test]
async fn test_setup_failure_dispatches_nothing() {
    let source = Arc::new(EchoSource::default());
    let sink = Arc::new(MemorySink {
        fail_setup: true,
        ..Default::default()
    });

    let result = scheduler(4, source.clone())
        .run(&addresses(&["a.txt", "b.txt"]), sink.clone(), Path::new("/out"), CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SchedulerError::Setup { .. })));
    assert_eq!(sink.writers_created.load(Ordering::SeqCst), 0);
    assert_eq!(source.opened.load(Ordering::SeqCst), 0);
}

/// Test that the error collision policy rejects the run up front
#[tokio::test]
async fn test_collision_policy_error() {
    let source = Arc::new(EchoSource::default());
    let sink = Arc::new(MemorySink::default());
    let scheduler = Scheduler::new(
        RunConfig::default()
            .with_concurrency(2)
            .with_collision_policy(CollisionPolicy::Error),
        source.clone(),
    );

    let list = vec![
        Address::from("http://one.test/a.txt"),
        Address::from("http://two.test/a.txt"),
    ];
    let result = scheduler
        .run(&list, sink.clone(), Path::new("/out"), CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SchedulerError::TargetCollision { .. })));
    assert_eq!(source.opened.load(Ordering::SeqCst), 0);
}

/// Test that suffix collisions keep every body
#[tokio::test]
async fn test_collision_policy_suffix() {
    let source = Arc::new(EchoSource::default());
    let sink = Arc::new(MemorySink::default());
    let scheduler = Scheduler::new(
        RunConfig::default()
            .with_concurrency(2)
            .with_collision_policy(CollisionPolicy::Suffix),
        source,
    );

    let list = vec![
        Address::from("http://one.test/a.txt"),
        Address::from("http://two.test/a.txt"),
    ];
    let report = scheduler
        .run(&list, sink.clone(), Path::new("/out"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failed, 0);
    let objects = sink.objects.lock().unwrap();
    assert!(objects.contains_key(Path::new("/out/a.txt")));
    assert!(objects.contains_key(Path::new("/out/a.1.txt")));
}

/// Test that cancellation drains every task to a report
///
/// Two transfers hang in flight and the rest wait for permits; after the
/// token is cancelled all of them must report as cancelled.
#[tokio::test]
async fn test_cancellation_drains_run() {
    let source = Arc::new(EchoSource::default());
    let sink = Arc::new(MemorySink::default());
    let cancel = CancellationToken::new();
    let list = addresses(&["hang1", "hang2", "c.txt", "d.txt", "e.txt"]);

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        scheduler(2, source).run(&list, sink.clone(), Path::new("/out"), cancel),
    )
    .await
    .expect("cancelled run should finish")
    .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.completed, 5);
    assert_eq!(report.failed, 5);
    assert!(report.failures.iter().all(|f| f.kind == "cancelled"));
    assert_eq!(sink.in_flight.load(Ordering::SeqCst), 0);
}

/// Test that an external aggregator sees the same numbers as the report
#[tokio::test]
async fn test_external_aggregator_receives_progress() {
    let list = addresses(&["a.txt", "b.txt", "fail-c.txt"]);
    let aggregator = Arc::new(ProgressAggregator::new(list.len()));
    let updates = aggregator.subscribe();

    let report = scheduler(3, Arc::new(EchoSource::default()))
        .with_aggregator(Arc::clone(&aggregator))
        .run(&list, Arc::new(MemorySink::default()), Path::new("/out"), CancellationToken::new())
        .await
        .unwrap();

    let last = *updates.borrow();
    assert_eq!(last.completed, 3);
    assert_eq!(last.failed, report.failed);
    assert_eq!(last.bytes, report.bytes);
    assert_eq!(report.bytes, ("a.txt".len() + "b.txt".len()) as u64);
}
