use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::gate::ConcurrencyGate;
use super::rate::RateLimiter;
use super::stream::ResultStream;
use super::transport::{HttpTransport, Transport};
use super::worker::Worker;
use crate::config::FetchConfig;
use crate::error::ConfigError;
use crate::models::{LicenseResult, Module};

/// Lifecycle of one dispatch run. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    /// Walking the input, launching a worker per module.
    Dispatching,
    /// Input exhausted or cancelled; waiting on launched workers.
    Draining,
    /// Result stream closed.
    Closed,
}

impl DispatchState {
    pub fn advance(self) -> Self {
        match self {
            DispatchState::Idle => DispatchState::Dispatching,
            DispatchState::Dispatching => DispatchState::Draining,
            DispatchState::Draining | DispatchState::Closed => DispatchState::Closed,
        }
    }
}

/// Bounded-concurrency, rate-limited batch license fetcher.
pub struct Fetcher {
    limiter: Arc<RateLimiter>,
    gate: ConcurrencyGate,
    worker: Worker,
    channel_capacity: usize,
}

impl Fetcher {
    /// Fetcher talking to the configured lookup service over HTTPS.
    pub fn new(config: &FetchConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: &FetchConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        if config.channel_capacity == 0 {
            return Err(ConfigError::Zero("channel_capacity"));
        }

        Ok(Self {
            limiter: Arc::new(RateLimiter::new(config.request_interval())?),
            gate: ConcurrencyGate::new(config.max_concurrent)?,
            worker: Worker::new(transport, config.base_url.clone(), config.debug),
            channel_capacity: config.channel_capacity,
        })
    }

    /// Start looking up `modules` and return the stream their results arrive on.
    ///
    /// Exactly one result is emitted per launched lookup. Cancelling `cancel`
    /// stops new lookups from starting and aborts in-flight requests; the
    /// stream closes once every launched worker has reported.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fetch_licenses(&self, modules: Vec<Module>, cancel: CancellationToken) -> ResultStream {
        info!("Start fetch {} licenses", modules.len());

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let dispatcher = Dispatcher {
            limiter: Arc::clone(&self.limiter),
            gate: self.gate.clone(),
            worker: self.worker.clone(),
            tracker: TaskTracker::new(),
            state: DispatchState::Idle,
        };
        tokio::spawn(dispatcher.run(modules, cancel, tx));

        ResultStream::new(rx)
    }
}

struct Dispatcher {
    limiter: Arc<RateLimiter>,
    gate: ConcurrencyGate,
    worker: Worker,
    tracker: TaskTracker,
    state: DispatchState,
}

impl Dispatcher {
    fn advance(&mut self) {
        let next = self.state.advance();
        debug!(from = ?self.state, to = ?next, "dispatch state");
        self.state = next;
    }

    async fn run(
        mut self,
        modules: Vec<Module>,
        cancel: CancellationToken,
        tx: mpsc::Sender<LicenseResult>,
    ) {
        self.advance();

        let total = modules.len();
        let mut launched = 0usize;
        for module in modules {
            if tx.is_closed() {
                info!(launched, total, "result stream dropped, no further lookups start");
                break;
            }
            if self.limiter.acquire(&cancel).await.is_err() {
                info!(launched, total, "dispatch cancelled, no further lookups start");
                break;
            }
            let permit = match self.gate.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!(launched, total, "concurrency gate closed: {}", e);
                    break;
                }
            };

            debug!(module = %module, in_flight = self.gate.in_flight(), "launching lookup");
            let worker = self.worker.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            self.tracker.spawn(async move {
                // held until the result is handed over
                let _permit = permit;
                let result = worker.fetch(module, &cancel).await;
                if let Some(err) = result.error() {
                    debug!(module = %result.module(), "lookup failed: {}", err);
                }
                if tx.send(result).await.is_err() {
                    debug!("result stream dropped by consumer");
                }
            });
            launched += 1;
        }

        self.advance();
        self.tracker.close();
        self.tracker.wait().await;

        drop(tx);
        self.advance();
        info!(launched, total, "fetch finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::lookup::transport::Response;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Deterministic transport: 404 for paths containing `missing`, a
    /// licenses page otherwise. Records concurrency and start times.
    #[derive(Default)]
    struct StubTransport {
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        starts: Mutex<Vec<Instant>>,
    }

    impl StubTransport {
        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                ..Self::default()
            })
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Response, FetchError> {
            self.starts.lock().unwrap().push(Instant::now());
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                _ = tokio::time::sleep(self.delay) => Ok(()),
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome?;

            if url.contains("missing") {
                return Ok(Response {
                    status: 404,
                    body: Vec::new(),
                });
            }
            let page = format!(
                r#"<h2 id="lic-0">MIT</h2><p class="License-source">Source: LICENSE</p><pre class="License-contents">{url}</pre>"#
            );
            Ok(Response {
                status: 200,
                body: page.into_bytes(),
            })
        }
    }

    fn config(interval_ms: u64, max_concurrent: usize) -> FetchConfig {
        FetchConfig {
            request_interval_ms: interval_ms,
            max_concurrent,
            ..FetchConfig::default()
        }
    }

    fn modules(n: usize) -> Vec<Module> {
        (0..n)
            .map(|i| Module::new(format!("example.com/mod{i}"), format!("v1.0.{i}"), i % 2 == 0))
            .collect()
    }

    async fn run(
        fetcher: &Fetcher,
        modules: Vec<Module>,
        cancel: CancellationToken,
    ) -> Vec<LicenseResult> {
        tokio::time::timeout(
            Duration::from_secs(10),
            fetcher.fetch_licenses(modules, cancel).collect::<Vec<_>>(),
        )
        .await
        .expect("result stream never closed")
    }

    #[test]
    fn test_state_only_moves_forward() {
        let s = DispatchState::Idle.advance();
        assert_eq!(s, DispatchState::Dispatching);
        assert_eq!(s.advance(), DispatchState::Draining);
        assert_eq!(s.advance().advance(), DispatchState::Closed);
        assert_eq!(DispatchState::Closed.advance(), DispatchState::Closed);
    }

    #[test]
    fn test_zero_channel_capacity_rejected() {
        let cfg = FetchConfig {
            channel_capacity: 0,
            ..FetchConfig::default()
        };
        assert!(Fetcher::with_transport(&cfg, StubTransport::with_delay(Duration::ZERO)).is_err());
    }

    #[tokio::test]
    async fn test_one_result_per_module_despite_failures() {
        let transport = StubTransport::with_delay(Duration::from_millis(5));
        let fetcher = Fetcher::with_transport(&config(1, 2), transport.clone()).unwrap();

        let mut input = modules(5);
        input.push(Module::new("example.com/missing/a", "v0.1.0", false));
        input.push(Module::new("example.com/missing/b", "", true));

        let results = run(&fetcher, input.clone(), CancellationToken::new()).await;

        assert_eq!(results.len(), input.len());
        let failures: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(failures.len(), 2);
        assert!(failures
            .iter()
            .all(|r| matches!(r.error(), Some(FetchError::BadStatus(404)))));

        let mut paths: Vec<_> = results.iter().map(|r| r.module().path.clone()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), input.len());
    }

    #[tokio::test]
    async fn test_success_fields_are_extracted() {
        let transport = StubTransport::with_delay(Duration::ZERO);
        let fetcher = Fetcher::with_transport(&config(1, 2), transport).unwrap();

        let results = run(&fetcher, modules(1), CancellationToken::new()).await;
        let license = results[0].license().unwrap();
        assert_eq!(license.license_type, "MIT");
        assert_eq!(license.source, "LICENSE");
        assert_eq!(license.content, results[0].uri());
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_gate_capacity() {
        let transport = StubTransport::with_delay(Duration::from_millis(40));
        let fetcher = Fetcher::with_transport(&config(1, 2), transport.clone()).unwrap();

        let results = run(&fetcher, modules(8), CancellationToken::new()).await;

        assert_eq!(results.len(), 8);
        let max = transport.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 2, "{max} lookups in flight");
        assert!(max >= 1);
    }

    #[tokio::test]
    async fn test_starts_are_spaced_by_interval() {
        let interval = Duration::from_millis(60);
        let transport = StubTransport::with_delay(Duration::ZERO);
        let fetcher = Fetcher::with_transport(&config(60, 4), transport.clone()).unwrap();

        let results = run(&fetcher, modules(5), CancellationToken::new()).await;
        assert_eq!(results.len(), 5);

        let mut starts = transport.starts.lock().unwrap().clone();
        starts.sort();
        for pair in starts.windows(2) {
            let gap = pair[1] - pair[0];
            // scheduling jitter can delay a recorded start, never advance the bucket
            assert!(gap >= interval * 3 / 4, "starts only {gap:?} apart");
        }
    }

    #[tokio::test]
    async fn test_cancel_before_dispatch_yields_nothing() {
        let transport = StubTransport::with_delay(Duration::ZERO);
        let fetcher = Fetcher::with_transport(&config(1, 2), transport.clone()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = run(&fetcher, modules(4), cancel).await;

        assert!(results.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_dispatch_keeps_launched_results() {
        let transport = StubTransport::with_delay(Duration::from_secs(5));
        let fetcher = Fetcher::with_transport(&config(30, 4), transport.clone()).unwrap();
        let cancel = CancellationToken::new();

        let stream = fetcher.fetch_licenses(modules(20), cancel.clone());
        tokio::time::sleep(Duration::from_millis(80)).await;
        cancel.cancel();

        let results: Vec<_> = tokio::time::timeout(Duration::from_secs(10), stream.collect())
            .await
            .unwrap();

        let launched = transport.calls.load(Ordering::SeqCst);
        assert!(launched >= 1 && launched < 20);
        assert_eq!(results.len(), launched);
        assert!(results
            .iter()
            .all(|r| r.error().is_some_and(FetchError::is_cancelled)));
    }

    #[tokio::test]
    async fn test_empty_input_closes_stream() {
        let transport = StubTransport::with_delay(Duration::ZERO);
        let fetcher = Fetcher::with_transport(&config(1, 2), transport.clone()).unwrap();

        let results = run(&fetcher, Vec::new(), CancellationToken::new()).await;

        assert!(results.is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_slow_consumer_holds_back_dispatch() {
        let transport = StubTransport::with_delay(Duration::ZERO);
        let cfg = config(1, 2);
        let fetcher = Fetcher::with_transport(&cfg, transport.clone()).unwrap();

        let stream = fetcher.fetch_licenses(modules(30), CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(300)).await;

        let launched = transport.calls.load(Ordering::SeqCst);
        assert!(
            launched <= cfg.channel_capacity + cfg.max_concurrent,
            "{launched} lookups started with nobody reading"
        );

        let results: Vec<_> = tokio::time::timeout(Duration::from_secs(10), stream.collect())
            .await
            .unwrap();
        assert_eq!(results.len(), 30);
    }

    #[tokio::test]
    async fn test_dropped_stream_stops_dispatch() {
        let transport = StubTransport::with_delay(Duration::ZERO);
        let fetcher = Fetcher::with_transport(&config(20, 2), transport.clone()).unwrap();

        let stream = fetcher.fetch_licenses(modules(50), CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(stream);
        tokio::time::sleep(Duration::from_millis(300)).await;
        let after_drop = transport.calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), after_drop);
        assert!(after_drop < 50);
    }

    #[tokio::test]
    async fn test_repeated_runs_produce_identical_results() {
        let transport = StubTransport::with_delay(Duration::from_millis(3));
        let fetcher = Fetcher::with_transport(&config(1, 3), transport).unwrap();

        let mut input = modules(6);
        input.push(Module::new("example.com/missing/x", "v2.0.0", false));

        let mut runs = Vec::new();
        for _ in 0..2 {
            let stream = fetcher.fetch_licenses(input.clone(), CancellationToken::new());
            let results: Vec<LicenseResult> = stream.collect().await;
            let mut values: Vec<serde_json::Value> = results
                .iter()
                .map(|r| serde_json::to_value(r).unwrap())
                .collect();
            values.sort_by_key(|v| v["Module"]["Path"].as_str().unwrap_or_default().to_string());
            runs.push(values);
        }

        assert_eq!(runs[0].len(), input.len());
        assert_eq!(runs[0], runs[1]);
    }
}
