//! Pipeline wrapper.
//!
//! Per request, single pass:
//! ```text
//! resolve identity → capture(before) → inner.call → capture(after)
//!     → emit RequestLogRecord → [emit ThresholdAlertRecord] → return inner's result
//! ```
//!
//! The inner service's response or error is returned untouched. Identity
//! resolution, sampling and sink writes are blocking and run on the tokio
//! blocking pool; no lock is held while the inner service runs.
//!
//! A call dropped after the before-sample (client disconnect, outer timeout)
//! still emits its request record, as a failure with error `"cancelled"`.

use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use std::fmt::Display;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use uuid::Uuid;

use crate::config::ObserverConfig;
use crate::identity::RequestIdResolver;
use crate::observer::handler::HandlerInfo;
use crate::observer::threshold::ThresholdPolicy;
use crate::sampling::{Sample, Sampler};
use crate::telemetry::{
    self, memory_delta, round_millis, Level, LogSink, RequestLogRecord, SinkError,
    ThresholdAlertRecord, NOT_AVAILABLE,
};

/// Shared state behind every `MemoryObserver` produced by one layer.
struct ObserverCore {
    sampler: Sampler,
    resolver: RequestIdResolver,
    sink: Arc<dyn LogSink>,
    policy: ThresholdPolicy,
    record_failures: bool,
}

/// Request metadata copied before the request is handed to the inner service.
struct RequestMeta {
    method: String,
    url: String,
    matched_path: Option<String>,
    header_id: Option<String>,
}

impl RequestMeta {
    fn from_request<B>(req: &Request<B>, resolver: &RequestIdResolver) -> Self {
        Self {
            method: req.method().to_string(),
            url: req.uri().to_string(),
            matched_path: req
                .extensions()
                .get::<MatchedPath>()
                .map(|path| path.as_str().to_string()),
            header_id: resolver.from_headers(req.headers()),
        }
    }

    /// Controller/action: explicit tag, else the matched route, else N/A.
    fn handler_names(&self, tagged: Option<HandlerInfo>) -> (String, String) {
        match (tagged, &self.matched_path) {
            (Some(info), _) => (info.controller, info.action),
            (None, Some(path)) => (path.clone(), NOT_AVAILABLE.to_string()),
            (None, None) => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        }
    }
}

/// Everything captured before the inner service was called.
struct InFlight {
    started: Instant,
    request_id: String,
    meta: RequestMeta,
    before: Sample,
}

/// How the inner service finished.
enum Outcome {
    Completed {
        status: u16,
        handler: Option<HandlerInfo>,
    },
    Failed {
        error: String,
    },
}

impl Outcome {
    fn cancelled() -> Self {
        Outcome::Failed {
            error: "cancelled".to_string(),
        }
    }

    fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }
}

impl ObserverCore {
    /// Identity and before-sample. Blocking.
    fn begin(&self, header_id: Option<String>) -> (String, Sample) {
        let request_id = self.resolver.resolve_with(header_id);
        let before = self.sampler.capture();
        (request_id, before)
    }

    /// After-sample, records, threshold check. Blocking.
    fn finish(&self, in_flight: InFlight, outcome: Outcome) {
        let InFlight {
            started,
            request_id,
            meta,
            before,
        } = in_flight;
        let after = self.sampler.capture();
        let request_time = round_millis(started.elapsed().as_secs_f64());
        let growth = memory_delta(before.memory_bytes, after.memory_bytes);

        let (status, handler, error) = match outcome {
            Outcome::Completed { status, handler } => (status, handler, None),
            Outcome::Failed { error } => (500, None, Some(error)),
        };
        let completed = error.is_none();
        let (controller, action) = meta.handler_names(handler);

        let mut record = RequestLogRecord::new(
            request_id.clone(),
            meta.method,
            meta.url,
            controller,
            action,
            before,
            after,
            request_time,
            status,
        );
        if let Some(error) = error {
            record = record.with_error(error);
        }

        if let Err(e) = self.sink.emit(Level::Info, &record) {
            tracing::error!(request_id = %request_id, error = %e, "Failed to emit request record");
        }

        if !completed {
            return;
        }
        if let Some(growth) = self.policy.exceeded(growth) {
            tracing::debug!(
                request_id = %request_id,
                growth_bytes = growth,
                limit_bytes = self.policy.limit_bytes(),
                "Memory threshold exceeded"
            );
            let alert = ThresholdAlertRecord::new(request_id, growth);
            if let Err(e) = self.sink.emit(Level::Warn, &alert) {
                tracing::error!(error = %e, "Failed to emit threshold alert");
            }
        }
    }
}

/// Emits the request record on drop unless disarmed first.
struct PendingRecord {
    core: Arc<ObserverCore>,
    in_flight: Option<InFlight>,
}

impl PendingRecord {
    fn new(core: Arc<ObserverCore>, in_flight: InFlight) -> Self {
        Self {
            core,
            in_flight: Some(in_flight),
        }
    }

    /// Hand the captured state back once the inner call has resolved.
    fn disarm(&mut self) -> Option<InFlight> {
        self.in_flight.take()
    }
}

impl Drop for PendingRecord {
    fn drop(&mut self) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };
        if !self.core.record_failures {
            return;
        }
        tracing::debug!(request_id = %in_flight.request_id, "Request cancelled before completion");

        let core = self.core.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || core.finish(in_flight, Outcome::cancelled()));
            }
            Err(_) => core.finish(in_flight, Outcome::cancelled()),
        }
    }
}

/// Builder for `MemoryObserverLayer`.
pub struct ObserverBuilder {
    core: ObserverCore,
}

impl ObserverBuilder {
    /// Identity source. Defaults to the `ObserverConfig` default: the
    /// `x-request-id` header, then `log/development.log`, then a fresh UUID.
    pub fn resolver(mut self, resolver: RequestIdResolver) -> Self {
        self.core.resolver = resolver;
        self
    }

    /// Alert threshold. Defaults to 10 MB.
    pub fn policy(mut self, policy: ThresholdPolicy) -> Self {
        self.core.policy = policy;
        self
    }

    /// Emit a status-500 record when the inner service errors or the call is
    /// dropped before it resolves. Defaults to true.
    pub fn record_failures(mut self, enabled: bool) -> Self {
        self.core.record_failures = enabled;
        self
    }

    pub fn build(self) -> MemoryObserverLayer {
        MemoryObserverLayer {
            core: Arc::new(self.core),
        }
    }
}

/// Tower layer wrapping services with per-request resource observation.
#[derive(Clone)]
pub struct MemoryObserverLayer {
    core: Arc<ObserverCore>,
}

impl MemoryObserverLayer {
    pub fn builder(sampler: Sampler, sink: Arc<dyn LogSink>) -> ObserverBuilder {
        ObserverBuilder {
            core: ObserverCore {
                sampler,
                resolver: RequestIdResolver::from_config(&ObserverConfig::default()),
                sink,
                policy: ThresholdPolicy::default(),
                record_failures: true,
            },
        }
    }

    /// OS sampler, configured identity sources, sink and threshold.
    pub fn from_config(config: &ObserverConfig) -> Result<Self, SinkError> {
        let sink = telemetry::sink_from_config(config)?;
        Ok(Self::from_config_with(config, Sampler::system(), sink))
    }

    /// Like `from_config`, with caller-provided sampler and sink.
    pub fn from_config_with(
        config: &ObserverConfig,
        sampler: Sampler,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self::builder(sampler, sink)
            .resolver(RequestIdResolver::from_config(config))
            .policy(ThresholdPolicy::new(config.threshold_mb, config.threshold_unit))
            .record_failures(config.record_failures)
            .build()
    }

    /// Sink shared by every observed request.
    pub fn sink(&self) -> Arc<dyn LogSink> {
        self.core.sink.clone()
    }
}

impl<S> Layer<S> for MemoryObserverLayer {
    type Service = MemoryObserver<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MemoryObserver {
            inner,
            core: self.core.clone(),
        }
    }
}

/// Service produced by `MemoryObserverLayer`.
#[derive(Clone)]
pub struct MemoryObserver<S> {
    inner: S,
    core: Arc<ObserverCore>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MemoryObserver<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Display + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let started = Instant::now();
        // the readied service handles this request; keep a fresh clone
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let core = self.core.clone();
        let meta = RequestMeta::from_request(&req, &core.resolver);

        Box::pin(async move {
            let header_id = meta.header_id.clone();
            let begin_core = core.clone();
            let (request_id, before) =
                match tokio::task::spawn_blocking(move || begin_core.begin(header_id)).await {
                    Ok(begun) => begun,
                    Err(e) => {
                        tracing::warn!(error = %e, "Before-sample task failed");
                        (Uuid::new_v4().to_string(), Sample::default())
                    }
                };

            let mut pending = PendingRecord::new(
                core.clone(),
                InFlight {
                    started,
                    request_id,
                    meta,
                    before,
                },
            );

            let result = inner.call(req).await;

            let outcome = match &result {
                Ok(response) => Outcome::Completed {
                    status: response.status().as_u16(),
                    handler: response.extensions().get::<HandlerInfo>().cloned(),
                },
                Err(e) => Outcome::Failed {
                    error: e.to_string(),
                },
            };

            let in_flight = pending.disarm();
            if let Some(in_flight) = in_flight {
                if outcome.is_completed() || core.record_failures {
                    let finish_core = core.clone();
                    let finished =
                        tokio::task::spawn_blocking(move || finish_core.finish(in_flight, outcome))
                            .await;
                    if let Err(e) = finished {
                        tracing::error!(error = %e, "Telemetry task failed");
                    }
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::threshold::ThresholdUnit;
    use crate::sampling::{Counters, ProcessEntry, ProcessTable, RuntimeIntrospector};
    use crate::telemetry::MemorySink;
    use axum::http::{header, HeaderName, HeaderValue, StatusCode};
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::{service_fn, ServiceExt};

    const PID: u32 = 4242;

    /// Returns queued RSS values (KB) for `PID`, repeating the last one.
    struct ScriptedTable {
        values: Mutex<VecDeque<u64>>,
        scans: AtomicUsize,
    }

    impl ScriptedTable {
        fn new(values: &[u64]) -> Arc<Self> {
            Arc::new(Self {
                values: Mutex::new(values.iter().copied().collect()),
                scans: AtomicUsize::new(0),
            })
        }
    }

    impl ProcessTable for ScriptedTable {
        fn entries(&self) -> Vec<ProcessEntry> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            let mut values = self.values.lock().unwrap();
            let kb = if values.len() > 1 {
                values.pop_front().unwrap()
            } else {
                values.front().copied().unwrap_or(0)
            };
            vec![
                ProcessEntry { pid: 1, resident_kb: 1 },
                ProcessEntry { pid: PID, resident_kb: kb },
            ]
        }
    }

    fn observer(table: Arc<ScriptedTable>, sink: Arc<MemorySink>) -> ObserverBuilder {
        let sampler = Sampler::new(table).with_pid(PID);
        MemoryObserverLayer::builder(sampler, sink)
            .resolver(RequestIdResolver::new(
                Some(HeaderName::from_static("x-request-id")),
                None,
            ))
            .policy(ThresholdPolicy::new(10.0, ThresholdUnit::Megabytes))
    }

    /// Echoes the request body with a fixed status and a handler tag.
    #[derive(Clone)]
    struct Echo {
        status: StatusCode,
    }

    impl Service<Request<String>> for Echo {
        type Response = Response<String>;
        type Error = Infallible;
        type Future = std::future::Ready<Result<Response<String>, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<String>) -> Self::Future {
            let mut response = Response::new(format!("echo:{}", req.body()));
            *response.status_mut() = self.status;
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            response.extensions_mut().insert(HandlerInfo::new("EchoController", "show"));
            std::future::ready(Ok(response))
        }
    }

    fn ok_service(status: StatusCode) -> Echo {
        Echo { status }
    }

    #[tokio::test]
    async fn test_single_record_and_passthrough() {
        let table = ScriptedTable::new(&[1000, 1010]);
        let sink = Arc::new(MemorySink::new());
        let svc = observer(table.clone(), sink.clone()).build().layer(ok_service(StatusCode::OK));

        let req = Request::builder()
            .method("POST")
            .uri("/items/7?verbose=1")
            .body("payload".to_string())
            .unwrap();
        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(response.body(), "echo:payload");

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let (level, record) = &records[0];
        assert_eq!(*level, Level::Info);
        assert_eq!(record["method"], "POST");
        assert_eq!(record["url"], "/items/7?verbose=1");
        assert_eq!(record["controller"], "EchoController");
        assert_eq!(record["action"], "show");
        assert_eq!(record["memory_before"], 1000 * 1024);
        assert_eq!(record["memory_after"], 1010 * 1024);
        assert_eq!(record["status"], 200);
        assert!(record["request_time"].as_f64().unwrap() >= 0.0);
        assert!(Uuid::parse_str(record["request_id"].as_str().unwrap()).is_ok());

        // exactly one scan before and one after
        assert_eq!(table.scans.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_status_passes_through() {
        let sink = Arc::new(MemorySink::new());
        let svc = observer(ScriptedTable::new(&[500]), sink.clone())
            .build()
            .layer(ok_service(StatusCode::SERVICE_UNAVAILABLE));

        let response = svc.oneshot(Request::new(String::new())).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body(), "echo:");
        assert_eq!(sink.records()[0].1["status"], 503);
    }

    #[tokio::test]
    async fn test_alert_emitted_above_threshold() {
        // 10 MB = 10240 KB; grow by one KB more
        let sink = Arc::new(MemorySink::new());
        let svc = observer(ScriptedTable::new(&[1000, 1000 + 10_241]), sink.clone())
            .build()
            .layer(ok_service(StatusCode::OK));

        svc.oneshot(Request::new(String::new())).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        let (level, alert) = &records[1];
        assert_eq!(*level, Level::Warn);
        assert_eq!(alert["memory_growth"], 10_241 * 1024);
        assert_eq!(alert["request_id"], records[0].1["request_id"]);
        assert_eq!(alert["method"], "N/A");
        assert_eq!(alert["url"], "N/A");
        assert_eq!(alert["controller"], "N/A");
        assert_eq!(alert["action"], "N/A");
    }

    #[tokio::test]
    async fn test_growth_equal_to_threshold_is_silent() {
        let sink = Arc::new(MemorySink::new());
        let svc = observer(ScriptedTable::new(&[1000, 1000 + 10_240]), sink.clone())
            .build()
            .layer(ok_service(StatusCode::OK));

        svc.oneshot(Request::new(String::new())).await.unwrap();
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1["memory_after"], (1000 + 10_240) * 1024);
    }

    #[tokio::test]
    async fn test_shrinking_memory_never_alerts() {
        let sink = Arc::new(MemorySink::new());
        let svc = observer(ScriptedTable::new(&[90_000, 10]), sink.clone())
            .build()
            .layer(ok_service(StatusCode::OK));

        svc.oneshot(Request::new(String::new())).await.unwrap();
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn test_request_time_tracks_wall_clock() {
        let sink = Arc::new(MemorySink::new());
        let svc = observer(ScriptedTable::new(&[1]), sink.clone())
            .build()
            .layer(service_fn(|_req: Request<String>| async {
                tokio::time::sleep(Duration::from_millis(120)).await;
                Ok::<_, Infallible>(Response::new(String::new()))
            }));

        let started = Instant::now();
        svc.oneshot(Request::new(String::new())).await.unwrap();
        let measured = started.elapsed().as_secs_f64();

        let request_time = sink.records()[0].1["request_time"].as_f64().unwrap();
        assert!(request_time >= 0.12, "request_time {request_time}");
        assert!(request_time <= measured + 0.001, "{request_time} > {measured}");
    }

    #[tokio::test]
    async fn test_header_identity_and_missing_handler_info() {
        let sink = Arc::new(MemorySink::new());
        let svc = observer(ScriptedTable::new(&[1]), sink.clone())
            .resolver(RequestIdResolver::new(
                Some(HeaderName::from_static("x-request-id")),
                None,
            ))
            .build()
            .layer(service_fn(|_req: Request<String>| async {
                Ok::<_, Infallible>(Response::new(String::new()))
            }));

        let req = Request::builder()
            .header("x-request-id", "abc-123")
            .body(String::new())
            .unwrap();
        svc.oneshot(req).await.unwrap();

        let record = &sink.records()[0].1;
        assert_eq!(record["request_id"], "abc-123");
        assert_eq!(record["controller"], "N/A");
        assert_eq!(record["action"], "N/A");
    }

    #[tokio::test]
    async fn test_failure_recorded_and_error_returned() {
        let sink = Arc::new(MemorySink::new());
        let svc = observer(ScriptedTable::new(&[1000, 1000 + 50_000]), sink.clone())
            .build()
            .layer(service_fn(|_req: Request<String>| async {
                Err::<Response<String>, _>("database unreachable".to_string())
            }));

        let err = svc.oneshot(Request::new(String::new())).await.unwrap_err();
        assert_eq!(err, "database unreachable");

        // one record, no alert despite the growth
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1["status"], 500);
        assert_eq!(records[0].1["error"], "database unreachable");
    }

    #[tokio::test]
    async fn test_failure_not_recorded_when_disabled() {
        let table = ScriptedTable::new(&[1]);
        let sink = Arc::new(MemorySink::new());
        let svc = observer(table.clone(), sink.clone())
            .record_failures(false)
            .build()
            .layer(service_fn(|_req: Request<String>| async {
                Err::<Response<String>, _>("boom".to_string())
            }));

        assert!(svc.oneshot(Request::new(String::new())).await.is_err());
        assert!(sink.lines().is_empty());
        // only the before-sample ran
        assert_eq!(table.scans.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_each_recorded() {
        let sink = Arc::new(MemorySink::new());
        let layer = observer(ScriptedTable::new(&[1]), sink.clone()).build();
        let svc = layer.layer(ok_service(StatusCode::OK));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    let req = Request::builder()
                        .uri(format!("/n/{i}"))
                        .body(String::new())
                        .unwrap();
                    svc.oneshot(req).await.unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let mut urls: Vec<String> = sink
            .records()
            .into_iter()
            .map(|(_, r)| r["url"].as_str().unwrap().to_string())
            .collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 16);
    }

    /// Counters that step by a fixed amount on every capture.
    #[derive(Default)]
    struct SteppingRuntime {
        gc_calls: AtomicUsize,
        object_calls: AtomicUsize,
    }

    impl RuntimeIntrospector for SteppingRuntime {
        fn gc_stats(&self) -> Option<Counters> {
            let n = self.gc_calls.fetch_add(1, Ordering::SeqCst) as i64;
            Some(Counters::from([("minor_gc_count".to_string(), 10 + n)]))
        }

        fn object_counts(&self) -> Option<Counters> {
            let n = self.object_calls.fetch_add(1, Ordering::SeqCst) as i64;
            Some(Counters::from([("T_STRING".to_string(), 100 + n * 5)]))
        }
    }

    async fn wait_for_records(sink: &MemorySink, count: usize) {
        for _ in 0..100 {
            if sink.records().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Responds after 500 ms.
    #[derive(Clone)]
    struct Slow;

    impl Service<Request<String>> for Slow {
        type Response = Response<String>;
        type Error = Infallible;
        type Future = BoxFuture<'static, Result<Response<String>, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<String>) -> Self::Future {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(Response::new(String::new()))
            })
        }
    }

    #[tokio::test]
    async fn test_before_and_after_counters_paired() {
        let cache_calls = Arc::new(AtomicUsize::new(0));
        let probe_calls = cache_calls.clone();
        let sampler = Sampler::new(ScriptedTable::new(&[1000, 1200]))
            .with_pid(PID)
            .with_runtime(Arc::new(SteppingRuntime::default()))
            .with_query_cache(Arc::new(move || {
                Some(3 + probe_calls.fetch_add(1, Ordering::SeqCst) * 4)
            }));
        let sink = Arc::new(MemorySink::new());
        let svc = MemoryObserverLayer::builder(sampler, sink.clone())
            .build()
            .layer(ok_service(StatusCode::OK));

        svc.oneshot(Request::new(String::new())).await.unwrap();

        let record = &sink.records()[0].1;
        assert_eq!(record["gc_stats_before"]["minor_gc_count"], 10);
        assert_eq!(record["gc_stats_after"]["minor_gc_count"], 11);
        assert_eq!(record["objects_before"]["T_STRING"], 100);
        assert_eq!(record["objects_after"]["T_STRING"], 105);
        assert_eq!(record["query_cache_before"], 3);
        assert_eq!(record["query_cache_after"], 7);
        assert_eq!(record["memory_before"], 1000 * 1024);
        assert_eq!(record["memory_after"], 1200 * 1024);
        assert_eq!(cache_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_default_builder_correlates_request_id_header() {
        let sampler = Sampler::new(ScriptedTable::new(&[1])).with_pid(PID);
        let sink = Arc::new(MemorySink::new());
        let svc = MemoryObserverLayer::builder(sampler, sink.clone())
            .build()
            .layer(ok_service(StatusCode::OK));

        let req = Request::builder()
            .header("x-request-id", "edge-7")
            .body(String::new())
            .unwrap();
        svc.oneshot(req).await.unwrap();
        assert_eq!(sink.records()[0].1["request_id"], "edge-7");
    }

    #[tokio::test]
    async fn test_cancelled_call_still_recorded() {
        let table = ScriptedTable::new(&[1000, 1000 + 50_000]);
        let sink = Arc::new(MemorySink::new());
        let svc = observer(table.clone(), sink.clone()).build().layer(Slow);

        let req = Request::builder()
            .uri("/slow")
            .header("x-request-id", "gone-1")
            .body(String::new())
            .unwrap();
        let timed_out = tokio::time::timeout(Duration::from_millis(50), svc.oneshot(req)).await;
        assert!(timed_out.is_err());

        wait_for_records(&sink, 1).await;
        let records = sink.records();
        // one record and no alert despite the growth
        assert_eq!(records.len(), 1);
        let (level, record) = &records[0];
        assert_eq!(*level, Level::Info);
        assert_eq!(record["request_id"], "gone-1");
        assert_eq!(record["url"], "/slow");
        assert_eq!(record["status"], 500);
        assert_eq!(record["error"], "cancelled");
        assert_eq!(table.scans.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_call_silent_when_failures_disabled() {
        let table = ScriptedTable::new(&[1]);
        let sink = Arc::new(MemorySink::new());
        let svc = observer(table.clone(), sink.clone())
            .record_failures(false)
            .build()
            .layer(Slow);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), svc.oneshot(Request::new(String::new())))
                .await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(sink.lines().is_empty());
        assert_eq!(table.scans.load(Ordering::SeqCst), 1);
    }
}
