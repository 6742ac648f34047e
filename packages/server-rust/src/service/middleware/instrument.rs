//! Usage instrumentation middleware for operations.
//!
//! Records through the `metrics` macros against the recorder carried by the
//! endpoint's [`Telemetry`] (Prometheus in the binary).
//!
//! - `addsvc_request_duration_seconds{method, success}`: histogram of call
//!   latency including time spent in the control stages.
//! - `addsvc_integers_summed`: absolute value of every successful `Sum`.
//! - `addsvc_characters_concatenated`: byte length of every successful `Concat`.

use std::task::{Context, Poll};
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use tower::{Layer, Service};

use super::OperationFuture;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::service::telemetry::Telemetry;

pub const REQUEST_DURATION_SECONDS: &str = "addsvc_request_duration_seconds";
pub const INTEGERS_SUMMED: &str = "addsvc_integers_summed";
pub const CHARACTERS_CONCATENATED: &str = "addsvc_characters_concatenated";

/// Registers help text for every metric this module records.
pub fn describe_metrics() {
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Request duration in seconds"
    );
    describe_counter!(
        INTEGERS_SUMMED,
        "Total count of integers summed via the Sum method."
    );
    describe_counter!(
        CHARACTERS_CONCATENATED,
        "Total count of characters concatenated via the Concat method."
    );
}

// ---------------------------------------------------------------------------
// InstrumentLayer
// ---------------------------------------------------------------------------

/// Tower layer that records duration and domain usage counters.
#[derive(Debug, Clone)]
pub struct InstrumentLayer {
    operation: &'static str,
    telemetry: Telemetry,
}

impl InstrumentLayer {
    #[must_use]
    pub fn new(operation: &'static str, telemetry: Telemetry) -> Self {
        Self {
            operation,
            telemetry,
        }
    }
}

impl<S> Layer<S> for InstrumentLayer {
    type Service = InstrumentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentService {
            inner,
            operation: self.operation,
            telemetry: self.telemetry.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// InstrumentService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InstrumentService<S> {
    inner: S,
    operation: &'static str,
    telemetry: Telemetry,
}

impl<S> Service<Operation> for InstrumentService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = OperationFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let method = self.operation;
        let telemetry = self.telemetry.clone();
        let start = Instant::now();
        let fut = self.inner.call(op);

        Box::pin(async move {
            let result = fut.await;

            let success = matches!(&result, Ok(resp) if resp.is_ok());
            telemetry.record(|| {
                histogram!(
                    REQUEST_DURATION_SECONDS,
                    "method" => method,
                    "success" => if success { "true" } else { "false" }
                )
                .record(start.elapsed().as_secs_f64());

                if let Ok(resp) = &result {
                    record_usage(resp);
                }
            });

            result
        })
    }
}

fn record_usage(resp: &OperationResponse) {
    match resp {
        OperationResponse::Sum(Ok(v)) => counter!(INTEGERS_SUMMED).increment(v.unsigned_abs()),
        OperationResponse::Concat(Ok(v)) => {
            counter!(CHARACTERS_CONCATENATED).increment(v.len() as u64);
        }
        OperationResponse::Sum(Err(_)) | OperationResponse::Concat(Err(_)) => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use addsvc_core::{AddError, ConcatRequest, SumRequest};
    use metrics::{
        Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder, SharedString,
    };
    use parking_lot::Mutex;
    use tower::{service_fn, ServiceExt};
    use tracing::Dispatch;

    use super::*;
    use crate::service::operation::OperationContext;

    #[derive(Default)]
    struct Samples(Mutex<Vec<f64>>);

    impl HistogramFn for Samples {
        fn record(&self, value: f64) {
            self.0.lock().push(value);
        }
    }

    /// Recorder that keeps every counter and histogram in memory.
    #[derive(Default)]
    struct CapturingRecorder {
        counters: Mutex<HashMap<String, Arc<AtomicU64>>>,
        histograms: Mutex<HashMap<String, Arc<Samples>>>,
    }

    fn render(key: &Key) -> String {
        let labels: Vec<String> = key
            .labels()
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect();
        format!("{}{{{}}}", key.name(), labels.join(","))
    }

    impl CapturingRecorder {
        fn counter(&self, name: &str) -> u64 {
            self.counters
                .lock()
                .get(&format!("{name}{{}}"))
                .map_or(0, |c| c.load(Ordering::SeqCst))
        }

        fn samples(&self, rendered: &str) -> usize {
            self.histograms
                .lock()
                .get(rendered)
                .map_or(0, |h| h.0.lock().len())
        }
    }

    impl Recorder for CapturingRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            let handle = Arc::clone(self.counters.lock().entry(render(key)).or_default());
            Counter::from_arc(handle)
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            let handle = Arc::clone(self.histograms.lock().entry(render(key)).or_default());
            Histogram::from_arc(handle)
        }
    }

    fn capturing() -> (Arc<CapturingRecorder>, Telemetry) {
        let recorder = Arc::new(CapturingRecorder::default());
        let shared: Arc<dyn Recorder + Send + Sync> = recorder.clone();
        (recorder, Telemetry::new(Dispatch::none(), shared))
    }

    fn sum_op(a: i64, b: i64) -> Operation {
        Operation::Sum {
            ctx: OperationContext::new(1, 5000),
            request: SumRequest::new(a, b),
        }
    }

    #[tokio::test]
    async fn records_integers_summed_by_value() {
        let (recorder, telemetry) = capturing();

        let inner = service_fn(|op: Operation| async move {
            let Operation::Sum { request, .. } = op else {
                return Err(OperationError::WrongOperation);
            };
            Ok(OperationResponse::Sum(addsvc_core::service::sum(request.a, request.b)))
        });
        let svc = InstrumentLayer::new("Sum", telemetry).layer(inner);

        svc.clone().oneshot(sum_op(5, 3)).await.unwrap();
        svc.clone().oneshot(sum_op(-10, 0)).await.unwrap();
        svc.clone().oneshot(sum_op(0, 0)).await.unwrap();

        assert_eq!(recorder.counter(INTEGERS_SUMMED), 18);
        assert_eq!(
            recorder.samples("addsvc_request_duration_seconds{method=Sum,success=true}"),
            2
        );
        assert_eq!(
            recorder.samples("addsvc_request_duration_seconds{method=Sum,success=false}"),
            1
        );
    }

    #[tokio::test]
    async fn records_characters_and_failed_rejections() {
        let (recorder, telemetry) = capturing();

        let inner = service_fn(|_op: Operation| async {
            Ok::<_, OperationError>(OperationResponse::Concat(Ok("abcdefg".to_string())))
        });
        let op = Operation::Concat {
            ctx: OperationContext::new(1, 5000),
            request: ConcatRequest::new("abc", "defg"),
        };
        InstrumentLayer::new("Concat", telemetry.clone())
            .layer(inner)
            .oneshot(op.clone())
            .await
            .unwrap();
        assert_eq!(recorder.counter(CHARACTERS_CONCATENATED), 7);

        let inner = service_fn(|_op: Operation| async {
            Err::<OperationResponse, _>(OperationError::RateLimited)
        });
        let err = InstrumentLayer::new("Concat", telemetry)
            .layer(inner)
            .oneshot(op)
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::RateLimited));
        assert_eq!(recorder.counter(CHARACTERS_CONCATENATED), 7);
        assert_eq!(
            recorder.samples("addsvc_request_duration_seconds{method=Concat,success=false}"),
            1
        );
    }

    #[test]
    fn business_errors_add_no_usage() {
        let (recorder, telemetry) = capturing();
        telemetry.record(|| record_usage(&OperationResponse::Sum(Err(AddError::TwoZeroes))));
        assert_eq!(recorder.counter(INTEGERS_SUMMED), 0);
    }

    #[tokio::test]
    async fn ambient_recorder_is_not_used() {
        let ambient = CapturingRecorder::default();
        let _guard = metrics::set_default_local_recorder(&ambient);
        let (injected, telemetry) = capturing();

        let inner = service_fn(|_op: Operation| async {
            Ok::<_, OperationError>(OperationResponse::Sum(Ok(4)))
        });
        InstrumentLayer::new("Sum", telemetry)
            .layer(inner)
            .oneshot(sum_op(1, 3))
            .await
            .unwrap();

        assert_eq!(injected.counter(INTEGERS_SUMMED), 4);
        assert_eq!(ambient.counter(INTEGERS_SUMMED), 0);
    }
}
