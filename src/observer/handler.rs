//! Handler identification for telemetry records.
//!
//! The observer reads `HandlerInfo` from the response extensions after the
//! wrapped service returns. Handlers can attach it directly by returning
//! `Extension(HandlerInfo::new(..))`, or a route can be wrapped with
//! `HandlerTagLayer`.

use axum::http::{Request, Response};
use futures_util::future::{BoxFuture, FutureExt};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Names the logical handler that served a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub controller: String,
    pub action: String,
}

impl HandlerInfo {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }
}

/// Tags every response of the wrapped service with a fixed `HandlerInfo`.
#[derive(Debug, Clone)]
pub struct HandlerTagLayer {
    info: HandlerInfo,
}

/// Shorthand for `HandlerTagLayer::new`.
pub fn tag_handler(controller: impl Into<String>, action: impl Into<String>) -> HandlerTagLayer {
    HandlerTagLayer::new(HandlerInfo::new(controller, action))
}

impl HandlerTagLayer {
    pub fn new(info: HandlerInfo) -> Self {
        Self { info }
    }
}

impl<S> Layer<S> for HandlerTagLayer {
    type Service = HandlerTag<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HandlerTag {
            inner,
            info: self.info.clone(),
        }
    }
}

/// Service produced by `HandlerTagLayer`.
#[derive(Debug, Clone)]
pub struct HandlerTag<S> {
    inner: S,
    info: HandlerInfo,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for HandlerTag<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    ReqBody: 'static,
    ResBody: 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let info = self.info.clone();
        self.inner
            .call(req)
            .map(move |result| {
                result.map(|mut response| {
                    response.extensions_mut().insert(info);
                    response
                })
            })
            .boxed()
    }
}
