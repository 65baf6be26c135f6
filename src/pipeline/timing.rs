use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::Service;
use tower_layer::Layer;
use tracing::debug;

/// Wraps a service and logs how long each call took
#[derive(Debug, Clone)]
pub struct TimingLayer {
    name: &'static str,
}

impl TimingLayer {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl<S> Layer<S> for TimingLayer {
    type Service = Timed<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Timed {
            inner,
            name: self.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Timed<S> {
    inner: S,
    name: &'static str,
}

impl<S> Timed<S> {
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, Request> Service<Request> for Timed<S>
where
    S: Service<Request>,
    S::Future: Send + 'static,
    S::Error: Display,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let name = self.name;
        let future = self.inner.call(request);
        Box::pin(async move {
            let start = Instant::now();
            debug!("Starting {}", name);

            let result = future.await;
            let duration_us = start.elapsed().as_micros() as u64;

            match &result {
                Ok(_) => debug!("Completed '{}' successfully in {}us", name, duration_us),
                Err(e) => tracing::error!("'{}' failed after {}us: {}", name, duration_us, e),
            }
            result
        })
    }
}
