//! In-process stand-ins for an echo endpoint.
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics::counter;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, SkewNormal};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use volley::{Connector, PayloadMix, RequestOp, RunContext};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MockError {
    #[error("simulated failure")]
    Failure,

    #[error("over capacity")]
    Overloaded,

    #[error("connection refused")]
    Refused,
}

enum Latency {
    Fixed(Duration),
    Skewed(Mutex<(SkewNormal<f64>, SmallRng)>),
}

impl Latency {
    fn sample(&self) -> Duration {
        match self {
            Latency::Fixed(delay) => *delay,
            Latency::Skewed(dist) => {
                let Ok(mut guard) = dist.lock() else {
                    return Duration::ZERO;
                };
                let (normal, rng) = &mut *guard;
                let v: f64 = normal.sample(rng).max(0.);
                Duration::from_secs_f64(v)
            }
        }
    }
}

enum Payload {
    Fixed(usize),
    Mixed(PayloadMix),
}

/// Simulated echo endpoint. Sleeps for its latency, then answers with its payload size.
pub struct MockEndpoint {
    latency: Latency,
    payload: Payload,
    failing: bool,
    limiter: Option<DefaultDirectRateLimiter>,
    served: AtomicU64,
}

impl MockEndpoint {
    pub fn fixed(delay: Duration) -> Self {
        Self::with_latency(Latency::Fixed(delay))
    }

    /// Right-skewed latency: `location` and `scale` in the sense of [`SkewNormal`], shape 20.
    ///
    /// Falls back to a fixed `location` delay when `scale` is zero.
    pub fn skewed(location: Duration, scale: Duration) -> Self {
        match SkewNormal::new(location.as_secs_f64(), scale.as_secs_f64(), 20.) {
            Ok(normal) => Self::with_latency(Latency::Skewed(Mutex::new((
                normal,
                SmallRng::from_entropy(),
            )))),
            Err(_) => Self::fixed(location),
        }
    }

    fn with_latency(latency: Latency) -> Self {
        Self {
            latency,
            payload: Payload::Fixed(512),
            failing: false,
            limiter: None,
            served: AtomicU64::new(0),
        }
    }

    /// Every request fails after its latency.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Reject requests beyond `max_rps`.
    pub fn limited(mut self, max_rps: NonZeroU32) -> Self {
        self.limiter = Some(rate_limiter(max_rps));
        self
    }

    pub fn payload(mut self, size: usize) -> Self {
        self.payload = Payload::Fixed(size);
        self
    }

    /// Size each response by request id through `mix`.
    pub fn payload_mix(mut self, mix: PayloadMix) -> Self {
        self.payload = Payload::Mixed(mix);
        self
    }

    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    fn respond(&self, id: u64) -> Result<usize, MockError> {
        if self.failing {
            return Err(MockError::Failure);
        }
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                counter!("mock-endpoint.rejected").increment(1);
                return Err(MockError::Overloaded);
            }
        }
        Ok(match &self.payload {
            Payload::Fixed(size) => *size,
            Payload::Mixed(mix) => mix.pick(id).size,
        })
    }
}

impl RequestOp for MockEndpoint {
    type Error = MockError;

    fn call(&self, _cx: &RunContext, id: u64) -> impl Future<Output = Result<usize, MockError>> + Send {
        self.served.fetch_add(1, Ordering::Relaxed);
        counter!("mock-endpoint.requests").increment(1);
        let delay = self.latency.sample();
        let response = self.respond(id);
        async move {
            tokio::time::sleep(delay).await;
            response
        }
    }
}

pub fn rate_limiter(max_rps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(max_rps))
}

/// Connection bookkeeping for [`MockConnector`].
#[derive(Debug, Default)]
pub struct ConnectStats {
    pub connects: AtomicU64,
    pub refused: AtomicU64,
    pub releases: AtomicU64,
}

impl ConnectStats {
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    pub fn refused(&self) -> u64 {
        self.refused.load(Ordering::Relaxed)
    }

    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }
}

/// Connector handing out fresh endpoints after a simulated handshake.
pub struct MockConnector<F> {
    factory: F,
    handshake: Duration,
    refuse: bool,
    stats: Arc<ConnectStats>,
}

impl<F> MockConnector<F>
where
    F: Fn() -> MockEndpoint + Send + Sync + 'static,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            handshake: Duration::ZERO,
            refuse: false,
            stats: Arc::new(ConnectStats::default()),
        }
    }

    /// Delay every connect by `handshake`.
    pub fn handshake(mut self, handshake: Duration) -> Self {
        self.handshake = handshake;
        self
    }

    /// Fail every connect after its handshake.
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn stats(&self) -> Arc<ConnectStats> {
        self.stats.clone()
    }
}

impl<F> Connector for MockConnector<F>
where
    F: Fn() -> MockEndpoint + Send + Sync + 'static,
{
    type Op = MockEndpoint;
    type Error = MockError;

    fn connect(&self) -> impl Future<Output = Result<MockEndpoint, MockError>> + Send {
        let result = if self.refuse {
            self.stats.refused.fetch_add(1, Ordering::Relaxed);
            Err(MockError::Refused)
        } else {
            self.stats.connects.fetch_add(1, Ordering::Relaxed);
            Ok((self.factory)())
        };
        let handshake = self.handshake;
        async move {
            tokio::time::sleep(handshake).await;
            result
        }
    }

    fn release(&self, op: MockEndpoint) -> impl Future<Output = ()> + Send {
        self.stats.releases.fetch_add(1, Ordering::Relaxed);
        debug!("Released connection after {} requests", op.served());
        async {}
    }
}
