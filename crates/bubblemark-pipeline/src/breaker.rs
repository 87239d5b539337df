//! Circuit breakers for downstream calls
//!
//! A breaker counts consecutive failures of calls to one service. After
//! `failure_threshold` of them it opens and rejects calls without making
//! them. Once `cooldown_ms` has passed, one caller at a time may probe the
//! service; `success_threshold` consecutive successful probes close it
//! again and any failed probe reopens it.
//!
//! All state lives behind one mutex, so transitions are linearizable and at
//! most one caller holds the half-open probe slot. Time comes from a
//! [`Clock`] so tests can advance it by hand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Breaker thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that open a closed breaker
    pub failure_threshold: u32,
    /// Time an open breaker waits before allowing a probe
    pub cooldown_ms: u64,
    /// Consecutive probe successes that close a half-open breaker
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 15_000,
            success_threshold: 2,
        }
    }
}

impl BreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        };
        f.write_str(s)
    }
}

/// Counters of one breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerStats {
    pub name: String,
    pub state: BreakerState,
    pub successes: u64,
    pub failures: u64,
    pub rejections: u64,
}

/// Outcome of a guarded call
#[derive(Debug)]
pub enum BreakerError<E> {
    /// Rejected without calling
    Open,
    /// The call ran and failed
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("circuit breaker open"),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Normal,
    Probe,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    successes: u64,
    failures: u64,
    rejections: u64,
}

/// Circuit breaker guarding one downstream service
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                probe_in_flight: false,
                successes: 0,
                failures: 0,
                rejections: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state. An open breaker past its cooldown still reports
    /// `Open` until a caller takes the probe slot.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn stats(&self) -> BreakerStats {
        let inner = self.lock();
        BreakerStats {
            name: self.name.clone(),
            state: inner.state,
            successes: inner.successes,
            failures: inner.failures,
            rejections: inner.rejections,
        }
    }

    /// Run `f` through the breaker.
    ///
    /// A panic in `f` is recorded as a failure before it unwinds, so a
    /// half-open probe never holds its slot past the call.
    pub fn call<T, E, F>(&self, f: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut guard = PermitGuard {
            breaker: self,
            permit: Some(self.acquire().ok_or(BreakerError::Open)?),
        };
        match f() {
            Ok(v) => {
                guard.settle(true);
                Ok(v)
            }
            Err(e) => {
                guard.settle(false);
                Err(BreakerError::Inner(e))
            }
        }
    }

    fn transition(&self, inner: &mut Inner, to: BreakerState) {
        let from = inner.state;
        inner.state = to;
        match to {
            BreakerState::Open => {
                inner.opened_at = Some(self.clock.now());
                tracing::warn!(breaker = %self.name, %from, %to, "circuit breaker opened");
            }
            _ => tracing::info!(breaker = %self.name, %from, %to, "circuit breaker transition"),
        }
    }

    fn acquire(&self) -> Option<Permit> {
        let mut inner = self.lock();
        let permit = match inner.state {
            BreakerState::Closed => Some(Permit::Normal),
            BreakerState::Open => {
                let cooled = inner
                    .opened_at
                    .is_some_and(|t| self.clock.now().duration_since(t) >= self.config.cooldown());
                if cooled {
                    self.transition(&mut inner, BreakerState::HalfOpen);
                    inner.consecutive_successes = 0;
                    inner.probe_in_flight = true;
                    Some(Permit::Probe)
                } else {
                    None
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    None
                } else {
                    inner.probe_in_flight = true;
                    Some(Permit::Probe)
                }
            }
        };
        if permit.is_none() {
            inner.rejections += 1;
        }
        permit
    }

    fn on_success(&self, permit: Permit) {
        let mut inner = self.lock();
        inner.successes += 1;
        match (permit, inner.state) {
            (Permit::Normal, BreakerState::Closed) => inner.consecutive_failures = 0,
            (Permit::Probe, BreakerState::HalfOpen) => {
                inner.probe_in_flight = false;
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    self.transition(&mut inner, BreakerState::Closed);
                }
            }
            // a call admitted before the breaker opened; state is unaffected
            _ => {}
        }
    }

    fn on_failure(&self, permit: Permit) {
        let mut inner = self.lock();
        inner.failures += 1;
        match (permit, inner.state) {
            (Permit::Normal, BreakerState::Closed) => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.transition(&mut inner, BreakerState::Open);
                }
            }
            (Permit::Probe, BreakerState::HalfOpen) => {
                inner.probe_in_flight = false;
                inner.consecutive_successes = 0;
                self.transition(&mut inner, BreakerState::Open);
            }
            _ => {}
        }
    }
}

/// Releases a permit exactly once, as a failure if dropped unsettled
struct PermitGuard<'a> {
    breaker: &'a CircuitBreaker,
    permit: Option<Permit>,
}

impl PermitGuard<'_> {
    fn settle(&mut self, ok: bool) {
        if let Some(permit) = self.permit.take() {
            if ok {
                self.breaker.on_success(permit);
            } else {
                self.breaker.on_failure(permit);
            }
        }
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        if self.permit.is_some() {
            tracing::warn!(breaker = %self.breaker.name, "guarded call panicked");
            self.settle(false);
        }
    }
}

/// One shared breaker per downstream service name
pub struct BreakerRegistry {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    breakers: Mutex<BTreeMap<String, Arc<CircuitBreaker>>>,
}

impl fmt::Debug for BreakerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            breakers: Mutex::new(BTreeMap::new()),
        }
    }

    /// The breaker for `service`, created on first use
    pub fn get(&self, service: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    service,
                    self.config.clone(),
                    Arc::clone(&self.clock),
                ))
            })
            .clone()
    }

    /// Stats of every breaker, ordered by name
    pub fn stats(&self) -> Vec<BreakerStats> {
        let breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        breakers.values().map(|b| b.stats()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> (CircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let b = CircuitBreaker::new("svc", BreakerConfig::default(), clock.clone());
        (b, clock)
    }

    fn fail(b: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        b.call(|| Err::<(), _>("down"))
    }

    fn succeed(b: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        b.call(|| Ok::<(), &'static str>(()))
    }

    #[test]
    fn test_opens_after_threshold() {
        let (b, _) = breaker();
        for _ in 0..2 {
            assert!(matches!(fail(&b), Err(BreakerError::Inner(_))));
        }
        assert_eq!(b.state(), BreakerState::Closed);
        assert!(fail(&b).is_err());
        assert_eq!(b.state(), BreakerState::Open);

        let mut called = false;
        let r = b.call(|| {
            called = true;
            Ok::<(), ()>(())
        });
        assert!(matches!(r, Err(BreakerError::Open)));
        assert!(!called);
        assert_eq!(b.stats().rejections, 1);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let (b, _) = breaker();
        fail(&b).ok();
        fail(&b).ok();
        succeed(&b).unwrap();
        fail(&b).ok();
        fail(&b).ok();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_needs_two_successes() {
        let (b, clock) = breaker();
        for _ in 0..3 {
            fail(&b).ok();
        }
        clock.advance(Duration::from_millis(14_999));
        assert!(matches!(succeed(&b), Err(BreakerError::Open)));
        clock.advance(Duration::from_millis(1));
        succeed(&b).unwrap();
        assert_eq!(b.state(), BreakerState::HalfOpen);
        succeed(&b).unwrap();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_failed_probe_reopens() {
        let (b, clock) = breaker();
        for _ in 0..3 {
            fail(&b).ok();
        }
        clock.advance(Duration::from_secs(15));
        assert!(matches!(fail(&b), Err(BreakerError::Inner(_))));
        assert_eq!(b.state(), BreakerState::Open);
        // cooldown restarts from the failed probe
        assert!(matches!(succeed(&b), Err(BreakerError::Open)));
    }

    #[test]
    fn test_single_probe_slot() {
        let (b, clock) = breaker();
        for _ in 0..3 {
            fail(&b).ok();
        }
        clock.advance(Duration::from_secs(15));
        // while the probe runs, everyone else is rejected
        let inner = b.call(|| Ok::<_, ()>(succeed(&b)));
        assert!(matches!(inner, Ok(Err(BreakerError::Open))));
    }

    #[test]
    fn test_panicking_probe_releases_slot() {
        let (b, clock) = breaker();
        for _ in 0..3 {
            fail(&b).ok();
        }
        clock.advance(Duration::from_secs(15));
        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            b.call(|| -> Result<(), &'static str> { panic!("sink crashed") })
        }));
        assert!(unwound.is_err());
        assert_eq!(b.state(), BreakerState::Open);
        assert_eq!(b.stats().failures, 4);

        // the next cooldown admits a fresh probe
        clock.advance(Duration::from_secs(15));
        succeed(&b).unwrap();
        succeed(&b).unwrap();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_panic_while_closed_counts_as_failure() {
        let (b, _) = breaker();
        for _ in 0..2 {
            fail(&b).ok();
        }
        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            b.call(|| -> Result<(), &'static str> { panic!("boom") })
        }));
        assert!(unwound.is_err());
        assert_eq!(b.state(), BreakerState::Open);
    }

    #[test]
    fn test_registry_shares_breakers() {
        let registry = BreakerRegistry::new(BreakerConfig::default());
        let a = registry.get("attendance");
        let b = registry.get("attendance");
        assert!(Arc::ptr_eq(&a, &b));
        registry.get("audit");
        let names: Vec<String> = registry.stats().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["attendance", "audit"]);
    }
}
