//! Circuit breaker regression test
//!
//! Drives one shared breaker from many threads and checks that state
//! changes stay consistent: a single half-open probe, rejections while
//! open, and recovery after the cooldown.

use bubblemark_pipeline::{
    BreakerConfig, BreakerError, BreakerRegistry, BreakerState, ManualClock,
};
use bubblemark_test::RegParams;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;

#[test]
fn breaker_reg() {
    let mut rp = RegParams::new("breaker");

    let clock = Arc::new(ManualClock::new());
    let registry = BreakerRegistry::with_clock(BreakerConfig::default(), clock.clone());
    let breaker = registry.get("attendance-service");

    // --- concurrent failures open it; calls in flight still count ---
    let calls = AtomicUsize::new(0);
    let barrier = Barrier::new(THREADS);
    let outcomes: Vec<Vec<bool>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    (0..4)
                        .map(|_| {
                            let r = breaker.call(|| {
                                calls.fetch_add(1, Ordering::SeqCst);
                                Err::<(), _>("unavailable")
                            });
                            matches!(r, Err(BreakerError::Open))
                        })
                        .collect()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let rejected = outcomes.iter().flatten().filter(|&&r| r).count();
    let made = calls.load(Ordering::SeqCst);
    rp.check(made >= 3, "at least three calls made");
    rp.compare_values((THREADS * 4) as f64, (made + rejected) as f64, 0.0);
    rp.compare_values(rejected as f64, breaker.stats().rejections as f64, 0.0);
    rp.check(breaker.state() == BreakerState::Open, "open");

    // --- one probe at a time once the cooldown has passed ---
    clock.advance(Duration::from_secs(15));
    let probes = AtomicUsize::new(0);
    let barrier = Barrier::new(THREADS);
    let admitted: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    let r = breaker.call(|| {
                        probes.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(300));
                        Ok::<(), &str>(())
                    });
                    r.is_ok() as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });
    rp.compare_values(1.0, probes.load(Ordering::SeqCst) as f64, 0.0);
    rp.compare_values(1.0, admitted as f64, 0.0);
    rp.check(breaker.state() == BreakerState::HalfOpen, "half open");

    // --- second successful probe closes it ---
    breaker
        .call(|| Ok::<(), &str>(()))
        .expect("second probe");
    rp.check(breaker.state() == BreakerState::Closed, "closed");
    let stats = registry.stats();
    rp.compare_values(1.0, stats.len() as f64, 0.0);
    rp.compare_strings(b"attendance-service", stats[0].name.as_bytes());

    assert!(rp.cleanup(), "breaker regression test failed");
}
