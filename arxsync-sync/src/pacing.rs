//! Deliberate pauses between requests to the remote source.
//!
//! Delays are described as a [`Delay`] (base + uniform jitter) and handed to
//! a [`Pacer`], which decides how to wait. [`ThreadPacer`] blocks the calling
//! thread; tests substitute a pacer that only records what was asked.

use std::time::Duration;

use rand::Rng;

/// `base + uniform(0, jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delay {
    pub base: Duration,
    pub jitter: Duration,
}

impl Delay {
    pub const ZERO: Delay = Delay::fixed(Duration::ZERO);

    pub const fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    pub const fn fixed(base: Duration) -> Self {
        Self {
            base,
            jitter: Duration::ZERO,
        }
    }

    pub fn from_millis(base_ms: u64, jitter_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(jitter_ms))
    }

    /// Upper bound of any sample.
    pub fn max(&self) -> Duration {
        self.base + self.jitter
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.jitter.is_zero() {
            return self.base;
        }
        let extra = rng.gen_range(0.0..=self.jitter.as_secs_f64());
        self.base + Duration::from_secs_f64(extra)
    }
}

/// Something that can wait out a [`Delay`].
pub trait Pacer {
    fn pause(&mut self, delay: Delay);
}

impl<P: Pacer + ?Sized> Pacer for &mut P {
    fn pause(&mut self, delay: Delay) {
        (**self).pause(delay)
    }
}

/// Blocks the current thread for a sampled duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, delay: Delay) {
        let duration = delay.sample(&mut rand::thread_rng());
        if duration.is_zero() {
            return;
        }
        tracing::trace!(millis = duration.as_millis() as u64, "pausing");
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fixed_delay_samples_exactly() {
        let mut rng = StdRng::seed_from_u64(7);
        let d = Delay::fixed(Duration::from_millis(500));
        for _ in 0..10 {
            assert_eq!(d.sample(&mut rng), Duration::from_millis(500));
        }
    }

    #[test]
    fn jittered_delay_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let d = Delay::from_millis(2_000, 4_000);
        for _ in 0..1_000 {
            let s = d.sample(&mut rng);
            assert!(s >= d.base && s <= d.max(), "{s:?} out of range");
        }
    }

    #[test]
    fn thread_pacer_returns_immediately_for_zero() {
        let start = std::time::Instant::now();
        ThreadPacer.pause(Delay::ZERO);
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
