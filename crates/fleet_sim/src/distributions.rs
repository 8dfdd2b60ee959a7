//! Duration distributions sampled from the simulator's seeded random source.

use rand::Rng;

/// Uniform integer durations over `[base/2, base*3/2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffDutyDuration {
    pub base: u64,
}

impl OffDutyDuration {
    pub fn new(base: u64) -> Self {
        Self { base }
    }

    pub fn bounds(&self) -> (u64, u64) {
        (self.base / 2, self.base.saturating_mul(3) / 2)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let (low, high) = self.bounds();
        if high <= low {
            return low;
        }
        rng.gen_range(low..high)
    }
}

/// Exponentially distributed durations with the given mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDuration {
    pub mean: f64,
}

impl ExponentialDuration {
    pub fn new(mean: f64) -> Self {
        Self { mean }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.mean <= 0.0 {
            return 0.0;
        }
        // Inverse CDF: -ln(U) * mean, U uniform in (0, 1]
        let u: f64 = rng.gen();
        let u = u.max(1e-10); // Avoid log(0)
        -u.ln() * self.mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn off_duty_samples_stay_in_bounds() {
        let dist = OffDutyDuration::new(100);
        assert_eq!(dist.bounds(), (50, 150));
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10_000 {
            let d = dist.sample(&mut rng);
            assert!((50..150).contains(&d), "sample {d} out of range");
        }
    }

    #[test]
    fn off_duty_degenerate_base() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(OffDutyDuration::new(1).sample(&mut rng), 0);
        assert_eq!(OffDutyDuration::new(0).sample(&mut rng), 0);
    }

    #[test]
    fn same_seed_same_samples() {
        let dist = OffDutyDuration::new(3600);
        let a: Vec<u64> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..20).map(|_| dist.sample(&mut rng)).collect()
        };
        let b: Vec<u64> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..20).map(|_| dist.sample(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn exponential_mean_is_close() {
        let dist = ExponentialDuration::new(300.0);
        let mut rng = StdRng::seed_from_u64(5);
        let n = 20_000;
        let total: f64 = (0..n).map(|_| dist.sample(&mut rng)).sum();
        let mean = total / n as f64;
        assert!((mean - 300.0).abs() < 15.0, "sample mean {mean}");
    }

    #[test]
    fn exponential_zero_mean() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(ExponentialDuration::new(0.0).sample(&mut rng), 0.0);
    }
}
