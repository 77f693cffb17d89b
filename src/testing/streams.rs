use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic stream of i.i.d. standard-normal samples (Box-Muller).
pub struct NormalStream {
    rng: StdRng,
    spare: Option<f64>,
}

impl NormalStream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            spare: None,
        }
    }

    fn draw(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        let u1: f64 = self.rng.random::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = self.rng.random();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        self.spare = Some(radius * angle.sin());
        radius * angle.cos()
    }
}

impl Iterator for NormalStream {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.draw())
    }
}

/// Deterministic AR(1) stream: `x[t] = rho * x[t-1] + noise`, producing the
/// autocorrelated samples binning analyses exist for. The noise amplitude is
/// chosen so the stationary variance is 1.
pub struct ArStream {
    normal: NormalStream,
    rho: f64,
    noise_scale: f64,
    last: f64,
}

impl ArStream {
    /// `rho` is the lag-1 autocorrelation, in `(-1, 1)`.
    pub fn new(seed: u64, rho: f64) -> Self {
        assert!(rho.abs() < 1.0, "rho must lie in (-1, 1)");
        Self {
            normal: NormalStream::new(seed),
            rho,
            noise_scale: (1.0 - rho * rho).sqrt(),
            last: 0.0,
        }
    }
}

impl Iterator for ArStream {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.last = self.rho * self.last + self.noise_scale * self.normal.draw();
        Some(self.last)
    }
}
