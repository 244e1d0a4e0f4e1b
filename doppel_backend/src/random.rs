use rand::Rng;

/// Uniform sampler used by the trigger policy and the fallback picker.
pub trait RandomSource: Send + Sync {
    /// A sample from [0, 1).
    fn next_f64(&self) -> f64;

    /// An index in `0..len`. `len` is never zero.
    fn pick_index(&self, len: usize) -> usize;
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }

    fn pick_index(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Deterministic source for tests: always yields `value` and `index`.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedRandom {
    pub value: f64,
    pub index: usize,
}

#[cfg(test)]
impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        self.value
    }

    fn pick_index(&self, len: usize) -> usize {
        self.index.min(len - 1)
    }
}
