use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal, Uniform};

use super::RowGen;
use crate::error::Result;

/// A row generator that samples every element from a probabilistic distribution.
///
/// The rng sits behind a mutex so concurrent materializations draw from one stream.
#[derive(Debug)]
pub struct RandRowGen<D: Distribution<f32>> {
    rng: Mutex<StdRng>,
    distribution: D,
}

impl<D: Distribution<f32>> RandRowGen<D> {
    /// Creates a new `RandRowGen` row generator.
    ///
    /// # Arguments
    /// * `seed` - An optional seed for the rng, the OS entropy source is used otherwise.
    /// * `distribution` - The distribution to sample the values from.
    pub fn new(seed: Option<u64>, distribution: D) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            rng: Mutex::new(rng),
            distribution,
        }
    }
}

impl RandRowGen<Uniform<f32>> {
    /// Creates a new `RandRowGen` row generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `seed` - An optional seed for the rng.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(seed: Option<u64>, low: f32, high: f32) -> Result<Self> {
        Ok(Self::new(seed, Uniform::new(low, high)?))
    }
}

impl RandRowGen<Normal<f32>> {
    /// Creates a new `RandRowGen` row generator with a normal distribution.
    ///
    /// # Arguments
    /// * `seed` - An optional seed for the rng.
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn normal(seed: Option<u64>, mean: f32, std_dev: f32) -> Result<Self> {
        Ok(Self::new(seed, Normal::new(mean, std_dev)?))
    }
}

impl<D> RowGen for RandRowGen<D>
where
    D: Distribution<f32> + Send + Sync,
{
    fn fill(&self, row: &mut [f32]) {
        let mut rng = self.rng.lock();
        row.iter_mut()
            .for_each(|x| *x = self.distribution.sample(&mut *rng));
    }
}
