//! Power Sampled Light Array

use lsis_core::compute::*;
use lsis_core::error::BuildTransferError;
use lsis_core::light::Light;
use lsis_core::pbrt::*;

/// Flat light list sampled proportionally to light power.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LightArray {
    /// Lower edges of each light's interval; `n + 1` entries from 0 to 1.
    cdf: Vec<Float>,
}

impl LightArray {
    /// Build the power CDF for the lights.
    ///
    /// * `lights` - The lights.
    pub fn new(lights: &[Light]) -> Self {
        let cdf = power_cdf(lights);
        info!("Light array created for {} lights", lights.len());
        Self { cdf }
    }

    /// Returns the number of lights.
    pub fn len(&self) -> usize {
        self.cdf.len().saturating_sub(1)
    }

    /// Returns true if there are no lights.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the CDF.
    pub fn cdf(&self) -> &[Float] {
        &self.cdf
    }

    /// Returns the light selected by `u` and its probability, or `None`
    /// without lights.
    ///
    /// * `u` - Uniform sample in `[0, 1)`.
    pub fn sample(&self, u: Float) -> Option<(usize, Float)> {
        if self.is_empty() {
            return None;
        }
        let i = find_interval(self.cdf.len(), |i| self.cdf[i] <= u);
        Some((i, self.pdf(i)))
    }

    /// Returns the probability of selecting light `i`.
    ///
    /// * `i` - Light index.
    pub fn pdf(&self, i: usize) -> Float {
        if i < self.len() {
            self.cdf[i + 1] - self.cdf[i]
        } else {
            0.0
        }
    }

    /// Copy the CDF to the device.
    ///
    /// * `ctx` - The compute context.
    pub fn upload(&self, ctx: &mut ComputeContext) -> Result<TypedBuffer<Float>, BuildTransferError> {
        ctx.upload("Light power CDF", &self.cdf)
    }
}

/// Returns the power CDF `[0, p_0 / s, (p_0 + p_1) / s, ..., 1]` where `s`
/// is the total power. Lights without power get empty intervals; if every
/// light is dark the CDF is uniform.
///
/// * `lights` - The lights.
pub fn power_cdf(lights: &[Light]) -> Vec<Float> {
    if lights.is_empty() {
        return vec![];
    }

    let powers: Vec<Float> = lights.iter().map(|l| max(l.power(), 0.0)).collect();
    let sum: Float = powers.iter().sum();

    let n = lights.len() as Float;
    let (powers, sum) = if sum > 0.0 && sum.is_finite() {
        (powers, sum)
    } else {
        warn!("Total light power is {}; sampling lights uniformly", sum);
        (vec![1.0; lights.len()], n)
    };

    let inv_sum = 1.0 / sum;
    let mut cdf = Vec::with_capacity(lights.len() + 1);
    cdf.push(0.0);
    let mut acc = 0.0;
    for p in powers {
        acc += p * inv_sum;
        cdf.push(min(acc, 1.0));
    }
    if let Some(last) = cdf.last_mut() {
        *last = 1.0;
    }
    cdf
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
