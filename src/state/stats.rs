use burn::prelude::*;
use std::fmt;

/// Summary statistics over one parameter tensor's values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamStats {
    pub count: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    /// Sample standard deviation (n - 1 denominator).
    pub std: f32,
    pub nan_count: usize,
}

impl ParamStats {
    /// Computes statistics from a tensor, converting its data to `f32` on
    /// the host.
    pub fn of<B: Backend, const D: usize>(tensor: &Tensor<B, D>) -> Self {
        let data = tensor.to_data().convert::<f32>();
        let values = data.to_vec::<f32>().expect("data was converted to f32");
        Self::from_values(&values)
    }

    /// NaN values are counted separately and excluded from the numeric
    /// statistics.
    pub fn from_values(values: &[f32]) -> Self {
        let nan_count = values.iter().filter(|value| value.is_nan()).count();
        let numeric: Vec<f32> = values.iter().copied().filter(|value| !value.is_nan()).collect();
        if numeric.is_empty() {
            return Self {
                count: values.len(),
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                std: 0.0,
                nan_count,
            };
        }

        let min = numeric.iter().copied().fold(f32::INFINITY, f32::min);
        let max = numeric.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean = numeric.iter().sum::<f32>() / numeric.len() as f32;
        let std = if numeric.len() > 1 {
            let variance = numeric.iter().map(|value| (value - mean).powi(2)).sum::<f32>()
                / (numeric.len() - 1) as f32;
            variance.sqrt()
        } else {
            0.0
        };

        Self {
            count: values.len(),
            min,
            max,
            mean,
            std,
            nan_count,
        }
    }
}

impl fmt::Display for ParamStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min {:+.4} max {:+.4} mean {:+.4} std {:.4}",
            self.min, self.max, self.mean, self.std,
        )?;
        if self.nan_count > 0 {
            write!(f, " ({} NaN)", self.nan_count)?;
        }
        Ok(())
    }
}
