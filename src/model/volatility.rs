//! Week-to-week volatility of team strengths

use nalgebra::DVector;

use crate::Result;

/// Sample standard deviation (n - 1 denominator); zero for fewer than two samples
pub fn sample_std_dev(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let sum_sq: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum();
    (sum_sq / (n - 1) as f64).sqrt()
}

/// Per-team volatility for `week`, from the strengths of weeks `1..week`
///
/// `strengths_at` supplies the strength vector of an earlier week of the same
/// season, indexed like the current computation.
pub fn estimate<F>(week: u32, team_count: usize, mut strengths_at: F) -> Result<DVector<f64>>
where
    F: FnMut(u32) -> Result<DVector<f64>>,
{
    if week <= 1 {
        return Ok(DVector::zeros(team_count));
    }

    let history = (1..week)
        .map(&mut strengths_at)
        .collect::<Result<Vec<_>>>()?;

    let mut volatility = DVector::zeros(team_count);
    let mut samples = Vec::with_capacity(history.len());
    for i in 0..team_count {
        samples.clear();
        samples.extend(history.iter().map(|strengths| strengths[i]));
        volatility[i] = sample_std_dev(&samples);
    }
    Ok(volatility)
}
