//! Level and decay measurements on rendered audio.

/// Floor for dB conversions.
pub const SILENCE_DB: f32 = -120.0;

/// Root-mean-square level.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Largest absolute sample.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Linear amplitude to dB, floored at [`SILENCE_DB`].
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        SILENCE_DB
    } else {
        (20.0 * linear.log10()).max(SILENCE_DB)
    }
}

/// Schroeder energy decay curve in dB, 0 dB at the first sample.
///
/// Accumulates in `f64` so late samples of a long tail still register.
pub fn energy_decay_curve(ir: &[f32]) -> Vec<f32> {
    let mut edc: Vec<f64> = Vec::with_capacity(ir.len());
    let mut tail = 0.0f64;
    for &s in ir.iter().rev() {
        tail += f64::from(s) * f64::from(s);
        edc.push(tail);
    }
    edc.reverse();

    let Some(&total) = edc.first() else {
        return Vec::new();
    };
    let total = total.max(1e-30);
    edc.into_iter()
        .map(|e| (10.0 * (e / total).max(1e-30).log10()) as f32)
        .collect()
}

/// Decay-time figures read off the energy decay curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rt60Estimate {
    /// Extrapolated 60 dB decay time, from T30 when the curve reaches
    /// -35 dB, otherwise from T20.
    pub rt60_seconds: f32,
    /// Fit over -5..-25 dB, scaled to 60 dB.
    pub t20_seconds: Option<f32>,
    /// Fit over -5..-35 dB, scaled to 60 dB.
    pub t30_seconds: Option<f32>,
    /// Fit over 0..-10 dB, scaled to 60 dB.
    pub edt_seconds: Option<f32>,
    /// |r| of the fit RT60 came from.
    pub correlation: f32,
}

/// Schroeder RT60 of an impulse response. `None` if the curve never falls
/// 25 dB.
pub fn estimate_rt60(ir: &[f32], sample_rate: f32) -> Option<Rt60Estimate> {
    let edc = energy_decay_curve(ir);
    let edt = decay_fit(&edc, 0.0, -10.0, sample_rate);
    let t20 = decay_fit(&edc, -5.0, -25.0, sample_rate);
    let t30 = decay_fit(&edc, -5.0, -35.0, sample_rate);

    let (rt60_seconds, correlation) = t30.or(t20)?;
    Some(Rt60Estimate {
        rt60_seconds,
        t20_seconds: t20.map(|(t, _)| t),
        t30_seconds: t30.map(|(t, _)| t),
        edt_seconds: edt.map(|(t, _)| t),
        correlation,
    })
}

/// Least-squares line through the EDC between two levels. Returns the
/// implied 60 dB decay time and the correlation of the fit.
fn decay_fit(edc: &[f32], start_db: f32, end_db: f32, sample_rate: f32) -> Option<(f32, f32)> {
    let start = edc.iter().position(|&e| e <= start_db)?;
    let end = edc.iter().position(|&e| e <= end_db)?;
    if end <= start + 1 {
        return None;
    }

    let n = (end - start + 1) as f64;
    let (mut sx, mut sy, mut sxy, mut sxx, mut syy) = (0.0f64, 0.0, 0.0, 0.0, 0.0);
    for (i, &db) in edc[start..=end].iter().enumerate() {
        let x = i as f64 / f64::from(sample_rate);
        let y = f64::from(db);
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
        syy += y * y;
    }
    let var_x = n * sxx - sx * sx;
    if var_x <= 0.0 {
        return None;
    }
    let cov = n * sxy - sx * sy;
    let slope = cov / var_x;
    if slope >= 0.0 {
        return None;
    }
    let var_y = n * syy - sy * sy;
    let correlation = if var_y > 0.0 {
        (cov / (var_x * var_y).sqrt()).abs()
    } else {
        0.0
    };
    Some(((-60.0 / slope) as f32, correlation as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential_decay(rt60: f32, sample_rate: f32, seconds: f32) -> Vec<f32> {
        // Alternating sign keeps it broadband without affecting energy.
        let decay_per_sample = 10f32.powf(-3.0 / (rt60 * sample_rate));
        let len = (seconds * sample_rate) as usize;
        let mut gain = 1.0f32;
        (0..len)
            .map(|i| {
                let s = if i % 2 == 0 { gain } else { -gain };
                gain *= decay_per_sample;
                s
            })
            .collect()
    }

    #[test]
    fn rms_of_constant() {
        assert!((rms(&[0.5; 64]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn db_floor() {
        assert_eq!(linear_to_db(0.0), SILENCE_DB);
        assert!((linear_to_db(1.0)).abs() < 1e-6);
        assert_eq!(linear_to_db(1e-9), SILENCE_DB);
    }

    #[test]
    fn edc_starts_at_zero_db_and_falls() {
        let edc = energy_decay_curve(&exponential_decay(1.0, 8000.0, 2.0));
        assert!(edc[0].abs() < 1e-4);
        assert!(edc.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn recovers_known_rt60() {
        let sample_rate = 8000.0;
        for rt60 in [0.5f32, 1.5, 3.0] {
            let ir = exponential_decay(rt60, sample_rate, rt60 * 2.0);
            let est = estimate_rt60(&ir, sample_rate).unwrap();
            assert!(
                (est.rt60_seconds - rt60).abs() / rt60 < 0.05,
                "rt60 {rt60}: estimated {}",
                est.rt60_seconds
            );
            assert!(est.correlation > 0.99);
            assert!(est.t30_seconds.is_some());
        }
    }

    #[test]
    fn short_decay_has_no_estimate() {
        let ir = vec![1.0, 0.9, 0.8];
        assert_eq!(estimate_rt60(&ir, 48000.0), None);
        assert_eq!(estimate_rt60(&[], 48000.0), None);
    }
}
