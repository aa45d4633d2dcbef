/// Simple moving average of `period` values, aligned with `values`.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    sma_opt(&wrapped, period)
}

/// Exponential moving average seeded with the SMA of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    ema_opt(&wrapped, period)
}

/// SMA over a series that may start with gaps; a window containing a gap yields `None`.
pub fn sma_opt(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        let sum: Option<f64> = window.iter().copied().sum();
        out[i] = sum.map(|s| s / period as f64);
    }
    out
}

/// EMA over a series that may start with gaps. The EMA starts at the first
/// run of `period` consecutive values; a later gap ends the series.
pub fn ema_opt(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    let Some(start) = values.iter().position(Option::is_some) else {
        return out;
    };
    let seed_end = start + period;
    if seed_end > values.len() {
        return out;
    }
    let Some(seed_sum) = values[start..seed_end].iter().copied().sum::<Option<f64>>() else {
        return out;
    };

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema_val = seed_sum / period as f64;
    out[seed_end - 1] = Some(ema_val);

    for i in seed_end..values.len() {
        let Some(price) = values[i] else {
            break;
        };
        ema_val = price * k + ema_val * (1.0 - k);
        out[i] = Some(ema_val);
    }
    out
}
