use common::Bar;

/// Whether the latest bar's volume exceeds `factor` times the average of the
/// `window` bars before it. `None` with fewer than `window + 1` bars.
pub fn volume_surge(bars: &[Bar], window: usize, factor: f64) -> Option<bool> {
    if window == 0 || bars.len() < window + 1 {
        return None;
    }
    let (current, previous) = bars.split_last()?;
    let recent = &previous[previous.len() - window..];
    let avg = recent.iter().map(|b| b.volume).sum::<f64>() / window as f64;
    Some(current.volume > factor * avg)
}
