use crate::domain::{PricePoint, Timestamp};

/// Resample `points` onto the daily grid `start, start + 1d, ..., <= end`.
///
/// Exact hits are kept, interior gaps are linearly interpolated between the
/// nearest neighbours, and days outside the observed range repeat the
/// nearest edge value. `points` must be sorted by timestamp; an empty input
/// yields an empty grid.
pub fn interpolate_daily(points: &[PricePoint], start: Timestamp, end: Timestamp) -> Vec<PricePoint> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };

    let mut grid = Vec::new();
    let mut t = start;
    while t <= end {
        let after = points.partition_point(|p| p.timestamp < t);
        let price = match points.get(after) {
            Some(hit) if hit.timestamp == t => hit.price,
            Some(next) if after > 0 => {
                let prev = &points[after - 1];
                let span = (next.timestamp.as_secs() - prev.timestamp.as_secs()) as f64;
                let ratio = (t.as_secs() - prev.timestamp.as_secs()) as f64 / span;
                prev.price + (next.price - prev.price) * ratio
            }
            Some(_) => first.price,
            None => last.price,
        };
        grid.push(PricePoint {
            timestamp: t,
            price,
        });
        match t.next_day() {
            Some(next) => t = next,
            None => break,
        }
    }
    grid
}
