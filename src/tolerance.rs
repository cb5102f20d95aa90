//! Tolerant comparisons for beat times
//!
//! Times come out of tempo arithmetic, so two instants that are "the same"
//! rarely compare equal bit for bit. Everything in the checker goes through
//! [`almost_equal`] instead of `==`.

/// Relative tolerance denominator: two times are equal when they differ by
/// at most 1/4096 of their combined magnitude.
const TOLERANCE_SCALE: f64 = 4096.0;

/// Scale-relative equality. `almost_equal(0.0, 0.0)` holds.
pub fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() * TOLERANCE_SCALE <= a.abs() + b.abs()
}

/// Linear membership test under tolerance
pub fn includes(values: &[f64], value: f64) -> bool {
    values.iter().any(|&x| almost_equal(x, value))
}

/// Sort ascending and drop adjacent near-duplicates.
pub fn unique(values: &mut Vec<f64>) {
    values.sort_by(f64::total_cmp);
    values.dedup_by(|b, a| almost_equal(*a, *b));
}

/// Index range of the elements of a sorted slice whose key is
/// tolerance-equal to `value`.
///
/// Tolerance-equal elements of a sorted slice are contiguous, so this is a
/// binary search for the start of the run followed by a short scan.
pub fn matching_range<T>(sorted: &[T], key: impl Fn(&T) -> f64, value: f64) -> std::ops::Range<usize> {
    let start = sorted.partition_point(|x| {
        let k = key(x);
        k < value && !almost_equal(k, value)
    });
    let len = sorted[start..]
        .iter()
        .take_while(|&x| almost_equal(key(x), value))
        .count();
    start..start + len
}

/// Binary-search membership test for a sorted slice of times
pub fn contains_sorted(sorted: &[f64], value: f64) -> bool {
    !matching_range(sorted, |&x| x, value).is_empty()
}
