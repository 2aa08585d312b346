// Decimator - largest-triangle-three-buckets reduction for rendering
//
// Lossy: the point budget exists for drawing performance only.
// Every flagged gap keeps both of its endpoints, so a reduced series still
// shows the same outages as the full one. Buckets and budget shares follow
// elapsed time, not sample counts, so a sparse stretch keeps its share of the
// screen next to a dense one.
use super::gaps::GapAnnotation;
use crate::domain::telemetry::{NormalizedSeries, Sample};
use std::ops::Range;

/// Default per-chart point budget.
pub const DEFAULT_TARGET_POINTS: usize = 1000;

/// Reduce `series` to at most `target_max` points.
///
/// Returns the input untouched when it already fits. Otherwise each gap-free
/// run gets a share of the budget proportional to the time it covers and is
/// reduced on its own, so no representative ever spans a gap.
pub fn decimate(
    series: NormalizedSeries,
    target_max: usize,
    annotation: &GapAnnotation,
) -> NormalizedSeries {
    if series.len() <= target_max {
        return series;
    }

    let samples = series.as_slice();
    let runs = runs_or_whole(annotation, samples.len());
    let quotas = allocate(&runs, samples, target_max);

    let mut out = Vec::with_capacity(target_max);
    for (run, quota) in runs.iter().zip(quotas) {
        if let Some(run) = samples.get(run.clone()) {
            lttb_into(run, quota, &mut out);
        }
    }

    NormalizedSeries::from_sorted(out)
}

fn runs_or_whole(annotation: &GapAnnotation, len: usize) -> Vec<Range<usize>> {
    let covered: usize = annotation.runs.iter().map(|r| r.len()).sum();
    if covered == len && !annotation.runs.is_empty() {
        annotation.runs.clone()
    } else {
        // Annotation belongs to another series; treat it as one run.
        vec![0..len]
    }
}

fn duration_ms(samples: &[Sample], run: &Range<usize>) -> u128 {
    samples
        .get(run.clone())
        .and_then(|run| Some(run.last()?.time_ms.abs_diff(run.first()?.time_ms)))
        .map_or(0, u128::from)
}

/// Split `budget` across runs. Each run first gets its endpoints (one point
/// for a singleton); the remainder goes out in proportion to each run's
/// duration by largest remainder, ties to the earlier run. A run never gets
/// more points than it has; what it cannot take is shared among the others.
/// If even the endpoints do not fit, the budget wins and later runs get fewer
/// points.
fn allocate(runs: &[Range<usize>], samples: &[Sample], budget: usize) -> Vec<usize> {
    let mut quotas: Vec<usize> = runs.iter().map(|r| r.len().min(2)).collect();
    let base: usize = quotas.iter().sum();

    if base > budget {
        let mut left = budget;
        for quota in quotas.iter_mut() {
            let take = (*quota).min(left);
            *quota = take;
            left -= take;
        }
        // Prefer one point per run over two points for the first few.
        let starved = quotas.iter().filter(|q| **q == 0).count();
        let doubles: Vec<usize> = (0..quotas.len()).filter(|i| quotas[*i] == 2).collect();
        for i in doubles.into_iter().rev().take(starved) {
            quotas[i] = 1;
        }
        let mut spare = budget - quotas.iter().sum::<usize>();
        for quota in quotas.iter_mut().filter(|q| **q == 0) {
            if spare == 0 {
                break;
            }
            *quota = 1;
            spare -= 1;
        }
        return quotas;
    }

    let durations: Vec<u128> = runs.iter().map(|r| duration_ms(samples, r)).collect();
    let mut remaining = budget - base;

    while remaining > 0 {
        let open: Vec<usize> = (0..runs.len())
            .filter(|&i| quotas[i] < runs[i].len() && durations[i] > 0)
            .collect();
        let weight: u128 = open.iter().map(|&i| durations[i]).sum();
        if weight == 0 {
            break;
        }

        let mut remainders = Vec::with_capacity(open.len());
        for &i in &open {
            let share = remaining as u128 * durations[i];
            let room = runs[i].len() - quotas[i];
            let whole = usize::try_from(share / weight).unwrap_or(usize::MAX).min(room);
            quotas[i] += whole;
            remainders.push((share % weight, i));
        }
        remaining = budget.saturating_sub(quotas.iter().sum::<usize>());

        remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        for (_, i) in remainders {
            if remaining == 0 {
                break;
            }
            if quotas[i] < runs[i].len() {
                quotas[i] += 1;
                remaining -= 1;
            }
        }
    }
    quotas
}

/// Cut `inner` into at most `count` buckets of equal duration spanning
/// `start_ms..end_ms`. Empty buckets are dropped.
fn time_buckets(inner: &[Sample], start_ms: i64, end_ms: i64, count: usize) -> Vec<Range<usize>> {
    let width = (end_ms as f64 - start_ms as f64) / count as f64;
    let mut buckets = Vec::with_capacity(count);
    let mut from = 0;
    for k in 1..=count {
        let to = if k == count {
            inner.len()
        } else {
            let edge = start_ms as f64 + k as f64 * width;
            inner.partition_point(|s| (s.time_ms as f64) < edge)
        };
        if to > from {
            buckets.push(from..to);
            from = to;
        }
    }
    buckets
}

fn centroid(bucket: &[Sample]) -> (f64, f64) {
    let count = bucket.len() as f64;
    (
        bucket.iter().map(|s| s.time_ms as f64).sum::<f64>() / count,
        bucket.iter().map(|s| s.value).sum::<f64>() / count,
    )
}

/// Largest-triangle-three-buckets over one gap-free run.
fn lttb_into(run: &[Sample], quota: usize, out: &mut Vec<Sample>) {
    let n = run.len();
    if quota == 0 || n == 0 {
        return;
    }
    if quota >= n {
        out.extend_from_slice(run);
        return;
    }
    if quota == 1 {
        out.push(run[0]);
        return;
    }
    let first = run[0];
    let last = run[n - 1];
    out.push(first);
    if quota == 2 {
        out.push(last);
        return;
    }

    let inner = &run[1..n - 1];
    let buckets = time_buckets(inner, first.time_ms, last.time_ms, quota - 2);
    let mut a = first;

    for (k, bucket) in buckets.iter().enumerate() {
        let (avg_x, avg_y) = buckets
            .get(k + 1)
            .map_or((last.time_ms as f64, last.value), |next| centroid(&inner[next.clone()]));

        let a_x = a.time_ms as f64;
        let mut max_area = -1.0f64;
        let mut chosen = inner[bucket.start];
        for sample in &inner[bucket.clone()] {
            let area = ((a_x - avg_x) * (sample.value - a.value)
                - (a_x - sample.time_ms as f64) * (avg_y - a.value))
                .abs();
            if area > max_area {
                max_area = area;
                chosen = *sample;
            }
        }

        out.push(chosen);
        a = chosen;
    }

    out.push(last);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::gaps::{annotate, gap_threshold};
    use crate::application::normalizer::normalize;
    use crate::domain::telemetry::RawSample;

    fn regular(count: usize, step_ms: i64, f: impl Fn(usize) -> f64) -> NormalizedSeries {
        let raw: Vec<_> = (0..count)
            .map(|i| RawSample::at_millis(i as i64 * step_ms, f(i)))
            .collect();
        normalize(&raw).series
    }

    fn reduce(series: NormalizedSeries, target: usize, bucket_seconds: f64) -> NormalizedSeries {
        let annotation = annotate(&series, gap_threshold(Some(bucket_seconds)));
        decimate(series, target, &annotation)
    }

    #[test]
    fn test_identity_when_within_budget() {
        let series = regular(100, 1_000, |i| i as f64);
        let out = reduce(series.clone(), 100, 1.0);
        assert_eq!(out, series);

        let out = reduce(series.clone(), 500, 1.0);
        assert_eq!(out, series);
    }

    #[test]
    fn test_respects_budget_and_order() {
        let series = regular(10_000, 1_000, |i| (i as f64 / 50.0).sin());
        for target in [3, 10, 999, 1000] {
            let out = reduce(series.clone(), target, 1.0);
            assert!(out.len() <= target, "target {target} gave {}", out.len());
            assert_eq!(out.len(), target);
            assert!(out.as_slice().windows(2).all(|w| w[0].time_ms < w[1].time_ms));
        }
    }

    #[test]
    fn test_never_invents_points() {
        let series = regular(5_000, 1_000, |i| ((i * 7919) % 101) as f64);
        let out = reduce(series.clone(), 200, 1.0);
        for sample in out.iter() {
            assert!(series.as_slice().contains(sample));
        }
    }

    #[test]
    fn test_keeps_endpoints_and_spike() {
        let series = regular(2_000, 1_000, |i| if i == 1234 { 500.0 } else { 1.0 });
        let out = reduce(series.clone(), 50, 1.0);

        assert_eq!(out.first(), series.first());
        assert_eq!(out.last(), series.last());
        assert!(out.iter().any(|s| s.value == 500.0));
    }

    #[test]
    fn test_deterministic() {
        let series = regular(3_000, 1_000, |i| (i as f64).cos());
        let a = reduce(series.clone(), 100, 1.0);
        let b = reduce(series, 100, 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_gap_endpoints_survive() {
        // Two dense runs of one-second samples separated by an hour.
        let raw: Vec<_> = (0..1_000)
            .map(|i| RawSample::at_millis(i * 1_000, (i % 13) as f64))
            .chain((0..1_000).map(|i| RawSample::at_millis(4_600_000 + i * 1_000, 2.0)))
            .collect();
        let series = normalize(&raw).series;
        let annotation = annotate(&series, gap_threshold(Some(1.0)));
        assert_eq!(annotation.gaps.len(), 1);

        let out = decimate(series, 40, &annotation);
        assert!(out.len() <= 40);
        let times: Vec<_> = out.iter().map(|s| s.time_ms).collect();
        assert!(times.contains(&999_000));
        assert!(times.contains(&4_600_000));

        let reduced = annotate(&out, gap_threshold(Some(1.0)));
        assert!(reduced
            .gaps
            .iter()
            .any(|g| g.start_ms == 999_000 && g.end_ms == 4_600_000));
    }

    #[test]
    fn test_budget_wins_over_many_gaps() {
        // Every sample isolated: 100 runs of one point, budget of 10.
        let series = regular(100, 10_000, |i| i as f64);
        let out = reduce(series, 10, 1.0);
        assert_eq!(out.len(), 10);
        assert!(out.as_slice().windows(2).all(|w| w[0].time_ms < w[1].time_ms));
    }

    fn timed(times: impl IntoIterator<Item = i64>) -> Vec<Sample> {
        times.into_iter().map(|t| Sample::new(t, 1.0)).collect()
    }

    #[test]
    fn test_allocate_follows_duration() {
        let samples = timed((0..1_000).map(|i| i * 1_000));
        let quotas = allocate(&[0..900, 900..1000], &samples, 100);
        assert_eq!(quotas.iter().sum::<usize>(), 100);
        assert_eq!(quotas, vec![88, 12]);

        let quotas = allocate(&[0..1, 1..500, 500..1000], &samples, 20);
        assert_eq!(quotas.iter().sum::<usize>(), 20);
        assert_eq!(quotas[0], 1);
    }

    #[test]
    fn test_allocate_sparse_run_outweighs_dense_run() {
        // Same sample count, but the second run covers a hundred times longer.
        let samples = timed((0..100).map(|i| i * 1_000).chain((0..100).map(|i| 1_000_000 + i * 100_000)));
        let quotas = allocate(&[0..100, 100..200], &samples, 44);
        assert_eq!(quotas, vec![2, 42]);
    }

    #[test]
    fn test_allocate_caps_short_runs() {
        // A long run of three samples cannot take its time share; the rest moves on.
        let samples = timed([0, 5_000_000, 10_000_000].into_iter().chain((0..1_000).map(|i| 20_000_000 + i * 1_000)));
        let quotas = allocate(&[0..3, 3..1003], &samples, 100);
        assert_eq!(quotas, vec![3, 97]);
    }

    #[test]
    fn test_sparse_tail_keeps_screen_share() {
        // Dense one-second samples, then a sparse tail covering as much time.
        let raw: Vec<_> = (0..10_000)
            .map(|i| RawSample::at_millis(i * 1_000, (i % 17) as f64))
            .chain((1..=100).map(|j| RawSample::at_millis(10_000_000 + j * 100_000, (j % 5) as f64)))
            .collect();
        let series = normalize(&raw).series;
        let annotation = annotate(&series, gap_threshold(Some(200.0)));
        assert!(annotation.gaps.is_empty());

        let out = decimate(series.clone(), 50, &annotation);
        assert!(out.len() <= 50);
        assert_eq!(out.first(), series.first());
        assert_eq!(out.last(), series.last());
        let tail = out.iter().filter(|s| s.time_ms >= 10_000_000).count();
        assert!(tail >= 20, "sparse half kept only {tail} points");
    }

    #[test]
    fn test_time_buckets_skip_empty_spans() {
        let inner = timed([1, 2, 3, 97, 98]);
        let buckets = time_buckets(&inner, 0, 100, 10);
        assert_eq!(buckets, vec![0..3, 3..5]);
    }

    #[test]
    fn test_allocate_starved_runs_get_one_point_first() {
        let runs: Vec<_> = (0..5).map(|i| i * 10..i * 10 + 10).collect();
        let samples = timed((0..50).map(|i| i * 1_000));
        let quotas = allocate(&runs, &samples, 7);
        assert_eq!(quotas.iter().sum::<usize>(), 7);
        assert!(quotas.iter().all(|q| *q >= 1));
    }
}
