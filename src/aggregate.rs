//! Bucket aggregator (spec component C4).
//!
//! Folds raw samples into fixed-width statistical buckets the way
//! `services/analysis/bucket_reader.rs` folds sensor readings in the
//! teacher crate, and the way
//! `other_examples/877cb65d_agentreplay-agentreplay__agentreplay-storage-src-metrics_agg.rs.rs`
//! incrementally folds edges into `MetricsBucket`s — generalized here to a
//! one-shot fold over an already-fetched sample slice rather than an
//! incremental index.

use crate::storage::{Bucket, Order, Sample};

fn empty_bucket(start: i64, end: i64) -> Bucket {
    Bucket {
        start,
        end,
        samples: 0,
        min: 0.0,
        max: 0.0,
        sum: 0.0,
        avg: 0.0,
        first: 0.0,
        last: 0.0,
        empty: true,
    }
}

/// Fold `samples` (assumed already filtered to `[start, end)`, any order)
/// into buckets covering `[start, end)`, emit in `order`, capped at `limit`
/// buckets after ordering (spec §4.4 step 4: `DESC` drops the oldest, `ASC`
/// drops the newest past the cap).
pub fn fold_buckets(
    samples: &[Sample],
    start: i64,
    end: i64,
    bucket_width: i64,
    limit: i64,
    order: Order,
) -> Vec<Bucket> {
    if bucket_width <= 0 || end <= start {
        return Vec::new();
    }

    let span = end - start;
    let count = ((span as f64) / (bucket_width as f64)).ceil() as i64;
    let count = count.max(1) as usize;

    let mut buckets: Vec<Bucket> = (0..count)
        .map(|i| {
            let bucket_start = start + (i as i64) * bucket_width;
            let bucket_end = (bucket_start + bucket_width).min(end);
            empty_bucket(bucket_start, bucket_end)
        })
        .collect();

    // Fold in input order: a bucket's `first`/`last` must reflect the order
    // samples were observed, not sample value magnitude.
    for sample in samples {
        if sample.timestamp < start || sample.timestamp >= end {
            continue;
        }
        let idx = ((sample.timestamp - start) / bucket_width) as usize;
        let idx = idx.min(count - 1);
        let b = &mut buckets[idx];
        if b.samples == 0 {
            b.min = sample.value;
            b.max = sample.value;
            b.first = sample.value;
            b.empty = false;
        } else {
            b.min = b.min.min(sample.value);
            b.max = b.max.max(sample.value);
        }
        b.sum += sample.value;
        b.last = sample.value;
        b.samples += 1;
    }

    for b in &mut buckets {
        if b.samples > 0 {
            b.avg = b.sum / (b.samples as f64);
        }
    }

    match order {
        Order::Asc => {
            buckets.truncate(limit.max(0) as usize);
        }
        Order::Desc => {
            buckets.reverse();
            buckets.truncate(limit.max(0) as usize);
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64, v: f64) -> Sample {
        Sample::new(ts, v).unwrap()
    }

    #[test]
    fn single_bucket_matches_spec_scenario_5() {
        let samples = vec![sample(0, 1.0), sample(1, 3.0), sample(2, 5.0)];
        let buckets = fold_buckets(&samples, 0, 3, 3, 100, Order::Asc);
        assert_eq!(buckets.len(), 1);
        let b = buckets[0];
        assert_eq!(b.samples, 3);
        assert_eq!(b.min, 1.0);
        assert_eq!(b.max, 5.0);
        assert_eq!(b.sum, 9.0);
        assert_eq!(b.avg, 3.0);
        assert_eq!(b.first, 1.0);
        assert_eq!(b.last, 5.0);
        assert!(!b.empty);
    }

    #[test]
    fn covers_range_with_no_gaps() {
        let samples = vec![sample(0, 1.0), sample(25, 2.0)];
        let buckets = fold_buckets(&samples, 0, 30, 10, 100, Order::Asc);
        // ceil(30/10) = 3 buckets tiling [0,30).
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].start, 0);
        assert_eq!(buckets[0].end, 10);
        assert_eq!(buckets[1].start, 10);
        assert_eq!(buckets[1].end, 20);
        assert_eq!(buckets[2].start, 20);
        assert_eq!(buckets[2].end, 30);
        assert!(buckets[1].empty);
        assert!(!buckets[0].empty);
        assert!(!buckets[2].empty);
    }

    #[test]
    fn last_bucket_clips_to_end() {
        let buckets = fold_buckets(&[], 0, 25, 10, 100, Order::Asc);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[2].start, 20);
        assert_eq!(buckets[2].end, 25);
        assert_eq!(buckets[2].end - buckets[2].start, 5);
    }

    #[test]
    fn desc_order_reverses_and_drops_oldest_past_cap() {
        let samples = vec![sample(5, 1.0), sample(15, 2.0), sample(25, 3.0)];
        let buckets = fold_buckets(&samples, 0, 30, 10, 2, Order::Desc);
        assert_eq!(buckets.len(), 2);
        // Newest-first, oldest dropped.
        assert_eq!(buckets[0].start, 20);
        assert_eq!(buckets[1].start, 10);
    }

    #[test]
    fn asc_order_drops_newest_past_cap() {
        let samples = vec![sample(5, 1.0), sample(15, 2.0), sample(25, 3.0)];
        let buckets = fold_buckets(&samples, 0, 30, 10, 2, Order::Asc);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].start, 0);
        assert_eq!(buckets[1].start, 10);
    }

    #[test]
    fn out_of_range_samples_are_ignored() {
        let samples = vec![sample(-5, 9.0), sample(100, 9.0), sample(5, 1.0)];
        let buckets = fold_buckets(&samples, 0, 10, 10, 100, Order::Asc);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].samples, 1);
    }

    #[test]
    fn zero_bucket_width_returns_nothing() {
        assert!(fold_buckets(&[], 0, 10, 0, 100, Order::Asc).is_empty());
    }
}
