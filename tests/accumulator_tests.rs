// Accumulator tests: truncation, extrapolation at period boundaries, identity grouping

mod common;

use common::{HOUR_MS, attrs, snap};
use usagelog::accumulator::{UsageAccumulator, accumulate};
use usagelog::models::{Counter, Period};

fn accumulator(period: Period, first: (i64, i64, i64), last: Option<(i64, i64, i64)>) -> UsageAccumulator {
    let mut acc = UsageAccumulator::new(
        attrs("x", "m1.small", "alice"),
        snap("x", first.0, first.1, first.2),
        period,
    );
    if let Some((ts, disk, net)) = last {
        acc.update(snap("x", ts, disk, net));
    }
    acc
}

#[test]
fn first_sample_before_period_is_scaled_down() {
    // Samples at 0 (100) and 1h (150); period is [30m, 90m].
    let period = Period::new(1_800_000, 5_400_000);
    let acc = accumulator(period, (0, 100, 0), Some((3_600_000, 150, 0)));

    assert_eq!(acc.truncated_interval(), Period::new(1_800_000, 3_600_000));
    assert_eq!(acc.duration_secs(), 1800);
    assert_eq!(acc.extrapolated_delta(Counter::DiskIo), 25);
    assert_eq!(acc.disk_io_megs(), 25);
}

#[test]
fn overhang_on_both_ends_compounds() {
    // Period [4h, 8h]; samples 1h before and 1h after: each side keeps 3/4.
    let period = Period::new(4 * HOUR_MS, 8 * HOUR_MS);
    let acc = accumulator(period, (3 * HOUR_MS, 0, 0), Some((9 * HOUR_MS, 1000, 3000)));

    assert_eq!(acc.disk_io_megs(), 562); // 1000 * 0.75 * 0.75 = 562.5
    assert_eq!(acc.network_io_megs(), 1687); // 3000 * 0.5625 = 1687.5
    assert_eq!(acc.truncated_interval(), period);
    assert_eq!(acc.duration_secs(), 4 * 3600);
}

#[test]
fn last_sample_after_period_is_scaled_down() {
    let period = Period::new(2 * HOUR_MS, 4 * HOUR_MS);
    let acc = accumulator(period, (2 * HOUR_MS, 0, 0), Some((5 * HOUR_MS, 90, 30)));
    // 1h of the 2h duration overhangs: keep half.
    assert_eq!(acc.disk_io_megs(), 45);
    assert_eq!(acc.network_io_megs(), 15);
    assert_eq!(acc.duration_secs(), 2 * 3600);
}

#[test]
fn samples_inside_period_use_raw_delta() {
    let period = Period::new(HOUR_MS, 5 * HOUR_MS);
    let acc = accumulator(period, (2 * HOUR_MS, 10, 5), Some((4 * HOUR_MS, 70, 25)));
    assert_eq!(acc.disk_io_megs(), 60);
    assert_eq!(acc.network_io_megs(), 20);
    assert_eq!(acc.truncated_interval(), Period::new(2 * HOUR_MS, 4 * HOUR_MS));
    assert_eq!(acc.duration_secs(), 7200);
}

#[test]
fn single_snapshot_yields_zero() {
    let period = Period::new(HOUR_MS, 3 * HOUR_MS);
    let acc = accumulator(period, (2 * HOUR_MS, 500, 700), None);
    assert_eq!(acc.first_snapshot(), acc.last_snapshot());
    assert_eq!(acc.disk_io_megs(), 0);
    assert_eq!(acc.network_io_megs(), 0);
    assert_eq!(acc.duration_secs(), 0);
}

#[test]
fn result_truncates_toward_zero() {
    // Period [3h, 6h]; first sample 1h early keeps 2/3 of the delta.
    let period = Period::new(3 * HOUR_MS, 6 * HOUR_MS);
    let up = accumulator(period, (2 * HOUR_MS, 0, 0), Some((5 * HOUR_MS, 100, 0)));
    assert_eq!(up.disk_io_megs(), 66);

    let down = accumulator(period, (2 * HOUR_MS, 100, 0), Some((5 * HOUR_MS, 0, 0)));
    assert_eq!(down.disk_io_megs(), -66);
}

#[test]
fn update_replaces_last_unconditionally() {
    let period = Period::new(0, 10 * HOUR_MS);
    let mut acc = accumulator(period, (HOUR_MS, 0, 0), Some((5 * HOUR_MS, 50, 0)));
    acc.update(snap("x", 3 * HOUR_MS, 30, 0));
    assert_eq!(acc.last_snapshot().timestamp_ms, 3 * HOUR_MS);
    assert_eq!(acc.disk_io_megs(), 30);
}

#[test]
fn samples_entirely_after_period_give_inverted_interval() {
    let period = Period::new(HOUR_MS, 2 * HOUR_MS);
    let acc = accumulator(period, (3 * HOUR_MS, 0, 0), Some((4 * HOUR_MS, 10, 0)));
    let truncated = acc.truncated_interval();
    assert_eq!(truncated, Period::new(3 * HOUR_MS, 2 * HOUR_MS));
    assert!(acc.duration_secs() < 0);
}

#[test]
fn accumulate_groups_rows_by_identity() {
    let period = Period::new(0, 10 * HOUR_MS);
    let rows = vec![
        (attrs("a", "m1.small", "alice"), snap("a", HOUR_MS, 0, 0)),
        (attrs("a", "m1.small", "alice"), snap("a", 2 * HOUR_MS, 10, 1)),
        (attrs("a", "m1.small", "alice"), snap("a", 3 * HOUR_MS, 25, 2)),
        (attrs("b", "m1.large", "bob"), snap("b", 2 * HOUR_MS, 7, 7)),
    ];
    let by_identity = accumulate(rows, period);
    assert_eq!(by_identity.len(), 2);

    let a = &by_identity["a"];
    assert_eq!(a.first_snapshot().timestamp_ms, HOUR_MS);
    assert_eq!(a.last_snapshot().timestamp_ms, 3 * HOUR_MS);
    assert_eq!(a.disk_io_megs(), 25);
    assert_eq!(a.network_io_megs(), 2);

    let b = &by_identity["b"];
    assert_eq!(b.disk_io_megs(), 0);
    assert_eq!(b.attributes().resource_type, "m1.large");
}

#[test]
fn counter_reset_from_huge_value_saturates_negative() {
    let period = Period::new(0, 10);
    let acc = accumulator(period, (2, i64::MAX, 0), Some((3, -5, 0)));
    assert_eq!(acc.disk_io_megs(), i64::MIN);
    assert_eq!(acc.network_io_megs(), 0);
}

#[test]
fn extreme_timestamps_do_not_overflow() {
    // The whole sampled range before -1 is outside the period; the correction
    // scales the delta down to nothing.
    let period = Period::new(-1, i64::MAX);
    let acc = accumulator(period, (i64::MIN, 0, 0), Some((0, 100, 100)));
    assert_eq!(acc.truncated_interval(), Period::new(-1, 0));
    assert_eq!(acc.disk_io_megs(), 0);
    assert_eq!(acc.duration_secs(), 0);
}
