use chrono::{DateTime, Duration, TimeZone, Utc};
use drawdown_sniper::analyzer::{compute_derived, extract_periods, summarize};
use drawdown_sniper::model::{PricePoint, PriceSeries};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 3, 0, 0, 0).unwrap()
}

fn random_walk(seed: u64, len: usize) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 100.0_f64;
    let mut ts = t0();
    let mut points = Vec::with_capacity(len);
    for _ in 0..len {
        points.push(PricePoint::new(ts, price));
        price *= 1.0 + rng.random_range(-0.08..0.08);
        ts += Duration::days(rng.random_range(1..4));
    }
    PriceSeries::new(points).unwrap()
}

#[test]
fn ath_is_monotone_and_bounds_price() {
    for seed in 0..20 {
        let series = random_walk(seed, 300);
        let derived = compute_derived(&series, 0.2).unwrap();

        assert_eq!(derived.len(), series.len());
        for w in derived.points.windows(2) {
            assert!(w[1].ath >= w[0].ath);
        }
        let mut running = f64::MIN;
        for (p, d) in series.points().iter().zip(&derived.points) {
            running = running.max(p.price);
            assert_eq!(d.ath, running);
            assert!(d.ath >= p.price);
            assert!(d.drawdown <= 0.0);
            assert_eq!(d.drawdown == 0.0, p.price == d.ath);
            assert_eq!(d.in_drawdown, d.drawdown <= -0.2);
        }
    }
}

#[test]
fn periods_reproduce_flagged_regions_exactly() {
    for seed in 0..20 {
        for threshold in [0.05, 0.1, 0.2, 0.35] {
            let series = random_walk(seed, 400);
            let derived = compute_derived(&series, threshold).unwrap();
            let periods = extract_periods(&derived, threshold).unwrap();

            // Mark every in-run point: [start, end) for closed periods, [start, end] for ongoing.
            let marked: Vec<bool> = derived
                .points
                .iter()
                .map(|p| {
                    periods.iter().any(|period| {
                        p.timestamp >= period.start
                            && (p.timestamp < period.end || (period.ongoing && p.timestamp == period.end))
                    })
                })
                .collect();
            let flags: Vec<bool> = derived.points.iter().map(|p| p.in_drawdown).collect();
            assert_eq!(marked, flags, "seed {seed} threshold {threshold}");

            for w in periods.windows(2) {
                assert!(w[0].end <= w[1].start, "periods overlap");
                assert!(!w[0].ongoing, "only the last period may be ongoing");
            }

            for period in &periods {
                let expected = derived
                    .points
                    .iter()
                    .filter(|p| p.in_drawdown && period.contains(p.timestamp))
                    .map(|p| p.drawdown)
                    .fold(0.0_f64, f64::min);
                assert_eq!(period.max_drawdown, expected);
                assert!(period.max_drawdown <= -threshold);
            }

            let stats = summarize(&derived, &periods);
            assert_eq!(stats.period_count, periods.len());
            assert_eq!(stats.ongoing, flags.last().copied().unwrap_or(false));
        }
    }
}

#[test]
fn rising_series_has_no_periods() {
    let points = (0..50)
        .map(|i| PricePoint::new(t0() + Duration::days(i), 10.0 + i as f64))
        .collect();
    let series = PriceSeries::new(points).unwrap();
    let derived = compute_derived(&series, 0.01).unwrap();

    assert!(derived.points.iter().all(|p| p.drawdown == 0.0));
    assert!(extract_periods(&derived, 0.01).unwrap().is_empty());
}

#[test]
fn threshold_of_one_never_triggers_for_positive_prices() {
    let series = random_walk(99, 200);
    let derived = compute_derived(&series, 1.0).unwrap();
    assert!(extract_periods(&derived, 1.0).unwrap().is_empty());
}
