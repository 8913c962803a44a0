//! Behavior-driven tests for the factory facade.
//!
//! These tests verify WHAT a polling caller sees: live day and cash, day
//! changes, per-station series, materials state and lead times.

mod support;

use std::sync::Arc;
use std::time::Duration;

use littlefield_core::{
    CacheTtl, DayChange, DayChangeDetector, Littlefield, LittlefieldError, ParseError, Resource,
    StationId, TtlPolicy, ValidationError,
};
use support::{plot_page, ScriptedFetcher};

const LEAD_TIME_PAGE: &str = r#"<html><script>
    chart.add({label: 'contract 1', points: '1 0.52 2 0.61', color: '#0000ff'});
    chart.add({label: 'contract 2', points: '2 1.10', color: '#ff0000'});
    chart.add({label: 'contract 1', points: '3 0.58', color: '#0000ff'});
</script></html>"#;

const MATERIALS_PAGE: &str = r#"<html><body><h2>Raw Materials</h2>
    <p>Reorder point: 1,320 kits</p>
    <p>Order quantity: 7,200 kits</p>
    <p>Lead time: 4 days</p>
    </body></html>"#;

// =============================================================================
// Live day and cash
// =============================================================================

#[tokio::test]
async fn when_cash_advances_a_day_the_detector_reports_the_change() {
    // Given: Cash through day 3, with a zero freshness window so every poll fetches
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push(
        Resource::Cash,
        Ok(plot_page(&[(1, 1000.0), (2, 1050.0), (3, 1200.0)])),
    );
    fetcher.set_default(
        Resource::Cash,
        plot_page(&[(1, 1000.0), (2, 1050.0), (3, 1200.0), (4, 1300.0)]),
    );
    let policy = TtlPolicy::default().with_override(
        Resource::Cash,
        CacheTtl::new(Duration::ZERO, Duration::from_secs(60)),
    );
    let factory = Littlefield::new(policy, fetcher.clone());
    let detector = DayChangeDetector::new();

    // When: The first poll runs
    let point = factory.live_point().await.expect("first poll");

    // Then: Day 3 with 1200 in cash is the starting point
    assert_eq!(point.day, 3);
    assert_eq!(point.value, 1200.0);
    assert_eq!(detector.observe(point.day), DayChange::First { day: 3 });

    // When: The next poll sees day 4
    let day = factory.live_day().await.expect("second poll");

    // Then: The advance from 3 to 4 is detected
    assert_eq!(day, 4);
    assert_eq!(detector.observe(day), DayChange::Advanced { from: 3, to: 4 });
    assert_eq!(factory.live_cash().await, Ok(1300.0));
}

#[tokio::test]
async fn when_polled_within_the_ttl_live_day_is_stable_and_fetches_once() {
    let fetcher = Arc::new(
        ScriptedFetcher::new().serve(
            Resource::Cash,
            plot_page(&[(1, 1000.0), (2, 1050.0), (3, 1200.0)]),
        ),
    );
    let factory = Littlefield::new(TtlPolicy::default(), fetcher.clone());
    let detector = DayChangeDetector::new();

    let first = factory.live_day().await.expect("first");
    let second = factory.live_day().await.expect("second");

    assert_eq!(first, 3);
    assert_eq!(second, 3);
    detector.observe(first);
    assert_eq!(detector.observe(second), DayChange::Unchanged { day: 3 });
    assert_eq!(fetcher.fetches(Resource::Cash), 1);
}

#[tokio::test]
async fn when_cash_contains_a_duplicate_day_the_query_fails_with_a_parse_error() {
    // Given: Two rows for day 5 with different values
    let fetcher = Arc::new(ScriptedFetcher::new().serve(
        Resource::Cash,
        "{points: '4 900 5 1000 5 1100'}",
    ));
    let factory = Littlefield::new(TtlPolicy::default(), fetcher);

    // When: Cash is queried
    let error = factory.cash().await.expect_err("duplicate day");

    // Then: Neither value was picked
    assert!(matches!(
        error,
        LittlefieldError::Parse(ParseError::DuplicateDay { day: 5, .. })
    ));
    assert_eq!(error.code(), "payload.parse");
}

// =============================================================================
// Stations
// =============================================================================

#[tokio::test]
async fn when_a_station_is_selected_by_ordinal_it_reads_its_own_series() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .serve(
                Resource::StationUtilization(StationId::Three),
                plot_page(&[(1, 0.25), (2, 0.8)]),
            )
            .serve(
                Resource::StationQueue(StationId::Three),
                plot_page(&[(2, 12.0), (1, 3.0)]),
            ),
    );
    let factory = Littlefield::new(TtlPolicy::default(), fetcher);

    let station = factory.station(3).expect("station 3 exists");
    let utilization = station.utilization().await.expect("utilization");
    let queue = station.queue_size().await.expect("queue");

    assert_eq!(station.id(), StationId::Three);
    assert_eq!(utilization.latest().map(|point| point.value), Some(0.8));
    assert_eq!(queue.pairs(), vec![(1, 3.0), (2, 12.0)]);
}

#[test]
fn when_a_station_ordinal_is_out_of_range_it_is_rejected_before_any_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let factory = Littlefield::new(TtlPolicy::default(), fetcher.clone());

    for ordinal in [0, 4] {
        assert_eq!(
            factory.station(ordinal).err(),
            Some(ValidationError::StationOutOfRange { ordinal })
        );
    }
    assert_eq!(factory.stations().len(), 3);
    assert_eq!(fetcher.fetches(Resource::StationQueue(StationId::One)), 0);
}

// =============================================================================
// Materials, orders and completed jobs
// =============================================================================

#[tokio::test]
async fn when_no_order_is_pending_materials_info_reports_no_value() {
    // Given: A materials page without a pending order
    let fetcher =
        Arc::new(ScriptedFetcher::new().serve(Resource::MaterialsInfo, MATERIALS_PAGE));
    let factory = Littlefield::new(TtlPolicy::default(), fetcher);

    // When: Materials info is queried
    let info = factory.materials().info().await.expect("materials");

    // Then: Policy fields are present and the arrival is explicitly absent
    assert_eq!(info.reorder_point, Some(1320.0));
    assert_eq!(info.order_quantity, Some(7200.0));
    assert_eq!(info.lead_time, Some(4.0));
    assert_eq!(info.next_arrival_eta, None);
    assert_eq!(info.next_arrival_quantity, None);
    assert!(!info.has_pending_order());
}

#[tokio::test]
async fn when_the_materials_layout_changes_the_query_fails_instead_of_guessing() {
    let fetcher = Arc::new(ScriptedFetcher::new().serve(
        Resource::MaterialsInfo,
        "<h2>Materials</h2><p>Trigger level: 1320</p>",
    ));
    let factory = Littlefield::new(TtlPolicy::default(), fetcher);

    let error = factory.materials().info().await.expect_err("layout changed");

    assert!(matches!(
        error,
        LittlefieldError::Parse(ParseError::UnexpectedShape { .. })
    ));
}

#[tokio::test]
async fn when_job_arrivals_are_queried_the_series_is_returned_in_day_order() {
    let fetcher = Arc::new(ScriptedFetcher::new().serve(
        Resource::JobArrivals,
        r#"<APPLET><PARAM NAME="data" VALUE="3 11 1 9 2 14"></APPLET>"#,
    ));
    let factory = Littlefield::new(TtlPolicy::default(), fetcher);

    let arrivals = factory.orders().job_arrivals().await.expect("arrivals");

    assert_eq!(arrivals.pairs(), vec![(1, 9.0), (2, 14.0), (3, 11.0)]);
}

#[tokio::test]
async fn when_lead_times_are_queried_series_are_grouped_per_contract() {
    // Given: A lead-time page where contract 1 appears in two blocks
    let fetcher =
        Arc::new(ScriptedFetcher::new().serve(Resource::LeadTimes, LEAD_TIME_PAGE));
    let factory = Littlefield::new(TtlPolicy::default(), fetcher);

    // When: Lead times are queried
    let lead_times = factory.completed_jobs().lead_times().await.expect("lead times");

    // Then: One series per contract, in first-seen order, merged and sorted
    let contracts: Vec<_> = lead_times
        .iter()
        .map(|series| series.contract_id.as_str())
        .collect();
    assert_eq!(contracts, vec!["contract 1", "contract 2"]);
    assert_eq!(
        lead_times[0].series.pairs(),
        vec![(1, 0.52), (2, 0.61), (3, 0.58)]
    );
    assert_eq!(
        lead_times[0].metadata.get("color").map(String::as_str),
        Some("#0000ff")
    );
    assert_eq!(lead_times[1].series.pairs(), vec![(2, 1.10)]);
}
