mod common;

use assert_matches::assert_matches;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use common::TestApp;
use freight_office::{
    errors::ServiceError,
    reconciliation::{BalanceStatus, Currency},
    services::billetages::BilletageInput,
};

fn input(value: serde_json::Value) -> BilletageInput {
    serde_json::from_value(value).expect("billetage input")
}

#[rstest]
#[case(100, dec!(0), BalanceStatus::Balanced)]
#[case(104, dec!(200), BalanceStatus::Surplus)]
#[case(96, dec!(-200), BalanceStatus::Shortage)]
#[tokio::test]
async fn count_is_classified_against_expected(
    #[case] fifties: u32,
    #[case] difference: Decimal,
    #[case] status: BalanceStatus,
) {
    let app = TestApp::new().await;
    let report = app
        .state
        .services
        .billetages
        .create(input(json!({
            "counts": {"EUR": {"50": fifties}},
            "expected_amount": 5000
        })))
        .await
        .unwrap();

    assert_eq!(report.expected_amount, dec!(5000));
    assert_eq!(report.difference, difference);
    assert_eq!(report.status, status);
}

#[tokio::test]
async fn foreign_notes_are_converted_to_reporting_currency() {
    let app = TestApp::new().await;
    let report = app
        .state
        .services
        .billetages
        .create(input(json!({
            "counts": {
                "EUR": {"100": "20"},
                "KMF": {"10000": "49"},
                "AED": {"1000": 4}
            },
            "exchange_rates": {"KMF": "490"},
            "expected_amount": "4000"
        })))
        .await
        .unwrap();

    assert_eq!(report.reporting_currency, Currency::Eur);
    assert_eq!(report.subtotals.get(&Currency::Kmf), Some(&dec!(490000)));
    // AED falls back to the configured default of 4.
    assert_eq!(report.exchange_rates.get(&Currency::Aed), Some(&dec!(4)));
    assert_eq!(report.total_counted, dec!(4000));
    assert_eq!(report.status, BalanceStatus::Balanced);
}

#[tokio::test]
async fn courier_run_sets_the_expected_amount() {
    let app = TestApp::new().await;
    let courier = app.courier_with(&[dec!(3000), dec!(2000)]).await;

    let report = app
        .state
        .services
        .billetages
        .create(input(json!({
            "courier_id": courier.id,
            "counts": {"EUR": {"200": 26}},
            "expected_amount": 1
        })))
        .await
        .unwrap();

    assert_eq!(report.courier_id, Some(courier.id));
    assert_eq!(report.expected_amount, dec!(5000));
    assert_eq!(report.difference, dec!(200));
    assert_eq!(report.status, BalanceStatus::Surplus);
}

#[tokio::test]
async fn expected_amount_is_required_without_a_courier() {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .billetages
        .create(input(json!({"counts": {"EUR": {"50": 1}}})))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("expected_amount"));
}

#[rstest]
#[case(json!({"EUR": {"100": "-3"}}))]
#[case(json!({"EUR": {"100": "two"}}))]
#[case(json!({"EUR": {"30": "1"}}))]
#[tokio::test]
async fn invalid_counts_are_rejected(#[case] counts: serde_json::Value) {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .billetages
        .create(input(json!({"counts": counts, "expected_amount": 0})))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn non_positive_rate_is_rejected() {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .billetages
        .create(input(json!({
            "counts": {"AED": {"100": 1}},
            "exchange_rates": {"AED": 0},
            "expected_amount": 0
        })))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn update_replaces_the_count() {
    let app = TestApp::new().await;
    let billetages = &app.state.services.billetages;
    let created = billetages
        .create(input(json!({
            "notes": "morning",
            "counts": {"EUR": {"50": 96}},
            "expected_amount": 5000
        })))
        .await
        .unwrap();
    assert_eq!(created.status, BalanceStatus::Shortage);

    let updated = billetages
        .update(
            created.id,
            input(json!({
                "counts": {"EUR": {"500": 10}},
                "expected_amount": 5000
            })),
        )
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.total_counted, dec!(5000));
    assert_eq!(updated.status, BalanceStatus::Balanced);
    assert_eq!(updated.notes, None);
    assert_eq!(updated.counts.count(Currency::Eur, 50), 0);

    let fetched = billetages.get(created.id).await.unwrap();
    assert_eq!(fetched.counts.count(Currency::Eur, 500), 10);
}

#[tokio::test]
async fn deleted_billetage_is_gone() {
    let app = TestApp::new().await;
    let billetages = &app.state.services.billetages;
    let created = billetages
        .create(input(json!({"counts": {}, "expected_amount": 0})))
        .await
        .unwrap();
    assert_eq!(created.status, BalanceStatus::Balanced);

    billetages.delete(created.id).await.unwrap();
    assert_matches!(billetages.get(created.id).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn courier_detail_totals_collected_cash() {
    let app = TestApp::new().await;
    let courier = app.courier_with(&[dec!(150), dec!(250)]).await;

    let detail = app.state.services.couriers.get(courier.id).await.unwrap();
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.total_collected, dec!(400));
}
