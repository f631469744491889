mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{client_input, TestApp};
use freight_office::{
    errors::ServiceError,
    models::PaymentStatus,
    pricing::{GoodsInput, GoodsType, PricingMode},
    services::shipments::{EditShipmentInput, ImportRow, PaymentInput},
};

#[tokio::test]
async fn merchandise_share_is_priced_against_the_container() {
    let app = TestApp::new().await;
    let container = app.container().await;

    let created = app
        .state
        .services
        .shipments
        .add_client(
            container.id,
            client_input(
                "AB-1",
                GoodsType::Merchandise,
                GoodsInput {
                    volume: Some(dec!(10.5)),
                    extra_charge: dec!(200),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    assert_eq!(created.shipment.price, dec!(5250));
    assert_eq!(created.shipment.extra_charge, dec!(200));
    assert_eq!(created.total_price, dec!(5450));
    assert_eq!(created.shipment.pricing_mode, PricingMode::Proportional);
    assert_eq!(created.client.mark, "AB-1");
}

#[tokio::test]
async fn empty_container_volume_is_floored() {
    let app = TestApp::new().await;
    let container = app.container_with(dec!(1000), Decimal::ZERO).await;

    let created = app.add_merchandise(container.id, "ZV", dec!(5)).await;
    assert_eq!(created.shipment.price, dec!(5000000));
}

#[tokio::test]
async fn car_with_no_net_volume_is_rejected() {
    let app = TestApp::new().await;
    let container = app.container().await;

    let result = app
        .state
        .services
        .shipments
        .add_client(
            container.id,
            client_input(
                "CAR",
                GoodsType::Car,
                GoodsInput {
                    volume_vide: Some(dec!(8)),
                    volume_used: Some(dec!(10)),
                    ..Default::default()
                },
            ),
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("Car volume"));

    let detail = app.state.services.containers.get(container.id).await.unwrap();
    assert!(detail.shipments.is_empty());
}

#[tokio::test]
async fn metals_are_priced_per_tonne() {
    let app = TestApp::new().await;
    let container = app.container().await;

    let created = app
        .state
        .services
        .shipments
        .add_client(
            container.id,
            client_input(
                "FE",
                GoodsType::Metals,
                GoodsInput {
                    tonnage: Some(dec!(2.5)),
                    price_per_tonne: Some(dec!(120)),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    assert_eq!(created.shipment.price, dec!(300));
    assert_eq!(created.shipment.pricing_mode, PricingMode::ManualPerTonne);
    assert_eq!(created.shipment.volume, dec!(2.5));
}

#[tokio::test]
async fn unknown_container_is_not_found() {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .shipments
        .add_client(
            uuid::Uuid::new_v4(),
            client_input(
                "X",
                GoodsType::Merchandise,
                GoodsInput {
                    volume: Some(dec!(1)),
                    ..Default::default()
                },
            ),
        )
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn paid_status_records_the_base_price() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let mut input = client_input(
        "PD",
        GoodsType::Merchandise,
        GoodsInput {
            volume: Some(dec!(10)),
            extra_charge: dec!(150),
            ..Default::default()
        },
    );
    input.payment_status = PaymentStatus::Paid;
    input.paid_amount = Some(dec!(1));

    let created = app
        .state
        .services
        .shipments
        .add_client(container.id, input)
        .await
        .unwrap();
    assert_eq!(created.shipment.paid_amount, dec!(5000));
}

#[tokio::test]
async fn edit_reprices_from_merged_figures() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let created = app.add_merchandise(container.id, "ED", dec!(10)).await;
    let shipments = &app.state.services.shipments;

    let edited = shipments
        .edit(
            created.shipment.id,
            EditShipmentInput {
                name: Some("Renamed".to_string()),
                goods: GoodsInput {
                    volume: Some(dec!(20)),
                    extra_charge: dec!(75),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.shipment.price, dec!(10000));
    assert_eq!(edited.total_price, dec!(10075));
    assert_eq!(edited.client.name, "Renamed");
    assert_eq!(edited.client.mark, "ED");

    // Omitted figures keep their stored value; the extra charge does not.
    let edited = shipments
        .edit(created.shipment.id, EditShipmentInput::default())
        .await
        .unwrap();
    assert_eq!(edited.shipment.volume, dec!(20));
    assert_eq!(edited.shipment.extra_charge, Decimal::ZERO);
}

#[tokio::test]
async fn edit_can_switch_goods_type() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let created = app.add_merchandise(container.id, "SW", dec!(10)).await;

    let edited = app
        .state
        .services
        .shipments
        .edit(
            created.shipment.id,
            EditShipmentInput {
                goods_type: Some(GoodsType::Metals),
                goods: GoodsInput {
                    tonnage: Some(dec!(3)),
                    price_per_tonne: Some(dec!(100)),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.shipment.goods_type, GoodsType::Metals);
    assert_eq!(edited.shipment.pricing_mode, PricingMode::ManualPerTonne);
    assert_eq!(edited.shipment.price, dec!(300));
}

#[tokio::test]
async fn payment_updates_follow_status() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let created = app.add_merchandise(container.id, "PY", dec!(10)).await;
    let shipments = &app.state.services.shipments;

    let partial = shipments
        .update_payment(
            created.shipment.id,
            PaymentInput {
                payment_status: PaymentStatus::Partial,
                paid_amount: Some(dec!(1200)),
            },
        )
        .await
        .unwrap();
    assert_eq!(partial.paid_amount, dec!(1200));

    let negative = shipments
        .update_payment(
            created.shipment.id,
            PaymentInput {
                payment_status: PaymentStatus::Partial,
                paid_amount: Some(dec!(-5)),
            },
        )
        .await;
    assert_matches!(negative, Err(ServiceError::ValidationError(_)));

    let unpaid = shipments
        .update_payment(
            created.shipment.id,
            PaymentInput {
                payment_status: PaymentStatus::Unpaid,
                paid_amount: Some(dec!(1200)),
            },
        )
        .await
        .unwrap();
    assert_eq!(unpaid.paid_amount, Decimal::ZERO);
}

#[tokio::test]
async fn deleting_the_last_shipment_removes_the_client() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let created = app.add_merchandise(container.id, "DL", dec!(4)).await;

    let removal = app
        .state
        .services
        .shipments
        .delete(created.shipment.id)
        .await
        .unwrap();
    assert!(removal.client_removed);
    assert_matches!(
        app.state.services.clients.find_by_mark("DL").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn import_prices_every_row() {
    let app = TestApp::new().await;
    let container = app.container().await;

    let rows = vec![
        ImportRow {
            mark: "IM-1".into(),
            phone: "269331234.0".into(),
            volume: "10".into(),
            extra_charge: "50".into(),
            ..Default::default()
        },
        ImportRow {
            mark: "IM-2".into(),
            name: "Moussa".into(),
            goods_type: "car".into(),
            volume_vide: "12".into(),
            volume_used: "2".into(),
            ..Default::default()
        },
        ImportRow {
            mark: "IM-3".into(),
            goods_type: "Metals".into(),
            tonnage: "2.5".into(),
            price_per_tonne: "120".into(),
            ..Default::default()
        },
    ];

    let summary = app
        .state
        .services
        .shipments
        .import_rows(container.id, rows)
        .await
        .unwrap();
    assert_eq!(summary.imported.len(), 3);

    let first = &summary.imported[0];
    assert_eq!(first.client.name, "IM-1");
    assert_eq!(first.client.phone.as_deref(), Some("269331234"));
    assert_eq!(first.shipment.price, dec!(5000));
    assert_eq!(first.total_price, dec!(5050));
    assert_eq!(summary.imported[1].shipment.price, dec!(5000));
    assert_eq!(summary.imported[2].shipment.price, dec!(300));
    assert!(summary
        .imported
        .iter()
        .all(|row| row.shipment.payment_status == PaymentStatus::Unpaid));
}

#[tokio::test]
async fn import_is_all_or_nothing() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let shipments = &app.state.services.shipments;

    let unparseable = vec![
        ImportRow {
            mark: "OK".into(),
            volume: "1".into(),
            ..Default::default()
        },
        ImportRow {
            mark: "BAD".into(),
            volume: "lots".into(),
            ..Default::default()
        },
    ];
    assert_matches!(
        shipments.import_rows(container.id, unparseable).await,
        Err(ServiceError::ValidationError(msg)) if msg.starts_with("row 2:")
    );

    // Fails while pricing, after the first row was written.
    let unpriceable = vec![
        ImportRow {
            mark: "OK".into(),
            volume: "1".into(),
            ..Default::default()
        },
        ImportRow {
            mark: "CAR".into(),
            goods_type: "Car".into(),
            volume_vide: "8".into(),
            volume_used: "10".into(),
            ..Default::default()
        },
    ];
    assert_matches!(
        shipments.import_rows(container.id, unpriceable).await,
        Err(ServiceError::ValidationError(msg)) if msg.starts_with("row 2:")
    );

    let detail = app.state.services.containers.get(container.id).await.unwrap();
    assert!(detail.shipments.is_empty());
    assert_matches!(
        app.state.services.clients.find_by_mark("OK").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn empty_import_is_rejected() {
    let app = TestApp::new().await;
    let container = app.container().await;
    assert_matches!(
        app.state
            .services
            .shipments
            .import_rows(container.id, Vec::new())
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn mark_lookup_returns_the_newest_client() {
    let app = TestApp::new().await;
    let first = app.container().await;
    let second = app.container().await;

    let older = app.add_merchandise(first.id, "SAME", dec!(1)).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = app.add_merchandise(second.id, "SAME", dec!(2)).await;
    assert_ne!(older.client.id, newer.client.id);

    let found = app.state.services.clients.find_by_mark(" SAME ").await.unwrap();
    assert_eq!(found.id, newer.client.id);
}
