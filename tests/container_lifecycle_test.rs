mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;

use common::{client_input, TestApp};
use freight_office::{
    errors::ServiceError,
    models::{ContainerStatus, PaymentStatus},
    pricing::{GoodsInput, GoodsType},
    services::{containers::UpdateContainerInput, shipments::PaymentInput},
};

#[tokio::test]
async fn price_change_reprices_proportional_shipments_only() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let merchandise = app.add_merchandise(container.id, "MX", dec!(10)).await;
    let metals = app
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

    let update = app
        .state
        .services
        .containers
        .update(
            container.id,
            UpdateContainerInput {
                price: Some(dec!(60000)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let plan = update.recalculation.expect("terms changed");
    assert_eq!(plan.skipped, vec![metals.shipment.id]);
    assert_eq!(plan.changed().count(), 1);

    let repriced = app
        .state
        .services
        .shipments
        .get(merchandise.shipment.id)
        .await
        .unwrap();
    assert_eq!(repriced.shipment.price, dec!(6000));

    let untouched = app
        .state
        .services
        .shipments
        .get(metals.shipment.id)
        .await
        .unwrap();
    assert_eq!(untouched.shipment.price, dec!(300));
}

#[tokio::test]
async fn recalculation_keeps_paid_amounts() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let created = app.add_merchandise(container.id, "PA", dec!(10)).await;
    app.state
        .services
        .shipments
        .update_payment(
            created.shipment.id,
            PaymentInput {
                payment_status: PaymentStatus::Paid,
                paid_amount: None,
            },
        )
        .await
        .unwrap();

    app.state
        .services
        .containers
        .update(
            container.id,
            UpdateContainerInput {
                total_volume: Some(dec!(50)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let after = app
        .state
        .services
        .shipments
        .get(created.shipment.id)
        .await
        .unwrap();
    assert_eq!(after.shipment.price, dec!(10000));
    assert_eq!(after.shipment.paid_amount, dec!(5000));
}

#[tokio::test]
async fn editing_other_fields_does_not_reprice() {
    let app = TestApp::new().await;
    let container = app.container().await;
    app.add_merchandise(container.id, "NR", dec!(10)).await;

    let update = app
        .state
        .services
        .containers
        .update(
            container.id,
            UpdateContainerInput {
                destination: Some("Mutsamudu".to_string()),
                price: Some(dec!(50000)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(update.recalculation.is_none());
    assert_eq!(update.container.destination.as_deref(), Some("Mutsamudu"));
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let result = app
        .state
        .services
        .containers
        .update(
            container.id,
            UpdateContainerInput {
                price: Some(dec!(-1)),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn detail_totals_cover_every_shipment() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let first = app.add_merchandise(container.id, "T1", dec!(10)).await;
    app.add_merchandise(container.id, "T2", dec!(30)).await;
    app.state
        .services
        .shipments
        .update_payment(
            first.shipment.id,
            PaymentInput {
                payment_status: PaymentStatus::Partial,
                paid_amount: Some(dec!(2000)),
            },
        )
        .await
        .unwrap();

    let detail = app.state.services.containers.get(container.id).await.unwrap();
    assert_eq!(detail.shipments.len(), 2);
    assert!(detail.shipments.iter().all(|line| line.client.is_some()));
    assert_eq!(detail.totals.allocated_volume, dec!(40));
    assert_eq!(detail.totals.remaining_volume, dec!(60));
    assert_eq!(detail.totals.billed, dec!(20000));
    assert_eq!(detail.totals.paid, dec!(2000));
    assert_eq!(detail.totals.outstanding, dec!(18000));
}

#[tokio::test]
async fn container_can_be_delivered_once() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let containers = &app.state.services.containers;

    let delivered = containers.mark_delivered(container.id).await.unwrap();
    assert_eq!(delivered.status, ContainerStatus::Delivered);
    assert_matches!(
        containers.mark_delivered(container.id).await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn priority_toggles() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let containers = &app.state.services.containers;

    assert!(containers.toggle_priority(container.id).await.unwrap().priority);
    assert!(!containers.toggle_priority(container.id).await.unwrap().priority);
}

#[tokio::test]
async fn delete_cascades_to_shipments_and_orphaned_clients() {
    let app = TestApp::new().await;
    let container = app.container().await;
    let first = app.add_merchandise(container.id, "C1", dec!(10)).await;
    let second = app.add_merchandise(container.id, "C2", dec!(5)).await;

    let removal = app.state.services.containers.delete(container.id).await.unwrap();
    assert_eq!(removal.shipments_removed, 2);
    assert_eq!(removal.clients_removed, 2);

    assert_matches!(
        app.state.services.containers.get(container.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        app.state.services.shipments.get(first.shipment.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        app.state.services.products.list_for_client(second.client.id).await,
        Err(ServiceError::NotFound(_))
    );
}
