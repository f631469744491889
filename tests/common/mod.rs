#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use freight_office::{
    config::AppConfig,
    db::{self, DbConfig},
    models::{container, courier, PaymentStatus},
    pricing::{GoodsInput, GoodsType},
    services::{
        containers::CreateContainerInput,
        couriers::{CourierItemInput, CreateCourierInput},
        shipments::{AddClientInput, ClientShipment},
    },
    AppState,
};

/// Application state and router over a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::sqlite_memory())
            .await
            .expect("failed to open in-memory database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = freight_office::app(state.clone());
        Self { router, state }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    /// A 50 000 priced, 100 m3 container.
    pub async fn container(&self) -> container::Model {
        self.container_with(Decimal::from(50_000), Decimal::from(100)).await
    }

    pub async fn container_with(&self, price: Decimal, total_volume: Decimal) -> container::Model {
        self.state
            .services
            .containers
            .create(CreateContainerInput {
                container_number: "MSCU-4821".to_string(),
                container_name: Some("Moroni run".to_string()),
                container_type: "40ft".to_string(),
                destination: Some("Moroni".to_string()),
                total_volume,
                price,
            })
            .await
            .expect("container")
    }

    pub async fn add_merchandise(
        &self,
        container_id: uuid::Uuid,
        mark: &str,
        volume: Decimal,
    ) -> ClientShipment {
        self.state
            .services
            .shipments
            .add_client(
                container_id,
                client_input(
                    mark,
                    GoodsType::Merchandise,
                    GoodsInput {
                        volume: Some(volume),
                        ..Default::default()
                    },
                ),
            )
            .await
            .expect("client shipment")
    }

    /// A courier run with the given collected amounts, no service fees.
    pub async fn courier_with(&self, amounts: &[Decimal]) -> courier::Model {
        let couriers = &self.state.services.couriers;
        let run = couriers
            .create(CreateCourierInput {
                reference: "RUN-01".to_string(),
                date: None,
            })
            .await
            .expect("courier");
        for amount in amounts {
            couriers
                .add_item(
                    run.id,
                    CourierItemInput {
                        sender_name: "Said".to_string(),
                        receiver_name: "Fatima".to_string(),
                        amount: *amount,
                        service: Decimal::ZERO,
                        exchange_rate: None,
                    },
                )
                .await
                .expect("courier item");
        }
        run
    }
}

pub fn test_config() -> AppConfig {
    AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        8080,
        "test".to_string(),
    )
}

pub fn client_input(mark: &str, goods_type: GoodsType, goods: GoodsInput) -> AddClientInput {
    AddClientInput {
        name: format!("Client {mark}"),
        mark: mark.to_string(),
        phone: None,
        goods_type: Some(goods_type),
        goods,
        payment_status: PaymentStatus::Unpaid,
        paid_amount: None,
        price: None,
    }
}
