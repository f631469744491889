pub mod billetages;
pub mod clients;
pub mod common;
pub mod containers;
pub mod couriers;
pub mod products;
pub mod shipments;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::{
    BilletageService, ClientService, ContainerService, CourierService, ProductService,
    ShipmentService,
};

/// Services shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub containers: Arc<ContainerService>,
    pub shipments: Arc<ShipmentService>,
    pub clients: Arc<ClientService>,
    pub products: Arc<ProductService>,
    pub couriers: Arc<CourierService>,
    pub billetages: Arc<BilletageService>,
}

impl AppServices {
    /// Builds every service from one pool. Pricing and rates are read from
    /// `config` here and nowhere else.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let engine = config.pricing.engine();
        Self {
            containers: Arc::new(ContainerService::new(db_pool.clone(), engine)),
            shipments: Arc::new(ShipmentService::new(db_pool.clone(), engine)),
            clients: Arc::new(ClientService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            couriers: Arc::new(CourierService::new(db_pool.clone())),
            billetages: Arc::new(BilletageService::new(
                db_pool,
                config.billetage.rate_book(),
                config.billetage.tolerance(),
            )),
        }
    }
}
