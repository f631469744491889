//! Database entities.

pub mod billetage;
pub mod client;
pub mod container;
pub mod courier;
pub mod courier_item;
pub mod product;
pub mod shipment;

pub use container::ContainerStatus;
pub use shipment::PaymentStatus;
