//! Client modules for external services

pub mod delivery;

pub use delivery::{DeliveryClient, DeliveryTarget, HttpDeliveryClient};
