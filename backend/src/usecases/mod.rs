pub mod capabilities;
pub mod quotas;
pub mod subscriptions;
pub mod vehicles;
