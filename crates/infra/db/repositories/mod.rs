pub mod packages;
pub mod subscriptions;
pub mod user_packages;
pub mod vehicles;
