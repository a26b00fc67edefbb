pub mod account_roles;
pub mod package_categories;
pub mod payment_methods;
pub mod payment_statuses;
pub mod subscription_statuses;
pub mod user_package_statuses;
pub mod vehicle_statuses;
