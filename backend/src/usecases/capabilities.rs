use crates::domain::{
    clock::Clock, repositories::subscriptions::SubscriptionRepository,
    value_objects::capabilities::CapabilitySnapshot,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CapabilityError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            CapabilityError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// Resolves a dealer's capabilities from its subscriptions, expiring lapsed ones first.
///
/// Expiry is lazy: this is the only place subscriptions move to `EXPIRED`, so every
/// capacity-limited action must call it before writing.
pub struct CapabilityResolver<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> CapabilityResolver<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            subscription_repo,
            clock,
        }
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub async fn resolve_capabilities(
        &self,
        dealer_id: Uuid,
    ) -> CapabilityResult<CapabilitySnapshot> {
        let now = self.clock.now();

        let sweep = self
            .subscription_repo
            .expire_lapsed_and_cascade(dealer_id, now)
            .await
            .map_err(|err| {
                error!(
                    %dealer_id,
                    db_error = ?err,
                    "capabilities: failed to expire lapsed subscriptions"
                );
                err
            })?;

        if sweep.expired_subscriptions > 0 {
            info!(
                %dealer_id,
                expired = sweep.expired_subscriptions,
                deactivated_vehicles = sweep.deactivated_vehicles,
                "capabilities: lapsed subscriptions expired"
            );
        }

        let authoritative = self
            .subscription_repo
            .find_authoritative_subscription(dealer_id, now)
            .await
            .map_err(|err| {
                error!(
                    %dealer_id,
                    db_error = ?err,
                    "capabilities: failed to load authoritative subscription"
                );
                err
            })?;

        match authoritative {
            Some((subscription, package)) => {
                debug!(
                    %dealer_id,
                    subscription_id = %subscription.id,
                    package = %package.name,
                    "capabilities: using authoritative subscription"
                );
                Ok(CapabilitySnapshot::from_subscription(&subscription, &package))
            }
            None => {
                debug!(%dealer_id, "capabilities: no active subscription");
                Ok(CapabilitySnapshot::none())
            }
        }
    }
}
