use alloy::{
    primitives::{Address, Uint, U256},
    rpc::types::Log,
    sol,
};
use async_trait::async_trait;
use miette::{miette, IntoDiagnostic, WrapErr};
use tracing::info;

use crate::{environment::VrfCoordinator, rpc::RPCProvider};

sol! {
    #[sol(rpc)]
    contract VRFCoordinatorV2Mock {
        event SubscriptionCreated(uint64 indexed subId, address owner);

        function createSubscription() external returns (uint64 subId);
        function fundSubscription(uint64 _subId, uint96 _amount) external;
        function addConsumer(uint64 _subId, address _consumer) external;
    }
}

pub const VRF_COORDINATOR_MOCK: &str = "VRFCoordinatorV2Mock";

/// Reads the subscription id from the first log of a `createSubscription` receipt.
pub fn subscription_id_from_logs(logs: &[Log]) -> miette::Result<u64> {
    let log = logs
        .first()
        .ok_or_else(|| miette!("createSubscription emitted no events"))?;
    let event = log
        .log_decode::<VRFCoordinatorV2Mock::SubscriptionCreated>()
        .into_diagnostic()
        .wrap_err("First event is not SubscriptionCreated")?;
    Ok(event.inner.data.subId)
}

/// Talks to a VRF coordinator contract through the node
pub struct CoordinatorClient<'a> {
    rpc: &'a RPCProvider,
}

impl<'a> CoordinatorClient<'a> {
    pub fn new(rpc: &'a RPCProvider) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl VrfCoordinator for CoordinatorClient<'_> {
    async fn create_subscription(
        &self,
        coordinator: Address,
        from: Address,
    ) -> miette::Result<u64> {
        let mock = VRFCoordinatorV2Mock::new(coordinator, self.rpc.provider().clone());
        let receipt = mock
            .createSubscription()
            .from(from)
            .send()
            .await
            .into_diagnostic()
            .wrap_err("Failed to send createSubscription")?
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .into_diagnostic()
            .wrap_err("Failed to get createSubscription receipt")?;
        if !receipt.status() {
            return Err(miette!("createSubscription reverted"));
        }
        subscription_id_from_logs(receipt.inner.logs())
    }

    async fn fund_subscription(
        &self,
        coordinator: Address,
        from: Address,
        subscription_id: u64,
        amount: U256,
    ) -> miette::Result<()> {
        let amount = Uint::<96, 2>::checked_from_uint(amount)
            .ok_or_else(|| miette!("Fund amount {amount} does not fit in uint96"))?;
        let mock = VRFCoordinatorV2Mock::new(coordinator, self.rpc.provider().clone());
        let receipt = mock
            .fundSubscription(subscription_id, amount)
            .from(from)
            .send()
            .await
            .into_diagnostic()
            .wrap_err("Failed to send fundSubscription")?
            .get_receipt()
            .await
            .into_diagnostic()
            .wrap_err("Failed to get fundSubscription receipt")?;
        if !receipt.status() {
            return Err(miette!("fundSubscription reverted for subscription {subscription_id}"));
        }
        info!("Funded subscription {subscription_id} with {amount}");
        Ok(())
    }

    async fn add_consumer(
        &self,
        coordinator: Address,
        from: Address,
        subscription_id: u64,
        consumer: Address,
    ) -> miette::Result<()> {
        let mock = VRFCoordinatorV2Mock::new(coordinator, self.rpc.provider().clone());
        let receipt = mock
            .addConsumer(subscription_id, consumer)
            .from(from)
            .send()
            .await
            .into_diagnostic()
            .wrap_err("Failed to send addConsumer")?
            .get_receipt()
            .await
            .into_diagnostic()
            .wrap_err("Failed to get addConsumer receipt")?;
        if !receipt.status() {
            return Err(miette!("addConsumer reverted for subscription {subscription_id}"));
        }
        info!("Added consumer {consumer} to subscription {subscription_id}");
        Ok(())
    }
}
