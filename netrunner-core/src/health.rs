//! Waiting for a network to become healthy
//!
//! The aggregator polls every node's health endpoint on a fixed interval.
//! A round succeeds only when every node present at that moment reports
//! healthy. Failed health calls and nodes removed mid-round are treated as
//! "not yet" and retried on the next tick; only the deadline or the network
//! stopping ends the wait early.

use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{NetworkError, NetworkResult};
use crate::network::Network;

/// Interval between two polling rounds
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(200);

/// Wait until every node of `network` reports healthy
pub async fn await_network_healthy<N>(network: &N, timeout: Duration) -> NetworkResult<()>
where
    N: Network + ?Sized,
{
    await_network_healthy_with_interval(network, timeout, HEALTH_CHECK_INTERVAL).await
}

/// [`await_network_healthy`] with a custom polling interval
pub async fn await_network_healthy_with_interval<N>(
    network: &N,
    timeout: Duration,
    interval: Duration,
) -> NetworkResult<()>
where
    N: Network + ?Sized,
{
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let stopped = network.stopped();
    tokio::pin!(stopped);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Until a round completes every present node counts as pending
    let mut unhealthy = network.get_nodes_names().await?;

    loop {
        let round = async {
            ticker.tick().await;
            poll_round(network).await
        };

        tokio::select! {
            biased;

            _ = &mut stopped => return Err(NetworkError::Stopped),
            _ = &mut deadline => {
                return Err(NetworkError::HealthTimeout { timeout, unhealthy });
            }
            result = round => {
                let pending = result?;
                if pending.is_empty() {
                    info!("All nodes healthy");
                    return Ok(());
                }
                debug!("Waiting on {} unhealthy node(s): {:?}", pending.len(), pending);
                unhealthy = pending;
            }
        }
    }
}

/// Poll every node once and return the names of those not yet healthy
async fn poll_round<N>(network: &N) -> NetworkResult<Vec<String>>
where
    N: Network + ?Sized,
{
    let names = network.get_nodes_names().await?;

    let checks = names.into_iter().map(|name| async move {
        let node = match network.get_node(&name).await {
            Ok(node) => node,
            Err(NetworkError::Stopped) => return Err(NetworkError::Stopped),
            Err(err) => {
                debug!("Skipping node '{}' this round: {}", name, err);
                return Ok(None);
            }
        };
        match node.api().health().await {
            Ok(true) => Ok(None),
            Ok(false) => Ok(Some(name)),
            Err(err) => {
                debug!("Health check of node '{}' failed: {}", name, err);
                Ok(Some(name))
            }
        }
    });

    let mut unhealthy = Vec::new();
    for outcome in join_all(checks).await {
        if let Some(name) = outcome? {
            unhealthy.push(name);
        }
    }
    Ok(unhealthy)
}
