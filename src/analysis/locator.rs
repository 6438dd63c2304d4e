use std::sync::Arc;

use alloy::primitives::Address;
use log::{debug, warn};
use serde::Serialize;

use crate::{ledger::Ledger, utils::RetryPolicy};

/// Earliest block at which a wallet had sent at least one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstActivity {
    pub block_number: u64,
    pub timestamp: u64,
}

/// Result of a locator run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocatorOutcome {
    /// First block with a non-zero nonce, `None` when the wallet never
    /// transacted up to the bound
    pub located_block: Option<u64>,
    /// Located block together with its timestamp
    pub first_activity: Option<FirstActivity>,
    /// The block was located but its timestamp could not be fetched
    pub timestamp_fetch_failed: bool,
    /// Probes that kept failing and were counted as "no activity yet"
    pub failed_probes: u64,
}

/// Finds a wallet's first outgoing transaction by binary search on its nonce.
///
/// The predicate `nonce_at(block) > 0` is monotonic since a nonce never
/// decreases, so O(log head) probes are enough.
pub struct FirstActivityLocator {
    ledger: Arc<dyn Ledger>,
    retry: RetryPolicy,
}

impl FirstActivityLocator {
    pub fn new(ledger: Arc<dyn Ledger>, retry: RetryPolicy) -> Self {
        Self {
            ledger,
            retry,
        }
    }

    pub async fn locate(&self, address: Address, head: u64) -> LocatorOutcome {
        let ledger = self.ledger.as_ref();
        let mut low = 0u64;
        let mut high = head;
        let mut found: Option<u64> = None;
        let mut failed_probes = 0u64;

        while low <= high {
            let mid = low + (high - low) / 2;

            let active = match self
                .retry
                .run("nonce probe", move || ledger.transaction_count(address, mid))
                .await
            {
                Ok(nonce) => nonce > 0,
                Err(e) => {
                    // An unanswered probe moves the search towards later blocks
                    warn!(
                        "Nonce probe for {} at block {} failed after {} attempts: {:#}",
                        address, mid, self.retry.attempts, e
                    );
                    failed_probes += 1;
                    false
                },
            };

            if active {
                found = Some(mid);
                if mid == 0 {
                    break;
                }
                high = mid - 1;
            } else {
                low = mid + 1;
            }
        }

        let Some(block_number) = found else {
            debug!("No outgoing activity for {} up to block {}", address, head);
            return LocatorOutcome {
                failed_probes,
                ..Default::default()
            };
        };

        let first_activity = match self
            .retry
            .run("first block fetch", move || ledger.block(block_number, false))
            .await
        {
            Ok(block) => Some(FirstActivity {
                block_number: block.number,
                timestamp: block.timestamp,
            }),
            Err(e) => {
                warn!(
                    "Located first activity of {} at block {} but could not fetch its timestamp: {:#}",
                    address, block_number, e
                );
                None
            },
        };

        LocatorOutcome {
            located_block: Some(block_number),
            timestamp_fetch_failed: first_activity.is_none(),
            first_activity,
            failed_probes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, MockLedger};

    fn locator(ledger: MockLedger) -> (Arc<MockLedger>, FirstActivityLocator) {
        let ledger = Arc::new(ledger);
        let locator = FirstActivityLocator::new(ledger.clone(), RetryPolicy::none());
        (ledger, locator)
    }

    #[tokio::test]
    async fn test_finds_minimal_active_block() {
        let wallet = addr(1);
        for first in [1u64, 2, 37, 100, 149, 150] {
            let ledger = MockLedger::with_empty_blocks(150);
            ledger.set_first_outgoing(wallet, first);
            let (_, locator) = locator(ledger);

            let outcome = locator.locate(wallet, 150).await;
            let found = outcome.first_activity.unwrap();
            assert_eq!(found.block_number, first);
            assert_eq!(found.timestamp, MockLedger::timestamp_of(first));
            assert_eq!(outcome.failed_probes, 0);
        }
    }

    #[tokio::test]
    async fn test_active_from_genesis() {
        let wallet = addr(1);
        let ledger = MockLedger::with_empty_blocks(64);
        ledger.set_first_outgoing(wallet, 0);
        let (_, locator) = locator(ledger);

        let found = locator.locate(wallet, 64).await.first_activity.unwrap();
        assert_eq!(found.block_number, 0);
    }

    #[tokio::test]
    async fn test_none_when_never_active() {
        let (_, locator) = locator(MockLedger::with_empty_blocks(150));
        let outcome = locator.locate(addr(1), 150).await;
        assert_eq!(outcome.first_activity, None);
    }

    #[tokio::test]
    async fn test_activity_after_bound_is_not_found() {
        let wallet = addr(1);
        let ledger = MockLedger::with_empty_blocks(300);
        ledger.set_first_outgoing(wallet, 200);
        let (_, locator) = locator(ledger);

        assert_eq!(locator.locate(wallet, 150).await.first_activity, None);
    }

    #[tokio::test]
    async fn test_probe_count_is_logarithmic() {
        let wallet = addr(1);
        let ledger = MockLedger::with_empty_blocks(1_000);
        ledger.set_first_outgoing(wallet, 421);
        let (ledger, locator) = locator(ledger);

        locator.locate(wallet, 1_000).await;
        assert!(ledger.nonce_calls() <= 11);
    }

    #[tokio::test]
    async fn test_failing_probe_biases_upward_without_retry() {
        let wallet = addr(1);
        let ledger = MockLedger::with_empty_blocks(100);
        ledger.set_first_outgoing(wallet, 10);
        // First probe lands on block 50 and fails permanently
        ledger.fail_nonce_at(50, u32::MAX);
        let (_, locator) = locator(ledger);

        let outcome = locator.locate(wallet, 100).await;
        assert_eq!(outcome.failed_probes, 1);
        assert_eq!(outcome.first_activity.unwrap().block_number, 51);
    }

    #[tokio::test]
    async fn test_retry_recovers_transient_probe_failure() {
        let wallet = addr(1);
        let ledger = MockLedger::with_empty_blocks(100);
        ledger.set_first_outgoing(wallet, 10);
        ledger.fail_nonce_at(50, 2);
        let ledger = Arc::new(ledger);
        let locator = FirstActivityLocator::new(
            ledger.clone(),
            RetryPolicy::new(3, std::time::Duration::ZERO),
        );

        let outcome = locator.locate(wallet, 100).await;
        assert_eq!(outcome.failed_probes, 0);
        assert_eq!(outcome.first_activity.unwrap().block_number, 10);
    }

    #[tokio::test]
    async fn test_keeps_block_when_timestamp_unavailable() {
        let wallet = addr(1);
        let ledger = MockLedger::with_empty_blocks(100);
        ledger.set_first_outgoing(wallet, 40);
        ledger.fail_block(40);
        let (_, locator) = locator(ledger);

        let outcome = locator.locate(wallet, 100).await;
        assert_eq!(outcome.located_block, Some(40));
        assert_eq!(outcome.first_activity, None);
        assert!(outcome.timestamp_fetch_failed);
    }

    #[tokio::test]
    async fn test_never_active_is_not_a_fetch_failure() {
        let (_, locator) = locator(MockLedger::with_empty_blocks(20));
        let outcome = locator.locate(addr(1), 20).await;
        assert_eq!(outcome.located_block, None);
        assert!(!outcome.timestamp_fetch_failed);
    }
}
