use std::sync::Arc;

use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};
use log::debug;
use serde::Serialize;

use crate::{
    abis::{IERC165, ERC721_INTERFACE_ID},
    ledger::Ledger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Fungible,
    Nft,
}

/// Result of one capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: TokenKind,
    /// The probe call itself failed and the kind is the fungible fallback
    pub probe_failed: bool,
}

/// Buckets `Transfer`-emitting contracts into fungible and non-fungible tokens.
///
/// Asks the contract through ERC-165 whether it implements ERC-721, at the
/// block the log was seen in. Anything but a truthy answer, a revert
/// included, classifies as fungible, so an unrelated contract that emits a
/// `Transfer`-shaped log lands in the fungible bucket too.
pub struct TokenClassifier {
    ledger: Arc<dyn Ledger>,
    calldata: Bytes,
}

impl TokenClassifier {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        let calldata = IERC165::supportsInterfaceCall {
            interfaceId: ERC721_INTERFACE_ID,
        }
        .abi_encode()
        .into();

        Self {
            ledger,
            calldata,
        }
    }

    pub async fn classify(&self, token: Address, at_block: u64) -> Classification {
        match self.ledger.call(token, self.calldata.clone(), at_block).await {
            Ok(response) => Classification {
                kind: if is_truthy(&response) { TokenKind::Nft } else { TokenKind::Fungible },
                probe_failed: false,
            },
            Err(e) => {
                debug!(
                    "ERC-165 probe of {} at block {} failed, assuming fungible: {:#}",
                    token, at_block, e
                );
                Classification {
                    kind: TokenKind::Fungible,
                    probe_failed: true,
                }
            },
        }
    }
}

/// Any non-zero byte in the return data.
#[inline]
fn is_truthy(response: &[u8]) -> bool {
    response.iter().any(|b| *b != 0)
}
