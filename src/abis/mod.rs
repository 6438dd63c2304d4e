pub mod erc165;
pub mod transfer;
pub mod wallet_cache;

pub use erc165::{IERC165, ERC721_INTERFACE_ID};
pub use transfer::Transfer;
pub use wallet_cache::IWalletDataCache;
