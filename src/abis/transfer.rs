use alloy::sol;

sol! {
    /// Shared by ERC-20 and ERC-721; only the topic0 hash is used for filtering.
    event Transfer(address indexed from, address indexed to, uint256 value);
}
