pub mod erc20;
pub mod meta_swap;
pub mod swap;
pub mod voting_escrow;
pub mod xswap_deposit;

pub use erc20::IERC20;
pub use meta_swap::IMetaSwap;
pub use swap::ISwap;
pub use xswap_deposit::IXSwapDeposit;
