use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IXSwapDeposit {
        function UNDERLYING_COINS(uint256 index) external view returns (address);
        function BASE_POOL() external view returns (address);
        function META_LPTOKEN() external view returns (address);
        function priceOracle() external view returns (uint256);
        function owner() external view returns (address);
    }

    // Every wrapper event carries the reference token spot price.
    event TokenExchange(address indexed buyer, uint256 soldId, uint256 tokensSold, uint256 boughtId, uint256 tokensBought, uint256 price);
    event AddLiquidity(address indexed provider, uint256[] tokenAmounts, uint256 price);
    event RemoveLiquidity(address indexed provider, uint256[] tokenAmounts, uint256 price);
    event RemoveLiquidityOne(address indexed provider, uint256 coinIndex, uint256 coinAmount, uint256 price);
}
