use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IMetaSwap {
        function metaSwapStorage() external view returns (
            address baseSwap,
            uint256 baseVirtualPrice,
            uint256 baseCacheLastUpdated
        );
    }

    event TokenSwapUnderlying(address indexed buyer, uint256 tokensSold, uint256 tokensBought, uint128 soldId, uint128 boughtId);
}
