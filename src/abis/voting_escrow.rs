use alloy::sol;

sol! {
    // `type` in the deployed ABI; the name does not enter the signature.
    event Deposit(address indexed provider, uint256 value, uint256 indexed locktime, int128 depositType, uint256 ts);
}
