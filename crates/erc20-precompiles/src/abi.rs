//! Contract interfaces shared by the extension, the keeper and the test chain.

use alloy_sol_types::sol;

sol! {
    /// ERC20 with the optional metadata methods.
    interface IERC20 {
        /// Emitted on every balance movement, including mints and burns.
        event Transfer(address indexed from, address indexed to, uint256 value);
        /// Emitted when an allowance is set.
        event Approval(address indexed owner, address indexed spender, uint256 value);

        /// Token name.
        function name() external view returns (string);
        /// Token symbol.
        function symbol() external view returns (string);
        /// Display decimals.
        function decimals() external view returns (uint8);
        /// Total supply.
        function totalSupply() external view returns (uint256);
        /// Balance of `account`.
        function balanceOf(address account) external view returns (uint256);
        /// Remaining allowance of `spender` over `owner`.
        function allowance(address owner, address spender) external view returns (uint256);
        /// Moves `amount` from the caller to `to`.
        function transfer(address to, uint256 amount) external returns (bool);
        /// Sets the allowance of `spender` over the caller.
        function approve(address spender, uint256 amount) external returns (bool);
        /// Moves `amount` from `from` to `to` using the caller's allowance.
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
    }

    /// Owner-only supply management of the token the module deploys for native coins.
    interface IERC20MinterBurnerDecimals {
        /// Mints `amount` to `to`.
        function mint(address to, uint256 amount) external;
        /// Burns `amount` from the caller.
        function burn(uint256 amount) external;
        /// Burns `amount` from `from` without an allowance.
        function burnCoins(address from, uint256 amount) external;
    }

    /// WETH9-style wrapped native token.
    interface IWrappedNative {
        /// Wraps the attached value.
        function deposit() external payable;
        /// Unwraps `wad` back to the native coin.
        function withdraw(uint256 wad) external;
    }

    /// Creation arguments of the module minter/burner token.
    contract ERC20MinterBurnerDecimals {
        constructor(string name, string symbol, uint8 decimals);
    }
}
