//! ERC20 calldata used by balance reads and approvals

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
	/// The slice of the ERC20 interface the router touches
	interface IERC20 {
		function balanceOf(address account) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
	}
}

pub fn balance_of_calldata(account: Address) -> Bytes {
	IERC20::balanceOfCall { account }.abi_encode().into()
}

/// Unlimited approval of `spender`
pub fn approve_max_calldata(spender: Address) -> Bytes {
	IERC20::approveCall {
		spender,
		amount: U256::MAX,
	}
	.abi_encode()
	.into()
}

/// Read a single `uint256` return word
pub fn decode_uint(returned: &[u8]) -> Option<U256> {
	returned.get(..32).map(U256::from_be_slice)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_selectors() {
		let balance_of = balance_of_calldata(Address::repeat_byte(0xaa));
		assert_eq!(&balance_of[..4], &[0x70, 0xa0, 0x82, 0x31]);
		assert_eq!(balance_of.len(), 36);

		let approve = approve_max_calldata(Address::repeat_byte(0xbb));
		assert_eq!(&approve[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
		assert_eq!(&approve[36..68], &[0xff; 32]);
	}

	#[test]
	fn test_decode_uint() {
		let mut word = [0u8; 32];
		word[31] = 42;
		assert_eq!(decode_uint(&word), Some(U256::from(42u64)));
		assert_eq!(decode_uint(&word[..10]), None);
	}
}
