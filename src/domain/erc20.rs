//! ERC-20 bindings shared by the decode state and the token decoders

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};

use crate::core::{CallNode, LogEvent};

alloy_sol_types::sol! {
    function transfer(address to, uint256 amount) returns (bool);
    function transferFrom(address from, address to, uint256 amount) returns (bool);
    function approve(address spender, uint256 amount) returns (bool);

    event Transfer(address indexed from, address indexed to, uint256 value);
    event Approval(address indexed owner, address indexed spender, uint256 value);
}

/// Selectors of the calls that move tokens
pub const TRANSFER_SELECTORS: [[u8; 4]; 2] = [transferCall::SELECTOR, transferFromCall::SELECTOR];

pub const TRANSFER_TOPIC: B256 = Transfer::SIGNATURE_HASH;
pub const APPROVAL_TOPIC: B256 = Approval::SIGNATURE_HASH;

/// Whether the node calls `transfer` or `transferFrom`
pub fn is_transfer_call(node: &CallNode) -> bool {
    node.selector()
        .is_some_and(|selector| TRANSFER_SELECTORS.contains(&selector))
}

/// `(first indexed address, second indexed address, amount)` of a
/// Transfer/Approval shaped log with the given topic
pub fn decode_pair_event(log: &LogEvent, topic: B256) -> Option<(Address, Address, U256)> {
    if log.topics.len() != 3 || log.topics[0] != topic || log.data.len() < 32 {
        return None;
    }

    Some((
        Address::from_word(log.topics[1]),
        Address::from_word(log.topics[2]),
        U256::from_be_slice(&log.data[..32]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogId, NodeId};

    #[test]
    fn test_known_constants() {
        assert_eq!(transferCall::SELECTOR, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(transferFromCall::SELECTOR, [0x23, 0xb8, 0x72, 0xdd]);
        assert_eq!(
            TRANSFER_TOPIC,
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
                .parse::<B256>()
                .unwrap()
        );
    }

    #[test]
    fn test_decode_transfer_log() {
        let from = Address::repeat_byte(0x11);
        let to = Address::repeat_byte(0x22);
        let log = LogEvent {
            id: LogId(0),
            node: NodeId(0),
            emitter: Address::repeat_byte(0x33),
            topics: vec![TRANSFER_TOPIC, from.into_word(), to.into_word()],
            data: U256::from(42).to_be_bytes::<32>().to_vec().into(),
        };

        assert_eq!(decode_pair_event(&log, TRANSFER_TOPIC), Some((from, to, U256::from(42))));
        assert_eq!(decode_pair_event(&log, APPROVAL_TOPIC), None);
    }
}
