//! Block validation rules applied before insertion.

use crate::core::block::Block;
use crate::core::blockchain::{ChainError, HeaderList};

/// Pre-insertion block checks.
///
/// Implementations must be thread-safe; validation runs under the chain's
/// writer lock from both the server loop and the validator ticker.
pub trait Validator: Send + Sync {
    /// Checks `block` against the current header index.
    fn validate_block(&self, headers: &HeaderList, block: &Block) -> Result<(), ChainError>;
}

/// Default consensus rules for the single-validator chain.
///
/// In order: the height must be unoccupied, it must extend the tip exactly,
/// the predecessor link must match, and the block itself must verify
/// (signature, then data hash).
#[derive(Clone, Copy, Default)]
pub struct BlockValidator;

impl Validator for BlockValidator {
    fn validate_block(&self, headers: &HeaderList, block: &Block) -> Result<(), ChainError> {
        let height = block.header.height;

        if headers.has(height) {
            return Err(ChainError::BlockKnown {
                height,
                hash: block.hash(),
            });
        }

        if height != headers.height() + 1 {
            return Err(ChainError::HeightOutOfOrder {
                height,
                tip: headers.height(),
            });
        }

        let prev = headers.get(height - 1)?;
        if prev.hash() != block.header.prev_block_hash {
            return Err(ChainError::PrevHashMismatch { height });
        }

        block.verify()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::BlockError;
    use crate::core::blockchain::Blockchain;
    use crate::crypto::key_pair::PrivateKey;
    use crate::types::hash::Hash;
    use crate::utils::test_utils::utils::{create_genesis, random_block};

    // Drive the validator through the chain, which owns the header index.
    fn chain() -> Blockchain {
        Blockchain::new(create_genesis())
    }

    fn next_block(chain: &Blockchain) -> Block {
        let tip = chain.get_header(chain.height()).unwrap();
        let mut block = Block::from_prev_header(&tip, vec![]);
        block.sign(&PrivateKey::generate()).unwrap();
        block
    }

    #[test]
    fn valid_successor_is_accepted() {
        let chain = chain();
        chain.add_block(next_block(&chain)).unwrap();
        assert_eq!(chain.height(), 1);
    }

    #[test]
    fn occupied_height_is_block_known() {
        let chain = chain();
        let result = chain.add_block(random_block(0, Hash::zero()));
        assert!(matches!(
            result,
            Err(ChainError::BlockKnown { height: 0, .. })
        ));
    }

    #[test]
    fn height_past_tip_is_out_of_order() {
        let chain = chain();
        let result = chain.add_block(random_block(2, Hash::zero()));
        assert!(matches!(
            result,
            Err(ChainError::HeightOutOfOrder { height: 2, tip: 0 })
        ));
    }

    #[test]
    fn wrong_prev_hash_is_rejected() {
        let chain = chain();
        let result = chain.add_block(random_block(1, Hash::sha256(b"wrong")));
        assert!(matches!(
            result,
            Err(ChainError::PrevHashMismatch { height: 1 })
        ));
    }

    #[test]
    fn block_checks_run_in_order() {
        // A block that is both at an occupied height and unsigned reports
        // BlockKnown: the chain-position checks come first.
        let chain = chain();
        let mut block = random_block(0, Hash::zero());
        block.signature = None;

        assert!(matches!(
            chain.add_block(block),
            Err(ChainError::BlockKnown { .. })
        ));
    }

    #[test]
    fn signature_check_is_last() {
        let chain = chain();
        let mut block = next_block(&chain);
        block.signature = None;

        assert_eq!(
            chain.add_block(block),
            Err(ChainError::Block(BlockError::NoSignature))
        );
    }
}
