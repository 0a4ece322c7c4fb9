//! Signature index - stores function signatures by selector

use std::collections::HashMap;

use super::FunctionSignature;

/// Two distinct signatures that hash to the same selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCollision {
    pub selector: [u8; 4],
    /// Signature registered first (kept)
    pub existing: String,
    /// Signature that lost
    pub rejected: String,
    /// Owner of the rejected signature
    pub owner: String,
}

/// Index of function signatures by selector
#[derive(Debug, Default, Clone)]
pub struct SignatureIndex {
    /// Functions indexed by 4-byte selector
    functions: HashMap<[u8; 4], FunctionSignature>,
    collisions: Vec<SelectorCollision>,
}

impl SignatureIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a function signature owned by `owner`.
    ///
    /// First signature for a given selector wins. Re-inserting the same
    /// canonical signature is fine; a different canonical signature with
    /// the same selector is recorded as a collision and returned.
    pub fn insert(
        &mut self,
        owner: &str,
        function: &FunctionSignature,
    ) -> Option<SelectorCollision> {
        match self.functions.get(&function.selector) {
            Some(existing) if existing.signature == function.signature => None,
            Some(existing) => {
                let collision = SelectorCollision {
                    selector: function.selector,
                    existing: existing.signature.clone(),
                    rejected: function.signature.clone(),
                    owner: owner.to_string(),
                };
                self.collisions.push(collision.clone());
                Some(collision)
            }
            None => {
                self.functions.insert(function.selector, function.clone());
                None
            }
        }
    }

    /// Look up a function by selector
    pub fn lookup(&self, selector: [u8; 4]) -> Option<&FunctionSignature> {
        self.functions.get(&selector)
    }

    /// Collisions seen so far
    pub fn collisions(&self) -> &[SelectorCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_insert_lookup() {
        let mut index = SignatureIndex::new();
        let func = FunctionSignature::parse("transfer(address to,uint256 amount)").unwrap();

        assert!(index.insert("erc20-transfer", &func).is_none());

        assert_eq!(index.len(), 1);
        assert!(index.lookup([0xa9, 0x05, 0x9c, 0xbb]).is_some());
        assert!(index.lookup([0xde, 0xad, 0xbe, 0xef]).is_none());
    }

    #[test]
    fn test_same_signature_is_not_a_collision() {
        let mut index = SignatureIndex::new();
        let named = FunctionSignature::parse("transfer(address to,uint256 amount)").unwrap();
        let bare = FunctionSignature::parse("transfer(address,uint)").unwrap();

        index.insert("a", &named);
        assert!(index.insert("b", &bare).is_none());
        assert!(index.collisions().is_empty());
    }

    #[test]
    fn test_first_wins_on_collision() {
        let mut index = SignatureIndex::new();

        // Both hash to 0x42966c68
        let burn = FunctionSignature::parse("burn(uint256)").unwrap();
        let collate = FunctionSignature::parse("collate_propagate_storage(bytes16)").unwrap();
        assert_eq!(burn.selector, collate.selector);

        index.insert("first", &burn);
        let collision = index.insert("second", &collate).unwrap();

        assert_eq!(collision.existing, "burn(uint256)");
        assert_eq!(collision.rejected, "collate_propagate_storage(bytes16)");
        assert_eq!(collision.owner, "second");
        assert_eq!(index.lookup(burn.selector).unwrap().signature, "burn(uint256)");
        assert_eq!(index.collisions().len(), 1);
    }
}
