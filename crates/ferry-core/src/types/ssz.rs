//! SSZ hash tree root plumbing shared by the beacon and reduced block types.

pub use ssz_types::{typenum, BitList, BitVector, FixedVector, VariableList};
pub use tree_hash::{Hash256, TreeHash};

/// Implements `TreeHash` for a container from its fields, in SSZ order.
///
/// Each field contributes its own hash tree root as one leaf and the leaves
/// are merkleized with padding to the next power of two.
macro_rules! tree_hash_container {
    ($name:ident { $($field:ident),+ $(,)? }) => {
        impl tree_hash::TreeHash for $name {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                tree_hash::TreeHashType::Container
            }

            fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
                unreachable!("Container should never be packed.")
            }

            fn tree_hash_packing_factor() -> usize {
                unreachable!("Container should never be packed.")
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                let mut leaves = Vec::new();
                $(leaves.extend_from_slice(
                    tree_hash::TreeHash::tree_hash_root(&self.$field).as_slice(),
                );)+
                tree_hash::merkle_root(&leaves, 0)
            }
        }
    };
}

pub(crate) use tree_hash_container;

/// Hash tree root as the plain byte array the SCALE types carry.
pub fn root_of<T: TreeHash>(value: &T) -> [u8; 32] {
    value.tree_hash_root().0
}
