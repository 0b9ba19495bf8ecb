pub mod b_tree;
pub mod config;
pub mod error;

pub use b_tree::*;
pub use config::PageConfig;
pub use error::{Error, Result};

// node format:
// | type | nkeys |  pointers  |   offsets  | key-values
// |  2B  |   2B  | nkeys * 8B | nkeys * 2B | ...
//
// key-value format:
// | klen | vlen | key | val |
// |  2B  |  2B  | ... | ... |

pub const HEADER: usize = 4; // 4B
pub const PTR_SIZE: usize = 8; // 8B
pub const OFFSET_SIZE: usize = 2; // 2B
pub const KV_HEADER: usize = 4; // 4B

/// The page size is defined to be 4K bytes. A larger page size such as 8K or 16K also works,
/// as long as a [`PageConfig`] built from it validates.
pub const BTREE_PAGE_SIZE: usize = 4096; // 4096B
pub const BTREE_MAX_KEY_SIZE: usize = 1000; // 1000B
pub const BTREE_MAX_VAL_SIZE: usize = 3000; // 3000B

/// Bytes taken by a node holding a single key-value pair of the given sizes.
pub const fn single_kv_node_size(key_size: usize, val_size: usize) -> usize {
    HEADER + PTR_SIZE + OFFSET_SIZE + KV_HEADER + key_size + val_size
}

const _: () = assert!(
    single_kv_node_size(BTREE_MAX_KEY_SIZE, BTREE_MAX_VAL_SIZE) <= BTREE_PAGE_SIZE,
    "a maximal key-value pair does not fit into a page"
);
