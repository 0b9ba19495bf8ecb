use crate::{
    b_tree::BNode,
    error::{Error, Result},
    single_kv_node_size, BTREE_MAX_KEY_SIZE, BTREE_MAX_VAL_SIZE, BTREE_PAGE_SIZE,
};
use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Page format parameters. A store records these next to its data and checks them with
/// [`PageConfig::validate`] before touching any page, refusing to run if they are unusable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    pub page_size: usize,
    pub max_key_size: usize,
    pub max_val_size: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_size: BTREE_PAGE_SIZE,
            max_key_size: BTREE_MAX_KEY_SIZE,
            max_val_size: BTREE_MAX_VAL_SIZE,
        }
    }
}

impl PageConfig {
    /// Creates a validated configuration.
    pub fn new(page_size: usize, max_key_size: usize, max_val_size: usize) -> Result<Self> {
        let config = Self { page_size, max_key_size, max_val_size };
        config.validate()?;
        Ok(config)
    }

    /// Checks that one maximal key-value pair fits a page and that every position in the page
    /// is addressable by the 16-bit offset table.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.page_size > u16::MAX as usize {
            Some(format!(
                "page size {} is not addressable with 16-bit offsets (max {})",
                self.page_size,
                u16::MAX
            ))
        } else if single_kv_node_size(self.max_key_size, self.max_val_size) > self.page_size {
            Some(format!(
                "a node with one {}B key and one {}B value needs {}B, page size is {}B",
                self.max_key_size,
                self.max_val_size,
                single_kv_node_size(self.max_key_size, self.max_val_size),
                self.page_size
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => {
                warn!("Rejecting page configuration {:?}: {}", self, reason);
                Err(Error::Config(reason))
            }
            None => {
                debug!("Page configuration {:?} is valid", self);
                Ok(())
            }
        }
    }

    /// Rejects user keys and values larger than the configured caps.
    pub fn check_kv(&self, key: &[u8], val: &[u8]) -> Result<()> {
        if key.len() > self.max_key_size {
            return Err(Error::Value(format!(
                "Key size {} exceeds maximum {}",
                key.len(),
                self.max_key_size
            )));
        }
        if val.len() > self.max_val_size {
            return Err(Error::Value(format!(
                "Value size {} exceeds maximum {}",
                val.len(),
                self.max_val_size
            )));
        }
        Ok(())
    }

    /// Allocates a zero-filled page of the configured size.
    pub fn new_page(&self) -> BNode<BytesMut> {
        BNode::with_page_size(self.page_size)
    }

    /// Loads a persisted page, checking it against the configured page size.
    pub fn load_page(&self, value: &[u8]) -> Result<BNode<Bytes>> {
        BNode::load_with_page_size(value, self.page_size)
    }

    /// Serializes the configuration.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserializes and validates a configuration.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let config: Self = bincode::deserialize(bytes)?;
        config.validate()?;
        Ok(config)
    }
}
