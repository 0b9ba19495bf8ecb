use super::NodeType;
use crate::{
    error::{Error, Result},
    BTREE_PAGE_SIZE, HEADER, KV_HEADER, OFFSET_SIZE, PTR_SIZE,
};
use byteorder::{ByteOrder, LittleEndian};
use bytes::{Bytes, BytesMut};
use log::warn;
use std::fmt::Display;

/// A B+tree node laid out in a single page. The buffer type decides what the node can do: any
/// `AsRef<[u8]>` buffer can be read, a `BytesMut` page is built in place, and a frozen `Bytes`
/// page is immutable and cheap to share between readers.
///
/// Positions are computed from the key count in the header, so `set_header` must come first and
/// records must be appended in ascending index order. Out-of-range indices and records that do
/// not fit the page are caller bugs and panic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BNode<B = Bytes> {
    data: B,
}

/// Allocates a zero-filled page of `BTREE_PAGE_SIZE` bytes.
pub fn new_page() -> BNode<BytesMut> {
    BNode::new()
}

impl BNode<BytesMut> {
    pub fn new() -> Self {
        Self::with_page_size(BTREE_PAGE_SIZE)
    }

    /// Allocates a zero-filled page of the given size. Use [`crate::PageConfig::new_page`] to
    /// get a size that has been validated.
    pub fn with_page_size(page_size: usize) -> Self {
        assert!(
            page_size > HEADER && page_size <= u16::MAX as usize,
            "page size {} is outside the addressable range",
            page_size
        );
        BNode { data: BytesMut::zeroed(page_size) }
    }

    /// Publishes a fully built page. The result can no longer be mutated.
    pub fn freeze(self) -> BNode<Bytes> {
        BNode { data: self.data.freeze() }
    }
}

impl Default for BNode<BytesMut> {
    fn default() -> Self {
        Self::new()
    }
}

impl BNode<Bytes> {
    /// Loads a persisted page of `BTREE_PAGE_SIZE` bytes.
    pub fn load_from_bytes(value: &[u8]) -> Result<BNode> {
        Self::load_with_page_size(value, BTREE_PAGE_SIZE)
    }

    /// Loads a persisted page, rejecting anything that does not follow the node layout. Every
    /// accessor is safe to call for indices below `nkeys()` on the returned node.
    pub fn load_with_page_size(value: &[u8], page_size: usize) -> Result<BNode> {
        let node = BNode { data: Bytes::copy_from_slice(value) };
        if let Err(err) = node.check_layout(page_size) {
            warn!("Rejecting page: {}", err);
            return Err(err);
        }
        Ok(node)
    }
}

/// Smallest page that can hold `nkeys` records, all with empty keys and values.
fn min_node_size(nkeys: u16) -> usize {
    HEADER + (PTR_SIZE + OFFSET_SIZE + KV_HEADER) * nkeys as usize
}

impl<B: AsRef<[u8]>> BNode<B> {
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Raw node kind, not validated.
    pub fn btype(&self) -> u16 {
        LittleEndian::read_u16(&self.as_bytes()[0..2])
    }

    pub fn node_type(&self) -> Result<NodeType> {
        NodeType::try_from(self.btype())
    }

    pub fn nkeys(&self) -> u16 {
        LittleEndian::read_u16(&self.as_bytes()[2..4])
    }

    pub fn get_ptr(&self, idx: u16) -> u64 {
        let pos = self.ptr_pos(idx);
        LittleEndian::read_u64(&self.as_bytes()[pos..])
    }

    /// Byte distance from the start of the KV region to record `idx`. `get_offset(0)` is always 0
    /// and `get_offset(nkeys)` is the length of the KV region.
    pub fn get_offset(&self, idx: u16) -> u16 {
        if idx == 0 {
            return 0;
        }
        let pos = self.offset_pos(idx);
        LittleEndian::read_u16(&self.as_bytes()[pos..])
    }

    /// Position of record `idx` within the page, valid for `idx <= nkeys`.
    pub fn kv_pos(&self, idx: u16) -> usize {
        let nkeys = self.nkeys();
        assert!(idx <= nkeys, "kv index {} out of range for {} keys", idx, nkeys);
        self.kv_region() + self.get_offset(idx) as usize
    }

    pub fn get_key(&self, idx: u16) -> &[u8] {
        let (pos, klen, _) = self.record(idx);
        &self.as_bytes()[pos + KV_HEADER..][..klen]
    }

    pub fn get_val(&self, idx: u16) -> &[u8] {
        let (pos, klen, vlen) = self.record(idx);
        &self.as_bytes()[pos + KV_HEADER + klen..][..vlen]
    }

    /// Occupied length of the page: everything up to the end of the last record.
    pub fn nbytes(&self) -> u16 {
        self.kv_pos(self.nkeys()) as u16
    }

    fn ptr_pos(&self, idx: u16) -> usize {
        let nkeys = self.nkeys();
        assert!(idx < nkeys, "pointer index {} out of range for {} keys", idx, nkeys);
        HEADER + PTR_SIZE * idx as usize
    }

    // Offset slot k holds get_offset(k + 1); get_offset(0) has no slot.
    fn offset_pos(&self, idx: u16) -> usize {
        let nkeys = self.nkeys();
        assert!(idx >= 1 && idx <= nkeys, "offset index {} out of range for {} keys", idx, nkeys);
        HEADER + PTR_SIZE * nkeys as usize + OFFSET_SIZE * (idx as usize - 1)
    }

    fn kv_region(&self) -> usize {
        HEADER + (PTR_SIZE + OFFSET_SIZE) * self.nkeys() as usize
    }

    /// Position, key length and value length of record `idx`.
    fn record(&self, idx: u16) -> (usize, usize, usize) {
        let nkeys = self.nkeys();
        assert!(idx < nkeys, "kv index {} out of range for {} keys", idx, nkeys);
        let pos = self.kv_pos(idx);
        let data = self.as_bytes();
        let klen = LittleEndian::read_u16(&data[pos..]) as usize;
        let vlen = LittleEndian::read_u16(&data[pos + 2..]) as usize;
        (pos, klen, vlen)
    }

    /// Checks everything the accessors rely on without trusting any stored field.
    fn check_layout(&self, page_size: usize) -> Result<()> {
        if page_size > u16::MAX as usize {
            return Err(Error::Corrupt(format!(
                "page size {} is not addressable with 16-bit offsets",
                page_size
            )));
        }
        let len = self.as_bytes().len();
        if len != page_size || len <= HEADER {
            return Err(Error::Corrupt(format!("page is {} bytes, expected {}", len, page_size)));
        }
        let node_type = self.node_type()?;

        let nkeys = self.nkeys();
        let base = self.kv_region();
        if min_node_size(nkeys) > len {
            return Err(Error::Corrupt(format!(
                "{} keys do not fit a {} byte page",
                nkeys, len
            )));
        }

        let data = self.as_bytes();
        for idx in 0..nkeys {
            let (start, end) = (self.get_offset(idx) as usize, self.get_offset(idx + 1) as usize);
            if end < start {
                return Err(Error::Corrupt(format!(
                    "offset of record {} goes backwards from {} to {}",
                    idx, start, end
                )));
            }
            if base + end > len || end - start < KV_HEADER {
                return Err(Error::Corrupt(format!(
                    "record {} at offset {} with end {} does not fit the page",
                    idx, start, end
                )));
            }
            let pos = base + start;
            let klen = LittleEndian::read_u16(&data[pos..]) as usize;
            let vlen = LittleEndian::read_u16(&data[pos + 2..]) as usize;
            if KV_HEADER + klen + vlen != end - start {
                return Err(Error::Corrupt(format!(
                    "record {} holds {} bytes but the offset table gives it {}",
                    idx,
                    KV_HEADER + klen + vlen,
                    end - start
                )));
            }
            if node_type == NodeType::Node && vlen != 0 {
                return Err(Error::Corrupt(format!("internal node record {} has a value", idx)));
            }
        }
        Ok(())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BNode<B> {
    /// Writes the node kind and key count. Must be called before any other write, since every
    /// position in the page depends on the key count.
    pub fn set_header(&mut self, node_type: NodeType, nkeys: u16) {
        let len = self.as_bytes().len();
        assert!(
            min_node_size(nkeys) <= len,
            "{} keys do not fit a {} byte page",
            nkeys,
            len
        );
        let data = self.data.as_mut();
        LittleEndian::write_u16(&mut data[0..2], node_type.into());
        LittleEndian::write_u16(&mut data[2..4], nkeys);
    }

    pub fn set_ptr(&mut self, idx: u16, value: u64) {
        let pos = self.ptr_pos(idx);
        LittleEndian::write_u64(&mut self.data.as_mut()[pos..pos + PTR_SIZE], value);
    }

    /// Stores `get_offset(idx)`. Offset 0 is implicit, so writing it does nothing.
    pub fn set_offset(&mut self, idx: u16, value: u16) {
        if idx == 0 {
            return;
        }
        let pos = self.offset_pos(idx);
        LittleEndian::write_u16(&mut self.data.as_mut()[pos..pos + OFFSET_SIZE], value);
    }

    /// Writes record `idx` right after record `idx - 1` and records where it ends. Records
    /// `0..idx` must already be in place. Internal nodes take empty values.
    pub fn append_kv(&mut self, idx: u16, ptr: u64, key: &[u8], val: &[u8]) {
        self.set_ptr(idx, ptr);
        assert!(
            val.is_empty() || self.btype() != u16::from(NodeType::Node),
            "internal node record {} given a {} byte value",
            idx,
            val.len()
        );

        let pos = self.kv_pos(idx);
        let size = KV_HEADER + key.len() + val.len();
        let len = self.as_bytes().len();
        assert!(
            pos + size <= len,
            "record {} with a {} byte key and a {} byte value overflows the {} byte page",
            idx,
            key.len(),
            val.len(),
            len
        );

        // Every length below is bounded by the page size, which fits u16.
        let data = self.data.as_mut();
        LittleEndian::write_u16(&mut data[pos..pos + 2], key.len() as u16);
        LittleEndian::write_u16(&mut data[pos + 2..pos + 4], val.len() as u16);
        data[pos + KV_HEADER..][..key.len()].copy_from_slice(key);
        data[pos + KV_HEADER + key.len()..][..val.len()].copy_from_slice(val);

        let end = self.get_offset(idx) + size as u16;
        self.set_offset(idx + 1, end);
    }

    /// Copies records `src_old..src_old + n` of `old` into `dst_new..dst_new + n`, pointers
    /// included.
    pub fn append_range<C: AsRef<[u8]>>(
        &mut self,
        old: &BNode<C>,
        dst_new: u16,
        src_old: u16,
        n: u16,
    ) {
        assert!(
            src_old as usize + n as usize <= old.nkeys() as usize,
            "source range {}..{} out of range for {} keys",
            src_old,
            src_old as usize + n as usize,
            old.nkeys()
        );
        assert!(
            dst_new as usize + n as usize <= self.nkeys() as usize,
            "destination range {}..{} out of range for {} keys",
            dst_new,
            dst_new as usize + n as usize,
            self.nkeys()
        );
        for i in 0..n {
            let src = src_old + i;
            self.append_kv(dst_new + i, old.get_ptr(src), old.get_key(src), old.get_val(src));
        }
    }
}

impl<B: AsRef<[u8]>> Display for BNode<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.node_type() {
            Ok(node_type) => write!(f, "{}", node_type)?,
            Err(_) => write!(f, "unknown({})", self.btype())?,
        }
        writeln!(f, " nkeys={} nbytes={}", self.nkeys(), self.nbytes())?;
        for i in 0..self.nkeys() {
            writeln!(
                f,
                "  {}: ptr={:#x} key={:?} val={:?}",
                i,
                self.get_ptr(i),
                String::from_utf8_lossy(self.get_key(i)),
                String::from_utf8_lossy(self.get_val(i))
            )?;
        }
        Ok(())
    }
}
