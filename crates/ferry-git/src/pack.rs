//! Pack file encoding and decoding.
//!
//! Packs are the unit of object transfer in the smart protocol.
//! See: https://git-scm.com/docs/pack-format

use crate::{GitError, Result};
use bytes::Bytes;
use ferry_storage::{GitObject, ObjectId, ObjectStore, ObjectType};
use flate2::bufread::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::io::{Read, Write};
use tokio_util::sync::CancellationToken;

const PACK_SIGNATURE: &[u8; 4] = b"PACK";
const PACK_VERSION: u32 = 2;
const HEADER_LEN: usize = 12;
const CHECKSUM_LEN: usize = 20;

const OFS_DELTA: u8 = 6;
const REF_DELTA: u8 = 7;

/// Builds a version 2 pack of undeltified objects.
#[derive(Default)]
pub struct PackBuilder {
    objects: Vec<GitObject>,
    cancel: Option<CancellationToken>,
}

impl PackBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops with [`GitError::Canceled`] once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Queues an object.
    pub fn add(&mut self, object: GitObject) {
        self.objects.push(object);
    }

    /// Queues every listed object from `store`.
    pub fn add_from_store(&mut self, store: &ObjectStore, ids: &[ObjectId]) -> Result<()> {
        for id in ids {
            check_cancel(self.cancel.as_ref())?;
            self.objects.push(store.get(id)?);
        }
        Ok(())
    }

    /// Number of queued objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Serializes the pack, trailing checksum included.
    pub fn build(self) -> Result<Vec<u8>> {
        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&PACK_VERSION.to_be_bytes());
        pack.extend_from_slice(&(self.objects.len() as u32).to_be_bytes());

        for object in &self.objects {
            check_cancel(self.cancel.as_ref())?;
            encode_entry_header(&mut pack, object.object_type.pack_type(), object.size());
            pack.extend_from_slice(&deflate(&object.data)?);
        }

        let checksum = Sha1::digest(&pack);
        pack.extend_from_slice(&checksum);
        Ok(pack)
    }
}

fn check_cancel(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(GitError::Canceled),
        _ => Ok(()),
    }
}

/// Writes the type-and-size varint that opens every pack entry.
fn encode_entry_header(pack: &mut Vec<u8>, type_code: u8, size: usize) {
    let mut byte = (type_code << 4) | (size & 0x0F) as u8;
    let mut remaining = size >> 4;
    while remaining > 0 {
        pack.push(byte | 0x80);
        byte = (remaining & 0x7F) as u8;
        remaining >>= 7;
    }
    pack.push(byte);
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| GitError::InvalidPack(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| GitError::InvalidPack(e.to_string()))
}

/// One entry as it sits in the pack, before delta resolution.
enum RawEntry {
    Full(ObjectType, Vec<u8>),
    OfsDelta { base_offset: usize, delta: Vec<u8> },
    RefDelta { base: ObjectId, delta: Vec<u8> },
}

/// Parses a pack and stores every object it contains, resolving
/// `OFS_DELTA` and `REF_DELTA` entries. `REF_DELTA` bases may come from the
/// pack itself or already be present in the target store.
pub struct PackParser<'a> {
    data: &'a [u8],
    pos: usize,
    cancel: Option<CancellationToken>,
}

impl<'a> PackParser<'a> {
    /// Creates a parser over a complete pack.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            cancel: None,
        }
    }

    /// Stops with [`GitError::Canceled`] once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Parses the pack into `store` and returns the ids in pack order.
    pub fn parse(&mut self, store: &ObjectStore) -> Result<Vec<ObjectId>> {
        if self.data.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(GitError::InvalidPack("pack too small".to_string()));
        }
        if &self.data[0..4] != PACK_SIGNATURE {
            return Err(GitError::InvalidPack("invalid signature".to_string()));
        }
        let version = u32::from_be_bytes([self.data[4], self.data[5], self.data[6], self.data[7]]);
        if version != PACK_VERSION {
            return Err(GitError::InvalidPack(format!(
                "unsupported version: {version}"
            )));
        }
        let count =
            u32::from_be_bytes([self.data[8], self.data[9], self.data[10], self.data[11]]) as usize;

        let body_end = self.data.len() - CHECKSUM_LEN;
        if Sha1::digest(&self.data[..body_end]).as_slice() != &self.data[body_end..] {
            return Err(GitError::InvalidPack("checksum mismatch".to_string()));
        }

        self.pos = HEADER_LEN;
        // Each entry needs at least two bytes, which bounds a hostile count.
        let mut entries = Vec::with_capacity(count.min(body_end / 2));
        for _ in 0..count {
            check_cancel(self.cancel.as_ref())?;
            let offset = self.pos;
            let entry = self.read_entry(offset, body_end)?;
            entries.push((offset, entry));
        }
        if self.pos != body_end {
            return Err(GitError::InvalidPack(format!(
                "{} trailing bytes after last entry",
                body_end - self.pos
            )));
        }

        resolve_entries(entries, store, self.cancel.as_ref())
    }

    fn next_byte(&mut self, end: usize) -> Result<u8> {
        if self.pos >= end {
            return Err(GitError::InvalidPack("unexpected end of pack".to_string()));
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn read_entry(&mut self, offset: usize, end: usize) -> Result<RawEntry> {
        let first = self.next_byte(end)?;
        let type_code = (first >> 4) & 0x07;
        let mut size = (first & 0x0F) as usize;
        let mut shift = 4;
        let mut byte = first;
        while byte & 0x80 != 0 {
            byte = self.next_byte(end)?;
            if shift > 57 {
                return Err(GitError::InvalidPack("entry size overflows".to_string()));
            }
            size |= ((byte & 0x7F) as usize) << shift;
            shift += 7;
        }

        match type_code {
            OFS_DELTA => {
                let mut byte = self.next_byte(end)?;
                let mut distance = (byte & 0x7F) as usize;
                while byte & 0x80 != 0 {
                    byte = self.next_byte(end)?;
                    distance = distance
                        .checked_add(1)
                        .and_then(|d| d.checked_mul(128))
                        .map(|d| d | (byte & 0x7F) as usize)
                        .ok_or_else(|| GitError::InvalidPack("delta offset overflows".to_string()))?;
                }
                let base_offset = offset
                    .checked_sub(distance)
                    .filter(|_| distance > 0)
                    .ok_or_else(|| {
                        GitError::InvalidPack(format!("delta at {offset} points before pack start"))
                    })?;
                let delta = self.inflate(size, end)?;
                Ok(RawEntry::OfsDelta { base_offset, delta })
            }
            REF_DELTA => {
                if self.pos + 20 > end {
                    return Err(GitError::InvalidPack("truncated delta base id".to_string()));
                }
                let base = ObjectId::from_slice(&self.data[self.pos..self.pos + 20])?;
                self.pos += 20;
                let delta = self.inflate(size, end)?;
                Ok(RawEntry::RefDelta { base, delta })
            }
            code => {
                let object_type = ObjectType::from_pack_type(code)?;
                Ok(RawEntry::Full(object_type, self.inflate(size, end)?))
            }
        }
    }

    fn inflate(&mut self, expected: usize, end: usize) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(&self.data[self.pos..end]);
        let mut out = Vec::with_capacity(expected.min(end - self.pos).saturating_mul(4));
        // One byte past the header size is enough to detect an oversized entry.
        let limit = (expected as u64).saturating_add(1);
        decoder
            .by_ref()
            .take(limit)
            .read_to_end(&mut out)
            .map_err(|e| GitError::InvalidPack(format!("decompression failed: {e}")))?;
        if out.len() != expected {
            return Err(GitError::InvalidPack(format!(
                "entry inflated to {} bytes, header said {expected}",
                out.len()
            )));
        }
        self.pos += decoder.total_in() as usize;
        Ok(out)
    }
}

/// What a delta is waiting for.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum BaseKey {
    Offset(usize),
    Id(ObjectId),
}

/// A delta entry that still needs its base.
struct PendingDelta {
    index: usize,
    offset: usize,
    delta: Vec<u8>,
}

/// A resolved object other deltas may build on. `offset` is `None` for
/// bases taken from the store.
struct Resolved {
    offset: Option<usize>,
    id: ObjectId,
    object_type: ObjectType,
    data: Bytes,
}

/// Resolves deltas in dependency order and stores every object.
///
/// Each delta is indexed under the base it needs, so every entry is
/// resolved exactly once, however the pack orders its chains.
fn resolve_entries(
    entries: Vec<(usize, RawEntry)>,
    store: &ObjectStore,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<ObjectId>> {
    let mut ids: Vec<Option<ObjectId>> = vec![None; entries.len()];
    let mut waiting: HashMap<BaseKey, Vec<PendingDelta>> = HashMap::new();
    let mut ready = Vec::new();

    for (index, (offset, entry)) in entries.into_iter().enumerate() {
        let (key, delta) = match entry {
            RawEntry::Full(object_type, data) => {
                let object = GitObject::new(object_type, data);
                let (id, data) = (object.id, object.data.clone());
                store.put(object);
                ids[index] = Some(id);
                ready.push(Resolved {
                    offset: Some(offset),
                    id,
                    object_type,
                    data,
                });
                continue;
            }
            RawEntry::OfsDelta { base_offset, delta } => (BaseKey::Offset(base_offset), delta),
            RawEntry::RefDelta { base, delta } => (BaseKey::Id(base), delta),
        };
        waiting.entry(key).or_default().push(PendingDelta {
            index,
            offset,
            delta,
        });
    }

    loop {
        while let Some(base) = ready.pop() {
            check_cancel(cancel)?;
            let keys = [base.offset.map(BaseKey::Offset), Some(BaseKey::Id(base.id))];
            for key in keys.into_iter().flatten() {
                let Some(dependents) = waiting.remove(&key) else {
                    continue;
                };
                for pending in dependents {
                    let object =
                        GitObject::new(base.object_type, apply_delta(&base.data, &pending.delta)?);
                    let (id, data) = (object.id, object.data.clone());
                    store.put(object);
                    ids[pending.index] = Some(id);
                    ready.push(Resolved {
                        offset: Some(pending.offset),
                        id,
                        object_type: base.object_type,
                        data,
                    });
                }
            }
        }

        // Whatever is left can only build on objects the store already had.
        let external: Vec<ObjectId> = waiting
            .keys()
            .filter_map(|key| match key {
                BaseKey::Id(id) => Some(*id),
                BaseKey::Offset(_) => None,
            })
            .collect();
        for id in external {
            if let Ok(object) = store.get(&id) {
                ready.push(Resolved {
                    offset: None,
                    id,
                    object_type: object.object_type,
                    data: object.data,
                });
            }
        }
        if ready.is_empty() {
            break;
        }
    }

    if !waiting.is_empty() {
        let missing: usize = waiting.values().map(Vec::len).sum();
        return Err(GitError::InvalidPack(format!(
            "{missing} deltas reference missing base objects"
        )));
    }

    Ok(ids.into_iter().flatten().collect())
}

fn read_delta_size(delta: &[u8], pos: &mut usize) -> Result<usize> {
    let mut size = 0usize;
    let mut shift = 0;
    loop {
        let byte = *delta
            .get(*pos)
            .ok_or_else(|| GitError::InvalidPack("truncated delta header".to_string()))?;
        *pos += 1;
        if shift > 57 {
            return Err(GitError::InvalidPack("delta size overflows".to_string()));
        }
        size |= ((byte & 0x7F) as usize) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(size);
        }
    }
}

/// Applies a git delta to `base`.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut pos = 0;
    let source_size = read_delta_size(delta, &mut pos)?;
    let target_size = read_delta_size(delta, &mut pos)?;
    if source_size != base.len() {
        return Err(GitError::InvalidPack(format!(
            "delta expects a {source_size}-byte base, got {}",
            base.len()
        )));
    }

    let truncated = || GitError::InvalidPack("truncated delta instruction".to_string());
    let mut out = Vec::with_capacity(target_size);
    while pos < delta.len() {
        let cmd = delta[pos];
        pos += 1;

        if cmd & 0x80 != 0 {
            let mut copy_offset = 0usize;
            let mut copy_size = 0usize;
            for i in 0..4 {
                if cmd & (1 << i) != 0 {
                    copy_offset |= (*delta.get(pos).ok_or_else(truncated)? as usize) << (8 * i);
                    pos += 1;
                }
            }
            for i in 0..3 {
                if cmd & (0x10 << i) != 0 {
                    copy_size |= (*delta.get(pos).ok_or_else(truncated)? as usize) << (8 * i);
                    pos += 1;
                }
            }
            if copy_size == 0 {
                copy_size = 0x10000;
            }
            let chunk = copy_offset
                .checked_add(copy_size)
                .and_then(|copy_end| base.get(copy_offset..copy_end))
                .ok_or_else(|| GitError::InvalidPack("delta copy outside base".to_string()))?;
            out.extend_from_slice(chunk);
        } else if cmd != 0 {
            let len = cmd as usize;
            let chunk = delta.get(pos..pos + len).ok_or_else(truncated)?;
            out.extend_from_slice(chunk);
            pos += len;
        } else {
            return Err(GitError::InvalidPack("reserved delta opcode 0".to_string()));
        }
    }

    if out.len() != target_size {
        return Err(GitError::InvalidPack(format!(
            "delta produced {} bytes, expected {target_size}",
            out.len()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_size(out: &mut Vec<u8>, mut size: usize) {
        loop {
            let byte = (size & 0x7F) as u8;
            size >>= 7;
            if size == 0 {
                out.push(byte);
                return;
            }
            out.push(byte | 0x80);
        }
    }

    /// Delta that copies `base[..keep]` and appends `tail`.
    fn copy_then_insert(base_len: usize, keep: u8, tail: &[u8]) -> Vec<u8> {
        let mut delta = Vec::new();
        delta_size(&mut delta, base_len);
        delta_size(&mut delta, keep as usize + tail.len());
        delta.extend_from_slice(&[0x80 | 0x10, keep]);
        delta.push(tail.len() as u8);
        delta.extend_from_slice(tail);
        delta
    }

    fn finish(count: u32, body: &[u8]) -> Vec<u8> {
        let mut pack = b"PACK".to_vec();
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&count.to_be_bytes());
        pack.extend_from_slice(body);
        let checksum = Sha1::digest(&pack);
        pack.extend_from_slice(&checksum);
        pack
    }

    fn full_entry(body: &mut Vec<u8>, object: &GitObject) {
        encode_entry_header(body, object.object_type.pack_type(), object.size());
        body.extend_from_slice(&deflate(&object.data).unwrap());
    }

    #[test]
    fn test_roundtrip_full_objects() {
        let blob = GitObject::blob(b"Hello, World!".to_vec());
        let tree = GitObject::tree(&[("100644", "hello.txt", blob.id)]);
        let ids = [blob.id, tree.id];

        let mut builder = PackBuilder::new();
        builder.add(blob);
        builder.add(tree);
        let pack = builder.build().unwrap();

        let store = ObjectStore::new();
        let parsed = PackParser::new(&pack).parse(&store).unwrap();
        assert_eq!(parsed, ids);
        assert_eq!(store.get(&ids[0]).unwrap().data.as_ref(), b"Hello, World!");
    }

    #[test]
    fn test_empty_pack() {
        let pack = PackBuilder::new().build().unwrap();
        assert_eq!(pack.len(), 32);
        let store = ObjectStore::new();
        assert!(PackParser::new(&pack).parse(&store).unwrap().is_empty());
    }

    #[test]
    fn test_large_entry_header() {
        let data: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
        let blob = GitObject::blob(data.clone());
        let mut builder = PackBuilder::new();
        builder.add(blob.clone());
        let pack = builder.build().unwrap();

        let store = ObjectStore::new();
        PackParser::new(&pack).parse(&store).unwrap();
        assert_eq!(store.get(&blob.id).unwrap().data.len(), data.len());
    }

    #[test]
    fn test_ofs_delta_resolves_against_earlier_entry() {
        let base = GitObject::blob(b"fn main() { println!(\"hi\"); }".to_vec());
        let expected = GitObject::blob(b"fn main() { bye }".to_vec());

        let mut body = Vec::new();
        full_entry(&mut body, &base);
        let delta_offset = HEADER_LEN + body.len();
        let delta = copy_then_insert(base.size(), 12, b"bye }");
        encode_entry_header(&mut body, OFS_DELTA, delta.len());
        // Distance back to the base entry, which starts right after the header.
        let distance = delta_offset - HEADER_LEN;
        assert!(distance < 128);
        body.push(distance as u8);
        body.extend_from_slice(&deflate(&delta).unwrap());

        let store = ObjectStore::new();
        let ids = PackParser::new(&finish(2, &body)).parse(&store).unwrap();

        assert_eq!(ids, vec![base.id, expected.id]);
        assert_eq!(store.get(&expected.id).unwrap().data, expected.data);
    }

    #[test]
    fn test_ref_delta_before_its_base() {
        let base = GitObject::blob(b"0123456789".to_vec());
        let expected = GitObject::blob(b"01234abc".to_vec());
        let delta = copy_then_insert(base.size(), 5, b"abc");

        let mut body = Vec::new();
        encode_entry_header(&mut body, REF_DELTA, delta.len());
        body.extend_from_slice(base.id.as_bytes());
        body.extend_from_slice(&deflate(&delta).unwrap());
        full_entry(&mut body, &base);

        let store = ObjectStore::new();
        let ids = PackParser::new(&finish(2, &body)).parse(&store).unwrap();

        assert_eq!(ids, vec![expected.id, base.id]);
        assert_eq!(store.get(&expected.id).unwrap().data.as_ref(), b"01234abc");
    }

    #[test]
    fn test_ref_delta_base_already_in_store() {
        let base = GitObject::blob(b"shared base".to_vec());
        let store = ObjectStore::new();
        store.put(base.clone());

        let delta = copy_then_insert(base.size(), 6, b"!");
        let mut body = Vec::new();
        encode_entry_header(&mut body, REF_DELTA, delta.len());
        body.extend_from_slice(base.id.as_bytes());
        body.extend_from_slice(&deflate(&delta).unwrap());

        let ids = PackParser::new(&finish(1, &body)).parse(&store).unwrap();
        assert_eq!(store.get(&ids[0]).unwrap().data.as_ref(), b"shared!");
    }

    #[test]
    fn test_missing_delta_base() {
        let delta = copy_then_insert(4, 2, b"x");
        let mut body = Vec::new();
        encode_entry_header(&mut body, REF_DELTA, delta.len());
        body.extend_from_slice(&[0x42; 20]);
        body.extend_from_slice(&deflate(&delta).unwrap());

        let store = ObjectStore::new();
        let err = PackParser::new(&finish(1, &body)).parse(&store).unwrap_err();
        assert!(err.to_string().contains("missing base"));
    }

    #[test]
    fn test_apply_delta_rejects_bad_input() {
        // Base size mismatch.
        assert!(apply_delta(b"abc", &copy_then_insert(4, 1, b"")).is_err());
        // Copy outside the base.
        assert!(apply_delta(b"abc", &copy_then_insert(3, 9, b"")).is_err());
        // Reserved opcode.
        assert!(apply_delta(b"abc", &[3, 1, 0]).is_err());
    }

    #[test]
    fn test_rejects_corruption() {
        let mut builder = PackBuilder::new();
        builder.add(GitObject::blob(b"test".to_vec()));
        let pack = builder.build().unwrap();
        let store = ObjectStore::new();

        let mut bad_checksum = pack.clone();
        let last = bad_checksum.len() - 1;
        bad_checksum[last] ^= 0xFF;
        assert!(PackParser::new(&bad_checksum).parse(&store).is_err());

        let mut bad_signature = pack.clone();
        bad_signature[3] = b'X';
        assert!(PackParser::new(&bad_signature).parse(&store).is_err());

        assert!(PackParser::new(&pack[..10]).parse(&store).is_err());
    }

    /// Delta that replaces a `base_len`-byte base with `data` outright.
    fn insert_only(base_len: usize, data: &[u8]) -> Vec<u8> {
        let mut delta = Vec::new();
        delta_size(&mut delta, base_len);
        delta_size(&mut delta, data.len());
        delta.push(data.len() as u8);
        delta.extend_from_slice(data);
        delta
    }

    #[test]
    fn test_ref_delta_chain_in_reverse_order() {
        let base = GitObject::blob(b"v0".to_vec());
        let versions: Vec<GitObject> = (1..=300)
            .map(|i| GitObject::blob(format!("v{i}").into_bytes()))
            .collect();

        // Newest first, the full base last.
        let mut body = Vec::new();
        for i in (0..versions.len()).rev() {
            let previous = if i == 0 { &base } else { &versions[i - 1] };
            let delta = insert_only(previous.size(), &versions[i].data);
            encode_entry_header(&mut body, REF_DELTA, delta.len());
            body.extend_from_slice(previous.id.as_bytes());
            body.extend_from_slice(&deflate(&delta).unwrap());
        }
        full_entry(&mut body, &base);

        let store = ObjectStore::new();
        let ids = PackParser::new(&finish(301, &body)).parse(&store).unwrap();

        assert_eq!(ids.len(), 301);
        assert_eq!(ids[0], versions[299].id);
        assert_eq!(store.get(&versions[299].id).unwrap().data.as_ref(), b"v300");
        assert_eq!(store.len(), 301);
    }

    #[test]
    fn test_entry_larger_than_header_size() {
        let data = vec![b'a'; 10_000];
        let mut body = Vec::new();
        encode_entry_header(&mut body, ObjectType::Blob.pack_type(), 3);
        body.extend_from_slice(&deflate(&data).unwrap());

        let store = ObjectStore::new();
        let err = PackParser::new(&finish(1, &body)).parse(&store).unwrap_err();
        assert!(err.to_string().contains("header said 3"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_canceled_parse() {
        let mut builder = PackBuilder::new();
        builder.add(GitObject::blob(b"test".to_vec()));
        let pack = builder.build().unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let store = ObjectStore::new();
        let err = PackParser::new(&pack)
            .with_cancel(cancel)
            .parse(&store)
            .unwrap_err();
        assert!(matches!(err, GitError::Canceled));
        assert!(store.is_empty());
    }

    #[test]
    fn test_canceled_build() {
        let cancel = CancellationToken::new();
        let mut builder = PackBuilder::new().with_cancel(cancel.clone());
        builder.add(GitObject::blob(b"test".to_vec()));
        cancel.cancel();
        assert!(matches!(builder.build(), Err(GitError::Canceled)));
    }

    #[test]
    fn test_count_larger_than_entries() {
        let mut body = Vec::new();
        full_entry(&mut body, &GitObject::blob(b"one".to_vec()));
        let store = ObjectStore::new();
        assert!(PackParser::new(&finish(3, &body)).parse(&store).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_roundtrip_blobs(blobs in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..2000), 1..16)) {
            let mut builder = PackBuilder::new();
            let mut expected = Vec::new();
            for data in &blobs {
                let blob = GitObject::blob(data.clone());
                expected.push(blob.id);
                builder.add(blob);
            }
            let pack = builder.build().unwrap();

            let store = ObjectStore::new();
            let ids = PackParser::new(&pack).parse(&store).unwrap();
            prop_assert_eq!(ids, expected);
        }

        #[test]
        fn prop_garbage_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let store = ObjectStore::new();
            let _ = PackParser::new(&data).parse(&store);
        }

        #[test]
        fn prop_apply_delta_never_panics(base in prop::collection::vec(any::<u8>(), 0..64),
                                         delta in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = apply_delta(&base, &delta);
        }
    }
}
