//! Git object model: ids, types and raw objects.

use crate::{Result, StorageError};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;

/// A 20-byte SHA-1 object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl ObjectId {
    /// The all-zero id git uses for "no object" in ref updates.
    pub const ZERO: ObjectId = ObjectId([0u8; 20]);

    /// Wraps raw id bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Reads an id from the first 20 bytes of `slice`.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; 20] = slice
            .get(..20)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| {
                StorageError::InvalidObject(format!("object id needs 20 bytes, got {}", slice.len()))
            })?;
        Ok(Self(bytes))
    }

    /// Parses a 40-character hex id.
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != 40 {
            return Err(StorageError::InvalidObject(format!(
                "invalid object id length: {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex, &mut bytes)
            .map_err(|e| StorageError::InvalidObject(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// True for [`ObjectId::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Hashes `data` with the loose-object header for `object_type`.
    pub fn hash_object(object_type: ObjectType, data: &[u8]) -> Self {
        let header = format!("{} {}\0", object_type.as_str(), data.len());
        let mut hasher = Sha1::new();
        hasher.update(header.as_bytes());
        hasher.update(data);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Git object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Commit.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectType {
    /// Name used in object headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Parses a header type name.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            _ => Err(StorageError::InvalidObject(format!(
                "unknown object type: {s}"
            ))),
        }
    }

    /// Type code used in pack entries.
    pub fn pack_type(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
        }
    }

    /// Maps a non-delta pack type code back to a type.
    pub fn from_pack_type(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Commit),
            2 => Ok(Self::Tree),
            3 => Ok(Self::Blob),
            4 => Ok(Self::Tag),
            _ => Err(StorageError::InvalidObject(format!(
                "unknown pack type: {code}"
            ))),
        }
    }
}

/// A decoded git object.
#[derive(Debug, Clone)]
pub struct GitObject {
    /// SHA-1 of header plus data.
    pub id: ObjectId,
    /// Kind of object.
    pub object_type: ObjectType,
    /// Uncompressed payload, without the loose-object header.
    pub data: Bytes,
}

impl GitObject {
    /// Creates an object and computes its id.
    pub fn new(object_type: ObjectType, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let id = ObjectId::hash_object(object_type, &data);
        Self {
            id,
            object_type,
            data,
        }
    }

    /// Creates a blob.
    pub fn blob(content: impl Into<Bytes>) -> Self {
        Self::new(ObjectType::Blob, content)
    }

    /// Creates a tree from `(mode, name, id)` entries in the given order.
    pub fn tree(entries: &[(&str, &str, ObjectId)]) -> Self {
        let mut data = Vec::new();
        for (mode, name, id) in entries {
            data.extend_from_slice(mode.as_bytes());
            data.push(b' ');
            data.extend_from_slice(name.as_bytes());
            data.push(0);
            data.extend_from_slice(id.as_bytes());
        }
        Self::new(ObjectType::Tree, data)
    }

    /// Creates a commit.
    pub fn commit(
        tree_id: &ObjectId,
        parents: &[ObjectId],
        author: &str,
        committer: &str,
        message: &str,
    ) -> Self {
        let mut content = format!("tree {tree_id}\n");
        for parent in parents {
            content.push_str(&format!("parent {parent}\n"));
        }
        content.push_str(&format!("author {author}\n"));
        content.push_str(&format!("committer {committer}\n"));
        content.push_str(&format!("\n{message}"));
        Self::new(ObjectType::Commit, content.into_bytes())
    }

    /// Creates an annotated tag pointing at `target`.
    pub fn tag(target: &ObjectId, target_type: ObjectType, name: &str, tagger: &str, message: &str) -> Self {
        let content = format!(
            "object {target}\ntype {}\ntag {name}\ntagger {tagger}\n\n{message}",
            target_type.as_str()
        );
        Self::new(ObjectType::Tag, content.into_bytes())
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Ids this object points at: tree and parents of a commit, entries of a
    /// tree, the target of a tag. Blobs point at nothing.
    ///
    /// Gitlink entries (mode `160000`) are skipped since submodule commits
    /// live in another repository.
    pub fn referenced_ids(&self) -> Result<Vec<ObjectId>> {
        match self.object_type {
            ObjectType::Blob => Ok(Vec::new()),
            ObjectType::Commit | ObjectType::Tag => {
                let mut ids = Vec::new();
                let text = String::from_utf8_lossy(&self.data);
                for line in text.lines() {
                    if line.is_empty() {
                        break;
                    }
                    let hex = line
                        .strip_prefix("tree ")
                        .or_else(|| line.strip_prefix("parent "))
                        .or_else(|| line.strip_prefix("object "));
                    if let Some(hex) = hex {
                        ids.push(ObjectId::from_hex(hex.trim())?);
                    }
                }
                Ok(ids)
            }
            ObjectType::Tree => {
                let mut ids = Vec::new();
                let mut rest: &[u8] = &self.data;
                while !rest.is_empty() {
                    let space = rest.iter().position(|&b| b == b' ').ok_or_else(|| {
                        StorageError::InvalidObject("tree entry missing mode".to_string())
                    })?;
                    let mode = &rest[..space];
                    let nul = rest.iter().position(|&b| b == 0).ok_or_else(|| {
                        StorageError::InvalidObject("tree entry missing name".to_string())
                    })?;
                    let id = ObjectId::from_slice(&rest[nul + 1..])?;
                    if mode != b"160000" {
                        ids.push(id);
                    }
                    rest = &rest[nul + 21..];
                }
                Ok(ids)
            }
        }
    }
}
