use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Byte buffer for partition keys. Every key this crate produces fits inline.
pub type KeyBuf = SmallVec<[u8; 24]>;

/// Flips the sign bit so that unsigned byte comparison preserves signed order.
fn order_preserving_i64(v: i64) -> [u8; 8] {
    ((v as u64) ^ 0x8000_0000_0000_0000).to_be_bytes()
}

pub(crate) fn i64_from_key(bytes: &[u8]) -> Option<i64> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some((u64::from_be_bytes(arr) ^ 0x8000_0000_0000_0000) as i64)
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct PeerId(pub i64);

impl PeerId {
    pub fn to_key(self) -> KeyBuf {
        KeyBuf::from_slice(&order_preserving_i64(self.0))
    }

    pub fn from_key(bytes: &[u8]) -> Option<PeerId> {
        i64_from_key(bytes).map(PeerId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId {
    pub peer_id: PeerId,
    pub namespace: u32,
    pub id: u32,
}

impl MessageId {
    pub fn to_key(&self) -> KeyBuf {
        let mut out = self.peer_id.to_key();
        out.extend_from_slice(&self.namespace.to_be_bytes());
        out.extend_from_slice(&self.id.to_be_bytes());
        out
    }

    /// Prefix matching every message key of a peer, in (namespace, id) order.
    pub fn peer_prefix(peer_id: PeerId) -> KeyBuf {
        peer_id.to_key()
    }
}

/// Bitmask of message classification tags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct MessageTags(pub u32);

impl MessageTags {
    pub const NONE: MessageTags = MessageTags(0);
    pub const PHOTO: MessageTags = MessageTags(1 << 0);
    pub const VIDEO: MessageTags = MessageTags(1 << 1);
    pub const FILE: MessageTags = MessageTags(1 << 2);
    pub const LINK: MessageTags = MessageTags(1 << 3);

    pub fn contains(self, other: MessageTags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: MessageTags) -> MessageTags {
        MessageTags(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the individual set bits as single-tag masks.
    pub fn iter(self) -> impl Iterator<Item = MessageTags> {
        (0..u32::BITS)
            .map(move |bit| self.0 & (1 << bit))
            .filter(|mask| *mask != 0)
            .map(MessageTags)
    }
}

/// Key of one per-peer aggregate counter: one tag, one message namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagSummaryKey {
    pub tag: MessageTags,
    pub peer_id: PeerId,
    pub namespace: u32,
}

impl TagSummaryKey {
    pub fn to_key(&self) -> KeyBuf {
        let mut out = KeyBuf::new();
        out.extend_from_slice(&self.tag.0.to_be_bytes());
        out.extend_from_slice(&order_preserving_i64(self.peer_id.0));
        out.extend_from_slice(&self.namespace.to_be_bytes());
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerGroupId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupAndNamespace {
    pub group_id: PeerGroupId,
    pub namespace: u32,
}

impl GroupAndNamespace {
    pub fn to_key(&self) -> KeyBuf {
        let mut out = KeyBuf::new();
        out.extend_from_slice(&((self.group_id.0 as u32) ^ 0x8000_0000).to_be_bytes());
        out.extend_from_slice(&self.namespace.to_be_bytes());
        out
    }

    pub fn from_key(bytes: &[u8]) -> Option<GroupAndNamespace> {
        if bytes.len() != 8 {
            return None;
        }
        let group_bits: [u8; 4] = bytes[0..4].try_into().ok()?;
        let namespace_bits: [u8; 4] = bytes[4..8].try_into().ok()?;
        Some(GroupAndNamespace {
            group_id: PeerGroupId((u32::from_be_bytes(group_bits) ^ 0x8000_0000) as i32),
            namespace: u32::from_be_bytes(namespace_bits),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: PeerId,
    pub name: String,
    /// Drives the reverse association index: this peer is listed as a
    /// referencer of `associated_peer` until the field changes.
    pub associated_peer: Option<PeerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPeerData {
    pub peer_id: PeerId,
    pub about: Option<String>,
    pub pinned_message_ids: Vec<MessageId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub timestamp: i64,
    pub text: String,
    pub tags: MessageTags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PeerNotificationSettings {
    pub muted_until: Option<i64>,
    /// When set, the peer participates in the global earliest-timestamp
    /// ordering used to schedule notification behavior changes.
    pub behavior_timestamp: Option<i64>,
}

impl PeerNotificationSettings {
    /// Index key ordering entries by (timestamp, peer).
    pub fn behavior_index_key(peer_id: PeerId, timestamp: i64) -> KeyBuf {
        let mut out = KeyBuf::from_slice(&order_preserving_i64(timestamp));
        out.extend_from_slice(&order_preserving_i64(peer_id.0));
        out
    }
}

/// Aggregate counter over one `TagSummaryKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TagSummary {
    pub count: i32,
    pub max_id: u32,
}

/// Per-peer chat list inclusion record. The observable inclusion boolean is
/// derived: `IfHasMessages` additionally requires at least one stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChatInclusion {
    #[default]
    Never,
    IfHasMessages,
    Always {
        pinned_rank: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::{GroupAndNamespace, MessageId, MessageTags, PeerGroupId, PeerId, TagSummaryKey};

    #[test]
    fn peer_key_order_is_preserved_across_sign() {
        let a = PeerId(-5).to_key();
        let b = PeerId(0).to_key();
        let c = PeerId(7).to_key();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn message_keys_group_under_peer_prefix() {
        let id = MessageId {
            peer_id: PeerId(42),
            namespace: 1,
            id: 100,
        };
        let key = id.to_key();
        assert!(key.starts_with(&MessageId::peer_prefix(PeerId(42))));
        assert_eq!(key.len(), 16);

        let later = MessageId {
            peer_id: PeerId(42),
            namespace: 1,
            id: 101,
        };
        assert!(key < later.to_key());
    }

    #[test]
    fn tag_iteration_yields_single_bits() {
        let tags = MessageTags::PHOTO.union(MessageTags::FILE);
        let bits: Vec<MessageTags> = tags.iter().collect();
        assert_eq!(bits, vec![MessageTags::PHOTO, MessageTags::FILE]);
        assert!(tags.contains(MessageTags::PHOTO));
        assert!(!tags.contains(MessageTags::VIDEO));
    }

    #[test]
    fn composite_keys_have_fixed_width() {
        let summary = TagSummaryKey {
            tag: MessageTags::PHOTO,
            peer_id: PeerId(1),
            namespace: 0,
        };
        assert_eq!(summary.to_key().len(), 16);

        let group = GroupAndNamespace {
            group_id: PeerGroupId(-1),
            namespace: 2,
        };
        assert_eq!(group.to_key().len(), 8);
        assert_eq!(GroupAndNamespace::from_key(&group.to_key()), Some(group));
        assert_eq!(PeerId::from_key(&PeerId(-99).to_key()), Some(PeerId(-99)));
    }
}
