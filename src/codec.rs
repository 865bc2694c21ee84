//! Serialization boundary for table-managed entities.
//!
//! Tables treat entity bytes as opaque: encoding failures propagate as
//! errors from the commit path, while decoding failures degrade to "entity
//! absent" so the cache read path stays total.

use crate::error::ChatstoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ChatstoreError> {
    rmp_serde::to_vec(value).map_err(|e| ChatstoreError::Encode(e.to_string()))
}

/// Decodes stored entity bytes; corrupt or unexpected bytes read as absent.
pub fn decode<T: DeserializeOwned>(kind: &'static str, bytes: &[u8]) -> Option<T> {
    match rmp_serde::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(kind, error = %err, "discarding undecodable entity bytes");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, encode};
    use crate::model::{Peer, PeerId};

    #[test]
    fn entity_roundtrip() {
        let peer = Peer {
            id: PeerId(7),
            name: "alice".into(),
            associated_peer: Some(PeerId(8)),
        };
        let bytes = encode(&peer).expect("encode");
        let decoded: Peer = decode("peer", &bytes).expect("decode");
        assert_eq!(decoded, peer);
    }

    #[test]
    fn corrupt_bytes_read_as_absent() {
        let decoded: Option<Peer> = decode("peer", &[0xC1, 0xFF, 0x00]);
        assert!(decoded.is_none());
    }
}
