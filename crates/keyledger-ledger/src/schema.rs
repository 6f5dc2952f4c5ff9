//! Storage layout: namespaces, key formats and the small records the ledger
//! keeps next to the links themselves.
//!
//! | Namespace          | Key                    | Value                       |
//! |--------------------|------------------------|-----------------------------|
//! | `ledger:links`     | `{username}/{index}`   | encoded [`KeyLink`]         |
//! | `ledger:heads`     | `{username}`           | encoded [`ChainHead`]       |
//! | `ledger:owners`    | hex public key         | username (current key only) |
//! | `ledger:keys`      | hex public key         | username (every bound key)  |
//! | `social:mailbox`   | hex public key         | encoded mailbox             |
//! | `mutable:pointers` | hex public key         | signed pointer update       |

use keyledger_core::codec::{Decoder, Encoder, RecordTag, length_prefix, write_length_prefixed};
use keyledger_core::{CodecError, CodecResult, KeyLink, encode_chain};
use keyledger_crypto::{ContentHash, PublicKey};

pub(crate) const NS_LINKS: &str = "ledger:links";
pub(crate) const NS_HEADS: &str = "ledger:heads";
pub(crate) const NS_OWNERS: &str = "ledger:owners";
pub(crate) const NS_KEYS: &str = "ledger:keys";
pub(crate) const NS_MAILBOX: &str = "social:mailbox";
pub(crate) const NS_POINTERS: &str = "mutable:pointers";

const HEAD_DOMAIN: &str = "keyledger chain head";

/// Storage key for link `index` of `username`. Zero-padded so keys sort in
/// chain order.
pub(crate) fn link_key(username: &str, index: u32) -> String {
    format!("{username}/{index:010}")
}

/// Storage key for anything indexed by public key.
pub(crate) fn key_id(key: &PublicKey) -> String {
    key.to_hex()
}

/// Length and digest of a stored chain.
///
/// Every chain update replaces the head under a guard on its previous
/// value, so the head doubles as the compare-and-swap token for the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChainHead {
    pub(crate) len: u32,
    pub(crate) digest: ContentHash,
}

impl ChainHead {
    pub(crate) fn of(chain: &[KeyLink]) -> CodecResult<Self> {
        Ok(Self {
            len: u32::try_from(chain.len())
                .map_err(|_| CodecError::FieldTooLong { len: chain.len() })?,
            digest: ContentHash::hash_with_domain(HEAD_DOMAIN, &encode_chain(chain)?),
        })
    }

    pub(crate) fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(Encoder::new(RecordTag::ChainHead)
            .u32(self.len)
            .bytes(self.digest.as_bytes())?
            .finish())
    }

    pub(crate) fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut d = Decoder::new(bytes, RecordTag::ChainHead)?;
        let len = d.u32()?;
        let digest = ContentHash::try_from_slice(d.bytes()?).ok_or(
            CodecError::Truncated {
                needed: 32,
                remaining: 0,
            },
        )?;
        d.finish()?;
        Ok(Self { len, digest })
    }
}

/// Encode a stored mailbox.
pub(crate) fn encode_mailbox(entries: &[Vec<u8>]) -> CodecResult<Vec<u8>> {
    entries
        .iter()
        .try_fold(Encoder::new(RecordTag::Mailbox).count(entries.len())?, |enc, e| {
            enc.bytes(e)
        })
        .map(Encoder::finish)
}

/// Decode a stored mailbox.
pub(crate) fn decode_mailbox(bytes: &[u8]) -> CodecResult<Vec<Vec<u8>>> {
    let mut d = Decoder::new(bytes, RecordTag::Mailbox)?;
    let count = d.u32()?;
    let entries = (0..count)
        .map(|_| d.bytes().map(<[u8]>::to_vec))
        .collect::<CodecResult<Vec<_>>>()?;
    d.finish()?;
    Ok(entries)
}

/// Client-facing list: `u32` count followed by length-prefixed items.
pub(crate) fn encode_list<I, T>(items: I) -> CodecResult<Vec<u8>>
where
    I: ExactSizeIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut out = length_prefix(items.len())?.to_vec();
    for item in items {
        write_length_prefixed(&mut out, item.as_ref())?;
    }
    Ok(out)
}

/// Inverse of [`encode_list`].
pub(crate) fn decode_list(bytes: &[u8]) -> CodecResult<Vec<Vec<u8>>> {
    let mut d = Decoder::untagged(bytes);
    let count = d.u32()?;
    let items = (0..count)
        .map(|_| d.bytes().map(<[u8]>::to_vec))
        .collect::<CodecResult<Vec<_>>>()?;
    d.finish()?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_keys_sort_by_index() {
        let mut keys = vec![link_key("alice", 10), link_key("alice", 2), link_key("alice", 0)];
        keys.sort();
        assert_eq!(
            keys,
            [
                "alice/0000000000",
                "alice/0000000002",
                "alice/0000000010"
            ]
        );
    }

    #[test]
    fn test_chain_head_codec() {
        let head = ChainHead::of(&[]).unwrap();
        assert_eq!(head.len, 0);
        assert_eq!(ChainHead::decode(&head.encode().unwrap()).unwrap(), head);
        assert!(ChainHead::decode(&encode_mailbox(&[]).unwrap()).is_err());
    }

    #[test]
    fn test_mailbox_codec() {
        let entries = vec![b"one".to_vec(), Vec::new(), b"three".to_vec()];
        assert_eq!(decode_mailbox(&encode_mailbox(&entries).unwrap()).unwrap(), entries);
    }

    #[test]
    fn test_list_layout() {
        let encoded = encode_list(["ab", "c"].iter()).unwrap();
        assert_eq!(
            encoded,
            [2, 0, 0, 0, 2, 0, 0, 0, b'a', b'b', 1, 0, 0, 0, b'c']
        );
        assert_eq!(
            decode_list(&encoded).unwrap(),
            vec![b"ab".to_vec(), b"c".to_vec()]
        );
        assert_eq!(encode_list(std::iter::empty::<&[u8]>()).unwrap(), [0, 0, 0, 0]);
    }
}
