//! Opcode compatibility between the client's numbering and a server dialect.
//!
//! An [`OpcodeShim`] is built once at start-up from an explicit list of
//! `(local, remote)` pairs, an allow-list of local opcodes the client decodes,
//! and a registry of per-opcode body patches for messages whose payload
//! differs between dialects beyond the opcode number. Translation failures
//! only ever cost the frame being translated.

use std::collections::{HashMap, HashSet};

use crate::message::{peek_opcode, write_opcode};

/// Errors raised while building an [`OpcodeMap`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OpcodeMapError {
    /// Two pairs share the same local opcode.
    #[error("local opcode {0} is mapped twice")]
    DuplicateLocal(u32),
    /// Two pairs share the same remote opcode.
    #[error("remote opcode {0} is mapped twice")]
    DuplicateRemote(u32),
}

/// Error reported by a body patch hook.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct PatchError {
    reason: String,
}

impl PatchError {
    /// Create a patch error with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Per-frame translation errors.
#[derive(Debug, thiserror::Error)]
pub enum ShimError {
    /// The body is shorter than an opcode.
    #[error("body of {0} bytes has no opcode")]
    MissingOpcode(usize),
    /// No remote opcode for this local opcode.
    #[error("local opcode {0} has no remote counterpart")]
    UnmappedLocal(u32),
    /// No local opcode for this remote opcode.
    #[error("remote opcode {0} has no local counterpart")]
    UnmappedRemote(u32),
    /// A body patch hook rejected the payload.
    #[error("patch for opcode {opcode} failed: {source}")]
    Patch {
        /// Local opcode whose hook failed.
        opcode: u32,
        /// The hook's error.
        source: PatchError,
    },
}

/// Immutable bijection between local and remote opcodes.
#[derive(Debug, Clone, Default)]
pub struct OpcodeMap {
    local_to_remote: HashMap<u32, u32>,
    remote_to_local: HashMap<u32, u32>,
}

impl OpcodeMap {
    /// Build the map, rejecting any pair list that is not injective in both
    /// directions.
    pub fn from_pairs(pairs: &[(u32, u32)]) -> Result<Self, OpcodeMapError> {
        let mut map = Self::default();
        for &(local, remote) in pairs {
            if map.local_to_remote.insert(local, remote).is_some() {
                return Err(OpcodeMapError::DuplicateLocal(local));
            }
            if map.remote_to_local.insert(remote, local).is_some() {
                return Err(OpcodeMapError::DuplicateRemote(remote));
            }
        }
        Ok(map)
    }

    /// Translate a local opcode into the remote dialect.
    pub fn to_remote(&self, local: u32) -> Result<u32, ShimError> {
        self.local_to_remote
            .get(&local)
            .copied()
            .ok_or(ShimError::UnmappedLocal(local))
    }

    /// Translate a remote opcode into local numbering.
    pub fn to_local(&self, remote: u32) -> Result<u32, ShimError> {
        self.remote_to_local
            .get(&remote)
            .copied()
            .ok_or(ShimError::UnmappedRemote(remote))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.local_to_remote.len()
    }

    /// Whether the map has no pairs.
    pub fn is_empty(&self) -> bool {
        self.local_to_remote.is_empty()
    }
}

/// Local opcodes the client is willing to decode.
#[derive(Debug, Clone, Default)]
pub struct AllowList(HashSet<u32>);

impl AllowList {
    /// Whether `local` may be decoded.
    pub fn allows(&self, local: u32) -> bool {
        self.0.contains(&local)
    }
}

impl FromIterator<u32> for AllowList {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A body rewrite for one opcode. Receives the whole body, opcode included.
pub type PatchHook = fn(&mut Vec<u8>) -> Result<(), PatchError>;

/// Receive-path body patches keyed by local opcode.
#[derive(Debug, Clone, Default)]
pub struct PatchRegistry {
    hooks: HashMap<u32, PatchHook>,
}

impl PatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` for `local`, builder style. A later registration for
    /// the same opcode replaces the earlier one.
    pub fn with(mut self, local: u32, hook: PatchHook) -> Self {
        self.hooks.insert(local, hook);
        self
    }

    /// Look up the hook for `local`.
    pub fn get(&self, local: u32) -> Option<PatchHook> {
        self.hooks.get(&local).copied()
    }
}

/// The complete dialect bridge used by both workers.
#[derive(Debug, Clone)]
pub struct OpcodeShim {
    map: OpcodeMap,
    allow: AllowList,
    recv_patches: PatchRegistry,
}

impl OpcodeShim {
    /// Bundle a translation table, an allow-list and receive patches.
    pub fn new(map: OpcodeMap, allow: AllowList, recv_patches: PatchRegistry) -> Self {
        Self {
            map,
            allow,
            recv_patches,
        }
    }

    /// The translation table.
    pub fn map(&self) -> &OpcodeMap {
        &self.map
    }

    /// Whether a local opcode passes the allow-list.
    pub fn allows(&self, local: u32) -> bool {
        self.allow.allows(local)
    }

    /// Rewrite the leading opcode of an outbound body to the remote dialect.
    /// Returns the remote opcode.
    pub fn patch_send(&self, body: &mut [u8]) -> Result<u32, ShimError> {
        let local = peek_opcode(body).ok_or(ShimError::MissingOpcode(body.len()))?;
        let remote = self.map.to_remote(local)?;
        write_opcode(body, remote);
        Ok(remote)
    }

    /// Rewrite the leading opcode of an inbound body to local numbering and
    /// run the opcode's patch hook, if any. Returns the local opcode.
    pub fn patch_recv(&self, body: &mut Vec<u8>) -> Result<u32, ShimError> {
        let remote = peek_opcode(body).ok_or(ShimError::MissingOpcode(body.len()))?;
        let local = self.map.to_local(remote)?;
        write_opcode(body, local);

        if let Some(hook) = self.recv_patches.get(local) {
            hook(body).map_err(|source| ShimError::Patch {
                opcode: local,
                source,
            })?;
        }
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: &[(u32, u32)] = &[(0, 3), (1, 4), (2, 10), (3, 14), (32, 45)];

    fn shim() -> OpcodeShim {
        OpcodeShim::new(
            OpcodeMap::from_pairs(PAIRS).unwrap(),
            [0, 2].into_iter().collect(),
            PatchRegistry::new(),
        )
    }

    #[test]
    fn test_every_pair_roundtrips_both_ways() {
        let map = OpcodeMap::from_pairs(PAIRS).unwrap();
        for &(local, remote) in PAIRS {
            assert_eq!(map.to_local(map.to_remote(local).unwrap()).unwrap(), local);
            assert_eq!(map.to_remote(map.to_local(remote).unwrap()).unwrap(), remote);
        }
        assert_eq!(map.len(), PAIRS.len());
    }

    #[test]
    fn test_duplicate_local_rejected() {
        let result = OpcodeMap::from_pairs(&[(1, 3), (1, 4)]);
        assert_eq!(result.unwrap_err(), OpcodeMapError::DuplicateLocal(1));
    }

    #[test]
    fn test_duplicate_remote_rejected() {
        let result = OpcodeMap::from_pairs(&[(1, 3), (2, 3)]);
        assert_eq!(result.unwrap_err(), OpcodeMapError::DuplicateRemote(3));
    }

    #[test]
    fn test_unmapped_opcodes_fail() {
        let map = OpcodeMap::from_pairs(PAIRS).unwrap();
        assert!(matches!(map.to_remote(99), Err(ShimError::UnmappedLocal(99))));
        assert!(matches!(map.to_local(0), Err(ShimError::UnmappedRemote(0))));
    }

    #[test]
    fn test_patch_send_rewrites_only_opcode() {
        let mut body = vec![2, 0, 0, 0, b'h', b'i'];
        let remote = shim().patch_send(&mut body).unwrap();
        assert_eq!(remote, 10);
        assert_eq!(body, vec![10, 0, 0, 0, b'h', b'i']);
    }

    #[test]
    fn test_patch_recv_restores_local_opcode() {
        let mut body = vec![45, 0, 0, 0, 1];
        let local = shim().patch_recv(&mut body).unwrap();
        assert_eq!(local, 32);
        assert_eq!(body, vec![32, 0, 0, 0, 1]);
    }

    #[test]
    fn test_short_body_has_no_opcode() {
        let mut body = vec![1, 0];
        assert!(matches!(
            shim().patch_recv(&mut body),
            Err(ShimError::MissingOpcode(2))
        ));
    }

    #[test]
    fn test_allow_list_filters_local_opcodes() {
        let shim = shim();
        assert!(shim.allows(0));
        assert!(shim.allows(2));
        assert!(!shim.allows(1));
        assert!(!shim.allows(32));
    }

    #[test]
    fn test_recv_hook_runs_after_translation() {
        fn append_marker(body: &mut Vec<u8>) -> Result<(), PatchError> {
            assert_eq!(body[0], 3, "hook must see the local opcode");
            body.push(0xEE);
            Ok(())
        }
        let shim = OpcodeShim::new(
            OpcodeMap::from_pairs(PAIRS).unwrap(),
            AllowList::default(),
            PatchRegistry::new().with(3, append_marker),
        );

        let mut body = vec![14, 0, 0, 0];
        shim.patch_recv(&mut body).unwrap();
        assert_eq!(body, vec![3, 0, 0, 0, 0xEE]);
    }

    #[test]
    fn test_failing_hook_reports_opcode() {
        fn reject(_: &mut Vec<u8>) -> Result<(), PatchError> {
            Err(PatchError::new("unsupported layout"))
        }
        let shim = OpcodeShim::new(
            OpcodeMap::from_pairs(PAIRS).unwrap(),
            AllowList::default(),
            PatchRegistry::new().with(1, reject),
        );

        let mut body = vec![4, 0, 0, 0];
        assert!(matches!(
            shim.patch_recv(&mut body),
            Err(ShimError::Patch { opcode: 1, .. })
        ));
    }
}
