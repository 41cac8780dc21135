//! Per-package artifact caches
//!
//! Each dependency package persists its compiled form next to its sources
//! in the shared cache: the interfaces of its exposed modules plus its
//! linked object graph. A package version can be valid under several
//! direct-dependency resolutions, so the cache carries a *set* of
//! fingerprints; the stored artifacts apply whenever the current
//! fingerprint is in that set. The fingerprint set only ever grows.

use crate::interfaces::DependencyInterface;
use crate::objects::GlobalGraph;
use gren_codec::file::{self, FileError};
use gren_codec::{CodecError, Decode, Encode, Reader};
use gren_package::registry::PackageCache;
use gren_package::{ModuleName, PackageName, Version};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use tracing::debug;

/// The exact direct-dependency versions a package was built against.
pub type Fingerprint = BTreeMap<PackageName, Version>;

/// A dependency package's compiled form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    /// Exposed module -> interface. Non-exposed modules are omitted.
    pub interfaces: BTreeMap<ModuleName, DependencyInterface>,
    pub objects: GlobalGraph,
}

/// What `artifacts.dat` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCache {
    pub fingerprints: BTreeSet<Fingerprint>,
    pub artifacts: Artifacts,
}

impl ArtifactCache {
    pub fn new(fingerprint: Fingerprint, artifacts: Artifacts) -> Self {
        let mut fingerprints = BTreeSet::new();
        fingerprints.insert(fingerprint);
        Self {
            fingerprints,
            artifacts,
        }
    }

    /// Load a package's artifact cache. A corrupt file is deleted on the
    /// spot so the caller simply rebuilds; a missing file reads as `None`.
    pub fn load(
        cache: &PackageCache,
        name: &PackageName,
        version: Version,
    ) -> Option<ArtifactCache> {
        let path = cache.artifacts_path(name, version);
        match file::read::<ArtifactCache>(&path) {
            Ok(artifact_cache) => Some(artifact_cache),
            Err(err) if err.is_corrupt() => {
                debug!(package = %name, %version, "deleting corrupt artifacts.dat");
                let _ = fs::remove_file(&path);
                None
            }
            Err(_) => None,
        }
    }

    /// Persist, appending `fingerprint` to whatever set is already stored.
    pub fn store(
        self,
        cache: &PackageCache,
        name: &PackageName,
        version: Version,
    ) -> Result<(), FileError> {
        file::write(&cache.artifacts_path(name, version), &self)
    }

    /// Add the fingerprints from a previously stored cache, keeping the
    /// freshly built artifacts.
    pub fn absorb_fingerprints(&mut self, previous: ArtifactCache) {
        self.fingerprints.extend(previous.fingerprints);
    }
}

impl Encode for Artifacts {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.interfaces.encode(buf);
        self.objects.encode(buf);
    }
}

impl Decode for Artifacts {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Artifacts {
            interfaces: BTreeMap::decode(reader)?,
            objects: GlobalGraph::decode(reader)?,
        })
    }
}

impl Encode for ArtifactCache {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.fingerprints.encode(buf);
        self.artifacts.encode(buf);
    }
}

impl Decode for ArtifactCache {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(ArtifactCache {
            fingerprints: BTreeSet::decode(reader)?,
            artifacts: Artifacts::decode(reader)?,
        })
    }
}
