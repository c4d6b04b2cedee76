/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Run-time file sets: the files an executable needs next to itself when run.

use allocative::Allocative;
use dupe::Dupe;
use starlark_map::small_map::SmallMap;

use crate::artifact::Artifact;
use crate::artifact_set::ArtifactSet;
use crate::artifact_set::ArtifactSetBuilder;

/// A set of artifacts plus explicit symlinks, materialized beside an
/// executable at run time.
#[derive(Clone, Debug, PartialEq, Eq, Allocative)]
pub struct Runfiles {
    artifacts: ArtifactSet,
    /// Run-directory-relative path -> artifact.
    symlinks: SmallMap<String, Artifact>,
}

impl Runfiles {
    pub fn empty() -> Runfiles {
        Runfiles {
            artifacts: ArtifactSet::empty(),
            symlinks: SmallMap::new(),
        }
    }

    pub fn new(artifacts: ArtifactSet, symlinks: SmallMap<String, Artifact>) -> Runfiles {
        Runfiles {
            artifacts,
            symlinks,
        }
    }

    pub fn from_artifacts(artifacts: impl IntoIterator<Item = Artifact>) -> Runfiles {
        Runfiles {
            artifacts: ArtifactSet::from_direct(artifacts),
            symlinks: SmallMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.symlinks.is_empty()
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// A copy of this set with `artifact` prepended.
    pub fn with_artifact(&self, artifact: &Artifact) -> Runfiles {
        let mut builder = ArtifactSetBuilder::new();
        builder.add(artifact.dupe());
        builder.add_set(self.artifacts.dupe());
        Runfiles {
            artifacts: builder.build(),
            symlinks: self.symlinks.clone(),
        }
    }

    pub fn merge(&self, other: &Runfiles) -> Runfiles {
        let mut symlinks = self.symlinks.clone();
        for (path, artifact) in other.symlinks.iter() {
            if !symlinks.contains_key(path.as_str()) {
                symlinks.insert(path.clone(), artifact.dupe());
            }
        }
        Runfiles {
            artifacts: ArtifactSet::union([self.artifacts.dupe(), other.artifacts.dupe()]),
            symlinks,
        }
    }

    /// The full run-directory mapping. Artifacts map at their own path;
    /// explicit symlinks take precedence.
    pub fn flattened(&self) -> SmallMap<String, Artifact> {
        let mut out = SmallMap::new();
        for artifact in self.artifacts.iter() {
            if !out.contains_key(artifact.path()) {
                out.insert(artifact.path().to_owned(), artifact);
            }
        }
        for (path, artifact) in self.symlinks.iter() {
            out.insert(path.clone(), artifact.dupe());
        }
        out
    }

    pub fn contains_artifact(&self, artifact: &Artifact) -> bool {
        self.flattened().values().any(|a| a == artifact)
    }
}

/// The per-target runfiles provider: always present on a finished target,
/// with distinct default and data variants.
#[derive(Clone, Debug, PartialEq, Eq, Allocative)]
pub struct RunfilesProvider {
    default: Runfiles,
    data: Runfiles,
}

impl RunfilesProvider {
    /// Both variants share one set (the stateless form).
    pub fn simple(runfiles: Runfiles) -> RunfilesProvider {
        RunfilesProvider {
            default: runfiles.clone(),
            data: runfiles,
        }
    }

    pub fn with_data(default: Runfiles, data: Runfiles) -> RunfilesProvider {
        RunfilesProvider { default, data }
    }

    pub fn default_runfiles(&self) -> &Runfiles {
        &self.default
    }

    pub fn data_runfiles(&self) -> &Runfiles {
        &self.data
    }
}

/// Present on a finished target only when it has an executable (or is a test
/// rule with run-time files): the executable plus its default runfiles.
#[derive(Clone, Debug, PartialEq, Eq, Allocative)]
pub struct ExecutableSupport {
    executable: Artifact,
    runfiles: Runfiles,
}

impl ExecutableSupport {
    pub fn new(executable: Artifact, runfiles: Runfiles) -> ExecutableSupport {
        ExecutableSupport {
            executable,
            runfiles,
        }
    }

    pub fn executable(&self) -> &Artifact {
        &self.executable
    }

    pub fn runfiles(&self) -> &Runfiles {
        &self.runfiles
    }
}
