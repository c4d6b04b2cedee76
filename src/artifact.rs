/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Boundary types for artifacts and their owning rule instances.
//!
//! Artifact path computation and the filesystem live outside this crate; an
//! [`Artifact`] here is just an identity (owner label plus package-relative
//! path) that the consolidation stage compares and groups.

use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;

/// The label of one configured rule instance, e.g. `//foo/bar:baz`.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Allocative, derive_more::Display)]
#[display("{_0}")]
pub struct TargetLabel(Arc<TargetLabelData>);

#[derive(Debug, Eq, PartialEq, Hash, Allocative, derive_more::Display)]
#[display("//{package}:{name}")]
struct TargetLabelData {
    package: String,
    name: String,
}

impl TargetLabel {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> TargetLabel {
        TargetLabel(Arc::new(TargetLabelData {
            package: package.into(),
            name: name.into(),
        }))
    }

    pub fn package(&self) -> &str {
        &self.0.package
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

/// A build output (or source) file identity. Equality is by owner and path.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Allocative, derive_more::Display)]
#[display("{_0}")]
pub struct Artifact(Arc<ArtifactData>);

#[derive(Debug, Eq, PartialEq, Hash, Allocative, derive_more::Display)]
#[display("{path}")]
struct ArtifactData {
    owner: TargetLabel,
    /// Package-relative output path.
    path: String,
}

impl Artifact {
    pub fn new(owner: TargetLabel, path: impl Into<String>) -> Artifact {
        Artifact(Arc::new(ArtifactData {
            owner,
            path: path.into(),
        }))
    }

    pub fn owner(&self) -> &TargetLabel {
        &self.0.owner
    }

    pub fn path(&self) -> &str {
        &self.0.path
    }
}

/// A source location carried on diagnostics, e.g. where a provider instance
/// or the rule implementation function was created.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Allocative, derive_more::Display)]
#[display("{file}:{line}:{column}")]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Location {
        Location {
            file: file.into(),
            line,
            column,
        }
    }
}
