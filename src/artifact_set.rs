/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! An ordered, deduplicating artifact collection.
//!
//! Rather than a flat list, an [`ArtifactSet`] is a DAG of shared nodes:
//! merging two sets references them instead of copying their contents.
//! Flattening visits direct entries first, then transitive sets in insertion
//! order, and deduplicates, so iteration order is stable across merges and
//! independent of any hash-map iteration order.

use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;
use itertools::Itertools;
use starlark_map::small_set::SmallSet;

use crate::artifact::Artifact;

#[derive(Clone, Dupe, Debug, Allocative)]
pub struct ArtifactSet(Arc<ArtifactSetData>);

#[derive(Debug, Allocative)]
struct ArtifactSetData {
    direct: Box<[Artifact]>,
    transitive: Box<[ArtifactSet]>,
}

impl ArtifactSet {
    pub fn empty() -> ArtifactSet {
        ArtifactSet(Arc::new(ArtifactSetData {
            direct: Box::new([]),
            transitive: Box::new([]),
        }))
    }

    pub fn from_direct(artifacts: impl IntoIterator<Item = Artifact>) -> ArtifactSet {
        let mut builder = ArtifactSetBuilder::new();
        builder.add_all(artifacts);
        builder.build()
    }

    /// References the given sets without flattening them.
    pub fn union(sets: impl IntoIterator<Item = ArtifactSet>) -> ArtifactSet {
        let mut builder = ArtifactSetBuilder::new();
        for set in sets {
            builder.add_set(set);
        }
        builder.build()
    }

    pub fn is_empty(&self) -> bool {
        self.0.direct.is_empty() && self.0.transitive.iter().all(|s| s.is_empty())
    }

    pub fn contains(&self, artifact: &Artifact) -> bool {
        self.0.direct.contains(artifact) || self.0.transitive.iter().any(|s| s.contains(artifact))
    }

    /// Flattens to insertion order, first occurrence wins.
    pub fn iter(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.flatten().into_iter()
    }

    fn flatten(&self) -> SmallSet<Artifact> {
        let mut out = SmallSet::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut SmallSet<Artifact>) {
        for artifact in self.0.direct.iter() {
            out.insert(artifact.dupe());
        }
        for set in self.0.transitive.iter() {
            set.flatten_into(out);
        }
    }
}

impl PartialEq for ArtifactSet {
    fn eq(&self, other: &Self) -> bool {
        self.flatten() == other.flatten()
    }
}

impl Eq for ArtifactSet {}

impl Display for ArtifactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.iter().join(", "))
    }
}

impl FromIterator<Artifact> for ArtifactSet {
    fn from_iter<T: IntoIterator<Item = Artifact>>(iter: T) -> ArtifactSet {
        ArtifactSet::from_direct(iter)
    }
}

pub struct ArtifactSetBuilder {
    direct: Vec<Artifact>,
    transitive: Vec<ArtifactSet>,
}

impl ArtifactSetBuilder {
    pub fn new() -> ArtifactSetBuilder {
        ArtifactSetBuilder {
            direct: Vec::new(),
            transitive: Vec::new(),
        }
    }

    pub fn add(&mut self, artifact: Artifact) -> &mut Self {
        self.direct.push(artifact);
        self
    }

    pub fn add_all(&mut self, artifacts: impl IntoIterator<Item = Artifact>) -> &mut Self {
        self.direct.extend(artifacts);
        self
    }

    pub fn add_set(&mut self, set: ArtifactSet) -> &mut Self {
        self.transitive.push(set);
        self
    }

    pub fn build(self) -> ArtifactSet {
        ArtifactSet(Arc::new(ArtifactSetData {
            direct: self.direct.into_boxed_slice(),
            transitive: self.transitive.into_boxed_slice(),
        }))
    }
}
