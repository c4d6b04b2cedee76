/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;

use crate::artifact::Location;

/// A unique identity for a given provider kind. Two providers with the same
/// key occupy the same slot in a provider set and conflict if both are
/// supplied.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Allocative)]
pub struct ProviderId {
    /// Present for all user-defined providers. Only `None` for builtin
    /// providers, which have no affiliated definition file.
    pub(crate) path: Option<String>,
    pub(crate) name: String,
    /// Bridged builtins only: the bare field name this provider may also be
    /// supplied under in a legacy struct return.
    pub(crate) legacy_name: Option<String>,
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl ProviderId {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A finalized provider identity. A key only exists for providers that have
/// been bound to a stable identity (assigned to a top-level name), so any
/// value holding one is safe to merge.
#[derive(Debug, Clone, Dupe, Hash, Eq, PartialEq, Allocative)]
pub struct ProviderKey(Arc<ProviderId>);

impl Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl ProviderKey {
    pub fn new(path: Option<String>, name: impl Into<String>) -> ProviderKey {
        ProviderKey(Arc::new(ProviderId {
            path,
            name: name.into(),
            legacy_name: None,
        }))
    }

    /// A bridged builtin: usable both under its modern key and under
    /// `legacy_name` in a legacy struct return.
    pub fn new_bridged(name: impl Into<String>, legacy_name: impl Into<String>) -> ProviderKey {
        ProviderKey(Arc::new(ProviderId {
            path: None,
            name: name.into(),
            legacy_name: Some(legacy_name.into()),
        }))
    }

    pub fn id(&self) -> &ProviderId {
        &self.0
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn legacy_name(&self) -> Option<&str> {
        self.0.legacy_name.as_deref()
    }
}

/// Whether a provider instance's kind has been finalized. `Unbound` instances
/// are rejected at ingestion and never reach the merge engine.
#[derive(Debug, Clone, PartialEq, Allocative)]
pub enum ProviderBinding {
    Bound(ProviderKey),
    Unbound { declared_at: Location },
}
