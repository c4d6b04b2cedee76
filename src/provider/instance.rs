/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use allocative::Allocative;
use once_cell::sync::Lazy;
use starlark_map::small_map::SmallMap;

use crate::artifact::Location;
use crate::error::RuleError;
use crate::error::RuleErrorKind;
use crate::provider::id::ProviderBinding;
use crate::provider::id::ProviderKey;
use crate::values::Value;

/// The reserved key of the plain `struct(...)` constructor. A single returned
/// instance with this key is the legacy field-bag return convention and is
/// routed through the legacy merge path.
pub fn struct_key() -> &'static ProviderKey {
    static KEY: Lazy<ProviderKey> = Lazy::new(|| ProviderKey::new(None, "struct"));
    &KEY
}

/// The canonical default provider. Its components (files, executable,
/// runfiles variants) are synthesized for every target whether or not the
/// rule returned one explicitly.
pub fn default_info_key() -> &'static ProviderKey {
    static KEY: Lazy<ProviderKey> = Lazy::new(|| ProviderKey::new(None, "DefaultInfo"));
    &KEY
}

/// Run environment information; only meaningful on executable or test rules.
pub fn run_environment_info_key() -> &'static ProviderKey {
    static KEY: Lazy<ProviderKey> = Lazy::new(|| ProviderKey::new(None, "RunEnvironmentInfo"));
    &KEY
}

/// An immutable provider instance: a binding (the provider kind) plus a field
/// mapping specific to that kind, and the source location it was created at
/// (used to prefix diagnostics).
#[derive(Clone, Debug, PartialEq, Allocative)]
pub struct ProviderInstance {
    binding: ProviderBinding,
    fields: SmallMap<String, Value>,
    created_at: Option<Location>,
}

impl ProviderInstance {
    pub fn new(key: ProviderKey, fields: SmallMap<String, Value>) -> ProviderInstance {
        ProviderInstance {
            binding: ProviderBinding::Bound(key),
            fields,
            created_at: None,
        }
    }

    /// An instance of a provider that was never assigned to a top-level name.
    /// It carries no key and is rejected when it reaches the merge engine.
    pub fn new_unbound(
        declared_at: Location,
        fields: SmallMap<String, Value>,
    ) -> ProviderInstance {
        ProviderInstance {
            binding: ProviderBinding::Unbound { declared_at },
            fields,
            created_at: None,
        }
    }

    pub fn with_creation_location(mut self, location: Location) -> ProviderInstance {
        self.created_at = Some(location);
        self
    }

    /// The finalized key of this instance's provider kind, or an
    /// `UnboundProvider` error naming the definition site.
    pub fn key(&self) -> Result<&ProviderKey, RuleError> {
        match &self.binding {
            ProviderBinding::Bound(key) => Ok(key),
            ProviderBinding::Unbound { declared_at } => Err(RuleError::new(
                RuleErrorKind::UnboundProvider {
                    declared_at: declared_at.clone(),
                },
            )
            .with_location(self.created_at.clone())),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn creation_location(&self) -> Option<&Location> {
        self.created_at.as_ref()
    }

    pub fn is_struct(&self) -> bool {
        matches!(&self.binding, ProviderBinding::Bound(key) if key == struct_key())
    }

    pub fn is_default_info(&self) -> bool {
        matches!(&self.binding, ProviderBinding::Bound(key) if key == default_info_key())
    }

    /// The creation location of this instance, duplicated for attaching to an
    /// error about it.
    pub(crate) fn error_location(&self) -> Option<Location> {
        self.created_at.clone()
    }
}
