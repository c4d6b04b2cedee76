/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Shared factories for unit tests.

use dupe::Dupe;
use starlark_map::small_map::SmallMap;

use crate::artifact::Artifact;
use crate::artifact::Location;
use crate::artifact::TargetLabel;
use crate::provider::id::ProviderKey;
use crate::provider::instance::struct_key;
use crate::provider::instance::ProviderInstance;
use crate::rule_context::RuleContext;
use crate::values::Value;

pub(crate) fn label() -> TargetLabel {
    TargetLabel::new("pkg", "target")
}

/// An artifact owned by [`label`].
pub(crate) fn artifact(path: &str) -> Artifact {
    Artifact::new(label(), path)
}

/// An artifact owned by a different rule instance.
pub(crate) fn foreign_artifact(path: &str) -> Artifact {
    Artifact::new(TargetLabel::new("other", "rule"), path)
}

pub(crate) fn provider_key(name: &str) -> ProviderKey {
    ProviderKey::new(Some("defs.cfg".to_owned()), name)
}

pub(crate) fn fields(entries: Vec<(&str, Value)>) -> SmallMap<String, Value> {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect()
}

pub(crate) fn provider(key: &ProviderKey, entries: Vec<(&str, Value)>) -> ProviderInstance {
    ProviderInstance::new(key.dupe(), fields(entries))
}

pub(crate) fn legacy_struct(entries: Vec<(&str, Value)>) -> ProviderInstance {
    ProviderInstance::new(struct_key().dupe(), fields(entries))
}

pub(crate) fn ctx() -> RuleContext {
    RuleContext::new(label(), "test_rule", Location::new("rules.cfg", 1, 1))
}
