/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! The value union exchanged with the interpreter boundary.
//!
//! The interpreter itself lives outside this crate; by the time result
//! consolidation starts, every value is fully materialized. [`Value`] is the
//! already-evaluated form of whatever a rule implementation function returned
//! or stored in a legacy struct field.

use allocative::Allocative;
use starlark_map::small_map::SmallMap;

use crate::artifact::Artifact;
use crate::artifact_set::ArtifactSet;
use crate::provider::instance::ProviderInstance;
use crate::runfiles::Runfiles;

#[derive(Clone, Debug, PartialEq, Allocative)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    String(String),
    Artifact(Artifact),
    ArtifactSet(ArtifactSet),
    Runfiles(Runfiles),
    Provider(ProviderInstance),
    List(Vec<Value>),
    Dict(SmallMap<String, Value>),
}

impl Value {
    /// The user-facing type name, as the interpreter would render it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(..) => "bool",
            Value::Int(..) => "int",
            Value::String(..) => "string",
            Value::Artifact(..) => "File",
            Value::ArtifactSet(..) => "depset",
            Value::Runfiles(..) => "runfiles",
            Value::Provider(..) => "provider",
            Value::List(..) => "list",
            Value::Dict(..) => "dict",
        }
    }

    pub fn as_provider(&self) -> Option<&ProviderInstance> {
        match self {
            Value::Provider(provider) => Some(provider),
            _ => None,
        }
    }
}
