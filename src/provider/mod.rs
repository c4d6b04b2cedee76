/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Providers are the data returned from a rule, and are the only way that
//! information from this rule is available to rules that depend on it.
//!
//! Two generations of the protocol coexist. Declared providers are identified
//! by a stable [`ProviderKey`](id::ProviderKey). The legacy convention
//! returns a struct-like field bag keyed by bare names; a bridged builtin
//! provider additionally carries a legacy name and may be supplied under
//! either. The merge engine in [`crate::analysis::merge`] normalizes both
//! generations into one provider set keyed by `ProviderKey`.

pub mod default_info;
pub mod id;
pub mod instance;
