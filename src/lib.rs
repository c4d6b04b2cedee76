/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Consolidation of the raw value returned by a rule implementation function
//! into an immutable, validated configured target.
//!
//! A rule implementation function (evaluated by the embedded configuration
//! language interpreter, which is not part of this crate) may return its
//! providers in several shapes: a single provider instance, `None`, a list of
//! provider instances, or the legacy struct-style field bag. This crate
//! classifies that value, merges the two provider generations into a single
//! provider set keyed by [`ProviderKey`](provider::id::ProviderKey),
//! synthesizes the default provider components (files to build, executable,
//! runfiles) and assembles the final
//! [`ConfiguredTarget`](analysis::target::ConfiguredTarget).
//!
//! Construction is all-or-nothing: any validation failure abandons the whole
//! target and reports a single [`RuleError`](error::RuleError) to the caller.

pub mod analysis;
pub mod artifact;
pub mod artifact_set;
pub mod error;
pub mod provider;
pub mod rule_context;
pub mod runfiles;
pub mod values;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::analysis::build_configured_target;
pub use crate::analysis::classify::EvalError;
pub use crate::analysis::classify::ImplResult;
pub use crate::analysis::target::ConfiguredTarget;
pub use crate::error::RuleError;
pub use crate::error::RuleErrorKind;
pub use crate::rule_context::RuleContext;
