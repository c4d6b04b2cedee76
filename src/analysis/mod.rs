/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Result consolidation for one rule instance.
//!
//! The pipeline runs in four stages, each a pure function of its inputs:
//! classification of the raw return value, merging of both provider
//! generations, synthesis of the default provider components, and final
//! validation. The first error anywhere abandons the whole target.

pub mod classify;
pub(crate) mod defaults;
pub(crate) mod merge;
pub mod target;

use crate::analysis::classify::classify;
use crate::analysis::classify::Classified;
use crate::analysis::defaults::synthesize_defaults;
use crate::analysis::merge::merge_providers;
use crate::analysis::target::build_target;
use crate::error::RuleError;
use crate::rule_context::RuleContext;

pub use crate::analysis::classify::EvalError;
pub use crate::analysis::classify::ImplResult;
pub use crate::analysis::target::ConfiguredTarget;

/// Consolidates a rule implementation's outcome into a finished target.
///
/// Either every validation passes and the returned target is complete, or
/// the first failure is returned and no target exists.
pub fn build_configured_target(
    ctx: &RuleContext,
    result: ImplResult,
) -> Result<ConfiguredTarget, RuleError> {
    let (declared, legacy) = match classify(ctx, result)? {
        Classified::ExpectedFailure => (Vec::new(), None),
        Classified::Return { declared, legacy } => (declared, legacy),
    };
    let merged = merge_providers(ctx, declared, legacy)?;
    let defaults = synthesize_defaults(ctx, &merged.default_fields)?;
    build_target(ctx, merged, defaults)
}
