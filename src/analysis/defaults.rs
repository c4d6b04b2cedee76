/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Synthesis of the default provider components every finished target gets,
//! whether or not the implementation supplied them.

use dupe::Dupe;
use dupe::IterDupedExt;
use itertools::Itertools;

use crate::artifact::Artifact;
use crate::artifact_set::ArtifactSet;
use crate::artifact_set::ArtifactSetBuilder;
use crate::error::RuleError;
use crate::error::RuleErrorKind;
use crate::provider::default_info::DefaultFields;
use crate::rule_context::ActionRecord;
use crate::rule_context::RuleContext;
use crate::runfiles::ExecutableSupport;
use crate::runfiles::Runfiles;
use crate::runfiles::RunfilesProvider;

/// The fully-resolved default provider components for one target.
#[derive(Debug)]
pub(crate) struct SynthesizedDefaults {
    pub(crate) files_to_build: ArtifactSet,
    pub(crate) executable: Option<Artifact>,
    pub(crate) runfiles: RunfilesProvider,
    pub(crate) executable_support: Option<ExecutableSupport>,
}

pub(crate) fn synthesize_defaults(
    ctx: &RuleContext,
    fields: &DefaultFields,
) -> Result<SynthesizedDefaults, RuleError> {
    if fields.stateless_runfiles.is_some()
        && (fields.data_runfiles.is_some() || fields.default_runfiles.is_some())
    {
        return Err(RuleError::new(RuleErrorKind::RunfilesMutualExclusion)
            .with_location(fields.declared_at.clone()));
    }

    let executable = resolve_executable(ctx, fields)?;
    let files_to_build = resolve_files_to_build(ctx, fields, executable.as_ref());
    let runfiles = resolve_runfiles(fields, executable.as_ref());

    if ctx.is_test() && runfiles.default_runfiles().is_empty() {
        return Err(RuleError::new(RuleErrorKind::EmptyTestRunfiles)
            .with_location(fields.declared_at.clone()));
    }

    let executable_support =
        resolve_executable_support(ctx, fields, executable.as_ref(), &runfiles)?;

    Ok(SynthesizedDefaults {
        files_to_build,
        executable,
        runfiles,
        executable_support,
    })
}

fn resolve_executable(
    ctx: &RuleContext,
    fields: &DefaultFields,
) -> Result<Option<Artifact>, RuleError> {
    if let Some(executable) = &fields.executable {
        if executable.owner() != ctx.label() {
            return Err(RuleError::new(RuleErrorKind::ExecutableNotOwned {
                rule: ctx.rule_class().to_owned(),
            })
            .with_location(fields.declared_at.clone()));
        }
        if ctx.is_executable() {
            if let Some(implicit) = ctx.implicit_executable() {
                if implicit != executable {
                    return Err(RuleError::new(RuleErrorKind::ExecutableMismatch {
                        rule: ctx.rule_class().to_owned(),
                        implicit: implicit.path().to_owned(),
                        provided: executable.path().to_owned(),
                    })
                    .with_location(fields.declared_at.clone()));
                }
            }
        }
    }

    // Analysis tests never run the executable the implementation produced;
    // their runner is always a synthesized script, and the rule must stay
    // free of build-time side effects.
    if ctx.is_analysis_test() {
        if !ctx.registered_actions().is_empty() {
            return Err(RuleError::new(
                RuleErrorKind::AnalysisTestRegisteredActions {
                    label: ctx.label().to_string(),
                    actions: ctx
                        .registered_actions()
                        .iter()
                        .map(ActionRecord::mnemonic)
                        .join(", "),
                },
            ));
        }
        return Ok(Some(ctx.test_runner_script()));
    }

    match &fields.executable {
        Some(executable) => Ok(Some(executable.dupe())),
        None if ctx.is_executable() => match ctx.implicit_executable() {
            Some(implicit) => Ok(Some(implicit.dupe())),
            None => Err(RuleError::new(RuleErrorKind::ExecutableMissing {
                rule: ctx.rule_class().to_owned(),
            })
            .with_location(fields.declared_at.clone())),
        },
        None => Ok(None),
    }
}

fn resolve_files_to_build(
    ctx: &RuleContext,
    fields: &DefaultFields,
    executable: Option<&Artifact>,
) -> ArtifactSet {
    // An explicit `files` overrides the computed default outright.
    if let Some(files) = &fields.files {
        return files.dupe();
    }
    let mut builder = ArtifactSetBuilder::new();
    builder.add_all(ctx.declared_outputs().iter().duped());
    if let Some(executable) = executable {
        builder.add(executable.dupe());
    }
    builder.build()
}

fn resolve_runfiles(fields: &DefaultFields, executable: Option<&Artifact>) -> RunfilesProvider {
    if fields.data_runfiles.is_some() || fields.default_runfiles.is_some() {
        // On the split path the executable is not implicitly merged in; the
        // implementation took full control of both variants.
        return RunfilesProvider::with_data(
            fields.default_runfiles.clone().unwrap_or_else(Runfiles::empty),
            fields.data_runfiles.clone().unwrap_or_else(Runfiles::empty),
        );
    }
    // Stateless path, including the all-absent case. The executable joins
    // the set either way.
    let stateless = fields
        .stateless_runfiles
        .clone()
        .unwrap_or_else(Runfiles::empty);
    let stateless = match executable {
        Some(executable) => stateless.with_artifact(executable),
        None => stateless,
    };
    RunfilesProvider::simple(stateless)
}

fn resolve_executable_support(
    ctx: &RuleContext,
    fields: &DefaultFields,
    executable: Option<&Artifact>,
    runfiles: &RunfilesProvider,
) -> Result<Option<ExecutableSupport>, RuleError> {
    if executable.is_none() && !ctx.is_test() {
        return Ok(None);
    }
    let default = runfiles.default_runfiles();
    match (executable, default.is_empty()) {
        (Some(executable), false) => {
            if !default.contains_artifact(executable) {
                return Err(RuleError::new(RuleErrorKind::ExecutableNotInRunfiles {
                    executable: executable.path().to_owned(),
                })
                .with_location(fields.declared_at.clone()));
            }
            Ok(Some(ExecutableSupport::new(
                executable.dupe(),
                default.clone(),
            )))
        }
        (Some(executable), true) => Ok(Some(ExecutableSupport::new(
            executable.dupe(),
            Runfiles::empty(),
        ))),
        (None, false) => Err(RuleError::new(RuleErrorKind::ExecutableMissing {
            rule: ctx.rule_class().to_owned(),
        })
        .with_location(fields.declared_at.clone())),
        (None, true) => Ok(None),
    }
}
