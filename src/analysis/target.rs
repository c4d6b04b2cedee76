/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! The finished, immutable configured target and its final validation.

use std::fmt;
use std::fmt::Display;

use allocative::Allocative;
use dupe::Dupe;
use itertools::Itertools;
use starlark_map::small_map::SmallMap;

use crate::analysis::defaults::SynthesizedDefaults;
use crate::analysis::merge::MergedProviders;
use crate::artifact::Artifact;
use crate::artifact::TargetLabel;
use crate::artifact_set::ArtifactSet;
use crate::error::RuleError;
use crate::error::RuleErrorKind;
use crate::provider::id::ProviderKey;
use crate::provider::instance::default_info_key;
use crate::provider::instance::ProviderInstance;
use crate::rule_context::RuleContext;
use crate::runfiles::ExecutableSupport;
use crate::runfiles::RunfilesProvider;
use crate::values::Value;

/// The consolidated, validated result of analyzing one rule instance. Once
/// constructed it never changes; a construction that fails any validation
/// produces no target at all.
#[derive(Debug, Allocative)]
pub struct ConfiguredTarget {
    label: TargetLabel,
    providers: SmallMap<ProviderKey, ProviderInstance>,
    legacy_attrs: SmallMap<String, Value>,
    files_to_build: ArtifactSet,
    runfiles: RunfilesProvider,
    executable_support: Option<ExecutableSupport>,
    output_groups: SmallMap<String, ArtifactSet>,
}

impl ConfiguredTarget {
    pub fn label(&self) -> &TargetLabel {
        &self.label
    }

    pub fn provider(&self, key: &ProviderKey) -> Option<&ProviderInstance> {
        self.providers.get(key)
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderInstance> {
        self.providers.values()
    }

    pub fn legacy_attr(&self, name: &str) -> Option<&Value> {
        self.legacy_attrs.get(name)
    }

    pub fn files_to_build(&self) -> &ArtifactSet {
        &self.files_to_build
    }

    pub fn runfiles(&self) -> &RunfilesProvider {
        &self.runfiles
    }

    pub fn executable_support(&self) -> Option<&ExecutableSupport> {
        self.executable_support.as_ref()
    }

    pub fn executable(&self) -> Option<&Artifact> {
        self.executable_support.as_ref().map(ExecutableSupport::executable)
    }

    pub fn output_group(&self, name: &str) -> Option<&ArtifactSet> {
        self.output_groups.get(name)
    }
}

impl Display for ConfiguredTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} providing [{}]",
            self.label,
            self.providers.keys().map(|k| k.name()).join(", ")
        )
    }
}

pub(crate) fn build_target(
    ctx: &RuleContext,
    merged: MergedProviders,
    defaults: SynthesizedDefaults,
) -> Result<ConfiguredTarget, RuleError> {
    let MergedProviders {
        mut providers,
        legacy_attrs,
        output_groups,
        ..
    } = merged;

    // The canonical default provider always reflects the synthesized
    // components, replacing whatever partial instance the implementation
    // returned.
    providers.insert(
        default_info_key().dupe(),
        canonical_default_info(&defaults),
    );

    for advertised in ctx.advertised_providers() {
        if !providers.contains_key(advertised) {
            return Err(RuleError::new(RuleErrorKind::AdvertisedProviderMissing {
                key: advertised.to_string(),
            })
            .with_location(Some(ctx.impl_location().clone())));
        }
    }

    for output in ctx.declared_outputs() {
        let created = ctx
            .registered_actions()
            .iter()
            .any(|action| action.outputs().contains(output));
        if !created {
            return Err(RuleError::new(RuleErrorKind::UnregisteredOutput {
                path: output.path().to_owned(),
            })
            .with_location(Some(ctx.impl_location().clone())));
        }
    }

    tracing::debug!(
        label = %ctx.label(),
        providers = providers.len(),
        "configured target constructed"
    );

    Ok(ConfiguredTarget {
        label: ctx.label().dupe(),
        providers,
        legacy_attrs,
        files_to_build: defaults.files_to_build,
        runfiles: defaults.runfiles,
        executable_support: defaults.executable_support,
        output_groups,
    })
}

fn canonical_default_info(defaults: &SynthesizedDefaults) -> ProviderInstance {
    let mut fields = SmallMap::new();
    fields.insert(
        "files".to_owned(),
        Value::ArtifactSet(defaults.files_to_build.dupe()),
    );
    fields.insert(
        "default_runfiles".to_owned(),
        Value::Runfiles(defaults.runfiles.default_runfiles().clone()),
    );
    fields.insert(
        "data_runfiles".to_owned(),
        Value::Runfiles(defaults.runfiles.data_runfiles().clone()),
    );
    if let Some(executable) = &defaults.executable {
        fields.insert("executable".to_owned(), Value::Artifact(executable.dupe()));
    }
    ProviderInstance::new(default_info_key().dupe(), fields)
}
