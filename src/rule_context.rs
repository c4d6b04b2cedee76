/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! The evaluation context one rule instance is consolidated under.
//!
//! Everything here is produced by collaborators before consolidation starts
//! (rule metadata from rule definition loading, registered actions and
//! declared outputs from the implementation's action registry) and is
//! read-only for the duration of one evaluation.

use dupe::Dupe;
use regex::Regex;

use crate::artifact::Artifact;
use crate::artifact::Location;
use crate::artifact::TargetLabel;
use crate::provider::id::ProviderKey;

/// A compiled expected-failure pattern for analysis-test rules. The pattern
/// must cover the entire failure message; a partial hit is not a match.
#[derive(Debug)]
pub struct ExpectFailure {
    raw: String,
    anchored: Regex,
}

impl ExpectFailure {
    pub fn new(pattern: &str) -> Result<ExpectFailure, regex::Error> {
        Ok(ExpectFailure {
            raw: pattern.to_owned(),
            anchored: Regex::new(&format!("^(?:{pattern})$"))?,
        })
    }

    pub fn matches(&self, message: &str) -> bool {
        self.anchored.is_match(message)
    }

    /// The pattern as the rule supplied it, for diagnostics.
    pub fn pattern(&self) -> &str {
        &self.raw
    }
}

/// One action registered by the rule implementation, reduced to what result
/// consolidation needs: which outputs it produces.
#[derive(Clone, Debug)]
pub struct ActionRecord {
    mnemonic: String,
    outputs: Vec<Artifact>,
}

impl ActionRecord {
    pub fn new(mnemonic: impl Into<String>, outputs: Vec<Artifact>) -> ActionRecord {
        ActionRecord {
            mnemonic: mnemonic.into(),
            outputs,
        }
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn outputs(&self) -> &[Artifact] {
        &self.outputs
    }
}

/// Context for consolidating one rule instance's implementation result.
#[derive(Debug)]
pub struct RuleContext {
    label: TargetLabel,
    rule_class: String,
    impl_location: Location,
    advertised_providers: Vec<ProviderKey>,
    is_executable: bool,
    is_test: bool,
    is_analysis_test: bool,
    /// Pre-reserved implicit executable output, for rule classes that
    /// allocate one before the implementation runs.
    implicit_executable: Option<Artifact>,
    declared_outputs: Vec<Artifact>,
    registered_actions: Vec<ActionRecord>,
    expect_failure: Option<ExpectFailure>,
    disallow_legacy_struct_returns: bool,
}

impl RuleContext {
    pub fn new(
        label: TargetLabel,
        rule_class: impl Into<String>,
        impl_location: Location,
    ) -> RuleContext {
        RuleContext {
            label,
            rule_class: rule_class.into(),
            impl_location,
            advertised_providers: Vec::new(),
            is_executable: false,
            is_test: false,
            is_analysis_test: false,
            implicit_executable: None,
            declared_outputs: Vec::new(),
            registered_actions: Vec::new(),
            expect_failure: None,
            disallow_legacy_struct_returns: false,
        }
    }

    pub fn with_advertised_providers(mut self, providers: Vec<ProviderKey>) -> RuleContext {
        self.advertised_providers = providers;
        self
    }

    pub fn executable(mut self) -> RuleContext {
        self.is_executable = true;
        self
    }

    /// Test rules are implicitly executable.
    pub fn test(mut self) -> RuleContext {
        self.is_test = true;
        self.is_executable = true;
        self
    }

    /// Analysis test rules are test rules that must be free of build-time
    /// side effects; their executable is always a synthesized runner script.
    pub fn analysis_test(mut self) -> RuleContext {
        self.is_analysis_test = true;
        self.test()
    }

    pub fn with_implicit_executable(mut self, artifact: Artifact) -> RuleContext {
        self.implicit_executable = Some(artifact);
        self
    }

    pub fn with_declared_outputs(mut self, outputs: Vec<Artifact>) -> RuleContext {
        self.declared_outputs = outputs;
        self
    }

    pub fn with_registered_actions(mut self, actions: Vec<ActionRecord>) -> RuleContext {
        self.registered_actions = actions;
        self
    }

    /// An empty pattern means no failure is expected.
    pub fn with_expect_failure(mut self, pattern: &str) -> Result<RuleContext, regex::Error> {
        if !pattern.is_empty() {
            self.expect_failure = Some(ExpectFailure::new(pattern)?);
        }
        Ok(self)
    }

    pub fn disallow_legacy_struct_returns(mut self) -> RuleContext {
        self.disallow_legacy_struct_returns = true;
        self
    }

    pub fn label(&self) -> &TargetLabel {
        &self.label
    }

    pub fn rule_class(&self) -> &str {
        &self.rule_class
    }

    pub fn impl_location(&self) -> &Location {
        &self.impl_location
    }

    pub fn advertised_providers(&self) -> &[ProviderKey] {
        &self.advertised_providers
    }

    pub fn is_executable(&self) -> bool {
        self.is_executable
    }

    pub fn is_test(&self) -> bool {
        self.is_test
    }

    pub fn is_analysis_test(&self) -> bool {
        self.is_analysis_test
    }

    pub fn implicit_executable(&self) -> Option<&Artifact> {
        self.implicit_executable.as_ref()
    }

    pub fn declared_outputs(&self) -> &[Artifact] {
        &self.declared_outputs
    }

    pub fn registered_actions(&self) -> &[ActionRecord] {
        &self.registered_actions
    }

    pub fn expect_failure(&self) -> Option<&ExpectFailure> {
        self.expect_failure.as_ref()
    }

    pub fn legacy_struct_returns_disallowed(&self) -> bool {
        self.disallow_legacy_struct_returns
    }

    /// The generated runner script standing in as an analysis test's
    /// executable.
    pub fn test_runner_script(&self) -> Artifact {
        Artifact::new(self.label.dupe(), format!("{}.sh", self.label.name()))
    }
}
