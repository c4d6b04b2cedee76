/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! The structured error surfaced for one failed target construction.
//!
//! Exactly one error is reported per failed evaluation: the first condition
//! detected wins, and the whole target attempt is abandoned. None of these
//! errors is fatal to the surrounding build; evaluation of other targets
//! continues.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::artifact::Location;

#[derive(Debug, thiserror::Error)]
pub enum RuleErrorKind {
    #[error("rule implementation function should return a struct, a list of providers, or None, but got {shape}")]
    Shape { shape: &'static str },
    #[error("element of the list returned by the rule implementation function is not a provider, got {shape}")]
    SequenceElementNotProvider { shape: &'static str },
    #[error("error in rule implementation function:\n{trace}")]
    ImplementationFailed { message: String, trace: String },
    #[error("expected failure not found: {pattern}")]
    ExpectedFailureNotFound { pattern: String },
    #[error(
        "returning a struct from a rule implementation function is deprecated; \
         return a list of providers instead (it may be temporarily re-enabled \
         by unsetting `disallow_legacy_struct_returns`)"
    )]
    LegacyStructDisallowed,
    #[error(
        "the rule implementation function returned an instance of an unbound provider; \
         a provider must be assigned to a top-level variable before its instances can \
         be returned (provider defined at {declared_at})"
    )]
    UnboundProvider { declared_at: Location },
    #[error("multiple conflicting returned providers with key {key}")]
    ProviderConflict { key: String },
    #[error("provider '{field}' should be specified in DefaultInfo if it is provided explicitly")]
    DefaultFieldConflict { field: String },
    #[error("for key '{field}', got {shape}, want {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
        shape: &'static str,
    },
    #[error("DefaultInfo does not accept a field named '{field}'")]
    UnknownDefaultInfoField { field: String },
    #[error(
        "cannot specify the provider 'runfiles' together with 'data_runfiles' or 'default_runfiles'"
    )]
    RunfilesMutualExclusion,
    #[error("'executable' provided by an executable rule '{rule}' should be created by the same rule")]
    ExecutableNotOwned { rule: String },
    #[error(
        "the rule '{rule}' both pre-reserves an implicit executable output '{implicit}' and \
         provides a different executable '{provided}'; do not use the implicit output"
    )]
    ExecutableMismatch {
        rule: String,
        implicit: String,
        provided: String,
    },
    #[error(
        "the rule '{rule}' is executable; it needs to create an executable file and pass it \
         as the 'executable' parameter of the DefaultInfo it returns"
    )]
    ExecutableMissing { rule: String },
    #[error("main program {executable} not included in runfiles")]
    ExecutableNotInRunfiles { executable: String },
    #[error(
        "analysis test rule '{label}' registered actions ({actions}); these rules must not \
         have side effects"
    )]
    AnalysisTestRegisteredActions { label: String, actions: String },
    #[error("test rules have to define runfiles")]
    EmptyTestRunfiles,
    #[error("rule advertised the '{key}' provider, but this provider was not among those returned")]
    AdvertisedProviderMissing { key: String },
    #[error("declared output '{path}' was not created by any registered action")]
    UnregisteredOutput { path: String },
    #[error("returning RunEnvironmentInfo from a non-executable, non-test target has no effect")]
    RunEnvironmentOnNonExecutable,
}

/// One structured failure of a target construction: a kind plus the source
/// location it should be reported at (when one is available, typically the
/// creation site of the offending provider instance).
#[derive(Debug)]
pub struct RuleError {
    kind: RuleErrorKind,
    location: Option<Location>,
}

impl RuleError {
    pub fn new(kind: RuleErrorKind) -> RuleError {
        RuleError {
            kind,
            location: None,
        }
    }

    pub fn with_location(mut self, location: Option<Location>) -> RuleError {
        self.location = location;
        self
    }

    pub fn kind(&self) -> &RuleErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

impl From<RuleErrorKind> for RuleError {
    fn from(kind: RuleErrorKind) -> RuleError {
        RuleError::new(kind)
    }
}

impl Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.kind),
            None => Display::fmt(&self.kind, f),
        }
    }
}

impl Error for RuleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.kind)
    }
}
