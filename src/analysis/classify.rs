/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Classification of the raw value returned by a rule implementation.

use crate::error::RuleError;
use crate::error::RuleErrorKind;
use crate::provider::instance::struct_key;
use crate::provider::instance::ProviderInstance;
use crate::rule_context::RuleContext;
use crate::values::Value;

/// An error raised (and not caught) inside the rule implementation function,
/// as reported by the interpreter boundary.
#[derive(Debug)]
pub struct EvalError {
    pub message: String,
    /// The full traceback, including the message.
    pub trace: String,
}

/// The outcome of invoking the rule implementation function.
#[derive(Debug)]
pub enum ImplResult {
    Value(Value),
    Error(EvalError),
}

/// The classified intermediate form consumed by the merge engine.
#[derive(Debug)]
pub(crate) enum Classified {
    /// The evaluation failed the way an analysis test said it would; the
    /// target is intentionally empty and construction succeeds.
    ExpectedFailure,
    Return {
        declared: Vec<ProviderInstance>,
        /// The legacy struct-style field bag, when that convention was used.
        legacy: Option<ProviderInstance>,
    },
}

pub(crate) fn classify(ctx: &RuleContext, result: ImplResult) -> Result<Classified, RuleError> {
    let value = match result {
        ImplResult::Error(err) => {
            if let Some(pattern) = ctx.expect_failure() {
                if pattern.matches(&err.message) {
                    tracing::debug!(
                        label = %ctx.label(),
                        "implementation failed as expected; producing an empty target"
                    );
                    return Ok(Classified::ExpectedFailure);
                }
            }
            return Err(RuleError::new(RuleErrorKind::ImplementationFailed {
                message: err.message,
                trace: err.trace,
            })
            .with_location(Some(ctx.impl_location().clone())));
        }
        ImplResult::Value(value) => value,
    };

    let classified = match value {
        Value::None => Classified::Return {
            declared: Vec::new(),
            legacy: None,
        },
        Value::Provider(instance) => {
            let is_struct = instance.key()? == struct_key();
            if is_struct {
                if ctx.legacy_struct_returns_disallowed() {
                    return Err(RuleError::new(RuleErrorKind::LegacyStructDisallowed)
                        .with_location(instance.error_location()));
                }
                Classified::Return {
                    declared: Vec::new(),
                    legacy: Some(instance),
                }
            } else {
                Classified::Return {
                    declared: vec![instance],
                    legacy: None,
                }
            }
        }
        Value::List(items) => {
            let mut declared = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Provider(instance) => declared.push(instance),
                    other => {
                        return Err(RuleError::new(RuleErrorKind::SequenceElementNotProvider {
                            shape: other.type_name(),
                        })
                        .with_location(Some(ctx.impl_location().clone())));
                    }
                }
            }
            Classified::Return {
                declared,
                legacy: None,
            }
        }
        other => {
            return Err(RuleError::new(RuleErrorKind::Shape {
                shape: other.type_name(),
            })
            .with_location(Some(ctx.impl_location().clone())));
        }
    };

    // The implementation succeeded but was declared to fail.
    if let Some(pattern) = ctx.expect_failure() {
        return Err(RuleError::new(RuleErrorKind::ExpectedFailureNotFound {
            pattern: pattern.pattern().to_owned(),
        })
        .with_location(Some(ctx.impl_location().clone())));
    }

    Ok(classified)
}

#[cfg(test)]
mod tests {
    use starlark_map::small_map::SmallMap;

    use crate::analysis::classify::classify;
    use crate::analysis::classify::Classified;
    use crate::analysis::classify::EvalError;
    use crate::analysis::classify::ImplResult;
    use crate::artifact::Location;
    use crate::error::RuleErrorKind;
    use crate::provider::instance::ProviderInstance;
    use crate::testing;
    use crate::values::Value;

    fn eval_error(message: &str) -> ImplResult {
        ImplResult::Error(EvalError {
            message: message.to_owned(),
            trace: format!("Traceback:\n  File rules.cfg, line 3\n{message}"),
        })
    }

    #[test]
    fn none_classifies_as_empty_return() {
        let classified = classify(&testing::ctx(), ImplResult::Value(Value::None)).unwrap();
        assert!(matches!(
            classified,
            Classified::Return { declared, legacy: None } if declared.is_empty()
        ));
    }

    #[test]
    fn single_provider_is_declared() {
        let provider = testing::provider(&testing::provider_key("FooInfo"), vec![]);
        let classified = classify(
            &testing::ctx(),
            ImplResult::Value(Value::Provider(provider)),
        )
        .unwrap();
        assert!(matches!(
            classified,
            Classified::Return { declared, .. } if declared.len() == 1
        ));
    }

    #[test]
    fn struct_return_routes_to_the_legacy_path() {
        let bag = testing::legacy_struct(vec![("foo", Value::Int(1))]);
        let classified =
            classify(&testing::ctx(), ImplResult::Value(Value::Provider(bag))).unwrap();
        assert!(matches!(
            classified,
            Classified::Return { legacy: Some(_), .. }
        ));
    }

    #[test]
    fn struct_return_rejected_when_disallowed() {
        let ctx = testing::ctx().disallow_legacy_struct_returns();
        let bag = testing::legacy_struct(vec![]);
        let err = classify(&ctx, ImplResult::Value(Value::Provider(bag))).unwrap_err();
        assert!(matches!(err.kind(), RuleErrorKind::LegacyStructDisallowed));
    }

    #[test]
    fn wrong_shape_names_the_observed_type() {
        let err = classify(&testing::ctx(), ImplResult::Value(Value::Int(3))).unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::Shape { shape } if *shape == "int"
        ));
    }

    #[test]
    fn sequence_element_must_be_a_provider() {
        let err = classify(
            &testing::ctx(),
            ImplResult::Value(Value::List(vec![Value::String("nope".to_owned())])),
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::SequenceElementNotProvider { shape } if *shape == "string"
        ));
    }

    #[test]
    fn unbound_single_provider_is_rejected() {
        let instance =
            ProviderInstance::new_unbound(Location::new("defs.cfg", 2, 1), SmallMap::new());
        let err = classify(
            &testing::ctx(),
            ImplResult::Value(Value::Provider(instance)),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), RuleErrorKind::UnboundProvider { .. }));
    }

    #[test]
    fn matched_expected_failure_short_circuits() {
        let ctx = testing::ctx()
            .with_expect_failure("analysis did not converge")
            .unwrap();
        let classified = classify(&ctx, eval_error("analysis did not converge")).unwrap();
        assert!(matches!(classified, Classified::ExpectedFailure));
    }

    #[test]
    fn unmatched_failure_carries_the_trace() {
        let ctx = testing::ctx().with_expect_failure("some other error").unwrap();
        let err = classify(&ctx, eval_error("analysis did not converge")).unwrap_err();
        match err.kind() {
            RuleErrorKind::ImplementationFailed { trace, .. } => {
                assert!(trace.contains("Traceback"));
            }
            kind => panic!("unexpected error: {kind}"),
        }
    }

    #[test]
    fn pattern_covering_only_part_of_the_message_is_not_a_match() {
        let ctx = testing::ctx().with_expect_failure("missing attribute").unwrap();
        let err = classify(&ctx, eval_error("missing attribute 'srcs'")).unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::ImplementationFailed { .. }
        ));
    }

    #[test]
    fn expected_failure_that_never_happened_is_an_error() {
        let ctx = testing::ctx().with_expect_failure("boom").unwrap();
        let err = classify(&ctx, ImplResult::Value(Value::None)).unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::ExpectedFailureNotFound { pattern } if pattern == "boom"
        ));
    }
}
