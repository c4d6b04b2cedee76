/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! The provider merge engine: declared providers and legacy struct fields
//! are normalized into one provider set keyed by [`ProviderKey`].
//!
//! Invariant: no key is populated by two conflicting sources. Declared
//! providers conflict on repeat insertion; a provider supplied under a legacy
//! field name is promoted to its modern key only while that slot is free
//! (first seen wins), which is what makes supplying a bridged provider under
//! its own legacy name idempotent rather than a conflict.

use dupe::Dupe;
use starlark_map::small_map::SmallMap;

use crate::artifact_set::ArtifactSet;
use crate::error::RuleError;
use crate::error::RuleErrorKind;
use crate::provider::default_info::expect_artifact_set;
use crate::provider::default_info::DefaultFields;
use crate::provider::default_info::DEFAULT_PROVIDER_FIELDS;
use crate::provider::id::ProviderKey;
use crate::provider::instance::default_info_key;
use crate::provider::instance::run_environment_info_key;
use crate::provider::instance::ProviderInstance;
use crate::rule_context::RuleContext;
use crate::values::Value;

/// The unified result of merging both provider generations.
#[derive(Debug)]
pub(crate) struct MergedProviders {
    pub(crate) providers: SmallMap<ProviderKey, ProviderInstance>,
    /// Opaque pass-through legacy attributes, kept reachable by bare name.
    pub(crate) legacy_attrs: SmallMap<String, Value>,
    pub(crate) output_groups: SmallMap<String, ArtifactSet>,
    pub(crate) default_fields: DefaultFields,
    pub(crate) explicit_default_info: bool,
}

pub(crate) fn merge_providers(
    ctx: &RuleContext,
    declared: Vec<ProviderInstance>,
    legacy: Option<ProviderInstance>,
) -> Result<MergedProviders, RuleError> {
    let mut providers = SmallMap::new();
    let mut default_info: Option<ProviderInstance> = None;

    for instance in declared {
        insert_declared(ctx, &mut providers, &mut default_info, instance)?;
    }

    // The struct's nested provider collection merges exactly like a
    // top-level declared provider list.
    if let Some(bag) = &legacy {
        if let Some(value) = bag.field("providers") {
            for instance in cast_provider_list("providers", value, bag)? {
                insert_declared(ctx, &mut providers, &mut default_info, instance)?;
            }
        }
    }

    let explicit_default_info = default_info.is_some();
    let default_fields = match (&default_info, &legacy) {
        (Some(info), _) => DefaultFields::from_default_info(info)?,
        (None, Some(bag)) => DefaultFields::from_legacy_struct(bag)?,
        (None, None) => DefaultFields::default(),
    };

    let mut legacy_attrs = SmallMap::new();
    let mut output_groups = SmallMap::new();

    if let Some(bag) = &legacy {
        for (field, value) in bag.fields() {
            if field == "providers" {
                // Already merged above.
            } else if DEFAULT_PROVIDER_FIELDS.contains(&field) {
                // Already parsed into `default_fields` -- unless an explicit
                // DefaultInfo claimed them, in which case supplying both is a
                // conflict.
                if explicit_default_info {
                    return Err(RuleError::new(RuleErrorKind::DefaultFieldConflict {
                        field: field.to_owned(),
                    })
                    .with_location(bag.error_location()));
                }
            } else if field == "output_groups" {
                merge_output_groups(value, bag, &mut output_groups)?;
            } else {
                legacy_attrs.insert(field.to_owned(), value.clone());
                if let Value::Provider(instance) = value {
                    bridge_legacy_provider(
                        field,
                        instance,
                        bag,
                        &mut providers,
                        &mut legacy_attrs,
                        value,
                    )?;
                }
            }
        }
    }

    Ok(MergedProviders {
        providers,
        legacy_attrs,
        output_groups,
        default_fields,
        explicit_default_info,
    })
}

fn insert_declared(
    ctx: &RuleContext,
    providers: &mut SmallMap<ProviderKey, ProviderInstance>,
    default_info: &mut Option<ProviderInstance>,
    instance: ProviderInstance,
) -> Result<(), RuleError> {
    let key = instance.key()?.dupe();

    // The default provider is unique across the whole return value and is
    // consumed by the synthesizer rather than stored as-is.
    if key == *default_info_key() {
        if default_info.is_some() {
            return Err(conflict(&key, &instance));
        }
        *default_info = Some(instance);
        return Ok(());
    }

    if key == *run_environment_info_key() && !(ctx.is_executable() || ctx.is_test()) {
        if run_environment_is_strict(&instance) {
            return Err(
                RuleError::new(RuleErrorKind::RunEnvironmentOnNonExecutable)
                    .with_location(instance.error_location()),
            );
        }
        tracing::warn!(
            label = %ctx.label(),
            "returning RunEnvironmentInfo from a non-executable, non-test target has no effect"
        );
    }

    if providers.contains_key(&key) {
        return Err(conflict(&key, &instance));
    }
    providers.insert(key, instance);
    Ok(())
}

/// Promotes a provider supplied under a legacy field name into the unified
/// set, and keeps it reachable under its own canonical legacy name.
fn bridge_legacy_provider(
    field: &str,
    instance: &ProviderInstance,
    bag: &ProviderInstance,
    providers: &mut SmallMap<ProviderKey, ProviderInstance>,
    legacy_attrs: &mut SmallMap<String, Value>,
    value: &Value,
) -> Result<(), RuleError> {
    let key = instance.key()?.dupe();

    // The canonical default provider slot is always synthesized, so a
    // DefaultInfo smuggled in under a legacy field name can only conflict.
    if key == *default_info_key() {
        return Err(conflict(&key, instance));
    }

    let promote = match key.legacy_name() {
        // Promote when supplied under its own canonical legacy name, or when
        // no other value occupies that canonical name.
        Some(canonical) => field == canonical || bag.field(canonical).is_none(),
        None => true,
    };
    if promote && !providers.contains_key(&key) {
        tracing::debug!(provider = %key, field, "promoted legacy provider to its modern key");
        providers.insert(key.dupe(), instance.clone());
    }

    if let Some(canonical) = key.legacy_name() {
        if canonical != field
            && bag.field(canonical).is_none()
            && !legacy_attrs.contains_key(canonical)
        {
            legacy_attrs.insert(canonical.to_owned(), value.clone());
        }
    }
    Ok(())
}

fn merge_output_groups(
    value: &Value,
    bag: &ProviderInstance,
    output_groups: &mut SmallMap<String, ArtifactSet>,
) -> Result<(), RuleError> {
    let groups = match value {
        Value::Dict(groups) => groups,
        other => {
            return Err(RuleError::new(RuleErrorKind::InvalidField {
                field: "output_groups".to_owned(),
                expected: "dict of artifact collections",
                shape: other.type_name(),
            })
            .with_location(bag.error_location()));
        }
    };
    for (name, artifacts) in groups.iter() {
        let set = expect_artifact_set(name, artifacts, bag.error_location())?;
        output_groups.insert(name.clone(), set);
    }
    Ok(())
}

fn cast_provider_list(
    field: &str,
    value: &Value,
    bag: &ProviderInstance,
) -> Result<Vec<ProviderInstance>, RuleError> {
    let items = match value {
        Value::List(items) => items,
        other => {
            return Err(RuleError::new(RuleErrorKind::InvalidField {
                field: field.to_owned(),
                expected: "list of providers",
                shape: other.type_name(),
            })
            .with_location(bag.error_location()));
        }
    };
    items
        .iter()
        .map(|item| match item.as_provider() {
            Some(instance) => Ok(instance.clone()),
            None => Err(RuleError::new(RuleErrorKind::InvalidField {
                field: field.to_owned(),
                expected: "list of providers",
                shape: item.type_name(),
            })
            .with_location(bag.error_location())),
        })
        .collect()
}

fn run_environment_is_strict(instance: &ProviderInstance) -> bool {
    // Strict unless the instance opts out explicitly.
    !matches!(
        instance.field("error_on_non_executable"),
        Some(Value::Bool(false))
    )
}

fn conflict(key: &ProviderKey, instance: &ProviderInstance) -> RuleError {
    RuleError::new(RuleErrorKind::ProviderConflict {
        key: key.to_string(),
    })
    .with_location(instance.error_location())
}

#[cfg(test)]
mod tests {
    use crate::analysis::merge::merge_providers;
    use crate::error::RuleErrorKind;
    use crate::provider::id::ProviderKey;
    use crate::provider::instance::default_info_key;
    use crate::testing;
    use crate::values::Value;

    #[test]
    fn declared_providers_merge_in_first_seen_order() {
        let foo = testing::provider_key("FooInfo");
        let bar = testing::provider_key("BarInfo");
        let merged = merge_providers(
            &testing::ctx(),
            vec![
                testing::provider(&foo, vec![("x", Value::Int(1))]),
                testing::provider(&bar, vec![]),
            ],
            None,
        )
        .unwrap();

        let keys: Vec<_> = merged.providers.keys().map(|k| k.name().to_owned()).collect();
        assert_eq!(vec!["FooInfo", "BarInfo"], keys);
        assert!(!merged.explicit_default_info);
    }

    #[test]
    fn repeated_key_is_a_conflict_naming_the_key() {
        let foo = testing::provider_key("FooInfo");
        let err = merge_providers(
            &testing::ctx(),
            vec![
                testing::provider(&foo, vec![("x", Value::Int(1))]),
                testing::provider(&foo, vec![("x", Value::Int(2))]),
            ],
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::ProviderConflict { key } if key == "FooInfo"
        ));
    }

    #[test]
    fn conflicts_are_detected_across_declared_and_nested_paths() {
        let foo = testing::provider_key("FooInfo");
        let bag = testing::legacy_struct(vec![(
            "providers",
            Value::List(vec![Value::Provider(testing::provider(&foo, vec![]))]),
        )]);
        let err = merge_providers(
            &testing::ctx(),
            vec![testing::provider(&foo, vec![])],
            Some(bag),
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::ProviderConflict { key } if key == "FooInfo"
        ));
    }

    #[test]
    fn legacy_fields_pass_through_opaquely() {
        let bag = testing::legacy_struct(vec![
            ("some_flag", Value::Bool(true)),
            ("notes", Value::String("hello".to_owned())),
        ]);
        let merged = merge_providers(&testing::ctx(), vec![], Some(bag)).unwrap();
        assert_eq!(Some(&Value::Bool(true)), merged.legacy_attrs.get("some_flag"));
        assert!(merged.providers.is_empty());
    }

    #[test]
    fn bridged_provider_under_legacy_name_lands_under_both_names() {
        let cc = ProviderKey::new_bridged("CcInfo", "cc");
        let instance = testing::provider(&cc, vec![("x", Value::Int(1))]);
        let bag = testing::legacy_struct(vec![("cc", Value::Provider(instance))]);

        let merged = merge_providers(&testing::ctx(), vec![], Some(bag)).unwrap();
        assert!(merged.providers.contains_key(&cc));
        assert!(merged.legacy_attrs.contains_key("cc"));
    }

    #[test]
    fn bridged_provider_under_other_name_gains_its_canonical_name() {
        let cc = ProviderKey::new_bridged("CcInfo", "cc");
        let instance = testing::provider(&cc, vec![]);
        let bag = testing::legacy_struct(vec![("compilation", Value::Provider(instance))]);

        let merged = merge_providers(&testing::ctx(), vec![], Some(bag)).unwrap();
        assert!(merged.providers.contains_key(&cc));
        assert!(merged.legacy_attrs.contains_key("compilation"));
        assert!(merged.legacy_attrs.contains_key("cc"));
    }

    #[test]
    fn declared_provider_wins_the_modern_slot_over_a_legacy_field() {
        let cc = ProviderKey::new_bridged("CcInfo", "cc");
        let declared = testing::provider(&cc, vec![("origin", Value::Int(1))]);
        let from_bag = testing::provider(&cc, vec![("origin", Value::Int(2))]);
        let bag = testing::legacy_struct(vec![("cc", Value::Provider(from_bag))]);

        let merged = merge_providers(&testing::ctx(), vec![declared], Some(bag)).unwrap();
        // Not a conflict: the legacy name simply does not displace the
        // explicitly declared instance.
        assert_eq!(
            Some(&Value::Int(1)),
            merged.providers.get(&cc).unwrap().field("origin")
        );
    }

    #[test]
    fn plain_provider_in_legacy_field_is_promoted() {
        let foo = testing::provider_key("FooInfo");
        let bag = testing::legacy_struct(vec![(
            "legacy_foo",
            Value::Provider(testing::provider(&foo, vec![])),
        )]);
        let merged = merge_providers(&testing::ctx(), vec![], Some(bag)).unwrap();
        assert!(merged.providers.contains_key(&foo));
        assert!(merged.legacy_attrs.contains_key("legacy_foo"));
    }

    #[test]
    fn output_groups_merge_from_the_bag() {
        let bag = testing::legacy_struct(vec![(
            "output_groups",
            Value::Dict(testing::fields(vec![(
                "debug",
                Value::List(vec![Value::Artifact(testing::artifact("dbg"))]),
            )])),
        )]);
        let merged = merge_providers(&testing::ctx(), vec![], Some(bag)).unwrap();
        assert!(merged
            .output_groups
            .get("debug")
            .unwrap()
            .contains(&testing::artifact("dbg")));
    }

    #[test]
    fn explicit_default_info_plus_legacy_default_field_conflicts() {
        // Scenario: DefaultInfo in the nested provider list while the bag
        // also carries a bare `executable` field.
        let default = testing::provider(
            default_info_key(),
            vec![("files", Value::List(vec![]))],
        );
        let bag = testing::legacy_struct(vec![
            ("providers", Value::List(vec![Value::Provider(default)])),
            ("executable", Value::Artifact(testing::artifact("bin"))),
        ]);
        let err = merge_providers(&testing::ctx(), vec![], Some(bag)).unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::DefaultFieldConflict { field } if field == "executable"
        ));
    }

    #[test]
    fn two_default_infos_conflict() {
        let err = merge_providers(
            &testing::ctx(),
            vec![
                testing::provider(default_info_key(), vec![]),
                testing::provider(default_info_key(), vec![]),
            ],
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::ProviderConflict { key } if key == "DefaultInfo"
        ));
    }

    #[test]
    fn unbound_provider_never_enters_the_set() {
        use starlark_map::small_map::SmallMap;

        use crate::artifact::Location;
        use crate::provider::instance::ProviderInstance;

        let unbound =
            ProviderInstance::new_unbound(Location::new("defs.cfg", 5, 1), SmallMap::new());
        let err = merge_providers(&testing::ctx(), vec![unbound], None).unwrap_err();
        assert!(matches!(err.kind(), RuleErrorKind::UnboundProvider { .. }));
    }

    #[test]
    fn run_environment_info_on_non_executable_rule_errors_when_strict() {
        let instance =
            testing::provider(crate::provider::instance::run_environment_info_key(), vec![]);
        let err = merge_providers(&testing::ctx(), vec![instance], None).unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::RunEnvironmentOnNonExecutable
        ));
    }

    #[test]
    fn run_environment_info_is_kept_when_lenient_or_executable() {
        let key = crate::provider::instance::run_environment_info_key();
        let lenient = testing::provider(
            key,
            vec![("error_on_non_executable", Value::Bool(false))],
        );
        let merged = merge_providers(&testing::ctx(), vec![lenient], None).unwrap();
        assert!(merged.providers.contains_key(key));

        let strict = testing::provider(key, vec![]);
        let merged =
            merge_providers(&testing::ctx().executable(), vec![strict], None).unwrap();
        assert!(merged.providers.contains_key(key));
    }
}
