/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Extraction of default provider components from either return style.
//!
//! Rule implementations are not required to return these through an explicit
//! `DefaultInfo`; the same five fields may appear as bare names on a legacy
//! struct return. Both paths produce one [`DefaultFields`] record consumed by
//! the synthesizer in [`crate::analysis::defaults`].

use crate::artifact::Artifact;
use crate::artifact::Location;
use crate::artifact_set::ArtifactSet;
use crate::error::RuleError;
use crate::error::RuleErrorKind;
use crate::provider::instance::ProviderInstance;
use crate::runfiles::Runfiles;
use crate::values::Value;

/// The legacy struct field names that feed the default provider.
pub(crate) const DEFAULT_PROVIDER_FIELDS: &[&str] = &[
    "files",
    "runfiles",
    "data_runfiles",
    "default_runfiles",
    "executable",
];

/// The four independently-optional default provider components, plus the
/// location they were declared at (for diagnostics).
#[derive(Debug, Default)]
pub(crate) struct DefaultFields {
    pub(crate) files: Option<ArtifactSet>,
    pub(crate) stateless_runfiles: Option<Runfiles>,
    pub(crate) data_runfiles: Option<Runfiles>,
    pub(crate) default_runfiles: Option<Runfiles>,
    pub(crate) executable: Option<Artifact>,
    pub(crate) declared_at: Option<Location>,
}

impl DefaultFields {
    /// Reads the fields of an explicit `DefaultInfo` instance. Unknown fields
    /// are an error on this path (the provider is typed).
    pub(crate) fn from_default_info(info: &ProviderInstance) -> Result<DefaultFields, RuleError> {
        let mut fields = DefaultFields {
            declared_at: info.error_location(),
            ..DefaultFields::default()
        };
        for (name, value) in info.fields() {
            if !DEFAULT_PROVIDER_FIELDS.contains(&name) {
                return Err(RuleError::new(RuleErrorKind::UnknownDefaultInfoField {
                    field: name.to_owned(),
                })
                .with_location(info.error_location()));
            }
            fields.set(name, value, info.error_location())?;
        }
        Ok(fields)
    }

    /// Reads the five recognized default provider names from a legacy struct
    /// return. Remaining struct fields belong to the merge engine.
    pub(crate) fn from_legacy_struct(bag: &ProviderInstance) -> Result<DefaultFields, RuleError> {
        let mut fields = DefaultFields {
            declared_at: bag.error_location(),
            ..DefaultFields::default()
        };
        for (name, value) in bag.fields() {
            if DEFAULT_PROVIDER_FIELDS.contains(&name) {
                fields.set(name, value, bag.error_location())?;
            }
        }
        Ok(fields)
    }

    fn set(
        &mut self,
        name: &str,
        value: &Value,
        location: Option<Location>,
    ) -> Result<(), RuleError> {
        // An explicit None is the same as an absent field.
        if matches!(value, Value::None) {
            return Ok(());
        }
        match name {
            "files" => self.files = Some(expect_artifact_set(name, value, location)?),
            "runfiles" => self.stateless_runfiles = Some(expect_runfiles(name, value, location)?),
            "data_runfiles" => self.data_runfiles = Some(expect_runfiles(name, value, location)?),
            "default_runfiles" => {
                self.default_runfiles = Some(expect_runfiles(name, value, location)?)
            }
            "executable" => match value {
                Value::Artifact(artifact) => self.executable = Some(artifact.clone()),
                other => return Err(invalid_field(name, "File", other, location)),
            },
            _ => unreachable!("callers only pass recognized default provider fields"),
        }
        Ok(())
    }
}

fn invalid_field(
    field: &str,
    expected: &'static str,
    value: &Value,
    location: Option<Location>,
) -> RuleError {
    RuleError::new(RuleErrorKind::InvalidField {
        field: field.to_owned(),
        expected,
        shape: value.type_name(),
    })
    .with_location(location)
}

fn expect_runfiles(
    field: &str,
    value: &Value,
    location: Option<Location>,
) -> Result<Runfiles, RuleError> {
    match value {
        Value::Runfiles(runfiles) => Ok(runfiles.clone()),
        other => Err(invalid_field(field, "runfiles", other, location)),
    }
}

/// Accepts either a depset or a plain list of artifacts.
pub(crate) fn expect_artifact_set(
    field: &str,
    value: &Value,
    location: Option<Location>,
) -> Result<ArtifactSet, RuleError> {
    match value {
        Value::ArtifactSet(set) => Ok(set.clone()),
        Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::Artifact(artifact) => Ok(artifact.clone()),
                other => Err(invalid_field(field, "depset of Files", other, location.clone())),
            })
            .collect::<Result<ArtifactSet, _>>(),
        other => Err(invalid_field(field, "depset of Files", other, location)),
    }
}

#[cfg(test)]
mod tests {
    use dupe::Dupe;
    use starlark_map::small_map::SmallMap;

    use crate::error::RuleErrorKind;
    use crate::provider::default_info::DefaultFields;
    use crate::provider::instance::default_info_key;
    use crate::provider::instance::struct_key;
    use crate::provider::instance::ProviderInstance;
    use crate::runfiles::Runfiles;
    use crate::testing::artifact;
    use crate::values::Value;

    fn info(fields: Vec<(&str, Value)>) -> ProviderInstance {
        ProviderInstance::new(
            default_info_key().dupe(),
            fields
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect::<SmallMap<_, _>>(),
        )
    }

    #[test]
    fn extracts_typed_fields_from_default_info() {
        let exe = artifact("bin");
        let parsed = DefaultFields::from_default_info(&info(vec![
            ("files", Value::List(vec![Value::Artifact(artifact("a"))])),
            ("executable", Value::Artifact(exe.clone())),
            ("runfiles", Value::Runfiles(Runfiles::empty())),
        ]))
        .unwrap();

        assert!(parsed.files.unwrap().contains(&artifact("a")));
        assert_eq!(Some(exe), parsed.executable);
        assert!(parsed.stateless_runfiles.is_some());
        assert!(parsed.data_runfiles.is_none());
    }

    #[test]
    fn unknown_default_info_field_is_rejected() {
        let err =
            DefaultFields::from_default_info(&info(vec![("outputs", Value::None)])).unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::UnknownDefaultInfoField { field } if field == "outputs"
        ));
    }

    #[test]
    fn legacy_struct_ignores_unrecognized_fields() {
        let mut fields = SmallMap::new();
        fields.insert("files".to_owned(), Value::List(vec![]));
        fields.insert("whatever".to_owned(), Value::Int(1));
        let bag = ProviderInstance::new(struct_key().dupe(), fields);

        let parsed = DefaultFields::from_legacy_struct(&bag).unwrap();
        assert!(parsed.files.is_some());
        assert!(parsed.executable.is_none());
    }

    #[test]
    fn mistyped_field_names_expected_shape() {
        let err = DefaultFields::from_default_info(&info(vec![(
            "executable",
            Value::String("bin".to_owned()),
        )]))
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            RuleErrorKind::InvalidField { field, expected, shape }
                if field == "executable" && *expected == "File" && *shape == "string"
        ));
    }
}
