//! Whole-record validation for the intake form.
//!
//! Field rules run first; the age-gated phone requirement runs after them on
//! every pass and can replace the phone message. Nothing is cached between
//! passes because gender and birth date may change at any time.

mod config;
mod policy;
mod rules;

pub use config::{ValidationConfig, DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_PHONE_REQUIRED_OVER_AGE};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{ApplicantRecord, FieldName};

/// Fields gated by the "continue to documents" step.
pub const PERSONAL_FIELDS: [FieldName; 6] = [
    FieldName::FullNameEn,
    FieldName::FullNameNp,
    FieldName::Gender,
    FieldName::DobAd,
    FieldName::DobBs,
    FieldName::Phone,
];

/// Field name to message, at most one message per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<FieldName, String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: FieldName) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FieldName) -> bool {
        self.0.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    pub(crate) fn insert(&mut self, field: FieldName, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub(crate) fn remove(&mut self, field: FieldName) {
        self.0.remove(&field);
    }

    /// Keep only messages for `fields`.
    pub(crate) fn restricted_to(mut self, fields: &[FieldName]) -> Self {
        self.0.retain(|field, _| fields.contains(field));
        self
    }

    /// Replace the entries for `fields` with whatever `fresh` says about them.
    pub(crate) fn refresh(&mut self, fields: &[FieldName], fresh: &ValidationErrors) {
        for field in fields {
            match fresh.get(*field) {
                Some(message) => self.insert(*field, message),
                None => self.remove(*field),
            }
        }
    }
}

/// Stateless validator applying the configured limits to a record.
#[derive(Debug, Clone, Default)]
pub struct IntakeValidator {
    config: ValidationConfig,
}

impl IntakeValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn validate(&self, record: &ApplicantRecord, today: NaiveDate) -> ValidationErrors {
        let mut errors = rules::check_fields(record, &self.config);
        policy::apply_phone_requirement(record, today, &self.config, &mut errors);
        errors
    }

    /// Whole-record validation narrowed to `fields`.
    pub fn validate_fields(
        &self,
        record: &ApplicantRecord,
        fields: &[FieldName],
        today: NaiveDate,
    ) -> ValidationErrors {
        self.validate(record, today).restricted_to(fields)
    }

    pub fn phone_required(&self, record: &ApplicantRecord, today: NaiveDate) -> bool {
        policy::phone_required(record, today, &self.config)
    }
}
