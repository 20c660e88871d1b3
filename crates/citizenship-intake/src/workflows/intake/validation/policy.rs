use chrono::NaiveDate;

use super::super::age::is_older_than;
use super::super::domain::{ApplicantRecord, FieldName, Gender};
use super::config::ValidationConfig;
use super::rules::is_valid_phone;
use super::ValidationErrors;

pub(crate) const PHONE_REQUIRED: &str =
    "Phone is required for Males over 18 (10 digits, starts with 9)";

/// Whether the record, as it stands on `today`, must carry a phone number.
pub(crate) fn phone_required(
    record: &ApplicantRecord,
    today: NaiveDate,
    config: &ValidationConfig,
) -> bool {
    if record.gender != Some(Gender::Male) {
        return false;
    }

    record
        .date_of_birth
        .ad
        .map(|birth| is_older_than(birth, today, config.phone_required_over_age))
        .unwrap_or(false)
}

/// Overrides whatever the field rules said about the phone when the age rule applies.
pub(crate) fn apply_phone_requirement(
    record: &ApplicantRecord,
    today: NaiveDate,
    config: &ValidationConfig,
    errors: &mut ValidationErrors,
) {
    if phone_required(record, today, config) && !is_valid_phone(&record.phone) {
        errors.insert(FieldName::Phone, PHONE_REQUIRED);
    }
}
