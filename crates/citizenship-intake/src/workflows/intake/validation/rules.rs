use std::sync::OnceLock;

use regex::Regex;

use super::super::districts::is_known_district;
use super::super::domain::{ApplicantRecord, DocumentAttachment, DocumentSlot, FieldName};
use super::config::ValidationConfig;
use super::ValidationErrors;

pub(crate) const NAME_REQUIRED: &str = "Full Name (English) is required";
pub(crate) const NAME_ALPHABETIC: &str = "Only alphabets allowed";
pub(crate) const GENDER_REQUIRED: &str = "Gender is required";
pub(crate) const DOB_AD_REQUIRED: &str = "Date of Birth (AD) is required";
pub(crate) const DOB_BS_REQUIRED: &str = "Date of Birth (BS) is required";
pub(crate) const PHONE_FORMAT: &str = "Phone must be 10 digits and start with 9";
pub(crate) const CITIZENSHIP_NO_REQUIRED: &str = "Citizenship number is required";
pub(crate) const DISTRICT_INVALID: &str = "Select a valid district";
pub(crate) const ISSUED_AD_REQUIRED: &str = "Issued Date (AD) is required";
pub(crate) const ISSUED_BS_REQUIRED: &str = "Issued Date (BS) is required";
pub(crate) const FRONT_REQUIRED: &str = "Front image is required";
pub(crate) const BACK_REQUIRED: &str = "Back image is required";
pub(crate) const DOCUMENT_TOO_LARGE: &str = "Max file size is 2MB";
pub(crate) const DOCUMENT_KIND: &str = "Only .jpg, .png, and .pdf allowed";

/// Oversize message for the configured ceiling; the default 2 MiB reads
/// as [`DOCUMENT_TOO_LARGE`].
pub(crate) fn document_too_large(max_bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    match max_bytes {
        0 => "Max file size is 0 bytes".to_string(),
        bytes if bytes % MIB == 0 => format!("Max file size is {}MB", bytes / MIB),
        bytes if bytes % KIB == 0 => format!("Max file size is {}KB", bytes / KIB),
        bytes => format!("Max file size is {bytes} bytes"),
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z\s]+$").expect("name pattern compiles"))
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^9[0-9]{9}$").expect("phone pattern compiles"))
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    phone_pattern().is_match(phone.trim())
}

/// Field-level rules only. The age-gated phone requirement runs afterwards.
pub(crate) fn check_fields(record: &ApplicantRecord, config: &ValidationConfig) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    let name = record.full_name_en.trim();
    if name.is_empty() {
        errors.insert(FieldName::FullNameEn, NAME_REQUIRED);
    } else if !name_pattern().is_match(name) {
        errors.insert(FieldName::FullNameEn, NAME_ALPHABETIC);
    }

    if record.gender.is_none() {
        errors.insert(FieldName::Gender, GENDER_REQUIRED);
    }

    if record.date_of_birth.ad.is_none() {
        errors.insert(FieldName::DobAd, DOB_AD_REQUIRED);
    }
    if record.date_of_birth.bs.is_none() {
        errors.insert(FieldName::DobBs, DOB_BS_REQUIRED);
    }

    let phone = record.phone.trim();
    if !phone.is_empty() && !is_valid_phone(phone) {
        errors.insert(FieldName::Phone, PHONE_FORMAT);
    }

    if record.citizenship_no.trim().is_empty() {
        errors.insert(FieldName::CitizenshipNo, CITIZENSHIP_NO_REQUIRED);
    }

    let district_known = record
        .issued_district
        .as_deref()
        .map(is_known_district)
        .unwrap_or(false);
    if !district_known {
        errors.insert(FieldName::IssuedDistrict, DISTRICT_INVALID);
    }

    if record.issued_date.ad.is_none() {
        errors.insert(FieldName::IssuedDateAd, ISSUED_AD_REQUIRED);
    }
    if record.issued_date.bs.is_none() {
        errors.insert(FieldName::IssuedDateBs, ISSUED_BS_REQUIRED);
    }

    for slot in [DocumentSlot::Front, DocumentSlot::Back] {
        if let Some(message) = check_document(record.document(slot), slot, config) {
            errors.insert(slot.field(), message);
        }
    }

    errors
}

fn check_document(
    attachment: Option<&DocumentAttachment>,
    slot: DocumentSlot,
    config: &ValidationConfig,
) -> Option<String> {
    let Some(attachment) = attachment else {
        let missing = match slot {
            DocumentSlot::Front => FRONT_REQUIRED,
            DocumentSlot::Back => BACK_REQUIRED,
        };
        return Some(missing.to_string());
    };

    if attachment.size_bytes > config.max_document_bytes {
        return Some(document_too_large(config.max_document_bytes));
    }
    if attachment.kind().is_none() {
        return Some(DOCUMENT_KIND.to_string());
    }
    None
}
