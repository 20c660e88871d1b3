use super::common::*;
use crate::workflows::intake::domain::{ApplicantRecord, DocumentAttachment, FieldName, Gender};
use crate::workflows::intake::validation::messages::*;
use crate::workflows::intake::validation::{IntakeValidator, ValidationConfig, PERSONAL_FIELDS};

fn validator() -> IntakeValidator {
    IntakeValidator::default()
}

#[test]
fn complete_record_has_no_errors() {
    let errors = validator().validate(&complete_record(), today());
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn empty_record_reports_every_required_field() {
    let errors = validator().validate(&ApplicantRecord::default(), today());

    assert_eq!(errors.get(FieldName::FullNameEn), Some(NAME_REQUIRED));
    assert_eq!(errors.get(FieldName::Gender), Some(GENDER_REQUIRED));
    assert_eq!(errors.get(FieldName::DobAd), Some(DOB_AD_REQUIRED));
    assert_eq!(errors.get(FieldName::DobBs), Some(DOB_BS_REQUIRED));
    assert_eq!(errors.get(FieldName::CitizenshipNo), Some(CITIZENSHIP_NO_REQUIRED));
    assert_eq!(errors.get(FieldName::IssuedDistrict), Some(DISTRICT_INVALID));
    assert_eq!(errors.get(FieldName::IssuedDateAd), Some(ISSUED_AD_REQUIRED));
    assert_eq!(errors.get(FieldName::IssuedDateBs), Some(ISSUED_BS_REQUIRED));
    assert_eq!(errors.get(FieldName::CitizenshipFront), Some(FRONT_REQUIRED));
    assert_eq!(errors.get(FieldName::CitizenshipBack), Some(BACK_REQUIRED));
    assert!(!errors.contains(FieldName::Phone));
    assert!(!errors.contains(FieldName::FullNameNp));
    assert_eq!(errors.len(), 10);
}

#[test]
fn english_name_accepts_letters_and_spaces_only() {
    let mut record = complete_record();

    record.full_name_en = "Ram2 Shrestha".to_string();
    let errors = validator().validate(&record, today());
    assert_eq!(errors.get(FieldName::FullNameEn), Some(NAME_ALPHABETIC));

    record.full_name_en = "   ".to_string();
    let errors = validator().validate(&record, today());
    assert_eq!(errors.get(FieldName::FullNameEn), Some(NAME_REQUIRED));

    record.full_name_en = "Sita Kumari Rai".to_string();
    assert!(validator().validate(&record, today()).is_empty());
}

#[test]
fn malformed_phone_is_rejected_even_when_optional() {
    let mut record = complete_record();
    record.gender = Some(Gender::Female);

    for phone in ["12345", "8812345678", "98123456789", "98123a5678"] {
        record.phone = phone.to_string();
        let errors = validator().validate(&record, today());
        assert_eq!(errors.get(FieldName::Phone), Some(PHONE_FORMAT), "phone {phone}");
    }
}

#[test]
fn non_male_genders_never_require_a_phone() {
    for gender in [Gender::Female, Gender::Other] {
        let mut record = complete_record();
        record.gender = Some(gender);
        record.date_of_birth = dual(date(1960, 5, 1));
        record.phone.clear();

        assert!(!validator().phone_required(&record, today()));
        assert!(validator().validate(&record, today()).is_empty());
    }
}

#[test]
fn phone_requirement_starts_the_day_after_the_eighteenth_birthday() {
    let mut record = complete_record();
    record.phone.clear();

    record.date_of_birth = dual(date(2007, 6, 14));
    assert!(validator().phone_required(&record, today()));
    let errors = validator().validate(&record, today());
    assert_eq!(errors.get(FieldName::Phone), Some(PHONE_REQUIRED));

    record.date_of_birth = dual(date(2007, 6, 15));
    assert!(!validator().phone_required(&record, today()));
    assert!(validator().validate(&record, today()).is_empty());
}

#[test]
fn phone_rule_message_replaces_format_message() {
    let mut record = complete_record();
    record.phone = "12345".to_string();

    let errors = validator().validate(&record, today());
    assert_eq!(errors.get(FieldName::Phone), Some(PHONE_REQUIRED));
}

#[test]
fn minors_without_birth_date_do_not_trigger_phone_rule() {
    let mut record = complete_record();
    record.phone.clear();
    record.date_of_birth = Default::default();

    assert!(!validator().phone_required(&record, today()));
    let errors = validator().validate(&record, today());
    assert!(!errors.contains(FieldName::Phone));
}

#[test]
fn document_size_limit_is_inclusive() {
    let mut record = complete_record();

    record.citizenship_front = Some(png("front.png", 2 * MIB));
    assert!(validator().validate(&record, today()).is_empty());

    record.citizenship_front = Some(png("front.png", 2 * MIB + 1));
    let errors = validator().validate(&record, today());
    assert_eq!(errors.get(FieldName::CitizenshipFront), Some(DOCUMENT_TOO_LARGE));
}

#[test]
fn oversize_check_runs_before_type_check() {
    let mut record = complete_record();
    record.citizenship_back = Some(DocumentAttachment::from_bytes(
        "scan.gif",
        "image/gif",
        vec![0; 3 * MIB],
    ));

    let errors = validator().validate(&record, today());
    assert_eq!(errors.get(FieldName::CitizenshipBack), Some(DOCUMENT_TOO_LARGE));
}

#[test]
fn unsupported_document_types_are_rejected() {
    let mut record = complete_record();
    record.citizenship_front = Some(DocumentAttachment::from_bytes(
        "scan.gif",
        "image/gif",
        vec![0; 10],
    ));
    record.citizenship_back = Some(DocumentAttachment::from_bytes(
        "scan.jpg",
        "image/jpeg",
        vec![0; 10],
    ));

    let errors = validator().validate(&record, today());
    assert_eq!(errors.get(FieldName::CitizenshipFront), Some(DOCUMENT_KIND));
    assert!(!errors.contains(FieldName::CitizenshipBack));
}

#[test]
fn configured_limits_apply() {
    let errors = small_limits().validate(&complete_record(), today());
    assert_eq!(
        errors.get(FieldName::CitizenshipFront),
        Some("Max file size is 16 bytes")
    );
    assert_eq!(
        errors.get(FieldName::CitizenshipBack),
        Some("Max file size is 16 bytes")
    );
}

#[test]
fn oversize_message_follows_the_configured_ceiling() {
    assert_eq!(document_too_large(2 * MIB as u64), DOCUMENT_TOO_LARGE);
    assert_eq!(document_too_large(5 * MIB as u64), "Max file size is 5MB");
    assert_eq!(document_too_large(512 * 1024), "Max file size is 512KB");

    let validator = IntakeValidator::new(ValidationConfig {
        max_document_bytes: MIB as u64,
        ..ValidationConfig::default()
    });
    let mut record = complete_record();
    record.citizenship_front = Some(png("front.png", MIB + 1));
    let errors = validator.validate(&record, today());
    assert_eq!(
        errors.get(FieldName::CitizenshipFront),
        Some("Max file size is 1MB")
    );
}

#[test]
fn district_must_come_from_the_list() {
    let mut record = complete_record();
    record.issued_district = Some("Atlantis".to_string());

    let errors = validator().validate(&record, today());
    assert_eq!(errors.get(FieldName::IssuedDistrict), Some(DISTRICT_INVALID));
}

#[test]
fn validate_fields_narrows_to_the_requested_step() {
    let errors = validator().validate_fields(&ApplicantRecord::default(), &PERSONAL_FIELDS, today());

    assert!(errors.iter().all(|(field, _)| PERSONAL_FIELDS.contains(&field)));
    assert!(errors.contains(FieldName::FullNameEn));
    assert!(!errors.contains(FieldName::CitizenshipFront));
}

#[test]
fn errors_serialize_keyed_by_wire_name() {
    let mut record = complete_record();
    record.phone.clear();
    let errors = validator().validate(&record, today());

    let json = serde_json::to_value(&errors).expect("serializes");
    assert_eq!(json["phone"], PHONE_REQUIRED);
}

#[test]
fn media_type_guess_uses_extension() {
    assert_eq!(DocumentAttachment::guess_media_type("scan.PDF"), "application/pdf");
    assert_eq!(DocumentAttachment::guess_media_type("front.png"), "image/png");
    assert_eq!(DocumentAttachment::guess_media_type("notes"), "");
}
