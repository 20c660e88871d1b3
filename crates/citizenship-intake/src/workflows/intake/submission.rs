use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::calendar::BsDate;
use super::domain::{ApplicantRecord, DualDate, FieldName, Gender};

/// The finalized application with both scans inlined as data URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(rename = "fullNameEn")]
    pub full_name_en: String,
    #[serde(rename = "fullNameNp", skip_serializing_if = "Option::is_none")]
    pub full_name_np: Option<String>,
    pub gender: Gender,
    #[serde(rename = "dobAD")]
    pub dob_ad: NaiveDate,
    #[serde(rename = "dobBS")]
    pub dob_bs: BsDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "citizenshipNo")]
    pub citizenship_no: String,
    #[serde(rename = "issuedDistrict")]
    pub issued_district: String,
    #[serde(rename = "issuedDateAD")]
    pub issued_date_ad: NaiveDate,
    #[serde(rename = "issuedDateBS")]
    pub issued_date_bs: BsDate,
    #[serde(rename = "citizenshipFront")]
    pub citizenship_front: String,
    #[serde(rename = "citizenshipBack")]
    pub citizenship_back: String,
}

impl SubmissionPayload {
    /// Assemble from a record that already passed validation.
    pub fn assemble(
        record: &ApplicantRecord,
        citizenship_front: String,
        citizenship_back: String,
    ) -> Result<Self, FieldName> {
        let (dob_ad, dob_bs) = both_halves(&record.date_of_birth, FieldName::DobAd, FieldName::DobBs)?;
        let (issued_date_ad, issued_date_bs) =
            both_halves(&record.issued_date, FieldName::IssuedDateAd, FieldName::IssuedDateBs)?;

        Ok(Self {
            full_name_en: record.full_name_en.trim().to_string(),
            full_name_np: non_empty(&record.full_name_np),
            gender: record.gender.ok_or(FieldName::Gender)?,
            dob_ad,
            dob_bs,
            phone: non_empty(&record.phone),
            citizenship_no: record.citizenship_no.trim().to_string(),
            issued_district: record
                .issued_district
                .clone()
                .ok_or(FieldName::IssuedDistrict)?,
            issued_date_ad,
            issued_date_bs,
            citizenship_front,
            citizenship_back,
        })
    }
}

fn both_halves(
    date: &DualDate,
    ad_field: FieldName,
    bs_field: FieldName,
) -> Result<(NaiveDate, BsDate), FieldName> {
    Ok((date.ad.ok_or(ad_field)?, date.bs.ok_or(bs_field)?))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Receives finalized applications.
pub trait SubmissionSink: Send + Sync {
    fn deliver(&self, payload: &SubmissionPayload) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("submission sink unavailable: {0}")]
    Unavailable(String),
    #[error("payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Default sink: records the submission in the log and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl SubmissionSink for LoggingSink {
    fn deliver(&self, payload: &SubmissionPayload) -> Result<(), SinkError> {
        let encoded = serde_json::to_string(payload)?;
        info!(
            citizenship_no = %payload.citizenship_no,
            district = %payload.issued_district,
            payload_bytes = encoded.len(),
            "application submitted"
        );
        Ok(())
    }
}
