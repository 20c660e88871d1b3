use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::BsDate;

/// Gender options offered on the personal details step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

/// Every field the applicant can edit, with the names used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldName {
    #[serde(rename = "fullNameEn")]
    FullNameEn,
    #[serde(rename = "fullNameNp")]
    FullNameNp,
    #[serde(rename = "gender")]
    Gender,
    #[serde(rename = "dobAD")]
    DobAd,
    #[serde(rename = "dobBS")]
    DobBs,
    #[serde(rename = "phone")]
    Phone,
    #[serde(rename = "citizenshipNo")]
    CitizenshipNo,
    #[serde(rename = "issuedDistrict")]
    IssuedDistrict,
    #[serde(rename = "issuedDateAD")]
    IssuedDateAd,
    #[serde(rename = "issuedDateBS")]
    IssuedDateBs,
    #[serde(rename = "citizenshipFront")]
    CitizenshipFront,
    #[serde(rename = "citizenshipBack")]
    CitizenshipBack,
}

impl FieldName {
    pub const ALL: [FieldName; 12] = [
        FieldName::FullNameEn,
        FieldName::FullNameNp,
        FieldName::Gender,
        FieldName::DobAd,
        FieldName::DobBs,
        FieldName::Phone,
        FieldName::CitizenshipNo,
        FieldName::IssuedDistrict,
        FieldName::IssuedDateAd,
        FieldName::IssuedDateBs,
        FieldName::CitizenshipFront,
        FieldName::CitizenshipBack,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            FieldName::FullNameEn => "fullNameEn",
            FieldName::FullNameNp => "fullNameNp",
            FieldName::Gender => "gender",
            FieldName::DobAd => "dobAD",
            FieldName::DobBs => "dobBS",
            FieldName::Phone => "phone",
            FieldName::CitizenshipNo => "citizenshipNo",
            FieldName::IssuedDistrict => "issuedDistrict",
            FieldName::IssuedDateAd => "issuedDateAD",
            FieldName::IssuedDateBs => "issuedDateBS",
            FieldName::CitizenshipFront => "citizenshipFront",
            FieldName::CitizenshipBack => "citizenshipBack",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two date fields that carry both calendar representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateField {
    Birth,
    Issued,
}

impl DateField {
    pub const fn ad_field(self) -> FieldName {
        match self {
            DateField::Birth => FieldName::DobAd,
            DateField::Issued => FieldName::IssuedDateAd,
        }
    }

    pub const fn bs_field(self) -> FieldName {
        match self {
            DateField::Birth => FieldName::DobBs,
            DateField::Issued => FieldName::IssuedDateBs,
        }
    }
}

/// A calendar day held in both Gregorian and Bikram-Sambat form.
///
/// Both halves are written together by the form controller, so either both are
/// present and denote the same day, or both are empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualDate {
    pub ad: Option<NaiveDate>,
    pub bs: Option<BsDate>,
}

/// Front or back side of the citizenship certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSlot {
    Front,
    Back,
}

impl DocumentSlot {
    pub const fn field(self) -> FieldName {
        match self {
            DocumentSlot::Front => FieldName::CitizenshipFront,
            DocumentSlot::Back => FieldName::CitizenshipBack,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DocumentSlot::Front => "front",
            DocumentSlot::Back => "back",
        }
    }
}

/// Content kinds accepted for certificate scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Jpeg,
    Png,
    Pdf,
}

impl DocumentKind {
    /// Classify a declared media type. Parameters such as `; charset=` are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let parsed: mime::Mime = media_type.trim().parse().ok()?;
        match parsed.essence_str() {
            "image/jpeg" => Some(DocumentKind::Jpeg),
            "image/png" => Some(DocumentKind::Png),
            "application/pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }
}

/// Where the attachment bytes live until submission encodes them.
#[derive(Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Memory(Vec<u8>),
    File(PathBuf),
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            DocumentSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// A file chosen by the applicant for one of the certificate slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentAttachment {
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: u64,
    pub source: DocumentSource,
}

impl DocumentAttachment {
    pub fn from_bytes(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            size_bytes: bytes.len() as u64,
            source: DocumentSource::Memory(bytes),
        }
    }

    /// Reference a file on disk. The size is captured now; the contents are read
    /// only when the attachment is encoded.
    pub async fn from_path(
        path: impl Into<PathBuf>,
        media_type: impl Into<String>,
    ) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file_name,
            media_type: media_type.into(),
            size_bytes: metadata.len(),
            source: DocumentSource::File(path),
        })
    }

    /// Best guess at a media type from a file name's extension, empty when
    /// the extension is unknown.
    pub fn guess_media_type(file_name: &str) -> String {
        mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or_default()
            .to_string()
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_media_type(&self.media_type)
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            file_name: self.file_name.clone(),
            media_type: self.media_type.clone(),
            size_bytes: self.size_bytes,
        }
    }
}

/// Attachment metadata safe to echo back to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: u64,
}

/// The single mutable entity behind one form session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicantRecord {
    pub full_name_en: String,
    pub full_name_np: String,
    pub gender: Option<Gender>,
    pub date_of_birth: DualDate,
    pub phone: String,
    pub citizenship_no: String,
    pub issued_district: Option<String>,
    pub issued_date: DualDate,
    pub citizenship_front: Option<DocumentAttachment>,
    pub citizenship_back: Option<DocumentAttachment>,
}

impl ApplicantRecord {
    pub fn date(&self, field: DateField) -> &DualDate {
        match field {
            DateField::Birth => &self.date_of_birth,
            DateField::Issued => &self.issued_date,
        }
    }

    pub(crate) fn date_mut(&mut self, field: DateField) -> &mut DualDate {
        match field {
            DateField::Birth => &mut self.date_of_birth,
            DateField::Issued => &mut self.issued_date,
        }
    }

    pub fn document(&self, slot: DocumentSlot) -> Option<&DocumentAttachment> {
        match slot {
            DocumentSlot::Front => self.citizenship_front.as_ref(),
            DocumentSlot::Back => self.citizenship_back.as_ref(),
        }
    }

    pub(crate) fn document_mut(&mut self, slot: DocumentSlot) -> &mut Option<DocumentAttachment> {
        match slot {
            DocumentSlot::Front => &mut self.citizenship_front,
            DocumentSlot::Back => &mut self.citizenship_back,
        }
    }

    pub fn view(&self) -> RecordView {
        RecordView {
            full_name_en: self.full_name_en.clone(),
            full_name_np: self.full_name_np.clone(),
            gender: self.gender,
            dob_ad: self.date_of_birth.ad,
            dob_bs: self.date_of_birth.bs,
            phone: self.phone.clone(),
            citizenship_no: self.citizenship_no.clone(),
            issued_district: self.issued_district.clone(),
            issued_date_ad: self.issued_date.ad,
            issued_date_bs: self.issued_date.bs,
            citizenship_front: self.citizenship_front.as_ref().map(DocumentAttachment::summary),
            citizenship_back: self.citizenship_back.as_ref().map(DocumentAttachment::summary),
        }
    }
}

/// Serializable snapshot of the record with attachments reduced to metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    #[serde(rename = "fullNameEn")]
    pub full_name_en: String,
    #[serde(rename = "fullNameNp")]
    pub full_name_np: String,
    pub gender: Option<Gender>,
    #[serde(rename = "dobAD")]
    pub dob_ad: Option<NaiveDate>,
    #[serde(rename = "dobBS")]
    pub dob_bs: Option<BsDate>,
    pub phone: String,
    #[serde(rename = "citizenshipNo")]
    pub citizenship_no: String,
    #[serde(rename = "issuedDistrict")]
    pub issued_district: Option<String>,
    #[serde(rename = "issuedDateAD")]
    pub issued_date_ad: Option<NaiveDate>,
    #[serde(rename = "issuedDateBS")]
    pub issued_date_bs: Option<BsDate>,
    #[serde(rename = "citizenshipFront")]
    pub citizenship_front: Option<DocumentSummary>,
    #[serde(rename = "citizenshipBack")]
    pub citizenship_back: Option<DocumentSummary>,
}
