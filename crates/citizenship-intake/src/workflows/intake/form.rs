//! Two-step form controller.
//!
//! The controller owns the [`ApplicantRecord`] and is the only thing that
//! mutates it. Every edit reports which fields changed, date edits recompute
//! their counterpart representation, and validation re-runs for the edited
//! fields plus anything whose validity depends on them.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::age::age_in_years;
use super::calendar::{self, BsDate, CalendarError};
use super::domain::{
    ApplicantRecord, DateField, DocumentAttachment, DocumentSlot, DualDate, FieldName, Gender,
};
use super::encoding::{self, DocumentPreview, EncodingError};
use super::submission::{SinkError, SubmissionPayload, SubmissionSink};
use super::transliteration::TransliterationRequest;
use super::validation::{IntakeValidator, ValidationErrors, PERSONAL_FIELDS};

/// Fields whose validity is recomputed when the key field changes.
const VALIDITY_DEPENDENTS: &[(FieldName, &[FieldName])] = &[
    (FieldName::Gender, &[FieldName::Phone]),
    (FieldName::DobAd, &[FieldName::Phone]),
    (FieldName::DobBs, &[FieldName::Phone]),
];

/// Fields fed by the word-boundary transliteration flow.
const TRANSLITERATED_FIELDS: &[FieldName] = &[FieldName::FullNameNp];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    Personal,
    Documents,
    Submitted,
}

impl FormStep {
    pub const fn label(self) -> &'static str {
        match self {
            FormStep::Personal => "personal",
            FormStep::Documents => "documents",
            FormStep::Submitted => "submitted",
        }
    }
}

/// One user edit, addressed by wire field name.
///
/// Date variants carry the raw text typed into the input; the controller parses
/// and converts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value")]
pub enum FieldEdit {
    #[serde(rename = "fullNameEn")]
    FullNameEn(String),
    #[serde(rename = "fullNameNp")]
    FullNameNp(String),
    #[serde(rename = "gender")]
    Gender(Gender),
    #[serde(rename = "dobAD")]
    DobAd(String),
    #[serde(rename = "dobBS")]
    DobBs(String),
    #[serde(rename = "phone")]
    Phone(String),
    #[serde(rename = "citizenshipNo")]
    CitizenshipNo(String),
    #[serde(rename = "issuedDistrict")]
    IssuedDistrict(String),
    #[serde(rename = "issuedDateAD")]
    IssuedDateAd(String),
    #[serde(rename = "issuedDateBS")]
    IssuedDateBs(String),
}

impl FieldEdit {
    pub fn field(&self) -> FieldName {
        match self {
            FieldEdit::FullNameEn(_) => FieldName::FullNameEn,
            FieldEdit::FullNameNp(_) => FieldName::FullNameNp,
            FieldEdit::Gender(_) => FieldName::Gender,
            FieldEdit::DobAd(_) => FieldName::DobAd,
            FieldEdit::DobBs(_) => FieldName::DobBs,
            FieldEdit::Phone(_) => FieldName::Phone,
            FieldEdit::CitizenshipNo(_) => FieldName::CitizenshipNo,
            FieldEdit::IssuedDistrict(_) => FieldName::IssuedDistrict,
            FieldEdit::IssuedDateAd(_) => FieldName::IssuedDateAd,
            FieldEdit::IssuedDateBs(_) => FieldName::IssuedDateBs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EditOutcome {
    Applied { changed: Vec<FieldName> },
    /// The edit could not be converted; the record is unchanged.
    Ignored { field: FieldName, reason: String },
}

/// Result of a word-boundary keystroke in a transliterated field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordBoundary {
    /// No word to convert; the space was appended directly.
    Appended,
    Pending(TransliterationRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("the application has already been submitted")]
    AlreadySubmitted,
    #[error("{0} does not accept transliterated input")]
    NotTransliterable(FieldName),
}

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("cannot {action} from the {} step", .from.label())]
    WrongStep { action: &'static str, from: FormStep },
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(ValidationErrors),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("record is missing {0} after validation")]
    Incomplete(FieldName),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// The form session state machine.
#[derive(Debug, Clone)]
pub struct IntakeForm {
    record: ApplicantRecord,
    step: FormStep,
    errors: ValidationErrors,
    touched: BTreeSet<FieldName>,
    validator: IntakeValidator,
    generations: HashMap<FieldName, u64>,
}

impl Default for IntakeForm {
    fn default() -> Self {
        Self::new(IntakeValidator::default())
    }
}

impl IntakeForm {
    pub fn new(validator: IntakeValidator) -> Self {
        Self {
            record: ApplicantRecord::default(),
            step: FormStep::Personal,
            errors: ValidationErrors::default(),
            touched: BTreeSet::new(),
            validator,
            generations: HashMap::new(),
        }
    }

    pub fn record(&self) -> &ApplicantRecord {
        &self.record
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    /// Messages currently shown next to fields.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn age(&self, today: NaiveDate) -> Option<u32> {
        self.record
            .date_of_birth
            .ad
            .map(|birth| age_in_years(birth, today))
    }

    pub fn phone_required(&self, today: NaiveDate) -> bool {
        self.validator.phone_required(&self.record, today)
    }

    pub fn apply(&mut self, edit: FieldEdit, today: NaiveDate) -> Result<EditOutcome, FormError> {
        self.ensure_editable()?;
        let field = edit.field();

        let changed = match edit {
            FieldEdit::FullNameEn(value) => {
                self.record.full_name_en = value;
                vec![field]
            }
            FieldEdit::FullNameNp(value) => {
                // A direct edit is newer than any lookup still in flight.
                self.next_generation(field);
                self.record.full_name_np = value;
                vec![field]
            }
            FieldEdit::Gender(gender) => {
                self.record.gender = Some(gender);
                vec![field]
            }
            FieldEdit::Phone(value) => {
                self.record.phone = value;
                vec![field]
            }
            FieldEdit::CitizenshipNo(value) => {
                self.record.citizenship_no = value;
                vec![field]
            }
            FieldEdit::IssuedDistrict(value) => {
                self.record.issued_district = Some(value);
                vec![field]
            }
            FieldEdit::DobAd(raw) => {
                return Ok(self.edit_date(DateField::Birth, field, &raw, today, from_ad));
            }
            FieldEdit::DobBs(raw) => {
                return Ok(self.edit_date(DateField::Birth, field, &raw, today, from_bs));
            }
            FieldEdit::IssuedDateAd(raw) => {
                return Ok(self.edit_date(DateField::Issued, field, &raw, today, from_ad));
            }
            FieldEdit::IssuedDateBs(raw) => {
                return Ok(self.edit_date(DateField::Issued, field, &raw, today, from_bs));
            }
        };

        self.revalidate(&changed, today);
        Ok(EditOutcome::Applied { changed })
    }

    fn edit_date(
        &mut self,
        date_field: DateField,
        field: FieldName,
        raw: &str,
        today: NaiveDate,
        convert: fn(&str) -> Result<DualDate, CalendarError>,
    ) -> EditOutcome {
        match convert(raw) {
            Ok(converted) => {
                *self.record.date_mut(date_field) = converted;
                let changed = vec![date_field.ad_field(), date_field.bs_field()];
                self.touched.extend(changed.iter().copied());
                self.revalidate(&changed, today);
                EditOutcome::Applied { changed }
            }
            Err(err) => {
                debug!(%field, input = raw, error = %err, "date conversion failed; keeping prior value");
                EditOutcome::Ignored {
                    field,
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn attach_document(
        &mut self,
        slot: DocumentSlot,
        attachment: DocumentAttachment,
        today: NaiveDate,
    ) -> Result<EditOutcome, FormError> {
        self.ensure_editable()?;
        let field = slot.field();
        debug!(
            slot = slot.label(),
            file_name = %attachment.file_name,
            size_bytes = attachment.size_bytes,
            "document attached"
        );
        *self.record.document_mut(slot) = Some(attachment);
        self.touched.insert(field);
        self.revalidate(&[field], today);
        Ok(EditOutcome::Applied {
            changed: vec![field],
        })
    }

    /// Mark a field as visited and refresh its message.
    pub fn blur(&mut self, field: FieldName, today: NaiveDate) -> Option<&str> {
        self.touched.insert(field);
        self.revalidate(&[field], today);
        self.errors.get(field)
    }

    pub fn continue_to_documents(&mut self, today: NaiveDate) -> Result<(), StepError> {
        if self.step != FormStep::Personal {
            return Err(StepError::WrongStep {
                action: "continue to documents",
                from: self.step,
            });
        }

        self.touched.extend(PERSONAL_FIELDS);
        let fresh = self
            .validator
            .validate_fields(&self.record, &PERSONAL_FIELDS, today);
        self.errors.refresh(&PERSONAL_FIELDS, &fresh);

        if !fresh.is_empty() {
            info!(failing = fresh.len(), "personal details step blocked");
            return Err(StepError::Invalid(fresh));
        }

        self.step = FormStep::Documents;
        info!("advanced to documents step");
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), StepError> {
        if self.step != FormStep::Documents {
            return Err(StepError::WrongStep {
                action: "go back",
                from: self.step,
            });
        }
        self.step = FormStep::Personal;
        Ok(())
    }

    /// Handle a space typed into a transliterated field whose text is `text`.
    ///
    /// The last word becomes a request stamped with a fresh generation; any
    /// earlier request for the field is superseded.
    pub fn begin_transliteration(
        &mut self,
        field: FieldName,
        text: &str,
    ) -> Result<WordBoundary, FormError> {
        self.ensure_editable()?;
        if !TRANSLITERATED_FIELDS.contains(&field) {
            return Err(FormError::NotTransliterable(field));
        }

        let (prefix, word) = match text.rfind(' ') {
            Some(index) => text.split_at(index + 1),
            None => ("", text),
        };
        let generation = self.next_generation(field);

        if word.is_empty() {
            self.record.full_name_np = format!("{text} ");
            return Ok(WordBoundary::Appended);
        }

        self.record.full_name_np = text.to_string();
        Ok(WordBoundary::Pending(TransliterationRequest {
            field,
            generation,
            prefix: prefix.to_string(),
            word: word.to_string(),
        }))
    }

    /// Apply a finished lookup if it is still the newest for its field.
    pub fn complete_transliteration(
        &mut self,
        request: &TransliterationRequest,
        converted: &str,
    ) -> bool {
        if self.step == FormStep::Submitted {
            return false;
        }
        if self.generations.get(&request.field) != Some(&request.generation) {
            debug!(
                field = %request.field,
                generation = request.generation,
                "discarding superseded transliteration"
            );
            return false;
        }

        self.record.full_name_np = request.completed_text(converted);
        true
    }

    pub async fn preview(
        &self,
        slot: DocumentSlot,
    ) -> Result<Option<DocumentPreview>, EncodingError> {
        match self.record.document(slot) {
            Some(attachment) => encoding::preview(attachment).await.map(Some),
            None => Ok(None),
        }
    }

    /// Validate everything, encode both scans, and hand the payload to `sink`.
    pub async fn submit<S>(
        &mut self,
        today: NaiveDate,
        sink: &S,
    ) -> Result<SubmissionPayload, SubmitError>
    where
        S: SubmissionSink + ?Sized,
    {
        if self.step != FormStep::Documents {
            return Err(StepError::WrongStep {
                action: "submit",
                from: self.step,
            }
            .into());
        }

        self.touched.extend(FieldName::ALL);
        let errors = self.validator.validate(&self.record, today);
        self.errors = errors.clone();
        if !errors.is_empty() {
            info!(failing = errors.len(), "submission blocked by validation");
            return Err(StepError::Invalid(errors).into());
        }

        let front = self.encoded(DocumentSlot::Front).await?;
        let back = self.encoded(DocumentSlot::Back).await?;
        let payload =
            SubmissionPayload::assemble(&self.record, front, back).map_err(SubmitError::Incomplete)?;

        sink.deliver(&payload)?;
        self.step = FormStep::Submitted;
        info!(citizenship_no = %payload.citizenship_no, "application handed to submission sink");
        Ok(payload)
    }

    async fn encoded(&self, slot: DocumentSlot) -> Result<String, SubmitError> {
        let attachment = self
            .record
            .document(slot)
            .ok_or(SubmitError::Incomplete(slot.field()))?;
        encoding::encode(attachment).await.map_err(|err| {
            warn!(slot = slot.label(), error = %err, "document encoding failed");
            SubmitError::from(err)
        })
    }

    fn ensure_editable(&self) -> Result<(), FormError> {
        if self.step == FormStep::Submitted {
            return Err(FormError::AlreadySubmitted);
        }
        Ok(())
    }

    fn next_generation(&mut self, field: FieldName) -> u64 {
        let generation = self.generations.entry(field).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Re-run validation for `changed` and their dependents, touched fields only.
    fn revalidate(&mut self, changed: &[FieldName], today: NaiveDate) {
        let mut targets: BTreeSet<FieldName> = changed.iter().copied().collect();
        for (source, dependents) in VALIDITY_DEPENDENTS {
            if changed.contains(source) {
                targets.extend(dependents.iter().copied());
            }
        }
        let targets: Vec<FieldName> = targets
            .into_iter()
            .filter(|field| self.touched.contains(field))
            .collect();
        if targets.is_empty() {
            return;
        }

        let fresh = self.validator.validate(&self.record, today);
        self.errors.refresh(&targets, &fresh);
    }
}

fn from_ad(raw: &str) -> Result<DualDate, CalendarError> {
    let ad = calendar::parse_ad(raw)?;
    let bs = calendar::to_bs(ad)?;
    Ok(DualDate {
        ad: Some(ad),
        bs: Some(bs),
    })
}

fn from_bs(raw: &str) -> Result<DualDate, CalendarError> {
    let bs: BsDate = raw.parse()?;
    let ad = calendar::to_ad(bs)?;
    Ok(DualDate {
        ad: Some(ad),
        bs: Some(bs),
    })
}
