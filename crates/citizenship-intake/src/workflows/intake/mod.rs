//! Citizenship application intake: dual-calendar dates, field validation with
//! the age-gated phone rule, native-script name entry, document encoding, and
//! the two-step form that ties them together.

pub mod age;
pub mod calendar;
pub mod districts;
pub mod domain;
pub mod encoding;
pub mod form;
pub mod repository;
pub mod router;
pub mod service;
pub mod submission;
pub mod transliteration;
pub mod validation;

#[cfg(test)]
mod tests;

pub use age::{age_in_years, is_older_than};
pub use calendar::{BsDate, CalendarError};
pub use districts::{is_known_district, NEPALI_DISTRICTS};
pub use domain::{
    ApplicantRecord, DateField, DocumentAttachment, DocumentKind, DocumentSlot, DocumentSource,
    DocumentSummary, DualDate, FieldName, Gender, RecordView,
};
pub use encoding::{DocumentPreview, EncodingError, PreviewKind};
pub use form::{
    EditOutcome, FieldEdit, FormError, FormStep, IntakeForm, StepError, SubmitError, WordBoundary,
};
pub use repository::{SessionHandle, SessionId, SessionStore, StoreError};
pub use router::intake_router;
pub use service::{Clock, EditResponse, IntakeService, IntakeServiceError, SessionView};
pub use submission::{LoggingSink, SinkError, SubmissionPayload, SubmissionSink};
pub use transliteration::{
    GoogleInputTools, TransliterationRequest, TransliterationTasks,
    Transliterator,
};
pub use validation::{IntakeValidator, ValidationConfig, ValidationErrors};
