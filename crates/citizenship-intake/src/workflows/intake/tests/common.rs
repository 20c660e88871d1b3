use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::intake::calendar;
use crate::workflows::intake::domain::{
    ApplicantRecord, DocumentAttachment, DualDate, Gender,
};
use crate::workflows::intake::form::{FieldEdit, IntakeForm};
use crate::workflows::intake::repository::{
    SessionHandle, SessionId, SessionStore, StoreError,
};
use crate::workflows::intake::submission::{SinkError, SubmissionPayload, SubmissionSink};
use crate::workflows::intake::transliteration::Transliterator;
use crate::workflows::intake::validation::{IntakeValidator, ValidationConfig};
use crate::workflows::intake::{intake_router, DocumentSlot, IntakeService};

pub(super) const MIB: usize = 1024 * 1024;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Fixed "today" for age-sensitive assertions.
pub(super) fn today() -> NaiveDate {
    date(2025, 6, 15)
}

pub(super) fn dual(ad: NaiveDate) -> DualDate {
    DualDate {
        ad: Some(ad),
        bs: Some(calendar::to_bs(ad).expect("date inside BS era")),
    }
}

pub(super) fn png(name: &str, size: usize) -> DocumentAttachment {
    DocumentAttachment::from_bytes(name, "image/png", vec![0x89; size])
}

pub(super) fn pdf(name: &str, size: usize) -> DocumentAttachment {
    DocumentAttachment::from_bytes(name, "application/pdf", vec![0x25; size])
}

/// Ram Shrestha, male, 20 on [`today`], every field filled in.
pub(super) fn complete_record() -> ApplicantRecord {
    ApplicantRecord {
        full_name_en: "Ram Shrestha".to_string(),
        full_name_np: "राम श्रेष्ठ".to_string(),
        gender: Some(Gender::Male),
        date_of_birth: dual(date(2005, 1, 10)),
        phone: "9812345678".to_string(),
        citizenship_no: "27-01-75-01234".to_string(),
        issued_district: Some("Kathmandu".to_string()),
        issued_date: dual(date(2023, 3, 1)),
        citizenship_front: Some(png("front.png", 1024)),
        citizenship_back: Some(pdf("back.pdf", 2048)),
    }
}

pub(super) fn personal_edits() -> Vec<FieldEdit> {
    vec![
        FieldEdit::FullNameEn("Ram Shrestha".to_string()),
        FieldEdit::Gender(Gender::Male),
        FieldEdit::DobAd("2005-01-10".to_string()),
    ]
}

pub(super) fn document_edits() -> Vec<FieldEdit> {
    vec![
        FieldEdit::CitizenshipNo("27-01-75-01234".to_string()),
        FieldEdit::IssuedDistrict("Kathmandu".to_string()),
        FieldEdit::IssuedDateAd("2023-03-01".to_string()),
    ]
}

/// A form on the personal step with Ram's details but no phone.
pub(super) fn personal_form() -> IntakeForm {
    let mut form = IntakeForm::default();
    for edit in personal_edits() {
        form.apply(edit, today()).expect("editable");
    }
    form
}

/// A form on the documents step with every field valid.
pub(super) fn documents_form() -> IntakeForm {
    let mut form = personal_form();
    form.apply(FieldEdit::Phone("9812345678".to_string()), today())
        .expect("editable");
    form.continue_to_documents(today())
        .expect("personal step passes");
    for edit in document_edits() {
        form.apply(edit, today()).expect("editable");
    }
    form.attach_document(DocumentSlot::Front, png("front.png", 1024), today())
        .expect("editable");
    form.attach_document(DocumentSlot::Back, pdf("back.pdf", 2048), today())
        .expect("editable");
    form
}

pub(super) fn small_limits() -> IntakeValidator {
    IntakeValidator::new(ValidationConfig {
        max_document_bytes: 16,
        ..ValidationConfig::default()
    })
}

pub(super) type TestService = IntakeService<MemorySessionStore, MemorySink, DictionaryTransliterator>;

pub(super) fn build_service() -> (TestService, Arc<MemorySessionStore>, Arc<MemorySink>) {
    let store = Arc::new(MemorySessionStore::default());
    let sink = Arc::new(MemorySink::default());
    let service = IntakeService::new(
        store.clone(),
        sink.clone(),
        Arc::new(DictionaryTransliterator::default()),
        IntakeValidator::default(),
    )
    .with_clock(today);
    (service, store, sink)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    intake_router(Arc::new(service), 8 * MIB)
}

#[derive(Default, Clone)]
pub(super) struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionHandle>>>,
}

impl MemorySessionStore {
    pub(super) fn len(&self) -> usize {
        self.sessions.lock().expect("store mutex poisoned").len()
    }
}

impl SessionStore for MemorySessionStore {
    fn insert(&self, id: SessionId, session: SessionHandle) -> Result<(), StoreError> {
        let mut guard = self.sessions.lock().expect("store mutex poisoned");
        if guard.contains_key(&id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(id, session);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionHandle>, StoreError> {
        let guard = self.sessions.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<Option<SessionHandle>, StoreError> {
        let mut guard = self.sessions.lock().expect("store mutex poisoned");
        Ok(guard.remove(id))
    }
}

pub(super) struct UnavailableStore;

impl SessionStore for UnavailableStore {
    fn insert(&self, _id: SessionId, _session: SessionHandle) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SessionHandle>, StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    fn remove(&self, _id: &SessionId) -> Result<Option<SessionHandle>, StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemorySink {
    delivered: Arc<Mutex<Vec<SubmissionPayload>>>,
}

impl MemorySink {
    pub(super) fn delivered(&self) -> Vec<SubmissionPayload> {
        self.delivered.lock().expect("sink mutex poisoned").clone()
    }
}

impl SubmissionSink for MemorySink {
    fn deliver(&self, payload: &SubmissionPayload) -> Result<(), SinkError> {
        self.delivered
            .lock()
            .expect("sink mutex poisoned")
            .push(payload.clone());
        Ok(())
    }
}

pub(super) struct FailingSink;

impl SubmissionSink for FailingSink {
    fn deliver(&self, _payload: &SubmissionPayload) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("registry offline".to_string()))
    }
}

/// Answers from a fixed word list and echoes anything else, like the real
/// client does on a miss.
pub(super) struct DictionaryTransliterator {
    words: HashMap<&'static str, &'static str>,
}

impl Default for DictionaryTransliterator {
    fn default() -> Self {
        let words = HashMap::from([("ram", "राम"), ("shrestha", "श्रेष्ठ"), ("sita", "सीता")]);
        Self { words }
    }
}

impl Transliterator for DictionaryTransliterator {
    async fn transliterate(&self, word: &str) -> String {
        self.words
            .get(word)
            .map(|converted| converted.to_string())
            .unwrap_or_else(|| word.to_string())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
