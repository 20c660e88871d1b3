use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::domain::{DocumentAttachment, DocumentSlot, FieldName, RecordView};
use super::encoding::{DocumentPreview, EncodingError};
use super::form::{
    EditOutcome, FieldEdit, FormError, FormStep, IntakeForm, StepError, SubmitError, WordBoundary,
};
use super::repository::{SessionHandle, SessionId, SessionStore, StoreError};
use super::submission::{SubmissionPayload, SubmissionSink};
use super::transliteration::{TransliterationTasks, Transliterator};
use super::validation::{IntakeValidator, ValidationErrors};

/// Service composing the session store, validator, transliterator, and
/// submission sink behind the form controller.
pub struct IntakeService<S, K, T> {
    store: Arc<S>,
    sink: Arc<K>,
    lookups: TransliterationTasks<T, (SessionId, FieldName)>,
    validator: IntakeValidator,
    clock: Clock,
}

/// Source of "today" for age checks.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("intake-{id:06}"))
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Client-facing snapshot of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: SessionId,
    pub step: FormStep,
    pub record: RecordView,
    pub errors: ValidationErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    pub phone_required: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    #[serde(flatten)]
    pub outcome: EditOutcome,
    pub session: SessionView,
}

impl<S, K, T> IntakeService<S, K, T>
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    pub fn new(
        store: Arc<S>,
        sink: Arc<K>,
        transliterator: Arc<T>,
        validator: IntakeValidator,
    ) -> Self {
        Self {
            store,
            sink,
            lookups: TransliterationTasks::new(transliterator),
            validator,
            clock: Arc::new(local_today),
        }
    }

    /// Replace the source of "today" used for age checks.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    pub async fn create(&self) -> Result<SessionView, IntakeServiceError> {
        let id = next_session_id();
        let form = IntakeForm::new(self.validator.clone());
        let view = self.view_of(&id, &form);
        self.store.insert(id.clone(), Arc::new(Mutex::new(form)))?;
        info!(session = %id, "intake session opened");
        Ok(view)
    }

    pub async fn get(&self, id: &SessionId) -> Result<SessionView, IntakeServiceError> {
        let session = self.session(id)?;
        let form = session.lock().await;
        Ok(self.view_of(id, &form))
    }

    pub async fn apply(
        &self,
        id: &SessionId,
        edit: FieldEdit,
    ) -> Result<EditResponse, IntakeServiceError> {
        let session = self.session(id)?;
        let mut form = session.lock().await;
        let outcome = form.apply(edit, self.today())?;
        Ok(EditResponse {
            outcome,
            session: self.view_of(id, &form),
        })
    }

    pub async fn blur(
        &self,
        id: &SessionId,
        field: FieldName,
    ) -> Result<SessionView, IntakeServiceError> {
        let session = self.session(id)?;
        let mut form = session.lock().await;
        form.blur(field, self.today());
        Ok(self.view_of(id, &form))
    }

    /// Handle a word boundary in `field`. The lookup runs as a background task
    /// without holding the session lock. A newer boundary on the same field
    /// aborts it, and a result lands only if no newer event touched the field.
    pub async fn transliterate(
        &self,
        id: &SessionId,
        field: FieldName,
        text: &str,
    ) -> Result<SessionView, IntakeServiceError> {
        let session = self.session(id)?;

        let request = {
            let mut form = session.lock().await;
            match form.begin_transliteration(field, text)? {
                WordBoundary::Appended => return Ok(self.view_of(id, &form)),
                WordBoundary::Pending(request) => request,
            }
        };

        let Some(converted) = self.lookups.run((id.clone(), field), &request).await else {
            debug!(session = %id, %field, "transliteration superseded while in flight");
            let form = session.lock().await;
            return Ok(self.view_of(id, &form));
        };

        let mut form = session.lock().await;
        if !form.complete_transliteration(&request, &converted) {
            debug!(session = %id, %field, "transliteration superseded before it landed");
        }
        Ok(self.view_of(id, &form))
    }

    pub async fn attach(
        &self,
        id: &SessionId,
        slot: DocumentSlot,
        attachment: DocumentAttachment,
    ) -> Result<SessionView, IntakeServiceError> {
        let session = self.session(id)?;
        let mut form = session.lock().await;
        form.attach_document(slot, attachment, self.today())?;
        Ok(self.view_of(id, &form))
    }

    pub async fn preview(
        &self,
        id: &SessionId,
        slot: DocumentSlot,
    ) -> Result<DocumentPreview, IntakeServiceError> {
        let session = self.session(id)?;
        let form = session.lock().await;
        form.preview(slot)
            .await?
            .ok_or(IntakeServiceError::MissingDocument(slot))
    }

    pub async fn continue_to_documents(
        &self,
        id: &SessionId,
    ) -> Result<SessionView, IntakeServiceError> {
        let session = self.session(id)?;
        let mut form = session.lock().await;
        form.continue_to_documents(self.today())?;
        Ok(self.view_of(id, &form))
    }

    pub async fn back(&self, id: &SessionId) -> Result<SessionView, IntakeServiceError> {
        let session = self.session(id)?;
        let mut form = session.lock().await;
        form.back()?;
        Ok(self.view_of(id, &form))
    }

    /// Submit the session and forget it once the sink accepts the payload.
    pub async fn submit(&self, id: &SessionId) -> Result<SubmissionPayload, IntakeServiceError> {
        let session = self.session(id)?;
        let payload = {
            let mut form = session.lock().await;
            form.submit(self.today(), self.sink.as_ref()).await?
        };
        self.store.remove(id)?;
        info!(session = %id, "intake session closed after submission");
        Ok(payload)
    }

    fn session(&self, id: &SessionId) -> Result<SessionHandle, IntakeServiceError> {
        let session = self.store.fetch(id)?.ok_or(StoreError::NotFound)?;
        Ok(session)
    }

    fn view_of(&self, id: &SessionId, form: &IntakeForm) -> SessionView {
        let today = self.today();
        SessionView {
            session_id: id.clone(),
            step: form.step(),
            record: form.record().view(),
            errors: form.errors().clone(),
            age: form.age(today),
            phone_required: form.phone_required(today),
        }
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("no {} document attached", .0.label())]
    MissingDocument(DocumentSlot),
}
