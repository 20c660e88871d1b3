use crate::infra::{validation_config, InMemorySessionStore};
use chrono::{Local, NaiveDate};
use citizenship_intake::config::{AppConfig, IntakeConfig};
use citizenship_intake::error::AppError;
use citizenship_intake::workflows::intake::{
    DocumentAttachment, DocumentSlot, EditOutcome, FieldEdit, FieldName, Gender,
    GoogleInputTools, IntakeService, IntakeServiceError, IntakeValidator, LoggingSink,
    SessionView, StepError,
};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the evaluation date (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Attach this file as the certificate front instead of a generated scan.
    #[arg(long)]
    pub(crate) front: Option<PathBuf>,
    /// Attach this file as the certificate back instead of a generated scan.
    #[arg(long)]
    pub(crate) back: Option<PathBuf>,
    /// Skip the live transliteration lookup for the Nepali name.
    #[arg(long)]
    pub(crate) skip_transliteration: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        front,
        back,
        skip_transliteration,
    } = args;

    let config = AppConfig::load()?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let dob = sample_birth_date(today);
    let (service, store) = demo_service(&config.intake, today);

    println!("Citizenship intake demo (evaluated {today})");
    let id = service.create().await?.session_id;
    println!("- Opened session {id}");

    for edit in [
        FieldEdit::FullNameEn("Ram Shrestha".to_string()),
        FieldEdit::Gender(Gender::Male),
        FieldEdit::DobAd(dob.to_string()),
    ] {
        let field = edit.field();
        let response = service.apply(&id, edit).await?;
        if let EditOutcome::Ignored { reason, .. } = response.outcome {
            println!("  {field}: ignored ({reason})");
        }
    }
    let view = service.get(&id).await?;
    print_birth_date(&view);

    if skip_transliteration {
        service
            .apply(&id, FieldEdit::FullNameNp("राम श्रेष्ठ".to_string()))
            .await?;
    } else {
        service
            .transliterate(&id, FieldName::FullNameNp, "ram")
            .await?;
        let typed = format!("{}shrestha", service.get(&id).await?.record.full_name_np);
        service
            .transliterate(&id, FieldName::FullNameNp, &typed)
            .await?;
    }
    let view = service.get(&id).await?;
    println!("  Nepali name: {}", view.record.full_name_np.trim_end());

    println!("\nStep 1: personal details");
    report_step(service.continue_to_documents(&id).await);

    service
        .apply(&id, FieldEdit::Phone("9812345678".to_string()))
        .await?;
    println!("  Added phone 9812345678");
    report_step(service.continue_to_documents(&id).await);

    println!("\nStep 2: citizenship details");
    for edit in [
        FieldEdit::CitizenshipNo("27-01-75-01234".to_string()),
        FieldEdit::IssuedDistrict("Kathmandu".to_string()),
        FieldEdit::IssuedDateAd("2023-03-01".to_string()),
    ] {
        service.apply(&id, edit).await?;
    }

    let oversize = DocumentAttachment::from_bytes(
        "front-scan.pdf",
        "application/pdf",
        vec![0u8; 3 * 1024 * 1024],
    );
    let view = service.attach(&id, DocumentSlot::Front, oversize).await?;
    if let Some(message) = view.errors.get(FieldName::CitizenshipFront) {
        println!("  3 MB front scan rejected: {message}");
    }

    let front = load_document(front, "front.png", "image/png").await?;
    let back = load_document(back, "back.pdf", "application/pdf").await?;
    service.attach(&id, DocumentSlot::Front, front).await?;
    let view = service.attach(&id, DocumentSlot::Back, back).await?;
    for slot in [DocumentSlot::Front, DocumentSlot::Back] {
        let summary = match slot {
            DocumentSlot::Front => view.record.citizenship_front.as_ref(),
            DocumentSlot::Back => view.record.citizenship_back.as_ref(),
        };
        if let Some(summary) = summary {
            println!(
                "  {} scan: {} ({}, {} bytes)",
                slot.label(),
                summary.file_name,
                summary.media_type,
                summary.size_bytes
            );
        }
    }

    match service.submit(&id).await {
        Ok(payload) => {
            println!("\nSubmitted application {}", payload.citizenship_no);
            println!(
                "  {} | {} | born {} AD / {} BS",
                payload.full_name_en,
                payload.gender.label(),
                payload.dob_ad,
                payload.dob_bs
            );
            println!(
                "  Issued in {} on {} AD / {} BS",
                payload.issued_district, payload.issued_date_ad, payload.issued_date_bs
            );
            println!(
                "  Encoded documents: front {} chars, back {} chars",
                payload.citizenship_front.len(),
                payload.citizenship_back.len()
            );
        }
        Err(err) => println!("\nSubmission failed: {err}"),
    }
    println!("  Open sessions remaining: {}", store.len());

    Ok(())
}

type DemoService = IntakeService<InMemorySessionStore, LoggingSink, GoogleInputTools>;

/// Service whose age checks are evaluated on `today` rather than the wall clock.
fn demo_service(intake: &IntakeConfig, today: NaiveDate) -> (DemoService, Arc<InMemorySessionStore>) {
    let store = Arc::new(InMemorySessionStore::new(intake.session_idle_timeout));
    let service = IntakeService::new(
        store.clone(),
        Arc::new(LoggingSink),
        Arc::new(GoogleInputTools::new(intake.transliteration_url.clone())),
        IntakeValidator::new(validation_config(intake)),
    )
    .with_clock(move || today);
    (service, store)
}

/// Roughly twenty years and a month before `today`, old enough for the phone rule.
fn sample_birth_date(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_signed(chrono::Duration::days(20 * 365 + 30))
        .unwrap_or(today)
}

fn print_birth_date(view: &SessionView) {
    if let (Some(ad), Some(bs)) = (view.record.dob_ad, view.record.dob_bs) {
        let age = view
            .age
            .map(|age| format!(" (age {age})"))
            .unwrap_or_default();
        println!("  Date of birth: {ad} AD = {bs} BS{age}");
    }
}

fn report_step(result: Result<SessionView, IntakeServiceError>) {
    match result {
        Ok(view) => println!("  Continue -> now on the {:?} step", view.step),
        Err(IntakeServiceError::Step(StepError::Invalid(errors))) => {
            println!("  Continue blocked:");
            for (field, message) in errors.iter() {
                println!("    - {field}: {message}");
            }
        }
        Err(err) => println!("  Continue failed: {err}"),
    }
}

async fn load_document(
    path: Option<PathBuf>,
    sample_name: &str,
    sample_type: &str,
) -> Result<DocumentAttachment, AppError> {
    match path {
        Some(path) => {
            let media_type = DocumentAttachment::guess_media_type(&path.to_string_lossy());
            Ok(DocumentAttachment::from_path(path, media_type).await?)
        }
        None => Ok(DocumentAttachment::from_bytes(
            sample_name,
            sample_type,
            vec![0u8; 64 * 1024],
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn intake_config() -> IntakeConfig {
        IntakeConfig {
            transliteration_url: "http://127.0.0.1:9/request".to_string(),
            max_document_bytes: 2 * 1024 * 1024,
            max_upload_bytes: 10 * 1024 * 1024,
            session_idle_timeout: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn override_date_drives_the_phone_gate() {
        let today = NaiveDate::from_ymd_opt(2050, 1, 1).expect("valid");
        let (service, store) = demo_service(&intake_config(), today);
        assert_eq!(service.today(), today);

        let id = service.create().await.expect("created").session_id;
        for edit in [
            FieldEdit::FullNameEn("Ram Shrestha".to_string()),
            FieldEdit::FullNameNp("राम श्रेष्ठ".to_string()),
            FieldEdit::Gender(Gender::Male),
            FieldEdit::DobAd(sample_birth_date(today).to_string()),
        ] {
            service.apply(&id, edit).await.expect("edit applies");
        }

        let view = service.get(&id).await.expect("session exists");
        assert_eq!(view.age, Some(20));
        assert!(view.phone_required);

        match service.continue_to_documents(&id).await {
            Err(IntakeServiceError::Step(StepError::Invalid(errors))) => {
                let message = errors.get(FieldName::Phone).expect("phone error");
                assert!(message.starts_with("Phone is required for Males over 18"));
            }
            other => panic!("expected the phone gate, got {other:?}"),
        }
        assert_eq!(store.len(), 1);
    }
}
