use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::domain::{DocumentAttachment, DocumentKind, DocumentSource};

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("error reading file '{file_name}': {source}")]
    Read {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{file_name}' changed size since it was attached ({recorded} -> {actual} bytes)")]
    SizeChanged {
        file_name: String,
        recorded: u64,
        actual: u64,
    },
    #[error("media type '{media_type}' of '{file_name}' cannot head a data URL")]
    InvalidMediaType {
        file_name: String,
        media_type: String,
    },
}

/// How a client should render an attachment preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewKind {
    Image,
    Pdf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPreview {
    pub kind: PreviewKind,
    pub file_name: String,
    pub data_url: String,
}

/// Encode the whole attachment as `data:<media type>;base64,<payload>`.
///
/// The source is read in full before anything is returned, so callers either
/// get the complete URL or an error. File sources must still have the length
/// recorded at attach time, since that is the length validation accepted.
pub async fn encode(attachment: &DocumentAttachment) -> Result<String, EncodingError> {
    let media_type = data_url_media_type(attachment)?;

    let bytes = match &attachment.source {
        DocumentSource::Memory(bytes) => STANDARD.encode(bytes),
        DocumentSource::File(path) => {
            let contents = tokio::fs::read(path)
                .await
                .map_err(|source| EncodingError::Read {
                    file_name: attachment.file_name.clone(),
                    source,
                })?;
            let actual = contents.len() as u64;
            if actual != attachment.size_bytes {
                return Err(EncodingError::SizeChanged {
                    file_name: attachment.file_name.clone(),
                    recorded: attachment.size_bytes,
                    actual,
                });
            }
            STANDARD.encode(contents)
        }
    };

    Ok(format!("data:{media_type};base64,{bytes}"))
}

pub async fn preview(attachment: &DocumentAttachment) -> Result<DocumentPreview, EncodingError> {
    let kind = match attachment.kind() {
        Some(DocumentKind::Pdf) => PreviewKind::Pdf,
        _ => PreviewKind::Image,
    };
    Ok(DocumentPreview {
        kind,
        file_name: attachment.file_name.clone(),
        data_url: encode(attachment).await?,
    })
}

fn data_url_media_type(attachment: &DocumentAttachment) -> Result<String, EncodingError> {
    let declared = attachment.media_type.trim();
    if declared.is_empty() {
        return Ok(FALLBACK_MEDIA_TYPE.to_string());
    }

    declared
        .parse::<mime::Mime>()
        .map(|parsed| parsed.to_string())
        .map_err(|_| EncodingError::InvalidMediaType {
            file_name: attachment.file_name.clone(),
            media_type: declared.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("citizenship-intake-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn encodes_memory_sources() {
        let attachment = DocumentAttachment::from_bytes("front.png", "image/png", b"hello".to_vec());
        let url = encode(&attachment).await.expect("encodes");
        assert_eq!(url, "data:image/png;base64,aGVsbG8=");
    }

    #[tokio::test]
    async fn reads_file_sources_lazily() {
        let path = temp_path("scan.pdf");
        tokio::fs::write(&path, b"%PDF-1.7").await.expect("write fixture");
        let attachment = DocumentAttachment::from_path(&path, "application/pdf")
            .await
            .expect("metadata");
        assert_eq!(attachment.size_bytes, 8);

        let url = encode(&attachment).await.expect("encodes");
        assert_eq!(url, "data:application/pdf;base64,JVBERi0xLjc=");
        tokio::fs::remove_file(&path).await.expect("cleanup");
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let path = temp_path("vanished.jpg");
        tokio::fs::write(&path, b"jpeg").await.expect("write fixture");
        let attachment = DocumentAttachment::from_path(&path, "image/jpeg")
            .await
            .expect("metadata");
        tokio::fs::remove_file(&path).await.expect("remove fixture");

        match encode(&attachment).await {
            Err(EncodingError::Read { file_name, .. }) => {
                assert!(file_name.ends_with("vanished.jpg"))
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_grown_after_attach_is_not_encoded() {
        let path = temp_path("grown.pdf");
        tokio::fs::write(&path, b"%PDF").await.expect("write fixture");
        let attachment = DocumentAttachment::from_path(&path, "application/pdf")
            .await
            .expect("metadata");
        tokio::fs::write(&path, vec![0u8; 4096])
            .await
            .expect("grow fixture");

        let result = encode(&attachment).await;
        tokio::fs::remove_file(&path).await.expect("cleanup");
        match result {
            Err(EncodingError::SizeChanged {
                recorded, actual, ..
            }) => {
                assert_eq!(recorded, 4);
                assert_eq!(actual, 4096);
            }
            other => panic!("expected size change, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_media_type_is_rejected() {
        let attachment = DocumentAttachment::from_bytes("scan", "not a mime", vec![1, 2, 3]);
        assert!(matches!(
            encode(&attachment).await,
            Err(EncodingError::InvalidMediaType { .. })
        ));
    }

    #[tokio::test]
    async fn empty_media_type_falls_back_to_octet_stream() {
        let attachment = DocumentAttachment::from_bytes("blob", "", vec![0xff]);
        let url = encode(&attachment).await.expect("encodes");
        assert_eq!(url, "data:application/octet-stream;base64,/w==");
    }

    #[tokio::test]
    async fn preview_picks_renderer_from_kind() {
        let pdf = DocumentAttachment::from_bytes("a.pdf", "application/pdf", vec![1]);
        let png = DocumentAttachment::from_bytes("a.png", "image/png", vec![1]);
        assert_eq!(preview(&pdf).await.expect("pdf").kind, PreviewKind::Pdf);
        assert_eq!(preview(&png).await.expect("png").kind, PreviewKind::Image);
    }
}
