//! Boundary checks for uploaded dumps
//!
//! Applied before uploaded text reaches the restore orchestrator: the file
//! name must carry the configured extension, the content must fit the size
//! limit and must be UTF-8.

use thiserror::Error;
use tidalcore_core::config::UploadSettings;

/// Why an upload was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("missing multipart field 'file'")]
    MissingFile,

    #[error("only {expected} files are accepted")]
    WrongExtension { expected: String },

    #[error("file exceeds the {limit} byte upload limit")]
    TooLarge { limit: u64 },

    #[error("file is not valid UTF-8 text")]
    NotUtf8,
}

/// Check the uploaded file name against the allowed extension
///
/// The comparison ignores ASCII case, so `BACKUP.SQL` is accepted.
pub fn check_file_name(file_name: &str, settings: &UploadSettings) -> Result<(), UploadRejection> {
    let expected = settings.allowed_extension.to_ascii_lowercase();
    if file_name.to_ascii_lowercase().ends_with(&expected) && file_name.len() > expected.len() {
        Ok(())
    } else {
        Err(UploadRejection::WrongExtension {
            expected: settings.allowed_extension.clone(),
        })
    }
}

/// Check a byte length against the upload limit
pub fn check_size(len: u64, settings: &UploadSettings) -> Result<(), UploadRejection> {
    if len > settings.max_bytes {
        Err(UploadRejection::TooLarge {
            limit: settings.max_bytes,
        })
    } else {
        Ok(())
    }
}

/// Run every check and decode the content
pub fn validate_upload(
    file_name: &str,
    content: Vec<u8>,
    settings: &UploadSettings,
) -> Result<String, UploadRejection> {
    check_file_name(file_name, settings)?;
    check_size(content.len() as u64, settings)?;
    String::from_utf8(content).map_err(|_| UploadRejection::NotUtf8)
}
