//! # TidalCore HTTP
//!
//! A thin axum surface over [`tidalcore_backup::BackupService`]:
//!
//! | Method & path | Operation |
//! |---|---|
//! | `POST /api/backups` | create |
//! | `GET /api/backups` | list |
//! | `GET /api/backups/{filename}/download` | download |
//! | `POST /api/backups/{filename}/restore` | restore by name |
//! | `POST /api/backups/upload` | restore from multipart field `file` |
//! | `DELETE /api/backups/{filename}` | delete |

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod upload;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use router::{router, serve};
pub use state::AppState;
pub use upload::{UploadRejection, validate_upload};
