//! Request-level errors and their HTTP mapping

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type PseudonymizeResult<T> = Result<T, PseudonymizeError>;

/// Everything that can reject a request. Cell-level problems never end up here;
/// they are resolved to substitute values by the anonymizer.
#[derive(Debug, Error)]
pub enum PseudonymizeError {
    #[error("No data provided")]
    NoData,

    #[error("No file part")]
    NoFilePart,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("Unsupported file type")]
    UnsupportedFileType,

    #[error("{0}")]
    InvalidPayload(String),

    #[error("File exceeds the maximum upload size of {limit} bytes")]
    FileTooLarge { limit: usize },

    #[error("{0}")]
    Json(String),

    #[error("{0}")]
    Multipart(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {line} has {found} fields, expected {expected}")]
    RaggedRow { line: u64, found: usize, expected: usize },

    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Workbook has no worksheets")]
    EmptyWorkbook,
}

impl ResponseError for PseudonymizeError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_fixed_validation_messages() {
        assert_eq!(PseudonymizeError::NoData.to_string(), "No data provided");
        assert_eq!(PseudonymizeError::NoFilePart.to_string(), "No file part");
        assert_eq!(PseudonymizeError::NoSelectedFile.to_string(), "No selected file");
        assert_eq!(PseudonymizeError::UnsupportedFileType.to_string(), "Unsupported file type");
    }

    #[test]
    fn test_ragged_row_message() {
        let err = PseudonymizeError::RaggedRow { line: 3, found: 4, expected: 2 };
        assert_eq!(err.to_string(), "Row 3 has 4 fields, expected 2");
    }

    #[actix_web::test]
    async fn test_error_response_shape() {
        let response = PseudonymizeError::UnsupportedFileType.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "Unsupported file type" }));
    }
}
