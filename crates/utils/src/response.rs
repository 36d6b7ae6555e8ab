use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// JSON envelope returned by every route.
#[derive(Debug, Serialize, Deserialize, TS)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::error("meal not found")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "data": null, "message": "meal not found" })
        );
    }
}
