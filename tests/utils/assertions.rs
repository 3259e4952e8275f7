use axum::{http::StatusCode, response::Response};
use serde_json::Value;

/// Buffered response with chainable checks
#[derive(Debug)]
pub struct ResponseAssertion {
    pub status: StatusCode,
    pub body: Value,
}

#[allow(dead_code)]
impl ResponseAssertion {
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body: {}", String::from_utf8_lossy(&bytes))
            })
        };

        Self { status, body }
    }

    pub fn status(self, expected: StatusCode) -> Self {
        assert_eq!(self.status, expected, "unexpected status, body: {}", self.body);
        self
    }

    /// Asserts a failure body carrying `message`
    pub fn error(self, expected: StatusCode, message: &str) -> Self {
        let this = self.status(expected);
        assert_eq!(this.body["success"], false);
        assert_eq!(this.body["message"], message);
        this
    }

    pub fn message(self, expected: &str) -> Self {
        assert_eq!(self.body["message"], expected);
        self
    }

    pub fn str_at(&self, pointer: &str) -> &str {
        self.body
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_else(|| panic!("no string at {pointer} in {}", self.body))
    }

    pub fn u64_at(&self, pointer: &str) -> u64 {
        self.body
            .pointer(pointer)
            .and_then(Value::as_u64)
            .unwrap_or_else(|| panic!("no number at {pointer} in {}", self.body))
    }

    /// Ids of the `books` array of a listing response, in order
    pub fn book_ids(&self) -> Vec<String> {
        self.body["books"]
            .as_array()
            .unwrap_or_else(|| panic!("no books array in {}", self.body))
            .iter()
            .map(|book| book["id"].as_str().unwrap().to_string())
            .collect()
    }
}
