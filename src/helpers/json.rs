use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;

/// Envelope shared by the API routes: `{status, message?, result?, availableProductIds?}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_product_ids: Option<Vec<String>>,
}

pub struct JsonResponseBuilder<T> {
    result: Option<T>,
    available_product_ids: Option<Vec<String>>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn build() -> JsonResponseBuilder<T> {
        JsonResponseBuilder {
            result: None,
            available_product_ids: None,
        }
    }
}

impl<T: Serialize> JsonResponseBuilder<T> {
    pub fn set_result(mut self, result: T) -> Self {
        self.result = Some(result);
        self
    }

    pub fn set_available_product_ids(mut self, ids: Vec<String>) -> Self {
        self.available_product_ids = Some(ids);
        self
    }

    fn respond(self, code: StatusCode, status: &'static str, message: Option<String>) -> HttpResponse {
        HttpResponse::build(code).json(JsonResponse {
            status,
            message,
            result: self.result,
            available_product_ids: self.available_product_ids,
        })
    }

    pub fn ok(self) -> HttpResponse {
        self.respond(StatusCode::OK, "ok", None)
    }

    pub fn not_found(self, message: &str) -> HttpResponse {
        self.respond(StatusCode::NOT_FOUND, "error", Some(message.to_string()))
    }

    pub fn bad_request(self, message: &str) -> HttpResponse {
        self.respond(StatusCode::BAD_REQUEST, "error", Some(message.to_string()))
    }

    pub fn internal_server_error(self, message: &str) -> HttpResponse {
        let message = if message.trim().is_empty() {
            "Internal error"
        } else {
            message
        };
        self.respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            "error",
            Some(message.to_string()),
        )
    }
}
