use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a JSON:API collection response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub data: Vec<Value>,
    /// Absolute URL of the following page, used verbatim.
    pub next: Option<String>,
}

impl Page {
    /// A missing or non-array `data_key` is an empty page; a missing
    /// `links.next` ends pagination.
    pub fn from_body(body: &Value, data_key: &str) -> Self {
        let data = body
            .get(data_key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let next = body
            .get("links")
            .and_then(|links| links.get("next"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Self { data, next }
    }
}

/// Typed view of a `customerReviews` item. The raw document is what gets stored.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerReview {
    pub id: String,
    #[serde(default)]
    pub attributes: CustomerReviewAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerReviewAttributes {
    pub rating: Option<u8>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub reviewer_nickname: Option<String>,
    pub territory: Option<String>,
    pub created_date: Option<String>,
}

impl CustomerReview {
    pub fn from_value(item: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(item)
    }

    /// `None` when the date is absent or not RFC 3339.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        self.attributes
            .created_date
            .as_deref()
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
    }
}

/// Flattened review returned by the preview endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub id: String,
    #[serde(flatten)]
    pub attributes: CustomerReviewAttributes,
}

impl From<CustomerReview> for ReviewSummary {
    fn from(review: CustomerReview) -> Self {
        Self {
            id: review.id,
            attributes: review.attributes,
        }
    }
}
