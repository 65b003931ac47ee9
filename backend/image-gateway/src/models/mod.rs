/// Wire models exchanged with the image worker
///
/// - `JobDescriptor`: the transformation request published on the job topic
/// - `ReplyMessage`: the completion notice read from the reply topic
use serde::{Deserialize, Serialize};

// ========================================
// Job Models
// ========================================

/// A named worker filter, e.g. `resize(90x1000)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub args: String,
}

impl Filter {
    pub fn new(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: args.into(),
        }
    }
}

/// Transformation parameters understood by the worker.
///
/// Zero values are omitted from the wire form; the worker treats an absent
/// field as "not requested".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageParams {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(rename = "unsafe", skip_serializing_if = "is_false")]
    pub allow_unsafe: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hash: String,
    #[serde(skip_serializing_if = "is_false")]
    pub meta: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub trim: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trim_by: String,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub trim_tolerance: i32,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub crop_left: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub crop_top: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub crop_right: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub crop_bottom: f64,
    #[serde(skip_serializing_if = "is_false")]
    pub fit_in: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub stretch: bool,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub width: i32,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub height: i32,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub padding_left: i32,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub padding_top: i32,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub padding_right: i32,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub padding_bottom: i32,
    #[serde(skip_serializing_if = "is_false")]
    pub h_flip: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub v_flip: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub h_align: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub v_align: String,
    #[serde(skip_serializing_if = "is_false")]
    pub smart: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

/// Job published to the worker for one uploaded object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub image_params: ImageParams,
    /// Locator of the uploaded object in the blob store
    #[serde(rename = "image_url")]
    pub image_locator: String,
}

// ========================================
// Reply Models
// ========================================

/// Worker completion notice; carries only the result locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(rename = "updated_image_url")]
    pub result_locator: String,
}

impl ReplyMessage {
    pub fn new(result_locator: impl Into<String>) -> Self {
        Self {
            result_locator: result_locator.into(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero_i32(value: &i32) -> bool {
    *value == 0
}

fn is_zero_f64(value: &f64) -> bool {
    *value == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_message_wire_name() {
        let reply: ReplyMessage =
            serde_json::from_str(r#"{"updated_image_url":"bar.png"}"#).unwrap();
        assert_eq!(reply.result_locator, "bar.png");
    }

    #[test]
    fn test_reply_message_rejects_missing_locator() {
        assert!(serde_json::from_str::<ReplyMessage>(r#"{"url":"bar.png"}"#).is_err());
    }

    #[test]
    fn test_empty_params_serialize_to_empty_object() {
        let json = serde_json::to_value(ImageParams::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
