use serde::{Deserialize, Serialize};

use crate::error::{Result, VithError};

/// Pixel edge length that selects the "small" thumbnail profile (animated
/// webp for videos, q:v 66 instead of 80).
pub const SMALL_SIZE: u64 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Video,
    Image,
    Pdf,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Video => "video",
            ItemType::Image => "image",
            ItemType::Pdf => "pdf",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "video" => Ok(ItemType::Video),
            "image" => Ok(ItemType::Image),
            "pdf" => Ok(ItemType::Pdf),
            other => Err(VithError::InputInvalid(format!("unsupported item type: {other}"))),
        }
    }
}

/// Surface that originated a request; carried only for the metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Http,
    Amqp,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Http => "http",
            Source::Amqp => "amqp",
        }
    }
}

/// A derivation request, decoded from either an HTTP query string or an AMQP
/// JSON payload. Value object: created at ingress, consumed by a generator,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub input: String,
    pub output: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default = "default_scale")]
    pub scale: u64,
}

fn default_scale() -> u64 {
    SMALL_SIZE
}

impl Request {
    /// Validates the logical names this request carries.
    ///
    /// Rejects `..` path segments uniformly at this layer (Open Question
    /// (a) in DESIGN.md) regardless of whether the backing store is local or
    /// remote, and rejects an empty `scale`. Input and output failures map
    /// to distinct `VithError` variants so the `input_invalid`/
    /// `output_invalid` metric states are actually reachable.
    pub fn validate(&self) -> Result<()> {
        validate_named(&self.input, VithError::InputInvalid)?;
        validate_named(&self.output, VithError::OutputInvalid)?;
        if self.scale == 0 {
            return Err(VithError::InputInvalid("scale must be positive".into()));
        }
        Ok(())
    }
}

/// Rejects empty names and any `..` path segment, reporting failures as
/// `InputInvalid`. Shared by the HEAD/rename/delete name checks, which have
/// no output field to distinguish.
pub fn validate_name(name: &str) -> Result<()> {
    validate_named(name, VithError::InputInvalid)
}

fn validate_named(name: &str, make_err: impl Fn(String) -> VithError) -> Result<()> {
    if name.is_empty() {
        return Err(make_err("name must not be empty".into()));
    }
    if name.split('/').any(|segment| segment == "..") {
        return Err(make_err(format!("path traversal rejected: {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_types_case_insensitively() {
        assert_eq!(ItemType::parse("VIDEO").unwrap(), ItemType::Video);
        assert_eq!(ItemType::parse("Image").unwrap(), ItemType::Image);
        assert_eq!(ItemType::parse("pdf").unwrap(), ItemType::Pdf);
        assert!(ItemType::parse("audio").is_err());
    }

    #[test]
    fn rejects_path_traversal_and_empty_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("a/../b").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b.png").is_ok());
    }

    #[test]
    fn request_defaults_scale_to_small_size() {
        let json = r#"{"input":"a.png","output":"b.webp","type":"image"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req.scale, SMALL_SIZE);
    }

    #[test]
    fn request_rejects_zero_scale() {
        let req = Request {
            input: "a".into(),
            output: "b".into(),
            item_type: ItemType::Image,
            scale: 0,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_distinguishes_input_and_output_metric_states() {
        let bad_input = Request {
            input: "../a".into(),
            output: "b".into(),
            item_type: ItemType::Image,
            scale: 150,
        };
        let err = bad_input.validate().unwrap_err();
        assert!(matches!(err, VithError::InputInvalid(_)));
        assert_eq!(err.metric_state(), "input_invalid");

        let bad_output = Request {
            input: "a".into(),
            output: "../b".into(),
            item_type: ItemType::Image,
            scale: 150,
        };
        let err = bad_output.validate().unwrap_err();
        assert!(matches!(err, VithError::OutputInvalid(_)));
        assert_eq!(err.metric_state(), "output_invalid");
    }
}
