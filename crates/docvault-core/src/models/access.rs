//! Ephemeral access grants for stored objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How retrieved content is served. Baked into the presigned signature so a
/// URL minted for one disposition cannot be replayed with the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Forced download.
    Attachment,
    /// Rendered in the browser.
    Inline,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }

    /// `Content-Disposition` header value carrying the user-facing filename.
    /// Quotes and control characters are stripped from the filename to keep
    /// the header well-formed.
    pub fn header_value(&self, filename: &str) -> String {
        let safe: String = filename
            .chars()
            .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
            .collect();
        format!("{}; filename=\"{}\"", self.as_str(), safe)
    }
}

impl std::str::FromStr for Disposition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "attachment" => Ok(Disposition::Attachment),
            "inline" => Ok(Disposition::Inline),
            other => Err(format!(
                "invalid disposition '{}', expected 'attachment' or 'inline'",
                other
            )),
        }
    }
}

/// A signed, time-limited reference to one stored object. Never persisted.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessGrant {
    pub url: String,
    pub disposition: Disposition,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_parse() {
        assert_eq!(
            "attachment".parse::<Disposition>().unwrap(),
            Disposition::Attachment
        );
        assert_eq!("INLINE".parse::<Disposition>().unwrap(), Disposition::Inline);
        assert!("download".parse::<Disposition>().is_err());
    }

    #[test]
    fn test_header_value_strips_quotes_and_controls() {
        let value = Disposition::Attachment.header_value("re\"port\n.pdf");
        assert_eq!(value, "attachment; filename=\"report.pdf\"");
    }

    #[test]
    fn test_header_value_inline() {
        let value = Disposition::Inline.header_value("photo.jpg");
        assert_eq!(value, "inline; filename=\"photo.jpg\"");
    }
}
