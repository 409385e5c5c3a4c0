//! Canvas, pen, and client configuration.
//!
//! Every structure deserializes with defaults equal to the reference
//! deployment: an 800×600 white canvas drawn with a 5px black round pen.

use crate::session::SessionId;
use kurbo::{Cap, Join, Stroke};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Default relay endpoint.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8000";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

/// Line cap used at stroke ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    Square,
    #[default]
    Round,
}

impl From<LineCap> for Cap {
    fn from(cap: LineCap) -> Self {
        match cap {
            LineCap::Butt => Cap::Butt,
            LineCap::Square => Cap::Square,
            LineCap::Round => Cap::Round,
        }
    }
}

/// The single pen every stroke is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenStyle {
    /// Stroke width in logical pixels.
    pub width: f64,
    /// RGBA color.
    pub color: [u8; 4],
    pub cap: LineCap,
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            width: 5.0,
            color: [0, 0, 0, 255],
            cap: LineCap::Round,
        }
    }
}

impl PenStyle {
    pub fn color(&self) -> Color {
        let [r, g, b, a] = self.color;
        Color::from_rgba8(r, g, b, a)
    }

    /// Kurbo stroke parameters for this pen.
    pub fn stroke(&self) -> Stroke {
        Stroke::new(self.width)
            .with_caps(self.cap.into())
            .with_join(Join::Round)
    }
}

/// Drawing surface size and colors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasStyle {
    /// Surface width in logical pixels.
    pub width: u32,
    /// Surface height in logical pixels.
    pub height: u32,
    /// RGBA background color.
    pub background: [u8; 4],
    pub pen: PenStyle,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: [255, 255, 255, 255],
            pen: PenStyle::default(),
        }
    }
}

impl CanvasStyle {
    pub fn background_color(&self) -> Color {
        let [r, g, b, a] = self.background;
        Color::from_rgba8(r, g, b, a)
    }

    /// Load a style from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Where a client connects and which session it joins.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay base URL (`ws://` or `wss://`).
    pub server_url: String,
    pub session: SessionId,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, session: SessionId) -> Self {
        Self {
            server_url: server_url.into(),
            session,
        }
    }

    /// Full channel URL: `{server}/ws/{session}` with the session escaped as
    /// a single path segment.
    pub fn channel_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.server_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.server_url, e)))?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ConfigError::InvalidUrl(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }

        url.path_segments_mut()
            .map_err(|_| ConfigError::InvalidUrl(self.server_url.clone()))?
            .pop_if_empty()
            .push("ws")
            .push(self.session.as_str());

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_surface() {
        let style = CanvasStyle::default();
        assert_eq!((style.width, style.height), (800, 600));
        assert_eq!(style.background, [255, 255, 255, 255]);
        assert_eq!(style.pen.width, 5.0);
        assert_eq!(style.pen.color, [0, 0, 0, 255]);
        assert_eq!(style.pen.cap, LineCap::Round);
        assert_eq!(style.pen.stroke().start_cap, Cap::Round);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let style: CanvasStyle = serde_json::from_str(r#"{"width":320,"pen":{"width":2}}"#).unwrap();
        assert_eq!(style.width, 320);
        assert_eq!(style.height, 600);
        assert_eq!(style.pen.width, 2.0);
        assert_eq!(style.pen.cap, LineCap::Round);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"background":[0,0,0,255],"pen":{{"cap":"square"}}}}"#).unwrap();

        let style = CanvasStyle::from_json_file(file.path()).unwrap();
        assert_eq!(style.background, [0, 0, 0, 255]);
        assert_eq!(style.pen.cap, LineCap::Square);
    }

    #[test]
    fn test_channel_url() {
        let session = SessionId::new("team board").unwrap();
        let config = ClientConfig::new(DEFAULT_SERVER_URL, session);
        assert_eq!(
            config.channel_url().unwrap().as_str(),
            "ws://localhost:8000/ws/team%20board"
        );

        let session = SessionId::new("a/b").unwrap();
        let config = ClientConfig::new("wss://example.com/", session);
        assert_eq!(
            config.channel_url().unwrap().as_str(),
            "wss://example.com/ws/a%2Fb"
        );
    }

    #[test]
    fn test_channel_url_rejects_http() {
        let session = SessionId::new("s").unwrap();
        let config = ClientConfig::new("http://localhost:8000", session);
        assert!(matches!(config.channel_url(), Err(ConfigError::InvalidUrl(_))));
    }
}
