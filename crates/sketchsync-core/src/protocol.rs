//! Wire messages exchanged over a session channel.
//!
//! Messages are JSON text frames with a `type` tag:
//! ```json
//! { "type": "draw", "path": [ { "x": 10, "y": 10, "isDrawing": false } ] }
//! { "type": "joined", "session": "abc", "peer_count": 2 }
//! { "type": "peer_joined", "peer_id": "..." }
//! { "type": "peer_left", "peer_id": "..." }
//! ```
//! Only `draw` carries drawing state. The presence notices come from the relay.

use crate::stroke::StrokePoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Tags this client understands.
const KNOWN_TYPES: &[&str] = &["draw", "joined", "peer_joined", "peer_left"];

/// Protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Message has no type tag")]
    MissingType,
    #[error("Unsupported message type: {0}")]
    UnsupportedType(String),
}

/// A message on the session channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// The sender's active path, in full, from its first point.
    Draw { path: Vec<StrokePoint> },
    /// Sent by the relay to a peer that just joined.
    Joined { session: String, peer_count: usize },
    /// Another peer joined the session.
    PeerJoined { peer_id: String },
    /// Another peer left the session.
    PeerLeft { peer_id: String },
}

/// Borrowed form of a draw message so outbound updates skip a copy.
#[derive(Serialize)]
#[serde(tag = "type", rename = "draw")]
struct DrawRef<'a> {
    path: &'a [StrokePoint],
}

/// Encode a draw message for `path`.
pub fn encode_draw(path: &[StrokePoint]) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&DrawRef { path })?)
}

impl WireMessage {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?;

        if !KNOWN_TYPES.contains(&kind) {
            return Err(ProtocolError::UnsupportedType(kind.to_string()));
        }

        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_encode_single_point_draw() {
        let path = [StrokePoint::start(Point::new(10.0, 10.0))];
        let json: Value = serde_json::from_str(&encode_draw(&path).unwrap()).unwrap();

        assert_eq!(json["type"], "draw");
        let points = json["path"].as_array().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0]["x"].as_f64(), Some(10.0));
        assert_eq!(points[0]["y"].as_f64(), Some(10.0));
        assert_eq!(points[0]["isDrawing"], false);
    }

    #[test]
    fn test_decode_draw_with_integer_coordinates() {
        let text = r#"{"type":"draw","path":[{"x":10,"y":10,"isDrawing":false},{"x":12,"y":11,"isDrawing":true}]}"#;
        match WireMessage::decode(text).unwrap() {
            WireMessage::Draw { path } => {
                assert_eq!(path.len(), 2);
                assert_eq!(path[1], StrokePoint::continuation(Point::new(12.0, 11.0)));
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_encode_matches_borrowed_form() {
        let path = vec![
            StrokePoint::start(Point::new(0.0, 0.0)),
            StrokePoint::continuation(Point::new(5.0, 5.0)),
        ];
        let owned = WireMessage::Draw { path: path.clone() }.encode().unwrap();
        assert_eq!(owned, encode_draw(&path).unwrap());
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        assert!(matches!(
            WireMessage::decode("not json"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_missing_path() {
        assert!(matches!(
            WireMessage::decode(r#"{"type":"draw"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        match WireMessage::decode(r#"{"type":"erase","path":[]}"#) {
            Err(ProtocolError::UnsupportedType(kind)) => assert_eq!(kind, "erase"),
            other => panic!("Expected unsupported type, got {:?}", other),
        }
        assert!(matches!(
            WireMessage::decode(r#"{"path":[]}"#),
            Err(ProtocolError::MissingType)
        ));
    }

    #[test]
    fn test_decode_presence_notice() {
        let msg = WireMessage::decode(r#"{"type":"joined","session":"abc","peer_count":2}"#).unwrap();
        assert_eq!(
            msg,
            WireMessage::Joined {
                session: "abc".to_string(),
                peer_count: 2
            }
        );
    }
}
