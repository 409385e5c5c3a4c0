//! SketchSync Core Library
//!
//! Platform-agnostic stroke model, wire protocol, channel abstraction, and
//! the per-session controller that keeps a shared whiteboard in sync.

pub mod config;
pub mod controller;
pub mod history;
pub mod input;
pub mod protocol;
pub mod render;
pub mod session;
pub mod stroke;
pub mod sync;

pub use config::{CanvasStyle, ClientConfig, ConfigError, LineCap, PenStyle, DEFAULT_SERVER_URL};
pub use controller::{SessionEvent, SyncController};
pub use history::StrokeHistory;
pub use input::{CanvasBounds, PointerEvent};
pub use protocol::{ProtocolError, WireMessage};
pub use render::{RenderEngine, redraw};
pub use session::{SessionError, SessionId};
pub use stroke::{StrokeBuffer, StrokeError, StrokePoint};
pub use sync::{ChannelError, ChannelEvent, ConnectionState, MemoryChannel, MemoryHub, SyncChannel};
