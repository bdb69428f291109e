//! SoundCloud widget provider

mod adapter;
mod protocol;
mod transport;

pub use adapter::SoundCloudAdapter;
pub use protocol::{WidgetCommand, WidgetMessage, BOUND_EVENTS};
pub use transport::{
    HandoffTransport, JsonLinesWidget, TcpWidgetTransport, WidgetChannel, WidgetEndpoint,
    WidgetTransport,
};
