pub mod buffer;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod feed;
pub mod sample;
pub mod scope;
pub mod sink;
pub mod transport;
pub mod view;

pub use buffer::{ChannelBuffer, Sample};
pub use connection::{Connection, ConnectionOptions, ConnectionState, ConnectionStatus};
pub use endpoint::{ConnectionKey, Endpoint};
pub use error::{Result, TelemetryError};
pub use feed::{HistoryFeed, NotificationFeed};
pub use sample::{BufferUpdate, FrameOutcome, SampleBuffer, SharedSampleBuffer};
pub use scope::ConnectionScope;
pub use sink::MessageSink;
pub use transport::{Inbound, Session, Transport, WsTransport};
pub use view::{
    AxisVisibility, ChartPoint, ChartSeries, ChartView, DashboardSnapshot, TableRow, TableView,
    TemperatureTable, TemperatureView, ViewState,
};
