pub mod device;
pub mod feed;
pub mod telemetry;

pub use device::Device;
pub use feed::{
    NotificationItem, NotificationKind, NotificationMessage, PredictionClass, PredictionItem,
    PredictionKind, PredictionMessage,
};
pub use telemetry::{
    format_reading, Axis, AxisReading, ChannelKey, DecodeError, FrameData, Quantity, SensorFrame,
    TelemetryMessage,
};
