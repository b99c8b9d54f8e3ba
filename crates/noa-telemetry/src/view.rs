use chrono::{DateTime, Utc};
use noa_types::{format_reading, Axis, ChannelKey, Quantity};
use serde::Serialize;
use std::collections::HashMap;

use crate::buffer::Sample;
use crate::sample::SampleBuffer;

/// 视图状态
///
/// `NoData` 表示尚未收到任何帧，与“收到了值为 0 的帧”区分开。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ViewState<T> {
    NoData,
    Ready(T),
}

impl<T> ViewState<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, ViewState::NoData)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            ViewState::NoData => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            ViewState::Ready(value) => Some(value),
            ViewState::NoData => None,
        }
    }
}

/// 各轴显示开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisVisibility {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Default for AxisVisibility {
    fn default() -> Self {
        Self {
            x: true,
            y: true,
            z: true,
        }
    }
}

impl AxisVisibility {
    pub fn is_visible(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, visible: bool) {
        match axis {
            Axis::X => self.x = visible,
            Axis::Y => self.y = visible,
            Axis::Z => self.z = visible,
        }
    }

    /// 切换显示，返回新状态
    pub fn toggle(&mut self, axis: Axis) -> bool {
        let visible = !self.is_visible(axis);
        self.set(axis, visible);
        visible
    }
}

/// 图表点（x 为毫秒时间戳）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: i64,
    pub y: f64,
}

impl From<&Sample> for ChartPoint {
    fn from(sample: &Sample) -> Self {
        Self {
            x: sample.timestamp.timestamp_millis(),
            y: sample.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub channel: ChannelKey,
    pub axis: Axis,
    pub points: Vec<ChartPoint>,
}

/// 折线图视图
#[derive(Debug, Clone)]
pub struct ChartView {
    quantity: Quantity,
    visibility: AxisVisibility,
}

impl ChartView {
    pub fn new(quantity: Quantity) -> Self {
        Self {
            quantity,
            visibility: AxisVisibility::default(),
        }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn visibility(&self) -> AxisVisibility {
        self.visibility
    }

    pub fn toggle(&mut self, axis: Axis) -> bool {
        self.visibility.toggle(axis)
    }

    pub fn set_visible(&mut self, axis: Axis, visible: bool) {
        self.visibility.set(axis, visible);
    }

    /// 生成可见轴的数据序列
    ///
    /// 空状态只看数据本身，隐藏全部轴时返回空的 `Ready`。
    pub fn series(&self, buffer: &SampleBuffer) -> ViewState<Vec<ChartSeries>> {
        if quantity_is_empty(buffer, self.quantity) {
            return ViewState::NoData;
        }

        let series = Axis::ALL
            .into_iter()
            .filter(|axis| self.visibility.is_visible(*axis))
            .map(|axis| {
                let channel = ChannelKey::Axis(axis, self.quantity);
                let points = buffer
                    .channel(channel)
                    .map(|c| c.iter().map(ChartPoint::from).collect())
                    .unwrap_or_default();
                ChartSeries {
                    channel,
                    axis,
                    points,
                }
            })
            .collect();

        ViewState::Ready(series)
    }
}

/// 表格行
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableRow {
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TableRow {
    /// 显示用的三列文本
    pub fn display(&self) -> [String; 3] {
        [format_reading(self.x), format_reading(self.y), format_reading(self.z)]
    }
}

/// 历史表格视图：同一物理量的三轴数据，最新的在前
#[derive(Debug, Clone)]
pub struct TableView {
    quantity: Quantity,
    max_rows: usize,
}

impl TableView {
    pub fn new(quantity: Quantity, max_rows: usize) -> Self {
        Self { quantity, max_rows }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn rows(&self, buffer: &SampleBuffer) -> ViewState<Vec<TableRow>> {
        if quantity_is_empty(buffer, self.quantity) {
            return ViewState::NoData;
        }

        let key = |axis| ChannelKey::Axis(axis, self.quantity);
        let (Some(x), Some(y), Some(z)) = (
            buffer.channel(key(Axis::X)),
            buffer.channel(key(Axis::Y)),
            buffer.channel(key(Axis::Z)),
        ) else {
            return ViewState::NoData;
        };

        let limit = self.max_rows.min(buffer.capacity());
        let rows = x
            .iter_recent()
            .zip(y.iter_recent())
            .zip(z.iter_recent())
            .take(limit)
            .map(|((x, y), z)| TableRow {
                timestamp: x.timestamp,
                x: x.value,
                y: y.value,
                z: z.value,
            })
            .collect();

        ViewState::Ready(rows)
    }
}

/// 温度数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureTable {
    pub current: f64,
    pub rows: Vec<Sample>,
}

/// 温度视图
#[derive(Debug, Clone)]
pub struct TemperatureView {
    max_rows: usize,
}

impl Default for TemperatureView {
    fn default() -> Self {
        Self { max_rows: 10 }
    }
}

impl TemperatureView {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    pub fn table(&self, buffer: &SampleBuffer) -> ViewState<TemperatureTable> {
        let Some(channel) = buffer.channel(ChannelKey::Temperature) else {
            return ViewState::NoData;
        };
        let Some(latest) = channel.latest() else {
            return ViewState::NoData;
        };

        ViewState::Ready(TemperatureTable {
            current: latest.value,
            rows: channel.iter_recent().take(self.max_rows).copied().collect(),
        })
    }
}

/// 仪表盘快照：每个通道的最新值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub device_address: Option<String>,
    pub received_at: DateTime<Utc>,
    pub values: HashMap<ChannelKey, f64>,
}

impl DashboardSnapshot {
    pub fn capture(buffer: &SampleBuffer) -> ViewState<Self> {
        let mut values = HashMap::new();
        let mut received_at = None;

        for key in ChannelKey::all() {
            if let Some(latest) = buffer.channel(key).and_then(|c| c.latest()) {
                values.insert(key, latest.value);
                received_at = Some(latest.timestamp);
            }
        }

        match received_at {
            Some(received_at) => ViewState::Ready(Self {
                device_address: buffer.last_device().map(str::to_string),
                received_at,
                values,
            }),
            None => ViewState::NoData,
        }
    }

    pub fn get(&self, key: ChannelKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    pub fn display(&self, key: ChannelKey) -> String {
        self.get(key).map(format_reading).unwrap_or_else(|| "--".to_string())
    }
}

fn quantity_is_empty(buffer: &SampleBuffer, quantity: Quantity) -> bool {
    Axis::ALL.into_iter().all(|axis| {
        buffer
            .channel(ChannelKey::Axis(axis, quantity))
            .map_or(true, |c| c.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use noa_types::{AxisReading, SensorFrame};

    fn frame(x: f64, y: f64, z: f64, at: DateTime<Utc>) -> SensorFrame {
        SensorFrame {
            device_address: "0x50".to_string(),
            x: AxisReading::uniform(x),
            y: AxisReading::uniform(y),
            z: AxisReading::uniform(z),
            temperature: x + 20.0,
            received_at: at,
        }
    }

    #[test]
    fn test_no_data_before_first_frame() {
        let buffer = SampleBuffer::new(10).unwrap();

        assert!(ChartView::new(Quantity::Acceleration).series(&buffer).is_no_data());
        assert!(TableView::new(Quantity::Acceleration, 10).rows(&buffer).is_no_data());
        assert!(TemperatureView::default().table(&buffer).is_no_data());
        assert!(DashboardSnapshot::capture(&buffer).is_no_data());
    }

    #[test]
    fn test_zero_values_are_not_no_data() {
        let mut buffer = SampleBuffer::new(10).unwrap();
        buffer.ingest(&frame(0.0, 0.0, 0.0, Utc::now()));

        let series = ChartView::new(Quantity::Frequency).series(&buffer);
        let series = series.ready().unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].points[0].y, 0.0);

        let snapshot = DashboardSnapshot::capture(&buffer).into_ready().unwrap();
        let key = ChannelKey::Axis(Axis::Z, Quantity::Frequency);
        assert_eq!(snapshot.get(key), Some(0.0));
        assert_eq!(snapshot.display(key), "00.00");
    }

    #[test]
    fn test_chart_axis_toggle_filters_series() {
        let mut buffer = SampleBuffer::new(10).unwrap();
        let start = Utc::now();
        buffer.ingest(&frame(1.0, 2.0, 3.0, start));
        buffer.ingest(&frame(4.0, 5.0, 6.0, start + Duration::milliseconds(500)));

        let mut view = ChartView::new(Quantity::Acceleration);
        assert!(!view.toggle(Axis::Y));

        let series = view.series(&buffer).into_ready().unwrap();
        let axes: Vec<Axis> = series.iter().map(|s| s.axis).collect();
        assert_eq!(axes, vec![Axis::X, Axis::Z]);
        assert_eq!(
            series[1].points,
            vec![
                ChartPoint { x: start.timestamp_millis(), y: 3.0 },
                ChartPoint { x: start.timestamp_millis() + 500, y: 6.0 },
            ]
        );

        // 隐藏全部轴不影响数据状态
        view.set_visible(Axis::X, false);
        view.set_visible(Axis::Z, false);
        assert_eq!(view.series(&buffer), ViewState::Ready(vec![]));
        assert!(view.toggle(Axis::X));
    }

    #[test]
    fn test_table_rows_most_recent_first() {
        let mut buffer = SampleBuffer::new(3).unwrap();
        let start = Utc::now();
        for i in 0..5 {
            let v = i as f64;
            buffer.ingest(&frame(v, v * 10.0, v * 100.0, start + Duration::seconds(i)));
        }

        let rows = TableView::new(Quantity::VibrationSpeed, 50)
            .rows(&buffer)
            .into_ready()
            .unwrap();

        // 容量为 3，行数也被限制为 3
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].x, rows[0].y, rows[0].z), (4.0, 40.0, 400.0));
        assert_eq!(rows[2].x, 2.0);
        assert_eq!(rows[0].display(), ["04.00".to_string(), "40.00".to_string(), "400.00".to_string()]);

        let rows = TableView::new(Quantity::VibrationSpeed, 2)
            .rows(&buffer)
            .into_ready()
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_temperature_table() {
        let mut buffer = SampleBuffer::new(50).unwrap();
        for i in 0..15 {
            buffer.ingest(&frame(i as f64, 0.0, 0.0, Utc::now()));
        }

        let table = TemperatureView::default().table(&buffer).into_ready().unwrap();
        assert_eq!(table.current, 34.0);
        assert_eq!(table.rows.len(), 10);
        assert_eq!(table.rows[0].value, 34.0);
        assert_eq!(table.rows[9].value, 25.0);
    }
}
