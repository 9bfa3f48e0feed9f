// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 计数器配置参数
pub mod detection; // 检测 / 关联 / 计数
pub mod error; // 错误类型
pub mod pipeline; // 帧处理流水线

pub use crate::config::CounterConfig;
pub use crate::detection::{
    AssociationPolicy, BBox, ByteTracker, ClassCounts, ClassNames, DetectionSet, Detector,
    FrameSize, RawDetection, ReplayDetector, Track, Tracker,
};
pub use crate::error::{CounterError, Result};
pub use crate::pipeline::{Annotation, FrameOutput, FrameProcessor, Session, SessionSummary};

pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
