// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 帧处理流水线 (Frame Processing Pipeline)
///
/// - FrameProcessor: 单帧 过滤 → 跟踪 → 关联 → 计数
/// - Session:        按顺序驱动 检测器 + 跟踪器 + FrameProcessor
pub mod processor;
pub mod session;

pub use processor::FrameProcessor;
pub use session::{Session, SessionSummary};

use serde::Serialize;

use crate::detection::{BBox, ClassCounts};

/// 单个检测的标注数据 (供渲染层绘制)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Annotation {
    #[serde(rename = "box")]
    pub bbox: BBox,
    pub class_name: String,
    pub confidence: f32,
    pub tracker_id: Option<u32>,
    pub color: (u8, u8, u8),
}

impl Annotation {
    /// 标签文字, 如 `#3 breast 0.91`
    pub fn label(&self) -> String {
        match self.tracker_id {
            Some(id) => format!("#{} {} {:.2}", id, self.class_name, self.confidence),
            None => format!("{} {:.2}", self.class_name, self.confidence),
        }
    }
}

/// 单帧处理结果
#[derive(Clone, Debug, Serialize)]
pub struct FrameOutput {
    pub frame_index: u64,
    /// 本帧各类别数量 (首次出现顺序)
    pub counts: ClassCounts,
    /// 按检测顺序的类别名, 允许重复
    pub class_sequence: Vec<String>,
    pub annotations: Vec<Annotation>,
    /// 因框不合法被丢弃的检测数
    pub dropped: usize,
    pub latency_ms: f64,
}
