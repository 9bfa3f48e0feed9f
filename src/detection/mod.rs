// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测系统 (Detection System)
///
/// - types:      检测框 / 检测集合
/// - iou:        IOU 矩阵与 NMS
/// - associator: 检测 ↔ 轨迹 关联
/// - counter:    按类别计数
/// - detector:   检测器接口 (外部协作者)
/// - tracker:    跟踪器接口 (外部协作者)
pub mod associator;
pub mod bytetrack;
pub mod counter;
pub mod detector;
pub mod iou;
pub mod palette;
pub mod tracker;
pub mod types;

pub use associator::{match_detections_with_tracks, AssociationPolicy};
pub use bytetrack::{ByteTrackConfig, ByteTracker};
pub use counter::{count_classes, ClassCounts, CumulativeCounts};
pub use detector::{read_frames, ClassNames, Detector, ReplayDetector, ReplayFrame};
pub use iou::{box_iou, box_iou_batch, non_max_suppression};
pub use palette::class_color;
pub use tracker::{validate_tracks, Track, Tracker, TrackerRow};
pub use types::{BBox, Detection, DetectionSet, FrameSize, RawDetection};
