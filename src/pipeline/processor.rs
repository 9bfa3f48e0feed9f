// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 帧处理器 (Frame Processor)
//! 职责: 原始检测 → 类别过滤 → 跟踪器 → 关联跟踪ID → 类别计数

use std::collections::BTreeSet;
use std::time::Instant;

use super::{Annotation, FrameOutput};
use crate::config::CounterConfig;
use crate::detection::{
    class_color, count_classes, match_detections_with_tracks, validate_tracks, AssociationPolicy,
    ClassNames, DetectionSet, FrameSize, RawDetection, Tracker,
};
use crate::error::Result;

pub struct FrameProcessor {
    /// 关注的类别ID, `None` 表示全部, 空集合表示不关注任何类别
    allowlist: Option<BTreeSet<u32>>,
    class_names: ClassNames,
    policy: AssociationPolicy,
    frame_margin: f32,
}

impl FrameProcessor {
    pub fn new(
        allowlist: Option<BTreeSet<u32>>,
        class_names: ClassNames,
        policy: AssociationPolicy,
        frame_margin: f32,
    ) -> Self {
        Self {
            allowlist,
            class_names,
            policy,
            frame_margin,
        }
    }

    /// 从配置创建, 类别表来自检测器
    pub fn from_config(config: &CounterConfig, class_names: ClassNames) -> Self {
        Self::new(
            config.allowlist(),
            class_names,
            config.association_policy,
            config.frame_margin,
        )
    }

    pub fn is_allowed(&self, class_id: u32) -> bool {
        self.allowlist
            .as_ref()
            .map_or(true, |ids| ids.contains(&class_id))
    }

    /// 处理一帧
    ///
    /// 跟踪器每帧都会被调用, 即使过滤后没有检测。
    /// 出错时不保留任何本帧数据。
    pub fn process_frame<T: Tracker + ?Sized>(
        &self,
        frame_index: u64,
        raw: &[RawDetection],
        frame: FrameSize,
        tracker: &mut T,
    ) -> Result<FrameOutput> {
        let start = Instant::now();

        // 1. 丢弃非法框
        let (mut detections, dropped) = DetectionSet::from_raw(raw, frame, self.frame_margin);

        // 2. 只保留关注的类别
        detections.retain(|d| self.is_allowed(d.class_id))?;

        // 3. 跟踪器更新
        let tracks = tracker.update(&detections.tracker_rows(), frame)?;
        validate_tracks(&tracks)?;

        // 4. 关联跟踪ID
        let ids = match_detections_with_tracks(&detections, &tracks, self.policy);
        detections.set_tracker_ids(ids)?;

        // 5. 计数
        let (counts, class_sequence) = count_classes(&detections, &self.class_names);

        let annotations: Vec<Annotation> = detections
            .iter()
            .map(|d| Annotation {
                bbox: d.bbox,
                class_name: self.class_names.name(d.class_id).to_string(),
                confidence: d.confidence,
                tracker_id: d.tracker_id,
                color: class_color(d.class_id),
            })
            .collect();

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        log::debug!(
            "帧 {}: {} 检测 ({} 丢弃) | {} 轨迹 | {:.2}ms",
            frame_index,
            detections.len(),
            dropped,
            tracks.len(),
            latency_ms
        );
        for annotation in &annotations {
            log::trace!("  {}", annotation.label());
        }

        Ok(FrameOutput {
            frame_index,
            counts,
            class_sequence,
            annotations,
            dropped,
            latency_ms,
        })
    }
}
