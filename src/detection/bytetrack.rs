// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ByteTrack 参考跟踪器
//!
//! 核心思想:
//! 1. 高低分检测框分开处理
//! 2. 高分框优先匹配 (IOU)
//! 3. 低分框救援丢失的轨迹
//!
//! 不含运动模型: 轨迹框就是最近一次匹配到的检测框。

use serde::{Deserialize, Serialize};

use super::iou::box_iou;
use super::tracker::{Track, Tracker, TrackerRow};
use super::types::{BBox, FrameSize};
use crate::error::Result;

/// ByteTrack 参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ByteTrackConfig {
    pub max_lost_frames: u32,      // 最大丢失帧数
    pub high_score_threshold: f32, // 高分阈值
    pub low_score_threshold: f32,  // 低分阈值 (救援用)
    pub high_iou_threshold: f32,   // 高分匹配IOU阈值
    pub low_iou_threshold: f32,    // 低分匹配IOU阈值
}

impl Default for ByteTrackConfig {
    fn default() -> Self {
        Self {
            max_lost_frames: 30,
            high_score_threshold: 0.4,
            low_score_threshold: 0.1,
            high_iou_threshold: 0.3,
            low_iou_threshold: 0.2,
        }
    }
}

/// 单条轨迹
#[derive(Clone, Debug)]
struct ByteTrack {
    id: u32,
    bbox: BBox,
    /// 连续丢失帧数
    frames_lost: u32,
    /// 总共被跟踪的帧数
    total_frames: u32,
    score: f32,
}

impl ByteTrack {
    fn new(id: u32, row: &TrackerRow) -> Self {
        Self {
            id,
            bbox: row_box(row),
            frames_lost: 0,
            total_frames: 1,
            score: row[4],
        }
    }

    fn update(&mut self, row: &TrackerRow) {
        self.bbox = row_box(row);
        self.frames_lost = 0;
        self.total_frames += 1;
        self.score = row[4];
    }

    fn mark_lost(&mut self) {
        self.frames_lost += 1;
    }
}

fn row_box(row: &TrackerRow) -> BBox {
    BBox::new(row[0], row[1], row[2], row[3])
}

/// ByteTrack 追踪器
pub struct ByteTracker {
    tracks: Vec<ByteTrack>,
    /// 下一个分配的ID
    next_id: u32,
    config: ByteTrackConfig,
}

impl ByteTracker {
    pub fn new(config: ByteTrackConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            config,
        }
    }

    /// IOU 贪心匹配, 返回 (检测下标, 轨迹下标)
    fn match_rows_to_tracks(
        &self,
        rows: &[TrackerRow],
        det_indices: &[usize],
        track_indices: &[usize],
        iou_threshold: f32,
    ) -> Vec<(usize, usize)> {
        if det_indices.is_empty() || track_indices.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for &det_idx in det_indices {
            let det_box = row_box(&rows[det_idx]);
            for &track_idx in track_indices {
                let iou = box_iou(&det_box, &self.tracks[track_idx].bbox);
                if iou >= iou_threshold {
                    candidates.push((1.0 - iou, det_idx, track_idx));
                }
            }
        }

        // 贪心匹配: 按代价排序
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut assignments = Vec::new();
        let mut used_det = vec![false; rows.len()];
        let mut used_track = vec![false; self.tracks.len()];

        for (_, det_idx, track_idx) in candidates {
            if !used_det[det_idx] && !used_track[track_idx] {
                assignments.push((det_idx, track_idx));
                used_det[det_idx] = true;
                used_track[track_idx] = true;
            }
        }

        assignments
    }
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new(ByteTrackConfig::default())
    }
}

impl Tracker for ByteTracker {
    /// 更新跟踪 (ByteTrack 两轮匹配)
    ///
    /// 只返回本帧被更新或新建的轨迹
    fn update(&mut self, rows: &[TrackerRow], _frame: FrameSize) -> Result<Vec<Track>> {
        // 1. 分离高低分检测框
        let mut high_dets = Vec::new();
        let mut low_dets = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            if row[4] >= self.config.high_score_threshold {
                high_dets.push(idx);
            } else if row[4] >= self.config.low_score_threshold {
                low_dets.push(idx);
            }
        }

        let mut matched_det = vec![false; rows.len()];
        let mut matched_track = vec![false; self.tracks.len()];

        // 2. 第一轮匹配: 高分检测 + 所有轨迹
        let all_tracks: Vec<usize> = (0..self.tracks.len()).collect();
        let assignments = self.match_rows_to_tracks(
            rows,
            &high_dets,
            &all_tracks,
            self.config.high_iou_threshold,
        );
        for (det_idx, track_idx) in assignments {
            matched_det[det_idx] = true;
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&rows[det_idx]);
        }

        // 3. 第二轮匹配: 低分检测 + 未匹配的轨迹 (救援)
        let unmatched_tracks: Vec<usize> = (0..self.tracks.len())
            .filter(|&idx| !matched_track[idx])
            .collect();
        let low_assignments = self.match_rows_to_tracks(
            rows,
            &low_dets,
            &unmatched_tracks,
            self.config.low_iou_threshold,
        );
        for (det_idx, track_idx) in low_assignments {
            matched_det[det_idx] = true;
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&rows[det_idx]);
        }

        // 4. 未匹配的轨迹 → 标记丢失
        for (track_idx, &matched) in matched_track.iter().enumerate() {
            if !matched {
                self.tracks[track_idx].mark_lost();
            }
        }

        // 5. 未匹配的高分检测 → 新建轨迹
        for &det_idx in &high_dets {
            if !matched_det[det_idx] {
                self.tracks.push(ByteTrack::new(self.next_id, &rows[det_idx]));
                log::debug!("新建轨迹 #{}", self.next_id);
                self.next_id += 1;
            }
        }

        // 6. 删除丢失太久的轨迹
        let max_lost = self.config.max_lost_frames;
        self.tracks.retain(|t| {
            if t.frames_lost > max_lost {
                log::debug!(
                    "删除轨迹 #{} (跟踪 {} 帧, 最后得分 {:.2})",
                    t.id,
                    t.total_frames,
                    t.score
                );
                false
            } else {
                true
            }
        });

        Ok(self
            .tracks
            .iter()
            .filter(|t| t.frames_lost == 0)
            .map(|t| Track::new(t.id, t.bbox))
            .collect())
    }

    fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
    }

    fn track_count(&self) -> usize {
        self.tracks.len()
    }
}
