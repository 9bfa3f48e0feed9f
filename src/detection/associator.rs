// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测 ↔ 轨迹 关联
//!
//! 以 IOU 为代价, 给每个检测分配至多一个跟踪ID。
//! 两种策略:
//! 1. `LastWriterWins`: 逐行(轨迹)取最大IOU的检测, 后面的轨迹覆盖前面的分配
//! 2. `GreedyBestIou`:  全部 (轨迹, 检测, IOU) 候选按IOU降序贪心, 已占用的不再分配

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::iou::box_iou_batch;
use super::tracker::Track;
use super::types::{BBox, DetectionSet};

/// 关联策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationPolicy {
    /// 逐轨迹取最佳检测, 同一检测被多个轨迹选中时最后一个轨迹生效
    #[default]
    LastWriterWins,
    /// 经典贪心二分匹配, 每个轨迹和检测最多使用一次
    GreedyBestIou,
}

impl std::str::FromStr for AssociationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "last_writer_wins" | "lww" => Ok(Self::LastWriterWins),
            "greedy_best_iou" | "greedy" => Ok(Self::GreedyBestIou),
            other => Err(format!("unknown association policy: {}", other)),
        }
    }
}

/// 将轨迹ID关联到检测
///
/// 返回与 `detections` 下标对齐的跟踪ID, 未匹配为 `None`
pub fn match_detections_with_tracks(
    detections: &DetectionSet,
    tracks: &[Track],
    policy: AssociationPolicy,
) -> Vec<Option<u32>> {
    if detections.is_empty() || tracks.is_empty() {
        return vec![None; detections.len()];
    }

    let track_boxes: Vec<BBox> = tracks.iter().map(|t| t.bbox).collect();
    // 行: 轨迹, 列: 检测
    let iou = box_iou_batch(&track_boxes, detections.boxes());

    let ids = match policy {
        AssociationPolicy::LastWriterWins => {
            let mut ids = vec![None; detections.len()];
            for (row, track) in iou.rows().into_iter().zip(tracks) {
                if let Some((col, best)) = row_argmax(row) {
                    if best > 0.0 {
                        ids[col] = Some(track.track_id);
                    }
                }
            }
            ids
        }
        AssociationPolicy::GreedyBestIou => {
            let mut candidates = Vec::new();
            for ((t, d), &value) in iou.indexed_iter() {
                if value > 0.0 {
                    candidates.push((value, t, d));
                }
            }
            // IOU降序, 相同IOU按 (轨迹, 检测) 顺序
            candidates.sort_by(|a, b| {
                b.0.total_cmp(&a.0)
                    .then(a.1.cmp(&b.1))
                    .then(a.2.cmp(&b.2))
            });

            let mut ids = vec![None; detections.len()];
            let mut used_track = vec![false; tracks.len()];
            for (_, t, d) in candidates {
                if !used_track[t] && ids[d].is_none() {
                    ids[d] = Some(tracks[t].track_id);
                    used_track[t] = true;
                }
            }
            ids
        }
    };

    log::debug!(
        "关联: {} 轨迹 × {} 检测 → {} 已匹配 ({:?})",
        tracks.len(),
        detections.len(),
        ids.iter().filter(|id| id.is_some()).count(),
        policy
    );

    ids
}

/// 行最大值 (并列时取第一个)
fn row_argmax(row: ArrayView1<f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (col, &value) in row.iter().enumerate() {
        let better = match best {
            Some((_, b)) => value > b,
            None => true,
        };
        if better {
            best = Some((col, value));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::Detection;

    fn dets(boxes: &[[f32; 4]]) -> DetectionSet {
        boxes
            .iter()
            .map(|b| Detection {
                bbox: BBox::from(*b),
                confidence: 0.9,
                class_id: 0,
                tracker_id: None,
            })
            .collect()
    }

    #[test]
    fn test_no_tracks_all_none() {
        for n in [0usize, 1, 5] {
            let boxes: Vec<[f32; 4]> = (0..n)
                .map(|i| [i as f32 * 20.0, 0.0, i as f32 * 20.0 + 10.0, 10.0])
                .collect();
            let set = dets(&boxes);
            for policy in [AssociationPolicy::LastWriterWins, AssociationPolicy::GreedyBestIou] {
                let ids = match_detections_with_tracks(&set, &[], policy);
                assert_eq!(ids, vec![None; n]);
            }
        }
    }

    #[test]
    fn test_no_detections() {
        let tracks = vec![Track::new(1, BBox::new(0.0, 0.0, 10.0, 10.0))];
        let ids = match_detections_with_tracks(&DetectionSet::new(), &tracks, Default::default());
        assert!(ids.is_empty());
    }

    #[test]
    fn test_single_exact_match() {
        let set = dets(&[
            [0.0, 0.0, 10.0, 10.0],
            [50.0, 50.0, 60.0, 60.0],
            [100.0, 100.0, 110.0, 110.0],
        ]);
        let tracks = vec![Track::new(42, BBox::new(50.0, 50.0, 60.0, 60.0))];
        let ids = match_detections_with_tracks(&set, &tracks, AssociationPolicy::LastWriterWins);
        assert_eq!(ids, vec![None, Some(42), None]);
        let ids = match_detections_with_tracks(&set, &tracks, AssociationPolicy::GreedyBestIou);
        assert_eq!(ids, vec![None, Some(42), None]);
    }

    #[test]
    fn test_zero_iou_is_rejected() {
        let set = dets(&[[0.0, 0.0, 10.0, 10.0]]);
        let tracks = vec![Track::new(3, BBox::new(30.0, 30.0, 40.0, 40.0))];
        let ids = match_detections_with_tracks(&set, &tracks, AssociationPolicy::LastWriterWins);
        assert_eq!(ids, vec![None]);
    }

    #[test]
    fn test_last_writer_wins_overwrites() {
        // 检测0: 与轨迹1完全重合; 轨迹2 的最佳检测也是检测0 (IOU更低)
        let set = dets(&[[0.0, 0.0, 10.0, 10.0], [40.0, 0.0, 50.0, 10.0]]);
        let tracks = vec![
            Track::new(1, BBox::new(0.0, 0.0, 10.0, 10.0)),
            Track::new(2, BBox::new(5.0, 0.0, 15.0, 10.0)),
        ];
        let ids = match_detections_with_tracks(&set, &tracks, AssociationPolicy::LastWriterWins);
        assert_eq!(ids, vec![Some(2), None]);
    }

    #[test]
    fn test_greedy_keeps_best_pair() {
        let set = dets(&[[0.0, 0.0, 10.0, 10.0], [40.0, 0.0, 50.0, 10.0]]);
        let tracks = vec![
            Track::new(1, BBox::new(0.0, 0.0, 10.0, 10.0)),
            Track::new(2, BBox::new(5.0, 0.0, 15.0, 10.0)),
        ];
        let ids = match_detections_with_tracks(&set, &tracks, AssociationPolicy::GreedyBestIou);
        assert_eq!(ids, vec![Some(1), None]);
    }

    #[test]
    fn test_greedy_second_choice() {
        // 轨迹2 与检测0 的IOU最高, 被轨迹1占用后退而求其次选检测1
        let set = dets(&[[0.0, 0.0, 10.0, 10.0], [8.0, 0.0, 18.0, 10.0]]);
        let tracks = vec![
            Track::new(1, BBox::new(0.0, 0.0, 10.0, 10.0)),
            Track::new(2, BBox::new(3.0, 0.0, 13.0, 10.0)),
        ];
        let ids = match_detections_with_tracks(&set, &tracks, AssociationPolicy::GreedyBestIou);
        assert_eq!(ids, vec![Some(1), Some(2)]);

        // 同一输入, LastWriterWins 下轨迹2覆盖检测0
        let ids = match_detections_with_tracks(&set, &tracks, AssociationPolicy::LastWriterWins);
        assert_eq!(ids, vec![Some(2), None]);
    }

    #[test]
    fn test_row_argmax_first_on_tie() {
        let row = ndarray::arr1(&[0.2f32, 0.5, 0.5, 0.1]);
        assert_eq!(row_argmax(row.view()), Some((1, 0.5)));
        let empty = ndarray::Array1::<f32>::zeros(0);
        assert_eq!(row_argmax(empty.view()), None);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "greedy-best-iou".parse::<AssociationPolicy>(),
            Ok(AssociationPolicy::GreedyBestIou)
        );
        assert_eq!(
            "last_writer_wins".parse::<AssociationPolicy>(),
            Ok(AssociationPolicy::LastWriterWins)
        );
        assert!("hungarian".parse::<AssociationPolicy>().is_err());
    }
}
