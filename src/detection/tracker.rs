// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 多目标跟踪器接口
//! Tracker collaborator interface

use serde::Serialize;

use super::types::{BBox, FrameSize};
use crate::error::{CounterError, Result};

/// 跟踪器输入行: [x1, y1, x2, y2, confidence]
pub type TrackerRow = [f32; 5];

/// 跟踪对象 (跟踪器当前帧输出)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Track {
    /// 唯一跟踪ID, 在跟踪器删除该轨迹前保持不变
    pub track_id: u32,

    /// 当前边界框
    pub bbox: BBox,
}

impl Track {
    pub fn new(track_id: u32, bbox: BBox) -> Self {
        Self { track_id, bbox }
    }
}

/// 多目标跟踪器 Trait
///
/// 跟踪器自己维护轨迹的生命周期 (新建, 延续, 删除)。
/// 计数核心只读取 `update` 返回的轨迹列表。
pub trait Tracker {
    /// 更新跟踪器
    ///
    /// # 参数
    /// - `rows`: 当前帧检测, 每行 `[x1, y1, x2, y2, confidence]`, 可以为空
    /// - `frame`: 画面尺寸
    ///
    /// # 返回
    /// 当前帧的轨迹列表 (按跟踪器自身顺序)
    fn update(&mut self, rows: &[TrackerRow], frame: FrameSize) -> Result<Vec<Track>>;

    /// 重置跟踪器 (清除所有跟踪)
    fn reset(&mut self);

    /// 获取当前跟踪数量
    fn track_count(&self) -> usize;
}

impl<T: Tracker + ?Sized> Tracker for Box<T> {
    fn update(&mut self, rows: &[TrackerRow], frame: FrameSize) -> Result<Vec<Track>> {
        (**self).update(rows, frame)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn track_count(&self) -> usize {
        (**self).track_count()
    }
}

/// 检查跟踪器返回的轨迹框
///
/// 轨迹框不合法说明跟踪器输出形状错误, 整帧失败
pub fn validate_tracks(tracks: &[Track]) -> Result<()> {
    for track in tracks {
        // 轨迹框可能被运动模型推到画面外, 只检查形状
        track
            .bbox
            .validate(FrameSize::default(), 0.0)
            .map_err(|e| CounterError::tracker(format!("track #{}: {}", track.track_id, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tracks() {
        let good = vec![
            Track::new(1, BBox::new(0.0, 0.0, 10.0, 10.0)),
            Track::new(2, BBox::new(-20.0, -5.0, 10.0, 10.0)),
        ];
        assert!(validate_tracks(&good).is_ok());
        assert!(validate_tracks(&[]).is_ok());

        let bad = vec![
            Track::new(1, BBox::new(0.0, 0.0, 10.0, 10.0)),
            Track::new(7, BBox::new(10.0, 0.0, 10.0, 10.0)),
        ];
        let err = validate_tracks(&bad).unwrap_err();
        assert!(matches!(
            err,
            CounterError::CollaboratorUnavailable {
                collaborator: "tracker",
                ..
            }
        ));
        assert!(err.to_string().contains("#7"));
    }
}
