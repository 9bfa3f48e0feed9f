// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测数据结构定义
//! Data structures for per-frame detections

use serde::{Deserialize, Serialize};

use crate::error::{CounterError, Result};

// ========== 数据结构 ==========

/// 画面尺寸 (像素)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 尺寸未知 (任一维为0) 时不做越界检查
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// 检测框 (x1, y1, x2, y2), 像素坐标
///
/// JSON 中以 `[x1, y1, x2, y2]` 数组表示
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// 检查框是否合法
    ///
    /// - 坐标必须是有限值
    /// - x1 < x2, y1 < y2
    /// - 画面尺寸已知时, 坐标不得超出 `[-margin, 尺寸 + margin]`
    pub fn validate(&self, frame: FrameSize, margin: f32) -> Result<()> {
        let malformed = |reason| CounterError::MalformedBox {
            x1: self.x1,
            y1: self.y1,
            x2: self.x2,
            y2: self.y2,
            reason,
        };

        if ![self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(malformed("non-finite coordinate"));
        }
        if self.x1 >= self.x2 {
            return Err(malformed("x1 >= x2"));
        }
        if self.y1 >= self.y2 {
            return Err(malformed("y1 >= y2"));
        }

        if frame.is_known() {
            let max_x = frame.width as f32 + margin;
            let max_y = frame.height as f32 + margin;
            if self.x1 < -margin || self.y1 < -margin || self.x2 > max_x || self.y2 > max_y {
                return Err(malformed("outside frame bounds"));
            }
        }

        Ok(())
    }

    /// 送入跟踪器的行格式: [x1, y1, x2, y2, confidence]
    pub fn with_score(&self, confidence: f32) -> [f32; 5] {
        [self.x1, self.y1, self.x2, self.y2, confidence]
    }
}

/// 检测器原始输出 (一个目标)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    #[serde(rename = "box")]
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: u32,
}

impl RawDetection {
    pub fn new(bbox: BBox, confidence: f32, class_id: u32) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }
}

/// 单个检测 (DetectionSet 的行视图)
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: u32,
    pub tracker_id: Option<u32>,
}

impl From<&RawDetection> for Detection {
    fn from(raw: &RawDetection) -> Self {
        Self {
            bbox: raw.bbox,
            confidence: raw.confidence,
            class_id: raw.class_id,
            tracker_id: None,
        }
    }
}

/// 一帧的检测集合 (列式存储)
///
/// 四个列 `boxes / confidence / class_id / tracker_id` 按下标对齐,
/// 所有过滤操作对四列同时生效并保持相对顺序。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionSet {
    boxes: Vec<BBox>,
    confidence: Vec<f32>,
    class_id: Vec<u32>,
    tracker_id: Vec<Option<u32>>,
}

impl DetectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            boxes: Vec::with_capacity(n),
            confidence: Vec::with_capacity(n),
            class_id: Vec::with_capacity(n),
            tracker_id: Vec::with_capacity(n),
        }
    }

    /// 从检测器原始输出构建, 非法框直接丢弃
    ///
    /// 返回 (检测集合, 丢弃数量)
    pub fn from_raw(raw: &[RawDetection], frame: FrameSize, margin: f32) -> (Self, usize) {
        let mut set = Self::with_capacity(raw.len());
        let mut dropped = 0;

        for det in raw {
            match det.bbox.validate(frame, margin) {
                Ok(()) => set.push(Detection::from(det)),
                Err(e) => {
                    log::debug!("丢弃非法检测框 (class {}): {}", det.class_id, e);
                    dropped += 1;
                }
            }
        }

        (set, dropped)
    }

    pub fn push(&mut self, det: Detection) {
        self.boxes.push(det.bbox);
        self.confidence.push(det.confidence);
        self.class_id.push(det.class_id);
        self.tracker_id.push(det.tracker_id);
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[BBox] {
        &self.boxes
    }

    pub fn confidence(&self) -> &[f32] {
        &self.confidence
    }

    pub fn class_id(&self) -> &[u32] {
        &self.class_id
    }

    pub fn tracker_id(&self) -> &[Option<u32>] {
        &self.tracker_id
    }

    pub fn get(&self, idx: usize) -> Option<Detection> {
        Some(Detection {
            bbox: *self.boxes.get(idx)?,
            confidence: *self.confidence.get(idx)?,
            class_id: *self.class_id.get(idx)?,
            tracker_id: *self.tracker_id.get(idx)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Detection> + '_ {
        (0..self.len()).filter_map(move |idx| self.get(idx))
    }

    /// 按谓词生成布尔掩码
    pub fn mask<F>(&self, mut predicate: F) -> Vec<bool>
    where
        F: FnMut(&Detection) -> bool,
    {
        self.iter().map(|det| predicate(&det)).collect()
    }

    /// 过滤, 返回新的集合 (原集合不变)
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        let mut out = self.clone();
        out.filter_in_place(mask)?;
        Ok(out)
    }

    /// 原地过滤
    ///
    /// 掩码长度必须等于集合长度; 长度不符时集合保持不变。
    pub fn filter_in_place(&mut self, mask: &[bool]) -> Result<()> {
        self.check_alignment()?;
        if mask.len() != self.len() {
            return Err(CounterError::Alignment {
                column: "mask",
                expected: self.len(),
                actual: mask.len(),
            });
        }

        retain_masked(&mut self.boxes, mask);
        retain_masked(&mut self.confidence, mask);
        retain_masked(&mut self.class_id, mask);
        retain_masked(&mut self.tracker_id, mask);

        self.check_alignment()
    }

    /// 按谓词原地过滤
    pub fn retain<F>(&mut self, predicate: F) -> Result<()>
    where
        F: FnMut(&Detection) -> bool,
    {
        let mask = self.mask(predicate);
        self.filter_in_place(&mask)
    }

    /// 写入关联结果 (每个检测一个可选跟踪ID)
    pub fn set_tracker_ids(&mut self, ids: Vec<Option<u32>>) -> Result<()> {
        if ids.len() != self.len() {
            return Err(CounterError::Alignment {
                column: "tracker_id",
                expected: self.len(),
                actual: ids.len(),
            });
        }
        self.tracker_id = ids;
        Ok(())
    }

    /// 送入跟踪器的输入: 每行 [x1, y1, x2, y2, confidence]
    pub fn tracker_rows(&self) -> Vec<[f32; 5]> {
        self.boxes
            .iter()
            .zip(&self.confidence)
            .map(|(bbox, &conf)| bbox.with_score(conf))
            .collect()
    }

    /// 检查所有列长度一致
    pub fn check_alignment(&self) -> Result<()> {
        let expected = self.boxes.len();
        let columns = [
            ("confidence", self.confidence.len()),
            ("class_id", self.class_id.len()),
            ("tracker_id", self.tracker_id.len()),
        ];
        for (column, actual) in columns {
            if actual != expected {
                return Err(CounterError::Alignment {
                    column,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        let mut set = Self::new();
        for det in iter {
            set.push(det);
        }
        set
    }
}

// Vec::retain 按顺序恰好访问每个元素一次
fn retain_masked<T>(column: &mut Vec<T>, mask: &[bool]) {
    let mut keep = mask.iter().copied();
    column.retain(|_| keep.next().unwrap_or(false));
}
