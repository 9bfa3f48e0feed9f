// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测器接口与回放检测器
//! Detector collaborator interface + JSON Lines replay detector

use std::io::BufRead;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use super::iou::non_max_suppression;
use super::types::{FrameSize, RawDetection};
use crate::error::{CounterError, Result};

/// 默认类别表 (鸡肉部位模型)
static DEFAULT_CLASS_NAMES: phf::Map<u32, &'static str> = phf_map! {
    0u32 => "breast",
    1u32 => "thigh",
    2u32 => "wing",
    3u32 => "drumstick",
};

/// 未知类别名
pub const UNKNOWN_CLASS: &str = "Unknown";

/// 类别ID → 类别名, 检测器加载时确定, 之后不可变
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn name(&self, class_id: u32) -> &str {
        self.names
            .get(class_id as usize)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CLASS)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        let len = DEFAULT_CLASS_NAMES
            .keys()
            .max()
            .map(|&k| k as usize + 1)
            .unwrap_or(0);
        let names = (0..len as u32)
            .map(|id| {
                DEFAULT_CLASS_NAMES
                    .get(&id)
                    .copied()
                    .unwrap_or(UNKNOWN_CLASS)
                    .to_string()
            })
            .collect();
        Self { names }
    }
}

/// 检测器 Trait
///
/// 神经网络推理不在本库范围内, 任何检测后端实现此接口即可接入
pub trait Detector {
    /// 检测器输入 (预处理后的图像或等价数据)
    type Frame;

    /// 检测一帧, 返回画面像素坐标下的检测框
    fn detect(&mut self, frame: &Self::Frame) -> Result<Vec<RawDetection>>;

    /// 类别表
    fn class_names(&self) -> &ClassNames;
}

/// 回放帧: JSON Lines 的一行
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub frame: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

impl ReplayFrame {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

/// 逐行读取回放帧 (跳过空行)
///
/// 非 UTF-8 的行作为单帧错误返回, 读取本身的 IO 错误仍然是致命的
pub fn read_frames<R: BufRead>(mut reader: R) -> impl Iterator<Item = Result<ReplayFrame>> {
    let mut buf = Vec::new();
    let mut line_no = 0u64;
    let mut done = false;
    std::iter::from_fn(move || loop {
        if done {
            return None;
        }
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return None,
            Ok(_) => line_no += 1,
            Err(e) => {
                done = true;
                return Some(Err(CounterError::from(e)));
            }
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                return Some(Err(CounterError::InvalidLine {
                    line: line_no,
                    reason: e.to_string(),
                }))
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        return Some(ReplayFrame::parse(line));
    })
}

/// 回放检测器
///
/// 输入帧已包含检测器原始输出, 这里只做检测器自身的后处理:
/// 置信度过滤 + 按类别NMS
pub struct ReplayDetector {
    class_names: ClassNames,
    conf_threshold: f32,
    iou_threshold: f32,
}

impl ReplayDetector {
    pub fn new(class_names: ClassNames, conf_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            class_names,
            conf_threshold,
            iou_threshold,
        }
    }
}

impl Detector for ReplayDetector {
    type Frame = ReplayFrame;

    fn detect(&mut self, frame: &ReplayFrame) -> Result<Vec<RawDetection>> {
        if let Some(bad) = frame
            .detections
            .iter()
            .find(|d| !(0.0..=1.0).contains(&d.confidence))
        {
            return Err(CounterError::detector(format!(
                "frame {}: confidence {} outside [0, 1]",
                frame.frame, bad.confidence
            )));
        }

        let mut xs: Vec<RawDetection> = frame
            .detections
            .iter()
            .filter(|d| d.confidence >= self.conf_threshold)
            .cloned()
            .collect();
        non_max_suppression(&mut xs, self.iou_threshold);
        Ok(xs)
    }

    fn class_names(&self) -> &ClassNames {
        &self.class_names
    }
}
