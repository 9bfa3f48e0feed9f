// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 按类别计数

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::detector::ClassNames;
use super::types::DetectionSet;

/// 类别 → 数量, 保持首次出现顺序
///
/// 序列化为 JSON 对象, 键顺序即首次出现顺序
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassCounts {
    entries: Vec<(String, u32)>,
}

impl ClassCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, class_name: &str) {
        self.add(class_name, 1);
    }

    pub fn add(&mut self, class_name: &str, n: u32) {
        match self.entries.iter_mut().find(|(name, _)| name == class_name) {
            Some((_, count)) => *count += n,
            None => self.entries.push((class_name.to_string(), n)),
        }
    }

    pub fn get(&self, class_name: &str) -> u32 {
        self.entries
            .iter()
            .find(|(name, _)| name == class_name)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

impl Serialize for ClassCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, count) in &self.entries {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

/// 统计一帧的类别数量
///
/// 每个检测计1次, 不按跟踪ID去重。
/// 返回 (类别计数, 按检测顺序的类别名序列)
pub fn count_classes(detections: &DetectionSet, names: &ClassNames) -> (ClassCounts, Vec<String>) {
    let mut counts = ClassCounts::new();
    let mut sequence = Vec::with_capacity(detections.len());

    for &class_id in detections.class_id() {
        let name = names.name(class_id);
        counts.increment(name);
        sequence.push(name.to_string());
    }

    (counts, sequence)
}

/// 跨帧累计 (逐帧计数之和, 同一目标出现在多帧会被计多次)
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CumulativeCounts {
    pub frames: u64,
    pub totals: ClassCounts,
}

impl CumulativeCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_frame(&mut self, counts: &ClassCounts) {
        self.frames += 1;
        for (name, count) in counts.iter() {
            self.totals.add(name, count);
        }
    }
}
