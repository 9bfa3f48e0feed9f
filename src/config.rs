// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 计数器配置 - 通过JSON文件调整参数

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::{AssociationPolicy, ByteTrackConfig, ClassNames};
use crate::error::{CounterError, Result};

/// 计数器参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    // === 检测参数 (检测器自身使用) ===
    pub confidence_threshold: f32, // 检测置信度阈值
    pub iou_threshold: f32,        // NMS IOU阈值

    // === 计数参数 ===
    pub class_allowlist: Option<Vec<u32>>, // 关注的类别ID, None 表示全部, 空表表示不关注任何类别
    pub class_names: Option<Vec<String>>,  // 覆盖默认类别表
    pub frame_margin: f32,                 // 检测框允许超出画面的像素
    pub association_policy: AssociationPolicy,
    pub cumulative: bool, // 是否跨帧累计

    // === 跟踪器参数 ===
    pub tracker: ByteTrackConfig,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            class_allowlist: None,
            class_names: None,
            frame_margin: 8.0,
            association_policy: AssociationPolicy::LastWriterWins,
            cumulative: false,
            tracker: ByteTrackConfig::default(),
        }
    }
}

impl CounterConfig {
    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写入默认配置; 解析失败时返回错误
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => {
                let config: Self = serde_json::from_str(&json)?;
                config.validate()?;
                log::info!("✅ 配置已从 {} 加载", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                config.save(path)?;
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 保存配置到JSON文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("💾 配置已保存到 {}", path.as_ref().display());
        Ok(())
    }

    /// 检查参数范围
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(CounterError::config(format!("{} must be in [0, 1], got {}", name, v)))
            }
        };
        unit("confidence_threshold", self.confidence_threshold)?;
        unit("iou_threshold", self.iou_threshold)?;
        unit("tracker.high_score_threshold", self.tracker.high_score_threshold)?;
        unit("tracker.low_score_threshold", self.tracker.low_score_threshold)?;
        unit("tracker.high_iou_threshold", self.tracker.high_iou_threshold)?;
        unit("tracker.low_iou_threshold", self.tracker.low_iou_threshold)?;

        if !self.frame_margin.is_finite() || self.frame_margin < 0.0 {
            return Err(CounterError::config(format!(
                "frame_margin must be a non-negative number, got {}",
                self.frame_margin
            )));
        }
        if matches!(&self.class_names, Some(names) if names.is_empty()) {
            return Err(CounterError::config("class_names must not be empty"));
        }
        Ok(())
    }

    /// 类别表 (覆盖表优先)
    pub fn class_names(&self) -> ClassNames {
        match &self.class_names {
            Some(names) => ClassNames::new(names.clone()),
            None => ClassNames::default(),
        }
    }

    /// 关注的类别集合, `None` 表示全部类别
    pub fn allowlist(&self) -> Option<BTreeSet<u32>> {
        self.class_allowlist
            .as_ref()
            .map(|ids| ids.iter().copied().collect())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        log::info!("🎛️  当前计数器配置:");
        log::info!("  检测置信度: {:.2}", self.confidence_threshold);
        log::info!("  NMS IOU: {:.2}", self.iou_threshold);
        match &self.class_allowlist {
            None => log::info!("  关注类别: 全部"),
            Some(ids) if ids.is_empty() => log::warn!("  关注类别: 无 (所有检测都会被丢弃)"),
            Some(ids) => log::info!("  关注类别: {:?}", ids),
        }
        log::info!("  关联策略: {:?}", self.association_policy);
        log::info!("  跨帧累计: {}", self.cumulative);
        log::info!(
            "  跟踪器最大丢失帧: {}",
            self.tracker.max_lost_frames
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");

        let config = CounterConfig::load(&path).unwrap();
        assert_eq!(config, CounterConfig::default());
        assert!(path.exists());

        let again = CounterConfig::load(&path).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");
        fs::write(
            &path,
            r#"{"class_allowlist":[0,1],"association_policy":"greedy_best_iou","tracker":{"max_lost_frames":5}}"#,
        )
        .unwrap();

        let config = CounterConfig::load(&path).unwrap();
        assert_eq!(config.allowlist(), Some(BTreeSet::from([0, 1])));
        assert_eq!(config.association_policy, AssociationPolicy::GreedyBestIou);
        assert_eq!(config.tracker.max_lost_frames, 5);
        assert_eq!(config.tracker.high_score_threshold, 0.4);
        assert_eq!(config.confidence_threshold, 0.25);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");

        fs::write(&path, r#"{"confidence_threshold":1.5}"#).unwrap();
        assert!(matches!(
            CounterConfig::load(&path),
            Err(CounterError::Config(_))
        ));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(CounterConfig::load(&path), Err(CounterError::Json(_))));
    }

    #[test]
    fn test_allowlist_none_vs_empty() {
        assert_eq!(CounterConfig::default().allowlist(), None);

        let none: CounterConfig = serde_json::from_str(r#"{"class_allowlist":null}"#).unwrap();
        assert_eq!(none.allowlist(), None);

        let empty: CounterConfig = serde_json::from_str(r#"{"class_allowlist":[]}"#).unwrap();
        assert_eq!(empty.allowlist(), Some(BTreeSet::new()));
    }

    #[test]
    fn test_class_names_override() {
        let config = CounterConfig {
            class_names: Some(vec!["a".into(), "b".into()]),
            ..Default::default()
        };
        assert_eq!(config.class_names().name(1), "b");
        assert_eq!(CounterConfig::default().class_names().name(0), "breast");
    }
}
