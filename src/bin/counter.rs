// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测结果回放计数
///
/// 读取 JSON Lines 检测结果 → ByteTrack 跟踪 → 关联跟踪ID → 按类别计数
///
/// 直接运行: cargo run --bin counter --release -- --input detections.jsonl
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use yolov8_counter::{
    AssociationPolicy, ByteTracker, CounterConfig, Detector, FrameProcessor, ReplayDetector,
    Session,
};

/// 回放计数程序
#[derive(Parser, Debug)]
#[command(author, version, about = "YOLOv8 检测结果跟踪计数", long_about = None)]
struct Args {
    /// 检测结果文件 (JSON Lines, 每行一帧)
    #[arg(short, long)]
    input: PathBuf,

    /// 逐帧结果输出文件 (默认标准输出)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 配置文件 (不存在时自动创建)
    #[arg(short, long, default_value = "counter.json")]
    config: PathBuf,

    /// 关注的类别ID, 逗号分隔 (覆盖配置文件, 不指定时使用配置文件)
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<u32>>,

    /// 关联策略: last-writer-wins 或 greedy-best-iou
    #[arg(long)]
    policy: Option<AssociationPolicy>,

    /// 跨帧累计计数
    #[arg(long)]
    cumulative: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = CounterConfig::load(&args.config)
        .with_context(|| format!("加载配置失败: {}", args.config.display()))?;
    if let Some(classes) = args.classes {
        config.class_allowlist = Some(classes);
    }
    if let Some(policy) = args.policy {
        config.association_policy = policy;
    }
    config.cumulative |= args.cumulative;
    config.print_summary();

    let detector = ReplayDetector::new(
        config.class_names(),
        config.confidence_threshold,
        config.iou_threshold,
    );
    log::info!("🏷️  类别表: {} 类", detector.class_names().len());
    let processor = FrameProcessor::from_config(&config, detector.class_names().clone());
    let tracker = ByteTracker::new(config.tracker.clone());
    let mut session = Session::new(detector, tracker, processor, config.cumulative);

    log::info!("📹 输入: {}", args.input.display());
    let input = File::open(&args.input)
        .with_context(|| format!("无法打开输入文件: {}", args.input.display()))?;

    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("无法创建输出文件: {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let summary = session.run(BufReader::new(input), &mut output)?;

    log::info!(
        "📊 平均处理耗时 {:.3}ms | 计数 {} | 丢弃非法框 {}",
        summary.avg_latency_ms,
        summary.detections_counted,
        summary.detections_dropped
    );
    if !summary.failed_frames.is_empty() {
        log::warn!("⚠️  失败帧: {:?}", summary.failed_frames);
    }
    if let Some(cumulative) = &summary.cumulative {
        for (name, count) in cumulative.totals.iter() {
            log::info!("  {}: {}", name, count);
        }
    }
    eprintln!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
