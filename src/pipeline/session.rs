// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 计数会话 (Session)
//!
//! 读取线程解析输入帧 → 有界通道 → 主线程按到达顺序逐帧处理。
//! 单帧失败只记录日志并跳过, 不影响后续帧。

use std::io::{BufRead, Write};
use std::thread;
use std::time::Instant;

use crossbeam_channel::bounded;
use serde::Serialize;

use super::{FrameOutput, FrameProcessor};
use crate::detection::{read_frames, CumulativeCounts, Detector, ReplayFrame, Tracker};
use crate::error::{CounterError, Result};

/// 读取线程 → 处理线程 的队列长度
const FRAME_QUEUE: usize = 64;

/// 会话统计
#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionSummary {
    pub frames_processed: u64,
    pub frames_failed: u64,
    /// 检测器或跟踪器失败的帧号 (无法解析的行没有帧号, 只计入 frames_failed)
    pub failed_frames: Vec<u64>,
    pub detections_dropped: u64,
    /// 所有成功帧计入的检测数
    pub detections_counted: u64,
    /// 开启跨帧累计时的总数
    pub cumulative: Option<CumulativeCounts>,
    pub avg_latency_ms: f64,
    pub finished_at: String,
}

pub struct Session<D, T> {
    detector: D,
    tracker: T,
    processor: FrameProcessor,
    cumulative: Option<CumulativeCounts>,
}

impl<D, T> Session<D, T>
where
    D: Detector<Frame = ReplayFrame>,
    T: Tracker,
{
    pub fn new(detector: D, tracker: T, processor: FrameProcessor, cumulative: bool) -> Self {
        Self {
            detector,
            tracker,
            processor,
            cumulative: cumulative.then(CumulativeCounts::new),
        }
    }

    /// 处理单帧: 检测器 → FrameProcessor
    pub fn step(&mut self, frame: &ReplayFrame) -> Result<FrameOutput> {
        let raw = self.detector.detect(frame)?;
        let output =
            self.processor
                .process_frame(frame.frame, &raw, frame.size(), &mut self.tracker)?;

        if let Some(cumulative) = self.cumulative.as_mut() {
            cumulative.add_frame(&output.counts);
        }
        Ok(output)
    }

    /// 运行整个输入, 每处理一帧向 `output` 写一行 JSON
    pub fn run<R, W>(&mut self, input: R, output: &mut W) -> Result<SessionSummary>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        let (tx, rx) = bounded::<Result<ReplayFrame>>(FRAME_QUEUE);

        // 读取线程: 只负责解析, 保持输入顺序
        let reader = thread::spawn(move || {
            for frame in read_frames(input) {
                if tx.send(frame).is_err() {
                    break;
                }
            }
        });

        let start = Instant::now();
        let mut summary = SessionSummary::default();
        let mut total_latency = 0.0;

        for frame in rx {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) if e.is_frame_local() => {
                    summary.frames_failed += 1;
                    log::warn!("⚠️  跳过无法解析的输入: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.step(&frame) {
                Ok(out) => {
                    summary.frames_processed += 1;
                    summary.detections_dropped += out.dropped as u64;
                    summary.detections_counted += out.counts.total() as u64;
                    total_latency += out.latency_ms;
                    serde_json::to_writer(&mut *output, &out)?;
                    writeln!(output)?;
                }
                Err(e) if e.is_frame_local() => {
                    summary.frames_failed += 1;
                    summary.failed_frames.push(frame.frame);
                    log::warn!("⚠️  跳过第 {} 帧: {}", frame.frame, e);
                }
                Err(e) => return Err(e),
            }
        }

        reader
            .join()
            .map_err(|_| CounterError::detector("frame reader thread panicked"))?;

        output.flush()?;

        if summary.frames_processed > 0 {
            summary.avg_latency_ms = total_latency / summary.frames_processed as f64;
        }
        summary.cumulative = self.cumulative.clone();
        summary.finished_at = crate::gen_time_string("-");

        log::info!(
            "✅ 处理完成: {} 帧成功, {} 帧失败, 用时 {:.2}s",
            summary.frames_processed,
            summary.frames_failed,
            start.elapsed().as_secs_f64()
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{AssociationPolicy, ByteTracker, ClassNames, ReplayDetector};
    use std::io::Cursor;

    fn session(cumulative: bool) -> Session<ReplayDetector, ByteTracker> {
        let names = ClassNames::default();
        let processor = FrameProcessor::new(
            Some([0, 1].into_iter().collect()),
            names.clone(),
            AssociationPolicy::LastWriterWins,
            0.0,
        );
        Session::new(
            ReplayDetector::new(names, 0.25, 0.45),
            ByteTracker::default(),
            processor,
            cumulative,
        )
    }

    const INPUT: &str = concat!(
        r#"{"frame":0,"width":640,"height":480,"detections":[{"box":[0,0,10,10],"confidence":0.9,"class_id":0},{"box":[20,0,30,10],"confidence":0.8,"class_id":1},{"box":[40,0,50,10],"confidence":0.7,"class_id":0}]}"#,
        "\n",
        r#"{"frame":1,"width":640,"height":480,"detections":[{"box":[1,0,11,10],"confidence":0.9,"class_id":0},{"box":[60,0,70,10],"confidence":0.9,"class_id":2}]}"#,
        "\n",
        "garbage\n",
        r#"{"frame":3,"width":640,"height":480,"detections":[{"box":[0,0,10,10],"confidence":2.0,"class_id":0}]}"#,
        "\n",
        r#"{"frame":4,"width":640,"height":480}"#,
        "\n",
    );

    #[test]
    fn test_run_writes_one_line_per_frame() {
        let mut s = session(true);
        let mut out = Vec::new();
        let summary = s.run(Cursor::new(INPUT), &mut out).unwrap();

        assert_eq!(summary.frames_processed, 3);
        assert_eq!(summary.frames_failed, 2);
        // "garbage" 没有帧号, 第 3 帧被检测器拒绝
        assert_eq!(summary.failed_frames, vec![3]);
        // 第 1 帧的 wing 不在关注列表中
        assert_eq!(summary.detections_counted, 4);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["frame_index"], 0);
        assert_eq!(lines[0]["counts"]["breast"], 2);
        assert_eq!(lines[0]["counts"]["thigh"], 1);
        assert_eq!(lines[1]["counts"]["breast"], 1);
        assert!(lines[1]["counts"].get("wing").is_none());
        assert_eq!(lines[2]["frame_index"], 4);
        assert_eq!(lines[2]["class_sequence"].as_array().unwrap().len(), 0);

        let cumulative = summary.cumulative.unwrap();
        assert_eq!(cumulative.frames, 3);
        assert_eq!(cumulative.totals.get("breast"), 3);
        assert_eq!(cumulative.totals.get("thigh"), 1);
    }

    #[test]
    fn test_run_skips_non_utf8_line() {
        let mut input = Vec::new();
        input.extend_from_slice(
            br#"{"frame":0,"width":640,"height":480,"detections":[{"box":[0,0,10,10],"confidence":0.9,"class_id":0}]}"#,
        );
        input.extend_from_slice(b"\n\xff\xfe\n");
        input.extend_from_slice(
            br#"{"frame":2,"width":640,"height":480,"detections":[{"box":[1,0,11,10],"confidence":0.9,"class_id":0}]}"#,
        );
        input.push(b'\n');

        let mut s = session(false);
        let mut out = Vec::new();
        let summary = s.run(Cursor::new(input), &mut out).unwrap();

        assert_eq!(summary.frames_processed, 2);
        assert_eq!(summary.frames_failed, 1);
        assert!(summary.failed_frames.is_empty());

        let text = String::from_utf8(out).unwrap();
        let indices: Vec<u64> = text
            .lines()
            .map(|l| {
                let value: serde_json::Value = serde_json::from_str(l).unwrap();
                value["frame_index"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_run_stops_on_read_error() {
        struct Broken;

        impl std::io::Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "gone"))
            }
        }

        let mut s = session(false);
        let mut out = Vec::new();
        let err = s.run(std::io::BufReader::new(Broken), &mut out).unwrap_err();
        assert!(matches!(err, CounterError::Io(_)));
    }

    #[test]
    fn test_step_keeps_track_id() {
        let mut s = session(false);
        let frames: Vec<ReplayFrame> = read_frames(Cursor::new(INPUT))
            .filter_map(|f| f.ok())
            .collect();

        let first = s.step(&frames[0]).unwrap();
        let second = s.step(&frames[1]).unwrap();
        assert_eq!(first.annotations[0].tracker_id, Some(1));
        assert_eq!(second.annotations[0].tracker_id, Some(1));
        assert!(s.cumulative.is_none());
    }
}
