// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! IOU 计算 (Intersection over Union)

use ndarray::Array2;

use super::types::{BBox, RawDetection};

/// 计算两个边界框的IOU
///
/// 并集面积为0时返回0
pub fn box_iou(a: &BBox, b: &BBox) -> f32 {
    let w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = w * h;
    let union = a.area() + b.area() - intersection;

    if union <= 0.0 {
        return 0.0;
    }

    intersection / union
}

/// 批量计算 IOU 矩阵
///
/// 返回 `a.len() × b.len()` 矩阵, 任一输入为空时矩阵有一维为0
pub fn box_iou_batch(a: &[BBox], b: &[BBox]) -> Array2<f32> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| box_iou(&a[i], &b[j]))
}

/// 按类别的非极大值抑制 (检测器自身的重叠框过滤)
///
/// 不同类别的框互不抑制
pub fn non_max_suppression(xs: &mut Vec<RawDetection>, iou_threshold: f32) {
    xs.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            if xs[prev_index].class_id != xs[index].class_id {
                continue;
            }
            if box_iou(&xs[prev_index].bbox, &xs[index].bbox) > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}
