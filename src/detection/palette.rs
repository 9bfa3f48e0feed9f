// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 类别颜色 (供渲染层使用)

/// 饱和度 0.8, 亮度 0.9 固定: 最亮通道 = 0.9, 最暗通道 = 0.9 - 0.72
const BRIGHT: f32 = 0.9;
const CHROMA: f32 = 0.72;

/// 根据类别ID生成固定颜色
///
/// 黄金角度采样色相, 同一类别在任何时候颜色相同
pub fn class_color(class_id: u32) -> (u8, u8, u8) {
    let hue = (class_id as f32 * 137.508) % 360.0;
    let sector = (hue / 60.0) as u32;
    // 在当前 60° 扇区内从暗到亮 (或从亮到暗) 过渡的通道
    let ramp = CHROMA * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());

    let hi = BRIGHT;
    let lo = BRIGHT - CHROMA;
    let mid = lo + ramp;

    let (r, g, b) = match sector {
        0 => (hi, mid, lo),
        1 => (mid, hi, lo),
        2 => (lo, hi, mid),
        3 => (lo, mid, hi),
        4 => (mid, lo, hi),
        _ => (hi, lo, mid),
    };
    (to_u8(r), to_u8(g), to_u8(b))
}

fn to_u8(channel: f32) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}
