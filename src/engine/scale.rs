//! セルフィット倍率の計算
//!
//! 行高さ(pt)と列幅(文字数)をピクセル換算し、マージンを引いた枠に
//! 収まる最大の一様倍率を求める。

/// ポイント→ピクセルの近似係数
pub const PT_TO_PX: f64 = 1.333;

/// 列幅1文字分の近似ピクセル数
pub const COL_UNIT_TO_PX: f64 = 7.0;

/// セル枠から差し引く余白（片側換算ではなく縦横それぞれの合計）
pub const CELL_MARGIN_PX: f64 = 10.0;

/// セル左上からの画像オフセット
pub const IMAGE_OFFSET_PX: u32 = 5;

/// 画像がセル内に収まる最大倍率。縦横比は維持（両軸に同じ倍率を使う）。
pub fn cell_fit_scale(row_height_pt: f64, col_width_units: f64, img_width: u32, img_height: u32) -> f64 {
    let target_h = row_height_pt * PT_TO_PX - CELL_MARGIN_PX;
    let target_w = col_width_units * COL_UNIT_TO_PX - CELL_MARGIN_PX;

    let scale_x = target_w / img_width as f64;
    let scale_y = target_h / img_height as f64;

    scale_x.min(scale_y)
}
