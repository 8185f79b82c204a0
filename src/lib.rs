//! image-to-excel
//!
//! Excelの商品コード列と画像フォルダを突き合わせ、一致した画像を
//! 該当行のセルへ一括で埋め込むツール。

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod excel;
pub mod imageio;
pub mod progress;
