//! 画像読み込みアダプタ
//!
//! ピクセルを展開せずヘッダだけでサイズを取る。形式判定は拡張子ではなく
//! マジックバイトで行う（JPEG/PNG/GIF/WEBP対応）。ファイル読み込みは
//! tokio::fs 経由で、ワーカーがランタイムのスレッドを塞がないようにする。

use crate::error::{ImportError, Result};
use image::ImageReader;
use std::io::Cursor;
use std::path::Path;

/// ワーカーが読み込んだ画像。バイト列の所有権はそのまま集約側へ渡る。
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub async fn load_image(path: &Path) -> Result<LoadedImage> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| ImportError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    let (width, height) = probe_dimensions(&data)
        .map_err(|e| ImportError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    Ok(LoadedImage {
        data,
        width,
        height,
    })
}

/// バイト列からピクセル寸法だけを取り出す
pub fn probe_dimensions(data: &[u8]) -> std::result::Result<(u32, u32), image::ImageError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()
}
