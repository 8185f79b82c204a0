use crate::error::{ImportError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 1回の取り込み処理の設定。`normalized()`でデフォルトを適用してから使う。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub excel_path: PathBuf,
    pub image_dir: PathBuf,
    pub code_col: String,
    pub image_col: String,
    pub sheet_name: String,
    pub worker_count: usize,
    pub row_height: f64,
    pub col_width: f64,
}

impl RunConfig {
    /// 空欄・ゼロの項目にデフォルト値を入れる
    pub fn normalized(mut self) -> Self {
        if self.code_col.is_empty() {
            self.code_col = "A".into();
        }
        if self.image_col.is_empty() {
            self.image_col = "F".into();
        }
        if self.row_height <= 0.0 {
            self.row_height = 105.0;
        }
        if self.col_width <= 0.0 {
            self.col_width = 20.0;
        }
        if self.worker_count == 0 {
            self.worker_count = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(10);
        }
        self
    }

    /// 処理開始前の検証。パス未指定はここで弾く。
    pub fn validate(&self) -> Result<()> {
        if self.excel_path.as_os_str().is_empty() {
            return Err(ImportError::Config("Excelファイルを指定してください".into()));
        }
        if self.image_dir.as_os_str().is_empty() {
            return Err(ImportError::Config("画像フォルダを指定してください".into()));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            excel_path: PathBuf::new(),
            image_dir: PathBuf::new(),
            code_col: "A".into(),
            image_col: "F".into(),
            sheet_name: String::new(),
            worker_count: 10,
            row_height: 105.0,
            col_width: 20.0,
        }
    }
}
