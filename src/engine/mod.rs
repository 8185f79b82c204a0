//! 取り込みパイプライン
//!
//! コード→行番号のマッピングを1回作り、画像カタログと突き合わせて
//! ワーカープールへ仕事を流す。ドキュメントを変更するのは集約ループ
//! （このモジュールの`run`本体）だけで、ワーカーは画像の読み込みしか
//! しない。作業キューと結果キューはどちらも容量固定で、満杯になれば
//! 送信側が待たされる（バックプレッシャ）。

pub mod catalog;
pub mod scale;

use crate::config::RunConfig;
use crate::error::{ImportError, Result};
use crate::excel::{column_letter_to_index, XlsxDocument};
use crate::imageio::{self, LoadedImage};
use crate::progress::ProgressSender;
use log::warn;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// 作業キュー・結果キューの容量
const QUEUE_CAPACITY: usize = 100;

/// ワーカー1件分の仕事。ディスパッチャが作り、ちょうど1つのワーカーが消費する。
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub code: String,
    pub image_path: PathBuf,
    pub row: u32,
}

/// ワーカーの成果。画像の読み込み失敗もここに載せて集約側へ送る。
struct WorkResult {
    item: WorkItem,
    image: Result<LoadedImage>,
}

/// 1回の実行結果
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// 画像を埋め込めた件数
    pub processed: usize,
    /// 画像が見つからなかったコード（コード順）
    pub missing: Vec<String>,
    /// 読み込みまたは埋め込みに失敗したコード
    pub failed: Vec<String>,
    /// 保存した出力ファイル
    pub output_path: PathBuf,
}

pub struct Processor {
    config: RunConfig,
    progress: Option<ProgressSender>,
}

impl Processor {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config: config.normalized(),
            progress: None,
        }
    }

    pub fn set_progress(&mut self, sender: ProgressSender) {
        self.progress = Some(sender);
    }

    /// パイプライン全体を実行する。キャンセルされた場合は出力を保存せず
    /// `Cancelled` を返す。
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary> {
        self.config.validate()?;

        let mut doc = XlsxDocument::open(&self.config.excel_path)?;
        let sheet = self.resolve_sheet(&doc)?;
        let code_col = column_letter_to_index(&self.config.code_col)?;
        let image_col = column_letter_to_index(&self.config.image_col)?;

        // 1. マッピング: コード→行番号（1始まり）
        let index = build_code_index(&mut doc, &sheet, code_col, &cancel)?;
        let total = index.len();

        // 2. 画像カタログ
        let available = catalog::scan_image_dir(&self.config.image_dir)?;

        // 3. ディスパッチャ + ワーカープール
        let (job_tx, job_rx) = mpsc::channel::<WorkItem>(QUEUE_CAPACITY);
        let (result_tx, mut result_rx) = mpsc::channel::<WorkResult>(QUEUE_CAPACITY);

        let dispatcher = tokio::spawn(dispatch(
            index,
            available,
            self.config.image_dir.clone(),
            job_tx,
            cancel.clone(),
        ));

        let job_rx = Arc::new(Mutex::new(job_rx));
        for _ in 0..self.config.worker_count {
            tokio::spawn(worker(
                Arc::clone(&job_rx),
                result_tx.clone(),
                cancel.clone(),
            ));
        }
        // 手元のSenderを手放す。全ワーカーが終了した時点で結果キューが閉じ、
        // 途中の結果を取りこぼさない。
        drop(result_tx);

        // 4. 集約: ドキュメントを変更するのはこのループだけ
        let mut processed = 0usize;
        let mut failed = Vec::new();
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(ImportError::Cancelled),
                result = result_rx.recv() => match result {
                    Some(result) => result,
                    None => break,
                },
            };

            let image = match result.image {
                Ok(image) => image,
                Err(e) => {
                    warn!("{}: {}", result.item.code, e);
                    failed.push(result.item.code);
                    continue;
                }
            };

            if let Err(e) = self.embed(&mut doc, &sheet, image_col, &result.item, &image) {
                warn!("{}: {}", result.item.code, e);
                failed.push(result.item.code);
                continue;
            }

            processed += 1;
            if let Some(progress) = &self.progress {
                if total > 0 {
                    progress.publish(processed as f64 / total as f64);
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        let missing = dispatcher
            .await
            .map_err(|e| ImportError::Internal(format!("ディスパッチャが異常終了: {e}")))?;

        // 5. 保存とログ出力
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let ext = self
            .config
            .excel_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "xlsx".into());
        let output_path = timestamped_sibling(&self.config.excel_path, "output", &timestamp, &ext);
        doc.save_as(&output_path)?;

        if !missing.is_empty() {
            let log_path =
                timestamped_sibling(&self.config.excel_path, "missing", &timestamp, "log");
            // ログ書き込みの失敗は致命的ではない
            if let Err(e) = std::fs::write(&log_path, missing.join("\n")) {
                warn!("missingログを書き込めませんでした {}: {}", log_path.display(), e);
            }
        }

        Ok(RunSummary {
            processed,
            missing,
            failed,
            output_path,
        })
    }

    fn resolve_sheet(&self, doc: &XlsxDocument) -> Result<String> {
        if self.config.sheet_name.is_empty() {
            return doc
                .first_sheet()
                .map(str::to_string)
                .ok_or_else(|| ImportError::SheetRead("シートがありません".into()));
        }
        if !doc.has_sheet(&self.config.sheet_name) {
            return Err(ImportError::SheetNotFound(self.config.sheet_name.clone()));
        }
        Ok(self.config.sheet_name.clone())
    }

    fn embed(
        &self,
        doc: &mut XlsxDocument,
        sheet: &str,
        image_col: u16,
        item: &WorkItem,
        image: &LoadedImage,
    ) -> Result<()> {
        // 列幅はシート全体の設定だが、行ごとに繰り返しても同じ値なので問題ない
        doc.set_row_height(sheet, item.row, self.config.row_height);
        doc.set_column_width(sheet, image_col, self.config.col_width);

        let fit = scale::cell_fit_scale(
            self.config.row_height,
            self.config.col_width,
            image.width,
            image.height,
        );
        doc.add_picture(
            sheet,
            item.row,
            image_col,
            &image.data,
            fit,
            scale::IMAGE_OFFSET_PX,
        )
    }
}

/// シートを1回走査してコード→行番号の索引を作る。
/// 空白を除いたコードが空なら行を飛ばし、重複コードは後の行が勝つ。
fn build_code_index(
    doc: &mut XlsxDocument,
    sheet: &str,
    code_col: u16,
    cancel: &CancellationToken,
) -> Result<BTreeMap<String, u32>> {
    let mut index = BTreeMap::new();
    for (row, cells) in doc.rows(sheet)? {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        if cells.len() > code_col as usize {
            let code = cells[code_col as usize].trim();
            if !code.is_empty() {
                index.insert(code.to_string(), row);
            }
        }
    }
    Ok(index)
}

/// 索引をカタログと突き合わせ、一致した分を作業キューへ流す。
/// 一致しなかったコードを（コード順のまま）返す。
/// 戻り際にSenderがdropされ、ワーカーはキューの終端を検知する。
async fn dispatch(
    index: BTreeMap<String, u32>,
    available: HashMap<String, String>,
    image_dir: PathBuf,
    jobs: mpsc::Sender<WorkItem>,
    cancel: CancellationToken,
) -> Vec<String> {
    let mut missing = Vec::new();
    for (code, row) in index {
        if cancel.is_cancelled() {
            break;
        }
        match available.get(&code) {
            Some(file_name) => {
                let item = WorkItem {
                    image_path: image_dir.join(file_name),
                    code,
                    row,
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = jobs.send(item) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            None => missing.push(code),
        }
    }
    missing
}

/// ワーカー本体。仕事を1件取り、画像バイト列と寸法を読み、結果を返す。
/// 読み込み失敗は結果に載せて次の仕事へ進む（ワーカー自体は落ちない）。
async fn worker(
    jobs: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    results: mpsc::Sender<WorkResult>,
    cancel: CancellationToken,
) {
    loop {
        let item = {
            let mut rx = jobs.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => return,
                item = rx.recv() => match item {
                    Some(item) => item,
                    None => return,
                },
            }
        };

        let image = imageio::load_image(&item.image_path).await;
        let result = WorkResult { item, image };

        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = results.send(result) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

/// `<元のstem>_<tag>_<timestamp>.<ext>` を元ファイルと同じフォルダに作る
fn timestamped_sibling(excel_path: &Path, tag: &str, timestamp: &str, ext: &str) -> PathBuf {
    let stem = excel_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".into());
    let file_name = format!("{stem}_{tag}_{timestamp}.{ext}");
    match excel_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn write_codes(path: &Path, codes: &[(&str, u32)]) {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Sheet1").unwrap();
        for (code, row) in codes {
            worksheet.write_string(row - 1, 0, *code).unwrap();
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_build_code_index_basic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.xlsx");
        write_codes(&path, &[("P001", 1), ("P002", 2), ("P003", 3)]);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let index =
            build_code_index(&mut doc, "Sheet1", 0, &CancellationToken::new()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index["P001"], 1);
        assert_eq!(index["P003"], 3);
    }

    #[test]
    fn test_build_code_index_duplicate_last_wins() {
        // 同じコードが複数行にある場合、後の行が勝つのが仕様
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.xlsx");
        write_codes(&path, &[("X", 1), ("X", 2)]);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let index =
            build_code_index(&mut doc, "Sheet1", 0, &CancellationToken::new()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index["X"], 2);
    }

    #[test]
    fn test_build_code_index_trims_and_skips_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.xlsx");
        write_codes(&path, &[("  P001  ", 1), ("   ", 2), ("P002", 4)]);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let index =
            build_code_index(&mut doc, "Sheet1", 0, &CancellationToken::new()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index["P001"], 1);
        assert_eq!(index["P002"], 4);
    }

    #[test]
    fn test_build_code_index_skips_short_rows() {
        // コード列がC(=2)で、行のセルがそこまで無ければ読み飛ばす
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Sheet1").unwrap();
        worksheet.write_string(0, 0, "onlyA").unwrap();
        worksheet.write_string(1, 2, "P100").unwrap();
        workbook.save(&path).unwrap();

        let mut doc = XlsxDocument::open(&path).unwrap();
        let index =
            build_code_index(&mut doc, "Sheet1", 2, &CancellationToken::new()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index["P100"], 2);
    }

    #[test]
    fn test_build_code_index_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.xlsx");
        write_codes(&path, &[("P001", 1)]);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = build_code_index(&mut doc, "Sheet1", 0, &cancel);
        assert!(matches!(result, Err(ImportError::Cancelled)));
    }

    #[test]
    fn test_timestamped_sibling_paths() {
        let path = timestamped_sibling(
            Path::new("/data/台帳.xlsx"),
            "output",
            "20260830_120000",
            "xlsx",
        );
        assert_eq!(
            path,
            PathBuf::from("/data/台帳_output_20260830_120000.xlsx")
        );

        let log = timestamped_sibling(Path::new("book.xlsx"), "missing", "20260830_120000", "log");
        assert_eq!(log, PathBuf::from("book_missing_20260830_120000.log"));
    }
}
