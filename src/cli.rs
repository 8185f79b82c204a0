use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-to-excel")]
#[command(about = "商品コード画像Excel一括挿入ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像をExcelへ一括挿入する
    Run {
        /// 入力Excelファイル（.xlsx）
        #[arg(required = true)]
        excel: PathBuf,

        /// 画像フォルダ（直下のみ走査）
        #[arg(required = true)]
        image_dir: PathBuf,

        /// 商品コードの列
        #[arg(long, default_value = "A")]
        code_col: String,

        /// 画像を挿入する列
        #[arg(long, default_value = "F")]
        image_col: String,

        /// 対象シート名（省略時は先頭シート）
        #[arg(short, long, default_value = "")]
        sheet: String,

        /// ワーカー数（0でCPU論理コア数）
        #[arg(short, long, default_value = "10")]
        workers: usize,

        /// 行の高さ（ポイント）
        #[arg(long, default_value = "105")]
        row_height: f64,

        /// 画像列の幅（文字数単位）
        #[arg(long, default_value = "20")]
        col_width: f64,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// Excelのシート名一覧を表示する
    Sheets {
        /// 入力Excelファイル
        #[arg(required = true)]
        excel: PathBuf,
    },
}
