use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("列名が不正です: {0}")]
    InvalidColumn(String),

    #[error("Excelを開けません: {0}")]
    ExcelOpen(String),

    #[error("シートが見つかりません: {0}")]
    SheetNotFound(String),

    #[error("シート読み込みエラー: {0}")]
    SheetRead(String),

    #[error("画像フォルダを読み込めません: {0}")]
    ImageDirUnreadable(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像埋め込みエラー: {0}")]
    Embed(String),

    #[error("Excel保存エラー: {0}")]
    ExcelSave(String),

    #[error("処理がキャンセルされました")]
    Cancelled,

    #[error("内部エラー: {0}")]
    Internal(String),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON生成エラー: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
