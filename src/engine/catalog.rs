//! 画像カタログ
//!
//! 画像フォルダを1回だけ走査して、拡張子を除いたファイル名（stem）→
//! ファイル名の対応表を作る。stemと商品コードの照合は大文字小文字を区別する。

use crate::error::{ImportError, Result};
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

/// 対象となる画像拡張子（小文字で比較）
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// フォルダ直下の画像ファイルを stem → ファイル名 で返す。サブフォルダは見ない。
pub fn scan_image_dir(dir: &Path) -> Result<HashMap<String, String>> {
    if !dir.is_dir() {
        return Err(ImportError::ImageDirUnreadable(dir.display().to_string()));
    }

    let mut catalog = HashMap::new();

    for entry in WalkDir::new(dir).max_depth(1) {
        // 直下のみ（再帰しない）。一覧が取れないフォルダは致命的エラー。
        let entry = entry.map_err(|e| {
            ImportError::ImageDirUnreadable(format!("{}: {}", dir.display(), e))
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(ext) = path.extension() else {
            continue;
        };
        let ext = ext.to_string_lossy().to_lowercase();
        if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        if let Some(stem) = path.file_stem() {
            catalog.insert(stem.to_string_lossy().to_string(), file_name);
        }
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    #[test]
    fn test_scan_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("P001.png")).unwrap();
        File::create(dir.path().join("P002.JPG")).unwrap();
        File::create(dir.path().join("P003.webp")).unwrap();
        File::create(dir.path().join("readme.txt")).unwrap();
        File::create(dir.path().join("P004.bmp")).unwrap();

        let catalog = scan_image_dir(dir.path()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog["P001"], "P001.png");
        assert_eq!(catalog["P002"], "P002.JPG");
        assert_eq!(catalog["P003"], "P003.webp");
    }

    #[test]
    fn test_scan_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        File::create(sub.join("P001.png")).unwrap();
        File::create(dir.path().join("P002.png")).unwrap();

        let catalog = scan_image_dir(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains_key("P002"));
    }

    #[test]
    fn test_scan_stem_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("p001.png")).unwrap();

        let catalog = scan_image_dir(dir.path()).unwrap();
        assert!(catalog.contains_key("p001"));
        assert!(!catalog.contains_key("P001"));
    }

    #[test]
    fn test_scan_keeps_dots_in_stem() {
        // "A.B.png" の stem は "A.B"（最後の拡張子だけ外す）
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("A.B.png")).unwrap();

        let catalog = scan_image_dir(dir.path()).unwrap();
        assert_eq!(catalog["A.B"], "A.B.png");
    }

    #[test]
    fn test_scan_missing_dir_fails() {
        let result = scan_image_dir(Path::new("/nonexistent/images"));
        assert!(matches!(result, Err(ImportError::ImageDirUnreadable(_))));
    }
}
