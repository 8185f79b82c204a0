//! Excelドキュメントアダプタ
//!
//! calamine で元ブックを読み込み、rust_xlsxwriter で出力ブックを再構築する。
//! シートのセル範囲は最初に使われるときに読み込む（シート名一覧だけなら
//! 範囲を展開しない）。行高さ・列幅・画像はメモリ上に積んでおき、
//! `save_as` でセル値と合わせて書き出す。

use crate::error::{ImportError, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{Image, ObjectMovement, Workbook, XlsxError};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 列名("A", "F", "AA"...)を0始まりの列番号に変換する。
/// 大文字小文字は区別しない。XFD(16384列)まで。
pub fn column_letter_to_index(letters: &str) -> Result<u16> {
    if letters.is_empty() || letters.len() > 3 {
        return Err(ImportError::InvalidColumn(letters.to_string()));
    }
    let mut index: u32 = 0;
    for ch in letters.chars() {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return Err(ImportError::InvalidColumn(letters.to_string()));
        }
        index = index * 26 + (upper as u32 - 'A' as u32 + 1);
    }
    if index > 16384 {
        return Err(ImportError::InvalidColumn(letters.to_string()));
    }
    Ok((index - 1) as u16)
}

struct PlacedPicture {
    row: u32, // 1始まり
    col: u16, // 0始まり
    image: Image,
    offset: u32,
}

#[derive(Default)]
struct SheetEdits {
    row_heights: BTreeMap<u32, f64>,
    col_widths: BTreeMap<u16, f64>,
    pictures: Vec<PlacedPicture>,
}

/// 開いたExcelブック。変更は保存まで積むだけ。
pub struct XlsxDocument {
    reader: Xlsx<BufReader<File>>,
    names: Vec<String>,
    ranges: HashMap<String, Range<Data>>,
    edits: HashMap<String, SheetEdits>,
}

impl XlsxDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let reader: Xlsx<_> = open_workbook(path)
            .map_err(|e| ImportError::ExcelOpen(format!("{}: {}", path.display(), e)))?;
        let names = reader.sheet_names().to_vec();

        Ok(Self {
            reader,
            names,
            ranges: HashMap::new(),
            edits: HashMap::new(),
        })
    }

    /// ブック内のシート名（ブック順）
    pub fn sheet_names(&self) -> Vec<String> {
        self.names.clone()
    }

    pub fn first_sheet(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.names.iter().any(|name| name == sheet)
    }

    /// シートのセル範囲をキャッシュに読み込む。2回目以降は何もしない。
    fn ensure_loaded(&mut self, sheet: &str) -> Result<()> {
        if !self.has_sheet(sheet) {
            return Err(ImportError::SheetNotFound(sheet.to_string()));
        }
        if self.ranges.contains_key(sheet) {
            return Ok(());
        }
        let range = self
            .reader
            .worksheet_range(sheet)
            .map_err(|e| ImportError::SheetRead(format!("{}: {}", sheet, e)))?;
        self.ranges.insert(sheet.to_string(), range);
        Ok(())
    }

    /// シートの行を(1始まりの行番号, A列からのセル文字列)で返す。
    /// 使用範囲より前の行は存在しない（コードも入っていない）のでスキップされる。
    pub fn rows(&mut self, sheet: &str) -> Result<impl Iterator<Item = (u32, Vec<String>)> + '_> {
        self.ensure_loaded(sheet)?;
        let range = self
            .ranges
            .get(sheet)
            .ok_or_else(|| ImportError::SheetNotFound(sheet.to_string()))?;
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        Ok(range.rows().enumerate().map(move |(i, cells)| {
            let mut values = vec![String::new(); start_col as usize];
            values.extend(cells.iter().map(cell_to_string));
            (start_row + i as u32 + 1, values)
        }))
    }

    /// 行の高さ（ポイント）を設定。rowは1始まり。
    pub fn set_row_height(&mut self, sheet: &str, row: u32, height: f64) {
        self.edits_mut(sheet).row_heights.insert(row, height);
    }

    /// 列幅（文字数単位）を設定。colは0始まり。
    pub fn set_column_width(&mut self, sheet: &str, col: u16, width: f64) {
        self.edits_mut(sheet).col_widths.insert(col, width);
    }

    /// 画像をセルに配置する。バイト列の形式チェックはここで行うため、
    /// 不正な画像はアイテム単位のエラーになる。
    pub fn add_picture(
        &mut self,
        sheet: &str,
        row: u32,
        col: u16,
        data: &[u8],
        scale: f64,
        offset: u32,
    ) -> Result<()> {
        let image = Image::new_from_buffer(data)
            .map_err(|e| ImportError::Embed(e.to_string()))?
            .set_scale_width(scale)
            .set_scale_height(scale)
            .set_object_movement(ObjectMovement::MoveButDontSizeWithCells);

        self.edits_mut(sheet).pictures.push(PlacedPicture {
            row,
            col,
            image,
            offset,
        });
        Ok(())
    }

    /// 元のセル値と積んだ変更をまとめて新しいパスへ書き出す
    pub fn save_as(&mut self, path: &Path) -> Result<()> {
        let names = self.names.clone();
        for name in &names {
            self.ensure_loaded(name)?;
        }

        let mut workbook = Workbook::new();
        for name in &names {
            let Some(range) = self.ranges.get(name) else {
                continue;
            };
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(name.as_str()).map_err(save_err)?;

            let (start_row, start_col) = range.start().unwrap_or((0, 0));
            for (i, cells) in range.rows().enumerate() {
                let row = start_row + i as u32;
                for (j, cell) in cells.iter().enumerate() {
                    let col = start_col as u16 + j as u16;
                    match cell {
                        Data::Empty | Data::Error(_) => {}
                        Data::String(s) => {
                            worksheet.write_string(row, col, s.as_str()).map_err(save_err)?;
                        }
                        Data::Int(n) => {
                            worksheet.write_number(row, col, *n as f64).map_err(save_err)?;
                        }
                        Data::Float(f) => {
                            worksheet.write_number(row, col, *f).map_err(save_err)?;
                        }
                        Data::Bool(b) => {
                            worksheet.write_boolean(row, col, *b).map_err(save_err)?;
                        }
                        Data::DateTime(dt) => {
                            worksheet
                                .write_number(row, col, dt.as_f64())
                                .map_err(save_err)?;
                        }
                        Data::DateTimeIso(s) | Data::DurationIso(s) => {
                            worksheet.write_string(row, col, s.as_str()).map_err(save_err)?;
                        }
                    }
                }
            }

            if let Some(edits) = self.edits.get(name) {
                for (&row, &height) in &edits.row_heights {
                    worksheet.set_row_height(row - 1, height).map_err(save_err)?;
                }
                for (&col, &width) in &edits.col_widths {
                    worksheet.set_column_width(col, width).map_err(save_err)?;
                }
                for pic in &edits.pictures {
                    worksheet
                        .insert_image_with_offset(pic.row - 1, pic.col, &pic.image, pic.offset, pic.offset)
                        .map_err(save_err)?;
                }
            }
        }

        workbook
            .save(path)
            .map_err(|e| ImportError::ExcelSave(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    fn edits_mut(&mut self, sheet: &str) -> &mut SheetEdits {
        self.edits.entry(sheet.to_string()).or_default()
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        // エラーセルは保存時も書き出さないので、読み取りでも空扱いに揃える
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

fn save_err(e: XlsxError) -> ImportError {
    ImportError::ExcelSave(e.to_string())
}
