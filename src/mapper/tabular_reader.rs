// ==========================================
// 文档映射引擎 - 表格读取器
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xlsb/.xls/.ods) / CSV (.csv)
// 输出: Grid（从 A1 到最后一个已用单元格的稠密文本矩形）
// 日期单元格按调用方给定格式输出；未给定时使用默认格式
// ==========================================

use crate::domain::Grid;
use crate::mapper::error::{MapperError, MapperResult};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::ReaderBuilder;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info, instrument};

/// 未指定日期格式时的默认输出
const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// GridReader Trait
// ==========================================
pub trait GridReader: Send + Sync {
    /// 读取一个工作表为 Grid
    ///
    /// # 错误
    /// - FileNotFound: 路径不存在
    /// - SheetNotFound: 工作表不存在
    fn read_grid(&self, path: &Path, sheet_name: &str, date_format: Option<&str>) -> MapperResult<Grid>;
}

// ==========================================
// Excel Reader 实现
// ==========================================
pub struct ExcelGridReader;

impl GridReader for ExcelGridReader {
    fn read_grid(&self, path: &Path, sheet_name: &str, date_format: Option<&str>) -> MapperResult<Grid> {
        ensure_exists(path)?;

        let mut workbook = open_workbook_auto(path)?;

        if !workbook.sheet_names().iter().any(|name| name == sheet_name) {
            return Err(MapperError::SheetNotFound(sheet_name.to_string()));
        }

        let range = workbook.worksheet_range(sheet_name)?;

        let (last_row, last_col) = match range.end() {
            Some(end) => end,
            None => {
                debug!("工作表 {} 为空", sheet_name);
                return Ok(Grid::default());
            }
        };

        let mut rows = Vec::with_capacity(last_row as usize + 1);
        for r in 0..=last_row {
            let mut row = Vec::with_capacity(last_col as usize + 1);
            for c in 0..=last_col {
                let text = match range.get_value((r, c)) {
                    Some(cell) => render_cell(cell, date_format)?,
                    None => String::new(),
                };
                row.push(text);
            }
            rows.push(row);
        }

        Ok(Grid::from_rows(rows))
    }
}

// ==========================================
// CSV Reader 实现
// ==========================================
// CSV 只有一个隐含工作表，sheet_name 不参与匹配
pub struct CsvGridReader;

impl GridReader for CsvGridReader {
    fn read_grid(&self, path: &Path, _sheet_name: &str, _date_format: Option<&str>) -> MapperResult<Grid> {
        ensure_exists(path)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Grid::from_rows(rows))
    }
}

// ==========================================
// 通用读取器（根据扩展名自动选择）
// ==========================================
pub struct TabularReader;

impl TabularReader {
    #[instrument(skip_all, fields(path = %file_path.as_ref().display(), sheet = sheet_name))]
    pub fn read<P: AsRef<Path>>(
        &self,
        file_path: P,
        sheet_name: &str,
        date_format: Option<&str>,
    ) -> MapperResult<Grid> {
        let path = file_path.as_ref();
        info!("读取表格: {} / {}", path.display(), sheet_name);

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let grid = match ext.as_str() {
            "csv" => CsvGridReader.read_grid(path, sheet_name, date_format)?,
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
                ExcelGridReader.read_grid(path, sheet_name, date_format)?
            }
            _ => {
                ensure_exists(path)?;
                return Err(MapperError::UnsupportedFormat(ext));
            }
        };

        info!(
            rows = grid.row_count(),
            columns = grid.column_count(),
            "表格读取完成"
        );
        Ok(grid)
    }
}

/// 读取表格（`TabularReader.read` 的函数形式）
pub fn read<P: AsRef<Path>>(file_path: P, sheet_name: &str, date_format: Option<&str>) -> MapperResult<Grid> {
    TabularReader.read(file_path, sheet_name, date_format)
}

fn ensure_exists(path: &Path) -> MapperResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(MapperError::FileNotFound(path.display().to_string()))
    }
}

fn render_cell(cell: &Data, date_format: Option<&str>) -> MapperResult<String> {
    match cell {
        Data::Empty => Ok(String::new()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => format_datetime(value, date_format),
            None => Ok(cell.to_string()),
        },
        Data::DateTimeIso(iso) => match parse_iso(iso) {
            Some(value) => format_datetime(value, date_format),
            None => Ok(iso.clone()),
        },
        other => Ok(other.to_string()),
    }
}

fn parse_iso(iso: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(iso, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// 按格式输出日期时间；格式串无效时返回 Configuration
pub fn format_datetime(value: NaiveDateTime, date_format: Option<&str>) -> MapperResult<String> {
    let pattern = match date_format {
        Some(f) => f,
        None if value.time() == NaiveTime::MIN => DEFAULT_DATE_FORMAT,
        None => DEFAULT_DATETIME_FORMAT,
    };

    let mut out = String::new();
    write!(out, "{}", value.format(pattern))
        .map_err(|_| MapperError::Configuration(format!("日期格式无效: '{}'", pattern)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_with_suffix(suffix: &str) -> NamedTempFile {
        tempfile::Builder::new().suffix(suffix).tempfile().unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_format_datetime_default() {
        assert_eq!(format_datetime(at(2024, 3, 1, 0), None).unwrap(), "2024-03-01");
        assert_eq!(
            format_datetime(at(2024, 3, 1, 9), None).unwrap(),
            "2024-03-01 09:00:00"
        );
    }

    #[test]
    fn test_format_datetime_custom() {
        assert_eq!(
            format_datetime(at(2024, 3, 1, 0), Some("%d.%m.%Y")).unwrap(),
            "01.03.2024"
        );
    }

    #[test]
    fn test_format_datetime_invalid_pattern() {
        let err = format_datetime(at(2024, 3, 1, 0), Some("%Q")).unwrap_err();
        assert!(matches!(err, MapperError::Configuration(_)));
    }

    #[test]
    fn test_render_cells() {
        assert_eq!(render_cell(&Data::Empty, None).unwrap(), "");
        assert_eq!(render_cell(&Data::Float(2.5), None).unwrap(), "2.5");
        assert_eq!(render_cell(&Data::Int(7), None).unwrap(), "7");
        assert_eq!(
            render_cell(&Data::String("ACME".to_string()), None).unwrap(),
            "ACME"
        );
        assert_eq!(
            render_cell(&Data::DateTimeIso("2024-03-01".to_string()), Some("%d.%m.%Y")).unwrap(),
            "01.03.2024"
        );
    }

    #[test]
    fn test_csv_reader_pads_rows() {
        let mut temp_file = temp_with_suffix(".csv");
        writeln!(temp_file, "Supplier,,").unwrap();
        writeln!(temp_file, "ACME").unwrap();
        writeln!(temp_file, ",Amount,Date").unwrap();
        writeln!(temp_file, ",10.5,01.02.2024").unwrap();

        let grid = read(temp_file.path(), "ignored", None).unwrap();

        assert_eq!(grid.row_count(), 4);
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.get(1, 0), Some("ACME"));
        assert_eq!(grid.get(1, 2), Some(""));
        assert_eq!(grid.get(3, 1), Some("10.5"));
    }

    #[test]
    fn test_file_not_found() {
        let err = read("no_such_file.xlsx", "Data", None).unwrap_err();
        assert!(matches!(err, MapperError::FileNotFound(_)));

        let err = read("no_such_file.csv", "Data", None).unwrap_err();
        assert!(matches!(err, MapperError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_file = temp_with_suffix(".txt");
        let err = read(temp_file.path(), "Data", None).unwrap_err();
        assert!(matches!(err, MapperError::UnsupportedFormat(_)));
    }
}
