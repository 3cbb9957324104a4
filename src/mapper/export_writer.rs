// ==========================================
// 文档映射引擎 - 导出写入器
// ==========================================
// 表头: 按列号升序写显示名，从第 1 列起逐列推进
// 数据: 每条记录一行，列号每行重置为 1
//       值可解析为日期 → 写 Excel 日期序列号，并记录列号（去重）
//       否则按字符串原样写入（不推断数字/布尔类型）
// 日期列的显示格式由调用方另行设置（apply_date_format）
// ==========================================

use crate::config::EngineConfig;
use crate::domain::{ContentBinding, DocumentMap};
use crate::mapper::coercion::parse_date;
use crate::mapper::error::{MapperError, MapperResult};
use crate::mapper::record::MappedRecord;
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info, instrument};
use umya_spreadsheet::Worksheet;

/// 按列号升序排列
fn ordered(bindings: &[ContentBinding]) -> Vec<&ContentBinding> {
    let mut sorted: Vec<&ContentBinding> = bindings.iter().collect();
    sorted.sort_by_key(|b| b.column_index);
    sorted
}

/// Excel 日期序列号（1900 日期系统）
pub fn excel_serial(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as f64
}

/// 写表头行
///
/// # 返回
/// 下一可写行号（1 起）
pub fn write_header(bindings: &[ContentBinding], worksheet: &mut Worksheet, start_row: u32) -> u32 {
    for (offset, binding) in ordered(bindings).into_iter().enumerate() {
        let column = offset as u32 + 1;
        worksheet
            .get_cell_mut((column, start_row))
            .set_value_string(binding.column.display_label.as_str());
    }
    start_row + 1
}

/// 写数据行
///
/// # 参数
/// - date_columns: 写入过日期值的列号（1 起，去重追加）
///
/// # 返回
/// 下一可写行号（1 起）
pub fn write_rows<R: MappedRecord>(
    bindings: &[ContentBinding],
    worksheet: &mut Worksheet,
    records: &[R],
    start_row: u32,
    date_columns: &mut Vec<u32>,
) -> MapperResult<u32> {
    let schema = R::schema();
    let columns = ordered(bindings);

    let mut row = start_row;
    for record in records {
        for (offset, binding) in columns.iter().enumerate() {
            let column = offset as u32 + 1;
            let descriptor = schema.by_system_key(&binding.column.system_key)?;

            let value = record.get_field(&descriptor.property).ok_or_else(|| {
                MapperError::Configuration(format!(
                    "类型 '{}' 无法读取属性 '{}'",
                    schema.type_name(),
                    descriptor.property
                ))
            })?;

            let text = value.to_string();
            if text.is_empty() {
                continue;
            }

            let cell = worksheet.get_cell_mut((column, row));
            match parse_date(&text) {
                Some(date) => {
                    cell.set_value_number(excel_serial(date));
                    if !date_columns.contains(&column) {
                        date_columns.push(column);
                    }
                }
                None => {
                    cell.set_value_string(text);
                }
            }
        }
        row += 1;
    }

    debug!(records = records.len(), "数据行写入完成");
    Ok(row)
}

/// 为日期列设置显示格式（行号闭区间，1 起）
pub fn apply_date_format(
    worksheet: &mut Worksheet,
    date_columns: &[u32],
    first_row: u32,
    last_row: u32,
    format_code: &str,
) {
    for &column in date_columns {
        for row in first_row..=last_row {
            worksheet
                .get_style_mut((column, row))
                .get_number_format_mut()
                .set_format_code(format_code);
        }
    }
}

// ==========================================
// ExportWriter - 整表导出
// ==========================================
pub struct ExportWriter {
    date_format_code: String,
}

impl Default for ExportWriter {
    fn default() -> Self {
        Self {
            date_format_code: "yyyy-mm-dd".to_string(),
        }
    }
}

impl ExportWriter {
    pub fn new(date_format_code: impl Into<String>) -> Self {
        Self {
            date_format_code: date_format_code.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.export_date_format.clone())
    }

    /// 将记录导出为新工作簿（单个工作表，名称取自映射）
    #[instrument(skip(self, map, records), fields(map = %map.name, records = records.len()))]
    pub fn export_to_file<R: MappedRecord>(
        &self,
        map: &DocumentMap,
        records: &[R],
        output_path: &Path,
    ) -> MapperResult<()> {
        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        let worksheet = book
            .new_sheet(map.sheet_name.as_str())
            .map_err(|e| MapperError::Spreadsheet(format!("创建工作表失败: {}", e)))?;

        let first_data_row = write_header(&map.bindings, worksheet, 1);
        let mut date_columns = Vec::new();
        let next_row = write_rows(&map.bindings, worksheet, records, first_data_row, &mut date_columns)?;

        if next_row > first_data_row {
            apply_date_format(
                worksheet,
                &date_columns,
                first_data_row,
                next_row - 1,
                &self.date_format_code,
            );
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        umya_spreadsheet::writer::xlsx::write(&book, output_path)?;

        info!(
            "导出完成: {}（{} 行，日期列 {:?}）",
            output_path.display(),
            records.len(),
            date_columns
        );
        Ok(())
    }
}
