// ==========================================
// 文档映射引擎 - 单文档处理流程
// ==========================================
// 流程:
// 1. 映射结构校验
// 2. 读取工作表 → Grid
// 3. 表头校验（快速失败，不处理任何数据行）
// 4. 逐数据行: 新建记录 → 逐字段取值 → 转换/校验 → 合并 ErrorMap
// 5. 有错误时标注到 NG 文件
// 文件/工作表/配置/表头错误直接返回；单元格错误累积后继续
// ==========================================

use crate::config::EngineConfig;
use crate::domain::{DocumentMap, ErrorMap, Grid};
use crate::mapper::error::MapperResult;
use crate::mapper::error_annotator::ErrorAnnotator;
use crate::mapper::header_validator::check_headers;
use crate::mapper::record::MappedRecord;
use crate::mapper::tabular_reader::TabularReader;
use crate::mapper::validation::FieldValidator;
use crate::mapper::value_grafter::locate_cell;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// 单文档处理结果
#[derive(Debug, Clone)]
pub struct ProcessOutcome<R> {
    /// 每个数据行一条记录（无数据行时为仅含固定行字段的一条）
    pub records: Vec<R>,
    pub errors: ErrorMap,
}

impl<R> ProcessOutcome<R> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 参与映射的字段: 属性名 + 是否固定行
struct MappedField<'a> {
    property: &'a str,
    fixed: bool,
}

// ==========================================
// DocumentProcessor
// ==========================================
pub struct DocumentProcessor {
    config: EngineConfig,
    validator: FieldValidator,
    annotator: ErrorAnnotator,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl DocumentProcessor {
    pub fn new(config: EngineConfig) -> Self {
        let validator = config.validator();
        let annotator = config.annotator();
        Self {
            config,
            validator,
            annotator,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn annotator(&self) -> &ErrorAnnotator {
        &self.annotator
    }

    /// 读取映射指定的工作表（日期格式: 映射 > 配置 > 默认）
    pub fn load_grid(&self, map: &DocumentMap, source: &Path) -> MapperResult<Grid> {
        let date_format = map
            .date_format
            .as_deref()
            .or(self.config.date_format.as_deref());
        TabularReader.read(source, &map.sheet_name, date_format)
    }

    /// 对已读入的 Grid 执行映射与校验
    #[instrument(skip_all, fields(map = %map.name, rows = grid.row_count()))]
    pub fn process<R: MappedRecord + Default>(
        &self,
        map: &DocumentMap,
        grid: &Grid,
    ) -> MapperResult<ProcessOutcome<R>> {
        map.validate()?;

        if !map.is_active {
            warn!("映射 '{}' 未启用，仍按请求处理", map.name);
        }

        if let Some(header_row) = map.header_row() {
            if map.has_tabular_bindings() {
                check_headers(&map.bindings, grid, header_row)?;
            }
        }

        let fields = mapped_fields::<R>(map);
        let mut records = Vec::new();
        let mut errors = ErrorMap::new();
        let mut reported_fixed = HashSet::new();

        match map.first_data_row.filter(|_| map.has_tabular_bindings()) {
            Some(first_data_row) => {
                let start = (first_data_row - 1) as usize;
                for grid_row in start..grid.row_count() {
                    if self.config.skip_blank_rows && is_blank_row(map, grid, grid_row) {
                        debug!(row = grid_row + 1, "跳过空行");
                        continue;
                    }
                    let record = self.map_record(
                        map,
                        grid,
                        &fields,
                        Some(grid_row),
                        &mut errors,
                        &mut reported_fixed,
                    )?;
                    records.push(record);
                }
            }
            None => {
                let record = self.map_record(map, grid, &fields, None, &mut errors, &mut reported_fixed)?;
                records.push(record);
            }
        }

        info!(
            records = records.len(),
            error_fields = errors.len(),
            errors = errors.error_count(),
            "文档映射完成"
        );
        Ok(ProcessOutcome { records, errors })
    }

    /// 读取 → 映射校验 → 有错误时标注到 ng_output
    #[instrument(skip_all, fields(map = %map.name, source = %source.display()))]
    pub fn process_file<R: MappedRecord + Default>(
        &self,
        map: &DocumentMap,
        source: &Path,
        ng_output: &Path,
    ) -> MapperResult<ProcessOutcome<R>> {
        let grid = self.load_grid(map, source)?;
        let outcome = self.process::<R>(map, &grid)?;

        if !outcome.is_valid() {
            self.annotator
                .annotate(&outcome.errors, &map.sheet_name, source, ng_output)?;
        }

        Ok(outcome)
    }

    /// 构建一条记录；固定行字段的错误只在首次出现时记录
    fn map_record<R: MappedRecord + Default>(
        &self,
        map: &DocumentMap,
        grid: &Grid,
        fields: &[MappedField<'_>],
        grid_row: Option<usize>,
        errors: &mut ErrorMap,
        reported_fixed: &mut HashSet<String>,
    ) -> MapperResult<R> {
        let schema = R::schema();
        let mut record = R::default();

        for field in fields {
            let cell = match locate_cell(map, grid, schema, field.property, grid_row)? {
                Some(cell) => cell,
                None => continue,
            };

            let cell_errors = self.validator.set_and_validate(
                &mut record,
                field.property,
                cell.value.as_deref(),
                Some(cell.row),
                cell.column,
            )?;

            if field.fixed && !reported_fixed.insert(field.property.to_string()) {
                continue;
            }
            errors.merge_from(cell_errors);
        }

        Ok(record)
    }
}

/// 记录类型中声明了系统键且映射中存在绑定的字段
fn mapped_fields<R: MappedRecord>(map: &DocumentMap) -> Vec<MappedField<'static>> {
    R::schema()
        .fields()
        .iter()
        .filter_map(|descriptor| {
            let key = descriptor.system_key.as_deref()?;
            let binding = map.binding_for(key)?;
            Some(MappedField {
                property: descriptor.property.as_str(),
                fixed: !binding.is_tabular(),
            })
        })
        .collect()
}

/// 所有表格型绑定对应的单元格均为空（或越界）
fn is_blank_row(map: &DocumentMap, grid: &Grid, grid_row: usize) -> bool {
    map.bindings
        .iter()
        .filter(|b| b.is_tabular())
        .all(|b| {
            let column = (b.column_index as usize).saturating_sub(1);
            grid.get(grid_row, column)
                .map_or(true, |text| text.trim().is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellErrorKind, ColumnDefinition, ContentBinding};
    use crate::mapper::error::MapperError;
    use crate::mapper::record::fixtures::Invoice;
    use chrono::NaiveDate;

    fn text_rows(rows: &[&[&str]]) -> Grid {
        Grid::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn processor() -> DocumentProcessor {
        DocumentProcessor::new(EngineConfig {
            locale: Some("en".to_string()),
            ..Default::default()
        })
    }

    fn invoice_map() -> DocumentMap {
        DocumentMap::new("Invoices", "Data")
            .with_first_data_row(3)
            .with_binding(ContentBinding::fixed(
                ColumnDefinition::new("Supplier", "SUPPLIER"),
                1,
                1,
            ))
            .with_binding(ContentBinding::tabular(ColumnDefinition::new("Amount", "AMOUNT"), 2))
            .with_binding(ContentBinding::tabular(ColumnDefinition::new("Date", "INV_DATE"), 3))
    }

    #[test]
    fn test_process_rows() {
        let grid = text_rows(&[
            &["ACME", "", ""],
            &["", "Amount", "Date"],
            &["", "10.5", "01.03.2024"],
            &["", "", ""],
            &["", "7", "2024-03-02"],
        ]);

        let outcome = processor().process::<Invoice>(&invoice_map(), &grid).unwrap();

        assert!(outcome.is_valid());
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].supplier.as_deref(), Some("ACME"));
        assert_eq!(outcome.records[0].amount, Some(10.5));
        assert_eq!(
            outcome.records[1].invoice_date,
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
        assert_eq!(outcome.records[1].supplier.as_deref(), Some("ACME"));
    }

    #[test]
    fn test_cell_errors_accumulate_across_rows() {
        let grid = text_rows(&[
            &["ACME", "", ""],
            &["", "Amount", "Date"],
            &["", "abc", "01.03.2024"],
            &["", "-5", "someday"],
        ]);

        let outcome = processor().process::<Invoice>(&invoice_map(), &grid).unwrap();

        assert!(!outcome.is_valid());
        assert_eq!(outcome.records.len(), 2);

        let amount = outcome.errors.get("amount").unwrap();
        assert_eq!(amount.errors.len(), 2);
        assert_eq!((amount.errors[0].row, amount.errors[0].column), (3, 2));
        assert_eq!(amount.errors[0].kind, CellErrorKind::Coercion);
        assert_eq!((amount.errors[1].row, amount.errors[1].column), (4, 2));
        assert_eq!(amount.errors[1].kind, CellErrorKind::Validation);

        let date = outcome.errors.get("invoice_date").unwrap();
        assert_eq!((date.errors[0].row, date.errors[0].column), (4, 3));
    }

    #[test]
    fn test_fixed_row_error_reported_once_at_fixed_cell() {
        let grid = text_rows(&[
            &["", "", ""],
            &["", "Amount", "Date"],
            &["", "1", "01.03.2024"],
            &["", "2", "01.03.2024"],
        ]);

        let outcome = processor().process::<Invoice>(&invoice_map(), &grid).unwrap();

        let supplier = outcome.errors.get("supplier").unwrap();
        assert_eq!(supplier.errors.len(), 1);
        assert_eq!((supplier.errors[0].row, supplier.errors[0].column), (1, 1));
    }

    #[test]
    fn test_header_mismatch_aborts() {
        let grid = text_rows(&[
            &["ACME", "", ""],
            &["", "Total", "Date"],
            &["", "abc", "01.03.2024"],
        ]);

        let err = processor().process::<Invoice>(&invoice_map(), &grid).unwrap_err();
        assert!(matches!(err, MapperError::HeaderMismatch { row: 2, .. }));
    }

    #[test]
    fn test_fixed_only_map_yields_single_record() {
        let map = DocumentMap::new("Header", "Data").with_binding(ContentBinding::fixed(
            ColumnDefinition::new("Supplier", "SUPPLIER"),
            2,
            2,
        ));
        let grid = text_rows(&[&["", ""], &["", "Globex"]]);

        let outcome = processor().process::<Invoice>(&map, &grid).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].supplier.as_deref(), Some("Globex"));
    }

    #[test]
    fn test_blank_rows_kept_when_configured() {
        let processor = DocumentProcessor::new(EngineConfig {
            locale: Some("en".to_string()),
            skip_blank_rows: false,
            ..Default::default()
        });
        let grid = text_rows(&[
            &["ACME", "", ""],
            &["", "Amount", "Date"],
            &["", "1", "01.03.2024"],
            &["", "", ""],
        ]);

        let outcome = processor.process::<Invoice>(&invoice_map(), &grid).unwrap();

        assert_eq!(outcome.records.len(), 2);
        // 空日期无法转换
        let date = outcome.errors.get("invoice_date").unwrap();
        assert_eq!(date.errors[0].row, 4);
    }

    #[test]
    fn test_unsupported_type_is_fatal() {
        let map = invoice_map().with_binding(ContentBinding::tabular(
            ColumnDefinition::new("Paid", "PAID"),
            4,
        ));
        let grid = text_rows(&[
            &["ACME", "", "", ""],
            &["", "Amount", "Date", "Paid"],
            &["", "1", "01.03.2024", "yes"],
        ]);

        let err = processor().process::<Invoice>(&map, &grid).unwrap_err();
        assert!(matches!(err, MapperError::UnsupportedType { .. }));
    }
}
