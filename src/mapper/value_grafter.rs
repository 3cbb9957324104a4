// ==========================================
// 文档映射引擎 - 取值器（逻辑字段 → 物理单元格）
// ==========================================
// 红线: 其他组件只能经由此处读取单元格数据
// - 固定行绑定: 读 grid[fixed_row-1, column-1]，忽略 row 参数
// - 表格型绑定: 读 grid[row, column-1]（row 为 0 起的 grid 行）
// ==========================================

use crate::domain::{ContentBinding, DocumentMap, Grid};
use crate::mapper::error::MapperResult;
use crate::mapper::field_resolver::resolve_system_name;
use crate::mapper::record::RecordSchema;

/// 取值结果：原始文本 + 单元格的表格坐标（1 起）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraftedCell {
    pub value: Option<String>,
    pub row: u32,
    pub column: u32,
}

/// 提取字段的原始单元格文本
///
/// # 返回
/// - Ok(None): 映射中无该字段，或表格型字段未给出行
/// - Err: 属性未声明系统键（Configuration）
pub fn extract_value(
    map: &DocumentMap,
    grid: &Grid,
    schema: &RecordSchema,
    property: &str,
    row: Option<usize>,
) -> MapperResult<Option<String>> {
    Ok(locate_cell(map, grid, schema, property, row)?.and_then(|cell| cell.value))
}

/// 同 `extract_value`，额外返回单元格坐标（用于错误标注）
pub fn locate_cell(
    map: &DocumentMap,
    grid: &Grid,
    schema: &RecordSchema,
    property: &str,
    row: Option<usize>,
) -> MapperResult<Option<GraftedCell>> {
    let system_name = resolve_system_name(schema, property)?;

    let binding = match map.binding_for(system_name) {
        Some(b) => b,
        None => return Ok(None),
    };

    Ok(graft(binding, grid, row))
}

fn graft(binding: &ContentBinding, grid: &Grid, row: Option<usize>) -> Option<GraftedCell> {
    let column_idx = (binding.column_index as usize).checked_sub(1)?;

    let grid_row = match (binding.fixed_row, row) {
        (Some(fixed), _) => (fixed as usize).checked_sub(1)?,
        (None, Some(r)) => r,
        (None, None) => return None,
    };

    Some(GraftedCell {
        value: grid.get(grid_row, column_idx).map(str::to_string),
        row: grid_row as u32 + 1,
        column: binding.column_index,
    })
}
