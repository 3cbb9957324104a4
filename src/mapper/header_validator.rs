// ==========================================
// 文档映射引擎 - 表头校验
// ==========================================
// 仅校验表格型绑定；空表头单元格不比较
// 快速失败: 首个不匹配即返回 HeaderMismatch，不累积
// ==========================================

use crate::domain::{ContentBinding, Grid};
use crate::mapper::error::{MapperError, MapperResult};
use tracing::warn;

/// 校验表头行文本与映射显示名一致（忽略大小写）
///
/// # 参数
/// - header_row: 表头行号（1 起）
///
/// # 返回
/// - Ok(grid): 原样返回
/// - Err(HeaderMismatch): 按列号顺序第一个不匹配的位置
pub fn validate_headers(bindings: &[ContentBinding], grid: Grid, header_row: u32) -> MapperResult<Grid> {
    check_headers(bindings, &grid, header_row)?;
    Ok(grid)
}

/// 借用形式的表头校验
pub fn check_headers(bindings: &[ContentBinding], grid: &Grid, header_row: u32) -> MapperResult<()> {
    let row_idx = (header_row as usize).checked_sub(1).ok_or_else(|| {
        MapperError::Configuration("表头行号必须从 1 开始".to_string())
    })?;

    let mut ordered: Vec<&ContentBinding> = bindings.iter().filter(|b| b.is_tabular()).collect();
    ordered.sort_by_key(|b| b.column_index);

    for binding in ordered {
        let column_idx = match (binding.column_index as usize).checked_sub(1) {
            Some(c) => c,
            None => continue,
        };

        let cell = grid.get(row_idx, column_idx).unwrap_or("");
        if cell.is_empty() {
            continue;
        }

        let expected = &binding.column.display_label;
        if cell.to_lowercase() != expected.to_lowercase() {
            warn!(
                row = header_row,
                column = binding.column_index,
                "表头不匹配: 期望 '{}'，实际 '{}'",
                expected,
                cell
            );
            return Err(MapperError::HeaderMismatch {
                row: header_row,
                expected: expected.clone(),
                actual: cell.to_string(),
            });
        }
    }

    Ok(())
}
