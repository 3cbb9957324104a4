// ==========================================
// 文档映射引擎 - Grid（工作表快照）
// ==========================================
// 不可变的矩形文本单元格数组；内部坐标 0 起
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    columns: usize,
    cells: Vec<String>,
}

impl Grid {
    /// 由不等长的行构建；短行以空字符串补齐到最宽行
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let row_count = rows.len();
        let mut cells = Vec::with_capacity(row_count * columns);

        for mut row in rows {
            row.resize(columns, String::new());
            cells.extend(row);
        }

        Self {
            rows: row_count,
            columns,
            cells,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }

    /// 读取单元格（0 起）；越界返回 None
    pub fn get(&self, row: usize, column: usize) -> Option<&str> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.cells
            .get(row * self.columns + column)
            .map(String::as_str)
    }

    /// 读取一整行（0 起）
    pub fn row(&self, row: usize) -> Option<&[String]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.columns;
        Some(&self.cells[start..start + self.columns])
    }
}
