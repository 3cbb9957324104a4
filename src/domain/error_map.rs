// ==========================================
// 文档映射引擎 - 单元格错误聚合
// ==========================================
// CellError: 一条校验失败（带 1 起的表格坐标，可直接标注）
// ErrorMap:  字段名 → FieldErrors；合并同名字段时追加错误列表，不覆盖
// ==========================================

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 错误来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellErrorKind {
    /// 原始文本无法转换为目标类型
    Coercion,
    /// 转换成功但未通过字段规则
    Validation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellError {
    pub field: String,
    /// 行号（1 起）
    pub row: u32,
    /// 列号（1 起）
    pub column: u32,
    pub message: String,
    pub kind: CellErrorKind,
}

/// 单个字段的错误列表 + 最近一次写入的原始值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    pub value: Option<String>,
    pub errors: Vec<CellError>,
}

impl FieldErrors {
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMap {
    entries: IndexMap<String, FieldErrors>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|e| !e.has_error())
    }

    /// 出错字段数
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.has_error()).count()
    }

    /// 全部错误条数
    pub fn error_count(&self) -> usize {
        self.entries.values().map(|e| e.errors.len()).sum()
    }

    pub fn get(&self, field: &str) -> Option<&FieldErrors> {
        self.entries.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldErrors)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 按字段出现顺序遍历所有错误
    pub fn iter_errors(&self) -> impl Iterator<Item = &CellError> {
        self.entries.values().flat_map(|e| e.errors.iter())
    }

    /// 追加一条错误，同时记录该字段最近的原始值
    pub fn push(&mut self, error: CellError, value: Option<String>) {
        let entry = self.entries.entry(error.field.clone()).or_default();
        entry.value = value;
        entry.errors.push(error);
    }

    /// 原地合并：同名字段追加错误列表，新字段直接插入
    pub fn merge_from(&mut self, other: ErrorMap) {
        for (field, incoming) in other.entries {
            match self.entries.get_mut(&field) {
                Some(existing) => {
                    existing.errors.extend(incoming.errors);
                    if incoming.value.is_some() {
                        existing.value = incoming.value;
                    }
                }
                None => {
                    self.entries.insert(field, incoming);
                }
            }
        }
    }

    /// 合并两个 ErrorMap 并返回新值
    pub fn merge(mut self, other: ErrorMap) -> ErrorMap {
        self.merge_from(other);
        self
    }
}

impl Extend<CellError> for ErrorMap {
    fn extend<T: IntoIterator<Item = CellError>>(&mut self, iter: T) {
        for error in iter {
            let entry = self.entries.entry(error.field.clone()).or_default();
            entry.errors.push(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(field: &str, row: u32, column: u32) -> CellError {
        CellError {
            field: field.to_string(),
            row,
            column,
            message: format!("bad {}", field),
            kind: CellErrorKind::Validation,
        }
    }

    #[test]
    fn test_push_accumulates_per_field() {
        let mut map = ErrorMap::new();
        map.push(err("amount", 6, 2), Some("abc".to_string()));
        map.push(err("amount", 7, 2), Some("xyz".to_string()));

        let entry = map.get("amount").unwrap();
        assert_eq!(entry.errors.len(), 2);
        assert_eq!(entry.value.as_deref(), Some("xyz"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.error_count(), 2);
    }

    #[test]
    fn test_merge_concatenates_same_field() {
        let mut a = ErrorMap::new();
        a.push(err("amount", 6, 2), None);
        a.push(err("supplier", 3, 1), None);

        let mut b = ErrorMap::new();
        b.push(err("amount", 7, 2), None);
        b.push(err("amount", 8, 2), None);

        let merged = a.merge(b);
        assert_eq!(merged.get("amount").unwrap().errors.len(), 3);
        assert_eq!(merged.get("supplier").unwrap().errors.len(), 1);
        assert_eq!(merged.error_count(), 4);

        let rows: Vec<u32> = merged.get("amount").unwrap().errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![6, 7, 8]);
    }

    #[test]
    fn test_merge_with_empty_keeps_entries() {
        let mut a = ErrorMap::new();
        a.push(err("amount", 6, 2), None);

        let merged = a.clone().merge(ErrorMap::new());
        assert_eq!(merged, a);

        let merged = ErrorMap::new().merge(a.clone());
        assert_eq!(merged, a);
    }

    #[test]
    fn test_iter_errors_in_field_order() {
        let mut map = ErrorMap::new();
        map.push(err("supplier", 3, 1), None);
        map.push(err("amount", 6, 2), None);
        map.push(err("supplier", 3, 1), None);

        let fields: Vec<&str> = map.iter_errors().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["supplier", "supplier", "amount"]);
    }

    #[test]
    fn test_empty_map() {
        let map = ErrorMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.iter_errors().count(), 0);
    }
}
