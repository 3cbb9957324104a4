// ==========================================
// 文档映射引擎 - 文档映射（Document Map）领域模型
// ==========================================
// 职责: 描述"哪一列/哪一行的单元格对应哪个逻辑字段"
// 来源: 外部持久化层（管理员维护），引擎只读
// ==========================================

use crate::mapper::error::{MapperError, MapperResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ==========================================
// ColumnDefinition - 可复用的字段描述
// ==========================================
// 约束: system_key 在所有 ColumnDefinition 中唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// 表头显示名称（表格型字段的表头必须与之匹配，忽略大小写）
    pub display_label: String,
    /// 系统键（对应记录类型上的某个属性）
    pub system_key: String,
}

impl ColumnDefinition {
    pub fn new(display_label: impl Into<String>, system_key: impl Into<String>) -> Self {
        Self {
            display_label: display_label.into(),
            system_key: system_key.into(),
        }
    }
}

// ==========================================
// ContentBinding - 字段 ↔ 单元格位置
// ==========================================
// - fixed_row = None: 表格型，值随数据行变化，列需带表头
// - fixed_row = Some(r): 固定行，无论处理哪一数据行都从第 r 行读取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBinding {
    pub column: ColumnDefinition,
    /// 列号（1 起）
    pub column_index: u32,
    /// 固定行号（1 起）
    #[serde(default)]
    pub fixed_row: Option<u32>,
}

impl ContentBinding {
    /// 创建表格型绑定
    pub fn tabular(column: ColumnDefinition, column_index: u32) -> Self {
        Self {
            column,
            column_index,
            fixed_row: None,
        }
    }

    /// 创建固定行绑定
    pub fn fixed(column: ColumnDefinition, column_index: u32, fixed_row: u32) -> Self {
        Self {
            column,
            column_index,
            fixed_row: Some(fixed_row),
        }
    }

    pub fn is_tabular(&self) -> bool {
        self.fixed_row.is_none()
    }
}

// ==========================================
// DocumentMap - 一份映射配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMap {
    pub name: String,
    /// 目标工作表名称
    pub sheet_name: String,
    /// 第一数据行（1 起）
    #[serde(default)]
    pub first_data_row: Option<u32>,
    /// 表头行（1 起），缺省为 first_data_row - 1
    #[serde(default)]
    pub header_row: Option<u32>,
    /// 默认输出目录（NG 文件）
    #[serde(default)]
    pub default_folder: Option<String>,
    /// 读取日期单元格时使用的格式（chrono strftime）
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub bindings: Vec<ContentBinding>,
}

fn default_active() -> bool {
    true
}

impl DocumentMap {
    pub fn new(name: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheet_name: sheet_name.into(),
            first_data_row: None,
            header_row: None,
            default_folder: None,
            date_format: None,
            is_active: true,
            bindings: Vec::new(),
        }
    }

    pub fn with_first_data_row(mut self, row: u32) -> Self {
        self.first_data_row = Some(row);
        self
    }

    pub fn with_header_row(mut self, row: u32) -> Self {
        self.header_row = Some(row);
        self
    }

    pub fn with_binding(mut self, binding: ContentBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// 从 JSON 文本解析（外部存储交付的映射定义）
    pub fn from_json(json: &str) -> MapperResult<Self> {
        let map: DocumentMap = serde_json::from_str(json)?;
        map.validate()?;
        Ok(map)
    }

    /// 从 JSON 文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> MapperResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MapperError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// 表头行号（1 起）
    ///
    /// 未显式配置时取第一数据行的上一行
    pub fn header_row(&self) -> Option<u32> {
        self.header_row.or_else(|| {
            self.first_data_row
                .and_then(|r| r.checked_sub(1))
                .filter(|r| *r >= 1)
        })
    }

    /// 按列号升序排列的绑定（导出/表头校验使用同一顺序）
    pub fn sorted_bindings(&self) -> Vec<&ContentBinding> {
        let mut sorted: Vec<&ContentBinding> = self.bindings.iter().collect();
        sorted.sort_by_key(|b| b.column_index);
        sorted
    }

    /// 按系统键查找绑定（取声明顺序中的第一个）
    pub fn binding_for(&self, system_key: &str) -> Option<&ContentBinding> {
        self.bindings
            .iter()
            .find(|b| b.column.system_key == system_key)
    }

    pub fn has_tabular_bindings(&self) -> bool {
        self.bindings.iter().any(ContentBinding::is_tabular)
    }

    /// 校验映射定义的结构约束
    ///
    /// - 列号/行号均为 1 起
    /// - 同一 (ColumnDefinition, 行模式) 组合不重复
    pub fn validate(&self) -> MapperResult<()> {
        if self.sheet_name.trim().is_empty() {
            return Err(MapperError::Configuration(format!(
                "映射 '{}' 未指定工作表",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if binding.column.system_key.trim().is_empty() {
                return Err(MapperError::Configuration(format!(
                    "映射 '{}' 中存在空系统键（列 {}）",
                    self.name, binding.column_index
                )));
            }
            if binding.column_index == 0 {
                return Err(MapperError::Configuration(format!(
                    "字段 '{}' 的列号必须从 1 开始",
                    binding.column.system_key
                )));
            }
            if binding.fixed_row == Some(0) {
                return Err(MapperError::Configuration(format!(
                    "字段 '{}' 的固定行号必须从 1 开始",
                    binding.column.system_key
                )));
            }
            if !seen.insert((binding.column.system_key.as_str(), binding.is_tabular())) {
                return Err(MapperError::Configuration(format!(
                    "字段 '{}' 在映射 '{}' 中重复绑定",
                    binding.column.system_key, self.name
                )));
            }
        }

        if self.first_data_row == Some(0) || self.header_row == Some(0) {
            return Err(MapperError::Configuration(format!(
                "映射 '{}' 的行号必须从 1 开始",
                self.name
            )));
        }

        Ok(())
    }
}
