// ==========================================
// 文档映射引擎 - 记录类型能力接口
// ==========================================
// 职责: 以显式字段描述表代替运行时反射
//   - FieldDescriptor: 属性名 / 系统键 / 声明类型 / 校验规则
//   - RecordSchema:    每个记录类型构建一次，重复使用
//   - MappedRecord:    getField / setField / schema
// ==========================================

use crate::mapper::error::{MapperError, MapperResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// FieldKind - 声明的目标类型
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Decimal,
    Integer,
    String,
    Date,
    /// 引擎不支持转换的类型（转换时报 UnsupportedType）
    Other(&'static str),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Decimal => write!(f, "decimal"),
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::String => write!(f, "string"),
            FieldKind::Date => write!(f, "date"),
            FieldKind::Other(name) => write!(f, "{}", name),
        }
    }
}

// ==========================================
// FieldValue - 转换后的字段值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Decimal(f64),
    Integer(i32),
    Text(String),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// 取 decimal 值（Null → None）
    pub fn decimal(self, property: &str) -> MapperResult<Option<f64>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Decimal(v) => Ok(Some(v)),
            other => Err(mismatch(property, "decimal", &other)),
        }
    }

    /// 取 integer 值（Null → None）
    pub fn integer(self, property: &str) -> MapperResult<Option<i32>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Integer(v) => Ok(Some(v)),
            other => Err(mismatch(property, "integer", &other)),
        }
    }

    /// 取文本值（Null → None）
    pub fn text(self, property: &str) -> MapperResult<Option<String>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Text(v) => Ok(Some(v)),
            other => Err(mismatch(property, "string", &other)),
        }
    }

    /// 取日期值（Null → None）
    pub fn date(self, property: &str) -> MapperResult<Option<NaiveDate>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Date(v) => Ok(Some(v)),
            other => Err(mismatch(property, "date", &other)),
        }
    }
}

fn mismatch(property: &str, expected: &str, actual: &FieldValue) -> MapperError {
    MapperError::Configuration(format!(
        "属性 '{}' 期望 {} 类型，实际值 {:?}",
        property, expected, actual
    ))
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Decimal(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(FieldValue::Null, FieldValue::Decimal)
    }
}

impl From<Option<i32>> for FieldValue {
    fn from(v: Option<i32>) -> Self {
        v.map_or(FieldValue::Null, FieldValue::Integer)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(v: Option<String>) -> Self {
        v.map_or(FieldValue::Null, FieldValue::Text)
    }
}

impl From<Option<NaiveDate>> for FieldValue {
    fn from(v: Option<NaiveDate>) -> Self {
        v.map_or(FieldValue::Null, FieldValue::Date)
    }
}

// ==========================================
// FieldRule - 声明式校验规则（可由配置追加）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldRule {
    /// 非 Null，文本非空白
    Required {
        #[serde(default)]
        message: Option<String>,
    },
    /// 文本长度（字符数）
    Length {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
        #[serde(default)]
        message: Option<String>,
    },
    /// 数值范围（闭区间）
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        message: Option<String>,
    },
    /// 整串匹配的正则
    Pattern {
        pattern: String,
        #[serde(default)]
        message: Option<String>,
    },
}

impl FieldRule {
    pub fn required() -> Self {
        FieldRule::Required { message: None }
    }

    pub fn length(min: Option<usize>, max: Option<usize>) -> Self {
        FieldRule::Length {
            min,
            max,
            message: None,
        }
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        FieldRule::Range {
            min,
            max,
            message: None,
        }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        FieldRule::Pattern {
            pattern: pattern.into(),
            message: None,
        }
    }
}

// ==========================================
// FieldDescriptor / RecordSchema
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub property: String,
    /// 系统键（对应 ColumnDefinition::system_key）
    pub system_key: Option<String>,
    pub kind: FieldKind,
    pub rules: Vec<FieldRule>,
}

impl FieldDescriptor {
    pub fn new(property: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            property: property.into(),
            system_key: None,
            kind,
            rules: Vec::new(),
        }
    }

    pub fn system_key(mut self, key: impl Into<String>) -> Self {
        self.system_key = Some(key.into());
        self
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl RecordSchema {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn descriptor(&self, property: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.property == property)
    }

    /// 按系统键查找属性；必须恰好匹配一个
    pub fn by_system_key(&self, system_key: &str) -> MapperResult<&FieldDescriptor> {
        let mut matches = self
            .fields
            .iter()
            .filter(|f| f.system_key.as_deref() == Some(system_key));

        let first = matches.next().ok_or_else(|| {
            MapperError::Configuration(format!(
                "类型 '{}' 中不存在系统键为 '{}' 的属性",
                self.type_name, system_key
            ))
        })?;

        if matches.next().is_some() {
            return Err(MapperError::Configuration(format!(
                "类型 '{}' 中有多个属性声明了系统键 '{}'",
                self.type_name, system_key
            )));
        }

        Ok(first)
    }
}

// ==========================================
// MappedRecord - 可被引擎填充/导出的记录类型
// ==========================================
pub trait MappedRecord {
    /// 字段描述表（每个类型构建一次）
    fn schema() -> &'static RecordSchema;

    /// 读取属性当前值；未知属性返回 None
    fn get_field(&self, property: &str) -> Option<FieldValue>;

    /// 写入已转换的属性值
    fn set_field(&mut self, property: &str, value: FieldValue) -> MapperResult<()>;
}
