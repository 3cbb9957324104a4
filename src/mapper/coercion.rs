// ==========================================
// 文档映射引擎 - 类型转换
// ==========================================
// 规则（按声明类型）:
// - decimal: 空/空白/Null → Null；否则按当前语言数字习惯解析
// - integer: 整数解析；失败（含 Null）→ Coercion
// - string:  原样赋值（允许 Null）
// - date:    按 DATE_PATTERNS 顺序精确匹配，首个命中即返回
// - 其他:    UnsupportedType
// ==========================================

use crate::i18n;
use crate::mapper::error::{MapperError, MapperResult};
use crate::mapper::record::{FieldKind, FieldValue};
use chrono::NaiveDate;

/// 可接受的日期格式（日.月.年 / 年-月-日 / 月/日/年）
pub const DATE_PATTERNS: [&str; 3] = ["%d.%m.%Y", "%Y-%m-%d", "%m/%d/%Y"];

// ==========================================
// NumberConventions - 数字书写习惯
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberConventions {
    pub decimal_separator: char,
    pub group_separator: char,
}

impl Default for NumberConventions {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            group_separator: ',',
        }
    }
}

impl NumberConventions {
    /// 按语言代码推导（"ru" / "de-DE" / "zh-CN" ...）
    pub fn for_locale(locale: &str) -> Self {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        match language.as_str() {
            "ru" | "uk" | "be" | "kk" | "fr" | "pl" | "cs" | "sv" | "fi" | "nb" => Self {
                decimal_separator: ',',
                group_separator: '\u{a0}',
            },
            "de" | "es" | "it" | "pt" | "nl" | "id" | "tr" | "da" => Self {
                decimal_separator: ',',
                group_separator: '.',
            },
            _ => Self::default(),
        }
    }

    /// 当前 i18n 语言对应的数字习惯
    pub fn current() -> Self {
        Self::for_locale(&i18n::current_locale())
    }

    fn is_group_separator(&self, ch: char) -> bool {
        ch == self.group_separator || (self.group_separator.is_whitespace() && ch.is_whitespace())
    }
}

/// 按数字习惯解析小数
///
/// 允许: 前后空白、正负号、千分位、指数、括号表示负数
pub fn parse_decimal(text: &str, conventions: NumberConventions) -> Option<f64> {
    let trimmed = text.trim();

    let (negate, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };

    let mut normalized = String::with_capacity(body.len());
    let mut has_digit = false;
    for ch in body.chars() {
        if ch == conventions.decimal_separator {
            normalized.push('.');
        } else if conventions.is_group_separator(ch) {
            continue;
        } else if ch.is_ascii_digit() {
            has_digit = true;
            normalized.push(ch);
        } else if matches!(ch, '+' | '-' | 'e' | 'E') {
            normalized.push(ch);
        } else {
            return None;
        }
    }

    if !has_digit || (negate && normalized.starts_with(['-', '+'])) {
        return None;
    }

    let value = normalized.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negate { -value } else { value })
}

/// 按 DATE_PATTERNS 顺序精确解析日期
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(text, pattern).ok())
}

/// 将原始文本转换为字段声明类型的值
///
/// # 错误
/// - Coercion: 文本无法转换（单元格级，可累积）
/// - UnsupportedType: 声明类型不受支持（配置缺陷，致命）
pub fn coerce(
    field: &str,
    kind: &FieldKind,
    raw: Option<&str>,
    conventions: NumberConventions,
) -> MapperResult<FieldValue> {
    let failed = || MapperError::Coercion {
        field: field.to_string(),
        value: raw.unwrap_or_default().to_string(),
    };

    match kind {
        FieldKind::Decimal => match raw {
            None => Ok(FieldValue::Null),
            Some(text) if text.trim().is_empty() => Ok(FieldValue::Null),
            Some(text) => parse_decimal(text, conventions)
                .map(FieldValue::Decimal)
                .ok_or_else(failed),
        },
        FieldKind::Integer => raw
            .and_then(|text| text.trim().parse::<i32>().ok())
            .map(FieldValue::Integer)
            .ok_or_else(failed),
        FieldKind::String => Ok(raw.map_or(FieldValue::Null, |text| FieldValue::Text(text.to_string()))),
        FieldKind::Date => raw
            .and_then(parse_date)
            .map(FieldValue::Date)
            .ok_or_else(failed),
        FieldKind::Other(name) => Err(MapperError::UnsupportedType {
            field: field.to_string(),
            kind: name.to_string(),
        }),
    }
}

/// 转换失败的单元格提示文本（写入标注批注）
pub fn coercion_message(field: &str, value: &str) -> String {
    i18n::t_with_args(
        "coercion.invalid_format",
        &[("field", field), ("value", value)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EN: NumberConventions = NumberConventions {
        decimal_separator: '.',
        group_separator: ',',
    };

    fn ru() -> NumberConventions {
        NumberConventions::for_locale("ru-RU")
    }

    #[test]
    fn test_decimal_blank_is_null() {
        for raw in [None, Some(""), Some("   "), Some("\t")] {
            let v = coerce("amount", &FieldKind::Decimal, raw, EN).unwrap();
            assert_eq!(v, FieldValue::Null);
        }
    }

    #[test]
    fn test_decimal_parses_with_locale() {
        assert_eq!(parse_decimal("1,234.50", EN), Some(1234.5));
        assert_eq!(parse_decimal(" -12.5 ", EN), Some(-12.5));
        assert_eq!(parse_decimal("(7.25)", EN), Some(-7.25));
        assert_eq!(parse_decimal("1e3", EN), Some(1000.0));

        assert_eq!(parse_decimal("1\u{a0}234,5", ru()), Some(1234.5));
        assert_eq!(parse_decimal("1 234,5", ru()), Some(1234.5));
        assert_eq!(parse_decimal("1.5", ru()), None);

        let de = NumberConventions::for_locale("de");
        assert_eq!(parse_decimal("1.234,5", de), Some(1234.5));
    }

    #[test]
    fn test_decimal_rejects_non_numeric() {
        for raw in ["abc", "12abc", "NaN", "inf", "--", "(-1)", "1.2.3"] {
            let err = coerce("amount", &FieldKind::Decimal, Some(raw), EN).unwrap_err();
            assert!(
                matches!(err, MapperError::Coercion { ref field, .. } if field == "amount"),
                "{} should fail",
                raw
            );
        }
    }

    #[test]
    fn test_decimal_round_trip() {
        for v in [0.0, 12.5, -3.75, 1234567.125, 0.001] {
            let text = v.to_string();
            assert_eq!(
                coerce("amount", &FieldKind::Decimal, Some(&text), EN).unwrap(),
                FieldValue::Decimal(v)
            );
        }
    }

    #[test]
    fn test_integer() {
        assert_eq!(
            coerce("qty", &FieldKind::Integer, Some(" 42 "), EN).unwrap(),
            FieldValue::Integer(42)
        );
        assert_eq!(
            coerce("qty", &FieldKind::Integer, Some("-3"), EN).unwrap(),
            FieldValue::Integer(-3)
        );
        for raw in [None, Some(""), Some("4.5"), Some("x")] {
            assert!(matches!(
                coerce("qty", &FieldKind::Integer, raw, EN),
                Err(MapperError::Coercion { .. })
            ));
        }
    }

    #[test]
    fn test_string_verbatim() {
        assert_eq!(
            coerce("name", &FieldKind::String, Some("  ACME "), EN).unwrap(),
            FieldValue::Text("  ACME ".to_string())
        );
        assert_eq!(
            coerce("name", &FieldKind::String, None, EN).unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn test_date_patterns() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        for raw in ["15.03.2024", "2024-03-15", "03/15/2024"] {
            assert_eq!(
                coerce("d", &FieldKind::Date, Some(raw), EN).unwrap(),
                FieldValue::Date(expected)
            );
        }
    }

    #[test]
    fn test_date_round_trip_every_pattern() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
        for pattern in DATE_PATTERNS {
            let text = date.format(pattern).to_string();
            assert_eq!(parse_date(&text), Some(date), "pattern {}", pattern);
        }
    }

    #[test]
    fn test_date_first_pattern_wins() {
        // 03/04/2024 只匹配 月/日/年
        assert_eq!(
            parse_date("03/04/2024"),
            NaiveDate::from_ymd_opt(2024, 3, 4)
        );
    }

    #[test]
    fn test_date_rejects_other_formats() {
        for raw in ["2024/03/15", "15-03-2024", "March 15, 2024", "", "31.02.2024"] {
            assert!(matches!(
                coerce("d", &FieldKind::Date, Some(raw), EN),
                Err(MapperError::Coercion { .. })
            ));
        }
        assert!(matches!(
            coerce("d", &FieldKind::Date, None, EN),
            Err(MapperError::Coercion { .. })
        ));
    }

    #[test]
    fn test_unsupported_kind() {
        let err = coerce("paid", &FieldKind::Other("bool"), Some("true"), EN).unwrap_err();
        assert!(matches!(err, MapperError::UnsupportedType { ref kind, .. } if kind == "bool"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_conventions_for_locale() {
        assert_eq!(NumberConventions::for_locale("zh-CN"), EN);
        assert_eq!(NumberConventions::for_locale("en"), EN);
        assert_eq!(ru().decimal_separator, ',');
        assert_eq!(NumberConventions::for_locale("de_DE").group_separator, '.');
    }
}
