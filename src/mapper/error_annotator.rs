// ==========================================
// 文档映射引擎 - 错误标注器（NG 文件）
// ==========================================
// 流程:
// 1. 源文件/输出文件须为 .xlsx/.xlsm，否则 UnsupportedFormat（不复制）
// 2. 输出文件不存在 → 先复制源文件（批次首个错误创建 NG 文件）
// 3. 打开输出工作簿，定位工作表
// 4. 按单元格归并错误: 填充高亮色 + 一条可见批注（多条消息换行拼接）
// 5. 原地保存；本次新建的 NG 文件在失败时删除
// 同一输出路径的标注在进程内串行执行（见 PathLocks）
// ==========================================

use crate::domain::ErrorMap;
use crate::mapper::error::{MapperError, MapperResult};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use umya_spreadsheet::structs::vml::spreadsheet::Visible;
use umya_spreadsheet::{Comment, CommentText, Worksheet};

/// 默认高亮色（ARGB 红色）
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "FFFF0000";
/// 批注字号
pub const DEFAULT_COMMENT_FONT_SIZE: f64 = 10.0;

/// 可标注的工作簿扩展名
const ANNOTATABLE_EXTENSIONS: [&str; 2] = ["xlsx", "xlsm"];

// ==========================================
// PathLocks - 按输出路径串行化
// ==========================================
// 键: 规范化后的父目录 + 文件名；无人持有的条目在释放时移除
#[derive(Debug, Clone, Default)]
struct PathLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl PathLocks {
    fn key_for(path: &Path) -> PathBuf {
        let absolute = std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf());

        let canonical = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => parent.canonicalize().ok().map(|dir| dir.join(name)),
            _ => None,
        };
        canonical.unwrap_or(absolute)
    }

    fn acquire(&self, key: &Path) -> MapperResult<Arc<Mutex<()>>> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| MapperError::Io(format!("锁获取失败: {}", e)))?;
        Ok(guard.entry(key.to_path_buf()).or_default().clone())
    }

    /// 调用方须先释放自己持有的 Arc
    fn release(&self, key: &Path) {
        if let Ok(mut guard) = self.inner.lock() {
            let unused = guard
                .get(key)
                .map(|lock| Arc::strong_count(lock) == 1)
                .unwrap_or(false);
            if unused {
                guard.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|g| g.len()).unwrap_or(0)
    }
}

// ==========================================
// ErrorAnnotator
// ==========================================
#[derive(Debug, Clone)]
pub struct ErrorAnnotator {
    highlight_color: String,
    comment_font_size: f64,
    locks: PathLocks,
}

impl Default for ErrorAnnotator {
    fn default() -> Self {
        Self::new(DEFAULT_HIGHLIGHT_COLOR, DEFAULT_COMMENT_FONT_SIZE)
    }
}

impl ErrorAnnotator {
    pub fn new(highlight_color: impl Into<String>, comment_font_size: f64) -> Self {
        Self {
            highlight_color: highlight_color.into(),
            comment_font_size,
            locks: PathLocks::default(),
        }
    }

    pub fn highlight_color(&self) -> &str {
        &self.highlight_color
    }

    pub fn comment_font_size(&self) -> f64 {
        self.comment_font_size
    }

    /// 将错误标注到输出文件
    ///
    /// # 参数
    /// - errors: 聚合后的错误
    /// - sheet_name: 目标工作表
    /// - source_path: 原始文件（输出文件不存在时复制）
    /// - output_path: NG 文件；已存在时在其基础上继续标注
    ///
    /// 同一单元格在一次调用中的多条消息合并为一条批注；
    /// 之后的调用再次命中该单元格时，批注内容被替换
    #[instrument(skip(self, errors), fields(errors = errors.error_count()))]
    pub fn annotate(
        &self,
        errors: &ErrorMap,
        sheet_name: &str,
        source_path: &Path,
        output_path: &Path,
    ) -> MapperResult<()> {
        ensure_annotatable(source_path)?;
        ensure_annotatable(output_path)?;

        let key = PathLocks::key_for(output_path);
        let lock = self.locks.acquire(&key)?;
        let result = match lock.lock() {
            Ok(_guard) => self.annotate_exclusive(errors, sheet_name, source_path, output_path),
            Err(e) => Err(MapperError::Io(format!("锁获取失败: {}", e))),
        };
        drop(lock);
        self.locks.release(&key);
        result
    }

    fn annotate_exclusive(
        &self,
        errors: &ErrorMap,
        sheet_name: &str,
        source_path: &Path,
        output_path: &Path,
    ) -> MapperResult<()> {
        let created = if output_path.exists() {
            false
        } else {
            if !source_path.exists() {
                return Err(MapperError::FileNotFound(source_path.display().to_string()));
            }
            if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(source_path, output_path)?;
            info!("创建 NG 文件: {}", output_path.display());
            true
        };

        let result = self.write_annotations(errors, sheet_name, output_path);
        if result.is_err() && created {
            if let Err(e) = std::fs::remove_file(output_path) {
                warn!("NG 文件清理失败: {}: {}", output_path.display(), e);
            }
        }
        result
    }

    fn write_annotations(
        &self,
        errors: &ErrorMap,
        sheet_name: &str,
        output_path: &Path,
    ) -> MapperResult<()> {
        let mut book = umya_spreadsheet::reader::xlsx::read(output_path)?;

        let worksheet = book
            .get_sheet_by_name_mut(sheet_name)
            .ok_or_else(|| MapperError::SheetNotFound(sheet_name.to_string()))?;

        // 按单元格归并，保持错误出现顺序
        let mut by_cell: IndexMap<(u32, u32), Vec<&str>> = IndexMap::new();
        for error in errors.iter_errors() {
            if error.message.is_empty() {
                continue;
            }
            by_cell
                .entry((error.column, error.row))
                .or_default()
                .push(error.message.as_str());
        }

        for (&(column, row), messages) in &by_cell {
            self.highlight_cell(worksheet, column, row);
            self.put_comment(worksheet, column, row, &messages.join("\n"));
        }

        umya_spreadsheet::writer::xlsx::write(&book, output_path)?;

        info!(
            "NG 文件标注完成: {}（{} 个单元格）",
            output_path.display(),
            by_cell.len()
        );
        Ok(())
    }

    fn highlight_cell(&self, worksheet: &mut Worksheet, column: u32, row: u32) {
        debug!(row, column, "高亮单元格");
        worksheet
            .get_style_mut((column, row))
            .set_background_color(self.highlight_color.as_str());
    }

    fn put_comment(&self, worksheet: &mut Worksheet, column: u32, row: u32, text: &str) {
        debug!(row, column, "写入批注: {}", text);

        let existing = worksheet.get_comments_mut().iter_mut().find(|c| {
            let coordinate = c.get_coordinate();
            *coordinate.get_col_num() == column && *coordinate.get_row_num() == row
        });

        match existing {
            Some(comment) => {
                // 整体替换，丢弃原有富文本
                let mut replaced = CommentText::default();
                replaced.set_text_string(text);
                comment.set_text(replaced);
                self.style_comment(comment);
            }
            None => {
                let mut comment = Comment::default();
                comment.new_comment((column, row));
                comment.set_text_string(text);
                self.style_comment(&mut comment);
                worksheet.add_comments(comment);
            }
        }
    }

    /// 批注常显 + 固定字号（VML 形状）
    fn style_comment(&self, comment: &mut Comment) {
        let shape = comment.get_shape_mut();
        let style = visible_style(shape.get_style());
        shape.set_style(style);

        let mut visible = Visible::default();
        visible.set_value(true);
        shape.get_client_data_mut().set_visible(visible);

        if let Some(text_box) = shape.get_text_box_mut() {
            text_box.set_innder(format!(
                "<div style=\"text-align:left;font-size:{}pt\"/>",
                self.comment_font_size
            ));
        }
    }
}

fn ensure_annotatable(path: &Path) -> MapperResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ANNOTATABLE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(MapperError::UnsupportedFormat(format!(
            "{}（标注仅支持 .xlsx/.xlsm）",
            path.display()
        )))
    }
}

/// VML 形状样式中的 visibility 置为 visible
fn visible_style(style: &str) -> String {
    let mut parts: Vec<String> = style
        .split(';')
        .filter(|p| !p.trim().is_empty() && !p.trim_start().starts_with("visibility:"))
        .map(str::to_string)
        .collect();
    parts.push("visibility:visible".to_string());
    parts.join(";")
}

/// 列号/行号（1 起）→ "B6" 形式的单元格引用
pub fn cell_reference(column: u32, row: u32) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &row.to_string()
}
