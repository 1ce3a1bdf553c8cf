//! 操作员终端
//!
//! 命令解释器只通过 `Console` 读写，终端实现基于 rustyline（保留历史记录），
//! 测试使用脚本化实现。

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// 一次读取的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// 一行输入（已去除首尾空白）
    Text(String),
    /// Ctrl+C
    Interrupted,
    /// Ctrl+D / 输入结束
    Eof,
}

/// 操作员交互接口
pub trait Console {
    /// 显示提示符并读取一行
    fn read_line(&mut self, prompt: &str) -> Line;

    /// 向操作员输出一条消息
    fn say(&mut self, message: &str);
}

/// rustyline 终端
pub struct TerminalConsole {
    editor: DefaultEditor,
}

impl TerminalConsole {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new()
            .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;
        Ok(Self { editor })
    }
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> Line {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if !line.is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Line::Text(line)
            },
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                Line::Interrupted
            },
            Err(ReadlineError::Eof) => Line::Eof,
            Err(err) => {
                tracing::warn!(error = %err, "Readline failed");
                Line::Eof
            },
        }
    }

    fn say(&mut self, message: &str) {
        println!("{}", message);
    }
}
