//! # 序列存储
//!
//! 目录结构（每个机器人一份拷贝）：
//!
//! ```text
//! <root>/<robot>/<name>.json        具名序列
//! <root>/<robot>/tmp/<name>.json    临时序列（关机时整体删除）
//! ```

use crate::sequence::Sequence;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 临时序列子目录名
pub const TMP_DIR: &str = "tmp";

/// 序列存储协作者
pub trait SequenceStore: Send + Sync {
    /// 保存序列（每个机器人一份），返回写入的文件路径
    fn save(&self, sequence: &Sequence) -> Result<Vec<PathBuf>>;

    /// 删除某个机器人的全部临时序列
    fn remove_temporary(&self, robot: &str) -> Result<()>;
}

/// 文件系统序列存储（JSON）
#[derive(Debug, Clone)]
pub struct FsSequenceStore {
    root: PathBuf,
}

impl FsSequenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 某个机器人的临时目录
    pub fn tmp_dir(&self, robot: &str) -> PathBuf {
        self.root.join(robot).join(TMP_DIR)
    }

    /// 序列文件路径
    pub fn sequence_path(&self, robot: &str, name: &str, temporary: bool) -> PathBuf {
        let dir = if temporary {
            self.tmp_dir(robot)
        } else {
            self.root.join(robot)
        };
        dir.join(format!("{}.json", name))
    }

    /// 加载序列（先查具名目录，再查临时目录）
    pub fn load(&self, robot: &str, name: &str) -> Result<Sequence> {
        validate_component("robot", robot)?;
        validate_component("sequence", name)?;

        let path = [false, true]
            .into_iter()
            .map(|temporary| self.sequence_path(robot, name, temporary))
            .find(|path| path.exists())
            .with_context(|| format!("序列不存在: {}/{}", robot, name))?;

        let content = fs::read_to_string(&path)
            .with_context(|| format!("读取序列文件失败: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("解析序列文件失败: {}", path.display()))
    }

    /// 列出某个机器人的具名序列（按名称排序）
    pub fn list(&self, robot: &str) -> Result<Vec<String>> {
        validate_component("robot", robot)?;

        let dir = self.root.join(robot);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("读取目录失败: {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl SequenceStore for FsSequenceStore {
    fn save(&self, sequence: &Sequence) -> Result<Vec<PathBuf>> {
        validate_component("sequence", sequence.name())?;
        if sequence.robots().is_empty() {
            bail!("序列 '{}' 没有关联的机器人", sequence.name());
        }

        let content = serde_json::to_string_pretty(sequence).context("序列化序列失败")?;

        let mut written = Vec::with_capacity(sequence.robots().len());
        for robot in sequence.robots() {
            validate_component("robot", robot)?;

            let path = self.sequence_path(robot, sequence.name(), sequence.is_temporary());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("创建序列目录失败: {}", parent.display()))?;
            }
            fs::write(&path, &content)
                .with_context(|| format!("写入序列文件失败: {}", path.display()))?;

            debug!(robot = %robot, path = %path.display(), "Sequence saved");
            written.push(path);
        }

        Ok(written)
    }

    fn remove_temporary(&self, robot: &str) -> Result<()> {
        validate_component("robot", robot)?;

        let dir = self.tmp_dir(robot);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("删除临时目录失败: {}", dir.display()))?;
            debug!(robot = %robot, dir = %dir.display(), "Temporary sequences removed");
        }
        Ok(())
    }
}

/// 名称只能是单个路径分量
fn validate_component(kind: &str, name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
    {
        bail!("无效的{}名称: {:?}", kind, name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let store = FsSequenceStore::new("/data/sequences");
        assert_eq!(
            store.sequence_path("woody", "wave", false),
            PathBuf::from("/data/sequences/woody/wave.json")
        );
        assert_eq!(
            store.sequence_path("woody", "abc", true),
            PathBuf::from("/data/sequences/woody/tmp/abc.json")
        );
    }

    #[test]
    fn test_validate_component() {
        assert!(validate_component("sequence", "greeting").is_ok());
        assert!(validate_component("sequence", "happy_wave-2").is_ok());

        assert!(validate_component("sequence", "").is_err());
        assert!(validate_component("sequence", "..").is_err());
        assert!(validate_component("sequence", "a/b").is_err());
        assert!(validate_component("sequence", "a\\b").is_err());
        assert!(validate_component("sequence", "../escape").is_err());
    }
}
