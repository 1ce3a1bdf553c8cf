//! # Blossom Tools - 共享数据结构和外部协作者
//!
//! **依赖原则**: 只依赖 `blossom-driver` 的配置类型，避免依赖 `blossom-client`
//!
//! ## 包含模块
//!
//! - `sequence` - 动作序列（纯数据结构）
//! - `store` - 序列存储（文件系统）
//! - `upload` - 手势上传（HTTP，尽力而为）
//! - `robots` - 机器人配置文件

pub mod robots;
pub mod sequence;
pub mod store;
pub mod upload;

// 重新导出常用类型
pub use robots::RobotConfigFile;
pub use sequence::{Frame, Sequence};
pub use store::{FsSequenceStore, SequenceStore};
pub use upload::{GesturePayload, GestureSink, HttpGestureSink, LogGestureSink};
