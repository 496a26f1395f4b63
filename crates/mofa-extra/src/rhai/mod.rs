//! Rhai 脚本引擎集成模块
//!
//! 为 MoFA 框架提供 Rhai 嵌入式脚本支持，实现：
//! 1. 动态工作流节点脚本化
//! 2. 条件判断和数据转换的脚本化定义
//! 3. 动态工具定义
//! 4. 配置驱动的规则引擎
//! 5. 热重载脚本支持

pub mod engine;
pub mod rules;
pub mod tools;
pub mod workflow;

pub use engine::*;
pub use rules::*;
pub use tools::*;
pub use workflow::*;
