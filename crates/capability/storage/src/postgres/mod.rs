//! # PostgreSQL 存储实现模块
//!
//! 生产环境使用，表位于 `mystrom` schema（见 `migrations/0001_init.sql`）：
//!
//! - `mystrom.configuration`：连接器配置（api_key、各类间隔、asset_filter JSON、
//!   enable/active 标记、project_ids 数组）
//! - `mystrom.asset`：身份记录，唯一键 (configuration_id, project_id, global_asset_id)，
//!   附加索引 `asset_asset_id_idx` 服务于反查
//!
//! 所有查询均为参数化查询；写入身份记录使用 `on conflict ... do update`，
//! 并发创建同一资产时由唯一约束裁决，不产生重复行。

pub mod asset;
pub mod configuration;

pub use asset::*;
pub use configuration::*;
