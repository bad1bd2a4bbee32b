// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::cursor::ImportCursor;
use crate::domain::repositories::job_repository::RepositoryError;
use async_trait::async_trait;

/// 导入游标仓库特质
///
/// 每个用户一行，游走器在每页开始前读取、推进后立即持久化。
#[async_trait]
pub trait CursorRepository: Send + Sync {
    /// 读取用户游标，不存在时返回None
    async fn find_by_user(&self, username: &str) -> Result<Option<ImportCursor>, RepositoryError>;
    /// 写入用户游标（存在则更新，不存在则插入）
    async fn save(&self, cursor: &ImportCursor) -> Result<ImportCursor, RepositoryError>;
    /// 删除用户游标
    async fn delete(&self, username: &str) -> Result<(), RepositoryError>;
}
