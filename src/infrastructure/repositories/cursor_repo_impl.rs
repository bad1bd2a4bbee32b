// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::cursor::ImportCursor;
use crate::domain::repositories::cursor_repository::CursorRepository;
use crate::domain::repositories::job_repository::RepositoryError;
use crate::infrastructure::database::entities::import_cursor as cursor_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;

/// 导入游标仓库实现
#[derive(Clone)]
pub struct CursorRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl CursorRepositoryImpl {
    /// 创建新的游标仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<cursor_entity::Model> for ImportCursor {
    fn from(model: cursor_entity::Model) -> Self {
        Self {
            username: model.username,
            backfilling: model.backfilling,
            max_id: model.max_id,
            since_id: model.since_id,
            updated_at: model.updated_at,
        }
    }
}

impl From<ImportCursor> for cursor_entity::ActiveModel {
    fn from(cursor: ImportCursor) -> Self {
        Self {
            username: Set(cursor.username.clone()),
            backfilling: Set(cursor.backfilling),
            max_id: Set(cursor.max_id),
            since_id: Set(cursor.since_id),
            updated_at: Set(cursor.updated_at),
        }
    }
}

#[async_trait]
impl CursorRepository for CursorRepositoryImpl {
    async fn find_by_user(&self, username: &str) -> Result<Option<ImportCursor>, RepositoryError> {
        let model = cursor_entity::Entity::find_by_id(username.to_string())
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn save(&self, cursor: &ImportCursor) -> Result<ImportCursor, RepositoryError> {
        let existing = cursor_entity::Entity::find_by_id(cursor.username.clone())
            .one(self.db.as_ref())
            .await?;

        let mut model: cursor_entity::ActiveModel = cursor.clone().into();
        model.updated_at = Set(Utc::now().into());

        let saved = if existing.is_some() {
            model.update(self.db.as_ref()).await?
        } else {
            model.insert(self.db.as_ref()).await?
        };

        Ok(saved.into())
    }

    async fn delete(&self, username: &str) -> Result<(), RepositoryError> {
        cursor_entity::Entity::delete_by_id(username.to_string())
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}
