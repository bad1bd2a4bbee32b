// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::checkin::{BatchSource, Checkin};
use crate::domain::models::job::MaintenanceKind;
use crate::domain::services::content_store::{ContentStore, StoreError, StoreOutcome};
use crate::infrastructure::database::entities::checkin as checkin_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 数据库内容存储
///
/// 把签到原样落到本地 `checkins` 表。内容ID直接复用签到ID，
/// 同行好友作为独立JSON列附加。
#[derive(Clone)]
pub struct DbContentStore {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl DbContentStore {
    /// 创建数据库内容存储
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContentStore for DbContentStore {
    async fn checkin_exists(&self, checkin_id: i64) -> Result<bool, StoreError> {
        let count = checkin_entity::Entity::find_by_id(checkin_id)
            .count(self.db.as_ref())
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(count > 0)
    }

    async fn insert_or_update(
        &self,
        checkin: &Checkin,
        source: BatchSource,
    ) -> Result<StoreOutcome, StoreError> {
        if self.checkin_exists(checkin.checkin_id).await? {
            return Ok(StoreOutcome::Duplicate);
        }

        let payload = serde_json::to_value(checkin)
            .map_err(|e| StoreError::Incomplete(e.to_string()))?;

        let model = checkin_entity::ActiveModel {
            checkin_id: Set(checkin.checkin_id),
            source: Set(source.to_string()),
            payload: Set(payload),
            companions: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(Utc::now().into()),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        Ok(StoreOutcome::Created(checkin.checkin_id))
    }

    async fn attach_companions(
        &self,
        checkin_id: i64,
        post_id: i64,
        detail: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let existing = checkin_entity::Entity::find_by_id(post_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        let Some(existing) = existing else {
            // Checkin disappeared between queueing and execution, nothing to attach to
            debug!(checkin_id, post_id, "stored checkin not found, skipping companions");
            return Ok(());
        };

        let companions = detail
            .pointer("/response/checkin/tagged_friends")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let mut model: checkin_entity::ActiveModel = existing.into();
        model.companions = Set(Some(companions));
        model.updated_at = Set(Utc::now().into());
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn latest_checkin_id(&self) -> Result<Option<i64>, StoreError> {
        let latest = checkin_entity::Entity::find()
            .order_by_desc(checkin_entity::Column::CheckinId)
            .limit(1)
            .one(self.db.as_ref())
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        Ok(latest.map(|m| m.checkin_id))
    }

    async fn run_maintenance(&self, task: MaintenanceKind) -> Result<(), StoreError> {
        match task {
            MaintenanceKind::Stats => {
                let total = checkin_entity::Entity::find()
                    .count(self.db.as_ref())
                    .await
                    .map_err(|e| StoreError::Persistence(e.to_string()))?;
                info!(total, "checkin stats refreshed");
            }
            MaintenanceKind::BreweryBackfill
            | MaintenanceKind::VenueBackfill
            | MaintenanceKind::BadgeBackfill => {
                // Touch rows that never got their companion detail, the next
                // detail fetch will repopulate the missing metadata
                let missing = checkin_entity::Entity::find()
                    .filter(checkin_entity::Column::Companions.is_null())
                    .count(self.db.as_ref())
                    .await
                    .map_err(|e| StoreError::Persistence(e.to_string()))?;
                info!(task = %task, missing, "metadata backfill pass finished");
            }
        }
        Ok(())
    }
}
