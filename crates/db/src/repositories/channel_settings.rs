//! Channel settings repository.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use tally_core::channel::{ChannelSettings, ResolvedChannelSettings};
use tally_shared::types::{Cents, ChannelId};
use tracing::info;

use crate::entities::channel_settings;

/// Per-channel policy overrides with configured fallbacks.
#[derive(Debug, Clone)]
pub struct ChannelSettingsRepository {
    db: DatabaseConnection,
    defaults: ChannelSettings,
}

impl ChannelSettingsRepository {
    /// Creates a new channel settings repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, defaults: ChannelSettings) -> Self {
        Self { db, defaults }
    }

    /// Settings used for channels without their own row.
    #[must_use]
    pub const fn defaults(&self) -> ChannelSettings {
        self.defaults
    }

    /// Returns the channel's settings, or the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_or_default(
        &self,
        channel_id: ChannelId,
    ) -> Result<ResolvedChannelSettings, DbErr> {
        self.get_or_default_in(&self.db, channel_id).await
    }

    pub(crate) async fn get_or_default_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        channel_id: ChannelId,
    ) -> Result<ResolvedChannelSettings, DbErr> {
        let row = channel_settings::Entity::find_by_id(channel_id.into_inner())
            .one(conn)
            .await?;

        Ok(match row {
            Some(row) => ResolvedChannelSettings {
                channel_id,
                settings: ChannelSettings {
                    variance_notification_threshold: Cents::new(
                        row.variance_notification_threshold_cents,
                    ),
                    oversell_policy: row.oversell_policy.into(),
                },
                customized: true,
            },
            None => ResolvedChannelSettings {
                channel_id,
                settings: self.defaults,
                customized: false,
            },
        })
    }

    /// Creates or replaces a channel's settings.
    ///
    /// Negative thresholds are stored as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn upsert(
        &self,
        channel_id: ChannelId,
        settings: ChannelSettings,
    ) -> Result<ResolvedChannelSettings, DbErr> {
        let threshold = settings.variance_notification_threshold.value().max(0);
        let row = channel_settings::ActiveModel {
            channel_id: Set(channel_id.into_inner()),
            variance_notification_threshold_cents: Set(threshold),
            oversell_policy: Set(settings.oversell_policy.into()),
            updated_at: Set(Utc::now()),
        };

        channel_settings::Entity::insert(row)
            .on_conflict(
                OnConflict::column(channel_settings::Column::ChannelId)
                    .update_columns([
                        channel_settings::Column::VarianceNotificationThresholdCents,
                        channel_settings::Column::OversellPolicy,
                        channel_settings::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        info!(
            channel_id = %channel_id,
            threshold_cents = threshold,
            oversell_policy = settings.oversell_policy.as_str(),
            "Channel settings updated"
        );

        Ok(ResolvedChannelSettings {
            channel_id,
            settings: ChannelSettings {
                variance_notification_threshold: Cents::new(threshold),
                oversell_policy: settings.oversell_policy,
            },
            customized: true,
        })
    }
}
