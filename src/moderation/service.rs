//! Moderation service
//!
//! The coordinator for applying and modifying reprimands: validate the
//! request, persist the record, invoke the platform action, evaluate
//! escalation triggers, and report the result.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::data::{GuildConfig, GuildConfigs};
use crate::moderation::{
    DuplicateDetector, ExpiryScheduler, HistoryStore, ModerationAction, ModerationError,
    ModerationGateway, ModerationResult, Reprimand, ReprimandKind, ReprimandResult,
    ReprimandSource, ReprimandStatus, ReprimandType, Trigger, TriggerRule, TriggerSource,
    is_triggered, select_trigger,
};

/// Sink for reporting applied and removed reprimands
///
/// Fire-and-forget: the engine never waits on delivery outcomes.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, result: &ReprimandResult);
}

/// Default notifier that reports through structured logs
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, result: &ReprimandResult) {
        let primary = &result.primary;
        info!(
            reprimand_id = %primary.id,
            user_id = %primary.user_id,
            guild_id = %primary.guild_id,
            kind = %primary.kind.get_type(),
            status = %primary.status,
            secondary = result.secondary.as_ref().map(|s| s.kind.get_type().to_string()),
            "Reprimand result"
        );
    }
}

/// A request to apply a reprimand against a member
#[derive(Debug, Clone)]
pub struct ReprimandRequest {
    pub guild_id: u64,
    pub user_id: u64,
    pub actor_id: u64,
    pub reason: String,
    pub kind: ReprimandKind,
    pub source: ReprimandSource,
    /// Trigger that produced this reprimand, set on the censor path
    pub trigger_id: Option<Uuid>,
    /// Primary reprimand this one cascaded from; set internally
    pub cascade_of: Option<Uuid>,
}

impl ReprimandRequest {
    /// A reprimand issued directly by a moderator
    pub fn manual(
        guild_id: u64,
        user_id: u64,
        actor_id: u64,
        reason: impl Into<String>,
        kind: ReprimandKind,
    ) -> Self {
        Self {
            guild_id,
            user_id,
            actor_id,
            reason: reason.into(),
            kind,
            source: ReprimandSource::Manual,
            trigger_id: None,
            cascade_of: None,
        }
    }
}

/// Future of a secondary application, boxed to keep the cascade recursion
/// representable
type CascadeFuture<'a> = std::pin::Pin<
    Box<dyn std::future::Future<Output = ModerationResult<Option<ReprimandResult>>> + Send + 'a>,
>;

/// Per-(user, guild) mutexes closing the read-then-write race on the
/// at-most-one-active-mute check
#[derive(Default)]
struct MemberLocks {
    locks: DashMap<(u64, u64), Arc<tokio::sync::Mutex<()>>>,
}

impl MemberLocks {
    async fn acquire(&self, user_id: u64, guild_id: u64) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry((user_id, guild_id))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

/// Service for applying, escalating, and modifying reprimands
#[derive(Clone)]
pub struct ModerationService {
    store: HistoryStore,
    gateway: Arc<dyn ModerationGateway>,
    scheduler: ExpiryScheduler,
    notifier: Arc<dyn Notifier>,
    configs: GuildConfigs,
    detector: Arc<Mutex<DuplicateDetector>>,
    locks: Arc<MemberLocks>,
}

impl ModerationService {
    #[must_use]
    pub fn new(
        store: HistoryStore,
        gateway: Arc<dyn ModerationGateway>,
        scheduler: ExpiryScheduler,
        notifier: Arc<dyn Notifier>,
        configs: GuildConfigs,
    ) -> Self {
        Self {
            store,
            gateway,
            scheduler,
            notifier,
            configs,
            detector: Arc::new(Mutex::new(DuplicateDetector::new())),
            locks: Arc::new(MemberLocks::default()),
        }
    }

    /// The reprimand history backing this service
    #[must_use]
    pub fn history(&self) -> &HistoryStore {
        &self.store
    }

    /// The system actor used for cascades and expiry reversals
    #[must_use]
    pub fn system_actor(&self, guild_id: u64) -> u64 {
        self.gateway.resolve_actor(guild_id)
    }

    /// Apply a reprimand and evaluate escalation triggers
    ///
    /// `Ok(None)` is a soft failure: the platform refused the action, the
    /// record is kept for audit, and there is no result to report.
    ///
    /// # Errors
    /// `AlreadyActive` when a mute already stands for the member; fatal
    /// errors (`Persistence`, `UnknownTemplate`, wrapped platform errors)
    /// abort the request.
    pub async fn apply(
        &self,
        request: ReprimandRequest,
    ) -> ModerationResult<Option<ReprimandResult>> {
        self.apply_inner(request, false).await
    }

    fn apply_inner(&self, request: ReprimandRequest, cascade: bool) -> CascadeFuture<'_> {
        Box::pin(async move {
        // A cascade runs inside the primary's critical section already
        let _guard = if cascade {
            None
        } else {
            Some(self.locks.acquire(request.user_id, request.guild_id).await)
        };

        if request.kind.get_type() == ReprimandType::Mute
            && self
                .store
                .find_active(request.user_id, request.guild_id, ReprimandType::Mute)
                .is_some()
        {
            return Err(ModerationError::AlreadyActive);
        }

        let config = self.config_for(request.guild_id);

        let mut record = Reprimand::new(
            request.user_id,
            request.guild_id,
            request.source,
            request.kind,
            ModerationAction::new(request.actor_id, request.reason),
        );
        record.trigger_id = request.trigger_id;
        record.cascade_of = request.cascade_of;

        // Guild defaults give warnings and notices their auto-pardon window
        if record.expire_at.is_none() {
            let default_length = match record.kind.get_type() {
                ReprimandType::Warning => config.default_warning_expiry,
                ReprimandType::Notice => config.default_notice_expiry,
                _ => None,
            };
            record.expire_at = default_length.and_then(expiry_after);
        }

        // Persist before the platform call so a crash mid-call still leaves
        // an auditable record
        self.store.insert(record.clone());
        self.store.save().await?;

        if record.kind.needs_platform_action() {
            if let Err(error) = self.gateway.apply(&record).await {
                return match error {
                    ModerationError::PermissionDenied(reason) => {
                        warn!(
                            reprimand_id = %record.id,
                            user_id = %record.user_id,
                            guild_id = %record.guild_id,
                            %reason,
                            "Reprimand recorded but not applied"
                        );
                        Ok(None)
                    }
                    other => Err(other),
                };
            }
        }

        if let Some(entry) = record.expirable() {
            self.scheduler.schedule(entry).await;
        }

        // A cascaded reprimand never re-enters trigger evaluation
        let secondary = if cascade {
            None
        } else {
            self.evaluate_cascade(&record, &config).await?
        };

        let result = match secondary {
            Some(secondary) => ReprimandResult::with_secondary(record, secondary),
            None => ReprimandResult::new(record),
        };

        if !cascade {
            self.notifier.notify(&result).await;
        }

        Ok(Some(result))
        })
    }

    /// Evaluate triggers for a freshly applied primary and apply the fired
    /// trigger's template as the secondary reprimand
    async fn evaluate_cascade(
        &self,
        primary: &Reprimand,
        config: &GuildConfig,
    ) -> ModerationResult<Option<Reprimand>> {
        let Some(source) = TriggerSource::of(primary.kind.get_type()) else {
            return Ok(None);
        };

        let fired: Option<(Trigger, u32)> = match source {
            TriggerSource::Warning | TriggerSource::Notice => {
                let count = self.store.count_active(
                    primary.user_id,
                    primary.guild_id,
                    primary.kind.get_type(),
                    false,
                );
                select_trigger(count, source, &config.triggers).map(|t| (t.clone(), count))
            }
            TriggerSource::Censored => self.censored_trigger(primary, config),
        };

        let Some((trigger, count)) = fired else {
            return Ok(None);
        };

        info!(
            trigger_id = %trigger.id,
            user_id = %primary.user_id,
            guild_id = %primary.guild_id,
            count,
            "Trigger fired"
        );

        let request = ReprimandRequest {
            guild_id: primary.guild_id,
            user_id: primary.user_id,
            actor_id: self.gateway.resolve_actor(primary.guild_id),
            reason: format!("[Reprimand Triggered] at {count}"),
            kind: trigger.cascade.to_kind(),
            source: source.cascade_source(),
            trigger_id: Some(trigger.id),
            cascade_of: Some(primary.id),
        };

        // Boxed so the one level of recursion does not recurse the future type
        let cascade_apply: CascadeFuture<'_> = self.apply_inner(request, true);
        match cascade_apply.await {
            Ok(Some(result)) => Ok(Some(result.primary)),
            Ok(None) => Ok(None),
            Err(ModerationError::AlreadyActive) => {
                warn!(
                    trigger_id = %trigger.id,
                    user_id = %primary.user_id,
                    "Cascade skipped: a mute is already active"
                );
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    /// Pick the censor trigger to cascade for a censored primary
    ///
    /// The censor that recorded the message takes precedence and counts only
    /// its own records; otherwise the guild-wide censored count triggers
    /// apply. Near-duplicate spam never inflates either count.
    fn censored_trigger(
        &self,
        primary: &Reprimand,
        config: &GuildConfig,
    ) -> Option<(Trigger, u32)> {
        let tolerance = config.duplicate_tolerance;
        let mut detector = self
            .detector
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(censor_id) = primary.trigger_id {
            let censor = config.triggers.iter().find(|t| {
                t.id == censor_id && t.is_active && matches!(t.rule, TriggerRule::Censor { .. })
            });

            if let Some(censor) = censor {
                let contents = self.store.censored_contents(
                    primary.user_id,
                    primary.guild_id,
                    Some(censor_id),
                );
                let count =
                    detector.count_distinct(contents.iter().map(String::as_str), tolerance);
                if is_triggered(count, censor) {
                    return Some((censor.clone(), count));
                }
            }
        }

        let contents = self
            .store
            .censored_contents(primary.user_id, primary.guild_id, None);
        let count = detector.count_distinct(contents.iter().map(String::as_str), tolerance);
        select_trigger(count, TriggerSource::Censored, &config.triggers).map(|t| (t.clone(), count))
    }

    /// Transition a reprimand's status
    ///
    /// `Pardoned` lifts a standing mute or ban and cancels its scheduled
    /// expiry. `Deleted` hard-purges the record and the cascade chain below
    /// it; `silent` suppresses the notification only, data removal is
    /// identical.
    ///
    /// # Errors
    /// `NotFound` for unknown ids, `InvalidTransition` for backwards moves,
    /// `Persistence` when the store cannot be written.
    pub async fn modify(
        &self,
        id: Uuid,
        status: ReprimandStatus,
        actor_id: u64,
        reason: impl Into<String>,
        silent: bool,
    ) -> ModerationResult<Reprimand> {
        let record = self.store.get(id).ok_or(ModerationError::NotFound(id))?;
        let action = ModerationAction::new(actor_id, reason);

        match status {
            ReprimandStatus::Updated | ReprimandStatus::Hidden => {
                let updated = self.store.update_status(id, status, action)?;
                self.store.save().await?;
                Ok(updated)
            }
            ReprimandStatus::Pardoned => {
                if record.is_expiry_pending() && has_standing_effect(&record) {
                    self.gateway.reverse(&record).await?;
                }
                self.scheduler.cancel(id).await;

                let updated = self.store.update_status(id, ReprimandStatus::Pardoned, action)?;
                self.store.save().await?;
                Ok(updated)
            }
            ReprimandStatus::Deleted => self.delete(record, action, silent).await,
            ReprimandStatus::Added | ReprimandStatus::Expired => {
                Err(ModerationError::InvalidTransition {
                    from: record.status,
                    to: status,
                })
            }
        }
    }

    /// Hard-purge a record and the reprimands it cascaded into
    async fn delete(
        &self,
        record: Reprimand,
        action: ModerationAction,
        silent: bool,
    ) -> ModerationResult<Reprimand> {
        for child_id in self.store.cascade_children(record.id) {
            self.scheduler.cancel(child_id).await;
            if let Some(child) = self.store.remove(child_id) {
                if child.is_expiry_pending() && has_standing_effect(&child) {
                    if let Err(error) = self.gateway.reverse(&child).await {
                        warn!(reprimand_id = %child.id, %error, "Failed to reverse purged cascade");
                    }
                }
                info!(
                    reprimand_id = %child.id,
                    cascade_of = %record.id,
                    "Cascaded reprimand purged"
                );
            }
        }

        if record.is_expiry_pending() && has_standing_effect(&record) {
            if let Err(error) = self.gateway.reverse(&record).await {
                warn!(reprimand_id = %record.id, %error, "Failed to reverse purged reprimand");
            }
        }
        self.scheduler.cancel(record.id).await;

        let mut deleted = self.store.remove(record.id).unwrap_or(record);
        self.store.save().await?;

        // The record is gone from the store; stamp the copy for reporting
        deleted.status = ReprimandStatus::Deleted;
        deleted.modified = Some(action);

        info!(
            reprimand_id = %deleted.id,
            user_id = %deleted.user_id,
            guild_id = %deleted.guild_id,
            "Reprimand purged"
        );

        if !silent {
            self.notifier
                .notify(&ReprimandResult::new(deleted.clone()))
                .await;
        }

        Ok(deleted)
    }

    fn config_for(&self, guild_id: u64) -> GuildConfig {
        self.configs.get(guild_id).unwrap_or_else(|| GuildConfig {
            guild_id,
            ..GuildConfig::default()
        })
    }
}

/// Whether reversing this kind requires a platform call
fn has_standing_effect(record: &Reprimand) -> bool {
    matches!(
        record.kind.get_type(),
        ReprimandType::Mute | ReprimandType::Ban
    )
}

/// A wall-clock instant `seconds` from now; zero means untimed
fn expiry_after(seconds: u64) -> Option<DateTime<Utc>> {
    if seconds == 0 {
        return None;
    }

    let delta = Duration::try_seconds(i64::try_from(seconds).ok()?)?;
    Utc::now().checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::test_support::MockGateway;
    use crate::moderation::{ReprimandTemplate, TriggerMode};

    const GUILD: u64 = 67890;
    const USER: u64 = 12345;
    const MODERATOR: u64 = 1;
    const BOT: u64 = 42;

    fn configs_with(triggers: Vec<Trigger>) -> GuildConfigs {
        let configs = GuildConfigs::default();
        configs.insert(GuildConfig {
            guild_id: GUILD,
            duplicate_tolerance: 2,
            triggers,
            ..GuildConfig::default()
        });
        configs
    }

    fn service_with(configs: GuildConfigs, gateway: MockGateway) -> (ModerationService, HistoryStore) {
        let store = HistoryStore::new();
        let gateway: Arc<dyn ModerationGateway> = Arc::new(gateway);
        let (scheduler, rx) = ExpiryScheduler::new(store.clone(), gateway.clone());
        scheduler.start(rx);

        let service = ModerationService::new(
            store.clone(),
            gateway,
            scheduler,
            Arc::new(TracingNotifier),
            configs,
        );
        (service, store)
    }

    fn permissive_gateway() -> MockGateway {
        let mut gateway = MockGateway::new();
        gateway.expect_apply().returning(|_| Ok(()));
        gateway.expect_reverse().returning(|_| Ok(()));
        gateway.expect_resolve_actor().return_const(BOT);
        gateway
    }

    async fn warn(service: &ModerationService) -> Option<ReprimandResult> {
        service
            .apply(ReprimandRequest::manual(
                GUILD,
                USER,
                MODERATOR,
                "spamming",
                ReprimandKind::warning(1),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_exact_trigger_cascades_once() {
        let trigger = Trigger::count(
            GUILD,
            TriggerSource::Warning,
            3,
            TriggerMode::Exact,
            ReprimandTemplate::Mute { length: Some(3600) },
        );
        let (service, store) = service_with(configs_with(vec![trigger]), permissive_gateway());

        let first = warn(&service).await.unwrap();
        assert!(first.secondary.is_none());
        let second = warn(&service).await.unwrap();
        assert!(second.secondary.is_none());

        let third = warn(&service).await.unwrap();
        let secondary = third.secondary.unwrap();
        assert_eq!(secondary.kind, ReprimandKind::mute(3600));
        assert_eq!(secondary.source, ReprimandSource::WarningCascade);
        assert_eq!(secondary.cascade_of, Some(third.primary.id));
        assert_eq!(secondary.created.actor_id, BOT);
        assert_eq!(secondary.created.reason, "[Reprimand Triggered] at 3");
        assert!(secondary.expire_at.is_some());

        // A fourth warning is past the exact threshold
        let fourth = warn(&service).await.unwrap();
        assert!(fourth.secondary.is_none());

        assert_eq!(store.count_active(USER, GUILD, ReprimandType::Warning, false), 4);
    }

    #[tokio::test]
    async fn test_retroactive_trigger_fires_every_time() {
        let trigger = Trigger::count(
            GUILD,
            TriggerSource::Warning,
            5,
            TriggerMode::Retroactive,
            ReprimandTemplate::Ban {
                delete_history_days: 0,
                length: None,
            },
        );

        let mut gateway = MockGateway::new();
        // Bans at counts 5, 6 and 7
        gateway.expect_apply().times(3).returning(|_| Ok(()));
        gateway.expect_resolve_actor().return_const(BOT);

        let (service, _store) = service_with(configs_with(vec![trigger]), gateway);

        for _ in 0..4 {
            let result = warn(&service).await.unwrap();
            assert!(result.secondary.is_none());
        }

        for count in 5..=7 {
            let result = warn(&service).await.unwrap();
            let secondary = result.secondary.unwrap();
            assert_eq!(secondary.kind.get_type(), ReprimandType::Ban);
            assert_eq!(
                secondary.created.reason,
                format!("[Reprimand Triggered] at {count}")
            );
        }
    }

    #[tokio::test]
    async fn test_multiple_trigger_fires_on_multiples() {
        let trigger = Trigger::count(
            GUILD,
            TriggerSource::Warning,
            2,
            TriggerMode::Multiple,
            ReprimandTemplate::Notice,
        );
        let (service, _store) = service_with(configs_with(vec![trigger]), permissive_gateway());

        let mut fired = Vec::new();
        for _ in 0..4 {
            let result = warn(&service).await.unwrap();
            fired.push(result.secondary.is_some());
        }

        assert_eq!(fired, vec![false, true, false, true]);
    }

    #[tokio::test]
    async fn test_cascade_never_recurses() {
        // A warning cascading into another warning must not chain further
        let trigger = Trigger::count(
            GUILD,
            TriggerSource::Warning,
            1,
            TriggerMode::Retroactive,
            ReprimandTemplate::Warning { amount: 1 },
        );
        let (service, store) = service_with(configs_with(vec![trigger]), permissive_gateway());

        let result = warn(&service).await.unwrap();
        let secondary = result.secondary.unwrap();
        assert_eq!(secondary.kind.get_type(), ReprimandType::Warning);

        // Primary plus exactly one cascade, no third record
        assert_eq!(store.for_user(USER, GUILD).len(), 2);
    }

    #[tokio::test]
    async fn test_highest_amount_wins() {
        let low = Trigger::count(
            GUILD,
            TriggerSource::Warning,
            1,
            TriggerMode::Retroactive,
            ReprimandTemplate::Note,
        );
        let high = Trigger::count(
            GUILD,
            TriggerSource::Warning,
            2,
            TriggerMode::Retroactive,
            ReprimandTemplate::Kick,
        );

        // Only the kick at count 2 touches the platform
        let mut gateway = MockGateway::new();
        gateway.expect_apply().times(1).returning(|_| Ok(()));
        gateway.expect_resolve_actor().return_const(BOT);

        let (service, _store) = service_with(configs_with(vec![low, high]), gateway);

        let first = warn(&service).await.unwrap();
        assert_eq!(
            first.secondary.unwrap().kind.get_type(),
            ReprimandType::Note
        );

        let second = warn(&service).await.unwrap();
        assert_eq!(
            second.secondary.unwrap().kind.get_type(),
            ReprimandType::Kick
        );
    }

    #[tokio::test]
    async fn test_duplicate_active_mute_is_refused() {
        let (service, _store) = service_with(configs_with(vec![]), permissive_gateway());

        let request = ReprimandRequest::manual(
            GUILD,
            USER,
            MODERATOR,
            "hush",
            ReprimandKind::mute(3600),
        );
        service.apply(request.clone()).await.unwrap().unwrap();

        let result = service.apply(request).await;
        assert!(matches!(result, Err(ModerationError::AlreadyActive)));
    }

    #[tokio::test]
    async fn test_forbidden_platform_call_is_soft() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_apply()
            .times(1)
            .returning(|_| Err(ModerationError::PermissionDenied("missing ban members".into())));
        gateway.expect_resolve_actor().return_const(BOT);

        let (service, store) = service_with(configs_with(vec![]), gateway);

        let result = service
            .apply(ReprimandRequest::manual(
                GUILD,
                USER,
                MODERATOR,
                "bye",
                ReprimandKind::ban(0, None),
            ))
            .await
            .unwrap();
        assert!(result.is_none());

        // Recorded but not applied: the record stays for audit
        let records = store.for_user(USER, GUILD);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ReprimandStatus::Added);
    }

    #[tokio::test]
    async fn test_censor_count_ignores_near_duplicates() {
        let censor = Trigger::censor(
            GUILD,
            "cheap gems",
            false,
            2,
            TriggerMode::Exact,
            ReprimandTemplate::Mute { length: Some(600) },
        );
        let censor_id = censor.id;
        let (service, _store) = service_with(configs_with(vec![censor]), permissive_gateway());

        let censored = |content: &str| {
            let mut request = ReprimandRequest::manual(
                GUILD,
                USER,
                BOT,
                "censored message",
                ReprimandKind::Censored {
                    content: content.to_string(),
                    pattern: "cheap gems".to_string(),
                },
            );
            request.trigger_id = Some(censor_id);
            request
        };

        let first = service.apply(censored("buy cheap gems")).await.unwrap().unwrap();
        assert!(first.secondary.is_none());

        // A near-duplicate does not advance the count past the threshold
        let spam = service.apply(censored("buy cheap gems!")).await.unwrap().unwrap();
        assert!(spam.secondary.is_none());

        // A distinct message is the second counted violation
        let distinct = service
            .apply(censored("cheap gems for sale, new link"))
            .await
            .unwrap()
            .unwrap();
        let secondary = distinct.secondary.unwrap();
        assert_eq!(secondary.kind, ReprimandKind::mute(600));
        assert_eq!(secondary.source, ReprimandSource::CensorCascade);
    }

    #[tokio::test]
    async fn test_pardon_reverses_and_cancels() {
        let mut gateway = MockGateway::new();
        gateway.expect_apply().times(1).returning(|_| Ok(()));
        gateway.expect_reverse().times(1).returning(|_| Ok(()));
        gateway.expect_resolve_actor().return_const(BOT);

        let (service, store) = service_with(configs_with(vec![]), gateway);

        let result = service
            .apply(ReprimandRequest::manual(
                GUILD,
                USER,
                MODERATOR,
                "hush",
                ReprimandKind::mute(3600),
            ))
            .await
            .unwrap()
            .unwrap();
        let id = result.primary.id;

        let pardoned = service
            .modify(id, ReprimandStatus::Pardoned, MODERATOR, "appealed", false)
            .await
            .unwrap();
        assert_eq!(pardoned.status, ReprimandStatus::Pardoned);
        assert_eq!(store.get(id).unwrap().status, ReprimandStatus::Pardoned);

        // A pardoned mute no longer blocks a new one
        assert!(store.find_active(USER, GUILD, ReprimandType::Mute).is_none());
    }

    #[tokio::test]
    async fn test_delete_purges_cascade_chain() {
        let trigger = Trigger::count(
            GUILD,
            TriggerSource::Warning,
            1,
            TriggerMode::Exact,
            ReprimandTemplate::Mute { length: Some(3600) },
        );
        let (service, store) = service_with(configs_with(vec![trigger]), permissive_gateway());

        let result = warn(&service).await.unwrap();
        let primary_id = result.primary.id;
        let secondary_id = result.secondary.unwrap().id;
        assert_eq!(store.for_user(USER, GUILD).len(), 2);

        let deleted = service
            .modify(primary_id, ReprimandStatus::Deleted, MODERATOR, "mistake", true)
            .await
            .unwrap();
        assert_eq!(deleted.status, ReprimandStatus::Deleted);

        assert!(store.get(primary_id).is_none());
        assert!(store.get(secondary_id).is_none());
        assert_eq!(store.count_active(USER, GUILD, ReprimandType::Warning, false), 0);
    }

    #[tokio::test]
    async fn test_modify_unknown_id_reports_not_found() {
        let (service, _store) = service_with(configs_with(vec![]), permissive_gateway());

        let missing = Uuid::new_v4();
        let result = service
            .modify(missing, ReprimandStatus::Hidden, MODERATOR, "x", false)
            .await;
        assert!(matches!(result, Err(ModerationError::NotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_hidden_records_leave_default_counts() {
        let trigger = Trigger::count(
            GUILD,
            TriggerSource::Warning,
            2,
            TriggerMode::Exact,
            ReprimandTemplate::Notice,
        );
        let (service, _store) = service_with(configs_with(vec![trigger]), permissive_gateway());

        let first = warn(&service).await.unwrap();
        service
            .modify(first.primary.id, ReprimandStatus::Hidden, MODERATOR, "h", false)
            .await
            .unwrap();

        // With the first warning hidden, the second sits at count 1
        let second = warn(&service).await.unwrap();
        assert!(second.secondary.is_none());

        // The third reaches the threshold
        let third = warn(&service).await.unwrap();
        assert!(third.secondary.is_some());
    }
}
