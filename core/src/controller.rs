//! The record lifecycle controller.
//!
//! One controller is built per resource type. It holds its collaborators and
//! guards as trait objects and runs every request through a fixed pipeline:
//!
//! | operation | pipeline |
//! |-----------|----------|
//! | create | shape → field checks → default `Draft` → business validation → insert → mirror |
//! | update | id → load → non-empty → shape → lock version → field checks → restricted target → merge → business validation → guards → conditional write → mirror |
//! | delete | as update, with the target status forced to `Deleted` |
//! | find / list | id or query checks → load → strip `lockVersion` |
//!
//! Each stage returns `Result`; the first failure short-circuits the
//! pipeline and is returned to the caller untouched.

use crate::actor::ActorContext;
use crate::config::LifecycleConfig;
use crate::envelope::{Envelope, Pagination};
use crate::environment::{Clock, SystemClock};
use crate::error::{FieldError, FieldErrors, LifecycleError, Result};
use crate::guards::change::changed_attributes;
use crate::guards::{
    ChangeTrackingGuard, DependencyGuard, Guard, MutationContext, OptimisticLockGuard,
    StatusTransitionGuard,
};
use crate::messages::{MessageCatalog, MessageKey, Translator};
use crate::mirror::{DocumentMirror, SearchQuery};
use crate::record::{ChangeLog, Exposure, Record, Stamp, StoredRecord, attributes_of};
use crate::resource::{
    CHANGE_LOG_FIELD, FieldKind, ID_FIELD, LOCK_VERSION_FIELD, Resource, STATUS_FIELD, Scenario,
    field_spec,
};
use crate::status::{Status, TransitionTable};
use crate::store::{ListQuery, NewRecord, RecordStore, RecordUpdate, SortKey};
use crate::validation::{
    FieldShapeValidator, check_fields, has_payload, merge_attributes, record_id, requested_status,
};
use crate::Params;
use serde_json::{Map, Value, json};
use std::marker::PhantomData;
use std::sync::Arc;

/// Query keys of list requests that are not filters.
const PAGE_PARAM: &str = "page";
const PER_PAGE_PARAM: &str = "perPage";
const SORT_PARAM: &str = "sort";

/// Lifecycle controller for resource type `T`.
pub struct LifecycleController<T: Resource> {
    store: Arc<dyn RecordStore>,
    mirror: Option<Arc<dyn DocumentMirror>>,
    translator: Arc<dyn Translator>,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
    transitions: TransitionTable,
    guards: Vec<Arc<dyn Guard>>,
    _resource: PhantomData<fn() -> T>,
}

/// Builder for [`LifecycleController`].
pub struct LifecycleControllerBuilder<T: Resource> {
    store: Arc<dyn RecordStore>,
    mirror: Option<Arc<dyn DocumentMirror>>,
    translator: Option<Arc<dyn Translator>>,
    clock: Option<Arc<dyn Clock>>,
    config: LifecycleConfig,
    transitions: Option<TransitionTable>,
    extra_guards: Vec<Arc<dyn Guard>>,
    _resource: PhantomData<fn() -> T>,
}

impl<T: Resource> LifecycleControllerBuilder<T> {
    /// Mirror every write into `mirror` and enable search.
    #[must_use]
    pub fn mirror(mut self, mirror: Arc<dyn DocumentMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Message catalog. Default: [`MessageCatalog`] with English text.
    #[must_use]
    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Clock used for change-log stamps. Default: [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Shared configuration.
    #[must_use]
    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the resource's transition table.
    #[must_use]
    pub fn transitions(mut self, table: TransitionTable) -> Self {
        self.transitions = Some(table);
        self
    }

    /// Append a guard after the built-in ones.
    #[must_use]
    pub fn guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.extra_guards.push(guard);
        self
    }

    /// Build the controller.
    #[must_use]
    pub fn build(self) -> LifecycleController<T> {
        let transitions = self.transitions.unwrap_or_else(T::transitions);
        let mut guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(OptimisticLockGuard::new()),
            Arc::new(StatusTransitionGuard::new(transitions.clone())),
            Arc::new(ChangeTrackingGuard::new()),
            Arc::new(DependencyGuard::new(
                Arc::clone(&self.store),
                T::PROTECTED_FIELDS,
                T::DEPENDENTS,
                &transitions,
            )),
        ];
        guards.extend(self.extra_guards);

        LifecycleController {
            store: self.store,
            mirror: self.mirror,
            translator: self
                .translator
                .unwrap_or_else(|| Arc::new(MessageCatalog::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
            transitions,
            guards,
            _resource: PhantomData,
        }
    }
}

impl<T: Resource> LifecycleController<T> {
    /// Start building a controller backed by `store`.
    #[must_use]
    pub fn builder(store: Arc<dyn RecordStore>) -> LifecycleControllerBuilder<T> {
        LifecycleControllerBuilder {
            store,
            mirror: None,
            translator: None,
            clock: None,
            config: LifecycleConfig::default(),
            transitions: None,
            extra_guards: Vec::new(),
            _resource: PhantomData,
        }
    }

    /// Shared configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Message catalog.
    #[must_use]
    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// Enforced transition table.
    #[must_use]
    pub const fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Names of the guards run on update and delete, in order.
    #[must_use]
    pub fn guard_names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|guard| guard.name()).collect()
    }

    // ═══════════════════════════════════════════════════════════
    // Operations
    // ═══════════════════════════════════════════════════════════

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed`: undeclared keys, bad values, missing required fields
    /// - `Forbidden`: restricted initial status requested without superadmin
    /// - `ServerError`: the store failed
    #[tracing::instrument(skip_all, fields(table = T::TABLE, user = actor.user_id.as_deref()))]
    pub async fn create(&self, actor: &ActorContext, params: Params) -> Result<Envelope> {
        let t = self.translator();
        FieldShapeValidator::for_resource::<T>(Scenario::Create).check(&params, t)?;
        check_fields::<T>(Scenario::Create, &params, t)?;

        let status = requested_status(&params).unwrap_or_default();
        self.require_superadmin_for(status, actor)?;

        let mut attributes = attributes_of(&T::default()).map_err(|e| self.unexpected(e))?;
        merge_attributes::<T>(&mut attributes, &params);
        let fields = self.decode(attributes)?;
        self.validate_business(&fields)?;

        let stored = self
            .store
            .insert(
                T::TABLE,
                NewRecord {
                    status,
                    attributes: attributes_of(&fields).map_err(|e| self.unexpected(e))?,
                    change_log: ChangeLog::created(self.stamp(actor)),
                },
            )
            .await
            .map_err(|e| self.unexpected(e))?;
        metrics::counter!("lifecycle.write", "table" => T::TABLE, "operation" => "create")
            .increment(1);
        tracing::info!(record_id = stored.id, "record created");

        let record = Record::<T>::from_stored(stored).map_err(|e| self.unexpected(e))?;
        self.mirror_record(&record).await;
        self.respond(MessageKey::Created, &record, Exposure::Write)
    }

    /// Modify an existing record.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: missing or non-numeric id, no parameters
    /// - `NotFound`: no record with that id
    /// - `ValidationFailed`: shape, value, status transition violations
    /// - `Forbidden`: restricted target status without superadmin
    /// - `LockVersionOutdated`: stale `lockVersion`
    /// - `NoRecordUpdated`: nothing would change
    /// - `UpdatePermission`: protected field of a referenced record
    /// - `ServerError`: the store failed
    #[tracing::instrument(skip_all, fields(table = T::TABLE, user = actor.user_id.as_deref(), record_id = tracing::field::Empty))]
    pub async fn update(&self, actor: &ActorContext, params: Params) -> Result<Envelope> {
        let stored = self.load_for_mutation(&params).await?;
        self.mutate(actor, Scenario::Update, stored, &params).await
    }

    /// Soft-delete a record by moving it to `Deleted`.
    ///
    /// # Errors
    ///
    /// As [`update`](Self::update), with `NoRecordDeleted` when the record is
    /// already deleted.
    #[tracing::instrument(skip_all, fields(table = T::TABLE, user = actor.user_id.as_deref(), record_id = tracing::field::Empty))]
    pub async fn delete(&self, actor: &ActorContext, params: Params) -> Result<Envelope> {
        let stored = self.load_for_mutation(&params).await?;
        self.mutate(actor, Scenario::Delete, stored, &params).await
    }

    /// Load one record. The result never carries `lockVersion`.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: missing or non-numeric id
    /// - `NotFound`: no record with that id
    /// - `ServerError`: the store failed
    #[tracing::instrument(skip_all, fields(table = T::TABLE, user = actor.user_id.as_deref(), record_id = tracing::field::Empty))]
    pub async fn find_one(&self, actor: &ActorContext, params: Params) -> Result<Envelope> {
        let id = self.require_id(&params)?;
        tracing::Span::current().record("record_id", id);
        let stored = self.load(id).await?;
        let record = Record::<T>::from_stored(stored).map_err(|e| self.unexpected(e))?;
        self.respond(MessageKey::Success, &record, Exposure::Read)
    }

    /// List records with pagination, sort and equality filters.
    ///
    /// `page`, `perPage` and `sort` control the listing; every other key is
    /// an equality filter and must be a view-scenario field.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed`: unknown filter or sort keys, bad page values
    /// - `ServerError`: the store failed
    #[tracing::instrument(skip_all, fields(table = T::TABLE, user = actor.user_id.as_deref()))]
    pub async fn list(&self, actor: &ActorContext, mut params: Params) -> Result<Envelope> {
        let t = self.translator();
        let mut errors = FieldErrors::new();
        let page = take_count(&mut params, PAGE_PARAM, t, &mut errors).unwrap_or(1).max(1);
        let per_page = match take_count(&mut params, PER_PAGE_PARAM, t, &mut errors) {
            Some(0) | None => self.config.default_page_size,
            Some(n) => n.min(self.config.max_page_size),
        };
        let sort = match params.remove(SORT_PARAM) {
            Some(Value::String(expression)) => SortKey::parse_list(&expression),
            Some(_) => {
                errors.push(
                    SORT_PARAM,
                    t.translate(MessageKey::FieldType, &[("field", SORT_PARAM), ("value", "string")]),
                );
                Vec::new()
            },
            None => Vec::new(),
        };
        errors.into_result(|errors| self.validation_failed(errors))?;

        let view = FieldShapeValidator::for_resource::<T>(Scenario::View);
        view.check(&params, t)?;
        self.check_view_fields(&view, sort.iter().map(|key| key.field.as_str()))?;

        let filters: Map<String, Value> = params
            .into_iter()
            .map(|(field, value)| {
                let value = coerce_filter::<T>(&field, value);
                (field, value)
            })
            .collect();

        let result = self
            .store
            .list(T::TABLE, ListQuery { filters, page, per_page, sort })
            .await
            .map_err(|e| self.unexpected(e))?;

        let items = result
            .items
            .into_iter()
            .map(|stored| {
                Record::<T>::from_stored(stored)
                    .and_then(|record| record.to_json(Exposure::Read))
                    .map_err(|e| self.unexpected(e))
            })
            .collect::<Result<Vec<_>>>()?;
        let pagination = Pagination::new(page, per_page, result.total_count, items.len());
        Ok(Envelope::list(t.translate(MessageKey::Success, &[]), items, pagination))
    }

    /// Search the document mirror. Hits never carry `lockVersion`.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: no mirror is configured
    /// - `ValidationFailed`: filter, sort or projection on undeclared fields
    /// - `ServerError`: the mirror failed
    #[tracing::instrument(skip_all, fields(table = T::TABLE, user = actor.user_id.as_deref()))]
    pub async fn search(&self, actor: &ActorContext, mut query: SearchQuery) -> Result<Envelope> {
        let t = self.translator();
        let mirror = self.require_mirror()?;

        let view = FieldShapeValidator::for_resource::<T>(Scenario::View);
        let sort = query.sort_keys();
        self.check_view_fields(
            &view,
            query.filter.fields().chain(sort.iter().map(|key| key.field.as_str())),
        )?;
        let mut errors = FieldErrors::new();
        for field in &query.fields {
            let known = matches!(field.as_str(), ID_FIELD | STATUS_FIELD | CHANGE_LOG_FIELD)
                || field_spec::<T>(field).is_some();
            if !known {
                errors.push(
                    field.as_str(),
                    t.translate(MessageKey::InvalidParameter, &[("field", field)]),
                );
            }
        }
        errors.into_result(|errors| self.validation_failed(errors))?;

        query.page = query.page.max(1);
        query.per_page = if query.per_page == 0 {
            self.config.default_page_size
        } else {
            query.per_page.min(self.config.max_page_size)
        };
        let (page, per_page) = (query.page, query.per_page);

        let hits = mirror
            .search(T::TABLE, query)
            .await
            .map_err(|e| self.unexpected(e))?;
        let documents: Vec<Value> = hits
            .documents
            .into_iter()
            .map(|mut document| {
                if let Some(object) = document.as_object_mut() {
                    object.remove(LOCK_VERSION_FIELD);
                }
                document
            })
            .collect();
        let pagination = Pagination::new(page, per_page, hits.total, documents.len());
        Ok(Envelope::list(t.translate(MessageKey::Success, &[]), documents, pagination))
    }

    /// Re-mirror up to `limit` records flagged as sync-failed.
    ///
    /// Flags are cleared only after the bulk write succeeded.
    ///
    /// # Errors
    ///
    /// - `Forbidden`: actor is not a superadmin
    /// - `BadRequest`: no mirror is configured
    /// - `ServerError`: the store or the mirror failed
    #[tracing::instrument(skip_all, fields(table = T::TABLE, user = actor.user_id.as_deref()))]
    pub async fn resync_failed(&self, actor: &ActorContext, limit: u32) -> Result<Envelope> {
        let t = self.translator();
        if !actor.is_superadmin() {
            return Err(self.forbidden());
        }
        let mirror = self.require_mirror()?;

        let rows = self
            .store
            .list_sync_failed(T::TABLE, limit)
            .await
            .map_err(|e| self.unexpected(e))?;
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        if ids.is_empty() {
            return Ok(Envelope::ok(t.translate(MessageKey::Resynced, &[]), json!({ "resynced": 0 })));
        }

        let documents = rows
            .into_iter()
            .map(|stored| {
                Record::<T>::from_stored(stored)
                    .and_then(|record| record.to_json(Exposure::Write))
                    .map_err(|e| self.unexpected(e))
            })
            .collect::<Result<Vec<_>>>()?;
        mirror
            .upsert_many(T::TABLE, documents, &[ID_FIELD])
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, records = ids.len(), "bulk resync failed");
                self.unexpected(e)
            })?;
        let count = ids.len();
        self.store
            .clear_sync_failed(T::TABLE, ids)
            .await
            .map_err(|e| self.unexpected(e))?;

        tracing::info!(records = count, "records re-synchronized");
        Ok(Envelope::ok(t.translate(MessageKey::Resynced, &[]), json!({ "resynced": count })))
    }

    // ═══════════════════════════════════════════════════════════
    // Pipeline stages
    // ═══════════════════════════════════════════════════════════

    async fn load_for_mutation(&self, params: &Params) -> Result<StoredRecord> {
        let id = self.require_id(params)?;
        tracing::Span::current().record("record_id", id);
        let stored = self.load(id).await?;
        if !has_payload(params) {
            return Err(LifecycleError::bad_request(
                self.translator().translate(MessageKey::EmptyParams, &[]),
            ));
        }
        Ok(stored)
    }

    async fn mutate(
        &self,
        actor: &ActorContext,
        scenario: Scenario,
        stored: StoredRecord,
        params: &Params,
    ) -> Result<Envelope> {
        let t = self.translator();
        FieldShapeValidator::for_resource::<T>(scenario).check(params, t)?;
        let supplied_lock_version = OptimisticLockGuard::supplied(params, t)?;
        check_fields::<T>(scenario, params, t)?;

        let old = Record::<T>::from_stored(stored).map_err(|e| self.unexpected(e))?;
        let new_status = match scenario {
            Scenario::Delete => Status::Deleted,
            _ => requested_status(params).unwrap_or(old.status),
        };
        if new_status != old.status {
            self.require_superadmin_for(new_status, actor)?;
        }

        let old_attributes = old.attributes().map_err(|e| self.unexpected(e))?;
        let mut attributes = old_attributes.clone();
        merge_attributes::<T>(&mut attributes, params);
        let fields = self.decode(attributes)?;
        self.validate_business(&fields)?;
        let attributes = attributes_of(&fields).map_err(|e| self.unexpected(e))?;
        let changed = changed_attributes(&old_attributes, &attributes, old.status, new_status);

        let ctx = MutationContext {
            scenario,
            table: T::TABLE,
            label: T::LABEL,
            actor,
            record_id: old.id,
            stored_lock_version: old.lock_version,
            supplied_lock_version,
            old_status: old.status,
            new_status,
            changed: &changed,
            translator: t,
        };
        for guard in &self.guards {
            guard.check(&ctx).await.inspect_err(|e| {
                tracing::debug!(guard = guard.name(), code = e.status_code(), "guard rejected mutation");
            })?;
        }

        let mut change_log = old.change_log.clone();
        if new_status == Status::Deleted && old.status != Status::Deleted {
            change_log.touch_deleted(self.stamp(actor));
        } else if !changed.is_empty() {
            change_log.touch_updated(self.stamp(actor));
        }

        let lock_version = OptimisticLockGuard::write(
            self.store.as_ref(),
            T::TABLE,
            RecordUpdate {
                id: old.id,
                expected_lock_version: supplied_lock_version,
                status: new_status,
                attributes,
                change_log: change_log.clone(),
            },
            t,
        )
        .await?;

        let operation = if scenario == Scenario::Delete { "delete" } else { "update" };
        metrics::counter!("lifecycle.write", "table" => T::TABLE, "operation" => operation)
            .increment(1);
        tracing::info!(lock_version, changed = changed.len(), operation, "record written");

        let record = Record {
            id: old.id,
            status: new_status,
            lock_version,
            change_log,
            fields,
        };
        self.mirror_record(&record).await;
        let key = if scenario == Scenario::Delete { MessageKey::Deleted } else { MessageKey::Updated };
        self.respond(key, &record, Exposure::Write)
    }

    /// Mirror a written record. Failures are logged, counted and flagged on
    /// the row; they never reach the caller.
    async fn mirror_record(&self, record: &Record<T>) {
        let Some(mirror) = &self.mirror else {
            return;
        };
        let outcome = match record.to_json(Exposure::Write) {
            Ok(document) => mirror.upsert(T::TABLE, document).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let Err(error) = outcome else {
            return;
        };

        tracing::warn!(record_id = record.id, %error, "document mirror write failed");
        metrics::counter!("lifecycle.mirror.sync_failed", "table" => T::TABLE).increment(1);
        if let Err(e) = self.store.mark_sync_failed(T::TABLE, record.id).await {
            tracing::error!(record_id = record.id, error = %e, "could not flag record as sync-failed");
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════

    fn require_id(&self, params: &Params) -> Result<i64> {
        record_id(params).ok_or_else(|| {
            let message = self.translator().translate(MessageKey::IdRequired, &[]);
            LifecycleError::BadRequest {
                message: message.clone(),
                errors: vec![FieldError::new(ID_FIELD, message)],
            }
        })
    }

    async fn load(&self, id: i64) -> Result<StoredRecord> {
        self.store
            .find_by_id(T::TABLE, id)
            .await
            .map_err(|e| self.unexpected(e))?
            .ok_or_else(|| LifecycleError::NotFound {
                message: self.translator().translate(
                    MessageKey::NotFound,
                    &[("label", T::LABEL), ("id", &id.to_string())],
                ),
            })
    }

    fn require_superadmin_for(&self, status: Status, actor: &ActorContext) -> Result<()> {
        if self.transitions.requires_superadmin(status) && !actor.is_superadmin() {
            tracing::debug!(%status, "restricted target status requested");
            return Err(self.forbidden());
        }
        Ok(())
    }

    fn require_mirror(&self) -> Result<&Arc<dyn DocumentMirror>> {
        self.mirror.as_ref().ok_or_else(|| {
            LifecycleError::bad_request(self.translator().translate(MessageKey::MirrorUnavailable, &[]))
        })
    }

    fn check_view_fields<'f>(
        &self,
        view: &FieldShapeValidator,
        fields: impl Iterator<Item = &'f str>,
    ) -> Result<()> {
        let mut errors = FieldErrors::new();
        for field in fields {
            if !view.allows(field) && !errors.contains(field) {
                errors.push(
                    field,
                    self.translator()
                        .translate(MessageKey::InvalidParameter, &[("field", field)]),
                );
            }
        }
        errors.into_result(|errors| self.validation_failed(errors))
    }

    fn decode(&self, attributes: Map<String, Value>) -> Result<T> {
        serde_json::from_value(Value::Object(attributes)).map_err(|e| {
            tracing::debug!(error = %e, "merged attributes do not decode");
            self.validation_failed(Vec::new())
        })
    }

    fn validate_business(&self, fields: &T) -> Result<()> {
        let mut errors = FieldErrors::new();
        fields.validate(self.translator(), &mut errors);
        errors.into_result(|errors| self.validation_failed(errors))
    }

    fn respond(&self, key: MessageKey, record: &Record<T>, exposure: Exposure) -> Result<Envelope> {
        let data = record.to_json(exposure).map_err(|e| self.unexpected(e))?;
        Ok(Envelope::ok(self.translator().translate(key, &[]), data))
    }

    fn stamp(&self, actor: &ActorContext) -> Stamp {
        Stamp::new(self.clock.now(), &self.config, actor)
    }

    fn validation_failed(&self, errors: Vec<FieldError>) -> LifecycleError {
        LifecycleError::validation(
            self.translator().translate(MessageKey::ValidationFailed, &[]),
            errors,
        )
    }

    fn forbidden(&self) -> LifecycleError {
        LifecycleError::Forbidden {
            message: self.translator().translate(MessageKey::SuperadminRequired, &[]),
        }
    }

    fn unexpected(&self, detail: impl std::fmt::Display) -> LifecycleError {
        tracing::error!(error = %detail, "collaborator failure");
        LifecycleError::unexpected(self.translator(), detail)
    }
}

impl<T: Resource> std::fmt::Debug for LifecycleController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("table", &T::TABLE)
            .field("config", &self.config)
            .field("guards", &self.guard_names())
            .field("mirror", &self.mirror.is_some())
            .finish_non_exhaustive()
    }
}

/// Remove a positive integer control key from a list query.
fn take_count(
    params: &mut Params,
    key: &'static str,
    translator: &dyn Translator,
    errors: &mut FieldErrors,
) -> Option<u32> {
    let value = params.remove(key)?;
    let parsed = match &value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    if parsed.is_none() {
        errors.push(
            key,
            translator.translate(MessageKey::FieldType, &[("field", key), ("value", "integer")]),
        );
    }
    parsed
}

/// Query strings carry every value as text; convert filters to the field's
/// declared kind.
fn coerce_filter<T: Resource>(field: &str, value: Value) -> Value {
    let kind = match field {
        ID_FIELD | STATUS_FIELD => FieldKind::Integer,
        _ => field_spec::<T>(field).map_or(FieldKind::Any, |spec| spec.kind),
    };
    let Value::String(text) = &value else {
        return value;
    };
    let coerced = match kind {
        FieldKind::Integer => text.parse::<i64>().ok().map(Value::from),
        FieldKind::Number => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        FieldKind::Boolean => text.parse::<bool>().ok().map(Value::Bool),
        _ => None,
    };
    coerced.unwrap_or(value)
}
