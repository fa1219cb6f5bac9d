use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use log::debug;

use crate::core::{OrmError, Params, Result, Row, Value};
use crate::entity::Listener;
use crate::schema::{EntityType, KeyValue, ReferenceDescriptor};
use crate::storage::StorageBackend;

/// A runtime entity object.
///
/// Instances are always handled as `Arc<Instance>`: the identity-map cache of
/// the owning [`EntityType`] guarantees at most one live instance per key, so
/// two constructions with the same key yield the same allocation. The cache
/// holds only weak handles — dropping every `Arc` collects the instance.
pub struct Instance {
    ty: Arc<EntityType>,
    state: Mutex<State>,
}

struct State {
    /// Column values, indexed by resolved property slot.
    values: Vec<Value>,
    /// Whether this row has been written to the backing store.
    persisted: bool,
    /// Registered listeners (live types only). Held weakly; the owning
    /// session keeps the listener alive.
    listeners: Vec<Weak<dyn Listener>>,
}

impl Instance {
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    pub fn is_persisted(&self) -> bool {
        self.state.lock().unwrap().persisted
    }

    /// Current key of this instance; `None` while any component is NULL
    /// (e.g. a surrogate key before insert).
    pub fn key(&self) -> Option<KeyValue> {
        let state = self.state.lock().unwrap();
        self.ty.key_of(&state.values)
    }

    /// Read a property (declared or reference-expanded) by name.
    pub fn get(&self, property: &str) -> Result<Value> {
        let slot = self
            .ty
            .prop_slot(property)
            .ok_or_else(|| self.unknown_property(property))?;
        Ok(self.state.lock().unwrap().values[slot].clone())
    }

    /// Assign a declared property, after type and constraint checks.
    ///
    /// Reference-expanded columns cannot be assigned directly; use
    /// [`Instance::set_reference`], which runs the rewiring protocol.
    pub fn set(&self, property: &str, value: Value) -> Result<()> {
        let slot = self
            .ty
            .prop_slot(property)
            .ok_or_else(|| self.unknown_property(property))?;
        let prop = &self.ty.props()[slot];
        if prop.is_synthetic() {
            let owner = self
                .ty
                .refs()
                .iter()
                .find(|r| r.slots().contains(&slot))
                .map(|r| r.name().to_string())
                .unwrap_or_default();
            return Err(OrmError::ReferenceColumn {
                entity: self.ty.name().to_string(),
                property: property.to_string(),
                reference: owner,
            });
        }
        prop.accept(&value)?;
        self.state.lock().unwrap().values[slot] = value;
        Ok(())
    }

    /// Current key held by a reference; `None` while any component is NULL.
    pub fn reference_key(&self, reference: &str) -> Result<Option<KeyValue>> {
        let r = self.lookup_reference(reference)?;
        let state = self.state.lock().unwrap();
        let components: Vec<_> = r.slots().iter().map(|&s| state.values[s].clone()).collect();
        let key = KeyValue::from_components(components);
        Ok((!key.is_null()).then_some(key))
    }

    /// Point a reference at a new target key.
    ///
    /// For a live reference this runs the rewiring protocol, in order: the
    /// old target (if resident in its type's identity map) is notified of the
    /// removed incoming reference, the new value is written, then the new
    /// target (if resident) is notified of the added incoming reference.
    /// Targets that live only in the backing store are not notified.
    pub fn set_reference(self: &Arc<Self>, reference: &str, key: KeyValue) -> Result<()> {
        let r = self.lookup_reference(reference)?.clone();
        if key.len() != r.slots().len() {
            return Err(OrmError::KeyArity {
                entity: self.ty.name().to_string(),
                of: r.name().to_string(),
                expected: r.slots().len(),
                got: key.len(),
            });
        }
        for (&slot, component) in r.slots().iter().zip(key.components()) {
            self.ty.props()[slot].accept(component)?;
        }

        if r.is_live() {
            let old = self.reference_key(reference)?;
            if let Some(old_key) = old
                && let Some(target) = r.target().cache().lookup(&old_key)
            {
                target.notify_reference_removed(self);
            }
        }

        {
            let mut state = self.state.lock().unwrap();
            for (&slot, component) in r.slots().iter().zip(key.components()) {
                state.values[slot] = component.clone();
            }
        }

        if r.is_live()
            && !key.is_null()
            && let Some(target) = r.target().cache().lookup(&key)
        {
            target.notify_reference_added(self);
        }
        Ok(())
    }

    /// Check the object-wide constraint. Also invoked at construction and
    /// before insert/update.
    pub fn check(&self) -> Result<()> {
        if let Some(constraint) = &self.ty.constraint
            && !constraint(self)
        {
            return Err(OrmError::ObjectConstraint {
                entity: self.ty.name().to_string(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write this instance to the backing store.
    ///
    /// With a surrogate key, the generated value is requested back, assigned,
    /// and the instance is registered in the identity map under it.
    pub async fn insert(self: &Arc<Self>, db: &dyn StorageBackend) -> Result<()> {
        self.validate_required()?;
        self.check()?;
        let params = {
            let state = self.state.lock().unwrap();
            if state.persisted {
                return Err(OrmError::AlreadyPersisted(self.ty.name().to_string()));
            }
            self.complete_params(&state.values)
        };

        if self.ty.key().is_surrogate() && self.key().is_none() {
            let rows = self.ty.statements().insert.query(db, &params).await?;
            let row = rows.single()?;
            let generated =
                row.into_iter().next().filter(|v| !v.is_null()).ok_or_else(|| {
                    OrmError::RowShape {
                        entity: self.ty.name().to_string(),
                        expected: 1,
                        got: 0,
                    }
                })?;
            debug!("{}: store assigned key {}", self.ty.name(), generated);
            {
                let mut state = self.state.lock().unwrap();
                state.values[self.ty.key().slots()[0]] = generated.clone();
                state.persisted = true;
            }
            self.ty.cache().register(KeyValue::Single(generated), self);
        } else {
            self.ty.statements().insert.exec(db, &params).await?;
            self.state.lock().unwrap().persisted = true;
        }
        Ok(())
    }

    /// Persist the current field values, then notify listeners.
    pub async fn update(self: &Arc<Self>, db: &dyn StorageBackend) -> Result<()> {
        self.validate_required()?;
        self.check()?;
        let params = {
            let state = self.state.lock().unwrap();
            if !state.persisted {
                return Err(OrmError::NotPersisted(self.ty.name().to_string()));
            }
            let mut params = self.complete_params(&state.values);
            if self.ty.key().is_surrogate() {
                let slot = self.ty.key().slots()[0];
                params.insert(self.ty.props()[slot].name().to_string(), state.values[slot].clone());
            }
            params
        };
        self.ty.statements().update.exec(db, &params).await?;
        if self.ty.is_live() {
            self.send_update();
        }
        Ok(())
    }

    /// Delete the backing row, notify every listener's delete hook exactly
    /// once, then unregister all listeners (terminal transition).
    pub async fn delete(self: &Arc<Self>, db: &dyn StorageBackend) -> Result<()> {
        let params = {
            let state = self.state.lock().unwrap();
            if !state.persisted {
                return Err(OrmError::NotPersisted(self.ty.name().to_string()));
            }
            self.key_params(&state.values)
        };
        self.ty.statements().delete.exec(db, &params).await?;
        self.state.lock().unwrap().persisted = false;
        if self.ty.is_live() {
            let listeners = {
                let mut state = self.state.lock().unwrap();
                let snapshot = upgrade_all(&state.listeners);
                state.listeners.clear();
                snapshot
            };
            for l in &listeners {
                l.deleted(self);
                l.listenee_removed(self);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listener registration
    // ------------------------------------------------------------------

    /// Register a listener. Registration is symmetric (the listener's
    /// `listenee_added` hook fires) and idempotent per listener identity.
    pub fn add_listener(self: &Arc<Self>, listener: &Arc<dyn Listener>) -> Result<()> {
        if !self.ty.is_live() {
            return Err(OrmError::NotLive(self.ty.name().to_string()));
        }
        let candidate = Arc::downgrade(listener);
        {
            let mut state = self.state.lock().unwrap();
            state.listeners.retain(|w| w.strong_count() > 0);
            if state.listeners.iter().any(|w| w.ptr_eq(&candidate)) {
                return Ok(());
            }
            state.listeners.push(candidate);
        }
        listener.listenee_added(self);
        Ok(())
    }

    /// Unregister a listener; a no-op if it was not registered.
    pub fn remove_listener(self: &Arc<Self>, listener: &Arc<dyn Listener>) -> Result<()> {
        if !self.ty.is_live() {
            return Err(OrmError::NotLive(self.ty.name().to_string()));
        }
        let candidate = Arc::downgrade(listener);
        let removed = {
            let mut state = self.state.lock().unwrap();
            let before = state.listeners.len();
            state.listeners.retain(|w| !w.ptr_eq(&candidate));
            state.listeners.len() != before
        };
        if removed {
            listener.listenee_removed(self);
        }
        Ok(())
    }

    /// Unregister every listener.
    pub fn remove_all_listeners(self: &Arc<Self>) -> Result<()> {
        if !self.ty.is_live() {
            return Err(OrmError::NotLive(self.ty.name().to_string()));
        }
        let listeners = {
            let mut state = self.state.lock().unwrap();
            let snapshot = upgrade_all(&state.listeners);
            state.listeners.clear();
            snapshot
        };
        for l in &listeners {
            l.listenee_removed(self);
        }
        Ok(())
    }

    /// Number of live listener registrations.
    pub fn listener_count(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        state.listeners.retain(|w| w.strong_count() > 0);
        state.listeners.len()
    }

    /// Fan the update hook out to every listener without touching storage.
    pub fn send_update(self: &Arc<Self>) {
        for l in self.listeners_snapshot() {
            l.updated(self);
        }
    }

    /// Fan out "new incoming reference from `referrer`" to every listener.
    pub fn notify_reference_added(self: &Arc<Self>, referrer: &Arc<Instance>) {
        for l in self.listeners_snapshot() {
            l.reference_added(self, referrer);
        }
    }

    /// Fan out "removed incoming reference from `referrer`" to every listener.
    pub fn notify_reference_removed(self: &Arc<Self>, referrer: &Arc<Instance>) {
        for l in self.listeners_snapshot() {
            l.reference_removed(self, referrer);
        }
    }

    // ------------------------------------------------------------------
    // Serialized form
    // ------------------------------------------------------------------

    /// JSON object of every property whose descriptor carries the json flag.
    pub fn json_repr(&self) -> serde_json::Value {
        let state = self.state.lock().unwrap();
        let mut map = serde_json::Map::new();
        for (slot, prop) in self.ty.props().iter().enumerate() {
            if prop.in_json() {
                map.insert(prop.name().to_string(), state.values[slot].to_json());
            }
        }
        serde_json::Value::Object(map)
    }

    pub fn to_json(&self) -> String {
        self.json_repr().to_string()
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn lookup_reference(&self, name: &str) -> Result<&ReferenceDescriptor> {
        self.ty.reference(name).ok_or_else(|| OrmError::UnknownReference {
            entity: self.ty.name().to_string(),
            reference: name.to_string(),
        })
    }

    fn unknown_property(&self, property: &str) -> OrmError {
        OrmError::UnknownProperty {
            entity: self.ty.name().to_string(),
            property: property.to_string(),
        }
    }

    /// NOT NULL columns must hold a value before the row is written.
    fn validate_required(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        for (slot, prop) in self.ty.props().iter().enumerate() {
            if prop.is_required() && state.values[slot].is_null() {
                return Err(OrmError::MissingValue {
                    entity: self.ty.name().to_string(),
                    property: prop.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Parameters for insert/update: every column except a surrogate key.
    fn complete_params(&self, values: &[Value]) -> Params {
        let surrogate = self.ty.key().is_surrogate().then(|| self.ty.key().slots()[0]);
        let mut params = Params::new();
        for (slot, prop) in self.ty.props().iter().enumerate() {
            if Some(slot) != surrogate {
                params.insert(prop.name().to_string(), values[slot].clone());
            }
        }
        params
    }

    /// Parameters for the key predicate, named by column.
    fn key_params(&self, values: &[Value]) -> Params {
        self.ty
            .key()
            .slots()
            .iter()
            .map(|&slot| (self.ty.props()[slot].name().to_string(), values[slot].clone()))
            .collect()
    }

    fn listeners_snapshot(&self) -> Vec<Arc<dyn Listener>> {
        let mut state = self.state.lock().unwrap();
        state.listeners.retain(|w| w.strong_count() > 0);
        upgrade_all(&state.listeners)
    }
}

fn upgrade_all(listeners: &[Weak<dyn Listener>]) -> Vec<Arc<dyn Listener>> {
    listeners.iter().filter_map(Weak::upgrade).collect()
}

impl serde::Serialize for Instance {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.json_repr().serialize(serializer)
    }
}

impl PartialEq for Instance {
    /// Same entity type and same key.
    fn eq(&self, other: &Self) -> bool {
        self.ty.name() == other.ty.name() && self.key() == other.key()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        write!(f, "{}(", self.ty.name())?;
        for (i, prop) in self.ty.props().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", prop.name(), state.values[i])?;
        }
        write!(f, ")")
    }
}

// ----------------------------------------------------------------------
// Construction: every path funnels through the identity map.
// ----------------------------------------------------------------------

impl EntityType {
    /// Construct an instance from named values and reference keys.
    ///
    /// Every declared property may appear in `values`; omitted optional
    /// properties start as NULL. References are assigned by name with the
    /// target key. If an instance with the same key is already resident, that
    /// instance is returned and the new one is discarded.
    pub fn create(
        self: &Arc<Self>,
        values: &[(&str, Value)],
        refs: &[(&str, KeyValue)],
    ) -> Result<Arc<Instance>> {
        let mut row = vec![Value::Null; self.props().len()];

        for (name, value) in values {
            let slot = self.prop_slot(name).ok_or_else(|| OrmError::UnknownProperty {
                entity: self.name().to_string(),
                property: name.to_string(),
            })?;
            let prop = &self.props()[slot];
            if prop.is_synthetic() {
                return Err(OrmError::UnknownProperty {
                    entity: self.name().to_string(),
                    property: name.to_string(),
                });
            }
            prop.accept(value)?;
            row[slot] = value.clone();
        }

        for (name, key) in refs {
            let r = self.reference(name).ok_or_else(|| OrmError::UnknownReference {
                entity: self.name().to_string(),
                reference: name.to_string(),
            })?;
            if key.len() != r.slots().len() {
                return Err(OrmError::KeyArity {
                    entity: self.name().to_string(),
                    of: r.name().to_string(),
                    expected: r.slots().len(),
                    got: key.len(),
                });
            }
            for (&slot, component) in r.slots().iter().zip(key.components()) {
                self.props()[slot].accept(component)?;
                row[slot] = component.clone();
            }
        }

        self.materialize(row, false)
    }

    /// Construct an instance from a raw storage row, in resolved column
    /// order. Used by fetch paths; the instance is marked persisted.
    pub fn from_row(self: &Arc<Self>, row: Row) -> Result<Arc<Instance>> {
        if row.len() != self.props().len() {
            return Err(OrmError::RowShape {
                entity: self.name().to_string(),
                expected: self.props().len(),
                got: row.len(),
            });
        }
        for (value, prop) in row.iter().zip(self.props()) {
            prop.accept(value)?;
        }
        self.materialize(row, true)
    }

    /// Construct an instance from a data-transfer payload. Fields map to
    /// resolved column names (reference components as `<ref>_<col>`); unknown
    /// fields are ignored.
    pub fn from_json(self: &Arc<Self>, payload: &serde_json::Value) -> Result<Arc<Instance>> {
        let object = payload.as_object().ok_or_else(|| OrmError::RowShape {
            entity: self.name().to_string(),
            expected: self.props().len(),
            got: 0,
        })?;
        let mut row = vec![Value::Null; self.props().len()];
        for (slot, prop) in self.props().iter().enumerate() {
            if let Some(field) = object.get(prop.name()) {
                let value = prop.data_type().value_from_json(field).ok_or_else(|| {
                    OrmError::TypeMismatch {
                        entity: self.name().to_string(),
                        property: prop.name().to_string(),
                        expected: prop.data_type().to_string(),
                        actual: "JSON",
                    }
                })?;
                prop.accept(&value)?;
                row[slot] = value;
            }
        }
        self.materialize(row, false)
    }

    /// Canonical fetch: identity-map hit, or find-by-key query whose result
    /// is registered before being returned.
    pub async fn find_by_key(
        self: &Arc<Self>,
        key: &KeyValue,
        db: &dyn StorageBackend,
    ) -> Result<Arc<Instance>> {
        if let Some(instance) = self.cache().lookup(key) {
            return Ok(instance);
        }
        if key.len() != self.key().slots().len() {
            return Err(OrmError::KeyArity {
                entity: self.name().to_string(),
                of: "key".to_string(),
                expected: self.key().slots().len(),
                got: key.len(),
            });
        }
        let params: Params = self
            .key()
            .slots()
            .iter()
            .zip(key.components())
            .map(|(&slot, component)| (self.props()[slot].name().to_string(), component.clone()))
            .collect();
        let rows = self.statements().find_by_key.query(db, &params).await?;
        self.from_row(rows.single()?)
    }

    /// Shared tail of every construction path: required/constraint checks,
    /// canonicalization, and (for fresh live-reference holders) the
    /// added-reference fan-out.
    fn materialize(self: &Arc<Self>, row: Row, persisted: bool) -> Result<Arc<Instance>> {
        let instance = Arc::new(Instance {
            ty: Arc::clone(self),
            state: Mutex::new(State {
                values: row,
                persisted,
                listeners: Vec::new(),
            }),
        });
        if !persisted {
            instance.validate_required()?;
        }
        instance.check()?;

        let canonical = match instance.key() {
            Some(key) => self.cache().canonicalize(key, Arc::clone(&instance)),
            None => instance.clone(),
        };
        if !Arc::ptr_eq(&canonical, &instance) {
            // An instance for this key is already resident; the new one is
            // discarded and never announced.
            return Ok(canonical);
        }

        if !persisted {
            for r in self.refs().iter().filter(|r| r.is_live()) {
                if let Ok(Some(key)) = canonical.reference_key(r.name())
                    && let Some(target) = r.target().cache().lookup(&key)
                {
                    target.notify_reference_added(&canonical);
                }
            }
        }
        Ok(canonical)
    }
}
