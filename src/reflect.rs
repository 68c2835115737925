//! Structural reflection over registered Rust types.
//!
//! Types opt in by implementing [`Reflect`], normally through the
//! [`reflect_fields!`] macro, which registers a static
//! [`TypeDescriptor`] naming each field together with its visibility,
//! transience, and an accessor function.
//!
//! Turning a descriptor plus a field selection into the list of fields
//! actually emitted is the expensive step, so resolved [`FieldPlan`]s
//! are cached process-wide. The cache key is composite: the selection
//! (visibility threshold, explicit field list, aliases) participates
//! alongside the type, so the same type reflected under different
//! selections yields distinct plans.
//!
//! The cache follows a lookup-or-create-and-publish discipline: readers
//! share a read lock, a miss builds the plan outside any lock, and the
//! first writer to publish wins — a concurrent builder of the same key
//! discards its copy and adopts the published plan.
//!
//! [`reflect_fields!`]: crate::reflect_fields

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::options::Visibility;
use crate::pairs::{FixedPairs, PairList};
use crate::{JsonConfig, JsonMap, ReflectionError, Value};

/// One field of a registered type.
pub struct FieldDescriptor {
    /// Declared field name.
    pub name: &'static str,
    /// Visibility level used by threshold-based selection.
    pub visibility: Visibility,
    /// Transient fields never appear in reflected output.
    pub transient: bool,
    /// Accessor producing the field's value from an erased reference.
    pub getter: fn(&dyn Any) -> Result<Value, ReflectionError>,
}

/// Static description of a registered type.
pub struct TypeDescriptor {
    pub type_name: &'static str,
    /// `TypeId` accessor; `TypeId::of` cannot be called in a `static`
    /// initializer on our minimum supported toolchain.
    pub type_id: fn() -> TypeId,
    /// Fields in declaration order.
    pub fields: &'static [FieldDescriptor],
}

impl TypeDescriptor {
    /// Looks up a field by declared name.
    ///
    /// # Errors
    ///
    /// [`ReflectionError::NoSuchField`] when absent.
    pub fn field(&self, name: &str) -> Result<&FieldDescriptor, ReflectionError> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| ReflectionError::NoSuchField(name.to_string()))
    }
}

/// Types whose fields can be enumerated at runtime.
///
/// Implement through [`reflect_fields!`](crate::reflect_fields); every
/// listed field must be `serde::Serialize`.
pub trait Reflect: Any {
    fn descriptor(&self) -> &'static TypeDescriptor;
    fn as_any(&self) -> &dyn Any;
}

/// Which fields a reflection pass emits, and under what names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSelection {
    /// Minimum visibility a field needs to be included.
    pub visibility: Visibility,
    /// When present, the exact fields to emit, in this order. The
    /// visibility threshold does not apply; names that resolve to no
    /// field are dropped. Transient fields stay excluded.
    pub explicit: Option<Vec<String>>,
    /// Field-name to output-name renames, applied after selection.
    pub aliases: Vec<(String, String)>,
}

impl Default for FieldSelection {
    fn default() -> Self {
        FieldSelection {
            visibility: Visibility::Public,
            explicit: None,
            aliases: Vec::new(),
        }
    }
}

impl FieldSelection {
    #[must_use]
    pub fn from_config(config: &JsonConfig) -> Self {
        FieldSelection {
            visibility: config.visibility,
            ..FieldSelection::default()
        }
    }

    #[must_use]
    pub fn with_explicit<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explicit = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_alias(mut self, field: impl Into<String>, output: impl Into<String>) -> Self {
        self.aliases.push((field.into(), output.into()));
        self
    }

    fn output_name(&self, field: &str) -> String {
        self.aliases
            .iter()
            .find(|(from, _)| from == field)
            .map(|(_, to)| to.clone())
            .unwrap_or_else(|| field.to_string())
    }
}

/// One resolved field of a [`FieldPlan`].
pub struct PlannedField {
    pub name: &'static str,
    /// Name under which the field appears in output (alias applied).
    pub output_name: String,
    pub getter: fn(&dyn Any) -> Result<Value, ReflectionError>,
}

/// Resolved, cached emission plan for one (type, selection) pair.
pub struct FieldPlan {
    pub type_name: &'static str,
    pub fields: Vec<PlannedField>,
}

// Aliases are sorted into the key so equivalent selections that listed
// them in different orders share a plan.
#[derive(PartialEq, Eq, Hash)]
struct PlanKey {
    type_id: TypeId,
    visibility: Visibility,
    explicit: Option<Vec<String>>,
    aliases: Vec<(String, String)>,
}

impl PlanKey {
    fn new(type_id: TypeId, selection: &FieldSelection) -> Self {
        let mut aliases = selection.aliases.clone();
        aliases.sort();
        PlanKey {
            type_id,
            visibility: selection.visibility,
            explicit: selection.explicit.clone(),
            aliases,
        }
    }
}

fn cache() -> &'static RwLock<HashMap<PlanKey, Arc<FieldPlan>>> {
    static CACHE: OnceLock<RwLock<HashMap<PlanKey, Arc<FieldPlan>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Empties the process-wide plan cache.
pub fn clear_plan_cache() {
    if let Ok(mut map) = cache().write() {
        map.clear();
    }
}

fn build_plan(descriptor: &'static TypeDescriptor, selection: &FieldSelection) -> FieldPlan {
    let fields = match &selection.explicit {
        Some(names) => names
            .iter()
            .filter_map(|name| {
                descriptor
                    .fields
                    .iter()
                    .find(|field| field.name == name && !field.transient)
            })
            .map(|field| PlannedField {
                name: field.name,
                output_name: selection.output_name(field.name),
                getter: field.getter,
            })
            .collect(),
        None => descriptor
            .fields
            .iter()
            .filter(|field| !field.transient && field.visibility >= selection.visibility)
            .map(|field| PlannedField {
                name: field.name,
                output_name: selection.output_name(field.name),
                getter: field.getter,
            })
            .collect(),
    };
    FieldPlan {
        type_name: descriptor.type_name,
        fields,
    }
}

/// Resolves (or retrieves from cache) the emission plan for a type
/// under the given selection.
///
/// # Errors
///
/// [`ReflectionError::Access`] when the cache lock is poisoned.
pub fn plan_for(
    descriptor: &'static TypeDescriptor,
    selection: &FieldSelection,
) -> Result<Arc<FieldPlan>, ReflectionError> {
    let key = PlanKey::new((descriptor.type_id)(), selection);

    {
        let map = cache()
            .read()
            .map_err(|_| ReflectionError::Access("plan cache lock poisoned".to_string()))?;
        if let Some(plan) = map.get(&key) {
            log::trace!("plan cache hit for {}", descriptor.type_name);
            return Ok(plan.clone());
        }
    }

    // Built outside the lock; a racing builder may publish first, in
    // which case its plan wins.
    let plan = Arc::new(build_plan(descriptor, selection));
    let mut map = cache()
        .write()
        .map_err(|_| ReflectionError::Access("plan cache lock poisoned".to_string()))?;
    let published = map.entry(key).or_insert_with(|| {
        log::debug!(
            "plan cache publish for {} ({} fields)",
            descriptor.type_name,
            plan.fields.len()
        );
        plan.clone()
    });
    Ok(published.clone())
}

thread_local! {
    static IN_PROGRESS: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

struct RecursionGuard {
    type_id: TypeId,
}

impl RecursionGuard {
    fn enter(type_id: TypeId, type_name: &str) -> Result<Self, ReflectionError> {
        IN_PROGRESS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&type_id) {
                return Err(ReflectionError::RecursiveReflection(type_name.to_string()));
            }
            stack.push(type_id);
            Ok(RecursionGuard { type_id })
        })
    }
}

impl Drop for RecursionGuard {
    fn drop(&mut self) {
        IN_PROGRESS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.last() == Some(&self.type_id) {
                stack.pop();
            }
        });
    }
}

/// Reflects a value into a [`Value::Object`] using the visibility
/// threshold from `config`.
///
/// # Errors
///
/// Reflection failures per [`ReflectionError`].
pub fn reflect(value: &dyn Reflect, config: &JsonConfig) -> Result<Value, ReflectionError> {
    reflect_with(value, &FieldSelection::from_config(config))
}

/// Reflects a value into a [`Value::Object`] under an explicit field
/// selection.
///
/// # Errors
///
/// Reflection failures per [`ReflectionError`].
pub fn reflect_with(
    value: &dyn Reflect,
    selection: &FieldSelection,
) -> Result<Value, ReflectionError> {
    let descriptor = value.descriptor();
    let type_id = (descriptor.type_id)();
    let _guard = RecursionGuard::enter(type_id, descriptor.type_name)?;

    let plan = plan_for(descriptor, selection)?;
    // The plan fixes the member count, so a fixed-slot list suffices.
    let mut members = FixedPairs::with_capacity(plan.fields.len());
    for field in &plan.fields {
        let field_value = (field.getter)(value.as_any())?;
        members.push(field.output_name.clone(), field_value);
    }
    let map: JsonMap = members.into_pairs().into_iter().collect();
    Ok(Value::Object(map))
}

/// Registers a type for reflection by listing its fields.
///
/// Each entry names a field, its [`Visibility`] variant, and optionally
/// a `transient` marker. Every listed field must implement
/// `serde::Serialize`.
///
/// ```rust
/// use laxjson::{reflect_fields, reflect, JsonConfig, Visibility};
///
/// struct Account {
///     id: u64,
///     label: String,
///     secret: String,
/// }
///
/// reflect_fields! {
///     Account {
///         id: Public,
///         label: Public,
///         secret: Private transient,
///     }
/// }
///
/// let account = Account { id: 7, label: "a".into(), secret: "s".into() };
/// let value = reflect(&account, &JsonConfig::default()).unwrap();
/// assert!(value.as_object().unwrap().get("secret").is_none());
/// ```
#[macro_export]
macro_rules! reflect_fields {
    ($ty:ty { $( $field:ident : $vis:ident $($modifier:ident)? ),* $(,)? }) => {
        impl $crate::Reflect for $ty {
            fn descriptor(&self) -> &'static $crate::TypeDescriptor {
                static FIELDS: &[$crate::FieldDescriptor] = &[
                    $(
                        $crate::FieldDescriptor {
                            name: stringify!($field),
                            visibility: $crate::Visibility::$vis,
                            transient: $crate::reflect_fields!(@modifier $($modifier)?),
                            getter: |any| {
                                let target = any
                                    .downcast_ref::<$ty>()
                                    .ok_or_else(|| $crate::ReflectionError::Access(
                                        concat!(
                                            "value is not a ",
                                            stringify!($ty)
                                        ).to_string(),
                                    ))?;
                                $crate::to_value(&target.$field).map_err(|err| {
                                    $crate::ReflectionError::Access(err.to_string())
                                })
                            },
                        },
                    )*
                ];
                static DESCRIPTOR: $crate::TypeDescriptor = $crate::TypeDescriptor {
                    type_name: stringify!($ty),
                    type_id: || ::std::any::TypeId::of::<$ty>(),
                    fields: FIELDS,
                };
                &DESCRIPTOR
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };
    (@modifier transient) => { true };
    (@modifier) => { false };
}

#[cfg(test)]
mod tests {
    use super::*;

    // Serializes tests that assert on shared plan-cache state.
    static CACHE_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn cache_test_guard() -> std::sync::MutexGuard<'static, ()> {
        CACHE_TEST_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    struct Sample {
        id: u64,
        label: String,
        internal: i32,
        scratch: String,
    }

    reflect_fields! {
        Sample {
            id: Public,
            label: Public,
            internal: Private,
            scratch: Private transient,
        }
    }

    fn sample() -> Sample {
        Sample {
            id: 7,
            label: "seven".to_string(),
            internal: -1,
            scratch: "tmp".to_string(),
        }
    }

    #[test]
    fn public_threshold_hides_private_fields() {
        let value = reflect(&sample(), &JsonConfig::default()).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.get("id"), Some(&Value::Int(7)));
        assert_eq!(map.get("label"), Some(&Value::String("seven".to_string())));
        assert!(map.get("internal").is_none());
        assert!(map.get("scratch").is_none());
    }

    #[test]
    fn private_threshold_includes_everything_but_transient() {
        let config = JsonConfig::default().with_visibility(Visibility::Private);
        let value = reflect(&sample(), &config).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.get("internal"), Some(&Value::Int(-1)));
        assert!(map.get("scratch").is_none());
    }

    #[test]
    fn explicit_selection_controls_order_and_ignores_visibility() {
        let selection = FieldSelection::default().with_explicit(["internal", "id"]);
        let value = reflect_with(&sample(), &selection).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["internal".to_string(), "id".to_string()]);
    }

    #[test]
    fn unresolvable_explicit_names_are_dropped() {
        let selection = FieldSelection::default().with_explicit(["id", "no_such", "scratch"]);
        let value = reflect_with(&sample(), &selection).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["id".to_string()]);
    }

    #[test]
    fn aliases_rename_output() {
        let selection = FieldSelection::default().with_alias("label", "name");
        let value = reflect_with(&sample(), &selection).unwrap();
        let map = value.as_object().unwrap();
        assert!(map.get("label").is_none());
        assert_eq!(map.get("name"), Some(&Value::String("seven".to_string())));
    }

    #[test]
    fn distinct_selections_get_distinct_plans() {
        let descriptor = sample().descriptor();
        let all = plan_for(descriptor, &FieldSelection {
            visibility: Visibility::Private,
            explicit: None,
            aliases: Vec::new(),
        })
        .unwrap();
        let public = plan_for(descriptor, &FieldSelection::default()).unwrap();
        assert_eq!(all.fields.len(), 3);
        assert_eq!(public.fields.len(), 2);
    }

    #[test]
    fn repeated_lookups_share_the_published_plan() {
        let _guard = cache_test_guard();
        let descriptor = sample().descriptor();
        let selection = FieldSelection::default().with_alias("id", "ident");
        let first = plan_for(descriptor, &selection).unwrap();
        let second = plan_for(descriptor, &selection).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn alias_order_does_not_split_the_cache() {
        let _guard = cache_test_guard();
        let descriptor = sample().descriptor();
        let a = FieldSelection::default()
            .with_alias("id", "i")
            .with_alias("label", "l");
        let b = FieldSelection::default()
            .with_alias("label", "l")
            .with_alias("id", "i");
        let first = plan_for(descriptor, &a).unwrap();
        let second = plan_for(descriptor, &b).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    // A descriptor whose only getter re-reflects its own type: field
    // resolution recursing into itself before the first pass finishes.
    struct SelfReferential;

    static SELF_FIELDS: &[FieldDescriptor] = &[FieldDescriptor {
        name: "inner",
        visibility: Visibility::Public,
        transient: false,
        getter: |any| {
            let target = any
                .downcast_ref::<SelfReferential>()
                .ok_or_else(|| ReflectionError::Access("value is not a SelfReferential".to_string()))?;
            reflect(target, &JsonConfig::default())
        },
    }];

    static SELF_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
        type_name: "SelfReferential",
        type_id: || TypeId::of::<SelfReferential>(),
        fields: SELF_FIELDS,
    };

    impl Reflect for SelfReferential {
        fn descriptor(&self) -> &'static TypeDescriptor {
            &SELF_DESCRIPTOR
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn re_entrant_type_resolution_is_recursive_reflection() {
        match reflect(&SelfReferential, &JsonConfig::default()) {
            Err(ReflectionError::RecursiveReflection(name)) => {
                assert_eq!(name, "SelfReferential");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_field_lookup_reports_no_such_field() {
        let descriptor = sample().descriptor();
        assert!(matches!(
            descriptor.field("nope"),
            Err(ReflectionError::NoSuchField(_))
        ));
        assert!(descriptor.field("id").is_ok());
    }

    #[test]
    fn cache_can_be_cleared() {
        let _guard = cache_test_guard();
        let descriptor = sample().descriptor();
        let selection = FieldSelection::default().with_alias("id", "cleared");
        let first = plan_for(descriptor, &selection).unwrap();
        clear_plan_cache();
        let second = plan_for(descriptor, &selection).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn concurrent_lookups_agree_on_one_plan() {
        let _guard = cache_test_guard();
        let descriptor = sample().descriptor();
        let selection = FieldSelection::default().with_alias("label", "threaded");
        let plans: Vec<_> = std::thread::scope(|scope| {
            (0..8)
                .map(|_| {
                    let selection = selection.clone();
                    scope.spawn(move || plan_for(descriptor, &selection).unwrap())
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });
        for plan in &plans[1..] {
            assert!(Arc::ptr_eq(&plans[0], plan));
        }
    }
}
