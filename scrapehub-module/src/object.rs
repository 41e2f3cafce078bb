//! Domain objects returned by backends and their completion state.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Attribute of a domain object that may not have been fetched yet.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Loaded(T),
    /// Not fetched yet; a fill may provide it.
    NotLoaded,
    /// The backend cannot provide it.
    NotAvailable,
}

impl<T> Field<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn is_not_loaded(&self) -> bool {
        matches!(self, Self::NotLoaded)
    }

    pub fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_option_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Loaded(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::NotLoaded
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::Loaded(value)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Loaded(v) => v.serialize(serializer),
            Self::NotLoaded | Self::NotAvailable => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Self::NotLoaded, Self::Loaded))
    }
}

/// Recursive "nothing left to fetch" check.
pub trait Completeness {
    /// Whether no `NotLoaded` remains, looking through containers and
    /// nested objects.
    fn is_complete(&self) -> bool {
        true
    }

    /// Whether this is itself a `NotLoaded` field.
    fn is_not_loaded(&self) -> bool {
        false
    }

    /// Replace `NotLoaded` by `NotAvailable`, here and in container
    /// elements, without descending into the attributes of nested objects.
    fn mark_unavailable(&mut self) {}
}

macro_rules! complete_leaf {
    ($($ty:ty),* $(,)?) => {
        $(impl Completeness for $ty {})*
    };
}

complete_leaf!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    String,
    serde_json::Value,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
);

impl<Tz: chrono::TimeZone> Completeness for chrono::DateTime<Tz> {}

impl<T: Completeness> Completeness for Field<T> {
    fn is_complete(&self) -> bool {
        match self {
            Self::Loaded(v) => v.is_complete(),
            Self::NotLoaded => false,
            Self::NotAvailable => true,
        }
    }

    fn is_not_loaded(&self) -> bool {
        matches!(self, Self::NotLoaded)
    }

    fn mark_unavailable(&mut self) {
        match self {
            Self::NotLoaded => *self = Self::NotAvailable,
            Self::Loaded(v) => v.mark_unavailable(),
            Self::NotAvailable => {}
        }
    }
}

impl<T: Completeness> Completeness for Option<T> {
    fn is_complete(&self) -> bool {
        self.as_ref().is_none_or(Completeness::is_complete)
    }
}

impl<T: Completeness> Completeness for Vec<T> {
    fn is_complete(&self) -> bool {
        self.iter().all(Completeness::is_complete)
    }

    fn mark_unavailable(&mut self) {
        self.iter_mut().for_each(Completeness::mark_unavailable);
    }
}

impl<K, T: Completeness> Completeness for BTreeMap<K, T> {
    fn is_complete(&self) -> bool {
        self.values().all(Completeness::is_complete)
    }

    fn mark_unavailable(&mut self) {
        self.values_mut().for_each(Completeness::mark_unavailable);
    }
}

impl<K, T: Completeness, S> Completeness for HashMap<K, T, S> {
    fn is_complete(&self) -> bool {
        self.values().all(Completeness::is_complete)
    }

    fn mark_unavailable(&mut self) {
        self.values_mut().for_each(Completeness::mark_unavailable);
    }
}

/// Object-safe view of one attribute, used by the fill protocol.
pub trait FieldSlot {
    /// Strictly `NotLoaded`.
    fn is_not_loaded(&self) -> bool;

    /// `NotLoaded`, an incomplete nested object, or a container holding one.
    fn is_incomplete(&self) -> bool;

    /// `NotLoaded` (itself or as a container element) becomes `NotAvailable`.
    fn set_not_available(&mut self);
}

impl<T: Completeness> FieldSlot for T {
    fn is_not_loaded(&self) -> bool {
        Completeness::is_not_loaded(self)
    }

    fn is_incomplete(&self) -> bool {
        !self.is_complete()
    }

    fn set_not_available(&mut self) {
        self.mark_unavailable();
    }
}

/// Type tag of a domain object, matched by fill tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKind(pub &'static str);

impl ObjectKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A domain object with named, possibly not loaded, attributes.
///
/// Usually implemented with [`impl_base_object!`](crate::impl_base_object).
pub trait BaseObject: Completeness + fmt::Debug + Any {
    fn id(&self) -> &str;

    /// Own kind first, then the kinds it specializes.
    fn kinds(&self) -> &'static [ObjectKind];

    fn field_names(&self) -> &'static [&'static str];

    fn field(&self, name: &str) -> Option<&dyn FieldSlot>;

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn FieldSlot>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn is_kind(&self, kind: ObjectKind) -> bool {
        self.kinds().contains(&kind)
    }

    /// Display name used in logs and errors, e.g. `Account(1234)`.
    fn fullid(&self) -> String {
        let kind = self.kinds().first().map_or("Object", |k| k.0);
        format!("{kind}({})", self.id())
    }
}

/// Implement [`BaseObject`] and [`Completeness`] for a struct.
///
/// ```
/// use scrapehub_module::{Field, ObjectKind};
///
/// const KIND_ACCOUNT: ObjectKind = ObjectKind::new("Account");
///
/// #[derive(Debug, Default)]
/// struct Account {
///     id: String,
///     label: Field<String>,
///     balance: Field<f64>,
/// }
///
/// scrapehub_module::impl_base_object!(Account, id: id, kinds: [KIND_ACCOUNT], fields: [label, balance]);
/// ```
#[macro_export]
macro_rules! impl_base_object {
    ($ty:ty, id: $id:ident, kinds: [$($kind:expr),+ $(,)?], fields: [$($field:ident),* $(,)?]) => {
        impl $crate::Completeness for $ty {
            fn is_complete(&self) -> bool {
                true $(&& $crate::Completeness::is_complete(&self.$field))*
            }
        }

        impl $crate::BaseObject for $ty {
            fn id(&self) -> &str {
                &self.$id
            }

            fn kinds(&self) -> &'static [$crate::ObjectKind] {
                const KINDS: &[$crate::ObjectKind] = &[$($kind),+];
                KINDS
            }

            fn field_names(&self) -> &'static [&'static str] {
                &[$(stringify!($field)),*]
            }

            fn field(&self, name: &str) -> Option<&dyn $crate::FieldSlot> {
                match name {
                    $(stringify!($field) => Some(&self.$field as &dyn $crate::FieldSlot),)*
                    _ => None,
                }
            }

            fn field_mut(&mut self, name: &str) -> Option<&mut dyn $crate::FieldSlot> {
                match name {
                    $(stringify!($field) => Some(&mut self.$field as &mut dyn $crate::FieldSlot),)*
                    _ => None,
                }
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    };
}
