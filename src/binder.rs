//! Parameter binding: string parameters onto typed job fields.
//!
//! Each job type declares an explicit table of configurable fields. A field
//! either uses the built-in [`FromParam`] conversion for its type or carries
//! its own converter. Binding is permissive: parameters without a matching
//! field are ignored and fields without a matching parameter keep their
//! default.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::trace;
use url::Url;

use crate::params::Parameters;

/// A declared field's raw value could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("parameter '{field}': cannot convert {value:?} to {expected}: {reason}")]
    Parse {
        field: String,
        value: String,
        expected: &'static str,
        reason: String,
    },

    #[error("parameter '{field}': converter rejected {value:?}: {reason}")]
    Converter {
        field: String,
        value: String,
        reason: String,
    },
}

impl BindingError {
    pub fn field(&self) -> &str {
        match self {
            Self::Parse { field, .. } | Self::Converter { field, .. } => field,
        }
    }
}

/// Built-in string conversion for a field type.
pub trait FromParam: Sized {
    /// Human-readable target type, used in error messages.
    const EXPECTED: &'static str;

    fn from_param(raw: &str) -> Result<Self, String>;
}

impl FromParam for String {
    const EXPECTED: &'static str = "string";

    fn from_param(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl FromParam for bool {
    const EXPECTED: &'static str = "bool";

    fn from_param(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err("expected 'true' or 'false'".to_string())
        }
    }
}

macro_rules! from_param_via_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromParam for $ty {
                const EXPECTED: &'static str = stringify!($ty);

                fn from_param(raw: &str) -> Result<Self, String> {
                    raw.trim().parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )*
    };
}

from_param_via_from_str!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl FromParam for char {
    const EXPECTED: &'static str = "char";

    // Untrimmed: whitespace is a valid value.
    fn from_param(raw: &str) -> Result<Self, String> {
        raw.parse::<char>().map_err(|e| e.to_string())
    }
}

impl FromParam for Url {
    const EXPECTED: &'static str = "url";

    fn from_param(raw: &str) -> Result<Self, String> {
        Url::parse(raw.trim()).map_err(|e| e.to_string())
    }
}

impl FromParam for PathBuf {
    const EXPECTED: &'static str = "path";

    fn from_param(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("empty path".to_string());
        }
        Ok(PathBuf::from(raw))
    }
}

/// Whole seconds.
impl FromParam for Duration {
    const EXPECTED: &'static str = "duration (seconds)";

    fn from_param(raw: &str) -> Result<Self, String> {
        u64::from_param(raw).map(Duration::from_secs)
    }
}

/// An empty string binds to `None`.
impl<T: FromParam> FromParam for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_param(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            Ok(None)
        } else {
            T::from_param(raw).map(Some)
        }
    }
}

type Apply<J> = Box<dyn Fn(&mut J, &str) -> Result<(), BindingError> + Send + Sync>;

struct Field<J> {
    name: &'static str,
    apply: Apply<J>,
}

/// Field table for one job type: field name → setter with its conversion.
pub struct Bindings<J> {
    fields: Vec<Field<J>>,
}

impl<J> Default for Bindings<J> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<J> Bindings<J> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field converted with its type's [`FromParam`] impl.
    #[must_use]
    pub fn field<T, S>(self, name: &'static str, set: S) -> Self
    where
        T: FromParam + 'static,
        S: Fn(&mut J, T) + Send + Sync + 'static,
    {
        self.push(
            name,
            Box::new(move |job, raw| {
                let value = T::from_param(raw).map_err(|reason| BindingError::Parse {
                    field: name.to_string(),
                    value: raw.to_string(),
                    expected: T::EXPECTED,
                    reason,
                })?;
                set(job, value);
                Ok(())
            }),
        )
    }

    /// Declare a field with an explicit converter. The converter's output is
    /// assigned as-is; the built-in conversion is never consulted.
    #[must_use]
    pub fn field_with<T, E, C, S>(self, name: &'static str, convert: C, set: S) -> Self
    where
        T: 'static,
        E: fmt::Display,
        C: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        S: Fn(&mut J, T) + Send + Sync + 'static,
    {
        self.push(
            name,
            Box::new(move |job, raw| {
                let value = convert(raw).map_err(|e| BindingError::Converter {
                    field: name.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                })?;
                set(job, value);
                Ok(())
            }),
        )
    }

    fn push(mut self, name: &'static str, apply: Apply<J>) -> Self {
        debug_assert!(
            self.fields.iter().all(|f| f.name != name),
            "field '{name}' declared twice"
        );
        self.fields.push(Field { name, apply });
        self
    }

    /// Declared field names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Apply `params` to `job`. Field names match keys exactly. Returns the
    /// number of fields that were set; stops at the first conversion failure.
    pub fn bind(&self, job: &mut J, params: &Parameters) -> Result<usize, BindingError> {
        let mut applied = 0;
        for field in &self.fields {
            if let Some(raw) = params.get(field.name) {
                (field.apply)(job, raw)?;
                trace!(field = field.name, "bound parameter");
                applied += 1;
            }
        }
        Ok(applied)
    }
}

impl<J> fmt::Debug for Bindings<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
