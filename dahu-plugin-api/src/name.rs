//! Qualified plugin names
//!
//! Every registrable plugin type is keyed by a dotted `<namespace>.<TypeName>`
//! identifier. Names are derived from Rust item paths (`my_crate::calib::Flat`
//! becomes `my_crate.calib.Flat`) or parsed from caller input.

use std::borrow::Borrow;
use std::fmt;

use crate::error::ResolutionError;

/// Separator between namespace segments and the simple name.
pub const SEPARATOR: char = '.';

/// Globally unique key of a plugin type: `<namespace-path>.<TypeName>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Resolve the qualified name of a type.
    ///
    /// ```
    /// use dahu_plugin_api::QualifiedName;
    ///
    /// struct Flatfield;
    /// let name = QualifiedName::of::<Flatfield>().unwrap();
    /// assert!(name.as_str().ends_with(".Flatfield"));
    /// ```
    pub fn of<T: ?Sized>() -> Result<Self, ResolutionError> {
        Self::from_rust_path(std::any::type_name::<T>())
    }

    /// Resolve the qualified name of a value's runtime type.
    ///
    /// For a function item this yields `<module>.<function name>`.
    pub fn of_val<T: ?Sized>(value: &T) -> Result<Self, ResolutionError> {
        Self::from_rust_path(std::any::type_name_of_val(value))
    }

    /// Parse a caller-supplied dotted name.
    pub fn parse(name: &str) -> Result<Self, ResolutionError> {
        if !name.contains(SEPARATOR) {
            return Err(ResolutionError::Unqualified {
                name: name.to_string(),
            });
        }
        if !name.split(SEPARATOR).all(is_identifier) {
            return Err(ResolutionError::Malformed {
                name: name.to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Convert a Rust item path (`a::b::C`) into a qualified name.
    ///
    /// Generic instantiations (`a::b::C<u8>`) are rejected as malformed:
    /// each instantiation is a distinct type but would share one dotted name.
    fn from_rust_path(path: &str) -> Result<Self, ResolutionError> {
        let segments: Vec<&str> = path.split("::").collect();
        if segments.len() < 2 {
            return Err(ResolutionError::Unqualified {
                name: path.to_string(),
            });
        }
        if !segments.iter().all(|s| is_identifier(s)) {
            return Err(ResolutionError::Malformed {
                name: path.to_string(),
            });
        }
        Ok(Self(segments.join(".")))
    }

    /// The full dotted name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace path: everything before the last separator.
    pub fn module(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(module, _)| module)
            .unwrap_or_default()
    }

    /// Simple name: the last segment.
    pub fn type_name(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(_, name)| name)
            .unwrap_or(&self.0)
    }

    /// Modules that may define this name, longest dotted prefix first.
    ///
    /// `a.b.C` yields `["a.b", "a"]`: a nested Rust module is compiled into
    /// the library named after its crate.
    pub fn module_candidates(&self) -> Vec<&str> {
        let module = self.module();
        let mut candidates = vec![module];
        let mut rest = module;
        while let Some((prefix, _)) = rest.rsplit_once(SEPARATOR) {
            candidates.push(prefix);
            rest = prefix;
        }
        candidates
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for QualifiedName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for QualifiedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for QualifiedName {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
