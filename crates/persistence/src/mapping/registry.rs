//! Deserializer Registry.
//!
//! The registry maps native types and datatype IRIs to [`DatatypeHandler`]s.
//! It is filled once at startup with [`DeserializerRegistry::register_all`]
//! and then only read. Lookups by datatype accept prefixed or expanded
//! IRIs.
//!
//! When two handlers claim the same datatype (or alias), the one registered
//! last wins and the collision is logged.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MappingError, MappingResult};
use crate::sparql::Term;
use crate::uri::UriNormalizer;

use super::handlers::{
    BooleanHandler, DatatypeHandler, DateHandler, DateTimeHandler, DecimalHandler,
    IntegerHandler, NativeType, NativeValue, StringHandler, TypedLiteral, UriHandler,
};

/// Lookup tables from native types and datatype IRIs to handlers.
pub struct DeserializerRegistry {
    normalizer: UriNormalizer,
    by_native: HashMap<NativeType, Arc<dyn DatatypeHandler>>,
    /// Expanded datatype IRI (primary or alias) -> handler.
    by_datatype: HashMap<String, Arc<dyn DatatypeHandler>>,
}

impl DeserializerRegistry {
    /// Creates an empty registry.
    pub fn new(normalizer: UriNormalizer) -> Self {
        Self {
            normalizer,
            by_native: HashMap::new(),
            by_datatype: HashMap::new(),
        }
    }

    /// Creates a registry with every built-in handler loaded.
    pub fn with_builtins(normalizer: UriNormalizer) -> Self {
        let mut registry = Self::new(normalizer);
        registry.register_all();
        registry
    }

    /// Loads every built-in handler.
    ///
    /// Calling this more than once is harmless: re-registering the same
    /// handler for the same keys does not count as a collision.
    pub fn register_all(&mut self) {
        let builtins: [Arc<dyn DatatypeHandler>; 7] = [
            Arc::new(IntegerHandler),
            Arc::new(DecimalHandler),
            Arc::new(BooleanHandler),
            Arc::new(DateHandler),
            Arc::new(DateTimeHandler),
            Arc::new(StringHandler),
            Arc::new(UriHandler),
        ];
        for handler in builtins {
            self.register(handler);
        }
    }

    /// Registers a handler under its native type, its datatype and aliases.
    pub fn register(&mut self, handler: Arc<dyn DatatypeHandler>) {
        if let Some(previous) = self
            .by_native
            .insert(handler.native_type(), Arc::clone(&handler))
        {
            if previous.datatype() != handler.datatype() {
                tracing::warn!(
                    native_type = %handler.native_type(),
                    previous = previous.datatype(),
                    replacement = handler.datatype(),
                    "native type handler replaced"
                );
            }
        }

        let keys = std::iter::once(handler.datatype()).chain(handler.aliases().iter().copied());
        for key in keys {
            let expanded = self.normalizer.expand(key);
            if let Some(previous) = self
                .by_datatype
                .insert(expanded.clone(), Arc::clone(&handler))
            {
                if previous.native_type() != handler.native_type()
                    || previous.datatype() != handler.datatype()
                {
                    tracing::warn!(
                        datatype = %expanded,
                        previous = %previous.native_type(),
                        replacement = %handler.native_type(),
                        "datatype alias collision, last registration wins"
                    );
                }
            }
        }
    }

    /// Returns the handler for a native Rust type.
    pub fn for_native<T: NativeValue>(&self) -> MappingResult<&dyn DatatypeHandler> {
        self.for_native_type(T::NATIVE)
    }

    /// Returns the handler for a native type tag.
    pub fn for_native_type(&self, native: NativeType) -> MappingResult<&dyn DatatypeHandler> {
        self.by_native
            .get(&native)
            .map(|h| h.as_ref())
            .ok_or_else(|| MappingError::DeserializerNotFound {
                key: native.to_string(),
            })
    }

    /// Returns the handler for a datatype IRI, prefixed or expanded.
    pub fn for_datatype(&self, datatype: &str) -> MappingResult<&dyn DatatypeHandler> {
        let expanded = self.normalizer.expand(datatype);
        self.by_datatype
            .get(&expanded)
            .map(|h| h.as_ref())
            .ok_or(MappingError::DeserializerNotFound { key: expanded })
    }

    /// Returns true when a handler exists for the native type.
    pub fn has_native(&self, native: NativeType) -> bool {
        self.by_native.contains_key(&native)
    }

    /// Parses a lexical form with the handler of its datatype.
    pub fn parse_literal(&self, datatype: &str, lexical: &str) -> MappingResult<TypedLiteral> {
        self.for_datatype(datatype)?.parse(lexical)
    }

    /// Renders a value with the handler of its native type.
    pub fn to_term(&self, value: &TypedLiteral) -> MappingResult<Term> {
        self.for_native_type(value.native_type())?.to_term(value)
    }

    /// The normalizer used to expand datatype keys.
    pub fn normalizer(&self) -> &UriNormalizer {
        &self.normalizer
    }

    /// Number of datatype keys (primary and aliases).
    pub fn len(&self) -> usize {
        self.by_datatype.len()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.by_datatype.is_empty()
    }
}

impl std::fmt::Debug for DeserializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeserializerRegistry")
            .field("datatype_count", &self.by_datatype.len())
            .field("native_types", &self.by_native.keys().collect::<Vec<_>>())
            .finish()
    }
}
