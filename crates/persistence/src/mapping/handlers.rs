//! Built-in datatype handlers.
//!
//! Each handler binds one native Rust type to one primary XSD datatype plus
//! any aliases, parses lexical forms coming back from the graph store and
//! renders typed values as SPARQL terms.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::{MappingError, MappingResult};
use crate::sparql::Term;
use crate::uri::Uri;
use crate::vocabulary::xsd;

/// Native representations a datatype can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    String,
    Uri,
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeType::Integer => "i64",
            NativeType::Decimal => "f64",
            NativeType::Boolean => "bool",
            NativeType::Date => "NaiveDate",
            NativeType::DateTime => "DateTime<FixedOffset>",
            NativeType::String => "String",
            NativeType::Uri => "Uri",
        };
        f.write_str(name)
    }
}

/// A literal value parsed from the graph store.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedLiteral {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    String(String),
    Uri(Uri),
}

impl TypedLiteral {
    /// The native type this literal carries.
    pub fn native_type(&self) -> NativeType {
        match self {
            TypedLiteral::Integer(_) => NativeType::Integer,
            TypedLiteral::Decimal(_) => NativeType::Decimal,
            TypedLiteral::Boolean(_) => NativeType::Boolean,
            TypedLiteral::Date(_) => NativeType::Date,
            TypedLiteral::DateTime(_) => NativeType::DateTime,
            TypedLiteral::String(_) => NativeType::String,
            TypedLiteral::Uri(_) => NativeType::Uri,
        }
    }

    /// The canonical lexical form.
    pub fn lexical(&self) -> String {
        match self {
            TypedLiteral::Integer(v) => v.to_string(),
            TypedLiteral::Decimal(v) => v.to_string(),
            TypedLiteral::Boolean(v) => v.to_string(),
            TypedLiteral::Date(v) => v.format("%Y-%m-%d").to_string(),
            TypedLiteral::DateTime(v) => v.to_rfc3339(),
            TypedLiteral::String(v) => v.clone(),
            TypedLiteral::Uri(v) => v.to_string(),
        }
    }
}

/// A Rust type with a registered datatype mapping.
pub trait NativeValue: Sized + 'static {
    /// The native type tag used for registry lookups.
    const NATIVE: NativeType;

    /// Extracts the value from a literal of the matching kind.
    fn from_literal(literal: TypedLiteral) -> Option<Self>;

    /// Wraps the value into a literal.
    fn into_literal(self) -> TypedLiteral;
}

macro_rules! native_value {
    ($ty:ty, $variant:ident) => {
        impl NativeValue for $ty {
            const NATIVE: NativeType = NativeType::$variant;

            fn from_literal(literal: TypedLiteral) -> Option<Self> {
                match literal {
                    TypedLiteral::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_literal(self) -> TypedLiteral {
                TypedLiteral::$variant(self)
            }
        }
    };
}

native_value!(i64, Integer);
native_value!(f64, Decimal);
native_value!(bool, Boolean);
native_value!(NaiveDate, Date);
native_value!(DateTime<FixedOffset>, DateTime);
native_value!(String, String);
native_value!(Uri, Uri);

/// Converts between a datatype's lexical space and a native value.
pub trait DatatypeHandler: Send + Sync + fmt::Debug {
    /// The native type produced by [`DatatypeHandler::parse`].
    fn native_type(&self) -> NativeType;

    /// The primary datatype IRI, expanded.
    fn datatype(&self) -> &'static str;

    /// Additional datatype IRIs parsed by this handler.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Parses a lexical form.
    fn parse(&self, lexical: &str) -> MappingResult<TypedLiteral>;

    /// Renders a value as a SPARQL term.
    fn to_term(&self, value: &TypedLiteral) -> MappingResult<Term> {
        if value.native_type() != self.native_type() {
            return Err(MappingError::InvalidLiteral {
                datatype: self.datatype().to_string(),
                lexical: value.lexical(),
            });
        }
        Ok(Term::typed(value.lexical(), self.datatype()))
    }
}

fn invalid(datatype: &str, lexical: &str) -> MappingError {
    MappingError::InvalidLiteral {
        datatype: datatype.to_string(),
        lexical: lexical.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct IntegerHandler;

impl DatatypeHandler for IntegerHandler {
    fn native_type(&self) -> NativeType {
        NativeType::Integer
    }

    fn datatype(&self) -> &'static str {
        xsd::INTEGER
    }

    fn aliases(&self) -> &'static [&'static str] {
        &[xsd::INT, xsd::LONG, xsd::SHORT, xsd::NON_NEGATIVE_INTEGER]
    }

    fn parse(&self, lexical: &str) -> MappingResult<TypedLiteral> {
        lexical
            .trim()
            .parse::<i64>()
            .map(TypedLiteral::Integer)
            .map_err(|_| invalid(self.datatype(), lexical))
    }
}

#[derive(Debug, Default)]
pub struct DecimalHandler;

impl DatatypeHandler for DecimalHandler {
    fn native_type(&self) -> NativeType {
        NativeType::Decimal
    }

    fn datatype(&self) -> &'static str {
        xsd::DECIMAL
    }

    fn aliases(&self) -> &'static [&'static str] {
        &[xsd::DOUBLE, xsd::FLOAT]
    }

    fn parse(&self, lexical: &str) -> MappingResult<TypedLiteral> {
        lexical
            .trim()
            .parse::<f64>()
            .map(TypedLiteral::Decimal)
            .map_err(|_| invalid(self.datatype(), lexical))
    }
}

#[derive(Debug, Default)]
pub struct BooleanHandler;

impl DatatypeHandler for BooleanHandler {
    fn native_type(&self) -> NativeType {
        NativeType::Boolean
    }

    fn datatype(&self) -> &'static str {
        xsd::BOOLEAN
    }

    fn parse(&self, lexical: &str) -> MappingResult<TypedLiteral> {
        match lexical.trim() {
            "true" | "1" => Ok(TypedLiteral::Boolean(true)),
            "false" | "0" => Ok(TypedLiteral::Boolean(false)),
            _ => Err(invalid(self.datatype(), lexical)),
        }
    }
}

#[derive(Debug, Default)]
pub struct DateHandler;

impl DatatypeHandler for DateHandler {
    fn native_type(&self) -> NativeType {
        NativeType::Date
    }

    fn datatype(&self) -> &'static str {
        xsd::DATE
    }

    fn parse(&self, lexical: &str) -> MappingResult<TypedLiteral> {
        let trimmed = lexical.trim();
        // xsd:date may carry a timezone suffix ("2020-01-01Z", "2020-01-01+02:00")
        let date_part = trimmed.get(..10).unwrap_or(trimmed);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map(TypedLiteral::Date)
            .map_err(|_| invalid(self.datatype(), lexical))
    }
}

#[derive(Debug, Default)]
pub struct DateTimeHandler;

impl DatatypeHandler for DateTimeHandler {
    fn native_type(&self) -> NativeType {
        NativeType::DateTime
    }

    fn datatype(&self) -> &'static str {
        xsd::DATE_TIME
    }

    fn parse(&self, lexical: &str) -> MappingResult<TypedLiteral> {
        let trimmed = lexical.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(TypedLiteral::DateTime(dt));
        }
        // no offset means UTC
        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| TypedLiteral::DateTime(naive.and_utc().fixed_offset()))
            .map_err(|_| invalid(self.datatype(), lexical))
    }
}

#[derive(Debug, Default)]
pub struct StringHandler;

impl DatatypeHandler for StringHandler {
    fn native_type(&self) -> NativeType {
        NativeType::String
    }

    fn datatype(&self) -> &'static str {
        xsd::STRING
    }

    fn parse(&self, lexical: &str) -> MappingResult<TypedLiteral> {
        Ok(TypedLiteral::String(lexical.to_string()))
    }

    fn to_term(&self, value: &TypedLiteral) -> MappingResult<Term> {
        match value {
            TypedLiteral::String(s) => Ok(Term::plain(s.clone())),
            other => Err(invalid(self.datatype(), &other.lexical())),
        }
    }
}

#[derive(Debug, Default)]
pub struct UriHandler;

impl DatatypeHandler for UriHandler {
    fn native_type(&self) -> NativeType {
        NativeType::Uri
    }

    fn datatype(&self) -> &'static str {
        xsd::ANY_URI
    }

    fn parse(&self, lexical: &str) -> MappingResult<TypedLiteral> {
        Uri::parse(lexical)
            .map(TypedLiteral::Uri)
            .map_err(|_| invalid(self.datatype(), lexical))
    }

    fn to_term(&self, value: &TypedLiteral) -> MappingResult<Term> {
        match value {
            TypedLiteral::Uri(uri) => Ok(Term::iri(uri.as_str())),
            other => Err(invalid(self.datatype(), &other.lexical())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_parse() {
        let handler = IntegerHandler;
        assert_eq!(handler.parse(" 42 ").unwrap(), TypedLiteral::Integer(42));
        assert!(handler.parse("4.2").is_err());
    }

    #[test]
    fn test_boolean_lexical_forms() {
        let handler = BooleanHandler;
        assert_eq!(handler.parse("1").unwrap(), TypedLiteral::Boolean(true));
        assert_eq!(handler.parse("false").unwrap(), TypedLiteral::Boolean(false));
        assert!(handler.parse("yes").is_err());
    }

    #[test]
    fn test_date_with_timezone_suffix() {
        let handler = DateHandler;
        let expected = TypedLiteral::Date(NaiveDate::from_ymd_opt(2020, 4, 1).unwrap());
        assert_eq!(handler.parse("2020-04-01").unwrap(), expected);
        assert_eq!(handler.parse("2020-04-01Z").unwrap(), expected);
    }

    #[test]
    fn test_datetime_without_offset_is_utc() {
        let handler = DateTimeHandler;
        let TypedLiteral::DateTime(dt) = handler.parse("2020-04-01T10:00:00").unwrap() else {
            panic!("expected a datetime");
        };
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert!(handler.parse("2020-04-01T10:00:00+02:00").is_ok());
    }

    #[test]
    fn test_to_term_rejects_wrong_kind() {
        let handler = IntegerHandler;
        assert!(handler.to_term(&TypedLiteral::Boolean(true)).is_err());
        assert_eq!(
            handler.to_term(&TypedLiteral::Integer(7)).unwrap().to_sparql(),
            format!("\"7\"^^<{}>", xsd::INTEGER)
        );
    }

    #[test]
    fn test_uri_renders_as_iri() {
        let uri = Uri::parse("http://ex.org/a").unwrap();
        let term = UriHandler.to_term(&TypedLiteral::Uri(uri)).unwrap();
        assert_eq!(term.to_sparql(), "<http://ex.org/a>");
    }

    #[test]
    fn test_native_value_roundtrip() {
        assert_eq!(i64::from_literal(TypedLiteral::Integer(3)), Some(3));
        assert_eq!(i64::from_literal(TypedLiteral::Decimal(3.0)), None);
        assert_eq!(true.into_literal(), TypedLiteral::Boolean(true));
    }
}
