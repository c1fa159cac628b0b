//! Recursive ABI type descriptors
//!
//! Type strings from an ABI document (`uint256`, `address[]`, `tuple[2][]`, ...)
//! are resolved once into an [`AbiType`] tree. Everything downstream works on
//! the tree, never on the raw strings.

use std::fmt;

use super::SchemaError;

/// Length of an array type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayLength {
    /// `T[N]`
    Fixed(usize),
    /// `T[]`
    Dynamic,
}

/// A named tuple component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    /// Component name (may be empty)
    pub name: String,
    pub ty: AbiType,
}

/// A fully resolved ABI type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// `uintN`, bit width
    Uint(usize),
    /// `intN`, bit width
    Int(usize),
    Address,
    Bool,
    /// `bytesN`, byte width
    FixedBytes(usize),
    /// Dynamic `bytes`
    Bytes,
    String,
    /// A type string this engine does not model (e.g. `fixed128x18`).
    /// Kept verbatim so encoding/decoding can still be attempted downstream.
    Opaque(String),
    Array {
        element: Box<AbiType>,
        length: ArrayLength,
    },
    Tuple(Vec<Component>),
}

impl AbiType {
    /// Resolve a type string, using `components` for `tuple` types.
    ///
    /// Array suffixes are stripped right to left, so `tuple[2][]` is a dynamic
    /// array of fixed arrays of the tuple.
    pub fn resolve(ty: &str, components: Option<&[Component]>) -> Result<Self, SchemaError> {
        let ty = ty.trim();
        if ty.is_empty() {
            return Err(SchemaError::MalformedAbi("empty type string".into()));
        }

        if let Some(stripped) = ty.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(|| {
                SchemaError::MalformedAbi(format!("unbalanced array suffix in `{ty}`"))
            })?;
            let size = &stripped[open + 1..];
            let length = if size.is_empty() {
                ArrayLength::Dynamic
            } else {
                let n = size.parse::<usize>().map_err(|_| {
                    SchemaError::MalformedAbi(format!("invalid array length `{size}` in `{ty}`"))
                })?;
                ArrayLength::Fixed(n)
            };
            let element = Self::resolve(&stripped[..open], components)?;
            return Ok(AbiType::Array {
                element: Box::new(element),
                length,
            });
        }

        if ty.starts_with("tuple") {
            let components = components.ok_or_else(|| {
                SchemaError::MalformedAbi(format!("`{ty}` parameter has no components"))
            })?;
            return Ok(AbiType::Tuple(components.to_vec()));
        }

        Ok(Self::elementary(ty))
    }

    fn elementary(ty: &str) -> Self {
        match ty {
            "address" => return AbiType::Address,
            "bool" => return AbiType::Bool,
            "string" => return AbiType::String,
            "bytes" => return AbiType::Bytes,
            "uint" => return AbiType::Uint(256),
            "int" => return AbiType::Int(256),
            _ => {}
        }

        if let Some(bits) = ty.strip_prefix("uint").and_then(parse_bit_width) {
            return AbiType::Uint(bits);
        }
        if let Some(bits) = ty.strip_prefix("int").and_then(parse_bit_width) {
            return AbiType::Int(bits);
        }
        if let Some(size) = ty
            .strip_prefix("bytes")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| (1..=32).contains(n))
        {
            return AbiType::FixedBytes(size);
        }

        AbiType::Opaque(ty.to_string())
    }

    /// Canonical type string as used in signatures: tuples are flattened to
    /// `(T1,T2)`, integer aliases carry their width.
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Uint(bits) => format!("uint{bits}"),
            AbiType::Int(bits) => format!("int{bits}"),
            AbiType::Address => "address".into(),
            AbiType::Bool => "bool".into(),
            AbiType::FixedBytes(size) => format!("bytes{size}"),
            AbiType::Bytes => "bytes".into(),
            AbiType::String => "string".into(),
            AbiType::Opaque(raw) => raw.clone(),
            AbiType::Array { element, length } => match length {
                ArrayLength::Fixed(n) => format!("{}[{n}]", element.canonical()),
                ArrayLength::Dynamic => format!("{}[]", element.canonical()),
            },
            AbiType::Tuple(components) => {
                let inner: Vec<String> = components.iter().map(|c| c.ty.canonical()).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    /// Arrays and tuples take JSON text as input
    pub fn is_compound(&self) -> bool {
        matches!(self, AbiType::Array { .. } | AbiType::Tuple(_))
    }

    /// Types whose indexed event topic holds a hash instead of the value
    pub fn is_hashed_in_topic(&self) -> bool {
        matches!(
            self,
            AbiType::Bytes | AbiType::String | AbiType::Array { .. } | AbiType::Tuple(_)
        )
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn parse_bit_width(suffix: &str) -> Option<usize> {
    suffix
        .parse::<usize>()
        .ok()
        .filter(|bits| *bits >= 8 && *bits <= 256 && bits % 8 == 0)
}

/// Name used for a positional parameter without a declared name
pub fn positional_name(name: &str, index: usize) -> String {
    if name.trim().is_empty() {
        format!("arg{index}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, ty: AbiType) -> Component {
        Component {
            name: name.into(),
            ty,
        }
    }

    #[test]
    fn test_elementary_types() {
        assert_eq!(AbiType::resolve("uint", None).unwrap(), AbiType::Uint(256));
        assert_eq!(AbiType::resolve("int8", None).unwrap(), AbiType::Int(8));
        assert_eq!(
            AbiType::resolve("bytes32", None).unwrap(),
            AbiType::FixedBytes(32)
        );
        assert_eq!(AbiType::resolve("bytes", None).unwrap(), AbiType::Bytes);
        assert_eq!(AbiType::resolve("address", None).unwrap(), AbiType::Address);
    }

    #[test]
    fn test_unknown_types_are_opaque() {
        assert_eq!(
            AbiType::resolve("fixed128x18", None).unwrap(),
            AbiType::Opaque("fixed128x18".into())
        );
        // Out-of-range widths are not silently rounded
        assert_eq!(
            AbiType::resolve("uint7", None).unwrap(),
            AbiType::Opaque("uint7".into())
        );
        assert_eq!(
            AbiType::resolve("bytes33", None).unwrap(),
            AbiType::Opaque("bytes33".into())
        );
    }

    #[test]
    fn test_nested_arrays() {
        let ty = AbiType::resolve("uint256[2][]", None).unwrap();
        let expected = AbiType::Array {
            element: Box::new(AbiType::Array {
                element: Box::new(AbiType::Uint(256)),
                length: ArrayLength::Fixed(2),
            }),
            length: ArrayLength::Dynamic,
        };
        assert_eq!(ty, expected);
        assert_eq!(ty.canonical(), "uint256[2][]");
    }

    #[test]
    fn test_tuple_array() {
        let components = vec![
            component("to", AbiType::Address),
            component("amount", AbiType::Uint(256)),
        ];
        let ty = AbiType::resolve("tuple[]", Some(&components)).unwrap();
        assert_eq!(ty.canonical(), "(address,uint256)[]");
        assert!(ty.is_compound());
    }

    #[test]
    fn test_tuple_without_components_fails() {
        let err = AbiType::resolve("tuple", None).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedAbi(_)));
    }

    #[test]
    fn test_bad_array_suffix_fails() {
        assert!(AbiType::resolve("uint256[x]", None).is_err());
        assert!(AbiType::resolve("uint256]", None).is_err());
    }

    #[test]
    fn test_positional_name() {
        assert_eq!(positional_name("", 2), "arg2");
        assert_eq!(positional_name("owner", 0), "owner");
    }
}
