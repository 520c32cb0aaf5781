//! Native Signatures
//!
//! C-level types and function signatures used to marshal foreign values to
//! and from machine words.

use std::fmt;

use crate::interop::Arity;

/// Native parameter and return types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    /// Void (no value)
    Void,
    /// C `bool`
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Pointer (usize, platform-dependent)
    Ptr,
    /// Null-terminated C string (const char*)
    CStr,
}

impl NativeType {
    /// Get the size in bytes of this type
    pub fn size(&self) -> usize {
        match self {
            NativeType::Void => 0,
            NativeType::Bool | NativeType::U8 | NativeType::I8 => 1,
            NativeType::U16 | NativeType::I16 => 2,
            NativeType::U32 | NativeType::I32 | NativeType::F32 => 4,
            NativeType::U64 | NativeType::I64 | NativeType::F64 => 8,
            NativeType::Ptr | NativeType::CStr => std::mem::size_of::<usize>(),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            NativeType::U8
                | NativeType::U16
                | NativeType::U32
                | NativeType::U64
                | NativeType::I8
                | NativeType::I16
                | NativeType::I32
                | NativeType::I64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, NativeType::F32 | NativeType::F64)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, NativeType::Ptr | NativeType::CStr)
    }

    /// Parse from a C-ish type name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "void" => Some(NativeType::Void),
            "bool" | "_bool" => Some(NativeType::Bool),
            "u8" | "uint8" | "uint8_t" | "byte" => Some(NativeType::U8),
            "u16" | "uint16" | "uint16_t" => Some(NativeType::U16),
            "u32" | "uint32" | "uint32_t" | "unsigned" => Some(NativeType::U32),
            "u64" | "uint64" | "uint64_t" | "ulong" | "size_t" => Some(NativeType::U64),
            "i8" | "int8" | "int8_t" | "char" => Some(NativeType::I8),
            "i16" | "int16" | "int16_t" | "short" => Some(NativeType::I16),
            "i32" | "int32" | "int32_t" | "int" => Some(NativeType::I32),
            "i64" | "int64" | "int64_t" | "long" => Some(NativeType::I64),
            "f32" | "float" => Some(NativeType::F32),
            "f64" | "double" => Some(NativeType::F64),
            "ptr" | "pointer" | "void*" => Some(NativeType::Ptr),
            "cstr" | "string" | "char*" | "const char*" => Some(NativeType::CStr),
            _ => None,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeType::Void => "void",
            NativeType::Bool => "bool",
            NativeType::U8 => "u8",
            NativeType::U16 => "u16",
            NativeType::U32 => "u32",
            NativeType::U64 => "u64",
            NativeType::I8 => "i8",
            NativeType::I16 => "i16",
            NativeType::I32 => "i32",
            NativeType::I64 => "i64",
            NativeType::F32 => "f32",
            NativeType::F64 => "f64",
            NativeType::Ptr => "ptr",
            NativeType::CStr => "cstr",
        };
        f.write_str(name)
    }
}

/// Function signature for native calls
#[derive(Debug, Clone, PartialEq)]
pub struct NativeSignature {
    /// Symbol name
    pub name: String,
    /// Parameter types
    pub params: Vec<NativeType>,
    /// Return type
    pub return_type: NativeType,
    /// Whether this function is variadic
    pub variadic: bool,
}

impl NativeSignature {
    pub fn new(name: impl Into<String>, params: Vec<NativeType>, return_type: NativeType) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            variadic: false,
        }
    }

    pub fn variadic(
        name: impl Into<String>,
        params: Vec<NativeType>,
        return_type: NativeType,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            variadic: true,
        }
    }

    /// Arity hint reported to the bridge
    pub fn arity(&self) -> Arity {
        if self.variadic {
            Arity::AtLeast(self.params.len())
        } else {
            Arity::Exact(self.params.len())
        }
    }

    /// Parse from a C-style signature string.
    ///
    /// Format: `"return_type name(param_type [name], ...)"`. Pointer stars
    /// may be attached to either the type or the parameter name.
    pub fn parse(signature: &str) -> Option<Self> {
        let signature = signature.trim().trim_end_matches(';');

        let paren_pos = signature.find('(')?;
        let close_pos = signature.rfind(')')?;
        if close_pos < paren_pos {
            return None;
        }
        let before_paren = signature[..paren_pos].trim();
        let inside = signature[paren_pos + 1..close_pos].trim();

        let (return_type, name) = split_declaration(before_paren)?;

        let mut params = Vec::new();
        let mut variadic = false;

        if !inside.is_empty() && inside != "void" {
            for param in inside.split(',') {
                let param = param.trim();
                if param == "..." {
                    variadic = true;
                    continue;
                }
                if param.is_empty() {
                    return None;
                }
                params.push(parse_param_type(param)?);
            }
        }

        Some(Self {
            name,
            params,
            return_type,
            variadic,
        })
    }
}

/// Split `"const char* name"` into its type and name
fn split_declaration(decl: &str) -> Option<(NativeType, String)> {
    let stars = decl.matches('*').count();
    let cleaned = decl.replace('*', " ");
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    let name = words.pop()?.to_string();
    let ty = resolve_type(&words, stars)?;
    Some((ty, name))
}

/// Parse a parameter, with or without a name
fn parse_param_type(param: &str) -> Option<NativeType> {
    let stars = param.matches('*').count();
    let cleaned = param.replace('*', " ");
    let words: Vec<&str> = cleaned.split_whitespace().collect();

    // A lone word or a fully typed word list without a name
    if let Some(ty) = resolve_type(&words, stars) {
        return Some(ty);
    }
    let (_, type_words) = words.split_last()?;
    resolve_type(type_words, stars)
}

fn resolve_type(words: &[&str], stars: usize) -> Option<NativeType> {
    let unsigned = words.contains(&"unsigned");
    let base: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| *w != "const" && *w != "unsigned")
        .collect();

    let ty = match (base.as_slice(), stars) {
        ([], 0) if unsigned => NativeType::U32,
        ([b], 1) if b.eq_ignore_ascii_case("char") => NativeType::CStr,
        ([_], n) if n > 0 => NativeType::Ptr,
        ([b], 0) => NativeType::from_str(b)?,
        _ => return None,
    };

    if !unsigned {
        return Some(ty);
    }
    Some(match ty {
        NativeType::I8 => NativeType::U8,
        NativeType::I16 => NativeType::U16,
        NativeType::I32 => NativeType::U32,
        NativeType::I64 => NativeType::U64,
        other => other,
    })
}

impl fmt::Display for NativeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        if self.variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}
