use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ContractType
// ---------------------------------------------------------------------------

/// Opaque token naming a compiled artifact. The orchestrator never looks
/// inside it; the chain client resolves it to bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractType(String);

impl ContractType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A static ABI value, fully resolved and ready to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(U256),
    Bool(bool),
    Bytes32(B256),
}

impl Token {
    /// The canonical ABI type this token encodes as when no explicit
    /// signature says otherwise.
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Address(_) => ParamType::Address,
            Self::Uint(_) => ParamType::Uint(256),
            Self::Bool(_) => ParamType::Bool,
            Self::Bytes32(_) => ParamType::Bytes32,
        }
    }

    /// Parse a plan-file literal of the given kind.
    ///
    /// `uint` accepts decimal, `0x` hex, or `max` (2^256 - 1).
    pub fn parse(kind: &str, raw: &str) -> std::result::Result<Self, String> {
        let raw = raw.trim();
        match kind {
            "address" => Address::from_str(raw)
                .map(Self::Address)
                .map_err(|e| format!("invalid address '{raw}': {e}")),
            "uint" => {
                if raw.eq_ignore_ascii_case("max") {
                    return Ok(Self::Uint(U256::MAX));
                }
                U256::from_str(raw)
                    .map(Self::Uint)
                    .map_err(|e| format!("invalid uint '{raw}': {e}"))
            }
            "bool" => match raw {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(format!("invalid bool '{raw}': expected true or false")),
            },
            "bytes32" => B256::from_str(raw)
                .map(Self::Bytes32)
                .map_err(|e| format!("invalid bytes32 '{raw}': {e}")),
            other => Err(format!("unknown literal kind '{other}'")),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(a) => write!(f, "{a}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Bytes32(b) => write!(f, "{b}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Arg
// ---------------------------------------------------------------------------

/// A constructor or wiring argument: either a literal, or the address of
/// another unit once it has been deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Literal(Token),
    Ref(String),
}

impl Arg {
    pub fn unit(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    pub fn address(addr: Address) -> Self {
        Self::Literal(Token::Address(addr))
    }

    pub fn uint(value: impl Into<U256>) -> Self {
        Self::Literal(Token::Uint(value.into()))
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Ref(name) => Some(name),
            Self::Literal(_) => None,
        }
    }

    /// References always resolve to an address.
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Ref(_) => ParamType::Address,
            Self::Literal(t) => t.param_type(),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(t) => write!(f, "{t}"),
            Self::Ref(name) => write!(f, "@{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ParamType / MethodSig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    /// Bit width, a multiple of 8 in 8..=256.
    Uint(u16),
    Bool,
    Bytes32,
}

impl ParamType {
    pub fn accepts(&self, token: &Token) -> bool {
        match (self, token) {
            (Self::Address, Token::Address(_)) => true,
            (Self::Uint(bits), Token::Uint(v)) => v.bit_len() <= usize::from(*bits),
            (Self::Bool, Token::Bool(_)) => true,
            (Self::Bytes32, Token::Bytes32(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => f.write_str("address"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Bool => f.write_str("bool"),
            Self::Bytes32 => f.write_str("bytes32"),
        }
    }
}

impl FromStr for ParamType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "bytes32" => Ok(Self::Bytes32),
            "uint" => Ok(Self::Uint(256)),
            _ => {
                let bits = s
                    .strip_prefix("uint")
                    .and_then(|b| b.parse::<u16>().ok())
                    .filter(|b| *b >= 8 && *b <= 256 && b % 8 == 0)
                    .ok_or_else(|| format!("unsupported parameter type '{s}'"))?;
                Ok(Self::Uint(bits))
            }
        }
    }
}

/// A resolved contract method: name plus static parameter types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<ParamType>,
}

impl MethodSig {
    /// Parse `name(type,...)`. A bare `name` yields `params: None` so the
    /// caller can infer the parameter list from the arguments.
    pub fn parse(raw: &str) -> std::result::Result<(String, Option<Vec<ParamType>>), String> {
        let raw = raw.trim();
        let Some(open) = raw.find('(') else {
            check_ident(raw)?;
            return Ok((raw.to_string(), None));
        };
        let name = raw[..open].trim();
        check_ident(name)?;
        let inner = raw[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| format!("missing closing parenthesis in '{raw}'"))?;
        let params = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner
                .split(',')
                .map(|p| p.trim().parse::<ParamType>())
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok((name.to_string(), Some(params)))
    }

    /// Build the signature for `raw` against concrete arguments, inferring
    /// parameter types for bare method names.
    pub fn resolve(raw: &str, args: &[Arg]) -> std::result::Result<Self, String> {
        let (name, params) = Self::parse(raw)?;
        let params = params.unwrap_or_else(|| args.iter().map(Arg::param_type).collect());
        Ok(Self { name, params })
    }

    /// Canonical form used for the 4-byte selector, e.g. `setManager(address)`.
    pub fn canonical(&self) -> String {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        format!("{}({})", self.name, params.join(","))
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn check_ident(name: &str) -> std::result::Result<(), String> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        Ok(())
    } else {
        Err(format!("invalid method name '{name}'"))
    }
}
