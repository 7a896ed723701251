//! ABI parsing and constructor encoding
//!
//! Provides the [`Abi`] struct for access to a contract's constructor and the
//! encoding of resolved constructor arguments into deployment calldata.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::json_abi::{JsonAbi, Param};
use alloy::primitives::{Address, Bytes, FixedBytes, I256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ArgValue, ResolvedArg};

// =============================================================================
// Abi Struct
// =============================================================================

/// Wrapper around alloy's JsonAbi
#[derive(Debug, Clone, Default)]
pub struct Abi(JsonAbi);

impl Abi {
    /// Parse a JSON ABI string into an Abi struct
    pub fn parse(json: &str) -> Result<Self> {
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|e| Error::Abi(format!("Failed to parse ABI: {}", e)))?;
        Ok(Self(abi))
    }

    /// Parse from a serde_json::Value
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let abi: JsonAbi = serde_json::from_value(value.clone())
            .map_err(|e| Error::Abi(format!("Failed to parse ABI: {}", e)))?;
        Ok(Self(abi))
    }

    /// Get constructor information if present
    pub fn constructor(&self) -> Option<ConstructorInfo> {
        self.0.constructor.as_ref().map(|c| ConstructorInfo {
            inputs: c.inputs.iter().map(ParamInfo::from_abi_param).collect(),
        })
    }

    /// Number of constructor arguments the contract expects
    pub fn constructor_arity(&self) -> usize {
        self.0
            .constructor
            .as_ref()
            .map_or(0, |c| c.inputs.len())
    }

    /// Check that `count` arguments can be bound to the constructor
    pub fn check_arity(&self, count: usize) -> Result<()> {
        let expected = self.constructor_arity();
        if expected != count {
            return Err(Error::InvalidArgument(format!(
                "Expected {} constructor arguments, got {}",
                expected, count
            )));
        }
        Ok(())
    }

    /// Check unresolved arguments against the constructor before anything is
    /// deployed: literals must convert to their parameter type and references
    /// may only fill `address` parameters
    pub fn check_args(&self, args: &[ArgValue]) -> Result<()> {
        self.check_arity(args.len())?;

        let Some(constructor) = self.constructor() else {
            return Ok(());
        };

        for (i, (input, arg)) in constructor.inputs.iter().zip(args).enumerate() {
            let checked = match arg {
                ArgValue::Literal(value) => json_to_sol_value(&input.param_type, value).map(drop),
                ArgValue::Reference { .. } => check_handle_param(&input.param_type),
            };
            checked.map_err(|e| {
                Error::InvalidArgument(format!("Argument {} ({}): {}", i, input.name, e))
            })?;
        }

        Ok(())
    }

    /// ABI-encode resolved constructor arguments
    pub fn encode_constructor_args(&self, args: &[ResolvedArg]) -> Result<Vec<u8>> {
        self.check_arity(args.len())?;

        let Some(constructor) = self.constructor() else {
            return Ok(Vec::new());
        };

        let mut sol_values = Vec::with_capacity(args.len());
        for (i, (input, arg)) in constructor.inputs.iter().zip(args).enumerate() {
            let sol_value = resolved_to_sol_value(&input.param_type, arg).map_err(|e| {
                Error::InvalidArgument(format!("Argument {} ({}): {}", i, input.name, e))
            })?;
            sol_values.push(sol_value);
        }

        Ok(DynSolValue::Tuple(sol_values).abi_encode_params())
    }
}

// =============================================================================
// Constructor Types
// =============================================================================

/// Constructor information extracted from ABI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructorInfo {
    pub inputs: Vec<ParamInfo>,
}

/// Information about a constructor parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub param_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ParamInfo>>,
}

impl ParamInfo {
    /// Create ParamInfo from an alloy Param
    pub fn from_abi_param(param: &Param) -> Self {
        Self {
            name: param.name.clone(),
            param_type: param.ty.to_string(),
            components: if param.components.is_empty() {
                None
            } else {
                Some(param.components.iter().map(Self::from_abi_param).collect())
            },
        }
    }
}

// =============================================================================
// Value Conversion
// =============================================================================

fn check_handle_param(type_str: &str) -> std::result::Result<(), String> {
    match type_str {
        "address" => Ok(()),
        other => Err(format!("Reference bound to non-address parameter '{}'", other)),
    }
}

fn resolved_to_sol_value(type_str: &str, arg: &ResolvedArg) -> std::result::Result<DynSolValue, String> {
    match arg {
        ResolvedArg::Handle(address) => {
            check_handle_param(type_str)?;
            Ok(DynSolValue::Address(*address))
        }
        ResolvedArg::Literal(value) => json_to_sol_value(type_str, value),
    }
}

/// Convert a JSON literal to a Solidity value of the given type
fn json_to_sol_value(
    type_str: &str,
    value: &serde_json::Value,
) -> std::result::Result<DynSolValue, String> {
    let sol_type: DynSolType = type_str
        .parse()
        .map_err(|e| format!("Unknown type '{}': {}", type_str, e))?;

    match sol_type {
        DynSolType::Address => {
            let addr_str = value.as_str().ok_or("Expected string for address")?;
            let addr: Address = addr_str
                .parse()
                .map_err(|e| format!("Invalid address '{}': {}", addr_str, e))?;
            Ok(DynSolValue::Address(addr))
        }
        DynSolType::Bool => {
            let b = value.as_bool().ok_or("Expected boolean")?;
            Ok(DynSolValue::Bool(b))
        }
        DynSolType::Uint(bits) => {
            let n = parse_uint(value)?;
            Ok(DynSolValue::Uint(n, bits))
        }
        DynSolType::Int(bits) => {
            let n = parse_int(value)?;
            Ok(DynSolValue::Int(n, bits))
        }
        DynSolType::Bytes => {
            let hex_str = value.as_str().ok_or("Expected hex string for bytes")?;
            let bytes: Bytes = hex_str.parse().map_err(|e| format!("Invalid hex: {}", e))?;
            Ok(DynSolValue::Bytes(bytes.to_vec()))
        }
        DynSolType::String => {
            let s = value.as_str().ok_or("Expected string")?;
            Ok(DynSolValue::String(s.to_string()))
        }
        DynSolType::FixedBytes(size) => {
            let hex_str = value.as_str().ok_or("Expected hex string")?;
            let bytes: Bytes = hex_str.parse().map_err(|e| format!("Invalid hex: {}", e))?;
            if bytes.len() != size {
                return Err(format!("Expected {} bytes, got {}", size, bytes.len()));
            }
            let mut word = FixedBytes::<32>::ZERO;
            word[..size].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(word, size))
        }
        DynSolType::Array(inner) => {
            let arr = value.as_array().ok_or("Expected array")?;
            let inner_str = inner.to_string();
            let values: std::result::Result<Vec<_>, _> = arr
                .iter()
                .map(|v| json_to_sol_value(&inner_str, v))
                .collect();
            Ok(DynSolValue::Array(values?))
        }
        _ => Err(format!("Unsupported type: {}", type_str)),
    }
}

/// Parse an unsigned integer from a JSON number or decimal/hex string
fn parse_uint(value: &serde_json::Value) -> std::result::Result<U256, String> {
    match value {
        serde_json::Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(u), _) => Ok(U256::from(u)),
            (None, Some(_)) => Err("Negative number not allowed for uint".to_string()),
            _ => Err("Number too large, pass it as a string".to_string()),
        },
        serde_json::Value::String(s) => s
            .parse::<U256>()
            .map_err(|e| format!("Invalid uint: {}", e)),
        _ => Err("Expected number or string for uint".to_string()),
    }
}

/// Parse a signed integer from a JSON number or string
fn parse_int(value: &serde_json::Value) -> std::result::Result<I256, String> {
    match value {
        serde_json::Value::Number(n) => {
            let i = n.as_i64().ok_or("Number out of range")?;
            I256::try_from(i).map_err(|e| format!("Invalid int: {}", e))
        }
        serde_json::Value::String(s) => s
            .parse::<I256>()
            .map_err(|e| format!("Invalid int: {}", e)),
        _ => Err("Expected number or string for int".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const IDENTITY_ABI: &str = r#"[
        {
            "type": "constructor",
            "inputs": [
                {"name": "token", "type": "address"},
                {"name": "fee", "type": "uint256"}
            ],
            "stateMutability": "nonpayable"
        },
        {
            "type": "function",
            "name": "token",
            "inputs": [],
            "outputs": [{"name": "", "type": "address"}],
            "stateMutability": "view"
        }
    ]"#;

    fn token_address() -> Address {
        "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap()
    }

    #[test]
    fn test_constructor() {
        let abi = Abi::parse(IDENTITY_ABI).unwrap();
        let constructor = abi.constructor().unwrap();

        assert_eq!(constructor.inputs.len(), 2);
        assert_eq!(constructor.inputs[0].name, "token");
        assert_eq!(constructor.inputs[0].param_type, "address");
        assert_eq!(constructor.inputs[1].param_type, "uint256");
        assert_eq!(abi.constructor_arity(), 2);
    }

    #[test]
    fn test_no_constructor_has_zero_arity() {
        let abi = Abi::parse("[]").unwrap();
        assert_eq!(abi.constructor_arity(), 0);
        assert!(abi.encode_constructor_args(&[]).unwrap().is_empty());
        assert!(abi
            .encode_constructor_args(&[ResolvedArg::Literal(json!(1))])
            .is_err());
    }

    #[test]
    fn test_encode_handle_and_literal() {
        let abi = Abi::parse(IDENTITY_ABI).unwrap();
        let encoded = abi
            .encode_constructor_args(&[
                ResolvedArg::Handle(token_address()),
                ResolvedArg::Literal(json!(1000)),
            ])
            .unwrap();

        assert_eq!(encoded.len(), 64);
        assert_eq!(&encoded[12..32], token_address().as_slice());
        assert_eq!(U256::from_be_slice(&encoded[32..64]), U256::from(1000));
    }

    #[test]
    fn test_encode_arity_mismatch() {
        let abi = Abi::parse(IDENTITY_ABI).unwrap();
        let err = abi
            .encode_constructor_args(&[ResolvedArg::Handle(token_address())])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_handle_bound_to_uint_is_rejected() {
        let abi = Abi::parse(IDENTITY_ABI).unwrap();
        let err = abi
            .encode_constructor_args(&[
                ResolvedArg::Handle(token_address()),
                ResolvedArg::Handle(token_address()),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("non-address"));
    }

    #[test]
    fn test_check_args() {
        let abi = Abi::parse(IDENTITY_ABI).unwrap();

        assert!(abi
            .check_args(&[ArgValue::reference("Token"), ArgValue::literal(1000)])
            .is_ok());

        let err = abi
            .check_args(&[ArgValue::reference("Token"), ArgValue::literal("one thousand")])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("fee"));

        let err = abi
            .check_args(&[ArgValue::reference("Token"), ArgValue::reference("Token")])
            .unwrap_err();
        assert!(err.to_string().contains("non-address"));

        assert!(abi.check_args(&[ArgValue::reference("Token")]).is_err());
    }

    #[test]
    fn test_parse_uint() {
        assert_eq!(parse_uint(&json!(1000)).unwrap(), U256::from(1000));
        assert_eq!(
            parse_uint(&json!("1000000000000000000000")).unwrap(),
            U256::from(10u64).pow(U256::from(21))
        );
        assert!(parse_uint(&json!(-1)).is_err());
        assert!(parse_uint(&json!(true)).is_err());
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(&json!(-5)).unwrap(), I256::try_from(-5i64).unwrap());
        assert!(parse_int(&json!(false)).is_err());
    }

    #[test]
    fn test_json_to_sol_fixed_bytes() {
        let value = json_to_sol_value("bytes4", &json!("0xdeadbeef")).unwrap();
        match value {
            DynSolValue::FixedBytes(word, size) => {
                assert_eq!(size, 4);
                assert_eq!(&word[..4], &[0xde, 0xad, 0xbe, 0xef]);
            }
            other => panic!("unexpected value: {:?}", other),
        }
        assert!(json_to_sol_value("bytes4", &json!("0xdead")).is_err());
    }
}
