//! Unsigned transaction parameters as handed out by swap quote services

use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw transaction parameters before normalization against chain state.
///
/// Quote services return quantities as decimal strings (`"59480"`), as JSON
/// numbers (`42220`) or as `0x` hex; all three are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U256>,
}

/// Parse a quantity written either in decimal or as `0x` hex
pub fn parse_quantity(input: &str) -> Result<U256, String> {
    let input = input.trim();
    if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        U256::from_str_radix(hex, 16).map_err(|e| format!("invalid hex quantity {}: {:?}", input, e))
    } else {
        U256::from_dec_str(input).map_err(|e| format!("invalid quantity {}: {:?}", input, e))
    }
}

mod quantity {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Number(u64),
        Text(String),
    }

    pub fn serialize<S>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Quantity>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Quantity::Number(n)) => Ok(Some(U256::from(n))),
            Some(Quantity::Text(s)) if s.is_empty() => Ok(None),
            Some(Quantity::Text(s)) => parse_quantity(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_mixed_quantity_formats() {
        let raw: RawTransaction = serde_json::from_str(
            r#"{
                "to": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
                "data": "0x095ea7b3",
                "gas": "59480",
                "gasPrice": "0x1dcd6500",
                "value": "0",
                "chainId": 42220
            }"#,
        )
        .unwrap();

        assert_eq!(raw.gas, Some(U256::from(59_480u64)));
        assert_eq!(raw.gas_price, Some(U256::from(500_000_000u64)));
        assert_eq!(raw.value, Some(U256::zero()));
        assert_eq!(raw.chain_id, Some(U256::from(42_220u64)));
        assert_eq!(raw.nonce, None);
        assert_eq!(raw.data.unwrap().to_vec(), vec![0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn test_null_and_empty_quantities_are_absent() {
        let raw: RawTransaction = serde_json::from_str(r#"{"gas": null, "value": ""}"#).unwrap();
        assert_eq!(raw.gas, None);
        assert_eq!(raw.value, None);
    }

    #[test]
    fn test_rejects_garbage_quantity() {
        let result: Result<RawTransaction, _> = serde_json::from_str(r#"{"gas": "lots"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serializes_quantities_as_decimal() {
        let raw = RawTransaction {
            gas: Some(U256::from(460_533u64)),
            ..Default::default()
        };
        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json, serde_json::json!({ "gas": "460533" }));
    }
}
