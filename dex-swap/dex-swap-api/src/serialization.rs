//! Serde `with` modules for the JSON that swap results and quotes are printed
//! and exchanged as
//!
//! Atomic amounts travel as base-10 strings so that 256-bit values survive
//! JSON number parsing

/// Token and wallet addresses, as the aggregator's lowercase hex form
pub(crate) mod address_string_serialization {
    use std::str::FromStr;

    use alloy_primitives::Address;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Write the address as lowercase `0x` hex
    pub fn serialize<S: Serializer>(address: &Address, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{address:#x}"))
    }

    /// Read an address in any hex casing, checksummed or not
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Address, D::Error> {
        let s = String::deserialize(d)?;
        Address::from_str(&s).map_err(|_| D::Error::custom("Invalid address"))
    }
}

/// Atomic token amounts, as base-10 strings like the aggregator's `amount` and
/// `toTokenAmount` fields
pub(crate) mod u256_string_serialization {
    use alloy_primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Write the amount in base 10
    pub fn serialize<S: Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    /// Read a base-10 amount; hex is rejected
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let s = String::deserialize(d)?;
        U256::from_str_radix(&s, 10).map_err(|_| D::Error::custom("Invalid U256 value"))
    }
}

/// Transaction calldata, as `0x` hex
pub(crate) mod bytes_string_serialization {
    use std::str::FromStr;

    use alloy_primitives::Bytes;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Write the calldata with its `0x` prefix
    pub fn serialize<S: Serializer>(value: &Bytes, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    /// Read calldata, with or without its `0x` prefix
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(d)?;
        Bytes::from_str(&s).map_err(|_| D::Error::custom("Invalid bytes value"))
    }
}
