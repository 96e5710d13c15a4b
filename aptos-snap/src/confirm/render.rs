//! Human-readable rendering of pending operations

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::account::AccountAddress;
use crate::transaction::{TransactionArgument, UnsignedTransaction};

/// The closed set of field kinds a dialog can show.
///
/// Bytes always render as `0x` hex and big integers as exact decimal
/// strings, so nothing reaches the display as raw binary or as a lossy
/// floating-point number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnField {
    Address(AccountAddress),
    Bytes(Vec<u8>),
    BigInt(u128),
    Text(String),
    Composite(Vec<(String, TxnField)>),
    List(Vec<TxnField>),
}

impl TxnField {
    pub fn composite<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, TxnField)>,
        K: Into<String>,
    {
        TxnField::Composite(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn to_value(&self) -> Value {
        match self {
            TxnField::Address(address) => Value::String(address.to_hex()),
            TxnField::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
            TxnField::BigInt(value) => Value::String(value.to_string()),
            TxnField::Text(text) => Value::String(text.clone()),
            TxnField::Composite(fields) => {
                let mut map = Map::new();
                for (key, field) in fields {
                    map.insert(key.clone(), field.to_value());
                }
                Value::Object(map)
            }
            TxnField::List(items) => Value::Array(items.iter().map(TxnField::to_value).collect()),
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            TxnField::Composite(fields) => {
                for (key, field) in fields {
                    match field {
                        TxnField::Composite(_) | TxnField::List(_) => {
                            writeln!(f, "{:indent$}{}:", "", key, indent = indent)?;
                            field.write_indented(f, indent + 2)?;
                        }
                        leaf => writeln!(f, "{:indent$}{}: {}", "", key, leaf.scalar(), indent = indent)?,
                    }
                }
                Ok(())
            }
            TxnField::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    match item {
                        TxnField::Composite(_) | TxnField::List(_) => {
                            writeln!(f, "{:indent$}[{}]", "", i, indent = indent)?;
                            item.write_indented(f, indent + 2)?;
                        }
                        leaf => writeln!(f, "{:indent$}- {}", "", leaf.scalar(), indent = indent)?,
                    }
                }
                Ok(())
            }
            leaf => writeln!(f, "{:indent$}{}", "", leaf.scalar(), indent = indent),
        }
    }

    fn scalar(&self) -> String {
        match self.to_value() {
            Value::String(text) => text,
            other => other.to_string(),
        }
    }
}

impl From<&TransactionArgument> for TxnField {
    fn from(argument: &TransactionArgument) -> Self {
        match argument {
            TransactionArgument::Address(address) => TxnField::Address(*address),
            TransactionArgument::U64(value) => TxnField::BigInt(u128::from(*value)),
        }
    }
}

impl UnsignedTransaction {
    /// Display tree of every transaction field
    pub fn to_field(&self) -> TxnField {
        TxnField::composite([
            ("sender", TxnField::Address(self.sender)),
            ("function", TxnField::Text(self.function.to_string())),
            (
                "functionArguments",
                TxnField::List(self.function_arguments.iter().map(TxnField::from).collect()),
            ),
            ("sequenceNumber", TxnField::BigInt(u128::from(self.sequence_number))),
            ("maxGasAmount", TxnField::BigInt(u128::from(self.max_gas_amount))),
            ("gasUnitPrice", TxnField::BigInt(u128::from(self.gas_unit_price))),
            (
                "expirationTimestampSecs",
                TxnField::BigInt(u128::from(self.expiration_timestamp_secs)),
            ),
            ("chainId", TxnField::BigInt(u128::from(self.chain_id))),
        ])
    }
}

/// What the confirmation dialog shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Renderable {
    pub heading: String,
    #[serde(serialize_with = "serialize_field")]
    pub body: TxnField,
}

fn serialize_field<S: serde::Serializer>(field: &TxnField, serializer: S) -> Result<S::Ok, S::Error> {
    field.to_value().serialize(serializer)
}

impl Renderable {
    pub fn new(heading: impl Into<String>, body: TxnField) -> Self {
        Self { heading: heading.into(), body }
    }

    pub fn text(heading: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(heading, TxnField::Text(text.into()))
    }

    pub fn transaction(heading: impl Into<String>, transaction: &UnsignedTransaction) -> Self {
        Self::new(heading, transaction.to_field())
    }
}

impl fmt::Display for Renderable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading)?;
        self.body.write_indented(f, 2)
    }
}
