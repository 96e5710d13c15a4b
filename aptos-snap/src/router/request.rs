//! Typed requests parsed from `(method, params)`

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::confirm::TxnField;
use crate::crypto::path::DerivationPath;
use crate::error::{Error, Result};
use crate::transaction::{parse_amount, TransferRequest};

/// Every method the router answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GetAccountAddress,
    GetPublicKey,
    GetPrivateKey,
    GetAccounts,
    GetBalance,
    CreateNewAccount,
    SignMessage,
    SignAllMessages,
    SignTransaction,
    SignAndSendTransaction,
    SetData,
    GetData,
    ClearData,
}

impl Method {
    pub const ALL: [Method; 13] = [
        Method::GetAccountAddress,
        Method::GetPublicKey,
        Method::GetPrivateKey,
        Method::GetAccounts,
        Method::GetBalance,
        Method::CreateNewAccount,
        Method::SignMessage,
        Method::SignAllMessages,
        Method::SignTransaction,
        Method::SignAndSendTransaction,
        Method::SetData,
        Method::GetData,
        Method::ClearData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GetAccountAddress => "getAccountAddress",
            Method::GetPublicKey => "getPublicKey",
            Method::GetPrivateKey => "getPrivateKey",
            Method::GetAccounts => "getAccounts",
            Method::GetBalance => "getBalance",
            Method::CreateNewAccount => "createNewAccount",
            Method::SignMessage => "signMessage",
            Method::SignAllMessages => "signAllMessages",
            Method::SignTransaction => "signTransaction",
            Method::SignAndSendTransaction => "signAndSendTransaction",
            Method::SetData => "setData",
            Method::GetData => "getData",
            Method::ClearData => "clearData",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "signAllTransactions" => return Ok(Method::SignAllMessages),
            "sign&sendTxn" => return Ok(Method::SignAndSendTransaction),
            _ => {}
        }
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::UnknownMethod(s.to_string()))
    }
}

/// A message to sign: `0x`-hex is taken as bytes, anything else as UTF-8 text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl MessagePayload {
    pub fn parse(message: &str) -> Self {
        if let Some(digits) = message.strip_prefix("0x") {
            if let Ok(bytes) = hex::decode(digits) {
                return MessagePayload::Bytes(bytes);
            }
        }
        MessagePayload::Text(message.to_string())
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MessagePayload::Text(text) => text.as_bytes(),
            MessagePayload::Bytes(bytes) => bytes,
        }
    }

    pub fn to_field(&self) -> TxnField {
        match self {
            MessagePayload::Text(text) => TxnField::Text(text.clone()),
            MessagePayload::Bytes(bytes) => TxnField::Bytes(bytes.clone()),
        }
    }
}

/// A validated request, one variant per operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetAccountAddress { path: DerivationPath },
    GetPublicKey { path: DerivationPath },
    GetPrivateKey { path: DerivationPath },
    GetAccounts,
    GetBalance { path: DerivationPath },
    CreateNewAccount { path: Option<DerivationPath>, name: Option<String> },
    SignMessage { path: DerivationPath, message: MessagePayload },
    SignAllMessages { path: DerivationPath, messages: Vec<MessagePayload> },
    SignTransaction { path: DerivationPath, transfer: TransferRequest },
    SignAndSendTransaction { path: DerivationPath, transfer: TransferRequest },
    SetData { key: String, value: Value },
    GetData,
    ClearData,
}

impl Request {
    /// Validate `params` against the schema of `method`.
    ///
    /// Runs before any key derivation or network access.
    pub fn parse(method: Method, params: &Value) -> Result<Self> {
        let params = Params::new(params)?;

        let request = match method {
            Method::GetAccountAddress => Request::GetAccountAddress { path: params.path()? },
            Method::GetPublicKey => Request::GetPublicKey { path: params.path()? },
            Method::GetPrivateKey => Request::GetPrivateKey { path: params.path()? },
            Method::GetAccounts => Request::GetAccounts,
            Method::GetBalance => Request::GetBalance { path: params.path()? },
            Method::CreateNewAccount => Request::CreateNewAccount {
                path: params.optional_path()?,
                name: params.optional_str("name")?,
            },
            Method::SignMessage => {
                let path = params.path()?;
                let message = params.str("message")?;
                Request::SignMessage { path, message: MessagePayload::parse(&message) }
            }
            Method::SignAllMessages => {
                let path = params.path()?;
                let messages = params.messages()?;
                Request::SignAllMessages { path, messages }
            }
            Method::SignTransaction => {
                let path = params.path()?;
                Request::SignTransaction { path, transfer: params.transfer()? }
            }
            Method::SignAndSendTransaction => {
                let path = params.path()?;
                Request::SignAndSendTransaction { path, transfer: params.transfer()? }
            }
            Method::SetData => {
                let key = params.str("key")?;
                let value = params
                    .present("value")
                    .cloned()
                    .ok_or_else(|| Error::MissingParameter("value".to_string()))?;
                Request::SetData { key, value }
            }
            Method::GetData => Request::GetData,
            Method::ClearData => Request::ClearData,
        };

        Ok(request)
    }
}

/// Loosely structured params: an object, a bare path array, or nothing
enum Params<'a> {
    Object(&'a Map<String, Value>),
    Path(&'a Value),
    Empty,
}

impl<'a> Params<'a> {
    fn new(params: &'a Value) -> Result<Self> {
        match params {
            Value::Object(map) => Ok(Params::Object(map)),
            Value::Array(_) => Ok(Params::Path(params)),
            Value::Null => Ok(Params::Empty),
            other => Err(Error::InvalidParameter(format!("params must be an object, got {}", other))),
        }
    }

    /// The raw value, `null` included
    fn present(&self, name: &str) -> Option<&'a Value> {
        match self {
            Params::Object(map) => (*map).get(name),
            Params::Path(value) if name == "derivationPath" => Some(*value),
            _ => None,
        }
    }

    /// Typed fields treat `null` as absent
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.present(name).filter(|v| !v.is_null())
    }

    fn required(&self, name: &str) -> Result<&'a Value> {
        self.get(name)
            .ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    fn str(&self, name: &str) -> Result<String> {
        match self.required(name)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(Error::InvalidParameter(format!("{} must be a string, got {}", name, other))),
        }
    }

    fn optional_str(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Error::InvalidParameter(format!("{} must be a string, got {}", name, other))),
        }
    }

    fn path(&self) -> Result<DerivationPath> {
        parse_path(self.required("derivationPath")?)
    }

    fn optional_path(&self) -> Result<Option<DerivationPath>> {
        self.get("derivationPath").map(parse_path).transpose()
    }

    fn messages(&self) -> Result<Vec<MessagePayload>> {
        let values = match self.required("messages")? {
            Value::Array(values) => values,
            other => {
                return Err(Error::InvalidParameter(format!("messages must be an array, got {}", other)));
            }
        };
        if values.is_empty() {
            return Err(Error::InvalidParameter("messages is empty".to_string()));
        }

        values
            .iter()
            .map(|value| match value {
                Value::String(s) => Ok(MessagePayload::parse(s)),
                other => Err(Error::InvalidParameter(format!("message must be a string, got {}", other))),
            })
            .collect()
    }

    /// Transfer fields, flat or nested under `txnDetails`
    fn transfer(&self) -> Result<TransferRequest> {
        let details = match self.get("txnDetails") {
            Some(Value::Object(map)) => Params::Object(map),
            Some(other) => {
                return Err(Error::InvalidParameter(format!("txnDetails must be an object, got {}", other)));
            }
            None => match self {
                Params::Object(map) => Params::Object(*map),
                _ => Params::Empty,
            },
        };

        let receiver = match details.required("receiver")? {
            Value::String(s) => s.clone(),
            other => return Err(Error::InvalidTransfer(format!("receiver must be a string, got {}", other))),
        };
        let amount = parse_amount(details.required("amount")?)?;

        TransferRequest::new(&receiver, amount)
    }
}

fn parse_path(value: &Value) -> Result<DerivationPath> {
    let segments = value
        .as_array()
        .ok_or_else(|| Error::InvalidPath(format!("derivationPath must be an array, got {}", value)))?
        .iter()
        .map(|segment| {
            segment
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidPath(format!("segment {} is not a string", segment)))
        })
        .collect::<Result<Vec<_>>>()?;

    DerivationPath::new(segments)
}
