//! Tests for request routing

mod common;

use serde_json::{json, Value};

use aptos_snap::account::Account;
use aptos_snap::confirm::DialogResponse;
use aptos_snap::pipeline::PipelineOptions;
use aptos_snap::Error;

use common::{Harness, RecordingClient, ScriptedConfirmation};

fn path_params() -> Value {
    json!({ "derivationPath": ["0'", "0'"] })
}

#[tokio::test]
async fn test_unknown_method() {
    let harness = Harness::approving();
    let result = harness.router.handle("hello", &Value::Null).await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::UnknownMethod(_)));
    assert_eq!(err.code(), -32601);
}

#[tokio::test]
async fn test_missing_path_fails_before_derivation() {
    let harness = Harness::approving();

    for method in ["getAccountAddress", "getPublicKey", "getPrivateKey", "signMessage", "signAndSendTransaction"] {
        let result = harness.router.handle(method, &json!({})).await;
        assert!(matches!(result, Err(Error::MissingParameter(_))), "{}", method);
    }

    assert_eq!(harness.entropy.count(), 0);
    assert_eq!(harness.confirmation.prompt_count(), 0);
}

#[tokio::test]
async fn test_invalid_transfer_fails_before_network() {
    let harness = Harness::approving();
    let params = json!({
        "derivationPath": ["0'", "0'"],
        "txnDetails": { "receiver": "", "amount": "100" },
    });

    let result = harness.router.handle("sign&sendTxn", &params).await;

    assert!(matches!(result, Err(Error::InvalidTransfer(_))));
    assert_eq!(harness.entropy.count(), 0);
    assert_eq!(harness.client.param_requests.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_address_and_private_key_round_trip() {
    let harness = Harness::approving();

    let address = harness.router.handle("getAccountAddress", &path_params()).await.unwrap();
    let address = address.as_str().unwrap().to_string();
    assert!(address.starts_with("0x"));

    let private_key = harness.router.handle("getPrivateKey", &path_params()).await.unwrap();
    let account = Account::from_private_key_hex(private_key.as_str().unwrap()).unwrap();
    assert_eq!(account.address().to_hex(), address);

    let public_key = harness.router.handle("getPublicKey", &path_params()).await.unwrap();
    assert_eq!(public_key.as_str().unwrap(), account.public_key_hex());

    // Address and public key reads only show notices
    assert_eq!(harness.confirmation.prompt_count(), 1);
    assert_eq!(harness.confirmation.notices.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_denied_private_key_derives_nothing() {
    let harness = Harness::denying();

    let result = harness.router.handle("getPrivateKey", &path_params()).await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::UserDenied));
    assert_eq!(err.code(), 4001);
    assert_eq!(harness.entropy.count(), 0);
}

#[tokio::test]
async fn test_sign_message() {
    let harness = Harness::approving();
    let params = json!({ "derivationPath": ["0'", "0'"], "message": "hello aptos" });

    let result = harness.router.handle("signMessage", &params).await.unwrap();

    let signature = result["signature"].as_str().unwrap();
    assert_eq!(signature.len(), 2 + 128);

    let private_key = harness.router.handle("getPrivateKey", &path_params()).await.unwrap();
    let account = Account::from_private_key_hex(private_key.as_str().unwrap()).unwrap();
    assert_eq!(account.sign(b"hello aptos").unwrap().to_hex(), signature);
}

#[tokio::test]
async fn test_sign_all_messages_uses_one_confirmation() {
    let harness = Harness::approving();
    let params = json!({ "derivationPath": ["0'", "0'"], "messages": ["Jai Siyaram!", "0xab7896"] });

    let result = harness.router.handle("signAllTransactions", &params).await.unwrap();

    assert_eq!(result.as_array().unwrap().len(), 2);
    assert_eq!(harness.confirmation.prompt_count(), 1);

    let prompt = harness.confirmation.last_prompt().unwrap();
    assert_eq!(prompt.body.to_value()["messages"][1], "0xab7896");
}

#[tokio::test]
async fn test_denied_signing() {
    let harness = Harness::denying();
    let params = json!({ "derivationPath": ["0'", "0'"], "receiver": "0x2", "amount": 100 });

    let result = harness.router.handle("signAndSendTransaction", &params).await;

    assert!(matches!(result, Err(Error::UserDenied)));
    assert_eq!(harness.client.submitted_count(), 0);
}

#[tokio::test]
async fn test_sign_and_send_returns_hash() {
    let harness = Harness::approving();
    let params = json!({
        "derivationPath": ["0'", "0'"],
        "txnDetails": { "receiver": "0x2", "amount": "250" },
    });

    let hash = harness.router.handle("sign&sendTxn", &params).await.unwrap();

    let submitted = harness.client.submitted.lock().unwrap()[0].clone();
    assert_eq!(hash.as_str().unwrap(), submitted.hash());
}

#[tokio::test]
async fn test_sign_transaction_does_not_submit() {
    let harness = Harness::approving();
    let params = json!({ "derivationPath": ["1'", "0'"], "receiver": "0x2", "amount": 1 });

    let result = harness.router.handle("signTransaction", &params).await.unwrap();

    assert!(result["signedTransaction"].as_str().unwrap().starts_with("0x"));
    assert!(result["hash"].as_str().unwrap().starts_with("0x"));
    assert_eq!(harness.client.submitted_count(), 0);
}

#[tokio::test]
async fn test_state_methods() {
    let harness = Harness::approving();
    let router = &harness.router;

    assert_eq!(router.handle("getData", &Value::Null).await.unwrap(), json!({}));

    router.handle("setData", &json!({ "key": "cool", "value": "its fine" })).await.unwrap();
    router.handle("setData", &json!({ "key": "k", "value": "v" })).await.unwrap();
    router.handle("setData", &json!({ "key": "k", "value": "v" })).await.unwrap();

    let data = router.handle("getData", &Value::Null).await.unwrap();
    assert_eq!(data, json!({ "cool": "its fine", "k": "v" }));

    router.handle("clearData", &Value::Null).await.unwrap();
    assert_eq!(router.handle("getData", &Value::Null).await.unwrap(), json!({}));
}

#[tokio::test]
async fn test_accounts_lifecycle() {
    let harness = Harness::approving();
    let router = &harness.router;

    let defaults = router.handle("getAccounts", &Value::Null).await.unwrap();
    assert_eq!(defaults.as_array().unwrap().len(), 5);
    assert_eq!(defaults[4], json!({ "name": "Account 4", "derivationPath": ["4'", "0'"] }));

    let address = router.handle("createNewAccount", &Value::Null).await.unwrap();
    let expected = router
        .handle("getAccountAddress", &json!({ "derivationPath": ["5'", "0'"] }))
        .await
        .unwrap();
    assert_eq!(address, expected);

    let accounts = router.handle("getAccounts", &Value::Null).await.unwrap();
    assert_eq!(accounts.as_array().unwrap().len(), 6);
    assert_eq!(accounts[5]["name"], "Account 5");

    let duplicate = router
        .handle("createNewAccount", &json!({ "derivationPath": ["5'", "0'"] }))
        .await;
    assert!(matches!(duplicate, Err(Error::DuplicateAccount(_))));

    router
        .handle("createNewAccount", &json!({ "derivationPath": ["9'", "0'"], "name": "Savings" }))
        .await
        .unwrap();
    let accounts = router.handle("getAccounts", &Value::Null).await.unwrap();
    assert_eq!(accounts[6]["name"], "Savings");

    // Unrelated keys survive account updates
    router.handle("setData", &json!({ "key": "theme", "value": "dark" })).await.unwrap();
    router.handle("createNewAccount", &Value::Null).await.unwrap();
    let data = router.handle("getData", &Value::Null).await.unwrap();
    assert_eq!(data["theme"], "dark");
    assert_eq!(data["accounts"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_get_balance() {
    let harness = Harness::new(
        ScriptedConfirmation::always(DialogResponse::Denied),
        RecordingClient::new(),
        PipelineOptions::default(),
    );

    let result = harness.router.handle("getBalance", &path_params()).await.unwrap();
    assert_eq!(result["balance"], "100000000");
    assert!(result["address"].as_str().unwrap().starts_with("0x"));
}

#[tokio::test]
async fn test_create_account_skips_taken_paths() {
    let harness = Harness::approving();
    let router = &harness.router;

    router
        .handle("createNewAccount", &json!({ "derivationPath": ["6'", "0'"] }))
        .await
        .unwrap();
    let address = router.handle("createNewAccount", &Value::Null).await.unwrap();

    let expected = router
        .handle("getAccountAddress", &json!({ "derivationPath": ["7'", "0'"] }))
        .await
        .unwrap();
    assert_eq!(address, expected);

    let accounts = router.handle("getAccounts", &Value::Null).await.unwrap();
    assert_eq!(accounts.as_array().unwrap().len(), 7);
    assert_eq!(accounts[6], json!({ "name": "Account 7", "derivationPath": ["7'", "0'"] }));

    // Later calls keep finding free paths
    router.handle("createNewAccount", &Value::Null).await.unwrap();
    let accounts = router.handle("getAccounts", &Value::Null).await.unwrap();
    assert_eq!(accounts[7]["derivationPath"], json!(["8'", "0'"]));
}

#[tokio::test]
async fn test_set_data_stores_null() {
    let harness = Harness::approving();
    let router = &harness.router;

    router.handle("setData", &json!({ "key": "k", "value": null })).await.unwrap();
    assert_eq!(router.handle("getData", &Value::Null).await.unwrap(), json!({ "k": null }));

    let missing = router.handle("setData", &json!({ "key": "k" })).await;
    assert!(matches!(missing, Err(Error::MissingParameter(_))));
    let null_key = router.handle("setData", &json!({ "key": null, "value": 1 })).await;
    assert!(matches!(null_key, Err(Error::MissingParameter(_))));
}
