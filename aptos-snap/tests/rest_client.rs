//! Tests for the REST chain client against a local fake fullnode

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use aptos_snap::account::{Account, AccountAddress};
use aptos_snap::transaction::*;
use aptos_snap::Error;

const KEY: &str = "0xe8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35";
const HASH: &str = "0x5e3c9a1b";

async fn spawn_node(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn client(url: String, timeout_secs: u64) -> RestClient {
    let mut config = ProviderConfig::for_network(Network::Local);
    config.url = url;
    config.faucet_url = None;
    config.timeout = Some(timeout_secs);
    RestClient::new(config).unwrap()
}

fn executed(success: bool) -> Response {
    Json(json!({
        "type": "user_transaction",
        "hash": HASH,
        "version": "981",
        "success": success,
        "vm_status": if success { "Executed successfully" } else { "Move abort: EINSUFFICIENT_BALANCE" },
    }))
    .into_response()
}

#[tokio::test]
async fn test_chain_params_for_unknown_account() {
    let app = Router::new()
        .route(
            "/v1",
            get(|| async { Json(json!({ "chain_id": 4, "ledger_timestamp": "1700000123000000" })) }),
        )
        .route(
            "/v1/accounts/:address",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "message": "Account not found", "error_code": "account_not_found" })),
                )
            }),
        )
        .route("/v1/estimate_gas_price", get(|| async { Json(json!({ "gas_estimate": 150 })) }));
    let client = client(spawn_node(app).await, 5);

    let params = client.chain_params(&AccountAddress::from_hex("0xbeef").unwrap()).await.unwrap();

    assert_eq!(
        params,
        ChainParams {
            chain_id: 4,
            sequence_number: 0,
            gas_unit_price: 150,
            ledger_timestamp_secs: 1_700_000_123,
        }
    );
}

#[tokio::test]
async fn test_finality_polls_through_unknown_and_pending() {
    let polls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/v1/transactions/by_hash/:hash",
            get(|State(polls): State<Arc<AtomicUsize>>| async move {
                match polls.fetch_add(1, Ordering::SeqCst) {
                    0 => StatusCode::NOT_FOUND.into_response(),
                    1 => Json(json!({ "type": "pending_transaction", "hash": HASH })).into_response(),
                    _ => executed(true),
                }
            }),
        )
        .with_state(polls.clone());
    let client = client(spawn_node(app).await, 10);

    let finalized = client.wait_for_finality(HASH).await.unwrap();

    assert!(finalized.success);
    assert_eq!(finalized.version, Some(981));
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_execution_is_reported_once_final() {
    let app = Router::new().route("/v1/transactions/by_hash/:hash", get(|| async { executed(false) }));
    let client = client(spawn_node(app).await, 5);

    let result = client.wait_for_finality(HASH).await;
    match result {
        Err(Error::Submission(message)) => assert!(message.contains("EINSUFFICIENT_BALANCE")),
        other => panic!("expected a submission error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_node_times_out_as_finality_timeout() {
    let app = Router::new().route(
        "/v1/transactions/by_hash/:hash",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(4)).await;
            executed(true)
        }),
    );
    let client = client(spawn_node(app).await, 1);

    let started = Instant::now();
    let result = client.wait_for_finality(HASH).await;

    assert!(matches!(result, Err(Error::FinalityTimeout(hash)) if hash == HASH));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_rejected_submission() {
    let submits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/v1/transactions",
            post(|State(submits): State<Arc<AtomicUsize>>| async move {
                submits.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "message": "Invalid transaction: SEQUENCE_NUMBER_TOO_OLD" })),
                )
            }),
        )
        .with_state(submits.clone());
    let client = client(spawn_node(app).await, 5);

    let account = Account::from_private_key_hex(KEY).unwrap();
    let params = ChainParams {
        chain_id: 4,
        sequence_number: 0,
        gas_unit_price: 100,
        ledger_timestamp_secs: 1_700_000_000,
    };
    let transfer = TransferRequest::new("0x2", 10).unwrap();
    let signed = TransactionBuilder::default()
        .build_transfer(account.address(), &transfer, &params)
        .sign(&account)
        .unwrap();

    let result = client.submit(&signed).await;

    match result {
        Err(Error::Submission(message)) => assert!(message.contains("SEQUENCE_NUMBER_TOO_OLD")),
        other => panic!("expected a submission error, got {:?}", other),
    }
    assert_eq!(submits.load(Ordering::SeqCst), 1);
}
