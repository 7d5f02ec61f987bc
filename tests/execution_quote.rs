//! Integration tests for the execution quote client using mockito

use ethers::types::{Address, U256};
use mockito::Matcher;
use std::time::Duration;
use swap_submitter::swap::types::AmountType;
use swap_submitter::swap::{ExecutionQuoteClient, ExecutionQuoteRequest, HttpExecutionQuoteClient};
use swap_submitter::SwapError;

const VALIDATED_BODY: &str = r#"{
    "validatedSwapTransaction": {
        "price": "0.192",
        "guaranteedPrice": "0.191",
        "buyAmount": "10000000000000000",
        "sellAmount": "52000000000000000",
        "buyTokenAddress": "0xd8763cba276a3738e6de85b4b3bf5fded6d6ca73",
        "sellTokenAddress": "0xe8537a3d056da446677b9e9d6c5db704eaab4787",
        "to": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
        "data": "0xd9627aa4",
        "value": "0",
        "gas": "280000",
        "gasPrice": "500000000",
        "chainId": 42220
    }
}"#;

fn request(amount_type: AmountType) -> ExecutionQuoteRequest {
    ExecutionQuoteRequest {
        buy_token: "0xd8763cba276a3738e6de85b4b3bf5fded6d6ca73".to_string(),
        sell_token: "0xe8537a3d056da446677b9e9d6c5db704eaab4787".to_string(),
        amount_type,
        amount: "10000000000000000".to_string(),
        user_address: Address::repeat_byte(0x07),
    }
}

fn client(server: &mockito::Server) -> HttpExecutionQuoteClient {
    HttpExecutionQuoteClient::with_timeout(
        format!("{}/swap/v1/quote", server.url()),
        Duration::from_secs(5),
    )
    .expect("client should build")
}

#[tokio::test]
async fn test_fetch_validated_transaction() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/swap/v1/quote")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "buyToken".into(),
                "0xd8763cba276a3738e6de85b4b3bf5fded6d6ca73".into(),
            ),
            Matcher::UrlEncoded(
                "sellToken".into(),
                "0xe8537a3d056da446677b9e9d6c5db704eaab4787".into(),
            ),
            Matcher::UrlEncoded("buyAmount".into(), "10000000000000000".into()),
            Matcher::UrlEncoded(
                "userAddress".into(),
                "0x0707070707070707070707070707070707070707".into(),
            ),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(VALIDATED_BODY)
        .create_async()
        .await;

    let validated = client(&server)
        .fetch_execution_quote(&request(AmountType::BuyAmount))
        .await
        .expect("quote should be returned");

    let tx = validated.raw_transaction();
    assert_eq!(tx.gas, Some(U256::from(280_000u64)));
    assert_eq!(tx.gas_price, Some(U256::from(500_000_000u64)));
    assert_eq!(tx.chain_id, Some(U256::from(42_220u64)));
    assert_eq!(validated.0.guaranteed_price, "0.191");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_sell_amount_query_key() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/swap/v1/quote")
        .match_query(Matcher::UrlEncoded(
            "sellAmount".into(),
            "10000000000000000".into(),
        ))
        .with_status(200)
        .with_body(VALIDATED_BODY)
        .create_async()
        .await;

    let result = client(&server)
        .fetch_execution_quote(&request(AmountType::SellAmount))
        .await;

    assert!(result.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/swap/v1/quote")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let result = client(&server)
        .fetch_execution_quote(&request(AmountType::BuyAmount))
        .await;

    match result {
        Err(SwapError::HttpStatus { status }) => assert_eq!(status, 500),
        other => panic!("Expected HttpStatus error, got {:?}", other),
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_unparsable_body() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/swap/v1/quote")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"unexpected": true}"#)
        .create_async()
        .await;

    let result = client(&server)
        .fetch_execution_quote(&request(AmountType::BuyAmount))
        .await;

    assert!(matches!(result, Err(SwapError::Parse(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_service() {
    let client = HttpExecutionQuoteClient::with_timeout(
        "http://127.0.0.1:1/swap/v1/quote".to_string(),
        Duration::from_secs(2),
    )
    .expect("client should build");

    let result = client
        .fetch_execution_quote(&request(AmountType::BuyAmount))
        .await;

    assert!(matches!(
        result,
        Err(SwapError::Http(_)) | Err(SwapError::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener has an address");
    let silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = HttpExecutionQuoteClient::with_timeout(
        format!("http://{}/swap/v1/quote", addr),
        Duration::from_millis(200),
    )
    .expect("client should build");

    let result = client
        .fetch_execution_quote(&request(AmountType::BuyAmount))
        .await;

    assert!(
        matches!(result, Err(SwapError::Timeout { .. })),
        "Expected Timeout error, got {:?}",
        result
    );
    silent.abort();
}
