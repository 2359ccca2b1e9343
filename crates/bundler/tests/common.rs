use aa_sdk_bundler::BundlerClient;
use aa_sdk_primitives::constants::entry_point::ADDRESS;
use ethers::types::Address;
use serde_json::{json, Value};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::MockServer;

pub const SENDER: &str = "0x9406cc6185a346906296840746125a0e44976454";
pub const USER_OPERATION_HASH: &str =
    "0x87c11723e79cb8593e80d67864c53f3cbdba0458fc7ddc6cc8512e61b3c65b86";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn setup() -> (MockServer, BundlerClient) {
    init_tracing();
    let server = MockServer::start().await;
    let entry_point = ADDRESS.parse::<Address>().expect("valid entry point address");
    let client = BundlerClient::new(server.uri(), entry_point)
        .with_poll_interval(Duration::from_millis(20))
        .with_wait_timeout(Duration::from_secs(2));
    (server, client)
}

pub fn result(result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": result})
}

pub fn error(error: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "error": error})
}

pub fn receipt() -> Value {
    json!({
        "userOpHash": USER_OPERATION_HASH,
        "sender": SENDER,
        "nonce": "0x0",
        "success": true,
        "actualGasCost": "0x2386f26fc10000",
        "actualGasUsed": "0x1d4c0",
        "logs": [],
        "receipt": {
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x10",
            "status": "0x1"
        }
    })
}
