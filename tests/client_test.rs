// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: tests/client_test.rs
// Version: 1.0.0
//
// End-to-end test of the bridge miner: client, bridge server and a scripted
// stratum pool all run in-process on loopback sockets.
//
// Tree Location:
// - tests/client_test.rs (client integration tests)
// - Depends on: poolbridge, tokio

#[cfg(test)]
mod tests {
    use poolbridge::bridge::BridgeState;
    use poolbridge::bridge::server::serve;
    use poolbridge::client::{BridgeClient, ClientSettings};
    use poolbridge::config::BridgeConfig;
    use poolbridge::core::Algorithm;
    use poolbridge::error::ClientError;
    use poolbridge::miner::{SchedulerConfig, ThrottleConfig};
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    const ANSWERED_SHARES: usize = 3;

    async fn spawn_bridge() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, BridgeState::new(BridgeConfig::default())));
        addr
    }

    fn settings(bridge: SocketAddr, pool: String) -> ClientSettings {
        ClientSettings {
            bridge_url: format!("ws://{}", bridge),
            pool,
            wallet: "test-wallet".to_string(),
            worker: "rig".to_string(),
            algo: Algorithm::Sha3x,
            threads: 1,
            throttle: ThrottleConfig::new(0.5),
            scheduler: SchedulerConfig {
                nonces_per_iteration: 4,
                ..SchedulerConfig::default()
            },
        }
    }

    /// Pool that logs the miner in, answers a few shares, then hangs up
    async fn scripted_pool(listener: TcpListener, login_tx: oneshot::Sender<Value>) {
        let (socket, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = socket.into_split();
        let mut lines = BufReader::new(reader).lines();

        let login: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        login_tx.send(login).unwrap();
        let job = json!({
            "id": 1,
            "jsonrpc": "2.0",
            "result": {
                "status": "OK",
                "job": {"job_id": "job-1", "blob": "11".repeat(32), "difficulty": 1, "height": 5}
            }
        });
        writer.write_all(format!("{}\n", job).as_bytes()).await.unwrap();

        for _ in 0..ANSWERED_SHARES {
            let submit: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
            assert_eq!(submit["method"], "submit");
            assert_eq!(submit["params"]["job_id"], "job-1");
            let answer = json!({"id": submit["id"], "jsonrpc": "2.0", "result": {"status": "OK"}});
            writer.write_all(format!("{}\n", answer).as_bytes()).await.unwrap();
        }
        // Let the last answer reach the miner before hanging up
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn test_mines_through_bridge() {
        let pool_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let pool_addr = pool_listener.local_addr().unwrap();
        let (login_tx, login_rx) = oneshot::channel();
        tokio::spawn(scripted_pool(pool_listener, login_tx));

        let bridge = spawn_bridge().await;
        let client = BridgeClient::new(settings(bridge, format!("stratum+tcp://{}", pool_addr)));
        tokio::time::timeout(Duration::from_secs(10), client.run())
            .await
            .expect("client did not finish")
            .unwrap();

        let login = login_rx.await.unwrap();
        assert_eq!(login["method"], "login");
        assert_eq!(login["params"]["login"], "test-wallet");
        assert_eq!(login["params"]["pass"], "rig");
        assert_eq!(login["params"]["algo"], json!(["sha3x"]));

        let counters = client.counters();
        assert_eq!(counters.accepted(), ANSWERED_SHARES as u64);
        assert_eq!(counters.rejected(), 0);
        assert!(counters.submitted() >= ANSWERED_SHARES as u64);
    }

    #[tokio::test]
    async fn test_refused_pool_fails_the_run() {
        let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = unused.local_addr().unwrap().port();
        drop(unused);

        let bridge = spawn_bridge().await;
        let client = BridgeClient::new(settings(bridge, format!("stratum+tcp://127.0.0.1:{}", port)));
        let result = tokio::time::timeout(Duration::from_secs(10), client.run()).await.unwrap();
        assert!(matches!(result, Err(ClientError::Refused(_))));
    }

    #[tokio::test]
    async fn test_shutdown_signal_ends_the_run() {
        let pool_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let pool_addr = pool_listener.local_addr().unwrap();
        // Accept and keep the socket open without answering
        tokio::spawn(async move {
            let (_socket, _) = pool_listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let bridge = spawn_bridge().await;
        let client = BridgeClient::new(settings(bridge, format!("stratum+tcp://{}", pool_addr)));
        let shutdown = tokio::time::sleep(Duration::from_millis(300));
        tokio::time::timeout(Duration::from_secs(10), client.run_until(shutdown))
            .await
            .expect("client ignored shutdown")
            .unwrap();
        assert_eq!(client.counters().submitted(), 0);
    }
}
