//! End-to-end lookups against a DuckDB event corpus on disk

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use duckdb::Connection;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use earliest_actor_common::{create_corpus_tables, encode_ipc_stream};
use earliest_actor_provider::{
    Address, DuckDbExecutor, EarliestActorResolver, EarliestDeployment, EarliestFunding,
    LookupError, LookupListener, LookupListenerConfig, LookupResponse, ResolverConfig,
};

fn addr(c: char) -> String {
    format!("0x{}", c.to_string().repeat(40))
}

fn hash(n: u32) -> String {
    format!("0x{:064x}", n)
}

/// Corpus layout:
/// - contract A: deployed at 50_000 (below the default floor) and again at 200_000
/// - contract C: two creations in block 250_000, tx index 7 and 2
/// - A funded by a zero-value tx, a tx carrying calldata, then plain transfers at 170_000 and 180_000
/// - B funded twice in block 300_000, tx index 5 and 2
/// - D never appears
fn write_corpus(dir: &Path) -> ResolverConfig {
    let path = dir.join("corpus.duckdb");
    let config = ResolverConfig {
        database_path: Some(path.display().to_string()),
        temp_directory: dir.join("spill").display().to_string(),
        poll_interval_seconds: 1,
        timeout_seconds: 30,
        threads: 1,
        ..ResolverConfig::default()
    };

    let conn = Connection::open(&path).unwrap();
    create_corpus_tables(&conn, &config).unwrap();

    let (a, b, c) = (addr('a'), addr('b'), addr('c'));
    let (d0, d1, d2, d3) = (addr('1'), addr('2'), addr('3'), addr('4'));
    let (f0, f1, f2, f3, f4) = (addr('5'), addr('6'), addr('7'), addr('8'), addr('9'));

    conn.execute_batch(&format!(
        "INSERT INTO creation_traces VALUES
            ('{a}', '{d0}', '{h1}', 0, 50000, TIMESTAMP '2020-09-01 00:00:00'),
            ('{a}', '{d1}', '{h2}', 3, 200000, TIMESTAMP '2020-10-01 00:00:00'),
            ('{c}', '{d2}', '{h3}', 7, 250000, TIMESTAMP '2020-11-01 00:00:00'),
            ('{c}', '{d3}', '{h4}', 2, 250000, TIMESTAMP '2020-11-01 00:00:00');
         INSERT INTO transactions VALUES
            ('{f0}', '{a}', 0, '0x', '{h5}', 0, 150000, TIMESTAMP '2020-09-15 00:00:00'),
            ('{f0}', '{a}', 3000000000000000000, '0xdeadbeef', '{h6}', 0, 160000, TIMESTAMP '2020-09-20 00:00:00'),
            ('{f1}', '{a}', 2000000000000000000, '0x', '{h7}', 1, 170000, TIMESTAMP '2020-09-25 00:00:00'),
            ('{f2}', '{a}', 5000000000000000000, NULL, '{h8}', 0, 180000, TIMESTAMP '2020-09-28 00:00:00'),
            ('{f3}', '{b}', 1500000000000000000, '0x', '{h9}', 5, 300000, TIMESTAMP '2020-12-01 00:00:00'),
            ('{f4}', '{b}', 1, '', '{h10}', 2, 300000, TIMESTAMP '2020-12-01 00:00:00');",
        h1 = hash(1),
        h2 = hash(2),
        h3 = hash(3),
        h4 = hash(0xff),
        h5 = hash(5),
        h6 = hash(6),
        h7 = hash(7),
        h8 = hash(8),
        h9 = hash(9),
        h10 = hash(0xfff),
    ))
    .unwrap();
    drop(conn);

    config
}

fn resolver(config: &ResolverConfig) -> EarliestActorResolver {
    let executor = Arc::new(DuckDbExecutor::new(config.clone()));
    EarliestActorResolver::new(config, executor).unwrap()
}

fn addresses(chars: &[char]) -> Vec<Address> {
    chars.iter().map(|c| Address::parse(&addr(*c)).unwrap()).collect()
}

#[tokio::test]
async fn test_earliest_deployers_and_funders() {
    let dir = TempDir::new().unwrap();
    let config = write_corpus(dir.path());
    let resolver = resolver(&config);

    let tables = resolver
        .resolve(&addresses(&['a', 'b', 'c', 'd']))
        .await
        .unwrap();

    assert_eq!(
        tables.deployments.rows(),
        &[
            EarliestDeployment {
                contract_address: addr('a'),
                deployer: addr('2'),
                transaction_id: hash(2),
                block_number: 200_000,
                block_time: Utc.with_ymd_and_hms(2020, 10, 1, 0, 0, 0).unwrap(),
            },
            EarliestDeployment {
                contract_address: addr('c'),
                deployer: addr('4'),
                transaction_id: hash(0xff),
                block_number: 250_000,
                block_time: Utc.with_ymd_and_hms(2020, 11, 1, 0, 0, 0).unwrap(),
            },
        ]
    );

    assert_eq!(
        tables.funding.rows(),
        &[
            EarliestFunding {
                recipient: addr('a'),
                funder: addr('6'),
                transaction_id: hash(7),
                block_number: 170_000,
                block_time: Utc.with_ymd_and_hms(2020, 9, 25, 0, 0, 0).unwrap(),
                amount: 2.0,
            },
            EarliestFunding {
                recipient: addr('b'),
                funder: addr('9'),
                transaction_id: hash(0xfff),
                block_number: 300_000,
                block_time: Utc.with_ymd_and_hms(2020, 12, 1, 0, 0, 0).unwrap(),
                amount: 1.0 / 1e18,
            },
        ]
    );

    // Unmatched addresses produce no rows at all
    assert!(tables.deployments.get(&addr('b')).is_none());
    assert!(tables.deployments.get(&addr('d')).is_none());
    assert!(tables.funding.get(&addr('c')).is_none());
    assert!(tables.funding.get(&addr('d')).is_none());
}

#[tokio::test]
async fn test_deployed_contract_and_funded_wallet() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ab.duckdb");
    let config = ResolverConfig {
        database_path: Some(path.display().to_string()),
        min_block_number: 0,
        threads: 1,
        ..ResolverConfig::default()
    };

    let conn = Connection::open(&path).unwrap();
    create_corpus_tables(&conn, &config).unwrap();
    conn.execute_batch(&format!(
        "INSERT INTO creation_traces VALUES
            ('{a}', '{x}', '{h1}', 0, 100, TIMESTAMP '2020-08-29 00:00:00');
         INSERT INTO transactions VALUES
            ('{y}', '{a}', 1000000000000000000, '0x', '{h2}', 0, 50, TIMESTAMP '2020-08-28 00:00:00'),
            ('{z}', '{b}', 500000000000000000, '0x', '{h3}', 0, 200, TIMESTAMP '2020-08-30 00:00:00');",
        a = addr('a'),
        b = addr('b'),
        x = addr('1'),
        y = addr('2'),
        z = addr('3'),
        h1 = hash(1),
        h2 = hash(2),
        h3 = hash(3),
    ))
    .unwrap();
    drop(conn);

    let tables = resolver(&config)
        .resolve(&addresses(&['a', 'b']))
        .await
        .unwrap();

    assert_eq!(tables.deployments.len(), 1);
    let deployment = tables.deployments.get(&addr('a')).unwrap();
    assert_eq!(deployment.deployer, addr('1'));
    assert_eq!(deployment.block_number, 100);

    let funded: Vec<(String, String, i64, f64)> = tables
        .funding
        .rows()
        .iter()
        .map(|r| (r.recipient.clone(), r.funder.clone(), r.block_number, r.amount))
        .collect();
    assert_eq!(
        funded,
        vec![
            (addr('a'), addr('2'), 50, 1.0),
            (addr('b'), addr('3'), 200, 0.5),
        ]
    );
}

#[tokio::test]
async fn test_floor_is_inclusive() {
    let dir = TempDir::new().unwrap();
    let config = ResolverConfig {
        min_block_number: 200_000,
        ..write_corpus(dir.path())
    };
    let resolver = resolver(&config);

    let tables = resolver.resolve(&addresses(&['a'])).await.unwrap();

    assert_eq!(tables.deployments.len(), 1);
    assert_eq!(tables.deployments.rows()[0].block_number, 200_000);
    // Every funding transfer to A sits below the floor
    assert!(tables.funding.is_empty());
}

#[tokio::test]
async fn test_zero_floor_sees_early_blocks() {
    let dir = TempDir::new().unwrap();
    let config = ResolverConfig {
        min_block_number: 0,
        ..write_corpus(dir.path())
    };
    let resolver = resolver(&config);

    let tables = resolver.resolve(&addresses(&['a'])).await.unwrap();

    let deployment = tables.deployments.get(&addr('a')).unwrap();
    assert_eq!(deployment.deployer, addr('1'));
    assert_eq!(deployment.block_number, 50_000);

    // Zero-value and calldata-carrying transfers are still not funding
    let funding = tables.funding.get(&addr('a')).unwrap();
    assert_eq!(funding.funder, addr('6'));
    assert_eq!(funding.block_number, 170_000);
}

#[tokio::test]
async fn test_native_decimals_scale_amounts() {
    let dir = TempDir::new().unwrap();
    let config = ResolverConfig {
        native_decimals: 9,
        ..write_corpus(dir.path())
    };
    let resolver = resolver(&config);

    let tables = resolver.resolve(&addresses(&['a'])).await.unwrap();
    assert_eq!(tables.funding.rows()[0].amount, 2_000_000_000.0);
}

#[tokio::test]
async fn test_repeated_lookups_are_identical() {
    let dir = TempDir::new().unwrap();
    let config = write_corpus(dir.path());
    let resolver = resolver(&config);
    let batch = addresses(&['c', 'a', 'b', 'a']);

    let first = resolver.resolve(&batch).await.unwrap();
    let second = resolver.resolve(&batch).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.deployments.len(), 2);
    assert_eq!(
        encode_ipc_stream(&first.deployments.to_record_batch().unwrap()).unwrap(),
        encode_ipc_stream(&second.deployments.to_record_batch().unwrap()).unwrap()
    );
    assert_eq!(
        encode_ipc_stream(&first.funding.to_record_batch().unwrap()).unwrap(),
        encode_ipc_stream(&second.funding.to_record_batch().unwrap()).unwrap()
    );
}

#[tokio::test]
async fn test_unreachable_corpus() {
    let dir = TempDir::new().unwrap();
    let config = ResolverConfig {
        database_path: Some(dir.path().join("absent.duckdb").display().to_string()),
        ..ResolverConfig::default()
    };
    let resolver = resolver(&config);

    let err = resolver.resolve(&addresses(&['a'])).await.unwrap_err();
    assert!(matches!(err, LookupError::Execution(_)));

    let tables = resolver.resolve_or_empty(&addresses(&['a'])).await;
    assert!(tables.is_empty());
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_corpus(dir.path());
    let resolver = resolver(&config);

    let err = resolver.resolve(&[]).await.unwrap_err();
    assert!(matches!(err, LookupError::Construction(_)));
}

#[tokio::test]
async fn test_listener_replies_with_tables() {
    let dir = TempDir::new().unwrap();
    let config = write_corpus(dir.path());
    let listener = LookupListener::new(
        LookupListenerConfig::from_properties(&Default::default()),
        Arc::new(resolver(&config)),
    );

    let payload = format!(r#"{{"addresses": ["{}", "{}"]}}"#, addr('b'), addr('c'));
    let response = listener.process_lookup(payload.as_bytes()).await;

    match response {
        LookupResponse::Ok {
            deployments,
            funding,
        } => {
            assert_eq!(deployments.len(), 1);
            assert_eq!(deployments[0].contract_address, addr('c'));
            assert_eq!(funding.len(), 1);
            assert_eq!(funding[0].recipient, addr('b'));
        }
        other => panic!("unexpected response: {:?}", other),
    }
}
