//! Ingestion: atomic block + transaction commit, idempotent replay,
//! missing-transaction placeholders, loose transactions.

mod common;

use common::{b64, ingest, make_tx, open_index};
use weaveindex_core::encoding::{b64url_encode, owner_address};
use weaveindex_core::GqlTransactionsArgs;

#[tokio::test]
async fn ingest_block_and_fetch_transactions() {
    let db = open_index().await;

    let txs = vec![
        make_tx("tx-a", "owner-a", &[("Content-Type", "image/png")]),
        make_tx("tx-b", "owner-b", &[]),
        make_tx("tx-c", "owner-a", &[("App-Name", "wallet")]),
    ];
    ingest(&db, 982_575, txs, vec![]).await;

    let info = db.get_debug_info().await.unwrap();
    assert_eq!(info.counts.new_blocks, 1);
    assert_eq!(info.counts.new_txs, 3);
    assert_eq!(info.counts.wallets, 2); // owner-a reused
    assert_eq!(info.heights.max_new, 982_575);

    let tx = db.get_gql_transaction(&b64("tx-a")).await.unwrap().unwrap();
    assert_eq!(tx.id, b64("tx-a"));
    assert_eq!(tx.height, Some(982_575));
    assert_eq!(tx.block_transaction_index, Some(0));
    assert_eq!(tx.block_indep_hash.as_deref(), Some(b64("block-982575").as_str()));
    assert_eq!(tx.content_type.as_deref(), Some("image/png"));
    assert_eq!(tx.fee, "65595508");
    // wallet address is the SHA-256 of the raw owner bytes
    assert_eq!(tx.owner_address, b64url_encode(&owner_address(b"owner-a")));
    assert_eq!(tx.tags.len(), 1);
    assert_eq!(tx.tags[0].name, "Content-Type");
    assert_eq!(tx.tags[0].value, "image/png");

    // block order is preserved as block_transaction_index
    let tx_c = db.get_gql_transaction(&b64("tx-c")).await.unwrap().unwrap();
    assert_eq!(tx_c.block_transaction_index, Some(2));
}

#[tokio::test]
async fn replay_is_idempotent() {
    let db = open_index().await;

    let txs = vec![make_tx("tx-a", "owner-a", &[("Content-Type", "text/html")])];
    ingest(&db, 10, txs.clone(), vec![b64("tx-missing")]).await;
    let first = db.get_debug_info().await.unwrap();

    ingest(&db, 10, txs, vec![b64("tx-missing")]).await;
    let second = db.get_debug_info().await.unwrap();

    assert_eq!(first.counts.new_blocks, second.counts.new_blocks);
    assert_eq!(first.counts.new_txs, second.counts.new_txs);
    assert_eq!(first.counts.missing_txs, second.counts.missing_txs);
    assert_eq!(first.counts.tag_names, second.counts.tag_names);
    assert_eq!(first.counts.tag_values, second.counts.tag_values);
    assert_eq!(first.counts.wallets, second.counts.wallets);

    // replayed content is unchanged too
    let tx = db.get_gql_transaction(&b64("tx-a")).await.unwrap().unwrap();
    assert_eq!(tx.content_type.as_deref(), Some("text/html"));
    assert_eq!(tx.height, Some(10));
}

#[tokio::test]
async fn missing_transactions_get_placeholders() {
    let db = open_index().await;

    // 5 blocks, 3 of which are missing one transaction each
    for height in 1..=5u64 {
        let fetched = make_tx(&format!("tx-{height}-0"), "owner", &[]);
        let missing = if height % 2 == 1 {
            vec![b64(&format!("tx-{height}-lost"))]
        } else {
            vec![]
        };
        ingest(&db, height, vec![fetched], missing).await;
    }

    let info = db.get_debug_info().await.unwrap();
    assert_eq!(info.counts.missing_txs, 3);
    assert_eq!(info.counts.new_txs, 5);
    // associations exist for missing ids too, so listings skip them but
    // promotion will pick the transaction up once it arrives
    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 20,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.edges.len(), 5);
}

#[tokio::test]
async fn loose_transaction_has_no_block() {
    let db = open_index().await;

    db.save_tx(&make_tx("tx-loose", "owner-x", &[("Content-Type", "text/plain")]))
        .await
        .unwrap();

    let tx = db
        .get_gql_transaction(&b64("tx-loose"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.height, None);
    assert_eq!(tx.block_indep_hash, None);
    assert_eq!(tx.content_type.as_deref(), Some("text/plain"));

    // not reachable from listings until a block references it
    let page = db
        .get_gql_transactions(&GqlTransactionsArgs::default())
        .await
        .unwrap();
    assert!(page.edges.is_empty());
}

#[tokio::test]
async fn unknown_lookups_are_absent_not_errors() {
    let db = open_index().await;
    assert!(db.get_gql_transaction(&b64("nope")).await.unwrap().is_none());
    assert!(db.get_gql_block(&b64("nope")).await.unwrap().is_none());
}
