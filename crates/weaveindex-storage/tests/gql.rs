//! Query engine: filters, tag joins, cursors, and the two-tier union.

mod common;

use common::{b64, ingest, ingest_chain, make_tx, open_index};
use weaveindex_core::cursor::{BlockCursor, TxCursor};
use weaveindex_core::encoding::{b64url_encode, owner_address};
use weaveindex_core::{
    GqlBlocksArgs, GqlTransactionsArgs, IndexError, SortOrder, TagMatch,
};

fn png_filter() -> Vec<TagMatch> {
    vec![TagMatch {
        name: "Content-Type".into(),
        values: vec!["image/png".into()],
    }]
}

#[tokio::test]
async fn tag_filter_pages_desc_without_overlap() {
    let db = open_index().await;

    // 10 tagged transactions interleaved with untagged noise
    for height in 1..=20u64 {
        let mut txs = vec![make_tx(&format!("tx-{height}-0"), "owner", &[])];
        if height % 2 == 0 {
            txs.push(make_tx(
                &format!("tx-{height}-png"),
                "owner",
                &[("Content-Type", "image/png"), ("App-Name", "gallery")],
            ));
        }
        ingest(&db, height, txs, vec![]).await;
    }

    let mut args = GqlTransactionsArgs {
        page_size: 3,
        tags: png_filter(),
        ..Default::default()
    };

    let mut seen: Vec<(u64, u64)> = Vec::new();
    let mut pages = 0;
    loop {
        let page = db.get_gql_transactions(&args).await.unwrap();
        pages += 1;
        for edge in &page.edges {
            let key = (
                edge.node.height.unwrap(),
                edge.node.block_transaction_index.unwrap(),
            );
            seen.push(key);
            assert_eq!(edge.node.content_type.as_deref(), Some("image/png"));
        }
        if !page.has_next_page {
            break;
        }
        assert_eq!(page.edges.len(), 3);
        args.cursor = Some(page.edges.last().unwrap().cursor.clone());
    }

    assert_eq!(pages, 4); // 3 + 3 + 3 + 1
    assert_eq!(seen.len(), 10);
    // strictly decreasing (height, index), every row exactly once
    for pair in seen.windows(2) {
        assert!(pair[0] > pair[1], "expected strict descent: {pair:?}");
    }
    assert_eq!(seen.first(), Some(&(20, 1)));
    assert_eq!(seen.last(), Some(&(2, 1)));
}

#[tokio::test]
async fn multiple_tags_and_across_values_or_within() {
    let db = open_index().await;

    ingest(
        &db,
        1,
        vec![
            make_tx("tx-png-app", "owner", &[("Content-Type", "image/png"), ("App-Name", "gallery")]),
            make_tx("tx-png-only", "owner", &[("Content-Type", "image/png")]),
            make_tx("tx-jpg-app", "owner", &[("Content-Type", "image/jpeg"), ("App-Name", "gallery")]),
        ],
        vec![],
    )
    .await;

    // values OR within one tag
    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 10,
            tags: vec![TagMatch {
                name: "Content-Type".into(),
                values: vec!["image/png".into(), "image/jpeg".into()],
            }],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.edges.len(), 3);

    // tags AND across
    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 10,
            tags: vec![
                TagMatch {
                    name: "Content-Type".into(),
                    values: vec!["image/png".into()],
                },
                TagMatch {
                    name: "App-Name".into(),
                    values: vec!["gallery".into()],
                },
            ],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.edges.len(), 1);
    assert_eq!(page.edges[0].node.id, b64("tx-png-app"));
}

#[tokio::test]
async fn union_returns_pending_then_confirmed_desc() {
    let db = open_index().await;
    ingest_chain(&db, 1, 60).await;
    db.flush_stable(30).await.unwrap(); // confirmed 1..=29, pending 30..=60

    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 100,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!page.has_next_page);
    assert_eq!(page.edges.len(), 60);

    let heights: Vec<u64> = page.edges.iter().map(|e| e.node.height.unwrap()).collect();
    for pair in heights.windows(2) {
        assert!(pair[0] > pair[1], "expected strict descent: {pair:?}");
    }
    assert_eq!(heights.first(), Some(&60));
    assert_eq!(heights.last(), Some(&1));
}

#[tokio::test]
async fn union_page_straddles_the_tier_boundary() {
    let db = open_index().await;
    ingest_chain(&db, 1, 40).await;
    db.flush_stable(35).await.unwrap(); // confirmed 1..=34, pending 35..=40

    // page of 10 takes pending 40..35, then confirmed 34..31
    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(page.has_next_page);
    let heights: Vec<u64> = page.edges.iter().map(|e| e.node.height.unwrap()).collect();
    assert_eq!(heights, vec![40, 39, 38, 37, 36, 35, 34, 33, 32, 31]);

    // and the next page continues into the confirmed tier without overlap
    let next = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 10,
            cursor: Some(page.edges.last().unwrap().cursor.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    let next_heights: Vec<u64> = next.edges.iter().map(|e| e.node.height.unwrap()).collect();
    assert_eq!(next_heights, vec![30, 29, 28, 27, 26, 25, 24, 23, 22, 21]);
}

#[tokio::test]
async fn asc_order_returns_confirmed_then_pending() {
    let db = open_index().await;
    ingest_chain(&db, 1, 30).await;
    db.flush_stable(20).await.unwrap();

    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 100,
            sort_order: SortOrder::HeightAsc,
            ..Default::default()
        })
        .await
        .unwrap();
    let heights: Vec<u64> = page.edges.iter().map(|e| e.node.height.unwrap()).collect();
    assert_eq!(heights, (1..=30).collect::<Vec<_>>());
}

#[tokio::test]
async fn emitted_cursors_roundtrip() {
    let db = open_index().await;
    ingest_chain(&db, 1, 5).await;

    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 5,
            ..Default::default()
        })
        .await
        .unwrap();
    for edge in &page.edges {
        let decoded = TxCursor::decode(Some(&edge.cursor)).unwrap().unwrap();
        assert_eq!(decoded.encode(), edge.cursor);
        assert_eq!(Some(decoded.height), edge.node.height);
    }

    let blocks = db
        .get_gql_blocks(&GqlBlocksArgs {
            page_size: 5,
            ..Default::default()
        })
        .await
        .unwrap();
    for edge in &blocks.edges {
        let decoded = BlockCursor::decode(Some(&edge.cursor)).unwrap().unwrap();
        assert_eq!(decoded.encode(), edge.cursor);
        assert_eq!(decoded.height, edge.node.height);
    }
}

#[tokio::test]
async fn bad_cursor_is_a_validation_error() {
    let db = open_index().await;
    let result = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 5,
            cursor: Some("123".into()),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(IndexError::BadCursor(_))));
}

#[tokio::test]
async fn id_owner_recipient_filters() {
    let db = open_index().await;

    let mut alice_pays_bob = make_tx("tx-pay", "alice", &[]);
    alice_pays_bob.target = b64("bob-wallet");
    let other = make_tx("tx-other", "carol", &[]);
    ingest(&db, 1, vec![alice_pays_bob, other], vec![]).await;

    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 10,
            ids: vec![b64("tx-pay")],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.edges.len(), 1);
    assert_eq!(page.edges[0].node.recipient.as_deref(), Some(b64("bob-wallet").as_str()));

    let owner = b64url_encode(&owner_address(b"alice"));
    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 10,
            owners: vec![owner.clone()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.edges.len(), 1);
    assert_eq!(page.edges[0].node.owner_address, owner);

    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 10,
            recipients: vec![b64("bob-wallet")],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.edges.len(), 1);
    assert_eq!(page.edges[0].node.id, b64("tx-pay"));
}

#[tokio::test]
async fn height_range_is_inclusive() {
    let db = open_index().await;
    ingest_chain(&db, 1, 10).await;

    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 20,
            min_height: 3,
            max_height: 7,
            sort_order: SortOrder::HeightAsc,
            ..Default::default()
        })
        .await
        .unwrap();
    let heights: Vec<u64> = page.edges.iter().map(|e| e.node.height.unwrap()).collect();
    assert_eq!(heights, vec![3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn block_listing_and_lookup() {
    let db = open_index().await;
    ingest_chain(&db, 1, 25).await;
    db.flush_stable(10).await.unwrap(); // confirmed 1..=9, pending 10..=25

    let page = db
        .get_gql_blocks(&GqlBlocksArgs {
            page_size: 100,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.edges.len(), 25);
    let heights: Vec<u64> = page.edges.iter().map(|e| e.node.height).collect();
    assert_eq!(heights.first(), Some(&25));
    assert_eq!(heights.last(), Some(&1));
    for pair in heights.windows(2) {
        assert!(pair[0] > pair[1]);
    }

    // exclusive block cursor
    let third = &page.edges[2];
    let after = db
        .get_gql_blocks(&GqlBlocksArgs {
            page_size: 3,
            cursor: Some(third.cursor.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(after.edges[0].node.height, third.node.height - 1);

    // id filter hits both tiers
    let page = db
        .get_gql_blocks(&GqlBlocksArgs {
            page_size: 10,
            ids: vec![b64("block-5"), b64("block-20")],
            ..Default::default()
        })
        .await
        .unwrap();
    let heights: Vec<u64> = page.edges.iter().map(|e| e.node.height).collect();
    assert_eq!(heights, vec![20, 5]);

    // single lookups: confirmed first, then pending
    let confirmed = db.get_gql_block(&b64("block-5")).await.unwrap().unwrap();
    assert_eq!(confirmed.height, 5);
    assert_eq!(confirmed.previous.as_deref(), Some(b64("block-4").as_str()));
    let pending = db.get_gql_block(&b64("block-20")).await.unwrap().unwrap();
    assert_eq!(pending.height, 20);
}

#[tokio::test]
async fn page_size_is_clamped() {
    let db = open_index().await;
    ingest_chain(&db, 1, 120).await;

    // zero falls back to the default page size
    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 0,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.edges.len(), 10);
    assert!(page.has_next_page);

    // oversized requests are capped
    let page = db
        .get_gql_transactions(&GqlTransactionsArgs {
            page_size: 5000,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.edges.len(), 100);
    assert!(page.has_next_page);
}
