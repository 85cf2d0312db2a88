//! The paginated query engine.
//!
//! Listings run one sub-query per tier and concatenate the results in sort
//! order: descending listings take the pending tier first (the highest
//! heights live there) and lower the confirmed sub-query's `max_height` to
//! just below the last pending row so a block sitting in both tiers between
//! promotion and cleanup is not emitted twice; ascending listings do the
//! mirror image. Each sub-query fetches `page_size + 1` rows and so does
//! the concatenation, which is how `has_next_page` is decided.
//!
//! Tag filters join one alias of the tag table per requested tag; the last
//! alias drives ORDER BY, and a static selectivity table pushes the
//! broadest tags to that position. Tags of returned rows are fetched one
//! transaction at a time on purpose: it keeps the listing SQL flat and the
//! fan-out bounded when callers page through thousands of heavily tagged
//! transactions.

use sqlx::Row as _;

use weaveindex_core::cursor::{BlockCursor, TxCursor};
use weaveindex_core::encoding::{b64url_decode, b64url_encode, tag_hash};
use weaveindex_core::query::{
    GqlBlock, GqlBlocksArgs, GqlEdge, GqlPage, GqlTag, GqlTransaction, GqlTransactionsArgs,
    SortOrder, TagMatch,
};
use weaveindex_core::IndexError;

use crate::db::{bind_args, db_err, IndexDb, SqlArg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Pending,
    Stable,
}

/// Decoded, pre-hashed transaction filters shared by both sub-queries.
struct TxFilters {
    ids: Vec<Vec<u8>>,
    recipients: Vec<Vec<u8>>,
    owners: Vec<Vec<u8>>,
    min_height: i64,
    max_height: i64,
    /// `(name_hash, value_hashes)` per tag, least selective last.
    tags: Vec<(Vec<u8>, Vec<Vec<u8>>)>,
}

/// One listing row before tag hydration.
struct TxRow {
    height: i64,
    block_transaction_index: i64,
    id: Vec<u8>,
    last_tx: Vec<u8>,
    signature: Vec<u8>,
    target: Vec<u8>,
    quantity: String,
    reward: String,
    data_size: String,
    content_type: Option<String>,
    owner_address: Vec<u8>,
    block_indep_hash: Vec<u8>,
    block_timestamp: i64,
    tier: Tier,
}

struct BlockRow {
    height: i64,
    indep_hash: Vec<u8>,
    block_timestamp: i64,
    previous_block: Option<Vec<u8>>,
}

/// Rough match selectivity of well-known tag names. Higher sorts earlier in
/// the join chain; the broadest tags land last and become the sort table.
fn tag_selectivity(name: &str) -> i32 {
    match name {
        "App-Name" => -1,
        "Content-Type" => -2,
        "Unix-Time" => -3,
        _ => 0,
    }
}

fn decode_all(values: &[String]) -> Result<Vec<Vec<u8>>, IndexError> {
    values.iter().map(|v| b64url_decode(v)).collect()
}

fn placeholders(count: usize) -> String {
    let mut s = String::with_capacity(count * 3);
    for i in 0..count {
        if i > 0 {
            s.push_str(", ");
        }
        s.push('?');
    }
    s
}

fn prepare_tag_filters(tags: &[TagMatch]) -> Vec<(Vec<u8>, Vec<Vec<u8>>)> {
    let mut sorted: Vec<&TagMatch> = tags.iter().collect();
    sorted.sort_by_key(|t| std::cmp::Reverse(tag_selectivity(&t.name)));
    sorted
        .into_iter()
        .map(|t| {
            (
                tag_hash(t.name.as_bytes()),
                t.values.iter().map(|v| tag_hash(v.as_bytes())).collect(),
            )
        })
        .collect()
}

impl IndexDb {
    /// Paginated, filterable transaction listing over both tiers.
    pub async fn get_gql_transactions(
        &self,
        args: &GqlTransactionsArgs,
    ) -> Result<GqlPage<GqlTransaction>, IndexError> {
        let page_size = self.clamp_page_size(args.page_size);
        let cursor = TxCursor::decode(args.cursor.as_deref())?;
        let limit = page_size + 1;

        let mut filters = TxFilters {
            ids: decode_all(&args.ids)?,
            recipients: decode_all(&args.recipients)?,
            owners: decode_all(&args.owners)?,
            min_height: args.min_height,
            max_height: args.max_height,
            tags: prepare_tag_filters(&args.tags),
        };

        let mut rows = match args.sort_order {
            SortOrder::HeightDesc => {
                let mut rows = self
                    .fetch_tx_rows(Tier::Pending, &filters, cursor, args.sort_order, limit)
                    .await?;
                // keep the confirmed sub-query strictly below the pending
                // rows already taken
                let floor_hit = match rows.last() {
                    Some(last) if last.height == 0 => true,
                    Some(last) => {
                        filters.max_height = last.height - 1;
                        false
                    }
                    None => false,
                };
                if !floor_hit {
                    rows.extend(
                        self.fetch_tx_rows(Tier::Stable, &filters, cursor, args.sort_order, limit)
                            .await?,
                    );
                }
                rows
            }
            SortOrder::HeightAsc => {
                let mut rows = self
                    .fetch_tx_rows(Tier::Stable, &filters, cursor, args.sort_order, limit)
                    .await?;
                if let Some(last) = rows.last() {
                    filters.min_height = last.height + 1;
                }
                rows.extend(
                    self.fetch_tx_rows(Tier::Pending, &filters, cursor, args.sort_order, limit)
                        .await?,
                );
                rows
            }
        };
        rows.truncate(limit);

        let has_next_page = rows.len() > page_size;
        rows.truncate(page_size);

        let mut edges = Vec::with_capacity(rows.len());
        for row in rows {
            let cursor = TxCursor::new(row.height as u64, row.block_transaction_index as u64)
                .encode();
            let tags = self.tags_of(row.tier, &row.id).await?;
            edges.push(GqlEdge {
                cursor,
                node: gql_transaction(row, tags),
            });
        }
        Ok(GqlPage {
            has_next_page,
            edges,
        })
    }

    /// Single-transaction lookup: confirmed tier first, then pending.
    pub async fn get_gql_transaction(
        &self,
        id: &str,
    ) -> Result<Option<GqlTransaction>, IndexError> {
        let id = b64url_decode(id)?;

        let stable_sql = format!(
            "{} WHERE st.id = ? LIMIT 1",
            tx_select_from(Tier::Stable, "")
        );
        if let Some(row) = sqlx::query(&stable_sql)
            .bind(id.clone())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
        {
            let row = tx_row_from(&row, Tier::Stable);
            let tags = self.tags_of(Tier::Stable, &row.id).await?;
            return Ok(Some(gql_transaction(row, tags)));
        }

        // A loose pending transaction has no block yet, hence LEFT JOINs.
        let pending_sql = "SELECT
                nt.id AS id, nt.last_tx AS last_tx, nt.signature AS signature,
                nt.target AS target,
                CAST(nt.quantity AS TEXT) AS quantity,
                CAST(nt.reward AS TEXT) AS reward,
                CAST(nt.data_size AS TEXT) AS data_size,
                nt.content_type AS content_type, nt.owner_address AS owner_address,
                nb.indep_hash AS block_indep_hash, nb.block_timestamp AS block_timestamp,
                nbh.height AS height, nbt.block_transaction_index AS block_transaction_index
            FROM new_transactions nt
            LEFT JOIN new_block_transactions nbt ON nbt.transaction_id = nt.id
            LEFT JOIN new_block_heights nbh ON nbh.block_indep_hash = nbt.block_indep_hash
            LEFT JOIN new_blocks nb ON nb.indep_hash = nbh.block_indep_hash
            WHERE nt.id = ? LIMIT 1";
        let Some(row) = sqlx::query(pending_sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let tags = self.tags_of(Tier::Pending, &row.get::<Vec<u8>, _>("id")).await?;
        Ok(Some(GqlTransaction {
            id: b64url_encode(&row.get::<Vec<u8>, _>("id")),
            anchor: b64url_encode(&row.get::<Vec<u8>, _>("last_tx")),
            signature: b64url_encode(&row.get::<Vec<u8>, _>("signature")),
            recipient: recipient_of(&row.get::<Vec<u8>, _>("target")),
            owner_address: b64url_encode(&row.get::<Vec<u8>, _>("owner_address")),
            fee: row.get("reward"),
            quantity: row.get("quantity"),
            data_size: row.get("data_size"),
            content_type: row.get("content_type"),
            block_indep_hash: row
                .get::<Option<Vec<u8>>, _>("block_indep_hash")
                .map(|h| b64url_encode(&h)),
            block_timestamp: row
                .get::<Option<i64>, _>("block_timestamp")
                .map(|t| t as u64),
            height: row.get::<Option<i64>, _>("height").map(|h| h as u64),
            block_transaction_index: row
                .get::<Option<i64>, _>("block_transaction_index")
                .map(|i| i as u64),
            tags,
        }))
    }

    /// Paginated block listing over both tiers.
    pub async fn get_gql_blocks(
        &self,
        args: &GqlBlocksArgs,
    ) -> Result<GqlPage<GqlBlock>, IndexError> {
        let page_size = self.clamp_page_size(args.page_size);
        let cursor = BlockCursor::decode(args.cursor.as_deref())?;
        let limit = page_size + 1;
        let ids = decode_all(&args.ids)?;

        let mut min_height = args.min_height;
        let mut max_height = args.max_height;

        let mut rows = match args.sort_order {
            SortOrder::HeightDesc => {
                let mut rows = self
                    .fetch_block_rows(
                        Tier::Pending,
                        &ids,
                        min_height,
                        max_height,
                        cursor,
                        args.sort_order,
                        limit,
                    )
                    .await?;
                let floor_hit = match rows.last() {
                    Some(last) if last.height == 0 => true,
                    Some(last) => {
                        max_height = last.height - 1;
                        false
                    }
                    None => false,
                };
                if !floor_hit {
                    rows.extend(
                        self.fetch_block_rows(
                            Tier::Stable,
                            &ids,
                            min_height,
                            max_height,
                            cursor,
                            args.sort_order,
                            limit,
                        )
                        .await?,
                    );
                }
                rows
            }
            SortOrder::HeightAsc => {
                let mut rows = self
                    .fetch_block_rows(
                        Tier::Stable,
                        &ids,
                        min_height,
                        max_height,
                        cursor,
                        args.sort_order,
                        limit,
                    )
                    .await?;
                if let Some(last) = rows.last() {
                    min_height = last.height + 1;
                }
                rows.extend(
                    self.fetch_block_rows(
                        Tier::Pending,
                        &ids,
                        min_height,
                        max_height,
                        cursor,
                        args.sort_order,
                        limit,
                    )
                    .await?,
                );
                rows
            }
        };
        rows.truncate(limit);

        let has_next_page = rows.len() > page_size;
        rows.truncate(page_size);

        let edges = rows
            .into_iter()
            .map(|row| GqlEdge {
                cursor: BlockCursor::new(row.height as u64).encode(),
                node: gql_block(row),
            })
            .collect();
        Ok(GqlPage {
            has_next_page,
            edges,
        })
    }

    /// Single-block lookup by indep_hash: confirmed tier first, then pending.
    pub async fn get_gql_block(&self, id: &str) -> Result<Option<GqlBlock>, IndexError> {
        let id = b64url_decode(id)?;

        let stable = sqlx::query(
            "SELECT height, indep_hash, block_timestamp, previous_block
             FROM stable_blocks WHERE indep_hash = ? LIMIT 1",
        )
        .bind(id.clone())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        if let Some(row) = stable {
            return Ok(Some(gql_block(block_row_from(&row))));
        }

        let pending = sqlx::query(
            "SELECT nbh.height AS height, nb.indep_hash AS indep_hash,
                    nb.block_timestamp AS block_timestamp, nb.previous_block AS previous_block
             FROM new_block_heights nbh
             JOIN new_blocks nb ON nb.indep_hash = nbh.block_indep_hash
             WHERE nb.indep_hash = ? LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(pending.map(|row| gql_block(block_row_from(&row))))
    }

    fn clamp_page_size(&self, requested: usize) -> usize {
        let size = if requested == 0 {
            self.config.default_page_size
        } else {
            requested
        };
        size.min(self.config.max_page_size)
    }

    async fn fetch_tx_rows(
        &self,
        tier: Tier,
        filters: &TxFilters,
        cursor: Option<TxCursor>,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<TxRow>, IndexError> {
        let mut joins = String::new();
        let mut wheres: Vec<String> = Vec::new();
        let mut binds: Vec<SqlArg> = Vec::new();

        for (i, (name_hash, value_hashes)) in filters.tags.iter().enumerate() {
            let alias = format!("t{i}");
            let ph = placeholders(value_hashes.len());
            match tier {
                Tier::Stable => joins.push_str(&format!(
                    " JOIN stable_transaction_tags {alias}
                        ON {alias}.height = st.height
                       AND {alias}.block_transaction_index = st.block_transaction_index
                       AND {alias}.tag_name_hash = ?
                       AND {alias}.tag_value_hash IN ({ph})"
                )),
                Tier::Pending => joins.push_str(&format!(
                    " JOIN new_transaction_tags {alias}
                        ON {alias}.transaction_id = nt.id
                       AND {alias}.tag_name_hash = ?
                       AND {alias}.tag_value_hash IN ({ph})"
                )),
            }
            binds.push(SqlArg::Blob(name_hash.clone()));
            binds.extend(value_hashes.iter().cloned().map(SqlArg::Blob));
        }

        // The last joined tag alias is the sort table in the confirmed tier;
        // the pending tier always sorts through its height mapping.
        let (sort_height, sort_index) = match tier {
            Tier::Stable if !filters.tags.is_empty() => {
                let last = filters.tags.len() - 1;
                (
                    format!("t{last}.height"),
                    format!("t{last}.block_transaction_index"),
                )
            }
            Tier::Stable => ("st.height".into(), "st.block_transaction_index".into()),
            Tier::Pending => ("nbh.height".into(), "nbt.block_transaction_index".into()),
        };

        let id_col = match tier {
            Tier::Stable => "st",
            Tier::Pending => "nt",
        };
        if !filters.ids.is_empty() {
            wheres.push(format!(
                "{id_col}.id IN ({})",
                placeholders(filters.ids.len())
            ));
            binds.extend(filters.ids.iter().cloned().map(SqlArg::Blob));
        }
        if !filters.recipients.is_empty() {
            wheres.push(format!(
                "{id_col}.target IN ({})",
                placeholders(filters.recipients.len())
            ));
            binds.extend(filters.recipients.iter().cloned().map(SqlArg::Blob));
        }
        if !filters.owners.is_empty() {
            wheres.push(format!(
                "{id_col}.owner_address IN ({})",
                placeholders(filters.owners.len())
            ));
            binds.extend(filters.owners.iter().cloned().map(SqlArg::Blob));
        }
        if filters.min_height >= 0 {
            wheres.push(format!("{sort_height} >= ?"));
            binds.push(SqlArg::Int(filters.min_height));
        }
        if filters.max_height >= 0 {
            wheres.push(format!("{sort_height} <= ?"));
            binds.push(SqlArg::Int(filters.max_height));
        }
        if let Some(cursor) = cursor {
            let cmp = match order {
                SortOrder::HeightDesc => "<",
                SortOrder::HeightAsc => ">",
            };
            wheres.push(format!(
                "({sort_height} {cmp} ? OR ({sort_height} = ? AND {sort_index} {cmp} ?))"
            ));
            binds.push(SqlArg::Int(cursor.height as i64));
            binds.push(SqlArg::Int(cursor.height as i64));
            binds.push(SqlArg::Int(cursor.block_transaction_index as i64));
        }

        let where_clause = if wheres.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", wheres.join(" AND "))
        };
        let direction = match order {
            SortOrder::HeightDesc => "DESC",
            SortOrder::HeightAsc => "ASC",
        };
        let sql = format!(
            "{}{where_clause} ORDER BY {sort_height} {direction}, {sort_index} {direction} LIMIT ?",
            tx_select_from(tier, &joins)
        );
        binds.push(SqlArg::Int(limit as i64));

        let rows = bind_args(sqlx::query(&sql), &binds)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(|row| tx_row_from(row, tier)).collect())
    }

    async fn fetch_block_rows(
        &self,
        tier: Tier,
        ids: &[Vec<u8>],
        min_height: i64,
        max_height: i64,
        cursor: Option<BlockCursor>,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<BlockRow>, IndexError> {
        let (select_from, hash_col, height_col) = match tier {
            Tier::Stable => (
                "SELECT height, indep_hash, block_timestamp, previous_block FROM stable_blocks"
                    .to_string(),
                "indep_hash",
                "height",
            ),
            Tier::Pending => (
                "SELECT nbh.height AS height, nb.indep_hash AS indep_hash,
                        nb.block_timestamp AS block_timestamp, nb.previous_block AS previous_block
                 FROM new_block_heights nbh
                 JOIN new_blocks nb ON nb.indep_hash = nbh.block_indep_hash"
                    .to_string(),
                "nb.indep_hash",
                "nbh.height",
            ),
        };

        let mut wheres: Vec<String> = Vec::new();
        let mut binds: Vec<SqlArg> = Vec::new();
        if !ids.is_empty() {
            wheres.push(format!("{hash_col} IN ({})", placeholders(ids.len())));
            binds.extend(ids.iter().cloned().map(SqlArg::Blob));
        }
        if min_height >= 0 {
            wheres.push(format!("{height_col} >= ?"));
            binds.push(SqlArg::Int(min_height));
        }
        if max_height >= 0 {
            wheres.push(format!("{height_col} <= ?"));
            binds.push(SqlArg::Int(max_height));
        }
        if let Some(cursor) = cursor {
            let cmp = match order {
                SortOrder::HeightDesc => "<",
                SortOrder::HeightAsc => ">",
            };
            wheres.push(format!("{height_col} {cmp} ?"));
            binds.push(SqlArg::Int(cursor.height as i64));
        }

        let where_clause = if wheres.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", wheres.join(" AND "))
        };
        let direction = match order {
            SortOrder::HeightDesc => "DESC",
            SortOrder::HeightAsc => "ASC",
        };
        let sql =
            format!("{select_from}{where_clause} ORDER BY {height_col} {direction} LIMIT ?");
        binds.push(SqlArg::Int(limit as i64));

        let rows = bind_args(sqlx::query(&sql), &binds)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(block_row_from).collect())
    }

    /// The canonical per-transaction tag fetch, in tag order.
    async fn tags_of(&self, tier: Tier, tx_id: &[u8]) -> Result<Vec<GqlTag>, IndexError> {
        let sql = match tier {
            Tier::Stable => {
                "SELECT tn.name AS name, tv.value AS value
                 FROM stable_transaction_tags t
                 JOIN tag_names tn ON tn.hash = t.tag_name_hash
                 JOIN tag_values tv ON tv.hash = t.tag_value_hash
                 WHERE t.transaction_id = ?
                 ORDER BY t.transaction_tag_index"
            }
            Tier::Pending => {
                "SELECT tn.name AS name, tv.value AS value
                 FROM new_transaction_tags t
                 JOIN tag_names tn ON tn.hash = t.tag_name_hash
                 JOIN tag_values tv ON tv.hash = t.tag_value_hash
                 WHERE t.transaction_id = ?
                 ORDER BY t.transaction_tag_index"
            }
        };
        let rows = sqlx::query(sql)
            .bind(tx_id.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows
            .iter()
            .map(|row| GqlTag {
                name: String::from_utf8_lossy(&row.get::<Vec<u8>, _>("name")).into_owned(),
                value: String::from_utf8_lossy(&row.get::<Vec<u8>, _>("value")).into_owned(),
            })
            .collect())
    }
}

fn tx_select_from(tier: Tier, joins: &str) -> String {
    match tier {
        Tier::Stable => format!(
            "SELECT
                st.id AS id, st.last_tx AS last_tx, st.signature AS signature,
                st.target AS target,
                CAST(st.quantity AS TEXT) AS quantity,
                CAST(st.reward AS TEXT) AS reward,
                CAST(st.data_size AS TEXT) AS data_size,
                st.content_type AS content_type, st.owner_address AS owner_address,
                sb.indep_hash AS block_indep_hash, sb.block_timestamp AS block_timestamp,
                st.height AS height, st.block_transaction_index AS block_transaction_index
            FROM stable_transactions st
            JOIN stable_blocks sb ON sb.height = st.height{joins}"
        ),
        Tier::Pending => format!(
            "SELECT
                nt.id AS id, nt.last_tx AS last_tx, nt.signature AS signature,
                nt.target AS target,
                CAST(nt.quantity AS TEXT) AS quantity,
                CAST(nt.reward AS TEXT) AS reward,
                CAST(nt.data_size AS TEXT) AS data_size,
                nt.content_type AS content_type, nt.owner_address AS owner_address,
                nb.indep_hash AS block_indep_hash, nb.block_timestamp AS block_timestamp,
                nbh.height AS height, nbt.block_transaction_index AS block_transaction_index
            FROM new_transactions nt
            JOIN new_block_transactions nbt ON nbt.transaction_id = nt.id
            JOIN new_block_heights nbh ON nbh.block_indep_hash = nbt.block_indep_hash
            JOIN new_blocks nb ON nb.indep_hash = nbh.block_indep_hash{joins}"
        ),
    }
}

fn tx_row_from(row: &sqlx::sqlite::SqliteRow, tier: Tier) -> TxRow {
    TxRow {
        height: row.get("height"),
        block_transaction_index: row.get("block_transaction_index"),
        id: row.get("id"),
        last_tx: row.get("last_tx"),
        signature: row.get("signature"),
        target: row.get("target"),
        quantity: row.get("quantity"),
        reward: row.get("reward"),
        data_size: row.get("data_size"),
        content_type: row.get("content_type"),
        owner_address: row.get("owner_address"),
        block_indep_hash: row.get("block_indep_hash"),
        block_timestamp: row.get("block_timestamp"),
        tier,
    }
}

fn block_row_from(row: &sqlx::sqlite::SqliteRow) -> BlockRow {
    BlockRow {
        height: row.get("height"),
        indep_hash: row.get("indep_hash"),
        block_timestamp: row.get("block_timestamp"),
        previous_block: row.get("previous_block"),
    }
}

fn recipient_of(target: &[u8]) -> Option<String> {
    if target.is_empty() {
        None
    } else {
        Some(b64url_encode(target))
    }
}

fn gql_transaction(row: TxRow, tags: Vec<GqlTag>) -> GqlTransaction {
    GqlTransaction {
        id: b64url_encode(&row.id),
        anchor: b64url_encode(&row.last_tx),
        signature: b64url_encode(&row.signature),
        recipient: recipient_of(&row.target),
        owner_address: b64url_encode(&row.owner_address),
        fee: row.reward,
        quantity: row.quantity,
        data_size: row.data_size,
        content_type: row.content_type,
        block_indep_hash: Some(b64url_encode(&row.block_indep_hash)),
        block_timestamp: Some(row.block_timestamp as u64),
        height: Some(row.height as u64),
        block_transaction_index: Some(row.block_transaction_index as u64),
        tags,
    }
}

fn gql_block(row: BlockRow) -> GqlBlock {
    GqlBlock {
        id: b64url_encode(&row.indep_hash),
        timestamp: row.block_timestamp as u64,
        height: row.height as u64,
        previous: row.previous_block.as_deref().map(b64url_encode),
    }
}
