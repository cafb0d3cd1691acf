use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::QueryBuilder;
use time::PrimitiveDateTime;

/// One row of the sale history.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Sale {
    pub id: i64,
    pub chain_id: String,
    pub collection: String,
    pub currency: String,
    pub buyer_address: String,
    pub seller_address: String,
    pub token_id: i64,
    pub amount: Decimal,
    pub sale_date: PrimitiveDateTime,
}

/// Filters for the sale history read path. `participant` matches
/// either side of the trade.
#[derive(Debug, Clone)]
pub struct SaleFilter {
    pub chain_id: Option<String>,
    pub collection: Option<String>,
    pub token_id: Option<i64>,
    pub participant: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for SaleFilter {
    fn default() -> Self {
        Self {
            chain_id: None,
            collection: None,
            token_id: None,
            participant: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// A confirmed on-chain trade of a position, as decoded from a
/// settlement event.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub chain_id: String,
    pub buyer: String,
    pub seller: String,
    pub nonce: i64,
    pub token_id: i64,
    pub collection: String,
    pub currency: String,
    pub amount: Decimal,
}

impl Settlement {
    pub fn normalized(mut self) -> Self {
        self.chain_id = self.chain_id.to_lowercase();
        self.buyer = self.buyer.to_lowercase();
        self.seller = self.seller.to_lowercase();
        self.collection = self.collection.to_lowercase();
        self.currency = self.currency.to_lowercase();
        self
    }
}

#[derive(Debug, Clone)]
/// Record a settlement in the sale history.
pub struct InsertSale {
    pub settlement: Settlement,
    pub date: PrimitiveDateTime,
}

impl Processor<InsertSale> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertSale")]
    async fn process(&self, insert: InsertSale) -> Result<(), sqlx::Error> {
        let s = insert.settlement;
        sqlx::query(
            r#"
            INSERT INTO sales
                (chain_id, collection, currency, buyer_address, seller_address,
                 token_id, amount, sale_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(s.chain_id)
        .bind(s.collection)
        .bind(s.currency)
        .bind(s.buyer)
        .bind(s.seller)
        .bind(s.token_id)
        .bind(s.amount)
        .bind(insert.date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Filtered, paginated sale history, newest first.
pub struct ListSales {
    pub filter: SaleFilter,
}

impl Processor<ListSales> for DatabaseProcessor {
    type Output = Vec<Sale>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListSales")]
    async fn process(&self, query: ListSales) -> Result<Vec<Sale>, sqlx::Error> {
        let f = query.filter;
        let mut qb = QueryBuilder::new("SELECT * FROM sales WHERE TRUE");
        if let Some(chain_id) = f.chain_id {
            qb.push(" AND chain_id = ");
            qb.push_bind(chain_id.to_lowercase());
        }
        if let Some(collection) = f.collection {
            qb.push(" AND collection = ");
            qb.push_bind(collection.to_lowercase());
        }
        if let Some(token_id) = f.token_id {
            qb.push(" AND token_id = ");
            qb.push_bind(token_id);
        }
        if let Some(participant) = f.participant {
            let participant = participant.to_lowercase();
            qb.push(" AND (buyer_address = ");
            qb.push_bind(participant.clone());
            qb.push(" OR seller_address = ");
            qb.push_bind(participant);
            qb.push(")");
        }
        qb.push(" ORDER BY sale_date DESC, id DESC LIMIT ");
        qb.push_bind(f.limit.clamp(1, 1000));
        qb.push(" OFFSET ");
        qb.push_bind(f.offset.max(0));

        qb.build_query_as::<Sale>().fetch_all(&self.pool).await
    }
}
