use async_trait::async_trait;
use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbAsyncPool};
use crate::models::buddy_request::{
    BuddyRequest, BuddyRequestStatus, BuddyRequestStatusChange, NewBuddyRequest,
};
use crate::store::{
    InsertedRequest, OpenRequest, RelationshipStore, StatusTransition, StoreError,
};

use crate::schema::buddy_requests as buddy_request_fields;
use crate::schema::buddy_requests::dsl::buddy_requests;

pub struct Dao {
    db_async_pool: DbAsyncPool,
}

impl Dao {
    pub fn new(db_async_pool: &DbAsyncPool) -> Self {
        Self {
            db_async_pool: db_async_pool.clone(),
        }
    }
}

#[async_trait]
impl RelationshipStore for Dao {
    async fn get(&self, request_id: Uuid) -> Result<BuddyRequest, StoreError> {
        let mut conn = self.db_async_pool.get().await.map_err(DaoError::from)?;
        Ok(buddy_requests
            .find(request_id)
            .first::<BuddyRequest>(&mut conn)
            .await?)
    }

    async fn insert_open_request(
        &self,
        request: OpenRequest,
        now: SystemTime,
    ) -> Result<InsertedRequest, StoreError> {
        let joiner_id = request.joiner_id;
        let mut db_connection = self.db_async_pool.get().await.map_err(DaoError::from)?;

        // Eligibility failures are returned as the inner error so the read-only transaction
        // still commits; query failures roll it back.
        let outcome = db_connection
            .build_transaction()
            .serializable()
            .run::<_, DaoError, _>(|conn| {
                Box::pin(async move {
                    let joiner_rows = buddy_requests
                        .filter(buddy_request_fields::joiner_id.eq(request.joiner_id))
                        .filter(buddy_request_fields::status.eq_any(BuddyRequestStatus::OPEN))
                        .load::<BuddyRequest>(conn)
                        .await?;

                    let mut lapsed_ids = Vec::new();
                    for row in joiner_rows {
                        if !row.is_lapsed_at(now) {
                            return Ok(Err(StoreError::JoinerHasOpenRequest(row)));
                        }

                        lapsed_ids.push(row.id);
                    }

                    let joiner_is_receiving = buddy_requests
                        .filter(buddy_request_fields::receiver_id.eq(request.joiner_id))
                        .filter(buddy_request_fields::status.eq_any(BuddyRequestStatus::OPEN))
                        .load::<BuddyRequest>(conn)
                        .await?
                        .iter()
                        .any(|r| r.is_active_at(now));

                    if joiner_is_receiving {
                        return Ok(Err(StoreError::JoinerIsReceiving));
                    }

                    let receiver_is_joining = buddy_requests
                        .filter(buddy_request_fields::joiner_id.eq(request.receiver_id))
                        .filter(buddy_request_fields::status.eq_any(BuddyRequestStatus::OPEN))
                        .load::<BuddyRequest>(conn)
                        .await?
                        .iter()
                        .any(|r| r.is_active_at(now));

                    if receiver_is_joining {
                        return Ok(Err(StoreError::ReceiverIsJoining));
                    }

                    let closed_lapsed = if lapsed_ids.is_empty() {
                        Vec::new()
                    } else {
                        dsl::update(
                            buddy_requests.filter(buddy_request_fields::id.eq_any(&lapsed_ids)),
                        )
                        .set((
                            buddy_request_fields::status.eq(BuddyRequestStatus::Cancelled),
                            buddy_request_fields::modified_timestamp.eq(now),
                        ))
                        .get_results::<BuddyRequest>(conn)
                        .await?
                    };

                    let new_request = NewBuddyRequest {
                        id: Uuid::now_v7(),
                        joiner_id: request.joiner_id,
                        receiver_id: request.receiver_id,
                        status: BuddyRequestStatus::Pending,
                        created_timestamp: now,
                        modified_timestamp: now,
                        cutoff_date: Some(request.cutoff_date),
                        order_count: 0,
                        shipping_address_snapshot: Some(&request.shipping_address),
                    };

                    dsl::insert_into(buddy_requests)
                        .values(&new_request)
                        .execute(conn)
                        .await?;

                    Ok(Ok(InsertedRequest {
                        request: BuddyRequest::from(&new_request),
                        closed_lapsed,
                    }))
                })
            })
            .await;

        match outcome {
            Ok(result) => result,
            // A concurrent submit for the same joiner won the race on the open-request index
            Err(e) if e.is_unique_violation() => {
                match self.open_request_for_joiner(joiner_id).await? {
                    Some(existing) => Err(StoreError::JoinerHasOpenRequest(existing)),
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn transition(
        &self,
        transition: StatusTransition,
        now: SystemTime,
    ) -> Result<BuddyRequest, StoreError> {
        let mut db_connection = self.db_async_pool.get().await.map_err(DaoError::from)?;

        db_connection
            .build_transaction()
            .serializable()
            .run::<_, DaoError, _>(|conn| {
                Box::pin(async move {
                    let current = buddy_requests
                        .find(transition.request_id)
                        .for_update()
                        .first::<BuddyRequest>(conn)
                        .await
                        .optional()?;

                    let Some(current) = current else {
                        return Ok(Err(StoreError::NotFound));
                    };

                    if current.status != transition.from {
                        return Ok(Err(StoreError::StatusMismatch(current)));
                    }

                    if transition.require_receiver_unattached {
                        let receiver_is_joining = buddy_requests
                            .filter(buddy_request_fields::joiner_id.eq(current.receiver_id))
                            .filter(
                                buddy_request_fields::status.eq_any(BuddyRequestStatus::OPEN),
                            )
                            .load::<BuddyRequest>(conn)
                            .await?
                            .iter()
                            .any(|r| r.is_active_at(now));

                        if receiver_is_joining {
                            return Ok(Err(StoreError::ReceiverIsJoining));
                        }
                    }

                    let change = BuddyRequestStatusChange {
                        status: transition.to,
                        modified_timestamp: now,
                        cutoff_date: transition.cutoff_date,
                        shipping_address_snapshot: transition.shipping_address.as_deref(),
                    };

                    let updated = dsl::update(
                        buddy_requests
                            .find(transition.request_id)
                            .filter(buddy_request_fields::status.eq(transition.from)),
                    )
                    .set(&change)
                    .get_result::<BuddyRequest>(conn)
                    .await?;

                    Ok(Ok(updated))
                })
            })
            .await?
    }

    async fn open_request_for_joiner(
        &self,
        joiner_id: Uuid,
    ) -> Result<Option<BuddyRequest>, StoreError> {
        let mut conn = self.db_async_pool.get().await.map_err(DaoError::from)?;
        Ok(buddy_requests
            .filter(buddy_request_fields::joiner_id.eq(joiner_id))
            .filter(buddy_request_fields::status.eq_any(BuddyRequestStatus::OPEN))
            .first::<BuddyRequest>(&mut conn)
            .await
            .optional()?)
    }

    async fn open_requests_for_receiver(
        &self,
        receiver_id: Uuid,
    ) -> Result<Vec<BuddyRequest>, StoreError> {
        let mut conn = self.db_async_pool.get().await.map_err(DaoError::from)?;
        Ok(buddy_requests
            .filter(buddy_request_fields::receiver_id.eq(receiver_id))
            .filter(buddy_request_fields::status.eq_any(BuddyRequestStatus::OPEN))
            .order((
                buddy_request_fields::created_timestamp.asc(),
                buddy_request_fields::id.asc(),
            ))
            .load::<BuddyRequest>(&mut conn)
            .await?)
    }

    async fn set_order_count(&self, request_id: Uuid, order_count: i32) -> Result<(), StoreError> {
        let mut conn = self.db_async_pool.get().await.map_err(DaoError::from)?;
        let affected_row_count = dsl::update(buddy_requests.find(request_id))
            .set(buddy_request_fields::order_count.eq(order_count))
            .execute(&mut conn)
            .await?;

        if affected_row_count != 1 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn history_for_user(&self, user_id: Uuid) -> Result<Vec<BuddyRequest>, StoreError> {
        let mut conn = self.db_async_pool.get().await.map_err(DaoError::from)?;
        Ok(buddy_requests
            .filter(
                buddy_request_fields::joiner_id
                    .eq(user_id)
                    .or(buddy_request_fields::receiver_id.eq(user_id)),
            )
            .order((
                buddy_request_fields::created_timestamp.desc(),
                buddy_request_fields::id.desc(),
            ))
            .load::<BuddyRequest>(&mut conn)
            .await?)
    }
}
