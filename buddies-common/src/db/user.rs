use async_trait::async_trait;
use diesel::sql_types::Text;
use diesel::{
    define_sql_function, BoolExpressionMethods, ExpressionMethods, OptionalExtension,
    PgTextExpressionMethods, QueryDsl,
};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{DaoError, DbAsyncPool};
use crate::directory::{
    is_same_buyer, normalize_email, normalize_username, substring_pattern, username_from_email,
    CandidateDirectory, DirectoryError,
};
use crate::models::user::User;

use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

define_sql_function! { fn lower(x: Text) -> Text; }
define_sql_function! { fn btrim(x: Text) -> Text; }
define_sql_function! {
    #[sql_name = "ltrim"]
    fn ltrim_chars(x: Text, characters: Text) -> Text;
}
define_sql_function! {
    #[sql_name = "concat_ws"]
    fn concat_with_separator(separator: Text, first: Text, second: Text) -> Text;
}

pub struct Dao {
    db_async_pool: DbAsyncPool,
}

impl Dao {
    pub fn new(db_async_pool: &DbAsyncPool) -> Self {
        Self {
            db_async_pool: db_async_pool.clone(),
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(users
            .find(user_id)
            .first::<User>(&mut conn)
            .await
            .optional()?)
    }
}

#[async_trait]
impl CandidateDirectory for Dao {
    async fn search(
        &self,
        query: &str,
        exclude_user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<User>, DirectoryError> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let caller = self.get_user(exclude_user_id).await?;
        let pattern = substring_pattern(query);

        let mut conn = self.db_async_pool.get().await.map_err(DaoError::from)?;

        let mut search_query = users
            .filter(user_fields::id.ne(exclude_user_id))
            .filter(
                user_fields::username
                    .ilike(&pattern)
                    .or(user_fields::first_name.ilike(&pattern))
                    .or(user_fields::last_name.ilike(&pattern))
                    .or(user_fields::email.ilike(&pattern))
                    .or(
                        concat_with_separator(" ", user_fields::first_name, user_fields::last_name)
                            .ilike(&pattern),
                    ),
            )
            .order(user_fields::username.asc())
            .limit(limit as i64)
            .into_boxed();

        if let Some(caller) = &caller {
            let normalized_username = lower(ltrim_chars(btrim(user_fields::username), "@"));

            search_query = search_query
                .filter(lower(btrim(user_fields::email)).ne(normalize_email(&caller.email)))
                .filter(
                    normalized_username
                        .clone()
                        .ne(normalize_username(&caller.username)),
                )
                .filter(normalized_username.ne(username_from_email(&caller.email)));
        }

        let mut results = search_query
            .load::<User>(&mut conn)
            .await
            .map_err(DaoError::from)?;

        if let Some(caller) = &caller {
            results.retain(|u| !is_same_buyer(caller, u));
        }

        Ok(results)
    }

    async fn find_buyer(&self, username_or_id: &str) -> Result<Option<User>, DirectoryError> {
        if let Ok(user_id) = Uuid::parse_str(username_or_id.trim()) {
            return Ok(self.get_user(user_id).await?);
        }

        let username = normalize_username(username_or_id);
        if username.is_empty() {
            return Ok(None);
        }

        let mut conn = self.db_async_pool.get().await.map_err(DaoError::from)?;
        Ok(users
            .filter(lower(user_fields::username).eq(username))
            .first::<User>(&mut conn)
            .await
            .optional()
            .map_err(DaoError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils;

    fn dao() -> Dao {
        Dao::new(test_utils::db_async_pool())
    }

    #[tokio::test]
    #[ignore = "requires a Postgres database"]
    async fn find_buyer_by_id_and_username() {
        let dao = dao();
        let user = test_utils::insert_user().await;

        let by_id = dao.find_buyer(&user.id.to_string()).await.unwrap();
        assert_eq!(by_id.map(|u| u.id), Some(user.id));

        let handle = format!(" @{} ", user.username.to_uppercase());
        let by_username = dao.find_buyer(&handle).await.unwrap();
        assert_eq!(by_username.map(|u| u.id), Some(user.id));

        assert!(dao
            .find_buyer(&Uuid::now_v7().to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    #[ignore = "requires a Postgres database"]
    async fn search_excludes_caller() {
        let dao = dao();
        let caller = test_utils::insert_user().await;
        let other = test_utils::insert_user().await;

        let results = dao.search("db-test-", caller.id, 1000).await.unwrap();

        assert!(results.iter().all(|u| u.id != caller.id));
        assert!(results.iter().any(|u| u.id == other.id));

        let results = dao.search("db-test-", caller.id, 1).await.unwrap();
        assert_eq!(results.len(), 1);

        assert!(dao.search("  ", caller.id, 10).await.unwrap().is_empty());
    }
    #[tokio::test]
    #[ignore = "requires a Postgres database"]
    async fn search_matches_full_name() {
        let dao = dao();
        let caller = test_utils::insert_user().await;
        let surname = format!("Okafor{}", Uuid::now_v7().simple());
        let other = test_utils::insert_user_named("Mira", &surname).await;

        let results = dao
            .search(&format!("mira {}", surname.to_lowercase()), caller.id, 10)
            .await
            .unwrap();

        assert_eq!(results.iter().map(|u| u.id).collect::<Vec<_>>(), vec![other.id]);
    }
}
