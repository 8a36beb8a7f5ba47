use crate::error::AppError;
use crate::models::{Comment, CreateUserRequest, DEFAULT_ROLE, NewProduct, Product, ProductStatus, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Outcome of a one-per-user append (upvote, report).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The identity was appended; carries the new vote count.
    Recorded(i64),
    /// The identity was already present. Nothing changed.
    Duplicate,
    /// No product with that id.
    Missing,
}

/// Outcome of a tag append on an existing product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOutcome {
    /// False when an equal tag was already stored.
    pub added: bool,
    pub tags: Vec<String>,
}

/// Outcome of find-or-create on sign-in.
#[derive(Debug, Clone)]
pub enum UserUpsert {
    Created(User),
    Existing(User),
}

/// Repository Trait
///
/// The persistence contract used by every handler. Each method is a single
/// store round-trip (or a single atomic statement followed by a read), so no
/// operation can leave a document half-updated.
///
/// **Send + Sync + async_trait** are required to share `Arc<dyn Repository>`
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Product Retrieval ---
    /// Accepted products matching `search` (case-insensitive substring of the name),
    /// newest first, skipping `offset` and returning at most `limit`. Returns the
    /// page and the total match count. Both bounds are non-negative.
    async fn accepted_page(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Product>, i64), AppError>;
    // Moderation queue: every product regardless of status, newest first.
    async fn all_products(&self) -> Result<Vec<Product>, AppError>;
    // Accepted and featured, newest first.
    async fn featured_products(&self, limit: i64) -> Result<Vec<Product>, AppError>;
    // Accepted, highest vote count first.
    async fn trending_products(&self, limit: i64) -> Result<Vec<Product>, AppError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, AppError>;
    async fn products_by_owner(&self, email: &str) -> Result<Vec<Product>, AppError>;
    // Products with at least one report, newest first.
    async fn reported_products(&self) -> Result<Vec<Product>, AppError>;
    // `None` counts every product.
    async fn count_products(&self, status: Option<ProductStatus>) -> Result<i64, AppError>;

    // --- Product Actions ---
    async fn insert_product(&self, product: NewProduct) -> Result<Product, AppError>;
    async fn set_status(&self, id: Uuid, status: ProductStatus) -> Result<Option<Product>, AppError>;
    async fn mark_featured(&self, id: Uuid) -> Result<Option<Product>, AppError>;
    // Physical delete. False when the id was absent.
    async fn delete_product(&self, id: Uuid) -> Result<bool, AppError>;
    /// Atomically increments `votes` and appends `voter` to `votedUsers`, unless
    /// the voter is already present.
    async fn upvote(&self, id: Uuid, voter: &str) -> Result<VoteOutcome, AppError>;
    // False when the id was absent.
    async fn push_comment(&self, id: Uuid, comment: Comment) -> Result<bool, AppError>;
    /// Appends an already-normalized tag unless an equal one (case-insensitively)
    /// exists. `None` when the id was absent.
    async fn add_tag(&self, id: Uuid, tag: &str) -> Result<Option<TagOutcome>, AppError>;
    // One report per reporter; `Recorded` carries the new report count.
    async fn report(&self, id: Uuid, reporter: &str) -> Result<VoteOutcome, AppError>;

    // --- Users ---
    async fn find_user(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn insert_user_if_absent(&self, req: CreateUserRequest) -> Result<UserUpsert, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    /// Sets the role verbatim. Returns how many records actually changed.
    async fn update_role(&self, email: &str, role: &str) -> Result<u64, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// like_pattern
///
/// Wraps `search` in `%` for a substring match and escapes the LIKE
/// metacharacters (`%`, `_`, `\`) so they only ever match literally.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn non_empty(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

const PRODUCT_COLUMNS: &str = r#"
    id, name, category, description, long_description, features, video_url, video_file,
    images, website_url, pricing_type, owner_name, owner_image, owner_email, tags, votes,
    voted_users, comments, reports, status, is_featured, created_at
"#;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn select_products() -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"))
    }

    async fn fetch_products(
        &self,
        mut builder: QueryBuilder<'_, Postgres>,
        op: &'static str,
    ) -> Result<Vec<Product>, AppError> {
        builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("{} error: {:?}", op, e);
                AppError::from(e)
            })
    }

    async fn product_exists(&self, id: Uuid) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// accepted_page
    ///
    /// Builds the filter once per query with QueryBuilder so the search string is
    /// always a bound parameter.
    async fn accepted_page(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let pattern = non_empty(search).map(like_pattern);

        let mut builder = Self::select_products();
        builder.push(" WHERE status = 'Accepted'");
        if let Some(p) = &pattern {
            builder.push(" AND name ILIKE ");
            builder.push_bind(p.clone());
        }
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);
        let products = self.fetch_products(builder, "accepted_page").await?;

        let mut counter: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM products WHERE status = 'Accepted'");
        if let Some(p) = pattern {
            counter.push(" AND name ILIKE ");
            counter.push_bind(p);
        }
        let total = counter
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((products, total))
    }

    async fn all_products(&self) -> Result<Vec<Product>, AppError> {
        let mut builder = Self::select_products();
        builder.push(" ORDER BY created_at DESC");
        self.fetch_products(builder, "all_products").await
    }

    async fn featured_products(&self, limit: i64) -> Result<Vec<Product>, AppError> {
        let mut builder = Self::select_products();
        builder.push(" WHERE status = 'Accepted' AND is_featured = true ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        self.fetch_products(builder, "featured_products").await
    }

    async fn trending_products(&self, limit: i64) -> Result<Vec<Product>, AppError> {
        let mut builder = Self::select_products();
        builder.push(" WHERE status = 'Accepted' ORDER BY votes DESC, created_at DESC LIMIT ");
        builder.push_bind(limit);
        self.fetch_products(builder, "trending_products").await
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let mut builder = Self::select_products();
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        let product = builder
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn products_by_owner(&self, email: &str) -> Result<Vec<Product>, AppError> {
        let mut builder = Self::select_products();
        builder.push(" WHERE owner_email = ");
        builder.push_bind(email.to_string());
        builder.push(" ORDER BY created_at DESC");
        self.fetch_products(builder, "products_by_owner").await
    }

    async fn reported_products(&self) -> Result<Vec<Product>, AppError> {
        let mut builder = Self::select_products();
        builder.push(" WHERE cardinality(reports) > 0 ORDER BY created_at DESC");
        self.fetch_products(builder, "reported_products").await
    }

    async fn count_products(&self, status: Option<ProductStatus>) -> Result<i64, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM products");
        if let Some(s) = status {
            builder.push(" WHERE status = ");
            builder.push_bind(s.as_str());
        }
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// insert_product
    ///
    /// Engagement columns are left to their defaults (empty / zero / Pending).
    async fn insert_product(&self, product: NewProduct) -> Result<Product, AppError> {
        let sql = format!(
            r#"INSERT INTO products (
                id, name, category, description, long_description, features, video_url,
                video_file, images, website_url, pricing_type, owner_name, owner_image,
                owner_email, tags
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {PRODUCT_COLUMNS}"#
        );

        let created = sqlx::query_as::<_, Product>(&sql)
            .bind(Uuid::new_v4())
            .bind(product.name)
            .bind(product.category)
            .bind(product.description)
            .bind(product.long_description)
            .bind(product.features)
            .bind(product.video_url)
            .bind(product.video_file)
            .bind(product.images)
            .bind(product.website_url)
            .bind(product.pricing_type.as_str())
            .bind(product.owner_name)
            .bind(product.owner_image)
            .bind(product.owner_email)
            .bind(product.tags)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("insert_product error: {:?}", e);
                AppError::from(e)
            })?;
        Ok(created)
    }

    async fn set_status(&self, id: Uuid, status: ProductStatus) -> Result<Option<Product>, AppError> {
        let sql = format!("UPDATE products SET status = $2 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}");
        let updated = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn mark_featured(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let sql =
            format!("UPDATE products SET is_featured = true WHERE id = $1 RETURNING {PRODUCT_COLUMNS}");
        let updated = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// upvote
    ///
    /// The membership guard lives in the same UPDATE as the increment, so two
    /// concurrent votes by one identity serialize on the row lock and the second
    /// matches zero rows.
    async fn upvote(&self, id: Uuid, voter: &str) -> Result<VoteOutcome, AppError> {
        let votes = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE products
            SET votes = votes + 1, voted_users = array_append(voted_users, $2)
            WHERE id = $1 AND NOT ($2 = ANY(voted_users))
            RETURNING votes
            "#,
        )
        .bind(id)
        .bind(voter)
        .fetch_optional(&self.pool)
        .await?;

        match votes {
            Some(v) => Ok(VoteOutcome::Recorded(v)),
            None if self.product_exists(id).await? => Ok(VoteOutcome::Duplicate),
            None => Ok(VoteOutcome::Missing),
        }
    }

    async fn push_comment(&self, id: Uuid, comment: Comment) -> Result<bool, AppError> {
        let res = sqlx::query(
            "UPDATE products SET comments = comments || jsonb_build_array($2::jsonb) WHERE id = $1",
        )
        .bind(id)
        .bind(Json(comment))
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn add_tag(&self, id: Uuid, tag: &str) -> Result<Option<TagOutcome>, AppError> {
        let appended = sqlx::query_scalar::<_, Vec<String>>(
            r#"
            UPDATE products
            SET tags = array_append(tags, $2)
            WHERE id = $1
              AND NOT EXISTS (SELECT 1 FROM unnest(tags) AS t(tag) WHERE lower(t.tag) = $2)
            RETURNING tags
            "#,
        )
        .bind(id)
        .bind(tag)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(tags) = appended {
            return Ok(Some(TagOutcome { added: true, tags }));
        }

        let existing = sqlx::query_scalar::<_, Vec<String>>("SELECT tags FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(existing.map(|tags| TagOutcome { added: false, tags }))
    }

    async fn report(&self, id: Uuid, reporter: &str) -> Result<VoteOutcome, AppError> {
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET reports = array_append(reports, $2)
            WHERE id = $1 AND NOT ($2 = ANY(reports))
            RETURNING cardinality(reports)
            "#,
        )
        .bind(id)
        .bind(reporter)
        .fetch_optional(&self.pool)
        .await?;

        match count {
            Some(c) => Ok(VoteOutcome::Recorded(i64::from(c))),
            None if self.product_exists(id).await? => Ok(VoteOutcome::Duplicate),
            None => Ok(VoteOutcome::Missing),
        }
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, photo, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// insert_user_if_absent
    ///
    /// `ON CONFLICT (email) DO NOTHING` makes find-or-create a single statement;
    /// the follow-up read only happens when the user already existed.
    async fn insert_user_if_absent(&self, req: CreateUserRequest) -> Result<UserUpsert, AppError> {
        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, photo, role) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, name, email, photo, role
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(&req.email)
        .bind(req.photo)
        .bind(DEFAULT_ROLE)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(user) => Ok(UserUpsert::Created(user)),
            None => self
                .find_user(&req.email)
                .await?
                .map(UserUpsert::Existing)
                .ok_or_else(|| AppError::Store(format!("user {} vanished after conflict", req.email))),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>("SELECT id, name, email, photo, role FROM users")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update_role(&self, email: &str, role: &str) -> Result<u64, AppError> {
        let res = sqlx::query("UPDATE users SET role = $2 WHERE email = $1 AND role <> $2")
            .bind(email)
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

/// MemoryRepository
///
/// An in-process implementation with the same semantics as `PostgresRepository`.
/// Every mutation happens under a single write lock, which gives the upvote and
/// tag operations the same atomicity as the SQL statements. Used by the test-suite.
#[derive(Default)]
pub struct MemoryRepository {
    // Insertion order; newest-first views are derived on read.
    products: RwLock<Vec<Product>>,
    users: RwLock<Vec<User>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed record as-is, bypassing validation and engagement reset.
    pub async fn seed_product(&self, product: Product) {
        self.products.write().await.push(product);
    }

    async fn select<F>(&self, keep: F) -> Vec<Product>
    where
        F: Fn(&Product) -> bool + Send,
    {
        let products = self.products.read().await;
        // Reverse first so the stable sort keeps later inserts ahead on equal timestamps.
        let mut out: Vec<Product> = products.iter().rev().filter(|p| keep(*p)).cloned().collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }
}

fn take(products: Vec<Product>, limit: i64) -> Vec<Product> {
    products
        .into_iter()
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect()
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn accepted_page(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let needle = non_empty(search).map(str::to_lowercase);
        let matching = self
            .select(|p| {
                p.status == ProductStatus::Accepted
                    && needle
                        .as_deref()
                        .is_none_or(|n| p.name.to_lowercase().contains(n))
            })
            .await;

        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let page = take(matching.into_iter().skip(skip).collect(), limit);
        Ok((page, total))
    }

    async fn all_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.select(|_| true).await)
    }

    async fn featured_products(&self, limit: i64) -> Result<Vec<Product>, AppError> {
        let featured = self
            .select(|p| p.status == ProductStatus::Accepted && p.is_featured)
            .await;
        Ok(take(featured, limit))
    }

    async fn trending_products(&self, limit: i64) -> Result<Vec<Product>, AppError> {
        let mut accepted = self.select(|p| p.status == ProductStatus::Accepted).await;
        accepted.sort_by(|a, b| b.votes.cmp(&a.votes));
        Ok(take(accepted, limit))
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn products_by_owner(&self, email: &str) -> Result<Vec<Product>, AppError> {
        Ok(self.select(|p| p.owner_email == email).await)
    }

    async fn reported_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.select(|p| !p.reports.is_empty()).await)
    }

    async fn count_products(&self, status: Option<ProductStatus>) -> Result<i64, AppError> {
        let products = self.products.read().await;
        let count = products
            .iter()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, AppError> {
        let created = product.into_product(Uuid::new_v4(), Utc::now());
        self.products.write().await.push(created.clone());
        Ok(created)
    }

    async fn set_status(&self, id: Uuid, status: ProductStatus) -> Result<Option<Product>, AppError> {
        let mut products = self.products.write().await;
        Ok(products.iter_mut().find(|p| p.id == id).map(|p| {
            p.status = status;
            p.clone()
        }))
    }

    async fn mark_featured(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let mut products = self.products.write().await;
        Ok(products.iter_mut().find(|p| p.id == id).map(|p| {
            p.is_featured = true;
            p.clone()
        }))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, AppError> {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() < before)
    }

    async fn upvote(&self, id: Uuid, voter: &str) -> Result<VoteOutcome, AppError> {
        let mut products = self.products.write().await;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(VoteOutcome::Missing);
        };
        if product.voted_users.iter().any(|v| v == voter) {
            return Ok(VoteOutcome::Duplicate);
        }
        product.votes += 1;
        product.voted_users.push(voter.to_string());
        Ok(VoteOutcome::Recorded(product.votes))
    }

    async fn push_comment(&self, id: Uuid, comment: Comment) -> Result<bool, AppError> {
        let mut products = self.products.write().await;
        match products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.comments.push(comment);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_tag(&self, id: Uuid, tag: &str) -> Result<Option<TagOutcome>, AppError> {
        let mut products = self.products.write().await;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        let exists = product.tags.iter().any(|t| t.to_lowercase() == tag);
        if !exists {
            product.tags.push(tag.to_string());
        }
        Ok(Some(TagOutcome {
            added: !exists,
            tags: product.tags.clone(),
        }))
    }

    async fn report(&self, id: Uuid, reporter: &str) -> Result<VoteOutcome, AppError> {
        let mut products = self.products.write().await;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(VoteOutcome::Missing);
        };
        if product.reports.iter().any(|r| r == reporter) {
            return Ok(VoteOutcome::Duplicate);
        }
        product.reports.push(reporter.to_string());
        Ok(VoteOutcome::Recorded(
            i64::try_from(product.reports.len()).unwrap_or(i64::MAX),
        ))
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user_if_absent(&self, req: CreateUserRequest) -> Result<UserUpsert, AppError> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.iter().find(|u| u.email == req.email) {
            return Ok(UserUpsert::Existing(existing.clone()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: req.name,
            email: req.email,
            photo: req.photo,
            role: DEFAULT_ROLE.to_string(),
        };
        users.push(user.clone());
        Ok(UserUpsert::Created(user))
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.read().await.clone())
    }

    async fn update_role(&self, email: &str, role: &str) -> Result<u64, AppError> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.email == email) {
            Some(user) if user.role != role => {
                user.role = role.to_string();
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
