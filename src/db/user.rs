use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    full_name: Option<String>,
    created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            created_at: row.created_at,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user ID.
    pub async fn create(&self, email: &str, full_name: Option<&str>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO users (email, full_name) VALUES (?, ?)")
            .bind(email)
            .bind(full_name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, full_name, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Return the user with this email, creating it if needed.
    pub async fn get_or_create(&self, email: &str) -> Result<User, sqlx::Error> {
        sqlx::query("INSERT INTO users (email) VALUES (?) ON CONFLICT(email) DO NOTHING")
            .bind(email)
            .execute(&self.pool)
            .await?;
        self.get_by_email(email)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}
