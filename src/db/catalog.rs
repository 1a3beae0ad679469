//! Report catalog: categories contain sections, sections contain items.
//!
//! A category takes its sections with it when deleted. Sections and items are
//! never deleted from under their children; `delete` reports
//! [`DeleteOutcome::HasChildren`] instead.

use sqlx::sqlite::SqlitePool;

/// Result of deleting a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    HasChildren,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    icon: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            icon: row.icon,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Clone)]
pub struct CategoryStore {
    pool: SqlitePool,
}

impl CategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Category>, sqlx::Error> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, icon, created_at, updated_at FROM report_categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Category>, sqlx::Error> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, icon, created_at, updated_at FROM report_categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    /// Create a category. Returns the new ID.
    pub async fn create(&self, input: &CategoryInput) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO report_categories (name, icon) VALUES (?, ?)")
            .bind(&input.name)
            .bind(&input.icon)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Replace name and icon. Returns false if the category does not exist.
    pub async fn update(&self, id: i64, input: &CategoryInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE report_categories SET name = ?, icon = ?, updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.icon)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a category and its sections in one transaction.
    /// Refused with `HasChildren` while any of those sections still has items.
    pub async fn delete(&self, id: i64) -> Result<DeleteOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM report_categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let (items,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM report_items i
             JOIN report_sections s ON s.id = i.section_id
             WHERE s.category_id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if items > 0 {
            return Ok(DeleteOutcome::HasChildren);
        }

        sqlx::query("DELETE FROM report_sections WHERE category_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM report_categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }
}

/// A section, joined with its category name.
#[derive(Debug, Clone)]
pub struct Section {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SectionRow {
    id: i64,
    name: String,
    icon: Option<String>,
    description: Option<String>,
    category_id: Option<i64>,
    category_name: Option<String>,
}

impl From<SectionRow> for Section {
    fn from(row: SectionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            icon: row.icon,
            description: row.description,
            category_id: row.category_id,
            category_name: row.category_name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SectionInput {
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

#[derive(Clone)]
pub struct SectionStore {
    pool: SqlitePool,
}

impl SectionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Section>, sqlx::Error> {
        let rows: Vec<SectionRow> = sqlx::query_as(
            "SELECT s.id, s.name, s.icon, s.description, s.category_id, c.name AS category_name
             FROM report_sections s LEFT JOIN report_categories c ON c.id = s.category_id
             ORDER BY s.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Section::from).collect())
    }

    pub async fn list_by_category(&self, category_id: i64) -> Result<Vec<Section>, sqlx::Error> {
        let rows: Vec<SectionRow> = sqlx::query_as(
            "SELECT s.id, s.name, s.icon, s.description, s.category_id, c.name AS category_name
             FROM report_sections s LEFT JOIN report_categories c ON c.id = s.category_id
             WHERE s.category_id = ? ORDER BY s.id",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Section::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Section>, sqlx::Error> {
        let row: Option<SectionRow> = sqlx::query_as(
            "SELECT s.id, s.name, s.icon, s.description, s.category_id, c.name AS category_name
             FROM report_sections s LEFT JOIN report_categories c ON c.id = s.category_id
             WHERE s.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Section::from))
    }

    pub async fn create(&self, input: &SectionInput) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO report_sections (name, icon, description, category_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.icon)
        .bind(&input.description)
        .bind(input.category_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Replace every field, including the category link.
    pub async fn update(&self, id: i64, input: &SectionInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE report_sections
             SET name = ?, icon = ?, description = ?, category_id = ?, updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.icon)
        .bind(&input.description)
        .bind(input.category_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<DeleteOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM report_sections WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let (children,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM report_items WHERE section_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if children > 0 {
            return Ok(DeleteOutcome::HasChildren);
        }

        sqlx::query("DELETE FROM report_sections WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }
}

/// An item, joined with its section name.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub section_id: Option<i64>,
    pub section_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    name: String,
    description: Option<String>,
    icon: Option<String>,
    section_id: Option<i64>,
    section_name: Option<String>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            icon: row.icon,
            section_id: row.section_id,
            section_name: row.section_name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemInput {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub section_id: Option<i64>,
}

#[derive(Clone)]
pub struct ItemStore {
    pool: SqlitePool,
}

impl ItemStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Item>, sqlx::Error> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT i.id, i.name, i.description, i.icon, i.section_id, s.name AS section_name
             FROM report_items i LEFT JOIN report_sections s ON s.id = i.section_id
             ORDER BY i.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    pub async fn list_by_section(&self, section_id: i64) -> Result<Vec<Item>, sqlx::Error> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT i.id, i.name, i.description, i.icon, i.section_id, s.name AS section_name
             FROM report_items i LEFT JOIN report_sections s ON s.id = i.section_id
             WHERE i.section_id = ? ORDER BY i.id",
        )
        .bind(section_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Item>, sqlx::Error> {
        let row: Option<ItemRow> = sqlx::query_as(
            "SELECT i.id, i.name, i.description, i.icon, i.section_id, s.name AS section_name
             FROM report_items i LEFT JOIN report_sections s ON s.id = i.section_id
             WHERE i.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Item::from))
    }

    pub async fn create(&self, input: &ItemInput) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO report_items (name, description, icon, section_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.icon)
        .bind(input.section_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Replace every field, including the section link.
    pub async fn update(&self, id: i64, input: &ItemInput) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE report_items
             SET name = ?, description = ?, icon = ?, section_id = ?, updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.icon)
        .bind(input.section_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<DeleteOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM report_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let (children,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM report_item_values WHERE report_item_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if children > 0 {
            return Ok(DeleteOutcome::HasChildren);
        }

        sqlx::query("DELETE FROM report_items WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    use super::*;

    #[tokio::test]
    async fn test_section_joins_category_name() {
        let db = Database::open(":memory:").await.unwrap();

        let category_id = db
            .categories()
            .create(&CategoryInput {
                name: "Blood".into(),
                icon: None,
            })
            .await
            .unwrap();
        let section_id = db
            .sections()
            .create(&SectionInput {
                name: "Lipids".into(),
                icon: None,
                description: None,
                category_id: Some(category_id),
            })
            .await
            .unwrap();

        let section = db.sections().get(section_id).await.unwrap().unwrap();
        assert_eq!(section.category_id, Some(category_id));
        assert_eq!(section.category_name.as_deref(), Some("Blood"));

        let listed = db.sections().list_by_category(category_id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_category_takes_empty_sections() {
        let db = Database::open(":memory:").await.unwrap();

        let category_id = db
            .categories()
            .create(&CategoryInput {
                name: "Blood".into(),
                icon: None,
            })
            .await
            .unwrap();
        let section_id = db
            .sections()
            .create(&SectionInput {
                name: "Lipids".into(),
                icon: None,
                description: None,
                category_id: Some(category_id),
            })
            .await
            .unwrap();
        let item_id = db
            .items()
            .create(&ItemInput {
                name: "LDL".into(),
                description: None,
                icon: None,
                section_id: Some(section_id),
            })
            .await
            .unwrap();

        assert_eq!(
            db.categories().delete(category_id).await.unwrap(),
            DeleteOutcome::HasChildren
        );
        assert!(db.sections().get(section_id).await.unwrap().is_some());

        assert_eq!(
            db.items().delete(item_id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            db.categories().delete(category_id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert!(db.sections().get(section_id).await.unwrap().is_none());
        assert_eq!(
            db.categories().delete(category_id).await.unwrap(),
            DeleteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_item_update_clears_section() {
        let db = Database::open(":memory:").await.unwrap();

        let section_id = db
            .sections()
            .create(&SectionInput {
                name: "Lipids".into(),
                icon: None,
                description: None,
                category_id: None,
            })
            .await
            .unwrap();
        let item_id = db
            .items()
            .create(&ItemInput {
                name: "LDL".into(),
                description: None,
                icon: None,
                section_id: Some(section_id),
            })
            .await
            .unwrap();

        let updated = db
            .items()
            .update(
                item_id,
                &ItemInput {
                    name: "LDL cholesterol".into(),
                    description: Some("mg/dL".into()),
                    icon: None,
                    section_id: None,
                },
            )
            .await
            .unwrap();
        assert!(updated);

        let item = db.items().get(item_id).await.unwrap().unwrap();
        assert_eq!(item.name, "LDL cholesterol");
        assert!(item.section_id.is_none());
        assert!(item.section_name.is_none());
    }
}
