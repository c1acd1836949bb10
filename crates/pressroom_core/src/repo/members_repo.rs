//! Members-side persistence: tiers and single-use tokens.
//!
//! # Responsibility
//! - Read and update tiers stored in the `products` table.
//! - Manage single-use magic-link tokens.
//!
//! # Invariants
//! - Welcome page updates only touch tiers of the requested type.
//! - Token cleanup is all-or-nothing.

use super::{bool_to_int, RepoError, RepoResult};
use crate::db::{new_object_id, now_epoch_ms};
use crate::model::tier::{Tier, TierType};
use rusqlite::{params, Connection, Row};

const TIER_SELECT_SQL: &str = "SELECT
    id,
    name,
    slug,
    type,
    active,
    welcome_page_url
FROM products";

/// Repository interface for members data used by core services.
pub trait MembersRepository {
    fn create_tier(&self, tier: &Tier) -> RepoResult<()>;
    /// Lists tiers, free first, then by name.
    fn list_tiers(&self) -> RepoResult<Vec<Tier>>;
    /// Sets `welcome_page_url` on every tier of `kind`; returns rows touched.
    fn update_welcome_page_url(&self, kind: TierType, url: Option<&str>) -> RepoResult<usize>;
    fn create_single_use_token(&self, token: &str, data: Option<&str>) -> RepoResult<String>;
    fn count_single_use_tokens(&self) -> RepoResult<u64>;
    /// Deletes every single-use token; returns rows removed.
    fn delete_all_single_use_tokens(&self) -> RepoResult<usize>;
}

/// SQLite-backed members repository.
pub struct SqliteMembersRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMembersRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MembersRepository for SqliteMembersRepository<'_> {
    fn create_tier(&self, tier: &Tier) -> RepoResult<()> {
        if tier.name.trim().is_empty() || tier.slug.is_empty() {
            return Err(RepoError::InvalidData(
                "tier name and slug cannot be empty".to_string(),
            ));
        }
        let now = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO products (id, name, slug, type, active, welcome_page_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                tier.id,
                tier.name,
                tier.slug,
                tier.kind.as_str(),
                bool_to_int(tier.active),
                tier.welcome_page_url,
                now,
            ],
        )?;
        Ok(())
    }

    fn list_tiers(&self) -> RepoResult<Vec<Tier>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TIER_SELECT_SQL}
             ORDER BY CASE type WHEN 'free' THEN 0 ELSE 1 END, name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut tiers = Vec::new();
        while let Some(row) = rows.next()? {
            tiers.push(parse_tier_row(row)?);
        }
        Ok(tiers)
    }

    fn update_welcome_page_url(&self, kind: TierType, url: Option<&str>) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE products
             SET welcome_page_url = ?1, updated_at = ?2
             WHERE type = ?3;",
            params![url, now_epoch_ms(), kind.as_str()],
        )?;
        Ok(changed)
    }

    fn create_single_use_token(&self, token: &str, data: Option<&str>) -> RepoResult<String> {
        let id = new_object_id();
        let now = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO single_use_tokens (id, token, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4);",
            params![id, token, data, now],
        )?;
        Ok(id)
    }

    fn count_single_use_tokens(&self) -> RepoResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM single_use_tokens;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative token count {count}")))
    }

    fn delete_all_single_use_tokens(&self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM single_use_tokens;", [])?;
        Ok(removed)
    }
}

fn parse_tier_row(row: &Row<'_>) -> RepoResult<Tier> {
    let type_text: String = row.get("type")?;
    let kind = TierType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid tier type `{type_text}` in products.type"))
    })?;

    let active = match row.get::<_, i64>("active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid active value `{other}` in products.active"
            )));
        }
    };

    Ok(Tier {
        id: row.get("id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        kind,
        active,
        welcome_page_url: row.get("welcome_page_url")?,
    })
}
