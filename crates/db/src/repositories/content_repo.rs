//! Repository for the content tree (`courses`, `units`, `sections`,
//! `resources`).
//!
//! Reads only ever see ACTIVE rows. Structural writes (insert with
//! renumbering, bulk upload, soft delete) run in one transaction together
//! with the counter updates they imply; if any statement fails the
//! transaction is dropped and rolled back, so no partial write is visible.

use coursepath_core::content::{resource_deltas, NodeKind, ResourceKind, StatsField};
use coursepath_core::slots::{Shift, Slot, SlotArena};
use coursepath_core::types::{DbId, SlotNumber};
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::content::{Course, CreateNode, NewResource, Resource, Section, Unit};
use crate::models::status::NodeStatus;
use crate::repositories::StatsRepo;

const COURSE_COLUMNS: &str = "id, name, status_id, created_at, updated_at";
const UNIT_COLUMNS: &str = "id, course_id, name, number, status_id, created_at, updated_at";
const SECTION_COLUMNS: &str =
    "id, course_id, unit_id, name, number, status_id, created_at, updated_at";
const RESOURCE_COLUMNS: &str =
    "id, course_id, unit_id, section_id, name, kind, number, status_id, created_at, updated_at";

/// Tables whose rows carry a sibling `number`.
#[derive(Debug, Clone, Copy)]
enum OrderedTable {
    Units,
    Sections,
    Resources,
}

impl OrderedTable {
    fn name(self) -> &'static str {
        match self {
            Self::Units => "units",
            Self::Sections => "sections",
            Self::Resources => "resources",
        }
    }

    fn parent_column(self) -> &'static str {
        match self {
            Self::Units => "course_id",
            Self::Sections => "unit_id",
            Self::Resources => "section_id",
        }
    }
}

/// Provides reads and transactional structural mutations on the content tree.
pub struct ContentRepo;

impl ContentRepo {
    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Find an active course by ID.
    pub async fn find_course(pool: &PgPool, id: DbId) -> Result<Option<Course>, sqlx::Error> {
        let query =
            format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 AND status_id = 1");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an active unit by ID.
    pub async fn find_unit(pool: &PgPool, id: DbId) -> Result<Option<Unit>, sqlx::Error> {
        let query = format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = $1 AND status_id = 1");
        sqlx::query_as::<_, Unit>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an active section by ID.
    pub async fn find_section(pool: &PgPool, id: DbId) -> Result<Option<Section>, sqlx::Error> {
        let query =
            format!("SELECT {SECTION_COLUMNS} FROM sections WHERE id = $1 AND status_id = 1");
        sqlx::query_as::<_, Section>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an active resource whose section and unit are also active.
    pub async fn find_resource(pool: &PgPool, id: DbId) -> Result<Option<Resource>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM resources r \
             JOIN sections s ON s.id = r.section_id AND s.status_id = 1 \
             JOIN units u ON u.id = r.unit_id AND u.status_id = 1 \
             WHERE r.id = $1 AND r.status_id = 1",
            prefixed("r", RESOURCE_COLUMNS)
        );
        sqlx::query_as::<_, Resource>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the IDs of all active courses.
    pub async fn list_course_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM courses WHERE status_id = 1 ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// List a course's active units ordered by `number`.
    pub async fn list_units(pool: &PgPool, course_id: DbId) -> Result<Vec<Unit>, sqlx::Error> {
        let query = format!(
            "SELECT {UNIT_COLUMNS} FROM units \
             WHERE course_id = $1 AND status_id = 1 \
             ORDER BY number"
        );
        sqlx::query_as::<_, Unit>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }

    /// List a unit's active sections ordered by `number`.
    pub async fn list_sections(pool: &PgPool, unit_id: DbId) -> Result<Vec<Section>, sqlx::Error> {
        let query = format!(
            "SELECT {SECTION_COLUMNS} FROM sections \
             WHERE unit_id = $1 AND status_id = 1 \
             ORDER BY number"
        );
        sqlx::query_as::<_, Section>(&query)
            .bind(unit_id)
            .fetch_all(pool)
            .await
    }

    /// Active units of a course as an ordered slot arena.
    pub async fn unit_arena(pool: &PgPool, course_id: DbId) -> Result<SlotArena, sqlx::Error> {
        Self::arena(pool, OrderedTable::Units, course_id).await
    }

    /// Active sections of a unit as an ordered slot arena.
    pub async fn section_arena(pool: &PgPool, unit_id: DbId) -> Result<SlotArena, sqlx::Error> {
        Self::arena(pool, OrderedTable::Sections, unit_id).await
    }

    // -----------------------------------------------------------------------
    // Structural writes
    // -----------------------------------------------------------------------

    /// Insert a new course and its counter row.
    pub async fn create_course(pool: &PgPool, name: &str) -> Result<Course, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("INSERT INTO courses (name) VALUES ($1) RETURNING {COURSE_COLUMNS}");
        let course = sqlx::query_as::<_, Course>(&query)
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        StatsRepo::ensure(&mut *tx, NodeKind::Course, course.id).await?;

        tx.commit().await?;
        Ok(course)
    }

    /// Insert a unit into an active course, shifting later siblings if its
    /// number is taken.
    ///
    /// Returns `None` if the course does not exist or is deleted.
    pub async fn create_unit(
        pool: &PgPool,
        course_id: DbId,
        input: &CreateNode,
    ) -> Result<Option<Unit>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_active(&mut tx, "courses", course_id).await? {
            return Ok(None);
        }

        let arena = Self::arena(&mut *tx, OrderedTable::Units, course_id).await?;
        let plan = arena.plan_insert(input.number).map_err(invalid_input)?;
        apply_shifts(&mut tx, OrderedTable::Units, &plan.shifts).await?;

        let query = format!(
            "INSERT INTO units (course_id, name, number) VALUES ($1, $2, $3) \
             RETURNING {UNIT_COLUMNS}"
        );
        let unit = sqlx::query_as::<_, Unit>(&query)
            .bind(course_id)
            .bind(input.name.trim())
            .bind(plan.number)
            .fetch_one(&mut *tx)
            .await?;

        StatsRepo::ensure(&mut *tx, NodeKind::Unit, unit.id).await?;
        StatsRepo::increment(&mut *tx, NodeKind::Course, course_id, StatsField::TotalUnits, 1)
            .await?;

        tx.commit().await?;
        tracing::debug!(unit_id = unit.id, course_id, number = unit.number, "Unit created");
        Ok(Some(unit))
    }

    /// Insert a section into an active unit, shifting later siblings if its
    /// number is taken.
    ///
    /// Returns `None` if the unit does not exist or is deleted.
    pub async fn create_section(
        pool: &PgPool,
        unit_id: DbId,
        input: &CreateNode,
    ) -> Result<Option<Section>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(course_id) = lock_active_unit(&mut tx, unit_id).await? else {
            return Ok(None);
        };

        let arena = Self::arena(&mut *tx, OrderedTable::Sections, unit_id).await?;
        let plan = arena.plan_insert(input.number).map_err(invalid_input)?;
        apply_shifts(&mut tx, OrderedTable::Sections, &plan.shifts).await?;

        let query = format!(
            "INSERT INTO sections (course_id, unit_id, name, number) VALUES ($1, $2, $3, $4) \
             RETURNING {SECTION_COLUMNS}"
        );
        let section = sqlx::query_as::<_, Section>(&query)
            .bind(course_id)
            .bind(unit_id)
            .bind(input.name.trim())
            .bind(plan.number)
            .fetch_one(&mut *tx)
            .await?;

        StatsRepo::ensure(&mut *tx, NodeKind::Section, section.id).await?;
        for (kind, id) in [(NodeKind::Unit, unit_id), (NodeKind::Course, course_id)] {
            StatsRepo::increment(&mut *tx, kind, id, StatsField::TotalSections, 1).await?;
        }

        tx.commit().await?;
        tracing::debug!(
            section_id = section.id,
            unit_id,
            number = section.number,
            "Section created",
        );
        Ok(Some(section))
    }

    /// Insert several resources into an active section, all or nothing.
    ///
    /// Resources are placed in input order; each one's requested number is
    /// planned against the siblings as they stand after the previous insert.
    /// Returns `None` if the section (or its unit) is not active.
    pub async fn create_resources(
        pool: &PgPool,
        section_id: DbId,
        inputs: &[NewResource],
    ) -> Result<Option<Vec<Resource>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some((course_id, unit_id)) = lock_active_section(&mut tx, section_id).await? else {
            return Ok(None);
        };

        let mut arena = Self::arena(&mut *tx, OrderedTable::Resources, section_id).await?;
        let mut created = Vec::with_capacity(inputs.len());
        let mut deltas: Vec<(StatsField, i32)> = Vec::new();

        let query = format!(
            "INSERT INTO resources (course_id, unit_id, section_id, name, kind, number) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {RESOURCE_COLUMNS}"
        );

        for input in inputs {
            let plan = arena.plan_insert(input.number).map_err(invalid_input)?;
            apply_shifts(&mut tx, OrderedTable::Resources, &plan.shifts).await?;

            let resource = sqlx::query_as::<_, Resource>(&query)
                .bind(course_id)
                .bind(unit_id)
                .bind(section_id)
                .bind(input.name.trim())
                .bind(input.kind.as_str())
                .bind(plan.number)
                .fetch_one(&mut *tx)
                .await?;

            arena = arena.apply(&plan, resource.id);
            merge_deltas(&mut deltas, &resource_deltas(input.kind, 1));
            created.push(resource);
        }

        for (kind, id) in [
            (NodeKind::Section, section_id),
            (NodeKind::Unit, unit_id),
            (NodeKind::Course, course_id),
        ] {
            StatsRepo::apply_deltas(&mut tx, kind, id, &deltas).await?;
        }

        tx.commit().await?;
        tracing::debug!(section_id, count = created.len(), "Resources uploaded");
        Ok(Some(created))
    }

    /// Soft-delete a unit and remove its subtree from the course counters.
    ///
    /// Returns `false` if the unit was not active.
    pub async fn soft_delete_unit(pool: &PgPool, unit_id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(course_id) = lock_active_unit(&mut tx, unit_id).await? else {
            return Ok(false);
        };
        let subtree = StatsRepo::unit_subtree(&mut *tx, unit_id).await?;

        sqlx::query("UPDATE units SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(unit_id)
            .bind(NodeStatus::Deleted.id())
            .execute(&mut *tx)
            .await?;

        let mut deltas = vec![(StatsField::TotalUnits, -1)];
        deltas.extend(subtree.removal_deltas());
        StatsRepo::apply_deltas(&mut tx, NodeKind::Course, course_id, &deltas).await?;

        tx.commit().await?;
        tracing::info!(unit_id, course_id, "Unit soft-deleted");
        Ok(true)
    }

    /// Soft-delete a section and remove its subtree from ancestor counters.
    ///
    /// Returns `false` if the section (or its unit) was not active.
    pub async fn soft_delete_section(pool: &PgPool, section_id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some((course_id, unit_id)) = lock_active_section(&mut tx, section_id).await? else {
            return Ok(false);
        };
        let subtree = StatsRepo::section_subtree(&mut *tx, section_id).await?;

        sqlx::query("UPDATE sections SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(section_id)
            .bind(NodeStatus::Deleted.id())
            .execute(&mut *tx)
            .await?;

        let deltas = subtree.removal_deltas();
        for (kind, id) in [(NodeKind::Unit, unit_id), (NodeKind::Course, course_id)] {
            StatsRepo::apply_deltas(&mut tx, kind, id, &deltas).await?;
        }

        tx.commit().await?;
        tracing::info!(section_id, unit_id, "Section soft-deleted");
        Ok(true)
    }

    /// Soft-delete a resource and decrement its ancestors' counters.
    ///
    /// Returns `false` if the resource was not active under active ancestors.
    pub async fn soft_delete_resource(
        pool: &PgPool,
        resource_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let row: Option<(DbId, DbId, DbId, String)> = sqlx::query_as(
            "SELECT r.course_id, r.unit_id, r.section_id, r.kind FROM resources r \
             JOIN sections s ON s.id = r.section_id AND s.status_id = 1 \
             JOIN units u ON u.id = r.unit_id AND u.status_id = 1 \
             WHERE r.id = $1 AND r.status_id = 1 \
             FOR UPDATE OF r",
        )
        .bind(resource_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((course_id, unit_id, section_id, kind)) = row else {
            return Ok(false);
        };
        let kind =
            ResourceKind::from_str_value(&kind).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        sqlx::query("UPDATE resources SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(resource_id)
            .bind(NodeStatus::Deleted.id())
            .execute(&mut *tx)
            .await?;

        let deltas = resource_deltas(kind, -1);
        for (node, id) in [
            (NodeKind::Section, section_id),
            (NodeKind::Unit, unit_id),
            (NodeKind::Course, course_id),
        ] {
            StatsRepo::apply_deltas(&mut tx, node, id, &deltas).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn arena<'e, E: PgExecutor<'e>>(
        executor: E,
        table: OrderedTable,
        parent_id: DbId,
    ) -> Result<SlotArena, sqlx::Error> {
        let query = format!(
            "SELECT id, number FROM {} WHERE {} = $1 AND status_id = 1 ORDER BY number",
            table.name(),
            table.parent_column()
        );
        let rows: Vec<(DbId, SlotNumber)> = sqlx::query_as(&query)
            .bind(parent_id)
            .fetch_all(executor)
            .await?;
        Ok(SlotArena::new(
            rows.into_iter()
                .map(|(id, number)| Slot { id, number })
                .collect(),
        ))
    }
}

/// Lock an active row of `table` for the rest of the transaction.
async fn lock_active(
    conn: &mut PgConnection,
    table: &'static str,
    id: DbId,
) -> Result<bool, sqlx::Error> {
    let query = format!("SELECT id FROM {table} WHERE id = $1 AND status_id = 1 FOR UPDATE");
    let found = sqlx::query_scalar::<_, DbId>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

/// Lock an active unit under an active course. Returns its course ID.
async fn lock_active_unit(
    conn: &mut PgConnection,
    unit_id: DbId,
) -> Result<Option<DbId>, sqlx::Error> {
    sqlx::query_scalar::<_, DbId>(
        "SELECT u.course_id FROM units u \
         JOIN courses c ON c.id = u.course_id AND c.status_id = 1 \
         WHERE u.id = $1 AND u.status_id = 1 \
         FOR UPDATE OF u",
    )
    .bind(unit_id)
    .fetch_optional(conn)
    .await
}

/// Lock an active section under an active unit. Returns (course, unit) IDs.
async fn lock_active_section(
    conn: &mut PgConnection,
    section_id: DbId,
) -> Result<Option<(DbId, DbId)>, sqlx::Error> {
    sqlx::query_as::<_, (DbId, DbId)>(
        "SELECT s.course_id, s.unit_id FROM sections s \
         JOIN units u ON u.id = s.unit_id AND u.status_id = 1 \
         WHERE s.id = $1 AND s.status_id = 1 \
         FOR UPDATE OF s",
    )
    .bind(section_id)
    .fetch_optional(conn)
    .await
}

/// Move siblings to their planned numbers.
///
/// Two passes keep the partial unique index satisfied at every statement
/// boundary: first park each moved row on the negated target, then flip it
/// positive. Planned targets never collide with unmoved siblings.
async fn apply_shifts(
    conn: &mut PgConnection,
    table: OrderedTable,
    shifts: &[Shift],
) -> Result<(), sqlx::Error> {
    if shifts.is_empty() {
        return Ok(());
    }
    let ids: Vec<DbId> = shifts.iter().map(|s| s.id).collect();
    let targets: Vec<SlotNumber> = shifts.iter().map(|s| s.to).collect();
    let name = table.name();

    let park = format!(
        "UPDATE {name} t SET number = -s.to_number \
         FROM UNNEST($1::BIGINT[], $2::INTEGER[]) AS s(id, to_number) \
         WHERE t.id = s.id"
    );
    sqlx::query(&park)
        .bind(&ids)
        .bind(&targets)
        .execute(&mut *conn)
        .await?;

    let flip = format!(
        "UPDATE {name} SET number = -number, updated_at = NOW() WHERE id = ANY($1)"
    );
    sqlx::query(&flip).bind(&ids).execute(&mut *conn).await?;

    tracing::debug!(table = name, moved = shifts.len(), "Siblings renumbered");
    Ok(())
}

fn merge_deltas(into: &mut Vec<(StatsField, i32)>, add: &[(StatsField, i32)]) {
    for &(field, delta) in add {
        match into.iter_mut().find(|(f, _)| *f == field) {
            Some((_, total)) => *total += delta,
            None => into.push((field, delta)),
        }
    }
}

/// Inputs are validated by callers; a plan rejected here is reported as a
/// bind-value error rather than a panic.
fn invalid_input(err: coursepath_core::error::CoreError) -> sqlx::Error {
    sqlx::Error::Encode(Box::new(err))
}

fn prefixed(alias: &str, columns: &str) -> String {
    columns
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}
