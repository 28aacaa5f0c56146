//! CV persistence. Every write is scoped by owner, and content writes are
//! conditional on the version they were computed from.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cv::duplicate::NewCv;
use crate::cv::merge::MergedCv;
use crate::cv::share::ShareState;
use crate::errors::AppError;
use crate::models::cv::{CvRow, CvSummaryRow, CvVersionRow, CvVersionSummaryRow};
use crate::plans::PlanLimits;

/// Whether a write should also be recorded in `cv_versions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    Record,
    Skip,
}

fn not_found(cv_id: Uuid) -> AppError {
    AppError::NotFound(format!("CV {cv_id} not found"))
}

pub async fn list_cvs(pool: &PgPool, user_id: Uuid) -> Result<Vec<CvSummaryRow>, AppError> {
    Ok(sqlx::query_as::<_, CvSummaryRow>(
        r#"
        SELECT id, title, template_id, is_public, version, created_at, updated_at
        FROM cvs
        WHERE user_id = $1
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// Fetches a CV owned by `user_id`. Other users' CVs are reported as missing.
pub async fn get_cv(pool: &PgPool, user_id: Uuid, cv_id: Uuid) -> Result<CvRow, AppError> {
    sqlx::query_as::<_, CvRow>("SELECT * FROM cvs WHERE id = $1 AND user_id = $2")
        .bind(cv_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(cv_id))
}

pub async fn count_cvs(pool: &PgPool, user_id: Uuid) -> Result<i64, AppError> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cvs WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?,
    )
}

/// Inserts a new CV if the owner's plan allows another one.
///
/// The owner's user row is locked for the duration, so two concurrent creates
/// cannot both slip under the cap.
pub async fn insert_cv(
    pool: &PgPool,
    new_cv: &NewCv,
    limits: &PlanLimits,
) -> Result<CvRow, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(new_cv.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if let Some(max) = limits.max_cvs {
        let current: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cvs WHERE user_id = $1")
            .bind(new_cv.user_id)
            .fetch_one(&mut *tx)
            .await?;
        if !limits.allows_new_cv(current) {
            tx.rollback().await?;
            warn!("User {} reached the CV cap ({max})", new_cv.user_id);
            return Err(AppError::PlanRequired(format!(
                "Your plan allows up to {max} CVs. Upgrade to create more."
            )));
        }
    }

    let row = sqlx::query_as::<_, CvRow>(
        r#"
        INSERT INTO cvs (id, user_id, title, template_id, data, is_public, share_token, version)
        VALUES ($1, $2, $3, $4, $5, FALSE, NULL, 1)
        RETURNING *
        "#,
    )
    .bind(new_cv.id)
    .bind(new_cv.user_id)
    .bind(&new_cv.title)
    .bind(&new_cv.template_id)
    .bind(Json(&new_cv.data))
    .fetch_one(&mut *tx)
    .await?;

    insert_snapshot(&mut tx, &row).await?;
    tx.commit().await?;

    info!("Created CV {} for user {}", row.id, row.user_id);
    Ok(row)
}

/// Persists a merged CV. Succeeds only if the stored version is still the one
/// the merge was computed from; a concurrent writer turns this into `Conflict`.
pub async fn update_cv(
    pool: &PgPool,
    user_id: Uuid,
    cv_id: Uuid,
    merged: &MergedCv,
    snapshot: Snapshot,
) -> Result<CvRow, AppError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, CvRow>(
        r#"
        UPDATE cvs
        SET title = $1, template_id = $2, data = $3, version = $4, updated_at = NOW()
        WHERE id = $5 AND user_id = $6 AND version = $7
        RETURNING *
        "#,
    )
    .bind(&merged.title)
    .bind(&merged.template_id)
    .bind(Json(&merged.data))
    .bind(merged.version)
    .bind(cv_id)
    .bind(user_id)
    .bind(merged.base_version)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = updated else {
        tx.rollback().await?;
        let exists: Option<i32> =
            sqlx::query_scalar("SELECT version FROM cvs WHERE id = $1 AND user_id = $2")
                .bind(cv_id)
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        return Err(match exists {
            Some(current) => {
                warn!(
                    "Lost update on CV {cv_id}: based on version {}, stored version is {current}",
                    merged.base_version
                );
                AppError::Conflict(format!(
                    "CV was modified elsewhere (expected version {}, found {current})",
                    merged.base_version
                ))
            }
            None => not_found(cv_id),
        });
    };

    if snapshot == Snapshot::Record {
        insert_snapshot(&mut tx, &row).await?;
    }
    tx.commit().await?;

    info!("Saved CV {cv_id} version {}", row.version);
    Ok(row)
}

pub async fn delete_cv(pool: &PgPool, user_id: Uuid, cv_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM cvs WHERE id = $1 AND user_id = $2")
        .bind(cv_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(cv_id));
    }
    info!("Deleted CV {cv_id}");
    Ok(())
}

/// Makes a CV public under `state.share_token`, unless it is already public
/// with a token, in which case the stored token wins. The decision is taken
/// under the row lock, so concurrent first-time issues agree on one token.
pub async fn issue_share(
    pool: &PgPool,
    user_id: Uuid,
    cv_id: Uuid,
    state: &ShareState,
) -> Result<CvRow, AppError> {
    sqlx::query_as::<_, CvRow>(
        r#"
        UPDATE cvs
        SET share_token = CASE
                WHEN is_public AND share_token IS NOT NULL THEN share_token
                ELSE $1
            END,
            is_public = TRUE,
            updated_at = CASE
                WHEN is_public AND share_token IS NOT NULL THEN updated_at
                ELSE NOW()
            END
        WHERE id = $2 AND user_id = $3
        RETURNING *
        "#,
    )
    .bind(&state.share_token)
    .bind(cv_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(cv_id))
}

/// Writes the share columns. Content and version are untouched.
pub async fn set_share_state(
    pool: &PgPool,
    user_id: Uuid,
    cv_id: Uuid,
    state: &ShareState,
) -> Result<CvRow, AppError> {
    sqlx::query_as::<_, CvRow>(
        r#"
        UPDATE cvs
        SET is_public = $1, share_token = $2, updated_at = NOW()
        WHERE id = $3 AND user_id = $4
        RETURNING *
        "#,
    )
    .bind(state.is_public)
    .bind(&state.share_token)
    .bind(cv_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(cv_id))
}

/// Looks up a CV by share token. Only public CVs are returned.
pub async fn find_shared(pool: &PgPool, token: &str) -> Result<Option<CvRow>, AppError> {
    Ok(sqlx::query_as::<_, CvRow>(
        "SELECT * FROM cvs WHERE share_token = $1 AND is_public = TRUE",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?)
}

/// Records `row` as an immutable snapshot. Re-recording a version is a no-op.
async fn insert_snapshot(tx: &mut Transaction<'_, Postgres>, row: &CvRow) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO cv_versions (id, cv_id, version, title, template_id, data)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (cv_id, version) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(row.id)
    .bind(row.version)
    .bind(&row.title)
    .bind(&row.template_id)
    .bind(&row.data)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn list_history(
    pool: &PgPool,
    cv_id: Uuid,
) -> Result<Vec<CvVersionSummaryRow>, AppError> {
    Ok(sqlx::query_as::<_, CvVersionSummaryRow>(
        r#"
        SELECT version, title, template_id, created_at
        FROM cv_versions
        WHERE cv_id = $1
        ORDER BY version DESC
        "#,
    )
    .bind(cv_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_snapshot(
    pool: &PgPool,
    cv_id: Uuid,
    version: i32,
) -> Result<CvVersionRow, AppError> {
    sqlx::query_as::<_, CvVersionRow>(
        "SELECT * FROM cv_versions WHERE cv_id = $1 AND version = $2",
    )
    .bind(cv_id)
    .bind(version)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Version {version} of CV {cv_id} not found")))
}

/// The next state of `current` when `snapshot` is restored: snapshot content,
/// one version past what is stored now.
pub fn restored(current: &CvRow, snapshot: CvVersionRow) -> MergedCv {
    MergedCv {
        title: snapshot.title,
        template_id: snapshot.template_id,
        data: snapshot.data.0,
        base_version: current.version,
        version: current.version + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::users::insert_user;
    use crate::cv::data::{CvData, PersonalInfo};
    use crate::cv::share;
    use crate::plans::PlanTier;
    use chrono::Utc;

    #[test]
    fn test_restore_moves_forward_not_back() {
        let now = Utc::now();
        let current = CvRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Current".into(),
            template_id: "modern".into(),
            data: Json(CvData::default()),
            is_public: false,
            share_token: None,
            version: 9,
            created_at: now,
            updated_at: now,
        };
        let snapshot = CvVersionRow {
            id: Uuid::new_v4(),
            cv_id: current.id,
            version: 2,
            title: "Old".into(),
            template_id: "classic".into(),
            data: Json(CvData {
                personal: PersonalInfo {
                    full_name: "Ada".into(),
                    ..Default::default()
                },
                ..Default::default()
            }),
            created_at: now,
        };

        let next = restored(&current, snapshot);
        assert_eq!(next.base_version, 9);
        assert_eq!(next.version, 10);
        assert_eq!(next.title, "Old");
        assert_eq!(next.template_id, "classic");
        assert_eq!(next.data.personal.full_name, "Ada");
    }

    async fn owner(pool: &PgPool) -> Uuid {
        let email = format!("{}@example.com", Uuid::new_v4());
        insert_user(pool, &email, "not-a-hash", "Ada").await.unwrap().id
    }

    fn draft(user_id: Uuid, title: &str) -> NewCv {
        NewCv {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            template_id: "modern".to_string(),
            data: CvData::default(),
        }
    }

    fn retitled(row: &CvRow, title: &str) -> MergedCv {
        MergedCv {
            title: title.to_string(),
            template_id: row.template_id.clone(),
            data: row.data.0.clone(),
            base_version: row.version,
            version: row.version + 1,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_stale_update_is_a_conflict(pool: PgPool) {
        let user = owner(&pool).await;
        let created = insert_cv(&pool, &draft(user, "Draft"), &PlanTier::Free.limits())
            .await
            .unwrap();
        let stale = retitled(&created, "Second tab");

        let saved = update_cv(&pool, user, created.id, &retitled(&created, "First tab"), Snapshot::Skip)
            .await
            .unwrap();
        assert_eq!(saved.version, 2);

        let err = update_cv(&pool, user, created.id, &stale, Snapshot::Skip)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let stored = get_cv(&pool, user, created.id).await.unwrap();
        assert_eq!(stored.title, "First tab");
        assert_eq!(stored.version, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_other_users_cv_is_not_found(pool: PgPool) {
        let user = owner(&pool).await;
        let stranger = owner(&pool).await;
        let created = insert_cv(&pool, &draft(user, "Mine"), &PlanTier::Free.limits())
            .await
            .unwrap();

        assert!(matches!(
            get_cv(&pool, stranger, created.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        let err = update_cv(&pool, stranger, created.id, &retitled(&created, "Theirs"), Snapshot::Skip)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(
            delete_cv(&pool, stranger, created.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_snapshots_follow_create_and_manual_save(pool: PgPool) {
        let user = owner(&pool).await;
        let created = insert_cv(&pool, &draft(user, "Draft"), &PlanTier::Free.limits())
            .await
            .unwrap();
        let autosaved = update_cv(&pool, user, created.id, &retitled(&created, "Auto"), Snapshot::Skip)
            .await
            .unwrap();
        update_cv(&pool, user, created.id, &retitled(&autosaved, "Manual"), Snapshot::Record)
            .await
            .unwrap();

        let versions: Vec<i32> = list_history(&pool, created.id)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.version)
            .collect();
        assert_eq!(versions, vec![3, 1]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_concurrent_creates_respect_cv_cap(pool: PgPool) {
        let user = owner(&pool).await;
        let limits = PlanTier::Free.limits();
        let attempts: Vec<_> = (0..6)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move { insert_cv(&pool, &draft(user, &format!("CV {i}")), &limits).await })
            })
            .collect();

        let (mut created, mut refused) = (0, 0);
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => created += 1,
                Err(AppError::PlanRequired(_)) => refused += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((created, refused), (3, 3));
        assert_eq!(count_cvs(&pool, user).await.unwrap(), 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_concurrent_share_issues_agree_on_one_token(pool: PgPool) {
        let user = owner(&pool).await;
        let cv = insert_cv(&pool, &draft(user, "Shared"), &PlanTier::Free.limits())
            .await
            .unwrap();
        let (first, second) = (share::issue(&cv), share::issue(&cv));
        assert_ne!(first.share_token, second.share_token);

        let (a, b) = tokio::join!(
            issue_share(&pool, user, cv.id, &first),
            issue_share(&pool, user, cv.id, &second),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.share_token, b.share_token);
        assert!(a.is_public && b.is_public);

        let token = a.share_token.unwrap();
        let shared = find_shared(&pool, &token).await.unwrap().unwrap();
        assert_eq!(shared.id, cv.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_revoke_persists_and_hides_the_cv(pool: PgPool) {
        let user = owner(&pool).await;
        let cv = insert_cv(&pool, &draft(user, "Shared"), &PlanTier::Free.limits())
            .await
            .unwrap();
        let issued = issue_share(&pool, user, cv.id, &share::issue(&cv)).await.unwrap();
        let token = issued.share_token.unwrap();

        set_share_state(&pool, user, cv.id, &share::revoke()).await.unwrap();
        let stored = get_cv(&pool, user, cv.id).await.unwrap();
        assert!(!stored.is_public);
        assert!(stored.share_token.is_none());
        assert!(find_shared(&pool, &token).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn test_private_cv_with_token_is_not_shared(pool: PgPool) {
        let user = owner(&pool).await;
        let cv = insert_cv(&pool, &draft(user, "Private"), &PlanTier::Free.limits())
            .await
            .unwrap();
        let token = share::generate_share_token();
        let hidden = ShareState {
            is_public: false,
            share_token: Some(token.clone()),
        };
        set_share_state(&pool, user, cv.id, &hidden).await.unwrap();
        assert!(find_shared(&pool, &token).await.unwrap().is_none());
    }
}
