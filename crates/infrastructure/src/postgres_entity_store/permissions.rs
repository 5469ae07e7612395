use super::*;

impl PostgresEntityStore {
    pub(super) async fn create_permission_impl(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        let name = normalized_name(name)?;
        sqlx::query_as::<_, PermissionRow>(
            r#"
            INSERT INTO rbac_permissions (tenant_id, name, guard_name)
            VALUES ($1, $2, $3)
            RETURNING id, tenant_id, name, guard_name, created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(name)
        .bind(guard_name.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_write_error(error, format!("permission '{name}'").as_str()))?
        .into_permission()
    }

    pub(super) async fn find_or_create_permission_impl(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Permission> {
        let name = normalized_name(name)?;
        let inserted = sqlx::query_as::<_, PermissionRow>(
            r#"
            INSERT INTO rbac_permissions (tenant_id, name, guard_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id, guard_name, name) DO NOTHING
            RETURNING id, tenant_id, name, guard_name, created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(name)
        .bind(guard_name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_write_error(error, format!("permission '{name}'").as_str()))?;

        if let Some(row) = inserted {
            return row.into_permission();
        }

        debug!(%tenant_id, guard = %guard_name, permission = name, "permission already present");
        self.find_permission_by_name_impl(tenant_id, name, guard_name)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "permission '{name}' conflicted on insert but could not be read back"
                ))
            })
    }

    pub(super) async fn find_permission_by_name_impl(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Permission>> {
        let name = name.trim();
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, tenant_id, name, guard_name, created_at
            FROM rbac_permissions
            WHERE tenant_id = $1 AND guard_name = $2 AND name = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(guard_name.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find permission '{name}': {error}"))
        })?
        .map(PermissionRow::into_permission)
        .transpose()
    }

    pub(super) async fn find_permission_by_id_impl(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, tenant_id, name, guard_name, created_at
            FROM rbac_permissions
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(permission_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find permission #{permission_id}: {error}"
            ))
        })?
        .map(PermissionRow::into_permission)
        .transpose()
    }

    pub(super) async fn list_permissions_impl(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, tenant_id, name, guard_name, created_at
            FROM rbac_permissions
            WHERE tenant_id = $1
                AND ($2::TEXT IS NULL OR guard_name = $2)
            ORDER BY name, guard_name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(guard_name.map(GuardName::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    pub(super) async fn delete_permission_impl(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM rbac_permissions
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(permission_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete permission #{permission_id}: {error}"
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "permission #{permission_id} was not found"
            )));
        }

        Ok(())
    }
}
