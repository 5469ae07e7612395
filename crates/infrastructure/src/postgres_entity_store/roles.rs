use super::*;

impl PostgresEntityStore {
    pub(super) async fn create_role_impl(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        let name = normalized_name(name)?;
        sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO rbac_roles (tenant_id, name, guard_name)
            VALUES ($1, $2, $3)
            RETURNING id, tenant_id, name, guard_name, created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(name)
        .bind(guard_name.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_write_error(error, format!("role '{name}'").as_str()))?
        .into_role()
    }

    pub(super) async fn find_or_create_role_impl(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Role> {
        let name = normalized_name(name)?;
        let inserted = sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO rbac_roles (tenant_id, name, guard_name)
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
        .map_err(|error| map_write_error(error, format!("role '{name}'").as_str()))?;

        if let Some(row) = inserted {
            return row.into_role();
        }

        debug!(%tenant_id, guard = %guard_name, role = name, "role already present");
        self.find_role_by_name_impl(tenant_id, name, guard_name)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "role '{name}' conflicted on insert but could not be read back"
                ))
            })
    }

    pub(super) async fn find_role_by_name_impl(
        &self,
        tenant_id: TenantId,
        name: &str,
        guard_name: &GuardName,
    ) -> AppResult<Option<Role>> {
        let name = name.trim();
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, tenant_id, name, guard_name, created_at
            FROM rbac_roles
            WHERE tenant_id = $1 AND guard_name = $2 AND name = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(guard_name.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role '{name}': {error}")))?
        .map(RoleRow::into_role)
        .transpose()
    }

    pub(super) async fn find_role_by_id_impl(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, tenant_id, name, guard_name, created_at
            FROM rbac_roles
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role #{role_id}: {error}")))?
        .map(RoleRow::into_role)
        .transpose()
    }

    pub(super) async fn list_roles_impl(
        &self,
        tenant_id: TenantId,
        guard_name: Option<&GuardName>,
    ) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, tenant_id, name, guard_name, created_at
            FROM rbac_roles
            WHERE tenant_id = $1
                AND ($2::TEXT IS NULL OR guard_name = $2)
            ORDER BY name, guard_name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(guard_name.map(GuardName::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        rows.into_iter().map(RoleRow::into_role).collect()
    }

    pub(super) async fn delete_role_impl(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM rbac_roles
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete role #{role_id}: {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("role #{role_id} was not found")));
        }

        Ok(())
    }
}
