use super::*;

impl PostgresEntityStore {
    pub(super) async fn attach_permissions_to_role_impl(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_role_permissions (tenant_id, role_id, permission_id)
            SELECT $1, $2, UNNEST($3::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_i64())
        .bind(permission_id_values(permission_ids))
        .execute(&self.pool)
        .await
        .map_err(|error| map_write_error(error, format!("role #{role_id} permissions").as_str()))?;

        Ok(())
    }

    pub(super) async fn detach_permission_from_role_impl(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM rbac_role_permissions
            WHERE tenant_id = $1 AND role_id = $2 AND permission_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_i64())
        .bind(permission_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to detach permission #{permission_id} from role #{role_id}: {error}"
            ))
        })?;

        Ok(())
    }

    pub(super) async fn replace_role_permissions_impl(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        let role_exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM rbac_roles
            WHERE tenant_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_i64())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?
        .is_some();
        if !role_exists {
            return Err(AppError::NotFound(format!("role #{role_id} was not found")));
        }

        sqlx::query(
            r#"
            DELETE FROM rbac_role_permissions
            WHERE tenant_id = $1 AND role_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_i64())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to clear role permissions: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO rbac_role_permissions (tenant_id, role_id, permission_id)
            SELECT $1, $2, UNNEST($3::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_i64())
        .bind(permission_id_values(permission_ids))
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_write_error(error, format!("role #{role_id} permissions").as_str()))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    pub(super) async fn assign_role_to_principal_impl(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_id: RoleId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_principal_roles (tenant_id, principal_type, principal_id, role_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .bind(role_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_write_error(error, format!("roles of {principal}").as_str()))?;

        Ok(())
    }

    pub(super) async fn remove_role_from_principal_impl(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_id: RoleId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM rbac_principal_roles
            WHERE tenant_id = $1
                AND principal_type = $2
                AND principal_id = $3
                AND role_id = $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .bind(role_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to remove role #{role_id} from {principal}: {error}"
            ))
        })?;

        Ok(())
    }

    pub(super) async fn replace_principal_roles_impl(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query(
            r#"
            DELETE FROM rbac_principal_roles
            WHERE tenant_id = $1 AND principal_type = $2 AND principal_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to clear roles of {principal}: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO rbac_principal_roles (tenant_id, principal_type, principal_id, role_id)
            SELECT $1, $2, $3, UNNEST($4::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .bind(role_id_values(role_ids))
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_write_error(error, format!("roles of {principal}").as_str()))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    pub(super) async fn grant_permission_to_principal_impl(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_principal_permissions
                (tenant_id, principal_type, principal_id, permission_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .bind(permission_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| map_write_error(error, format!("permissions of {principal}").as_str()))?;

        Ok(())
    }

    pub(super) async fn revoke_permission_from_principal_impl(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM rbac_principal_permissions
            WHERE tenant_id = $1
                AND principal_type = $2
                AND principal_id = $3
                AND permission_id = $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .bind(permission_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to revoke permission #{permission_id} from {principal}: {error}"
            ))
        })?;

        Ok(())
    }

    pub(super) async fn replace_principal_permissions_impl(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query(
            r#"
            DELETE FROM rbac_principal_permissions
            WHERE tenant_id = $1 AND principal_type = $2 AND principal_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to clear permissions of {principal}: {error}"
            ))
        })?;

        sqlx::query(
            r#"
            INSERT INTO rbac_principal_permissions
                (tenant_id, principal_type, principal_id, permission_id)
            SELECT $1, $2, $3, UNNEST($4::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .bind(permission_id_values(permission_ids))
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_write_error(error, format!("permissions of {principal}").as_str()))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    pub(super) async fn list_principal_role_ids_impl(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
    ) -> AppResult<Vec<RoleId>> {
        let role_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT role_id
            FROM rbac_principal_roles
            WHERE tenant_id = $1 AND principal_type = $2 AND principal_id = $3
            ORDER BY role_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list roles of {principal}: {error}"))
        })?;

        Ok(role_ids.into_iter().map(RoleId::new).collect())
    }

    pub(super) async fn list_principal_permission_ids_impl(
        &self,
        tenant_id: TenantId,
        principal: &Principal,
    ) -> AppResult<Vec<PermissionId>> {
        let permission_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT permission_id
            FROM rbac_principal_permissions
            WHERE tenant_id = $1 AND principal_type = $2 AND principal_id = $3
            ORDER BY permission_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(principal.principal_type())
        .bind(principal.principal_id())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list permissions of {principal}: {error}"
            ))
        })?;

        Ok(permission_ids.into_iter().map(PermissionId::new).collect())
    }

    pub(super) async fn list_principals_with_role_impl(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> AppResult<Vec<Principal>> {
        let rows = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT principal_type, principal_id
            FROM rbac_principal_roles
            WHERE tenant_id = $1 AND role_id = $2
            ORDER BY principal_type, principal_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list principals with role #{role_id}: {error}"
            ))
        })?;

        rows.into_iter()
            .map(|row| {
                Principal::new(row.principal_type.as_str(), row.principal_id.as_str()).map_err(
                    |error| {
                        AppError::Internal(format!(
                            "invalid stored principal '{}:{}': {error}",
                            row.principal_type, row.principal_id
                        ))
                    },
                )
            })
            .collect()
    }

    pub(super) async fn list_role_links_impl(
        &self,
        tenant_id: TenantId,
        guard_name: &GuardName,
    ) -> AppResult<Vec<(RoleId, PermissionId)>> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT links.role_id, links.permission_id
            FROM rbac_role_permissions AS links
            INNER JOIN rbac_roles AS roles
                ON roles.tenant_id = links.tenant_id AND roles.id = links.role_id
            WHERE links.tenant_id = $1 AND roles.guard_name = $2
            ORDER BY links.role_id, links.permission_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(guard_name.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load role permissions: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|(role_id, permission_id)| (RoleId::new(role_id), PermissionId::new(permission_id)))
            .collect())
    }
}
