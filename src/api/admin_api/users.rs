use super::*;

impl AdminApi {
    // ==========================================
    // 用户管理
    // ==========================================

    pub fn list_users(&self, session: &Session, filter: &UserFilter) -> ApiResult<Vec<UserSummary>> {
        session.require_admin()?;
        Ok(self
            .user_repo
            .list_users(filter)?
            .into_iter()
            .map(UserSummary::from)
            .collect())
    }

    /// 编辑用户档案
    ///
    /// # 流程
    /// 1. 有 Assigned 工单的维修工不允许改为其他角色
    /// 2. 档案规范化后写回
    /// 3. 维修工: 校正忙碌标记 → 重算平均分 → 空闲则补派
    pub fn update_profile(
        &self,
        session: &Session,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> ApiResult<ProfileUpdateResult> {
        session.require_admin()?;

        let existing = self.load_user(user_id)?;
        let username = existing.account.username.clone();

        if existing.profile.is_worker()
            && update.role != Role::Worker
            && self.request_repo.has_assigned(user_id)?
        {
            return Err(ApiError::BusinessRuleViolation(t_with_args(
                "admin.demote_refused",
                &[("username", &username)],
            )));
        }

        let (profile, missing_category) = apply_profile_update(&existing.profile, update);
        self.user_repo.save_profile(&profile)?;

        let mut warnings = Vec::new();
        if missing_category {
            tracing::warn!(user_id, %username, "维修工未设置类别");
            warnings.push(t_with_args(
                "admin.worker_missing_category",
                &[("username", &username)],
            ));
        }

        let mut rebalance = None;
        if profile.is_worker() {
            let busy = self.assignment_engine.reconcile_busy(user_id)?;
            if busy != update.is_busy {
                tracing::info!(user_id, requested = update.is_busy, actual = busy, "忙碌标记按在办工单校正");
            }
            self.rating_engine.refresh_worker_average(user_id)?;
            if !busy {
                rebalance = self.assignment_engine.rebalance_for_worker(user_id)?;
            }
        }

        tracing::info!(
            user_id,
            %username,
            from_role = %existing.profile.role,
            to_role = %profile.role,
            admin = %session.username,
            "用户档案已更新"
        );
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::ProfileUpdate, &session.username)
                .with_target_user(user_id)
                .with_payload(json!({
                    "from_role": existing.profile.role.to_db_str(),
                    "role": profile.role.to_db_str(),
                    "from_category": existing.profile.category.map(|c| c.to_db_str()),
                    "category": profile.category.map(|c| c.to_db_str()),
                    "is_busy": update.is_busy,
                })),
        )?;

        Ok(ProfileUpdateResult {
            user: self.load_user(user_id)?.into(),
            warnings,
            rebalance,
            message: t_with_args("admin.profile_saved", &[("username", &username)]),
        })
    }

    /// 启用/停用账号
    ///
    /// 停用时删除该用户的全部会话; 重新启用的空闲维修工立即补派
    pub fn set_user_active(
        &self,
        session: &Session,
        user_id: i64,
        active: bool,
    ) -> ApiResult<UserSummary> {
        session.require_admin()?;
        if !active && user_id == session.user_id {
            return Err(ApiError::BusinessRuleViolation(
                "不能停用当前登录的管理员账号".to_string(),
            ));
        }

        self.user_repo.set_active(user_id, active)?;
        let is_worker = self.load_user(user_id)?.profile.is_worker();
        let mut payload = json!({ "is_active": active });
        if active && is_worker {
            if let Some(outcome) = self.assignment_engine.rebalance_for_worker(user_id)? {
                payload["rebalance_request_id"] = json!(outcome.request_id());
            }
        } else if !active {
            let removed = self.session_repo.delete_for_user(user_id)?;
            payload["sessions_removed"] = json!(removed);
        }

        tracing::info!(user_id, active, admin = %session.username, "账号启用状态已更新");
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::AccountUpdate, &session.username)
                .with_target_user(user_id)
                .with_payload(payload),
        )?;

        Ok(self.load_user(user_id)?.into())
    }

    /// 授予/撤销管理员
    pub fn set_user_staff(
        &self,
        session: &Session,
        user_id: i64,
        is_staff: bool,
    ) -> ApiResult<UserSummary> {
        session.require_admin()?;
        if !is_staff && user_id == session.user_id {
            return Err(ApiError::BusinessRuleViolation(
                "不能撤销自己的管理员权限".to_string(),
            ));
        }

        self.user_repo.set_staff(user_id, is_staff)?;

        tracing::info!(user_id, is_staff, admin = %session.username, "管理员标记已更新");
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::AccountUpdate, &session.username)
                .with_target_user(user_id)
                .with_payload(json!({ "is_staff": is_staff })),
        )?;

        Ok(self.load_user(user_id)?.into())
    }
}
