use axum::{debug_handler, extract::State, Form};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::Role,
    outcome::{ActionError, ActionResult, Done, OrProvider},
    policy::{self, Action, Actor, Target},
    profiles,
    session::Viewer,
};

/// Admin-only role change. Checks run in a fixed order: admin, known role,
/// not self, target exists.
pub async fn change_role(db_pool: &SqlitePool, actor: &Actor, target: Uuid, role: &str) -> Result<Role, ActionError> {
    policy::authorize(Some(actor), Action::ManageUsers, Target::Directory)?;
    let role: Role = role.parse().map_err(|_| ActionError::invalid("無効な権限です"))?;
    policy::authorize(Some(actor), Action::ChangeRole, Target::Profile { id: target })?;

    if !profiles::store::update_role(db_pool, target, role)
        .await
        .or_provider("権限更新に失敗しました")?
    {
        return Err(ActionError::NotFound("ユーザー"));
    }

    tracing::info!(admin = %actor.id, %target, %role, "role changed");
    Ok(role)
}

#[derive(Deserialize)]
pub(crate) struct RoleForm {
    user_id: Uuid,
    #[serde(default)]
    role: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_role(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Form(RoleForm { user_id, role }): Form<RoleForm>,
) -> ActionResult {
    let actor = viewer.require()?;
    change_role(&db_pool, actor, user_id, &role).await?;
    Ok(Done::new().message("権限を更新しました"))
}
