//! 权限检查
//!
//! 成员在当前 guild 中任一角色带 ADMINISTRATOR 位即放行；
//! 任何查询失败都按拒绝处理。

use contracts::ChatSession;
use tracing::{debug, warn};

/// 授权结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Granted,
    Denied,
}

/// 判断成员是否为管理员
pub async fn authorize<C>(session: &C, guild_id: Option<&str>, member_id: &str) -> Authorization
where
    C: ChatSession + Sync,
{
    let Some(guild_id) = guild_id else {
        debug!(member = %member_id, "command outside a guild");
        return Authorization::Denied;
    };

    let member_roles = match session.member_roles(guild_id, member_id).await {
        Ok(roles) => roles,
        Err(e) => {
            warn!(guild = %guild_id, member = %member_id, error = %e, "failed to get member roles");
            return Authorization::Denied;
        }
    };
    let guild_roles = match session.guild_roles(guild_id).await {
        Ok(roles) => roles,
        Err(e) => {
            warn!(guild = %guild_id, error = %e, "failed to get guild roles");
            return Authorization::Denied;
        }
    };

    let is_admin = guild_roles
        .iter()
        .filter(|role| member_roles.contains(&role.id))
        .any(|role| role.is_admin());

    if is_admin {
        Authorization::Granted
    } else {
        Authorization::Denied
    }
}
