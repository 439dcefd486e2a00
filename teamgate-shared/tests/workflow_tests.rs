/// Workflow tests against the in-memory identity store
///
/// These exercise registration, login, refresh rotation, visibility and
/// administration end to end, without a database.

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use teamgate_shared::auth::jwt::TokenService;
use teamgate_shared::auth::password::Argon2Hasher;
use teamgate_shared::error::ServiceError;
use teamgate_shared::models::user::{PublicUser, Role};
use teamgate_shared::services::auth::{Registration, INVALID_CREDENTIALS};
use teamgate_shared::services::teams::{NewTeam, TeamPatch};
use teamgate_shared::services::users::UserPatch;
use teamgate_shared::services::{AuthService, TeamService, UserService};
use teamgate_shared::store::{IdentityStore, MemoryIdentityStore};

const SECRET: &str = "workflow-test-secret-at-least-32-bytes";
const PASSWORD: &str = "password123";

struct Harness {
    store: Arc<MemoryIdentityStore>,
    auth: AuthService,
    users: UserService,
    teams: TeamService,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryIdentityStore::new());
    let hasher = Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap());
    let tokens = TokenService::new(SECRET, Duration::hours(24), Duration::hours(168));

    Harness {
        auth: AuthService::new(store.clone(), hasher.clone(), tokens),
        users: UserService::new(store.clone(), hasher),
        teams: TeamService::new(store.clone()),
        store,
    }
}

fn registration(email: &str, role: Option<&str>, team_id: Option<Uuid>) -> Registration {
    Registration {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        first_name: "Alex".to_string(),
        last_name: "Martin".to_string(),
        phone_number: None,
        role: role.map(str::to_string),
        team_id,
    }
}

async fn bootstrap_admin(h: &Harness) -> PublicUser {
    h.auth
        .register(None, registration("admin@example.com", None, None))
        .await
        .unwrap()
}

async fn create_team(h: &Harness, admin: Uuid, name: &str) -> Uuid {
    h.teams
        .create(
            admin,
            NewTeam {
                name: name.to_string(),
                description: None,
            },
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_first_registration_bootstraps_admin() {
    let h = harness();
    let user = h
        .auth
        .register(None, registration("first@example.com", Some("employee"), None))
        .await
        .unwrap();

    assert_eq!(user.role, Role::Admin);
    assert!(user.created_by.is_none());
}

#[tokio::test]
async fn test_anonymous_registration_forbidden_once_admin_exists() {
    let h = harness();
    bootstrap_admin(&h).await;

    let err = h
        .auth
        .register(None, registration("anon@example.com", None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(ref m) if m == "seul un admin peut créer des utilisateurs"));
}

#[tokio::test]
async fn test_manager_cannot_register_users() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let manager = h
        .auth
        .register(Some(admin.id), registration("m@example.com", Some("manager"), None))
        .await
        .unwrap();
    assert_eq!(manager.role, Role::Manager);
    assert_eq!(manager.created_by, Some(admin.id));

    let err = h
        .auth
        .register(Some(manager.id), registration("e@example.com", None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn test_unknown_creator_is_not_found() {
    let h = harness();
    bootstrap_admin(&h).await;

    let err = h
        .auth
        .register(Some(Uuid::new_v4()), registration("e@example.com", None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref m) if m == "créateur non trouvé"));
}

#[tokio::test]
async fn test_invalid_role_is_never_persisted() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;

    let err = h
        .auth
        .register(Some(admin.id), registration("x@example.com", Some("superuser"), None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRole));
    assert!(h.store.find_user_by_email("x@example.com").await.unwrap().is_none());
    assert_eq!(h.users.list(admin.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_registration_team_rules() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = create_team(&h, admin.id, "Support").await;

    let employee = h
        .auth
        .register(Some(admin.id), registration("e@example.com", None, Some(team)))
        .await
        .unwrap();
    assert_eq!(employee.role, Role::Employee);
    assert_eq!(employee.team_id, Some(team));

    let err = h
        .auth
        .register(Some(admin.id), registration("m@example.com", Some("manager"), Some(team)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = h
        .auth
        .register(Some(admin.id), registration("e2@example.com", None, Some(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref m) if m == "team non trouvée"));
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;

    let err = h
        .auth
        .register(Some(admin.id), registration("admin@example.com", None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(ref m) if m == "email déjà utilisé"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = harness();
    bootstrap_admin(&h).await;

    let wrong_password = h.auth.login("admin@example.com", "not-the-password").await.unwrap_err();
    let unknown_email = h.auth.login("nobody@example.com", PASSWORD).await.unwrap_err();

    assert!(matches!(wrong_password, ServiceError::Unauthorized(_)));
    assert!(matches!(unknown_email, ServiceError::Unauthorized(_)));
    assert_eq!(wrong_password.to_string(), INVALID_CREDENTIALS);
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn test_login_issues_tokens_and_persists_refresh() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;

    let session = h.auth.login("admin@example.com", PASSWORD).await.unwrap();
    assert_eq!(session.user.id, admin.id);

    let claims = h.auth.tokens().validate_access_token(&session.token).unwrap();
    assert_eq!(claims.uid, admin.id);
    assert!(h.auth.validate_refresh_token(admin.id, &session.refresh_token).await.unwrap());
}

#[tokio::test]
async fn test_refresh_rotates_and_invalidates_previous_token() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let session = h.auth.login("admin@example.com", PASSWORD).await.unwrap();

    let rotated = h.auth.refresh(&session.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, session.refresh_token);
    assert!(h.auth.tokens().validate_access_token(&rotated.token).is_ok());

    assert!(!h.auth.validate_refresh_token(admin.id, &session.refresh_token).await.unwrap());
    assert!(h.auth.validate_refresh_token(admin.id, &rotated.refresh_token).await.unwrap());

    let err = h.auth.refresh(&session.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(ref m) if m == "refresh token invalide ou révoqué"));
}

#[tokio::test]
async fn test_refresh_rejects_garbage_and_access_tokens() {
    let h = harness();
    bootstrap_admin(&h).await;
    let session = h.auth.login("admin@example.com", PASSWORD).await.unwrap();

    let err = h.auth.refresh("garbage").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(ref m) if m == "refresh token invalide ou expiré"));

    let err = h.auth.refresh(&session.token).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn test_concurrent_refresh_has_single_winner() {
    let h = harness();
    bootstrap_admin(&h).await;
    let session = h.auth.login("admin@example.com", PASSWORD).await.unwrap();

    let (first, second) = tokio::join!(
        h.auth.refresh(&session.refresh_token),
        h.auth.refresh(&session.refresh_token)
    );

    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let session = h.auth.login("admin@example.com", PASSWORD).await.unwrap();

    h.auth.logout(admin.id).await.unwrap();

    assert!(!h.auth.validate_refresh_token(admin.id, &session.refresh_token).await.unwrap());
    assert!(h.auth.refresh(&session.refresh_token).await.is_err());
}

#[tokio::test]
async fn test_employee_sees_own_team_employees_only() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = create_team(&h, admin.id, "Support").await;
    let other_team = create_team(&h, admin.id, "Sales").await;

    let e1 = h
        .auth
        .register(Some(admin.id), registration("e1@example.com", None, Some(team)))
        .await
        .unwrap();
    let e2 = h
        .auth
        .register(Some(admin.id), registration("e2@example.com", None, Some(team)))
        .await
        .unwrap();
    let outsider = h
        .auth
        .register(Some(admin.id), registration("e3@example.com", None, Some(other_team)))
        .await
        .unwrap();
    let manager = h
        .auth
        .register(Some(admin.id), registration("m@example.com", Some("manager"), None))
        .await
        .unwrap();
    h.teams.add_manager(admin.id, team, manager.id).await.unwrap();

    let mut visible: Vec<Uuid> = h.users.list(e1.id).await.unwrap().iter().map(|u| u.id).collect();
    visible.sort();
    let mut expected = vec![e1.id, e2.id];
    expected.sort();
    assert_eq!(visible, expected);

    assert!(h.users.get(e1.id, e2.id).await.is_ok());
    assert!(matches!(h.users.get(e1.id, outsider.id).await, Err(ServiceError::Forbidden(_))));
    assert!(matches!(h.users.get(e1.id, manager.id).await, Err(ServiceError::Forbidden(_))));
    assert!(matches!(h.users.get(e1.id, admin.id).await, Err(ServiceError::Forbidden(_))));
}

#[tokio::test]
async fn test_manager_visibility_follows_team_links() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let managed = create_team(&h, admin.id, "Support").await;
    let unmanaged = create_team(&h, admin.id, "Sales").await;
    let manager = h
        .auth
        .register(Some(admin.id), registration("m@example.com", Some("manager"), None))
        .await
        .unwrap();
    let inside = h
        .auth
        .register(Some(admin.id), registration("in@example.com", None, Some(managed)))
        .await
        .unwrap();
    h.auth
        .register(Some(admin.id), registration("out@example.com", None, Some(unmanaged)))
        .await
        .unwrap();

    // No links yet: only self
    let visible = h.users.list(manager.id).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, manager.id);

    h.teams.add_manager(admin.id, managed, manager.id).await.unwrap();
    let mut visible: Vec<Uuid> = h.users.list(manager.id).await.unwrap().iter().map(|u| u.id).collect();
    visible.sort();
    let mut expected = vec![manager.id, inside.id];
    expected.sort();
    assert_eq!(visible, expected);

    let teams = h.teams.list(manager.id).await.unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].team.id, managed);
    assert!(matches!(h.teams.get(manager.id, unmanaged).await, Err(ServiceError::Forbidden(_))));
    assert!(matches!(h.users.get(manager.id, admin.id).await, Err(ServiceError::Forbidden(_))));
}

#[tokio::test]
async fn test_demotion_drops_manager_scope() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = create_team(&h, admin.id, "Support").await;
    let manager = h
        .auth
        .register(Some(admin.id), registration("m@example.com", Some("manager"), None))
        .await
        .unwrap();
    h.teams.add_manager(admin.id, team, manager.id).await.unwrap();

    h.users
        .update(admin.id, manager.id, UserPatch { role: Some("employee".to_string()), ..Default::default() })
        .await
        .unwrap();
    assert!(h.store.managed_team_ids(manager.id).await.unwrap().is_empty());
    assert!(h.teams.get(admin.id, team).await.unwrap().managers.is_empty());

    // Detaching works whatever the current role
    h.teams.remove_manager(admin.id, team, manager.id).await.unwrap();

    h.users
        .update(admin.id, manager.id, UserPatch { role: Some("manager".to_string()), ..Default::default() })
        .await
        .unwrap();
    assert!(h.store.managed_team_ids(manager.id).await.unwrap().is_empty());
    assert!(h.teams.list(manager.id).await.unwrap().is_empty());
    assert!(matches!(h.teams.get(manager.id, team).await, Err(ServiceError::Forbidden(_))));

    let err = h.teams.remove_manager(admin.id, team, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_non_admin_writes_are_forbidden() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = create_team(&h, admin.id, "Support").await;
    let employee = h
        .auth
        .register(Some(admin.id), registration("e@example.com", None, Some(team)))
        .await
        .unwrap();

    let err = h
        .teams
        .create(employee.id, NewTeam { name: "Rogue".to_string(), description: None })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "seul un admin peut créer des teams");

    let err = h.users.delete(employee.id, admin.id).await.unwrap_err();
    assert_eq!(err.to_string(), "seul un admin peut supprimer des utilisateurs");

    let err = h
        .users
        .update(employee.id, employee.id, UserPatch { role: Some("admin".into()), ..Default::default() })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "seul un admin peut modifier des utilisateurs");

    let err = h.teams.add_manager(employee.id, team, employee.id).await.unwrap_err();
    assert_eq!(err.to_string(), "seul un admin peut affecter des managers");
}

#[tokio::test]
async fn test_soft_delete_twice_is_not_found() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let employee = h
        .auth
        .register(Some(admin.id), registration("e@example.com", None, None))
        .await
        .unwrap();

    h.users.delete(admin.id, employee.id).await.unwrap();
    let err = h.users.delete(admin.id, employee.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref m) if m == "utilisateur non trouvé"));

    assert!(matches!(h.users.get(admin.id, employee.id).await, Err(ServiceError::NotFound(_))));
    assert!(h.auth.login("e@example.com", PASSWORD).await.is_err());
}

#[tokio::test]
async fn test_add_manager_requires_manager_role() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = create_team(&h, admin.id, "Support").await;
    let employee = h
        .auth
        .register(Some(admin.id), registration("e@example.com", None, None))
        .await
        .unwrap();

    let err = h.teams.add_manager(admin.id, team, employee.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref m) if m == "l'utilisateur n'est pas un manager"));

    let err = h.teams.add_manager(admin.id, team, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref m) if m == "manager non trouvé"));
}

#[tokio::test]
async fn test_manager_links_are_idempotent() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = create_team(&h, admin.id, "Support").await;
    let manager = h
        .auth
        .register(Some(admin.id), registration("m@example.com", Some("manager"), None))
        .await
        .unwrap();

    h.teams.add_manager(admin.id, team, manager.id).await.unwrap();
    h.teams.add_manager(admin.id, team, manager.id).await.unwrap();
    assert_eq!(h.teams.get(admin.id, team).await.unwrap().managers.len(), 1);

    h.teams.remove_manager(admin.id, team, manager.id).await.unwrap();
    h.teams.remove_manager(admin.id, team, manager.id).await.unwrap();
    assert!(h.teams.get(admin.id, team).await.unwrap().managers.is_empty());

    let err = h.teams.add_manager(admin.id, Uuid::new_v4(), manager.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref m) if m == "team non trouvée"));
}

#[tokio::test]
async fn test_user_update_semantics() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = create_team(&h, admin.id, "Support").await;
    let mut input = registration("e@example.com", None, Some(team));
    input.phone_number = Some("0612345678".to_string());
    let employee = h.auth.register(Some(admin.id), input).await.unwrap();

    let updated = h
        .users
        .update(admin.id, employee.id, UserPatch { phone_number: Some(String::new()), ..Default::default() })
        .await
        .unwrap();
    assert!(updated.phone_number.is_none());
    assert_eq!(updated.first_name, "Alex");

    let err = h
        .users
        .update(admin.id, employee.id, UserPatch { first_name: Some(String::new()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = h
        .users
        .update(admin.id, employee.id, UserPatch { role: Some(String::new()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRole));

    let err = h
        .users
        .update(admin.id, employee.id, UserPatch { password: Some("short".into()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let promoted = h
        .users
        .update(admin.id, employee.id, UserPatch { role: Some("manager".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Manager);
    assert!(promoted.team_id.is_none());

    let err = h
        .users
        .update(admin.id, employee.id, UserPatch { team_id: Some(Some(team)), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_password_update_takes_effect() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let employee = h
        .auth
        .register(Some(admin.id), registration("e@example.com", None, None))
        .await
        .unwrap();

    h.users
        .update(admin.id, employee.id, UserPatch { password: Some("new-password-42".into()), ..Default::default() })
        .await
        .unwrap();

    assert!(h.auth.login("e@example.com", PASSWORD).await.is_err());
    assert!(h.auth.login("e@example.com", "new-password-42").await.is_ok());
}

#[tokio::test]
async fn test_team_details_respect_visibility() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = create_team(&h, admin.id, "Support").await;
    let employee = h
        .auth
        .register(Some(admin.id), registration("e@example.com", None, Some(team)))
        .await
        .unwrap();
    let manager = h
        .auth
        .register(Some(admin.id), registration("m@example.com", Some("manager"), None))
        .await
        .unwrap();
    h.teams.add_manager(admin.id, team, manager.id).await.unwrap();

    let as_admin = h.teams.get(admin.id, team).await.unwrap();
    assert_eq!(as_admin.employees.len(), 1);
    assert_eq!(as_admin.managers.len(), 1);

    let as_employee = h.teams.get(employee.id, team).await.unwrap();
    assert_eq!(as_employee.employees.len(), 1);
    assert!(as_employee.managers.is_empty());

    let as_manager = h.teams.get(manager.id, team).await.unwrap();
    assert_eq!(as_manager.managers.len(), 1);
}

#[tokio::test]
async fn test_team_update_and_delete() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = h
        .teams
        .create(admin.id, NewTeam { name: "Support".into(), description: Some("L1".into()) })
        .await
        .unwrap();
    assert_eq!(team.created_by, admin.id);

    let updated = h
        .teams
        .update(admin.id, team.id, TeamPatch { name: None, description: Some(String::new()) })
        .await
        .unwrap();
    assert_eq!(updated.name, "Support");
    assert!(updated.description.is_none());

    let err = h
        .teams
        .update(admin.id, team.id, TeamPatch { name: Some(" ".into()), description: None })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    h.teams.delete(admin.id, team.id).await.unwrap();
    assert!(matches!(h.teams.delete(admin.id, team.id).await, Err(ServiceError::NotFound(_))));
    assert!(h.teams.list(admin.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_profile_includes_teams() {
    let h = harness();
    let admin = bootstrap_admin(&h).await;
    let team = create_team(&h, admin.id, "Support").await;
    let employee = h
        .auth
        .register(Some(admin.id), registration("e@example.com", None, Some(team)))
        .await
        .unwrap();
    let manager = h
        .auth
        .register(Some(admin.id), registration("m@example.com", Some("manager"), None))
        .await
        .unwrap();
    h.teams.add_manager(admin.id, team, manager.id).await.unwrap();

    let profile = h.auth.profile(employee.id).await.unwrap();
    assert_eq!(profile.team.map(|t| t.id), Some(team));
    assert!(profile.teams.is_empty());

    let profile = h.auth.profile(manager.id).await.unwrap();
    assert!(profile.team.is_none());
    assert_eq!(profile.teams.len(), 1);
}
