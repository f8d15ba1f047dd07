//! Repository tests against a real PostgreSQL database.
//!
//! Run with:
//! `TEST_DATABASE_URL=postgres://... cargo test -p persistence -- --ignored`

use domain::models::{NewGroup, NewStudySession, Role, User};
use domain::ports::Backend;
use domain::BackendError;
use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use persistence::db::{create_pool, DatabaseConfig};
use persistence::postgres_backend;
use uuid::Uuid;

async fn backend() -> Option<Backend> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = create_pool(&DatabaseConfig {
        url,
        max_connections: 5,
        min_connections: 1,
        connect_timeout_secs: 10,
        idle_timeout_secs: 60,
    })
    .await
    .expect("Failed to connect to test database");
    sqlx::migrate!("./src/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(postgres_backend(pool))
}

async fn register(backend: &Backend, name: &str, role: Role) -> User {
    let email: String = SafeEmail().fake();
    let id = backend.auth.sign_up(&email, "secret-pass").await.unwrap();
    let user = User::new_profile(id, name, &email, role);
    backend.users.set_user(&user).await.unwrap();
    user
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_membership_compare_and_set() {
    let Some(backend) = backend().await else {
        return;
    };
    let admin = register(&backend, "Admin", Role::Admin).await;
    let ana = register(&backend, "Ana", Role::Student).await;
    let group = backend
        .groups
        .create_group(&NewGroup {
            name: "Biology".to_string(),
            created_by: admin.id,
        })
        .await
        .unwrap();

    assert!(backend
        .users
        .assign_group(ana.id, None, Some(group.id))
        .await
        .unwrap());
    assert!(!backend
        .users
        .assign_group(ana.id, None, Some(group.id))
        .await
        .unwrap());

    let loaded = backend.groups.get_group(group.id).await.unwrap().unwrap();
    assert_eq!(loaded.members, vec![ana.id]);

    assert!(matches!(
        backend
            .users
            .assign_group(ana.id, Some(group.id), Some(Uuid::new_v4()))
            .await,
        Err(BackendError::MissingReference(_))
    ));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_delete_group_releases_members() {
    let Some(backend) = backend().await else {
        return;
    };
    let admin = register(&backend, "Admin", Role::Admin).await;
    let ana = register(&backend, "Ana", Role::Student).await;
    let group = backend
        .groups
        .create_group(&NewGroup {
            name: "Chemistry".to_string(),
            created_by: admin.id,
        })
        .await
        .unwrap();
    backend
        .users
        .assign_group(ana.id, None, Some(group.id))
        .await
        .unwrap();

    assert_eq!(backend.groups.delete_group(group.id).await.unwrap(), Some(1));
    let ana = backend.users.get_user(ana.id).await.unwrap().unwrap();
    assert!(ana.group_id.is_none());
    assert_eq!(backend.groups.delete_group(group.id).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_session_totals() {
    let Some(backend) = backend().await else {
        return;
    };
    let ana = register(&backend, "Ana", Role::Student).await;
    for studied_time in [1200, 600] {
        backend
            .sessions
            .create_session(&NewStudySession {
                user_id: ana.id,
                studied_time,
                location: None,
                image: None,
            })
            .await
            .unwrap();
    }

    let totals = backend.sessions.session_totals(&[ana.id]).await.unwrap();
    assert_eq!(totals.get(&ana.id), Some(&(2, 1800)));
    let sessions = backend.sessions.list_sessions(ana.id).await.unwrap();
    assert_eq!(sessions.len(), 2);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_auth_sessions() {
    let Some(backend) = backend().await else {
        return;
    };
    let email: String = SafeEmail().fake();
    backend.auth.sign_up(&email, "secret-pass").await.unwrap();
    assert!(matches!(
        backend.auth.sign_up(&email, "secret-pass").await,
        Err(BackendError::Duplicate(_))
    ));

    let session = backend.auth.sign_in(&email, "secret-pass").await.unwrap();
    assert!(backend.auth.is_session_active(session.id).await.unwrap());
    backend.auth.sign_out(session.id).await.unwrap();
    assert!(!backend.auth.is_session_active(session.id).await.unwrap());

    assert!(matches!(
        backend.auth.sign_in(&email, "wrong-pass").await,
        Err(BackendError::InvalidCredentials)
    ));
}
