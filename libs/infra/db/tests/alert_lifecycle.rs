// [libs/infra/db/tests/alert_lifecycle.rs]
use chrono::Utc;
use frostwatch_domain_alerting::{AlertType, TriggeringBound};
use frostwatch_infra_db::{AlertQueryFilters, AlertRepository, LedgerClient};
use libsql::params;
use uuid::Uuid;

async fn seeded_client(db_name: &str) -> LedgerClient {
    let url = format!("file:{db_name}?mode=memory&cache=shared");
    let client = LedgerClient::connect(&url, None).await.unwrap();
    let connection = client.get_connection().unwrap();

    let tenant_id = "t1";
    connection
        .execute(
            "INSERT INTO tenants (id, name) VALUES (?1, 'Acme Cold Chain')",
            params![tenant_id],
        )
        .await
        .unwrap();
    connection
        .execute(
            "INSERT INTO sites (id, tenant_id, name) VALUES ('s1', ?1, 'Warehouse 1')",
            params![tenant_id],
        )
        .await
        .unwrap();
    connection
        .execute(
            "INSERT INTO areas (id, site_id, tenant_id, name) VALUES ('a1', 's1', ?1, 'Freezer Row')",
            params![tenant_id],
        )
        .await
        .unwrap();
    connection
        .execute(
            "INSERT INTO units (id, area_id, site_id, tenant_id, display_name, min_temp_tenths, max_temp_tenths) \
             VALUES ('u1', 'a1', 's1', ?1, 'Freezer 1', 320, 400)",
            params![tenant_id],
        )
        .await
        .unwrap();

    client
}

#[tokio::test]
async fn idempotent_create_returns_existing_open_alert() {
    let client = seeded_client(&format!("alert_idem_{}", Uuid::new_v4().simple())).await;
    let repo = AlertRepository::new(client);
    let now = Utc::now();

    let first = repo
        .create_if_no_open_alert("t1", "u1", AlertType::TemperatureExcursion, 410, TriggeringBound::Max, now)
        .await
        .unwrap();

    let second = repo
        .create_if_no_open_alert("t1", "u1", AlertType::TemperatureExcursion, 415, TriggeringBound::Max, now)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.trigger_temperature_tenths, 410);
}

#[tokio::test]
async fn resolve_is_idempotent_against_a_second_call() {
    let client = seeded_client(&format!("alert_resolve_{}", Uuid::new_v4().simple())).await;
    let repo = AlertRepository::new(client);
    let now = Utc::now();

    let alert = repo
        .create_if_no_open_alert("t1", "u1", AlertType::TemperatureExcursion, 410, TriggeringBound::Max, now)
        .await
        .unwrap();

    repo.resolve("t1", &alert.id, None, None, now).await.unwrap();
    let err = repo.resolve("t1", &alert.id, None, None, now).await;
    assert!(err.is_err());

    let reloaded = repo.get_by_id_scoped("t1", &alert.id).await.unwrap().unwrap();
    assert!(reloaded.resolved_at_is_coherent());
}

#[tokio::test]
async fn acknowledge_is_a_no_op_once_already_acknowledged() {
    let client = seeded_client(&format!("alert_ack_{}", Uuid::new_v4().simple())).await;
    let repo = AlertRepository::new(client);
    let now = Utc::now();

    let alert = repo
        .create_if_no_open_alert("t1", "u1", AlertType::TemperatureExcursion, 410, TriggeringBound::Max, now)
        .await
        .unwrap();

    repo.acknowledge("t1", &alert.id, "operator-1", now).await.unwrap();
    // Second call targets status='active' in the WHERE clause, so it is a
    // silent no-op rather than an error.
    repo.acknowledge("t1", &alert.id, "operator-2", now).await.unwrap();

    let reloaded = repo.get_by_id_scoped("t1", &alert.id).await.unwrap().unwrap();
    assert_eq!(reloaded.acknowledged_by.as_deref(), Some("operator-1"));
}

#[tokio::test]
async fn list_by_tenant_filters_by_site_and_is_silent_across_tenants() {
    let client = seeded_client(&format!("alert_filter_{}", Uuid::new_v4().simple())).await;
    let repo = AlertRepository::new(client);
    let now = Utc::now();

    repo.create_if_no_open_alert("t1", "u1", AlertType::TemperatureExcursion, 410, TriggeringBound::Max, now)
        .await
        .unwrap();

    let by_site = repo
        .list_by_tenant(
            "t1",
            &AlertQueryFilters { site_id: Some("s1".into()), ..Default::default() },
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(by_site.len(), 1);

    let other_site = repo
        .list_by_tenant(
            "t1",
            &AlertQueryFilters { site_id: Some("s2".into()), ..Default::default() },
            10,
            0,
        )
        .await
        .unwrap();
    assert!(other_site.is_empty());

    let other_tenant = repo
        .list_by_tenant("t2", &AlertQueryFilters::default(), 10, 0)
        .await
        .unwrap();
    assert!(other_tenant.is_empty());
}
