// [libs/infra/db/tests/metrics_upsert.rs]
use chrono::{TimeZone, Utc};
use frostwatch_domain_metrics::IncomingGroup;
use frostwatch_infra_db::{LedgerClient, MetricsRepository};
use libsql::params;
use uuid::Uuid;

async fn seeded_client(db_name: &str) -> LedgerClient {
    let url = format!("file:{db_name}?mode=memory&cache=shared");
    let client = LedgerClient::connect(&url, None).await.unwrap();
    let connection = client.get_connection().unwrap();
    connection
        .execute("INSERT INTO tenants (id, name) VALUES ('t1', 'Acme')", ())
        .await
        .unwrap();
    connection
        .execute("INSERT INTO sites (id, tenant_id, name) VALUES ('s1', 't1', 'W1')", ())
        .await
        .unwrap();
    connection
        .execute("INSERT INTO areas (id, site_id, tenant_id, name) VALUES ('a1', 's1', 't1', 'Row')", params![])
        .await
        .unwrap();
    connection
        .execute(
            "INSERT INTO units (id, area_id, site_id, tenant_id, display_name) VALUES ('u1', 'a1', 's1', 't1', 'F1')",
            (),
        )
        .await
        .unwrap();
    client
}

#[tokio::test]
async fn sequential_upserts_merge_to_the_worked_scenario() {
    let client = seeded_client(&format!("metrics_{}", Uuid::new_v4().simple())).await;
    let repo = MetricsRepository::new(client.clone());
    let hour = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();

    let first = IncomingGroup {
        min_temp_tenths: 300,
        max_temp_tenths: 350,
        sum_temp_tenths: 1300,
        count: 4,
        min_humidity_tenths: None,
        max_humidity_tenths: None,
        anomaly_count: 0,
    };
    repo.upsert_bucket("u1", hour, "hourly", &first).await.unwrap();

    let second = IncomingGroup {
        min_temp_tenths: 290,
        max_temp_tenths: 360,
        sum_temp_tenths: 680,
        count: 2,
        min_humidity_tenths: None,
        max_humidity_tenths: None,
        anomaly_count: 0,
    };
    repo.upsert_bucket("u1", hour, "hourly", &second).await.unwrap();

    let connection = client.get_connection().unwrap();
    let mut rows = connection
        .query(
            "SELECT min_temp_tenths, max_temp_tenths, sum_temp_tenths, count FROM metric_buckets WHERE unit_id = 'u1'",
            (),
        )
        .await
        .unwrap();
    let row = rows.next().await.unwrap().unwrap();
    assert_eq!(row.get::<i64>(0).unwrap(), 290);
    assert_eq!(row.get::<i64>(1).unwrap(), 360);
    assert_eq!(row.get::<i64>(2).unwrap(), 1980);
    assert_eq!(row.get::<i64>(3).unwrap(), 6);
}
