use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::database::memory::{MemoryConnection, MemoryRow};
use crate::database::{DatabaseConnection, DatabaseResult, DatabaseRow, DatabaseType};
use crate::engines::model::{RelationType, SemanticType};
use crate::engines::mysql::{MySqlColumnNormalizer, MySqlScanner};
use crate::engines::Scanner;
use crate::error::Error;

const TABLES_SQL: &str = "SHOW FULL TABLES FROM `app` WHERE Table_type = 'BASE TABLE'";

fn columns_sql(table: &str) -> String {
    format!("SHOW FULL COLUMNS FROM `app`.`{}`", table)
}

fn create_sql(table: &str) -> String {
    format!("SHOW CREATE TABLE `app`.`{}`", table)
}

fn column(field: &str, column_type: &str, null: &str, extra: &str) -> MemoryRow {
    MemoryRow::new()
        .set("Field", field)
        .set("Type", column_type)
        .set("Null", null)
        .null("Default")
        .set("Extra", extra)
        .set("Comment", "")
}

fn table_row(name: &str) -> MemoryRow {
    MemoryRow::new()
        .set("Tables_in_app", name)
        .set("Table_type", "BASE TABLE")
}

fn create_row(name: &str, ddl: &str) -> Vec<MemoryRow> {
    vec![MemoryRow::new().set("Table", name).set("Create Table", ddl)]
}

/// `posts` is enumerated before `users`, so the reciprocal for `users` is
/// contributed by a table fetched earlier.
fn fixture() -> MemoryConnection {
    MemoryConnection::new(DatabaseType::MySql)
        .with_rows(
            TABLES_SQL,
            vec![
                table_row("posts"),
                table_row("users"),
                table_row("migrations"),
                table_row("audit_log"),
            ],
        )
        .with_rows(
            columns_sql("posts"),
            vec![
                column("id", "bigint(20) unsigned", "NO", "auto_increment"),
                column("user_id", "bigint(20) unsigned", "NO", ""),
                column("published", "tinyint(1)", "NO", ""),
            ],
        )
        .with_rows(
            create_sql("posts"),
            create_row(
                "posts",
                "CREATE TABLE `posts` (\n  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,\n  `user_id` bigint(20) unsigned NOT NULL,\n  `published` tinyint(1) NOT NULL,\n  PRIMARY KEY (`id`),\n  KEY `posts_user_id_index` (`user_id`),\n  CONSTRAINT `posts_user_id_foreign` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)\n) ENGINE=InnoDB",
            ),
        )
        .with_rows(
            columns_sql("users"),
            vec![
                column("id", "bigint(20) unsigned", "NO", "auto_increment"),
                column("email", "varchar(191)", "NO", ""),
                column("role", "enum('admin','member')", "YES", ""),
            ],
        )
        .with_rows(
            create_sql("users"),
            create_row(
                "users",
                "CREATE TABLE `users` (\n  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,\n  `email` varchar(191) NOT NULL,\n  `role` enum('admin','member') DEFAULT NULL,\n  PRIMARY KEY (`id`),\n  UNIQUE KEY `users_email_unique` (`email`)\n) ENGINE=InnoDB",
            ),
        )
        .with_rows(
            columns_sql("migrations"),
            vec![column("name", "varchar(255)", "NO", "")],
        )
        .with_rows(
            create_sql("migrations"),
            create_row(
                "migrations",
                "CREATE TABLE `migrations` (\n  `name` varchar(255) NOT NULL\n) ENGINE=InnoDB",
            ),
        )
        .with_rows(
            columns_sql("audit_log"),
            vec![
                column("user_id", "bigint(20) unsigned", "YES", ""),
                column("amount", "decimal(10,2)", "NO", ""),
            ],
        )
        .with_rows(
            create_sql("audit_log"),
            create_row(
                "audit_log",
                "CREATE TABLE `audit_log` (\n  `user_id` bigint(20) unsigned DEFAULT NULL,\n  `amount` decimal(10,2) NOT NULL,\n  CONSTRAINT `audit_user_fk` FOREIGN KEY (`user_id`) REFERENCES `accounts`.`users` (`id`)\n) ENGINE=InnoDB",
            ),
        )
}

/// Memory executor that holds every query for a while and records how many
/// were in flight at once.
struct SlowConnection {
    inner: MemoryConnection,
    delay: Duration,
    delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowConnection {
    fn new(inner: MemoryConnection, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            delays: HashMap::new(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn delay_for(mut self, sql: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(sql.into(), delay);
        self
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseConnection for SlowConnection {
    async fn query(&self, query: &str) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(query).copied().unwrap_or(self.delay);
        tokio::time::sleep(delay).await;
        let result = self.inner.query(query).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn get_database_type(&self) -> DatabaseType {
        self.inner.get_database_type()
    }

    async fn close(&self) -> DatabaseResult<()> {
        self.inner.close().await
    }
}

/// Tables with a single `id` column, enumerated in the given order. Every
/// table named in `children` references `users`.
fn many_tables(names: &[&str], children: &[&str]) -> MemoryConnection {
    let mut conn = MemoryConnection::new(DatabaseType::MySql)
        .with_rows(TABLES_SQL, names.iter().map(|n| table_row(n)).collect());

    for name in names {
        let ddl = if children.contains(name) {
            format!(
                "CREATE TABLE `{0}` (\n  `id` int NOT NULL,\n  `user_id` int NOT NULL,\n  PRIMARY KEY (`id`),\n  CONSTRAINT `{0}_user_fk` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)\n)",
                name
            )
        } else {
            format!(
                "CREATE TABLE `{}` (\n  `id` int NOT NULL,\n  PRIMARY KEY (`id`)\n)",
                name
            )
        };
        conn = conn
            .with_rows(columns_sql(name), vec![column("id", "int(11)", "NO", "")])
            .with_rows(create_sql(name), create_row(name, &ddl));
    }
    conn
}

fn scanner(conn: Arc<dyn DatabaseConnection>, excludes: &[&str]) -> MySqlScanner {
    MySqlScanner::new(
        conn,
        "app",
        MySqlColumnNormalizer::new(),
        excludes.iter().map(|s| s.to_string()),
    )
}

#[tokio::test]
async fn test_scan_builds_items_in_enumeration_order() {
    let items = scanner(Arc::new(fixture()), &[]).scan().await.unwrap();

    let names: Vec<&str> = items.iter().map(|i| i.table.as_str()).collect();
    assert_eq!(names, vec!["posts", "users", "migrations", "audit_log"]);
    assert!(items.iter().all(|i| i.schema == "app"));

    let posts = &items[0];
    assert_eq!(posts.primary_key.columns, vec!["id"]);
    assert_eq!(posts.indexes[0].index, "posts_user_id_index");
    let published = posts.column("published").unwrap();
    assert_eq!(published.semantic_type, SemanticType::Bool);
    assert_eq!(published.size, None);
    let id = posts.column("id").unwrap();
    assert_eq!(id.unsigned, Some(true));
    assert_eq!(id.size, Some(20));
    assert_eq!(id.autoincrement, Some(true));

    let users = &items[1];
    let role = users.column("role").unwrap();
    assert!(role.nullable);
    assert_eq!(
        role.enum_values,
        Some(vec!["admin".to_string(), "member".to_string()])
    );
}

#[tokio::test]
async fn test_scan_attaches_reciprocal_relations() {
    let items = scanner(Arc::new(fixture()), &[]).scan().await.unwrap();
    let posts = &items[0];
    let users = &items[1];

    assert_eq!(posts.relations.len(), 1);
    let belongs_to = &posts.relations[0];
    assert_eq!(belongs_to.relation_type, RelationType::BelongsTo);
    assert_eq!(belongs_to.columns, vec!["user_id"]);
    assert_eq!(belongs_to.references, vec!["id"]);
    assert_eq!(belongs_to.on.table, "users");
    assert_eq!(belongs_to.on.database, "app");

    assert_eq!(users.relations.len(), 1);
    let has_many = &users.relations[0];
    assert_eq!(has_many.relation_type, RelationType::HasMany);
    assert_eq!(has_many.columns, vec!["id"]);
    assert_eq!(has_many.references, vec!["user_id"]);
    assert_eq!(has_many.on.table, "posts");
    assert_eq!(has_many.on.database, "app");
}

#[tokio::test]
async fn test_cross_database_reference_has_no_reciprocal() {
    let items = scanner(Arc::new(fixture()), &[]).scan().await.unwrap();
    let audit = items.iter().find(|i| i.table == "audit_log").unwrap();

    assert_eq!(audit.relations.len(), 1);
    assert_eq!(audit.relations[0].on.database, "accounts");
    assert_eq!(audit.relations[0].on.table, "users");
    assert_eq!(audit.primary_key.columns, Vec::<String>::new());

    // The local `users` table only hears about `posts`.
    let users = items.iter().find(|i| i.table == "users").unwrap();
    assert!(users.relations.iter().all(|r| r.on.table != "audit_log"));
}

#[tokio::test]
async fn test_excluded_tables_are_skipped() {
    let conn = Arc::new(fixture());
    let items = scanner(conn.clone(), &["users", "migrations"])
        .scan()
        .await
        .unwrap();

    let names: Vec<&str> = items.iter().map(|i| i.table.as_str()).collect();
    assert_eq!(names, vec!["posts", "audit_log"]);
    // The foreign key into the excluded table is still reported.
    assert_eq!(items[0].relations[0].on.table, "users");

    let executed = conn.executed().await;
    assert!(!executed.contains(&columns_sql("users")));
    assert!(!executed.contains(&create_sql("users")));
    assert!(!executed.contains(&create_sql("migrations")));
}

#[tokio::test]
async fn test_exclusion_is_case_sensitive() {
    let items = scanner(Arc::new(fixture()), &["Users"]).scan().await.unwrap();
    assert_eq!(items.len(), 4);
}

#[tokio::test]
async fn test_scan_is_idempotent() {
    let scanner = scanner(Arc::new(fixture()), &[]);
    let first = scanner.scan().await.unwrap();
    let second = scanner.scan().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_concurrency_does_not_change_result() {
    let serial = scanner(Arc::new(fixture()), &[])
        .with_concurrency(1)
        .scan()
        .await
        .unwrap();
    let parallel = scanner(Arc::new(fixture()), &[])
        .with_concurrency(16)
        .scan()
        .await
        .unwrap();
    assert_eq!(serial, parallel);
}

#[tokio::test]
async fn test_failed_fetch_aborts_scan() {
    let conn = fixture().with_failure(columns_sql("users"), "Table 'app.users' doesn't exist");
    let result = scanner(Arc::new(conn), &[]).scan().await;

    match result {
        Err(Error::Query(msg)) => assert!(msg.contains("doesn't exist")),
        other => panic!("expected query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_enumeration_aborts_scan() {
    let conn = MemoryConnection::new(DatabaseType::MySql).with_failure(TABLES_SQL, "denied");
    let result = scanner(Arc::new(conn), &[]).scan().await;
    assert!(matches!(result, Err(Error::Query(_))));
}

#[tokio::test]
async fn test_malformed_column_type_aborts_scan() {
    let conn = fixture().with_rows(
        columns_sql("migrations"),
        vec![column("name", "(255)", "NO", "")],
    );
    let result = scanner(Arc::new(conn), &[]).scan().await;

    match result {
        Err(Error::MalformedType { column, token }) => {
            assert_eq!(column, "name");
            assert_eq!(token, "(255)");
        }
        other => panic!("expected malformed type error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_definition_row_is_a_query_error() {
    let conn = fixture().with_rows(create_sql("migrations"), vec![]);
    let result = scanner(Arc::new(conn), &[]).scan().await;
    assert!(matches!(result, Err(Error::Query(_))));
}

#[tokio::test]
async fn test_empty_database() {
    let conn = MemoryConnection::new(DatabaseType::MySql).with_rows(TABLES_SQL, vec![]);
    let items = scanner(Arc::new(conn), &[]).scan().await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_tables_lists_before_exclusions() {
    let tables = scanner(Arc::new(fixture()), &["users"]).tables().await.unwrap();
    assert_eq!(tables, vec!["posts", "users", "migrations", "audit_log"]);
}

#[tokio::test]
async fn test_in_flight_fetches_stay_within_limit() {
    let names = ["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7"];
    let conn = Arc::new(SlowConnection::new(
        many_tables(&names, &[]),
        Duration::from_millis(5),
    ));

    let items = scanner(conn.clone(), &[])
        .with_concurrency(2)
        .scan()
        .await
        .unwrap();

    assert_eq!(items.len(), names.len());
    assert_eq!(conn.peak(), 2);
}

#[tokio::test]
async fn test_failure_stops_later_fetches() {
    let names = ["t0", "t1", "t2", "t3", "t4"];
    let conn = Arc::new(many_tables(&names, &[]).with_failure(columns_sql("t1"), "gone"));

    let result = scanner(conn.clone(), &[]).with_concurrency(1).scan().await;
    assert!(matches!(result, Err(Error::Query(_))));

    let executed = conn.executed().await;
    assert!(executed.contains(&create_sql("t0")));
    assert!(executed.contains(&columns_sql("t1")));
    assert!(!executed.contains(&create_sql("t1")));
    for later in ["t2", "t3", "t4"] {
        assert!(!executed.contains(&columns_sql(later)));
        assert!(!executed.contains(&create_sql(later)));
    }
}

#[tokio::test]
async fn test_reciprocals_follow_enumeration_order_not_completion_order() {
    // `c` finishes last and `b` first, yet `users` lists them as enumerated.
    let conn = Arc::new(
        SlowConnection::new(
            many_tables(&["c", "a", "b", "users"], &["c", "a", "b"]),
            Duration::from_millis(1),
        )
        .delay_for(columns_sql("c"), Duration::from_millis(60))
        .delay_for(columns_sql("a"), Duration::from_millis(30)),
    );

    let items = scanner(conn, &[]).with_concurrency(8).scan().await.unwrap();

    let users = items.iter().find(|i| i.table == "users").unwrap();
    let sources: Vec<&str> = users.relations.iter().map(|r| r.on.table.as_str()).collect();
    assert_eq!(sources, vec!["c", "a", "b"]);
    assert!(users
        .relations
        .iter()
        .all(|r| r.relation_type == RelationType::HasMany));
}

#[tokio::test]
async fn test_unreadable_definition_aborts_scan() {
    let conn = fixture().with_rows(
        create_sql("migrations"),
        create_row("migrations", "CREATE TABLE `migrations` ("),
    );
    let result = scanner(Arc::new(conn), &[]).scan().await;

    match result {
        Err(Error::Definition { table, .. }) => assert_eq!(table, "migrations"),
        other => panic!("expected definition error, got {:?}", other),
    }
}
