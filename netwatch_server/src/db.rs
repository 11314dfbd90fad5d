use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::SyncError;
use crate::models::{
    Device, DeviceChangeset, DeviceRow, NewDevice, StatusChangeset, SystemConfig,
};
use crate::settings::CONFIG_ROW_ID;

pub mod pool;

pub use pool::DbPool;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Bring the schema up to date
pub fn run_migrations(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;
    for version in applied {
        log::info!("applied migration {version}");
    }
    Ok(())
}

/// Run blocking Diesel work on the blocking thread pool with a pooled connection
pub async fn run_blocking<T, F>(pool: &DbPool, work: F) -> Result<T, SyncError>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T, SyncError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        work(&mut conn)
    })
    .await?
}

/// All devices in creation order
pub fn list_devices(conn: &mut SqliteConnection) -> QueryResult<Vec<Device>> {
    use crate::schema::devices::dsl::*;

    let rows = devices
        .order((created_at.asc(), id.asc()))
        .select(DeviceRow::as_select())
        .load::<DeviceRow>(conn)?;
    Ok(rows.into_iter().map(Device::from).collect())
}

pub fn find_device(conn: &mut SqliteConnection, device_id: &str) -> QueryResult<Option<Device>> {
    use crate::schema::devices::dsl::*;

    devices
        .filter(id.eq(device_id))
        .select(DeviceRow::as_select())
        .first::<DeviceRow>(conn)
        .optional()
        .map(|row| row.map(Device::from))
}

pub fn find_device_by_ip(conn: &mut SqliteConnection, ip_val: &str) -> QueryResult<Option<Device>> {
    use crate::schema::devices::dsl::*;

    devices
        .filter(ip.eq(ip_val))
        .select(DeviceRow::as_select())
        .first::<DeviceRow>(conn)
        .optional()
        .map(|row| row.map(Device::from))
}

pub fn insert_device(conn: &mut SqliteConnection, new_device: &NewDevice) -> QueryResult<usize> {
    use crate::schema::devices::dsl::*;

    diesel::insert_into(devices).values(new_device).execute(conn)
}

/// Insert unless the ip is already taken; returns whether a row was written
pub fn insert_device_if_absent(
    conn: &mut SqliteConnection,
    new_device: &NewDevice,
) -> QueryResult<bool> {
    use crate::schema::devices::dsl::*;

    let written = diesel::insert_into(devices)
        .values(new_device)
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(written > 0)
}

pub fn update_device(
    conn: &mut SqliteConnection,
    device_id: &str,
    changes: &DeviceChangeset,
) -> QueryResult<usize> {
    use crate::schema::devices::dsl::*;

    diesel::update(devices.filter(id.eq(device_id)))
        .set(changes)
        .execute(conn)
}

pub fn update_device_status(
    conn: &mut SqliteConnection,
    device_id: &str,
    changes: &StatusChangeset,
) -> QueryResult<usize> {
    use crate::schema::devices::dsl::*;

    diesel::update(devices.filter(id.eq(device_id)))
        .set(changes)
        .execute(conn)
}

pub fn delete_device(conn: &mut SqliteConnection, device_id: &str) -> QueryResult<usize> {
    use crate::schema::devices::dsl::*;

    diesel::delete(devices.filter(id.eq(device_id))).execute(conn)
}

/// Current netwatch connection settings, if ever saved
pub fn load_config(conn: &mut SqliteConnection) -> QueryResult<Option<SystemConfig>> {
    use crate::schema::system_config::dsl::*;

    system_config
        .filter(id.eq(CONFIG_ROW_ID))
        .select(SystemConfig::as_select())
        .first::<SystemConfig>(conn)
        .optional()
}

/// Save netwatch connection settings (insert or update the singleton row)
pub fn save_config(conn: &mut SqliteConnection, settings: &SystemConfig) -> QueryResult<()> {
    use crate::schema::system_config::dsl::*;

    diesel::insert_into(system_config)
        .values((
            id.eq(CONFIG_ROW_ID),
            host.eq(&settings.host),
            username.eq(&settings.username),
            password.eq(&settings.password),
            port.eq(settings.port),
            use_tls.eq(settings.use_tls),
            polling_interval.eq(settings.polling_interval),
            updated_at.eq(settings.updated_at),
        ))
        .on_conflict(id)
        .do_update()
        .set((
            host.eq(&settings.host),
            username.eq(&settings.username),
            password.eq(&settings.password),
            port.eq(settings.port),
            use_tls.eq(settings.use_tls),
            polling_interval.eq(settings.polling_interval),
            updated_at.eq(settings.updated_at),
        ))
        .execute(conn)?;

    Ok(())
}
